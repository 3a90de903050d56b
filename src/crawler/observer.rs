//! Result boundary between the crawl loop and its callers

use crate::crawler::stats::CrawlStats;
use crate::crawler::types::{CrawlError, CrawlResult, CrawlTask};
use serde::Serialize;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Callbacks invoked by the crawl loop
///
/// All hooks run on the crawl loop itself, so they should return quickly;
/// forward to a channel ([`ChannelObserver`]) for heavier processing.
/// `on_complete` is called exactly once per run.
pub trait CrawlObserver: Send {
    /// A task was dispatched for fetching
    fn on_dispatch(&mut self, _task: &CrawlTask) {}

    /// A page was fetched and extracted
    fn on_page(&mut self, _result: &CrawlResult) {}

    /// A URL failed (fetch error, robots denial, filtered content)
    fn on_error(&mut self, _error: &CrawlError) {}

    /// The run ended
    fn on_complete(&mut self, _stats: &CrawlStats) {}
}

/// Observer that ignores every event
impl CrawlObserver for () {}

impl<T: CrawlObserver + ?Sized> CrawlObserver for Box<T> {
    fn on_dispatch(&mut self, task: &CrawlTask) {
        (**self).on_dispatch(task)
    }

    fn on_page(&mut self, result: &CrawlResult) {
        (**self).on_page(result)
    }

    fn on_error(&mut self, error: &CrawlError) {
        (**self).on_error(error)
    }

    fn on_complete(&mut self, stats: &CrawlStats) {
        (**self).on_complete(stats)
    }
}

/// A crawl event as delivered over a channel
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CrawlEvent {
    Dispatch(CrawlTask),
    Page(Box<CrawlResult>),
    Error(CrawlError),
    Complete(CrawlStats),
}

/// Forwards every callback as a [`CrawlEvent`] over an unbounded channel
///
/// Events sent after the receiver is dropped are discarded.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    sender: UnboundedSender<CrawlEvent>,
}

impl ChannelObserver {
    /// Creates an observer and the receiving end of its channel
    pub fn channel() -> (Self, UnboundedReceiver<CrawlEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    fn send(&self, event: CrawlEvent) {
        let _ = self.sender.send(event);
    }
}

impl CrawlObserver for ChannelObserver {
    fn on_dispatch(&mut self, task: &CrawlTask) {
        self.send(CrawlEvent::Dispatch(task.clone()));
    }

    fn on_page(&mut self, result: &CrawlResult) {
        self.send(CrawlEvent::Page(Box::new(result.clone())));
    }

    fn on_error(&mut self, error: &CrawlError) {
        self.send(CrawlEvent::Error(error.clone()));
    }

    fn on_complete(&mut self, stats: &CrawlStats) {
        self.send(CrawlEvent::Complete(stats.clone()));
    }
}
