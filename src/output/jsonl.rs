//! JSON-lines event sink
//!
//! Each observer callback becomes one line: the serialized
//! [`CrawlEvent`](crate::crawler::CrawlEvent), tagged by `event`.

use crate::crawler::{CrawlError, CrawlEvent, CrawlObserver, CrawlResult, CrawlStats, CrawlTask};
use crate::output::OutputResult;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Observer that appends every crawl event to a writer as JSON
///
/// Page bodies are omitted unless requested. Write failures are logged and
/// do not interrupt the crawl.
pub struct JsonLinesObserver<W: Write + Send> {
    writer: W,
    include_content: bool,
    include_dispatch: bool,
    lines: u64,
}

impl JsonLinesObserver<BufWriter<File>> {
    /// Creates (or truncates) a JSON-lines file
    pub fn create(path: &Path) -> OutputResult<Self> {
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write + Send> JsonLinesObserver<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            include_content: false,
            include_dispatch: false,
            lines: 0,
        }
    }

    /// Keep the page body in `page` events
    pub fn with_content(mut self, include: bool) -> Self {
        self.include_content = include;
        self
    }

    /// Also record `dispatch` events
    pub fn with_dispatch_events(mut self, include: bool) -> Self {
        self.include_dispatch = include;
        self
    }

    /// Number of lines written so far
    pub fn lines_written(&self) -> u64 {
        self.lines
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_event(&mut self, event: &CrawlEvent) -> OutputResult<()> {
        serde_json::to_writer(&mut self.writer, event)?;
        self.writer.write_all(b"\n")?;
        self.lines += 1;
        Ok(())
    }

    fn emit(&mut self, event: CrawlEvent) {
        if let Err(e) = self.write_event(&event) {
            tracing::warn!("Failed to write crawl event: {}", e);
        }
    }
}

impl<W: Write + Send> CrawlObserver for JsonLinesObserver<W> {
    fn on_dispatch(&mut self, task: &CrawlTask) {
        if self.include_dispatch {
            self.emit(CrawlEvent::Dispatch(task.clone()));
        }
    }

    fn on_page(&mut self, result: &CrawlResult) {
        let mut result = result.clone();
        if !self.include_content {
            result.content.clear();
        }
        self.emit(CrawlEvent::Page(Box::new(result)));
    }

    fn on_error(&mut self, error: &CrawlError) {
        self.emit(CrawlEvent::Error(error.clone()));
    }

    fn on_complete(&mut self, stats: &CrawlStats) {
        self.emit(CrawlEvent::Complete(stats.clone()));
        if let Err(e) = self.writer.flush() {
            tracing::warn!("Failed to flush crawl events: {}", e);
        }
    }
}
