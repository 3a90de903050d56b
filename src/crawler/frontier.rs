//! Frontier for discovered-but-unfetched tasks
//!
//! The traversal strategy is a tagged variant behind one type:
//! - `BreadthFirst`: FIFO queues keyed by depth; the shallowest tier is served
//!   first, gated by a dispatch barrier on in-flight depths
//! - `DepthFirst`: a stack; the most recently discovered task is served first

use crate::config::Strategy;
use crate::crawler::types::CrawlTask;
use std::collections::{BTreeMap, VecDeque};

/// Ordered container of pending tasks, owned by the crawl loop
#[derive(Debug, Clone)]
pub enum Frontier {
    BreadthFirst(BTreeMap<u32, VecDeque<CrawlTask>>),
    DepthFirst(Vec<CrawlTask>),
}

impl Frontier {
    pub fn new(strategy: Strategy) -> Self {
        match strategy {
            Strategy::Bfs => Self::BreadthFirst(BTreeMap::new()),
            Strategy::Dfs => Self::DepthFirst(Vec::new()),
        }
    }

    /// Rebuilds a frontier from a snapshot taken with [`Frontier::snapshot`]
    pub fn from_snapshot(strategy: Strategy, tasks: Vec<CrawlTask>) -> Self {
        match strategy {
            Strategy::Bfs => {
                let mut frontier = Self::new(strategy);
                tasks.into_iter().for_each(|t| frontier.push(t));
                frontier
            }
            Strategy::Dfs => Self::DepthFirst(tasks.into_iter().rev().collect()),
        }
    }

    pub fn push(&mut self, task: CrawlTask) {
        match self {
            Self::BreadthFirst(tiers) => tiers.entry(task.depth).or_default().push_back(task),
            Self::DepthFirst(stack) => stack.push(task),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::BreadthFirst(tiers) => tiers.values().map(VecDeque::len).sum(),
            Self::DepthFirst(stack) => stack.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Tasks that may be dispatched now, ignoring politeness, in dispatch order
    ///
    /// For breadth-first traversal only the shallowest tier is a candidate,
    /// and only while no in-flight fetch is more than one level shallower:
    /// an in-flight depth-j fetch can still discover depth-(j+1) tasks, so
    /// depth j+2 must wait for it.
    pub fn candidates(&self, in_flight_min_depth: Option<u32>) -> Vec<&CrawlTask> {
        match self {
            Self::BreadthFirst(tiers) => {
                let Some((&depth, queue)) = tiers.iter().next() else {
                    return Vec::new();
                };
                if !barrier_open(depth, in_flight_min_depth) {
                    return Vec::new();
                }
                queue.iter().collect()
            }
            Self::DepthFirst(stack) => stack.iter().rev().collect(),
        }
    }

    /// Removes and returns the first candidate accepted by `eligible`
    ///
    /// Candidates rejected by `eligible` (typically a domain still cooling
    /// down) keep their position.
    pub fn pop_eligible<F>(
        &mut self,
        in_flight_min_depth: Option<u32>,
        mut eligible: F,
    ) -> Option<CrawlTask>
    where
        F: FnMut(&CrawlTask) -> bool,
    {
        match self {
            Self::BreadthFirst(tiers) => {
                let mut entry = tiers.first_entry()?;
                if !barrier_open(*entry.key(), in_flight_min_depth) {
                    return None;
                }

                let queue = entry.get_mut();
                let index = queue.iter().position(|t| eligible(t))?;
                let task = queue.remove(index);
                if queue.is_empty() {
                    entry.remove();
                }
                task
            }
            Self::DepthFirst(stack) => {
                let index = stack.iter().rposition(|t| eligible(t))?;
                Some(stack.remove(index))
            }
        }
    }

    /// All pending tasks in the order they would be dispatched
    pub fn snapshot(&self) -> Vec<CrawlTask> {
        match self {
            Self::BreadthFirst(tiers) => tiers.values().flatten().cloned().collect(),
            Self::DepthFirst(stack) => stack.iter().rev().cloned().collect(),
        }
    }
}

fn barrier_open(depth: u32, in_flight_min_depth: Option<u32>) -> bool {
    match in_flight_min_depth {
        Some(min) => min.saturating_add(1) >= depth,
        None => true,
    }
}
