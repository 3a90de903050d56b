//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `DelayManager` / `DomainState`: per-domain politeness bookkeeping
//! - `StateManager` / `CrawlState`: checkpointing the frontier, visited set,
//!   and statistics so an interrupted crawl can resume

mod checkpoint;
mod domain_state;

pub use checkpoint::{crawl_identity, CrawlState, StateManager, STATE_VERSION};
pub use domain_state::{DelayManager, DomainState};
