//! Partitioning module for distributed crawls
//!
//! Every worker in a distributed crawl runs its own crawler with the same
//! configuration and a distinct `worker_id`. Ownership of a URL is a pure
//! function of its hash, so workers agree without talking to each other and a
//! restarted worker owns exactly the URLs it owned before.

/// Maps a URL hash to the worker that owns it
///
/// The first 16 hex digits of the hash are read as a big-endian `u64` and
/// reduced modulo `total_workers`. Hashes too short or not hex fall back to
/// worker 0. A `total_workers` of 0 or 1 always yields 0.
///
/// # Examples
///
/// ```
/// use trawler::assign_owner;
///
/// let hash = "ffffffffffffffff0000000000000000";
/// assert_eq!(assign_owner(hash, 4), (u64::MAX % 4) as u32);
/// assert_eq!(assign_owner(hash, 1), 0);
/// ```
pub fn assign_owner(hash: &str, total_workers: u32) -> u32 {
    if total_workers <= 1 {
        return 0;
    }

    let prefix = hash.get(..16).unwrap_or(hash);
    let value = u64::from_str_radix(prefix, 16).unwrap_or(0);

    (value % u64::from(total_workers)) as u32
}

/// A worker's view of the partition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partitioner {
    worker_id: u32,
    total_workers: u32,
}

impl Partitioner {
    pub fn new(worker_id: u32, total_workers: u32) -> Self {
        Self {
            worker_id,
            total_workers: total_workers.max(1),
        }
    }

    /// Returns true if this worker is responsible for the URL hash
    pub fn owns(&self, hash: &str) -> bool {
        assign_owner(hash, self.total_workers) == self.worker_id
    }

    /// Returns true when more than one worker shares the URL space
    pub fn is_distributed(&self) -> bool {
        self.total_workers > 1
    }

    pub fn worker_id(&self) -> u32 {
        self.worker_id
    }

    pub fn total_workers(&self) -> u32 {
        self.total_workers
    }
}
