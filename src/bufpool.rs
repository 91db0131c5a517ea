//! Size-bucketed buffer pool.
//!
//! Tiers are sorted ascending by capacity; [`BufferPool::acquire`] hands out
//! the smallest tier whose capacity is `>= size`, falling back to a one-off
//! allocation above the largest tier. Buffers larger than
//! [`MAX_POOLED_SIZE`] are dropped on [`release`](BufferPool::release)
//! rather than pooled, so one oversized response body can't pin down
//! permanent memory. Per-tier allocation/reuse counters are monotonic
//! `u64`s — exact under contention is not promised, only that they never go
//! backwards (see the concurrency open question in the spec).

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::BytesMut;

/// Buffers larger than this are discarded on return instead of pooled.
pub const MAX_POOLED_SIZE: usize = 1024 * 1024;

struct Tier {
    capacity: usize,
    free: Mutex<Vec<BytesMut>>,
    allocations: AtomicU64,
    reuses: AtomicU64,
}

/// A snapshot of one tier's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierStats {
    pub capacity: usize,
    pub allocations: u64,
    pub reuses: u64,
}

pub struct BufferPool {
    tiers: Vec<Tier>,
}

impl BufferPool {
    /// Builds a pool with exactly the given tier capacities, sorted and
    /// deduplicated.
    pub fn new(capacities: impl IntoIterator<Item = usize>) -> Self {
        let mut sizes: Vec<usize> = capacities.into_iter().collect();
        sizes.sort_unstable();
        sizes.dedup();
        let tiers = sizes
            .into_iter()
            .map(|capacity| Tier {
                capacity,
                free: Mutex::new(Vec::new()),
                allocations: AtomicU64::new(0),
                reuses: AtomicU64::new(0),
            })
            .collect();
        Self { tiers }
    }

    /// A reasonable default ladder for HTTP request/response bodies.
    pub fn with_default_tiers() -> Self {
        Self::new([256, 1024, 4096, 16 * 1024, 64 * 1024, 256 * 1024, MAX_POOLED_SIZE])
    }

    /// Hands out a cleared buffer with capacity `>= size`: a reused one if
    /// the smallest fitting tier has one free, otherwise a fresh allocation
    /// at that tier's capacity (or exactly `size` if it exceeds every tier).
    pub fn acquire(&self, size: usize) -> BytesMut {
        let Some(tier) = self.tiers.iter().find(|t| t.capacity >= size) else {
            return BytesMut::with_capacity(size);
        };
        let mut free = tier.free.lock().unwrap();
        if let Some(mut buf) = free.pop() {
            tier.reuses.fetch_add(1, Ordering::Relaxed);
            buf.clear();
            buf
        } else {
            tier.allocations.fetch_add(1, Ordering::Relaxed);
            BytesMut::with_capacity(tier.capacity)
        }
    }

    /// Returns a buffer to its tier, or drops it if it's larger than
    /// [`MAX_POOLED_SIZE`] or doesn't fit any configured tier.
    pub fn release(&self, buf: BytesMut) {
        if buf.capacity() > MAX_POOLED_SIZE {
            return;
        }
        if let Some(tier) = self.tiers.iter().find(|t| t.capacity >= buf.capacity()) {
            tier.free.lock().unwrap().push(buf);
        }
    }

    pub fn stats(&self) -> Vec<TierStats> {
        self.tiers
            .iter()
            .map(|t| TierStats {
                capacity: t.capacity,
                allocations: t.allocations.load(Ordering::Relaxed),
                reuses: t.reuses.load(Ordering::Relaxed),
            })
            .collect()
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::with_default_tiers()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_picks_smallest_fitting_tier() {
        let pool = BufferPool::new([64, 256, 1024]);
        let buf = pool.acquire(100);
        assert_eq!(buf.capacity(), 256);
    }

    #[test]
    fn release_then_acquire_reuses_and_counts() {
        let pool = BufferPool::new([256]);
        let buf = pool.acquire(10);
        pool.release(buf);
        let _ = pool.acquire(10);
        let stats = pool.stats();
        assert_eq!(stats[0].allocations, 1);
        assert_eq!(stats[0].reuses, 1);
    }

    #[test]
    fn oversized_buffer_is_not_pooled() {
        let pool = BufferPool::new([256]);
        let oversized = BytesMut::with_capacity(MAX_POOLED_SIZE + 1);
        pool.release(oversized);
        assert!(pool.stats()[0].reuses == 0);
    }

    #[test]
    fn size_above_every_tier_falls_back_to_one_off_allocation() {
        let pool = BufferPool::new([64]);
        let buf = pool.acquire(10_000);
        assert_eq!(buf.capacity(), 10_000);
    }
}
