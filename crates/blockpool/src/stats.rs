//! Large-allocation accounting and the diagnostics report.

use core::fmt;
use core::sync::atomic::{AtomicUsize, Ordering};

/// Running totals for requests that bypassed the bucket/page system.
///
/// Relaxed counters: the report is a snapshot, not a synchronization
/// point.
#[derive(Debug)]
pub(crate) struct LargeStats {
    count: AtomicUsize,
    bytes: AtomicUsize,
    min: AtomicUsize,
    max: AtomicUsize,
}

impl LargeStats {
    pub(crate) const fn new() -> Self {
        Self {
            count: AtomicUsize::new(0),
            bytes: AtomicUsize::new(0),
            min: AtomicUsize::new(usize::MAX),
            max: AtomicUsize::new(0),
        }
    }

    /// Records one oversized request of `size` bytes.
    pub(crate) fn record(&self, size: usize) {
        self.count.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(size, Ordering::Relaxed);
        self.min.fetch_min(size, Ordering::Relaxed);
        self.max.fetch_max(size, Ordering::Relaxed);
    }

    /// (count, bytes, min, max); min/max are `None` until the first
    /// oversized request.
    pub(crate) fn snapshot(&self) -> (usize, usize, Option<usize>, Option<usize>) {
        let count = self.count.load(Ordering::Relaxed);
        let bytes = self.bytes.load(Ordering::Relaxed);
        if count == 0 {
            (0, bytes, None, None)
        } else {
            (
                count,
                bytes,
                Some(self.min.load(Ordering::Relaxed)),
                Some(self.max.load(Ordering::Relaxed)),
            )
        }
    }
}

/// Read-only usage summary of a [`BlockPool`](crate::BlockPool).
///
/// Produced by [`BlockPool::report`](crate::BlockPool::report); rendering
/// it (`Display`) yields the human-readable form. Where the text ends up
/// is the caller's business.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolReport {
    /// Pages ever created: the two active slots plus the archive.
    pub page_count: usize,
    /// Uniform page capacity in bytes.
    pub page_size: usize,
    /// `page_count * page_size`.
    pub reserved_bytes: usize,
    /// Bytes never carved, summed over active and archived pages.
    pub unused_bytes: usize,
    /// Requests that bypassed the pool.
    pub large_count: usize,
    /// Total bytes requested by those allocations.
    pub large_bytes: usize,
    /// Smallest oversized request, once any occurred.
    pub large_min: Option<usize>,
    /// Largest oversized request, once any occurred.
    pub large_max: Option<usize>,
}

impl PoolReport {
    /// Unused share of reserved storage, in whole percent.
    pub fn unused_percent(&self) -> usize {
        if self.reserved_bytes == 0 {
            0
        } else {
            self.unused_bytes * 100 / self.reserved_bytes
        }
    }
}

impl fmt::Display for PoolReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "block pool")?;
        writeln!(
            f,
            "  allocated: {} pages x {} B ({} B)",
            self.page_count, self.page_size, self.reserved_bytes
        )?;
        writeln!(f, "  unused: {} B ({}%)", self.unused_bytes, self.unused_percent())?;
        writeln!(
            f,
            "  large blocks: {} ({} B total)",
            self.large_count, self.large_bytes
        )?;
        if let (Some(min), Some(max)) = (self.large_min, self.large_max) {
            writeln!(f, "  large block range: {min} - {max}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn min_max_settle_after_first_record() {
        let stats = LargeStats::new();
        assert_eq!(stats.snapshot(), (0, 0, None, None));

        stats.record(2048);
        stats.record(1500);
        stats.record(9000);
        assert_eq!(stats.snapshot(), (3, 12548, Some(1500), Some(9000)));
    }

    #[test]
    fn report_renders_every_line() {
        let report = PoolReport {
            page_count: 3,
            page_size: 16 * 1024,
            reserved_bytes: 3 * 16 * 1024,
            unused_bytes: 4096,
            large_count: 2,
            large_bytes: 5000,
            large_min: Some(1100),
            large_max: Some(3900),
        };
        let text = report.to_string();
        assert!(text.contains("3 pages"));
        assert!(text.contains("unused: 4096 B (8%)"));
        assert!(text.contains("large block range: 1100 - 3900"));
    }

    #[test]
    fn range_line_is_omitted_without_large_blocks() {
        let report = PoolReport {
            page_count: 2,
            page_size: 1024 + 8,
            reserved_bytes: 2 * (1024 + 8),
            unused_bytes: 2 * (1024 + 8),
            large_count: 0,
            large_bytes: 0,
            large_min: None,
            large_max: None,
        };
        assert_eq!(report.unused_percent(), 100);
        assert!(!report.to_string().contains("range"));
    }
}
