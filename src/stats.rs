//! Per-region counters for diagnostics.
//!
//! [`RegionStats`] mixes cumulative counters, updated as operations run, with
//! a snapshot of the free space layout taken when the stats are read.

/// Usage statistics of one [`crate::MemoryRegion`].
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct RegionStats {
    /// Blocks currently handed out, stealable ones included.
    pub live_allocations: u64,
    /// Successful allocations since creation.
    pub total_allocations: u64,
    /// Allocations that ended in out of memory.
    pub failed_allocations: u64,
    /// Stealable objects reclaimed.
    pub steals: u64,
    /// Times a stealable refused to be reclaimed during a pass.
    pub refused_thefts: u64,
    /// Free spans dropped because the empty space index was full.
    pub orphaned_spaces: u64,
    /// Free payload bytes in the arena, tracked or not.
    pub free_bytes: u64,
    /// Records currently in the empty space index.
    pub empty_spaces: usize,
    /// Longest free span the index knows about.
    pub largest_empty_space: u32,
}

impl RegionStats {
    pub(crate) fn record_allocation(&mut self) {
        self.total_allocations += 1;
        self.live_allocations += 1;
    }

    pub(crate) fn record_failure(&mut self) {
        self.failed_allocations += 1;
    }

    pub(crate) fn record_release(&mut self) {
        self.live_allocations = self.live_allocations.saturating_sub(1);
    }

    pub(crate) fn record_steal(&mut self) {
        self.steals += 1;
        self.record_release();
    }

    pub(crate) fn record_refusal(&mut self) {
        self.refused_thefts += 1;
    }

    pub(crate) fn record_orphan(&mut self) {
        self.orphaned_spaces += 1;
    }

    /// Returns a human-readable summary.
    pub fn summary(&self) -> String {
        let free_kb = self.free_bytes as f64 / 1024.0;
        format!(
            "{} live ({} total, {} failed), {} steals ({} refused), \
             {:.1} KB free in {} spans (largest {}), {} orphaned",
            self.live_allocations,
            self.total_allocations,
            self.failed_allocations,
            self.steals,
            self.refused_thefts,
            free_kb,
            self.empty_spaces,
            self.largest_empty_space,
            self.orphaned_spaces,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let s = RegionStats::default();
        assert_eq!(s.live_allocations, 0);
        assert_eq!(s.steals, 0);
    }

    #[test]
    fn test_steal_releases() {
        let mut s = RegionStats::default();
        s.record_allocation();
        s.record_allocation();
        s.record_steal();
        assert_eq!(s.live_allocations, 1);
        assert_eq!(s.total_allocations, 2);
        assert_eq!(s.steals, 1);
    }

    #[test]
    fn test_release_saturates() {
        let mut s = RegionStats::default();
        s.record_release();
        assert_eq!(s.live_allocations, 0);
    }

    #[test]
    fn test_summary() {
        let mut s = RegionStats::default();
        s.record_allocation();
        s.record_refusal();
        s.free_bytes = 2048;
        let summary = s.summary();
        assert!(summary.contains("1 live"));
        assert!(summary.contains("1 refused"));
        assert!(summary.contains("2.0 KB free"));
    }
}
