/// Counters for a snapshot cache
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of snapshots currently held
    pub snapshot_count: usize,

    /// Encoded bytes held across all snapshots
    pub bytes_used: usize,

    /// Lookups that found a usable snapshot
    pub hits: u64,

    /// Lookups that found nothing
    pub misses: u64,

    /// Snapshots dropped to respect the per-page cap
    pub evictions: u64,

    /// Captures skipped because that scale was already stored
    pub duplicates: u64,
}

impl CacheStats {
    /// Calculate the cache hit rate (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate() {
        let stats = CacheStats { hits: 3, misses: 1, ..Default::default() };
        assert_eq!(stats.hit_rate(), 0.75);
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }
}
