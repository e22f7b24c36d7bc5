pub mod aggregator;
pub mod champion_stats;
pub mod predictions;
pub mod scorer;
pub mod snapshot;
pub mod synergy;
