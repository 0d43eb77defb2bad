//! Candidate schedule generation.

use ps_types::{Candidate, SweepConfig};

/// Ordered, finite candidate schedule: the primary half-open range
/// `[low, high)` followed by the supplementary re-verification sizes.
///
/// No deduplication: a supplementary size that also falls inside the range
/// is evaluated twice on purpose. The returned order is the order results
/// are reported in, not necessarily completion order.
pub fn candidate_schedule(config: &SweepConfig) -> Vec<Candidate> {
    let (low, high) = config.image_size_range;
    let mut schedule: Vec<Candidate> = (low..high).collect();
    schedule.extend(&config.supplementary_sizes);
    schedule
}
