//! Fixed train/test split.

/// Index separating train from test for a non-shuffled split: the first
/// `n - ceil(n * test_fraction)` samples train, the tail tests. No
/// reshuffling, so repeated runs with identical inputs are reproducible
/// and comparable across candidates.
pub fn split_point(n: usize, test_fraction: f64) -> usize {
    let test = ((n as f64) * test_fraction).ceil() as usize;
    n.saturating_sub(test)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn twenty_samples_split_sixteen_four() {
        assert_eq!(split_point(20, 0.2), 16);
    }

    #[test]
    fn rounds_test_size_up() {
        // 21 * 0.2 = 4.2 -> 5 test samples
        assert_eq!(split_point(21, 0.2), 16);
    }

    #[test]
    fn small_counts() {
        assert_eq!(split_point(1, 0.2), 0);
        assert_eq!(split_point(0, 0.2), 0);
        assert_eq!(split_point(5, 0.2), 4);
    }
}
