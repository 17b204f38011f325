/// Converts a power ratio to dB.
pub fn db(x: f64) -> f64 {
    10.0 * x.log10()
}

/// Converts dB to a power ratio.
pub fn linear(x_db: f64) -> f64 {
    10.0_f64.powf(0.1 * x_db)
}

/// Counts the positions in which two bit sequences differ.
///
/// # Panics
///
/// Panics if the sequences have different lengths.
pub fn hamming_distance(a: &[u8], b: &[u8]) -> usize {
    assert_eq!(a.len(), b.len());
    a.iter().zip(b.iter()).filter(|(x, y)| x != y).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_linear_inverse() {
        for x in [1e-9, 0.5, 1.0, 3.0, 1e7] {
            assert!((linear(db(x)) - x).abs() / x < 1e-12);
        }
        assert!((db(100.0) - 20.0).abs() < 1e-12);
    }

    #[test]
    fn hamming() {
        assert_eq!(hamming_distance(&[0, 1, 1, 0], &[0, 1, 0, 1]), 2);
        assert_eq!(hamming_distance(&[], &[]), 0);
    }
}
