use crate::{
    error::{Result, RobustnessError},
    fingerprint::Fingerprint,
};

pub const MAX_SCORE: f64 = 100.0;

/// Number of differing bits. Fingerprints of different lengths were not
/// produced by the same extractor and cannot be compared.
pub fn distance(a: &Fingerprint, b: &Fingerprint) -> Result<u32> {
    if a.bit_len() != b.bit_len() {
        return Err(RobustnessError::FingerprintMismatch {
            left: a.bit_len(),
            right: b.bit_len(),
        });
    }

    Ok((a.bits() ^ b.bits()).count_ones())
}

/// Similarity in `[0, 100]`; 100 for identical fingerprints.
pub fn score(a: &Fingerprint, b: &Fingerprint) -> Result<f64> {
    let distance = distance(a, b)?;
    Ok(score_from_distance(distance, a.bit_len()))
}

pub fn score_from_distance(distance: u32, bit_len: u32) -> f64 {
    if bit_len == 0 {
        return 0.0;
    }
    let distance = distance.min(bit_len);

    (bit_len - distance) as f64 / bit_len as f64 * MAX_SCORE
}

/// Score of a pair where either side may be unavailable. A missing side
/// scores 0, the same value as a fully defeated hash.
pub fn score_pair(a: Option<&Fingerprint>, b: Option<&Fingerprint>) -> f64 {
    match (a, b) {
        (Some(a), Some(b)) => score(a, b).unwrap_or(0.0),
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp(bits: u64) -> Fingerprint {
        Fingerprint::new(bits, 64).unwrap()
    }

    #[test]
    fn test_identical_scores_100() {
        let a = fp(0xdead_beef_0123_4567);
        assert_eq!(distance(&a, &a).unwrap(), 0);
        assert_eq!(score(&a, &a).unwrap(), 100.0);
    }

    #[test]
    fn test_complement_scores_0() {
        let a = fp(0x0f0f_0f0f_0f0f_0f0f);
        let b = fp(!0x0f0f_0f0f_0f0f_0f0f);
        assert_eq!(distance(&a, &b).unwrap(), 64);
        assert_eq!(score(&a, &b).unwrap(), 0.0);
    }

    #[test]
    fn test_symmetric_and_bounded() {
        let samples = [0u64, 1, 0xff, 0xffff_0000_ffff_0000, u64::MAX, 0x8000_0000_0000_0001];
        for &x in &samples {
            for &y in &samples {
                let (a, b) = (fp(x), fp(y));
                let ab = score(&a, &b).unwrap();
                assert_eq!(ab, score(&b, &a).unwrap());
                assert!((0.0..=100.0).contains(&ab));
                assert!(distance(&a, &b).unwrap() <= 64);
            }
        }
    }

    #[test]
    fn test_strictly_decreasing_in_distance() {
        let scores = (0..=64).map(|d| score_from_distance(d, 64)).collect::<Vec<_>>();
        assert!(scores.windows(2).all(|w| w[0] > w[1]));
        assert_eq!(score_from_distance(16, 64), 75.0);
    }

    #[test]
    fn test_length_mismatch_is_an_error() {
        let a = Fingerprint::new(0b1010, 16).unwrap();
        let b = fp(0b1010);
        assert!(matches!(
            distance(&a, &b),
            Err(RobustnessError::FingerprintMismatch { left: 16, right: 64 })
        ));
    }

    #[test]
    fn test_absent_side_scores_zero() {
        let a = fp(42);
        assert_eq!(score_pair(Some(&a), None), 0.0);
        assert_eq!(score_pair(None, Some(&a)), 0.0);
        assert_eq!(score_pair(None, None), 0.0);
        assert_eq!(score_pair(Some(&a), Some(&a)), 100.0);
    }
}
