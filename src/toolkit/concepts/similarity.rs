

use thiserror::Error;


#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimilarityError {
    #[error("Vector dimension mismatch: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },
}


/// Cosine of the angle between two vectors, in [-1, 1]. Zero when either
/// vector has zero magnitude.
pub fn cosine_similarity(vec1: &[f32], vec2: &[f32]) -> Result<f64, SimilarityError> {
    if vec1.len() != vec2.len() {
        return Err(SimilarityError::DimensionMismatch {
            left: vec1.len(),
            right: vec2.len(),
        });
    }

    let mut dot = 0.0_f64;
    let mut mag1 = 0.0_f64;
    let mut mag2 = 0.0_f64;
    for (a, b) in vec1.iter().zip(vec2) {
        let (a, b) = (f64::from(*a), f64::from(*b));
        dot += a * b;
        mag1 += a * a;
        mag2 += b * b;
    }

    if mag1 == 0.0 || mag2 == 0.0 {
        return Ok(0.0);
    }

    Ok((dot / (mag1.sqrt() * mag2.sqrt())).clamp(-1.0, 1.0))
}


pub fn batch_cosine_similarity(
    query: &[f32],
    candidates: &[Vec<f32>],
) -> Result<Vec<f64>, SimilarityError> {
    candidates
        .iter()
        .map(|candidate| cosine_similarity(query, candidate))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_and_opposite() {
        let v = [0.3_f32, -1.2, 4.0];
        let neg: Vec<f32> = v.iter().map(|x| -x).collect();
        assert!((cosine_similarity(&v, &v).unwrap() - 1.0).abs() < 1e-9);
        assert!((cosine_similarity(&v, &neg).unwrap() + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_orthogonal_is_zero() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).unwrap(), 0.0);
    }

    #[test]
    fn test_zero_magnitude_is_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]).unwrap(), 0.0);
        assert_eq!(cosine_similarity(&[], &[]).unwrap(), 0.0);
    }

    #[test]
    fn test_dimension_mismatch_fails() {
        assert_eq!(
            cosine_similarity(&[1.0, 2.0], &[1.0, 2.0, 3.0]),
            Err(SimilarityError::DimensionMismatch { left: 2, right: 3 })
        );
        assert!(batch_cosine_similarity(&[1.0], &[vec![1.0], vec![1.0, 0.0]]).is_err());
    }

    #[test]
    fn test_always_within_unit_range() {
        let samples: [&[f32]; 5] = [
            &[1e-20, 3e-20, -2e-20],
            &[3.4e38, 3.4e38, 1.0],
            &[-7.0, 0.5, 0.25],
            &[1.0, 1.0, 1.0],
            &[0.1, -0.1, 1e10],
        ];
        for a in samples {
            for b in samples {
                let sim = cosine_similarity(a, b).unwrap();
                assert!((-1.0..=1.0).contains(&sim), "{sim} out of range");
            }
        }
    }
}
