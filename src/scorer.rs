use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScoreError {
    #[error("embedding length mismatch: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },
    #[error("zero-magnitude embedding cannot be scored")]
    DegenerateVector,
}

/// Cosine distance between two embeddings: `1 - (a·b)/(‖a‖·‖b‖)`.
///
/// Inputs are not assumed to be normalized. The cosine is clamped to
/// `[-1, 1]` before subtraction, so the result is always in `[0, 2]`.
/// Vectors of unequal length or with zero/non-finite magnitude are
/// rejected instead of producing NaN.
pub fn distance(a: &[f32], b: &[f32]) -> Result<f32, ScoreError> {
    if a.len() != b.len() {
        return Err(ScoreError::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }

    let mut dot = 0.0f32;
    let mut norm_sq_a = 0.0f32;
    let mut norm_sq_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_sq_a += x * x;
        norm_sq_b += y * y;
    }

    if !norm_sq_a.is_finite() || !norm_sq_b.is_finite() || norm_sq_a <= 0.0 || norm_sq_b <= 0.0 {
        return Err(ScoreError::DegenerateVector);
    }

    let cos = (dot / (norm_sq_a * norm_sq_b).sqrt()).clamp(-1.0, 1.0);
    Ok(1.0 - cos)
}

/// Checks that a vector is scoreable: finite values, nonzero magnitude.
pub fn validate(v: &[f32]) -> Result<(), ScoreError> {
    let norm_sq: f32 = v.iter().map(|x| x * x).sum();
    if !norm_sq.is_finite() || norm_sq <= 0.0 {
        return Err(ScoreError::DegenerateVector);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_distance_is_zero() {
        let v = [0.3f32, -0.5, 0.2, 0.7];
        let d = distance(&v, &v).unwrap();
        assert!(d.abs() < 1e-6, "got {d}");
    }

    #[test]
    fn distance_is_symmetric() {
        let a = [0.1f32, 0.9, 0.4];
        let b = [0.8f32, 0.2, -0.3];
        assert_eq!(distance(&a, &b).unwrap(), distance(&b, &a).unwrap());
    }

    #[test]
    fn orthogonal_vectors_are_distance_one() {
        let a = [1.0f32, 0.0];
        let b = [0.0f32, 1.0];
        assert_eq!(distance(&a, &b).unwrap(), 1.0);
    }

    #[test]
    fn opposite_vectors_are_distance_two() {
        let a = [1.0f32, 0.0];
        let b = [-1.0f32, 0.0];
        assert_eq!(distance(&a, &b).unwrap(), 2.0);
    }

    #[test]
    fn exact_half_distance_from_integer_norms() {
        // dot 1, squared norms 2 and 2: denominator sqrt(4) is exact,
        // so the distance is exactly 0.5
        let a = [1.0f32, 1.0, 0.0];
        let b = [1.0f32, 0.0, 1.0];
        assert_eq!(distance(&a, &b).unwrap(), 0.5);
    }

    #[test]
    fn length_mismatch_is_an_error() {
        let a = [1.0f32, 0.0];
        let b = [1.0f32, 0.0, 0.0];
        assert_eq!(
            distance(&a, &b),
            Err(ScoreError::DimensionMismatch { left: 2, right: 3 })
        );
    }

    #[test]
    fn zero_vector_is_degenerate() {
        let a = [0.0f32, 0.0, 0.0];
        let b = [1.0f32, 0.0, 0.0];
        assert_eq!(distance(&a, &b), Err(ScoreError::DegenerateVector));
        assert_eq!(distance(&b, &a), Err(ScoreError::DegenerateVector));
    }

    #[test]
    fn nan_input_is_degenerate() {
        let a = [f32::NAN, 1.0];
        let b = [1.0f32, 0.0];
        assert_eq!(distance(&a, &b), Err(ScoreError::DegenerateVector));
    }

    #[test]
    fn validate_rejects_zero_and_nan() {
        assert!(validate(&[0.5, 0.5]).is_ok());
        assert_eq!(validate(&[0.0, 0.0]), Err(ScoreError::DegenerateVector));
        assert_eq!(validate(&[f32::NAN]), Err(ScoreError::DegenerateVector));
    }
}
