use std::str::FromStr;

use ndarray::{s, Array1, Array2, Zip};

use crate::matrix::MatrixError;

/// What to do when the two operands of a comparison differ in shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MismatchPolicy {
    /// Zero pad both operands to the union shape
    Pad,
    /// Refuse the comparison
    Skip,
}

impl FromStr for MismatchPolicy {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pad" => Ok(Self::Pad),
            "skip" => Ok(Self::Skip),
            _ => Err("no match"),
        }
    }
}

/// Sum, mean and maximum of the elementwise absolute differences
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiffStats {
    pub sum: f64,
    pub mean: f64,
    pub max: f64,
}

impl DiffStats {
    fn from_abs_diff(d: &Array1<f64>) -> Self {
        let sum = d.sum();
        let mean = if d.is_empty() { 0.0 } else { sum / d.len() as f64 };
        let max = d.iter().copied().fold(0.0, f64::max);
        Self { sum, mean, max }
    }
}

fn pad_matrix(m: &Array2<f64>, shape: (usize, usize)) -> Array2<f64> {
    let (r, c) = m.dim();
    let mut p = Array2::zeros(shape);
    p.slice_mut(s![..r, ..c]).assign(m);
    p
}

fn pad_vector(v: &Array1<f64>, n: usize) -> Array1<f64> {
    let mut p = Array1::zeros(n);
    p.slice_mut(s![..v.len()]).assign(v);
    p
}

/// sum(|a - b|) over all cells
pub fn matrix_abs_diff_sum(
    a: &Array2<f64>,
    b: &Array2<f64>,
    policy: MismatchPolicy,
) -> Result<f64, MatrixError> {
    let abs_diff_sum = |x: &Array2<f64>, y: &Array2<f64>| {
        Zip::from(x)
            .and(y)
            .fold(0.0, |acc, p, q| acc + (p - q).abs())
    };

    if a.dim() == b.dim() {
        Ok(abs_diff_sum(a, b))
    } else if policy == MismatchPolicy::Pad {
        let (ra, ca) = a.dim();
        let (rb, cb) = b.dim();
        let shape = (ra.max(rb), ca.max(cb));
        trace!("Padding {:?} and {:?} to {:?}", a.dim(), b.dim(), shape);
        Ok(abs_diff_sum(&pad_matrix(a, shape), &pad_matrix(b, shape)))
    } else {
        Err(MatrixError::ShapeMismatch {
            left: a.shape().to_vec(),
            right: b.shape().to_vec(),
        })
    }
}

/// Elementwise absolute difference statistics for two normalization vectors.
///
/// An absent vector is compared as a zero vector of the other's length.
/// Returns Ok(None) when both are absent.
pub fn vector_diff(
    a: Option<&Array1<f64>>,
    b: Option<&Array1<f64>>,
    policy: MismatchPolicy,
) -> Result<Option<DiffStats>, MatrixError> {
    let d = match (a, b) {
        (None, None) => return Ok(None),
        (Some(v), None) | (None, Some(v)) => v.mapv(f64::abs),
        (Some(x), Some(y)) if x.len() == y.len() => (x - y).mapv(f64::abs),
        (Some(x), Some(y)) => {
            if policy == MismatchPolicy::Skip {
                return Err(MatrixError::ShapeMismatch {
                    left: vec![x.len()],
                    right: vec![y.len()],
                });
            }
            let n = x.len().max(y.len());
            (pad_vector(x, n) - pad_vector(y, n)).mapv(f64::abs)
        }
    };
    Ok(Some(DiffStats::from_abs_diff(&d)))
}

#[cfg(test)]
mod tests {
    use super::*;

    use ndarray::array;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn policy_names() {
        assert_eq!("PAD".parse::<MismatchPolicy>(), Ok(MismatchPolicy::Pad));
        assert_eq!("skip".parse::<MismatchPolicy>(), Ok(MismatchPolicy::Skip));
        assert!("drop".parse::<MismatchPolicy>().is_err());
    }

    #[test]
    fn identical_matrices_have_no_error() {
        let a = array![[1.0, 2.0], [3.0, 4.0]];
        assert_eq!(matrix_abs_diff_sum(&a, &a.clone(), MismatchPolicy::Skip), Ok(0.0));
    }

    #[rstest]
    #[case(MismatchPolicy::Pad)]
    #[case(MismatchPolicy::Skip)]
    fn matrix_difference_is_symmetric(#[case] policy: MismatchPolicy) {
        let a = array![[1.0, -2.0], [3.0, 4.0]];
        let b = array![[0.5, 2.0], [3.0, 10.0]];
        let ab = matrix_abs_diff_sum(&a, &b, policy).unwrap();
        assert_eq!(ab, 0.5 + 4.0 + 0.0 + 6.0);
        assert_eq!(ab, matrix_abs_diff_sum(&b, &a, policy).unwrap());
    }

    #[test]
    fn mismatched_matrices_are_padded() {
        let a = array![[7.0]];
        let b = array![[10.0, 1.0], [2.0, 0.0]];
        assert_eq!(matrix_abs_diff_sum(&a, &b, MismatchPolicy::Pad), Ok(6.0));
        assert_eq!(matrix_abs_diff_sum(&b, &a, MismatchPolicy::Pad), Ok(6.0));
    }

    #[test]
    fn mismatched_matrices_can_be_refused() {
        let a = array![[7.0]];
        let b = array![[10.0, 1.0]];
        assert_eq!(
            matrix_abs_diff_sum(&a, &b, MismatchPolicy::Skip),
            Err(MatrixError::ShapeMismatch {
                left: vec![1, 1],
                right: vec![1, 2]
            })
        );
    }

    #[test]
    fn vector_stats() {
        let a = array![1.0, 2.0, 3.0, 4.0];
        let b = array![1.0, 4.0, 2.0, 4.0];
        let d = vector_diff(Some(&a), Some(&b), MismatchPolicy::Skip)
            .unwrap()
            .unwrap();
        assert_eq!(
            d,
            DiffStats {
                sum: 3.0,
                mean: 0.75,
                max: 2.0
            }
        );
        let e = vector_diff(Some(&b), Some(&a), MismatchPolicy::Skip)
            .unwrap()
            .unwrap();
        assert_eq!(d, e);
    }

    #[test]
    fn absent_vector_compares_against_zero() {
        let a = array![1.0, -3.0];
        let expected = DiffStats {
            sum: 4.0,
            mean: 2.0,
            max: 3.0,
        };
        assert_eq!(
            vector_diff(Some(&a), None, MismatchPolicy::Skip),
            Ok(Some(expected))
        );
        assert_eq!(
            vector_diff(None, Some(&a), MismatchPolicy::Skip),
            Ok(Some(expected))
        );
        assert_eq!(vector_diff(None, None, MismatchPolicy::Skip), Ok(None));
    }

    #[test]
    fn vectors_of_different_length() {
        let a = array![1.0, 1.0];
        let b = array![1.0, 2.0, 5.0];
        assert_eq!(
            vector_diff(Some(&a), Some(&b), MismatchPolicy::Pad),
            Ok(Some(DiffStats {
                sum: 6.0,
                mean: 2.0,
                max: 5.0
            }))
        );
        assert!(vector_diff(Some(&a), Some(&b), MismatchPolicy::Skip).is_err());
    }
}
