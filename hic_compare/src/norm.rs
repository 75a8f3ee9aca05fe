use ndarray::Array1;

use crate::{
    matrix::zero_non_finite,
    source::{FetchError, RecordSource},
};

/// Result of looking up a normalization vector
#[derive(Debug, Clone, PartialEq)]
pub enum NormLookup {
    Found(Array1<f64>),
    // Vector of length <= 1
    TooShort,
    Unavailable(FetchError),
}

impl NormLookup {
    pub fn vector(&self) -> Option<&Array1<f64>> {
        match self {
            Self::Found(v) => Some(v),
            _ => None,
        }
    }

    /// The fetch error, unless it only says the scheme has no vector here
    pub fn fetch_failure(&self) -> Option<&FetchError> {
        match self {
            Self::Unavailable(FetchError::MissingNormalization { .. }) => None,
            Self::Unavailable(e) => Some(e),
            _ => None,
        }
    }
}

/// Wrap a raw vector, treating vectors with fewer than two entries as absent
pub fn sanitize_norm_vector(v: Vec<f64>) -> NormLookup {
    if v.len() > 1 {
        let mut a = Array1::from(v);
        zero_non_finite(&mut a);
        NormLookup::Found(a)
    } else {
        NormLookup::TooShort
    }
}

/// Get the `norm` normalization vector for `chrom` at resolution `res`.
///
/// Fetch failures are not errors here; they come back as
/// `NormLookup::Unavailable` so that the caller can count them.
pub fn get_norm_vector<S: RecordSource>(src: &S, chrom: &str, norm: &str, res: u32) -> NormLookup {
    match src.norm_footer(chrom, chrom, norm, res) {
        Ok(footer) => sanitize_norm_vector(footer.c1_norm),
        Err(e) => {
            debug!("{}: {}", src.name(), e);
            NormLookup::Unavailable(e)
        }
    }
}
