use ndarray::{Array2, ArrayBase, DataMut, Dimension};
use thiserror::Error;

use crate::source::ContactRecord;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MatrixError {
    #[error("no contact records")]
    EmptyInput,
    #[error("resolution must be positive")]
    ZeroResolution,
    #[error("bin ({row}, {col}) outside matrix of shape ({rows}, {cols})")]
    BinOutOfRange {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },
    #[error("shape mismatch: {left:?} vs {right:?}")]
    ShapeMismatch {
        left: Vec<usize>,
        right: Vec<usize>,
    },
}

/// How the dimensions of a reconstructed matrix are chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatrixShape {
    /// (max row index + 1, max col index + 1) over the records
    Observed,
    /// Fixed (rows, cols), normally the bin counts of the two chromosomes
    Declared(usize, usize),
}

/// Replace NaN and infinite entries with 0
pub fn zero_non_finite<S, D>(a: &mut ArrayBase<S, D>)
where
    S: DataMut<Elem = f64>,
    D: Dimension,
{
    a.mapv_inplace(|x| if x.is_finite() { x } else { 0.0 })
}

/// Build a dense contact matrix from sparse records.
///
/// Bin coordinates are divided by `res` to give matrix indices.  Records
/// falling on the same cell are summed.  Non-finite cells are zeroed
/// after accumulation.
pub fn reconstruct(
    records: &[ContactRecord],
    res: u32,
    shape: MatrixShape,
) -> Result<Array2<f64>, MatrixError> {
    if res == 0 {
        return Err(MatrixError::ZeroResolution);
    }
    let res = res as u64;
    let ix = |r: &ContactRecord| ((r.bin_x / res) as usize, (r.bin_y / res) as usize);

    let (rows, cols) = match shape {
        MatrixShape::Declared(rows, cols) => (rows, cols),
        MatrixShape::Observed => records
            .iter()
            .map(ix)
            .reduce(|(r1, c1), (r2, c2)| (r1.max(r2), c1.max(c2)))
            .map(|(r, c)| (r + 1, c + 1))
            .ok_or(MatrixError::EmptyInput)?,
    };

    let mut m = Array2::zeros((rows, cols));
    for rec in records {
        let (row, col) = ix(rec);
        let cell = m
            .get_mut((row, col))
            .ok_or(MatrixError::BinOutOfRange {
                row,
                col,
                rows,
                cols,
            })?;
        *cell += rec.counts;
    }
    zero_non_finite(&mut m);
    Ok(m)
}
