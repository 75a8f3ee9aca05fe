use std::fmt::{self, Formatter};

use crate::{
    process::Comparison,
    sweep::{MatrixSweep, NormSweep, VectorCounts, VectorOutcome},
};

const ACROSS_ALL: &str = "across all normalization vectors, all chromosomes, all resolutions";

struct OptF64(Option<f64>);

impl fmt::Display for OptF64 {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(x) => write!(f, "{}", x),
            None => write!(f, "NA"),
        }
    }
}

impl fmt::Display for VectorCounts {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "compared: {}, present in one file only: {}, absent from both files: {}, skipped: {}",
            self.compared, self.one_sided, self.absent, self.skipped
        )
    }
}

fn join<T: fmt::Display>(v: &[T]) -> String {
    v.iter()
        .map(|x| x.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Human readable report of a comparison
pub struct Report<'a> {
    cmp: &'a Comparison,
    detail: bool,
}

impl<'a> Report<'a> {
    pub fn new(cmp: &'a Comparison, detail: bool) -> Self {
        Self { cmp, detail }
    }

    fn fmt_matrices(&self, f: &mut Formatter<'_>, sweep: &MatrixSweep) -> fmt::Result {
        for rt in sweep.resolutions.iter() {
            if self.detail {
                for p in rt.pairs.iter() {
                    match &p.outcome {
                        Ok(e) => writeln!(
                            f,
                            "CHR {} CHR {} RES {} ERROR {}",
                            p.chrom_a, p.chrom_b, p.res, e
                        )?,
                        Err(e) => writeln!(
                            f,
                            "CHR {} CHR {} RES {} SKIPPED ({})",
                            p.chrom_a, p.chrom_b, p.res, e
                        )?,
                    }
                }
            }
            writeln!(
                f,
                "Total error between entries for resolution {}: {} (chromosome pairs compared: {}, skipped: {})",
                rt.res, rt.error, rt.tally.compared, rt.tally.skipped
            )?
        }
        writeln!(
            f,
            "Total error for matrices across all resolutions: {} (chromosome pairs compared: {}, skipped: {})",
            sweep.total, sweep.tally.compared, sweep.tally.skipped
        )
    }

    fn fmt_norms(&self, f: &mut Formatter<'_>, sweep: &NormSweep) -> fmt::Result {
        for nt in sweep.norms.iter() {
            if self.detail {
                for v in nt.vectors.iter() {
                    write!(f, "NORM {} CHR {} RES {} ", v.norm, v.chrom, v.res)?;
                    match &v.outcome {
                        VectorOutcome::Compared(d) => writeln!(
                            f,
                            "ERROR {} MEAN ERROR {} MAX ERROR {}",
                            d.sum, d.mean, d.max
                        )?,
                        VectorOutcome::OneSided(d) => writeln!(
                            f,
                            "ERROR {} MEAN ERROR {} MAX ERROR {} (present in one file only)",
                            d.sum, d.mean, d.max
                        )?,
                        VectorOutcome::Absent => writeln!(f, "ABSENT")?,
                        VectorOutcome::Skipped(e) => writeln!(f, "SKIPPED ({})", e)?,
                    }
                }
            }
            writeln!(
                f,
                "NORM {} ERROR {} MEAN ERROR {} ({})",
                nt.norm,
                nt.pool.total,
                OptF64(nt.pool.mean_error()),
                nt.pool.counts
            )?
        }
        writeln!(f, "Total error {}: {}", ACROSS_ALL, sweep.pool.total)?;
        writeln!(f, "Mean error {}: {}", ACROSS_ALL, OptF64(sweep.pool.mean_error()))?;
        writeln!(f, "Max error {}: {}", ACROSS_ALL, OptF64(sweep.pool.max_error()))?;
        writeln!(f, "Normalization vectors {}", sweep.pool.counts)
    }
}

impl<'a> fmt::Display for Report<'a> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let cmp = self.cmp;
        if let Some(sweep) = cmp.matrices.as_ref() {
            self.fmt_matrices(f, sweep)?
        }
        writeln!(f, "Chromosomes: {}", join(&cmp.chromosomes))?;
        writeln!(f, "Resolutions: {}", join(&cmp.resolutions))?;
        writeln!(f, "Normalizations: {}", join(&cmp.norms))?;
        if let Some(sweep) = cmp.norm_vectors.as_ref() {
            self.fmt_norms(f, sweep)?
        }
        Ok(())
    }
}
