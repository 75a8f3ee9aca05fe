use std::str::FromStr;

use thiserror::Error;

use crate::{
    compare::{matrix_abs_diff_sum, vector_diff, DiffStats, MismatchPolicy},
    matrix::{reconstruct, MatrixError, MatrixShape},
    norm::get_norm_vector,
    source::{Chromosome, FetchError, RecordSource},
};

/// How matrix dimensions are chosen during the matrix sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeMode {
    /// From chromosome sizes (taken from the first file)
    Declared,
    /// From the records seen in each file
    Observed,
}

impl FromStr for ShapeMode {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "declared" => Ok(Self::Declared),
            "observed" => Ok(Self::Observed),
            _ => Err("no match"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SweepOptions {
    pub shape: ShapeMode,
    pub policy: MismatchPolicy,
}

impl Default for SweepOptions {
    fn default() -> Self {
        Self {
            shape: ShapeMode::Declared,
            policy: MismatchPolicy::Pad,
        }
    }
}

/// Reason a single combination could not be compared
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CombinationError {
    #[error("{file}: {err}")]
    Fetch { file: String, err: FetchError },
    #[error("{file}: {err}")]
    Reconstruct { file: String, err: MatrixError },
    #[error(transparent)]
    Compare(#[from] MatrixError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub compared: usize,
    pub skipped: usize,
}

impl Tally {
    fn add(&mut self, other: &Tally) {
        self.compared += other.compared;
        self.skipped += other.skipped;
    }
}

#[derive(Debug, Clone)]
pub struct PairResult {
    pub chrom_a: String,
    pub chrom_b: String,
    pub res: u32,
    pub outcome: Result<f64, CombinationError>,
}

#[derive(Debug, Clone)]
pub struct ResolutionTotal {
    pub res: u32,
    pub error: f64,
    pub tally: Tally,
    pub pairs: Vec<PairResult>,
}

#[derive(Debug, Clone, Default)]
pub struct MatrixSweep {
    pub resolutions: Vec<ResolutionTotal>,
    pub total: f64,
    pub tally: Tally,
}

impl MatrixSweep {
    /// Every chromosome pair result, in sweep order
    pub fn pairs(&self) -> impl Iterator<Item = &PairResult> {
        self.resolutions.iter().flat_map(|rt| rt.pairs.iter())
    }
}

fn get_matrix<S: RecordSource>(
    src: &S,
    chrom_a: &Chromosome,
    chrom_b: &Chromosome,
    res: u32,
    shape: MatrixShape,
) -> Result<ndarray::Array2<f64>, CombinationError> {
    let recs = src
        .observed_records(chrom_a.name(), chrom_b.name(), res)
        .map_err(|err| CombinationError::Fetch {
            file: src.name().to_owned(),
            err,
        })?;
    reconstruct(&recs, res, shape).map_err(|err| CombinationError::Reconstruct {
        file: src.name().to_owned(),
        err,
    })
}

/// Sum of absolute differences between the contact matrices of the
/// two sources for one chromosome pair and resolution
pub fn compare_pair<S: RecordSource, T: RecordSource>(
    src1: &S,
    src2: &T,
    chrom_a: &Chromosome,
    chrom_b: &Chromosome,
    res: u32,
    opts: &SweepOptions,
) -> Result<f64, CombinationError> {
    let shape = match opts.shape {
        ShapeMode::Declared if chrom_a.size() > 0 && chrom_b.size() > 0 => {
            MatrixShape::Declared(chrom_a.n_bins(res), chrom_b.n_bins(res))
        }
        _ => MatrixShape::Observed,
    };
    let m1 = get_matrix(src1, chrom_a, chrom_b, res, shape)?;
    let m2 = get_matrix(src2, chrom_a, chrom_b, res, shape)?;
    Ok(matrix_abs_diff_sum(&m1, &m2, opts.policy)?)
}

/// Compare contact matrices for every resolution and every unordered
/// chromosome pair (including each chromosome with itself).
///
/// A combination that fails is counted as skipped and contributes nothing
/// to the totals.
pub fn matrix_sweep<S: RecordSource, T: RecordSource>(
    src1: &S,
    src2: &T,
    chroms: &[Chromosome],
    resolutions: &[u32],
    opts: &SweepOptions,
) -> MatrixSweep {
    let mut sweep = MatrixSweep::default();
    for &res in resolutions {
        debug!("Comparing matrices at resolution {}", res);
        let mut rt = ResolutionTotal {
            res,
            error: 0.0,
            tally: Tally::default(),
            pairs: Vec::new(),
        };
        for (i, ca) in chroms.iter().enumerate() {
            for cb in chroms[i..].iter() {
                let outcome = compare_pair(src1, src2, ca, cb, res, opts);
                match &outcome {
                    Ok(e) => {
                        trace!("{} x {} at {}: error {}", ca, cb, res, e);
                        rt.error += e;
                        rt.tally.compared += 1;
                    }
                    Err(e) => {
                        debug!("Skipping {} x {} at {}: {}", ca, cb, res, e);
                        rt.tally.skipped += 1;
                    }
                }
                rt.pairs.push(PairResult {
                    chrom_a: ca.name().to_owned(),
                    chrom_b: cb.name().to_owned(),
                    res,
                    outcome,
                })
            }
        }
        sweep.total += rt.error;
        sweep.tally.add(&rt.tally);
        sweep.resolutions.push(rt);
    }
    sweep
}

/// Outcome of comparing one normalization vector across the two sources
#[derive(Debug, Clone, PartialEq)]
pub enum VectorOutcome {
    /// Present in both sources
    Compared(DiffStats),
    /// Present in only one source; compared against zero
    OneSided(DiffStats),
    /// Present in neither source
    Absent,
    /// A lookup failed or the vectors could not be compared
    Skipped(CombinationError),
}

impl VectorOutcome {
    pub fn stats(&self) -> Option<&DiffStats> {
        match self {
            Self::Compared(d) | Self::OneSided(d) => Some(d),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VectorCounts {
    pub compared: usize,
    pub one_sided: usize,
    pub absent: usize,
    pub skipped: usize,
}

impl VectorCounts {
    fn count(&mut self, outcome: &VectorOutcome) {
        match outcome {
            VectorOutcome::Compared(_) => self.compared += 1,
            VectorOutcome::OneSided(_) => self.one_sided += 1,
            VectorOutcome::Absent => self.absent += 1,
            VectorOutcome::Skipped(_) => self.skipped += 1,
        }
    }

    fn add(&mut self, other: &VectorCounts) {
        self.compared += other.compared;
        self.one_sided += other.one_sided;
        self.absent += other.absent;
        self.skipped += other.skipped;
    }
}

#[derive(Debug, Clone)]
pub struct VectorResult {
    pub norm: String,
    pub chrom: String,
    pub res: u32,
    pub outcome: VectorOutcome,
}

/// Error pools for one normalization scheme, or for the whole sweep
#[derive(Debug, Clone, Default)]
pub struct ErrorPool {
    pub total: f64,
    pub means: Vec<f64>,
    pub maxima: Vec<f64>,
    pub counts: VectorCounts,
}

impl ErrorPool {
    fn push(&mut self, outcome: &VectorOutcome) {
        self.counts.count(outcome);
        if let Some(d) = outcome.stats() {
            self.total += d.sum;
            self.means.push(d.mean);
            self.maxima.push(d.max);
        }
    }

    fn extend(&mut self, other: &ErrorPool) {
        self.total += other.total;
        self.means.extend_from_slice(&other.means);
        self.maxima.extend_from_slice(&other.maxima);
        self.counts.add(&other.counts);
    }

    /// Mean of the per combination mean errors
    pub fn mean_error(&self) -> Option<f64> {
        if self.means.is_empty() {
            None
        } else {
            Some(self.means.iter().sum::<f64>() / self.means.len() as f64)
        }
    }

    /// Largest of the per combination maximum errors
    pub fn max_error(&self) -> Option<f64> {
        self.maxima.iter().copied().reduce(f64::max)
    }
}

#[derive(Debug, Clone)]
pub struct NormTotal {
    pub norm: String,
    pub pool: ErrorPool,
    pub vectors: Vec<VectorResult>,
}

#[derive(Debug, Clone, Default)]
pub struct NormSweep {
    pub norms: Vec<NormTotal>,
    pub pool: ErrorPool,
}

impl NormSweep {
    /// Every normalization vector result, in sweep order
    pub fn vectors(&self) -> impl Iterator<Item = &VectorResult> {
        self.norms.iter().flat_map(|nt| nt.vectors.iter())
    }
}

/// Compare the `norm` vectors for `chrom` at `res`
pub fn compare_vectors<S: RecordSource, T: RecordSource>(
    src1: &S,
    src2: &T,
    chrom: &Chromosome,
    norm: &str,
    res: u32,
    opts: &SweepOptions,
) -> VectorOutcome {
    let l1 = get_norm_vector(src1, chrom.name(), norm, res);
    let l2 = get_norm_vector(src2, chrom.name(), norm, res);
    let (v1, v2) = (l1.vector(), l2.vector());
    match vector_diff(v1, v2, opts.policy) {
        Ok(Some(d)) if v1.is_some() && v2.is_some() => VectorOutcome::Compared(d),
        Ok(Some(d)) => VectorOutcome::OneSided(d),
        // Neither side has a vector: a failed lookup is a skip, a missing scheme is not
        Ok(None) => {
            let failed = l1
                .fetch_failure()
                .map(|e| (src1.name(), e))
                .or_else(|| l2.fetch_failure().map(|e| (src2.name(), e)));
            match failed {
                Some((file, err)) => VectorOutcome::Skipped(CombinationError::Fetch {
                    file: file.to_owned(),
                    err: err.clone(),
                }),
                None => VectorOutcome::Absent,
            }
        }
        Err(e) => VectorOutcome::Skipped(e.into()),
    }
}

/// Compare normalization vectors for every scheme, chromosome and resolution
pub fn norm_sweep<S: RecordSource, T: RecordSource>(
    src1: &S,
    src2: &T,
    chroms: &[Chromosome],
    resolutions: &[u32],
    norms: &[String],
    opts: &SweepOptions,
) -> NormSweep {
    let mut sweep = NormSweep::default();
    for norm in norms {
        debug!("Comparing {} normalization vectors", norm);
        let mut pool = ErrorPool::default();
        let mut vectors = Vec::with_capacity(chroms.len() * resolutions.len());
        for chrom in chroms {
            for &res in resolutions {
                let outcome = compare_vectors(src1, src2, chrom, norm, res, opts);
                match &outcome {
                    VectorOutcome::Skipped(e) => {
                        debug!("Skipping {} vector for {} at {}: {}", norm, chrom, res, e)
                    }
                    _ => trace!("{} {} {}: {:?}", norm, chrom, res, outcome),
                }
                pool.push(&outcome);
                vectors.push(VectorResult {
                    norm: norm.clone(),
                    chrom: chrom.name().to_owned(),
                    res,
                    outcome,
                })
            }
        }
        sweep.pool.extend(&pool);
        sweep.norms.push(NormTotal {
            norm: norm.clone(),
            pool,
            vectors,
        })
    }
    sweep
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::dump::DumpSource;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::io::Cursor;

    fn source(s: &str) -> DumpSource {
        DumpSource::from_reader(&mut Cursor::new(s), "test".to_owned()).unwrap()
    }

    const HEADER: &str = "chrom\t1\t40\nchrom\t2\t20\nres\t10\nres\t20\n";

    fn chroms() -> Vec<Chromosome> {
        vec![Chromosome::new("1", 40), Chromosome::new("2", 20)]
    }

    #[test]
    fn single_contact_difference() {
        let s1 = source(&format!("{}obs\t10\t1\t1\t0\t0\t7\n", HEADER));
        let s2 = source(&format!("{}obs\t10\t1\t1\t0\t0\t10\n", HEADER));
        let c = chroms();
        let opts = SweepOptions::default();
        assert_eq!(compare_pair(&s1, &s2, &c[0], &c[0], 10, &opts), Ok(3.0));
        assert_eq!(compare_pair(&s2, &s1, &c[0], &c[0], 10, &opts), Ok(3.0));
    }

    #[test]
    fn matrix_sweep_visits_unordered_pairs() {
        let s = source(&format!(
            "{}obs\t10\t1\t1\t0\t0\t7\nobs\t10\t1\t2\t0\t10\t1\nobs\t20\t2\t2\t0\t0\t1\n",
            HEADER
        ));
        let sweep = matrix_sweep(&s, &s, &chroms(), &[10, 20], &SweepOptions::default());
        let pairs: Vec<_> = sweep
            .pairs()
            .map(|p| (p.chrom_a.as_str(), p.chrom_b.as_str(), p.res))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("1", "1", 10),
                ("1", "2", 10),
                ("2", "2", 10),
                ("1", "1", 20),
                ("1", "2", 20),
                ("2", "2", 20)
            ]
        );
        assert_eq!(sweep.total, 0.0);
        assert_eq!(
            sweep.tally,
            Tally {
                compared: 6,
                skipped: 0
            }
        );
    }

    #[test]
    fn matrix_sweep_counts_failures_separately() {
        let s1 = source(&format!("{}obs\t10\t1\t1\t0\t0\t7\n", HEADER));
        // Second file lacks resolution 20 and has an extra contact on 2 x 2
        let s2 = source("chrom\t1\t40\nchrom\t2\t20\nres\t10\nobs\t10\t1\t1\t0\t0\t5\nobs\t10\t2\t2\t10\t10\t4\n");
        let sweep = matrix_sweep(&s1, &s2, &chroms(), &[10, 20], &SweepOptions::default());
        assert_eq!(sweep.resolutions[0].error, 6.0);
        assert_eq!(
            sweep.resolutions[0].tally,
            Tally {
                compared: 3,
                skipped: 0
            }
        );
        assert_eq!(sweep.resolutions[1].error, 0.0);
        assert_eq!(
            sweep.resolutions[1].tally,
            Tally {
                compared: 0,
                skipped: 3
            }
        );
        assert_eq!(sweep.total, 6.0);
        assert!(matches!(
            sweep.resolutions[1].pairs[0].outcome,
            Err(CombinationError::Fetch {
                err: FetchError::UnsupportedResolution(20),
                ..
            })
        ));
    }

    #[rstest]
    #[case(MismatchPolicy::Pad, Ok(4.0))]
    #[case(MismatchPolicy::Skip, Err(()))]
    fn observed_shapes_follow_mismatch_policy(
        #[case] policy: MismatchPolicy,
        #[case] expected: Result<f64, ()>,
    ) {
        let s1 = source(&format!("{}obs\t10\t1\t1\t0\t0\t1\n", HEADER));
        let s2 = source(&format!(
            "{}obs\t10\t1\t1\t0\t0\t1\nobs\t10\t1\t1\t30\t30\t4\n",
            HEADER
        ));
        let opts = SweepOptions {
            shape: ShapeMode::Observed,
            policy,
        };
        let c = chroms();
        let r = compare_pair(&s1, &s2, &c[0], &c[0], 10, &opts).map_err(|_| ());
        assert_eq!(r, expected);
    }

    #[test]
    fn declared_shapes_never_mismatch() {
        let s1 = source(&format!("{}obs\t10\t1\t1\t0\t0\t1\n", HEADER));
        let s2 = source(&format!(
            "{}obs\t10\t1\t1\t0\t0\t1\nobs\t10\t1\t1\t30\t30\t4\n",
            HEADER
        ));
        let opts = SweepOptions {
            shape: ShapeMode::Declared,
            policy: MismatchPolicy::Skip,
        };
        let c = chroms();
        assert_eq!(compare_pair(&s1, &s2, &c[0], &c[0], 10, &opts), Ok(4.0));
    }

    #[test]
    fn empty_observed_matrix_is_skipped() {
        let s = source(HEADER);
        let opts = SweepOptions {
            shape: ShapeMode::Observed,
            policy: MismatchPolicy::Pad,
        };
        let c = chroms();
        assert!(matches!(
            compare_pair(&s, &s, &c[0], &c[1], 10, &opts),
            Err(CombinationError::Reconstruct {
                err: MatrixError::EmptyInput,
                ..
            })
        ));
        let opts = SweepOptions::default();
        assert_eq!(compare_pair(&s, &s, &c[0], &c[1], 10, &opts), Ok(0.0));
    }

    #[test]
    fn vector_outcomes() {
        let s1 = source(&format!(
            "{}norm\tKR\t10\t1\t1,2,3,4\nnorm\tVC\t10\t1\t1,1,1,1\n",
            HEADER
        ));
        let s2 = source(&format!("{}norm\tKR\t10\t1\t1,2,3,6\n", HEADER));
        let c = chroms();
        let opts = SweepOptions::default();
        assert_eq!(
            compare_vectors(&s1, &s2, &c[0], "KR", 10, &opts),
            VectorOutcome::Compared(DiffStats {
                sum: 2.0,
                mean: 0.5,
                max: 2.0
            })
        );
        assert_eq!(
            compare_vectors(&s1, &s2, &c[0], "VC", 10, &opts),
            VectorOutcome::OneSided(DiffStats {
                sum: 4.0,
                mean: 1.0,
                max: 1.0
            })
        );
        assert_eq!(
            compare_vectors(&s1, &s2, &c[1], "KR", 10, &opts),
            VectorOutcome::Absent
        );
    }

    #[test]
    fn norm_sweep_pools_errors() {
        let s1 = source(&format!(
            "{}norm\tKR\t10\t1\t1,2,3,4\nnorm\tKR\t20\t1\t1,1\nnorm\tVC\t10\t2\t5,5\n",
            HEADER
        ));
        let s2 = source(&format!(
            "{}norm\tKR\t10\t1\t1,2,3,6\nnorm\tKR\t20\t1\t2,2\nnorm\tVC\t10\t2\t5,5\n",
            HEADER
        ));
        let norms = vec!["KR".to_owned(), "VC".to_owned()];
        let sweep = norm_sweep(&s1, &s2, &chroms(), &[10, 20], &norms, &SweepOptions::default());
        assert_eq!(sweep.vectors().count(), 8);
        assert_eq!(sweep.norms[1].vectors[2].chrom, "2");

        let kr = &sweep.norms[0].pool;
        assert_eq!(kr.total, 4.0);
        assert_eq!(kr.means, vec![0.5, 1.0]);
        assert_eq!(kr.counts.absent, 2);

        assert_eq!(sweep.pool.total, 4.0);
        assert_eq!(sweep.pool.means, vec![0.5, 1.0, 0.0]);
        assert_eq!(sweep.pool.mean_error(), Some(0.5));
        assert_eq!(sweep.pool.max_error(), Some(2.0));
        assert_eq!(
            sweep.pool.counts,
            VectorCounts {
                compared: 3,
                one_sided: 0,
                absent: 5,
                skipped: 0
            }
        );
    }

    #[test]
    fn failed_vector_lookups_are_skipped() {
        let s1 = source(&format!("{}norm\tKR\t10\t2\t1,1\n", HEADER));
        // Second file lacks chromosome 1 and resolution 20
        let s2 = source("chrom\t2\t20\nres\t10\nnorm\tKR\t10\t2\t1,3\n");
        let norms = vec!["KR".to_owned()];
        let sweep = norm_sweep(&s1, &s2, &chroms(), &[10, 20], &norms, &SweepOptions::default());
        assert_eq!(
            sweep.pool.counts,
            VectorCounts {
                compared: 1,
                one_sided: 0,
                absent: 0,
                skipped: 3
            }
        );
        assert_eq!(sweep.pool.total, 2.0);
        let errs: Vec<_> = sweep
            .vectors()
            .filter_map(|v| match &v.outcome {
                VectorOutcome::Skipped(CombinationError::Fetch { err, .. }) => Some(err.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(
            errs,
            vec![
                FetchError::UnknownChromosome("1".to_owned()),
                FetchError::UnknownChromosome("1".to_owned()),
                FetchError::UnsupportedResolution(20),
            ]
        );
    }

    #[test]
    fn missing_scheme_is_absent_not_skipped() {
        let s1 = source(HEADER);
        let s2 = source(&format!("{}norm\tKR\t10\t1\t5\n", HEADER));
        let c = chroms();
        let opts = SweepOptions::default();
        assert_eq!(
            compare_vectors(&s1, &s2, &c[0], "KR", 10, &opts),
            VectorOutcome::Absent
        );
        let opts = SweepOptions {
            shape: ShapeMode::Declared,
            policy: MismatchPolicy::Skip,
        };
        let s3 = source(&format!("{}norm\tKR\t10\t1\t1,2,3\n", HEADER));
        let s4 = source(&format!("{}norm\tKR\t10\t1\t1,2\n", HEADER));
        assert_eq!(
            compare_vectors(&s3, &s4, &c[0], "KR", 10, &opts),
            VectorOutcome::Skipped(CombinationError::Compare(MatrixError::ShapeMismatch {
                left: vec![3],
                right: vec![2]
            }))
        );
    }

    #[test]
    fn empty_pool_has_no_mean_or_max() {
        let p = ErrorPool::default();
        assert_eq!(p.mean_error(), None);
        assert_eq!(p.max_error(), None);
    }
}
