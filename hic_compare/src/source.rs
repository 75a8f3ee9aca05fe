use std::fmt;

use thiserror::Error;

/// A single observed contact between two genomic bins.
///
/// `bin_x` and `bin_y` are bin start coordinates in base pairs, so
/// for a query at resolution `res` they are multiples of `res`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactRecord {
    pub bin_x: u64,
    pub bin_y: u64,
    pub counts: f64,
}

impl ContactRecord {
    pub fn new(bin_x: u64, bin_y: u64, counts: f64) -> Self {
        Self {
            bin_x,
            bin_y,
            counts,
        }
    }

    pub fn swapped(self) -> Self {
        Self {
            bin_x: self.bin_y,
            bin_y: self.bin_x,
            counts: self.counts,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chromosome {
    name: String,
    size: u64,
}

impl Chromosome {
    pub fn new<S: Into<String>>(name: S, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// The synthetic whole genome chromosome present in most contact maps
    pub fn is_all(&self) -> bool {
        self.name.eq_ignore_ascii_case("all")
    }

    /// Number of bins covering the chromosome at resolution `res`
    pub fn n_bins(&self, res: u32) -> usize {
        if res == 0 {
            0
        } else {
            self.size.div_ceil(res as u64) as usize
        }
    }
}

impl fmt::Display for Chromosome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Normalization vectors for the two chromosomes of a query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormFooter {
    pub c1_norm: Vec<f64>,
    pub c2_norm: Vec<f64>,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("unknown chromosome {0}")]
    UnknownChromosome(String),
    #[error("resolution {0} not present")]
    UnsupportedResolution(u32),
    #[error("no {norm} normalization vector for {chrom} at resolution {res}")]
    MissingNormalization { norm: String, chrom: String, res: u32 },
}

/// Access to the contents of a contact map.
///
/// Every call is a fresh query; implementations hand back owned data so
/// callers never hold on to source internals between queries.
pub trait RecordSource {
    /// Name used in log messages (usually the file path)
    fn name(&self) -> &str;

    /// All chromosomes in file order, including any `All` entry
    fn chromosomes(&self) -> Result<Vec<Chromosome>, FetchError>;

    /// Bin sizes (in base pairs) available in the file
    fn resolutions(&self) -> Result<Vec<u32>, FetchError>;

    /// Raw (unnormalized) observed contacts between `chrom_a` and `chrom_b`,
    /// with bin_x on `chrom_a` and bin_y on `chrom_b`
    fn observed_records(
        &self,
        chrom_a: &str,
        chrom_b: &str,
        res: u32,
    ) -> Result<Vec<ContactRecord>, FetchError>;

    /// Normalization vectors for scheme `norm`
    fn norm_footer(
        &self,
        chrom_a: &str,
        chrom_b: &str,
        norm: &str,
        res: u32,
    ) -> Result<NormFooter, FetchError>;
}

/// Chromosomes from `src` with the synthetic `All` chromosome removed
pub fn get_chromosomes<S: RecordSource>(src: &S) -> Result<Vec<Chromosome>, FetchError> {
    let v = src.chromosomes()?;
    Ok(v.into_iter().filter(|c| !c.is_all()).collect())
}
