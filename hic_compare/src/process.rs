use std::io::Write;

use anyhow::Context;
use compress_io::compress::CompressIo;

use crate::{
    config::Config,
    dump::DumpSource,
    output::Report,
    source::{get_chromosomes, Chromosome, RecordSource},
    sweep::{matrix_sweep, norm_sweep, MatrixSweep, NormSweep},
};

/// Everything found when comparing two contact maps
pub struct Comparison {
    pub chromosomes: Vec<Chromosome>,
    pub resolutions: Vec<u32>,
    pub norms: Vec<String>,
    pub matrices: Option<MatrixSweep>,
    pub norm_vectors: Option<NormSweep>,
}

/// Warn if the second source does not hold the same chromosomes and
/// resolutions as the first.  Only the first source drives the sweeps.
fn check_consistency<T: RecordSource>(src2: &T, chroms: &[Chromosome], resolutions: &[u32]) {
    match get_chromosomes(src2) {
        Ok(c) if c.as_slice() != chroms => warn!(
            "Chromosome list differs between files; comparing chromosomes from the first file"
        ),
        Ok(_) => (),
        Err(e) => warn!("Could not list chromosomes for {}: {}", src2.name(), e),
    }
    match src2.resolutions() {
        Ok(r) if r.as_slice() != resolutions => warn!(
            "Resolution list differs between files; comparing resolutions from the first file"
        ),
        Ok(_) => (),
        Err(e) => warn!("Could not list resolutions for {}: {}", src2.name(), e),
    }
}

/// Strategy
///
/// Chromosomes and resolutions come from the first source.  Contact
/// matrices are compared for every unordered chromosome pair at every
/// resolution, then normalization vectors for every scheme, chromosome
/// and resolution.  Each combination is fetched afresh from both sources.
pub fn compare_sources<S: RecordSource, T: RecordSource>(
    cfg: &Config,
    src1: &S,
    src2: &T,
) -> anyhow::Result<Comparison> {
    let chromosomes = get_chromosomes(src1)
        .with_context(|| format!("Could not get chromosome list from {}", src1.name()))?;
    let resolutions = src1
        .resolutions()
        .with_context(|| format!("Could not get resolution list from {}", src1.name()))?;
    debug!(
        "{} chromosomes and {} resolutions found in {}",
        chromosomes.len(),
        resolutions.len(),
        src1.name()
    );
    check_consistency(src2, &chromosomes, &resolutions);

    let opts = cfg.sweep_options();
    let matrices = if cfg.skip_matrices() {
        None
    } else {
        debug!("Starting matrix comparison");
        Some(matrix_sweep(src1, src2, &chromosomes, &resolutions, opts))
    };
    let norm_vectors = if cfg.skip_norms() {
        None
    } else {
        debug!("Starting normalization vector comparison");
        Some(norm_sweep(
            src1,
            src2,
            &chromosomes,
            &resolutions,
            cfg.norms(),
            opts,
        ))
    };

    Ok(Comparison {
        chromosomes,
        resolutions,
        norms: cfg.norms().to_vec(),
        matrices,
        norm_vectors,
    })
}

pub fn process_files(cfg: &Config) -> anyhow::Result<()> {
    let src1 = DumpSource::open(cfg.file1())?;
    let src2 = DumpSource::open(cfg.file2())?;

    let cmp = compare_sources(cfg, &src1, &src2)?;

    let mut wrt = CompressIo::new()
        .opt_path(cfg.output_file())
        .bufwriter()
        .with_context(|| "Failed to open output file")?;

    write!(wrt, "{}", Report::new(&cmp, cfg.detail())).with_context(|| "Error writing report")?;
    wrt.flush().with_context(|| "Error writing report")
}
