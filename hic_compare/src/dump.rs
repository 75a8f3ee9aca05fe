use std::{
    collections::{hash_map::Entry, HashMap},
    io::BufRead,
    path::Path,
};

use anyhow::Context;
use compress_io::compress::CompressIo;
use utils::{get_next_line, parse_f64_list};

use crate::source::{Chromosome, ContactRecord, FetchError, NormFooter, RecordSource};

/// Contact map held as a plain text dump.
///
/// Line types (white space separated, `#` starts a comment line):
///
///   chrom <name> <size>
///   res   <bin size>
///   obs   <res> <chrom a> <chrom b> <bin x> <bin y> <count>
///   norm  <scheme> <res> <chrom> <v1,v2,...>
///
/// Chromosomes and resolutions must be declared before they are used.
pub struct DumpSource {
    name: String,
    chroms: Vec<Chromosome>,
    chrom_idx: HashMap<String, usize>,
    resolutions: Vec<u32>,
    // Keyed on (res, chrom a index, chrom b index)
    observed: HashMap<(u32, usize, usize), Vec<ContactRecord>>,
    // Keyed on (scheme, res, chrom index)
    norms: HashMap<(String, u32, usize), Vec<f64>>,
}

impl DumpSource {
    fn new(name: String) -> Self {
        Self {
            name,
            chroms: Vec::new(),
            chrom_idx: HashMap::new(),
            resolutions: Vec::new(),
            observed: HashMap::new(),
            norms: HashMap::new(),
        }
    }

    /// Read dump from file (which may be compressed)
    pub fn open<P: AsRef<Path>>(p: P) -> anyhow::Result<Self> {
        let p = p.as_ref();
        debug!("Reading contact map dump from {}", p.display());
        let mut rdr = CompressIo::new()
            .path(p)
            .bufreader()
            .with_context(|| format!("Could not open {} for input", p.display()))?;
        Self::from_reader(&mut rdr, p.display().to_string())
    }

    pub fn from_reader<R: BufRead>(rdr: &mut R, name: String) -> anyhow::Result<Self> {
        let mut src = Self::new(name);
        let mut buf = String::new();
        let mut line = 0;

        while let Some(fields) = get_next_line(rdr, &mut buf)
            .with_context(|| format!("Error after reading {} lines from {}", line, src.name))?
        {
            line += 1;
            // Skip empty and comment lines
            if fields.is_empty() || fields[0].starts_with('#') {
                continue;
            }
            src.parse_fields(&fields)
                .with_context(|| format!("{}:{} Error parsing line", src.name, line))?
        }

        let n_obs: usize = src.observed.values().map(|v| v.len()).sum();
        debug!(
            "Finished reading {} lines from {}: {} chromosomes, {} resolutions, {} contacts, {} normalization vectors",
            line,
            src.name,
            src.chroms.len(),
            src.resolutions.len(),
            n_obs,
            src.norms.len()
        );
        Ok(src)
    }

    fn parse_fields(&mut self, fields: &[&str]) -> anyhow::Result<()> {
        let check_len = |n: usize| {
            if fields.len() != n {
                Err(anyhow!(
                    "Expected {} fields for {} line, found {}",
                    n,
                    fields[0],
                    fields.len()
                ))
            } else {
                Ok(())
            }
        };

        match fields[0] {
            "chrom" => {
                check_len(3)?;
                let size = fields[2]
                    .parse::<u64>()
                    .with_context(|| "Error reading chromosome size")?;
                self.add_chromosome(fields[1], size)
            }
            "res" => {
                check_len(2)?;
                let res = parse_resolution(fields[1])?;
                if self.resolutions.contains(&res) {
                    Err(anyhow!("Duplicate resolution {}", res))
                } else {
                    self.resolutions.push(res);
                    Ok(())
                }
            }
            "obs" => {
                check_len(7)?;
                let res = self.declared_resolution(fields[1])?;
                let a = self.declared_chromosome(fields[2])?;
                let b = self.declared_chromosome(fields[3])?;
                let bin_x = fields[4]
                    .parse::<u64>()
                    .with_context(|| "Error reading bin x")?;
                let bin_y = fields[5]
                    .parse::<u64>()
                    .with_context(|| "Error reading bin y")?;
                let counts = fields[6]
                    .parse::<f64>()
                    .with_context(|| "Error reading contact count")?;
                self.observed
                    .entry((res, a, b))
                    .or_default()
                    .push(ContactRecord::new(bin_x, bin_y, counts));
                Ok(())
            }
            "norm" => {
                check_len(5)?;
                let res = self.declared_resolution(fields[2])?;
                let c = self.declared_chromosome(fields[3])?;
                let v = parse_f64_list(fields[4])
                    .with_context(|| "Error reading normalization vector")?;
                match self.norms.entry((fields[1].to_owned(), res, c)) {
                    Entry::Occupied(_) => Err(anyhow!(
                        "Duplicate {} normalization vector for {} at resolution {}",
                        fields[1],
                        fields[3],
                        res
                    )),
                    Entry::Vacant(e) => {
                        e.insert(v);
                        Ok(())
                    }
                }
            }
            s => Err(anyhow!("Unknown line type {}", s)),
        }
    }

    fn add_chromosome(&mut self, name: &str, size: u64) -> anyhow::Result<()> {
        match self.chrom_idx.entry(name.to_owned()) {
            Entry::Occupied(_) => Err(anyhow!("Duplicate chromosome {}", name)),
            Entry::Vacant(e) => {
                trace!("Adding chromosome {} ({} bp)", name, size);
                e.insert(self.chroms.len());
                self.chroms.push(Chromosome::new(name, size));
                Ok(())
            }
        }
    }

    fn declared_resolution(&self, s: &str) -> anyhow::Result<u32> {
        let res = parse_resolution(s)?;
        if self.resolutions.contains(&res) {
            Ok(res)
        } else {
            Err(anyhow!("Resolution {} used before declaration", res))
        }
    }

    fn declared_chromosome(&self, name: &str) -> anyhow::Result<usize> {
        self.chrom_idx
            .get(name)
            .copied()
            .ok_or_else(|| anyhow!("Chromosome {} used before declaration", name))
    }

    fn lookup(&self, chrom: &str, res: u32) -> Result<usize, FetchError> {
        let ix = self
            .chrom_idx
            .get(chrom)
            .copied()
            .ok_or_else(|| FetchError::UnknownChromosome(chrom.to_owned()))?;
        if self.resolutions.contains(&res) {
            Ok(ix)
        } else {
            Err(FetchError::UnsupportedResolution(res))
        }
    }

    fn norm_vector(&self, chrom: &str, ix: usize, norm: &str, res: u32) -> Result<Vec<f64>, FetchError> {
        self.norms
            .get(&(norm.to_owned(), res, ix))
            .cloned()
            .ok_or_else(|| FetchError::MissingNormalization {
                norm: norm.to_owned(),
                chrom: chrom.to_owned(),
                res,
            })
    }
}

fn parse_resolution(s: &str) -> anyhow::Result<u32> {
    match s.parse::<u32>() {
        Ok(0) => Err(anyhow!("Resolution must be positive")),
        Ok(r) => Ok(r),
        Err(e) => Err(anyhow!("Error reading resolution {}: {}", s, e)),
    }
}

impl RecordSource for DumpSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn chromosomes(&self) -> Result<Vec<Chromosome>, FetchError> {
        Ok(self.chroms.clone())
    }

    fn resolutions(&self) -> Result<Vec<u32>, FetchError> {
        Ok(self.resolutions.clone())
    }

    fn observed_records(
        &self,
        chrom_a: &str,
        chrom_b: &str,
        res: u32,
    ) -> Result<Vec<ContactRecord>, FetchError> {
        let a = self.lookup(chrom_a, res)?;
        let b = self.lookup(chrom_b, res)?;
        let mut v = self.observed.get(&(res, a, b)).cloned().unwrap_or_default();
        // Contacts stored the other way round are flipped so that rows stay on chrom_a
        if a != b {
            if let Some(w) = self.observed.get(&(res, b, a)) {
                v.extend(w.iter().map(|r| r.swapped()))
            }
        }
        trace!(
            "{}: {} records for {} x {} at {}",
            self.name,
            v.len(),
            chrom_a,
            chrom_b,
            res
        );
        Ok(v)
    }

    fn norm_footer(
        &self,
        chrom_a: &str,
        chrom_b: &str,
        norm: &str,
        res: u32,
    ) -> Result<NormFooter, FetchError> {
        let a = self.lookup(chrom_a, res)?;
        let b = self.lookup(chrom_b, res)?;
        Ok(NormFooter {
            c1_norm: self.norm_vector(chrom_a, a, norm, res)?,
            c2_norm: self.norm_vector(chrom_b, b, norm, res)?,
        })
    }
}
