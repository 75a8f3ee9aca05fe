use std::path::{Path, PathBuf};

use crate::sweep::SweepOptions;

pub struct Config {
    file1: PathBuf,
    file2: PathBuf,
    norms: Vec<String>,
    sweep_options: SweepOptions,
    detail: bool,
    skip_matrices: bool,
    skip_norms: bool,
    output_file: Option<PathBuf>,
}

impl Config {
    pub fn new(file1: PathBuf, file2: PathBuf, norms: Vec<String>) -> Self {
        Self {
            file1,
            file2,
            norms,
            sweep_options: SweepOptions::default(),
            detail: false,
            skip_matrices: false,
            skip_norms: false,
            output_file: None,
        }
    }

    pub fn set_sweep_options(&mut self, opts: SweepOptions) {
        self.sweep_options = opts
    }

    pub fn set_detail(&mut self, x: bool) {
        self.detail = x
    }

    pub fn set_skip_matrices(&mut self, x: bool) {
        self.skip_matrices = x
    }

    pub fn set_skip_norms(&mut self, x: bool) {
        self.skip_norms = x
    }

    pub fn set_output_file(&mut self, p: PathBuf) {
        self.output_file = Some(p)
    }

    pub fn file1(&self) -> &Path {
        &self.file1
    }

    pub fn file2(&self) -> &Path {
        &self.file2
    }

    pub fn norms(&self) -> &[String] {
        &self.norms
    }

    pub fn sweep_options(&self) -> &SweepOptions {
        &self.sweep_options
    }

    pub fn detail(&self) -> bool {
        self.detail
    }

    pub fn skip_matrices(&self) -> bool {
        self.skip_matrices
    }

    pub fn skip_norms(&self) -> bool {
        self.skip_norms
    }

    pub fn output_file(&self) -> Option<&Path> {
        self.output_file.as_deref()
    }
}
