#[macro_use]
extern crate anyhow;

use std::{fmt, io::BufRead, str::FromStr};

use anyhow::Context;
use clap::ArgMatches;

/// LogLevel
///
/// Represents minimum level of messages that will be logged.
/// `none` switches logging off altogether
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogLevel {
    pub level: usize,
}

const LEVEL_NAMES: [&str; 6] = ["error", "warn", "info", "debug", "trace", "none"];

impl FromStr for LogLevel {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.to_lowercase();
        LEVEL_NAMES
            .iter()
            .position(|x| *x == s)
            .map(|level| LogLevel { level })
            .ok_or("no match")
    }
}

impl LogLevel {
    pub fn is_none(&self) -> bool {
        self.level > 4
    }

    /// Verbosity as understood by stderrlog (0 = errors only)
    pub fn get_level(&self) -> usize {
        if self.is_none() {
            0
        } else {
            self.level
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", LEVEL_NAMES.get(self.level).unwrap_or(&"unknown"))
    }
}

/// Initialize logging from command line arguments
///
/// Expects the `loglevel`, `quiet` and `timestamp` arguments to be defined
/// in the clap model
pub fn init_log(m: &ArgMatches) -> anyhow::Result<()> {
    let verbose = m
        .get_one::<LogLevel>("loglevel")
        .copied()
        .unwrap_or(LogLevel { level: 1 });
    let quiet = verbose.is_none() || m.get_flag("quiet");
    let ts = m
        .get_one::<stderrlog::Timestamp>("timestamp")
        .copied()
        .unwrap_or(stderrlog::Timestamp::Off);

    stderrlog::new()
        .quiet(quiet)
        .verbosity(verbose.get_level())
        .timestamp(ts)
        .init()
        .with_context(|| "Could not initialize logging")
}

/// Read in next line, trim and split on white space.
///
/// Returns Ok(None) at EOF.  Empty lines give an empty vector.
pub fn get_next_line<'a, R: BufRead>(
    rdr: &mut R,
    buf: &'a mut String,
) -> anyhow::Result<Option<Vec<&'a str>>> {
    buf.clear();
    if rdr.read_line(buf)? == 0 {
        Ok(None)
    } else {
        Ok(Some(buf.split_whitespace().collect()))
    }
}

/// Split a comma separated list, dropping empty entries
pub fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(|x| x.trim())
        .filter(|x| !x.is_empty())
        .map(|x| x.to_owned())
        .collect()
}

/// Parse a comma separated list of floating point values.
///
/// NaN and infinite values are accepted as written (`NaN`, `inf`, `-Infinity` etc.)
/// Every entry must hold a value, so `1,,2` and `1,2,` are errors.
pub fn parse_f64_list(s: &str) -> anyhow::Result<Vec<f64>> {
    s.split(',')
        .enumerate()
        .map(|(i, x)| match x.trim() {
            "" => Err(anyhow!("Missing value at position {} in list {}", i + 1, s)),
            x => x
                .parse::<f64>()
                .map_err(|e| anyhow!("Illegal value {}: {}", x, e)),
        })
        .collect()
}
