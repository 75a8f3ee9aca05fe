use std::path::PathBuf;

use clap::{
    crate_authors, crate_description, crate_name, crate_version, value_parser, Arg, ArgAction,
    Command,
};

use utils::{init_log, split_list, LogLevel};

use crate::{
    compare::MismatchPolicy,
    config::*,
    sweep::{ShapeMode, SweepOptions},
};

/// Set up definition of command options for clap
fn cli_model() -> Command {
    Command::new(crate_name!())
        .about(crate_description!())
        .version(crate_version!())
        .author(crate_authors!())
        .arg(
            Arg::new("timestamp")
                .short('X')
                .long("timestamp")
                .value_parser(value_parser!(stderrlog::Timestamp))
                .value_name("GRANULARITY")
                .default_value("none")
                .help("Prepend log entries with a timestamp"),
        )
        .arg(
            Arg::new("loglevel")
                .short('l')
                .long("loglevel")
                .value_name("LOGLEVEL")
                .value_parser(value_parser!(LogLevel))
                .ignore_case(true)
                .default_value("warn")
                .help("Set log level"),
        )
        .arg(
            Arg::new("quiet")
                .action(ArgAction::SetTrue)
                .long("quiet")
                .conflicts_with("loglevel")
                .help("Silence all output"),
        )
        .arg(
            Arg::new("shape")
                .short('s')
                .long("shape")
                .value_parser(value_parser!(ShapeMode))
                .value_name("MODE")
                .ignore_case(true)
                .default_value("declared")
                .help("Matrix dimensions from chromosome sizes (declared) or from observed contacts (observed)"),
        )
        .arg(
            Arg::new("on_mismatch")
                .short('m')
                .long("on-mismatch")
                .value_parser(value_parser!(MismatchPolicy))
                .value_name("POLICY")
                .ignore_case(true)
                .default_value("pad")
                .help("Zero pad (pad) or skip (skip) comparisons between differently shaped data"),
        )
        .arg(
            Arg::new("detail")
                .action(ArgAction::SetTrue)
                .short('D')
                .long("detail")
                .help("Report every chromosome pair and normalization vector"),
        )
        .arg(
            Arg::new("skip_matrices")
                .action(ArgAction::SetTrue)
                .long("skip-matrices")
                .help("Do not compare contact matrices"),
        )
        .arg(
            Arg::new("skip_norms")
                .action(ArgAction::SetTrue)
                .long("skip-norms")
                .conflicts_with("skip_matrices")
                .help("Do not compare normalization vectors"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output-file")
                .value_parser(value_parser!(PathBuf))
                .value_name("PATH")
                .help("Set output file [default: <stdout>]"),
        )
        .arg(
            Arg::new("file1")
                .value_parser(value_parser!(PathBuf))
                .value_name("FILE1")
                .required(true)
                .help("First contact map dump"),
        )
        .arg(
            Arg::new("file2")
                .value_parser(value_parser!(PathBuf))
                .value_name("FILE2")
                .required(true)
                .help("Second contact map dump"),
        )
        .arg(
            Arg::new("norms")
                .value_parser(value_parser!(String))
                .value_name("NORMS")
                .required(true)
                .help("Comma separated list of normalization schemes (i.e., NONE,VC,KR)"),
        )
}

/// Handle command line options.  Set up Config structure
pub fn handle_cli() -> anyhow::Result<Config> {
    // Get matches from command line
    let m = cli_model().get_matches();

    // Setup logging
    init_log(&m)?;

    debug!("Processing command line options");

    let file1 = m
        .get_one::<PathBuf>("file1")
        .expect("Missing first input file")
        .to_owned();
    let file2 = m
        .get_one::<PathBuf>("file2")
        .expect("Missing second input file")
        .to_owned();

    let norms = split_list(m.get_one::<String>("norms").expect("Missing norm list"));
    if norms.is_empty() {
        warn!("No normalization schemes given");
    }
    debug!("Normalization schemes: {:?}", norms);

    let opts = SweepOptions {
        shape: *m
            .get_one::<ShapeMode>("shape")
            .expect("Missing default shape mode"),
        policy: *m
            .get_one::<MismatchPolicy>("on_mismatch")
            .expect("Missing default mismatch policy"),
    };

    let mut cfg = Config::new(file1, file2, norms);
    cfg.set_sweep_options(opts);
    cfg.set_detail(m.get_flag("detail"));
    cfg.set_skip_matrices(m.get_flag("skip_matrices"));
    cfg.set_skip_norms(m.get_flag("skip_norms"));

    if let Some(p) = m.get_one::<PathBuf>("output") {
        cfg.set_output_file(p.to_owned())
    }

    Ok(cfg)
}
