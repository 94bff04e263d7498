//! Parser for Wikipedia database dumps.
//!
//! Takes a Wikipedia database dump (or downloads one automatically) and
//! produces a model for use by the linker server. Run with --help for
//! command-line usage.

use std::path::PathBuf;
use std::process;

use clap::{App, Arg, ArgMatches};

use wikilinker::download::download;
use wikilinker::pipeline::{run, PipelineConfig};

fn fatal(message: &str) -> ! {
    eprintln!("dumpparser: {}", message);
    process::exit(1);
}

fn usize_flag(matches: &ArgMatches, name: &str) -> usize {
    let raw = matches.value_of(name).unwrap();
    match raw.parse() {
        Ok(value) => value,
        Err(_) => fatal(&format!("invalid value {:?} for --{}", raw, name)),
    }
}

fn main() {
    env_logger::init();

    let matches = App::new("dumpparser")
        .about("Build an entity-linking model from a Wikipedia dump")
        .arg(Arg::with_name("model").help("path to model").required(true))
        .arg(
            Arg::with_name("dump")
                .help("path to Wikipedia dump")
                .multiple(true),
        )
        .arg(
            Arg::with_name("download")
                .long("download")
                .takes_value(true)
                .value_name("wikiname")
                .help("download Wikipedia dump (e.g., enwiki)"),
        )
        .arg(
            Arg::with_name("nrows")
                .long("nrows")
                .takes_value(true)
                .default_value("16")
                .help("number of rows in the count-min sketch"),
        )
        .arg(
            Arg::with_name("ncols")
                .long("ncols")
                .takes_value(true)
                .default_value("65536")
                .help("number of columns in the count-min sketch"),
        )
        .arg(
            Arg::with_name("ngram")
                .long("ngram")
                .takes_value(true)
                .default_value("7")
                .help("maximum length of n-grams"),
        )
        .get_matches();

    let model = PathBuf::from(matches.value_of("model").unwrap());
    let mut dumps: Vec<PathBuf> = matches
        .values_of("dump")
        .map(|values| values.map(PathBuf::from).collect())
        .unwrap_or_default();

    if let Some(wikiname) = matches.value_of("download") {
        // A single dump argument names the download destination.
        let dest = if dumps.len() == 1 { dumps.pop() } else { None };
        match download(wikiname, dest) {
            Ok(path) => dumps = vec![path],
            Err(err) => fatal(&err.to_string()),
        }
    }
    if dumps.is_empty() {
        fatal("no dump specified and no --download given (try --help)");
    }

    let dump_name = dumps[0]
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| dumps[0].display().to_string());

    let config = PipelineConfig::new(dump_name)
        .with_nrows(usize_flag(&matches, "nrows"))
        .with_ncols(usize_flag(&matches, "ncols"))
        .with_max_ngram(usize_flag(&matches, "ngram"));

    if let Err(err) = run(&model, &dumps, &config) {
        fatal(&err.to_string());
    }
}
