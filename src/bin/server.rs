//! Entity-linking command-line program and REST server.
//!
//! Takes a model and some text (from stdin or an HTTP connection) and
//! produces entity mentions in a simple JSON format. Run with --help for
//! command-line usage.

use std::fs;
use std::io::{self, Read, Write};
use std::process;

use clap::{App, Arg};
use lazy_static::lazy_static;
use log::info;
use regex::Regex;

use linker::Semanticizer;
use wikilinker::web;

lazy_static! {
    static ref PARA_END: Regex = Regex::new(r"\n\s*\n").unwrap();
}

fn fatal(message: &str) -> ! {
    eprintln!("server: {}", message);
    process::exit(1);
}

/// Read paragraphs from stdin and print one JSON array of mentions per
/// paragraph.
fn run_stdin(sem: &Semanticizer) -> Result<(), Box<dyn std::error::Error>> {
    let mut input = String::new();
    io::stdin().read_to_string(&mut input)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for paragraph in PARA_END.split(&input) {
        let candidates = sem.all(paragraph)?;
        serde_json::to_writer(&mut out, &candidates)?;
        out.write_all(b"\n")?;
    }
    Ok(())
}

fn main() {
    env_logger::init();

    let matches = App::new("server")
        .about("Annotate text with candidate Wikipedia entities")
        .arg(
            Arg::with_name("model")
                .help("path to model file")
                .required(true),
        )
        .arg(
            Arg::with_name("http")
                .long("http")
                .takes_value(true)
                .value_name("addr")
                .help("serve HTTP requests, e.g. --http localhost:8080"),
        )
        .arg(
            Arg::with_name("portfile")
                .long("portfile")
                .takes_value(true)
                .value_name("path")
                .help("write the listening port to this file after binding"),
        )
        .get_matches();

    let model = matches.value_of("model").unwrap();
    info!("loading model from {}", model);
    let (sem, settings) = match Semanticizer::load(model) {
        Ok(loaded) => loaded,
        Err(err) => fatal(&err.to_string()),
    };

    match matches.value_of("http") {
        None => {
            if let Err(err) = run_stdin(&sem) {
                fatal(&err.to_string());
            }
        }
        Some(addr) => {
            let server = match tiny_http::Server::http(addr) {
                Ok(server) => server,
                Err(err) => fatal(&err.to_string()),
            };
            if let Some(portfile) = matches.value_of("portfile") {
                let port = match server.server_addr().to_ip() {
                    Some(addr) => addr.port(),
                    None => fatal("server is not listening on a TCP address"),
                };
                if let Err(err) = fs::write(portfile, format!("{}\n", port)) {
                    fatal(&err.to_string());
                }
            }
            info!("serving on {}", addr);
            web::serve(&server, &sem, &settings);
        }
    }
}
