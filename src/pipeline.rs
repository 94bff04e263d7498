//! The concurrent dump-processing pipeline.
//!
//! A streamer thread decodes the dump into a bounded page queue; worker
//! threads clean pages, extract links and count n-grams into per-worker
//! sketches; a writer thread drains extracted links into the store inside a
//! single transaction; redirects are buffered until that transaction has
//! committed, then applied; finally the merged sketch is persisted and the
//! model finalized.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, tick, Receiver, Sender};
use log::info;
use pbr::ProgressBar;
use thiserror::Error;

use nlp::countmin::SketchError;
use nlp::{ngram_hashes, tokenize, Sketch};
use storage::{Connection, ProcessedLink, Settings, StoreError};

use crate::cleanup::cleanup;
use crate::dump::{self, DumpError, Page, Redirect};
use crate::links::{extract_links, Link};
use crate::utils::open_dump;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("cannot read dump: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Parse(#[from] DumpError),
    #[error("{0}")]
    Store(#[from] StoreError),
    #[error("{0}")]
    Sketch(#[from] SketchError),
    #[error("pipeline stage failed")]
    Aborted,
}

/// Everything the dump processor needs to know, threaded explicitly through
/// the pipeline instead of living in process-wide state.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Name recorded in the model's parameters table.
    pub dump_name: String,
    /// Rows in the n-gram count-min sketch.
    pub nrows: usize,
    /// Columns in the n-gram count-min sketch.
    pub ncols: usize,
    /// Maximum n-gram length.
    pub max_ngram: usize,
    /// Number of worker threads.
    pub nworkers: usize,
}

impl PipelineConfig {
    pub fn new<S: Into<String>>(dump_name: S) -> Self {
        PipelineConfig {
            dump_name: dump_name.into(),
            nrows: 16,
            ncols: 65536,
            max_ngram: storage::DEFAULT_MAX_NGRAM,
            nworkers: num_cpus::get(),
        }
    }

    pub fn with_nrows(self, nrows: usize) -> Self {
        PipelineConfig { nrows, ..self }
    }

    pub fn with_ncols(self, ncols: usize) -> Self {
        PipelineConfig { ncols, ..self }
    }

    pub fn with_max_ngram(self, max_ngram: usize) -> Self {
        PipelineConfig { max_ngram, ..self }
    }

    pub fn with_nworkers(self, nworkers: usize) -> Self {
        PipelineConfig { nworkers, ..self }
    }

    fn validate(&self) -> Result<(), PipelineError> {
        // Constructing a sketch validates the shape.
        Sketch::new(self.nrows, self.ncols).map_err(|e| PipelineError::Config(e.to_string()))?;
        if self.max_ngram < 1 {
            return Err(PipelineError::Config(
                "maximum n-gram length must be at least 1".to_owned(),
            ));
        }
        if self.nworkers < 1 {
            return Err(PipelineError::Config(
                "at least one worker is required".to_owned(),
            ));
        }
        Ok(())
    }
}

/// Project a link onto its top-level anchor hashes.
///
/// Anchors no longer than `max_ngram` tokens yield one hash carrying the
/// full frequency; longer anchors split into overlapping n-grams of size
/// `max_ngram`, each receiving an equal fractional weight.
fn process_link(link: &Link, freq: u32, max_ngram: usize) -> ProcessedLink {
    let tokens = tokenize(&link.anchor);
    let n = max_ngram.min(tokens.len());
    let anchor_hashes = ngram_hashes(&tokens, n, n);
    let weight = if anchor_hashes.len() > 1 {
        1.0 / anchor_hashes.len() as f64
    } else {
        f64::from(freq)
    };
    ProcessedLink {
        target: link.target.clone(),
        anchor_hashes,
        weight,
    }
}

/// Worker loop: clean and tokenize articles, extract links, count n-grams.
fn process_pages(
    pages: &Receiver<Page>,
    links: &Sender<ProcessedLink>,
    n_articles: &AtomicU32,
    config: &PipelineConfig,
) -> Result<Sketch, PipelineError> {
    let mut ngram_count = Sketch::new(config.nrows, config.ncols)?;
    for page in pages.iter() {
        let text = cleanup(&page.text);
        for (link, freq) in extract_links(&text) {
            let processed = process_link(&link, freq, config.max_ngram);
            if processed.anchor_hashes.is_empty() {
                continue;
            }
            links.send(processed).map_err(|_| PipelineError::Aborted)?;
        }
        let tokens = tokenize(&text);
        for h in ngram_hashes(&tokens, 1, config.max_ngram) {
            ngram_count.add1(h);
        }
        n_articles.fetch_add(1, Ordering::Relaxed);
    }
    Ok(ngram_count)
}

/// Process `dumps` into a model at `model`.
pub fn run(model: &Path, dumps: &[PathBuf], config: &PipelineConfig) -> Result<(), PipelineError> {
    config.validate()?;
    let settings = Settings {
        dump_name: config.dump_name.clone(),
        max_ngram: config.max_ngram,
    };
    info!("creating model at {}", model.display());
    let conn = storage::make_db(model, true, &settings)?;

    let cap = 10 * config.nworkers;
    let (page_tx, page_rx) = bounded::<Page>(cap);
    let (link_tx, link_rx) = bounded::<ProcessedLink>(cap);
    let (redirect_tx, redirect_rx) = bounded::<Redirect>(cap);

    let n_articles = Arc::new(AtomicU32::new(0));

    // Streamer: decodes each dump file in turn into the shared queues, then
    // closes them by dropping its senders.
    let streamer = {
        let dumps = dumps.to_vec();
        thread::spawn(move || -> Result<(), PipelineError> {
            for path in &dumps {
                info!("streaming {}", path.display());
                let reader = open_dump(path)?;
                dump::stream_pages(reader, &page_tx, &redirect_tx)?;
            }
            Ok(())
        })
    };

    info!("processing dump with {} workers", config.nworkers);
    let workers: Vec<_> = (0..config.nworkers)
        .map(|_| {
            let pages = page_rx.clone();
            let links = link_tx.clone();
            let n_articles = Arc::clone(&n_articles);
            let config = config.clone();
            thread::spawn(move || process_pages(&pages, &links, &n_articles, &config))
        })
        .collect();
    // The workers now hold the only link senders; the link queue closes
    // when the last of them exits, which is what lets the writer commit.
    drop(link_tx);
    drop(page_rx);

    // Redirects are buffered in memory: applying them reads the link stats,
    // so they must wait for the writer's commit.
    let collector = thread::spawn(move || -> Vec<Redirect> { redirect_rx.iter().collect() });

    // Link writer: sole owner of the store connection while the pipeline
    // runs.
    let writer = thread::spawn(move || -> Result<(Connection, usize), StoreError> {
        let mut conn = conn;
        let written = storage::store_links(&mut conn, link_rx)?;
        Ok((conn, written))
    });

    // Throughput heartbeat; stops when the sender side is dropped.
    let (done_tx, done_rx) = bounded::<()>(0);
    let progress = {
        let n_articles = Arc::clone(&n_articles);
        thread::spawn(move || {
            let ticker = tick(Duration::from_secs(15));
            loop {
                crossbeam_channel::select! {
                    recv(ticker) -> _ => {
                        info!("processed {} articles", n_articles.load(Ordering::Relaxed));
                    }
                    recv(done_rx) -> _ => return,
                }
            }
        })
    };

    let streamer_result = streamer.join().expect("streamer panicked");

    // Merge the per-worker sketches; merge order is immaterial.
    let mut total = Sketch::new(config.nrows, config.ncols)?;
    let mut worker_error = None;
    for worker in workers {
        match worker.join().expect("worker panicked") {
            Ok(sketch) => total.merge(&sketch)?,
            Err(err) => worker_error = Some(err),
        }
    }

    let redirects = collector.join().expect("redirect collector panicked");
    let writer_result = writer.join().expect("link writer panicked");

    drop(done_tx);
    let _ = progress.join();

    // Report the root cause, not the cancellations it induced downstream.
    if let Err(err) = streamer_result {
        if let PipelineError::Parse(DumpError::Canceled) = err {
            // A dead consumer closed the queues under the streamer; the
            // writer or a worker holds the original error.
        } else {
            return Err(err);
        }
    }
    let (mut conn, written) = writer_result?;
    if let Some(err) = worker_error {
        return Err(err);
    }

    info!(
        "processed all {} articles, {} links written",
        n_articles.load(Ordering::Relaxed),
        written
    );

    info!("processing {} redirects", redirects.len());
    let mut bar = ProgressBar::new(redirects.len() as u64);
    let pairs = redirects
        .iter()
        .map(|r| (r.title.as_str(), r.target.as_str()));
    storage::store_redirects(&mut conn, pairs, Some(&mut bar))?;
    bar.finish();

    storage::store_sketch(&mut conn, &total)?;
    info!("finalizing model");
    storage::finalize(&conn)?;
    Ok(())
}
