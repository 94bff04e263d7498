//! Fetching Wikipedia database dumps from WikiMedia.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::PathBuf;

use log::info;
use pbr::{ProgressBar, Units};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("download failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP error {0} for {1}")]
    Status(u16, String),
    #[error("cannot write dump: {0}")]
    Io(#[from] io::Error),
}

fn dump_url(wikiname: &str) -> String {
    format!(
        "https://dumps.wikimedia.org/{0}/latest/{0}-latest-pages-articles.xml.bz2",
        wikiname
    )
}

/// Writer feeding a byte progress bar.
struct PbWriter<W: Write> {
    inner: W,
    bar: ProgressBar<io::Stdout>,
}

impl<W: Write> Write for PbWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.bar.add(n as u64);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Download the latest pages-articles dump for `wikiname` (e.g. "enwiki").
///
/// Writes to `path` when given, else to a filename derived from the URL, and
/// refuses to overwrite an existing file. Returns the path written.
pub fn download(wikiname: &str, path: Option<PathBuf>) -> Result<PathBuf, DownloadError> {
    let url = dump_url(wikiname);
    let mut resp = reqwest::blocking::get(&url)?;
    if !resp.status().is_success() {
        return Err(DownloadError::Status(resp.status().as_u16(), url));
    }

    let path = path.unwrap_or_else(|| {
        PathBuf::from(format!("{}-latest-pages-articles.xml.bz2", wikiname))
    });
    let out = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)?;

    info!("downloading from {} to {}", url, path.display());
    match resp.content_length() {
        Some(total) => {
            let mut bar = ProgressBar::new(total);
            bar.set_units(Units::Bytes);
            let mut writer = PbWriter { inner: out, bar };
            io::copy(&mut resp, &mut writer)?;
            writer.bar.finish();
        }
        None => {
            let mut out = out;
            io::copy(&mut resp, &mut out)?;
        }
    }
    info!("download of {} done", url);
    Ok(path)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_dump_url() {
        assert_eq!(
            dump_url("nlwiki"),
            "https://dumps.wikimedia.org/nlwiki/latest/nlwiki-latest-pages-articles.xml.bz2"
        );
    }
}
