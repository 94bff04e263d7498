//! Streaming decoder for MediaWiki XML dumps.

use std::io::BufRead;
use std::str;

use crossbeam_channel::Sender;
use log::trace;
use quick_xml::{self as qx, events::Event};
use thiserror::Error;

/// A main-namespace Wikipedia article.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Page {
    pub title: String,
    pub text: String,
}

/// A Wikipedia redirect from `title` to `target`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Redirect {
    pub title: String,
    pub target: String,
}

#[derive(Debug, Error)]
pub enum DumpError {
    #[error("malformed XML: {0}")]
    Xml(quick_xml::Error),
    #[error("dump ends inside a <page> element")]
    Truncated,
    #[error("downstream queue closed")]
    Canceled,
}

impl From<quick_xml::Error> for DumpError {
    fn from(err: quick_xml::Error) -> DumpError {
        DumpError::Xml(err)
    }
}

/// Stream pages and redirects out of the dump `reader`.
///
/// Only main-namespace content is emitted. The sinks are borrowed, not
/// owned: dumps may span multiple files that share sinks, so closing the
/// queues is the caller's business. Sends block when a queue is full, which
/// is the pipeline's backpressure. Parse errors are fatal.
pub fn stream_pages<R: BufRead>(
    reader: R,
    pages: &Sender<Page>,
    redirects: &Sender<Redirect>,
) -> Result<(), DumpError> {
    let mut reader = qx::Reader::from_reader(reader);
    let mut buf = Vec::new();
    loop {
        match reader.read_event(&mut buf)? {
            Event::Start(ref tag) if tag.name() == b"page" => {
                parse_page(&mut reader, pages, redirects)?;
            }
            Event::Eof => break,
            _ => (),
        }
        buf.clear();
    }
    Ok(())
}

/// Parse a single page or redirect; the `<page>` start tag has just been
/// consumed.
fn parse_page<R: BufRead>(
    reader: &mut qx::Reader<R>,
    pages: &Sender<Page>,
    redirects: &Sender<Redirect>,
) -> Result<(), DumpError> {
    let mut main_ns = false;
    let mut title = String::new();
    let mut text = String::new();

    let mut buf = Vec::new();
    let mut text_buf = Vec::new();
    loop {
        match reader.read_event(&mut buf)? {
            Event::Start(ref tag) => match tag.name() {
                // The <ns> element comes after the title, so the title is
                // read unconditionally.
                b"title" => title = reader.read_text(b"title", &mut text_buf)?,
                b"ns" => main_ns = reader.read_text(b"ns", &mut text_buf)? == "0",
                b"text" => {
                    if main_ns {
                        text = reader.read_text(b"text", &mut text_buf)?;
                    }
                }
                _ => (),
            },
            Event::Empty(ref tag) => {
                if tag.name() == b"redirect" && main_ns {
                    if let Some(target) = redirect_target(tag)? {
                        trace!("redirect {} -> {}", title, target);
                        redirects
                            .send(Redirect { title, target })
                            .map_err(|_| DumpError::Canceled)?;
                        reader.read_to_end(b"page", &mut text_buf)?;
                        return Ok(());
                    }
                }
            }
            Event::End(ref tag) => {
                if tag.name() == b"page" {
                    if main_ns {
                        pages
                            .send(Page { title, text })
                            .map_err(|_| DumpError::Canceled)?;
                    }
                    return Ok(());
                }
            }
            Event::Eof => return Err(DumpError::Truncated),
            _ => (),
        }
        buf.clear();
    }
}

fn redirect_target(tag: &qx::events::BytesStart) -> Result<Option<String>, DumpError> {
    for attr in tag.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        if attr.key == b"title" {
            let value = attr.unescaped_value()?;
            let target = str::from_utf8(&value)
                .map_err(|e| quick_xml::Error::Utf8(e))?
                .to_owned();
            return Ok(Some(target));
        }
    }
    Ok(None)
}
