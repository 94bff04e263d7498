use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

use bzip2::read::BzDecoder;

/// Open a dump file as a buffered reader, decompressing transparently when
/// the path carries a .bz2 extension.
pub fn open_dump(path: &Path) -> io::Result<Box<dyn BufRead + Send>> {
    let file = File::open(path)?;
    let buf = BufReader::with_capacity(8192 * 4, file);
    if path.extension().map_or(false, |ext| ext == "bz2") {
        let dec = BzDecoder::new(buf);
        Ok(Box::new(BufReader::with_capacity(8192 * 16, dec)))
    } else {
        Ok(Box::new(buf))
    }
}
