//! Corpus persistence.
//!
//! A corpus is a JSON Lines stream of [`Post`] records with no header or
//! record count. Loading reads records until the stream runs out and sends
//! each through [`ActivityStore::ingest`]. Saving writes a full snapshot of
//! the store into a temp file beside the target and renames it over the
//! target, so a crash mid-save leaves the previous corpus intact.

use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use sleepless_common::Post;

use crate::author::Author;
use crate::error::{Result, StoreError};
use crate::index::AuthorTable;
use crate::store::ActivityStore;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoadStats {
    /// Records decoded from the stream.
    pub read: usize,
    /// Records that were not already in the store.
    pub new: usize,
}

/// Load a corpus file into `store`. A missing file is an empty corpus.
///
/// On a malformed record the load stops with [`StoreError::Decode`]; every
/// record before it stays ingested.
pub fn load_corpus<T: AuthorTable<Author>>(
    store: &mut ActivityStore<T>,
    path: &Path,
) -> Result<LoadStats> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!(path = %path.display(), "No corpus on disk, starting empty");
            return Ok(LoadStats::default());
        }
        Err(e) => return Err(e.into()),
    };

    let stats = load_from_reader(store, BufReader::new(file))?;
    info!(
        path = %path.display(),
        read = stats.read,
        new = stats.new,
        authors = store.author_count(),
        "Corpus loaded"
    );
    Ok(stats)
}

pub fn load_from_reader<T: AuthorTable<Author>, R: Read>(
    store: &mut ActivityStore<T>,
    reader: R,
) -> Result<LoadStats> {
    let mut stats = LoadStats::default();
    let stream = serde_json::Deserializer::from_reader(reader).into_iter::<Post>();

    for record in stream {
        match record {
            Ok(post) => {
                stats.read += 1;
                if store.ingest(post).is_new {
                    stats.new += 1;
                }
            }
            // A record cut off by the end of the stream ends the load like a
            // clean end of stream does.
            Err(e) if e.is_eof() => {
                warn!(read = stats.read, error = %e, "Corpus ends in a truncated record");
                break;
            }
            Err(e) => {
                return Err(StoreError::Decode {
                    record: stats.read + 1,
                    ingested: stats.read,
                    source: e,
                });
            }
        }
    }
    Ok(stats)
}

/// Serialize a full snapshot of the store into one JSON Lines buffer.
/// Returns the buffer and the number of posts in it.
pub fn encode_corpus<T: AuthorTable<Author>>(store: &ActivityStore<T>) -> Result<(Vec<u8>, usize)> {
    let mut bytes = Vec::new();
    let written = save_to_writer(store, &mut bytes)?;
    Ok((bytes, written))
}

/// Replace `path` with `bytes` through a synced temp file in the same
/// directory. Blocking; async callers run it on the blocking pool.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;
    debug!(path = %path.display(), bytes = bytes.len(), "Corpus written");
    Ok(())
}

/// Rename a corpus that could not be fully read to
/// `<file name>.damaged-<tag>` beside it, so the next save cannot replace
/// the records that were never loaded. Returns the new path.
pub fn set_aside(path: &Path, tag: &str) -> Result<PathBuf> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "corpus".to_string());
    let aside = path.with_file_name(format!("{name}.damaged-{tag}"));
    std::fs::rename(path, &aside)?;
    warn!(
        from = %path.display(),
        to = %aside.display(),
        "Damaged corpus set aside"
    );
    Ok(aside)
}

pub fn save_to_writer<T: AuthorTable<Author>, W: Write>(
    store: &ActivityStore<T>,
    mut writer: W,
) -> Result<usize> {
    let mut written = 0usize;
    for post in store.posts() {
        serde_json::to_writer(&mut writer, post).map_err(StoreError::Encode)?;
        writer.write_all(b"\n")?;
        written += 1;
    }
    Ok(written)
}
