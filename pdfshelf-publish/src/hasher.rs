//! SHA-256 content digests.

use std::io::{ErrorKind, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

use pdfshelf_core::ContentDigest;

use crate::error::{io_err, PublishError};

const CHUNK_SIZE: usize = 1024 * 1024;

/// Digest of an in-memory buffer.
pub fn digest_bytes(bytes: &[u8]) -> ContentDigest {
    let mut h = Sha256::new();
    h.update(bytes);
    finish(h)
}

/// Digest of everything `reader` yields, read in 1 MiB chunks.
pub fn digest_reader(mut reader: impl Read) -> std::io::Result<ContentDigest> {
    let mut h = Sha256::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => h.update(&buf[..n]),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(finish(h))
}

/// Digest of the file at `path`.
pub fn digest_file(path: &Path) -> Result<ContentDigest, PublishError> {
    let file = std::fs::File::open(path).map_err(|e| io_err(path, e))?;
    digest_reader(file).map_err(|e| io_err(path, e))
}

fn finish(h: Sha256) -> ContentDigest {
    ContentDigest::from_bytes(h.finalize().into())
}
