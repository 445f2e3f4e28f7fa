use std::io::{Read, Write};

use dbkit_core::error::{Result, StorageError};

use crate::types::Compression;

pub(crate) fn compress(kind: Compression, bytes: &[u8]) -> Result<Vec<u8>> {
    match kind {
        Compression::None => Ok(bytes.to_vec()),
        Compression::Gzip => {
            let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
            encoder
                .write_all(bytes)
                .map_err(|e| StorageError { operation: "gzip_compress".to_string(), message: e.to_string() })?;
            encoder
                .finish()
                .map_err(|e| StorageError { operation: "gzip_compress".to_string(), message: e.to_string() }.into())
        }
        Compression::Bzip2 => {
            let mut encoder = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
            encoder
                .write_all(bytes)
                .map_err(|e| StorageError { operation: "bzip2_compress".to_string(), message: e.to_string() })?;
            encoder
                .finish()
                .map_err(|e| StorageError { operation: "bzip2_compress".to_string(), message: e.to_string() }.into())
        }
    }
}

pub(crate) fn decompress(kind: Compression, bytes: &[u8]) -> Result<Vec<u8>> {
    match kind {
        Compression::None => Ok(bytes.to_vec()),
        Compression::Gzip => {
            let mut decoder = flate2::read::GzDecoder::new(bytes);
            let mut out = Vec::new();
            decoder
                .read_to_end(&mut out)
                .map_err(|e| StorageError { operation: "gzip_decompress".to_string(), message: e.to_string() })?;
            Ok(out)
        }
        Compression::Bzip2 => {
            let mut decoder = bzip2::read::BzDecoder::new(bytes);
            let mut out = Vec::new();
            decoder
                .read_to_end(&mut out)
                .map_err(|e| StorageError { operation: "bzip2_decompress".to_string(), message: e.to_string() })?;
            Ok(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gzip_round_trips() {
        let original = b"the quick brown fox jumps over the lazy dog".repeat(20);
        let compressed = compress(Compression::Gzip, &original).unwrap();
        assert!(compressed.len() < original.len());
        assert_eq!(decompress(Compression::Gzip, &compressed).unwrap(), original);
    }

    #[test]
    fn bzip2_round_trips() {
        let original = b"the quick brown fox jumps over the lazy dog".repeat(20);
        let compressed = compress(Compression::Bzip2, &original).unwrap();
        assert_eq!(decompress(Compression::Bzip2, &compressed).unwrap(), original);
    }

    #[test]
    fn none_is_a_no_op() {
        let original = b"passthrough".to_vec();
        let stored = compress(Compression::None, &original).unwrap();
        assert_eq!(stored, original);
    }
}
