//! Gzip transform applied to content before it is sent to a backend
//! that stores it with `Content-Encoding: gzip`.
//!
//! The gzip header's modification time is always zero, so identical
//! input yields byte-identical output.

use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};

use bytes::Bytes;
use flate2::read::GzDecoder;
use flate2::{Compression, GzBuilder};

/// Content encoding produced by [`compress`].
pub const GZIP_ENCODING: &str = "gzip";

/// Gzip `content`.
///
/// # Errors
///
/// Returns an error if the encoder fails to write.
pub fn compress(content: impl AsRef<[u8]>) -> io::Result<Bytes> {
    let mut encoder = GzBuilder::new()
        .mtime(0)
        .write(Vec::new(), Compression::default());
    encoder.write_all(content.as_ref())?;
    encoder.finish().map(Bytes::from)
}

/// Rewind `reader`, read it fully and gzip it.
///
/// The returned cursor is positioned at the start.
///
/// # Errors
///
/// Returns an error if the reader cannot be rewound or read.
pub fn compress_stream<R: Read + Seek>(mut reader: R) -> io::Result<Cursor<Vec<u8>>> {
    reader.seek(SeekFrom::Start(0))?;
    let mut raw = Vec::new();
    reader.read_to_end(&mut raw)?;
    let compressed = compress(&raw)?;
    Ok(Cursor::new(compressed.to_vec()))
}

/// Reverse [`compress`].
///
/// # Errors
///
/// Returns an error if `content` is not valid gzip.
pub fn decompress(content: impl AsRef<[u8]>) -> io::Result<Bytes> {
    let mut decoder = GzDecoder::new(content.as_ref());
    let mut raw = Vec::new();
    decoder.read_to_end(&mut raw)?;
    Ok(Bytes::from(raw))
}

/// Check gzip magic bytes.
#[inline]
pub fn is_gzip(data: &[u8]) -> bool {
    data.len() >= 2 && data[0] == 0x1f && data[1] == 0x8b
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compress_sets_zero_mtime() {
        let compressed = compress(b"hello").expect("compresses");
        assert!(is_gzip(&compressed));
        // Bytes 4..8 of the gzip header hold MTIME.
        assert_eq!(&compressed[4..8], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_compress_accepts_bytes_and_vec() {
        let from_slice = compress(b"payload").expect("compresses");
        let from_vec = compress(b"payload".to_vec()).expect("compresses");
        let from_bytes = compress(Bytes::from_static(b"payload")).expect("compresses");
        assert_eq!(from_slice, from_vec);
        assert_eq!(from_vec, from_bytes);
    }

    #[test]
    fn test_compress_stream_rewinds_input_and_output() {
        let mut input = Cursor::new(b"stream content".to_vec());
        input.seek(SeekFrom::End(0)).expect("seek");

        let mut output = compress_stream(input).expect("compresses");
        assert_eq!(output.position(), 0);

        let mut compressed = Vec::new();
        output.read_to_end(&mut compressed).expect("read");
        assert_eq!(
            decompress(&compressed).expect("decompresses").as_ref(),
            b"stream content"
        );
    }

    #[test]
    fn test_decompress_rejects_garbage() {
        assert!(decompress(b"not gzip").is_err());
    }

    #[test]
    fn test_empty_content_round_trip() {
        let compressed = compress(b"").expect("compresses");
        assert!(decompress(&compressed).expect("decompresses").is_empty());
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Decompressing compressed content yields the original bytes.
        #[test]
        fn prop_round_trip(content in prop::collection::vec(any::<u8>(), 0..4096)) {
            let compressed = compress(&content).expect("compresses");
            let restored = decompress(&compressed).expect("decompresses");
            prop_assert_eq!(restored.as_ref(), content.as_slice());
        }

        /// Compression is reproducible byte-for-byte.
        #[test]
        fn prop_deterministic(content in prop::collection::vec(any::<u8>(), 0..4096)) {
            prop_assert_eq!(
                compress(&content).expect("compresses"),
                compress(&content).expect("compresses")
            );
        }
    }
}
