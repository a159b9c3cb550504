//! Set container decoding.
//!
//! A `.als` document is a gzip stream of UTF-8 XML.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use flate2::read::GzDecoder;

use crate::error::LoadError;
use crate::progress::{DecodeProgress, LoadStage};

const CHUNK_BYTES: usize = 64 * 1024;

/// Reads and inflates a whole document.
pub fn decode(path: &Path) -> Result<String, LoadError> {
    decode_with_progress(path, |_| {})
}

/// Like [`decode`], reporting `reading`, `unzipping`, one `processing`
/// event per decompressed chunk, then `complete`. Percent is on the decoder's
/// own 0-100 scale and is capped at 95 until the payload is complete.
pub fn decode_with_progress(
    path: &Path,
    mut on_progress: impl FnMut(DecodeProgress),
) -> Result<String, LoadError> {
    let fail = |message: String| LoadError::ContainerDecode {
        path: path.to_path_buf(),
        message,
    };

    on_progress(DecodeProgress {
        stage: LoadStage::Reading,
        percent: 0.0,
        bytes_read: None,
        bytes_total: None,
    });

    let file = File::open(path).map_err(|e| fail(e.to_string()))?;
    let bytes_total = file.metadata().map_err(|e| fail(e.to_string()))?.len();

    on_progress(DecodeProgress {
        stage: LoadStage::Unzipping,
        percent: 25.0,
        bytes_read: None,
        bytes_total: Some(bytes_total),
    });

    let mut decoder = GzDecoder::new(BufReader::new(file));
    let mut payload = Vec::new();
    let mut chunk = vec![0u8; CHUNK_BYTES];
    let mut bytes_read = 0u64;
    loop {
        let n = decoder.read(&mut chunk).map_err(|e| fail(e.to_string()))?;
        if n == 0 {
            break;
        }
        payload.extend_from_slice(&chunk[..n]);
        bytes_read += n as u64;
        // Decompressed bytes over compressed size overshoots, hence the cap.
        let percent = (25.0 + bytes_read as f64 / bytes_total.max(1) as f64 * 70.0).min(95.0);
        on_progress(DecodeProgress {
            stage: LoadStage::Processing,
            percent,
            bytes_read: Some(bytes_read),
            bytes_total: Some(bytes_total),
        });
    }

    let text =
        String::from_utf8(payload).map_err(|e| fail(format!("payload is not UTF-8: {}", e)))?;
    on_progress(DecodeProgress {
        stage: LoadStage::Complete,
        percent: 100.0,
        bytes_read: Some(bytes_read),
        bytes_total: Some(bytes_total),
    });
    Ok(text)
}
