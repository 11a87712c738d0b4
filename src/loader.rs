// src/loader.rs

//! Program image loading: big-endian 4-byte words, no header.

use crate::error::{VmError, Word};
use std::fs;
use std::path::Path;

const WORD_BYTES: usize = 4;

/// Splits `bytes` into big-endian words.
pub fn parse_image(bytes: &[u8]) -> Result<Vec<Word>, VmError> {
    if bytes.len() % WORD_BYTES != 0 {
        return Err(VmError::MisalignedImage(bytes.len()));
    }
    Ok(bytes
        .chunks_exact(WORD_BYTES)
        .map(|chunk| Word::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

/// Serializes words into the image format read by [`parse_image`].
pub fn encode_image(words: &[Word]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_be_bytes()).collect()
}

pub fn load_file(path: &Path) -> Result<Vec<Word>, VmError> {
    let bytes = fs::read(path)?;
    let words = parse_image(&bytes)?;
    tracing::debug!("loaded {} words from {}", words.len(), path.display());
    Ok(words)
}
