//! Object-image loading.
//!
//! An image is a 2-byte big-endian origin address followed by big-endian
//! 16-bit words, placed into memory starting at the origin.

use std::fs;
use std::path::Path;

use crate::error::LoadError;
use crate::state::{VmState, MEMORY_MAX};

/// Copy an object image into memory and point PC at its origin.
///
/// The image is bounds-checked in full before the first word is written, so
/// a failed load leaves memory untouched. Registers other than PC are never
/// altered.
pub fn load(state: &mut VmState, bytes: &[u8]) -> Result<(), LoadError> {
    if bytes.len() < 2 {
        return Err(LoadError::ImageTruncated);
    }
    let origin = u16::from_be_bytes([bytes[0], bytes[1]]);
    let body = &bytes[2..];
    // Word count, not byte count: a trailing odd byte is not a word.
    let word_count = body.len() / 2;

    if origin as usize + word_count > MEMORY_MAX {
        return Err(LoadError::InputTooLarge {
            origin,
            words: word_count,
        });
    }

    for (i, word) in body.chunks_exact(2).enumerate() {
        let val = u16::from_be_bytes([word[0], word[1]]);
        state.raw_write(origin + i as u16, val);
    }
    state.set_pc(origin);
    Ok(())
}

/// Read an object image from disk and [`load`] it.
pub fn load_file(state: &mut VmState, path: impl AsRef<Path>) -> Result<(), LoadError> {
    let bytes = fs::read(path).map_err(LoadError::InputNotFound)?;
    load(state, &bytes)
}
