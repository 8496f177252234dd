//! Internal utility functions and helpers.
//!
//! This module contains small helper functions used throughout the crate.
//! It is an implementation detail and not part of the public API.

use crate::error::ChunkError;

/// Checks that `offset..offset + length` lies inside `0..capacity`.
///
/// Every bulk operation validates its range with this before touching any
/// cursor, so a rejected call leaves no partial mutation behind.
pub(crate) fn check_range(offset: usize, length: usize, capacity: usize) -> Result<(), ChunkError> {
    match offset.checked_add(length) {
        Some(end) if end <= capacity => Ok(()),
        _ => Err(ChunkError::IndexOutOfRange {
            offset,
            length,
            capacity,
        }),
    }
}
