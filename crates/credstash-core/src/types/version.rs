//! Fixed-width version encoding
//!
//! Versions are persisted as 19-digit, zero-left-padded decimal strings so that
//! lexicographic order of the stored string equals numeric order. A single
//! descending, limit-1 key query then yields the latest version.

use crate::error::{Error, Result};

/// Width of a padded version string
pub const VERSION_WIDTH: usize = 19;

/// Largest version representable in [`VERSION_WIDTH`] digits
pub const MAX_VERSION: u64 = 9_999_999_999_999_999_999;

/// Padded form of "no version stored"
pub const ZERO_VERSION: &str = "0000000000000000000";

/// Pad a numeric version to the fixed width.
///
/// Fails with `InvalidArgument` for versions wider than [`VERSION_WIDTH`] digits.
pub fn pad(version: u64) -> Result<String> {
    if version > MAX_VERSION {
        return Err(Error::invalid_argument(format!(
            "version {} exceeds the maximum of {}",
            version, MAX_VERSION
        )));
    }
    Ok(format!("{:0width$}", version, width = VERSION_WIDTH))
}

/// Left-pad a version string with zeros to the fixed width.
///
/// Strings already at or beyond the width are returned unchanged.
pub fn pad_str(version: &str) -> String {
    format!("{:0>width$}", version, width = VERSION_WIDTH)
}

/// Strip leading zeros; an all-zero version becomes `"0"`.
pub fn unpad(version: &str) -> String {
    let trimmed = version.trim_start_matches('0');
    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Compute the version following `highest` (as stored, padded or not).
pub fn next_version(highest: &str) -> Result<u64> {
    let unpadded = unpad(highest);
    let current: u64 = unpadded
        .parse()
        .map_err(|_| Error::auto_increment(&unpadded))?;

    match current.checked_add(1) {
        Some(next) if next <= MAX_VERSION => Ok(next),
        _ => Err(Error::auto_increment(unpadded)),
    }
}
