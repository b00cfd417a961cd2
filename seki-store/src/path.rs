//! Path syntax for addressing keys across nested stores.
//!
//! A path is a sequence of key segments separated by `:`. There is no
//! escaping mechanism; a segment can never contain the delimiter. Empty
//! segments produced by leading, trailing, or doubled delimiters are
//! literal `""` keys, not an error.

/// Segment delimiter. Reserved; keys must not contain it.
pub const DELIMITER: char = ':';

/// Split a path into its key segments.
///
/// Always yields at least one segment: the empty path addresses the
/// literal key `""`.
pub fn segments(path: &str) -> Vec<&str> {
    path.split(DELIMITER).collect()
}
