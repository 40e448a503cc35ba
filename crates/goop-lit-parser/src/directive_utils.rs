//! String processing helpers for directive values
//!
//! Line continuation handling for `RUN:` and list splitting for
//! `XFAIL:` / `REQUIRES:`.

/// Split a `RUN:` value into its command text and whether it continues
/// onto the next `RUN:` line
///
/// A value continues when its last non-blank character is a backslash.
pub fn split_continuation(value: &str) -> (&str, bool) {
    let trimmed = value.trim_end();
    trimmed
        .strip_suffix('\\')
        .map_or((trimmed, false), |head| (head.trim_end(), true))
}

/// Append a continued line to an accumulated command
///
/// Pieces are joined with a single space; blank pieces add nothing.
pub fn join_continued(acc: &mut String, piece: &str) {
    let piece = piece.trim();
    if piece.is_empty() {
        return;
    }
    if !acc.is_empty() {
        acc.push(' ');
    }
    acc.push_str(piece);
}

/// Parse a comma separated feature list
///
/// Entries are trimmed; empty entries are dropped.
pub fn parse_feature_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|feature| !feature.is_empty())
        .map(str::to_string)
        .collect()
}
