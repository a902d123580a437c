// Copyright (c) The live-run Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::Serializer;
use std::time::Duration;

/// Serializes an optional duration as a number of seconds.
pub(crate) fn serialize_duration_secs<S>(
    duration: &Option<Duration>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match duration {
        Some(duration) => serializer.serialize_some(&duration.as_secs_f64()),
        None => serializer.serialize_none(),
    }
}

/// Returns the characters `start..end` of `s`, or `None` if `s` is too short.
///
/// Offsets count characters, not bytes.
pub(crate) fn char_range(s: &str, start: usize, end: usize) -> Option<&str> {
    let from = char_offset(s, start)?;
    let to = char_offset(s, end)?;
    s.get(from..to)
}

/// Returns `s` with its first `n` characters removed, or `None` if `s` has fewer than `n`.
pub(crate) fn skip_chars(s: &str, n: usize) -> Option<&str> {
    char_offset(s, n).map(|from| &s[from..])
}

// The byte offset of the nth character. The length of the string counts as a valid offset.
fn char_offset(s: &str, n: usize) -> Option<usize> {
    s.char_indices()
        .map(|(ix, _)| ix)
        .chain(std::iter::once(s.len()))
        .nth(n)
}
