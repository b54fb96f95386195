//! Conversation identity: a deterministic key for the thread between two users.

use std::fmt::Display;

const SEPARATOR: char = '_';

/// Both ids in canonical string form, sorted lexicographically and joined
/// with `_`. Order-independent; `a == b` yields `"<id>_<id>"`.
pub fn conversation_id(a: impl Display, b: impl Display) -> String {
    let (a, b) = (a.to_string(), b.to_string());
    if a <= b {
        format!("{a}{SEPARATOR}{b}")
    } else {
        format!("{b}{SEPARATOR}{a}")
    }
}

/// Splits an id back into its two halves. `None` when the separator is missing.
pub fn participants(conversation_id: &str) -> Option<(&str, &str)> {
    conversation_id.split_once(SEPARATOR)
}
