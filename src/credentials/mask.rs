//! Display-safe rendering of secrets.

/// Fixed prefix shown in place of the hidden part of a token
const MASK: &str = "****";

/// Number of trailing characters revealed
const REVEALED_CHARS: usize = 4;

/// Masks a token for display, revealing at most its last four characters.
///
/// - `""` → `""`
/// - 1 to 4 characters → `"****"`
/// - longer → `"****"` followed by the last four characters
///
/// Characters are counted as Unicode scalar values, so the result is always
/// valid UTF-8.
pub fn mask_token(token: &str) -> String {
    if token.is_empty() {
        return String::new();
    }

    let len = token.chars().count();
    if len <= REVEALED_CHARS {
        return MASK.to_string();
    }

    let tail: String = token.chars().skip(len - REVEALED_CHARS).collect();
    format!("{}{}", MASK, tail)
}
