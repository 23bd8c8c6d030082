//! Pure input validators for individual collection steps.

use super::answers::ResponseMode;

/// True iff `s` is one of the accepted response-mode tokens.
///
/// Delegates to [`ResponseMode::parse`] so the validator and the parser can
/// never disagree on which tokens are accepted.
pub fn is_mode_token(s: &str) -> bool {
    ResponseMode::parse(s).is_some()
}

/// True iff `s` is non-empty and every character is an ASCII digit.
///
/// No locale-aware parsing and no sign support: a leading `-` or `+` fails,
/// which is the intent (ages are unsigned integer literals).
pub fn is_digits_only(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}
