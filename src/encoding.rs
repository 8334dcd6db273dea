use crate::constants::{MAX_INFO_CHARS, TRUNCATION_MARKER};

/// Prepares a completion for storage on chain.
///
/// Text longer than `MAX_INFO_CHARS` characters is cut to its first `MAX_INFO_CHARS`
/// characters and suffixed with `TRUNCATION_MARKER`. Shorter text is returned unchanged.
///
/// Characters are Unicode scalar values, so the result is always valid UTF-8, but a
/// grapheme cluster (an emoji with modifiers, a letter with combining marks) can still be
/// split at the cut.
pub fn encode_response_for_onchain(response_text: &str) -> String {
    match response_text.char_indices().nth(MAX_INFO_CHARS) {
        Some((cut, _)) => {
            let mut encoded = String::with_capacity(cut + TRUNCATION_MARKER.len());
            encoded.push_str(&response_text[..cut]);
            encoded.push_str(TRUNCATION_MARKER);
            encoded
        }
        None => response_text.to_owned(),
    }
}
