//! Base64 and percent-encoding helpers shared by the scheme decoders.

use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine;
use percent_encoding::{percent_decode_str, AsciiSet, CONTROLS};

/// Characters escaped in userinfo and fragments of generated links.
pub(crate) const COMPONENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b':')
    .add(b';')
    .add(b'<')
    .add(b'=')
    .add(b'>')
    .add(b'?')
    .add(b'@')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Decode base64 in any of the variants found in the wild: standard or
/// URL-safe alphabet, with or without padding, possibly line-wrapped.
pub(crate) fn decode_base64(input: &str) -> Option<Vec<u8>> {
    let mut cleaned: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return None;
    }
    let rem = cleaned.trim_end_matches('=').len() % 4;
    cleaned = cleaned.trim_end_matches('=').to_string();
    if rem != 0 {
        cleaned.push_str(&"=".repeat(4 - rem));
    }

    [&STANDARD, &URL_SAFE]
        .into_iter()
        .find_map(|engine| engine.decode(&cleaned).ok())
}

/// Decode base64 into UTF-8 text.
pub(crate) fn decode_base64_text(input: &str) -> Option<String> {
    decode_base64(input).and_then(|bytes| String::from_utf8(bytes).ok())
}

/// Percent-decode, keeping the input unchanged when it is not valid UTF-8
/// after decoding.
pub(crate) fn percent_decode(input: &str) -> String {
    percent_decode_str(input)
        .decode_utf8()
        .map_or_else(|_| input.to_string(), |cow| cow.into_owned())
}

/// Empty fragments are treated as absent.
pub(crate) fn fragment_name(fragment: Option<&str>) -> Option<String> {
    fragment
        .map(percent_decode)
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
}
