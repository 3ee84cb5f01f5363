use once_cell::sync::Lazy;
use regex::Regex;

/// Positional marker prefix on exported modification codes:
/// `D<digits> <text>`, with dotted step numbers such as `D1.2` allowed.
static MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^D[0-9.]* (.*)$").expect("valid marker regex"));

/// Strips the positional marker from a modification code.
///
/// `"D3 replaced valve"` becomes `"replaced valve"`; a code without the
/// marker is returned unchanged apart from a single surrounding trim.
#[must_use]
pub fn normalize_modification(raw: &str) -> String {
    match MARKER.captures(raw) {
        Some(caps) => caps.get(1).map_or(raw, |m| m.as_str()).trim().to_string(),
        None => raw.trim().to_string(),
    }
}
