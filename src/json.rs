//! Fixed-key JSON helpers for the HTTP API
//!
//! The phone app and the firmware exchange a small, fixed, unescaped key
//! set. Extraction is a whitelisted-substring scan, deliberately not a JSON
//! grammar: a key is located by the literal `"key":` needle and the numeric
//! token after it is parsed as far as it goes. This matches what clients
//! actually send and keeps the parser out of the request hot path.

/// Extract the numeric value following `"key":` in `body`.
///
/// Returns `None` when the key is absent or no number follows it. Only the
/// leading numeric prefix after the colon is consumed, so trailing commas,
/// braces, or whitespace do not matter.
pub fn number_field(body: &str, key: &str) -> Option<f32> {
    let needle = format!("\"{}\":", key);
    let at = body.find(&needle)? + needle.len();
    let rest = body[at..].trim_start();

    let end = rest
        .find(|c: char| !matches!(c, '0'..='9' | '-' | '+' | '.'))
        .unwrap_or(rest.len());
    if end == 0 {
        return None;
    }
    rest[..end].parse().ok()
}

/// `{"heater":H,"freezer":F,"shaken":B}` with one-decimal floats
pub fn status_body(heater: f32, freezer: f32, shaken: bool) -> String {
    format!(
        "{{\"heater\":{:.1},\"freezer\":{:.1},\"shaken\":{}}}",
        heater, freezer, shaken
    )
}

/// `{"status":"ok","heater":H,"freezer":F}` with one-decimal floats
pub fn config_body(heater: f32, freezer: f32) -> String {
    format!(
        "{{\"status\":\"ok\",\"heater\":{:.1},\"freezer\":{:.1}}}",
        heater, freezer
    )
}

/// Fixed acknowledgment body for the reset endpoint
pub const RESET_BODY: &str = "{\"status\":\"ok\"}";
