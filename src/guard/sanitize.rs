use super::Reason;
use percent_encoding::percent_decode_str;

/// Default cap on the untrusted string, in bytes, before decoding.
pub const DEFAULT_MAX_INPUT_LEN: usize = 4096;

/// Trims, bounds, and percent-decodes `input` exactly once.
///
/// Malformed escapes and invalid UTF-8 are rejections, never a fallback to
/// the raw string. Anything still looking like an escape after the single
/// decode pass (e.g. `%2e` out of `%252e`) stays literal.
pub fn sanitize(input: &str, max_len: usize) -> Result<String, Reason> {
    if input.len() > max_len {
        return Err(Reason::InvalidInput);
    }
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(Reason::InvalidInput);
    }
    if !escapes_well_formed(trimmed) {
        return Err(Reason::InvalidInput);
    }
    let decoded = percent_decode_str(trimmed)
        .decode_utf8()
        .map_err(|_| Reason::InvalidInput)?;
    if decoded.contains('\0') || decoded.trim().is_empty() {
        return Err(Reason::InvalidInput);
    }
    Ok(decoded.into_owned())
}

// percent_decode_str passes `%zz` and a trailing `%` through untouched, so
// the grammar is checked up front.
fn escapes_well_formed(s: &str) -> bool {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            match bytes.get(i + 1..i + 3) {
                Some([hi, lo]) if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit() => i += 3,
                _ => return false,
            }
        } else {
            i += 1;
        }
    }
    true
}
