//! Low-level byte handling utilities.

/// Strip surrounding padding from a fixed-width DBF field.
///
/// dBASE pads field values with spaces (numeric fields are right-justified)
/// and some writers pad with NUL instead; both are trimmed from either end
/// before the bytes are interpreted.
pub fn trim_field(raw: &[u8]) -> &[u8] {
    let is_pad = |b: &u8| matches!(b, b' ' | b'\0' | b'\t' | b'\r' | b'\n');
    let start = raw.iter().position(|b| !is_pad(b)).unwrap_or(raw.len());
    let end = raw.iter().rposition(|b| !is_pad(b)).map_or(start, |p| p + 1);
    &raw[start..end]
}
