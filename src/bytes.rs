//! Helpers for showing byte symbols to humans.

use bstr::ByteSlice;

/// Renders symbol bytes as text, escaping anything that is not printable UTF-8.
///
/// Partial UTF-8 sequences (common for byte-level symbols) show up as `\xNN` escapes.
#[must_use]
pub fn render_symbol(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for (start, end, ch) in bytes.char_indices() {
        if ch == char::REPLACEMENT_CHARACTER && bytes[start..end] != *"\u{FFFD}".as_bytes() {
            for byte in &bytes[start..end] {
                out.push_str(&format!("\\x{byte:02X}"));
            }
        } else if ch.is_control() {
            out.extend(ch.escape_default());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Renders a merge rule as `left + right`.
#[must_use]
pub fn render_merge(left: &[u8], right: &[u8]) -> String {
    format!("\"{}\" + \"{}\"", render_symbol(left), render_symbol(right))
}
