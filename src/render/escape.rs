//! JSON string escaping for character codes.
//!
//! `"` and `\` are backslash-escaped, code points below 32 become `\u00xx`
//! with lowercase hex digits, and everything else is written literally.
//! Codes that are not Unicode scalar values are written as U+FFFD.

use std::fmt::Write;

/// Append the escaped form of one code point to `out`.
pub fn escape_code_point(code: u32, out: &mut String) {
    match code {
        0x22 => out.push_str("\\\""),
        0x5C => out.push_str("\\\\"),
        c if c < 32 => {
            // Writing to a String cannot fail
            let _ = write!(out, "\\u{:04x}", c);
        }
        c => out.push(char::from_u32(c).unwrap_or(char::REPLACEMENT_CHARACTER)),
    }
}

/// Append the escaped form of every code point in `codes` to `out`.
pub fn escape_code_points<I>(codes: I, out: &mut String)
where
    I: IntoIterator<Item = u32>,
{
    for code in codes {
        escape_code_point(code, out);
    }
}

/// Escape a string for use between JSON quotes.
pub fn escape_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    escape_code_points(s.chars().map(u32::from), &mut out);
    out
}
