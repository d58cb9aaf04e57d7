//! Growable JSON output buffer.
//!
//! Every append reserves with `try_reserve`, so running out of memory while
//! building a page surfaces as [`Error::Allocation`] instead of aborting.

use crate::error::{Error, Result};
use crate::model::Rect;

use super::escape::escape_str;

/// Append-only JSON text buffer.
#[derive(Debug)]
pub struct JsonWriter {
    buf: Vec<u8>,
}

impl JsonWriter {
    /// Create a writer with `capacity` bytes reserved up front.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        let mut buf = Vec::new();
        buf.try_reserve(capacity)?;
        Ok(Self { buf })
    }

    /// Append raw JSON text.
    pub fn raw(&mut self, s: &str) -> Result<()> {
        self.buf.try_reserve(s.len())?;
        self.buf.extend_from_slice(s.as_bytes());
        Ok(())
    }

    /// Append `s` as a quoted, escaped JSON string.
    pub fn string(&mut self, s: &str) -> Result<()> {
        self.quoted(&escape_str(s))
    }

    /// Append already escaped text between quotes.
    pub fn quoted(&mut self, escaped: &str) -> Result<()> {
        self.buf.try_reserve(escaped.len() + 2)?;
        self.buf.push(b'"');
        self.buf.extend_from_slice(escaped.as_bytes());
        self.buf.push(b'"');
        Ok(())
    }

    /// Append `"name":`.
    pub fn key(&mut self, name: &str) -> Result<()> {
        self.string(name)?;
        self.raw(":")
    }

    /// Append an integer.
    pub fn int(&mut self, value: i64) -> Result<()> {
        self.raw(&value.to_string())
    }

    /// Append `[x0,y0,x1,y1]` with each coordinate truncated to an integer.
    pub fn rect_int(&mut self, r: &Rect) -> Result<()> {
        let [x0, y0, x1, y1] = r.to_array().map(truncate);
        self.raw(&format!("[{},{},{},{}]", x0, y0, x1, y1))
    }

    /// Append `[x0,y0,x1,y1]` in `%g` notation.
    pub fn rect_g(&mut self, r: &Rect) -> Result<()> {
        let [x0, y0, x1, y1] = r.to_array().map(format_g);
        self.raw(&format!("[{},{},{},{}]", x0, y0, x1, y1))
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Take the finished document.
    pub fn into_string(self) -> Result<String> {
        String::from_utf8(self.buf).map_err(|e| Error::Other(format!("output is not UTF-8: {}", e)))
    }
}

/// Truncate toward zero; out-of-range values saturate and NaN becomes 0.
pub fn truncate(v: f32) -> i32 {
    v as i32
}

/// Format a number like C's `%g`: six significant digits, trailing zeros
/// removed, exponent form outside `[1e-4, 1e6)`. Non-finite values give `0`.
pub fn format_g(v: f32) -> String {
    const PRECISION: i32 = 6;

    let v = f64::from(v);
    if !v.is_finite() || v == 0.0 {
        return "0".to_string();
    }

    // Rounding to the target precision decides the exponent
    let sci = format!("{:.*e}", (PRECISION - 1) as usize, v);
    let Some((mantissa, exp)) = sci.split_once('e') else {
        return sci;
    };
    let exp: i32 = exp.parse().unwrap_or(0);

    if exp < -4 || exp >= PRECISION {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_zeros(mantissa), sign, exp.abs())
    } else {
        let decimals = (PRECISION - 1 - exp) as usize;
        trim_zeros(&format!("{:.*}", decimals, v)).to_string()
    }
}

fn trim_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}
