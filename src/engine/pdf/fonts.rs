//! Font loading for the lopdf engine: names, capability flags, glyph widths
//! and per-code text decoding.

use std::sync::OnceLock;

use lopdf::{Dictionary, Document, Object};
use regex::Regex;

use super::{get_number, resolve};
use crate::model::{Font, FontFlags, FontId, FontTable};

// FontDescriptor /Flags bits (1-based in the PDF reference)
const FLAG_FIXED_PITCH: i64 = 1 << 0;
const FLAG_SERIF: i64 = 1 << 1;
const FLAG_ITALIC: i64 = 1 << 6;
const FLAG_FORCE_BOLD: i64 = 1 << 18;

fn subset_prefix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Z]{6}\+").expect("valid subset regex"))
}

fn monospace_name() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)courier|mono|consol|menlo|fixed").expect("valid regex"))
}

fn serif_name() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)times|serif|georgia|garamond|roman|cambria|bookman|palatino|minion")
            .expect("valid regex")
    })
}

fn sans_name() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)sans|helvetica|arial|verdana").expect("valid regex"))
}

fn bold_name() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)bold|black|heavy|semibold|demi").expect("valid regex"))
}

fn italic_name() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)italic|oblique|slanted").expect("valid regex"))
}

/// Strip a `ABCDEF+` subset tag from a font name.
pub(crate) fn display_name(base_font: &str) -> &str {
    match subset_prefix().find(base_font) {
        Some(m) => &base_font[m.end()..],
        None => base_font,
    }
}

/// Classify a font from its descriptor flags and its name.
pub(crate) fn classify(name: &str, descriptor: Option<&Dictionary>) -> FontFlags {
    let mut flags = FontFlags {
        monospaced: monospace_name().is_match(name),
        serif: false,
        bold: bold_name().is_match(name),
        italic: italic_name().is_match(name),
    };
    // "Sans Serif" names must not be taken as serif
    flags.serif = !sans_name().is_match(name) && serif_name().is_match(name);

    if let Some(desc) = descriptor {
        let bits = desc.get(b"Flags").ok().and_then(|o| o.as_i64().ok()).unwrap_or(0);
        flags.monospaced |= bits & FLAG_FIXED_PITCH != 0;
        flags.serif |= bits & FLAG_SERIF != 0;
        flags.italic |= bits & FLAG_ITALIC != 0;
        flags.bold |= bits & FLAG_FORCE_BOLD != 0;

        let weight = desc.get(b"FontWeight").ok().and_then(get_number);
        if weight.is_some_and(|w| w >= 600.0) {
            flags.bold = true;
        }
        let angle = desc.get(b"ItalicAngle").ok().and_then(get_number);
        if angle.is_some_and(|a| a.abs() > 0.5) {
            flags.italic = true;
        }
    }

    flags
}

/// One glyph out of a shown string.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Glyph {
    /// Text the glyph maps to; may be empty or hold several characters.
    pub text: String,
    /// Advance in glyph space (1/1000 of the font size).
    pub width: f32,
    /// Single-byte code 32, which receives word spacing.
    pub is_space_code: bool,
}

/// A font resource resolved for the duration of one page render.
pub(crate) struct LoadedFont<'a> {
    pub id: FontId,
    dict: Option<&'a Dictionary>,
    two_byte: bool,
    first_char: u32,
    widths: Vec<f32>,
    cid_widths: Vec<(u32, u32, f32)>,
    default_width: f32,
}

impl<'a> LoadedFont<'a> {
    /// Resolve `dict` and register it in the page font table.
    pub fn load(
        doc: &'a Document,
        dict: &'a Dictionary,
        resource_name: &[u8],
        fonts: &mut FontTable,
    ) -> Self {
        let subtype = name_of(dict.get(b"Subtype").ok());
        let two_byte = subtype.as_deref() == Some("Type0");

        let base_font = name_of(dict.get(b"BaseFont").ok())
            .unwrap_or_else(|| String::from_utf8_lossy(resource_name).to_string());
        let name = display_name(&base_font).to_string();

        let descendant = if two_byte {
            dict.get(b"DescendantFonts")
                .ok()
                .and_then(|o| resolve(doc, o).as_array().ok())
                .and_then(|arr| arr.first())
                .and_then(|o| resolve(doc, o).as_dict().ok())
        } else {
            None
        };

        let descriptor = descendant
            .unwrap_or(dict)
            .get(b"FontDescriptor")
            .ok()
            .and_then(|o| resolve(doc, o).as_dict().ok());

        let flags = classify(&name, descriptor);
        let id = fonts.add(Font::new(name, flags));

        let mut font = LoadedFont {
            id,
            dict: Some(dict),
            two_byte,
            first_char: 0,
            widths: Vec::new(),
            cid_widths: Vec::new(),
            default_width: if flags.monospaced { 600.0 } else { 500.0 },
        };

        if let Some(desc) = descendant {
            font.default_width = desc.get(b"DW").ok().and_then(get_number).unwrap_or(1000.0);
            if let Some(w) = desc.get(b"W").ok().and_then(|o| resolve(doc, o).as_array().ok()) {
                font.cid_widths = parse_cid_widths(doc, w);
            }
        } else {
            font.first_char = dict
                .get(b"FirstChar")
                .ok()
                .and_then(|o| resolve(doc, o).as_i64().ok())
                .unwrap_or(0)
                .max(0) as u32;
            if let Some(w) = dict
                .get(b"Widths")
                .ok()
                .and_then(|o| resolve(doc, o).as_array().ok())
            {
                font.widths = w
                    .iter()
                    .map(|o| get_number(resolve(doc, o)).unwrap_or(0.0))
                    .collect();
            }
            if let Some(missing) = descriptor
                .and_then(|d| d.get(b"MissingWidth").ok())
                .and_then(get_number)
                .filter(|w| *w > 0.0)
            {
                font.default_width = missing;
            }
        }

        font
    }

    /// Stand-in for text shown without a usable font resource.
    pub fn fallback(fonts: &mut FontTable) -> Self {
        LoadedFont {
            id: fonts.add(Font::plain("Unknown")),
            dict: None,
            two_byte: false,
            first_char: 0,
            widths: Vec::new(),
            cid_widths: Vec::new(),
            default_width: 500.0,
        }
    }

    /// Split a shown string into glyphs.
    pub fn glyphs(&self, doc: &Document, bytes: &[u8]) -> Vec<Glyph> {
        let encoding = self.dict.and_then(|d| d.get_font_encoding(doc).ok());
        let step = if self.two_byte { 2 } else { 1 };

        bytes
            .chunks(step)
            .map(|code_bytes| {
                let code = code_bytes
                    .iter()
                    .fold(0u32, |acc, b| (acc << 8) | u32::from(*b));
                let text = encoding
                    .as_ref()
                    .and_then(|enc| Document::decode_text(enc, code_bytes).ok())
                    .unwrap_or_else(|| decode_code_simple(code, self.two_byte));
                Glyph {
                    text,
                    width: self.width(code),
                    is_space_code: !self.two_byte && code == 32,
                }
            })
            .collect()
    }

    fn width(&self, code: u32) -> f32 {
        if self.two_byte {
            return self
                .cid_widths
                .iter()
                .find(|(first, last, _)| (*first..=*last).contains(&code))
                .map(|(_, _, w)| *w)
                .unwrap_or(self.default_width);
        }
        code.checked_sub(self.first_char)
            .and_then(|i| self.widths.get(i as usize))
            .copied()
            .filter(|w| *w > 0.0)
            .unwrap_or(self.default_width)
    }
}

/// Parse a CIDFont `/W` array: `c [w1 w2 ...]` or `c_first c_last w`.
fn parse_cid_widths(doc: &Document, w: &[Object]) -> Vec<(u32, u32, f32)> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < w.len() {
        let Some(first) = get_number(resolve(doc, &w[i])) else {
            break;
        };
        let first = first.max(0.0) as u32;
        match w.get(i + 1).map(|o| resolve(doc, o)) {
            Some(Object::Array(list)) => {
                for (k, item) in list.iter().enumerate() {
                    if let Some(width) = get_number(resolve(doc, item)) {
                        let cid = first + k as u32;
                        out.push((cid, cid, width));
                    }
                }
                i += 2;
            }
            Some(last) => {
                let last = get_number(last).unwrap_or(0.0).max(0.0) as u32;
                let width = w.get(i + 2).and_then(|o| get_number(resolve(doc, o)));
                if let Some(width) = width {
                    out.push((first, last, width));
                }
                i += 3;
            }
            None => break,
        }
    }
    out
}

fn name_of(obj: Option<&Object>) -> Option<String> {
    obj.and_then(|o| o.as_name().ok())
        .map(|n| String::from_utf8_lossy(n).to_string())
}

/// Fallback when a font carries no usable encoding: Latin-1 for one-byte
/// codes, UCS-2 for two-byte codes.
fn decode_code_simple(code: u32, two_byte: bool) -> String {
    let c = if two_byte {
        char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER)
    } else {
        char::from(code as u8)
    };
    c.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FontQuery;
    use lopdf::dictionary;

    #[test]
    fn test_display_name_strips_subset_tag() {
        assert_eq!(display_name("ABCDEF+Calibri-Bold"), "Calibri-Bold");
        assert_eq!(display_name("Helvetica"), "Helvetica");
        assert_eq!(display_name("abcdef+Lower"), "abcdef+Lower");
    }

    #[test]
    fn test_classify_by_name() {
        let f = classify("Courier-BoldOblique", None);
        assert!(f.monospaced && f.bold && f.italic);

        let f = classify("Times-Roman", None);
        assert!(f.serif && !f.bold && !f.italic && !f.monospaced);

        let f = classify("Helvetica", None);
        assert_eq!(f, FontFlags::default());

        let f = classify("DejaVuSans", None);
        assert!(!f.serif);
    }

    #[test]
    fn test_classify_by_descriptor_flags() {
        let desc = dictionary! {
            "Flags" => FLAG_SERIF | FLAG_ITALIC,
            "FontWeight" => 700,
        };
        let f = classify("F1", Some(&desc));
        assert!(f.serif && f.italic && f.bold);
        assert!(!f.monospaced);
    }

    #[test]
    fn test_simple_font_widths() {
        let doc = Document::with_version("1.5");
        let dict = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "FirstChar" => 72,
            "Widths" => vec![722.into(), 0.into()],
        };
        let mut table = FontTable::new();
        let font = LoadedFont::load(&doc, &dict, b"F1", &mut table);

        assert_eq!(font.width(72), 722.0);
        // Zero and out-of-range widths fall back to the default
        assert_eq!(font.width(73), 500.0);
        assert_eq!(font.width(10), 500.0);
        assert_eq!(table.get(font.id).map(|f| f.name().to_string()), Some("Helvetica".into()));
    }

    #[test]
    fn test_fallback_font_decodes_latin1() {
        let doc = Document::with_version("1.5");
        let mut table = FontTable::new();
        let font = LoadedFont::fallback(&mut table);

        let glyphs = font.glyphs(&doc, b"A ");
        assert_eq!(glyphs.len(), 2);
        assert_eq!(glyphs[0].text, "A");
        assert_eq!(glyphs[0].width, 500.0);
        assert!(glyphs[1].is_space_code);
    }

    #[test]
    fn test_cid_widths() {
        let doc = Document::with_version("1.5");
        let w = vec![
            Object::Integer(1),
            Object::Array(vec![100.into(), 200.into()]),
            Object::Integer(10),
            Object::Integer(20),
            Object::Integer(300),
        ];
        let parsed = parse_cid_widths(&doc, &w);
        assert_eq!(parsed, vec![(1, 1, 100.0), (2, 2, 200.0), (10, 20, 300.0)]);
    }

    #[test]
    fn test_decode_code_simple() {
        assert_eq!(decode_code_simple(0xE9, false), "é");
        assert_eq!(decode_code_simple(0x4E2D, true), "中");
    }
}
