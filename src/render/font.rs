//! Font attributes of a line, derived from its first character.

use crate::model::{FontQuery, StextLine, StextPage};

use super::writer::truncate;

/// CSS-like generic family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Monospace,
    Serif,
    SansSerif,
}

impl Family {
    pub fn as_str(&self) -> &'static str {
        match self {
            Family::Monospace => "monospace",
            Family::Serif => "serif",
            Family::SansSerif => "sans-serif",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Weight {
    Normal,
    Bold,
}

impl Weight {
    pub fn as_str(&self) -> &'static str {
        match self {
            Weight::Normal => "normal",
            Weight::Bold => "bold",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Normal,
    Italic,
}

impl Style {
    pub fn as_str(&self) -> &'static str {
        match self {
            Style::Normal => "normal",
            Style::Italic => "italic",
        }
    }
}

/// The `font` object of a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineFont<'a> {
    pub name: &'a str,
    pub family: Family,
    pub weight: Weight,
    pub style: Style,
    /// Point size, truncated.
    pub size: i32,
    /// Origin of the first character, truncated.
    pub x: i32,
    pub y: i32,
}

/// Family, weight and style of a font. Monospace wins over serif.
pub fn classify(font: &dyn FontQuery) -> (Family, Weight, Style) {
    let family = if font.is_monospaced() {
        Family::Monospace
    } else if font.is_serif() {
        Family::Serif
    } else {
        Family::SansSerif
    };
    let weight = if font.is_bold() {
        Weight::Bold
    } else {
        Weight::Normal
    };
    let style = if font.is_italic() {
        Style::Italic
    } else {
        Style::Normal
    };
    (family, weight, style)
}

/// Font attributes of `line`, or `None` when the line has no characters.
///
/// A character whose font is missing from the page table is reported with
/// an empty name and default attributes.
pub fn line_font<'a>(page: &'a StextPage, line: &StextLine) -> Option<LineFont<'a>> {
    let first = line.first_char()?;

    let (name, (family, weight, style)) = match page.font(first.font) {
        Some(font) => (font.name(), classify(font)),
        None => {
            log::warn!("character refers to unknown font {:?}", first.font);
            ("", (Family::SansSerif, Weight::Normal, Style::Normal))
        }
    };

    Some(LineFont {
        name,
        family,
        weight,
        style,
        size: truncate(first.size),
        x: truncate(first.origin.x),
        y: truncate(first.origin.y),
    })
}
