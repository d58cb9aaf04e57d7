//! Fonts as seen by the serializer: a name and four capability queries.

use serde::{Deserialize, Serialize};

/// Read-only capability lookup for a font.
///
/// Characters refer to fonts through this interface only; the serializer
/// never owns font data and never keeps a font past the call that lent it.
pub trait FontQuery {
    /// Display name (e.g. `Helvetica-Bold`).
    fn name(&self) -> &str;
    fn is_monospaced(&self) -> bool;
    fn is_serif(&self) -> bool;
    fn is_bold(&self) -> bool;
    fn is_italic(&self) -> bool;
}

/// Font capabilities as reported by the rendering engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FontFlags {
    pub monospaced: bool,
    pub serif: bool,
    pub bold: bool,
    pub italic: bool,
}

/// A font entry in a page's [`FontTable`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Font {
    pub name: String,
    pub flags: FontFlags,
}

impl Font {
    pub fn new(name: impl Into<String>, flags: FontFlags) -> Self {
        Self {
            name: name.into(),
            flags,
        }
    }

    /// A font with no capabilities set (sans-serif, normal weight and style).
    pub fn plain(name: impl Into<String>) -> Self {
        Self::new(name, FontFlags::default())
    }

    pub fn with_monospaced(mut self, yes: bool) -> Self {
        self.flags.monospaced = yes;
        self
    }

    pub fn with_serif(mut self, yes: bool) -> Self {
        self.flags.serif = yes;
        self
    }

    pub fn with_bold(mut self, yes: bool) -> Self {
        self.flags.bold = yes;
        self
    }

    pub fn with_italic(mut self, yes: bool) -> Self {
        self.flags.italic = yes;
        self
    }
}

impl FontQuery for Font {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_monospaced(&self) -> bool {
        self.flags.monospaced
    }

    fn is_serif(&self) -> bool {
        self.flags.serif
    }

    fn is_bold(&self) -> bool {
        self.flags.bold
    }

    fn is_italic(&self) -> bool {
        self.flags.italic
    }
}

/// Handle of a font inside a [`FontTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FontId(pub(crate) usize);

/// Fonts referenced by the characters of one page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FontTable {
    fonts: Vec<Font>,
}

impl FontTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a font and return its handle.
    pub fn add(&mut self, font: Font) -> FontId {
        self.fonts.push(font);
        FontId(self.fonts.len() - 1)
    }

    /// Look up a font's capabilities.
    pub fn get(&self, id: FontId) -> Option<&dyn FontQuery> {
        self.fonts.get(id.0).map(|f| f as &dyn FontQuery)
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }
}
