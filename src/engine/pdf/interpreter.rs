//! Content stream interpreter.
//!
//! Plays page and form content through a small graphics/text state machine
//! and feeds every shown glyph and drawn image to the [`StextBuilder`].

use std::collections::HashMap;

use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, Stream};

use super::builder::StextBuilder;
use super::fonts::LoadedFont;
use super::image::PdfImage;
use super::{get_number, resolve, stream_data};
use crate::engine::StextOptions;
use crate::error::{Error, Result};
use crate::model::{Matrix, Point, Rect, StextBlock, StextChar, StextPage};

/// Nesting limit for form XObjects drawing other forms.
const MAX_FORM_DEPTH: usize = 8;

/// Cache key of the fallback font; no dictionary lives at address 0.
const FALLBACK_FONT: usize = 0;

/// Graphics state saved by `q` and restored by `Q`.
#[derive(Debug, Clone, Copy)]
struct GraphicsState {
    ctm: Matrix,
    font: Option<usize>,
    size: f32,
    char_spacing: f32,
    word_spacing: f32,
    /// Horizontal scaling as a factor (`Tz` / 100).
    h_scale: f32,
    leading: f32,
    rise: f32,
}

impl GraphicsState {
    fn new(ctm: Matrix) -> Self {
        Self {
            ctm,
            font: None,
            size: 12.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            h_scale: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

/// Text matrix for tracking position in content stream.
#[derive(Debug, Clone, Copy, Default)]
struct TextMatrix {
    tm: Matrix,
    /// Start of the current line.
    tlm: Matrix,
}

impl TextMatrix {
    fn set(&mut self, m: Matrix) {
        self.tm = m;
        self.tlm = m;
    }

    fn translate(&mut self, tx: f32, ty: f32) {
        self.set(Matrix::translate(tx, ty).concat(&self.tlm));
    }

    fn next_line(&mut self, leading: f32) {
        self.translate(0.0, -leading);
    }

    fn advance(&mut self, tx: f32) {
        self.tm = Matrix::translate(tx, 0.0).concat(&self.tm);
    }
}

pub(crate) struct Interpreter<'a> {
    doc: &'a Document,
    options: StextOptions,
    builder: StextBuilder,
    /// Fonts loaded so far, keyed by the address of their dictionary.
    fonts: HashMap<usize, LoadedFont<'a>>,
}

impl<'a> Interpreter<'a> {
    pub fn new(doc: &'a Document, mediabox: Rect, options: StextOptions) -> Self {
        Self {
            doc,
            options,
            builder: StextBuilder::new(mediabox),
            fonts: HashMap::new(),
        }
    }

    /// Interpret page content with `ctm` mapping user space to page space.
    pub fn run(&mut self, content: &[u8], resources: Option<&'a Dictionary>, ctm: Matrix) -> Result<()> {
        self.execute(content, resources, ctm, 0)
    }

    pub fn finish(self) -> StextPage {
        self.builder.finish()
    }

    fn execute(
        &mut self,
        content: &[u8],
        resources: Option<&'a Dictionary>,
        ctm: Matrix,
        depth: usize,
    ) -> Result<()> {
        let content = Content::decode(content).map_err(|e| Error::PdfParse(e.to_string()))?;

        let mut gs = GraphicsState::new(ctm);
        let mut stack: Vec<GraphicsState> = Vec::new();
        let mut text = TextMatrix::default();

        for op in &content.operations {
            let ops = op.operands.as_slice();
            match op.operator.as_str() {
                "q" => stack.push(gs),
                "Q" => {
                    if let Some(saved) = stack.pop() {
                        gs = saved;
                    }
                }
                "cm" => {
                    if let Some(m) = matrix_operands(ops) {
                        gs.ctm = m.concat(&gs.ctm);
                    }
                }
                "BT" => text = TextMatrix::default(),
                "ET" => {}
                "Tf" => {
                    if let Some(Object::Name(name)) = ops.first() {
                        gs.font = self.load_font(resources, name);
                    }
                    gs.size = ops.get(1).and_then(get_number).unwrap_or(gs.size);
                }
                "Tc" => gs.char_spacing = num(ops, 0),
                "Tw" => gs.word_spacing = num(ops, 0),
                "Tz" => gs.h_scale = num(ops, 0) / 100.0,
                "TL" => gs.leading = num(ops, 0),
                "Ts" => gs.rise = num(ops, 0),
                "Td" => text.translate(num(ops, 0), num(ops, 1)),
                "TD" => {
                    gs.leading = -num(ops, 1);
                    text.translate(num(ops, 0), num(ops, 1));
                }
                "Tm" => {
                    if let Some(m) = matrix_operands(ops) {
                        text.set(m);
                    }
                }
                "T*" => text.next_line(gs.leading),
                "Tj" => {
                    if let Some(Object::String(bytes, _)) = ops.first() {
                        self.show_text(&gs, &mut text, bytes);
                    }
                }
                "TJ" => {
                    if let Some(Object::Array(items)) = ops.first() {
                        for item in items {
                            match item {
                                Object::String(bytes, _) => self.show_text(&gs, &mut text, bytes),
                                other => {
                                    // Adjustments are in thousandths of text space
                                    if let Some(n) = get_number(other) {
                                        text.advance(-n / 1000.0 * gs.size * gs.h_scale);
                                    }
                                }
                            }
                        }
                    }
                }
                "'" => {
                    text.next_line(gs.leading);
                    if let Some(Object::String(bytes, _)) = ops.first() {
                        self.show_text(&gs, &mut text, bytes);
                    }
                }
                "\"" => {
                    gs.word_spacing = num(ops, 0);
                    gs.char_spacing = num(ops, 1);
                    text.next_line(gs.leading);
                    if let Some(Object::String(bytes, _)) = ops.get(2) {
                        self.show_text(&gs, &mut text, bytes);
                    }
                }
                "Do" => {
                    if let Some(Object::Name(name)) = ops.first() {
                        self.draw_xobject(resources, name, &gs.ctm, depth)?;
                    }
                }
                "BI" => {
                    // Inline images are kept as placeholders
                    if self.options.preserve_images {
                        let bbox = gs.ctm.transform_rect(&Rect::new(0.0, 0.0, 1.0, 1.0));
                        self.builder.add_block(StextBlock::other(bbox));
                    }
                }
                _ => {}
            }
        }

        Ok(())
    }

    /// Resolve `/Font/<name>` and make sure it is loaded.
    fn load_font(&mut self, resources: Option<&'a Dictionary>, name: &[u8]) -> Option<usize> {
        let dict = resource(self.doc, resources, b"Font", name)?.as_dict().ok()?;
        let key = dict as *const Dictionary as usize;
        if !self.fonts.contains_key(&key) {
            let font = LoadedFont::load(self.doc, dict, name, &mut self.builder.page_mut().fonts);
            self.fonts.insert(key, font);
        }
        Some(key)
    }

    fn show_text(&mut self, gs: &GraphicsState, text: &mut TextMatrix, bytes: &[u8]) {
        let key = match gs.font {
            Some(key) if self.fonts.contains_key(&key) => key,
            _ => {
                if !self.fonts.contains_key(&FALLBACK_FONT) {
                    let font = LoadedFont::fallback(&mut self.builder.page_mut().fonts);
                    self.fonts.insert(FALLBACK_FONT, font);
                }
                FALLBACK_FONT
            }
        };
        let Some(font) = self.fonts.get(&key) else {
            return;
        };
        let font_id = font.id;
        let glyphs = font.glyphs(self.doc, bytes);

        let size = gs.size;
        let h = gs.h_scale;

        for glyph in glyphs {
            let trm = Matrix::new(size * h, 0.0, 0.0, size, 0.0, gs.rise)
                .concat(&text.tm)
                .concat(&gs.ctm);
            let char_size = size * text.tm.concat(&gs.ctm).expansion();
            let w = glyph.width / 1000.0;

            // Ligatures and other multi-character glyphs share the advance
            let n = glyph.text.chars().count().max(1) as f32;
            for (k, c) in glyph.text.chars().enumerate() {
                let x0 = w * k as f32 / n;
                let x1 = w * (k + 1) as f32 / n;
                let origin = trm.transform_point(Point::new(x0, 0.0));
                let end = trm.transform_point(Point::new(x1, 0.0));
                let bbox = trm.transform_rect(&Rect::new(x0, -0.2, x1, 0.8));

                let c = if !self.options.preserve_whitespace && c.is_whitespace() {
                    ' '
                } else {
                    c
                };
                self.builder
                    .add_char(StextChar::new(c, origin, char_size, font_id).with_bbox(bbox), end);
            }

            let mut tx = w * size + gs.char_spacing;
            if glyph.is_space_code {
                tx += gs.word_spacing;
            }
            text.advance(tx * h);
        }
    }

    fn draw_xobject(
        &mut self,
        resources: Option<&'a Dictionary>,
        name: &[u8],
        ctm: &Matrix,
        depth: usize,
    ) -> Result<()> {
        let Some(Object::Stream(xobj)) = resource(self.doc, resources, b"XObject", name) else {
            log::debug!("missing XObject /{}", String::from_utf8_lossy(name));
            return Ok(());
        };

        match xobj.dict.get(b"Subtype").and_then(|o| o.as_name()) {
            Ok(b"Image") => {
                if self.options.preserve_images {
                    let bbox = ctm.transform_rect(&Rect::new(0.0, 0.0, 1.0, 1.0));
                    let image = PdfImage::from_stream(self.doc, xobj);
                    self.builder.add_block(StextBlock::image(bbox, Box::new(image)));
                }
                Ok(())
            }
            Ok(b"Form") => self.draw_form(xobj, resources, ctm, depth),
            _ => Ok(()),
        }
    }

    fn draw_form(
        &mut self,
        form: &'a Stream,
        parent_resources: Option<&'a Dictionary>,
        ctm: &Matrix,
        depth: usize,
    ) -> Result<()> {
        if depth >= MAX_FORM_DEPTH {
            log::warn!("form XObjects nested deeper than {}; skipping", MAX_FORM_DEPTH);
            return Ok(());
        }

        let content = match stream_data(form) {
            Ok(content) => content,
            Err(e) => {
                log::warn!("skipping unreadable form XObject: {}", e);
                return Ok(());
            }
        };

        let matrix = form
            .dict
            .get(b"Matrix")
            .ok()
            .and_then(|o| resolve(self.doc, o).as_array().ok())
            .and_then(|arr| matrix_operands(arr.as_slice()))
            .unwrap_or(Matrix::IDENTITY);
        let resources = form
            .dict
            .get(b"Resources")
            .ok()
            .and_then(|o| resolve(self.doc, o).as_dict().ok())
            .or(parent_resources);

        self.execute(&content, resources, matrix.concat(ctm), depth + 1)
    }
}

/// Look up `/<category>/<name>` in a resource dictionary.
fn resource<'a>(
    doc: &'a Document,
    resources: Option<&'a Dictionary>,
    category: &[u8],
    name: &[u8],
) -> Option<&'a Object> {
    let dict = resolve(doc, resources?.get(category).ok()?).as_dict().ok()?;
    Some(resolve(doc, dict.get(name).ok()?))
}

fn num(ops: &[Object], i: usize) -> f32 {
    ops.get(i).and_then(get_number).unwrap_or(0.0)
}

fn matrix_operands(ops: &[Object]) -> Option<Matrix> {
    if ops.len() < 6 {
        return None;
    }
    let v: Vec<f32> = ops[..6].iter().map(get_number).collect::<Option<_>>()?;
    Some(Matrix::new(v[0], v[1], v[2], v[3], v[4], v[5]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BlockKind;
    use lopdf::dictionary;

    /// Page space for a 612x792 page.
    fn flip() -> Matrix {
        Matrix::new(1.0, 0.0, 0.0, -1.0, 0.0, 792.0)
    }

    fn font_resources(doc: &mut Document) -> Dictionary {
        let font = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        dictionary! { "Font" => dictionary! { "F1" => font } }
    }

    fn interpret(doc: &Document, resources: &Dictionary, content: &str) -> StextPage {
        let mut interp = Interpreter::new(doc, Rect::letter(), StextOptions::preserve_images());
        interp
            .run(content.as_bytes(), Some(resources), flip())
            .unwrap();
        let page = interp.finish();
        assert_eq!(page.mediabox, Rect::letter());
        page
    }

    #[test]
    fn test_text_position_and_font() {
        let mut doc = Document::with_version("1.5");
        let res = font_resources(&mut doc);
        let page = interpret(&doc, &res, "BT /F1 10 Tf 100 700 Td (Hi) Tj ET");

        assert_eq!(page.blocks.len(), 1);
        let BlockKind::Text(lines) = &page.blocks[0].kind else {
            panic!("expected text block");
        };
        let first = &lines[0].chars[0];
        assert_eq!(lines[0].text(), "Hi");
        assert_eq!(first.origin, Point::new(100.0, 92.0));
        assert_eq!(first.size, 10.0);
        // Courier has no widths: 600 units per glyph
        assert_eq!(lines[0].chars[1].origin, Point::new(106.0, 92.0));

        let font = page.font(first.font).unwrap();
        assert_eq!(font.name(), "Courier");
        assert!(font.is_monospaced());
    }

    #[test]
    fn test_tj_adjustment_creates_space() {
        let mut doc = Document::with_version("1.5");
        let res = font_resources(&mut doc);
        let page = interpret(&doc, &res, "BT /F1 10 Tf 72 700 Td [(ab) -2000 (cd)] TJ ET");
        assert_eq!(page.plain_text(), "ab cd");
    }

    #[test]
    fn test_leading_moves_to_next_line() {
        let mut doc = Document::with_version("1.5");
        let res = font_resources(&mut doc);
        let page = interpret(&doc, &res, "BT /F1 10 Tf 12 TL 72 700 Td (one) Tj T* (two) Tj ET");
        assert_eq!(page.plain_text(), "one\ntwo");
    }

    #[test]
    fn test_text_matrix_scales_size() {
        let mut doc = Document::with_version("1.5");
        let res = font_resources(&mut doc);
        let page = interpret(&doc, &res, "BT /F1 1 Tf 24 0 0 24 72 700 Tm (X) Tj ET");
        let BlockKind::Text(lines) = &page.blocks[0].kind else {
            panic!("expected text block");
        };
        assert_eq!(lines[0].chars[0].size, 24.0);
    }

    #[test]
    fn test_unknown_font_uses_fallback() {
        let doc = Document::with_version("1.5");
        let res = Dictionary::new();
        let page = interpret(&doc, &res, "BT /Missing 12 Tf 72 700 Td (ok) Tj ET");
        assert_eq!(page.plain_text(), "ok");
        let BlockKind::Text(lines) = &page.blocks[0].kind else {
            panic!("expected text block");
        };
        assert_eq!(page.font(lines[0].chars[0].font).unwrap().name(), "Unknown");
    }

    #[test]
    fn test_image_xobject_bbox() {
        let mut doc = Document::with_version("1.5");
        let img = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => 1,
                "Height" => 1,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            vec![128],
        ));
        let res = dictionary! { "XObject" => dictionary! { "Im1" => img } };
        let page = interpret(&doc, &res, "q 200 0 0 100 50 600 cm /Im1 Do Q");

        assert_eq!(page.blocks.len(), 1);
        assert!(page.blocks[0].is_image());
        assert_eq!(page.blocks[0].bbox, Rect::new(50.0, 92.0, 250.0, 192.0));
    }

    #[test]
    fn test_images_dropped_without_preserve() {
        let mut doc = Document::with_version("1.5");
        let img = doc.add_object(Stream::new(
            dictionary! { "Subtype" => "Image", "Width" => 1, "Height" => 1 },
            vec![0],
        ));
        let res = dictionary! { "XObject" => dictionary! { "Im1" => img } };
        let mut interp = Interpreter::new(&doc, Rect::letter(), StextOptions::new());
        interp.run(b"/Im1 Do", Some(&res), flip()).unwrap();
        assert!(interp.finish().blocks.is_empty());
    }

    #[test]
    fn test_form_xobject_recursion() {
        let mut doc = Document::with_version("1.5");
        let res = font_resources(&mut doc);
        let form = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Form",
                "BBox" => vec![0.into(), 0.into(), 100.into(), 100.into()],
                "Matrix" => vec![1.into(), 0.into(), 0.into(), 1.into(), 10.into(), 0.into()],
                "Resources" => res.clone(),
            },
            b"BT /F1 10 Tf 62 700 Td (in) Tj ET".to_vec(),
        ));
        let outer = dictionary! { "XObject" => dictionary! { "Fm1" => form } };
        let page = interpret(&doc, &outer, "/Fm1 Do");

        assert_eq!(page.plain_text(), "in");
        let BlockKind::Text(lines) = &page.blocks[0].kind else {
            panic!("expected text block");
        };
        assert_eq!(lines[0].chars[0].origin, Point::new(72.0, 92.0));
    }

    #[test]
    fn test_self_referencing_form_terminates() {
        let mut doc = Document::with_version("1.5");
        let form_id = doc.new_object_id();
        let res = dictionary! { "XObject" => dictionary! { "Fm1" => form_id } };
        doc.objects.insert(
            form_id,
            Object::Stream(Stream::new(
                dictionary! { "Subtype" => "Form", "Resources" => res.clone() },
                b"/Fm1 Do".to_vec(),
            )),
        );
        let page = interpret(&doc, &res, "/Fm1 Do");
        assert!(page.blocks.is_empty());
    }

    #[test]
    fn test_whitespace_normalized() {
        let doc = Document::with_version("1.5");
        let res = Dictionary::new();
        let page = interpret(&doc, &res, "BT /F1 10 Tf 72 700 Td (a\\tb) Tj ET");
        assert_eq!(page.plain_text(), "a b");
    }
}
