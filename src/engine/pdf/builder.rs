//! Groups characters into lines and lines into blocks as they are drawn.
//!
//! Characters arrive in content-stream order. A character continues the
//! current line when it sits on the same baseline and does not jump back
//! to the left; lines join the current block unless spacing, size or
//! direction says a new region has started.

use crate::model::{FontId, Point, Rect, StextBlock, StextChar, StextLine, StextPage};

/// Baseline tolerance for "same line", as a fraction of the font size.
const BASELINE_TOLERANCE: f32 = 0.3;
/// A horizontal gap wider than this fraction of the size is a word break.
const SPACE_GAP: f32 = 0.25;
/// Baseline distance, in multiples of the size, that starts a new block.
const BLOCK_GAP: f32 = 1.8;
/// Font size change that starts a new block.
const SIZE_CHANGE: f32 = 1.0;

/// End of the last drawn character.
#[derive(Debug, Clone, Copy)]
struct Pen {
    end: Point,
    size: f32,
    font: FontId,
    last: char,
}

/// Line under construction plus the baseline and size it started with.
#[derive(Debug)]
struct OpenLine {
    line: StextLine,
    baseline: f32,
    size: f32,
}

pub(crate) struct StextBuilder {
    page: StextPage,
    lines: Vec<OpenLine>,
    current: Option<OpenLine>,
    pen: Option<Pen>,
}

impl StextBuilder {
    pub fn new(mediabox: Rect) -> Self {
        Self {
            page: StextPage::new(mediabox),
            lines: Vec::new(),
            current: None,
            pen: None,
        }
    }

    pub fn page_mut(&mut self) -> &mut StextPage {
        &mut self.page
    }

    /// Add a character whose advance ends at `end`.
    pub fn add_char(&mut self, ch: StextChar, end: Point) {
        let c = ch.as_char().unwrap_or(char::REPLACEMENT_CHARACTER);

        match self.pen {
            Some(pen) if self.continues_line(&pen, &ch) => {
                let gap = ch.origin.x - pen.end.x;
                if gap > pen.size.max(ch.size) * SPACE_GAP
                    && !pen.last.is_whitespace()
                    && !c.is_whitespace()
                    && !is_spaceless_script_char(pen.last)
                {
                    let space = StextChar::new(' ', pen.end, pen.size, pen.font)
                        .with_bbox(Rect::new(
                            pen.end.x,
                            pen.end.y - pen.size * 0.8,
                            ch.origin.x,
                            pen.end.y + pen.size * 0.2,
                        ));
                    self.push_to_line(space);
                }
            }
            _ => self.start_line(&ch),
        }

        self.pen = Some(Pen {
            end,
            size: ch.size,
            font: ch.font,
            last: c,
        });
        self.push_to_line(ch);
    }

    /// Add an image block; the text block in progress is closed first.
    pub fn add_block(&mut self, block: StextBlock) {
        self.flush_block();
        self.page.push_block(block);
    }

    pub fn finish(mut self) -> StextPage {
        self.flush_block();
        self.page
    }

    fn continues_line(&self, pen: &Pen, ch: &StextChar) -> bool {
        if self.current.is_none() {
            return false;
        }
        let tolerance = pen.size.max(ch.size) * BASELINE_TOLERANCE;
        (ch.origin.y - pen.end.y).abs() <= tolerance && ch.origin.x >= pen.end.x - pen.size
    }

    fn push_to_line(&mut self, ch: StextChar) {
        if self.current.is_none() {
            self.current = Some(OpenLine {
                baseline: ch.origin.y,
                size: ch.size,
                line: StextLine::new(Rect::EMPTY),
            });
        }
        if let Some(open) = self.current.as_mut() {
            open.line.push(ch);
        }
    }

    /// Close the current line and decide whether `next` opens a new block.
    fn start_line(&mut self, next: &StextChar) {
        if let Some(done) = self.current.take() {
            self.lines.push(done);
        }
        self.pen = None;

        let breaks = match self.lines.last() {
            Some(prev) => should_break_block(prev.baseline, prev.size, next.origin.y, next.size),
            None => false,
        };
        if breaks {
            self.flush_block();
        }
    }

    fn flush_block(&mut self) {
        if let Some(done) = self.current.take() {
            self.lines.push(done);
        }
        self.pen = None;

        let lines: Vec<StextLine> = self
            .lines
            .drain(..)
            .map(|open| open.line)
            .filter(|line| !line.is_empty())
            .collect();
        if !lines.is_empty() {
            self.page.push_block(StextBlock::from_lines(lines));
        }
    }
}

/// Determine if a line at `baseline` should start a new block.
fn should_break_block(prev_baseline: f32, prev_size: f32, baseline: f32, size: f32) -> bool {
    let spacing = baseline - prev_baseline;

    // Moving up the page: new column or out-of-order content
    if spacing < -prev_size * BASELINE_TOLERANCE {
        return true;
    }

    // Large spacing indicates new paragraph
    if spacing > prev_size.max(size) * BLOCK_GAP {
        return true;
    }

    // Significant font size change
    (prev_size - size).abs() > SIZE_CHANGE
}

/// Check if character is from a script that doesn't use word spaces.
/// Chinese and Japanese don't use spaces between words, but Korean does.
pub(crate) fn is_spaceless_script_char(c: char) -> bool {
    let code = c as u32;

    // CJK Unified Ideographs and Extension A
    (0x4E00..=0x9FFF).contains(&code)
    || (0x3400..=0x4DBF).contains(&code)
    // Extensions B-F
    || (0x20000..=0x2EBEF).contains(&code)
    // Hiragana, Katakana
    || (0x3040..=0x30FF).contains(&code)
    // CJK Symbols and Punctuation
    || (0x3000..=0x303F).contains(&code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BlockKind;

    fn glyph(c: char, x: f32, y: f32, size: f32) -> (StextChar, Point) {
        let w = size * 0.5;
        let ch = StextChar::new(c, Point::new(x, y), size, FontId(0))
            .with_bbox(Rect::new(x, y - size * 0.8, x + w, y + size * 0.2));
        (ch, Point::new(x + w, y))
    }

    fn draw(builder: &mut StextBuilder, text: &str, x: f32, y: f32, size: f32) {
        let mut x = x;
        for c in text.chars() {
            let (ch, end) = glyph(c, x, y, size);
            x = end.x;
            builder.add_char(ch, end);
        }
    }

    fn texts(page: &StextPage) -> Vec<Vec<String>> {
        page.blocks
            .iter()
            .map(|b| match &b.kind {
                BlockKind::Text(lines) => lines.iter().map(StextLine::text).collect(),
                _ => vec![],
            })
            .collect()
    }

    #[test]
    fn test_single_line() {
        let mut b = StextBuilder::new(Rect::letter());
        draw(&mut b, "Hi", 100.0, 100.0, 10.0);
        let page = b.finish();

        assert_eq!(texts(&page), vec![vec!["Hi".to_string()]]);
        assert_eq!(page.blocks[0].bbox, Rect::new(100.0, 92.0, 110.0, 102.0));
    }

    #[test]
    fn test_gap_inserts_space() {
        let mut b = StextBuilder::new(Rect::letter());
        draw(&mut b, "Hello", 100.0, 100.0, 10.0);
        draw(&mut b, "world", 140.0, 100.0, 10.0);
        assert_eq!(texts(&b.finish()), vec![vec!["Hello world".to_string()]]);
    }

    #[test]
    fn test_no_space_after_cjk() {
        let mut b = StextBuilder::new(Rect::letter());
        draw(&mut b, "中", 100.0, 100.0, 10.0);
        draw(&mut b, "文", 120.0, 100.0, 10.0);
        assert_eq!(texts(&b.finish()), vec![vec!["中文".to_string()]]);
    }

    #[test]
    fn test_lines_and_blocks() {
        let mut b = StextBuilder::new(Rect::letter());
        draw(&mut b, "one", 72.0, 100.0, 10.0);
        draw(&mut b, "two", 72.0, 112.0, 10.0);
        // Paragraph gap
        draw(&mut b, "three", 72.0, 160.0, 10.0);
        // Size change
        draw(&mut b, "big", 72.0, 180.0, 18.0);

        assert_eq!(
            texts(&b.finish()),
            vec![
                vec!["one".to_string(), "two".to_string()],
                vec!["three".to_string()],
                vec!["big".to_string()],
            ]
        );
    }

    #[test]
    fn test_jump_back_left_starts_line() {
        let mut b = StextBuilder::new(Rect::letter());
        draw(&mut b, "right", 300.0, 100.0, 10.0);
        draw(&mut b, "left", 72.0, 100.0, 10.0);
        let page = b.finish();
        assert_eq!(
            texts(&page),
            vec![vec!["right".to_string(), "left".to_string()]]
        );
    }

    #[test]
    fn test_image_splits_text_blocks() {
        let mut b = StextBuilder::new(Rect::letter());
        draw(&mut b, "above", 72.0, 100.0, 10.0);
        b.add_block(StextBlock::other(Rect::new(0.0, 0.0, 10.0, 10.0)));
        draw(&mut b, "below", 72.0, 112.0, 10.0);
        let page = b.finish();

        assert_eq!(page.blocks.len(), 3);
        assert!(page.blocks[0].is_text());
        assert!(matches!(page.blocks[1].kind, BlockKind::Other));
        assert!(page.blocks[2].is_text());
    }

    #[test]
    fn test_should_break_block() {
        assert!(!should_break_block(100.0, 12.0, 114.0, 12.0));
        assert!(should_break_block(100.0, 12.0, 140.0, 12.0));
        assert!(should_break_block(100.0, 12.0, 50.0, 12.0));
        assert!(should_break_block(100.0, 12.0, 114.0, 14.0));
    }

    #[test]
    fn test_spaceless_script() {
        assert!(is_spaceless_script_char('中'));
        assert!(is_spaceless_script_char('あ'));
        assert!(!is_spaceless_script_char('한'));
        assert!(!is_spaceless_script_char('a'));
    }
}
