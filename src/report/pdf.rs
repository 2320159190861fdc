//! Lays out story blocks on A4 pages and writes them with the standard Helvetica fonts.

use std::{fs, path::Path};

use lopdf::{
    content::{Content, Operation},
    dictionary, Document, Object, Stream,
};

use crate::error::RenderError;

use super::story::{Block, Table};

const PAGE_WIDTH: f32 = 595.;
const PAGE_HEIGHT: f32 = 842.;
const MARGIN: f32 = 72.;
const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2. * MARGIN;

const CELL_PADDING: f32 = 4.;
const LINE_SPACING: f32 = 1.2;

type Rgb = (f32, f32, f32);

const BLACK: Rgb = (0., 0., 0.);
const WHITESMOKE: Rgb = (0.96, 0.96, 0.96);
const DARK_BLUE: Rgb = (0., 0., 0.545);
const GREY: Rgb = (0.5, 0.5, 0.5);
const BEIGE: Rgb = (0.96, 0.96, 0.86);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Font {
    Regular,
    Bold,
}

impl Font {
    fn resource(&self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
        }
    }

    /// Width of an encoded string in points.
    fn width(&self, encoded: &[u8], size: f32) -> f32 {
        let widths = match self {
            Font::Regular => &HELVETICA_WIDTHS,
            Font::Bold => &HELVETICA_BOLD_WIDTHS,
        };
        let units = encoded
            .iter()
            .map(|b| match b {
                32..=126 => widths[(b - 32) as usize],
                _ => DEFAULT_GLYPH_WIDTH,
            })
            .sum::<u32>();
        units as f32 * size / 1000.
    }
}

const DEFAULT_GLYPH_WIDTH: u32 = 556;

#[rustfmt::skip]
const HELVETICA_WIDTHS: [u32; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD_WIDTHS: [u32; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

/// Encodes text for a WinAnsi encoded standard font. Anything the encoding lacks becomes `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\t' | '\n' | '\r' => b' ',
            ' '..='~' => c as u8,
            '\u{a0}'..='\u{ff}' => c as u32 as u8,
            '€' => 0x80,
            '‚' => 0x82,
            'ƒ' => 0x83,
            '„' => 0x84,
            '…' => 0x85,
            '†' => 0x86,
            '‡' => 0x87,
            'ˆ' => 0x88,
            '‰' => 0x89,
            'Š' => 0x8a,
            '‹' => 0x8b,
            'Œ' => 0x8c,
            'Ž' => 0x8e,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            '˜' => 0x98,
            '™' => 0x99,
            'š' => 0x9a,
            '›' => 0x9b,
            'œ' => 0x9c,
            'ž' => 0x9e,
            'Ÿ' => 0x9f,
            _ => b'?',
        })
        .collect()
}

/// Splits encoded text into lines no wider than `width`. Words longer than a line are broken.
fn wrap(text: &str, font: Font, size: f32, width: f32) -> Vec<Vec<u8>> {
    let space = font.width(b" ", size);
    let mut lines = vec![];
    let mut line: Vec<u8> = vec![];
    let mut line_width = 0.;

    for word in text.split_whitespace().map(encode_win_ansi) {
        let word_width = font.width(&word, size);
        if !line.is_empty() && line_width + space + word_width <= width {
            line.push(b' ');
            line.extend_from_slice(&word);
            line_width += space + word_width;
            continue;
        }
        if !line.is_empty() {
            lines.push(std::mem::take(&mut line));
        }
        if word_width <= width {
            line_width = word_width;
            line = word;
            continue;
        }
        line_width = 0.;
        for byte in word {
            let glyph = font.width(&[byte], size);
            if !line.is_empty() && line_width + glyph > width {
                lines.push(std::mem::take(&mut line));
                line_width = 0.;
            }
            line.push(byte);
            line_width += glyph;
        }
    }
    if !line.is_empty() || lines.is_empty() {
        lines.push(line);
    }
    lines
}

/// Accumulates drawing operations page by page. `y` is the baseline cursor measured from the
/// bottom of the page, as PDF does.
struct Layout {
    pages: Vec<Vec<Operation>>,
    current: Vec<Operation>,
    y: f32,
}

impl Layout {
    fn new() -> Self {
        Self {
            pages: vec![],
            current: vec![],
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    fn at_page_top(&self) -> bool {
        self.y >= PAGE_HEIGHT - MARGIN
    }

    fn new_page(&mut self) {
        self.pages.push(std::mem::take(&mut self.current));
        self.y = PAGE_HEIGHT - MARGIN;
    }

    /// Starts a new page unless `height` still fits on the current one.
    fn reserve(&mut self, height: f32) {
        if self.y - height < MARGIN && !self.at_page_top() {
            self.new_page();
        }
    }

    fn text(&mut self, x: f32, baseline: f32, font: Font, size: f32, color: Rgb, encoded: Vec<u8>) {
        self.current.extend([
            Operation::new("BT", vec![]),
            Operation::new("rg", vec![color.0.into(), color.1.into(), color.2.into()]),
            Operation::new("Tf", vec![font.resource().into(), size.into()]),
            Operation::new("Td", vec![x.into(), baseline.into()]),
            Operation::new("Tj", vec![Object::string_literal(encoded)]),
            Operation::new("ET", vec![]),
        ]);
    }

    fn cell(&mut self, x: f32, top: f32, width: f32, height: f32, fill: Rgb) {
        let rect = vec![x.into(), (top - height).into(), width.into(), height.into()];
        self.current.extend([
            Operation::new("q", vec![]),
            Operation::new("rg", vec![fill.0.into(), fill.1.into(), fill.2.into()]),
            Operation::new("re", rect.clone()),
            Operation::new("f", vec![]),
            Operation::new("RG", vec![BLACK.0.into(), BLACK.1.into(), BLACK.2.into()]),
            Operation::new("w", vec![1f32.into()]),
            Operation::new("re", rect),
            Operation::new("S", vec![]),
            Operation::new("Q", vec![]),
        ]);
    }

    fn paragraph(&mut self, text: &str, font: Font, size: f32, color: Rgb, space_after: f32) {
        let leading = size * LINE_SPACING;
        for line in wrap(text, font, size, CONTENT_WIDTH) {
            self.reserve(leading);
            self.y -= leading;
            self.text(MARGIN, self.y, font, size, color, line);
        }
        self.y -= space_after;
    }

    fn title(&mut self, text: &str) {
        let size = 24.;
        let leading = size * LINE_SPACING;
        for line in wrap(text, Font::Bold, size, CONTENT_WIDTH) {
            self.reserve(leading);
            self.y -= leading;
            let x = MARGIN + (CONTENT_WIDTH - Font::Bold.width(&line, size)) / 2.;
            self.text(x, self.y, Font::Bold, size, DARK_BLUE, line);
        }
        self.y -= 30.;
    }

    fn heading(&mut self, text: &str) {
        if !self.at_page_top() {
            self.y -= 20.;
        }
        self.paragraph(text, Font::Bold, 16., DARK_BLUE, 12.);
    }

    fn field(&mut self, label: &str, value: &str) {
        let size = 10.;
        let leading = size * LINE_SPACING;
        self.reserve(leading);
        self.y -= leading;
        let label = encode_win_ansi(label);
        let offset = Font::Bold.width(&label, size) + Font::Regular.width(b" ", size);
        self.text(MARGIN, self.y, Font::Bold, size, BLACK, label);
        self.text(MARGIN + offset, self.y, Font::Regular, size, BLACK, encode_win_ansi(value));
        self.y -= 6.;
    }

    fn spacer(&mut self, height: f32) {
        if self.y - height < MARGIN {
            self.new_page();
        } else {
            self.y -= height;
        }
    }

    fn table(&mut self, table: &Table) {
        let total = table.columns.iter().map(|c| c.width).sum::<f32>();
        let scale = if total > CONTENT_WIDTH {
            CONTENT_WIDTH / total
        } else {
            1.
        };
        let widths = table
            .columns
            .iter()
            .map(|c| c.width * scale)
            .collect::<Vec<_>>();
        let header = table
            .columns
            .iter()
            .map(|c| c.header.to_string())
            .collect::<Vec<_>>();

        let header_row = self.wrap_row(&header, &widths, Font::Bold, 10.);
        let body_rows = table
            .rows
            .iter()
            .map(|row| self.wrap_row(row, &widths, Font::Regular, 8.))
            .collect::<Vec<_>>();

        let first_height = body_rows.first().map(|r| r.height).unwrap_or(0.);
        self.reserve(header_row.height + first_height);
        self.draw_row(&header_row, &widths, GREY, WHITESMOKE);
        for row in &body_rows {
            if self.y - row.height < MARGIN {
                self.new_page();
                self.draw_row(&header_row, &widths, GREY, WHITESMOKE);
            }
            self.draw_row(row, &widths, BEIGE, BLACK);
        }
        self.y -= 6.;
    }

    fn wrap_row(&self, cells: &[String], widths: &[f32], font: Font, size: f32) -> WrappedRow {
        let cells = cells
            .iter()
            .zip(widths)
            .map(|(text, width)| wrap(text, font, size, width - 2. * CELL_PADDING))
            .collect::<Vec<_>>();
        let lines = cells.iter().map(Vec::len).max().unwrap_or(1).max(1);
        WrappedRow {
            cells,
            font,
            size,
            height: lines as f32 * size * LINE_SPACING + 2. * CELL_PADDING,
        }
    }

    fn draw_row(&mut self, row: &WrappedRow, widths: &[f32], fill: Rgb, color: Rgb) {
        let top = self.y;
        let mut x = MARGIN;
        for (lines, width) in row.cells.iter().zip(widths) {
            self.cell(x, top, *width, row.height, fill);
            let mut baseline = top - CELL_PADDING;
            for line in lines {
                baseline -= row.size * LINE_SPACING;
                self.text(x + CELL_PADDING, baseline + row.size * 0.2, row.font, row.size, color, line.clone());
            }
            x += width;
        }
        self.y -= row.height;
    }

    fn finish(mut self) -> Vec<Vec<Operation>> {
        if !self.current.is_empty() || self.pages.is_empty() {
            self.pages.push(self.current);
        }
        self.pages
    }
}

struct WrappedRow {
    cells: Vec<Vec<Vec<u8>>>,
    font: Font,
    size: f32,
    height: f32,
}

/// Turns the story into per-page content operations.
fn layout(story: &[Block]) -> Vec<Vec<Operation>> {
    let mut layout = Layout::new();
    for block in story {
        match block {
            Block::Title(text) => layout.title(text),
            Block::Heading(text) => layout.heading(text),
            Block::Subheading(text) => layout.paragraph(text, Font::Bold, 11., BLACK, 6.),
            Block::Paragraph(text) => layout.paragraph(text, Font::Regular, 10., BLACK, 6.),
            Block::Field { label, value } => layout.field(label, value),
            Block::Spacer(height) => layout.spacer(*height),
            Block::Table(table) => layout.table(table),
            Block::PageBreak => layout.new_page(),
        }
    }
    layout.finish()
}

/// Renders `story` and writes the PDF to `path`.
pub fn write_document(story: &[Block], title: &str, path: &Path) -> Result<(), RenderError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let regular_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let bold_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            Font::Regular.resource() => regular_id,
            Font::Bold.resource() => bold_id,
        },
    });

    let mut kids: Vec<Object> = vec![];
    for operations in layout(story) {
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0f32.into(), 0f32.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal(encode_win_ansi(title)),
        "Producer" => Object::string_literal(env!("CARGO_PKG_NAME")),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);
    doc.compress();

    let mut bytes = vec![];
    doc.save_to(&mut bytes)?;
    fs::write(path, bytes).map_err(|source| RenderError::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::story::Column;

    #[test]
    fn test_encode_win_ansi() {
        assert_eq!(encode_win_ansi("abc"), b"abc");
        assert_eq!(encode_win_ansi("café"), vec![b'c', b'a', b'f', 0xe9]);
        assert_eq!(encode_win_ansi("a–b"), vec![b'a', 0x96, b'b']);
        assert_eq!(encode_win_ansi("日本"), b"??");
    }

    #[test]
    fn test_wrap_respects_width() {
        let text = "the quick brown fox jumps over the lazy dog ".repeat(10);
        let lines = wrap(&text, Font::Regular, 10., 100.);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(Font::Regular.width(line, 10.) <= 100.);
        }
    }

    #[test]
    fn test_wrap_breaks_long_words() {
        let lines = wrap(&"x".repeat(200), Font::Regular, 10., 50.);
        assert!(lines.len() > 1);
        assert_eq!(lines.iter().map(Vec::len).sum::<usize>(), 200);
    }

    #[test]
    fn test_wrap_empty_text_is_one_line() {
        assert_eq!(wrap("", Font::Bold, 10., 50.), vec![Vec::<u8>::new()]);
    }

    #[test]
    fn test_long_table_continues_on_next_page() {
        let table = Table {
            columns: vec![Column {
                header: "Name",
                width: 200.,
            }],
            rows: (0..200).map(|i| vec![format!("row {i}")]).collect(),
        };
        let pages = layout(&[Block::Table(table)]);
        assert!(pages.len() > 1);
    }

    #[test]
    fn test_page_breaks_start_pages() {
        let story = [
            Block::Paragraph("one".into()),
            Block::PageBreak,
            Block::Paragraph("two".into()),
        ];
        assert_eq!(layout(&story).len(), 2);
    }
}
