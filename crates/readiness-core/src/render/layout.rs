//! Flowing page layout on top of the PDF writer.
//!
//! A cursor moves down the page as cells are written. When a cell would
//! cross the bottom margin a new page is started and the page template
//! (header band and footer) is drawn around it.

use super::metrics::text_width;
use super::pdf::{
    assemble, DocumentInfo, FontStyle, PageCanvas, PaintStyle, Rgb, PAGE_HEIGHT_MM, PAGE_WIDTH_MM,
    SCALE,
};
use super::sanitize::sanitize;

pub const LEFT_MARGIN: f64 = 10.0;
pub const RIGHT_MARGIN: f64 = 10.0;
pub const TOP_MARGIN: f64 = 10.0;
pub const BOTTOM_MARGIN: f64 = 20.0;

/// Horizontal padding inside a cell.
const CELL_PADDING: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

/// What is drawn at the top and bottom of every page.
#[derive(Debug, Clone)]
pub struct PageTemplate {
    pub title: String,
    pub subtitle: String,
    pub footer: String,
    pub band_color: Rgb,
}

/// Options for a single cell.
#[derive(Debug, Clone, Copy)]
pub struct CellStyle {
    pub align: Align,
    pub fill: bool,
    pub bottom_border: bool,
}

impl Default for CellStyle {
    fn default() -> Self {
        Self {
            align: Align::Left,
            fill: false,
            bottom_border: false,
        }
    }
}

impl CellStyle {
    pub fn centered() -> Self {
        Self {
            align: Align::Center,
            ..Self::default()
        }
    }

    pub fn right() -> Self {
        Self {
            align: Align::Right,
            ..Self::default()
        }
    }

    pub fn filled(mut self) -> Self {
        self.fill = true;
        self
    }

    pub fn underlined(mut self) -> Self {
        self.bottom_border = true;
        self
    }
}

/// A paginated document under construction.
pub struct FlowDocument {
    template: PageTemplate,
    pages: Vec<PageCanvas>,
    current: PageCanvas,
    started: bool,

    x: f64,
    y: f64,
    style: FontStyle,
    size: f64,
    text_color: Rgb,
    fill_color: Rgb,
    draw_color: Rgb,
    line_width: f64,
    in_template: bool,
}

impl FlowDocument {
    pub fn new(template: PageTemplate) -> Self {
        Self {
            template,
            pages: Vec::new(),
            current: PageCanvas::default(),
            started: false,
            x: LEFT_MARGIN,
            y: TOP_MARGIN,
            style: FontStyle::Regular,
            size: 10.0,
            text_color: Rgb::BLACK,
            fill_color: Rgb::WHITE,
            draw_color: Rgb::BLACK,
            line_width: 0.2,
            in_template: false,
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len() + usize::from(self.started)
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn set_font(&mut self, style: FontStyle, size: f64) {
        self.style = style;
        self.size = size;
    }

    pub fn set_text_color(&mut self, color: Rgb) {
        self.text_color = color;
    }

    pub fn set_fill_color(&mut self, color: Rgb) {
        self.fill_color = color;
    }

    pub fn set_draw_color(&mut self, color: Rgb) {
        self.draw_color = color;
    }

    pub fn set_line_width(&mut self, width: f64) {
        self.line_width = width;
    }

    pub fn set_x(&mut self, x: f64) {
        self.x = x;
    }

    pub fn set_xy(&mut self, x: f64, y: f64) {
        self.x = x;
        self.y = y;
    }

    /// Move to the left margin and down by `h`.
    pub fn ln(&mut self, h: f64) {
        self.x = LEFT_MARGIN;
        self.y += h;
    }

    /// Start a new page, closing the current one with its footer.
    pub fn add_page(&mut self) {
        let (style, size, text_color, fill_color) =
            (self.style, self.size, self.text_color, self.fill_color);

        if self.started {
            self.draw_footer();
            let done = std::mem::take(&mut self.current);
            self.pages.push(done);
        }
        self.started = true;
        self.x = LEFT_MARGIN;
        self.y = TOP_MARGIN;
        self.draw_header();

        self.set_font(style, size);
        self.set_text_color(text_color);
        self.set_fill_color(fill_color);
    }

    pub fn rect(&mut self, x: f64, y: f64, w: f64, h: f64, style: PaintStyle) {
        self.current.rect(
            x,
            y,
            w,
            h,
            style,
            self.fill_color,
            self.draw_color,
            self.line_width,
        );
    }

    pub fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64) {
        self.current
            .line(x1, y1, x2, y2, self.draw_color, self.line_width);
    }

    /// Width of `text` in millimetres at the current font.
    pub fn string_width(&self, text: &str) -> f64 {
        f64::from(text_width(self.style, text)) * self.size / 1000.0 / SCALE
    }

    /// Write a one-line cell. A width of zero extends to the right margin.
    pub fn cell(&mut self, w: f64, h: f64, text: &str, style: CellStyle, next_line: bool) {
        let text = sanitize(text);
        if !self.in_template && self.y + h > PAGE_HEIGHT_MM - BOTTOM_MARGIN {
            let x = self.x;
            self.add_page();
            self.x = x;
        }

        let w = if w == 0.0 {
            PAGE_WIDTH_MM - RIGHT_MARGIN - self.x
        } else {
            w
        };

        if style.fill {
            self.rect(self.x, self.y, w, h, PaintStyle::Fill);
        }
        if style.bottom_border {
            self.line(self.x, self.y + h, self.x + w, self.y + h);
        }

        if !text.is_empty() {
            let width = self.string_width(&text);
            let dx = match style.align {
                Align::Left => CELL_PADDING,
                Align::Center => (w - width) / 2.0,
                Align::Right => w - CELL_PADDING - width,
            };
            let baseline = self.y + 0.5 * h + 0.3 * self.size / SCALE;
            self.current
                .text(self.x + dx, baseline, self.style, self.size, self.text_color, &text);
        }

        if next_line {
            self.x = LEFT_MARGIN;
            self.y += h;
        } else {
            self.x += w;
        }
    }

    /// Write wrapped text. Every line starts at the current x; the cursor
    /// ends at the left margin below the block.
    pub fn multi_cell(&mut self, w: f64, h: f64, text: &str, style: CellStyle) {
        let start_x = self.x;
        let w = if w == 0.0 {
            PAGE_WIDTH_MM - RIGHT_MARGIN - start_x
        } else {
            w
        };
        let text = sanitize(text);
        let lines = self.wrap(&text, w - 2.0 * CELL_PADDING);

        for line in lines {
            self.x = start_x;
            self.cell(w, h, &line, style, true);
        }
        self.x = LEFT_MARGIN;
    }

    /// Greedy word wrap; words wider than the line are split by character.
    fn wrap(&self, text: &str, max_width: f64) -> Vec<String> {
        let mut lines = Vec::new();
        let mut current = String::new();

        for word in text.split(' ').filter(|w| !w.is_empty()) {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{} {}", current, word)
            };
            if self.string_width(&candidate) <= max_width {
                current = candidate;
                continue;
            }

            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            for c in word.chars() {
                current.push(c);
                if self.string_width(&current) > max_width && current.chars().count() > 1 {
                    current.pop();
                    lines.push(std::mem::take(&mut current));
                    current.push(c);
                }
            }
        }

        if !current.is_empty() || lines.is_empty() {
            lines.push(current);
        }
        lines
    }

    fn draw_header(&mut self) {
        self.in_template = true;
        self.fill_color = self.template.band_color;
        self.rect(0.0, 0.0, PAGE_WIDTH_MM, 35.0, PaintStyle::Fill);

        self.y = 10.0;
        self.x = LEFT_MARGIN;
        self.set_font(FontStyle::Bold, 18.0);
        self.set_text_color(Rgb::WHITE);
        let title = self.template.title.clone();
        self.cell(0.0, 10.0, &title, CellStyle::centered(), true);

        self.set_font(FontStyle::Italic, 9.0);
        let subtitle = self.template.subtitle.clone();
        self.cell(0.0, 5.0, &subtitle, CellStyle::centered(), true);
        self.ln(10.0);
        self.in_template = false;
    }

    fn draw_footer(&mut self) {
        self.in_template = true;
        let page_number = self.pages.len() + 1;
        self.set_xy(LEFT_MARGIN, PAGE_HEIGHT_MM - 15.0);
        self.set_font(FontStyle::Italic, 8.0);
        self.set_text_color(Rgb(128, 128, 128));
        self.cell(
            0.0,
            10.0,
            &format!("Pagina {}", page_number),
            CellStyle::centered(),
            false,
        );

        self.set_x(LEFT_MARGIN);
        let footer = self.template.footer.clone();
        self.cell(0.0, 10.0, &footer, CellStyle::right(), false);
        self.in_template = false;
    }

    /// Close the last page and serialize the document.
    pub fn finish(mut self, info: &DocumentInfo) -> Vec<u8> {
        if !self.started {
            self.add_page();
        }
        self.draw_footer();
        self.pages.push(self.current);
        assemble(&self.pages, info)
    }
}
