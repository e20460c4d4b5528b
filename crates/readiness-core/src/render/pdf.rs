//! Minimal PDF 1.4 writer.
//!
//! Emits A4 pages drawn with the three standard Helvetica faces. Output
//! depends only on the drawing calls made, so the same calls always yield
//! the same bytes.

use chrono::{DateTime, Utc};

/// Page size in millimetres.
pub const PAGE_WIDTH_MM: f64 = 210.0;
pub const PAGE_HEIGHT_MM: f64 = 297.0;

/// Points per millimetre.
pub const SCALE: f64 = 72.0 / 25.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontStyle {
    Regular,
    Bold,
    Italic,
}

impl FontStyle {
    fn resource(&self) -> &'static str {
        match self {
            FontStyle::Regular => "F1",
            FontStyle::Bold => "F2",
            FontStyle::Italic => "F3",
        }
    }
}

const FONTS: [(&str, &str); 3] = [
    ("F1", "Helvetica"),
    ("F2", "Helvetica-Bold"),
    ("F3", "Helvetica-Oblique"),
];

/// RGB colour, 0..=255 per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0, 0, 0);
    pub const WHITE: Rgb = Rgb(255, 255, 255);

    fn operands(&self) -> String {
        format!(
            "{:.3} {:.3} {:.3}",
            f64::from(self.0) / 255.0,
            f64::from(self.1) / 255.0,
            f64::from(self.2) / 255.0
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaintStyle {
    Fill,
    FillStroke,
}

/// Content stream of one page, in millimetre coordinates from the top-left.
#[derive(Debug, Default, Clone)]
pub struct PageCanvas {
    ops: String,
}

fn x_pt(x: f64) -> f64 {
    x * SCALE
}

fn y_pt(y: f64) -> f64 {
    (PAGE_HEIGHT_MM - y) * SCALE
}

impl PageCanvas {
    #[allow(clippy::too_many_arguments)]
    pub fn rect(&mut self, x: f64, y: f64, w: f64, h: f64, style: PaintStyle, fill: Rgb, draw: Rgb, line_width: f64) {
        let op = match style {
            PaintStyle::Fill => "f",
            PaintStyle::FillStroke => "B",
        };
        self.ops.push_str(&format!(
            "q {} rg {} RG {:.2} w {:.2} {:.2} {:.2} {:.2} re {} Q\n",
            fill.operands(),
            draw.operands(),
            line_width * SCALE,
            x_pt(x),
            y_pt(y),
            w * SCALE,
            -h * SCALE,
            op
        ));
    }

    pub fn line(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, color: Rgb, line_width: f64) {
        self.ops.push_str(&format!(
            "q {} RG {:.2} w {:.2} {:.2} m {:.2} {:.2} l S Q\n",
            color.operands(),
            line_width * SCALE,
            x_pt(x1),
            y_pt(y1),
            x_pt(x2),
            y_pt(y2)
        ));
    }

    /// Draw text with its baseline at `y`.
    pub fn text(&mut self, x: f64, y: f64, style: FontStyle, size: f64, color: Rgb, text: &str) {
        self.ops.push_str(&format!(
            "q BT {} rg /{} {:.2} Tf {:.2} {:.2} Td ({}) Tj ET Q\n",
            color.operands(),
            style.resource(),
            size,
            x_pt(x),
            y_pt(y),
            escape(text)
        ));
    }
}

/// Escape a sanitized string for a PDF literal; bytes above 0x7E go octal.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '(' | ')' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 || (c as u32) > 0x7E => {
                let byte = u8::try_from(c as u32).unwrap_or(b'-');
                out.push_str(&format!("\\{:03o}", byte));
            }
            c => out.push(c),
        }
    }
    out
}

/// Document-level metadata written to the /Info dictionary.
#[derive(Debug, Clone)]
pub struct DocumentInfo {
    pub title: String,
    pub created_at: DateTime<Utc>,
}

/// Serialize pages into a complete PDF file.
pub fn assemble(pages: &[PageCanvas], info: &DocumentInfo) -> Vec<u8> {
    let mut objects: Vec<String> = Vec::new();

    let page_count = pages.len();
    let first_page_obj = 7;
    let kids: Vec<String> = (0..page_count)
        .map(|i| format!("{} 0 R", first_page_obj + 2 * i))
        .collect();

    objects.push("<< /Type /Catalog /Pages 2 0 R >>".to_string());
    objects.push(format!(
        "<< /Type /Pages /Kids [{}] /Count {} >>",
        kids.join(" "),
        page_count
    ));
    for (_, base) in FONTS {
        objects.push(format!(
            "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
            base
        ));
    }
    objects.push(format!(
        "<< /Title ({}) /Producer (readiness) /CreationDate (D:{}Z) >>",
        escape(&info.title),
        info.created_at.format("%Y%m%d%H%M%S")
    ));

    let font_refs: Vec<String> = FONTS
        .iter()
        .enumerate()
        .map(|(i, (name, _))| format!("/{} {} 0 R", name, 3 + i))
        .collect();

    for (i, page) in pages.iter().enumerate() {
        let content_obj = first_page_obj + 2 * i + 1;
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] /Resources << /Font << {} >> >> /Contents {} 0 R >>",
            PAGE_WIDTH_MM * SCALE,
            PAGE_HEIGHT_MM * SCALE,
            font_refs.join(" "),
            content_obj
        ));
        objects.push(format!(
            "<< /Length {} >>\nstream\n{}endstream",
            page.ops.len(),
            page.ops
        ));
    }

    let mut out: Vec<u8> = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n");

    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
    }

    let xref_offset = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
    out.extend_from_slice(b"0000000000 65535 f \n");
    for offset in offsets {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R /Info 6 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_offset
        )
        .as_bytes(),
    );

    out
}
