//! Report rendering.
//!
//! Single-document runs produce the oracle's answer verbatim as text.
//! Project runs produce a paginated PDF in which every classified line is
//! styled by its category. Rendering reads no clock: the timestamp comes
//! from [`RunMetadata`], so the same inputs render the same bytes.

mod layout;
mod metrics;
mod pdf;
mod sanitize;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classifier::{Classification, LineCategory, Polarity};
use crate::types::{AssessmentMode, RawAssessmentText, SubjectId};

use layout::{CellStyle, FlowDocument, PageTemplate, LEFT_MARGIN};
use pdf::{DocumentInfo, FontStyle, PaintStyle, Rgb};

pub use sanitize::{is_representable, sanitize, PLACEHOLDER};

const DARK: Rgb = Rgb(31, 41, 55);
const INDIGO: Rgb = Rgb(79, 70, 229);
const INK: Rgb = Rgb(17, 24, 39);
const PANEL_FILL: Rgb = Rgb(249, 250, 251);
const PANEL_BORDER: Rgb = Rgb(229, 231, 235);
const SECTION_FILL: Rgb = Rgb(243, 244, 246);
const NEGATIVE: Rgb = Rgb(220, 38, 38);
const POSITIVE: Rgb = Rgb(22, 163, 74);

/// Text placed in the page template and metadata block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Branding {
    pub title: String,
    pub subtitle: String,
    pub footer: String,

    /// `{model}` is replaced with the oracle model name
    pub methodology: String,
}

impl Default for Branding {
    fn default() -> Self {
        Self {
            title: "INFORME DE MADUREZ TECNOLOGICA".to_string(),
            subtitle: "Sistema de Evaluacion de Proyectos - Inteligencia Artificial".to_string(),
            footer: "Innovacion y Desarrollo".to_string(),
            methodology: "Metodologia: Matriz de Evidencias / Analisis con {model}".to_string(),
        }
    }
}

/// Facts about the run that appear in the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunMetadata {
    pub subject: SubjectId,
    pub generated_at: DateTime<Utc>,
    pub model: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactFormat {
    Text,
    Pdf,
}

impl ArtifactFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactFormat::Text => "txt",
            ArtifactFormat::Pdf => "pdf",
        }
    }
}

/// A rendered report, ready to be written once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportArtifact {
    pub format: ArtifactFormat,
    pub bytes: Vec<u8>,
}

impl ReportArtifact {
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            format: ArtifactFormat::Text,
            bytes: body.into().into_bytes(),
        }
    }

    pub fn extension(&self) -> &'static str {
        self.format.extension()
    }
}

/// Placeholder written when a project has nothing to assess.
pub fn no_evidence_report(project_id: i64) -> ReportArtifact {
    ReportArtifact::text(format!(
        "El proyecto {} no tiene evidencias cargadas para analizar.",
        project_id
    ))
}

/// Turns classified answers into report artifacts.
#[derive(Debug, Clone, Default)]
pub struct ReportRenderer {
    branding: Branding,
}

impl ReportRenderer {
    pub fn new(branding: Branding) -> Self {
        Self { branding }
    }

    pub fn render(
        &self,
        raw: &RawAssessmentText,
        classification: &Classification,
        mode: AssessmentMode,
        metadata: &RunMetadata,
    ) -> ReportArtifact {
        match mode {
            AssessmentMode::SingleDocument => ReportArtifact::text(raw.to_text()),
            AssessmentMode::ProjectAggregate => ReportArtifact {
                format: ArtifactFormat::Pdf,
                bytes: self.render_pdf(classification, metadata),
            },
        }
    }

    fn render_pdf(&self, classification: &Classification, metadata: &RunMetadata) -> Vec<u8> {
        let mut doc = FlowDocument::new(PageTemplate {
            title: self.branding.title.clone(),
            subtitle: self.branding.subtitle.clone(),
            footer: self.branding.footer.clone(),
            band_color: DARK,
        });
        doc.add_page();

        self.metadata_block(&mut doc, metadata);

        doc.set_fill_color(INDIGO);
        doc.set_text_color(Rgb::WHITE);
        doc.set_font(FontStyle::Bold, 22.0);
        doc.cell(
            0.0,
            20.0,
            &format!("RESULTADO GLOBAL: {}", classification.global_result),
            CellStyle::centered().filled(),
            true,
        );
        doc.ln(10.0);

        doc.set_text_color(INK);
        doc.set_font(FontStyle::Bold, 14.0);
        doc.cell(0.0, 10.0, "DETALLE DEL DIAGNOSTICO TECNICO:", CellStyle::default(), true);
        doc.set_draw_color(INDIGO);
        doc.set_line_width(0.8);
        let y = doc.y();
        doc.line(LEFT_MARGIN, y, 60.0, y);
        doc.ln(5.0);
        doc.set_line_width(0.2);

        for line in &classification.lines {
            doc.set_font(FontStyle::Regular, 10.0);
            doc.set_text_color(Rgb::BLACK);
            self.body_line(&mut doc, line.category, line.polarity, &line.text);
        }

        tracing::debug!(
            subject = %metadata.subject,
            pages = doc.page_count(),
            lines = classification.lines.len(),
            "Project report laid out"
        );
        doc.finish(&DocumentInfo {
            title: format!("{} - {}", self.branding.title, subject_label(metadata.subject)),
            created_at: metadata.generated_at,
        })
    }

    fn metadata_block(&self, doc: &mut FlowDocument, metadata: &RunMetadata) {
        doc.set_fill_color(PANEL_FILL);
        doc.set_draw_color(PANEL_BORDER);
        doc.rect(10.0, 40.0, 190.0, 25.0, PaintStyle::FillStroke);

        doc.set_xy(15.0, 43.0);
        doc.set_font(FontStyle::Bold, 11.0);
        doc.set_text_color(DARK);
        doc.cell(95.0, 8.0, &subject_label(metadata.subject), CellStyle::default(), false);
        doc.cell(
            90.0,
            8.0,
            &format!(
                "FECHA DE EMISION: {}",
                metadata.generated_at.format("%Y-%m-%d %H:%M")
            ),
            CellStyle::right(),
            true,
        );

        doc.set_x(15.0);
        doc.set_font(FontStyle::Regular, 10.0);
        doc.cell(
            0.0,
            8.0,
            &self.branding.methodology.replace("{model}", &metadata.model),
            CellStyle::default(),
            true,
        );
        doc.ln(15.0);
    }

    fn body_line(
        &self,
        doc: &mut FlowDocument,
        category: LineCategory,
        polarity: Option<Polarity>,
        text: &str,
    ) {
        match category {
            LineCategory::LevelSectionHeader => {
                doc.ln(4.0);
                doc.set_fill_color(SECTION_FILL);
                doc.set_font(FontStyle::Bold, 11.0);
                doc.multi_cell(0.0, 8.0, &text.to_uppercase(), CellStyle::default().filled());
                doc.ln(2.0);
            }
            LineCategory::Criterion => {
                doc.set_x(12.0);
                doc.set_font(FontStyle::Bold, 10.0);
                doc.set_text_color(INDIGO);
                doc.multi_cell(0.0, 6.0, &format!("> {}", text), CellStyle::default());
            }
            LineCategory::EvidenceCitation => {
                doc.set_x(20.0);
                doc.set_font(FontStyle::Italic, 10.0);
                doc.multi_cell(0.0, 5.0, text, CellStyle::default());
            }
            LineCategory::ScoreOrVerdict => {
                doc.set_x(15.0);
                doc.set_font(FontStyle::Bold, 10.0);
                doc.set_text_color(match polarity {
                    Some(Polarity::Negative) => NEGATIVE,
                    Some(Polarity::Positive) => POSITIVE,
                    _ => Rgb::BLACK,
                });
                doc.multi_cell(0.0, 8.0, text, CellStyle::default());
            }
            LineCategory::RealLevelOrRecommendationsHeader => {
                doc.ln(5.0);
                doc.set_font(FontStyle::Bold, 12.0);
                doc.set_draw_color(DARK);
                doc.multi_cell(0.0, 10.0, &text.to_uppercase(), CellStyle::default().underlined());
                doc.ln(2.0);
            }
            LineCategory::ListItem => {
                doc.set_x(15.0);
                doc.multi_cell(0.0, 6.0, &format!("- {}", text), CellStyle::default());
                doc.ln(1.0);
            }
            LineCategory::GlobalResult | LineCategory::Plain => {
                doc.multi_cell(0.0, 6.0, text, CellStyle::default());
                doc.ln(1.0);
            }
        }
    }
}

fn subject_label(subject: SubjectId) -> String {
    match subject {
        SubjectId::Project(id) => format!("ID PROYECTO: {}", id),
        SubjectId::Document(id) => format!("ID DOCUMENTO: {}", id),
    }
}
