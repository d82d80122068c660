//! PDF 报告导出
//!
//! A4 页面，内置 Helvetica 字体；内容超出页面时自动分页。

use hemoscope_core::utils::{describe_age, format_confidence};
use hemoscope_core::{ClassificationLabel, Report, Result, ScopeError, Severity};
use printpdf::*;
use std::io::BufWriter;

use crate::markdown::{parse_blocks, strip_bold, Block};
use crate::text::{pdf_safe, wrap_text};
use crate::AnalysisDetails;

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const LEFT: f32 = 15.0;
const RIGHT: f32 = 195.0;
const CONTENT_TOP: f32 = 258.0;
const CONTENT_BOTTOM: f32 = 25.0;
const WRAP_CHARS: usize = 95;

const DISCLAIMER_TEXT: &str = "This is NOT a medical diagnosis. \
    This AI screening tool is a research prototype. \
    Results must be confirmed through standard laboratory procedures \
    (CBC, bone marrow biopsy, flow cytometry) by a qualified haematologist or oncologist. \
    Do not make clinical decisions based solely on this report.";

type Rgb8 = (u8, u8, u8);

const SLATE: Rgb8 = (30, 41, 59);
const MUTED: Rgb8 = (100, 116, 139);
const BODY: Rgb8 = (51, 65, 85);
const WHITE: Rgb8 = (255, 255, 255);

fn color((r, g, b): Rgb8) -> Color {
    Color::Rgb(Rgb::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0, None))
}

fn banner(label: ClassificationLabel) -> (Rgb8, &'static str) {
    match label {
        ClassificationLabel::Normal => ((34, 197, 94), "NORMAL - No Abnormality Detected"),
        ClassificationLabel::Leukemia => {
            ((180, 83, 9), "LEUKEMIA DETECTED - Abnormal Blast Cells Identified")
        }
        ClassificationLabel::Uncertain => ((234, 179, 8), "UNCERTAIN - Review Required"),
    }
}

fn pdf_error(context: &str, e: impl std::fmt::Display) -> ScopeError {
    ScopeError::Report(format!("{}: {}", context, e))
}

#[derive(Clone, Copy)]
enum FontKind {
    Regular,
    Bold,
    Italic,
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    italic: IndirectFontRef,
}

/// 带游标的绘制上下文
struct Canvas<'a> {
    doc: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    fonts: Fonts,
    y: f32,
    page_no: usize,
    footer: String,
}

impl<'a> Canvas<'a> {
    fn font(&self, kind: FontKind) -> &IndirectFontRef {
        match kind {
            FontKind::Regular => &self.fonts.regular,
            FontKind::Bold => &self.fonts.bold,
            FontKind::Italic => &self.fonts.italic,
        }
    }

    fn fill_rect(&self, left: f32, bottom: f32, right: f32, top: f32, fill: Rgb8) {
        self.layer.set_fill_color(color(fill));
        self.layer.add_rect(Rect::new(Mm(left), Mm(bottom), Mm(right), Mm(top)));
    }

    fn draw_text(&self, text: &str, size: f32, x: f32, y: f32, kind: FontKind, fill: Rgb8) {
        self.layer.set_fill_color(color(fill));
        self.layer.use_text(pdf_safe(text), size, Mm(x), Mm(y), self.font(kind));
    }

    /// 页眉色条和页脚
    fn decorate_page(&self) {
        self.fill_rect(0.0, PAGE_HEIGHT - 32.0, PAGE_WIDTH, PAGE_HEIGHT, SLATE);
        self.draw_text("HemoScope", 22.0, 80.0, PAGE_HEIGHT - 16.0, FontKind::Bold, WHITE);
        self.draw_text(
            "AI-Powered Blood Cell Analysis Report",
            10.0,
            73.0,
            PAGE_HEIGHT - 24.0,
            FontKind::Regular,
            (180, 200, 220),
        );

        self.layer.set_outline_color(color(MUTED));
        self.layer.set_outline_thickness(0.3);
        self.layer.add_line(Line {
            points: vec![
                (Point::new(Mm(LEFT), Mm(18.0)), false),
                (Point::new(Mm(RIGHT), Mm(18.0)), false),
            ],
            is_closed: false,
        });
        let footer = format!("Page {} | {}", self.page_no, self.footer);
        self.draw_text(&footer, 7.0, LEFT, 13.0, FontKind::Italic, (140, 140, 140));
    }

    fn new_page(&mut self) {
        let (page, layer) = self.doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.page_no += 1;
        self.y = CONTENT_TOP;
        self.decorate_page();
    }

    fn ensure_space(&mut self, needed: f32) {
        if self.y - needed < CONTENT_BOTTOM {
            self.new_page();
        }
    }

    fn line(&mut self, text: &str, size: f32, x: f32, kind: FontKind, fill: Rgb8, height: f32) {
        self.ensure_space(height);
        self.draw_text(text, size, x, self.y, kind, fill);
        self.y -= height;
    }

    fn paragraph(
        &mut self,
        text: &str,
        size: f32,
        x: f32,
        max_chars: usize,
        kind: FontKind,
        fill: Rgb8,
    ) {
        let height = size * 0.5 + 0.5;
        for line in wrap_text(text, max_chars) {
            self.line(&line, size, x, kind, fill, height);
        }
    }

    fn gap(&mut self, height: f32) {
        self.y -= height;
    }

    fn section_header(&mut self, title: &str) {
        self.ensure_space(14.0);
        self.gap(4.0);
        self.line(title, 13.0, LEFT, FontKind::Bold, SLATE, 8.0);
    }

    fn field_row(&mut self, label: &str, value: &str, label2: &str, value2: &str) {
        self.ensure_space(7.0);
        self.draw_text(&format!("{}:", label), 9.0, LEFT, self.y, FontKind::Bold, MUTED);
        self.draw_text(value, 9.0, LEFT + 32.0, self.y, FontKind::Regular, SLATE);
        self.draw_text(&format!("{}:", label2), 9.0, LEFT + 95.0, self.y, FontKind::Bold, MUTED);
        self.draw_text(value2, 9.0, LEFT + 125.0, self.y, FontKind::Regular, SLATE);
        self.y -= 7.0;
    }

    fn divider(&mut self) {
        self.gap(2.0);
        self.layer.set_outline_color(color((226, 232, 240)));
        self.layer.set_outline_thickness(0.3);
        self.layer.add_line(Line {
            points: vec![
                (Point::new(Mm(LEFT), Mm(self.y)), false),
                (Point::new(Mm(RIGHT), Mm(self.y)), false),
            ],
            is_closed: false,
        });
        self.gap(3.0);
    }

    fn result_banner(
        &mut self,
        label: ClassificationLabel,
        confidence: f64,
        severity: Option<Severity>,
    ) {
        const HEIGHT: f32 = 26.0;
        self.ensure_space(HEIGHT + 5.0);

        let (fill, text) = banner(label);
        let top = self.y;
        self.fill_rect(LEFT, top - HEIGHT, RIGHT, top, fill);
        self.draw_text(text, 14.0, LEFT + 6.0, top - 10.0, FontKind::Bold, WHITE);

        let mut detail = format!("AI Confidence: {}", format_confidence(confidence));
        if let Some(severity) = severity {
            detail.push_str(&format!("   |   Severity: {}", severity));
        }
        self.draw_text(&detail, 11.0, LEFT + 6.0, top - 20.0, FontKind::Regular, WHITE);
        self.y = top - HEIGHT - 5.0;
    }

    fn advice_block(&mut self, text: &str) {
        for block in parse_blocks(text) {
            match block {
                Block::Blank => self.gap(2.0),
                Block::Heading { text, .. } => {
                    self.gap(2.0);
                    let text = strip_bold(&text);
                    self.paragraph(&text, 10.0, LEFT, WRAP_CHARS, FontKind::Bold, SLATE);
                }
                Block::Bullet(text) => {
                    let item = format!("-  {}", strip_bold(&text));
                    self.paragraph(&item, 9.0, LEFT + 3.0, WRAP_CHARS - 3, FontKind::Regular, BODY);
                    self.gap(1.0);
                }
                Block::Numbered { number, text } => {
                    let item = format!("{}.  {}", number, strip_bold(&text));
                    self.paragraph(&item, 9.0, LEFT + 3.0, WRAP_CHARS - 3, FontKind::Regular, BODY);
                    self.gap(1.0);
                }
                Block::Paragraph(text) => {
                    let text = strip_bold(&text);
                    self.paragraph(&text, 9.0, LEFT, WRAP_CHARS, FontKind::Regular, BODY);
                }
            }
        }
    }
}

/// 渲染 PDF 字节
pub fn render(report: &Report, details: &AnalysisDetails) -> Result<Vec<u8>> {
    let title = format!("HemoScope Report {}", report.patient.patient_id);
    let (doc, page1, layer1) =
        PdfDocument::new(title.as_str(), Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");

    let fonts = Fonts {
        regular: doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| pdf_error("PDF font error", e))?,
        bold: doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| pdf_error("PDF font error", e))?,
        italic: doc
            .add_builtin_font(BuiltinFont::HelveticaOblique)
            .map_err(|e| pdf_error("PDF font error", e))?,
    };

    let report_date = report.generated_at.format("%Y-%m-%d %H:%M:%S UTC").to_string();
    let mut canvas = Canvas {
        doc: &doc,
        layer: doc.get_page(page1).get_layer(layer1),
        fonts,
        y: CONTENT_TOP,
        page_no: 1,
        footer: format!("HemoScope Report | Generated {}", report_date),
    };
    canvas.decorate_page();

    let patient = &report.patient;
    let placeholder = |v: &str, p: &str| {
        if v.trim().is_empty() {
            p.to_string()
        } else {
            v.to_string()
        }
    };

    canvas.section_header("Patient Information");
    canvas.field_row(
        "Full Name",
        &placeholder(&patient.name, "Not provided"),
        "Patient ID",
        &patient.patient_id,
    );
    canvas.field_row(
        "Date of Birth",
        &placeholder(&patient.date_of_birth, "Not provided"),
        "Age",
        &describe_age(&patient.date_of_birth, report.generated_at.date_naive()),
    );
    canvas.field_row("Gender", &patient.gender.to_string(), "Report Date", &report_date);
    canvas.divider();

    canvas.section_header("Classification Result");
    canvas.result_banner(
        report.classification.label,
        report.classification.confidence,
        report.severity(),
    );
    canvas.divider();

    canvas.section_header("Analysis Details");
    let mut rows = vec![
        ("Analysis Method", details.method.as_str()),
        ("Model ID", details.model_id.as_str()),
    ];
    if let Some(tag) = &details.serving_model {
        rows.push(("Serving Model", tag.as_str()));
    }
    for (name, value) in rows {
        canvas.line(&format!("{}: {}", name, value), 9.0, LEFT, FontKind::Regular, BODY, 5.5);
    }
    for (name, value) in &details.metrics {
        canvas.line(&format!("{}: {}", name, value), 9.0, LEFT, FontKind::Regular, BODY, 5.5);
    }
    canvas.divider();

    if let Some(advisory) = &report.advisory {
        canvas.section_header("Clinical Recommendations");
        canvas.advice_block(&advisory.recommendations);
        canvas.divider();

        if !advisory.next_steps.is_empty() {
            canvas.section_header("Recommended Next Steps");
            for (i, step) in advisory.next_steps.iter().enumerate() {
                let clean =
                    step.trim_start_matches(|c: char| c.is_ascii_digit() || c == '.' || c == ' ');
                let item = format!("{}.  {}", i + 1, strip_bold(clean));
                canvas.paragraph(&item, 9.0, LEFT + 3.0, WRAP_CHARS - 3, FontKind::Regular, BODY);
            }
            canvas.divider();
        }
    }

    canvas.section_header("Important Disclaimer");
    canvas.line(
        "WARNING: This report is for RESEARCH & EDUCATIONAL PURPOSES ONLY",
        9.0,
        LEFT,
        FontKind::Bold,
        (161, 98, 7),
        5.5,
    );
    canvas.paragraph(DISCLAIMER_TEXT, 8.0, LEFT, WRAP_CHARS + 10, FontKind::Regular, (133, 77, 14));

    let mut buf = BufWriter::new(Vec::new());
    doc.save(&mut buf).map_err(|e| pdf_error("PDF save error", e))?;
    buf.into_inner().map_err(|e| pdf_error("PDF buffer error", e))
}
