//! HTML 报告渲染

use hemoscope_core::utils::{describe_age, format_confidence};
use hemoscope_core::{Advisory, ClassificationLabel, Report};
use std::fmt::Write;

use crate::markdown::{bold_to_html, parse_blocks, Block};
use crate::text::escape_html;
use crate::{AnalysisDetails, DISCLAIMER_POINTS};

const LIST_STYLE: &str = "margin: 4px 0; padding-left: 20px; color: #334155; line-height: 1.8;";

fn banner_color(label: ClassificationLabel) -> &'static str {
    match label {
        ClassificationLabel::Normal => "#22c55e",
        ClassificationLabel::Leukemia => "#ef4444",
        ClassificationLabel::Uncertain => "#eab308",
    }
}

fn or_placeholder<'a>(value: &'a str, placeholder: &'a str) -> &'a str {
    if value.trim().is_empty() {
        placeholder
    } else {
        value
    }
}

/// 渲染完整 HTML 报告
pub fn render(report: &Report, details: &AnalysisDetails) -> String {
    let mut out = String::new();

    out.push_str(
        "<div class=\"hs-report\" style=\"font-family: 'Segoe UI', Tahoma, sans-serif; \
         max-width: 800px; margin: 0 auto; color: #1e293b;\">\n",
    );
    push_header(&mut out);
    push_patient(&mut out, report);
    push_result_banner(&mut out, report);
    push_analysis_details(&mut out, details);

    if let Some(advisory) = &report.advisory {
        push_recommendations(&mut out, advisory);
        push_next_steps(&mut out, advisory);
    }

    push_disclaimer(&mut out);
    out.push_str(
        "<div style=\"text-align: center; padding: 20px; color: #64748b; font-size: 12px;\">\n",
    );
    out.push_str("    <p>Report generated by <strong>HemoScope</strong></p>\n</div>\n");
    out.push_str("</div>\n");
    out
}

fn push_header(out: &mut String) {
    out.push_str(
        "<div style=\"text-align: center; padding: 20px; background: #1e293b; color: white; \
         border-radius: 12px 12px 0 0;\">\n",
    );
    out.push_str("    <h1 style=\"margin: 0; font-size: 28px;\">HemoScope</h1>\n");
    out.push_str(
        "    <p style=\"margin: 5px 0 0 0; opacity: 0.9;\">AI Blood Cell Analysis Report</p>\n",
    );
    out.push_str("</div>\n");
}

fn push_patient(out: &mut String, report: &Report) {
    let patient = &report.patient;
    let report_date = report.generated_at.format("%Y-%m-%d %H:%M:%S UTC").to_string();
    let age = describe_age(&patient.date_of_birth, report.generated_at.date_naive());
    let name = escape_html(or_placeholder(&patient.name, "Not provided"));
    let dob = escape_html(or_placeholder(&patient.date_of_birth, "Not provided"));
    let rows = [
        ("Name", name, "Patient ID", escape_html(&patient.patient_id)),
        ("Date of Birth", dob, "Age", age),
        ("Gender", patient.gender.to_string(), "Report Date", report_date),
    ];

    out.push_str(
        "<div style=\"background: #f8fafc; padding: 20px; border-left: 4px solid #3b82f6;\">\n",
    );
    out.push_str("    <h3 style=\"margin-top: 0; color: #1e40af;\">Patient Information</h3>\n");
    out.push_str("    <table style=\"width: 100%; border-collapse: collapse;\">\n");
    for (label, value, label2, value2) in rows {
        let _ = writeln!(
            out,
            "        <tr><td style=\"padding: 8px 0; color: #64748b; width: 140px;\">\
             <strong>{}:</strong></td><td style=\"padding: 8px 0;\">{}</td>\
             <td style=\"padding: 8px 0; color: #64748b; width: 140px;\">\
             <strong>{}:</strong></td><td style=\"padding: 8px 0;\">{}</td></tr>",
            label, value, label2, value2
        );
    }
    out.push_str("    </table>\n</div>\n");
}

fn push_result_banner(out: &mut String, report: &Report) {
    let classification = &report.classification;
    let _ = writeln!(
        out,
        "<div style=\"background: {}; color: white; padding: 25px; text-align: center; \
         margin: 20px 0; border-radius: 8px;\">",
        banner_color(classification.label)
    );
    let _ = writeln!(
        out,
        "    <h2 style=\"margin: 0; font-size: 28px;\">{}</h2>",
        classification.label.status_text()
    );
    let _ = writeln!(
        out,
        "    <p style=\"margin: 10px 0 0 0;\">Classification: <strong>{}</strong></p>",
        classification.label
    );
    let _ = writeln!(
        out,
        "    <p style=\"margin: 10px 0 0 0; font-size: 18px;\">Confidence: <strong>{}</strong></p>",
        format_confidence(classification.confidence)
    );
    if let Some(severity) = report.severity() {
        let _ = writeln!(
            out,
            "    <p style=\"margin: 10px 0 0 0;\">Severity: <strong>{}</strong></p>",
            severity
        );
    }
    out.push_str("</div>\n");
}

fn push_analysis_details(out: &mut String, details: &AnalysisDetails) {
    out.push_str(
        "<div style=\"background: white; padding: 20px; border: 1px solid #e2e8f0; \
         border-radius: 8px; margin-bottom: 20px;\">\n",
    );
    out.push_str("    <h3 style=\"margin-top: 0;\">Analysis Details</h3>\n");
    out.push_str("    <table style=\"width: 100%; border-collapse: collapse;\">\n");

    let strong = |value: &str| format!("<strong>{}</strong>", escape_html(value));
    let code = |value: &str| format!("<code>{}</code>", escape_html(value));

    let mut rows = vec![
        ("Analysis Method".to_string(), strong(details.method.as_str())),
        ("Model ID".to_string(), code(details.model_id.as_str())),
    ];
    if let Some(tag) = &details.serving_model {
        rows.push(("Serving Model".to_string(), code(tag.as_str())));
    }
    rows.extend(
        details
            .metrics
            .iter()
            .map(|(name, value)| (name.clone(), strong(value.as_str()))),
    );
    for (name, value) in rows {
        let _ = writeln!(
            out,
            "        <tr style=\"border-bottom: 1px solid #e2e8f0;\">\
             <td style=\"padding: 12px 0; color: #64748b;\">{}</td>\
             <td style=\"padding: 12px 0; text-align: right;\">{}</td></tr>",
            escape_html(&name),
            value
        );
    }
    out.push_str("    </table>\n</div>\n");
}

#[derive(PartialEq, Eq, Clone, Copy)]
enum OpenList {
    None,
    Bullets,
    Numbers,
}

fn close_list(out: &mut String, open: &mut OpenList) {
    match open {
        OpenList::None => {}
        OpenList::Bullets => out.push_str("    </ul>\n"),
        OpenList::Numbers => out.push_str("    </ol>\n"),
    }
    *open = OpenList::None;
}

/// 建议正文转为 HTML，模型文本先转义
pub fn advice_to_html(text: &str) -> String {
    let mut out = String::new();
    let mut open = OpenList::None;

    for block in parse_blocks(text) {
        match block {
            Block::Blank => {
                close_list(&mut out, &mut open);
                out.push_str("    <br>\n");
            }
            Block::Heading { level, text } => {
                close_list(&mut out, &mut open);
                let size = if level == 1 { "16px" } else { "15px" };
                let _ = writeln!(
                    out,
                    "    <h4 style=\"margin: 16px 0 8px; color: #1e40af; font-size: {};\">{}</h4>",
                    size,
                    bold_to_html(&escape_html(&text))
                );
            }
            Block::Bullet(text) => {
                if open != OpenList::Bullets {
                    close_list(&mut out, &mut open);
                    let _ = writeln!(out, "    <ul style=\"{}\">", LIST_STYLE);
                    open = OpenList::Bullets;
                }
                let _ = writeln!(out, "        <li>{}</li>", bold_to_html(&escape_html(&text)));
            }
            Block::Numbered { text, .. } => {
                if open != OpenList::Numbers {
                    close_list(&mut out, &mut open);
                    let _ = writeln!(out, "    <ol style=\"{}\">", LIST_STYLE);
                    open = OpenList::Numbers;
                }
                let _ = writeln!(out, "        <li>{}</li>", bold_to_html(&escape_html(&text)));
            }
            Block::Paragraph(text) => {
                close_list(&mut out, &mut open);
                let _ = writeln!(
                    out,
                    "    <p style=\"color: #334155; line-height: 1.6; margin: 4px 0;\">{}</p>",
                    bold_to_html(&escape_html(&text))
                );
            }
        }
    }
    close_list(&mut out, &mut open);
    out
}

fn push_recommendations(out: &mut String, advisory: &Advisory) {
    out.push_str(
        "<div class=\"hs-advice\" style=\"background: #f8fafc; padding: 20px; \
         border: 1px solid #e2e8f0; border-radius: 8px; margin-bottom: 20px;\">\n",
    );
    out.push_str("    <h3 style=\"margin-top: 0;\">Clinical Recommendations</h3>\n");
    out.push_str(&advice_to_html(&advisory.recommendations));
    out.push_str("</div>\n");
}

fn push_next_steps(out: &mut String, advisory: &Advisory) {
    if advisory.next_steps.is_empty() {
        return;
    }

    out.push_str(
        "<div style=\"background: #eff6ff; padding: 20px; border-radius: 8px; \
         margin-bottom: 20px;\">\n",
    );
    out.push_str("    <h3 style=\"margin-top: 0; color: #1e40af;\">Recommended Next Steps</h3>\n");
    let _ = writeln!(out, "    <ol style=\"{}\">", LIST_STYLE);
    for step in &advisory.next_steps {
        let clean =
            step.trim_start_matches(|c: char| c.is_ascii_digit() || c == '.' || c == ' ');
        let _ = writeln!(out, "        <li>{}</li>", escape_html(clean));
    }
    out.push_str("    </ol>\n</div>\n");
}

fn push_disclaimer(out: &mut String) {
    out.push_str(
        "<div style=\"background: #fefce8; padding: 20px; border: 1px solid #fef08a; \
         border-radius: 8px; margin-bottom: 20px;\">\n",
    );
    out.push_str("    <h3 style=\"margin-top: 0; color: #a16207;\">Important Disclaimer</h3>\n");
    out.push_str(
        "    <ul style=\"color: #854d0e; margin: 0; padding-left: 20px; line-height: 1.8;\">\n",
    );
    for point in DISCLAIMER_POINTS {
        let _ = writeln!(out, "        <li>{}</li>", point);
    }
    out.push_str("    </ul>\n</div>\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use hemoscope_core::{
        AdvisorySource, ClassificationResult, Gender, PatientRecord, Severity,
    };

    fn patient(name: &str) -> PatientRecord {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap();
        PatientRecord::register(name, "1990-04-02", Gender::Female, at).unwrap()
    }

    fn advisory(text: &str) -> Advisory {
        Advisory {
            recommendations: text.to_string(),
            next_steps: vec!["1. CBC".to_string(), "Biopsy".to_string()],
            severity: Severity::High,
            requires_urgent_action: true,
            source: AdvisorySource::Model,
        }
    }

    fn report(label: ClassificationLabel, confidence: f64, advisory: Option<Advisory>) -> Report {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 10, 5, 0).unwrap();
        let classification = ClassificationResult::new(label, confidence, "");
        Report::new(patient("Jane Doe"), classification, advisory, at)
    }

    #[test]
    fn test_normal_report_has_no_advice_or_severity() {
        let input = report(ClassificationLabel::Normal, 0.91, None);
        let html = render(&input, &AnalysisDetails::default());
        assert!(html.contains("Classification: <strong>Normal</strong>"));
        assert!(html.contains("91.0%"));
        assert!(!html.contains("Severity"));
        assert!(!html.contains("Clinical Recommendations"));
        assert!(!html.contains("Recommended Next Steps"));
        assert!(html.contains("35 years"));
    }

    #[test]
    fn test_leukemia_report_includes_advice() {
        let html = render(
            &report(
                ClassificationLabel::Leukemia,
                0.88,
                Some(advisory("## Plan\n- Refer **now**")),
            ),
            &AnalysisDetails::default(),
        );
        assert!(html.contains("LEUKEMIA DETECTED"));
        assert!(html.contains("Severity: <strong>High</strong>"));
        assert!(html.contains("Refer <strong>now</strong>"));
        assert!(html.contains("<li>CBC</li>"));
    }

    #[test]
    fn test_render_is_deterministic() {
        let input = report(ClassificationLabel::Leukemia, 0.88, Some(advisory("text")));
        let details = AnalysisDetails::default();
        assert_eq!(render(&input, &details), render(&input, &details));
    }

    #[test]
    fn test_model_text_is_escaped() {
        let html = advice_to_html("<script>alert(1)</script>\n1. **Biopsy** & flow");
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("<ol"));
        assert!(html.contains("<strong>Biopsy</strong> &amp; flow"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_mixed_lists_are_closed() {
        let html = advice_to_html("- a\n1. b\nplain");
        assert_eq!(html.matches("<ul").count(), html.matches("</ul>").count());
        assert_eq!(html.matches("<ol").count(), html.matches("</ol>").count());
    }
}
