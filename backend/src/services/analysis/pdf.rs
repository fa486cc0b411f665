use crate::error::ApiError;
use crate::services::analysis::export::Report;
use common::model::analysis::ParagraphResult;
use common::model::issue::{Issue, Severity};
use genpdf::elements::{Break, LinearLayout, Paragraph};
use genpdf::style::{Style, StyledString};
use genpdf::Document;
use std::path::Path;

const BODY_FONT_SIZE: u8 = 9;
const HEADING_FONT_SIZE: u8 = 14;

/// Load the font family from `fonts_dir`: Arial when present, else LiberationSans.
fn load_font(
    fonts_dir: &Path,
) -> Result<genpdf::fonts::FontFamily<genpdf::fonts::FontData>, ApiError> {
    if let Ok(family) = genpdf::fonts::from_files(fonts_dir, "Arial", None) {
        return Ok(family);
    }
    genpdf::fonts::from_files(fonts_dir, "LiberationSans", None).map_err(|e| {
        ApiError::Export(format!(
            "no usable font family in {}: {}",
            fonts_dir.display(),
            e
        ))
    })
}

fn configure_document(fonts_dir: &Path, title: &str) -> Result<Document, ApiError> {
    let mut doc = Document::new(load_font(fonts_dir)?);
    doc.set_title(title);
    doc.set_font_size(BODY_FONT_SIZE);
    doc.set_line_spacing(1.1);

    let mut decorator = genpdf::SimplePageDecorator::new();
    decorator.set_margins(10);
    doc.set_page_decorator(decorator);
    Ok(doc)
}

fn heading(text: &str) -> Paragraph {
    let mut p = Paragraph::new("");
    p.push(StyledString::new(
        text.to_string(),
        Style::new().bold().with_font_size(HEADING_FONT_SIZE),
    ));
    p
}

fn labelled(label: &str, value: &str) -> Paragraph {
    let mut p = Paragraph::new("");
    p.push(StyledString::new(format!("{}: ", label), Style::new().bold()));
    p.push(StyledString::new(value.to_string(), Style::new()));
    p
}

fn severity_style(severity: Severity) -> Style {
    match severity {
        Severity::Critical | Severity::High => Style::new().bold(),
        Severity::Success => Style::new().italic(),
        Severity::Medium | Severity::Low => Style::new(),
    }
}

fn push_issue(layout: &mut LinearLayout, issue: &Issue) {
    let mut p = Paragraph::new("");
    p.push(StyledString::new("• ", Style::new()));
    p.push(StyledString::new(
        format!("[{}] ", issue.severity.as_str().to_uppercase()),
        severity_style(issue.severity),
    ));
    p.push(StyledString::new(
        format!("{} {}: ", issue.rule_number, issue.rule_title),
        Style::new().bold(),
    ));
    p.push(StyledString::new(issue.description.clone(), Style::new()));
    layout.push(p);

    if let Some(fix) = &issue.suggested_fix {
        let mut p = Paragraph::new("");
        p.push(StyledString::new("   Suggested fix: ", Style::new().italic()));
        p.push(StyledString::new(fix.clone(), Style::new()));
        layout.push(p);
    }
}

fn push_paragraph(doc: &mut Document, paragraph: &ParagraphResult) {
    let badge = match (&paragraph.error, paragraph.highest_severity()) {
        (Some(_), _) => "NOT ANALYSED".to_string(),
        (None, Some(severity)) => severity.as_str().to_uppercase(),
        (None, None) => "NO FINDINGS".to_string(),
    };

    let mut layout = LinearLayout::vertical();
    let mut title = Paragraph::new("");
    title.push(StyledString::new(
        format!("Paragraph {} ({})", paragraph.index + 1, badge),
        Style::new().bold(),
    ));
    layout.push(title);
    for line in paragraph.content.lines() {
        layout.push(Paragraph::new(line.to_string()));
    }
    if let Some(reason) = &paragraph.error {
        let mut p = Paragraph::new("");
        p.push(StyledString::new(format!("   {}", reason), Style::new().italic()));
        layout.push(p);
    }
    for issue in &paragraph.issues {
        push_issue(&mut layout, issue);
    }
    doc.push(layout);
    doc.push(Break::new(1));
}

/// Renders `report` as a PDF and returns its bytes.
pub(crate) fn render_report(report: &Report, fonts_dir: &Path) -> Result<Vec<u8>, ApiError> {
    let mut doc = configure_document(fonts_dir, &report.title)?;

    doc.push(heading("Compliance Analysis Report"));
    doc.push(Break::new(1));
    doc.push(labelled("Document", &report.title));
    doc.push(labelled("Rule set", &report.rule_set_name));
    let effective = report
        .effective_date
        .map(|d| d.to_string())
        .unwrap_or_else(|| "current rules".to_string());
    doc.push(labelled("Effective date", &effective));
    doc.push(labelled(
        "Generated",
        &report.generated_at.format("%Y-%m-%d %H:%M UTC").to_string(),
    ));
    doc.push(Break::new(1));

    let summary = &report.risk_summary;
    doc.push(heading("Summary"));
    doc.push(labelled(
        "Paragraphs analysed",
        &report.paragraphs.len().to_string(),
    ));
    doc.push(labelled(
        "Compliant paragraphs",
        &summary.compliant_paragraphs.to_string(),
    ));
    if summary.failed_paragraphs > 0 {
        doc.push(labelled(
            "Not analysed",
            &summary.failed_paragraphs.to_string(),
        ));
    }
    doc.push(labelled(
        "Risks",
        &format!(
            "{} critical, {} high, {} medium, {} low",
            summary.critical, summary.high, summary.medium, summary.low
        ),
    ));
    doc.push(Break::new(1));

    doc.push(heading("Findings"));
    for paragraph in &report.paragraphs {
        push_paragraph(&mut doc, paragraph);
    }

    let mut bytes = Vec::new();
    doc.render(&mut bytes)
        .map_err(|e| ApiError::Export(e.to_string()))?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::model::analysis::RiskSummary;
    use common::model::issue::IssueType;

    /// Where Debian-style systems install the Liberation fonts.
    const SYSTEM_LIBERATION_DIR: &str = "/usr/share/fonts/truetype/liberation";

    fn report() -> Report {
        let paragraphs = vec![
            ParagraphResult {
                index: 0,
                content: "The adviser will disclose every fee.".to_string(),
                applicable_rules: vec!["2111".to_string()],
                issues: vec![Issue {
                    rule_number: "2111".to_string(),
                    rule_title: "Suitability".to_string(),
                    severity: Severity::Medium,
                    issue_type: IssueType::Inadequate,
                    description: "Risk tolerance is not addressed.".to_string(),
                    current_text: None,
                    required_text: None,
                    suggested_fix: Some("Add language covering risk.".to_string()),
                }],
                error: None,
            },
            ParagraphResult::failed(1, "Either party may end this agreement.".to_string(), "Analysis failed"),
        ];
        Report {
            session_id: "c0ffee00-0000".to_string(),
            title: "Advisory agreement".to_string(),
            rule_set_name: "FINRA".to_string(),
            effective_date: None,
            completed_at: Some(Utc::now()),
            generated_at: Utc::now(),
            risk_summary: RiskSummary::from_paragraphs(&paragraphs),
            paragraphs,
        }
    }

    #[test]
    fn missing_fonts_are_an_export_error() {
        let empty = tempfile::tempdir().unwrap();
        let err = render_report(&report(), empty.path()).unwrap_err();
        assert!(matches!(err, ApiError::Export(_)));
    }

    #[test]
    fn renders_with_liberation_fonts_when_installed() {
        let dir = Path::new(SYSTEM_LIBERATION_DIR);
        if !dir.join("LiberationSans-Regular.ttf").exists() {
            return;
        }
        let bytes = render_report(&report(), dir).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
