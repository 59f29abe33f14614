//! Bulletin document rendering.
//!
//! Produces a standalone HTML page for one assembled report. Markup is
//! written through `quick_xml::Writer`, so names and appreciation text are
//! always escaped.

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use thiserror::Error;
use uuid::Uuid;

use crate::db::models::{ReportStatus, StudentIdentity};
use crate::helpers::format_2dp;
use crate::services::grading::SubjectAverage;
use crate::services::report::AssembledReport;

const STYLESHEET: &str = "\
body { font-family: sans-serif; margin: 2em; color: #222; }
header.identity { border-bottom: 2px solid #444; margin-bottom: 1em; }
table.subjects { border-collapse: collapse; width: 100%; }
table.subjects th, table.subjects td { border: 1px solid #bbb; padding: 4px 8px; }
td.num { text-align: right; }
section.summary { margin-top: 1em; font-size: 1.1em; }
section.appreciation { margin-top: 1em; font-style: italic; }
";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to write markup: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("rendered document is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Download filename for a report, e.g. `bulletin-<id>.html`.
pub fn document_filename(report_id: Uuid) -> String {
    format!("bulletin-{}.html", report_id)
}

/// Thin wrapper over the XML writer for the handful of shapes a bulletin uses.
struct Html {
    writer: Writer<Vec<u8>>,
}

impl Html {
    fn new() -> Self {
        Self {
            writer: Writer::new_with_indent(Vec::new(), b' ', 2),
        }
    }

    fn event(&mut self, event: Event<'_>) -> Result<(), RenderError> {
        self.writer
            .write_event(event)
            .map_err(quick_xml::Error::from)?;
        Ok(())
    }

    fn open(&mut self, tag: &str, attrs: &[(&str, &str)]) -> Result<(), RenderError> {
        self.event(Event::Start(
            BytesStart::new(tag).with_attributes(attrs.iter().copied()),
        ))
    }

    fn close(&mut self, tag: &str) -> Result<(), RenderError> {
        self.event(Event::End(BytesEnd::new(tag)))
    }

    fn text(&mut self, text: &str) -> Result<(), RenderError> {
        self.event(Event::Text(BytesText::new(text)))
    }

    /// `<tag attrs>text</tag>`
    fn element(&mut self, tag: &str, attrs: &[(&str, &str)], text: &str) -> Result<(), RenderError> {
        self.open(tag, attrs)?;
        self.text(text)?;
        self.close(tag)
    }

    /// `<p>label <strong>value</strong></p>`
    fn labelled(&mut self, label: &str, value: &str) -> Result<(), RenderError> {
        self.open("p", &[])?;
        self.text(label)?;
        self.element("strong", &[], value)?;
        self.close("p")
    }

    fn finish(self) -> Result<String, RenderError> {
        Ok(String::from_utf8(self.writer.into_inner())?)
    }
}

fn status_label(status: ReportStatus) -> &'static str {
    match status {
        ReportStatus::Draft => "Provisoire",
        ReportStatus::Published => "Définitif",
    }
}

fn subject_row(html: &mut Html, subject: &SubjectAverage) -> Result<(), RenderError> {
    let style = subject
        .subject
        .color
        .as_deref()
        .map(|c| format!("border-left: 6px solid {}", c));
    match &style {
        Some(style) => html.open("tr", &[("style", style.as_str())])?,
        None => html.open("tr", &[])?,
    }
    html.element("td", &[], &subject.subject.name)?;
    html.element("td", &[], &subject.subject.code)?;
    html.element("td", &[("class", "num")], &subject.grades.len().to_string())?;
    html.element(
        "td",
        &[("class", "num")],
        &format!("{}/20", format_2dp(subject.average)),
    )?;
    html.element("td", &[("class", "num")], &format_2dp(subject.coefficient()))?;
    html.element("td", &[("class", "num")], &format_2dp(subject.weighted_average))?;
    html.close("tr")
}

/// Render one report card as an HTML document.
pub fn render_report_html(
    school_name: &str,
    student: &StudentIdentity,
    card: &AssembledReport,
) -> Result<String, RenderError> {
    let report = &card.report;
    let mut html = Html::new();

    html.event(Event::DocType(BytesText::from_escaped("html")))?;
    html.open("html", &[("lang", "fr")])?;

    html.open("head", &[])?;
    html.event(Event::Empty(
        BytesStart::new("meta").with_attributes([("charset", "utf-8")]),
    ))?;
    html.element(
        "title",
        &[],
        &format!(
            "Bulletin {} {} - {}",
            report.semester,
            report.year,
            student.full_name()
        ),
    )?;
    html.element("style", &[], STYLESHEET)?;
    html.close("head")?;

    html.open("body", &[])?;

    // Identity block
    html.open("header", &[("class", "identity")])?;
    html.element("h1", &[], school_name)?;
    html.element("h2", &[], "Bulletin de notes")?;
    html.labelled("Élève : ", &student.full_name())?;
    if let Some(class_name) = &student.class_name {
        html.labelled("Classe : ", class_name)?;
    }
    html.labelled("Semestre : ", &report.semester)?;
    html.labelled("Année : ", &report.year)?;
    html.labelled("Statut : ", status_label(report.status))?;
    html.close("header")?;

    // Subject table
    html.open("table", &[("class", "subjects")])?;
    html.open("thead", &[])?;
    html.open("tr", &[])?;
    for heading in ["Matière", "Code", "Notes", "Moyenne", "Coefficient", "Points"] {
        html.element("th", &[], heading)?;
    }
    html.close("tr")?;
    html.close("thead")?;
    html.open("tbody", &[])?;
    for subject in &card.subjects {
        subject_row(&mut html, subject)?;
    }
    html.close("tbody")?;
    html.close("table")?;

    // Summary
    html.open("section", &[("class", "summary")])?;
    html.labelled(
        "Moyenne générale : ",
        &format!("{}/20", format_2dp(card.average)),
    )?;
    if let Some(rank) = report.rank {
        let placement = match report.total_students {
            Some(total) => format!("{} / {}", rank, total),
            None => rank.to_string(),
        };
        html.labelled("Rang : ", &placement)?;
    }
    html.close("section")?;

    if let Some(appreciation) = &report.appreciation {
        html.open("section", &[("class", "appreciation")])?;
        html.element("h3", &[], "Appréciation")?;
        html.element("p", &[], appreciation)?;
        html.close("section")?;
    }

    html.close("body")?;
    html.close("html")?;
    html.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::Report;
    use crate::services::fixtures::{dec, grade, report, student, subject};
    use crate::services::report::assemble_report;
    use std::collections::HashMap;

    fn sample(configure: impl FnOnce(&mut Report)) -> (StudentIdentity, AssembledReport) {
        let class_id = Uuid::new_v4();
        let alice = student("Alice", "Martin");
        let math = subject("Mathématiques", "MATH", "3.0");
        let prog = subject("Programmation", "PROG", "4.0");
        let catalog: HashMap<Uuid, _> = [(math.id, math.clone()), (prog.id, prog.clone())]
            .into_iter()
            .collect();
        let grades = vec![
            grade(math.id, "16.5", "20", "1.0"),
            grade(prog.id, "18", "20", "2.0"),
            grade(prog.id, "9", "10", "1.0"),
        ];
        let mut r = report(alice.id, class_id, "S1", "2024");
        configure(&mut r);
        let card = assemble_report(r, grades, &catalog);
        (alice, card)
    }

    #[test]
    fn test_write_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::WriteZero, "sink closed");
        let err = RenderError::from(quick_xml::Error::from(io));
        assert!(matches!(err, RenderError::Xml(_)));
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().contains("sink closed"));
    }

    #[test]
    fn test_document_filename() {
        let id = Uuid::parse_str("3d7f5d6f-24f7-4e8e-8b4b-3e7e44b4a7b2").unwrap();
        assert_eq!(
            document_filename(id),
            "bulletin-3d7f5d6f-24f7-4e8e-8b4b-3e7e44b4a7b2.html"
        );
    }

    #[test]
    fn test_render_subject_rows() {
        let (alice, card) = sample(|_| {});
        let html = render_report_html("G2C", &alice, &card).unwrap();

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("Alice Martin"));
        assert!(html.contains("L3 Informatique"));
        assert!(html.contains("<td>MATH</td>"));
        assert!(html.contains("16.50/20"));
        assert!(html.contains("49.50"));
        assert!(html.contains("3.00"));
        // Programmation: 18/20 (w2) and 9/10 (w1) → 18.00 over 2 grades
        assert!(html.contains("18.00/20"));
        assert!(html.contains("72.00"));
        assert!(html.contains(">2</td>"));
    }

    #[test]
    fn test_render_live_general_average() {
        let (alice, card) = sample(|_| {});
        let html = render_report_html("G2C", &alice, &card).unwrap();
        assert!(html.contains("17.36/20"));
    }

    #[test]
    fn test_render_stored_general_average() {
        let (alice, card) = sample(|r| r.average = Some(dec("16.33")));
        let html = render_report_html("G2C", &alice, &card).unwrap();
        assert!(html.contains("16.33/20"));
        assert!(!html.contains("17.36/20"));
    }

    #[test]
    fn test_render_rank_with_total() {
        let (alice, card) = sample(|r| {
            r.rank = Some(2);
            r.total_students = Some(28);
        });
        let html = render_report_html("G2C", &alice, &card).unwrap();
        assert!(html.contains("Rang : "));
        assert!(html.contains("2 / 28"));
    }

    #[test]
    fn test_render_rank_without_total() {
        let (alice, card) = sample(|r| r.rank = Some(5));
        let html = render_report_html("G2C", &alice, &card).unwrap();
        assert!(html.contains("<strong>5</strong>"));
        assert!(!html.contains(" / "));
    }

    #[test]
    fn test_render_omits_missing_rank_and_appreciation() {
        let (alice, card) = sample(|_| {});
        let html = render_report_html("G2C", &alice, &card).unwrap();
        assert!(!html.contains("Rang"));
        assert!(!html.contains("class=\"appreciation\""));
    }

    #[test]
    fn test_render_escapes_free_text() {
        let (alice, card) = sample(|r| {
            r.appreciation = Some("Bon travail <script>alert(1)</script> & sérieux".to_string())
        });
        let html = render_report_html("G2C & Co", &alice, &card).unwrap();
        assert!(html.contains("class=\"appreciation\""));
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("G2C &amp; Co"));
    }

    #[test]
    fn test_render_status_label() {
        let (alice, card) = sample(|r| r.status = ReportStatus::Published);
        let html = render_report_html("G2C", &alice, &card).unwrap();
        assert!(html.contains("Définitif"));
    }

    #[test]
    fn test_render_without_subjects() {
        let alice = student("Alice", "Martin");
        let card = assemble_report(report(alice.id, Uuid::new_v4(), "S2", "2024"), vec![], &HashMap::new());
        let html = render_report_html("G2C", &alice, &card).unwrap();
        assert!(html.contains("0.00/20"));
        assert!(html.contains("</html>"));
    }
}
