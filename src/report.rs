use crate::{
    error::GradeResult,
    grading::GradeTable,
    model::{Inspection, InspectionItem, ItemStatus},
    stats::{Percentage, Summary},
    util::{normalize_text, sha256_hex},
};
use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use tracing::{debug, info};

/// Derived view of an inspection. Built fresh from the live record every
/// time; never persisted next to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionReport {
    pub inspection_id: String,
    #[serde(flatten)]
    pub summary: Summary,
    pub pass_percentage: Percentage,
    pub fail_percentage: Percentage,
    pub snags_percentage: Percentage,
    pub grade: String,
    pub grade_rank: usize,
    pub table: String,
    /// SHA-256 of the inspection JSON the report was computed from.
    pub fingerprint: String,
}

pub fn compute_inspection_grade(inspection: &Inspection, table: &GradeTable) -> GradeResult<InspectionReport> {
    table.validate()?;

    let summary = Summary::of(&inspection.areas);
    let pass_percentage = summary.pass_percentage()?;
    let fail_percentage = summary.fail_percentage()?;
    let grade = table.classify(pass_percentage, fail_percentage);

    let canonical = serde_json::to_vec(inspection)
        .map_err(|e| crate::error::GradeError::InvalidInput(format!("serialize inspection: {e}")))?;

    debug!(
        "inspection={} total={} pass={} fail={} snags={} table={} grade={}",
        inspection.id, summary.total, summary.pass, summary.fail, summary.snags, table.name, grade.label
    );

    Ok(InspectionReport {
        inspection_id: inspection.id.clone(),
        summary,
        pass_percentage,
        fail_percentage,
        snags_percentage: summary.snags_percentage()?,
        grade: grade.label,
        grade_rank: grade.rank,
        table: table.name.clone(),
        fingerprint: sha256_hex(&canonical),
    })
}

/// Turns an inspection and its freshly computed report into a document.
pub trait ReportRenderer {
    fn render(&self, inspection: &Inspection, report: &InspectionReport) -> Result<String>;
}

/// Recomputes the grade from the live inspection, then renders it.
pub fn render_inspection(renderer: &dyn ReportRenderer, inspection: &Inspection, table: &GradeTable) -> Result<String> {
    let report = compute_inspection_grade(inspection, table)
        .with_context(|| format!("grading inspection {}", inspection.id))?;
    info!(
        "render inspection={} grade={} table={} items={}",
        report.inspection_id, report.grade, report.table, report.summary.total
    );
    renderer.render(inspection, &report)
}

pub struct JsonRenderer {
    pub pretty: bool,
}

impl ReportRenderer for JsonRenderer {
    fn render(&self, inspection: &Inspection, report: &InspectionReport) -> Result<String> {
        let doc = serde_json::json!({
            "inspection": inspection,
            "report": report,
        });
        let out = if self.pretty {
            serde_json::to_string_pretty(&doc)?
        } else {
            serde_json::to_string(&doc)?
        };
        Ok(out)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Ar,
    /// English and Arabic side by side.
    Bilingual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoKind {
    DataUri,
    Url,
    LocalKey,
}

pub struct PhotoClassifier {
    data_uri: Regex,
    url: Regex,
}

impl PhotoClassifier {
    pub fn new() -> Result<Self> {
        Ok(Self {
            data_uri: Regex::new(r"^data:image/[A-Za-z0-9.+-]+;base64,[A-Za-z0-9+/=\s]+$")?,
            url: Regex::new(r"^https?://\S+$")?,
        })
    }

    pub fn classify(&self, photo: &str) -> PhotoKind {
        let p = photo.trim();
        if self.data_uri.is_match(p) {
            PhotoKind::DataUri
        } else if self.url.is_match(p) {
            PhotoKind::Url
        } else {
            PhotoKind::LocalKey
        }
    }
}

struct Labels {
    title: &'static str,
    client: &'static str,
    location: &'static str,
    property_type: &'static str,
    inspector: &'static str,
    date: &'static str,
    total: &'static str,
    pass: &'static str,
    fail: &'static str,
    snags: &'static str,
    grade: &'static str,
    category: &'static str,
    point: &'static str,
    status: &'static str,
    comment: &'static str,
    photos: &'static str,
}

const EN: Labels = Labels {
    title: "Inspection Report",
    client: "Client",
    location: "Location",
    property_type: "Property Type",
    inspector: "Inspector",
    date: "Date",
    total: "Total Items",
    pass: "Pass",
    fail: "Fail",
    snags: "Snags",
    grade: "Grade",
    category: "Category",
    point: "Point",
    status: "Status",
    comment: "Comment",
    photos: "Photos",
};

const AR: Labels = Labels {
    title: "تقرير الفحص",
    client: "العميل",
    location: "الموقع",
    property_type: "نوع العقار",
    inspector: "المفتش",
    date: "التاريخ",
    total: "إجمالي البنود",
    pass: "مقبول",
    fail: "مرفوض",
    snags: "ملاحظات",
    grade: "التقييم",
    category: "الفئة",
    point: "البند",
    status: "الحالة",
    comment: "تعليق",
    photos: "الصور",
};

/// Fixed printable summary page. Not a template engine: the layout is the
/// one the bilingual report ships with.
pub struct HtmlSummaryRenderer {
    language: Language,
    title: Option<String>,
    photos: PhotoClassifier,
}

impl HtmlSummaryRenderer {
    pub fn new(language: Language, title: Option<String>) -> Result<Self> {
        Ok(Self {
            language,
            title: title.filter(|t| !t.trim().is_empty()),
            photos: PhotoClassifier::new()?,
        })
    }

    fn label(&self, pick: fn(&Labels) -> &'static str) -> String {
        match self.language {
            Language::En => pick(&EN).to_string(),
            Language::Ar => pick(&AR).to_string(),
            Language::Bilingual => format!("{} / {}", pick(&EN), pick(&AR)),
        }
    }

    fn status_label(&self, status: ItemStatus) -> String {
        match status {
            ItemStatus::Pass => self.label(|l| l.pass),
            ItemStatus::Fail => self.label(|l| l.fail),
            ItemStatus::Snags => self.label(|l| l.snags),
        }
    }

    fn write_item(&self, out: &mut String, item: &InspectionItem) -> Result<()> {
        let class = item.status.as_str().to_ascii_lowercase();
        write!(
            out,
            "<tr class=\"{class}\"><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>",
            esc(&item.category),
            esc(&item.point),
            esc(&self.status_label(item.status)),
            esc(item.comment.as_deref().unwrap_or("")),
        )?;
        for photo in &item.photos {
            match self.photos.classify(photo) {
                PhotoKind::DataUri | PhotoKind::Url => {
                    write!(out, "<img class=\"photo\" src=\"{}\" alt=\"\">", esc_attr(photo.trim()))?;
                }
                PhotoKind::LocalKey => {
                    write!(out, "<span class=\"photo-key\">{}</span>", esc(photo))?;
                }
            }
        }
        out.push_str("</td></tr>\n");
        Ok(())
    }
}

impl ReportRenderer for HtmlSummaryRenderer {
    fn render(&self, inspection: &Inspection, report: &InspectionReport) -> Result<String> {
        let (lang, dir) = match self.language {
            Language::En => ("en", "ltr"),
            Language::Ar => ("ar", "rtl"),
            Language::Bilingual => ("en", "ltr"),
        };
        let title = self
            .title
            .clone()
            .unwrap_or_else(|| self.label(|l| l.title));

        let mut out = String::new();
        writeln!(out, "<!DOCTYPE html>")?;
        writeln!(out, "<html lang=\"{lang}\" dir=\"{dir}\">")?;
        writeln!(out, "<head><meta charset=\"utf-8\"><title>{}</title>", esc(&title))?;
        writeln!(out, "<style>{STYLE}</style></head>")?;
        writeln!(out, "<body>")?;
        writeln!(out, "<h1>{}</h1>", esc(&title))?;

        writeln!(out, "<table class=\"meta\">")?;
        for (label, value) in [
            (self.label(|l| l.client), &inspection.client_name),
            (self.label(|l| l.location), &inspection.property_location),
            (self.label(|l| l.property_type), &inspection.property_type),
            (self.label(|l| l.inspector), &inspection.inspector_name),
            (self.label(|l| l.date), &inspection.inspection_date),
        ] {
            writeln!(out, "<tr><th>{}</th><td>{}</td></tr>", esc(&label), esc(value))?;
        }
        writeln!(out, "</table>")?;

        let s = &report.summary;
        writeln!(out, "<table class=\"summary\">")?;
        writeln!(out, "<tr><th>{}</th><td>{}</td></tr>", esc(&self.label(|l| l.total)), s.total)?;
        writeln!(
            out,
            "<tr><th>{}</th><td>{} ({})</td></tr>",
            esc(&self.label(|l| l.pass)),
            s.pass,
            report.pass_percentage
        )?;
        writeln!(
            out,
            "<tr><th>{}</th><td>{} ({})</td></tr>",
            esc(&self.label(|l| l.fail)),
            s.fail,
            report.fail_percentage
        )?;
        writeln!(
            out,
            "<tr><th>{}</th><td>{} ({})</td></tr>",
            esc(&self.label(|l| l.snags)),
            s.snags,
            report.snags_percentage
        )?;
        writeln!(out, "</table>")?;
        writeln!(
            out,
            "<div class=\"grade\"><span>{}</span><strong>{}</strong></div>",
            esc(&self.label(|l| l.grade)),
            esc(&report.grade)
        )?;

        for area in &inspection.areas {
            writeln!(out, "<section class=\"area\"><h2>{}</h2>", esc(&area.name))?;
            if area.items.is_empty() {
                writeln!(out, "</section>")?;
                continue;
            }
            writeln!(
                out,
                "<table class=\"items\"><tr><th>{}</th><th>{}</th><th>{}</th><th>{}</th><th>{}</th></tr>",
                esc(&self.label(|l| l.category)),
                esc(&self.label(|l| l.point)),
                esc(&self.label(|l| l.status)),
                esc(&self.label(|l| l.comment)),
                esc(&self.label(|l| l.photos)),
            )?;
            for item in &area.items {
                self.write_item(&mut out, item)?;
            }
            writeln!(out, "</table></section>")?;
        }

        writeln!(out, "<footer>{}</footer>", esc(&report.fingerprint))?;
        writeln!(out, "</body></html>")?;
        Ok(out)
    }
}

const STYLE: &str = "body{font-family:sans-serif;margin:24px}\
table{border-collapse:collapse;margin-bottom:16px}\
th,td{border:1px solid #ccc;padding:4px 8px;text-align:start}\
tr.fail td{background:#fde8e8}tr.snags td{background:#fff6db}\
.grade strong{font-size:2em;margin-inline-start:12px}\
img.photo{max-width:160px;max-height:120px;margin:2px}\
footer{color:#999;font-size:.75em}\
@media print{section.area{page-break-inside:avoid}}";

fn esc(s: &str) -> String {
    let s = normalize_text(s);
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

// data URIs can be large; skip normalization and only escape what breaks
// out of the attribute.
fn esc_attr(s: &str) -> String {
    s.replace('&', "&amp;").replace('"', "&quot;").replace('<', "&lt;")
}
