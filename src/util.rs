use crate::error::{GradeError, GradeResult};
use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::path::Path;
use time::Date;
use time::format_description::well_known::Rfc3339;
use unicode_normalization::UnicodeNormalization;

pub fn ensure_dir(p: &Path) -> Result<()> {
    std::fs::create_dir_all(p).with_context(|| format!("create_dir_all {}", p.display()))
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(bytes);
    format!("{:x}", h.finalize())
}

pub fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

pub fn today_iso() -> String {
    let d = time::OffsetDateTime::now_utc().date();
    format!("{:04}-{:02}-{:02}", d.year(), u8::from(d.month()), d.day())
}

pub fn parse_iso_date(s: &str) -> GradeResult<Date> {
    let fmt = time::format_description::parse("[year]-[month]-[day]")
        .map_err(|e| GradeError::InvalidInput(format!("date format: {e}")))?;
    Date::parse(s.trim(), &fmt)
        .map_err(|e| GradeError::InvalidInput(format!("inspection date {s:?}: {e}")))
}

/// Short content-derived id, e.g. for new inspections.
pub fn short_id(parts: &[&str]) -> String {
    let joined = parts.join("\u{1f}");
    sha256_hex(joined.as_bytes())[..16].to_string()
}

/// NFC-normalized free text, trimmed. Inspector input arrives from mixed
/// keyboards and locales.
pub fn normalize_text(s: &str) -> String {
    s.trim().nfc().collect::<String>()
}
