use crate::{
    grading::{GradePreset, GradeTable, ReportVariant},
    report::Language,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub grading: Grading,
    #[serde(default)]
    pub report: Report,
    #[serde(default)]
    pub storage: Storage,
    #[serde(default)]
    pub output: Output,
    #[serde(default)]
    pub logging: Logging,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        if let Some(custom) = &cfg.grading.custom {
            custom
                .validate()
                .with_context(|| format!("grading.custom in {}", path.display()))?;
        }
        Ok(cfg)
    }

    /// Table selection, most specific first: explicit preset, report
    /// variant, custom table from config, configured preset.
    pub fn grade_table(&self, preset: Option<GradePreset>, variant: Option<ReportVariant>) -> GradeTable {
        if let Some(p) = preset {
            return p.table();
        }
        if let Some(v) = variant.or(self.grading.variant) {
            return v.preset().table();
        }
        if let Some(custom) = &self.grading.custom {
            return custom.clone();
        }
        self.grading.preset.table()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Grading {
    pub preset: GradePreset,
    pub variant: Option<ReportVariant>,
    pub custom: Option<GradeTable>,
}
impl Default for Grading {
    fn default() -> Self {
        Self {
            preset: GradePreset::SixGrade,
            variant: None,
            custom: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Report {
    pub language: Language,
    pub title: String,
}
impl Default for Report {
    fn default() -> Self {
        Self {
            language: Language::En,
            title: "".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Storage {
    pub primary_dir: String,
    pub fallback_dir: String,
    pub fallback_enabled: bool,
}
impl Default for Storage {
    fn default() -> Self {
        Self {
            primary_dir: "inspections".into(),
            fallback_dir: ".inspect-grade-local".into(),
            fallback_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Output {
    pub pretty_json: bool,
}
impl Default for Output {
    fn default() -> Self {
        Self { pretty_json: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "warn".into(),
            json: false,
            write_to_file: false,
            file_path: "".into(),
        }
    }
}
