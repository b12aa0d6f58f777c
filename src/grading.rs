//! Grade classifier: ordered threshold tables, first match wins.

use crate::error::{GradeError, GradeResult};
use crate::stats::Percentage;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Matches when `pass >= min_pass` and, if set, `fail <= max_fail`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeRule {
    pub min_pass: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_fail: Option<f64>,
    pub grade: String,
}

impl GradeRule {
    fn new(min_pass: f64, max_fail: Option<f64>, grade: &str) -> Self {
        Self {
            min_pass,
            max_fail,
            grade: grade.to_string(),
        }
    }

    pub fn matches(&self, pass: Percentage, fail: Percentage) -> bool {
        pass.value() >= self.min_pass && self.max_fail.is_none_or(|max| fail.value() <= max)
    }
}

/// Rules are listed best grade first. `fallback` is the lowest grade and
/// applies when no rule matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeTable {
    pub name: String,
    pub rules: Vec<GradeRule>,
    pub fallback: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grade {
    pub label: String,
    /// Position in the table, 0 is best. The fallback ranks last.
    pub rank: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum GradePreset {
    /// AAA, AA, A, B, C, D
    #[serde(rename = "sixGrade", alias = "six-grade")]
    SixGrade,
    /// A+, A, B, C, D
    #[serde(rename = "fivePlusGrade", alias = "five-plus-grade")]
    FivePlusGrade,
}

impl GradePreset {
    pub fn name(&self) -> &'static str {
        match self {
            GradePreset::SixGrade => "sixGrade",
            GradePreset::FivePlusGrade => "fivePlusGrade",
        }
    }

    pub fn table(&self) -> GradeTable {
        match self {
            GradePreset::SixGrade => GradeTable {
                name: self.name().into(),
                rules: vec![
                    GradeRule::new(95.0, Some(0.0), "AAA"),
                    GradeRule::new(90.0, Some(2.0), "AA"),
                    GradeRule::new(80.0, Some(5.0), "A"),
                    GradeRule::new(70.0, Some(10.0), "B"),
                    GradeRule::new(60.0, Some(15.0), "C"),
                ],
                fallback: "D".into(),
            },
            GradePreset::FivePlusGrade => GradeTable {
                name: self.name().into(),
                rules: vec![
                    GradeRule::new(95.0, Some(0.0), "A+"),
                    GradeRule::new(85.0, None, "A"),
                    GradeRule::new(75.0, None, "B"),
                    GradeRule::new(65.0, None, "C"),
                ],
                fallback: "D".into(),
            },
        }
    }
}

/// Report layouts carried over from the inspection app. Each one commits
/// to a single grading preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReportVariant {
    Professional,
    Bilingual,
    Minimalist,
    Modern,
}

impl ReportVariant {
    pub fn preset(&self) -> GradePreset {
        match self {
            ReportVariant::Professional | ReportVariant::Bilingual => GradePreset::SixGrade,
            ReportVariant::Minimalist | ReportVariant::Modern => GradePreset::FivePlusGrade,
        }
    }
}

impl GradeTable {
    pub fn classify(&self, pass: Percentage, fail: Percentage) -> Grade {
        self.rules
            .iter()
            .enumerate()
            .find(|(_, r)| r.matches(pass, fail))
            .map(|(rank, r)| Grade {
                label: r.grade.clone(),
                rank,
            })
            .unwrap_or_else(|| Grade {
                label: self.fallback.clone(),
                rank: self.rules.len(),
            })
    }

    /// Unvalidated numbers in; fails fast instead of clamping.
    pub fn classify_raw(&self, pass: f64, fail: f64) -> GradeResult<Grade> {
        let pass = Percentage::new(pass)?;
        let fail = Percentage::new(fail)?;
        Ok(self.classify(pass, fail))
    }

    /// Grade labels best to worst.
    pub fn labels(&self) -> Vec<&str> {
        self.rules
            .iter()
            .map(|r| r.grade.as_str())
            .chain(std::iter::once(self.fallback.as_str()))
            .collect()
    }

    pub fn validate(&self) -> GradeResult<()> {
        let bad = |msg: String| Err(GradeError::InvalidTable(format!("{}: {msg}", self.name)));

        if self.fallback.trim().is_empty() {
            return bad("fallback grade is empty".into());
        }
        let mut seen = HashSet::new();
        for rule in &self.rules {
            if rule.grade.trim().is_empty() {
                return bad("rule with empty grade label".into());
            }
            if Percentage::new(rule.min_pass).is_err() {
                return bad(format!("min_pass {} outside [0, 100]", rule.min_pass));
            }
            if let Some(max) = rule.max_fail {
                if Percentage::new(max).is_err() {
                    return bad(format!("max_fail {max} outside [0, 100]"));
                }
            }
            if !seen.insert(rule.grade.as_str()) {
                return bad(format!("duplicate grade label {}", rule.grade));
            }
        }
        if seen.contains(self.fallback.as_str()) {
            return bad(format!("fallback {} also used by a rule", self.fallback));
        }
        Ok(())
    }
}
