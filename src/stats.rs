//! Summary statistics over an inspection's items.

use crate::error::{GradeError, GradeResult};
use crate::model::{InspectionArea, ItemStatus};
use serde::{Deserialize, Serialize};

/// A percentage in `[0, 100]`. Only constructed through [`Percentage::new`]
/// or [`Percentage::of`], so NaN and out-of-range values never reach the
/// grade classifier.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Percentage(f64);

impl Percentage {
    pub const ZERO: Percentage = Percentage(0.0);

    pub fn new(value: f64) -> GradeResult<Self> {
        if !value.is_finite() {
            return Err(GradeError::InvalidInput(format!(
                "percentage must be a finite number, got {value}"
            )));
        }
        if !(0.0..=100.0).contains(&value) {
            return Err(GradeError::InvalidInput(format!(
                "percentage must be within [0, 100], got {value}"
            )));
        }
        Ok(Self(value))
    }

    /// `count / total * 100`; zero when `total` is zero. A count above
    /// the total is an error, not 100%.
    pub fn of(count: u64, total: u64) -> GradeResult<Self> {
        if total == 0 {
            return Ok(Self::ZERO);
        }
        // multiply first so whole ratios like 19/20 come out exact
        Self::new((count as f64 * 100.0) / total as f64)
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Percentage {
    type Error = GradeError;

    fn try_from(value: f64) -> GradeResult<Self> {
        Self::new(value)
    }
}

impl From<Percentage> for f64 {
    fn from(p: Percentage) -> f64 {
        p.0
    }
}

impl std::fmt::Display for Percentage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.fract() == 0.0 {
            write!(f, "{:.0}%", self.0)
        } else {
            write!(f, "{:.1}%", self.0)
        }
    }
}

/// Per-status tally. `total == pass + fail + snags` always holds: every
/// item carries exactly one status. Deserialized tallies are checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SummaryCounts")]
pub struct Summary {
    pub total: u64,
    pub pass: u64,
    pub fail: u64,
    pub snags: u64,
}

#[derive(Deserialize)]
struct SummaryCounts {
    total: u64,
    pass: u64,
    fail: u64,
    snags: u64,
}

impl TryFrom<SummaryCounts> for Summary {
    type Error = GradeError;

    fn try_from(c: SummaryCounts) -> GradeResult<Self> {
        let s = Summary {
            total: c.total,
            pass: c.pass,
            fail: c.fail,
            snags: c.snags,
        };
        s.check()?;
        Ok(s)
    }
}

impl Summary {
    pub fn of(areas: &[InspectionArea]) -> Self {
        areas
            .iter()
            .flat_map(|a| a.items.iter())
            .fold(Summary::default(), |mut s, item| {
                s.record(item.status);
                s
            })
    }

    /// Builds a tally from externally supplied counts. Negative counts are
    /// rejected rather than clamped.
    pub fn try_from_counts(pass: i64, fail: i64, snags: i64) -> GradeResult<Self> {
        let check = |name: &str, v: i64| -> GradeResult<u64> {
            u64::try_from(v)
                .map_err(|_| GradeError::InvalidInput(format!("{name} count must be non-negative, got {v}")))
        };
        let pass = check("pass", pass)?;
        let fail = check("fail", fail)?;
        let snags = check("snags", snags)?;
        let total = pass
            .checked_add(fail)
            .and_then(|t| t.checked_add(snags))
            .ok_or_else(|| GradeError::InvalidInput("item counts overflow".into()))?;
        Ok(Self {
            total,
            pass,
            fail,
            snags,
        })
    }

    pub fn record(&mut self, status: ItemStatus) {
        match status {
            ItemStatus::Pass => self.pass += 1,
            ItemStatus::Fail => self.fail += 1,
            ItemStatus::Snags => self.snags += 1,
        }
        self.total += 1;
    }

    /// Fields are public, so the conservation rule is re-checked before
    /// any percentage is derived.
    pub fn check(&self) -> GradeResult<()> {
        let sum = self
            .pass
            .checked_add(self.fail)
            .and_then(|t| t.checked_add(self.snags));
        if sum != Some(self.total) {
            return Err(GradeError::InvalidInput(format!(
                "total {} does not equal pass {} + fail {} + snags {}",
                self.total, self.pass, self.fail, self.snags
            )));
        }
        Ok(())
    }

    pub fn pass_percentage(&self) -> GradeResult<Percentage> {
        self.check()?;
        Percentage::of(self.pass, self.total)
    }

    pub fn fail_percentage(&self) -> GradeResult<Percentage> {
        self.check()?;
        Percentage::of(self.fail, self.total)
    }

    pub fn snags_percentage(&self) -> GradeResult<Percentage> {
        self.check()?;
        Percentage::of(self.snags, self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_rejects_out_of_range() {
        assert!(Percentage::new(-0.1).is_err());
        assert!(Percentage::new(100.01).is_err());
        assert!(Percentage::new(f64::NAN).is_err());
        assert!(Percentage::new(f64::INFINITY).is_err());
        assert_eq!(Percentage::new(100.0).unwrap().value(), 100.0);
    }

    #[test]
    fn zero_total_is_zero_percent() {
        assert_eq!(Percentage::of(0, 0).unwrap(), Percentage::ZERO);
        let s = Summary::default();
        assert_eq!(s.pass_percentage().unwrap().value(), 0.0);
        assert_eq!(s.fail_percentage().unwrap().value(), 0.0);
    }

    #[test]
    fn ratios_are_exact() {
        assert_eq!(Percentage::of(19, 20).unwrap().value(), 95.0);
        assert_eq!(Percentage::of(1, 20).unwrap().value(), 5.0);
    }

    #[test]
    fn negative_counts_rejected() {
        let err = Summary::try_from_counts(3, -1, 0).unwrap_err();
        assert!(matches!(err, GradeError::InvalidInput(_)));
        let s = Summary::try_from_counts(3, 1, 2).unwrap();
        assert_eq!(s.total, 6);
    }

    #[test]
    fn count_above_total_is_rejected() {
        assert!(matches!(Percentage::of(5, 1), Err(GradeError::InvalidInput(_))));
    }

    #[test]
    fn mismatched_summary_rejected_on_deserialize() {
        let err = serde_json::from_str::<Summary>(r#"{"total":1,"pass":5,"fail":3,"snags":0}"#);
        assert!(err.is_err());
        let ok: Summary = serde_json::from_str(r#"{"total":8,"pass":5,"fail":3,"snags":0}"#).unwrap();
        assert_eq!(ok.fail_percentage().unwrap().value(), 37.5);
    }

    #[test]
    fn hand_built_mismatch_fails_loudly() {
        let s = Summary {
            total: 1,
            pass: 5,
            fail: 3,
            snags: 0,
        };
        assert!(matches!(s.pass_percentage(), Err(GradeError::InvalidInput(_))));
        assert!(s.fail_percentage().is_err());
    }

    #[test]
    fn percentage_deserialization_validates() {
        assert!(serde_json::from_str::<Percentage>("50.5").is_ok());
        assert!(serde_json::from_str::<Percentage>("150").is_err());
    }

    #[test]
    fn display_drops_trailing_zero() {
        assert_eq!(Percentage::of(1, 2).unwrap().to_string(), "50%");
        assert_eq!(Percentage::of(1, 3).unwrap().to_string(), "33.3%");
    }
}
