//! Primitive comparisons. A mismatch is an ordinary value, never an error.

use serde::Serialize;

/// Relative tolerance used by every numeric comparison (0.1%)
pub const DEFAULT_TOLERANCE: f64 = 0.001;

/// Outcome of one comparison
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    pub matched: bool,
    pub reason: String,
}

impl CheckResult {
    pub fn ok() -> Self {
        Self {
            matched: true,
            reason: "ok".to_string(),
        }
    }

    pub fn mismatch(reason: impl Into<String>) -> Self {
        Self {
            matched: false,
            reason: reason.into(),
        }
    }

    pub fn is_match(&self) -> bool {
        self.matched
    }

    /// Prefix the reason of a mismatch with where it happened
    pub fn context(self, prefix: impl std::fmt::Display) -> Self {
        if self.matched {
            self
        } else {
            Self::mismatch(format!("{}{}", prefix, self.reason))
        }
    }
}

/// Relative comparison against `a`: `|a - b| / |a| < tolerance`.
///
/// When `a` is zero, `b` must be exactly zero. The comparison is not
/// symmetric in `a` and `b`.
pub fn check_float_equal(label: &str, a: f64, b: f64, tolerance: f64) -> CheckResult {
    let matched = if a == 0.0 {
        b == 0.0
    } else {
        ((a - b) / a).abs() < tolerance
    };
    if matched {
        CheckResult::ok()
    } else {
        CheckResult::mismatch(format!(
            "{} {:.6} != {:.6} (tol % {:.6})",
            label, a, b, tolerance
        ))
    }
}

pub fn check_int_equal(label: &str, a: i64, b: i64) -> CheckResult {
    if a == b {
        CheckResult::ok()
    } else {
        CheckResult::mismatch(format!("{}: {}!={}", label, a, b))
    }
}

pub fn check_string_equal(label: &str, a: &str, b: &str) -> CheckResult {
    if a == b {
        CheckResult::ok()
    } else {
        CheckResult::mismatch(format!("{} : '{}' != '{}'", label, a, b))
    }
}

/// A deferred comparison; values missing on either side fail the check
#[derive(Debug, Clone, PartialEq)]
pub enum Check {
    Float {
        label: String,
        a: Option<f64>,
        b: Option<f64>,
        tolerance: f64,
    },
    Int {
        label: String,
        a: Option<i64>,
        b: Option<i64>,
    },
    Text {
        label: String,
        a: Option<String>,
        b: Option<String>,
    },
}

impl Check {
    /// Float check at [`DEFAULT_TOLERANCE`]
    pub fn float(label: impl Into<String>, a: Option<f64>, b: Option<f64>) -> Self {
        Check::Float {
            label: label.into(),
            a,
            b,
            tolerance: DEFAULT_TOLERANCE,
        }
    }

    pub fn int(label: impl Into<String>, a: Option<i64>, b: Option<i64>) -> Self {
        Check::Int {
            label: label.into(),
            a,
            b,
        }
    }

    /// Count comparison; lengths are always known
    pub fn count(label: impl Into<String>, a: usize, b: usize) -> Self {
        Check::int(label, Some(a as i64), Some(b as i64))
    }

    pub fn text(label: impl Into<String>, a: Option<&str>, b: Option<&str>) -> Self {
        Check::Text {
            label: label.into(),
            a: a.map(str::to_string),
            b: b.map(str::to_string),
        }
    }

    pub fn evaluate(&self) -> CheckResult {
        match self {
            Check::Float {
                label,
                a,
                b,
                tolerance,
            } => match (a, b) {
                (Some(a), Some(b)) => check_float_equal(label, *a, *b, *tolerance),
                _ => missing(label, a.is_none()),
            },
            Check::Int { label, a, b } => match (a, b) {
                (Some(a), Some(b)) => check_int_equal(label, *a, *b),
                _ => missing(label, a.is_none()),
            },
            Check::Text { label, a, b } => match (a, b) {
                (Some(a), Some(b)) => check_string_equal(label, a, b),
                _ => missing(label, a.is_none()),
            },
        }
    }
}

fn missing(label: &str, first: bool) -> CheckResult {
    let side = if first { "first" } else { "second" };
    CheckResult::mismatch(format!("{}: value missing on {} side", label, side))
}

/// Evaluate checks in order and stop at the first mismatch
pub fn check_multiple<I>(checks: I) -> CheckResult
where
    I: IntoIterator<Item = Check>,
{
    for check in checks {
        let result = check.evaluate();
        if !result.matched {
            log::trace!("check failed: {}", result.reason);
            return result;
        }
    }
    CheckResult::ok()
}
