//! Response equivalence: is an inventory response the same as a library
//! RESP file, or the same as another inventory response?
//!
//! Every comparison is fail-fast and reports the first sub-check that
//! differed. A mismatch is a value; errors are reserved for library files
//! that are not valid RESP data.

mod check;
mod logger;
mod response;
mod sensor;
mod view;

use serde::Serialize;

pub use check::{
    Check, CheckResult, DEFAULT_TOLERANCE, check_float_equal, check_int_equal, check_multiple,
    check_string_equal,
};
pub use logger::{LIBRARY_ADC_STAGE, LIBRARY_PREAMP_STAGE, are_similar_logger};
pub use response::{ResponseGroup, are_same_response, are_same_stage, compare_channels, unique_responses};
pub use sensor::are_similar_sensor;
pub use view::{
    CoefficientsView, Complex, DecimationView, FilterUnits, FirView, GainView, PolesZerosView,
    PolynomialView, ResponseView, ShapeKind, StageView,
};

/// Where the compared stage groups start in each pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StageAlignment {
    /// First matched stage in the inventory response
    pub document_stage: i64,
    /// First matched stage in the library file
    pub library_stage: i64,
    /// Last matched library stage, when the group spans several stages
    pub library_last_stage: Option<i64>,
}

/// Outcome of matching an inventory response against a library file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EquivalenceResult {
    pub matched: bool,
    pub reason: String,
    pub alignment: Option<StageAlignment>,
}

impl EquivalenceResult {
    pub fn new(check: CheckResult, alignment: Option<StageAlignment>) -> Self {
        Self {
            matched: check.matched,
            reason: check.reason,
            alignment,
        }
    }

    pub fn mismatch(reason: impl Into<String>) -> Self {
        Self::new(CheckResult::mismatch(reason), None)
    }
}
