use serde::Serialize;

use super::check::{Check, CheckResult, check_int_equal, check_multiple};
use super::view::{
    CoefficientsView, DecimationView, FirView, GainView, PolesZerosView, PolynomialView,
    ResponseView, ShapeKind, StageView,
};
use crate::binding::{BoundObject, channels, find_channel};
use crate::diagnostics::Diagnostics;
use crate::error::{NrlError, Result};

const TARGET: &str = "equivalence";

fn same_poles_zeros(a: &PolesZerosView, b: &PolesZerosView) -> CheckResult {
    let result = check_multiple([
        Check::text(
            "PzTransferFunctionType",
            a.transfer_function_type.as_deref(),
            b.transfer_function_type.as_deref(),
        ),
        Check::float("NormalizationFactor", a.normalization_factor, b.normalization_factor),
        Check::float(
            "NormalizationFrequency",
            a.normalization_frequency,
            b.normalization_frequency,
        ),
        Check::count("zero len", a.zeros.len(), b.zeros.len()),
        Check::count("pole len", a.poles.len(), b.poles.len()),
    ]);
    if !result.matched {
        return result;
    }

    let zeros = a.zeros.iter().zip(&b.zeros).enumerate().flat_map(|(i, (za, zb))| {
        [
            Check::float(format!("{} zero real", i), za.real, zb.real),
            Check::float(format!("{} zero imag", i), za.imaginary, zb.imaginary),
        ]
    });
    let poles = a.poles.iter().zip(&b.poles).enumerate().flat_map(|(i, (pa, pb))| {
        [
            Check::float(format!("{} pole real", i), pa.real, pb.real),
            Check::float(format!("{} pole imag", i), pa.imaginary, pb.imaginary),
        ]
    });
    check_multiple(zeros.chain(poles))
}

fn pairwise(label: &str, a: &[Option<f64>], b: &[Option<f64>]) -> Vec<Check> {
    a.iter()
        .zip(b)
        .enumerate()
        .map(|(i, (x, y))| Check::float(format!("{} {}", i, label), *x, *y))
        .collect()
}

fn same_coefficients(a: &CoefficientsView, b: &CoefficientsView) -> CheckResult {
    let result = check_multiple([
        Check::text(
            "CfTransferFunctionType",
            a.transfer_function_type.as_deref(),
            b.transfer_function_type.as_deref(),
        ),
        Check::count("numerator len", a.numerators.len(), b.numerators.len()),
        Check::count("denominator len", a.denominators.len(), b.denominators.len()),
    ]);
    if !result.matched {
        return result;
    }
    check_multiple(
        pairwise("numerator", &a.numerators, &b.numerators)
            .into_iter()
            .chain(pairwise("denominator", &a.denominators, &b.denominators)),
    )
}

fn same_fir(a: &FirView, b: &FirView) -> CheckResult {
    let result = check_multiple([
        Check::text("Symmetry", a.symmetry.as_deref(), b.symmetry.as_deref()),
        Check::count(
            "len NumeratorCoefficient",
            a.coefficients.len(),
            b.coefficients.len(),
        ),
    ]);
    if !result.matched {
        return result;
    }
    check_multiple(pairwise(
        "NumeratorCoefficient",
        &a.coefficients,
        &b.coefficients,
    ))
}

/// Polynomials compare like poles and zeros: scalar parameters first, then
/// the ordered coefficients pairwise
fn same_polynomial(a: &PolynomialView, b: &PolynomialView) -> CheckResult {
    let result = check_multiple([
        Check::text(
            "ApproximationType",
            a.approximation_type.as_deref(),
            b.approximation_type.as_deref(),
        ),
        Check::float("FrequencyLowerBound", a.frequency_lower_bound, b.frequency_lower_bound),
        Check::float("FrequencyUpperBound", a.frequency_upper_bound, b.frequency_upper_bound),
        Check::float(
            "ApproximationLowerBound",
            a.approximation_lower_bound,
            b.approximation_lower_bound,
        ),
        Check::float(
            "ApproximationUpperBound",
            a.approximation_upper_bound,
            b.approximation_upper_bound,
        ),
        Check::float("MaximumError", a.maximum_error, b.maximum_error),
        Check::count("coefficient len", a.coefficients.len(), b.coefficients.len()),
    ]);
    if !result.matched {
        return result;
    }
    check_multiple(pairwise("coefficient", &a.coefficients, &b.coefficients))
}

fn same_decimation(a: Option<&DecimationView>, b: Option<&DecimationView>) -> CheckResult {
    match (a, b) {
        (None, None) => CheckResult::ok(),
        (Some(a), Some(b)) => check_multiple([
            Check::float("InputSampleRate", a.input_sample_rate, b.input_sample_rate),
            Check::int("Factor", a.factor, b.factor),
            Check::int("Offset", a.offset, b.offset),
            Check::float("Delay", a.delay, b.delay),
            Check::float("Correction", a.correction, b.correction),
        ]),
        (a, b) => CheckResult::mismatch(format!(
            "Decimation present {} {}",
            a.is_some(),
            b.is_some()
        )),
    }
}

fn same_gain(a: Option<&GainView>, b: Option<&GainView>) -> CheckResult {
    match (a, b) {
        (None, None) => CheckResult::ok(),
        (Some(a), Some(b)) => check_multiple([
            Check::float("Gain Value", a.value, b.value),
            Check::float("Gain Frequency", a.frequency, b.frequency),
        ]),
        (a, b) => CheckResult::mismatch(format!(
            "StageGain present {} {}",
            a.is_some(),
            b.is_some()
        )),
    }
}

/// Compare two stages: the same filter shapes must be present on both
/// sides, then shape parameters, decimation and gain are compared
pub fn are_same_stage(a: &StageView, b: &StageView) -> CheckResult {
    for kind in ShapeKind::ALL {
        let (in_a, in_b) = (a.has_shape(kind), b.has_shape(kind));
        if in_a != in_b {
            return CheckResult::mismatch(format!(
                "Not same stage type: {}, {} {}",
                kind.element(),
                in_a,
                in_b
            ));
        }
    }

    let result = match (a, b) {
        (
            StageView {
                poles_zeros: Some(pa),
                ..
            },
            StageView {
                poles_zeros: Some(pb),
                ..
            },
        ) => same_poles_zeros(pa, pb),
        (
            StageView {
                coefficients: Some(ca),
                ..
            },
            StageView {
                coefficients: Some(cb),
                ..
            },
        ) => same_coefficients(ca, cb),
        (StageView { fir: Some(fa), .. }, StageView { fir: Some(fb), .. }) => same_fir(fa, fb),
        (
            StageView {
                polynomial: Some(pa),
                ..
            },
            StageView {
                polynomial: Some(pb),
                ..
            },
        ) => same_polynomial(pa, pb),
        // gain-only stages
        _ => CheckResult::ok(),
    };
    if !result.matched {
        return result;
    }

    let result = same_decimation(a.decimation.as_ref(), b.decimation.as_ref());
    if !result.matched {
        return result;
    }
    same_gain(a.gain.as_ref(), b.gain.as_ref())
}

/// Compare two complete responses stage by stage
pub fn are_same_response(a: &ResponseView, b: &ResponseView) -> CheckResult {
    let result = check_int_equal("num stages", a.len() as i64, b.len() as i64);
    if !result.matched {
        return result;
    }
    for (i, (sa, sb)) in a.stages.iter().zip(&b.stages).enumerate() {
        let result = are_same_stage(sa, sb);
        if !result.matched {
            return result.context(format!("Stage {} ", i + 1));
        }
    }
    CheckResult::ok()
}

/// Channels sharing one response
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseGroup {
    /// Key of the first channel seen with this response
    pub representative: String,
    pub channels: Vec<String>,
}

/// Group the channels of a document by equivalent response, in document
/// order. Channels without a response are reported and left out.
pub fn unique_responses(root: &BoundObject, diagnostics: &dyn Diagnostics) -> Vec<ResponseGroup> {
    let mut groups: Vec<(ResponseGroup, ResponseView)> = Vec::new();

    for channel in channels(root) {
        let key = channel.key();
        let Some(response) = channel.response() else {
            diagnostics.warn(TARGET, &format!("{} has no Response, skipping", key));
            continue;
        };
        let view = ResponseView::from_object(response);
        diagnostics.debug(TARGET, &format!("{} numStage = {}", key, view.len()));

        match groups
            .iter_mut()
            .find(|(_, known)| are_same_response(&view, known).matched)
        {
            Some((group, _)) => {
                diagnostics.debug(
                    TARGET,
                    &format!("found match {} {}", key, group.representative),
                );
                group.channels.push(key);
            }
            None => groups.push((
                ResponseGroup {
                    representative: key.clone(),
                    channels: vec![key],
                },
                view,
            )),
        }
    }

    groups.into_iter().map(|(group, _)| group).collect()
}

/// Compare the responses of two channels of a document
pub fn compare_channels(root: &BoundObject, key_a: &str, key_b: &str) -> Result<CheckResult> {
    let lookup = |key: &str| {
        find_channel(root, key).ok_or_else(|| NrlError::ChannelNotFound {
            key: key.to_string(),
        })
    };
    let (a, b) = (lookup(key_a)?, lookup(key_b)?);

    let view = |key: &str, response: Option<&BoundObject>| match response {
        Some(r) => Ok(ResponseView::from_object(r)),
        None => Err(CheckResult::mismatch(format!("{} has no Response", key))),
    };
    match (view(key_a, a.response()), view(key_b, b.response())) {
        (Ok(ra), Ok(rb)) => Ok(are_same_response(&ra, &rb)),
        (Err(missing), _) | (_, Err(missing)) => Ok(missing),
    }
}
