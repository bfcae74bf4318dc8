//! Typed, read-only views of response objects.
//!
//! Views are extracted once per comparison so the checks work on plain
//! values. Absent numbers stay `None` and fail the check that needs them.

use crate::binding::BoundObject;

/// Number held either as a primitive field or as the `ValueOf` of a
/// simple-content child
fn number(obj: &BoundObject, name: &str) -> Option<f64> {
    obj.f64(name)
        .or_else(|| obj.object(name).and_then(BoundObject::value_of))
}

fn numbers(obj: &BoundObject, name: &str) -> Vec<Option<f64>> {
    obj.objects(name).map(BoundObject::value_of).collect()
}

fn unit_name(obj: &BoundObject, name: &str) -> Option<String> {
    obj.object(name)
        .and_then(|u| u.text("Name"))
        .map(str::to_string)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Complex {
    pub real: Option<f64>,
    pub imaginary: Option<f64>,
}

impl Complex {
    fn from_object(obj: &BoundObject) -> Self {
        Self {
            real: number(obj, "Real"),
            imaginary: number(obj, "Imaginary"),
        }
    }
}

/// Units shared by every filter shape
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterUnits {
    pub input: Option<String>,
    pub output: Option<String>,
}

impl FilterUnits {
    fn from_object(obj: &BoundObject) -> Self {
        Self {
            input: unit_name(obj, "InputUnits"),
            output: unit_name(obj, "OutputUnits"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PolesZerosView {
    pub units: FilterUnits,
    pub transfer_function_type: Option<String>,
    pub normalization_factor: Option<f64>,
    pub normalization_frequency: Option<f64>,
    pub zeros: Vec<Complex>,
    pub poles: Vec<Complex>,
}

impl PolesZerosView {
    pub fn from_object(obj: &BoundObject) -> Self {
        Self {
            units: FilterUnits::from_object(obj),
            transfer_function_type: obj.text("PzTransferFunctionType").map(str::to_string),
            normalization_factor: number(obj, "NormalizationFactor"),
            normalization_frequency: number(obj, "NormalizationFrequency"),
            zeros: obj.objects("Zero").map(Complex::from_object).collect(),
            poles: obj.objects("Pole").map(Complex::from_object).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CoefficientsView {
    pub units: FilterUnits,
    pub transfer_function_type: Option<String>,
    pub numerators: Vec<Option<f64>>,
    pub denominators: Vec<Option<f64>>,
}

impl CoefficientsView {
    pub fn from_object(obj: &BoundObject) -> Self {
        Self {
            units: FilterUnits::from_object(obj),
            transfer_function_type: obj.text("CfTransferFunctionType").map(str::to_string),
            numerators: numbers(obj, "Numerator"),
            denominators: numbers(obj, "Denominator"),
        }
    }

    /// Volts in, counts out: the analog to digital converter
    pub fn is_analog_to_digital(&self) -> bool {
        let volts = self.units.input.as_deref().is_some_and(|name| {
            ["v", "volt", "volts"]
                .iter()
                .any(|volt| name.eq_ignore_ascii_case(volt))
        });
        let counts = self.units.output.as_deref().is_some_and(|name| {
            name.eq_ignore_ascii_case("count") || name.eq_ignore_ascii_case("counts")
        });
        volts && counts
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FirView {
    pub units: FilterUnits,
    pub symmetry: Option<String>,
    pub coefficients: Vec<Option<f64>>,
}

impl FirView {
    pub fn from_object(obj: &BoundObject) -> Self {
        Self {
            units: FilterUnits::from_object(obj),
            symmetry: obj.text("Symmetry").map(str::to_string),
            coefficients: numbers(obj, "NumeratorCoefficient"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PolynomialView {
    pub units: FilterUnits,
    pub approximation_type: Option<String>,
    pub frequency_lower_bound: Option<f64>,
    pub frequency_upper_bound: Option<f64>,
    pub approximation_lower_bound: Option<f64>,
    pub approximation_upper_bound: Option<f64>,
    pub maximum_error: Option<f64>,
    pub coefficients: Vec<Option<f64>>,
}

impl PolynomialView {
    pub fn from_object(obj: &BoundObject) -> Self {
        Self {
            units: FilterUnits::from_object(obj),
            approximation_type: obj.text("ApproximationType").map(str::to_string),
            frequency_lower_bound: number(obj, "FrequencyLowerBound"),
            frequency_upper_bound: number(obj, "FrequencyUpperBound"),
            approximation_lower_bound: number(obj, "ApproximationLowerBound"),
            approximation_upper_bound: number(obj, "ApproximationUpperBound"),
            maximum_error: number(obj, "MaximumError"),
            coefficients: numbers(obj, "Coefficient"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DecimationView {
    pub input_sample_rate: Option<f64>,
    pub factor: Option<i64>,
    pub offset: Option<i64>,
    pub delay: Option<f64>,
    pub correction: Option<f64>,
}

impl DecimationView {
    pub fn from_object(obj: &BoundObject) -> Self {
        Self {
            input_sample_rate: number(obj, "InputSampleRate"),
            factor: obj.i64("Factor"),
            offset: obj.i64("Offset"),
            delay: number(obj, "Delay"),
            correction: number(obj, "Correction"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GainView {
    pub value: Option<f64>,
    pub frequency: Option<f64>,
}

impl GainView {
    pub fn from_object(obj: &BoundObject) -> Self {
        Self {
            value: number(obj, "Value"),
            frequency: number(obj, "Frequency"),
        }
    }
}

/// Filter shapes a stage may carry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    PolesZeros,
    Coefficients,
    Fir,
    Polynomial,
}

impl ShapeKind {
    pub const ALL: [ShapeKind; 4] = [
        ShapeKind::PolesZeros,
        ShapeKind::Coefficients,
        ShapeKind::Fir,
        ShapeKind::Polynomial,
    ];

    pub fn element(self) -> &'static str {
        match self {
            ShapeKind::PolesZeros => "PolesZeros",
            ShapeKind::Coefficients => "Coefficients",
            ShapeKind::Fir => "FIR",
            ShapeKind::Polynomial => "Polynomial",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct StageView {
    /// The stage's `number` attribute, or its 1-based position
    pub number: i64,
    pub poles_zeros: Option<PolesZerosView>,
    pub coefficients: Option<CoefficientsView>,
    pub fir: Option<FirView>,
    pub polynomial: Option<PolynomialView>,
    pub decimation: Option<DecimationView>,
    pub gain: Option<GainView>,
}

impl StageView {
    /// Read a `ResponseStage`, or a sub-response detail whose gain is
    /// called `Gain`
    pub fn from_object(obj: &BoundObject, position: usize) -> Self {
        let gain = obj.object("StageGain").or_else(|| obj.object("Gain"));
        Self {
            number: obj.i64("number").unwrap_or(position as i64),
            poles_zeros: obj.object("PolesZeros").map(PolesZerosView::from_object),
            coefficients: obj.object("Coefficients").map(CoefficientsView::from_object),
            fir: obj.object("FIR").map(FirView::from_object),
            polynomial: obj.object("Polynomial").map(PolynomialView::from_object),
            decimation: obj.object("Decimation").map(DecimationView::from_object),
            gain: gain.map(GainView::from_object),
        }
    }

    pub fn has_shape(&self, kind: ShapeKind) -> bool {
        match kind {
            ShapeKind::PolesZeros => self.poles_zeros.is_some(),
            ShapeKind::Coefficients => self.coefficients.is_some(),
            ShapeKind::Fir => self.fir.is_some(),
            ShapeKind::Polynomial => self.polynomial.is_some(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResponseView {
    pub stages: Vec<StageView>,
}

impl ResponseView {
    pub fn from_object(response: &BoundObject) -> Self {
        Self {
            stages: response
                .objects("Stage")
                .enumerate()
                .map(|(i, stage)| StageView::from_object(stage, i + 1))
                .collect(),
        }
    }

    /// Stage at 1-based position `n`
    pub fn stage(&self, n: i64) -> Option<&StageView> {
        usize::try_from(n)
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| self.stages.get(i))
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}
