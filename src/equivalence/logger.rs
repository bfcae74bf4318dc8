use super::check::{Check, CheckResult, check_int_equal, check_multiple};
use super::sensor::gain_against_blockette;
use super::view::{ResponseView, StageView};
use super::{EquivalenceResult, StageAlignment};
use crate::error::RespResult;
use crate::resp::{Blockette, COEFFICIENTS, DECIMATION, GAIN, find_blockette, last_stage};

/// Library datalogger files place the analog to digital converter at
/// stage 3, after the sensor (1) and the preamplifier (2). This is a
/// convention of the library, not something derived from the file.
pub const LIBRARY_ADC_STAGE: i64 = 3;

/// Preamplifier stage of library datalogger files
pub const LIBRARY_PREAMP_STAGE: i64 = LIBRARY_ADC_STAGE - 1;

fn column(blockette: &Blockette, field: &str, row: usize) -> Option<f64> {
    blockette.rows(field).get(row).and_then(|r| r.column(1))
}

/// Stage decimation against blockette 057
fn decimation_against_blockette(stage: &StageView, b57: &Blockette) -> CheckResult {
    let Some(decimation) = &stage.decimation else {
        return CheckResult::mismatch(format!(
            "no Decimation in stage {} to match blockette {}",
            stage.number,
            b57.kind()
        ));
    };
    check_multiple([
        Check::float("Input Samp Rate", decimation.input_sample_rate, b57.number("04")),
        Check::int("Factor", decimation.factor, b57.integer("05")),
    ])
}

/// Stage coefficients against blockette 054
fn coefficients_against_blockette(stage: &StageView, b54: &Blockette) -> CheckResult {
    let Some(coefficients) = &stage.coefficients else {
        return CheckResult::mismatch(format!(
            "no Coefficients in stage {} to match blockette {}",
            stage.number,
            b54.kind()
        ));
    };

    let result = check_multiple([
        Check::int(
            "Num numerators",
            Some(coefficients.numerators.len() as i64),
            b54.integer("07"),
        ),
        Check::int(
            "Num denominators",
            Some(coefficients.denominators.len() as i64),
            b54.integer("10"),
        ),
    ]);
    if !result.matched {
        return result;
    }

    let numerators = coefficients
        .numerators
        .iter()
        .enumerate()
        .map(|(i, v)| Check::float(format!("{} numerator", i), *v, column(b54, "08-09", i)));
    let denominators = coefficients
        .denominators
        .iter()
        .enumerate()
        .map(|(i, v)| Check::float(format!("{} denominator", i), *v, column(b54, "11-12", i)));
    check_multiple(numerators.chain(denominators))
}

/// Stage number of the analog to digital converter in the response: the
/// first coefficients stage taking volts to counts, or 0 when there is none
fn find_adc_stage(response: &ResponseView) -> i64 {
    response
        .stages
        .iter()
        .find(|s| {
            s.coefficients
                .as_ref()
                .is_some_and(|c| c.is_analog_to_digital())
        })
        .map(|s| s.number)
        .unwrap_or(0)
}

/// Compare the datalogger part of a response with a library datalogger file.
///
/// The stage counts after the converter must agree before any values are
/// compared. The preamplifier is compared by gain only; from the converter
/// on, gain, decimation and coefficients are compared stage by stage until
/// the library runs out of gain blockettes. On success the alignment holds
/// the preamplifier stage on both sides and the last library stage.
pub fn are_similar_logger(
    response: &ResponseView,
    library: &[Blockette],
) -> RespResult<EquivalenceResult> {
    if response.is_empty() {
        return Ok(EquivalenceResult::mismatch("no Stage in staxml"));
    }

    let adc_stage = find_adc_stage(response);
    let Some(library_last) = last_stage(library)? else {
        return Ok(EquivalenceResult::mismatch("no staged blockettes in resp"));
    };

    let result = check_int_equal(
        "num logger stages",
        response.len() as i64 - adc_stage,
        library_last - LIBRARY_ADC_STAGE,
    );
    if !result.matched {
        return Ok(EquivalenceResult::new(result, None));
    }

    let preamp_stage = adc_stage - 1;
    let Some(b58) = find_blockette(library, LIBRARY_PREAMP_STAGE, GAIN)? else {
        return Ok(EquivalenceResult::mismatch(format!(
            "Can't find b58 for preamp stage {}",
            LIBRARY_PREAMP_STAGE
        )));
    };
    let result = match response.stage(preamp_stage) {
        Some(stage) => gain_against_blockette(stage, b58),
        None => CheckResult::mismatch(format!("no stage {} in staxml", preamp_stage)),
    };
    if !result.matched {
        let result = result.context(format!("preamp stage {}: ", LIBRARY_PREAMP_STAGE));
        return Ok(EquivalenceResult::new(result, None));
    }

    let mut library_stage = LIBRARY_ADC_STAGE;
    let mut document_stage = adc_stage;
    let mut next_gain = find_blockette(library, library_stage, GAIN)?;
    if next_gain.is_none() {
        return Ok(EquivalenceResult::mismatch(format!(
            "stage {} blockette58 not found",
            library_stage
        )));
    }

    while let Some(b58) = next_gain {
        let Some(stage) = response.stage(document_stage) else {
            return Ok(EquivalenceResult::mismatch(format!(
                "more stages in resp than in staxml {} > {}",
                library_stage,
                response.len()
            )));
        };

        let result = gain_against_blockette(stage, b58);
        if !result.matched {
            return Ok(EquivalenceResult::new(
                result.context(format!("stage {}: ", document_stage)),
                None,
            ));
        }

        let Some(b57) = find_blockette(library, library_stage, DECIMATION)? else {
            return Ok(EquivalenceResult::mismatch(format!(
                "Can't find b57 for stage {}",
                library_stage
            )));
        };
        let result = decimation_against_blockette(stage, b57);
        if !result.matched {
            return Ok(EquivalenceResult::new(
                result.context(format!("stage {}: ", library_stage)),
                None,
            ));
        }

        if let Some(b54) = find_blockette(library, library_stage, COEFFICIENTS)? {
            let result = coefficients_against_blockette(stage, b54);
            if !result.matched {
                return Ok(EquivalenceResult::new(
                    result.context(format!("stage {}: ", library_stage)),
                    None,
                ));
            }
        }

        library_stage += 1;
        document_stage += 1;
        next_gain = find_blockette(library, library_stage, GAIN)?;
    }

    let consumed = document_stage - 1;
    if response.len() as i64 > consumed {
        return Ok(EquivalenceResult::mismatch(format!(
            "more stages in staxml than in resp {} > {}",
            response.len(),
            consumed
        )));
    }

    Ok(EquivalenceResult::new(
        CheckResult::ok(),
        Some(StageAlignment {
            document_stage: preamp_stage,
            library_stage: LIBRARY_PREAMP_STAGE,
            library_last_stage: Some(library_stage - 1),
        }),
    ))
}
