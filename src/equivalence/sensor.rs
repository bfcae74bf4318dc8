use super::check::{Check, CheckResult, check_multiple};
use super::view::{ResponseView, StageView};
use super::{EquivalenceResult, StageAlignment};
use crate::error::RespResult;
use crate::resp::{Blockette, GAIN, POLES_ZEROS, find_blockette};

const SENSOR_STAGE: i64 = 1;

fn column(blockette: &Blockette, field: &str, row: usize, col: usize) -> Option<f64> {
    blockette.rows(field).get(row).and_then(|r| r.column(col))
}

/// Stage poles and zeros against blockette 053
pub(super) fn poles_zeros_against_blockette(stage: &StageView, b53: &Blockette) -> CheckResult {
    let Some(pz) = &stage.poles_zeros else {
        return CheckResult::mismatch(format!(
            "no PolesZeros in stage {} to match blockette {}",
            stage.number,
            b53.kind()
        ));
    };

    let result = check_multiple([
        Check::float("A0 norm factor", pz.normalization_factor, b53.number("07")),
        Check::int("num zeros", Some(pz.zeros.len() as i64), b53.integer("09")),
        Check::int("num poles", Some(pz.poles.len() as i64), b53.integer("14")),
    ]);
    if !result.matched {
        return result;
    }

    let zeros = pz.zeros.iter().enumerate().flat_map(|(i, z)| {
        [
            Check::float(format!("{} zero real", i), z.real, column(b53, "10-13", i, 1)),
            Check::float(format!("{} zero imag", i), z.imaginary, column(b53, "10-13", i, 2)),
        ]
    });
    let poles = pz.poles.iter().enumerate().flat_map(|(i, p)| {
        [
            Check::float(format!("{} pole real", i), p.real, column(b53, "15-18", i, 1)),
            Check::float(format!("{} pole imag", i), p.imaginary, column(b53, "15-18", i, 2)),
        ]
    });
    check_multiple(zeros.chain(poles))
}

/// Stage gain against blockette 058; the frequency field carries a unit
pub(super) fn gain_against_blockette(stage: &StageView, b58: &Blockette) -> CheckResult {
    let Some(gain) = &stage.gain else {
        return CheckResult::mismatch(format!(
            "no StageGain in stage {} to match blockette {}",
            stage.number,
            b58.kind()
        ));
    };
    check_multiple([
        Check::float("Gain Value", gain.value, b58.number("04")),
        Check::float("Gain Frequency", gain.frequency, b58.leading_number("05")),
    ])
}

/// Compare stage 1 of a response with the sensor stage of a library file.
///
/// The alignment is always stage 1 on both sides.
pub fn are_similar_sensor(
    response: &ResponseView,
    library: &[Blockette],
) -> RespResult<EquivalenceResult> {
    let Some(stage) = response.stage(SENSOR_STAGE) else {
        return Ok(EquivalenceResult::mismatch("no Stage in staxml"));
    };
    let alignment = Some(StageAlignment {
        document_stage: SENSOR_STAGE,
        library_stage: SENSOR_STAGE,
        library_last_stage: None,
    });

    let result = match find_blockette(library, SENSOR_STAGE, POLES_ZEROS)? {
        Some(b53) => poles_zeros_against_blockette(stage, b53),
        None => CheckResult::mismatch("blockette53 not found"),
    };
    if !result.matched {
        return Ok(EquivalenceResult::new(result, alignment));
    }

    let result = match find_blockette(library, SENSOR_STAGE, GAIN)? {
        Some(b58) => gain_against_blockette(stage, b58),
        None => CheckResult::mismatch("blockette58 not found"),
    };
    Ok(EquivalenceResult::new(result, alignment))
}
