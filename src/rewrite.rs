//! In-place rewrites of inventory responses.
//!
//! [`link_library_responses`] replaces responses that matched the reference
//! library with references to the library files. [`add_unity_responses`]
//! gives state-of-health channels a minimal response so the document
//! validates.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::binding::{BoundObject, Dialect, require_dialect, visit_channels_mut};
use crate::casting::Value;
use crate::diagnostics::Diagnostics;
use crate::error::BindingResult;
use crate::library::{LibraryLayout, LibraryMatch, MatchReport};
use crate::schema::{self, FieldSpec, TypeId};

const TARGET: &str = "rewrite";

/// Public location of the reference library
pub const DEFAULT_URL_PREFIX: &str = "http://ds.iris.edu/NRL";

/// Sequence number of the sensor sub-response
pub const SENSOR_SEQUENCE: i64 = 1;
/// Sequence number of the datalogger sub-response
pub const LOGGER_SEQUENCE: i64 = 2;

/// Per-channel description of what a rewrite did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RewriteSummary {
    pub count: usize,
    pub changes: BTreeMap<String, String>,
}

impl RewriteSummary {
    fn record(&mut self, key: &str, change: impl Into<String>) {
        self.count += 1;
        self.changes.insert(key.to_string(), change.into());
    }
}

/// Type a field of `owner` holds
fn field_type(owner: TypeId, name: &str) -> Option<TypeId> {
    schema::node(owner).field(name).and_then(FieldSpec::nested_type)
}

fn library_url(layout: &LibraryLayout, url_prefix: &str, m: &LibraryMatch) -> String {
    format!(
        "{}/{}",
        url_prefix.trim_end_matches('/'),
        layout.relative(&m.path)
    )
}

fn resp_file_sub_response(
    sequence: i64,
    stage_from: i64,
    stage_to: i64,
    url: String,
) -> BindingResult<BoundObject> {
    let resp_file = BoundObject::new(TypeId::RespFile)
        .with("stageFrom", Value::Integer(stage_from))?
        .with("stageTo", Value::Integer(stage_to))?
        .with("ValueOf", Value::Text(url))?;
    BoundObject::new(TypeId::SubResponse)
        .with("sequenceNumber", Value::Integer(sequence))?
        .with("RESPFile", resp_file)
}

fn first_match<'a>(
    matches: &'a BTreeMap<String, Vec<LibraryMatch>>,
    key: &str,
    what: &str,
    diagnostics: &dyn Diagnostics,
) -> Option<&'a LibraryMatch> {
    let found = matches.get(key)?;
    if found.len() > 1 {
        diagnostics.warn(
            TARGET,
            &format!("{} has more than one matching {}, using first", key, what),
        );
    }
    found.first()
}

/// Replace the response of every matched channel by references to the
/// library: the sensor file for stage 1 and the datalogger file from its
/// preamplifier stage on. The instrument sensitivity is kept.
pub fn link_library_responses(
    root: &mut BoundObject,
    report: &MatchReport,
    layout: &LibraryLayout,
    url_prefix: &str,
    diagnostics: &dyn Diagnostics,
) -> BindingResult<RewriteSummary> {
    require_dialect(root, Dialect::Ext)?;
    let mut summary = RewriteSummary::default();
    let mut failure = None;

    visit_channels_mut(root, |key, channel| {
        if failure.is_some() || !channel.has("Response") {
            return;
        }
        let sensor = first_match(&report.sensor, key, "sensor", diagnostics);
        let logger = first_match(&report.logger, key, "logger", diagnostics);
        if sensor.is_none() && logger.is_none() {
            return;
        }

        let linked = (|| -> BindingResult<()> {
            let mut response = BoundObject::new(TypeId::SisResponse);
            if let Some(sensitivity) = channel
                .object("Response")
                .and_then(|r| r.object("InstrumentSensitivity"))
            {
                response.set("InstrumentSensitivity", sensitivity.clone())?;
            }
            if let Some(m) = sensor {
                let url = library_url(layout, url_prefix, m);
                response.push(
                    "SubResponse",
                    resp_file_sub_response(SENSOR_SEQUENCE, 1, 1, url)?,
                )?;
            }
            if let Some(m) = logger {
                let url = library_url(layout, url_prefix, m);
                response.push(
                    "SubResponse",
                    resp_file_sub_response(LOGGER_SEQUENCE, m.alignment.library_stage, -1, url)?,
                )?;
            }
            channel.set("Response", response)
        })();

        match linked {
            Ok(()) => {
                let parts = match (sensor.is_some(), logger.is_some()) {
                    (true, true) => "sensor and logger",
                    (true, false) => "sensor",
                    _ => "logger",
                };
                summary.record(key, format!("linked {}", parts));
            }
            Err(e) => failure = Some(e),
        }
    });

    match failure {
        Some(e) => Err(e),
        None => {
            log::info!("linked {} responses to the library", summary.count);
            Ok(summary)
        }
    }
}

/// Read `CHAN,CHAN unit` lines into a channel code to unit name map.
/// Lines with fewer than two words are reported and skipped.
pub fn parse_input_units(text: &str) -> BTreeMap<String, String> {
    let mut units = BTreeMap::new();
    for (i, line) in text.lines().enumerate() {
        let mut words = line.split_whitespace();
        let (Some(codes), Some(unit)) = (words.next(), words.next()) else {
            if !line.trim().is_empty() {
                log::warn!("ignoring input units line {}: {}", i + 1, line);
            }
            continue;
        };
        for code in codes.split(',').filter(|c| !c.is_empty()) {
            units.insert(code.to_string(), unit.to_string());
        }
    }
    units
}

/// Input units of an existing response: instrument polynomial, then
/// instrument sensitivity, then the filter of the first stage
fn response_input_units(response: &BoundObject) -> Option<BoundObject> {
    if let Some(poly) = response.object("InstrumentPolynomial") {
        return poly.object("InputUnits").cloned();
    }
    if let Some(sensitivity) = response.object("InstrumentSensitivity") {
        return sensitivity.object("InputUnits").cloned();
    }
    let stage = response.objects("Stage").next()?;
    ["PolesZeros", "Coefficients", "FIR", "Polynomial"]
        .iter()
        .find_map(|shape| stage.object(shape))
        .and_then(|filter| filter.object("InputUnits"))
        .cloned()
}

fn units(name: &str) -> BindingResult<BoundObject> {
    BoundObject::new(TypeId::Units).with("Name", Value::from(name))
}

/// Bind a polynomial to the type `target` expects, filling the extension
/// namespace from the network code when the target requires one
fn convert_polynomial(poly: &BoundObject, target: TypeId, network: &str) -> BindingResult<BoundObject> {
    let mut converted = poly.retyped(target);
    if converted.schema().attribute("SISNamespace").is_some() && !converted.has("SISNamespace") {
        converted.set("SISNamespace", Value::from(network))?;
    }
    Ok(converted)
}

fn unity_stage(
    input_units: &BoundObject,
    sample_rate: Option<f64>,
) -> BindingResult<BoundObject> {
    let coefficients = BoundObject::new(TypeId::Coefficients)
        .with("InputUnits", input_units.clone())?
        .with("OutputUnits", units("count")?)?
        .with("CfTransferFunctionType", Value::from("DIGITAL"))?;
    let gain = BoundObject::new(TypeId::Gain)
        .with("Value", Value::Double(1.0))?
        .with("Frequency", Value::Double(0.0))?;
    let mut stage = BoundObject::new(TypeId::ResponseStage)
        .with("number", Value::Integer(1))?
        .with("Coefficients", coefficients)?;
    // Decimation needs an input rate; without one the stage is left undecimated
    if let Some(rate) = sample_rate {
        let decimation = BoundObject::new(TypeId::Decimation)
            .with(
                "InputSampleRate",
                BoundObject::new(TypeId::Frequency).with("ValueOf", Value::Double(rate))?,
            )?
            .with("Factor", Value::Integer(1))?
            .with("Offset", Value::Integer(0))?
            .with("Delay", Value::Double(0.0))?
            .with("Correction", Value::Double(0.0))?;
        stage.set("Decimation", decimation)?;
    }
    stage.with("StageGain", gain)
}

/// Rewrite one response; returns the change made, if any
fn make_unity_response(
    channel: &mut BoundObject,
    input_units: &BoundObject,
    network: &str,
) -> BindingResult<Option<&'static str>> {
    let sample_rate = channel.object("SampleRate").and_then(BoundObject::value_of);
    if !channel.has("Response") {
        let Some(response_type) = field_type(channel.type_id(), "Response") else {
            return Ok(None);
        };
        channel.set("Response", BoundObject::new(response_type))?;
    }
    let Some(response) = channel.object_mut("Response") else {
        return Ok(None);
    };
    let stage_count = response.objects("Stage").count();

    if let Some(poly) = response.object("InstrumentPolynomial") {
        if stage_count > 0 {
            return Ok(None);
        }
        let Some(poly_type) = field_type(TypeId::ResponseStage, "Polynomial") else {
            return Ok(None);
        };
        let poly = convert_polynomial(poly, poly_type, network)?;
        let stage = BoundObject::new(TypeId::ResponseStage)
            .with("number", Value::Integer(1))?
            .with("Polynomial", poly)?;
        response.push("Stage", stage)?;
        return Ok(Some("copy InstPolynomial to Stage"));
    }

    if !response.has("InstrumentSensitivity") && stage_count > 0 {
        if stage_count != 1 {
            return Ok(None);
        }
        let Some(poly) = response
            .objects("Stage")
            .next()
            .and_then(|s| s.object("Polynomial"))
            .cloned()
        else {
            return Ok(None);
        };
        let coefficients: Vec<Option<f64>> =
            poly.objects("Coefficient").map(BoundObject::value_of).collect();

        // linear with no offset: the slope gives the sensitivity
        if let (Some(Some(c0)), Some(Some(c1))) = (coefficients.first(), coefficients.get(1))
            && *c0 == 0.0
            && *c1 != 0.0
        {
            let mut sensitivity = BoundObject::new(TypeId::Sensitivity)
                .with("Value", Value::Double(1.0 / c1))?
                .with("InputUnits", input_units.clone())?;
            if let Some(output) = poly.object("OutputUnits") {
                sensitivity.set("OutputUnits", output.clone())?;
            }
            response.set("InstrumentSensitivity", sensitivity)?;
            return Ok(Some("sensitivity from polynomial stage"));
        }

        let Some(poly_type) = field_type(response.type_id(), "InstrumentPolynomial") else {
            return Ok(None);
        };
        let poly = convert_polynomial(&poly, poly_type, network)?;
        response.set("InstrumentPolynomial", poly)?;
        return Ok(Some("inst polynomial from polynomial stage"));
    }

    let mut sensitivity = response
        .object("InstrumentSensitivity")
        .cloned()
        .unwrap_or_else(|| BoundObject::new(TypeId::Sensitivity));
    if !sensitivity.has("Value") {
        sensitivity.set("Value", Value::Double(1.0))?;
    }
    if !sensitivity.has("Frequency") {
        sensitivity.set("Frequency", Value::Double(0.0))?;
    }
    if !sensitivity.has("InputUnits") {
        sensitivity.set("InputUnits", input_units.clone())?;
    }
    if !sensitivity.has("OutputUnits") {
        sensitivity.set("OutputUnits", units("count")?)?;
    }
    response.set("InstrumentSensitivity", sensitivity)?;

    if stage_count > 0 {
        return Ok(None);
    }
    response.push("Stage", unity_stage(input_units, sample_rate)?)?;
    Ok(Some("unity Stage"))
}

/// Give every channel lacking a usable response a unity response. Input
/// units come from the existing response or, failing that, from
/// `input_units` keyed by channel code; channels with neither are skipped
/// with a warning.
pub fn add_unity_responses(
    root: &mut BoundObject,
    input_units: &BTreeMap<String, String>,
    diagnostics: &dyn Diagnostics,
) -> BindingResult<RewriteSummary> {
    let mut summary = RewriteSummary::default();
    let mut failure = None;

    visit_channels_mut(root, |key, channel| {
        if failure.is_some() {
            return;
        }
        let code = channel.text("code").unwrap_or("").to_string();
        let network = key.split('.').next().unwrap_or("").to_string();

        let from_response = channel.object("Response").and_then(response_input_units);
        let found = match from_response {
            Some(u) => Ok(u),
            None => match input_units.get(&code) {
                Some(name) => units(name),
                None => {
                    diagnostics.warn(TARGET, &format!("{}: No input units", key));
                    summary.changes.insert(key.to_string(), "WARN: No input units".to_string());
                    return;
                }
            },
        };

        match found.and_then(|u| make_unity_response(channel, &u, &network)) {
            Ok(Some(change)) => {
                diagnostics.debug(TARGET, &format!("{} => {}", key, change));
                summary.record(key, change);
            }
            Ok(None) => {}
            Err(e) => failure = Some(e),
        }
    });

    match failure {
        Some(e) => Err(e),
        None => {
            log::info!("added {} unity responses", summary.count);
            Ok(summary)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{channels, find_channel, validate};
    use crate::diagnostics::RecordingDiagnostics;
    use crate::equivalence::StageAlignment;
    use std::path::PathBuf;

    fn channel(code: &str, rate: Option<f64>) -> BoundObject {
        let coord = |id: TypeId, v: f64| BoundObject::new(id).with("ValueOf", Value::Double(v)).unwrap();
        let mut chan = BoundObject::new(TypeId::SisChannel)
            .with("code", Value::from(code))
            .unwrap()
            .with("locationCode", Value::from(""))
            .unwrap()
            .with("Latitude", coord(TypeId::Latitude, 34.1))
            .unwrap()
            .with("Longitude", coord(TypeId::Longitude, -118.1))
            .unwrap()
            .with("Elevation", coord(TypeId::Distance, 295.0))
            .unwrap()
            .with("Depth", coord(TypeId::Distance, 0.0))
            .unwrap();
        if let Some(rate) = rate {
            chan.set("SampleRate", coord(TypeId::Float, rate)).unwrap();
        }
        chan
    }

    fn document(channels: Vec<BoundObject>) -> BoundObject {
        let coord = |id: TypeId, v: f64| BoundObject::new(id).with("ValueOf", Value::Double(v)).unwrap();
        let mut station = BoundObject::new(TypeId::SisStation)
            .with("code", Value::from("PAS"))
            .unwrap()
            .with("Latitude", coord(TypeId::Latitude, 34.1))
            .unwrap()
            .with("Longitude", coord(TypeId::Longitude, -118.1))
            .unwrap()
            .with("Elevation", coord(TypeId::Distance, 295.0))
            .unwrap();
        for c in channels {
            station.push("Channel", c).unwrap();
        }
        let mut network = BoundObject::new(TypeId::SisNetwork)
            .with("code", Value::from("CI"))
            .unwrap();
        network.push("Station", station).unwrap();
        let mut root = BoundObject::root(Dialect::Ext);
        root.push("Network", network).unwrap();
        root
    }

    fn matched(path: &str, library_stage: i64) -> LibraryMatch {
        LibraryMatch {
            path: PathBuf::from(path),
            alignment: StageAlignment {
                document_stage: library_stage,
                library_stage,
                library_last_stage: None,
            },
        }
    }

    #[test]
    fn test_parse_input_units() {
        let map = parse_input_units("VMU,VMV,VMW volt\n\nLCE second\nbogus\n");
        assert_eq!(map.get("VMV").map(String::as_str), Some("volt"));
        assert_eq!(map.get("LCE").map(String::as_str), Some("second"));
        assert_eq!(map.len(), 4);
    }

    #[test]
    fn test_unity_response_from_units_map() {
        let mut root = document(vec![channel("VMU", Some(0.1)), channel("LOG", None)]);
        let map = parse_input_units("VMU volt");
        let diag = RecordingDiagnostics::new();

        let summary = add_unity_responses(&mut root, &map, &diag).unwrap();
        assert_eq!(summary.count, 1);
        assert_eq!(
            summary.changes.get("CI.PAS..VMU_").map(String::as_str),
            Some("unity Stage")
        );
        assert_eq!(
            summary.changes.get("CI.PAS..LOG_").map(String::as_str),
            Some("WARN: No input units")
        );
        assert!(diag.has_warning_containing("No input units"));

        let vmu = find_channel(&root, "CI.PAS..VMU_").unwrap();
        let response = vmu.response().unwrap();
        assert_eq!(response.type_id(), TypeId::SisResponse);
        let sensitivity = response.object("InstrumentSensitivity").unwrap();
        assert_eq!(sensitivity.f64("Value"), Some(1.0));
        assert_eq!(sensitivity.object("OutputUnits").unwrap().text("Name"), Some("count"));
        let stage = response.objects("Stage").next().unwrap();
        let decimation = stage.object("Decimation").unwrap();
        assert_eq!(decimation.object("InputSampleRate").unwrap().value_of(), Some(0.1));
        assert_eq!(decimation.i64("Factor"), Some(1));
        assert_eq!(
            stage.object("Coefficients").unwrap().text("CfTransferFunctionType"),
            Some("DIGITAL")
        );
        validate(response, &diag).unwrap();
    }

    fn polynomial(coefficients: &[f64]) -> BoundObject {
        let mut poly = BoundObject::new(TypeId::Polynomial)
            .with("InputUnits", units("volt").unwrap())
            .unwrap()
            .with("OutputUnits", units("degC").unwrap())
            .unwrap()
            .with("ApproximationType", Value::from("MACLAURIN"))
            .unwrap();
        for c in coefficients {
            let coef = BoundObject::new(TypeId::FloatNoUnit)
                .with("ValueOf", Value::Double(*c))
                .unwrap();
            poly.push("Coefficient", coef).unwrap();
        }
        poly
    }

    fn with_polynomial_stage(coefficients: &[f64]) -> BoundObject {
        let stage = BoundObject::new(TypeId::ResponseStage)
            .with("number", Value::Integer(1))
            .unwrap()
            .with("Polynomial", polynomial(coefficients))
            .unwrap();
        let mut response = BoundObject::new(TypeId::SisResponse);
        response.push("Stage", stage).unwrap();
        channel("VKI", None).with("Response", response).unwrap()
    }

    #[test]
    fn test_linear_polynomial_gives_sensitivity() {
        let mut root = document(vec![with_polynomial_stage(&[0.0, 0.5])]);
        let diag = RecordingDiagnostics::new();
        let summary = add_unity_responses(&mut root, &BTreeMap::new(), &diag).unwrap();
        assert_eq!(
            summary.changes.get("CI.PAS..VKI_").map(String::as_str),
            Some("sensitivity from polynomial stage")
        );
        let chan = find_channel(&root, "CI.PAS..VKI_").unwrap();
        let sensitivity = chan.response().unwrap().object("InstrumentSensitivity").unwrap();
        assert_eq!(sensitivity.f64("Value"), Some(2.0));
        assert_eq!(sensitivity.object("InputUnits").unwrap().text("Name"), Some("volt"));
        assert_eq!(sensitivity.object("OutputUnits").unwrap().text("Name"), Some("degC"));
    }

    #[test]
    fn test_nonlinear_polynomial_becomes_instrument_polynomial() {
        let mut root = document(vec![with_polynomial_stage(&[-40.0, 0.5])]);
        let diag = RecordingDiagnostics::new();
        add_unity_responses(&mut root, &BTreeMap::new(), &diag).unwrap();

        let chan = find_channel(&root, "CI.PAS..VKI_").unwrap();
        let poly = chan.response().unwrap().object("InstrumentPolynomial").unwrap();
        assert_eq!(poly.type_id(), TypeId::SisPolynomial);
        assert_eq!(poly.text("SISNamespace"), Some("CI"));
        assert_eq!(poly.objects("Coefficient").count(), 2);
    }

    #[test]
    fn test_instrument_polynomial_copied_to_stage() {
        let response = BoundObject::new(TypeId::SisResponse)
            .with(
                "InstrumentPolynomial",
                convert_polynomial(&polynomial(&[1.0, 2.0]), TypeId::SisPolynomial, "CI").unwrap(),
            )
            .unwrap();
        let mut root = document(vec![channel("VKI", None).with("Response", response).unwrap()]);
        let diag = RecordingDiagnostics::new();
        let summary = add_unity_responses(&mut root, &BTreeMap::new(), &diag).unwrap();
        assert_eq!(summary.count, 1);

        let chan = find_channel(&root, "CI.PAS..VKI_").unwrap();
        let stage = chan.response().unwrap().objects("Stage").next().unwrap();
        let poly = stage.object("Polynomial").unwrap();
        assert_eq!(poly.type_id(), TypeId::Polynomial);
        assert!(!poly.has("SISNamespace"));
        assert_eq!(stage.i64("number"), Some(1));
    }

    #[test]
    fn test_link_library_responses() {
        let sensitivity = BoundObject::new(TypeId::Sensitivity)
            .with("Value", Value::Double(6.0e8))
            .unwrap()
            .with("Frequency", Value::Double(1.0))
            .unwrap()
            .with("InputUnits", units("m/s").unwrap())
            .unwrap()
            .with("OutputUnits", units("count").unwrap())
            .unwrap();
        let response = BoundObject::new(TypeId::SisResponse)
            .with("InstrumentSensitivity", sensitivity)
            .unwrap();
        let mut root = document(vec![
            channel("HHZ", Some(100.0)).with("Response", response.clone()).unwrap(),
            channel("HHN", Some(100.0)).with("Response", response).unwrap(),
        ]);

        let layout = LibraryLayout::new("/data/NRL");
        let mut report = MatchReport::default();
        report.sensor.insert(
            "CI.PAS..HHZ_".to_string(),
            vec![
                matched("/data/NRL/sensors/guralp/RESP.A", 1),
                matched("/data/NRL/sensors/guralp/RESP.B", 1),
            ],
        );
        report.logger.insert(
            "CI.PAS..HHZ_".to_string(),
            vec![matched("/data/NRL/dataloggers/quanterra/RESP.Q", 2)],
        );

        let diag = RecordingDiagnostics::new();
        let summary =
            link_library_responses(&mut root, &report, &layout, "http://ds.iris.edu/NRL/", &diag)
                .unwrap();
        assert_eq!(summary.count, 1);
        assert!(diag.has_warning_containing("more than one matching sensor"));

        let chans = channels(&root);
        let linked = chans[0].response().unwrap();
        assert!(linked.has("InstrumentSensitivity"));
        let subs: Vec<_> = linked.objects("SubResponse").collect();
        assert_eq!(subs.len(), 2);
        let sensor_file = subs[0].object("RESPFile").unwrap();
        assert_eq!(
            sensor_file.text("ValueOf"),
            Some("http://ds.iris.edu/NRL/sensors/guralp/RESP.A")
        );
        assert_eq!(sensor_file.i64("stageTo"), Some(1));
        let logger_file = subs[1].object("RESPFile").unwrap();
        assert_eq!(subs[1].i64("sequenceNumber"), Some(2));
        assert_eq!(logger_file.i64("stageFrom"), Some(2));
        assert_eq!(logger_file.i64("stageTo"), Some(-1));

        // unmatched channel untouched
        assert!(!chans[1].response().unwrap().has("SubResponse"));
    }

    #[test]
    fn test_link_requires_extended_dialect() {
        let mut root = BoundObject::root(Dialect::Fdsn);
        let diag = RecordingDiagnostics::new();
        let result = link_library_responses(
            &mut root,
            &MatchReport::default(),
            &LibraryLayout::new("/nrl"),
            DEFAULT_URL_PREFIX,
            &diag,
        );
        assert!(result.is_err());
    }
}
