//! Inventory and RESP text shared by the integration tests.
//!
//! The BHZ and BHN channels carry the response of the `CMG3T` sensor file
//! followed by the 40 sps datalogger file. LHZ has a different sensor and
//! VM1 is a state-of-health channel without a response.

pub const BHZ: &str = "XX.NS001..BHZ_";
pub const BHN: &str = "XX.NS001..BHN_";
pub const LHZ: &str = "XX.NS001..LHZ_";
pub const VM1: &str = "XX.NS001..VM1_";

pub const SENSOR_RESP: &str = "\
#
###################################################################################
#
B050F03     Station:     NS001
B050F16     Network:     XX
B052F03     Location:
B052F04     Channel:     BHZ
#
#                  +-----------------------------------+
#                  |    Response (Poles & Zeros)       |
#                  +-----------------------------------+
#
B053F03     Transfer function type:                A [Laplace Transform (Rad/sec)]
B053F04     Stage sequence number:                 1
B053F05     Response in units lookup:              M/S - Velocity in Meters per Second
B053F06     Response out units lookup:             V - Volts
B053F07     A0 normalization factor:               2.400000E+03
B053F08     Normalization frequency:               1.000000E+00
B053F09     Number of zeroes:                      2
B053F14     Number of poles:                       3
#              Complex zeroes:
#              i  real          imag          real_error    imag_error
B053F10-13     0  0.000000E+00  0.000000E+00  0.000000E+00  0.000000E+00
B053F10-13     1  0.000000E+00  0.000000E+00  0.000000E+00  0.000000E+00
#              Complex poles:
#              i  real          imag          real_error    imag_error
B053F15-18     0 -3.700400E-02  3.701600E-02  0.000000E+00  0.000000E+00
B053F15-18     1 -3.700400E-02 -3.701600E-02  0.000000E+00  0.000000E+00
B053F15-18     2 -2.513300E+02  0.000000E+00  0.000000E+00  0.000000E+00
#
#                  +-----------------------------------+
#                  |      Channel Sensitivity/Gain     |
#                  +-----------------------------------+
#
B058F03     Stage sequence number:                 1
B058F04     Sensitivity:                           4.000000E+02
B058F05     Frequency of sensitivity:              1.000000E+00 HZ
B058F06     Number of calibrations:                0
";

pub const OTHER_SENSOR_RESP: &str = "\
B050F03     Station:     NS007
B050F16     Network:     XX
B052F03     Location:
B052F04     Channel:     BHZ
#                  +-----------------------------------+
B053F03     Transfer function type:                A [Laplace Transform (Rad/sec)]
B053F04     Stage sequence number:                 1
B053F07     A0 normalization factor:               6.000770E+07
B053F08     Normalization frequency:               1.000000E+00
B053F09     Number of zeroes:                      2
B053F14     Number of poles:                       2
B053F10-13     0  0.000000E+00  0.000000E+00  0.000000E+00  0.000000E+00
B053F10-13     1  0.000000E+00  0.000000E+00  0.000000E+00  0.000000E+00
B053F15-18     0 -3.701000E-02  3.701000E-02  0.000000E+00  0.000000E+00
B053F15-18     1 -3.701000E-02 -3.701000E-02  0.000000E+00  0.000000E+00
#                  +-----------------------------------+
B058F03     Stage sequence number:                 1
B058F04     Sensitivity:                           1.500000E+03
B058F05     Frequency of sensitivity:              1.000000E+00 HZ
";

/// Starts like a RESP file but has a line no reader accepts
pub const BROKEN_RESP: &str = "\
B050F03     Station:     NS099
B053F04     Stage sequence number:                 1
BROKEN LINE
";

/// Datalogger file: unity preamplifier at stage 2, the converter at
/// stage 3 and one FIR stage, all running at `rate`
pub fn logger_resp(rate: f64) -> String {
    format!(
        "\
B050F03     Station:     NR001
B050F16     Network:     XX
B052F03     Location:
B052F04     Channel:     HHZ
#                  +-----------------------------------+
#                  |      Channel Sensitivity/Gain     |
#                  +-----------------------------------+
B058F03     Stage sequence number:                 2
B058F04     Sensitivity:                           1.000000E+00
B058F05     Frequency of sensitivity:              1.000000E+00 HZ
#                  +-----------------------------------+
#                  |       Response (Coefficients)     |
#                  +-----------------------------------+
B054F03     Transfer function type:                D
B054F04     Stage sequence number:                 3
B054F05     Response in units lookup:              V - Volts
B054F06     Response out units lookup:             COUNTS - Digital Counts
B054F07     Number of numerators:                  0
B054F10     Number of denominators:                0
#                  +-----------------------------------+
#                  |             Decimation            |
#                  +-----------------------------------+
B057F03     Stage sequence number:                 3
B057F04     Input sample rate:                     {rate:E}
B057F05     Decimation factor:                     1
B057F06     Decimation offset:                     0
B057F07     Estimated delay (seconds):             0.000000E+00
B057F08     Correction applied (seconds):          0.000000E+00
#                  +-----------------------------------+
B058F03     Stage sequence number:                 3
B058F04     Sensitivity:                           4.194300E+05
B058F05     Frequency of sensitivity:              1.000000E+00 HZ
#                  +-----------------------------------+
B054F03     Transfer function type:                D
B054F04     Stage sequence number:                 4
B054F05     Response in units lookup:              COUNTS - Digital Counts
B054F06     Response out units lookup:             COUNTS - Digital Counts
B054F07     Number of numerators:                  2
B054F10     Number of denominators:                0
#              Numerator coefficients:
#              i  coefficient   error
B054F08-09     0  5.000000E-01  0.000000E+00
B054F08-09     1  5.000000E-01  0.000000E+00
#                  +-----------------------------------+
B057F03     Stage sequence number:                 4
B057F04     Input sample rate:                     {rate:E}
B057F05     Decimation factor:                     1
B057F06     Decimation offset:                     0
B057F07     Estimated delay (seconds):             0.000000E+00
B057F08     Correction applied (seconds):          0.000000E+00
#                  +-----------------------------------+
B058F03     Stage sequence number:                 4
B058F04     Sensitivity:                           1.000000E+00
B058F05     Frequency of sensitivity:              1.000000E+00 HZ
#                  +-----------------------------------+
B058F03     Stage sequence number:                 0
B058F04     Sensitivity:                           4.194300E+05
B058F05     Frequency of sensitivity:              1.000000E+00 HZ
",
        rate = rate
    )
}

fn units(element: &str, name: &str) -> String {
    format!("<{0}><Name>{1}</Name></{0}>", element, name)
}

fn pole_zero(element: &str, number: usize, real: f64, imaginary: f64) -> String {
    format!(
        r#"<{0} number="{1}"><Real>{2}</Real><Imaginary>{3}</Imaginary></{0}>"#,
        element, number, real, imaginary
    )
}

fn gain(value: f64) -> String {
    format!(
        "<StageGain><Value>{}</Value><Frequency>1.0</Frequency></StageGain>",
        value
    )
}

fn decimation(rate: f64) -> String {
    format!(
        "<Decimation><InputSampleRate>{}</InputSampleRate><Factor>1</Factor>\
         <Offset>0</Offset><Delay>0.0</Delay><Correction>0.0</Correction></Decimation>",
        rate
    )
}

fn sensor_stage(factor: f64, stage_gain: f64) -> String {
    let zeros: String = (0..2).map(|i| pole_zero("Zero", i, 0.0, 0.0)).collect();
    let poles = [
        pole_zero("Pole", 0, -0.037004, 0.037016),
        pole_zero("Pole", 1, -0.037004, -0.037016),
        pole_zero("Pole", 2, -251.33, 0.0),
    ]
    .concat();
    format!(
        r#"<Stage number="1">
          <PolesZeros>
            {}{}
            <PzTransferFunctionType>LAPLACE (RADIANS/SECOND)</PzTransferFunctionType>
            <NormalizationFactor>{}</NormalizationFactor>
            <NormalizationFrequency>1.0</NormalizationFrequency>
            {}{}
          </PolesZeros>
          {}
        </Stage>"#,
        units("InputUnits", "M/S"),
        units("OutputUnits", "V"),
        factor,
        zeros,
        poles,
        gain(stage_gain)
    )
}

fn logger_stages(rate: f64) -> String {
    format!(
        r#"<Stage number="2">{}</Stage>
        <Stage number="3">
          <Coefficients>{}{}<CfTransferFunctionType>DIGITAL</CfTransferFunctionType></Coefficients>
          {}{}
        </Stage>
        <Stage number="4">
          <Coefficients>{}{}<CfTransferFunctionType>DIGITAL</CfTransferFunctionType>
            <Numerator>0.5</Numerator><Numerator>0.5</Numerator>
          </Coefficients>
          {}{}
        </Stage>"#,
        gain(1.0),
        units("InputUnits", "V"),
        units("OutputUnits", "COUNTS"),
        decimation(rate),
        gain(419430.0),
        units("InputUnits", "COUNTS"),
        units("OutputUnits", "COUNTS"),
        decimation(rate),
        gain(1.0),
    )
}

fn channel(code: &str, rate: f64, response: Option<String>) -> String {
    format!(
        r#"<Channel code="{}" locationCode="">
        <Latitude>34.148</Latitude>
        <Longitude>-118.171</Longitude>
        <Elevation>295.0</Elevation>
        <Depth>0.0</Depth>
        <SampleRate>{}</SampleRate>
        {}
      </Channel>"#,
        code,
        rate,
        response.unwrap_or_default()
    )
}

fn response(stages: String) -> String {
    format!(
        r#"<Response>
          <InstrumentSensitivity>
            <Value>167772000.0</Value>
            <Frequency>1.0</Frequency>
            {}{}
          </InstrumentSensitivity>
          {}
        </Response>"#,
        units("InputUnits", "M/S"),
        units("OutputUnits", "COUNTS"),
        stages
    )
}

/// Extended StationXML inventory with four channels
pub fn ext_document() -> String {
    let broadband = || response(sensor_stage(2400.0, 400.0) + &logger_stages(40.0));
    let long_period = response(sensor_stage(1200.0, 750.0) + &logger_stages(1.0));
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<FDSNStationXML xmlns="http://www.fdsn.org/xml/station/1"
    xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
    xmlns:sis="http://anss-sis.scsn.org/xml/ext-stationxml/3.0"
    xsi:schemaLocation="http://anss-sis.scsn.org/xml/ext-stationxml/3.0 https://anss-sis.scsn.org/xml/ext-stationxml/3.0/sis_extension.xsd"
    schemaVersion="3.0">
  <Source>test</Source>
  <Created>2020-01-01T00:00:00Z</Created>
  <Network code="XX">
    <Station code="NS001">
      <Latitude>34.148</Latitude>
      <Longitude>-118.171</Longitude>
      <Elevation>295.0</Elevation>
      <Site><Name>Test site</Name></Site>
      {}
      {}
      {}
      {}
    </Station>
  </Network>
</FDSNStationXML>
"#,
        channel("BHZ", 40.0, Some(broadband())),
        channel("BHN", 40.0, Some(broadband())),
        channel("LHZ", 1.0, Some(long_period)),
        channel("VM1", 0.1, None),
    )
}

/// The inventory of [`ext_document`] as plain FDSNStationXML 1.1
pub fn fdsn_document() -> String {
    let ext = ext_document();
    let body = ext
        .find("<Source>")
        .map(|start| &ext[start..])
        .expect("fixture has a Source element");
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<FDSNStationXML xmlns="http://www.fdsn.org/xml/station/1" schemaVersion="1.1">
  {}"#,
        body
    )
}
