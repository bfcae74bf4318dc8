//! Type declarations for FDSNStationXML 1.1 and the ExtStationXML 3.0
//! extension.
//!
//! Each declaration lists only its own attributes and elements; the fields
//! of the type it `extends` are prepended during resolution. Extension types
//! whose field list is not a plain suffix of their supertype's (the extended
//! channel, station, response and root) extend `BaseNode` or nothing and
//! name the FDSN type as `supertype` instead.

use std::collections::{BTreeMap, HashSet};

use super::{
    BOOLEAN, DATE, DOUBLE, DecimalFormat, FieldSpec, INTEGER, Kind, Namespace, Rule, SchemaNode,
    TEXT,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeId {
    Units,
    FloatNoUnit,
    Float,
    NumeratorCoefficient,
    Frequency,
    Identifier,
    Decimation,
    Gain,
    Sensitivity,
    SisGain,
    PoleZero,
    BaseFilter,
    PolesZeros,
    SisPolesZeros,
    Coefficients,
    SisCoefficients,
    Fir,
    SisFir,
    Polynomial,
    SisPolynomial,
    Person,
    Comment,
    BaseNode,
    Latitude,
    Longitude,
    Azimuth,
    Dip,
    Distance,
    ExternalReference,
    SampleRateRatio,
    Equipment,
    ResponseStage,
    Response,
    EquipmentLink,
    CalResponseDetail,
    SubResponseDetail,
    RespFile,
    ResponseDictLink,
    ResponseDictLink2,
    SubResponse,
    SisResponse,
    SensorOffset,
    SensorSiteDescription,
    Channel,
    SisChannel,
    Site,
    Operator,
    Place,
    Log,
    GeoSite,
    Station,
    SisStation,
    Network,
    SisNetwork,
    Root,
    SisRoot,
    FilterId,
    FilterStage,
    FilterSequence,
    ResponseDict,
    ResponseDictGroup,
    Project,
    EquipmentEpoch,
    OnDate,
    OffDate,
    ProblemReport,
    Setting,
    Ipv4Address,
    Ipv6Address,
    IpAddress,
    EquipBase,
    CalResponse,
    Calibration,
    Component,
    Equip,
    Logger,
    EquipId,
    ComponentDetail,
    LoggerPackageContent,
    LoggerPackage,
    PkgEquipment,
    Package,
    Hardware,
    SiteId,
    HardwareInstallation,
    HardwareInstallationGroup,
    HardwareResponse,
}

impl TypeId {
    pub const ALL: [TypeId; 87] = [
        TypeId::Units,
        TypeId::FloatNoUnit,
        TypeId::Float,
        TypeId::NumeratorCoefficient,
        TypeId::Frequency,
        TypeId::Identifier,
        TypeId::Decimation,
        TypeId::Gain,
        TypeId::Sensitivity,
        TypeId::SisGain,
        TypeId::PoleZero,
        TypeId::BaseFilter,
        TypeId::PolesZeros,
        TypeId::SisPolesZeros,
        TypeId::Coefficients,
        TypeId::SisCoefficients,
        TypeId::Fir,
        TypeId::SisFir,
        TypeId::Polynomial,
        TypeId::SisPolynomial,
        TypeId::Person,
        TypeId::Comment,
        TypeId::BaseNode,
        TypeId::Latitude,
        TypeId::Longitude,
        TypeId::Azimuth,
        TypeId::Dip,
        TypeId::Distance,
        TypeId::ExternalReference,
        TypeId::SampleRateRatio,
        TypeId::Equipment,
        TypeId::ResponseStage,
        TypeId::Response,
        TypeId::EquipmentLink,
        TypeId::CalResponseDetail,
        TypeId::SubResponseDetail,
        TypeId::RespFile,
        TypeId::ResponseDictLink,
        TypeId::ResponseDictLink2,
        TypeId::SubResponse,
        TypeId::SisResponse,
        TypeId::SensorOffset,
        TypeId::SensorSiteDescription,
        TypeId::Channel,
        TypeId::SisChannel,
        TypeId::Site,
        TypeId::Operator,
        TypeId::Place,
        TypeId::Log,
        TypeId::GeoSite,
        TypeId::Station,
        TypeId::SisStation,
        TypeId::Network,
        TypeId::SisNetwork,
        TypeId::Root,
        TypeId::SisRoot,
        TypeId::FilterId,
        TypeId::FilterStage,
        TypeId::FilterSequence,
        TypeId::ResponseDict,
        TypeId::ResponseDictGroup,
        TypeId::Project,
        TypeId::EquipmentEpoch,
        TypeId::OnDate,
        TypeId::OffDate,
        TypeId::ProblemReport,
        TypeId::Setting,
        TypeId::Ipv4Address,
        TypeId::Ipv6Address,
        TypeId::IpAddress,
        TypeId::EquipBase,
        TypeId::CalResponse,
        TypeId::Calibration,
        TypeId::Component,
        TypeId::Equip,
        TypeId::Logger,
        TypeId::EquipId,
        TypeId::ComponentDetail,
        TypeId::LoggerPackageContent,
        TypeId::LoggerPackage,
        TypeId::PkgEquipment,
        TypeId::Package,
        TypeId::Hardware,
        TypeId::SiteId,
        TypeId::HardwareInstallation,
        TypeId::HardwareInstallationGroup,
        TypeId::HardwareResponse,
    ];

    /// Schema type name, e.g. `ChannelType`
    pub fn name(self) -> &'static str {
        super::node(self).name
    }
}

const fn field(name: &'static str, kind: Kind) -> FieldSpec {
    FieldSpec::new(name, kind)
}

const fn nested(id: TypeId) -> Kind {
    Kind::Nested(id)
}

// Shared attribute lists

const XSI_TYPE: &[FieldSpec] = &[field("xsi:type", TEXT)];

const RESOURCE_ID: &[FieldSpec] = &[field("resourceId", TEXT)];

const SIS_NAMESPACE_ATTR: &[FieldSpec] = &[field("SISNamespace", TEXT).required()];

const FLOAT_NO_UNIT_ATTRS: &[FieldSpec] = &[
    field("plusError", DOUBLE),
    field("minusError", DOUBLE),
    field("measurementMethod", TEXT),
    field("number", INTEGER),
];

const FLOAT_ATTRS: &[FieldSpec] = &[field("unit", TEXT), field("i", INTEGER)];

const DATUM_ATTR: &[FieldSpec] = &[field("datum", TEXT)];

const BASE_NODE_ATTRS: &[FieldSpec] = &[
    field("code", TEXT).required(),
    field("startDate", DATE),
    field("endDate", DATE),
    field("sourceID", TEXT),
    field("restrictedStatus", TEXT),
    field("alternateCode", TEXT),
    field("historicalCode", TEXT),
];

const ROOT_ATTRS: &[FieldSpec] = &[
    field("xmlns", TEXT),
    field("xmlns:xsi", TEXT),
    field("schemaVersion", TEXT),
    field("xsi:schemaLocation", TEXT),
];

// Simple-content values

const VALUE_OF_TEXT: &[FieldSpec] = &[field("ValueOf", TEXT).required()];
const VALUE_OF_DOUBLE: &[FieldSpec] = &[field("ValueOf", DOUBLE).required()];
const VALUE_OF_DATE: &[FieldSpec] = &[field("ValueOf", DATE).required()];

// FDSN types

const UNITS_ELEMS: &[FieldSpec] = &[field("Name", TEXT).required(), field("Description", TEXT)];

const DECIMATION_ELEMS: &[FieldSpec] = &[
    field("InputSampleRate", nested(TypeId::Frequency)).required(),
    field("Factor", INTEGER).required(),
    field("Offset", INTEGER).required(),
    field("Delay", DOUBLE).required(),
    field("Correction", DOUBLE).required(),
];

const GAIN_ELEMS: &[FieldSpec] = &[
    field("Value", DOUBLE).required(),
    field("Frequency", DOUBLE).required(),
];

const SENSITIVITY_ELEMS: &[FieldSpec] = &[
    field("InputUnits", nested(TypeId::Units)).required(),
    field("OutputUnits", nested(TypeId::Units)).required(),
    field("FrequencyStart", DOUBLE),
    field("FrequencyEnd", DOUBLE),
    field("FrequencyDBVariation", DOUBLE),
];

const SIS_GAIN_ELEMS: &[FieldSpec] = &[
    field("InputUnits", nested(TypeId::Units)),
    field("OutputUnits", nested(TypeId::Units)),
];

const POLE_ZERO_ATTRS: &[FieldSpec] = &[field("number", INTEGER)];

const POLE_ZERO_ELEMS: &[FieldSpec] = &[
    field("Real", nested(TypeId::FloatNoUnit)).required(),
    field("Imaginary", nested(TypeId::FloatNoUnit)).required(),
];

// Units are optional here although the XSD requires them
const BASE_FILTER_ELEMS: &[FieldSpec] = &[
    field("Description", TEXT),
    field("InputUnits", nested(TypeId::Units)),
    field("OutputUnits", nested(TypeId::Units)),
];

const BASE_FILTER_ATTRS: &[FieldSpec] = &[field("resourceid", TEXT), field("name", TEXT)];

const POLES_ZEROS_ELEMS: &[FieldSpec] = &[
    field("PzTransferFunctionType", TEXT).required(),
    field("NormalizationFactor", DOUBLE).required(),
    field("NormalizationFrequency", DOUBLE).required(),
    field("Zero", nested(TypeId::PoleZero)).repeated(),
    field("Pole", nested(TypeId::PoleZero)).repeated(),
];

const COEFFICIENTS_ELEMS: &[FieldSpec] = &[
    field("CfTransferFunctionType", TEXT).required(),
    field("Numerator", nested(TypeId::Float)).repeated(),
    field("Denominator", nested(TypeId::Float)).repeated(),
];

const FIR_ELEMS: &[FieldSpec] = &[
    field("Symmetry", TEXT).required(),
    field("NumeratorCoefficient", nested(TypeId::Float)).repeated(),
];

const POLYNOMIAL_ELEMS: &[FieldSpec] = &[
    field("ApproximationType", TEXT).required(),
    field("FrequencyLowerBound", nested(TypeId::Frequency)).required(),
    field("FrequencyUpperBound", nested(TypeId::Frequency)).required(),
    field("ApproximationLowerBound", DOUBLE).required(),
    field("ApproximationUpperBound", DOUBLE).required(),
    field("MaximumError", DOUBLE).required(),
    field("Coefficient", nested(TypeId::FloatNoUnit))
        .required()
        .repeated(),
];

const PERSON_ELEMS: &[FieldSpec] = &[
    field("Name", TEXT).repeated(),
    field("Agency", TEXT).repeated(),
    field("Email", TEXT).repeated(),
    field("Phone", TEXT).repeated(),
];

const COMMENT_ELEMS: &[FieldSpec] = &[
    field("Value", TEXT).required(),
    field("BeginEffectiveTime", DATE),
    field("EndEffectiveTime", DATE),
    field("Author", nested(TypeId::Person)).repeated(),
];

const COMMENT_ATTRS: &[FieldSpec] = &[field("id", INTEGER), field("subject", TEXT)];

const IDENTIFIER_ATTRS: &[FieldSpec] = &[field("type", TEXT)];

const NUMERATOR_COEFFICIENT_ATTRS: &[FieldSpec] = &[field("i", INTEGER)];

const BASE_NODE_ELEMS: &[FieldSpec] = &[
    field("Description", TEXT),
    field("Identifier", nested(TypeId::Identifier)).repeated(),
    field("Comment", nested(TypeId::Comment)).repeated(),
];

const EXTERNAL_REFERENCE_ELEMS: &[FieldSpec] = &[
    field("URI", TEXT).required(),
    field("Description", TEXT).required(),
];

const SAMPLE_RATE_RATIO_ELEMS: &[FieldSpec] = &[
    field("NumberSamples", INTEGER).required(),
    field("NumberSeconds", INTEGER).required(),
];

const EQUIPMENT_ELEMS: &[FieldSpec] = &[
    field("Type", TEXT),
    field("Description", TEXT),
    field("Manufacturer", TEXT),
    field("Vendor", TEXT),
    field("Model", TEXT),
    field("SerialNumber", TEXT),
    field("InstallationDate", DATE),
    field("RemovalDate", DATE),
    field("CalibrationDate", DATE).repeated(),
];

const RESPONSE_STAGE_ELEMS: &[FieldSpec] = &[
    field("PolesZeros", nested(TypeId::PolesZeros)),
    field("Coefficients", nested(TypeId::Coefficients)),
    field("FIR", nested(TypeId::Fir)),
    field("Decimation", nested(TypeId::Decimation)),
    field("StageGain", nested(TypeId::Gain)),
    field("Polynomial", nested(TypeId::Polynomial)),
];

const RESPONSE_STAGE_ATTRS: &[FieldSpec] = &[field("resourceId", TEXT), field("number", INTEGER)];

const RESPONSE_ELEMS: &[FieldSpec] = &[
    field("InstrumentSensitivity", nested(TypeId::Sensitivity)),
    field("InstrumentPolynomial", nested(TypeId::Polynomial)),
    field("Stage", nested(TypeId::ResponseStage)).repeated(),
];

const CHANNEL_ATTRS: &[FieldSpec] = &[field("locationCode", TEXT).required_may_be_empty()];

const CHANNEL_BASE_ELEMS: &[FieldSpec] = &[
    field("ExternalReference", nested(TypeId::ExternalReference)).repeated(),
    field("Latitude", nested(TypeId::Latitude)).required(),
    field("Longitude", nested(TypeId::Longitude)).required(),
    field("Elevation", nested(TypeId::Distance)).required(),
    field("Depth", nested(TypeId::Distance)).required(),
    field("Azimuth", nested(TypeId::Azimuth)),
    field("Dip", nested(TypeId::Dip)),
    field("WaterLevel", nested(TypeId::Float)),
    field("Type", TEXT).repeated(),
    field("SampleRate", nested(TypeId::Float)),
    field("SampleRateRatio", nested(TypeId::SampleRateRatio)),
    field("ClockDrift", nested(TypeId::Float)),
    field("CalibrationUnits", nested(TypeId::Units)),
    field("Sensor", nested(TypeId::Equipment)),
    field("PreAmplifier", nested(TypeId::Equipment)),
    field("DataLogger", nested(TypeId::Equipment)),
    field("Equipment", nested(TypeId::Equipment)).repeated(),
];

const CHANNEL_RESPONSE: &[FieldSpec] = &[field("Response", nested(TypeId::Response))];

const SITE_ELEMS: &[FieldSpec] = &[
    field("Name", TEXT).required(),
    field("Description", TEXT),
    field("Town", TEXT),
    field("County", TEXT),
    field("Region", TEXT),
    field("Country", TEXT),
];

const OPERATOR_ELEMS: &[FieldSpec] = &[
    field("Agency", TEXT).required(),
    field("Contact", nested(TypeId::Person)).repeated(),
    field("WebSite", TEXT),
];

const STATION_BASE_ELEMS: &[FieldSpec] = &[
    field("Latitude", nested(TypeId::Latitude)).required(),
    field("Longitude", nested(TypeId::Longitude)).required(),
    field("Elevation", nested(TypeId::Distance)).required(),
    field("Site", nested(TypeId::Site)).required(),
    field("WaterLevel", nested(TypeId::Float)),
    field("Vault", TEXT),
    field("Geology", TEXT),
    field("Equipment", nested(TypeId::Equipment)).repeated(),
    field("Operator", nested(TypeId::Operator)).repeated(),
    field("CreationDate", DATE),
    field("TerminationDate", DATE),
    field("TotalNumberChannels", INTEGER),
    field("SelectedNumberChannels", INTEGER),
    field("ExternalReference", nested(TypeId::ExternalReference)).repeated(),
];

const STATION_CHANNELS: &[FieldSpec] = &[field("Channel", nested(TypeId::Channel)).repeated()];

const NETWORK_BASE_ELEMS: &[FieldSpec] = &[
    field("Operator", nested(TypeId::Operator)).repeated(),
    field("TotalNumberStations", INTEGER),
    field("SelectedNumberStations", INTEGER),
];

const NETWORK_STATIONS: &[FieldSpec] = &[field("Station", nested(TypeId::Station)).repeated()];

const ROOT_BASE_ELEMS: &[FieldSpec] = &[
    field("Source", TEXT).required(),
    field("Sender", TEXT),
    field("Module", TEXT),
    field("ModuleURI", TEXT),
    field("Created", DATE).required(),
];

const ROOT_NETWORKS: &[FieldSpec] = &[field("Network", nested(TypeId::Network))
    .required()
    .repeated()];

// Extension types

const SIS_RESPONSE_ELEMS: &[FieldSpec] = &[
    field("InstrumentSensitivity", nested(TypeId::Sensitivity)),
    field("InstrumentPolynomial", nested(TypeId::SisPolynomial)),
    field("Stage", nested(TypeId::ResponseStage)).repeated(),
    field("SubResponse", nested(TypeId::SubResponse)).repeated(),
];

const SIS_CHANNEL_ELEMS: &[FieldSpec] = &[
    field("Response", nested(TypeId::SisResponse)),
    field("StationChannelNumber", INTEGER),
    field("MeasurementType", TEXT),
    field("SignalUnits", nested(TypeId::Units)),
    field("Clip", DOUBLE),
    field("Cutoff", DOUBLE),
    field("PinNumber", INTEGER),
    field("ChannelSource", TEXT),
    field("NeedsReview", BOOLEAN),
    field("SensorSiteDescription", nested(TypeId::SensorSiteDescription)),
];

const SIS_STATION_ATTRS: &[FieldSpec] = &[field("codeType", TEXT)];

const SIS_STATION_ELEMS: &[FieldSpec] = &[
    field("Channel", nested(TypeId::SisChannel)).repeated(),
    field("DatumVertical", TEXT),
    field("SecondaryStationNumber", TEXT),
    field("ReferenceAzimuth", nested(TypeId::Azimuth)),
    field("GeoSite", nested(TypeId::GeoSite)),
];

const SIS_NETWORK_STATIONS: &[FieldSpec] =
    &[field("Station", nested(TypeId::SisStation)).repeated()];

const SIS_ROOT_ATTRS: &[FieldSpec] = &[field("xmlns:sis", TEXT)];

const SIS_ROOT_ELEMS: &[FieldSpec] = &[
    field("Network", nested(TypeId::SisNetwork))
        .required()
        .repeated(),
    field("HardwareResponse", nested(TypeId::HardwareResponse)),
];

// Types of the sis namespace

const EQUIPMENT_LINK_ELEMS: &[FieldSpec] = &[
    field("SerialNumber", TEXT).required(),
    field("ModelName", TEXT).required(),
    field("Category", TEXT).required(),
    field("ComponentName", TEXT).required(),
    field("CalibrationDate", DATE),
    field("AtoDDelay", nested(TypeId::Decimation)),
];

const CAL_RESPONSE_DETAIL_ELEMS: &[FieldSpec] = &[
    field("PolesZeros", nested(TypeId::SisPolesZeros)),
    field("Polynomial", nested(TypeId::SisPolynomial)),
];

const SUB_RESPONSE_DETAIL_ELEMS: &[FieldSpec] = &[
    field("PolesZeros", nested(TypeId::SisPolesZeros)),
    field("Coefficients", nested(TypeId::SisCoefficients)),
    field("FIR", nested(TypeId::SisFir)),
    field("Decimation", nested(TypeId::Decimation)),
    field("Gain", nested(TypeId::SisGain)).required(),
    field("Polynomial", nested(TypeId::SisPolynomial)),
];

const RESP_FILE_ATTRS: &[FieldSpec] = &[field("stageFrom", INTEGER), field("stageTo", INTEGER)];

const RESPONSE_DICT_LINK_ELEMS: &[FieldSpec] = &[
    field("Name", TEXT).required(),
    field("SISNamespace", TEXT).required(),
    field("Type", TEXT).required(),
];

const RESPONSE_DICT_LINK2_ELEMS: &[FieldSpec] = &[field("Gain", nested(TypeId::SisGain))];

const SUB_RESPONSE_ELEMS: &[FieldSpec] = &[
    field("EquipmentLink", nested(TypeId::EquipmentLink)),
    field("ResponseDetail", nested(TypeId::SubResponseDetail)),
    field("RESPFile", nested(TypeId::RespFile)),
    field("ResponseDictLink", nested(TypeId::ResponseDictLink2)),
];

const SUB_RESPONSE_ATTRS: &[FieldSpec] = &[field("sequenceNumber", INTEGER), field("type", TEXT)];

const SENSOR_OFFSET_ELEMS: &[FieldSpec] = &[
    field("NorthOffset", DOUBLE),
    field("EastOffset", DOUBLE),
    field("VerticalOffset", DOUBLE),
];

const SENSOR_SITE_DESCRIPTION_ELEMS: &[FieldSpec] = &[
    field("StationHousing", INTEGER),
    field("GeologicSiteClass", TEXT),
    field("PhysicalCondition", TEXT),
    field("Vs30", DOUBLE),
    field("SensorOffset", nested(TypeId::SensorOffset)),
];

const PLACE_ELEMS: &[FieldSpec] = &[
    field("Name", TEXT).required(),
    field("Latitude", nested(TypeId::Latitude)).required(),
    field("Longitude", nested(TypeId::Longitude)).required(),
];

const LOG_ELEMS: &[FieldSpec] = &[
    field("LogDate", DATE).required(),
    field("Subject", TEXT).required(),
    field("LogText", TEXT).required(),
    field("OffDate", DATE),
    field("Author", TEXT),
];

const GEO_SITE_ELEMS: &[FieldSpec] = &[
    field("Place", nested(TypeId::Place)).required(),
    field("SiteNetCode", TEXT),
    field("SiteLookupCode", TEXT),
    field("SiteTypeTag", TEXT).repeated(),
    field("SiteLog", nested(TypeId::Log)).repeated(),
];

const FILTER_ID_ELEMS: &[FieldSpec] = &[
    field("Name", TEXT).required(),
    field("SISNamespace", TEXT).required(),
    field("Type", TEXT).required(),
];

const FILTER_STAGE_ELEMS: &[FieldSpec] = &[
    field("SequenceNumber", INTEGER).required(),
    field("Filter", nested(TypeId::FilterId)).required(),
    field("Decimation", nested(TypeId::Decimation)).required(),
    field("Gain", nested(TypeId::SisGain)).required(),
];

const FILTER_SEQUENCE_ELEMS: &[FieldSpec] = &[field("FilterStage", nested(TypeId::FilterStage))
    .required()
    .repeated()];

const FILTER_SEQUENCE_ATTRS: &[FieldSpec] = &[
    field("name", TEXT).required(),
    field("SISNamespace", TEXT).required(),
];

const RESPONSE_DICT_ELEMS: &[FieldSpec] = &[
    field("PolesZeros", nested(TypeId::SisPolesZeros)),
    field("Coefficients", nested(TypeId::SisCoefficients)),
    field("FIR", nested(TypeId::SisFir)),
    field("Polynomial", nested(TypeId::SisPolynomial)),
    field("FilterSequence", nested(TypeId::FilterSequence)),
];

const RESPONSE_DICT_GROUP_ELEMS: &[FieldSpec] = &[field("ResponseDict", nested(TypeId::ResponseDict))
    .required()
    .repeated()];

const PROJECT_ELEMS: &[FieldSpec] = &[
    field("Name", TEXT).required(),
    field("GrantNumber", TEXT),
    field("Description", TEXT),
    field("StartDate", DATE),
    field("EndDate", DATE),
    field("FundingDate", DATE),
];

const EQUIPMENT_EPOCH_ELEMS: &[FieldSpec] = &[
    field("OnDate", DATE).required(),
    field("OffDate", DATE),
    field("InventoryStatus", TEXT).required(),
    field("Operator", TEXT).required(),
    field("Owner", TEXT),
    field("PropertyTag", TEXT),
    field("CoOwner", TEXT),
    field("CoPropertyTag", TEXT),
    field("Project", nested(TypeId::Project)),
    field("Description", TEXT),
];

const ON_DATE_ATTRS: &[FieldSpec] = &[field("onDateType", TEXT)];
const OFF_DATE_ATTRS: &[FieldSpec] = &[field("offDateType", TEXT)];

const PROBLEM_REPORT_ELEMS: &[FieldSpec] = &[
    field("OnDate", nested(TypeId::OnDate)),
    field("OffDate", nested(TypeId::OffDate)),
    field("Subject", TEXT).required(),
    field("LogText", TEXT).required(),
    field("CreatedBy", TEXT),
];

const SETTING_ELEMS: &[FieldSpec] = &[
    field("Key", TEXT).required(),
    field("Value", TEXT).required(),
    field("OnDate", DATE),
    field("OffDate", DATE),
];

const IPV4_ATTRS: &[FieldSpec] = &[field("networkMask", TEXT), field("gatewayAddress", TEXT)];
const IPV6_ATTRS: &[FieldSpec] = &[field("prefixLength", INTEGER), field("gatewayAddress", TEXT)];

const IP_ADDRESS_ELEMS: &[FieldSpec] = &[
    field("IPv4Address", nested(TypeId::Ipv4Address)),
    field("IPv6Address", nested(TypeId::Ipv6Address)),
    field("PhysicalPort", TEXT),
    field("Notes", TEXT),
];

const EQUIP_BASE_ELEMS: &[FieldSpec] = &[
    field("SerialNumber", TEXT).required(),
    field("ModelName", TEXT).required(),
    field("Category", TEXT).required(),
    field("IsActualSerialNumber", BOOLEAN).required(),
    field("COSMOSModelNumber", INTEGER),
    field("EquipmentEpoch", nested(TypeId::EquipmentEpoch))
        .required()
        .repeated(),
    field("Description", TEXT),
    field("Vendor", TEXT),
    field("EquipmentLog", nested(TypeId::Log)).repeated(),
    field("ProblemReport", nested(TypeId::ProblemReport)).repeated(),
    field("EquipSetting", nested(TypeId::Setting)).repeated(),
    field("IPAddress", nested(TypeId::IpAddress)).repeated(),
];

const CAL_RESPONSE_ELEMS: &[FieldSpec] = &[
    field("RESPFile", nested(TypeId::RespFile)),
    field("ResponseDetails", nested(TypeId::CalResponseDetail)),
    field("ResponseDictLink", nested(TypeId::ResponseDictLink)),
    field("Gain", nested(TypeId::SisGain)),
];

const CALIBRATION_ELEMS: &[FieldSpec] = &[
    field("CalibrationDate", DATE),
    field("CalibrationDateUnknown", BOOLEAN),
    field("Response", nested(TypeId::CalResponse)).required(),
    field("InputRange", DOUBLE),
    field("InputRangeUnit", nested(TypeId::Units)),
    field("OutputRange", DOUBLE),
    field("OutputRangeUnit", nested(TypeId::Units)),
    field("Comments", TEXT),
    field("NeedsReview", BOOLEAN),
    field("NaturalFrequency", DOUBLE),
    field("DampingConstant", DOUBLE),
    field("Attenuation", DOUBLE),
    field("StandardGain", DOUBLE),
    field("TuningHertz", DOUBLE),
    field("TuningVolt", DOUBLE),
];

const COMPONENT_ELEMS: &[FieldSpec] = &[
    field("ComponentName", TEXT).required(),
    field("Calibration", nested(TypeId::Calibration))
        .required()
        .repeated(),
    field("NumberOfAtoDBits", INTEGER),
    field("MaxAtoDCount", INTEGER),
];

const EQUIP_ELEMS: &[FieldSpec] = &[field("Component", nested(TypeId::Component))
    .required()
    .repeated()];

const LOGGER_ELEMS: &[FieldSpec] = &[field("SOHComponent", nested(TypeId::Component)).repeated()];

const EQUIP_ID_ELEMS: &[FieldSpec] = &[
    field("SerialNumber", TEXT).required(),
    field("ModelName", TEXT).required(),
    field("Category", TEXT).required(),
];

const COMPONENT_DETAIL_ELEMS: &[FieldSpec] = &[
    field("ComponentName", TEXT).required(),
    field("PinNumber", INTEGER).required(),
];

const LOGGER_PACKAGE_CONTENT_ELEMS: &[FieldSpec] = &[
    field("LoggerBoard", nested(TypeId::EquipId)).required(),
    field("SlotNumber", INTEGER).required(),
    field("ComponentDetail", nested(TypeId::ComponentDetail))
        .required()
        .repeated(),
];

const LOGGER_PACKAGE_ELEMS: &[FieldSpec] = &[
    field("Logger", nested(TypeId::EquipId)).required(),
    field("LoggerContent", nested(TypeId::LoggerPackageContent))
        .required()
        .repeated(),
    field("OnDate", DATE),
    field("OffDate", DATE),
];

const PACKAGE_ELEMS: &[FieldSpec] = &[
    field("Equipment", nested(TypeId::PkgEquipment))
        .required()
        .repeated(),
    field("OnDate", DATE).required(),
    field("OffDate", DATE),
];

const HARDWARE_ELEMS: &[FieldSpec] = &[
    field("Sensor", nested(TypeId::Equip)).repeated(),
    field("Logger", nested(TypeId::Logger)).repeated(),
    field("LoggerBoard", nested(TypeId::Equip)).repeated(),
    field("LoggerPackage", nested(TypeId::LoggerPackage)).repeated(),
    field("Amplifier", nested(TypeId::Equip)).repeated(),
    field("VCO", nested(TypeId::Equip)).repeated(),
    field("Discriminator", nested(TypeId::Equip)).repeated(),
    field("Equipment", nested(TypeId::EquipBase)).repeated(),
    field("Package", nested(TypeId::Package)).repeated(),
];

const SITE_ID_ELEMS: &[FieldSpec] = &[
    field("SiteNetCode", TEXT).required(),
    field("SiteLookupCode", TEXT).required(),
    field("OnDate", DATE).required(),
    field("OffDate", DATE),
];

const HARDWARE_INSTALLATION_ELEMS: &[FieldSpec] = &[
    field("Equipment", nested(TypeId::EquipId)).required(),
    field("Location", nested(TypeId::SiteId)).required(),
    field("IsMultiSite", BOOLEAN).required(),
    field("InstallDate", DATE).required(),
    field("RemovalDate", DATE),
    field("Notes", TEXT),
    field("InstallAlias", TEXT),
];

const HARDWARE_INSTALLATION_GROUP_ELEMS: &[FieldSpec] =
    &[field("HardwareInstallation", nested(TypeId::HardwareInstallation))
        .required()
        .repeated()];

const HARDWARE_RESPONSE_ELEMS: &[FieldSpec] = &[
    field("Hardware", nested(TypeId::Hardware)),
    field("ResponseDictGroup", nested(TypeId::ResponseDictGroup)),
    field("HardwareInstallationGroup", nested(TypeId::HardwareInstallationGroup)),
];

// Rules

const SYMMETRIC: &[Rule] = &[Rule::SymmetricErrors];
const HERTZ: &[Rule] = &[Rule::UnitEquals("HERTZ")];
const METERS: &[Rule] = &[Rule::UnitEquals("METERS")];
const LATITUDE_RULES: &[Rule] = &[
    Rule::UnitEquals("DEGREES"),
    Rule::Range {
        label: "Latitude",
        min: -90.0,
        max: 90.0,
    },
];
const LONGITUDE_RULES: &[Rule] = &[
    Rule::UnitEquals("DEGREES"),
    Rule::Range {
        label: "Longitude",
        min: -180.0,
        max: 180.0,
    },
];
const AZIMUTH_RULES: &[Rule] = &[
    Rule::UnitEquals("DEGREES"),
    Rule::Range {
        label: "Azimuth",
        min: 0.0,
        max: 360.0,
    },
];
const DIP_RULES: &[Rule] = &[
    Rule::UnitEquals("DEGREES"),
    Rule::Range {
        label: "Dip",
        min: -90.0,
        max: 90.0,
    },
];
const STAGE_RULES: &[Rule] = &[Rule::ExactlyOne("StageGain", "Polynomial")];
const SUB_RESPONSE_DETAIL_RULES: &[Rule] = &[Rule::ExactlyOne("Gain", "Polynomial")];
const CALIBRATION_RULES: &[Rule] = &[Rule::CalibrationDateKnown];
const FDSN_ROOT_RULES: &[Rule] = &[Rule::RootSchema(Namespace::Fsx)];
const SIS_ROOT_RULES: &[Rule] = &[Rule::RootSchema(Namespace::Sis)];

type FieldLists = &'static [&'static [FieldSpec]];

/// Unresolved declaration of one type
#[derive(Debug, Clone, Copy)]
struct Decl {
    id: TypeId,
    name: &'static str,
    namespace: Namespace,
    extends: Option<TypeId>,
    supertype: Option<TypeId>,
    simple: bool,
    attributes: FieldLists,
    elements: FieldLists,
    rules: &'static [Rule],
    /// Output format of an inherited `ValueOf`
    value_format: Option<DecimalFormat>,
}

impl Decl {
    fn base(id: TypeId, name: &'static str, namespace: Namespace) -> Self {
        Self {
            id,
            name,
            namespace,
            extends: None,
            supertype: None,
            simple: false,
            attributes: &[XSI_TYPE],
            elements: &[],
            rules: &[],
            value_format: None,
        }
    }

    fn derived(id: TypeId, name: &'static str, namespace: Namespace, parent: TypeId) -> Self {
        Self {
            extends: Some(parent),
            attributes: &[],
            ..Self::base(id, name, namespace)
        }
    }

    fn simple(id: TypeId, name: &'static str, namespace: Namespace, value: FieldLists) -> Self {
        Self {
            simple: true,
            elements: value,
            ..Self::base(id, name, namespace)
        }
    }

    fn attrs(self, attributes: FieldLists) -> Self {
        Self { attributes, ..self }
    }

    fn elems(self, elements: FieldLists) -> Self {
        Self { elements, ..self }
    }

    fn rules(self, rules: &'static [Rule]) -> Self {
        Self { rules, ..self }
    }

    fn value_format(self, format: DecimalFormat) -> Self {
        Self {
            value_format: Some(format),
            ..self
        }
    }

    fn extension_of(self, supertype: TypeId) -> Self {
        Self {
            supertype: Some(supertype),
            ..self
        }
    }
}

fn declarations() -> Vec<Decl> {
    use Namespace::{Fsx, Sis};
    use TypeId as T;

    vec![
        Decl::base(T::Units, "UnitsType", Fsx).elems(&[UNITS_ELEMS]),
        Decl::simple(T::FloatNoUnit, "FloatNoUnitType", Fsx, &[VALUE_OF_DOUBLE])
            .attrs(&[XSI_TYPE, FLOAT_NO_UNIT_ATTRS])
            .rules(SYMMETRIC),
        Decl::derived(T::Float, "FloatType", Fsx, T::FloatNoUnit).attrs(&[FLOAT_ATTRS]),
        Decl::simple(T::NumeratorCoefficient, "NumeratorCoefficientType", Fsx, &[VALUE_OF_DOUBLE])
            .attrs(&[XSI_TYPE, NUMERATOR_COEFFICIENT_ATTRS]),
        Decl::derived(T::Frequency, "FrequencyType", Fsx, T::Float).rules(HERTZ),
        Decl::simple(T::Identifier, "IdentifierType", Fsx, &[VALUE_OF_TEXT])
            .attrs(&[XSI_TYPE, IDENTIFIER_ATTRS]),
        Decl::base(T::Decimation, "DecimationType", Fsx).elems(&[DECIMATION_ELEMS]),
        Decl::base(T::Gain, "GainType", Fsx).elems(&[GAIN_ELEMS]),
        Decl::derived(T::Sensitivity, "SensitivityType", Fsx, T::Gain).elems(&[SENSITIVITY_ELEMS]),
        Decl::derived(T::SisGain, "SISGainType", Fsx, T::Gain)
            .elems(&[SIS_GAIN_ELEMS])
            .extension_of(T::Gain),
        Decl::base(T::PoleZero, "PoleZeroType", Fsx)
            .attrs(&[XSI_TYPE, POLE_ZERO_ATTRS])
            .elems(&[POLE_ZERO_ELEMS]),
        Decl::base(T::BaseFilter, "BaseFilterType", Fsx)
            .attrs(&[XSI_TYPE, BASE_FILTER_ATTRS])
            .elems(&[BASE_FILTER_ELEMS]),
        Decl::derived(T::PolesZeros, "PolesZerosType", Fsx, T::BaseFilter)
            .elems(&[POLES_ZEROS_ELEMS]),
        Decl::derived(T::SisPolesZeros, "SISPolesZerosType", Fsx, T::PolesZeros)
            .attrs(&[SIS_NAMESPACE_ATTR])
            .extension_of(T::PolesZeros),
        Decl::derived(T::Coefficients, "CoefficientsType", Fsx, T::BaseFilter)
            .elems(&[COEFFICIENTS_ELEMS]),
        Decl::derived(T::SisCoefficients, "SISCoefficientsType", Fsx, T::Coefficients)
            .attrs(&[SIS_NAMESPACE_ATTR])
            .extension_of(T::Coefficients),
        Decl::derived(T::Fir, "FIRType", Fsx, T::BaseFilter).elems(&[FIR_ELEMS]),
        Decl::derived(T::SisFir, "SISFIRType", Fsx, T::Fir)
            .attrs(&[SIS_NAMESPACE_ATTR])
            .extension_of(T::Fir),
        Decl::derived(T::Polynomial, "PolynomialType", Fsx, T::BaseFilter)
            .elems(&[POLYNOMIAL_ELEMS]),
        Decl::derived(T::SisPolynomial, "SISPolynomialType", Fsx, T::Polynomial)
            .attrs(&[SIS_NAMESPACE_ATTR])
            .extension_of(T::Polynomial),
        Decl::base(T::Person, "PersonType", Fsx).elems(&[PERSON_ELEMS]),
        Decl::base(T::Comment, "CommentType", Fsx)
            .attrs(&[XSI_TYPE, COMMENT_ATTRS])
            .elems(&[COMMENT_ELEMS]),
        Decl::base(T::BaseNode, "BaseNodeType", Fsx)
            .attrs(&[XSI_TYPE, BASE_NODE_ATTRS])
            .elems(&[BASE_NODE_ELEMS]),
        Decl::derived(T::Latitude, "LatitudeType", Fsx, T::Float)
            .attrs(&[DATUM_ATTR])
            .rules(LATITUDE_RULES)
            .value_format(DecimalFormat::Fixed6),
        Decl::derived(T::Longitude, "LongitudeType", Fsx, T::Float)
            .attrs(&[DATUM_ATTR])
            .rules(LONGITUDE_RULES)
            .value_format(DecimalFormat::Fixed6),
        Decl::derived(T::Azimuth, "AzimuthType", Fsx, T::Float)
            .rules(AZIMUTH_RULES)
            .value_format(DecimalFormat::Fixed1),
        Decl::derived(T::Dip, "DipType", Fsx, T::Float).rules(DIP_RULES),
        Decl::derived(T::Distance, "DistanceType", Fsx, T::Float).rules(METERS),
        Decl::base(T::ExternalReference, "ExternalReferenceType", Fsx)
            .elems(&[EXTERNAL_REFERENCE_ELEMS]),
        Decl::base(T::SampleRateRatio, "SampleRateRatioType", Fsx)
            .elems(&[SAMPLE_RATE_RATIO_ELEMS]),
        Decl::base(T::Equipment, "EquipmentType", Fsx)
            .attrs(&[XSI_TYPE, RESOURCE_ID])
            .elems(&[EQUIPMENT_ELEMS]),
        Decl::base(T::ResponseStage, "ResponseStageType", Fsx)
            .attrs(&[XSI_TYPE, RESPONSE_STAGE_ATTRS])
            .elems(&[RESPONSE_STAGE_ELEMS])
            .rules(STAGE_RULES),
        Decl::base(T::Response, "ResponseType", Fsx)
            .attrs(&[XSI_TYPE, RESOURCE_ID])
            .elems(&[RESPONSE_ELEMS]),
        Decl::base(T::EquipmentLink, "EquipmentLinkType", Sis).elems(&[EQUIPMENT_LINK_ELEMS]),
        Decl::base(T::CalResponseDetail, "CalResponseDetailType", Sis)
            .elems(&[CAL_RESPONSE_DETAIL_ELEMS]),
        Decl::base(T::SubResponseDetail, "SubResponseDetailType", Sis)
            .elems(&[SUB_RESPONSE_DETAIL_ELEMS])
            .rules(SUB_RESPONSE_DETAIL_RULES),
        Decl::simple(T::RespFile, "RESPFileType", Sis, &[VALUE_OF_TEXT])
            .attrs(&[XSI_TYPE, RESP_FILE_ATTRS]),
        Decl::base(T::ResponseDictLink, "ResponseDictLinkType", Sis)
            .elems(&[RESPONSE_DICT_LINK_ELEMS]),
        Decl::derived(T::ResponseDictLink2, "ResponseDictLinkType2", Sis, T::ResponseDictLink)
            .elems(&[RESPONSE_DICT_LINK2_ELEMS]),
        Decl::base(T::SubResponse, "SubResponseType", Sis)
            .attrs(&[XSI_TYPE, SUB_RESPONSE_ATTRS])
            .elems(&[SUB_RESPONSE_ELEMS]),
        Decl::base(T::SisResponse, "SISResponseType", Fsx)
            .attrs(&[XSI_TYPE, RESOURCE_ID])
            .elems(&[SIS_RESPONSE_ELEMS])
            .extension_of(T::Response),
        Decl::base(T::SensorOffset, "SensorOffsetType", Sis).elems(&[SENSOR_OFFSET_ELEMS]),
        Decl::base(T::SensorSiteDescription, "SensorSiteDescriptionType", Sis)
            .elems(&[SENSOR_SITE_DESCRIPTION_ELEMS]),
        Decl::derived(T::Channel, "ChannelType", Fsx, T::BaseNode)
            .attrs(&[CHANNEL_ATTRS])
            .elems(&[CHANNEL_BASE_ELEMS, CHANNEL_RESPONSE]),
        Decl::derived(T::SisChannel, "SISChannelType", Fsx, T::BaseNode)
            .attrs(&[CHANNEL_ATTRS])
            .elems(&[CHANNEL_BASE_ELEMS, SIS_CHANNEL_ELEMS])
            .extension_of(T::Channel),
        Decl::base(T::Site, "SiteType", Fsx).elems(&[SITE_ELEMS]),
        Decl::base(T::Operator, "OperatorType", Fsx).elems(&[OPERATOR_ELEMS]),
        Decl::base(T::Place, "PlaceType", Sis).elems(&[PLACE_ELEMS]),
        Decl::base(T::Log, "LogType", Sis).elems(&[LOG_ELEMS]),
        Decl::base(T::GeoSite, "GeoSiteType", Sis).elems(&[GEO_SITE_ELEMS]),
        Decl::derived(T::Station, "StationType", Fsx, T::BaseNode)
            .elems(&[STATION_BASE_ELEMS, STATION_CHANNELS]),
        Decl::derived(T::SisStation, "SISStationType", Fsx, T::BaseNode)
            .attrs(&[SIS_STATION_ATTRS])
            .elems(&[STATION_BASE_ELEMS, SIS_STATION_ELEMS])
            .extension_of(T::Station),
        Decl::derived(T::Network, "NetworkType", Fsx, T::BaseNode)
            .elems(&[NETWORK_BASE_ELEMS, NETWORK_STATIONS]),
        Decl::derived(T::SisNetwork, "SISNetworkType", Fsx, T::BaseNode)
            .elems(&[NETWORK_BASE_ELEMS, SIS_NETWORK_STATIONS]),
        Decl::base(T::Root, "RootType", Fsx)
            .attrs(&[XSI_TYPE, ROOT_ATTRS])
            .elems(&[ROOT_BASE_ELEMS, ROOT_NETWORKS])
            .rules(FDSN_ROOT_RULES),
        Decl::base(T::SisRoot, "SISRootType", Fsx)
            .attrs(&[XSI_TYPE, ROOT_ATTRS, SIS_ROOT_ATTRS])
            .elems(&[ROOT_BASE_ELEMS, SIS_ROOT_ELEMS])
            .rules(SIS_ROOT_RULES)
            .extension_of(T::Root),
        Decl::base(T::FilterId, "FilterIDType", Sis).elems(&[FILTER_ID_ELEMS]),
        Decl::base(T::FilterStage, "FilterStageType", Sis).elems(&[FILTER_STAGE_ELEMS]),
        Decl::base(T::FilterSequence, "FilterSequenceType", Sis)
            .attrs(&[XSI_TYPE, FILTER_SEQUENCE_ATTRS])
            .elems(&[FILTER_SEQUENCE_ELEMS]),
        Decl::base(T::ResponseDict, "ResponseDictType", Sis).elems(&[RESPONSE_DICT_ELEMS]),
        Decl::base(T::ResponseDictGroup, "ResponseDictGroupType", Sis)
            .elems(&[RESPONSE_DICT_GROUP_ELEMS]),
        Decl::base(T::Project, "ProjectType", Sis)
            .attrs(&[XSI_TYPE, SIS_NAMESPACE_ATTR])
            .elems(&[PROJECT_ELEMS]),
        Decl::base(T::EquipmentEpoch, "EquipmentEpochType", Sis)
            .elems(&[EQUIPMENT_EPOCH_ELEMS]),
        Decl::simple(T::OnDate, "OnDateType", Sis, &[VALUE_OF_DATE]).attrs(&[ON_DATE_ATTRS]),
        Decl::simple(T::OffDate, "OffDateType", Sis, &[VALUE_OF_DATE]).attrs(&[OFF_DATE_ATTRS]),
        Decl::base(T::ProblemReport, "ProblemReportType", Sis).elems(&[PROBLEM_REPORT_ELEMS]),
        Decl::base(T::Setting, "SettingType", Sis).elems(&[SETTING_ELEMS]),
        Decl::simple(T::Ipv4Address, "IPv4AddressType", Sis, &[VALUE_OF_TEXT])
            .attrs(&[XSI_TYPE, IPV4_ATTRS]),
        Decl::simple(T::Ipv6Address, "IPv6AddressType", Sis, &[VALUE_OF_TEXT])
            .attrs(&[XSI_TYPE, IPV6_ATTRS]),
        Decl::base(T::IpAddress, "IPAddressType", Sis).elems(&[IP_ADDRESS_ELEMS]),
        Decl::base(T::EquipBase, "EquipBaseType", Sis).elems(&[EQUIP_BASE_ELEMS]),
        Decl::base(T::CalResponse, "CalResponseType", Sis).elems(&[CAL_RESPONSE_ELEMS]),
        Decl::base(T::Calibration, "CalibrationType", Sis)
            .elems(&[CALIBRATION_ELEMS])
            .rules(CALIBRATION_RULES),
        Decl::base(T::Component, "ComponentType", Sis).elems(&[COMPONENT_ELEMS]),
        Decl::derived(T::Equip, "EquipType", Sis, T::EquipBase).elems(&[EQUIP_ELEMS]),
        Decl::derived(T::Logger, "LoggerType", Sis, T::EquipBase).elems(&[LOGGER_ELEMS]),
        Decl::base(T::EquipId, "EquipIDType", Sis).elems(&[EQUIP_ID_ELEMS]),
        Decl::base(T::ComponentDetail, "ComponentDetailType", Sis)
            .elems(&[COMPONENT_DETAIL_ELEMS]),
        Decl::base(T::LoggerPackageContent, "LoggerPackageContentType", Sis)
            .elems(&[LOGGER_PACKAGE_CONTENT_ELEMS]),
        Decl::base(T::LoggerPackage, "LoggerPackageType", Sis).elems(&[LOGGER_PACKAGE_ELEMS]),
        Decl::base(T::PkgEquipment, "PkgEquipmentType", Sis).elems(&[EQUIP_ID_ELEMS]),
        Decl::base(T::Package, "PackageType", Sis).elems(&[PACKAGE_ELEMS]),
        Decl::base(T::Hardware, "HardwareType", Sis).elems(&[HARDWARE_ELEMS]),
        Decl::base(T::SiteId, "SiteIDType", Sis).elems(&[SITE_ID_ELEMS]),
        Decl::base(T::HardwareInstallation, "HardwareInstallationType", Sis)
            .elems(&[HARDWARE_INSTALLATION_ELEMS]),
        Decl::base(T::HardwareInstallationGroup, "HardwareInstallationGroupType", Sis)
            .elems(&[HARDWARE_INSTALLATION_GROUP_ELEMS]),
        Decl::base(T::HardwareResponse, "HardwareResponseType", Sis)
            .elems(&[HARDWARE_RESPONSE_ELEMS]),
    ]
}

/// Inherited plus own fields, parent first
struct Flattened {
    simple: bool,
    attributes: Vec<FieldSpec>,
    elements: Vec<FieldSpec>,
    rules: Vec<Rule>,
}

fn flatten(decl: &Decl, decls: &BTreeMap<TypeId, Decl>) -> Flattened {
    let mut flat = match decl.extends.and_then(|parent| decls.get(&parent)) {
        Some(parent) => flatten(parent, decls),
        None => Flattened {
            simple: false,
            attributes: Vec::new(),
            elements: Vec::new(),
            rules: Vec::new(),
        },
    };
    flat.simple |= decl.simple;
    flat.attributes
        .extend(decl.attributes.iter().flat_map(|list| list.iter().copied()));
    flat.elements
        .extend(decl.elements.iter().flat_map(|list| list.iter().copied()));
    flat.rules.extend_from_slice(decl.rules);
    if let Some(format) = decl.value_format {
        for spec in flat.elements.iter_mut().filter(|f| f.name == "ValueOf") {
            *spec = spec.formatted(format);
        }
    }
    flat
}

pub(super) fn resolve_all() -> BTreeMap<TypeId, SchemaNode> {
    let decls: BTreeMap<TypeId, Decl> = declarations().into_iter().map(|d| (d.id, d)).collect();

    decls
        .values()
        .map(|decl| {
            let flat = flatten(decl, &decls);
            let supertype = decl.supertype.and_then(|id| decls.get(&id));

            // Elements the FDSN supertype lacks are written in the sis namespace
            let inherited: Option<HashSet<&'static str>> = supertype.map(|sup| {
                flatten(sup, &decls)
                    .elements
                    .iter()
                    .map(|f| f.name)
                    .collect()
            });
            let element_namespaces = flat
                .elements
                .iter()
                .map(|f| match &inherited {
                    Some(names) if !names.contains(f.name) => Namespace::Sis,
                    _ => decl.namespace,
                })
                .collect();

            let node = SchemaNode {
                id: decl.id,
                name: decl.name,
                namespace: decl.namespace,
                extends: decl.extends,
                supertype: decl.supertype,
                simple: flat.simple,
                attributes: flat.attributes,
                elements: flat.elements,
                rules: flat.rules,
                element_namespaces,
                ext_type: supertype.map(|sup| format!("{}:{}", Namespace::Sis.key(), sup.name)),
            };
            (decl.id, node)
        })
        .collect()
}
