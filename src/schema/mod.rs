//! Static schema registry for FDSNStationXML 1.1 and ExtStationXML 3.0.
//!
//! Every XML type the binding engine can produce is described by a
//! [`SchemaNode`]: ordered attributes, ordered elements, namespace, and the
//! type it extends. Nodes are resolved once from the declarations in
//! [`catalog`] and never change afterwards.

mod catalog;

use std::collections::BTreeMap;
use std::sync::OnceLock;

pub use catalog::TypeId;

/// Namespaces known to the binding engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Namespace {
    Xsi,
    Fsx,
    Sis,
}

impl Namespace {
    pub const ALL: [Namespace; 3] = [Namespace::Xsi, Namespace::Fsx, Namespace::Sis];

    pub fn uri(self) -> &'static str {
        match self {
            Namespace::Xsi => "http://www.w3.org/2001/XMLSchema-instance",
            Namespace::Fsx => "http://www.fdsn.org/xml/station/1",
            Namespace::Sis => "http://anss-sis.scsn.org/xml/ext-stationxml/3.0",
        }
    }

    /// Short key used in attribute names and diagnostics
    pub fn key(self) -> &'static str {
        match self {
            Namespace::Xsi => "xsi",
            Namespace::Fsx => "fsx",
            Namespace::Sis => "sis",
        }
    }

    /// Prefix written on output; the FDSN namespace is the default namespace
    pub fn output_prefix(self) -> Option<&'static str> {
        match self {
            Namespace::Xsi => Some("xsi"),
            Namespace::Fsx => None,
            Namespace::Sis => Some("sis"),
        }
    }

    pub fn schema_file(self) -> &'static str {
        match self {
            Namespace::Xsi => "",
            Namespace::Fsx => "http://www.fdsn.org/xml/station/fdsn-station-1.1.xsd",
            Namespace::Sis => "https://anss-sis.scsn.org/xml/ext-stationxml/3.0/sis_extension.xsd",
        }
    }

    pub fn schema_version(self) -> &'static str {
        match self {
            Namespace::Xsi => "",
            Namespace::Fsx => "1.1",
            Namespace::Sis => "3.0",
        }
    }

    /// Expected `xsi:schemaLocation` value for documents rooted in this namespace
    pub fn schema_location(self) -> String {
        format!("{} {}", self.uri(), self.schema_file())
    }

    pub fn from_uri(uri: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|ns| ns.uri() == uri)
    }
}

/// Primitive datatypes carried by leaf fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Text,
    Integer,
    Double,
    Boolean,
    DateTime,
}

impl Primitive {
    pub fn name(self) -> &'static str {
        match self {
            Primitive::Text => "text",
            Primitive::Integer => "integer",
            Primitive::Double => "double",
            Primitive::Boolean => "boolean",
            Primitive::DateTime => "date",
        }
    }
}

/// Field payload: a primitive or a nested schema type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Primitive(Primitive),
    Nested(TypeId),
}

/// How double values of a field are written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecimalFormat {
    /// Shortest form that parses back to the same value
    #[default]
    General,
    Fixed1,
    Fixed6,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Optional,
    Required,
    /// Must be present but the empty string is a legal value
    RequiredMayBeEmpty,
}

/// One attribute or element of a schema type
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: Kind,
    pub presence: Presence,
    pub repeated: bool,
    pub format: DecimalFormat,
}

impl FieldSpec {
    pub const fn new(name: &'static str, kind: Kind) -> Self {
        Self {
            name,
            kind,
            presence: Presence::Optional,
            repeated: false,
            format: DecimalFormat::General,
        }
    }

    pub const fn required(self) -> Self {
        Self {
            presence: Presence::Required,
            ..self
        }
    }

    pub const fn required_may_be_empty(self) -> Self {
        Self {
            presence: Presence::RequiredMayBeEmpty,
            ..self
        }
    }

    pub const fn repeated(self) -> Self {
        Self {
            repeated: true,
            ..self
        }
    }

    pub const fn formatted(self, format: DecimalFormat) -> Self {
        Self { format, ..self }
    }

    pub fn is_required(&self) -> bool {
        self.presence != Presence::Optional
    }

    pub fn nested_type(&self) -> Option<TypeId> {
        match self.kind {
            Kind::Nested(id) => Some(id),
            Kind::Primitive(_) => None,
        }
    }
}

/// Domain rules checked by validation in addition to presence
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rule {
    /// `plusError` and `minusError` must be equal (both may be absent)
    SymmetricErrors,
    /// The `unit` attribute, when present, must equal the given tag
    UnitEquals(&'static str),
    /// `ValueOf` must lie in the closed interval
    Range {
        label: &'static str,
        min: f64,
        max: f64,
    },
    /// Exactly one of the two elements must be present
    ExactlyOne(&'static str, &'static str),
    /// `CalibrationDate` or `CalibrationDateUnknown` must be present
    CalibrationDateKnown,
    /// Root `schemaVersion` and `xsi:schemaLocation` checks for the dialect
    RootSchema(Namespace),
}

/// Resolved metadata for one schema type
#[derive(Debug)]
pub struct SchemaNode {
    pub id: TypeId,
    pub name: &'static str,
    pub namespace: Namespace,
    pub extends: Option<TypeId>,
    pub supertype: Option<TypeId>,
    pub simple: bool,
    pub attributes: Vec<FieldSpec>,
    pub elements: Vec<FieldSpec>,
    pub rules: Vec<Rule>,
    element_namespaces: Vec<Namespace>,
    ext_type: Option<String>,
}

impl SchemaNode {
    pub fn attribute(&self, name: &str) -> Option<&FieldSpec> {
        self.attributes.iter().find(|f| f.name == name)
    }

    pub fn element(&self, name: &str) -> Option<&FieldSpec> {
        self.elements.iter().find(|f| f.name == name)
    }

    /// Attribute or element with the given name
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.attribute(name).or_else(|| self.element(name))
    }

    /// Elements in declaration order with the namespace each is written in
    pub fn elements_with_namespace(&self) -> impl Iterator<Item = (&FieldSpec, Namespace)> {
        self.elements
            .iter()
            .zip(self.element_namespaces.iter().copied())
    }

    /// Value of `xsi:type` an instance of this type carries by default
    pub fn ext_type(&self) -> Option<&str> {
        self.ext_type.as_deref()
    }

    /// Kind of the `ValueOf` pseudo-field for simple-content types
    pub fn simple_kind(&self) -> Option<Primitive> {
        if !self.simple {
            return None;
        }
        match self.element("ValueOf").map(|f| f.kind) {
            Some(Kind::Primitive(p)) => Some(p),
            _ => None,
        }
    }
}

static REGISTRY: OnceLock<BTreeMap<TypeId, SchemaNode>> = OnceLock::new();

fn registry() -> &'static BTreeMap<TypeId, SchemaNode> {
    REGISTRY.get_or_init(catalog::resolve_all)
}

/// Look up the resolved node for a type.
///
/// Every `TypeId` has a declaration; a missing one is a defect in the
/// catalogue, not a data error.
pub fn node(id: TypeId) -> &'static SchemaNode {
    match registry().get(&id) {
        Some(node) => node,
        None => panic!("schema type {:?} has no declaration", id),
    }
}

/// All resolved nodes, ordered by type id
pub fn nodes() -> impl Iterator<Item = &'static SchemaNode> {
    registry().values()
}

pub(crate) const TEXT: Kind = Kind::Primitive(Primitive::Text);
pub(crate) const INTEGER: Kind = Kind::Primitive(Primitive::Integer);
pub(crate) const DOUBLE: Kind = Kind::Primitive(Primitive::Double);
pub(crate) const BOOLEAN: Kind = Kind::Primitive(Primitive::Boolean);
pub(crate) const DATE: Kind = Kind::Primitive(Primitive::DateTime);
