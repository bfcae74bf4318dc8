//! Schema-driven binding between StationXML documents and [`BoundObject`]
//! trees.
//!
//! Parsing walks the XML with `roxmltree` and fills objects according to
//! the static registry in [`crate::schema`]; export walks the registry's
//! field order and writes through `quick-xml` or into a JSON value.

mod build;
mod document;
mod export;
mod object;
mod validate;

use serde::{Deserialize, Serialize};

pub use build::build_document;
pub use document::{
    ChannelRef, channel_key, channels, find_channel, find_channel_mut, parse_document, parse_file,
    visit_channels_mut, write_file,
};
pub(crate) use document::key_with_codes;
pub use export::{export_dict, export_xml, export_xml_string};
pub use object::{BoundObject, Entry, Slot};
pub use validate::{validate, validate_node};

use crate::diagnostics::Diagnostics;
use crate::error::{BindingError, BindingResult};
use crate::schema::{Namespace, TypeId};

/// Tag of the document element in both dialects
pub const ROOT_TAG: &str = "FDSNStationXML";

/// Which root type a document is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// Plain FDSNStationXML 1.1
    Fdsn,
    /// ExtStationXML 3.0
    #[default]
    Ext,
}

impl Dialect {
    pub fn root_type(self) -> TypeId {
        match self {
            Dialect::Fdsn => TypeId::Root,
            Dialect::Ext => TypeId::SisRoot,
        }
    }

    pub fn namespace(self) -> Namespace {
        match self {
            Dialect::Fdsn => Namespace::Fsx,
            Dialect::Ext => Namespace::Sis,
        }
    }

    pub fn of(root: &BoundObject) -> Option<Self> {
        match root.type_id() {
            TypeId::Root => Some(Dialect::Fdsn),
            TypeId::SisRoot => Some(Dialect::Ext),
            _ => None,
        }
    }
}

impl std::str::FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fdsn" => Ok(Dialect::Fdsn),
            "ext" | "sis" => Ok(Dialect::Ext),
            other => Err(format!("unknown dialect: {}", other)),
        }
    }
}

/// How validation failures are handled while parsing or exporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationMode {
    /// Any validation failure aborts the operation
    #[default]
    Strict,
    /// Validation failures are reported as warnings and the operation continues
    Permissive,
}

impl ValidationMode {
    pub fn from_ignore_warnings(ignore: bool) -> Self {
        if ignore {
            ValidationMode::Permissive
        } else {
            ValidationMode::Strict
        }
    }

    pub(crate) fn apply(
        self,
        result: BindingResult<()>,
        diagnostics: &dyn Diagnostics,
    ) -> BindingResult<()> {
        match (self, result) {
            (_, Ok(())) => Ok(()),
            (ValidationMode::Strict, Err(e)) => Err(e),
            (ValidationMode::Permissive, Err(e)) => {
                diagnostics.warn("binding", &format!("Warning: {}", e));
                Ok(())
            }
        }
    }
}

pub(crate) fn require_dialect(root: &BoundObject, dialect: Dialect) -> BindingResult<()> {
    if Dialect::of(root) == Some(dialect) {
        Ok(())
    } else {
        Err(BindingError::DialectMismatch {
            found: root.schema().name.to_string(),
        })
    }
}
