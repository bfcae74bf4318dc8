//! Conversion of plain FDSNStationXML into an ExtStationXML document.
//!
//! Every object is rebound to the extension type its parent field holds,
//! so a network becomes a `SISNetworkType`, its stations `SISStationType`
//! and so on down to instrument polynomials. Channels can be filtered on
//! the way, and the result can then be linked to the NRL with
//! [`crate::rewrite::link_library_responses`].

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;

use crate::binding::{BoundObject, Dialect, Entry, Slot, channels, key_with_codes};
use crate::casting::Value;
use crate::diagnostics::Diagnostics;
use crate::error::BindingResult;
use crate::schema::{FieldSpec, TypeId};

const TARGET: &str = "convert";

/// Value written to the root `Module` element
pub const MODULE: &str = concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION"));

/// Attribute holding the extension namespace of named objects
const SIS_NAMESPACE: &str = "SISNamespace";

#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Replaces `Source` and `Sender`, and names the namespace of converted
    /// polynomials. Without it the network code is used for the latter.
    pub namespace: Option<String>,
    /// Keep only channels whose code, or `LOC.CODE` with an empty location
    /// written as `--`, matches at the start
    pub only_channels: Option<Regex>,
    /// Remove channels still operating at `now`
    pub drop_current: bool,
    pub now: DateTime<Utc>,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            namespace: None,
            only_channels: None,
            drop_current: false,
            now: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConvertSummary {
    /// Channels in the converted document
    pub channels: usize,
    /// Removed channel keys and why
    pub removed: BTreeMap<String, String>,
    /// `Type.field` pairs present in the input that the extension types
    /// do not declare
    pub dropped_fields: BTreeSet<String>,
}

/// Why a channel is left out, if it is
fn removal_reason(
    channel: &BoundObject,
    options: &ConvertOptions,
) -> Option<&'static str> {
    if let Some(pattern) = &options.only_channels {
        let code = channel.text("code").unwrap_or("");
        let loc = match channel.text("locationCode") {
            Some(loc) if !loc.is_empty() => loc,
            _ => "--",
        };
        let matches_at_start =
            |text: &str| pattern.find(text).is_some_and(|m| m.start() == 0);
        if !matches_at_start(code) && !matches_at_start(&format!("{}.{}", loc, code)) {
            return Some("does not match --only-channels");
        }
    }
    if options.drop_current {
        // an open-ended epoch is still operating
        let operating = channel
            .datetime("endDate")
            .is_none_or(|end| *end > options.now);
        if operating {
            return Some("currently operating");
        }
    }
    None
}

fn filter_channels(root: &mut BoundObject, options: &ConvertOptions, summary: &mut ConvertSummary) {
    for network in root.objects_mut("Network") {
        let net_code = network.text("code").unwrap_or("").to_string();
        for station in network.objects_mut("Station") {
            let sta_code = station.text("code").unwrap_or("").to_string();
            let Some(Slot::Repeated(list)) = station.get_mut("Channel") else {
                continue;
            };
            list.retain(|entry| {
                let Some(channel) = entry.as_ref().and_then(Entry::as_object) else {
                    return true;
                };
                match removal_reason(channel, options) {
                    Some(reason) => {
                        let key = key_with_codes(&net_code, &sta_code, channel);
                        log::debug!("removing {}: {}", key, reason);
                        summary.removed.insert(key, reason.to_string());
                        false
                    }
                    None => true,
                }
            });
        }
    }
}

/// Rebinds objects and their descendants to the types their parent
/// fields declare
struct Conformer<'a> {
    namespace: Option<&'a str>,
    dropped: BTreeSet<String>,
}

impl Conformer<'_> {
    fn conform(
        &mut self,
        obj: &BoundObject,
        target: TypeId,
        network: &str,
    ) -> BindingResult<BoundObject> {
        let network = match (target, obj.text("code")) {
            (TypeId::SisNetwork, Some(code)) => code,
            _ => network,
        };
        let mut converted = obj.retyped(target);
        for (name, _) in obj.fields() {
            if name != "xsi:type" && !converted.has(name) {
                self.dropped.insert(format!("{}.{}", obj.schema().name, name));
            }
        }
        if converted.schema().attribute(SIS_NAMESPACE).is_some() && !converted.has(SIS_NAMESPACE) {
            let namespace = self.namespace.unwrap_or(network);
            converted.set(SIS_NAMESPACE, Value::from(namespace))?;
        }

        let schema = converted.schema();
        for (name, slot) in converted.fields_mut() {
            let Some(nested) = schema.field(name).and_then(FieldSpec::nested_type) else {
                continue;
            };
            for entry in slot.entries_mut() {
                if let Entry::Object(child) = entry
                    && child.type_id() != nested
                {
                    *child = self.conform(child, nested, network)?;
                }
            }
        }
        Ok(converted)
    }
}

/// Convert a document to the extension dialect. The input is left
/// untouched; an extension document is only filtered and restamped.
pub fn convert_to_extended(
    root: &BoundObject,
    options: &ConvertOptions,
    diagnostics: &dyn Diagnostics,
) -> BindingResult<(BoundObject, ConvertSummary)> {
    let mut summary = ConvertSummary::default();
    let mut source = root.clone();
    filter_channels(&mut source, options, &mut summary);

    let mut conformer = Conformer {
        namespace: options.namespace.as_deref(),
        dropped: BTreeSet::new(),
    };
    let mut converted = conformer.conform(&source, Dialect::Ext.root_type(), "")?;
    summary.dropped_fields = conformer.dropped;

    // header attributes of the extension dialect replace the input's
    for (name, slot) in BoundObject::root(Dialect::Ext).fields() {
        if let Slot::Single(entry) = slot
            && name != "xsi:type"
        {
            converted.set(name, entry.clone())?;
        }
    }
    if let Some(namespace) = &options.namespace {
        converted.set("Source", Value::from(namespace.as_str()))?;
        converted.set("Sender", Value::from(namespace.as_str()))?;
    }
    converted.set("Module", Value::from(MODULE))?;
    converted.set("Created", Value::DateTime(options.now))?;

    for field in &summary.dropped_fields {
        diagnostics.warn(TARGET, &format!("{} has no extension counterpart, dropped", field));
    }
    summary.channels = channels(&converted).len();
    log::info!(
        "converted {} channels, removed {}",
        summary.channels,
        summary.removed.len()
    );
    Ok((converted, summary))
}
