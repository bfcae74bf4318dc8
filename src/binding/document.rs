use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use super::build::build_document;
use super::export::export_xml;
use super::object::BoundObject;
use super::validate::validate;
use super::{Dialect, ValidationMode};
use crate::casting::render_datetime;
use crate::diagnostics::Diagnostics;
use crate::error::{BindingResult, NrlError, Result};

/// Parse and validate a StationXML document held in memory
pub fn parse_document(
    xml: &str,
    dialect: Dialect,
    mode: ValidationMode,
    diagnostics: &dyn Diagnostics,
) -> BindingResult<BoundObject> {
    let root = build_document(xml, dialect, diagnostics)?;
    mode.apply(validate(&root, diagnostics), diagnostics)?;
    Ok(root)
}

pub fn parse_file(
    path: &Path,
    dialect: Dialect,
    mode: ValidationMode,
    diagnostics: &dyn Diagnostics,
) -> Result<BoundObject> {
    let xml = fs::read_to_string(path)?;
    log::debug!("parsing {} as {:?}", path.display(), dialect);
    Ok(parse_document(&xml, dialect, mode, diagnostics)?)
}

pub fn write_file(
    root: &BoundObject,
    path: &Path,
    mode: ValidationMode,
    diagnostics: &dyn Diagnostics,
) -> Result<()> {
    let mut out = BufWriter::new(fs::File::create(path)?);
    export_xml(root, &mut out, mode, diagnostics).map_err(NrlError::from)?;
    out.flush()?;
    Ok(())
}

/// Identity of a channel epoch: `NET.STA.LOC.CHAN_<startDate>`.
/// A missing start date renders as the empty string.
pub fn channel_key(network: &BoundObject, station: &BoundObject, channel: &BoundObject) -> String {
    key_with_codes(
        network.text("code").unwrap_or(""),
        station.text("code").unwrap_or(""),
        channel,
    )
}

/// Channel key when only the network and station codes are at hand
pub(crate) fn key_with_codes(net_code: &str, sta_code: &str, channel: &BoundObject) -> String {
    format!(
        "{}.{}.{}.{}_{}",
        net_code,
        sta_code,
        channel.text("locationCode").unwrap_or(""),
        channel.text("code").unwrap_or(""),
        channel
            .datetime("startDate")
            .map(render_datetime)
            .unwrap_or_default()
    )
}

/// A channel together with the network and station that contain it
#[derive(Debug, Clone, Copy)]
pub struct ChannelRef<'a> {
    pub network: &'a BoundObject,
    pub station: &'a BoundObject,
    pub channel: &'a BoundObject,
}

impl<'a> ChannelRef<'a> {
    pub fn key(&self) -> String {
        channel_key(self.network, self.station, self.channel)
    }

    pub fn response(&self) -> Option<&'a BoundObject> {
        self.channel.object("Response")
    }

    pub fn code(&self) -> &'a str {
        self.channel.text("code").unwrap_or("")
    }
}

/// All channels of a document in document order
pub fn channels(root: &BoundObject) -> Vec<ChannelRef<'_>> {
    root.objects("Network")
        .flat_map(|network| {
            network.objects("Station").flat_map(move |station| {
                station.objects("Channel").map(move |channel| ChannelRef {
                    network,
                    station,
                    channel,
                })
            })
        })
        .collect()
}

pub fn find_channel<'a>(root: &'a BoundObject, key: &str) -> Option<ChannelRef<'a>> {
    channels(root).into_iter().find(|c| c.key() == key)
}

/// Call `f` with the key and a mutable reference for every channel
pub fn visit_channels_mut<F>(root: &mut BoundObject, mut f: F)
where
    F: FnMut(&str, &mut BoundObject),
{
    for network in root.objects_mut("Network") {
        let net_code = network.text("code").unwrap_or("").to_string();
        for station in network.objects_mut("Station") {
            let sta_code = station.text("code").unwrap_or("").to_string();
            for channel in station.objects_mut("Channel") {
                let key = key_with_codes(&net_code, &sta_code, channel);
                f(&key, channel);
            }
        }
    }
}

pub fn find_channel_mut<'a>(root: &'a mut BoundObject, key: &str) -> Option<&'a mut BoundObject> {
    root.objects_mut("Network")
        .flat_map(|network| {
            let net_code = network.text("code").unwrap_or("").to_string();
            network.objects_mut("Station").flat_map(move |station| {
                let sta_code = station.text("code").unwrap_or("").to_string();
                let net_code = net_code.clone();
                station
                    .objects_mut("Channel")
                    .map(move |channel| (key_with_codes(&net_code, &sta_code, channel), channel))
            })
        })
        .find_map(|(channel_key, channel)| (channel_key == key).then_some(channel))
}
