use std::io::Write;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use serde_json::{Map, Number, Value as Json};

use super::object::{BoundObject, Entry, Slot};
use super::validate::validate_node;
use super::{ROOT_TAG, ValidationMode};
use crate::casting::{Value, render, render_datetime};
use crate::diagnostics::Diagnostics;
use crate::error::{BindingError, BindingResult};
use crate::schema::FieldSpec;

const TARGET: &str = "export";

/// Write a document as XML.
///
/// Each object is validated as it is reached; in permissive mode failures
/// are reported and writing continues.
pub fn export_xml<W: Write>(
    root: &BoundObject,
    sink: W,
    mode: ValidationMode,
    diagnostics: &dyn Diagnostics,
) -> BindingResult<()> {
    let mut xml = XmlExporter {
        writer: Writer::new_with_indent(sink, b' ', 2),
        mode,
        diagnostics,
    };
    xml.emit(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    xml.write_object(root, ROOT_TAG)?;
    xml.writer
        .get_mut()
        .write_all(b"\n")
        .map_err(|e| BindingError::Write(e.to_string()))
}

pub fn export_xml_string(
    root: &BoundObject,
    mode: ValidationMode,
    diagnostics: &dyn Diagnostics,
) -> BindingResult<String> {
    let mut buf = Vec::new();
    export_xml(root, &mut buf, mode, diagnostics)?;
    String::from_utf8(buf).map_err(|e| BindingError::Write(e.to_string()))
}

struct XmlExporter<'d, W: Write> {
    writer: Writer<W>,
    mode: ValidationMode,
    diagnostics: &'d dyn Diagnostics,
}

impl<W: Write> XmlExporter<'_, W> {
    fn emit(&mut self, event: Event<'_>) -> BindingResult<()> {
        self.writer
            .write_event(event)
            .map_err(|e| BindingError::Write(e.to_string()))
    }

    fn write_object(&mut self, obj: &BoundObject, tag: &str) -> BindingResult<()> {
        self.mode
            .apply(validate_node(obj, self.diagnostics), self.diagnostics)?;

        let schema = obj.schema();
        let mut start = BytesStart::new(tag);
        for spec in &schema.attributes {
            if let Some(value) = obj.value(spec.name) {
                let text = render(value, spec.format);
                start.push_attribute((spec.name, text.as_str()));
            }
        }

        if schema.simple {
            let text = match (obj.value("ValueOf"), schema.element("ValueOf")) {
                (Some(value), Some(spec)) => render(value, spec.format),
                _ => String::new(),
            };
            self.emit(Event::Start(start))?;
            self.emit(Event::Text(BytesText::new(&text)))?;
            return self.emit(Event::End(BytesEnd::new(tag)));
        }

        self.emit(Event::Start(start))?;
        for (spec, ns) in schema.elements_with_namespace() {
            let Some(slot) = obj.get(spec.name) else {
                continue;
            };
            let child_tag = match ns.output_prefix() {
                Some(prefix) if prefix != "xsi" => format!("{}:{}", prefix, spec.name),
                _ => spec.name.to_string(),
            };
            match slot {
                Slot::Single(entry) => self.write_entry(spec, entry, &child_tag)?,
                Slot::Repeated(list) => {
                    for item in list {
                        match item {
                            Some(entry) => self.write_entry(spec, entry, &child_tag)?,
                            None => self.diagnostics.warn(
                                TARGET,
                                &format!("found None in list for {}, skipping", spec.name),
                            ),
                        }
                    }
                }
            }
        }
        self.emit(Event::End(BytesEnd::new(tag)))
    }

    fn write_entry(&mut self, spec: &FieldSpec, entry: &Entry, tag: &str) -> BindingResult<()> {
        match entry {
            Entry::Object(child) => self.write_object(child, tag),
            Entry::Value(value) => {
                let text = render(value, spec.format);
                self.emit(Event::Start(BytesStart::new(tag)))?;
                self.emit(Event::Text(BytesText::new(&text)))?;
                self.emit(Event::End(BytesEnd::new(tag)))
            }
        }
    }
}

/// Convert a document to nested JSON maps.
///
/// Keys follow declaration order, elements before attributes. Null entries
/// of repeated primitives are kept as `null`; null objects are skipped with
/// a warning.
pub fn export_dict(
    obj: &BoundObject,
    mode: ValidationMode,
    diagnostics: &dyn Diagnostics,
) -> BindingResult<Json> {
    mode.apply(validate_node(obj, diagnostics), diagnostics)?;

    let schema = obj.schema();
    let mut map = Map::new();
    for spec in schema.elements.iter().chain(schema.attributes.iter()) {
        let Some(slot) = obj.get(spec.name) else {
            continue;
        };
        let json = match slot {
            Slot::Single(entry) => entry_to_json(entry, mode, diagnostics)?,
            Slot::Repeated(list) => {
                let mut items = Vec::with_capacity(list.len());
                for item in list {
                    match item {
                        Some(entry) => items.push(entry_to_json(entry, mode, diagnostics)?),
                        None if spec.nested_type().is_none() => items.push(Json::Null),
                        None => diagnostics.warn(
                            TARGET,
                            &format!("found None in list for {}, skipping", spec.name),
                        ),
                    }
                }
                Json::Array(items)
            }
        };
        map.insert(spec.name.to_string(), json);
    }
    Ok(Json::Object(map))
}

fn entry_to_json(
    entry: &Entry,
    mode: ValidationMode,
    diagnostics: &dyn Diagnostics,
) -> BindingResult<Json> {
    match entry {
        Entry::Object(child) => export_dict(child, mode, diagnostics),
        Entry::Value(value) => Ok(value_to_json(value)),
    }
}

fn value_to_json(value: &Value) -> Json {
    match value {
        Value::Text(s) => Json::String(s.clone()),
        Value::Integer(i) => Json::Number((*i).into()),
        Value::Double(d) => Number::from_f64(*d).map(Json::Number).unwrap_or(Json::Null),
        Value::Boolean(b) => Json::Bool(*b),
        Value::DateTime(dt) => Json::String(render_datetime(dt)),
    }
}
