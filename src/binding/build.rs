use roxmltree::{Document, Node};

use super::object::{BoundObject, Entry};
use super::{Dialect, ROOT_TAG};
use crate::casting::{Value, cast_from_text};
use crate::diagnostics::Diagnostics;
use crate::error::{BindingError, BindingResult};
use crate::schema::{FieldSpec, Kind, Namespace, Primitive};

const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";
const TARGET: &str = "binding";

/// Parse XML text and bind the root element to the dialect's root type.
///
/// The tree is not validated; see [`super::parse_document`] for the
/// validating entry point.
pub fn build_document(
    xml: &str,
    dialect: Dialect,
    diagnostics: &dyn Diagnostics,
) -> BindingResult<BoundObject> {
    let doc = Document::parse(xml)?;
    let root = doc.root_element();
    let tag = root.tag_name().name();
    if tag != ROOT_TAG {
        return Err(BindingError::UnexpectedRoot {
            found: tag.to_string(),
        });
    }

    report_unknown_namespaces(root, diagnostics);

    let builder = Builder { diagnostics };
    let mut obj = BoundObject::root(dialect);
    builder.build_into(root, &mut obj, ROOT_TAG)?;
    Ok(obj)
}

fn report_unknown_namespaces(root: Node<'_, '_>, diagnostics: &dyn Diagnostics) {
    for ns in root.namespaces() {
        let uri = ns.uri();
        if uri == XML_NAMESPACE || Namespace::from_uri(uri).is_some() {
            continue;
        }
        diagnostics.warn(
            TARGET,
            &format!(
                "Unknown/unexpected namespace: {}: {}. Elements in this namespace will be ignored.",
                ns.name().unwrap_or(""),
                uri
            ),
        );
    }
}

/// Rewrite a `prefix:Type` reference through the prefixes in scope at
/// `node` to the prefix this crate writes, e.g. `ns2:ChannelType` becomes
/// `sis:ChannelType`. References to unknown namespaces are kept verbatim.
fn remap_type(node: Node<'_, '_>, value: &str) -> String {
    let (prefix, local) = match value.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, value),
    };
    match node
        .lookup_namespace_uri(prefix)
        .and_then(Namespace::from_uri)
    {
        Some(ns) => match ns.output_prefix() {
            Some(p) => format!("{}:{}", p, local),
            None => local.to_string(),
        },
        None => value.to_string(),
    }
}

fn primitive_of(spec: &FieldSpec) -> Primitive {
    match spec.kind {
        Kind::Primitive(p) => p,
        Kind::Nested(_) => Primitive::Text,
    }
}

struct Builder<'d> {
    diagnostics: &'d dyn Diagnostics,
}

impl Builder<'_> {
    fn build_into(&self, node: Node<'_, '_>, obj: &mut BoundObject, path: &str) -> BindingResult<()> {
        self.read_attributes(node, obj, path)?;

        let schema = obj.schema();
        if schema.simple {
            let kind = schema.simple_kind().unwrap_or(Primitive::Text);
            let text = node.text().map(str::trim).unwrap_or("");
            let value = cast_from_text(kind, text, path)?;
            if let Some(spec) = schema.element("ValueOf") {
                obj.push_checked(spec, value.map(Entry::Value));
            }
            return Ok(());
        }

        for child in node.children().filter(|n| n.is_element()) {
            self.build_child(child, obj, path)?;
        }
        Ok(())
    }

    fn read_attributes(&self, node: Node<'_, '_>, obj: &mut BoundObject, path: &str) -> BindingResult<()> {
        let schema = obj.schema();
        for attr in node.attributes() {
            let key = match attr.namespace() {
                None => attr.name().to_string(),
                Some(uri) => match Namespace::from_uri(uri) {
                    Some(ns) => format!("{}:{}", ns.key(), attr.name()),
                    None => {
                        self.diagnostics.debug(
                            TARGET,
                            &format!("ignoring attribute {{{}}}{} in {}", uri, attr.name(), path),
                        );
                        continue;
                    }
                },
            };

            let Some(spec) = schema.attribute(&key) else {
                if schema.simple && attr.namespace().is_none() {
                    return Err(BindingError::UnexpectedAttribute {
                        name: key,
                        value: attr.value().to_string(),
                        path: path.to_string(),
                    });
                }
                self.diagnostics
                    .debug(TARGET, &format!("ignoring attribute {} in {}", key, path));
                continue;
            };

            let value = if spec.name == "xsi:type" {
                Some(Value::Text(remap_type(node, attr.value())))
            } else {
                cast_from_text(primitive_of(spec), attr.value(), &format!("{}/@{}", path, key))?
            };
            obj.push_checked(spec, value.map(Entry::Value));
        }
        Ok(())
    }

    fn build_child(&self, child: Node<'_, '_>, obj: &mut BoundObject, path: &str) -> BindingResult<()> {
        let name = child.tag_name().name();
        if child
            .tag_name()
            .namespace()
            .and_then(Namespace::from_uri)
            .is_none()
        {
            self.diagnostics.debug(
                TARGET,
                &format!("skipping {} in unknown namespace under {}", name, path),
            );
            return Ok(());
        }

        let Some(spec) = obj.schema().element(name) else {
            return Err(BindingError::UnknownField {
                field: name.to_string(),
                path: path.to_string(),
            });
        };

        let child_path = format!("{}/{}", path, name);
        let entry = match spec.kind {
            Kind::Primitive(p) => {
                let text = child.text().map(str::trim).unwrap_or("");
                cast_from_text(p, text, &child_path)?.map(Entry::Value)
            }
            Kind::Nested(id) => {
                let mut nested = BoundObject::new(id);
                self.check_declared_type(child, &nested);
                self.build_into(child, &mut nested, &child_path)?;
                Some(Entry::Object(nested))
            }
        };
        obj.push_checked(spec, entry);
        Ok(())
    }

    /// Warn when the element's `xsi:type` names a different type than the
    /// one it is bound to
    fn check_declared_type(&self, node: Node<'_, '_>, target: &BoundObject) {
        let declared = node
            .attributes()
            .find(|a| a.namespace() == Some(Namespace::Xsi.uri()) && a.name() == "type")
            .map(|a| remap_type(node, a.value()));
        if let Some(declared) = declared {
            let schema = target.schema();
            let expected = schema.ext_type().unwrap_or(schema.name);
            if declared != expected {
                self.diagnostics.warn(
                    TARGET,
                    &format!("Type defined in xml {}, expected {}", declared, expected),
                );
            }
        }
    }
}
