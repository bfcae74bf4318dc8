use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::Dialect;
use crate::casting::Value;
use crate::error::{BindingError, BindingResult};
use crate::schema::{self, FieldSpec, Kind, Namespace, Primitive, SchemaNode, TypeId};

/// A primitive value or a nested object
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Value(Value),
    Object(BoundObject),
}

impl Entry {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Entry::Value(v) => Some(v),
            Entry::Object(_) => None,
        }
    }

    pub fn as_object(&self) -> Option<&BoundObject> {
        match self {
            Entry::Object(o) => Some(o),
            Entry::Value(_) => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut BoundObject> {
        match self {
            Entry::Object(o) => Some(o),
            Entry::Value(_) => None,
        }
    }
}

impl From<Value> for Entry {
    fn from(v: Value) -> Self {
        Entry::Value(v)
    }
}

impl From<BoundObject> for Entry {
    fn from(o: BoundObject) -> Self {
        Entry::Object(o)
    }
}

/// Storage for one field: single-valued, or an ordered sequence that may
/// contain null entries
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    Single(Entry),
    Repeated(Vec<Option<Entry>>),
}

impl Slot {
    /// Non-null entries in order
    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        let items: Box<dyn Iterator<Item = &Entry> + '_> = match self {
            Slot::Single(e) => Box::new(std::iter::once(e)),
            Slot::Repeated(list) => Box::new(list.iter().flatten()),
        };
        items
    }

    pub fn entries_mut(&mut self) -> impl Iterator<Item = &mut Entry> {
        let items: Box<dyn Iterator<Item = &mut Entry> + '_> = match self {
            Slot::Single(e) => Box::new(std::iter::once(e)),
            Slot::Repeated(list) => Box::new(list.iter_mut().flatten()),
        };
        items
    }
}

/// Runtime instance of a schema type.
///
/// Every stored field corresponds to an attribute or element declared for
/// the object's type; setters reject anything else.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundObject {
    type_id: TypeId,
    fields: BTreeMap<&'static str, Slot>,
}

impl BoundObject {
    /// Empty object; extension types start with their `xsi:type`
    pub fn new(type_id: TypeId) -> Self {
        let mut fields = BTreeMap::new();
        if let Some(ext) = schema::node(type_id).ext_type() {
            fields.insert("xsi:type", Slot::Single(Entry::Value(Value::from(ext))));
        }
        Self { type_id, fields }
    }

    /// Document root with the namespace and schema attributes of the dialect
    pub fn root(dialect: Dialect) -> Self {
        let mut root = Self::new(dialect.root_type());
        let ns = dialect.namespace();
        let mut defaults = vec![
            ("xmlns", Namespace::Fsx.uri().to_string()),
            ("xmlns:xsi", Namespace::Xsi.uri().to_string()),
            ("schemaVersion", ns.schema_version().to_string()),
            ("xsi:schemaLocation", ns.schema_location()),
        ];
        if dialect == Dialect::Ext {
            defaults.push(("xmlns:sis", Namespace::Sis.uri().to_string()));
        }
        for (name, value) in defaults {
            if let Some(spec) = root.schema().attribute(name) {
                root.fields
                    .insert(spec.name, Slot::Single(Entry::Value(Value::Text(value))));
            }
        }
        root
    }

    /// Copy of this object bound to a related type, such as an extension
    /// type and its base. Fields the target does not declare are dropped
    /// and the target's own `xsi:type` default applies.
    pub fn retyped(&self, type_id: TypeId) -> Self {
        let mut copy = Self::new(type_id);
        for (name, slot) in &self.fields {
            if *name == "xsi:type" {
                continue;
            }
            if let Some(spec) = copy.schema().field(name) {
                copy.fields.insert(spec.name, slot.clone());
            }
        }
        copy
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn schema(&self) -> &'static SchemaNode {
        schema::node(self.type_id)
    }

    fn spec(&self, name: &str) -> BindingResult<&'static FieldSpec> {
        self.schema()
            .field(name)
            .ok_or_else(|| BindingError::UnknownField {
                field: name.to_string(),
                path: self.schema().name.to_string(),
            })
    }

    fn check_entry(&self, spec: &FieldSpec, entry: Entry) -> BindingResult<Entry> {
        let mismatch = |found: String| BindingError::TypeMismatch {
            type_name: self.schema().name.to_string(),
            field: spec.name.to_string(),
            found,
        };
        match (spec.kind, entry) {
            (Kind::Primitive(Primitive::Double), Entry::Value(Value::Integer(i))) => {
                Ok(Entry::Value(Value::Double(i as f64)))
            }
            (Kind::Primitive(p), Entry::Value(v)) if v.primitive() == p => Ok(Entry::Value(v)),
            (Kind::Primitive(_), Entry::Value(v)) => Err(mismatch(v.primitive().name().to_string())),
            (Kind::Nested(id), Entry::Object(o)) if o.type_id == id => Ok(Entry::Object(o)),
            (_, Entry::Object(o)) => Err(mismatch(o.schema().name.to_string())),
            (Kind::Nested(_), Entry::Value(v)) => Err(mismatch(v.primitive().name().to_string())),
        }
    }

    /// Store a value or object, replacing what was there.
    /// Repeated fields are replaced by a one-element sequence.
    pub fn set(&mut self, name: &str, entry: impl Into<Entry>) -> BindingResult<()> {
        let spec = self.spec(name)?;
        let entry = self.check_entry(spec, entry.into())?;
        let slot = if spec.repeated {
            Slot::Repeated(vec![Some(entry)])
        } else {
            Slot::Single(entry)
        };
        self.fields.insert(spec.name, slot);
        Ok(())
    }

    /// Builder form of [`BoundObject::set`]
    pub fn with(mut self, name: &str, entry: impl Into<Entry>) -> BindingResult<Self> {
        self.set(name, entry)?;
        Ok(self)
    }

    /// Append to a repeated field; single fields are overwritten
    pub fn push(&mut self, name: &str, entry: impl Into<Entry>) -> BindingResult<()> {
        let spec = self.spec(name)?;
        let entry = self.check_entry(spec, entry.into())?;
        self.push_checked(spec, Some(entry));
        Ok(())
    }

    /// Append a null entry to a repeated field
    pub fn push_null(&mut self, name: &str) -> BindingResult<()> {
        let spec = self.spec(name)?;
        if !spec.repeated {
            return Err(BindingError::TypeMismatch {
                type_name: self.schema().name.to_string(),
                field: spec.name.to_string(),
                found: "null".to_string(),
            });
        }
        self.push_checked(spec, None);
        Ok(())
    }

    pub(super) fn push_checked(&mut self, spec: &'static FieldSpec, entry: Option<Entry>) {
        if !spec.repeated {
            match entry {
                Some(e) => {
                    self.fields.insert(spec.name, Slot::Single(e));
                }
                None => {
                    self.fields.remove(spec.name);
                }
            }
            return;
        }
        match self.fields.get_mut(spec.name) {
            Some(Slot::Repeated(list)) => list.push(entry),
            _ => {
                self.fields.insert(spec.name, Slot::Repeated(vec![entry]));
            }
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Slot> {
        self.fields.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&Slot> {
        self.fields.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Slot> {
        self.fields.get_mut(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Populated fields in name order
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &Slot)> {
        self.fields.iter().map(|(k, v)| (*k, v))
    }

    pub fn fields_mut(&mut self) -> impl Iterator<Item = (&'static str, &mut Slot)> {
        self.fields.iter_mut().map(|(k, v)| (*k, v))
    }

    /// First non-null entry of a field
    fn first(&self, name: &str) -> Option<&Entry> {
        self.fields.get(name).and_then(|slot| slot.entries().next())
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.first(name).and_then(Entry::as_value)
    }

    pub fn object(&self, name: &str) -> Option<&BoundObject> {
        self.first(name).and_then(Entry::as_object)
    }

    pub fn object_mut(&mut self, name: &str) -> Option<&mut BoundObject> {
        self.fields
            .get_mut(name)
            .and_then(|slot| slot.entries_mut().next())
            .and_then(Entry::as_object_mut)
    }

    /// Non-null objects of a field in document order
    pub fn objects(&self, name: &str) -> impl Iterator<Item = &BoundObject> {
        self.fields
            .get(name)
            .into_iter()
            .flat_map(|slot| slot.entries())
            .filter_map(Entry::as_object)
    }

    pub fn objects_mut(&mut self, name: &str) -> impl Iterator<Item = &mut BoundObject> {
        self.fields
            .get_mut(name)
            .into_iter()
            .flat_map(|slot| slot.entries_mut())
            .filter_map(Entry::as_object_mut)
    }

    /// Non-null primitive values of a field in document order
    pub fn values(&self, name: &str) -> impl Iterator<Item = &Value> {
        self.fields
            .get(name)
            .into_iter()
            .flat_map(|slot| slot.entries())
            .filter_map(Entry::as_value)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.value(name).and_then(Value::as_str)
    }

    pub fn f64(&self, name: &str) -> Option<f64> {
        self.value(name).and_then(Value::as_f64)
    }

    pub fn i64(&self, name: &str) -> Option<i64> {
        self.value(name).and_then(Value::as_i64)
    }

    pub fn datetime(&self, name: &str) -> Option<&DateTime<Utc>> {
        self.value(name).and_then(Value::as_datetime)
    }

    /// `ValueOf` of a simple-content object as f64
    pub fn value_of(&self) -> Option<f64> {
        self.f64("ValueOf")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_types_start_with_xsi_type() {
        let chan = BoundObject::new(TypeId::SisChannel);
        assert_eq!(chan.text("xsi:type"), Some("sis:ChannelType"));
        let plain = BoundObject::new(TypeId::Channel);
        assert!(!plain.has("xsi:type"));
    }

    #[test]
    fn test_root_defaults() {
        let root = BoundObject::root(Dialect::Ext);
        assert_eq!(root.text("schemaVersion"), Some("3.0"));
        assert_eq!(
            root.text("xmlns:sis"),
            Some("http://anss-sis.scsn.org/xml/ext-stationxml/3.0")
        );
        let fdsn = BoundObject::root(Dialect::Fdsn);
        assert_eq!(fdsn.text("schemaVersion"), Some("1.1"));
        assert!(!fdsn.has("xmlns:sis"));
    }

    #[test]
    fn test_setters_check_field_and_kind() {
        let mut gain = BoundObject::new(TypeId::Gain);
        gain.set("Value", Value::Double(400.0)).unwrap();
        gain.set("Frequency", Value::Integer(1)).unwrap();
        assert_eq!(gain.f64("Frequency"), Some(1.0));

        let err = gain.set("Bogus", Value::Double(1.0)).unwrap_err();
        assert!(matches!(err, BindingError::UnknownField { .. }));

        let err = gain.set("Value", Value::from("high")).unwrap_err();
        assert!(matches!(err, BindingError::TypeMismatch { .. }));

        let mut stage = BoundObject::new(TypeId::ResponseStage);
        let err = stage
            .set("StageGain", BoundObject::new(TypeId::Decimation))
            .unwrap_err();
        assert!(matches!(err, BindingError::TypeMismatch { .. }));
        stage.set("StageGain", gain).unwrap();
        assert_eq!(stage.object("StageGain").and_then(|g| g.f64("Value")), Some(400.0));
    }

    #[test]
    fn test_repeated_fields_keep_order_and_nulls() {
        let mut pz = BoundObject::new(TypeId::PolesZeros);
        for n in 0..3 {
            let zero = BoundObject::new(TypeId::PoleZero)
                .with("number", Value::Integer(n))
                .unwrap();
            pz.push("Zero", zero).unwrap();
        }
        pz.push_null("Zero").unwrap();

        let numbers: Vec<_> = pz.objects("Zero").filter_map(|z| z.i64("number")).collect();
        assert_eq!(numbers, vec![0, 1, 2]);
        match pz.get("Zero") {
            Some(Slot::Repeated(list)) => assert_eq!(list.len(), 4),
            other => panic!("unexpected slot {:?}", other),
        }
        assert!(pz.push_null("PzTransferFunctionType").is_err());
    }

    #[test]
    fn test_single_field_last_write_wins() {
        let mut units = BoundObject::new(TypeId::Units);
        units.push("Name", Value::from("M/S")).unwrap();
        units.push("Name", Value::from("V")).unwrap();
        assert_eq!(units.text("Name"), Some("V"));
    }

    #[test]
    fn test_retyped_drops_undeclared_fields() {
        let poly = BoundObject::new(TypeId::SisPolynomial)
            .with("SISNamespace", Value::from("NRL"))
            .unwrap()
            .with("ApproximationType", Value::from("MACLAURIN"))
            .unwrap();
        assert_eq!(poly.text("xsi:type"), Some("sis:PolynomialType"));

        let plain = poly.retyped(TypeId::Polynomial);
        assert_eq!(plain.type_id(), TypeId::Polynomial);
        assert_eq!(plain.text("ApproximationType"), Some("MACLAURIN"));
        assert!(!plain.has("SISNamespace"));
        assert!(!plain.has("xsi:type"));
    }
}
