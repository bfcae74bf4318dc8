use super::object::{BoundObject, Entry, Slot};
use crate::diagnostics::Diagnostics;
use crate::error::{BindingError, BindingResult};
use crate::schema::{FieldSpec, Presence, Rule};

/// Check required fields and domain rules of one object, not its children
pub fn validate_node(obj: &BoundObject, diagnostics: &dyn Diagnostics) -> BindingResult<()> {
    let schema = obj.schema();

    for spec in schema.attributes.iter().chain(schema.elements.iter()) {
        if spec.is_required() && !is_present(obj, spec) {
            let field = if spec.name == "ValueOf" {
                String::new()
            } else {
                format!(" > {}", spec.name)
            };
            return Err(BindingError::MissingRequiredField {
                type_name: schema.name.to_string(),
                field,
            });
        }
    }

    for rule in &schema.rules {
        check_rule(obj, rule, diagnostics)?;
    }
    Ok(())
}

/// Validate an object and every object nested below it, depth first
pub fn validate(obj: &BoundObject, diagnostics: &dyn Diagnostics) -> BindingResult<()> {
    validate_node(obj, diagnostics)?;
    for (_, slot) in obj.fields() {
        for entry in slot.entries() {
            if let Entry::Object(child) = entry {
                validate(child, diagnostics)?;
            }
        }
    }
    Ok(())
}

fn is_present(obj: &BoundObject, spec: &FieldSpec) -> bool {
    match obj.get(spec.name) {
        None => false,
        Some(Slot::Single(Entry::Value(v))) => {
            spec.presence == Presence::RequiredMayBeEmpty || !v.is_blank()
        }
        Some(Slot::Single(Entry::Object(_))) => true,
        Some(Slot::Repeated(list)) => !list.is_empty(),
    }
}

fn rule_error(obj: &BoundObject, message: String) -> BindingError {
    BindingError::DomainRule {
        type_name: obj.schema().name.to_string(),
        message,
    }
}

fn check_rule(obj: &BoundObject, rule: &Rule, diagnostics: &dyn Diagnostics) -> BindingResult<()> {
    match *rule {
        Rule::SymmetricErrors => {
            let plus = obj.f64("plusError");
            let minus = obj.f64("minusError");
            if plus != minus {
                return Err(rule_error(
                    obj,
                    format!(
                        "The plus error and minus error are different. The loader requires them to be the same. plus error {:?}, minus error {:?}",
                        plus, minus
                    ),
                ));
            }
        }
        Rule::UnitEquals(expected) => {
            if let Some(unit) = obj.text("unit")
                && unit != expected
            {
                return Err(rule_error(
                    obj,
                    format!("unit should be {}. Invalid value {}", expected, unit),
                ));
            }
        }
        Rule::Range { label, min, max } => {
            if let Some(v) = obj.value_of()
                && (v < min || v > max)
            {
                return Err(rule_error(obj, format!("Invalid {}: {}", label, v)));
            }
        }
        Rule::ExactlyOne(a, b) => {
            if obj.has(a) == obj.has(b) {
                return Err(rule_error(obj, format!("Specify either {} or {}", a, b)));
            }
        }
        Rule::CalibrationDateKnown => {
            if !obj.has("CalibrationDate") && !obj.has("CalibrationDateUnknown") {
                return Err(rule_error(
                    obj,
                    "If calibration date is not known, then provide element CalibrationDateUnknown with value true"
                        .to_string(),
                ));
            }
        }
        Rule::RootSchema(ns) => {
            if let Some(version) = obj.text("schemaVersion")
                && !version.is_empty()
                && version != ns.schema_version()
            {
                return Err(rule_error(
                    obj,
                    format!(
                        "Invalid schemaVersion {}. Parser expects {}",
                        version,
                        ns.schema_version()
                    ),
                ));
            }
            let expected = ns.schema_location();
            let location = obj.text("xsi:schemaLocation").unwrap_or("");
            if location != expected {
                diagnostics.warn(
                    "binding",
                    &format!(
                        "Invalid xsi:schemaLocation {}. Parser expects {}",
                        location, expected
                    ),
                );
            }
        }
    }
    Ok(())
}
