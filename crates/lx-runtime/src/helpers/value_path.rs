use lx_core::ir::{FieldIr, FieldType};
use lx_core::Value;

pub(crate) fn assign_nested_path(target: &mut Value, path: &[String], value: Value) -> Result<(), String> {
    let Some((head, rest)) = path.split_first() else {
        *target = value;
        return Ok(());
    };

    let Value::Object(entries) = target else {
        return Err(format!("'{}' is not an object", head));
    };

    if rest.is_empty() {
        entries.insert(head.clone(), value);
        return Ok(());
    }

    match entries.get_mut(head) {
        Some(next) => assign_nested_path(next, rest, value),
        None => Err(format!("missing member '{}'", head)),
    }
}

/// Declared type of the member at `path` below `fields`.
pub(crate) fn field_type_at<'a>(fields: &'a [FieldIr], path: &[String]) -> Option<&'a FieldType> {
    let (head, rest) = path.split_first()?;
    let field = fields.iter().find(|field| &field.name == head)?;
    if rest.is_empty() {
        return Some(&field.field_type);
    }
    match &field.field_type {
        FieldType::Object { fields, .. } => field_type_at(fields, rest),
        _ => None,
    }
}
