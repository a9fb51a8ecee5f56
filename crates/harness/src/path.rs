//! Simple JSON property paths.
//!
//! Supports:
//! - `field` - Direct field access
//! - `field.nested` - Nested field access
//! - `field[0]` - Array index access
//! - `[0].field` - Index into a top-level array

use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment<'a> {
    Field(&'a str),
    Index(usize),
}

/// Splits a path into field and index segments.
///
/// Returns `None` for malformed paths (unclosed or non-numeric brackets).
fn segments(path: &str) -> Option<Vec<Segment<'_>>> {
    let mut out = Vec::new();
    for part in path.split('.') {
        let mut rest = part;
        if let Some(bracket_pos) = rest.find('[') {
            let field_name = &rest[..bracket_pos];
            if !field_name.is_empty() {
                out.push(Segment::Field(field_name));
            }
            rest = &rest[bracket_pos..];
            while let Some(stripped) = rest.strip_prefix('[') {
                let close = stripped.find(']')?;
                let index: usize = stripped[..close].parse().ok()?;
                out.push(Segment::Index(index));
                rest = &stripped[close + 1..];
            }
            if !rest.is_empty() {
                return None;
            }
        } else if !part.is_empty() {
            out.push(Segment::Field(part));
        }
    }
    Some(out)
}

/// Gets a value from a JSON document using a simple path notation.
///
/// An empty path returns the document itself.
pub fn get<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in segments(path)? {
        current = match segment {
            Segment::Field(name) => current.get(name)?,
            Segment::Index(index) => current.get(index)?,
        };
    }
    Some(current)
}

/// Sets a value at a path, creating intermediate objects as needed.
///
/// Returns false if the path crosses a non-object, an out-of-range index, or
/// is malformed.
pub fn set(value: &mut Value, path: &str, new_value: Value) -> bool {
    let Some(segments) = segments(path) else {
        return false;
    };
    let Some((last, parents)) = segments.split_last() else {
        *value = new_value;
        return true;
    };

    let mut current = value;
    for segment in parents {
        current = match segment {
            Segment::Field(name) => {
                let Some(object) = current.as_object_mut() else {
                    return false;
                };
                object
                    .entry(name.to_string())
                    .or_insert_with(|| Value::Object(Default::default()))
            }
            Segment::Index(index) => match current.get_mut(*index) {
                Some(next) => next,
                None => return false,
            },
        };
    }

    match last {
        Segment::Field(name) => match current.as_object_mut() {
            Some(object) => {
                object.insert(name.to_string(), new_value);
                true
            }
            None => false,
        },
        Segment::Index(index) => match current.get_mut(*index) {
            Some(slot) => {
                *slot = new_value;
                true
            }
            None => false,
        },
    }
}

/// Removes the value at a path, returning it if it was present.
pub fn remove(value: &mut Value, path: &str) -> Option<Value> {
    let segments = segments(path)?;
    let (last, parents) = segments.split_last()?;

    let mut current = value;
    for segment in parents {
        current = match segment {
            Segment::Field(name) => current.get_mut(*name)?,
            Segment::Index(index) => current.get_mut(*index)?,
        };
    }

    match last {
        Segment::Field(name) => current.as_object_mut()?.remove(*name),
        Segment::Index(index) => {
            let array = current.as_array_mut()?;
            (*index < array.len()).then(|| array.remove(*index))
        }
    }
}
