//! Field and shape primitives over attribute trees
//!
//! All operations address values with [`StatePath`] strings and are no-ops
//! when the addressed value is absent, so rules can run them on data that
//! is already in the target shape.

use serde_json::{Map, Value};

use crate::error::PathError;
use crate::path::{Segment, StatePath};

/// Value at `path`
///
/// # Errors
/// Returns [`PathError`] if `path` is malformed.
pub fn get<'a>(root: &'a Value, path: &str) -> Result<Option<&'a Value>, PathError> {
    let path: StatePath = path.parse()?;
    Ok(get_at(root, &path))
}

/// Value at a parsed path
#[must_use]
pub fn get_at<'a>(root: &'a Value, path: &StatePath) -> Option<&'a Value> {
    path.segments().iter().try_fold(root, |value, segment| match (value, segment) {
        (Value::Object(map), Segment::Key(key)) => map.get(key),
        (Value::Array(items), segment) => segment.as_index().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Mutable value at a parsed path
pub fn get_at_mut<'a>(root: &'a mut Value, path: &StatePath) -> Option<&'a mut Value> {
    path.segments().iter().try_fold(root, |value, segment| match (value, segment) {
        (Value::Object(map), Segment::Key(key)) => map.get_mut(key),
        (Value::Array(items), segment) => segment.as_index().and_then(|i| items.get_mut(i)),
        _ => None,
    })
}

/// Set the value at `path`, creating intermediate objects
///
/// # Errors
/// Returns [`PathError::NotContainer`] if a value on the path is a scalar or
/// an array index is out of range.
pub fn set(root: &mut Value, path: &str, value: Value) -> Result<(), PathError> {
    let path: StatePath = path.parse()?;
    set_at(root, &path, value)
}

/// [`set`] with a parsed path
///
/// # Errors
/// See [`set`].
pub fn set_at(root: &mut Value, path: &StatePath, value: Value) -> Result<(), PathError> {
    let Some((last, parents)) = path.segments().split_last() else {
        *root = value;
        return Ok(());
    };
    let not_container = || PathError::NotContainer(path.to_string());

    let mut current = root;
    for segment in parents {
        current = child_or_create(current, segment).ok_or_else(not_container)?;
    }
    if current.is_null() {
        *current = Value::Object(Map::new());
    }
    match (current, last) {
        (Value::Object(map), Segment::Key(key)) => {
            map.insert(key.clone(), value);
            Ok(())
        }
        (Value::Array(items), segment) => match segment.as_index() {
            Some(i) if i < items.len() => {
                items[i] = value;
                Ok(())
            }
            Some(i) if i == items.len() => {
                items.push(value);
                Ok(())
            }
            _ => Err(not_container()),
        },
        _ => Err(not_container()),
    }
}

fn child_or_create<'a>(current: &'a mut Value, segment: &Segment) -> Option<&'a mut Value> {
    if current.is_null() {
        *current = Value::Object(Map::new());
    }
    match (current, segment) {
        (Value::Object(map), Segment::Key(key)) => Some(map.entry(key.clone()).or_insert(Value::Null)),
        (Value::Array(items), segment) => segment.as_index().and_then(|i| items.get_mut(i)),
        _ => None,
    }
}

/// Remove and return the value at `path`
///
/// # Errors
/// Returns [`PathError`] if `path` is malformed.
pub fn remove(root: &mut Value, path: &str) -> Result<Option<Value>, PathError> {
    let path: StatePath = path.parse()?;
    Ok(remove_at(root, &path))
}

/// [`remove`] with a parsed path
pub fn remove_at(root: &mut Value, path: &StatePath) -> Option<Value> {
    let (last, _) = path.segments().split_last()?;
    let parent = get_at_mut(root, &path.parent()?)?;
    match (parent, last) {
        (Value::Object(map), Segment::Key(key)) => map.shift_remove(key),
        (Value::Array(items), segment) => {
            let i = segment.as_index().filter(|i| *i < items.len())?;
            Some(items.remove(i))
        }
        _ => None,
    }
}

/// Move the value at `from` to `to`
///
/// Returns `false` when `from` is absent. An existing value at `to` is
/// replaced.
///
/// # Errors
/// Returns [`PathError`] if a path is malformed or `to` cannot be created.
pub fn rename(root: &mut Value, from: &str, to: &str) -> Result<bool, PathError> {
    let from: StatePath = from.parse()?;
    let to: StatePath = to.parse()?;
    if from == to {
        return Ok(get_at(root, &from).is_some());
    }
    match remove_at(root, &from) {
        Some(value) => set_at(root, &to, value).map(|()| true),
        None => Ok(false),
    }
}

/// Copy the value at `from` to `to`, returning `false` when `from` is absent
///
/// # Errors
/// Returns [`PathError`] if a path is malformed or `to` cannot be created.
pub fn copy(root: &mut Value, from: &str, to: &str) -> Result<bool, PathError> {
    let from: StatePath = from.parse()?;
    let to: StatePath = to.parse()?;
    match get_at(root, &from).cloned() {
        Some(value) => set_at(root, &to, value).map(|()| true),
        None => Ok(false),
    }
}

/// What to put in place of an empty singleton array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyPolicy {
    /// `[]` becomes `null`
    #[default]
    Null,
    /// `[]` becomes `{}`
    EmptyObject,
    /// `[]` is removed
    Remove,
}

/// Outcome of a singleton normalization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Singleton {
    /// The shape was changed
    Changed,
    /// The value already had the target shape
    Unchanged,
    /// Nothing at the path
    Absent,
    /// An array with more than one element cannot become one object
    TooMany(usize),
}

/// `[x]` becomes `x`; `[]` is handled per `policy`
///
/// # Errors
/// Returns [`PathError`] if `path` is malformed.
pub fn unwrap_singleton(root: &mut Value, path: &str, policy: EmptyPolicy) -> Result<Singleton, PathError> {
    let path: StatePath = path.parse()?;
    let Some(value) = get_at_mut(root, &path) else {
        return Ok(Singleton::Absent);
    };
    let Value::Array(items) = &mut *value else {
        return Ok(Singleton::Unchanged);
    };
    match items.len() {
        0 => {}
        1 => {
            let item = items.remove(0);
            *value = item;
            return Ok(Singleton::Changed);
        }
        n => return Ok(Singleton::TooMany(n)),
    }
    match policy {
        EmptyPolicy::Null => *value = Value::Null,
        EmptyPolicy::EmptyObject => *value = Value::Object(Map::new()),
        EmptyPolicy::Remove => {
            remove_at(root, &path);
        }
    }
    Ok(Singleton::Changed)
}

/// `x` becomes `[x]`; `null` and `{}` become `[]`
///
/// # Errors
/// Returns [`PathError`] if `path` is malformed.
pub fn wrap_singleton(root: &mut Value, path: &str) -> Result<Singleton, PathError> {
    let path: StatePath = path.parse()?;
    let Some(value) = get_at_mut(root, &path) else {
        return Ok(Singleton::Absent);
    };
    let wrapped = match &mut *value {
        Value::Array(_) => return Ok(Singleton::Unchanged),
        Value::Null => Vec::new(),
        Value::Object(map) if map.is_empty() => Vec::new(),
        other => vec![other.take()],
    };
    *value = Value::Array(wrapped);
    Ok(Singleton::Changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn get_and_set_nested() {
        let mut v = json!({"a": {"list": [{"x": 1}]}});
        assert_eq!(get(&v, "a.list[0].x").unwrap(), Some(&json!(1)));
        assert_eq!(get(&v, "a.list.0.x").unwrap(), Some(&json!(1)));
        assert_eq!(get(&v, "a.missing").unwrap(), None);

        set(&mut v, "a.list[0].y", json!(2)).unwrap();
        set(&mut v, "b.c.d", json!(true)).unwrap();
        set(&mut v, "a.list[1]", json!({})).unwrap();
        assert_eq!(v, json!({"a": {"list": [{"x": 1, "y": 2}, {}]}, "b": {"c": {"d": true}}}));

        assert!(matches!(set(&mut v, "a.list[0].x.z", json!(1)), Err(PathError::NotContainer(_))));
        assert!(matches!(set(&mut v, "a.list[5]", json!(1)), Err(PathError::NotContainer(_))));
    }

    #[test]
    fn rename_and_remove_are_noops_when_absent() {
        let mut v = json!({"zones": [1, 2], "keep": "k"});
        assert!(rename(&mut v, "zones", "result").unwrap());
        assert!(!rename(&mut v, "zones", "result").unwrap());
        assert_eq!(v, json!({"keep": "k", "result": [1, 2]}));

        assert_eq!(remove(&mut v, "result[0]").unwrap(), Some(json!(1)));
        assert_eq!(remove(&mut v, "nope").unwrap(), None);
        assert!(copy(&mut v, "keep", "copy.of").unwrap());
        assert_eq!(v, json!({"keep": "k", "result": [2], "copy": {"of": "k"}}));
    }

    #[test]
    fn remove_keeps_key_order() {
        let mut v = json!({"a": 1, "b": 2, "c": 3});
        remove(&mut v, "a").unwrap();
        let keys: Vec<&String> = v.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["b", "c"]);
    }

    #[test]
    fn unwrap_singletons() {
        let mut v = json!({"shield": [{"x": 1}], "empty": [], "gone": [], "many": [1, 2], "obj": {}});
        assert_eq!(unwrap_singleton(&mut v, "shield", EmptyPolicy::Null).unwrap(), Singleton::Changed);
        assert_eq!(unwrap_singleton(&mut v, "shield", EmptyPolicy::Null).unwrap(), Singleton::Unchanged);
        assert_eq!(unwrap_singleton(&mut v, "empty", EmptyPolicy::EmptyObject).unwrap(), Singleton::Changed);
        assert_eq!(unwrap_singleton(&mut v, "gone", EmptyPolicy::Remove).unwrap(), Singleton::Changed);
        assert_eq!(unwrap_singleton(&mut v, "many", EmptyPolicy::Null).unwrap(), Singleton::TooMany(2));
        assert_eq!(unwrap_singleton(&mut v, "absent", EmptyPolicy::Null).unwrap(), Singleton::Absent);
        assert_eq!(v, json!({"shield": {"x": 1}, "empty": {}, "many": [1, 2], "obj": {}}));
    }

    #[test]
    fn wrap_singletons() {
        let mut v = json!({"shield": {"x": 1}, "none": null, "obj": {}, "list": [1]});
        assert_eq!(wrap_singleton(&mut v, "shield").unwrap(), Singleton::Changed);
        assert_eq!(wrap_singleton(&mut v, "none").unwrap(), Singleton::Changed);
        assert_eq!(wrap_singleton(&mut v, "obj").unwrap(), Singleton::Changed);
        assert_eq!(wrap_singleton(&mut v, "list").unwrap(), Singleton::Unchanged);
        assert_eq!(v, json!({"shield": [{"x": 1}], "none": [], "obj": [], "list": [1]}));
    }
}
