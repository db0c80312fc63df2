use serde_json::{Map, Value};

use crate::config::ConfigError;

/// Configuration document: a JSON object addressed by path.
///
/// Path segments are separated by `|` or `.`; empty segments are ignored, so
/// `Twin|desired|LogLevel` and `Twin.desired.LogLevel` name the same value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConfigDocument {
    root: Map<String, Value>,
}

impl ConfigDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a JSON value; only objects are valid documents.
    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        match value {
            Value::Object(root) => Ok(Self { root }),
            other => Err(ConfigError::InvalidDocument(format!(
                "expected a JSON object, got {}",
                type_name(&other)
            ))),
        }
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.root.clone())
    }

    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let mut segs = segments(path);
        let mut cur = self.root.get(segs.next()?)?;
        for seg in segs {
            cur = cur.as_object()?.get(seg)?;
        }
        Some(cur)
    }

    #[inline]
    pub fn contains(&self, path: &str) -> bool {
        self.lookup(path).is_some()
    }

    /// Typed read: `None` when the path is absent or the value cannot be coerced.
    pub fn get<T: FromConfigValue>(&self, path: &str) -> Option<T> {
        self.lookup(path).and_then(T::from_config_value)
    }

    /// Typed read with a fallback; never fails.
    pub fn get_or<T: FromConfigValue>(&self, path: &str, default: T) -> T {
        self.get(path).unwrap_or(default)
    }

    /// Set a value, creating (or overwriting non-object) intermediate nodes.
    pub fn set(&mut self, path: &str, value: impl Into<Value>) {
        let segs: Vec<&str> = segments(path).collect();
        let Some((last, parents)) = segs.split_last() else {
            return;
        };
        let parent = object_at_mut(&mut self.root, parents);
        parent.insert((*last).to_string(), value.into());
    }

    pub fn remove(&mut self, path: &str) -> Option<Value> {
        let segs: Vec<&str> = segments(path).collect();
        let (last, parents) = segs.split_last()?;
        let mut cur = &mut self.root;
        for seg in parents {
            cur = cur.get_mut(*seg)?.as_object_mut()?;
        }
        cur.remove(*last)
    }

    /// Replace the object at `path` (the root when `path` is empty) with `value`.
    pub fn replace(&mut self, path: &str, value: Map<String, Value>) {
        let segs: Vec<&str> = segments(path).collect();
        match segs.split_last() {
            Some((last, parents)) => {
                object_at_mut(&mut self.root, parents).insert((*last).to_string(), Value::Object(value));
            }
            None => self.root = value,
        }
    }

    /// Deep-merge `patch` into the object at `path`.
    ///
    /// Nested objects merge recursively, `null` removes a key, anything else overwrites.
    pub fn merge(&mut self, path: &str, patch: Map<String, Value>) {
        let segs: Vec<&str> = segments(path).collect();
        merge_into(object_at_mut(&mut self.root, &segs), patch);
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split(['|', '.']).filter(|s| !s.is_empty())
}

fn object_at_mut<'a>(root: &'a mut Map<String, Value>, segs: &[&str]) -> &'a mut Map<String, Value> {
    let mut cur = root;
    for seg in segs {
        let slot = cur
            .entry((*seg).to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        cur = ensure_object(slot);
    }
    cur
}

fn ensure_object(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => map,
        _ => unreachable!("value was just replaced with an object"),
    }
}

fn merge_into(target: &mut Map<String, Value>, patch: Map<String, Value>) {
    for (key, value) in patch {
        match value {
            Value::Null => {
                target.remove(&key);
            }
            Value::Object(nested) => {
                let slot = target
                    .entry(key)
                    .or_insert_with(|| Value::Object(Map::new()));
                merge_into(ensure_object(slot), nested);
            }
            other => {
                target.insert(key, other);
            }
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Lenient conversion from a stored JSON scalar.
///
/// Remote configuration often carries numbers as strings (and vice versa);
/// conversions accept both and reject anything lossy.
pub trait FromConfigValue: Sized {
    fn from_config_value(value: &Value) -> Option<Self>;
}

impl FromConfigValue for String {
    fn from_config_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

impl FromConfigValue for f64 {
    fn from_config_value(value: &Value) -> Option<Self> {
        let v = match value {
            Value::Number(n) => n.as_f64()?,
            Value::String(s) => s.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        v.is_finite().then_some(v)
    }
}

impl FromConfigValue for i64 {
    fn from_config_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().or_else(|| integral(n.as_f64()?)),
            Value::String(s) => {
                let s = s.trim();
                s.parse::<i64>().ok().or_else(|| integral(s.parse().ok()?))
            }
            _ => None,
        }
    }
}

impl FromConfigValue for u64 {
    fn from_config_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_u64(),
            _ => i64::from_config_value(value)?.try_into().ok(),
        }
    }
}

impl FromConfigValue for bool {
    fn from_config_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => n.as_f64().map(|f| f != 0.0),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Some(true),
                "false" | "0" | "no" | "off" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }
}

fn integral(f: f64) -> Option<i64> {
    (f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64)
        .then_some(f as i64)
}
