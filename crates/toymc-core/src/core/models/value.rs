use std::fmt;
use thiserror::Error;

/// The variant tag of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    List,
    Object,
    String,
    Integer,
    Boolean,
    Real,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::List => "list",
            ValueKind::Object => "object",
            ValueKind::String => "string",
            ValueKind::Integer => "integer",
            ValueKind::Boolean => "boolean",
            ValueKind::Real => "real",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueError {
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: ValueKind,
        found: ValueKind,
    },
    #[error("Key '{0}' not found")]
    NotFound(String),
    #[error("Index {index} is out of range for a list of length {len}")]
    IndexOutOfRange { index: i64, len: usize },
    #[error("Operation '{operation}' is not supported on a value of type {kind}")]
    ApiMisuse {
        operation: &'static str,
        kind: ValueKind,
    },
}

/// An ordered map from names to values.
///
/// Keys are unique and entries keep their insertion order. Replacing the value of an
/// existing key keeps the entry where it was.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Object {
    entries: Vec<(String, Value)>,
}

impl Object {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Inserts or replaces the value stored under `key`.
    ///
    /// Returns the previous value, if there was one. Lookup is a linear scan, which
    /// is fine for configuration-sized objects.
    pub fn set(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Object {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut object = Object::new();
        for (key, value) in iter {
            object.set(key, value);
        }
        object
    }
}

/// A node of the parameter-language document tree.
///
/// Every node exclusively owns its children, so dropping a node releases its whole
/// subtree. Values never carry their own key: a key belongs to the [`Object`] entry
/// holding the value, which makes "keyed iff the parent is an object" hold by
/// construction.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    List(Vec<Value>),
    Object(Object),
    String(String),
    Integer(i64),
    Boolean(bool),
    Real(f64),
}

impl Value {
    pub fn list() -> Self {
        Value::List(Vec::new())
    }

    pub fn object() -> Self {
        Value::Object(Object::new())
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Value::List(_) => ValueKind::List,
            Value::Object(_) => ValueKind::Object,
            Value::String(_) => ValueKind::String,
            Value::Integer(_) => ValueKind::Integer,
            Value::Boolean(_) => ValueKind::Boolean,
            Value::Real(_) => ValueKind::Real,
        }
    }

    fn misuse(&self, operation: &'static str) -> ValueError {
        ValueError::ApiMisuse {
            operation,
            kind: self.kind(),
        }
    }

    fn mismatch(&self, expected: ValueKind) -> ValueError {
        ValueError::TypeMismatch {
            expected,
            found: self.kind(),
        }
    }

    /// Upserts `value` under `key`; the object takes ownership of `value`.
    ///
    /// An existing entry is replaced in place (its old subtree is dropped), a new key
    /// is appended.
    pub fn object_set(&mut self, key: impl Into<String>, value: Value) -> Result<(), ValueError> {
        match self {
            Value::Object(object) => {
                object.set(key, value);
                Ok(())
            }
            other => Err(other.misuse("object_set")),
        }
    }

    pub fn object_get(&self, key: &str) -> Result<&Value, ValueError> {
        match self {
            Value::Object(object) => object
                .get(key)
                .ok_or_else(|| ValueError::NotFound(key.to_string())),
            other => Err(other.misuse("object_get")),
        }
    }

    pub fn object_get_mut(&mut self, key: &str) -> Result<&mut Value, ValueError> {
        match self {
            Value::Object(object) => object
                .get_mut(key)
                .ok_or_else(|| ValueError::NotFound(key.to_string())),
            other => Err(other.misuse("object_get_mut")),
        }
    }

    pub fn contains_key(&self, key: &str) -> Result<bool, ValueError> {
        match self {
            Value::Object(object) => Ok(object.contains_key(key)),
            other => Err(other.misuse("contains_key")),
        }
    }

    pub fn list_append(&mut self, value: Value) -> Result<(), ValueError> {
        match self {
            Value::List(items) => {
                items.push(value);
                Ok(())
            }
            other => Err(other.misuse("list_append")),
        }
    }

    /// Returns the element at `index`; negative indices count from the end, so `-1`
    /// is the last element.
    pub fn list_get(&self, index: i64) -> Result<&Value, ValueError> {
        let items = match self {
            Value::List(items) => items,
            other => return Err(other.misuse("list_get")),
        };

        let len = items.len();
        let resolved = if index < 0 {
            usize::try_from(index.unsigned_abs())
                .ok()
                .and_then(|back| len.checked_sub(back))
        } else {
            usize::try_from(index).ok().filter(|&i| i < len)
        };

        resolved
            .and_then(|i| items.get(i))
            .ok_or(ValueError::IndexOutOfRange { index, len })
    }

    /// Number of children of a list or an object.
    pub fn len(&self) -> Result<usize, ValueError> {
        match self {
            Value::List(items) => Ok(items.len()),
            Value::Object(object) => Ok(object.len()),
            other => Err(other.misuse("len")),
        }
    }

    pub fn is_empty(&self) -> Result<bool, ValueError> {
        self.len().map(|len| len == 0)
    }

    pub fn as_object(&self) -> Result<&Object, ValueError> {
        match self {
            Value::Object(object) => Ok(object),
            other => Err(other.mismatch(ValueKind::Object)),
        }
    }

    pub fn as_list(&self) -> Result<&[Value], ValueError> {
        match self {
            Value::List(items) => Ok(items),
            other => Err(other.mismatch(ValueKind::List)),
        }
    }

    pub fn as_str(&self) -> Result<&str, ValueError> {
        match self {
            Value::String(s) => Ok(s),
            other => Err(other.mismatch(ValueKind::String)),
        }
    }

    pub fn string_len(&self) -> Result<usize, ValueError> {
        self.as_str().map(str::len)
    }

    pub fn as_integer(&self) -> Result<i64, ValueError> {
        match self {
            Value::Integer(i) => Ok(*i),
            other => Err(other.mismatch(ValueKind::Integer)),
        }
    }

    pub fn as_boolean(&self) -> Result<bool, ValueError> {
        match self {
            Value::Boolean(b) => Ok(*b),
            other => Err(other.mismatch(ValueKind::Boolean)),
        }
    }

    pub fn as_real(&self) -> Result<f64, ValueError> {
        match self {
            Value::Real(r) => Ok(*r),
            other => Err(other.mismatch(ValueKind::Real)),
        }
    }

    /// Iterates over the children of a list or an object.
    ///
    /// Object children are yielded with their key, list children without one.
    pub fn iter(&self) -> Result<Iter<'_>, ValueError> {
        match self {
            Value::List(_) | Value::Object(_) => Ok(Iter {
                owner: self,
                next: 0,
            }),
            other => Err(other.misuse("iter")),
        }
    }
}

/// A child yielded by [`Iter`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Entry<'a> {
    pub key: Option<&'a str>,
    pub value: &'a Value,
}

/// Cursor over the children of a list or object.
///
/// Holds only the container and the index of the next child. The container is
/// borrowed for the iterator's lifetime, so it cannot change underneath it.
#[derive(Debug, Clone)]
pub struct Iter<'a> {
    owner: &'a Value,
    next: usize,
}

impl<'a> Iter<'a> {
    pub fn has_next(&self) -> bool {
        match self.owner {
            Value::List(items) => self.next < items.len(),
            Value::Object(object) => self.next < object.len(),
            _ => false,
        }
    }
}

impl<'a> Iterator for Iter<'a> {
    type Item = Entry<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = match self.owner {
            Value::List(items) => items.get(self.next).map(|value| Entry { key: None, value }),
            Value::Object(object) => object.entries.get(self.next).map(|(k, value)| Entry {
                key: Some(k.as_str()),
                value,
            }),
            _ => None,
        }?;
        self.next += 1;
        Some(entry)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Real(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::List(value)
    }
}

impl From<Object> for Value {
    fn from(value: Object) -> Self {
        Value::Object(value)
    }
}

/// Writes the value back in parameter-language syntax.
///
/// A top-level object renders as one `name value` line per entry. Strings are
/// written verbatim between quotes, reals always carry a decimal point or exponent.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Value::Object(object) => {
                for (i, (key, value)) in object.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{} {}", key, value)?;
                }
                Ok(())
            }
            Value::String(s) => write!(f, "\"{}\"", s),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Real(r) => write!(f, "{:?}", r),
        }
    }
}
