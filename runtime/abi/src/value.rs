//! Tagged values - the universal interchange format across the syscall boundary
//!
//! A [`Value`] is a closed sum type: the tag and the payload travel together,
//! so a payload can never be read under the wrong tag.
//!
//! # Ownership
//! - A `Str` exclusively owns its heap buffer
//! - A `List`/`Map` exclusively owns its [`Table`] and, recursively, every
//!   value stored in it
//! - Copying is always deep ([`Value::copy`]); freeing is recursive
//!   ([`Value::free`], or simply dropping the value)
//!
//! # Fixed-capacity tables
//! A table's length is fixed when it is created. Empty slots hold
//! `Value::None`; [`Value::list_append`] and [`Value::map_set`] claim the
//! first `None` slot and fail once none remain. Tables never grow.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec;
use core::fmt;
use thiserror::Error;

/// Absolute tolerance used when comparing `Float32` values
pub const FLOAT_EPSILON: f32 = 1e-6;

/// Tag of a [`Value`], without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    None,
    RetVal,
    UInt32,
    Int32,
    Float32,
    Str,
    List,
    Map,
}

impl ValueKind {
    /// Lower-case name of the tag
    pub const fn name(self) -> &'static str {
        match self {
            ValueKind::None => "none",
            ValueKind::RetVal => "retval",
            ValueKind::UInt32 => "uint32",
            ValueKind::Int32 => "int32",
            ValueKind::Float32 => "float32",
            ValueKind::Str => "str",
            ValueKind::List => "list",
            ValueKind::Map => "map",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors from value mutation
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ValueError {
    #[error("expected a {expected} value, found {found}")]
    WrongKind { expected: ValueKind, found: ValueKind },

    #[error("no free slot in table of length {len}")]
    TableFull { len: u32 },
}

pub type Result<T> = core::result::Result<T, ValueError>;

/// Backing storage for lists and maps
///
/// `a` holds list items (or map keys); `b` holds map values and is `None`
/// for lists. Both arrays have the same fixed length.
#[derive(Debug, Clone)]
pub struct Table {
    a: Box<[Value]>,
    b: Option<Box<[Value]>>,
}

impl Table {
    fn list(len: u32) -> Self {
        Self {
            a: empty_slots(len),
            b: None,
        }
    }

    fn map(len: u32) -> Self {
        Self {
            a: empty_slots(len),
            b: Some(empty_slots(len)),
        }
    }

    /// Fixed length chosen at creation
    #[inline]
    pub fn len(&self) -> u32 {
        self.a.len() as u32
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.a.is_empty()
    }

    /// List items, or map keys
    #[inline]
    pub fn items(&self) -> &[Value] {
        &self.a
    }

    /// Map values (`None` for lists)
    #[inline]
    pub fn values(&self) -> Option<&[Value]> {
        self.b.as_deref()
    }

    /// Key/value pairs of a map table, in slot order
    pub fn entries(&self) -> impl Iterator<Item = (&Value, &Value)> {
        let vals: &[Value] = self.b.as_deref().unwrap_or(&[]);
        self.a.iter().zip(vals.iter())
    }

    fn first_free_slot(&self) -> Option<usize> {
        self.a.iter().position(|slot| matches!(slot, Value::None))
    }

    fn position_of_key(&self, key: &str) -> Option<usize> {
        self.a
            .iter()
            .position(|k| matches!(k, Value::Str(s) if s == key))
    }

    fn equal(&self, other: &Table) -> bool {
        if self.a.len() != other.a.len() {
            return false;
        }
        let items_equal = self.a.iter().zip(other.a.iter()).all(|(x, y)| x.equal(y));
        let values_equal = match (&self.b, &other.b) {
            (Some(xs), Some(ys)) => xs.iter().zip(ys.iter()).all(|(x, y)| x.equal(y)),
            (None, None) => true,
            _ => false,
        };
        items_equal && values_equal
    }
}

fn float_eq(a: f32, b: f32) -> bool {
    let diff = a - b;
    diff < FLOAT_EPSILON && diff > -FLOAT_EPSILON
}

fn empty_slots(len: u32) -> Box<[Value]> {
    vec![Value::None; len as usize].into_boxed_slice()
}

/// Dynamically tagged value
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    None,
    /// Syscall return code: `0` is success, anything else failure
    RetVal(i32),
    UInt32(u32),
    Int32(i32),
    Float32(f32),
    Str(String),
    List(Table),
    Map(Table),
}

impl Value {
    pub const fn none() -> Self {
        Value::None
    }

    /// Success return value (`RetVal(0)`)
    pub const fn ok() -> Self {
        Value::RetVal(crate::Z_OK)
    }

    /// Generic failure return value (`RetVal(1)`)
    pub const fn fail() -> Self {
        Value::RetVal(crate::Z_FAIL)
    }

    pub const fn uint32(u: u32) -> Self {
        Value::UInt32(u)
    }

    pub const fn int32(i: i32) -> Self {
        Value::Int32(i)
    }

    pub const fn float32(f: f32) -> Self {
        Value::Float32(f)
    }

    /// Create a string value owning a copy of `s`
    pub fn str(s: &str) -> Self {
        Value::Str(String::from(s))
    }

    /// Create a list with `len` empty (`None`) slots
    pub fn list(len: u32) -> Self {
        Value::List(Table::list(len))
    }

    /// Create a map with `len` empty key/value slots
    pub fn map(len: u32) -> Self {
        Value::Map(Table::map(len))
    }

    /// Tag of this value
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::None => ValueKind::None,
            Value::RetVal(_) => ValueKind::RetVal,
            Value::UInt32(_) => ValueKind::UInt32,
            Value::Int32(_) => ValueKind::Int32,
            Value::Float32(_) => ValueKind::Float32,
            Value::Str(_) => ValueKind::Str,
            Value::List(_) => ValueKind::List,
            Value::Map(_) => ValueKind::Map,
        }
    }

    /// True for `RetVal(0)`
    pub fn is_ok(&self) -> bool {
        matches!(self, Value::RetVal(code) if *code == crate::Z_OK)
    }

    /// True for any nonzero `RetVal`
    pub fn is_fail(&self) -> bool {
        matches!(self, Value::RetVal(code) if *code != crate::Z_OK)
    }

    #[inline]
    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    /// True for strings and tables, whose storage lives on the heap of
    /// whichever side built them
    ///
    /// Kernel and user processes allocate from different heaps, so the
    /// kernel never drops or replaces such a value handed in by the caller.
    pub fn owns_heap(&self) -> bool {
        matches!(self, Value::Str(_) | Value::List(_) | Value::Map(_))
    }

    /// Deep copy
    ///
    /// Strings and tables are duplicated; the copy shares no storage with
    /// the original.
    pub fn copy(&self) -> Self {
        self.clone()
    }

    /// Deep, type-strict equality
    ///
    /// Values of different tags never compare equal. Floats compare within
    /// [`FLOAT_EPSILON`].
    pub fn equal(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::RetVal(a), Value::RetVal(b)) => a == b,
            (Value::UInt32(a), Value::UInt32(b)) => a == b,
            (Value::Int32(a), Value::Int32(b)) => a == b,
            (Value::Float32(a), Value::Float32(b)) => float_eq(*a, *b),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a.equal(b),
            (Value::Map(a), Value::Map(b)) => a.equal(b),
            _ => false,
        }
    }

    /// Release everything this value owns and reset it to `None`
    ///
    /// Containers drop their contents recursively before their own arrays.
    pub fn free(&mut self) {
        *self = Value::None;
    }

    /// Container length, string byte length, or 0 for scalars
    pub fn size(&self) -> u32 {
        match self {
            Value::List(t) | Value::Map(t) => t.len(),
            Value::Str(s) => s.len() as u32,
            _ => 0,
        }
    }

    /// List item at `index`
    ///
    /// Returns `None` for an out-of-range index or a non-list value.
    pub fn list_get(&self, index: u32) -> Option<&Value> {
        match self {
            Value::List(t) => t.a.get(index as usize),
            _ => None,
        }
    }

    pub fn list_get_mut(&mut self, index: u32) -> Option<&mut Value> {
        match self {
            Value::List(t) => t.a.get_mut(index as usize),
            _ => None,
        }
    }

    /// Map key at `index`
    pub fn map_get_key(&self, index: u32) -> Option<&Value> {
        match self {
            Value::Map(t) => t.a.get(index as usize),
            _ => None,
        }
    }

    /// Map value at `index`
    pub fn map_get_val(&self, index: u32) -> Option<&Value> {
        match self {
            Value::Map(t) => t.b.as_ref().and_then(|vals| vals.get(index as usize)),
            _ => None,
        }
    }

    pub fn map_get_val_mut(&mut self, index: u32) -> Option<&mut Value> {
        match self {
            Value::Map(t) => t.b.as_mut().and_then(|vals| vals.get_mut(index as usize)),
            _ => None,
        }
    }

    /// Look up the value stored under string key `key`
    pub fn map_find(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(t) => {
                let i = t.position_of_key(key)?;
                t.b.as_ref().and_then(|vals| vals.get(i))
            }
            _ => None,
        }
    }

    pub fn map_find_mut(&mut self, key: &str) -> Option<&mut Value> {
        match self {
            Value::Map(t) => {
                let i = t.position_of_key(key)?;
                t.b.as_mut().and_then(|vals| vals.get_mut(i))
            }
            _ => None,
        }
    }

    /// Store `item` in the first `None` slot of a list
    ///
    /// # Errors
    /// - `WrongKind` if `self` is not a list
    /// - `TableFull` if every slot is occupied; the list is left unchanged
    pub fn list_append(&mut self, item: Value) -> Result<()> {
        let table = match self {
            Value::List(t) => t,
            other => {
                return Err(ValueError::WrongKind {
                    expected: ValueKind::List,
                    found: other.kind(),
                })
            }
        };

        let slot = table
            .first_free_slot()
            .ok_or(ValueError::TableFull { len: table.len() })?;
        table.a[slot] = item;
        Ok(())
    }

    /// Set `key` to `value` in a map
    ///
    /// An existing string key is updated in place (the old value is
    /// dropped). Otherwise the first slot whose key is `None` is claimed.
    ///
    /// # Errors
    /// - `WrongKind` if `self` is not a map
    /// - `TableFull` if the key is absent and no slot is free
    pub fn map_set(&mut self, key: &str, value: Value) -> Result<()> {
        let table = match self {
            Value::Map(t) => t,
            other => {
                return Err(ValueError::WrongKind {
                    expected: ValueKind::Map,
                    found: other.kind(),
                })
            }
        };
        let len = table.len();

        if let Some(i) = table.position_of_key(key) {
            if let Some(vals) = table.b.as_mut() {
                vals[i] = value;
                return Ok(());
            }
        }

        let slot = table.first_free_slot().ok_or(ValueError::TableFull { len })?;
        let vals = table.b.as_mut().ok_or(ValueError::TableFull { len })?;
        table.a[slot] = Value::str(key);
        vals[slot] = value;
        Ok(())
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Value::UInt32(u) => Some(*u),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Int32(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Value::Float32(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Return code of a `RetVal`
    pub fn retval(&self) -> Option<i32> {
        match self {
            Value::RetVal(code) => Some(*code),
            _ => None,
        }
    }

    /// Backing table of a list or map
    pub fn as_table(&self) -> Option<&Table> {
        match self {
            Value::List(t) | Value::Map(t) => Some(t),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.equal(other)
    }
}

impl From<u32> for Value {
    fn from(u: u32) -> Self {
        Value::UInt32(u)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int32(i)
    }
}

impl From<f32> for Value {
    fn from(f: f32) -> Self {
        Value::Float32(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::str(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => f.write_str("none"),
            Value::RetVal(code) => write!(f, "retval({})", code),
            Value::UInt32(u) => write!(f, "{}", u),
            Value::Int32(i) => write!(f, "{}", i),
            Value::Float32(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "\"{}\"", s),
            Value::List(t) => {
                f.write_str("[")?;
                for (i, item) in t.items().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Value::Map(t) => {
                f.write_str("{")?;
                for (i, (k, v)) in t.entries().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                f.write_str("}")
            }
        }
    }
}
