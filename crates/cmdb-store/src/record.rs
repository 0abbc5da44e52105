//! Typed records
//!
//! The platform stores every field as loosely typed text. Records crossing
//! into this crate carry a strict identifier and a typed value per field, so
//! callers never compare raw strings by hand.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

static SYS_ID_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9a-fA-F]{32}$").expect("static sys_id pattern"));

/// Unique record identifier
///
/// Generated identifiers are 32 lowercase hex characters. Identifiers loaded
/// from snapshots are accepted verbatim; [`SysId::is_canonical`] reports
/// whether one has the platform shape.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SysId(String);

impl SysId {
    /// Wrap an existing identifier
    #[inline]
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Generate a fresh 32-hex identifier
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Identifier text
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check for the 32-hex platform shape
    #[inline]
    #[must_use]
    pub fn is_canonical(&self) -> bool {
        Self::looks_like(&self.0)
    }

    /// Check whether arbitrary text has the 32-hex platform shape
    #[inline]
    #[must_use]
    pub fn looks_like(text: &str) -> bool {
        SYS_ID_SHAPE.is_match(text)
    }
}

impl Display for SysId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SysId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl AsRef<str> for SysId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Typed field value
///
/// References serialize as plain strings, so a [`Value::Ref`] written to a
/// snapshot reads back as [`Value::Str`]. Comparisons treat both as text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Value {
    /// Empty / unset
    #[default]
    Null,
    /// Boolean flag
    Bool(bool),
    /// Integer
    Int(i64),
    /// Text
    Str(String),
    /// Reference to another record
    Ref(SysId),
}

impl Value {
    /// Text content of `Str` and `Ref` values
    #[inline]
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            Self::Ref(id) => Some(id.as_str()),
            _ => None,
        }
    }

    /// True for `Null` and empty text; the platform does not distinguish them
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Str(s) => s.is_empty(),
            Self::Ref(id) => id.as_str().is_empty(),
            _ => false,
        }
    }

    /// Display form as the platform would print it
    #[must_use]
    pub fn display(&self) -> Cow<'_, str> {
        match self {
            Self::Null => Cow::Borrowed(""),
            Self::Bool(b) => Cow::Borrowed(if *b { "true" } else { "false" }),
            Self::Int(n) => Cow::Owned(n.to_string()),
            Self::Str(s) => Cow::Borrowed(s),
            Self::Ref(id) => Cow::Borrowed(id.as_str()),
        }
    }

    /// Integer reading with `parseInt` leniency: leading sign and digits are
    /// taken, anything unparsable is 0.
    #[must_use]
    pub fn int_lenient(&self) -> i64 {
        match self {
            Self::Int(n) => *n,
            Self::Bool(b) => i64::from(*b),
            Self::Str(s) => parse_leading_int(s).unwrap_or(0),
            Self::Null | Self::Ref(_) => 0,
        }
    }

    /// Strict integer reading: `Int`, or text that is entirely an integer
    #[must_use]
    pub fn int_strict(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            Self::Str(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Boolean reading; text `"true"` counts as set
    #[must_use]
    pub fn flag(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Int(n) => *n != 0,
            Self::Str(s) => s.trim().eq_ignore_ascii_case("true"),
            Self::Null | Self::Ref(_) => false,
        }
    }

    /// Loose equality used by query filters
    ///
    /// Numbers compare numerically against numeric text, booleans against
    /// `"true"`/`"false"`, and null equals empty text.
    #[must_use]
    pub fn loosely_eq(&self, other: &Self) -> bool {
        if self.is_empty() || other.is_empty() {
            return self.is_empty() && other.is_empty();
        }
        match (self, other) {
            (Self::Int(a), b) | (b, Self::Int(a)) => b.int_strict() == Some(*a),
            (Self::Bool(a), b) | (b, Self::Bool(a)) => match b {
                Self::Bool(x) => x == a,
                other => other
                    .as_text()
                    .is_some_and(|t| t.trim().eq_ignore_ascii_case(if *a { "true" } else { "false" })),
            },
            (a, b) => a.as_text() == b.as_text(),
        }
    }

    /// Ordering used by `order_by`: numeric when both sides are integers,
    /// textual otherwise, with empties first.
    #[must_use]
    pub fn order_cmp(&self, other: &Self) -> Ordering {
        match (self.is_empty(), other.is_empty()) {
            (true, true) => return Ordering::Equal,
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            (false, false) => {}
        }
        match (self.int_strict(), other.int_strict()) {
            (Some(a), Some(b)) => a.cmp(&b),
            _ => self.display().cmp(&other.display()),
        }
    }
}

fn parse_leading_int(text: &str) -> Option<i64> {
    let trimmed = text.trim_start();
    let (sign, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (-1, &trimmed[1..]),
        Some(b'+') => (1, &trimmed[1..]),
        _ => (1, trimmed),
    };
    let end = digits
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map_or(digits.len(), |(i, _)| i);
    digits[..end].parse::<i64>().ok().map(|n| sign * n)
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<SysId> for Value {
    fn from(value: SysId) -> Self {
        Self::Ref(value)
    }
}

impl From<&SysId> for Value {
    fn from(value: &SysId) -> Self {
        Self::Ref(value.clone())
    }
}

/// Named field values of one record
pub type Fields = BTreeMap<String, Value>;

/// Build [`Fields`] from literal pairs
#[must_use]
pub fn fields<const N: usize>(pairs: [(&str, Value); N]) -> Fields {
    pairs
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}

static NULL: Value = Value::Null;

/// One row of a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    table: String,
    sys_id: SysId,
    fields: Fields,
}

impl Record {
    /// Create record
    #[inline]
    #[must_use]
    pub fn new(table: impl Into<String>, sys_id: SysId, fields: Fields) -> Self {
        Self {
            table: table.into(),
            sys_id,
            fields,
        }
    }

    /// Owning table
    #[inline]
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Unique identifier
    #[inline]
    #[must_use]
    pub fn sys_id(&self) -> &SysId {
        &self.sys_id
    }

    /// All stored fields
    #[inline]
    #[must_use]
    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    /// Field value; unset fields read as [`Value::Null`]
    #[inline]
    #[must_use]
    pub fn value(&self, name: &str) -> &Value {
        self.fields.get(name).unwrap_or(&NULL)
    }

    /// Field value including the `sys_id` pseudo-field
    #[must_use]
    pub fn lookup(&self, name: &str) -> Cow<'_, Value> {
        if name == "sys_id" {
            Cow::Owned(Value::Ref(self.sys_id.clone()))
        } else {
            Cow::Borrowed(self.value(name))
        }
    }

    /// Text of a field, trimmed; empty when unset or non-text
    #[must_use]
    pub fn text(&self, name: &str) -> String {
        self.value(name).display().trim().to_string()
    }

    /// Integer field with `parseInt` leniency
    #[inline]
    #[must_use]
    pub fn int_lenient(&self, name: &str) -> i64 {
        self.value(name).int_lenient()
    }

    /// Reference field; `None` when empty
    #[must_use]
    pub fn reference(&self, name: &str) -> Option<SysId> {
        let value = self.value(name);
        if value.is_empty() {
            return None;
        }
        value.as_text().map(|t| SysId::new(t.trim()))
    }

    /// Boolean field
    #[inline]
    #[must_use]
    pub fn flag(&self, name: &str) -> bool {
        self.value(name).flag()
    }

    /// Merge field updates into this record
    pub fn apply(&mut self, updates: Fields) {
        self.fields.extend(updates);
    }
}
