//! Attribute scopes, values and the per-device attribute set

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::MAX_ATTR_NAME_LEN;

/// Namespace partitioning a device's attributes.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Device-reported inventory data; the default for unscoped submissions
    #[default]
    Inventory,
    /// Identity data assigned at provisioning time
    Identity,
    /// User-managed tags, guarded by the revision token
    Tags,
    /// Internal bookkeeping attributes
    System,
}

impl Scope {
    /// Parse a scope from its lowercase wire name.
    pub fn parse(s: &str) -> Option<Scope> {
        match s {
            "inventory" => Some(Scope::Inventory),
            "identity" => Some(Scope::Identity),
            "tags" => Some(Scope::Tags),
            "system" => Some(Scope::System),
            _ => None,
        }
    }

    /// Wire name of the scope.
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Inventory => "inventory",
            Scope::Identity => "identity",
            Scope::Tags => "tags",
            Scope::System => "system",
        }
    }
}

/// Attribute value union. Arrays must be homogeneous; mixed-type arrays do
/// not deserialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// Single string value
    Str(String),
    /// Single numeric value
    Num(f64),
    /// Ordered sequence of strings
    StrArray(Vec<String>),
    /// Ordered sequence of numbers
    NumArray(Vec<f64>),
}

impl AttributeValue {
    /// True for the scalar string variant.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// True for the scalar numeric variant.
    pub fn as_num(&self) -> Option<f64> {
        match self {
            AttributeValue::Num(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::Str(s.to_string())
    }
}

impl From<f64> for AttributeValue {
    fn from(n: f64) -> Self {
        AttributeValue::Num(n)
    }
}

/// A single device attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    /// Attribute name, unique per scope on a device
    pub name: String,
    /// Attribute value
    pub value: AttributeValue,
    /// Owning scope; unscoped submissions land in `inventory`
    #[serde(default)]
    pub scope: Scope,
    /// Optional free-text description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Attribute {
    /// Build an attribute in the given scope.
    pub fn new(scope: Scope, name: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        Attribute {
            name: name.into(),
            value: value.into(),
            scope,
            description: None,
        }
    }

    /// Validate the name bounds.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::invalid("attribute name must not be empty"));
        }
        if self.name.len() > MAX_ATTR_NAME_LEN {
            return Err(Error::invalid(format!(
                "attribute name exceeds {} bytes",
                MAX_ATTR_NAME_LEN
            )));
        }
        Ok(())
    }
}

/// Ordered attribute set, unique per (scope, name). Submission order is
/// preserved; re-submitting an existing key replaces value and description
/// in place. Serializes as the wire-level JSON array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeSet(Vec<Attribute>);

impl AttributeSet {
    /// Empty set.
    pub fn new() -> Self {
        AttributeSet(Vec::new())
    }

    /// Number of attributes across all scopes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no attributes are present.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Look up an attribute by scope and name.
    pub fn get(&self, scope: Scope, name: &str) -> Option<&Attribute> {
        self.0.iter().find(|a| a.scope == scope && a.name == name)
    }

    /// Insert or replace by (scope, name), keeping the original slot on
    /// replacement.
    pub fn upsert(&mut self, attr: Attribute) {
        match self
            .0
            .iter_mut()
            .find(|a| a.scope == attr.scope && a.name == attr.name)
        {
            Some(slot) => *slot = attr,
            None => self.0.push(attr),
        }
    }

    /// Remove every attribute in the given scope.
    pub fn clear_scope(&mut self, scope: Scope) {
        self.0.retain(|a| a.scope != scope);
    }

    /// Iterate in submission order.
    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.0.iter()
    }

    /// Attributes in one scope, in submission order.
    pub fn in_scope(&self, scope: Scope) -> impl Iterator<Item = &Attribute> {
        self.0.iter().filter(move |a| a.scope == scope)
    }

    /// Number of attributes in one scope.
    pub fn count_in_scope(&self, scope: Scope) -> usize {
        self.in_scope(scope).count()
    }

    /// Drop attributes in `scope` beyond the first `cap`, counted in
    /// submission order. Attributes in other scopes are untouched.
    pub fn truncate_scope(&mut self, scope: Scope, cap: usize) {
        let mut seen = 0usize;
        self.0.retain(|a| {
            if a.scope != scope {
                return true;
            }
            seen += 1;
            seen <= cap
        });
    }
}

impl FromIterator<Attribute> for AttributeSet {
    fn from_iter<I: IntoIterator<Item = Attribute>>(iter: I) -> Self {
        let mut set = AttributeSet::new();
        for attr in iter {
            set.upsert(attr);
        }
        set
    }
}

/// Deduplicate a submitted attribute list by (scope, name), keeping the
/// first occurrence of each key and its position.
pub fn dedupe_submission(attrs: Vec<Attribute>) -> Vec<Attribute> {
    let mut out: Vec<Attribute> = Vec::with_capacity(attrs.len());
    for attr in attrs {
        if !out.iter().any(|a| a.scope == attr.scope && a.name == attr.name) {
            out.push(attr);
        }
    }
    out
}
