//! Attribute filter expressions
//!
//! A filter expression is parsed from a query parameter value:
//!
//! - `value`        - equality (numeric equality too when the text parses)
//! - `eq:value`     - explicit equality
//! - `~pattern`     - regular expression, unanchored
//! - `regex:pattern`- same as `~`
//!
//! The attribute key may carry a scope prefix (`identity:mac`); a bare key
//! filters the inventory scope.

use inv_common::{Attribute, AttributeValue, Device, Error, Result, Scope};
use regex::Regex;

/// Filter operator.
#[derive(Debug, Clone)]
pub enum FilterOp {
    /// Literal equality against strings and numbers
    Eq,
    /// Regular expression over string values and string-array elements
    Regex(Regex),
}

/// A single attribute predicate.
#[derive(Debug, Clone)]
pub struct Filter {
    /// Scope the attribute lives in
    pub scope: Scope,
    /// Attribute name
    pub name: String,
    /// Operator parsed from the expression prefix
    pub op: FilterOp,
    /// Raw comparison text (equality only)
    pub value: String,
    /// Numeric rendering of `value`, when it parses
    pub value_num: Option<f64>,
}

impl Filter {
    /// Parse an attribute key (`name` or `scope:name`) and filter
    /// expression into a predicate.
    pub fn parse(key: &str, expr: &str) -> Result<Filter> {
        let (scope, name) = split_scoped_key(key);
        if name.is_empty() {
            return Err(Error::invalid(format!("invalid filter key '{}'", key)));
        }

        let (op, value) = if let Some(pattern) = expr.strip_prefix('~') {
            (FilterOp::Regex(compile(pattern)?), pattern.to_string())
        } else if let Some(pattern) = expr.strip_prefix("regex:") {
            (FilterOp::Regex(compile(pattern)?), pattern.to_string())
        } else if let Some(literal) = expr.strip_prefix("eq:") {
            (FilterOp::Eq, literal.to_string())
        } else {
            (FilterOp::Eq, expr.to_string())
        };

        let value_num = value.parse::<f64>().ok();

        Ok(Filter {
            scope,
            name: name.to_string(),
            op,
            value,
            value_num,
        })
    }

    /// True when the device carries the attribute and its value satisfies
    /// the predicate. A device missing the attribute never matches.
    pub fn matches(&self, device: &Device) -> bool {
        match device.attributes.get(self.scope, &self.name) {
            Some(attr) => self.matches_attr(attr),
            None => false,
        }
    }

    fn matches_attr(&self, attr: &Attribute) -> bool {
        match (&self.op, &attr.value) {
            (FilterOp::Eq, AttributeValue::Str(s)) => *s == self.value,
            (FilterOp::Eq, AttributeValue::Num(n)) => self.value_num == Some(*n),
            (FilterOp::Eq, AttributeValue::StrArray(items)) => {
                items.iter().any(|s| *s == self.value)
            }
            (FilterOp::Eq, AttributeValue::NumArray(items)) => self
                .value_num
                .map_or(false, |v| items.iter().any(|n| *n == v)),
            (FilterOp::Regex(re), AttributeValue::Str(s)) => re.is_match(s),
            (FilterOp::Regex(re), AttributeValue::StrArray(items)) => {
                items.iter().any(|s| re.is_match(s))
            }
            // regex predicates apply to text only
            (FilterOp::Regex(_), _) => false,
        }
    }
}

/// Split `scope:name` into its parts; a key without a recognized scope
/// prefix filters the inventory scope under its full name.
pub fn split_scoped_key(key: &str) -> (Scope, &str) {
    if let Some((head, tail)) = key.split_once(':') {
        if let Some(scope) = Scope::parse(head) {
            return (scope, tail);
        }
    }
    (Scope::Inventory, key)
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| Error::invalid(format!("invalid filter regex: {}", e)))
}
