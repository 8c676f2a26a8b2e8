//! Sort criteria over attribute values

use std::cmp::Ordering;

use inv_common::{AttributeValue, Device, Error, Result, Scope};

use crate::filter::split_scoped_key;

/// Parsed `sort` query parameter: `name`, `name:desc`, `scope:name` or
/// `scope:name:asc|desc`. Direction defaults to ascending; an
/// unrecognized leading token is treated as part of an inventory-scoped
/// attribute name.
#[derive(Debug, Clone)]
pub struct SortSpec {
    /// Scope of the sort attribute
    pub scope: Scope,
    /// Attribute name to order by
    pub name: String,
    /// Ascending when true
    pub ascending: bool,
}

impl SortSpec {
    /// Parse the wire form of the sort parameter.
    pub fn parse(raw: &str) -> Result<SortSpec> {
        if raw.is_empty() {
            return Err(Error::invalid("sort parameter must not be empty"));
        }

        let (rest, ascending) = match raw.rsplit_once(':') {
            Some((head, "asc")) => (head, true),
            Some((head, "desc")) => (head, false),
            _ => (raw, true),
        };

        let (scope, name) = split_scoped_key(rest);
        if name.is_empty() {
            return Err(Error::invalid(format!("invalid sort '{}'", raw)));
        }

        Ok(SortSpec {
            scope,
            name: name.to_string(),
            ascending,
        })
    }

    /// Order devices by the sort attribute. The sort is stable; devices
    /// missing the attribute order last regardless of direction.
    pub fn sort(&self, devices: &mut [Device]) {
        devices.sort_by(|a, b| {
            let va = a.attributes.get(self.scope, &self.name).map(|x| &x.value);
            let vb = b.attributes.get(self.scope, &self.name).map(|x| &x.value);
            match (va, vb) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(va), Some(vb)) => {
                    let ord = cmp_values(va, vb);
                    if self.ascending {
                        ord
                    } else {
                        ord.reverse()
                    }
                }
            }
        });
    }
}

// Total order across the value union: numbers, then strings, then arrays.
fn cmp_values(a: &AttributeValue, b: &AttributeValue) -> Ordering {
    use AttributeValue::*;
    match (a, b) {
        (Num(x), Num(y)) => x.total_cmp(y),
        (Str(x), Str(y)) => x.cmp(y),
        (StrArray(x), StrArray(y)) => x.cmp(y),
        (NumArray(x), NumArray(y)) => {
            for (xi, yi) in x.iter().zip(y.iter()) {
                let ord = xi.total_cmp(yi);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        _ => rank(a).cmp(&rank(b)),
    }
}

fn rank(v: &AttributeValue) -> u8 {
    match v {
        AttributeValue::Num(_) => 0,
        AttributeValue::Str(_) => 1,
        AttributeValue::NumArray(_) => 2,
        AttributeValue::StrArray(_) => 3,
    }
}
