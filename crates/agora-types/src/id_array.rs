//! Aggregated id lists.
//!
//! Relational backends compute derived relationship sets with an aggregate
//! such as `array_agg(c.id)`, which comes back as text: `{1,2,3}`. An outer
//! join with no matches aggregates to `{NULL}`. [`IdArray::parse`] decodes
//! exactly this format (square brackets are accepted too) and reports
//! malformed input with a structured [`IdArrayError`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::IdArrayError;

/// An ordered list of raw identifiers.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdArray(Vec<u64>);

impl IdArray {
    pub fn new(ids: Vec<u64>) -> Self {
        Self(ids)
    }

    /// Decode `{1,2,3}`, `[1,2,3]`, `{}`, or `{NULL}`.
    ///
    /// Whitespace around the brackets and the elements is ignored. `NULL`
    /// elements (any case) are skipped.
    pub fn parse(input: &str) -> Result<Self, IdArrayError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(IdArrayError::Empty);
        }

        let inner = trimmed
            .strip_prefix('{')
            .and_then(|rest| rest.strip_suffix('}'))
            .or_else(|| {
                trimmed
                    .strip_prefix('[')
                    .and_then(|rest| rest.strip_suffix(']'))
            })
            .ok_or_else(|| IdArrayError::MissingBrackets(trimmed.to_string()))?
            .trim();

        if inner.is_empty() {
            return Ok(Self::default());
        }

        let mut ids = Vec::new();
        for (position, raw) in inner.split(',').enumerate() {
            let element = raw.trim();
            if element.eq_ignore_ascii_case("null") {
                continue;
            }
            let id = element
                .parse::<u64>()
                .map_err(|_| IdArrayError::InvalidElement {
                    position,
                    value: element.to_string(),
                })?;
            ids.push(id);
        }
        Ok(Self(ids))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[u64] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<u64> {
        self.0
    }

    /// Convert into typed identifiers.
    pub fn typed<T: From<u64>>(&self) -> Vec<T> {
        self.0.iter().copied().map(T::from).collect()
    }
}

impl FromStr for IdArray {
    type Err = IdArrayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for IdArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, id) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{id}")?;
        }
        f.write_str("}")
    }
}

impl From<Vec<u64>> for IdArray {
    fn from(ids: Vec<u64>) -> Self {
        Self(ids)
    }
}

impl<T: Into<u64>> FromIterator<T> for IdArray {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}
