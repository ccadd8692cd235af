// ABOUTME: Raw, unresolved variable values as written in config.
// ABOUTME: Scans strings for `${type input}` lookups without evaluating them.

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

use super::{VariableError, VariableValue};

static LOOKUP_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\s+([^}]*)\}").expect("Invalid lookup regex")
});

/// A deferred `${type input}` expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
    pub kind: String,
    pub input: String,
}

impl Lookup {
    pub fn new(kind: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            input: input.into(),
        }
    }
}

impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${{{} {}}}", self.kind, self.input)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    Lookup(Lookup),
}

/// Variable value before any lookup has been evaluated.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Literal(VariableValue),
    Template(Vec<Segment>),
    List(Vec<RawValue>),
}

impl RawValue {
    /// Split a string into text and lookup segments.
    ///
    /// Strings without any lookup stay literal.
    pub fn parse_str(value: &str) -> Self {
        let mut segments = Vec::new();
        let mut last = 0;

        for captures in LOOKUP_PATTERN.captures_iter(value) {
            let (Some(whole), Some(kind), Some(input)) =
                (captures.get(0), captures.get(1), captures.get(2))
            else {
                continue;
            };
            if whole.start() > last {
                segments.push(Segment::Text(value[last..whole.start()].to_string()));
            }
            segments.push(Segment::Lookup(Lookup::new(
                kind.as_str(),
                input.as_str().trim(),
            )));
            last = whole.end();
        }

        if segments.is_empty() {
            return RawValue::Literal(VariableValue::String(value.to_string()));
        }
        if last < value.len() {
            segments.push(Segment::Text(value[last..].to_string()));
        }
        RawValue::Template(segments)
    }

    pub fn from_yaml(value: &serde_yaml::Value) -> Result<Self, VariableError> {
        use serde_yaml::Value;

        match value {
            Value::String(s) => Ok(Self::parse_str(s)),
            Value::Sequence(items) => items
                .iter()
                .map(|item| match item {
                    Value::Sequence(_) => Err(VariableError::NestedList),
                    other => Self::from_yaml(other),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(RawValue::List),
            other => VariableValue::from_yaml(other).map(RawValue::Literal),
        }
    }

    /// Every lookup in this value, in order of appearance.
    pub fn lookups(&self) -> Vec<&Lookup> {
        match self {
            RawValue::Literal(_) => Vec::new(),
            RawValue::Template(segments) => segments
                .iter()
                .filter_map(|segment| match segment {
                    Segment::Lookup(lookup) => Some(lookup),
                    Segment::Text(_) => None,
                })
                .collect(),
            RawValue::List(items) => items.iter().flat_map(RawValue::lookups).collect(),
        }
    }
}

impl From<VariableValue> for RawValue {
    fn from(value: VariableValue) -> Self {
        RawValue::Literal(value)
    }
}
