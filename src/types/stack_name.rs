// ABOUTME: Validated stack name used as the node identity in the dependency graph.
// ABOUTME: Follows CloudFormation stack naming rules and builds fully-qualified names.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

/// Longest stack name CloudFormation accepts, namespace included.
pub const MAX_STACK_NAME_LEN: usize = 128;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StackNameError {
    #[error("stack name cannot be empty")]
    Empty,

    #[error("stack name exceeds maximum length of {MAX_STACK_NAME_LEN} characters")]
    TooLong,

    #[error("stack name must start with a letter")]
    MustStartWithLetter,

    #[error("stack name cannot end with a hyphen")]
    EndsWithHyphen,

    #[error("invalid character in stack name: '{0}'")]
    InvalidChar(char),
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StackName(String);

impl StackName {
    pub fn new(value: &str) -> Result<Self, StackNameError> {
        let Some(first) = value.chars().next() else {
            return Err(StackNameError::Empty);
        };

        if value.len() > MAX_STACK_NAME_LEN {
            return Err(StackNameError::TooLong);
        }

        if !first.is_ascii_alphabetic() {
            return Err(StackNameError::MustStartWithLetter);
        }

        if value.ends_with('-') {
            return Err(StackNameError::EndsWithHyphen);
        }

        if let Some(c) = value
            .chars()
            .find(|c| !c.is_ascii_alphanumeric() && *c != '-')
        {
            return Err(StackNameError::InvalidChar(c));
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name the provider knows this stack by: `<namespace>-<name>`.
    ///
    /// An empty namespace leaves the name unqualified.
    pub fn qualified(&self, namespace: &str) -> String {
        if namespace.is_empty() {
            self.0.clone()
        } else {
            format!("{namespace}-{}", self.0)
        }
    }
}

impl fmt::Display for StackName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for StackName {
    type Err = StackNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Serialize for StackName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for StackName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Self::new(&value).map_err(serde::de::Error::custom)
    }
}
