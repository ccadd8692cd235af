// ABOUTME: Stack variables: raw values from config and their resolved forms.
// ABOUTME: Resolution evaluates lookups; blueprints only ever see resolved values.

mod raw;
mod value;
mod variable;

pub use raw::{Lookup, RawValue, Segment};
pub use value::{ProviderParameter, TypedResource, ValueKind, VariableValue};
pub use variable::Variable;

use crate::lookups::LookupError;

#[derive(Debug, thiserror::Error)]
pub enum VariableError {
    #[error("variable {0} has not been resolved")]
    Unresolved(String),

    #[error("unsupported variable value: {0}")]
    UnsupportedValue(String),

    #[error("nested lists are not valid variable values")]
    NestedList,

    #[error("lookup {lookup} for variable {variable} failed: {source}")]
    FailedLookup {
        variable: String,
        lookup: String,
        #[source]
        source: LookupError,
    },

    #[error(
        "lookup {lookup} in variable {variable} returned a {kind} and cannot be concatenated with text"
    )]
    InvalidLookupConcatenation {
        variable: String,
        lookup: String,
        kind: ValueKind,
    },

    #[error("list variable {variable} cannot contain a {kind}")]
    InvalidListItem { variable: String, kind: ValueKind },
}
