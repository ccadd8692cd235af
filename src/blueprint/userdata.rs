// ABOUTME: `$name` / `${name}` substitution of resolved variables into free text.
// ABOUTME: `$$` escapes a dollar sign; anything else after `$` is an invalid placeholder.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use super::ResolveError;
use crate::variables::VariableValue;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$(?:(\$)|([_A-Za-z][_A-Za-z0-9]*)|\{([_A-Za-z][_A-Za-z0-9]*)\}|())")
        .expect("Invalid placeholder regex")
});

/// Substitute variables into `raw`.
///
/// Provider parameters substitute their submitted value.
pub fn parse_user_data(
    variables: &BTreeMap<String, VariableValue>,
    raw: &str,
    blueprint: &str,
) -> Result<String, ResolveError> {
    let mut rendered = String::with_capacity(raw.len());
    let mut last = 0;

    for captures in PLACEHOLDER.captures_iter(raw) {
        let Some(whole) = captures.get(0) else {
            continue;
        };
        rendered.push_str(&raw[last..whole.start()]);
        last = whole.end();

        if captures.get(1).is_some() {
            rendered.push('$');
            continue;
        }

        let Some(name) = captures.get(2).or_else(|| captures.get(3)) else {
            let (line, col) = line_and_column(raw, whole.start());
            return Err(ResolveError::InvalidUserdataPlaceholder {
                blueprint: blueprint.to_string(),
                message: format!("Invalid placeholder in string: line {line}, col {col}"),
            });
        };

        let value = variables
            .get(name.as_str())
            .ok_or_else(|| ResolveError::MissingVariable {
                blueprint: blueprint.to_string(),
                variable: name.as_str().to_string(),
            })?;
        rendered.push_str(&value.to_string());
    }

    rendered.push_str(&raw[last..]);
    Ok(rendered)
}

fn line_and_column(text: &str, offset: usize) -> (usize, usize) {
    let before = &text[..offset];
    let line = before.matches('\n').count() + 1;
    let col = match before.rfind('\n') {
        Some(newline) => offset - newline,
        None => offset + 1,
    };
    (line, col)
}
