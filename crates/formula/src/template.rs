//! Late-bound `${NAME}` placeholder substitution
//!
//! Formula URLs and checksums are often produced by CI (build number,
//! artifact digest) after the formula text is authored. The formula stays a
//! pure template; this module finds placeholder names and renders the text
//! against a value map in a separate, side-effect-free step.

use forma_errors::{Error, FormulaError};
use std::collections::BTreeMap;

/// Collect placeholder names appearing in `text`
///
/// # Errors
///
/// Returns an error for malformed syntax: an unterminated `${`, an empty
/// `${}`, or a name that is not an identifier.
pub fn placeholders(text: &str, field: &str) -> Result<Vec<String>, Error> {
    let mut names = Vec::new();
    walk(text, field, |name, _| {
        names.push(name.to_string());
        Ok(())
    })?;
    Ok(names)
}

/// Substitute every placeholder in `text` with its value from `vars`
///
/// # Errors
///
/// Returns an error on malformed syntax or when a placeholder has no entry
/// in `vars`.
pub fn render(text: &str, vars: &BTreeMap<String, String>, field: &str) -> Result<String, Error> {
    let mut out = String::with_capacity(text.len());
    walk(text, field, |name, literal| {
        out.push_str(literal);
        match vars.get(name) {
            Some(value) => {
                out.push_str(value);
                Ok(())
            }
            None => Err(FormulaError::UnresolvedPlaceholder {
                name: name.to_string(),
            }
            .into()),
        }
    })
    .map(|tail| {
        out.push_str(tail);
        out
    })
}

fn is_ident(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Scan `text` for `${NAME}` occurrences, invoking `f` with each name and
/// the literal text preceding it; returns the trailing literal.
fn walk<'a, F>(text: &'a str, field: &str, mut f: F) -> Result<&'a str, Error>
where
    F: FnMut(&str, &'a str) -> Result<(), Error>,
{
    let mut rest = text;
    loop {
        let Some(start) = rest.find("${") else {
            return Ok(rest);
        };
        let literal = &rest[..start];
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            return Err(FormulaError::InvalidPlaceholder {
                field: field.to_string(),
                snippet: rest[start..].chars().take(24).collect(),
            }
            .into());
        };
        let name = &after[..end];
        if !is_ident(name) {
            return Err(FormulaError::InvalidPlaceholder {
                field: field.to_string(),
                snippet: rest[start..=start + 2 + end].to_string(),
            }
            .into());
        }
        f(name, literal)?;
        rest = &after[end + 1..];
    }
}
