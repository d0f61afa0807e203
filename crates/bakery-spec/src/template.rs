//! Placeholder token parsing and expansion, built on `nom`.
//!
//! The recognized syntax inside `{{ }}` is:
//!
//! - `user `name`` — a user-variable reference.
//! - `env `NAME`` — a process-environment lookup (variable defaults only).
//! - `timestamp` / `isotime` — the per-invocation build stamp.
//! - a bare identifier — shorthand for a user-variable reference.
//!
//! Anything inside `{{ }}` that does not match this grammar is left
//! untouched, so expansion is idempotent on strings with no recognized
//! placeholders.

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{char, space0},
    combinator::map,
    sequence::{delimited, pair, preceded},
};

use bakery_common::error::{BakeryError, Result};
use bakery_common::types::BuildStamp;

use crate::variables::{EnvSource, ResolvedVariables};

/// One parsed piece of a templated string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Verbatim text.
    Literal(&'a str),
    /// A user-variable reference.
    User(&'a str),
    /// A process-environment lookup.
    Env(&'a str),
    /// The numeric build stamp.
    Timestamp,
    /// The RFC 3339 build time.
    Isotime,
}

const fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Parses a backtick-quoted name: `` `aws_region` ``.
fn backtick_name(input: &str) -> IResult<&str, &str> {
    delimited(char('`'), take_while1(|c| c != '`'), char('`')).parse(input)
}

/// Parses the call inside the braces, after leading whitespace.
fn call(input: &str) -> IResult<&str, Segment<'_>> {
    alt((
        map(
            preceded(pair(tag("user"), space0), backtick_name),
            Segment::User,
        ),
        map(
            preceded(pair(tag("env"), space0), backtick_name),
            Segment::Env,
        ),
        map(take_while1(is_name_char), |name| match name {
            "timestamp" => Segment::Timestamp,
            "isotime" => Segment::Isotime,
            _ => Segment::User(name),
        }),
    ))
    .parse(input)
}

fn placeholder(input: &str) -> IResult<&str, Segment<'_>> {
    delimited(pair(tag("{{"), space0), call, pair(space0, tag("}}"))).parse(input)
}

/// Splits a templated string into literal and placeholder segments.
///
/// Never fails: brace sequences that do not form a recognized placeholder
/// are returned as literals.
#[must_use]
pub fn segments(input: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut rest = input;
    while !rest.is_empty() {
        if rest.starts_with("{{") {
            if let Ok((after, seg)) = placeholder(rest) {
                out.push(seg);
                rest = after;
                continue;
            }
        }
        // Literal run up to the next candidate placeholder start. When the
        // current position itself is a failed `{{`, at least one character
        // is consumed so the scan always advances. The skip is the width of
        // the first character so multi-byte input never splits mid-char.
        let skip = rest.chars().next().map_or(1, char::len_utf8);
        let end = rest[skip..].find("{{").map_or(rest.len(), |i| i + skip);
        out.push(Segment::Literal(&rest[..end]));
        rest = &rest[end..];
    }
    out
}

/// Expands every placeholder in a builder or provision-step field.
///
/// `context` names the builder/step and field for diagnostics.
///
/// # Errors
///
/// Returns [`BakeryError::UnresolvedVariable`] if a referenced variable has
/// no value, or [`BakeryError::MalformedSpec`] if the field contains an
/// `env` lookup (those are only legal in variable defaults).
pub fn expand(
    input: &str,
    vars: &ResolvedVariables,
    stamp: &BuildStamp,
    context: &str,
) -> Result<String> {
    let mut out = String::with_capacity(input.len());
    for seg in segments(input) {
        match seg {
            Segment::Literal(text) => out.push_str(text),
            Segment::User(name) => match vars.get(name) {
                Some(value) => out.push_str(value),
                None => {
                    return Err(BakeryError::UnresolvedVariable {
                        variable: name.to_owned(),
                        context: context.to_owned(),
                    });
                }
            },
            Segment::Env(name) => {
                return Err(BakeryError::MalformedSpec {
                    message: format!(
                        "env lookup `{name}` is only allowed in variable defaults ({context})"
                    ),
                });
            }
            Segment::Timestamp => out.push_str(&stamp.timestamp()),
            Segment::Isotime => out.push_str(&stamp.isotime),
        }
    }
    Ok(out)
}

/// Expands a variable default, where only literals and `env` lookups are
/// legal. A missing environment value expands to the empty string, leaving
/// the variable unset.
///
/// # Errors
///
/// Returns [`BakeryError::MalformedSpec`] if the default references another
/// variable or a build-stamp token.
pub fn expand_default(input: &str, env: &dyn EnvSource, variable: &str) -> Result<String> {
    let mut out = String::with_capacity(input.len());
    for seg in segments(input) {
        match seg {
            Segment::Literal(text) => out.push_str(text),
            Segment::Env(name) => out.push_str(&env.get(name).unwrap_or_default()),
            Segment::User(_) | Segment::Timestamp | Segment::Isotime => {
                return Err(BakeryError::MalformedSpec {
                    message: format!(
                        "default for variable `{variable}` may only contain env lookups"
                    ),
                });
            }
        }
    }
    Ok(out)
}
