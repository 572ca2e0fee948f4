// ============================================================================
// Argument Literalizer
// ============================================================================
//
// Turns one bound argument back into SQL literal text. This is the only path
// by which caller data reaches the generated statement, so every branch ends
// in either a validated numeric literal, a bare `true`/`false`, or a fully
// escaped quoted string.
//
// ============================================================================

pub mod render;

use crate::core::{BoundArgument, DispatchError, Result, TypeId, Value};
use lazy_static::lazy_static;
use regex::Regex;
use std::sync::Arc;

pub use render::{CanonicalRenderer, TypeOutputRenderer};

lazy_static! {
    static ref NUMERIC_LITERAL: Regex =
        Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?$").unwrap();
}

/// Serialization policy for a type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralClass {
    Numeric,
    Boolean,
    QuotedDefault,
}

impl LiteralClass {
    pub fn of(type_id: TypeId) -> Self {
        match type_id {
            TypeId::INT2
            | TypeId::INT4
            | TypeId::INT8
            | TypeId::FLOAT4
            | TypeId::FLOAT8
            | TypeId::NUMERIC
            | TypeId::OID => Self::Numeric,
            TypeId::BOOL => Self::Boolean,
            _ => Self::QuotedDefault,
        }
    }
}

/// Quotes text as a string literal.
///
/// Embedded quotes are doubled. When the text holds a backslash the literal is
/// written in escape-string form (`E'...'`) with every backslash doubled, so
/// the result reads back identically whatever `standard_conforming_strings`
/// says on the remote side.
pub fn quote_literal(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 3);
    if text.contains('\\') {
        quoted.push('E');
    }
    quoted.push('\'');
    for c in text.chars() {
        if c == '\'' || c == '\\' {
            quoted.push(c);
        }
        quoted.push(c);
    }
    quoted.push('\'');
    quoted
}

/// Parses boolean input the way the server's `boolin` does
fn parse_bool_text(text: &str) -> Option<bool> {
    let value = text.trim().to_ascii_lowercase();
    let is_prefix_of = |word: &str, min: usize| value.len() >= min && word.starts_with(&value);

    match value.as_str() {
        "1" => Some(true),
        "0" => Some(false),
        _ if is_prefix_of("true", 1) || is_prefix_of("yes", 1) || is_prefix_of("on", 2) => {
            Some(true)
        }
        _ if is_prefix_of("false", 1) || is_prefix_of("no", 1) || is_prefix_of("off", 2) => {
            Some(false)
        }
        _ => None,
    }
}

pub struct Literalizer {
    renderer: Arc<dyn TypeOutputRenderer>,
}

impl Literalizer {
    pub fn new() -> Self {
        Self::with_renderer(Arc::new(CanonicalRenderer))
    }

    pub fn with_renderer(renderer: Arc<dyn TypeOutputRenderer>) -> Self {
        Self { renderer }
    }

    pub fn literalize(&self, type_id: TypeId, value: &Value, is_null: bool) -> Result<String> {
        if is_null || value.is_null() {
            return Ok("NULL".to_string());
        }

        match LiteralClass::of(type_id) {
            LiteralClass::Boolean => {
                let flag = self.bool_value(type_id, value)?;
                Ok(if flag { "true" } else { "false" }.to_string())
            }
            LiteralClass::Numeric => {
                let text = self.render(type_id, value)?;
                if NUMERIC_LITERAL.is_match(&text) {
                    Ok(text)
                } else {
                    // NaN, Infinity and friends are only valid as quoted input
                    Ok(quote_literal(&text))
                }
            }
            LiteralClass::QuotedDefault => {
                let text = self.render(type_id, value)?;
                Ok(quote_literal(&text))
            }
        }
    }

    pub fn literalize_argument(&self, argument: &BoundArgument) -> Result<String> {
        self.literalize(argument.type_id, &argument.value, argument.is_null)
    }

    fn render(&self, type_id: TypeId, value: &Value) -> Result<String> {
        let text = self.renderer.render(type_id, value)?;
        if text.contains('\0') {
            return Err(DispatchError::TypeMismatch(format!(
                "{} value contains a NUL character and cannot be sent as a literal",
                type_id
            )));
        }
        Ok(text)
    }

    fn bool_value(&self, type_id: TypeId, value: &Value) -> Result<bool> {
        match value {
            Value::Boolean(b) => Ok(*b),
            Value::SmallInt(i) => Ok(*i != 0),
            Value::Integer(i) => Ok(*i != 0),
            Value::BigInt(i) => Ok(*i != 0),
            other => {
                let text = self.render(type_id, other)?;
                parse_bool_text(&text).ok_or_else(|| {
                    DispatchError::TypeMismatch(format!(
                        "invalid input syntax for type boolean: \"{}\"",
                        text
                    ))
                })
            }
        }
    }
}

impl Default for Literalizer {
    fn default() -> Self {
        Self::new()
    }
}
