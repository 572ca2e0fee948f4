use crate::core::{Result, TypeId, Value};
use std::fmt::Write;

/// Output conversion registered for a type: value in, canonical text out
pub trait TypeOutputRenderer: Send + Sync {
    fn render(&self, type_id: TypeId, value: &Value) -> Result<String>;
}

/// Renders values in the server's default text output format
#[derive(Debug, Clone, Copy, Default)]
pub struct CanonicalRenderer;

impl CanonicalRenderer {
    /// Shortest text that reads back as the same value at its own width
    fn float_text<F: Copy + Into<f64> + ToString>(value: F) -> String {
        let wide: f64 = value.into();
        if wide.is_nan() {
            "NaN".to_string()
        } else if wide.is_infinite() {
            let text = if wide > 0.0 { "Infinity" } else { "-Infinity" };
            text.to_string()
        } else {
            value.to_string()
        }
    }

    /// Composite output: fields comma separated inside parentheses, NULL as
    /// an empty field, fields quoted when they could be misread
    fn record_text(&self, fields: &[Value]) -> Result<String> {
        let mut out = String::from("(");
        for (i, field) in fields.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            if field.is_null() {
                continue;
            }

            let text = self.render(TypeId::RECORD, field)?;
            let needs_quotes = text.is_empty()
                || text
                    .chars()
                    .any(|c| matches!(c, '"' | '\\' | '(' | ')' | ',') || c.is_whitespace());
            if !needs_quotes {
                out.push_str(&text);
                continue;
            }

            out.push('"');
            for c in text.chars() {
                if c == '"' || c == '\\' {
                    out.push(c);
                }
                out.push(c);
            }
            out.push('"');
        }
        out.push(')');
        Ok(out)
    }
}

impl TypeOutputRenderer for CanonicalRenderer {
    fn render(&self, _type_id: TypeId, value: &Value) -> Result<String> {
        let text = match value {
            Value::Null => String::new(),
            Value::SmallInt(i) => i.to_string(),
            Value::Integer(i) => i.to_string(),
            Value::BigInt(i) => i.to_string(),
            Value::Real(f) => Self::float_text(*f),
            Value::Double(f) => Self::float_text(*f),
            Value::Numeric(s) => s.clone(),
            Value::Oid(o) => o.to_string(),
            Value::Boolean(b) => (if *b { "t" } else { "f" }).to_string(),
            Value::Text(s) => s.clone(),
            Value::Bytes(bytes) => {
                let mut hex = String::with_capacity(2 + bytes.len() * 2);
                hex.push_str("\\x");
                for byte in bytes {
                    let _ = write!(hex, "{:02x}", byte);
                }
                hex
            }
            Value::Date(d) => d.format("%Y-%m-%d").to_string(),
            Value::Time(t) => t.format("%H:%M:%S%.f").to_string(),
            Value::Timestamp(ts) => ts.format("%Y-%m-%d %H:%M:%S%.f").to_string(),
            Value::TimestampTz(ts) => ts.format("%Y-%m-%d %H:%M:%S%.f+00").to_string(),
            Value::Uuid(u) => u.hyphenated().to_string(),
            Value::Json(j) => j.to_string(),
            Value::Record(fields) => self.record_text(fields)?,
        };
        Ok(text)
    }
}
