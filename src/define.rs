use std::fmt::{self, Write as _};

/// A single preprocessor definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Define {
    pub name: &'static str,
    pub value: DefineValue,
}

/// Right-hand side of a definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefineValue {
    /// `-D NAME` with no value
    Flag,
    Int(i64),
    /// Text that must reach the compiler as a string literal
    Str(String),
}

impl Define {
    pub fn flag(name: &'static str) -> Self {
        Self {
            name,
            value: DefineValue::Flag,
        }
    }

    pub fn int(name: &'static str, value: i64) -> Self {
        Self {
            name,
            value: DefineValue::Int(value),
        }
    }

    pub fn string(name: &'static str, value: impl Into<String>) -> Self {
        Self {
            name,
            value: DefineValue::Str(value.into()),
        }
    }

    /// Macro body as the preprocessor should see it, `None` for bare flags
    pub fn macro_body(&self) -> Option<String> {
        match &self.value {
            DefineValue::Flag => None,
            DefineValue::Int(value) => Some(value.to_string()),
            DefineValue::Str(text) => Some(stringify_macro(text)),
        }
    }
}

impl fmt::Display for Define {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.macro_body() {
            Some(body) => write!(f, "{}={}", self.name, body),
            None => f.write_str(self.name),
        }
    }
}

/// Quote `text` as a C string literal so it survives macro substitution.
///
/// Control characters other than `\n`, `\r` and `\t` are written as
/// three-digit octal escapes, which unlike `\x` cannot swallow a following
/// hex digit.
pub fn stringify_macro(text: &str) -> String {
    let mut literal = String::with_capacity(text.len() + 2);
    literal.push('"');
    for ch in text.chars() {
        match ch {
            '"' => literal.push_str("\\\""),
            '\\' => literal.push_str("\\\\"),
            '\n' => literal.push_str("\\n"),
            '\r' => literal.push_str("\\r"),
            '\t' => literal.push_str("\\t"),
            c if c.is_ascii_control() => {
                let _ = write!(literal, "\\{:03o}", c as u8);
            }
            c => literal.push(c),
        }
    }
    literal.push('"');
    literal
}
