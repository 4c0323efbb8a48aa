use std::borrow::Cow;
use std::fmt;

/// A literal on the right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A double-quoted string literal.
    String(String),
    /// A 64-bit signed integer.
    Int(i64),
    /// A finite 64-bit floating-point number.
    Float(f64),
    /// `true` or `false`.
    Bool(bool),
    /// An unquoted, undotted identifier used as an enum-like constant (`USD`).
    Ident(String),
    /// A bracketed list, used with `in`.
    List(Vec<Value>),
}

impl Value {
    /// Numeric view of this literal. Strings and identifiers count as numeric
    /// when their text parses as a finite number.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::String(s) | Value::Ident(s) => parse_number(s),
            Value::Bool(_) | Value::List(_) => None,
        }
    }

    /// Text view used for string equality and substring checks.
    /// Lists have no text view.
    #[must_use]
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            Value::String(s) | Value::Ident(s) => Some(Cow::Borrowed(s)),
            Value::Int(v) => Some(Cow::Owned(v.to_string())),
            Value::Float(v) => Some(Cow::Owned(v.to_string())),
            Value::Bool(v) => Some(Cow::Borrowed(if *v { "true" } else { "false" })),
            Value::List(_) => None,
        }
    }
}

/// Parse attribute or literal text as a finite number.
pub(crate) fn parse_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(v) => write!(f, "\"{v}\""),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => {
                let text = v.to_string();
                if text.contains('.') {
                    f.write_str(&text)
                } else {
                    write!(f, "{text}.0")
                }
            }
            Value::Bool(v) => write!(f, "{v}"),
            Value::Ident(v) => f.write_str(v),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}
