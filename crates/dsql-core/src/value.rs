//! SQL parameter values.
//!
//! Values are never spliced into SQL directly by the renderer; they are
//! collected into a named parameter map and bound at execution time.

/// A value bound to a query parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// NULL value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Float value.
    Float(f64),
    /// Text value.
    Str(String),
    /// Binary value.
    Bytes(Vec<u8>),
}

impl Value {
    /// Returns `true` for [`Value::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

/// Formats a float the way it is rendered into SQL text.
///
/// A fractional marker is appended when the value is finite and would
/// otherwise print as a bare integer, so the database keeps float typing.
#[must_use]
pub fn float_to_sql(v: f64) -> String {
    let s = format!("{v}");
    if v.is_finite() && !s.contains('.') {
        format!("{s}.0")
    } else {
        s
    }
}

/// Trait for types that can be converted into a [`Value`].
pub trait IntoValue {
    /// Converts `self` into a [`Value`].
    fn into_value(self) -> Value;
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl IntoValue for bool {
    fn into_value(self) -> Value {
        Value::Bool(self)
    }
}

impl IntoValue for i64 {
    fn into_value(self) -> Value {
        Value::Int(self)
    }
}

impl IntoValue for i32 {
    fn into_value(self) -> Value {
        Value::Int(i64::from(self))
    }
}

impl IntoValue for i16 {
    fn into_value(self) -> Value {
        Value::Int(i64::from(self))
    }
}

impl IntoValue for i8 {
    fn into_value(self) -> Value {
        Value::Int(i64::from(self))
    }
}

impl IntoValue for u32 {
    fn into_value(self) -> Value {
        Value::Int(i64::from(self))
    }
}

impl IntoValue for u16 {
    fn into_value(self) -> Value {
        Value::Int(i64::from(self))
    }
}

impl IntoValue for u8 {
    fn into_value(self) -> Value {
        Value::Int(i64::from(self))
    }
}

impl IntoValue for f64 {
    fn into_value(self) -> Value {
        Value::Float(self)
    }
}

impl IntoValue for f32 {
    fn into_value(self) -> Value {
        Value::Float(f64::from(self))
    }
}

impl IntoValue for String {
    fn into_value(self) -> Value {
        Value::Str(self)
    }
}

impl IntoValue for &str {
    fn into_value(self) -> Value {
        Value::Str(String::from(self))
    }
}

impl IntoValue for Vec<u8> {
    fn into_value(self) -> Value {
        Value::Bytes(self)
    }
}

impl IntoValue for &[u8] {
    fn into_value(self) -> Value {
        Value::Bytes(self.to_vec())
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn into_value(self) -> Value {
        match self {
            Some(v) => v.into_value(),
            None => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_value_conversions() {
        assert_eq!(true.into_value(), Value::Bool(true));
        assert_eq!(42_i32.into_value(), Value::Int(42));
        assert_eq!(2.5_f64.into_value(), Value::Float(2.5));
        assert_eq!("hello".into_value(), Value::Str(String::from("hello")));
        assert_eq!(None::<i32>.into_value(), Value::Null);
        assert_eq!(Some(42_i32).into_value(), Value::Int(42));
        assert_eq!(vec![1_u8, 2].into_value(), Value::Bytes(vec![1, 2]));
    }

    #[test]
    fn test_float_to_sql() {
        assert_eq!(float_to_sql(2.5), "2.5");
        assert_eq!(float_to_sql(4.0), "4.0");
        assert_eq!(float_to_sql(-1.0), "-1.0");
        assert_eq!(float_to_sql(f64::INFINITY), "inf");
    }
}
