use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, HashMap},
    fmt,
};
use thiserror::Error;

pub use serde_json::{Map, Value};

/// Named arguments of a call, in the order they were supplied.
pub type Kwargs = Map<String, Value>;

/// The declared type of a procedure parameter.
///
/// Values arriving over the wire are coerced into their declared type before the
/// implementation sees them, see [`Type::coerce`].
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum Type {
    /// Unannotated, accepts any JSON value unchanged.
    Any,
    Nil,
    Bool,
    Int,
    Float,
    String,
    List(Box<Type>),
    /// A JSON object with string keys and values of the given type.
    Map(Box<Type>),
    /// `null` or the inner type.
    Optional(Box<Type>),
    /// Exactly one of the listed values.
    OneOf(Vec<Value>),
}

impl Type {
    pub fn list(inner: Type) -> Self {
        Type::List(Box::new(inner))
    }

    pub fn map(inner: Type) -> Self {
        Type::Map(Box::new(inner))
    }

    pub fn optional(inner: Type) -> Self {
        Type::Optional(Box::new(inner))
    }

    pub fn one_of<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Type::OneOf(values.into_iter().map(Into::into).collect())
    }

    fn name(&self) -> &'static str {
        use Type::*;
        match self {
            Any => "Any",
            Nil => "Nil",
            Bool => "Bool",
            Int => "Int",
            Float => "Float",
            String => "String",
            List(_) => "List",
            Map(_) => "Map",
            Optional(_) => "Optional",
            OneOf(_) => "OneOf",
        }
    }

    /// Validate `val` against this type, converting it where a lossless conversion exists.
    pub fn coerce(&self, val: Value) -> Result<Value, TypeMismatch> {
        match (self, val) {
            (Type::Any, val) => Ok(val),
            (Type::Nil, Value::Null) => Ok(Value::Null),
            (Type::Bool, val) => coerce_bool(val).map_err(|val| TypeMismatch::new(val, self.clone())),
            (Type::Int, val) => coerce_int(val).map_err(|val| TypeMismatch::new(val, self.clone())),
            (Type::Float, val) => coerce_float(val).map_err(|val| TypeMismatch::new(val, self.clone())),
            (Type::String, val @ Value::String(_)) => Ok(val),
            (Type::List(inner), Value::Array(items)) => items
                .into_iter()
                .map(|item| inner.coerce(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            (Type::Map(inner), Value::Object(entries)) => entries
                .into_iter()
                .map(|(k, v)| inner.coerce(v).map(|v| (k, v)))
                .collect::<Result<Map<_, _>, _>>()
                .map(Value::Object),
            (Type::Optional(_), Value::Null) => Ok(Value::Null),
            (Type::Optional(inner), val) => inner.coerce(val),
            (Type::OneOf(values), val) if values.contains(&val) => Ok(val),
            (_, val) => Err(TypeMismatch::new(val, self.clone())),
        }
    }
}

fn coerce_bool(val: Value) -> Result<Value, Value> {
    let b = match &val {
        Value::Bool(b) => *b,
        Value::Number(n) => match n.as_i64() {
            Some(0) => false,
            Some(1) => true,
            _ => return Err(val),
        },
        Value::String(s) => match s.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => true,
            "false" | "0" | "no" | "off" => false,
            _ => return Err(val),
        },
        _ => return Err(val),
    };
    Ok(Value::Bool(b))
}

fn coerce_int(val: Value) -> Result<Value, Value> {
    let n = match &val {
        Value::Number(n) => match (n.as_i64(), n.as_u64(), n.as_f64()) {
            (Some(i), _, _) => Value::from(i),
            (None, Some(u), _) => Value::from(u),
            (None, None, Some(f)) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                Value::from(f as i64)
            }
            _ => return Err(val),
        },
        Value::String(s) => match s.trim().parse::<i64>() {
            Ok(i) => Value::from(i),
            Err(_) => return Err(val),
        },
        _ => return Err(val),
    };
    Ok(n)
}

fn coerce_float(val: Value) -> Result<Value, Value> {
    let f = match &val {
        Value::Number(n) => match n.as_f64() {
            Some(f) => f,
            None => return Err(val),
        },
        Value::String(s) => match s.trim().parse::<f64>() {
            Ok(f) if f.is_finite() => f,
            _ => return Err(val),
        },
        _ => return Err(val),
    };
    // Integral numbers stay integral on the wire, `2` is a fine Float.
    if matches!(&val, Value::Number(n) if n.is_i64() || n.is_u64()) {
        return Ok(val);
    }
    serde_json::Number::from_f64(f).map(Value::Number).ok_or(val)
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())?;
        match self {
            Type::List(inner) | Type::Map(inner) | Type::Optional(inner) => {
                write!(f, "[{inner}]")?;
            }
            Type::OneOf(values) => {
                f.write_str("(")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{v}")?;
                }
                f.write_str(")")?;
            }
            _ => {}
        }
        Ok(())
    }
}

/// Rust types with a natural wire [`Type`].
pub trait Typed {
    fn rpc_type() -> Type;
}

macro_rules! impl_typed {
    ($rpc_type:expr => $($rust_type:ty),+ $(,)?) => {
        $(
            impl Typed for $rust_type {
                fn rpc_type() -> Type {
                    $rpc_type
                }
            }
        )+
    };
}

impl_typed!(Type::Nil => ());
impl_typed!(Type::Bool => bool);
impl_typed!(Type::Int => i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);
impl_typed!(Type::Float => f32, f64);
impl_typed!(Type::String => String, &str, char);
impl_typed!(Type::Any => Value);
impl_typed!(Type::map(Type::Any) => Kwargs);

impl<T: Typed> Typed for Vec<T> {
    fn rpc_type() -> Type {
        Type::list(T::rpc_type())
    }
}

impl<T: Typed> Typed for Option<T> {
    fn rpc_type() -> Type {
        Type::optional(T::rpc_type())
    }
}

impl<T: Typed> Typed for HashMap<String, T> {
    fn rpc_type() -> Type {
        Type::map(T::rpc_type())
    }
}

impl<T: Typed> Typed for BTreeMap<String, T> {
    fn rpc_type() -> Type {
        Type::map(T::rpc_type())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("type error: {value} :/: {expected_type}")]
pub struct TypeMismatch {
    value: Value,
    expected_type: Type,
}

impl TypeMismatch {
    pub(crate) fn new(value: Value, expected_type: Type) -> Self {
        Self {
            value,
            expected_type,
        }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn expected_type(&self) -> &Type {
        &self.expected_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn int_accepts_integral_forms() {
        assert_eq!(Type::Int.coerce(json!(3)).unwrap(), json!(3));
        assert_eq!(Type::Int.coerce(json!(3.0)).unwrap(), json!(3));
        assert_eq!(Type::Int.coerce(json!(" 42 ")).unwrap(), json!(42));
        assert!(Type::Int.coerce(json!(3.5)).is_err());
        assert!(Type::Int.coerce(json!("three")).is_err());
        assert!(Type::Int.coerce(json!(null)).is_err());
    }

    #[test]
    fn float_keeps_integers_integral() {
        assert_eq!(Type::Float.coerce(json!(2)).unwrap(), json!(2));
        assert_eq!(Type::Float.coerce(json!("2.5")).unwrap(), json!(2.5));
        assert!(Type::Float.coerce(json!("NaN")).is_err());
        assert!(Type::Float.coerce(json!([1.0])).is_err());
    }

    #[test]
    fn bool_accepts_common_spellings() {
        assert_eq!(Type::Bool.coerce(json!("yes")).unwrap(), json!(true));
        assert_eq!(Type::Bool.coerce(json!(0)).unwrap(), json!(false));
        assert!(Type::Bool.coerce(json!(2)).is_err());
    }

    #[test]
    fn string_is_strict() {
        assert!(Type::String.coerce(json!(1)).is_err());
        assert_eq!(Type::String.coerce(json!("1")).unwrap(), json!("1"));
    }

    #[test]
    fn containers_coerce_their_items() {
        let ty = Type::list(Type::Int);
        assert_eq!(ty.coerce(json!(["1", 2])).unwrap(), json!([1, 2]));
        let err = ty.coerce(json!([1, "x"])).unwrap_err();
        assert_eq!(err.value(), &json!("x"));
        assert_eq!(err.expected_type(), &Type::Int);

        let ty = Type::map(Type::optional(Type::Float));
        assert_eq!(
            ty.coerce(json!({"a": null, "b": "1.5"})).unwrap(),
            json!({"a": null, "b": 1.5})
        );
    }

    #[test]
    fn one_of_matches_exactly() {
        let ty = Type::one_of(["a", "b"]);
        assert!(ty.coerce(json!("a")).is_ok());
        assert!(ty.coerce(json!("c")).is_err());
        assert_eq!(ty.to_string(), r#"OneOf("a", "b")"#);
    }

    #[test]
    fn typed_maps_rust_types() {
        assert_eq!(<Vec<Option<i64>>>::rpc_type(), Type::list(Type::optional(Type::Int)));
        assert_eq!(<HashMap<String, String>>::rpc_type(), Type::map(Type::String));
        assert_eq!(<Value>::rpc_type(), Type::Any);
    }
}
