//! Value type tags and argument predicates.
//!
//! Values travel as `serde_json::Value`, which already is a tagged union.
//! [`TypeTag`] names the runtime type of a value the way peers spell it in
//! `param_types` / `result_type`; [`ParamType`] is the structural check a
//! method declares for each argument position.

use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Runtime type name of a JSON value.
///
/// The spelling matches the tags emitted by existing peers (`int`, `str`,
/// `NoneType`, ...), so envelopes stay readable by either side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Int,
    Float,
    Str,
    Bool,
    List,
    Dict,
    None,
}

impl TypeTag {
    /// Returns the tag describing `value`.
    ///
    /// Numbers that serde_json holds as integers are `Int`; everything else
    /// numeric is `Float`, so `3.0` on the wire is a float.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => TypeTag::None,
            Value::Bool(_) => TypeTag::Bool,
            Value::Number(n) if n.is_i64() || n.is_u64() => TypeTag::Int,
            Value::Number(_) => TypeTag::Float,
            Value::String(_) => TypeTag::Str,
            Value::Array(_) => TypeTag::List,
            Value::Object(_) => TypeTag::Dict,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TypeTag::Int => "int",
            TypeTag::Float => "float",
            TypeTag::Str => "str",
            TypeTag::Bool => "bool",
            TypeTag::List => "list",
            TypeTag::Dict => "dict",
            TypeTag::None => "NoneType",
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TypeTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "int" => Ok(TypeTag::Int),
            "float" => Ok(TypeTag::Float),
            "str" => Ok(TypeTag::Str),
            "bool" => Ok(TypeTag::Bool),
            "list" => Ok(TypeTag::List),
            "dict" => Ok(TypeTag::Dict),
            "NoneType" => Ok(TypeTag::None),
            other => Err(format!("unknown type tag '{}'", other)),
        }
    }
}

/// Declared type of one positional argument.
///
/// Checking is structural: a value either has the declared shape or the
/// call is rejected. Nothing is ever coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    /// Integral JSON number
    Int,
    /// Any JSON number, integral or not
    Number,
    Str,
    Bool,
    /// JSON array whose every element matches the inner type
    ListOf(&'static ParamType),
    Any,
}

impl ParamType {
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            ParamType::Int => TypeTag::of(value) == TypeTag::Int,
            ParamType::Number => value.is_number(),
            ParamType::Str => value.is_string(),
            ParamType::Bool => value.is_boolean(),
            ParamType::ListOf(inner) => value
                .as_array()
                .map(|items| items.iter().all(|item| inner.matches(item)))
                .unwrap_or(false),
            ParamType::Any => true,
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::Int => f.write_str("int"),
            ParamType::Number => f.write_str("int or float"),
            ParamType::Str => f.write_str("str"),
            ParamType::Bool => f.write_str("bool"),
            ParamType::ListOf(inner) => write!(f, "list[{}]", inner),
            ParamType::Any => f.write_str("any"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_type_tag_of_values() {
        assert_eq!(TypeTag::of(&json!(3)), TypeTag::Int);
        assert_eq!(TypeTag::of(&json!(-3)), TypeTag::Int);
        assert_eq!(TypeTag::of(&json!(3.6)), TypeTag::Float);
        assert_eq!(TypeTag::of(&json!(3.0)), TypeTag::Float);
        assert_eq!(TypeTag::of(&json!("x")), TypeTag::Str);
        assert_eq!(TypeTag::of(&json!(true)), TypeTag::Bool);
        assert_eq!(TypeTag::of(&json!([1])), TypeTag::List);
        assert_eq!(TypeTag::of(&json!({"a": 1})), TypeTag::Dict);
        assert_eq!(TypeTag::of(&Value::Null), TypeTag::None);
    }

    #[test]
    fn test_type_tag_parse() {
        assert_eq!("NoneType".parse::<TypeTag>(), Ok(TypeTag::None));
        assert_eq!("list".parse::<TypeTag>(), Ok(TypeTag::List));
        assert!("type[3]".parse::<TypeTag>().is_err());
    }

    #[test]
    fn test_param_type_int_rejects_float() {
        assert!(ParamType::Int.matches(&json!(8)));
        assert!(!ParamType::Int.matches(&json!(8.5)));
        assert!(!ParamType::Int.matches(&json!("8")));
    }

    #[test]
    fn test_param_type_number() {
        assert!(ParamType::Number.matches(&json!(3)));
        assert!(ParamType::Number.matches(&json!(3.6)));
        assert!(!ParamType::Number.matches(&json!(true)));
    }

    #[test]
    fn test_param_type_list_of_checks_every_element() {
        static STR: ParamType = ParamType::Str;
        let list_of_str = ParamType::ListOf(&STR);

        assert!(list_of_str.matches(&json!(["a", "b"])));
        assert!(list_of_str.matches(&json!([])));
        assert!(!list_of_str.matches(&json!(["a", 1])));
        assert!(!list_of_str.matches(&json!("ab")));
        assert_eq!(list_of_str.to_string(), "list[str]");
    }
}
