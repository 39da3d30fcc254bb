use serde::Serialize;
use std::fmt;

/// 轉換後的選項值
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    List(Vec<String>),
    Bytes(Vec<u8>),
    /// 設定檔中沒有值的選項，原樣回傳不做轉換
    Null,
}

impl Value {
    /// 值的型別名稱，用於錯誤訊息
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Str(_) => "str",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::List(_) => "list",
            Value::Bytes(_) => "bytes",
            Value::Null => "null",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => f.write_str(s),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{}", x),
            Value::Bool(b) => write!(f, "{}", b),
            Value::List(items) => write!(f, "[{}]", items.join(", ")),
            Value::Bytes(bytes) => write!(f, "{}", String::from_utf8_lossy(bytes)),
            Value::Null => f.write_str("null"),
        }
    }
}

/// 可由 [`Value`] 取出的 Rust 型別
///
/// `TYPE_NAME` 是此型別在區段宣告中對應的型別名稱，
/// 供 `settings_section!` 在編譯期把欄位型別對應到註冊表。
pub trait FromValue: Sized {
    const TYPE_NAME: &'static str;

    /// 型別不符時回傳 `Err(原值)`
    fn from_value(value: Value) -> Result<Self, Value>;
}

macro_rules! impl_from_value {
    ($ty:ty, $type_name:expr, $variant:ident) => {
        impl FromValue for $ty {
            const TYPE_NAME: &'static str = $type_name;

            fn from_value(value: Value) -> Result<Self, Value> {
                match value {
                    Value::$variant(inner) => Ok(inner),
                    other => Err(other),
                }
            }
        }
    };
}

impl_from_value!(String, "str", Str);
impl_from_value!(i64, "int", Int);
impl_from_value!(f64, "float", Float);
impl_from_value!(bool, "bool", Bool);
impl_from_value!(Vec<String>, "list", List);
impl_from_value!(Vec<u8>, "bytes", Bytes);

impl<T: FromValue> FromValue for Option<T> {
    const TYPE_NAME: &'static str = T::TYPE_NAME;

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_value() {
        assert_eq!(i64::from_value(Value::Int(8080)), Ok(8080));
        assert_eq!(
            String::from_value(Value::Int(1)),
            Err(Value::Int(1))
        );
        assert_eq!(Option::<bool>::from_value(Value::Null), Ok(None));
        assert_eq!(Option::<bool>::from_value(Value::Bool(true)), Ok(Some(true)));
    }

    #[test]
    fn test_serialize_untagged() {
        let json = serde_json::to_string(&vec![
            Value::Str("a".into()),
            Value::Int(2),
            Value::Bool(false),
            Value::Null,
        ])
        .unwrap();
        assert_eq!(json, r#"["a",2,false,null]"#);
    }
}
