use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::config::value::Value;

/// 支援的純量型別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarKind {
    Str,
    Int,
    Float,
    Bool,
    List,
    Bytes,
}

impl ScalarKind {
    /// 所有支援的型別，依診斷訊息的列出順序
    pub const ALL: [ScalarKind; 6] = [
        ScalarKind::Str,
        ScalarKind::Int,
        ScalarKind::Float,
        ScalarKind::Bool,
        ScalarKind::List,
        ScalarKind::Bytes,
    ];

    /// 型別在宣告中使用的名稱
    pub fn as_str(&self) -> &'static str {
        match self {
            ScalarKind::Str => "str",
            ScalarKind::Int => "int",
            ScalarKind::Float => "float",
            ScalarKind::Bool => "bool",
            ScalarKind::List => "list",
            ScalarKind::Bytes => "bytes",
        }
    }

    /// 從宣告名稱取得型別，接受常見的長名稱
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "str" | "string" => Some(ScalarKind::Str),
            "int" | "integer" => Some(ScalarKind::Int),
            "float" => Some(ScalarKind::Float),
            "bool" | "boolean" => Some(ScalarKind::Bool),
            "list" => Some(ScalarKind::List),
            "bytes" => Some(ScalarKind::Bytes),
            _ => None,
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 原始字串到型別值的轉換函式
///
/// 失敗時回傳人類可讀的原因，由呼叫端包裝成 `ConfigError::InvalidValue`。
pub type Coercion = Arc<dyn Fn(&str) -> Result<Value, String> + Send + Sync>;

/// 將閉包包裝為 [`Coercion`]
pub fn coercion<F>(f: F) -> Coercion
where
    F: Fn(&str) -> Result<Value, String> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// 內建轉換函式
pub mod coerce {
    use crate::config::value::Value;

    pub fn string(raw: &str) -> Result<Value, String> {
        Ok(Value::Str(raw.to_string()))
    }

    pub fn integer(raw: &str) -> Result<Value, String> {
        raw.trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|e| e.to_string())
    }

    pub fn float(raw: &str) -> Result<Value, String> {
        raw.trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|e| e.to_string())
    }

    /// 只接受 `true`/`True`/`false`/`False` 四個字面值
    pub fn boolean(raw: &str) -> Result<Value, String> {
        match raw {
            "true" | "True" => Ok(Value::Bool(true)),
            "false" | "False" => Ok(Value::Bool(false)),
            _ => Err("expected one of true, True, false, False".to_string()),
        }
    }

    /// 以逗號分隔的清單，去除空白並略過空項目
    ///
    /// `list` 型別沒有預設轉換，需要時以此註冊。
    pub fn comma_list(raw: &str) -> Result<Value, String> {
        Ok(Value::List(
            raw.split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect(),
        ))
    }

    /// 原始字串的 UTF-8 位元組
    pub fn utf8_bytes(raw: &str) -> Result<Value, String> {
        Ok(Value::Bytes(raw.as_bytes().to_vec()))
    }
}

/// 型別註冊表：型別到預設轉換函式的對應
///
/// 六種型別永遠受支援；`list` 與 `bytes` 預設沒有轉換函式。
#[derive(Clone)]
pub struct TypeRegistry {
    defaults: HashMap<ScalarKind, Coercion>,
}

static DEFAULT_REGISTRY: Lazy<Arc<TypeRegistry>> = Lazy::new(|| Arc::new(TypeRegistry::new()));

impl TypeRegistry {
    /// 建立只含內建轉換的註冊表
    pub fn new() -> Self {
        let mut defaults: HashMap<ScalarKind, Coercion> = HashMap::new();
        defaults.insert(ScalarKind::Str, coercion(coerce::string));
        defaults.insert(ScalarKind::Int, coercion(coerce::integer));
        defaults.insert(ScalarKind::Float, coercion(coerce::float));
        defaults.insert(ScalarKind::Bool, coercion(coerce::boolean));
        Self { defaults }
    }

    /// 行程共用的預設註冊表
    pub fn shared() -> Arc<TypeRegistry> {
        Arc::clone(&DEFAULT_REGISTRY)
    }

    /// 設定某型別在整個註冊表中的預設轉換
    pub fn with_coercion(mut self, kind: ScalarKind, coercion: Coercion) -> Self {
        self.defaults.insert(kind, coercion);
        self
    }

    pub fn coercion(&self, kind: ScalarKind) -> Option<&Coercion> {
        self.defaults.get(&kind)
    }

    /// 查詢型別名稱是否受支援
    pub fn kind_for(&self, type_name: &str) -> Option<ScalarKind> {
        ScalarKind::from_name(type_name)
    }

    pub fn supports(&self, type_name: &str) -> bool {
        self.kind_for(type_name).is_some()
    }

    /// 支援型別名稱列表，用於錯誤訊息
    pub fn supported_names(&self) -> String {
        ScalarKind::ALL
            .iter()
            .map(ScalarKind::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<&str> = self.defaults.keys().map(ScalarKind::as_str).collect();
        kinds.sort_unstable();
        f.debug_struct("TypeRegistry")
            .field("coercions", &kinds)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case("true", true)]
    #[case("True", true)]
    #[case("false", false)]
    #[case("False", false)]
    fn test_boolean_literals(#[case] raw: &str, #[case] expected: bool) {
        assert_eq!(coerce::boolean(raw), Ok(Value::Bool(expected)));
    }

    #[rstest]
    #[case("yes")]
    #[case("1")]
    #[case("0")]
    #[case("")]
    #[case("TRUE")]
    #[case(" true")]
    fn test_boolean_rejects_other_spellings(#[case] raw: &str) {
        assert!(coerce::boolean(raw).is_err());
    }

    #[test]
    fn test_list_and_bytes_have_no_default() {
        let registry = TypeRegistry::new();
        assert!(registry.coercion(ScalarKind::List).is_none());
        assert!(registry.coercion(ScalarKind::Bytes).is_none());
        assert!(registry.supports("list"));
        assert!(registry.supports("bytes"));
    }

    #[test]
    fn test_with_coercion_supplies_list() {
        let registry = TypeRegistry::new().with_coercion(ScalarKind::List, coercion(coerce::comma_list));
        let list = registry.coercion(ScalarKind::List).unwrap();
        assert_eq!(
            list("a, b,,c"),
            Ok(Value::List(vec!["a".into(), "b".into(), "c".into()]))
        );
    }

    #[test]
    fn test_supported_names() {
        let registry = TypeRegistry::new();
        assert_eq!(registry.supported_names(), "str, int, float, bool, list, bytes");
        assert!(!registry.supports("dict"));
        assert_eq!(registry.kind_for("integer"), Some(ScalarKind::Int));
    }

    #[test]
    fn test_non_numeric_rejected() {
        assert!(coerce::integer("8080a").is_err());
        assert!(coerce::integer("").is_err());
        assert!(coerce::float("abc").is_err());
        assert_eq!(coerce::integer(" 42 "), Ok(Value::Int(42)));
    }

    proptest! {
        #[test]
        fn prop_integer_round_trip(n in any::<i64>()) {
            prop_assert_eq!(coerce::integer(&n.to_string()), Ok(Value::Int(n)));
        }

        #[test]
        fn prop_float_round_trip(x in -1.0e12f64..1.0e12f64) {
            prop_assert_eq!(coerce::float(&x.to_string()), Ok(Value::Float(x)));
        }

        #[test]
        fn prop_alphabetic_is_not_integer(s in "[a-zA-Z_]{1,12}") {
            prop_assert!(coerce::integer(&s).is_err());
        }
    }
}
