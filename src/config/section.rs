use indexmap::IndexMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::config::backing::BackingFile;
use crate::config::error::{ConfigError, ConfigResult};
use crate::config::registry::{Coercion, ScalarKind, TypeRegistry};
use crate::config::schema::SectionSchema;
use crate::config::value::{FromValue, Value};

/// 綁定到設定檔的區段實例
///
/// 每次讀取都重新查詢並轉換原始值，不做快取。
/// 未宣告的選項在允許時會被記錄為 `str`，之後的讀取視同已宣告。
pub struct Section {
    schema: SectionSchema,
    registry: Arc<TypeRegistry>,
    allow_undefined: bool,
    overrides: HashMap<ScalarKind, Coercion>,
    discovered: RwLock<IndexMap<String, ScalarKind>>,
    parser: RwLock<Option<Arc<BackingFile>>>,
}

impl Section {
    /// 使用行程共用的型別註冊表建立區段
    pub fn new(schema: SectionSchema) -> Self {
        Self::with_registry(schema, TypeRegistry::shared())
    }

    pub fn with_registry(schema: SectionSchema, registry: Arc<TypeRegistry>) -> Self {
        Self {
            allow_undefined: schema.allow_undefined(),
            schema,
            registry,
            overrides: HashMap::new(),
            discovered: RwLock::new(IndexMap::new()),
            parser: RwLock::new(None),
        }
    }

    /// 覆寫結構描述中的 `allow_undefined`
    pub fn allow_undefined(mut self, allow: bool) -> Self {
        self.allow_undefined = allow;
        self
    }

    pub fn set_allow_undefined(&mut self, allow: bool) {
        self.allow_undefined = allow;
    }

    pub fn name(&self) -> &str {
        self.schema.name()
    }

    pub fn schema(&self) -> &SectionSchema {
        &self.schema
    }

    /// 綁定共享的設定檔；重複綁定會取代先前的設定檔
    pub fn bind(&self, parser: Arc<BackingFile>) {
        *self.parser.write() = Some(parser);
    }

    pub fn is_bound(&self) -> bool {
        self.parser.read().is_some()
    }

    /// 綁定的設定檔中是否有此區段
    pub fn is_present(&self) -> bool {
        self.parser
            .read()
            .as_ref()
            .map(|parser| parser.has_section(self.name()))
            .unwrap_or(false)
    }

    /// 為此區段註冊型別轉換，優先於註冊表預設
    pub fn register_type_override(&mut self, kind: ScalarKind, coercion: Coercion) {
        self.overrides.insert(kind, coercion);
    }

    /// 已宣告或已發現選項的型別，選項名稱不分大小寫
    pub fn kind_of(&self, option: &str) -> Option<ScalarKind> {
        let option = option.to_lowercase();
        self.schema
            .kind_of(&option)
            .or_else(|| self.discovered.read().get(&option).copied())
    }

    /// 依宣告順序列出所有選項，已發現的未宣告選項排在最後
    pub fn option_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.schema.options().map(|decl| decl.name.to_string()).collect();
        names.extend(self.discovered.read().keys().cloned());
        names
    }

    /// 讀取並轉換選項值
    pub fn resolve(&self, option: &str) -> ConfigResult<Value> {
        let option = option.to_lowercase();
        let option = option.as_str();
        let kind = match self.kind_of(option) {
            Some(kind) => kind,
            None if self.allow_undefined => {
                debug!("區段 [{}] 讀取未宣告的選項 '{}'，以 str 處理", self.name(), option);
                *self
                    .discovered
                    .write()
                    .entry(option.to_string())
                    .or_insert(ScalarKind::Str)
            }
            None => {
                return Err(ConfigError::UndefinedOption {
                    option: option.to_string(),
                    section: self.name().to_string(),
                })
            }
        };

        let parser = self.parser()?;
        let Some(raw) = parser.get(self.name(), option)? else {
            return Ok(Value::Null);
        };

        let coerce = self
            .overrides
            .get(&kind)
            .or_else(|| self.registry.coercion(kind))
            .ok_or_else(|| ConfigError::NoCoercion {
                section: self.name().to_string(),
                option: option.to_string(),
                kind,
            })?;

        coerce(raw.as_str()).map_err(|reason| ConfigError::InvalidValue {
            section: self.name().to_string(),
            option: option.to_string(),
            value: raw.clone(),
            expected: kind,
            reason,
        })
    }

    /// 讀取選項並取出指定的 Rust 型別
    pub fn get<T: FromValue>(&self, option: &str) -> ConfigResult<T> {
        let value = self.resolve(option)?;
        T::from_value(value).map_err(|found| ConfigError::TypeMismatch {
            section: self.name().to_string(),
            option: option.to_string(),
            expected: T::TYPE_NAME,
            found: found.kind_name(),
        })
    }

    /// 同 [`Section::get`]，但設定檔中缺少選項時回傳 `None`
    pub fn get_optional<T: FromValue>(&self, option: &str) -> ConfigResult<Option<T>> {
        match self.get(option) {
            Ok(value) => Ok(Some(value)),
            Err(ConfigError::MissingValue { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// 讀取所有選項，回傳名稱到值的對應
    pub fn snapshot(&self) -> ConfigResult<IndexMap<String, Value>> {
        self.option_names()
            .into_iter()
            .map(|option| {
                let value = self.resolve(&option)?;
                Ok((option, value))
            })
            .collect()
    }

    fn parser(&self) -> ConfigResult<Arc<BackingFile>> {
        self.parser
            .read()
            .as_ref()
            .map(Arc::clone)
            .ok_or_else(|| ConfigError::Unbound {
                section: self.name().to_string(),
            })
    }
}

impl fmt::Debug for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Section")
            .field("name", &self.name())
            .field("options", &self.option_names())
            .field("allow_undefined", &self.allow_undefined)
            .field("bound", &self.is_bound())
            .finish()
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} section>", self.name())
    }
}
