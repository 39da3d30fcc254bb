use indexmap::IndexMap;
use tracing::debug;

use crate::config::error::{ConfigError, ConfigResult};
use crate::config::registry::{ScalarKind, TypeRegistry};

/// 單一選項宣告
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionDecl<'a> {
    pub name: &'a str,
    pub kind: ScalarKind,
}

/// 區段結構描述
///
/// 只能透過 [`SectionSchema::define`] 或 [`SectionSchemaBuilder::build`] 建立，
/// 因此每個存在的結構都已通過型別檢查。區段名稱即設定檔中的 `[Header]`，
/// 大小寫需一致。
#[derive(Debug, Clone)]
pub struct SectionSchema {
    name: String,
    options: IndexMap<String, ScalarKind>,
    allow_undefined: bool,
}

impl SectionSchema {
    /// 定義區段並立即驗證所有選項型別
    ///
    /// # Examples
    ///
    /// ```
    /// use blog_backend::config::{SectionSchema, TypeRegistry};
    ///
    /// let registry = TypeRegistry::new();
    /// let schema = SectionSchema::define(
    ///     &registry,
    ///     "Server",
    ///     &[("http_server_host", "str"), ("http_server_port", "int")],
    /// )
    /// .unwrap();
    /// assert_eq!(schema.len(), 2);
    ///
    /// let err = SectionSchema::define(&registry, "Server", &[("workers", "dict")]);
    /// assert!(err.is_err());
    /// ```
    pub fn define(
        registry: &TypeRegistry,
        name: &str,
        options: &[(&str, &str)],
    ) -> ConfigResult<Self> {
        options
            .iter()
            .fold(Self::builder(name), |builder, (option, type_name)| {
                builder.option(*option, *type_name)
            })
            .build(registry)
    }

    pub fn builder(name: impl Into<String>) -> SectionSchemaBuilder {
        SectionSchemaBuilder {
            name: name.into(),
            options: Vec::new(),
            allow_undefined: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 是否允許讀取未宣告的選項（預設為 true）
    pub fn allow_undefined(&self) -> bool {
        self.allow_undefined
    }

    /// 已宣告選項的型別
    pub fn kind_of(&self, option: &str) -> Option<ScalarKind> {
        self.options.get(option).copied()
    }

    /// 依宣告順序列出選項
    pub fn options(&self) -> impl Iterator<Item = OptionDecl<'_>> {
        self.options.iter().map(|(name, kind)| OptionDecl {
            name: name.as_str(),
            kind: *kind,
        })
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}

/// 區段結構建構器
#[derive(Debug, Clone)]
pub struct SectionSchemaBuilder {
    name: String,
    options: Vec<(String, String)>,
    allow_undefined: bool,
}

impl SectionSchemaBuilder {
    /// 宣告一個選項；名稱轉為小寫，型別在 `build` 時檢查
    pub fn option(mut self, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.options.push((name.into().to_lowercase(), type_name.into()));
        self
    }

    pub fn allow_undefined(mut self, allow: bool) -> Self {
        self.allow_undefined = allow;
        self
    }

    /// 驗證並產生結構描述
    pub fn build(self, registry: &TypeRegistry) -> ConfigResult<SectionSchema> {
        let mut options = IndexMap::with_capacity(self.options.len());

        for (option, type_name) in self.options {
            let kind = registry
                .kind_for(&type_name)
                .ok_or_else(|| ConfigError::UnsupportedType {
                    section: self.name.clone(),
                    option: option.clone(),
                    type_name: type_name.clone(),
                    supported: registry.supported_names(),
                })?;

            if options.contains_key(&option) {
                return Err(ConfigError::DuplicateOption {
                    section: self.name,
                    option,
                });
            }
            options.insert(option, kind);
        }

        debug!("區段 [{}] 結構定義完成，共 {} 個選項", self.name, options.len());

        Ok(SectionSchema {
            name: self.name,
            options,
            allow_undefined: self.allow_undefined,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_define_keeps_declaration_order() {
        let registry = TypeRegistry::new();
        let schema = SectionSchema::define(
            &registry,
            "PostgreSQL",
            &[
                ("host", "str"),
                ("port", "int"),
                ("user", "str"),
                ("password", "str"),
                ("name", "str"),
            ],
        )
        .unwrap();

        let names: Vec<&str> = schema.options().map(|decl| decl.name).collect();
        assert_eq!(names, vec!["host", "port", "user", "password", "name"]);
        assert_eq!(schema.kind_of("port"), Some(ScalarKind::Int));
        assert_eq!(schema.kind_of("missing"), None);
        assert!(schema.allow_undefined());
    }

    #[test]
    fn test_unsupported_type_names_option_and_type() {
        let registry = TypeRegistry::new();
        let err = SectionSchema::builder("Redis")
            .option("host", "str")
            .option("pool", "dict")
            .build(&registry)
            .unwrap_err();

        assert_matches!(
            &err,
            ConfigError::UnsupportedType { section, option, type_name, supported }
                if section == "Redis"
                    && option == "pool"
                    && type_name == "dict"
                    && supported == "str, int, float, bool, list, bytes"
        );
        assert!(err.is_fatal());
    }

    #[test]
    fn test_every_supported_type_is_accepted() {
        let registry = TypeRegistry::new();
        for kind in ScalarKind::ALL {
            let schema = SectionSchema::builder("All")
                .option("value", kind.as_str())
                .build(&registry)
                .unwrap();
            assert_eq!(schema.kind_of("value"), Some(kind));
        }
    }

    #[test]
    fn test_duplicate_option_rejected() {
        let registry = TypeRegistry::new();
        let err = SectionSchema::define(&registry, "Server", &[("port", "int"), ("port", "str")])
            .unwrap_err();
        assert_matches!(err, ConfigError::DuplicateOption { option, .. } if option == "port");

        let err = SectionSchema::define(&registry, "Server", &[("port", "int"), ("Port", "int")])
            .unwrap_err();
        assert_matches!(err, ConfigError::DuplicateOption { option, .. } if option == "port");
    }

    #[test]
    fn test_allow_undefined_flag() {
        let registry = TypeRegistry::new();
        let schema = SectionSchema::builder("Strict")
            .allow_undefined(false)
            .build(&registry)
            .unwrap();
        assert!(!schema.allow_undefined());
        assert!(schema.is_empty());
    }
}
