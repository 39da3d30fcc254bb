use indexmap::IndexMap;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::backing::BackingFile;
use crate::config::error::ConfigResult;
use crate::config::loader::SettingsLoader;
use crate::config::registry::TypeRegistry;
use crate::config::section::Section;
use crate::config::sections::{
    DefaultSection, MySql, PostgreSql, Redirect, Redis, Security, Server,
};
use crate::config::validation::Validator;
use crate::config::value::Value;

/// 每個區段的快照：選項名稱到值
pub type SectionSnapshot = IndexMap<String, Value>;

/// 由多個具名區段組成的集合
pub trait SectionSet {
    /// 依宣告順序列出 `(邏輯名稱, 區段)`
    fn sections(&self) -> Vec<(&'static str, &Section)>;

    /// 讀取所有區段的所有選項
    fn snapshot(&self) -> ConfigResult<IndexMap<&'static str, SectionSnapshot>> {
        self.sections()
            .into_iter()
            .map(|(key, section)| Ok((key, section.snapshot()?)))
            .collect()
    }
}

/// 專案的所有設定區段
#[derive(Debug)]
pub struct ProjectSections {
    pub default: DefaultSection,
    pub mysql: MySql,
    pub postgres: PostgreSql,
    pub redis: Redis,
    pub security: Security,
    pub redirect: Redirect,
    pub server: Server,
}

impl ProjectSections {
    /// 宣告所有區段，任何結構錯誤都會中止
    pub fn declare(registry: &Arc<TypeRegistry>) -> ConfigResult<Self> {
        Ok(Self {
            default: DefaultSection::declare(registry)?,
            mysql: MySql::declare(registry)?,
            postgres: PostgreSql::declare(registry)?,
            redis: Redis::declare(registry)?,
            security: Security::declare(registry)?,
            redirect: Redirect::declare(registry)?,
            server: Server::declare(registry)?,
        })
    }
}

impl SectionSet for ProjectSections {
    fn sections(&self) -> Vec<(&'static str, &Section)> {
        vec![
            ("default", self.default.section()),
            ("mysql", self.mysql.section()),
            ("postgres", self.postgres.section()),
            ("redis", self.redis.section()),
            ("security", self.security.section()),
            ("redirect", self.redirect.section()),
            ("server", self.server.section()),
        ]
    }
}

/// 跨區段共用的系統設定
///
/// 其中的金鑰與逾時欄位在建立 [`ProjectSettings`] 時從 `[Security]` 複製，
/// 讓只需要一般設定的元件不必知道安全性區段。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemSettings {
    pub secret_key: String,
    pub algorithm: String,
    pub access_token_expire_minutes: i64,
    pub refresh_token_expire_minutes: Option<i64>,
    pub page_size: u32,
    pub page_query_param: &'static str,
    pub page_size_query_param: &'static str,
    pub templates_dir: PathBuf,
    pub authentication_backends: Vec<&'static str>,
    pub ram_authentication_backends: Vec<&'static str>,
}

impl SystemSettings {
    pub const PAGE_SIZE: u32 = 10;
    pub const PAGE_QUERY_PARAM: &'static str = "Page";
    pub const PAGE_SIZE_QUERY_PARAM: &'static str = "PageSize";
    pub const DEFAULT_BACKEND: &'static str = "apps.services.backends.DefaultBackend";
    pub const GOOGLE_BACKEND: &'static str = "apps.services.backends.GoogleBackend";

    /// 從已綁定的安全性區段衍生
    pub fn derive(security: &Security) -> ConfigResult<Self> {
        Ok(Self {
            secret_key: security.jwt_secret_key()?,
            algorithm: security.algorithm()?,
            access_token_expire_minutes: security.access_token_expire_minutes()?,
            refresh_token_expire_minutes: security
                .section()
                .get_optional("refresh_token_expire_minutes")?,
            page_size: Self::PAGE_SIZE,
            page_query_param: Self::PAGE_QUERY_PARAM,
            page_size_query_param: Self::PAGE_SIZE_QUERY_PARAM,
            templates_dir: Path::new(env!("CARGO_MANIFEST_DIR")).join("apps/templates"),
            authentication_backends: vec![Self::DEFAULT_BACKEND, Self::GOOGLE_BACKEND],
            ram_authentication_backends: vec![Self::DEFAULT_BACKEND],
        })
    }
}

/// 專案設定
///
/// 建立時依序：宣告區段、載入設定檔、綁定所有區段、衍生系統設定。
/// 前三步任何失敗都會中止建立。
#[derive(Debug)]
pub struct ProjectSettings {
    path: PathBuf,
    sections: ProjectSections,
    system: SystemSettings,
}

impl ProjectSettings {
    /// 使用共用型別註冊表從指定路徑載入
    pub fn load<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        Self::load_with(path, &TypeRegistry::shared(), |_| {})
    }

    /// 宣告區段後、綁定前先呼叫 `configure`
    ///
    /// 用於只對單一區段註冊型別轉換，或調整 `allow_undefined`。
    ///
    /// ```no_run
    /// use blog_backend::config::{coercion, ProjectSettings, ScalarKind, TypeRegistry, Value};
    ///
    /// let settings = ProjectSettings::load_with("settings.ini", &TypeRegistry::shared(), |sections| {
    ///     sections.server.section_mut().register_type_override(
    ///         ScalarKind::Bool,
    ///         coercion(|raw| Ok(Value::Bool(raw == "on"))),
    ///     );
    ///     sections.security.section_mut().set_allow_undefined(false);
    /// })
    /// .unwrap();
    /// # let _ = settings;
    /// ```
    pub fn load_with<P, F>(path: P, registry: &Arc<TypeRegistry>, configure: F) -> ConfigResult<Self>
    where
        P: AsRef<Path>,
        F: FnOnce(&mut ProjectSections),
    {
        let mut sections = ProjectSections::declare(registry)?;
        configure(&mut sections);
        let loader = SettingsLoader::new(path.as_ref());
        let parser = Arc::new(loader.load()?);
        let settings = Self::assemble(loader.path().to_path_buf(), sections, parser)?;

        if let Err(err) = settings.validate() {
            warn!("設定驗證失敗: {}", err);
        } else {
            debug!("設定驗證通過");
        }

        Ok(settings)
    }

    /// 以已解析的設定檔建立，不讀取磁碟
    pub fn from_backing(parser: BackingFile) -> ConfigResult<Self> {
        Self::from_backing_with(parser, |_| {})
    }

    pub fn from_backing_with<F>(parser: BackingFile, configure: F) -> ConfigResult<Self>
    where
        F: FnOnce(&mut ProjectSections),
    {
        let mut sections = ProjectSections::declare(&TypeRegistry::shared())?;
        configure(&mut sections);
        Self::assemble(PathBuf::new(), sections, Arc::new(parser))
    }

    fn assemble(
        path: PathBuf,
        sections: ProjectSections,
        parser: Arc<BackingFile>,
    ) -> ConfigResult<Self> {
        let bound = SettingsLoader::bind(&parser, &sections);
        debug!("已綁定 {} 個區段", bound);

        let system = SystemSettings::derive(&sections.security)?;
        Ok(Self {
            path,
            sections,
            system,
        })
    }

    /// 設定檔路徑；由 [`ProjectSettings::from_backing`] 建立時為空
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn system(&self) -> &SystemSettings {
        &self.system
    }

    pub fn default_section(&self) -> &DefaultSection {
        &self.sections.default
    }

    pub fn mysql(&self) -> &MySql {
        &self.sections.mysql
    }

    pub fn postgres(&self) -> &PostgreSql {
        &self.sections.postgres
    }

    pub fn redis(&self) -> &Redis {
        &self.sections.redis
    }

    pub fn security(&self) -> &Security {
        &self.sections.security
    }

    pub fn redirect(&self) -> &Redirect {
        &self.sections.redirect
    }

    pub fn server(&self) -> &Server {
        &self.sections.server
    }

    /// 只包含設定檔中實際存在的區段（`DEFAULT` 不計）
    pub fn present_sections(&self) -> Vec<(&'static str, &Section)> {
        self.sections()
            .into_iter()
            .filter(|(_, section)| section.is_present())
            .collect()
    }
}

impl SectionSet for ProjectSettings {
    fn sections(&self) -> Vec<(&'static str, &Section)> {
        self.sections.sections()
    }
}
