use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::config::backing::BackingFile;
use crate::config::error::{ConfigError, ConfigResult};
use crate::config::settings::SectionSet;

/// 預設設定檔名稱
pub const SETTINGS_FILE_NAME: &str = "settings.ini";

/// 專案根目錄下的預設設定檔路徑
pub fn default_settings_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join(SETTINGS_FILE_NAME)
}

/// 設定檔加載器，負責讀取 INI 檔並綁定到各區段
#[derive(Debug, Clone)]
pub struct SettingsLoader {
    path: PathBuf,
}

impl SettingsLoader {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 讀取並解析設定檔
    ///
    /// 檔案不存在時回傳 `ConfigFileNotFound`，不會產生部分結果。
    pub fn load(&self) -> ConfigResult<BackingFile> {
        if !self.path.exists() {
            return Err(ConfigError::ConfigFileNotFound {
                path: self.path.clone(),
            });
        }

        debug!("從 {} 載入設定檔", self.path.display());
        let text = fs::read_to_string(&self.path).map_err(|source| ConfigError::Io {
            path: self.path.clone(),
            source,
        })?;

        let file = BackingFile::parse_with_location(&text, &self.path.display().to_string())?;
        debug!("設定檔解析完成，共 {} 個區段", file.sections().count());
        Ok(file)
    }

    /// 將同一份設定檔綁定到集合中的每個區段，回傳綁定數量
    pub fn bind<S: SectionSet + ?Sized>(parser: &Arc<BackingFile>, set: &S) -> usize {
        let sections = set.sections();
        for (key, section) in &sections {
            debug!("綁定區段 {} -> [{}]", key, section.name());
            section.bind(Arc::clone(parser));
        }
        sections.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.ini");
        let err = SettingsLoader::new(&path).load().unwrap_err();
        assert_matches!(err, ConfigError::ConfigFileNotFound { path: missing } if missing == path);
    }

    #[test]
    fn test_load_is_deterministic() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.ini");
        fs::write(&path, "[Server]\nhttp_server_host=0.0.0.0\nhttp_server_port=80\n").unwrap();

        let loader = SettingsLoader::new(&path);
        let first = loader.load().unwrap();
        let second = loader.load().unwrap();
        assert_eq!(first, second);
        assert_eq!(first.get_raw("Server", "http_server_port").unwrap(), Some("80"));
    }

    #[test]
    fn test_parse_error_names_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.ini");
        fs::write(&path, "[Server\nhost=1\n").unwrap();

        let err = SettingsLoader::new(&path).load().unwrap_err();
        assert_matches!(
            err,
            ConfigError::ConfigParse { location, .. } if location.ends_with("broken.ini")
        );
    }

    #[test]
    fn test_default_path() {
        assert!(default_settings_path().ends_with(SETTINGS_FILE_NAME));
    }
}
