use once_cell::sync::OnceCell;
use std::path::Path;
use tracing::{debug, warn};

use crate::config::error::{ConfigError, ConfigResult};
use crate::config::settings::ProjectSettings;

// 全域設定實例
static SETTINGS: OnceCell<ProjectSettings> = OnceCell::new();

/// 初始化全域設定（在應用程式啟動時呼叫）
///
/// 只有第一次成功的呼叫會載入設定檔；之後的呼叫忽略路徑並回傳同一個實例。
/// 載入失敗時不會留下任何狀態，可以用其他路徑重試。
pub fn init_settings<P: AsRef<Path>>(path: P) -> ConfigResult<&'static ProjectSettings> {
    if let Some(settings) = SETTINGS.get() {
        warn!(
            "設定已經被初始化（{}），忽略 {}",
            settings.path().display(),
            path.as_ref().display()
        );
        return Ok(settings);
    }

    let settings = SETTINGS.get_or_try_init(|| ProjectSettings::load(path.as_ref()))?;
    debug!("設定初始化成功: {}", settings.path().display());
    Ok(settings)
}

/// 取得全域設定實例
pub fn settings() -> ConfigResult<&'static ProjectSettings> {
    SETTINGS.get().ok_or(ConfigError::NotInitialized)
}
