use std::path::PathBuf;
use thiserror::Error;

use crate::config::registry::ScalarKind;

/// 設定系統錯誤類型
///
/// 致命錯誤（檔案不存在、解析失敗、不支援的型別）在啟動時中止程式；
/// 其餘錯誤在第一次讀取特定選項時才會出現。
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 設定檔不存在
    #[error("找不到設定檔: {}", .path.display())]
    ConfigFileNotFound { path: PathBuf },

    /// 設定檔語法錯誤
    #[error("設定檔解析失敗 {location}: {message}")]
    ConfigParse { location: String, message: String },

    /// 宣告了不支援的選項型別（定義時錯誤）
    #[error("區段 [{section}] 的選項 '{option}' 使用了不支援的型別 '{type_name}'，支援的型別為: {supported}")]
    UnsupportedType {
        section: String,
        option: String,
        type_name: String,
        supported: String,
    },

    /// 同一區段重複宣告選項
    #[error("區段 [{section}] 重複宣告選項 '{option}'")]
    DuplicateOption { section: String, option: String },

    /// 不允許未定義選項時讀取了未宣告的選項
    #[error("區段 [{section}] 未定義選項 '{option}'")]
    UndefinedOption { option: String, section: String },

    /// 設定檔中缺少區段或選項
    #[error("設定檔缺少值: [{section}] {option} ({reason})")]
    MissingValue {
        section: String,
        option: String,
        reason: &'static str,
    },

    /// 原始字串無法轉換為宣告的型別
    #[error("區段 [{section}] 選項 '{option}' 的值 \"{value}\" 不是有效的 {expected}: {reason}")]
    InvalidValue {
        section: String,
        option: String,
        value: String,
        expected: ScalarKind,
        reason: String,
    },

    /// 型別已註冊但沒有可用的轉換函式
    #[error("區段 [{section}] 選項 '{option}' 的型別 {kind} 沒有註冊轉換函式")]
    NoCoercion {
        section: String,
        option: String,
        kind: ScalarKind,
    },

    /// 轉換結果與要求的 Rust 型別不符
    #[error("區段 [{section}] 選項 '{option}' 預期 {expected}，實際得到 {found}")]
    TypeMismatch {
        section: String,
        option: String,
        expected: &'static str,
        found: &'static str,
    },

    /// `%(name)s` 內插失敗
    #[error("區段 [{section}] 選項 '{option}' 內插失敗: {reason}")]
    Interpolation {
        section: String,
        option: String,
        reason: String,
    },

    /// 區段尚未綁定設定檔
    #[error("區段 [{section}] 尚未綁定設定檔")]
    Unbound { section: String },

    /// 全域設定尚未初始化
    #[error("全域設定尚未初始化，請先呼叫 init_settings")]
    NotInitialized,

    /// IO 錯誤
    #[error("讀取設定檔 {} 失敗: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// 設定結果類型別名
pub type ConfigResult<T> = Result<T, ConfigError>;

impl ConfigError {
    /// 是否為應中止啟動的錯誤
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ConfigError::ConfigFileNotFound { .. }
                | ConfigError::ConfigParse { .. }
                | ConfigError::UnsupportedType { .. }
                | ConfigError::DuplicateOption { .. }
                | ConfigError::Io { .. }
        )
    }
}
