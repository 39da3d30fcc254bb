use thiserror::Error;

use crate::config::error::ConfigError;
use crate::config::sections::{MySql, PostgreSql, Redis, Security, Server};
use crate::config::settings::ProjectSettings;

/// 設定驗證錯誤
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("缺少必要設定項: {0}")]
    MissingField(String),

    #[error("無效的設定值: {0}")]
    InvalidValue(String),

    #[error("設定範圍錯誤: {field} 的值 {value} 不在範圍 {min}..{max} 內")]
    RangeError {
        field: String,
        value: String,
        min: String,
        max: String,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// 設定驗證器 trait
pub trait Validator {
    /// 驗證設定
    fn validate(&self) -> Result<(), ValidationError>;
}

/// 驗證工具函數
pub struct ValidationUtils;

impl ValidationUtils {
    /// 驗證設定值是否在指定範圍內
    pub fn in_range<T>(value: T, min: T, max: T, field_name: &str) -> Result<(), ValidationError>
    where
        T: PartialOrd + ToString,
    {
        if value < min || value > max {
            return Err(ValidationError::RangeError {
                field: field_name.to_string(),
                value: value.to_string(),
                min: min.to_string(),
                max: max.to_string(),
            });
        }
        Ok(())
    }

    /// 驗證一個選項是否為某些值中的一個
    pub fn one_of<T>(value: &T, options: &[T], field_name: &str) -> Result<(), ValidationError>
    where
        T: PartialEq + ToString,
    {
        if !options.contains(value) {
            return Err(ValidationError::InvalidValue(format!(
                "{} 的值 {} 不是有效選項: {:?}",
                field_name,
                value.to_string(),
                options.iter().map(ToString::to_string).collect::<Vec<_>>()
            )));
        }
        Ok(())
    }

    /// 檢查必要的字串欄位是否有值
    pub fn not_empty(value: &str, field_name: &str) -> Result<(), ValidationError> {
        if value.trim().is_empty() {
            return Err(ValidationError::MissingField(field_name.to_string()));
        }
        Ok(())
    }

    fn port(port: i64, field_name: &str) -> Result<(), ValidationError> {
        Self::in_range(port, 1, 65535, field_name)
    }
}

impl Validator for Server {
    fn validate(&self) -> Result<(), ValidationError> {
        ValidationUtils::not_empty(&self.http_server_host()?, "Server.http_server_host")?;
        ValidationUtils::port(self.http_server_port()?, "Server.http_server_port")
    }
}

impl Validator for PostgreSql {
    fn validate(&self) -> Result<(), ValidationError> {
        ValidationUtils::not_empty(&self.host()?, "PostgreSQL.host")?;
        ValidationUtils::not_empty(&self.name()?, "PostgreSQL.name")?;
        ValidationUtils::port(self.port()?, "PostgreSQL.port")
    }
}

impl Validator for MySql {
    fn validate(&self) -> Result<(), ValidationError> {
        ValidationUtils::not_empty(&self.host()?, "MySQL.host")?;
        ValidationUtils::not_empty(&self.name()?, "MySQL.name")?;
        ValidationUtils::port(self.port()?, "MySQL.port")
    }
}

impl Validator for Redis {
    fn validate(&self) -> Result<(), ValidationError> {
        ValidationUtils::not_empty(&self.host()?, "Redis.host")?;
        ValidationUtils::port(self.port()?, "Redis.port")?;
        ValidationUtils::in_range(self.default_db()?, 0, 15, "Redis.default_db")?;
        ValidationUtils::in_range(self.secondary_db()?, 0, 15, "Redis.secondary_db")
    }
}

impl Validator for Security {
    fn validate(&self) -> Result<(), ValidationError> {
        ValidationUtils::not_empty(&self.jwt_secret_key()?, "Security.jwt_secret_key")?;
        ValidationUtils::one_of(
            &self.algorithm()?.as_str(),
            &["HS256", "HS384", "HS512"],
            "Security.algorithm",
        )?;
        ValidationUtils::in_range(
            self.access_token_expire_minutes()?,
            1,
            i64::MAX,
            "Security.access_token_expire_minutes",
        )
    }
}

impl Validator for ProjectSettings {
    /// 只驗證設定檔中存在的區段，缺少的區段留到讀取時才報錯
    fn validate(&self) -> Result<(), ValidationError> {
        if self.server().section().is_present() {
            self.server().validate()?;
        }
        if self.postgres().section().is_present() {
            self.postgres().validate()?;
        }
        if self.mysql().section().is_present() {
            self.mysql().validate()?;
        }
        if self.redis().section().is_present() {
            self.redis().validate()?;
        }
        self.security().validate()
    }
}
