/// 設定管理模組
///
/// 本模組負責從 INI 設定檔載入具型別的設定區段。
/// 每個區段先宣告選項與型別，綁定到共享的設定檔後，讀取時才轉換原始字串。
// 宣告子模組
#[macro_use]
mod macros;

pub mod backing;
pub mod error;
pub mod loader;
pub mod manager;
pub mod registry;
pub mod schema;
pub mod section;
pub mod sections;
pub mod settings;
pub mod validation;
pub mod value;

// 重新導出常用組件
pub use backing::{BackingFile, DEFAULT_SECTION};
pub use error::{ConfigError, ConfigResult};
pub use loader::{default_settings_path, SettingsLoader, SETTINGS_FILE_NAME};
pub use manager::{init_settings, settings};
pub use registry::{coerce, coercion, Coercion, ScalarKind, TypeRegistry};
pub use schema::{OptionDecl, SectionSchema, SectionSchemaBuilder};
pub use section::Section;
pub use sections::*;
pub use settings::{ProjectSections, ProjectSettings, SectionSet, SectionSnapshot, SystemSettings};
pub use validation::{ValidationError, ValidationUtils, Validator};
pub use value::{FromValue, Value};
