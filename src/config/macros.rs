/// 巨集模組：宣告具型別的設定區段
///
/// 每個欄位的 Rust 型別透過 [`FromValue::TYPE_NAME`](crate::config::FromValue)
/// 對應到註冊表中的型別名稱，不支援的 Rust 型別在編譯期即失敗；
/// `declare()` 仍會以執行期的結構驗證建立 [`SectionSchema`](crate::config::SectionSchema)。
///
/// 此巨集會生成：
/// - `NAME` - 設定檔中的區段標頭
/// - `OPTIONS` - 選項名稱與型別名稱
/// - `declare()` - 驗證結構並建立未綁定的區段
/// - 每個欄位一個同名的讀取方法
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use blog_backend::config::{BackingFile, TypeRegistry};
///
/// blog_backend::settings_section! {
///     /// 郵件設定
///     pub struct Mail("Mail") {
///         smtp_host: String,
///         smtp_port: i64,
///     }
/// }
///
/// let mail = Mail::declare(&TypeRegistry::shared()).unwrap();
/// let file = BackingFile::parse_str("[Mail]\nsmtp_host=mx\nsmtp_port=25\n").unwrap();
/// mail.section().bind(Arc::new(file));
/// assert_eq!(mail.smtp_port().unwrap(), 25);
/// ```
#[macro_export]
macro_rules! settings_section {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident($header:literal) {
            $(
                $(#[$field_meta:meta])*
                $field:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            section: $crate::config::Section,
        }

        impl $name {
            pub const NAME: &'static str = $header;

            pub const OPTIONS: &'static [(&'static str, &'static str)] = &[
                $( (stringify!($field), <$ty as $crate::config::FromValue>::TYPE_NAME) ),*
            ];

            pub fn declare(
                registry: &::std::sync::Arc<$crate::config::TypeRegistry>,
            ) -> $crate::config::ConfigResult<Self> {
                let schema = $crate::config::SectionSchema::define(registry, $header, Self::OPTIONS)?;
                Ok(Self {
                    section: $crate::config::Section::with_registry(
                        schema,
                        ::std::sync::Arc::clone(registry),
                    ),
                })
            }

            pub fn section(&self) -> &$crate::config::Section {
                &self.section
            }

            pub fn section_mut(&mut self) -> &mut $crate::config::Section {
                &mut self.section
            }

            $(
                $(#[$field_meta])*
                pub fn $field(&self) -> $crate::config::ConfigResult<$ty> {
                    self.section.get(stringify!($field))
                }
            )*
        }

        impl ::std::convert::AsRef<$crate::config::Section> for $name {
            fn as_ref(&self) -> &$crate::config::Section {
                &self.section
            }
        }

        impl ::std::fmt::Debug for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                ::std::fmt::Debug::fmt(&self.section, f)
            }
        }
    };
}
