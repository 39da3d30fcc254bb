use indexmap::IndexMap;
use ini::{Ini, ParseOption};
use std::collections::{HashMap, HashSet};

use crate::config::error::{ConfigError, ConfigResult};

/// 為所有區段提供預設值的特殊區段
pub const DEFAULT_SECTION: &str = "DEFAULT";

/// `%(name)s` 內插的最大遞迴深度
pub const MAX_INTERPOLATION_DEPTH: usize = 10;

type Options = IndexMap<String, Option<String>>;

/// 已解析的設定檔內容
///
/// 區段名稱區分大小寫，選項名稱一律以小寫儲存與查詢。
/// `[DEFAULT]` 中的選項對每個區段都可見。載入後以 `Arc` 共享，不再修改。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackingFile {
    defaults: Options,
    sections: IndexMap<String, Options>,
}

impl BackingFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// 直接解析 INI 文字
    pub fn parse_str(text: &str) -> ConfigResult<Self> {
        Self::parse_with_location(text, "<string>")
    }

    /// 解析 INI 文字，`location` 只用於錯誤訊息
    pub(crate) fn parse_with_location(text: &str, location: &str) -> ConfigResult<Self> {
        let text = Self::check_lines(text, location)?;
        let options = ParseOption {
            enabled_quote: false,
            enabled_escape: false,
            enabled_indented_mutiline_value: true,
            ..ParseOption::default()
        };
        let ini = Ini::load_from_str_opt(&text, options).map_err(|e| ConfigError::ConfigParse {
            location: location.to_string(),
            message: e.to_string(),
        })?;

        let mut file = BackingFile::new();
        for (section, properties) in ini.iter() {
            let Some(section) = section else {
                continue;
            };

            file.add_section(section);
            for (key, value) in properties.iter() {
                file.set(section, key, Some(value));
            }
        }

        Ok(file)
    }

    /// 逐行檢查語法，回傳去除註解行後交給 `ini` 解析的文字
    ///
    /// 每一行必須是空行、註解、`[區段]` 標頭、`key = value` / `key: value`，
    /// 或是選項之後縮排的續行（以 `\n` 接在前一行的值後面）。
    /// 區段標頭不可重複（`DEFAULT` 除外），同一區段內的選項也不可重複。
    fn check_lines(text: &str, location: &str) -> ConfigResult<String> {
        let fail = |line: usize, message: String| ConfigError::ConfigParse {
            location: location.to_string(),
            message: format!("第 {} 行: {}", line, message),
        };

        let mut out = String::with_capacity(text.len());
        let mut seen_sections: HashSet<String> = HashSet::new();
        let mut section: Option<String> = None;
        let mut keys: HashMap<String, HashSet<String>> = HashMap::new();
        let mut in_value = false;

        for (index, line) in text.lines().enumerate() {
            let number = index + 1;
            let trimmed = line.trim();
            let indented = line.starts_with([' ', '\t']);

            if trimmed.is_empty() {
                out.push('\n');
                continue;
            }

            if trimmed.starts_with(['#', ';']) {
                continue;
            }

            if indented && in_value {
                out.push_str(line);
                out.push('\n');
                continue;
            }

            if let Some(header) = trimmed.strip_prefix('[') {
                let name = header
                    .strip_suffix(']')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .ok_or_else(|| fail(number, format!("無效的區段標頭: {}", trimmed)))?;

                if name != DEFAULT_SECTION && !seen_sections.insert(name.to_string()) {
                    return Err(fail(number, format!("區段 [{}] 重複出現", name)));
                }
                section = Some(name.to_string());
                in_value = false;
                out.push('[');
                out.push_str(name);
                out.push_str("]\n");
                continue;
            }

            let Some(split) = trimmed.find(['=', ':']) else {
                return Err(fail(number, format!("缺少 '=' 或 ':': {}", trimmed)));
            };
            let key = trimmed[..split].trim();
            if key.is_empty() {
                return Err(fail(number, format!("缺少選項名稱: {}", trimmed)));
            }
            let Some(current) = section.as_deref() else {
                return Err(fail(number, format!("選項 '{}' 出現在任何區段標頭之前", key)));
            };
            if !keys.entry(current.to_string()).or_default().insert(key.to_lowercase()) {
                return Err(fail(
                    number,
                    format!("區段 [{}] 中的選項 '{}' 重複出現", current, key),
                ));
            }

            in_value = true;
            out.push_str(trimmed);
            out.push('\n');
        }

        Ok(out)
    }

    /// 新增空區段；已存在時不做任何事
    pub fn add_section(&mut self, section: &str) {
        if section != DEFAULT_SECTION && !self.sections.contains_key(section) {
            self.sections.insert(section.to_string(), Options::new());
        }
    }

    /// 設定選項原始值，`None` 表示沒有值
    pub fn set(&mut self, section: &str, option: &str, value: Option<&str>) {
        let value = value.map(str::to_string);
        let option = option.to_lowercase();
        if section == DEFAULT_SECTION {
            self.defaults.insert(option, value);
        } else {
            self.sections
                .entry(section.to_string())
                .or_default()
                .insert(option, value);
        }
    }

    /// 是否有此區段（`DEFAULT` 不算一般區段）
    pub fn has_section(&self, section: &str) -> bool {
        self.sections.contains_key(section)
    }

    /// 依檔案順序列出區段名稱
    pub fn sections(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    /// 區段內可讀取的選項，包含繼承自 `DEFAULT` 的選項
    pub fn options(&self, section: &str) -> Option<Vec<&str>> {
        let own = if section == DEFAULT_SECTION {
            None
        } else {
            Some(self.sections.get(section)?)
        };

        let mut names: Vec<&str> = own
            .into_iter()
            .flat_map(|options| options.keys())
            .map(String::as_str)
            .collect();
        for key in self.defaults.keys() {
            if !names.contains(&key.as_str()) {
                names.push(key);
            }
        }
        Some(names)
    }

    /// 取得未內插的原始值
    pub fn get_raw(&self, section: &str, option: &str) -> ConfigResult<Option<&str>> {
        let option = option.to_lowercase();
        let own = if section == DEFAULT_SECTION {
            None
        } else {
            Some(self.sections.get(section).ok_or_else(|| ConfigError::MissingValue {
                section: section.to_string(),
                option: option.clone(),
                reason: "設定檔中沒有此區段",
            })?)
        };

        own.and_then(|options| options.get(&option))
            .or_else(|| self.defaults.get(&option))
            .map(Option::as_deref)
            .ok_or_else(|| ConfigError::MissingValue {
                section: section.to_string(),
                option,
                reason: "區段中沒有此選項",
            })
    }

    /// 取得內插後的值
    pub fn get(&self, section: &str, option: &str) -> ConfigResult<Option<String>> {
        match self.get_raw(section, option)? {
            Some(raw) => {
                let mut out = String::with_capacity(raw.len());
                self.interpolate_into(section, option, raw, 1, &mut out)?;
                Ok(Some(out))
            }
            None => Ok(None),
        }
    }

    fn interpolate_into(
        &self,
        section: &str,
        option: &str,
        mut rest: &str,
        depth: usize,
        out: &mut String,
    ) -> ConfigResult<()> {
        let fail = |reason: String| ConfigError::Interpolation {
            section: section.to_string(),
            option: option.to_string(),
            reason,
        };

        if depth > MAX_INTERPOLATION_DEPTH {
            return Err(fail(format!("超過最大內插深度 {}", MAX_INTERPOLATION_DEPTH)));
        }

        while let Some(pos) = rest.find('%') {
            out.push_str(&rest[..pos]);
            let after = &rest[pos + 1..];

            if let Some(tail) = after.strip_prefix('%') {
                out.push('%');
                rest = tail;
            } else if let Some(tail) = after.strip_prefix('(') {
                let reference = tail
                    .find(')')
                    .filter(|&close| close > 0 && tail[close + 1..].starts_with('s'))
                    .ok_or_else(|| fail(format!("無效的內插參照: {}", &rest[pos..])))?;
                let name = tail[..reference].to_lowercase();

                let value = self
                    .get_raw(section, &name)
                    .ok()
                    .flatten()
                    .ok_or_else(|| fail(format!("參照的選項 '{}' 不存在", name)))?;

                if value.contains('%') {
                    self.interpolate_into(section, option, value, depth + 1, out)?;
                } else {
                    out.push_str(value);
                }
                rest = &tail[reference + 2..];
            } else {
                return Err(fail(format!("'%' 後必須接 '%' 或 '('，實際為: {}", &rest[pos..])));
            }
        }

        out.push_str(rest);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const SAMPLE: &str = "\
[DEFAULT]
debug = true
log_dir = /var/log/blog

[Server]
http_server_host=127.0.0.1
HTTP_SERVER_PORT = 8080

# comment line
; another comment
[Paths]
root: /srv
static = %(root)s/static
percent = 100%%
";

    #[test]
    fn test_parse_sections_in_order() {
        let file = BackingFile::parse_str(SAMPLE).unwrap();
        let sections: Vec<&str> = file.sections().collect();
        assert_eq!(sections, vec!["Server", "Paths"]);
        assert!(!file.has_section(DEFAULT_SECTION));
    }

    #[test]
    fn test_option_names_are_case_insensitive() {
        let file = BackingFile::parse_str(SAMPLE).unwrap();
        assert_eq!(file.get_raw("Server", "http_server_port").unwrap(), Some("8080"));
        assert_eq!(file.get_raw("Server", "Http_Server_Host").unwrap(), Some("127.0.0.1"));
    }

    #[test]
    fn test_section_names_are_case_sensitive() {
        let file = BackingFile::parse_str(SAMPLE).unwrap();
        assert_matches!(
            file.get_raw("server", "http_server_host"),
            Err(ConfigError::MissingValue { section, .. }) if section == "server"
        );
    }

    #[test]
    fn test_defaults_are_inherited() {
        let file = BackingFile::parse_str(SAMPLE).unwrap();
        assert_eq!(file.get_raw("Server", "debug").unwrap(), Some("true"));
        assert_eq!(file.get_raw(DEFAULT_SECTION, "log_dir").unwrap(), Some("/var/log/blog"));
        let options = file.options("Server").unwrap();
        assert_eq!(options, vec!["http_server_host", "http_server_port", "debug", "log_dir"]);
    }

    #[test]
    fn test_missing_option() {
        let file = BackingFile::parse_str(SAMPLE).unwrap();
        assert_matches!(
            file.get("Server", "workers"),
            Err(ConfigError::MissingValue { option, .. }) if option == "workers"
        );
    }

    #[test]
    fn test_interpolation() {
        let file = BackingFile::parse_str(SAMPLE).unwrap();
        assert_eq!(file.get("Paths", "static").unwrap().as_deref(), Some("/srv/static"));
        assert_eq!(file.get("Paths", "percent").unwrap().as_deref(), Some("100%"));
        assert_eq!(file.get_raw("Paths", "percent").unwrap(), Some("100%%"));
    }

    #[test]
    fn test_interpolation_errors() {
        let mut file = BackingFile::new();
        file.set("A", "loop", Some("%(loop)s"));
        file.set("A", "dangling", Some("%(nothing)s"));
        file.set("A", "bad", Some("50%"));

        assert_matches!(file.get("A", "loop"), Err(ConfigError::Interpolation { .. }));
        assert_matches!(
            file.get("A", "dangling"),
            Err(ConfigError::Interpolation { reason, .. }) if reason.contains("nothing")
        );
        assert_matches!(file.get("A", "bad"), Err(ConfigError::Interpolation { .. }));
    }

    #[test]
    fn test_null_values_skip_interpolation() {
        let mut file = BackingFile::new();
        file.set("A", "empty", None);
        assert_eq!(file.get("A", "empty").unwrap(), None);
    }

    #[test]
    fn test_option_before_section_is_parse_error() {
        let err = BackingFile::parse_str("orphan = 1\n[Server]\nport = 1\n").unwrap_err();
        assert_matches!(err, ConfigError::ConfigParse { .. });
    }

    #[test]
    fn test_line_without_delimiter_is_parse_error() {
        let err = BackingFile::parse_str("[Redirect]\njunk\nx=1\n").unwrap_err();
        assert_matches!(
            err,
            ConfigError::ConfigParse { message, .. } if message.contains("第 2 行") && message.contains("junk")
        );
    }

    #[test]
    fn test_empty_option_name_is_parse_error() {
        assert_matches!(
            BackingFile::parse_str("[Server]\n= 1\n"),
            Err(ConfigError::ConfigParse { .. })
        );
    }

    #[test]
    fn test_continuation_lines_are_joined() {
        let text = "[Redirect]\nlogin_url = a\n  b\n# note\n\tc\n\nnext = 1\n";
        let file = BackingFile::parse_str(text).unwrap();
        assert_eq!(file.get_raw("Redirect", "login_url").unwrap(), Some("a\nb\nc"));
        assert_eq!(file.get_raw("Redirect", "next").unwrap(), Some("1"));
        assert_eq!(file.options("Redirect").unwrap(), vec!["login_url", "next"]);
    }

    #[test]
    fn test_indented_comment_is_not_a_value() {
        let file = BackingFile::parse_str("[Server]\n  ; off\nport = 1\n").unwrap();
        assert_eq!(file.options("Server").unwrap(), vec!["port"]);
    }

    #[test]
    fn test_duplicate_section_is_parse_error() {
        let err = BackingFile::parse_str("[Server]\nport=1\n[Server]\nport=2\n").unwrap_err();
        assert_matches!(
            err,
            ConfigError::ConfigParse { message, .. } if message.contains("第 3 行") && message.contains("[Server]")
        );
    }

    #[test]
    fn test_duplicate_option_is_parse_error() {
        let err = BackingFile::parse_str("[Server]\nport=1\nPORT=2\n").unwrap_err();
        assert_matches!(
            err,
            ConfigError::ConfigParse { message, .. } if message.contains("第 3 行") && message.contains("PORT")
        );
    }

    #[test]
    fn test_repeated_default_header_merges() {
        let file = BackingFile::parse_str("[DEFAULT]\na=1\n[Server]\n[DEFAULT]\nb=2\n").unwrap();
        assert_eq!(file.get_raw("Server", "a").unwrap(), Some("1"));
        assert_eq!(file.get_raw("Server", "b").unwrap(), Some("2"));
    }

    #[test]
    fn test_values_are_kept_verbatim() {
        let file = BackingFile::parse_str("[Security]\nsecret = \"a\\b\"\n").unwrap();
        assert_eq!(file.get_raw("Security", "secret").unwrap(), Some("\"a\\b\""));
    }
}
