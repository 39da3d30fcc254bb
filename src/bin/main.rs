use anyhow::{anyhow, Context, Result};
use blog_backend::config::{self, ProjectSettings, SectionSet};
use clap::{Parser, Subcommand};
use indexmap::IndexMap;
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// 部落格後端設定工具
#[derive(Parser, Debug)]
#[command(name = "blog_backend", version, about)]
struct Cli {
    /// 設定檔路徑，預設為專案根目錄下的 settings.ini
    #[arg(long, env = "BLOG_SETTINGS")]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 載入並驗證設定檔
    Check,
    /// 以 JSON 輸出所有存在的區段
    Dump,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let path = cli.settings.unwrap_or_else(config::default_settings_path);

    // 初始化設定
    let settings = config::init_settings(&path)
        .with_context(|| format!("無法載入設定檔 {}", path.display()))?;

    // 初始化日誌系統
    let _guard = init_logging(settings)?;

    match cli.command.unwrap_or(Command::Check) {
        Command::Check => check(settings),
        Command::Dump => dump(settings),
    }
}

fn check(settings: &ProjectSettings) -> Result<()> {
    use blog_backend::config::Validator;

    if let Err(err) = settings.validate() {
        error!("設定驗證失敗: {}", err);
        return Err(anyhow!("設定驗證失敗: {}", err));
    }

    let server = settings.server();
    if server.section().is_present() {
        info!(
            "HTTP 伺服器位址: {}:{}",
            server.http_server_host()?,
            server.http_server_port()?
        );
    }
    if settings.postgres().section().is_present() {
        info!("PostgreSQL: {}", settings.postgres().uri()?);
    }
    info!("設定檔 {} 檢查通過", settings.path().display());
    Ok(())
}

fn dump(settings: &ProjectSettings) -> Result<()> {
    let mut sections = IndexMap::new();
    for (key, section) in settings.sections() {
        if !section.is_present() && key != "default" {
            continue;
        }
        match section.snapshot() {
            Ok(values) => {
                sections.insert(key, values);
            }
            Err(err) => warn!("略過區段 {}: {}", section, err),
        }
    }

    let output = serde_json::json!({
        "path": settings.path(),
        "system": settings.system(),
        "sections": sections,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// 依 `[DEFAULT]` 的 `debug` 與 `log_dir` 設定日誌
///
/// 回傳的 guard 必須存活到程式結束，否則檔案日誌會遺失。
fn init_logging(settings: &ProjectSettings) -> Result<Option<WorkerGuard>> {
    let defaults = settings.default_section();
    let level = match defaults.section().get_optional::<bool>("debug")? {
        Some(true) => LevelFilter::DEBUG,
        _ => LevelFilter::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()));

    let guard = match defaults.section().get_optional::<String>("log_dir")? {
        Some(log_dir) => {
            let appender = file_appender(&log_dir)?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing::subscriber::set_global_default(
                builder.with_writer(writer).with_ansi(false).finish(),
            )
            .map_err(|e| anyhow!("設置日誌系統失敗: {}", e))?;
            Some(guard)
        }
        None => {
            tracing::subscriber::set_global_default(builder.finish())
                .map_err(|e| anyhow!("設置日誌系統失敗: {}", e))?;
            None
        }
    };

    info!("日誌系統初始化完成");
    Ok(guard)
}

/// 每日輪替的日誌檔；目錄無法建立時回傳錯誤
fn file_appender(log_dir: &str) -> Result<RollingFileAppender> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("blog_backend")
        .filename_suffix("log")
        .build(log_dir)
        .with_context(|| format!("無法在 {} 建立日誌檔", log_dir))
}
