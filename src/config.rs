use crate::types::MirrorSet;
use directories::ProjectDirs;
use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

// Include the JSON file at compile time
const REGISTRIES_JSON: &str = include_str!("../assets/registries.json");

// Global cache for the parsed built-in set
static DEFAULTS_CACHE: OnceLock<MirrorSet> = OnceLock::new();

pub const ENV_REGISTRIES: &str = "NMIRROR_REGISTRIES";
pub const ENV_PACKAGE_MANAGER: &str = "NMIRROR_PM";
pub const ENV_PING_TIMEOUT: &str = "NMIRROR_PING_TIMEOUT";
pub const ENV_LOG: &str = "NMIRROR_LOG";

const DEFAULT_PACKAGE_MANAGER: &str = "npm";
const DEFAULT_PING_TIMEOUT: u64 = 5;

/// The built-in mirror list shipped with the binary.
pub fn default_mirrors() -> MirrorSet {
    DEFAULTS_CACHE
        .get_or_init(|| {
            serde_json::from_str(REGISTRIES_JSON)
                .expect("Failed to parse assets/registries.json. This is a compile-time error.")
        })
        .clone()
}

/// 运行时配置, 全部来自环境变量
#[derive(Debug, Clone)]
pub struct Settings {
    pub registries_path: PathBuf,
    pub package_manager: String,
    pub ping_timeout: Duration,
}

impl Settings {
    /// Strategy:
    /// 1. `NMIRROR_REGISTRIES` if set
    /// 2. ~/.config/nmirror/registries.json
    /// 3. ./registries.json
    pub fn from_env() -> Self {
        let registries_path = env::var_os(ENV_REGISTRIES)
            .map(PathBuf::from)
            .or_else(|| {
                ProjectDirs::from("", "", "nmirror")
                    .map(|dirs| dirs.config_dir().join("registries.json"))
            })
            .unwrap_or_else(|| PathBuf::from(".").join("registries.json"));

        let package_manager = env::var(ENV_PACKAGE_MANAGER)
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_PACKAGE_MANAGER.to_string());

        let ping_timeout = parse_timeout(env::var(ENV_PING_TIMEOUT).ok().as_deref());

        Self {
            registries_path,
            package_manager,
            ping_timeout,
        }
    }
}

// 非法或为 0 的值回退到默认值, 保证测速一定会结束
fn parse_timeout(raw: Option<&str>) -> Duration {
    let secs = raw
        .and_then(|s| s.trim().parse::<u64>().ok())
        .filter(|&s| s > 0)
        .unwrap_or(DEFAULT_PING_TIMEOUT);
    Duration::from_secs(secs)
}
