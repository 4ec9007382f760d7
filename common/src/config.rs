use once_cell::sync::OnceCell;
use serde::Deserialize;
use std::env;

/// Process-wide configuration, loaded once from the environment (`.env` first).
///
/// Mirrors the environment knobs laid out in the spec's "Environment knobs"
/// table, plus the ambient concerns (logging, binding address, Redis) every
/// deployment needs regardless of which presence features are enabled.
#[derive(Debug, Deserialize)]
pub struct Config {
    pub project_name: String,
    pub log_level: String,
    pub log_file: String,
    pub host: String,
    pub port: u16,
    pub redis_url: String,

    pub presence_ttl_active_secs: u64,
    pub presence_ttl_passive_secs: u64,
    pub presence_ttl_clamp_secs: u64,

    pub ema_alpha: f64,
    pub ema_update_interval_secs: u64,

    pub ws_ping_interval_secs: u64,
    pub ws_pong_miss_limit: u32,

    pub polling_interval_secs: u64,
    pub polling_interval_passive_secs: u64,
    pub ttl_refresh_interval_secs: u64,
    pub ttl_refresh_interval_passive_secs: u64,

    pub leave_tombstone_ttl_secs: u64,
    pub seen_leave_ttl_secs: u64,

    pub disconnect_grace_ms: u64,
    pub disconnect_verify_delay_secs: u64,
    pub disconnect_ttl_floor_secs: i64,
}

static CONFIG: OnceCell<Config> = OnceCell::new();

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn init(env_path: &str) -> &'static Self {
        dotenvy::from_filename(env_path).ok();

        CONFIG.get_or_init(|| {
            let log_file = env_or("LOG_FILE", "logs/api.log");
            if let Some(parent) = std::path::Path::new(&log_file).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).expect("Failed to create log directory");
                }
            }

            Config {
                project_name: env_or("PROJECT_NAME", "active-users-presence"),
                log_level: env_or("LOG_LEVEL", "debug"),
                log_file,
                host: env_or("HOST", "127.0.0.1"),
                port: env_parse("PORT", 3000),
                redis_url: env_or("REDIS_URL", "redis://127.0.0.1:6379"),

                presence_ttl_active_secs: env_parse("PRESENCE_TTL_ACTIVE_SECS", 600),
                presence_ttl_passive_secs: env_parse("PRESENCE_TTL_PASSIVE_SECS", 300),
                presence_ttl_clamp_secs: env_parse("PRESENCE_TTL_CLAMP_SECS", 600),

                ema_alpha: env_parse("EMA_ALPHA", 0.2),
                ema_update_interval_secs: env_parse("EMA_UPDATE_INTERVAL_SECS", 30),

                ws_ping_interval_secs: env_parse("WS_PING_INTERVAL_SECS", 25),
                ws_pong_miss_limit: env_parse("WS_PONG_MISS_LIMIT", 2),

                polling_interval_secs: env_parse("POLLING_INTERVAL_SECS", 45),
                polling_interval_passive_secs: env_parse("POLLING_INTERVAL_PASSIVE_SECS", 5400),
                ttl_refresh_interval_secs: env_parse("TTL_REFRESH_INTERVAL_SECS", 120),
                ttl_refresh_interval_passive_secs: env_parse(
                    "TTL_REFRESH_INTERVAL_PASSIVE_SECS",
                    5400,
                ),

                leave_tombstone_ttl_secs: env_parse("LEAVE_TOMBSTONE_TTL_SECS", 30),
                seen_leave_ttl_secs: env_parse("SEEN_LEAVE_TTL_SECS", 30),

                disconnect_grace_ms: env_parse("DISCONNECT_GRACE_MS", 500),
                disconnect_verify_delay_secs: env_parse("DISCONNECT_VERIFY_DELAY_SECS", 10),
                disconnect_ttl_floor_secs: env_parse("DISCONNECT_TTL_FLOOR_SECS", 15),
            }
        })
    }

    pub fn get() -> &'static Self {
        CONFIG.get().expect("Config not initialized")
    }
}
