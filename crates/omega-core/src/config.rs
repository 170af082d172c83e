//! Gateway configuration loaded from `.env` / process environment.
//!
//! | Env | Default | Description |
//! |-----|---------|-------------|
//! | OMEGA_PORT | 8000 | HTTP port for the gateway. |
//! | OMEGA_DB_PATH | ./data/ai_task.db | SQLite file for the answer store. |
//! | JWT_ALG | HS256 | Signing algorithm for bearer tokens. |
//! | JWT_SECRET | change-me-in-prod | Shared signing secret. |
//! | DEFAULT_MODEL | gpt-4o-mini | Chat completion model. |
//! | IMAGE_MODEL | gpt-image-1 | Image generation model. |
//! | OPENAI_API_KEY | (empty) | API key for the generation API. |
//! | OPENAI_API_BASE | https://api.openai.com/v1 | Base URL of the generation API. |
//! | OMEGA_TOOL_HINT_ENABLED | false | Prefix qa prompts with the demo uppercase hint. |

/// Runtime configuration for the gateway. Unset or invalid values fall back
/// to the defaults above.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub port: u16,
    pub database_path: String,
    pub jwt_algorithm: String,
    pub jwt_secret: String,
    pub text_model: String,
    pub image_model: String,
    pub api_key: String,
    pub api_base: String,
    pub tool_hint_enabled: bool,
}

impl GatewayConfig {
    /// Load from environment. `.env` loading (dotenvy) is the binary's job.
    pub fn from_env() -> Self {
        Self {
            port: env_u16("OMEGA_PORT", 8000),
            database_path: env_string("OMEGA_DB_PATH", "./data/ai_task.db"),
            jwt_algorithm: env_string("JWT_ALG", "HS256"),
            jwt_secret: env_string("JWT_SECRET", "change-me-in-prod"),
            text_model: env_string("DEFAULT_MODEL", "gpt-4o-mini"),
            image_model: env_string("IMAGE_MODEL", "gpt-image-1"),
            api_key: env_string("OPENAI_API_KEY", ""),
            api_base: env_string("OPENAI_API_BASE", "https://api.openai.com/v1"),
            tool_hint_enabled: env_bool("OMEGA_TOOL_HINT_ENABLED", false),
        }
    }
}

fn env_string(name: &str, default: &str) -> String {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => default.to_string(),
    }
}

fn env_bool(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(v) => v.trim().eq_ignore_ascii_case("true") || (v.trim().is_empty() && default),
        Err(_) => default,
    }
}

fn env_u16(name: &str, default: u16) -> u16 {
    match std::env::var(name) {
        Ok(v) => v.trim().parse().unwrap_or(default),
        Err(_) => default,
    }
}
