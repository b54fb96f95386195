use anyhow::{Context, Result};

use crate::matching::placeholder::PlaceholderMode;
use crate::matching::skills::MatchStrategy;

const DEFAULT_AI_ENDPOINT: &str = "https://api.free-ai-service.com/v1/chat/completions";

/// Application configuration loaded from environment variables.
/// `DATABASE_URL` is required; everything else has a default and only
/// malformed values fail startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub rust_log: String,
    /// Remote matching is disabled when no key is configured.
    pub ai_api_key: Option<String>,
    pub ai_endpoint: String,
    pub ai_model: String,
    pub match_strategy: MatchStrategy,
    pub placeholder_mode: PlaceholderMode,
    pub placeholder_seed: Option<u64>,
    pub skill_extraction_fallback: bool,
    pub recommendation_limit: usize,
    pub session_ttl_hours: i64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            port: parse_env("PORT", 8080u16).context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            ai_api_key: std::env::var("AI_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty() && k != "demo-key"),
            ai_endpoint: std::env::var("AI_ENDPOINT")
                .unwrap_or_else(|_| DEFAULT_AI_ENDPOINT.to_string()),
            ai_model: std::env::var("AI_MODEL").unwrap_or_else(|_| "free-model".to_string()),
            match_strategy: parse_env("MATCH_STRATEGY", MatchStrategy::Substring)
                .context("MATCH_STRATEGY must be one of exact, substring, fuzzy")?,
            placeholder_mode: parse_env("PLACEHOLDER_SCORES", PlaceholderMode::Random)
                .context("PLACEHOLDER_SCORES must be random or fixed")?,
            placeholder_seed: match std::env::var("PLACEHOLDER_SEED") {
                Ok(raw) => Some(
                    raw.parse::<u64>()
                        .context("PLACEHOLDER_SEED must be an unsigned integer")?,
                ),
                Err(_) => None,
            },
            skill_extraction_fallback: parse_env("SKILL_EXTRACTION_FALLBACK", false)
                .context("SKILL_EXTRACTION_FALLBACK must be true or false")?,
            recommendation_limit: parse_env("RECOMMENDATION_LIMIT", 10usize)
                .context("RECOMMENDATION_LIMIT must be a positive integer")?
                .max(1),
            session_ttl_hours: parse_env("SESSION_TTL_HOURS", 24 * 7i64)
                .context("SESSION_TTL_HOURS must be an integer")?
                .max(1),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Reads `key` and parses it, returning `default` when the variable is unset.
fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("invalid value '{raw}' for {key}: {e}")),
        Err(_) => Ok(default),
    }
}
