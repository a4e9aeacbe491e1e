use std::{env, str::FromStr, sync::Arc};

use uuid::Uuid;

#[derive(Clone, Debug)]
/// Configuration struct for the server.
///
/// This struct holds all the necessary configuration parameters
/// required to initialize and run the server.
/// It includes database and Redis connection details, JWT configuration,
/// server host and port, number of worker threads, CORS settings,
/// logging preferences, Stripe keys, the completion provider and
/// the plan limits applied by the entitlement check.
pub struct Config {
    // environment
    pub environment: String, // development or production
    /// The URL of the database to connect to.
    pub database_url: String,
    /// The URL of Redis server to connect to.
    pub redis_url: String,
    /// Configuration for JWT (JSON Web Token) authentication.
    pub jwt_config: JwtConfig,
    /// The hostname or IP address the server will bind to.
    pub server_host: String,
    /// The port number the server will listen on.
    pub server_port: u16,
    /// The number of worker threads to spawn for handling requests.
    pub num_workers: usize,
    /// The allowed origin for CORS (Cross-Origin Resource Sharing).
    pub cors_allowed_origin: String,
    /// A boolean indicating whether console logging is enabled.
    pub console_logging_enabled: bool,
    /// Path of the log file written next to the console output.
    pub log_file: String,
    /// Stripe secret key
    pub stripe_secret_key: String,
    /// Stripe webhook secret
    pub stripe_webhook_secret: String,
    /// Currency used for checkout sessions (lowercase ISO code).
    pub checkout_currency: String,
    /// Settings of the text-completion provider.
    pub completion: CompletionConfig,
    /// TTLs of the cache tiers.
    pub cache: CacheConfig,
    /// Plan caps and request limits.
    pub limits: LimitsConfig,
    /// Users allowed to review and resolve feedback.
    pub staff_user_ids: Vec<Uuid>,
}

#[derive(Clone, Debug)]
/// Configuration for JSON Web Token (JWT) authentication.
///
/// Tokens are issued by the identity provider; this service only verifies
/// them with the shared secret.
pub struct JwtConfig {
    /// The secret key used to sign and verify JWTs.
    pub secret: String,
    /// The expiration time for JWTs in hours.
    pub expiration_hours: i64,
}

impl JwtConfig {
    /// Creates a new `JwtConfig` instance from environment variables.
    ///
    /// Reads the JWT configuration from environment variables:
    /// - `JWT_SECRET`: Required. The secret key for JWT signing.
    /// - `JWT_EXPIRATION_HOURS`: Optional. Defaults to 24 hours if not provided.
    ///
    /// # Panics
    ///
    /// This function will panic if:
    /// - `JWT_SECRET` environment variable is not set
    /// - `JWT_EXPIRATION_HOURS` is set but cannot be parsed as a valid number
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        JwtConfig {
            secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
            expiration_hours: env::var("JWT_EXPIRATION_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()
                .expect("JWT_EXPIRATION_HOURS must be a valid number"),
        }
    }
}

/// Response contract requested from the completion provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Two-section text with `MEAL PLAN:` and `GROCERY LIST:` markers.
    Text,
    /// JSON document validated against the plan schema.
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}

#[derive(Clone, Debug)]
/// Settings of the OpenAI-compatible completion endpoint.
pub struct CompletionConfig {
    /// Base URL, e.g. `https://api.openai.com/v1`.
    pub api_url: String,
    pub api_key: String,
    pub model: String,
    /// Upper bound of generated tokens per call.
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
    /// Total attempts per call, including the first one.
    pub max_attempts: u32,
    /// Delay before the first retry; doubled on every further retry.
    pub backoff_ms: u64,
    pub output_format: OutputFormat,
}

impl CompletionConfig {
    /// Reads the completion provider settings.
    ///
    /// # Panics
    ///
    /// Panics when a numeric variable is set but cannot be parsed.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        CompletionConfig {
            api_url: env::var("COMPLETION_API_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            api_key: env::var("COMPLETION_API_KEY").unwrap_or_default(),
            model: env::var("COMPLETION_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            max_tokens: parse_var("COMPLETION_MAX_TOKENS", 2000),
            temperature: parse_var("COMPLETION_TEMPERATURE", 0.7),
            timeout_secs: parse_var("COMPLETION_TIMEOUT_SECS", 60),
            max_attempts: parse_var("COMPLETION_MAX_ATTEMPTS", 3),
            backoff_ms: parse_var("COMPLETION_BACKOFF_MS", 500),
            output_format: parse_var("COMPLETION_OUTPUT_FORMAT", OutputFormat::Text),
        }
    }
}

impl Default for CompletionConfig {
    fn default() -> Self {
        CompletionConfig {
            api_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            model: "gpt-4o-mini".to_string(),
            max_tokens: 2000,
            temperature: 0.7,
            timeout_secs: 60,
            max_attempts: 3,
            backoff_ms: 500,
            output_format: OutputFormat::Text,
        }
    }
}

#[derive(Clone, Debug)]
/// TTLs (in seconds) of the three cache tiers.
pub struct CacheConfig {
    pub short_ttl_secs: u64,
    pub medium_ttl_secs: u64,
    pub long_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            short_ttl_secs: 300,
            medium_ttl_secs: 900,
            long_ttl_secs: 3600,
        }
    }
}

#[derive(Clone, Debug)]
pub struct LimitsConfig {
    /// Meal plans a user without a subscription may own.
    pub free_plan_limit: i64,
    /// Meal plans a one-time purchase covers.
    pub one_time_plan_limit: i64,
    /// Global requests per second across all clients.
    pub global_requests_per_second: u32,
    /// Generation requests allowed per user within `generation_window_secs`.
    pub generation_requests: u32,
    pub generation_window_secs: u64,
    /// How long finished generation results stay pollable.
    pub task_retention_secs: u64,
    /// Feedback submissions allowed per user within `feedback_window_secs`.
    pub feedback_requests: u32,
    pub feedback_window_secs: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        LimitsConfig {
            free_plan_limit: 3,
            one_time_plan_limit: 1,
            global_requests_per_second: 10,
            generation_requests: 5,
            generation_window_secs: 60,
            task_retention_secs: 3600,
            feedback_requests: 3,
            feedback_window_secs: 3600,
        }
    }
}

/// Development settings without secrets; used by tests and local tooling.
impl Default for Config {
    fn default() -> Self {
        Config {
            environment: "development".to_string(),
            database_url: String::new(),
            redis_url: String::new(),
            jwt_config: JwtConfig {
                secret: String::new(),
                expiration_hours: 24,
            },
            server_host: "127.0.0.1".to_string(),
            server_port: 8080,
            num_workers: 4,
            cors_allowed_origin: "http://localhost:3000".to_string(),
            console_logging_enabled: false,
            log_file: "mealplanner.log".to_string(),
            stripe_secret_key: String::new(),
            stripe_webhook_secret: String::new(),
            checkout_currency: "gbp".to_string(),
            completion: CompletionConfig::default(),
            cache: CacheConfig::default(),
            limits: LimitsConfig::default(),
            staff_user_ids: Vec::new(),
        }
    }
}

impl Config {
    /// Creates a new `Config` instance from environment variables.
    ///
    /// Loads all configuration values from environment variables with sensible defaults
    /// for most optional settings.
    ///
    /// # Environment Variables
    ///
    /// Required:
    /// - `ENVIRONMENT`: `development` or `production`
    /// - `DATABASE_URL`: Connection string for the database
    /// - `REDIS_URL`: Connection string for Redis
    /// - `JWT_SECRET`: Secret key for JWT verification (via `JwtConfig::from_env()`)
    ///
    /// Optional (with defaults):
    /// - `IP`: Server host (default: "127.0.0.1")
    /// - `PORT`: Server port (default: 8080)
    /// - `WORKERS`: Number of worker threads (default: 4)
    /// - `CORS_ALLOWED_ORIGIN`: Allowed CORS origin (default: "http://localhost:3000")
    /// - `ENABLE_CONSOLE_LOGGING`: Whether to enable console logging (default: true)
    /// - `LOG_FILE`: Log file path (default: "mealplanner.log")
    /// - `STRIPE_SECRET_KEY`, `STRIPE_WEBHOOK_SECRET`, `CHECKOUT_CURRENCY` (default: "gbp")
    /// - `COMPLETION_*`: see [`CompletionConfig::from_env`]
    /// - `CACHE_TTL_SHORT`, `CACHE_TTL_MEDIUM`, `CACHE_TTL_LONG` (seconds)
    /// - `FREE_PLAN_LIMIT` (3), `ONE_TIME_PLAN_LIMIT` (1), `GLOBAL_RPS` (10),
    ///   `GENERATION_REQUESTS` (5), `GENERATION_WINDOW_SECS` (60), `TASK_RETENTION_SECS` (3600),
    ///   `FEEDBACK_REQUESTS` (3), `FEEDBACK_WINDOW_SECS` (3600)
    /// - `STAFF_USER_IDS`: comma separated user ids allowed to resolve feedback
    ///
    /// # Panics
    ///
    /// This function will panic if required environment variables are missing or if
    /// numeric values cannot be parsed correctly.
    pub fn from_env() -> Arc<Self> {
        dotenvy::dotenv().ok();

        let stripe_secret_key = env::var("STRIPE_SECRET_KEY").unwrap_or_default();
        let stripe_webhook_secret = env::var("STRIPE_WEBHOOK_SECRET").unwrap_or_default();

        let cache_defaults = CacheConfig::default();
        let limit_defaults = LimitsConfig::default();

        Arc::new(Config {
            environment: env::var("ENVIRONMENT").expect("ENVIRONMENT must be set"),
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            redis_url: env::var("REDIS_URL").expect("REDIS_URL must be set"),
            jwt_config: JwtConfig::from_env(),
            server_host: env::var("IP").unwrap_or_else(|_| "127.0.0.1".to_string()),
            server_port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            num_workers: env::var("WORKERS")
                .unwrap_or_else(|_| "4".to_string())
                .parse()
                .unwrap_or(4),
            cors_allowed_origin: env::var("CORS_ALLOWED_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            console_logging_enabled: env::var("ENABLE_CONSOLE_LOGGING")
                .unwrap_or_else(|_| "true".to_string())
                .to_lowercase()
                == "true",
            log_file: env::var("LOG_FILE").unwrap_or_else(|_| "mealplanner.log".to_string()),
            stripe_secret_key,
            stripe_webhook_secret,
            checkout_currency: env::var("CHECKOUT_CURRENCY")
                .unwrap_or_else(|_| "gbp".to_string())
                .to_lowercase(),
            completion: CompletionConfig::from_env(),
            cache: CacheConfig {
                short_ttl_secs: parse_var("CACHE_TTL_SHORT", cache_defaults.short_ttl_secs),
                medium_ttl_secs: parse_var("CACHE_TTL_MEDIUM", cache_defaults.medium_ttl_secs),
                long_ttl_secs: parse_var("CACHE_TTL_LONG", cache_defaults.long_ttl_secs),
            },
            limits: LimitsConfig {
                free_plan_limit: parse_var("FREE_PLAN_LIMIT", limit_defaults.free_plan_limit),
                one_time_plan_limit: parse_var(
                    "ONE_TIME_PLAN_LIMIT",
                    limit_defaults.one_time_plan_limit,
                ),
                global_requests_per_second: parse_var(
                    "GLOBAL_RPS",
                    limit_defaults.global_requests_per_second,
                ),
                generation_requests: parse_var(
                    "GENERATION_REQUESTS",
                    limit_defaults.generation_requests,
                ),
                generation_window_secs: parse_var(
                    "GENERATION_WINDOW_SECS",
                    limit_defaults.generation_window_secs,
                ),
                task_retention_secs: parse_var(
                    "TASK_RETENTION_SECS",
                    limit_defaults.task_retention_secs,
                ),
                feedback_requests: parse_var("FEEDBACK_REQUESTS", limit_defaults.feedback_requests),
                feedback_window_secs: parse_var(
                    "FEEDBACK_WINDOW_SECS",
                    limit_defaults.feedback_window_secs,
                ),
            },
            staff_user_ids: parse_id_list(&env::var("STAFF_USER_IDS").unwrap_or_default()),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_staff(&self, user_id: Uuid) -> bool {
        self.staff_user_ids.contains(&user_id)
    }
}

/// Parses a comma separated id list, skipping blanks.
///
/// # Panics
///
/// Panics on an entry that is not a UUID.
fn parse_id_list(raw: &str) -> Vec<Uuid> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse()
                .unwrap_or_else(|e| panic!("STAFF_USER_IDS has an invalid id {s}: {e}"))
        })
        .collect()
}

/// Reads an optional variable, falling back to `default` when it is unset.
///
/// # Panics
///
/// Panics when the variable is set but does not parse.
fn parse_var<T>(name: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Debug,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|e| panic!("{name} must be a valid value: {e:?}")),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_format_parses_case_insensitively() {
        assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert_eq!(" text ".parse::<OutputFormat>(), Ok(OutputFormat::Text));
        assert!("yaml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn limit_defaults_match_plan_caps() {
        let limits = LimitsConfig::default();
        assert_eq!(limits.free_plan_limit, 3);
        assert_eq!(limits.one_time_plan_limit, 1);
        assert_eq!(limits.feedback_requests, 3);
    }

    #[test]
    fn staff_ids_are_comma_separated() {
        let id = Uuid::new_v4();
        let ids = parse_id_list(&format!(" {id}, ,"));
        assert_eq!(ids, vec![id]);
        assert!(parse_id_list("").is_empty());

        let config = Config {
            staff_user_ids: ids,
            ..Config::default()
        };
        assert!(config.is_staff(id));
        assert!(!config.is_staff(Uuid::new_v4()));
    }
}
