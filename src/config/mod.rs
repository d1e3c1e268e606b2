use crate::util::common::{
    get_bool_from_env_or, get_env_or, get_size_from_env_or, get_vec_from_env_or, load_dotenv,
};
use std::fmt::Debug;
use std::str::FromStr;
use std::time::Duration;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer};

pub mod db;

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Basic app info
    pub app_name: String,
    pub app_version: String,

    pub http: HTTPConfig,
    pub db: DBConfig,
    pub feed: FeedConfig,
    pub search: SearchConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone)]
pub struct HTTPConfig {
    pub ip: String,
    pub port: u16,
    pub max_body_size: u64,
    pub cors: CORSConfig,
}

#[derive(Debug, Clone)]
pub struct DBConfig {
    pub url: String,
    pub pool_size: u32,
    pub auto_migrate: bool,
}

#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub default_limit: u32,
    pub max_limit: u32,
}

#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub history_retention_days: i64,
}

#[derive(Debug, Clone)]
pub struct CORSConfig {
    pub allowed_origins: Vec<String>,
    pub allowed_methods: Vec<String>,
    pub allowed_headers: Vec<String>,
    pub allow_credentials: bool,
    pub max_age: u64,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub log_requests: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        load_dotenv();

        let app_name = get_env_or("APP_NAME", "Agora".to_string()).unwrap();
        let app_version = get_env_or("APP_VERSION", "1.0.0".to_string()).unwrap();

        AppConfig {
            app_name,
            app_version,

            http: HTTPConfig::from_env(),
            db: DBConfig::from_env(),
            feed: FeedConfig::from_env(),
            search: SearchConfig::from_env(),
            log: LogConfig::from_env(),
        }
    }

    /// Panics on values the service can not run with.
    pub fn validate_config(&self) {
        if self.db.pool_size == 0 {
            panic!("DATABASE_POOL_SIZE must be at least 1");
        }
        if self.feed.default_limit == 0 || self.feed.default_limit > self.feed.max_limit {
            panic!(
                "FEED_DEFAULT_LIMIT must be within 1..={}, got {}",
                self.feed.max_limit, self.feed.default_limit
            );
        }
        if self.search.history_retention_days <= 0 {
            panic!("SEARCH_HISTORY_RETENTION_DAYS must be positive");
        }
    }
}

impl HTTPConfig {
    pub fn from_env() -> Self {
        load_dotenv();

        let ip = get_env_or("HTTP_IP", "127.0.0.1".to_string()).unwrap();
        let port = get_env_or("HTTP_PORT", 8000).unwrap();
        let max_body_size = get_size_from_env_or("HTTP_MAX_BODY_SIZE", 1024 * 1024).unwrap();
        let cors = CORSConfig::from_env();

        HTTPConfig {
            ip,
            port,
            max_body_size,
            cors,
        }
    }
}

impl DBConfig {
    pub fn from_env() -> Self {
        load_dotenv();

        let url = get_env_or("DATABASE_URL", "sqlite://agora.db?mode=rwc".to_string()).unwrap();
        let pool_size = get_env_or("DATABASE_POOL_SIZE", 5).unwrap();
        let auto_migrate = get_bool_from_env_or("DATABASE_AUTO_MIGRATE", true).unwrap();

        DBConfig {
            url,
            pool_size,
            auto_migrate,
        }
    }
}

impl FeedConfig {
    pub fn from_env() -> Self {
        load_dotenv();

        FeedConfig {
            default_limit: get_env_or("FEED_DEFAULT_LIMIT", 10).unwrap(),
            max_limit: get_env_or("FEED_MAX_LIMIT", 100).unwrap(),
        }
    }

    /// Clamps a client supplied page size; `None` falls back to the default.
    pub fn page_size(&self, requested: Option<u32>) -> u32 {
        requested.unwrap_or(self.default_limit).min(self.max_limit)
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        FeedConfig {
            default_limit: 10,
            max_limit: 100,
        }
    }
}

impl SearchConfig {
    pub fn from_env() -> Self {
        load_dotenv();

        SearchConfig {
            history_retention_days: get_env_or("SEARCH_HISTORY_RETENTION_DAYS", 90).unwrap(),
        }
    }
}

impl CORSConfig {
    pub fn from_env() -> Self {
        load_dotenv();

        let allowed_origins = get_vec_from_env_or("CORS_ALLOWED_ORIGINS", vec![]).unwrap();
        let allowed_methods = get_vec_from_env_or(
            "CORS_ALLOWED_METHODS",
            strs_to_strings(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"]),
        )
        .unwrap();
        let allowed_headers = get_vec_from_env_or(
            "CORS_ALLOWED_HEADERS",
            strs_to_strings(vec!["Content-Type", "Authorization"]),
        )
        .unwrap();
        let allow_credentials = get_bool_from_env_or("CORS_ALLOW_CREDENTIALS", false).unwrap();
        let max_age = get_env_or("CORS_MAX_AGE", 86400).unwrap();

        CORSConfig {
            allowed_origins,
            allowed_methods,
            allowed_headers,
            allow_credentials,
            max_age,
        }
    }

    pub fn into_layer(self) -> CorsLayer {
        let mut cors = CorsLayer::new();

        cors = if self.allowed_origins.contains(&"*".to_string()) {
            cors.allow_origin(Any)
        } else {
            cors.allow_origin(AllowOrigin::list(convert_vec(self.allowed_origins.clone())))
        };

        cors = if self.allowed_methods.contains(&"*".to_string()) {
            cors.allow_methods(Any)
        } else {
            cors.allow_methods(AllowMethods::list(convert_vec(self.allowed_methods.clone())))
        };

        cors = if self.allowed_headers.contains(&"*".to_string()) {
            cors.allow_headers(Any)
        } else {
            cors.allow_headers(AllowHeaders::list(convert_vec(self.allowed_headers.clone())))
        };

        cors.allow_credentials(self.allow_credentials)
            .max_age(Duration::from_secs(self.max_age))
    }
}

impl LogConfig {
    pub fn from_env() -> Self {
        load_dotenv();

        LogConfig {
            log_requests: get_bool_from_env_or("LOG_REQUESTS", false).unwrap(),
        }
    }
}

// convert vectors of &str to owned Strings
fn strs_to_strings(vec: Vec<&str>) -> Vec<String> {
    vec.into_iter().map(|s| s.to_string()).collect()
}

// Invalid header values are skipped rather than aborting startup.
fn convert_vec<T: FromStr>(strings: Vec<String>) -> Vec<T>
where
    <T as FromStr>::Err: Debug,
{
    strings
        .into_iter()
        .filter_map(|s| match s.parse() {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!("ignoring invalid CORS value {:?}: {:?}", s, e);
                None
            }
        })
        .collect()
}
