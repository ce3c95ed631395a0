use std::path::PathBuf;

/// Error raised while reading configuration from the environment.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} has an invalid value '{value}'")]
    Invalid { var: &'static str, value: String },
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Process configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// PostgreSQL connection string.
    pub database_url: String,
    /// Directory whose sub-directories each hold one shared theme.
    pub themes_dir: PathBuf,
    /// Maximum size of the database pool (default: `20`).
    pub db_max_connections: u32,
    /// Maximum number of rendered pages held by the render cache
    /// (default: `10000`).
    pub render_cache_capacity: usize,
    pub log_format: LogFormat,
}

impl AppConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default      |
    /// |-------------------------|--------------|
    /// | `DATABASE_URL`          | (required)   |
    /// | `THEMES_DIR`            | `./themes`   |
    /// | `DB_MAX_CONNECTIONS`    | `20`         |
    /// | `RENDER_CACHE_CAPACITY` | `10000`      |
    /// | `LOG_FORMAT`            | `pretty`     |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let themes_dir = lookup("THEMES_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./themes"));

        let db_max_connections = parse_or(&lookup, "DB_MAX_CONNECTIONS", 20)?;
        let render_cache_capacity = parse_or(&lookup, "RENDER_CACHE_CAPACITY", 10_000)?;

        let log_format = match lookup("LOG_FORMAT").as_deref() {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "LOG_FORMAT",
                    value: other.to_string(),
                })
            }
        };

        Ok(Self {
            database_url,
            themes_dir,
            db_max_connections,
            render_cache_capacity,
            log_format,
        })
    }
}

fn parse_or<T, F>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
    }
}
