use std::time::Duration;

/// Social API configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection string. When unset the server keeps
    /// notifications in memory.
    pub database_url: Option<String>,
    /// Shared secret used to verify identity tokens from the auth service.
    pub jwt_secret: String,
    /// Expected `iss` claim on identity tokens, if any.
    pub jwt_issuer: Option<String>,
    /// Port the HTTP server binds to.
    pub port: u16,
    /// Upper bound on a single notification store call.
    pub store_timeout: Duration,
    /// Upper bound on enqueueing a push onto a connection.
    pub send_timeout: Duration,
    /// Per-connection outbound queue capacity.
    pub outbound_buffer: usize,
    /// Close the previous gateway connection when the same user connects again.
    pub close_superseded_sessions: bool,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Panics with a descriptive message if a required variable is missing.
    pub fn from_env() -> Self {
        Self {
            database_url: optional_var("DATABASE_URL"),
            jwt_secret: required_var("JWT_SECRET"),
            jwt_issuer: optional_var("JWT_ISSUER"),
            port: parsed_var("PORT").unwrap_or(4002),
            store_timeout: Duration::from_millis(parsed_var("STORE_TIMEOUT_MS").unwrap_or(5000)),
            send_timeout: Duration::from_millis(parsed_var("SEND_TIMEOUT_MS").unwrap_or(2000)),
            outbound_buffer: parsed_var("OUTBOUND_BUFFER").unwrap_or(64).max(1),
            close_superseded_sessions: parsed_var("CLOSE_SUPERSEDED_SESSIONS").unwrap_or(false),
        }
    }
}

fn required_var(name: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| panic!("{name} env var is required"))
}

fn optional_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn parsed_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}
