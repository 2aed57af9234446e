use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

/// Outbound mail settings. Without an access token mail is only logged.
#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub access_token: Option<String>,
    pub api_url: String,
    pub from: Option<String>,
    pub queue_capacity: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub jwt: JwtConfig,
    pub mail: MailConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let db_max_connections = env_parse("DB_MAX_CONNECTIONS").unwrap_or(10);
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "canopus".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "canopus-users".into()),
            ttl_minutes: env_parse("JWT_TTL_MINUTES").unwrap_or(60 * 24 * 7),
            refresh_ttl_minutes: env_parse("JWT_REFRESH_TTL_MINUTES").unwrap_or(60 * 24 * 30),
        };
        let mail = MailConfig {
            access_token: std::env::var("MAIL_ACCESS_TOKEN")
                .ok()
                .filter(|t| !t.trim().is_empty()),
            api_url: std::env::var("MAIL_API_URL").unwrap_or_else(|_| {
                "https://gmail.googleapis.com/gmail/v1/users/me/messages/send".into()
            }),
            from: std::env::var("MAIL_FROM").ok(),
            queue_capacity: env_parse("MAIL_QUEUE_CAPACITY").unwrap_or(256),
        };
        Ok(Self {
            database_url,
            db_max_connections,
            jwt,
            mail,
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}
