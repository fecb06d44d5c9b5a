use anyhow::{Context, Result, bail};

pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/artemis.db";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Clone, Debug)]
pub struct ServiceConfig {
    pub database_url: String,
    pub http_addr: String,
    pub max_connections: u32,
}

impl ServiceConfig {
    pub fn from_env(default_http_addr: &str) -> Result<Self> {
        Self::from_lookup(default_http_addr, |key| std::env::var(key).ok())
    }

    fn from_lookup(
        default_http_addr: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let database_url =
            lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());
        let http_addr = lookup("HTTP_ADDR").unwrap_or_else(|| default_http_addr.to_string());
        let max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .with_context(|| format!("DATABASE_MAX_CONNECTIONS is not a number: {raw}"))?,
            None => DEFAULT_MAX_CONNECTIONS,
        };
        if max_connections == 0 {
            bail!("DATABASE_MAX_CONNECTIONS must be at least 1");
        }

        Ok(Self {
            database_url,
            http_addr,
            max_connections,
        })
    }
}
