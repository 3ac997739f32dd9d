use eyre::{eyre, Result, WrapErr};

/// Runtime configuration, read from the environment once at startup and
/// carried on [`crate::AppState`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string.
    pub database_url: String,
    /// Address the HTTP server binds to.
    pub bind_addr: String,
    /// Public domain name, with no trailing slash.
    /// Example: `https://conference.example.org`
    pub domain: String,
    /// SMTP settings. When absent, outgoing email is logged and discarded.
    pub smtp: Option<SmtpConfig>,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_name: String,
    pub from_address: String,
}

impl Config {
    pub fn from_env() -> Result<Config> {
        let database_url =
            dotenvy::var("DATABASE_URL").wrap_err("missing DATABASE_URL environment variable")?;
        let bind_addr = dotenvy::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let domain = dotenvy::var("DOMAIN_NAME")
            .wrap_err("missing DOMAIN_NAME environment variable")?
            .trim_end_matches('/')
            .to_string();

        let smtp = match dotenvy::var("SMTP_HOST") {
            Ok(host) => Some(SmtpConfig {
                host,
                port: dotenvy::var("SMTP_HOST_PORT")
                    .wrap_err("missing SMTP_HOST_PORT environment variable")?
                    .parse()
                    .map_err(|_| eyre!("invalid value for SMTP_HOST_PORT"))?,
                username: dotenvy::var("SMTP_USERNAME")
                    .wrap_err("missing SMTP_USERNAME environment variable")?,
                password: dotenvy::var("SMTP_PASSWORD")
                    .wrap_err("missing SMTP_PASSWORD environment variable")?,
                from_name: dotenvy::var("SMTP_FROM_NAME")
                    .wrap_err("missing SMTP_FROM_NAME environment variable")?,
                from_address: dotenvy::var("SMTP_FROM_ADDRESS")
                    .wrap_err("missing SMTP_FROM_ADDRESS environment variable")?,
            }),
            Err(_) => None,
        };

        Ok(Config {
            database_url,
            bind_addr,
            domain,
            smtp,
        })
    }

    #[cfg(test)]
    pub fn for_tests() -> Config {
        Config {
            database_url: String::new(),
            bind_addr: "127.0.0.1:0".to_string(),
            domain: "http://localhost:3000".to_string(),
            smtp: None,
        }
    }
}
