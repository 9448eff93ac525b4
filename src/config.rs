use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    pub database_max_connections: u32,
    pub database_acquire_timeout_secs: u64,
    pub jwt_secret: String,
    pub rtc_app_id: String,
    pub rtc_app_certificate: String,
    pub email_api_url: String,
    pub email_api_key: String,
    pub email_from: String,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: get_env("DATABASE_URL")?,
            database_max_connections: get_env_parsed("DATABASE_MAX_CONNECTIONS", 50)?,
            database_acquire_timeout_secs: get_env_parsed("DATABASE_ACQUIRE_TIMEOUT_SECS", 30)?,
            jwt_secret: get_env("JWT_SECRET")?,
            rtc_app_id: get_env("RTC_APP_ID")?,
            rtc_app_certificate: get_env("RTC_APP_CERTIFICATE")?,
            email_api_url: get_env("EMAIL_API_URL")?,
            email_api_key: get_env("EMAIL_API_KEY")?,
            email_from: get_env("EMAIL_FROM")?,
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

/// Optional numeric setting: absent falls back to the default, present
/// but unparsable is a configuration error rather than a silent default.
fn get_env_parsed<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| Error::Config(format!("Invalid value for {}: {}", name, raw))),
        Err(_) => Ok(default),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_numeric_setting_uses_the_default() {
        env::remove_var("TEST_POOL_SIZE_ABSENT");
        assert_eq!(get_env_parsed("TEST_POOL_SIZE_ABSENT", 50u32).unwrap(), 50);
    }

    #[test]
    fn present_numeric_setting_is_parsed() {
        env::set_var("TEST_POOL_SIZE_SET", "12");
        assert_eq!(get_env_parsed("TEST_POOL_SIZE_SET", 50u32).unwrap(), 12);
    }

    #[test]
    fn unparsable_numeric_setting_is_a_config_error() {
        env::set_var("TEST_POOL_SIZE_BAD", "many");
        assert!(matches!(
            get_env_parsed("TEST_POOL_SIZE_BAD", 50u32),
            Err(Error::Config(_))
        ));
    }
}
