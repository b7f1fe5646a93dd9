use std::str::FromStr;

use jsonwebtoken::Algorithm;

use crate::errors::ServerError;

/// Process-wide settings, read once at startup and never mutated.
#[derive(Clone)]
pub struct Settings {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub secret_key: String,
    pub algorithm: Algorithm,
    pub access_token_expire_minutes: i64,
    pub pool_size: u32,
}

impl Settings {
    pub fn from_env() -> Result<Self, ServerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ServerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| match lookup(key) {
            Some(value) if !value.trim().is_empty() => Ok(value),
            _ => {
                log::error!("env {key} must be set");
                Err(ServerError::EnvironmentError)
            }
        };

        let algorithm = parse(&lookup, "ALGORITHM", Algorithm::HS256)?;
        if !matches!(
            algorithm,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            log::error!("env ALGORITHM must name an HMAC algorithm, got {algorithm:?}");
            return Err(ServerError::EnvironmentError);
        }

        let access_token_expire_minutes = parse(&lookup, "ACCESS_TOKEN_EXPIRE_MINUTES", 1440)?;
        if access_token_expire_minutes <= 0 {
            log::error!("env ACCESS_TOKEN_EXPIRE_MINUTES must be positive");
            return Err(ServerError::EnvironmentError);
        }

        Ok(Settings {
            database_url: required("DATABASE_URL")?,
            secret_key: required("SECRET_KEY")?,
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_owned()),
            port: parse(&lookup, "PORT", 8000)?,
            algorithm,
            access_token_expire_minutes,
            pool_size: parse(&lookup, "DATABASE_POOL_SIZE", 10)?,
        })
    }
}

fn parse<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ServerError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse::<T>().map_err(|_| {
            log::error!("env {key} has an invalid value: {raw:?}");
            ServerError::EnvironmentError
        }),
        None => Ok(default),
    }
}
