use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde_derive::{Deserialize, Serialize};

use crate::{config::Settings, errors::ServerError};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

/// Issues and checks HMAC-signed bearer tokens. Immutable once built.
#[derive(Clone)]
pub struct TokenService {
    header: Header,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &[u8], algorithm: Algorithm, ttl: Duration) -> Self {
        let mut validation = Validation::new(algorithm);
        validation.leeway = 0;

        TokenService {
            header: Header::new(algorithm),
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            ttl,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.secret_key.as_bytes(),
            settings.algorithm,
            Duration::minutes(settings.access_token_expire_minutes),
        )
    }

    pub fn issue(&self, subject: &str) -> Result<String, ServerError> {
        self.issue_at(subject, Utc::now())
    }

    /// Issues a token as if the current time were `now`.
    pub fn issue_at(&self, subject: &str, now: DateTime<Utc>) -> Result<String, ServerError> {
        let exp = (now + self.ttl).timestamp().max(0) as usize;
        let claims = Claims {
            sub: subject.to_owned(),
            exp,
        };

        Ok(encode(&self.header, &claims, &self.encoding_key)?)
    }

    /// Returns the subject of a valid token. Expired, tampered and malformed
    /// tokens are all reported as the same `Unauthorized`.
    pub fn verify(&self, token: &str) -> Result<String, ServerError> {
        let claims = match decode::<Claims>(token, &self.decoding_key, &self.validation) {
            Ok(data) => data.claims,
            Err(e) => {
                log::debug!("rejected bearer token: {e}");
                return Err(ServerError::Unauthorized);
            }
        };

        // jsonwebtoken still accepts exp == now; a token is only good while now < exp
        if i64::try_from(claims.exp).map_or(true, |exp| exp <= Utc::now().timestamp()) {
            log::debug!("rejected bearer token: expired at {}", claims.exp);
            return Err(ServerError::Unauthorized);
        }

        Ok(claims.sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL_HOURS: i64 = 24;

    fn service(secret: &str) -> TokenService {
        TokenService::new(secret.as_bytes(), Algorithm::HS256, Duration::hours(TTL_HOURS))
    }

    #[test]
    fn issued_token_verifies_to_its_subject() {
        let tokens = service("secret");
        let token = tokens.issue("alice").unwrap();
        assert_eq!(tokens.verify(&token).unwrap(), "alice");
    }

    #[test]
    fn token_expires_after_ttl() {
        let tokens = service("secret");
        let ttl = Duration::hours(TTL_HOURS);
        let skewed = Utc::now() - ttl - Duration::seconds(5);
        let token = tokens.issue_at("alice", skewed).unwrap();
        assert!(matches!(
            tokens.verify(&token),
            Err(ServerError::Unauthorized)
        ));

        let almost = Utc::now() - ttl + Duration::minutes(5);
        let token = tokens.issue_at("alice", almost).unwrap();
        assert_eq!(tokens.verify(&token).unwrap(), "alice");
    }

    #[test]
    fn token_is_dead_in_its_expiry_second() {
        let tokens = service("secret");
        let token = tokens
            .issue_at("alice", Utc::now() - Duration::hours(TTL_HOURS))
            .unwrap();
        assert!(matches!(
            tokens.verify(&token),
            Err(ServerError::Unauthorized)
        ));
    }

    #[test]
    fn foreign_secret_is_rejected() {
        let token = service("one secret").issue("alice").unwrap();
        assert!(matches!(
            service("another secret").verify(&token),
            Err(ServerError::Unauthorized)
        ));
    }

    #[test]
    fn tampered_and_garbage_tokens_are_rejected() {
        let tokens = service("secret");
        let token = tokens.issue("alice").unwrap();
        let mut parts: Vec<&str> = token.split('.').collect();
        let forged_payload = tokens.issue("mallory").unwrap();
        let forged: Vec<&str> = forged_payload.split('.').collect();
        parts[1] = forged[1];
        let spliced = parts.join(".");

        for bad in [spliced.as_str(), "", "not.a.token", "abc"] {
            assert!(matches!(tokens.verify(bad), Err(ServerError::Unauthorized)));
        }
    }

    #[test]
    fn other_algorithm_is_rejected() {
        let hs512 = TokenService::new(b"secret", Algorithm::HS512, Duration::hours(1));
        let token = hs512.issue("alice").unwrap();
        assert!(service("secret").verify(&token).is_err());
    }
}
