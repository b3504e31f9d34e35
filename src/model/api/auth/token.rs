use std::marker::PhantomData;

use chrono::{serde::ts_seconds, DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation};
use rocket::{
    http::Status,
    request::{FromRequest, Outcome},
    Request,
};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::Error;
use crate::model::mongodb::Id;

use super::user::{Rights, User};

pub const AUTH_TOKEN_COOKIE: &str = "auth_token";

const BEARER_PREFIX: &str = "Bearer ";

/// An authentication token representing a specific member with specific
/// rights. Tokens are issued by the membership service; this backend only
/// verifies them.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthToken<U> {
    pub id: Id,
    #[serde(rename = "rgt")]
    pub rights: Rights,
    #[serde(skip)]
    phantom: PhantomData<U>,
}

impl<U> AuthToken<U> {
    /// Does this token permit the given rights?
    pub fn permits(&self, target: Rights) -> bool {
        self.rights.includes(target)
    }
}

impl<U> AuthToken<U>
where
    U: User,
{
    /// Create a new [`AuthToken`] for the given member, with the rights of
    /// user type `U`.
    pub fn new(id: Id) -> Self {
        Self {
            id,
            rights: U::RIGHTS,
            phantom: PhantomData,
        }
    }

    /// Sign this token as a JWT, valid for the configured lifetime.
    pub fn encode(self, config: &Config) -> Result<String, Error> {
        let claims = Claims {
            token: self,
            expire_at: Utc::now() + config.auth_ttl(),
        };
        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret()),
        )?;
        Ok(token)
    }

    /// Verify and decode a JWT.
    pub fn decode(token: &str, config: &Config) -> Result<Self, Error> {
        let token = jsonwebtoken::decode(
            token,
            &DecodingKey::from_secret(config.jwt_secret()),
            &Validation::default(),
        )
        .map(|claims: TokenData<Claims<U>>| claims.claims.token)?;
        Ok(token)
    }
}

/// Token claims: the token itself plus an expiry datetime.
#[derive(Serialize, Deserialize)]
struct Claims<U> {
    #[serde(flatten, bound = "")]
    token: AuthToken<U>,
    #[serde(rename = "exp", with = "ts_seconds")]
    expire_at: DateTime<Utc>,
}

/// The raw token sent with a request, from the cookie or else the
/// `Authorization` header.
fn raw_token(req: &Request<'_>) -> Option<String> {
    if let Some(cookie) = req.cookies().get(AUTH_TOKEN_COOKIE) {
        return Some(cookie.value().to_string());
    }
    req.headers()
        .get_one("Authorization")
        .and_then(|value| value.strip_prefix(BEARER_PREFIX))
        .map(str::to_string)
}

#[rocket::async_trait]
impl<'r, U> FromRequest<'r> for AuthToken<U>
where
    U: User + Send,
{
    type Error = Error;

    /// Get an [`AuthToken`] from the request and verify that it has the
    /// rights of this user type.
    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let config = match req.rocket().state::<Config>() {
            Some(config) => config,
            None => {
                error!("Config is not in managed state");
                return Outcome::Forward(Status::InternalServerError);
            }
        };

        let raw = match raw_token(req) {
            Some(raw) => raw,
            None => return Outcome::Forward(Status::Unauthorized),
        };
        let token = match Self::decode(&raw, config) {
            Ok(token) => token,
            Err(err) => {
                debug!("Rejected auth token: {err}");
                return Outcome::Forward(Status::Unauthorized);
            }
        };

        if !token.permits(U::RIGHTS) {
            debug!("Member {} lacks {} rights", token.id, U::RIGHTS);
            return Outcome::Forward(Status::Forbidden);
        }
        Outcome::Success(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::model::api::auth::{Admin, Member};

    fn config() -> Config {
        Config::example()
    }

    #[test]
    fn tokens_survive_signing() {
        let config = config();
        let jwt = AuthToken::<Admin>::new(Id::example(4))
            .encode(&config)
            .unwrap();
        let token = AuthToken::<Admin>::decode(&jwt, &config).unwrap();
        assert_eq!(token.id, Id::example(4));
        assert_eq!(token.rights, Rights::Admin);
        assert!(token.permits(Rights::Member));
    }

    #[test]
    fn member_tokens_do_not_permit_admin() {
        let token = AuthToken::<Member>::new(Id::example(4));
        assert!(token.permits(Rights::Member));
        assert!(!token.permits(Rights::Admin));
    }

    #[test]
    fn tokens_signed_with_another_secret_are_rejected() {
        let jwt = AuthToken::<Member>::new(Id::example(4))
            .encode(&Config::new("some other secret", 60))
            .unwrap();
        assert!(AuthToken::<Member>::decode(&jwt, &config()).is_err());
    }
}
