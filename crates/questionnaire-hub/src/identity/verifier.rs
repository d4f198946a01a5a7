use std::sync::Arc;

use async_trait::async_trait;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use super::jwks::KeySetCache;
use super::{AuthError, Principal, Role};
use crate::domain::UserId;

/// Turns a bearer token into a verified principal.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Principal, AuthError>;
}

#[derive(Debug, Deserialize)]
struct AccessClaims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    roles: Vec<String>,
}

/// Verifies signed JWTs against the identity provider's published key set.
pub struct JwtVerifier {
    keys: Arc<KeySetCache>,
    algorithms: Vec<Algorithm>,
    issuer: Option<String>,
    audience: Option<String>,
}

impl JwtVerifier {
    pub fn new(keys: Arc<KeySetCache>) -> Self {
        Self {
            keys,
            algorithms: vec![Algorithm::RS256],
            issuer: None,
            audience: None,
        }
    }

    pub fn with_algorithms(mut self, algorithms: Vec<Algorithm>) -> Self {
        self.algorithms = algorithms;
        self
    }

    pub fn with_issuer(mut self, issuer: Option<String>) -> Self {
        self.issuer = issuer;
        self
    }

    pub fn with_audience(mut self, audience: Option<String>) -> Self {
        self.audience = audience;
        self
    }

    fn validation(&self, algorithm: Algorithm) -> Validation {
        let mut validation = Validation::new(algorithm);
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }
        match &self.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }
        validation
    }
}

#[async_trait]
impl TokenVerifier for JwtVerifier {
    async fn verify(&self, token: &str) -> Result<Principal, AuthError> {
        let header =
            decode_header(token).map_err(|err| AuthError::MalformedToken(err.to_string()))?;
        if !self.algorithms.contains(&header.alg) {
            return Err(AuthError::DisallowedAlgorithm(header.alg));
        }
        let kid = header.kid.ok_or(AuthError::MissingKeyId)?;

        let jwk = self.keys.key(&kid).await?;
        let key =
            DecodingKey::from_jwk(&jwk).map_err(|err| AuthError::Rejected(err.to_string()))?;

        let claims = decode::<AccessClaims>(token, &key, &self.validation(header.alg))
            .map_err(|err| match err.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::Rejected(err.to_string()),
            })?
            .claims;

        let subject = UserId::parse(&claims.sub)
            .map_err(|_| AuthError::Rejected("token subject is empty".to_string()))?;
        let roles = claims.roles.iter().filter_map(|role| Role::parse(role));
        Ok(Principal::new(subject, roles).with_email(claims.email))
    }
}

/// Stand-in used when no identity provider is configured; every token is refused.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledVerifier;

#[async_trait]
impl TokenVerifier for DisabledVerifier {
    async fn verify(&self, _token: &str) -> Result<Principal, AuthError> {
        Err(AuthError::NotConfigured)
    }
}
