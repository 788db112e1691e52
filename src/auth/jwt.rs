//! # Servicio de tokens
//!
//! Emisión y validación de tokens JWT firmados con HS256. Los tokens son
//! stateless: no hay lista de revocación y el logout es responsabilidad del
//! cliente.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{TokenConfig, MAX_EXPIRATION_HOURS};
use crate::db::Role;

/// Emisor que se escribe en `iss` y se exige al validar
pub const TOKEN_ISSUER: &str = "redrice-backend";

/// Contenido firmado del token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// ID del usuario (ObjectId en hexadecimal); identidad canónica
    pub sub: String,
    /// Email en el momento de emitir el token, solo informativo
    pub email: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
}

#[derive(Error, Debug, PartialEq)]
pub enum TokenError {
    #[error("Token inválido: {0}")]
    Invalid(String),

    #[error("Token caducado")]
    Expired,

    #[error("Error generando token: {0}")]
    Generation(String),
}

#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiration: Duration,
}

impl TokenService {
    pub fn new(config: &TokenConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            expiration: Duration::hours(config.expiration_hours.clamp(1, MAX_EXPIRATION_HOURS)),
        }
    }

    /// Emite un token para el usuario con la caducidad configurada
    pub fn issue(&self, user_id: &ObjectId, email: &str, role: Role) -> Result<String, TokenError> {
        self.issue_at(user_id, email, role, Utc::now())
    }

    /// Emite un token como si el instante actual fuera `now`
    pub fn issue_at(
        &self,
        user_id: &ObjectId,
        email: &str,
        role: Role,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let claims = Claims {
            sub: user_id.to_hex(),
            email: email.to_string(),
            role,
            iat: now.timestamp(),
            exp: (now + self.expiration).timestamp(),
            iss: TOKEN_ISSUER.to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Generation(e.to_string()))
    }

    /// Valida firma, estructura, emisor y caducidad
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_issuer(&[TOKEN_ISSUER]);
        validation.set_required_spec_claims(&["sub", "exp", "iat", "iss"]);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(secret: &str) -> TokenService {
        TokenService::new(&TokenConfig {
            secret: secret.to_string(),
            expiration_hours: 24,
        })
    }

    const SECRET: &str = "clave-de-pruebas-con-32-caracteres!!";

    #[test]
    fn issued_token_round_trips_identity() {
        let tokens = service(SECRET);
        let id = ObjectId::new();

        let token = tokens.issue(&id, "a@x.com", Role::Admin).unwrap();
        let claims = tokens.verify(&token).unwrap();

        assert_eq!(claims.sub, id.to_hex());
        assert_eq!(claims.email, "a@x.com");
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
    }

    #[test]
    fn token_is_accepted_one_hour_after_issue() {
        let tokens = service(SECRET);
        let issued_at = Utc::now() - Duration::hours(1);

        let token = tokens.issue_at(&ObjectId::new(), "a@x.com", Role::User, issued_at).unwrap();
        assert!(tokens.verify(&token).is_ok());
    }

    #[test]
    fn token_is_rejected_twenty_five_hours_after_issue() {
        let tokens = service(SECRET);
        let issued_at = Utc::now() - Duration::hours(25);

        let token = tokens.issue_at(&ObjectId::new(), "a@x.com", Role::User, issued_at).unwrap();
        assert_eq!(tokens.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn foreign_signature_is_invalid() {
        let ours = service(SECRET);
        let theirs = service("otra-clave-distinta-de-32-caracteres!");

        let token = theirs.issue(&ObjectId::new(), "a@x.com", Role::Admin).unwrap();
        assert!(matches!(ours.verify(&token), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn out_of_range_expiration_is_clamped() {
        let tokens = TokenService::new(&TokenConfig {
            secret: SECRET.to_string(),
            expiration_hours: 9_000_000_000_000_000,
        });

        let token = tokens.issue(&ObjectId::new(), "a@x.com", Role::User).unwrap();
        let claims = tokens.verify(&token).unwrap();
        assert_eq!(claims.exp - claims.iat, MAX_EXPIRATION_HOURS * 3600);
    }

    #[test]
    fn garbage_is_invalid() {
        let tokens = service(SECRET);
        assert!(matches!(tokens.verify("no.es.jwt"), Err(TokenError::Invalid(_))));
        assert!(matches!(tokens.verify(""), Err(TokenError::Invalid(_))));
    }
}
