//! # Control de acceso
//!
//! [`require_auth`] se aplica a todas las rutas protegidas. Por petición:
//!
//! | Estado | Resultado |
//! |--------|-----------|
//! | Sin header `Authorization` | 401 |
//! | Header que no es `Bearer <token>` | 401 |
//! | Token inválido o caducado | 401 |
//! | Token válido | [`Identity`] en las extensiones de la petición |
//!
//! Las rutas de administración piden además el extractor [`AdminIdentity`],
//! que responde 403 si el rol no es `admin`.

use std::future::{ready, Ready};

use actix_web::body::{EitherBody, MessageBody};
use actix_web::dev::{Payload, ServiceRequest, ServiceResponse};
use actix_web::http::header::{HeaderValue, AUTHORIZATION};
use actix_web::middleware::Next;
use actix_web::{web, Error, FromRequest, HttpMessage, HttpRequest};
use mongodb::bson::oid::ObjectId;

use super::jwt::{TokenError, TokenService};
use crate::api::AppError;
use crate::db::Role;

/// Identidad resuelta a partir del token
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Identity {
    pub user_id: ObjectId,
    pub role: Role,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Propietario del recurso o administrador
    pub fn can_act_on(&self, owner: &ObjectId) -> bool {
        self.is_admin() || &self.user_id == owner
    }
}

/// Extrae el token de un header `Authorization: Bearer <token>`
pub fn bearer_token(header: Option<&HeaderValue>) -> Result<&str, AppError> {
    let header = header
        .ok_or_else(|| AppError::Unauthorized("Falta header Authorization".to_string()))?;

    let value = header
        .to_str()
        .map_err(|_| AppError::Unauthorized("Header Authorization inválido".to_string()))?;

    match value.split_once(' ') {
        Some(("Bearer", token)) if !token.trim().is_empty() => Ok(token.trim()),
        _ => Err(AppError::Unauthorized(
            "El header Authorization debe tener el formato Bearer <token>".to_string(),
        )),
    }
}

/// Resuelve la identidad de una petición a partir de su token
pub fn authenticate(tokens: &TokenService, header: Option<&HeaderValue>) -> Result<Identity, AppError> {
    let token = bearer_token(header)?;

    let claims = tokens.verify(token).map_err(|e| match e {
        TokenError::Expired => AppError::Unauthorized("Token caducado".to_string()),
        _ => AppError::Unauthorized("Token inválido".to_string()),
    })?;

    let user_id = ObjectId::parse_str(&claims.sub)
        .map_err(|_| AppError::Unauthorized("Token inválido".to_string()))?;

    Ok(Identity {
        user_id,
        role: claims.role,
    })
}

/// Middleware de autenticación para las rutas protegidas
///
/// Requiere `web::Data<TokenService>` registrado en la aplicación.
pub async fn require_auth<B: MessageBody>(
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<EitherBody<B>>, Error> {
    let outcome = match req.app_data::<web::Data<TokenService>>() {
        Some(tokens) => authenticate(tokens, req.headers().get(AUTHORIZATION)),
        None => Err(AppError::Internal("TokenService no registrado".to_string())),
    };

    match outcome {
        Ok(identity) => {
            tracing::debug!(user_id = %identity.user_id, role = ?identity.role, "Request authenticated");
            req.extensions_mut().insert(identity);
            next.call(req).await.map(ServiceResponse::map_into_left_body)
        }
        Err(err) => {
            tracing::warn!(path = %req.path(), error = %err, "Authentication failed");
            Ok(req.error_response(err).map_into_right_body())
        }
    }
}

fn identity_of(req: &HttpRequest) -> Result<Identity, AppError> {
    req.extensions()
        .get::<Identity>()
        .copied()
        .ok_or_else(|| AppError::Unauthorized("Autenticación requerida".to_string()))
}

impl FromRequest for Identity {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(identity_of(req))
    }
}

/// Identidad de un administrador
#[derive(Debug, Clone, Copy)]
pub struct AdminIdentity(pub Identity);

impl FromRequest for AdminIdentity {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let identity = match identity_of(req) {
            Ok(identity) => identity,
            Err(err) => return ready(Err(err)),
        };

        if identity.is_admin() {
            ready(Ok(AdminIdentity(identity)))
        } else {
            tracing::warn!(user_id = %identity.user_id, path = %req.path(), "Admin route denied");
            ready(Err(AppError::Forbidden(
                "Se requiere rol de administrador".to_string(),
            )))
        }
    }
}
