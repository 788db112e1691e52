//! # API de autenticación
//!
//! Rutas públicas de registro y login, y `GET /me` para el usuario actual.

use actix_web::{get, post, web, HttpResponse, Responder};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use super::users::UserResponse;
use super::{AppError, AppResult};
use crate::auth::{Identity, TokenService};
use crate::db::{MongoRepo, NewUser, Role};

/// Datos de registro; el rol siempre es `user`
#[derive(Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, message = "El nombre es requerido"))]
    pub name: String,
    #[validate(email(message = "Email inválido"))]
    pub email: String,
    #[validate(length(min = 1, message = "El teléfono es requerido"))]
    pub telephone: String,
    #[validate(length(min = 6, message = "La contraseña debe tener al menos 6 caracteres"))]
    pub password: String,
}

#[derive(Deserialize, Validate)]
struct LoginRequest {
    #[validate(length(min = 1, message = "El email es requerido"))]
    email: String,
    #[validate(length(min = 1, message = "La contraseña es requerida"))]
    password: String,
}

/// Registra un usuario nuevo
///
/// # Respuesta
/// `201 Created` con el usuario (sin contraseña).
///
/// # Errores
/// - `400 Bad Request`: Datos de validación incorrectos
/// - `409 Conflict`: Email o teléfono ya registrados
#[post("/register")]
async fn register(
    repo: web::Data<MongoRepo>,
    data: web::Json<RegisterRequest>,
) -> AppResult<impl Responder> {
    data.validate()?;
    let data = data.into_inner();

    let user = repo
        .create_user(NewUser {
            name: data.name,
            email: data.email,
            telephone: data.telephone,
            password: data.password,
            role: Role::User,
        })
        .await?;

    Ok(HttpResponse::Created().json(UserResponse::from(user)))
}

/// Login con email y contraseña
///
/// # Respuesta
/// ```json
/// { "token": "<jwt>", "message": "Login exitoso" }
/// ```
///
/// # Errores
/// - `401 Unauthorized`: Credenciales incorrectas (email desconocido o contraseña errónea)
#[post("/login")]
async fn login(
    repo: web::Data<MongoRepo>,
    tokens: web::Data<TokenService>,
    data: web::Json<LoginRequest>,
) -> AppResult<impl Responder> {
    data.validate()?;

    let user = repo
        .verify_credentials(&data.email, &data.password)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Credenciales incorrectas".to_string()))?;

    let user_id = user
        .id
        .ok_or_else(|| AppError::Internal("Usuario sin _id".to_string()))?;

    let token = tokens
        .issue(&user_id, &user.email, user.role)
        .map_err(|e| AppError::internal_trace(&e.to_string(), None))?;

    tracing::info!(user_id = %user_id, "Login successful");

    Ok(HttpResponse::Ok().json(json!({
        "token": token,
        "message": "Login exitoso"
    })))
}

/// Devuelve el usuario autenticado, leído de nuevo de la base de datos
#[get("/me")]
async fn me(repo: web::Data<MongoRepo>, identity: Identity) -> AppResult<impl Responder> {
    let user = repo.get_user(&identity.user_id).await?;
    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

/// Rutas públicas, montadas bajo `/auth`
pub fn public_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(register);
    cfg.service(login);
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(me);
}
