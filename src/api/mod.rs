//! # Módulo API
//!
//! Este módulo contiene todas las rutas y controladores de la API REST.
//!
//! ## Módulos principales
//!
//! - [`auth`] - Registro, login y usuario actual
//! - [`users`] - Gestión de usuarios
//! - [`restaurants`] - Gestión de restaurantes
//! - [`reservations`] - Reservas con cupo de 3 activas por usuario
//! - [`comments`] - Comentarios y valoración media
//! - [`errors`] - Manejo de errores de la aplicación

pub mod auth;
pub mod comments;
pub mod errors;
pub mod middleware;
pub mod reservations;
pub mod restaurants;
pub mod users;

// Re-exportar tipos comunes para facilitar su uso
pub use errors::{AppError, AppResult, ErrorResponse, ResultExt};

use actix_web::{middleware::from_fn, web};
use mongodb::bson::oid::ObjectId;

use crate::auth::require_auth;

/// Convierte un identificador hexadecimal en `ObjectId`
pub fn parse_id(raw: &str) -> AppResult<ObjectId> {
    ObjectId::parse_str(raw.trim())
        .map_err(|_| AppError::validation_field("id", &format!("ID inválido: {}", raw)))
}

/// Configura todas las rutas de la API
///
/// ## Rutas configuradas
///
/// - `/api/v1/auth/*` - Públicas, ver [`auth::public_routes`]
/// - `/api/v1/*` - Resto, detrás de [`require_auth`]
///
/// Los cuerpos JSON o rutas malformados se responden con `400` y el
/// formato de error habitual.
///
/// # Ejemplo
///
/// ```no_run
/// use actix_web::{web, App};
/// use redrice_backend::api;
///
/// let app = App::new()
///     .configure(api::init_routes);
/// ```
pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        AppError::Validation(format!("JSON inválido: {}", err)).into()
    }))
    .app_data(web::PathConfig::default().error_handler(|err, _req| {
        AppError::Validation(format!("Ruta inválida: {}", err)).into()
    }))
    .service(
        web::scope("/api/v1")
            .service(web::scope("/auth").configure(auth::public_routes))
            .service(
                web::scope("")
                    .wrap(from_fn(require_auth))
                    .configure(auth::routes)
                    .configure(users::routes)
                    .configure(restaurants::routes)
                    .configure(reservations::routes)
                    .configure(comments::routes),
            ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_id_accepts_hex_and_trims() {
        let id = ObjectId::new();
        assert_eq!(parse_id(&format!(" {} ", id.to_hex())).unwrap(), id);
    }

    #[test]
    fn parse_id_rejects_garbage() {
        let err = parse_id("not-an-id").unwrap_err();
        assert!(matches!(err, AppError::ValidationWithField { ref field, .. } if field == "id"));
    }
}
