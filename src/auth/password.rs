//! Hash de contraseñas con Argon2 (formato PHC, salt aleatoria por usuario)
//!
//! Argon2 es costoso a propósito; desde los handlers se usan las variantes
//! `_async`, que lo ejecutan en el pool de hilos bloqueantes de actix.

use actix_web::web;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};

use crate::api::{AppError, AppResult};

/// Genera el hash que se guarda en `users.password_hash`
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::internal_trace(&format!("Error generando hash: {}", e), None))?;
    Ok(hash.to_string())
}

/// Compara una contraseña en claro con un hash almacenado.
///
/// Nunca falla: un hash corrupto o ilegible cuenta como contraseña incorrecta.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// [`hash_password`] ejecutado con `web::block`
pub async fn hash_password_async(password: String) -> AppResult<String> {
    web::block(move || hash_password(&password))
        .await
        .map_err(|e| AppError::internal_trace(&format!("Error en el hilo de hash: {}", e), None))?
}

/// [`verify_password`] ejecutado con `web::block`; un fallo del hilo cuenta como `false`
pub async fn verify_password_async(password: String, hash: String) -> bool {
    web::block(move || verify_password(&password, &hash))
        .await
        .unwrap_or(false)
}
