//! # Utilidades de logging para errores
//!
//! Registra la cadena completa de `source()` antes de que el error se
//! convierta en [`AppError`](super::AppError) y pierda su contexto original.

use std::error::Error as StdError;

/// Registra la cadena completa de errores
///
/// # Parámetros
/// - `error`: Error a analizar y registrar
/// - `context`: Contexto opcional para añadir información
pub fn log_error_chain<E>(error: &E, context: Option<&str>)
where
    E: StdError + 'static,
{
    let error_chain = collect_chain(error);

    if let Some(ctx) = context {
        tracing::error!(
            context = %ctx,
            error_chain = ?error_chain,
            "Error with full chain (with context)"
        );
    } else {
        tracing::error!(error_chain = ?error_chain, "Error with full chain");
    }
}

fn collect_chain(error: &(dyn StdError + 'static)) -> Vec<String> {
    let mut error_chain = Vec::new();
    let mut current_error: Option<&dyn StdError> = Some(error);

    while let Some(err) = current_error {
        error_chain.push(err.to_string());
        current_error = err.source();
    }

    error_chain
}

/// Extension trait para Results que añade logging automático de error chains
///
/// # Ejemplo de uso
/// ```ignore
/// use crate::api::middleware::ErrorLogExt;
///
/// repo.users()
///     .insert_one(user)
///     .await
///     .log_error_context("inserting new user")?;
/// ```
pub trait ErrorLogExt<T, E> {
    /// Loggea la cadena de errores con contexto adicional
    fn log_error_context(self, context: &str) -> Result<T, E>;
}

impl<T, E> ErrorLogExt<T, E> for Result<T, E>
where
    E: StdError + 'static,
{
    fn log_error_context(self, context: &str) -> Result<T, E> {
        if let Err(ref error) = self {
            log_error_chain(error, Some(context));
        }
        self
    }
}
