//! # Manejo de errores de la API
//!
//! Jerarquía de errores construida con thiserror. Cada variante se traduce a
//! un código HTTP y a un cuerpo `{"error": "<mensaje>"}`.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use std::error::Error;
use thiserror::Error;

/// Tipos de error de la aplicación con contexto mejorado
#[derive(Error, Debug)]
pub enum AppError {
    /// Error de base de datos con contexto adicional
    ///
    /// Mantiene la cadena de errores original de `mongodb::error::Error`
    /// para poder inspeccionar sus etiquetas (reintentos de transacción).
    #[error("Error de base de datos en operación '{operation}': {source}")]
    Database {
        operation: String,
        #[source]
        source: mongodb::error::Error,
    },

    /// Error de validación con campo específico
    #[error("Error de validación en campo '{field}': {message}")]
    ValidationWithField { field: String, message: String },

    /// Error de validación general
    #[error("Error de validación: {0}")]
    Validation(String),

    /// Falta el token, es inválido, ha caducado o las credenciales no coinciden
    #[error("No autorizado: {0}")]
    Unauthorized(String),

    /// La identidad es válida pero no tiene permiso (rol o propiedad)
    #[error("Prohibido: {0}")]
    Forbidden(String),

    /// Un usuario no administrador ya tiene el máximo de reservas activas
    #[error("Límite de {limit} reservas activas alcanzado")]
    QuotaExceeded { limit: i32 },

    /// Error de recurso no encontrado
    #[error("No encontrado: {resource_type} con ID '{id}'")]
    NotFoundWithId { resource_type: String, id: String },

    /// Error de conflicto
    #[error("Conflicto: {0}")]
    Conflict(String),

    /// Error interno con código de rastreo
    #[error("Error interno (trace: {trace_id}): {message}")]
    InternalWithTrace { trace_id: String, message: String },

    /// Error interno simple
    #[error("Error interno: {0}")]
    Internal(String),
}

// Métodos helper para crear errores con contexto
impl AppError {
    /// Crea un error de base de datos con contexto de operación
    pub fn database(operation: &str, source: mongodb::error::Error) -> Self {
        Self::Database {
            operation: operation.to_string(),
            source,
        }
    }

    /// Crea un error de validación con campo específico
    pub fn validation_field(field: &str, message: &str) -> Self {
        Self::ValidationWithField {
            field: field.to_string(),
            message: message.to_string(),
        }
    }

    /// Crea un error de no encontrado con ID
    pub fn not_found_id(resource_type: &str, id: &str) -> Self {
        Self::NotFoundWithId {
            resource_type: resource_type.to_string(),
            id: id.to_string(),
        }
    }

    /// Crea un error interno con trace ID
    pub fn internal_trace(message: &str, trace_id: Option<String>) -> Self {
        Self::InternalWithTrace {
            trace_id: trace_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            message: message.to_string(),
        }
    }

    /// `true` si MongoDB marcó el error como transitorio dentro de una transacción
    pub fn is_transient_transaction(&self) -> bool {
        match self {
            Self::Database { source, .. } => {
                source.contains_label(mongodb::error::TRANSIENT_TRANSACTION_ERROR)
            }
            _ => false,
        }
    }

    /// `true` si el error proviene de un índice único (código 11000)
    pub fn is_duplicate_key(&self) -> bool {
        use mongodb::error::{ErrorKind, WriteFailure};

        match self {
            Self::Database { source, .. } => match source.kind.as_ref() {
                ErrorKind::Write(WriteFailure::WriteError(e)) => e.code == 11000,
                ErrorKind::Command(e) => e.code == 11000,
                _ => false,
            },
            _ => false,
        }
    }

    /// Mensaje que se expone al cliente; los errores internos no filtran detalles
    fn public_message(&self) -> String {
        match self {
            Self::Database { .. } | Self::Internal(_) => "Error interno del servidor".to_string(),
            Self::InternalWithTrace { trace_id, .. } => {
                format!("Error interno (trace: {})", trace_id)
            }
            Self::ValidationWithField { field, message } => {
                format!("Campo '{}': {}", field, message)
            }
            Self::NotFoundWithId { resource_type, id } => {
                format!("{} con ID '{}' no encontrado", resource_type, id)
            }
            Self::Validation(message)
            | Self::Unauthorized(message)
            | Self::Forbidden(message)
            | Self::Conflict(message) => message.clone(),
            Self::QuotaExceeded { .. } => self.to_string(),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::ValidationWithField { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) | Self::QuotaExceeded { .. } => StatusCode::FORBIDDEN,
            Self::NotFoundWithId { .. } => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Database { .. } | Self::InternalWithTrace { .. } | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        // Log detallado del error antes de responder
        match self {
            Self::Database { operation, source } => {
                tracing::error!(
                    operation = %operation,
                    error = %source,
                    error_chain = ?source.source(),
                    "Database error occurred"
                );
            }
            Self::InternalWithTrace { trace_id, message } => {
                tracing::error!(
                    trace_id = %trace_id,
                    message = %message,
                    "Internal error with trace"
                );
            }
            Self::Internal(message) => {
                tracing::error!(message = %message, "Internal error");
            }
            Self::ValidationWithField { field, message } => {
                tracing::warn!(field = %field, message = %message, "Validation error");
            }
            Self::Unauthorized(reason) | Self::Forbidden(reason) => {
                tracing::warn!(reason = %reason, "Unauthorized access attempt");
            }
            Self::NotFoundWithId { .. } => {
                tracing::info!(error = %self, "Resource not found");
            }
            error => {
                tracing::warn!(error = %error, "Request rejected");
            }
        }

        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.public_message(),
        })
    }
}

#[derive(serde::Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub type AppResult<T> = Result<T, AppError>;

// Conversión automática desde mongodb::error::Error
impl From<mongodb::error::Error> for AppError {
    fn from(error: mongodb::error::Error) -> Self {
        Self::Database {
            operation: "database_operation".to_string(),
            source: error,
        }
    }
}

// Conversión desde las reglas declarativas de `validator`
impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let field_errors = errors.field_errors();
        let mut fields: Vec<_> = field_errors.iter().collect();
        fields.sort_by(|a, b| a.0.cmp(b.0));

        match fields.first() {
            Some((field, errs)) => {
                let message = errs
                    .iter()
                    .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
                    .unwrap_or_else(|| "valor inválido".to_string());
                Self::validation_field(field, &message)
            }
            None => Self::Validation(errors.to_string()),
        }
    }
}

pub trait ResultExt<T> {
    fn map_err_internal(self, message: &str) -> AppResult<T>;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: std::error::Error + Send + 'static,
{
    fn map_err_internal(self, message: &str) -> AppResult<T> {
        self.map_err(|e| AppError::internal_trace(&format!("{}: {}", message, e), None))
    }
}
