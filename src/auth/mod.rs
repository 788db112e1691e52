//! # Autenticación
//!
//! - [`password`] - Hash y verificación de contraseñas
//! - [`jwt`] - Emisión y validación de tokens
//! - [`gate`] - Middleware y extractores de identidad

pub mod gate;
pub mod jwt;
pub mod password;

pub use gate::{require_auth, AdminIdentity, Identity};
pub use jwt::{Claims, TokenError, TokenService};
