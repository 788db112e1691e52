//! # Configuración del servidor
//!
//! Toda la configuración se lee de variables de entorno (opcionalmente desde
//! un archivo `.env` cargado con `dotenvy`). Se construye una sola vez en
//! `main` y cada componente recibe su parte.

use std::env;
use thiserror::Error;

/// Errores al cargar la configuración
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Falta la variable de entorno {0}")]
    Missing(&'static str),

    #[error("Valor inválido en {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Longitud mínima del secreto HS256
pub const MIN_SECRET_LEN: usize = 32;

/// Caducidad máxima de un token: un año
pub const MAX_EXPIRATION_HOURS: i64 = 24 * 365;

/// Conexión a MongoDB
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub uri: String,
    pub name: String,
}

/// Firma de tokens
#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub secret: String,
    pub expiration_hours: i64,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_address: String,
    pub database: DatabaseConfig,
    pub tokens: TokenConfig,
}

impl AppConfig {
    /// Carga la configuración desde el entorno del proceso
    ///
    /// # Variables de entorno
    ///
    /// - `MONGODB_URI` (default: mongodb://localhost:27017)
    /// - `MONGODB_DATABASE` (default: redrice)
    /// - `BIND_ADDRESS` (default: 0.0.0.0:8080)
    /// - `JWT_SECRET` (obligatoria, mínimo 32 caracteres)
    /// - `JWT_EXPIRATION_HOURS` (default: 24, entre 1 y [`MAX_EXPIRATION_HOURS`])
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Igual que [`AppConfig::from_env`] pero con una fuente de variables arbitraria
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = lookup("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;
        if secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::Invalid {
                var: "JWT_SECRET",
                reason: format!("debe tener al menos {} caracteres", MIN_SECRET_LEN),
            });
        }

        let expiration_hours = match lookup("JWT_EXPIRATION_HOURS") {
            Some(raw) => raw
                .parse::<i64>()
                .ok()
                .filter(|hours| (1..=MAX_EXPIRATION_HOURS).contains(hours))
                .ok_or_else(|| ConfigError::Invalid {
                    var: "JWT_EXPIRATION_HOURS",
                    reason: format!(
                        "'{}' debe ser un número de horas entre 1 y {}",
                        raw, MAX_EXPIRATION_HOURS
                    ),
                })?,
            None => 24,
        };

        Ok(AppConfig {
            bind_address: lookup("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            database: DatabaseConfig {
                uri: lookup("MONGODB_URI")
                    .unwrap_or_else(|| "mongodb://localhost:27017".to_string()),
                name: lookup("MONGODB_DATABASE").unwrap_or_else(|| "redrice".to_string()),
            },
            tokens: TokenConfig {
                secret,
                expiration_hours,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_secret_is_set() {
        let config = AppConfig::from_lookup(lookup_from(&[("JWT_SECRET", SECRET)])).unwrap();

        assert_eq!(config.bind_address, "0.0.0.0:8080");
        assert_eq!(config.database.uri, "mongodb://localhost:27017");
        assert_eq!(config.database.name, "redrice");
        assert_eq!(config.tokens.expiration_hours, 24);
    }

    #[test]
    fn missing_secret_is_rejected() {
        let err = AppConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("JWT_SECRET"));
    }

    #[test]
    fn short_secret_is_rejected() {
        let err = AppConfig::from_lookup(lookup_from(&[("JWT_SECRET", "corto")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "JWT_SECRET", .. }));
    }

    #[test]
    fn expiration_must_be_positive() {
        let err = AppConfig::from_lookup(lookup_from(&[
            ("JWT_SECRET", SECRET),
            ("JWT_EXPIRATION_HOURS", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "JWT_EXPIRATION_HOURS", .. }));
    }

    #[test]
    fn expiration_is_capped() {
        for raw in ["9000000000000000", "8761", "-5", "doce"] {
            let err = AppConfig::from_lookup(lookup_from(&[
                ("JWT_SECRET", SECRET),
                ("JWT_EXPIRATION_HOURS", raw),
            ]))
            .unwrap_err();
            assert!(matches!(err, ConfigError::Invalid { var: "JWT_EXPIRATION_HOURS", .. }), "{raw}");
        }

        let config = AppConfig::from_lookup(lookup_from(&[
            ("JWT_SECRET", SECRET),
            ("JWT_EXPIRATION_HOURS", "8760"),
        ]))
        .unwrap();
        assert_eq!(config.tokens.expiration_hours, MAX_EXPIRATION_HOURS);
    }

    #[test]
    fn overrides_are_read() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("JWT_SECRET", SECRET),
            ("JWT_EXPIRATION_HOURS", "2"),
            ("MONGODB_DATABASE", "pruebas"),
            ("BIND_ADDRESS", "127.0.0.1:3000"),
        ]))
        .unwrap();

        assert_eq!(config.tokens.expiration_hours, 2);
        assert_eq!(config.database.name, "pruebas");
        assert_eq!(config.bind_address, "127.0.0.1:3000");
    }
}
