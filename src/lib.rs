//! # RedRice Backend
//!
//! Backend de reservas de restaurantes construido con Actix Web y MongoDB.
//!
//! - [`api`] - Rutas REST bajo `/api/v1`
//! - [`auth`] - Tokens JWT, contraseñas y control de acceso
//! - [`db`] - Modelos y acceso a MongoDB
//! - [`config`] - Configuración desde variables de entorno

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
