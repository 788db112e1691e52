//! # RedRice Backend Server
//!
//! Servidor de reservas de restaurantes construido con Rust, Actix Web y MongoDB.
//!
//! ## Configuración
//!
//! El servidor se configura mediante variables de entorno (archivo `.env`):
//!
//! ```env
//! # Base de datos MongoDB (replica set, necesario para transacciones)
//! MONGODB_URI=mongodb://localhost:27017/?replicaSet=rs0
//! MONGODB_DATABASE=redrice
//!
//! # Servidor
//! BIND_ADDRESS=0.0.0.0:8080
//!
//! # Tokens
//! JWT_SECRET=una-clave-de-al-menos-32-caracteres
//! JWT_EXPIRATION_HOURS=24
//!
//! # Logging
//! RUST_LOG=redrice_backend=debug,mongodb=info
//! ```
//!
//! ## Arquitectura
//!
//! ```text
//! Cliente
//!     ↓ HTTP/JSON + Bearer token
//! API REST (Actix Web)
//!     ↓ MongoDB Driver (sesiones y transacciones)
//! MongoDB Database
//! ```

use actix_web::{middleware::Logger, web, App, HttpServer};
use tracing_subscriber::EnvFilter;

use redrice_backend::api;
use redrice_backend::auth::TokenService;
use redrice_backend::config::AppConfig;
use redrice_backend::db::MongoRepo;

const DEFAULT_LOG_FILTER: &str = "redrice_backend=debug,mongodb=info";

/// Función principal que inicia el servidor web
///
/// 1. Carga variables de entorno desde `.env`
/// 2. Configura el sistema de logging con tracing
/// 3. Lee y valida la configuración
/// 4. Establece conexión con MongoDB y crea índices
/// 5. Arranca el servidor HTTP con las rutas de la API
///
/// # Errores
///
/// Retorna `std::io::Error` si la configuración es inválida, no se puede
/// conectar a MongoDB o no se puede bindear la dirección.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_LOG_FILTER))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("Iniciando RedRice Backend con MongoDB...");

    let config = AppConfig::from_env().map_err(|e| {
        tracing::error!("Configuración inválida: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;

    let mongo_repo = match MongoRepo::connect(&config.database).await {
        Ok(repo) => {
            // No es un error fatal, continuamos sin índices
            if let Err(e) = repo.create_indexes().await {
                tracing::warn!("Advertencia creando índices: {}", e);
            }
            repo
        }
        Err(e) => {
            tracing::error!("Error conectando a MongoDB: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Error de MongoDB: {}", e),
            ));
        }
    };

    let repo = web::Data::new(mongo_repo);
    let tokens = web::Data::new(TokenService::new(&config.tokens));

    tracing::info!("Servidor iniciando en {}", config.bind_address);

    HttpServer::new(move || {
        App::new()
            .app_data(repo.clone())
            .app_data(tokens.clone())
            .wrap(Logger::default())
            .configure(api::init_routes)
    })
    .bind(&config.bind_address)?
    .run()
    .await
}
