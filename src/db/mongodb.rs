use std::time::Duration;

use futures::future::BoxFuture;
use mongodb::bson::doc;
use mongodb::error::UNKNOWN_TRANSACTION_COMMIT_RESULT;
use mongodb::{Client, ClientSession, Collection, Cursor, Database};
use serde::de::DeserializeOwned;

use super::models::{Comment, Reservation, Restaurant, User};
use crate::api::AppError;
use crate::config::DatabaseConfig;

pub type Result<T> = std::result::Result<T, AppError>;

/// Tiempo máximo reintentando una transacción ante errores transitorios
/// (write conflicts entre peticiones que tocan el mismo documento)
pub const TRANSACTION_RETRY_LIMIT: Duration = Duration::from_secs(30);

/// Reintentos del commit cuando su resultado es desconocido
pub const MAX_COMMIT_ATTEMPTS: u32 = 3;

const BACKOFF_BASE_MS: u64 = 5;
const BACKOFF_MAX_MS: u64 = 500;

/// Espera antes del reintento `attempt` (desde 1): backoff exponencial con
/// jitter, entre la mitad y el total del tope de ese intento
pub fn retry_delay(attempt: u32, jitter: u64) -> Duration {
    let ceiling = BACKOFF_BASE_MS
        .saturating_mul(1u64 << attempt.min(16))
        .min(BACKOFF_MAX_MS);
    let floor = ceiling / 2;
    Duration::from_millis(floor + jitter % (ceiling - floor + 1))
}

#[derive(Debug, Clone)]
pub struct MongoRepo {
    pub client: Client,
    pub database: Database,
}

impl MongoRepo {
    pub async fn connect(config: &DatabaseConfig) -> Result<MongoRepo> {
        let client = Client::with_uri_str(&config.uri)
            .await
            .map_err(|e| AppError::Internal(format!("Error conectando a MongoDB: {}", e)))?;

        let database = client.database(&config.name);

        // Test connection
        database
            .run_command(doc! {"ping": 1})
            .await
            .map_err(|e| AppError::Internal(format!("Error validando conexión MongoDB: {}", e)))?;

        tracing::info!(database = %config.name, "Conexión a MongoDB establecida exitosamente");

        Ok(MongoRepo { client, database })
    }

    pub fn users(&self) -> Collection<User> {
        self.database.collection("users")
    }

    pub fn restaurants(&self) -> Collection<Restaurant> {
        self.database.collection("restaurants")
    }

    pub fn reservations(&self) -> Collection<Reservation> {
        self.database.collection("reservations")
    }

    pub fn comments(&self) -> Collection<Comment> {
        self.database.collection("comments")
    }

    /// Crea los índices; los únicos de `users` respaldan la detección de duplicados
    pub async fn create_indexes(&self) -> Result<()> {
        use mongodb::{options::IndexOptions, IndexModel};

        let user_indexes = vec![
            IndexModel::builder()
                .keys(doc! { "email": 1 })
                .options(IndexOptions::builder().unique(true).build())
                .build(),
            IndexModel::builder()
                .keys(doc! { "telephone": 1 })
                .options(IndexOptions::builder().unique(true).build())
                .build(),
        ];

        self.users()
            .create_indexes(user_indexes)
            .await
            .map_err(|e| AppError::Internal(format!("Error creando índices users: {}", e)))?;

        self.restaurants()
            .create_index(IndexModel::builder().keys(doc! { "name": 1 }).build())
            .await
            .map_err(|e| AppError::Internal(format!("Error creando índices restaurants: {}", e)))?;

        let reservation_indexes = vec![
            IndexModel::builder().keys(doc! { "user_id": 1 }).build(),
            IndexModel::builder().keys(doc! { "restaurant_id": 1 }).build(),
        ];

        self.reservations()
            .create_indexes(reservation_indexes)
            .await
            .map_err(|e| AppError::Internal(format!("Error creando índices reservations: {}", e)))?;

        let comment_indexes = vec![
            IndexModel::builder().keys(doc! { "restaurant_id": 1 }).build(),
            IndexModel::builder().keys(doc! { "user_id": 1 }).build(),
        ];

        self.comments()
            .create_indexes(comment_indexes)
            .await
            .map_err(|e| AppError::Internal(format!("Error creando índices comments: {}", e)))?;

        tracing::info!("Índices MongoDB creados exitosamente");
        Ok(())
    }

    /// Ejecuta `body` dentro de una transacción multi-documento.
    ///
    /// Si el cuerpo o el commit fallan con `TransientTransactionError` la
    /// transacción completa se repite tras [`retry_delay`], mientras no se
    /// supere [`TRANSACTION_RETRY_LIMIT`]. Cualquier otro error aborta y se
    /// propaga tal cual.
    pub async fn with_transaction<C, T, F>(&self, operation: &str, context: &C, body: F) -> Result<T>
    where
        C: Sync,
        F: for<'s> Fn(&'s MongoRepo, &'s mut ClientSession, &'s C) -> BoxFuture<'s, Result<T>>,
    {
        let mut session = self
            .client
            .start_session()
            .await
            .map_err(|e| AppError::database(operation, e))?;

        let started = tokio::time::Instant::now();
        let mut attempt = 1;
        loop {
            session
                .start_transaction()
                .await
                .map_err(|e| AppError::database(operation, e))?;

            let outcome = match body(self, &mut session, context).await {
                Ok(value) => commit(&mut session, operation).await.map(|_| value),
                Err(err) => {
                    if let Err(abort) = session.abort_transaction().await {
                        tracing::warn!(operation = %operation, error = %abort, "Error abortando transacción");
                    }
                    Err(err)
                }
            };

            match outcome {
                Err(err) if err.is_transient_transaction() => {
                    let delay = retry_delay(attempt, uuid::Uuid::new_v4().as_u128() as u64);
                    if started.elapsed() + delay > TRANSACTION_RETRY_LIMIT {
                        tracing::warn!(operation = %operation, attempt, "Transaction retry limit reached");
                        return Err(err);
                    }
                    tracing::debug!(operation = %operation, attempt, ?delay, "Transient transaction error, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    // Función auxiliar para obtener timestamp actual
    pub fn current_timestamp() -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Recorre un cursor completo y deserializa cada documento
pub async fn collect_all<T>(mut cursor: Cursor<T>, operation: &str) -> Result<Vec<T>>
where
    T: DeserializeOwned + Send + Sync,
{
    let mut results = Vec::new();

    while cursor
        .advance()
        .await
        .map_err(|e| AppError::database(operation, e))?
    {
        let item = cursor
            .deserialize_current()
            .map_err(|e| AppError::database(operation, e))?;
        results.push(item);
    }

    Ok(results)
}

async fn commit(session: &mut ClientSession, operation: &str) -> Result<()> {
    let mut attempt = 1;
    loop {
        match session.commit_transaction().await {
            Ok(()) => return Ok(()),
            Err(e) if e.contains_label(UNKNOWN_TRANSACTION_COMMIT_RESULT) && attempt < MAX_COMMIT_ATTEMPTS => {
                tracing::debug!(operation = %operation, attempt, "Unknown commit result, retrying commit");
                attempt += 1;
            }
            Err(e) => return Err(AppError::database(operation, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_delay_grows_and_stays_bounded() {
        for attempt in 1..40 {
            for jitter in [0, 1, 7, 999, u64::MAX] {
                let delay = retry_delay(attempt, jitter);
                assert!(delay <= Duration::from_millis(BACKOFF_MAX_MS), "{attempt} {jitter}");
                assert!(delay >= Duration::from_millis(BACKOFF_BASE_MS), "{attempt} {jitter}");
            }
        }

        assert!(retry_delay(1, 0) < retry_delay(5, 0));
        assert_eq!(retry_delay(30, 0), Duration::from_millis(BACKOFF_MAX_MS / 2));
    }

    #[test]
    fn retry_limit_allows_many_attempts() {
        let worst_case: Duration = (1..=20).map(|attempt| retry_delay(attempt, u64::MAX)).sum();
        assert!(worst_case < TRANSACTION_RETRY_LIMIT);
    }
}
