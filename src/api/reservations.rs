//! # API de Reservas
//!
//! Este módulo maneja todas las operaciones relacionadas con reservas:
//! - Crear nuevas reservas (máximo 3 activas por usuario no administrador)
//! - Listar y consultar reservas
//! - Modificar y borrar reservas propias (o cualquiera, siendo admin)

use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{parse_id, AppResult};
use crate::auth::Identity;
use crate::db::{MongoRepo, NewReservation, Reservation, ReservationChanges};

/// Estructura para crear una nueva reserva
#[derive(Deserialize)]
struct MakeReservation {
    /// Entrada (RFC 3339)
    date_time: DateTime<Utc>,
    /// Número de mesa
    table_num: i32,
    /// Salida prevista (RFC 3339), posterior a `date_time`
    exit_time: DateTime<Utc>,
    /// ID del restaurante (ObjectId como string)
    restaurant_id: String,
}

#[derive(Deserialize)]
struct UpdateReservation {
    date_time: Option<DateTime<Utc>>,
    table_num: Option<i32>,
    exit_time: Option<DateTime<Utc>>,
    restaurant_id: Option<String>,
}

/// Estructura de respuesta para una reserva, con ObjectIds como strings
#[derive(Serialize)]
pub struct ReservationResponse {
    id: String,
    date_time: DateTime<Utc>,
    table_num: i32,
    exit_time: DateTime<Utc>,
    user_id: String,
    restaurant_id: String,
    created_at: i64,
}

impl From<Reservation> for ReservationResponse {
    fn from(reservation: Reservation) -> Self {
        ReservationResponse {
            id: reservation.id.map(|id| id.to_hex()).unwrap_or_default(),
            date_time: reservation.date_time,
            table_num: reservation.table_num,
            exit_time: reservation.exit_time,
            user_id: reservation.user_id.to_hex(),
            restaurant_id: reservation.restaurant_id.to_hex(),
            created_at: reservation.created_at,
        }
    }
}

/// Crea una nueva reserva a nombre del usuario autenticado
///
/// # Errores
/// - `400 Bad Request`: Mesa o horario inválidos
/// - `403 Forbidden`: El usuario ya tiene 3 reservas activas
/// - `404 Not Found`: Restaurante no encontrado
#[post("/reservations")]
async fn make_reservation(
    repo: web::Data<MongoRepo>,
    data: web::Json<MakeReservation>,
    identity: Identity,
) -> AppResult<impl Responder> {
    let data = data.into_inner();
    let restaurant_id = parse_id(&data.restaurant_id)?;

    let reservation = repo
        .create_reservation(
            &identity.user_id,
            NewReservation {
                date_time: data.date_time,
                table_num: data.table_num,
                exit_time: data.exit_time,
                restaurant_id,
            },
        )
        .await?;

    Ok(HttpResponse::Created().json(ReservationResponse::from(reservation)))
}

/// Lista reservas: todas para administradores, las propias para el resto
#[get("/reservations")]
async fn get_reservations(
    repo: web::Data<MongoRepo>,
    identity: Identity,
) -> AppResult<impl Responder> {
    let reservations = repo.list_reservations(&identity).await?;
    let results: Vec<ReservationResponse> = reservations
        .into_iter()
        .map(ReservationResponse::from)
        .collect();
    Ok(HttpResponse::Ok().json(results))
}

#[get("/reservations/{id}")]
async fn get_reservation(
    repo: web::Data<MongoRepo>,
    path: web::Path<String>,
    identity: Identity,
) -> AppResult<impl Responder> {
    let id = parse_id(&path)?;
    let reservation = repo.get_reservation(&id, &identity).await?;
    Ok(HttpResponse::Ok().json(ReservationResponse::from(reservation)))
}

#[put("/reservations/{id}")]
async fn update_reservation(
    repo: web::Data<MongoRepo>,
    path: web::Path<String>,
    data: web::Json<UpdateReservation>,
    identity: Identity,
) -> AppResult<impl Responder> {
    let id = parse_id(&path)?;
    let data = data.into_inner();
    let restaurant_id = data.restaurant_id.as_deref().map(parse_id).transpose()?;

    let reservation = repo
        .update_reservation(
            &id,
            &identity,
            ReservationChanges {
                date_time: data.date_time,
                table_num: data.table_num,
                exit_time: data.exit_time,
                restaurant_id,
            },
        )
        .await?;

    Ok(HttpResponse::Ok().json(ReservationResponse::from(reservation)))
}

#[delete("/reservations/{id}")]
async fn delete_reservation(
    repo: web::Data<MongoRepo>,
    path: web::Path<String>,
    identity: Identity,
) -> AppResult<impl Responder> {
    let id = parse_id(&path)?;
    repo.delete_reservation(&id, &identity).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Configura las rutas relacionadas con reservas
///
/// # Rutas disponibles
/// - `POST /reservations` - Crear nueva reserva
/// - `GET /reservations` - Listar reservas
/// - `GET /reservations/{id}` - Detalle (propietario o admin)
/// - `PUT /reservations/{id}` - Modificar (propietario o admin)
/// - `DELETE /reservations/{id}` - Borrar (propietario o admin)
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(make_reservation);
    cfg.service(get_reservations);
    cfg.service(get_reservation);
    cfg.service(update_reservation);
    cfg.service(delete_reservation);
}
