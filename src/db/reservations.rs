//! Libro de reservas
//!
//! El límite de reservas activas se guarda como contador en el documento del
//! propietario (`users.active_reservations`). Crear y borrar una reserva
//! modifica reserva y contador en la misma transacción, de modo que dos
//! creaciones concurrentes del mismo usuario escriben el mismo documento y
//! MongoDB serializa ambas; la segunda ve ya el contador incrementado.

use chrono::{DateTime, Utc};
use futures::FutureExt;
use mongodb::bson::{doc, oid::ObjectId, to_bson, Document};
use mongodb::ClientSession;

use super::models::{Reservation, Role};
use super::mongodb::{collect_all, MongoRepo, Result};
use crate::api::{AppError, ResultExt};
use crate::auth::Identity;

/// Máximo de reservas activas de un usuario no administrador
pub const RESERVATION_QUOTA: i32 = 3;

#[derive(Debug, Clone)]
pub struct NewReservation {
    pub date_time: DateTime<Utc>,
    pub table_num: i32,
    pub exit_time: DateTime<Utc>,
    pub restaurant_id: ObjectId,
}

#[derive(Debug, Clone, Default)]
pub struct ReservationChanges {
    pub date_time: Option<DateTime<Utc>>,
    pub table_num: Option<i32>,
    pub exit_time: Option<DateTime<Utc>>,
    pub restaurant_id: Option<ObjectId>,
}

/// `true` si un usuario con `active` reservas puede crear otra
pub fn quota_allows(role: Role, active: i32) -> bool {
    role == Role::Admin || active < RESERVATION_QUOTA
}

/// Comprueba mesa y horario de una reserva
pub fn validate_slot(date_time: &DateTime<Utc>, exit_time: &DateTime<Utc>, table_num: i32) -> Result<()> {
    if table_num <= 0 {
        return Err(AppError::validation_field("table_num", "El número de mesa debe ser mayor a 0"));
    }
    if exit_time <= date_time {
        return Err(AppError::validation_field(
            "exit_time",
            "La hora de salida debe ser posterior a la de entrada",
        ));
    }
    Ok(())
}

impl MongoRepo {
    /// Crea una reserva para `owner` respetando [`RESERVATION_QUOTA`]
    ///
    /// # Errores
    /// - `QuotaExceeded`: el propietario no es admin y ya tiene el máximo
    /// - `NotFoundWithId`: restaurante inexistente
    /// - `Unauthorized`: la cuenta del propietario ya no está activa
    pub async fn create_reservation(&self, owner: &ObjectId, new: NewReservation) -> Result<Reservation> {
        validate_slot(&new.date_time, &new.exit_time, new.table_num)?;

        let now = MongoRepo::current_timestamp();
        let mut reservation = Reservation {
            id: None,
            date_time: new.date_time,
            table_num: new.table_num,
            exit_time: new.exit_time,
            user_id: *owner,
            restaurant_id: new.restaurant_id,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        let inserted = self
            .with_transaction("create_reservation", &reservation, |repo, session, reservation| {
                async move {
                    repo.restaurant_in(session, &reservation.restaurant_id).await?;
                    repo.reserve_slot(session, &reservation.user_id).await?;

                    let result = repo
                        .reservations()
                        .insert_one(reservation)
                        .session(&mut *session)
                        .await
                        .map_err(|e| AppError::database("create_reservation", e))?;

                    Ok(result.inserted_id.as_object_id())
                }
                .boxed()
            })
            .await?;

        reservation.id = inserted;
        tracing::info!(
            reservation_id = ?reservation.id,
            user_id = %owner,
            restaurant_id = %reservation.restaurant_id,
            "Reservation created"
        );
        Ok(reservation)
    }

    // Incrementa el contador del propietario si la cuota lo permite
    async fn reserve_slot(&self, session: &mut ClientSession, owner: &ObjectId) -> Result<()> {
        let user = self.active_user_in(session, owner).await?;

        if !quota_allows(user.role, user.active_reservations) {
            return Err(AppError::QuotaExceeded { limit: RESERVATION_QUOTA });
        }

        // El filtro repite la condición para que la cuota también se cumpla
        // si el documento cambió desde la lectura
        let mut filter = doc! { "_id": owner };
        if user.role != Role::Admin {
            filter.insert("active_reservations", doc! { "$lt": RESERVATION_QUOTA });
        }

        let result = self
            .users()
            .update_one(filter, doc! { "$inc": { "active_reservations": 1 } })
            .session(&mut *session)
            .await
            .map_err(|e| AppError::database("reserve_slot", e))?;

        if result.matched_count == 0 {
            return Err(AppError::QuotaExceeded { limit: RESERVATION_QUOTA });
        }
        Ok(())
    }

    pub async fn get_reservation(&self, id: &ObjectId, caller: &Identity) -> Result<Reservation> {
        let reservation = self
            .reservations()
            .find_one(doc! { "_id": id, "deleted_at": null })
            .await
            .map_err(|e| AppError::database("get_reservation", e))?
            .ok_or_else(|| AppError::not_found_id("Reserva", &id.to_hex()))?;

        if !caller.can_act_on(&reservation.user_id) {
            return Err(AppError::Forbidden("La reserva pertenece a otro usuario".to_string()));
        }
        Ok(reservation)
    }

    /// Los administradores ven todas las reservas; el resto solo las suyas
    pub async fn list_reservations(&self, caller: &Identity) -> Result<Vec<Reservation>> {
        let filter = if caller.is_admin() {
            doc! { "deleted_at": null }
        } else {
            doc! { "deleted_at": null, "user_id": caller.user_id }
        };
        self.find_reservations(filter, "list_reservations").await
    }

    pub async fn list_reservations_of_user(&self, user_id: &ObjectId) -> Result<Vec<Reservation>> {
        self.find_reservations(
            doc! { "deleted_at": null, "user_id": user_id },
            "list_reservations_of_user",
        )
        .await
    }

    async fn find_reservations(&self, filter: Document, operation: &str) -> Result<Vec<Reservation>> {
        let cursor = self
            .reservations()
            .find(filter)
            .sort(doc! { "date_time": 1 })
            .await
            .map_err(|e| AppError::database(operation, e))?;

        collect_all(cursor, operation).await
    }

    /// Modifica una reserva propia (o cualquiera, si el llamante es admin)
    pub async fn update_reservation(
        &self,
        id: &ObjectId,
        caller: &Identity,
        changes: ReservationChanges,
    ) -> Result<Reservation> {
        let current = self.get_reservation(id, caller).await?;

        let date_time = changes.date_time.unwrap_or(current.date_time);
        let exit_time = changes.exit_time.unwrap_or(current.exit_time);
        let table_num = changes.table_num.unwrap_or(current.table_num);
        validate_slot(&date_time, &exit_time, table_num)?;

        let mut set = doc! {
            "date_time": to_bson(&date_time).map_err_internal("Error serializando date_time")?,
            "exit_time": to_bson(&exit_time).map_err_internal("Error serializando exit_time")?,
            "table_num": table_num,
            "updated_at": MongoRepo::current_timestamp()
        };

        if let Some(restaurant_id) = changes.restaurant_id {
            if restaurant_id != current.restaurant_id {
                self.get_restaurant(&restaurant_id).await?;
            }
            set.insert("restaurant_id", restaurant_id);
        }

        let result = self
            .reservations()
            .update_one(
                doc! { "_id": id, "deleted_at": null, "user_id": current.user_id },
                doc! { "$set": set },
            )
            .await
            .map_err(|e| AppError::database("update_reservation", e))?;

        if result.matched_count == 0 {
            return Err(AppError::not_found_id("Reserva", &id.to_hex()));
        }

        self.get_reservation(id, caller).await
    }

    /// Borrado lógico que libera una plaza de la cuota del propietario
    pub async fn delete_reservation(&self, id: &ObjectId, caller: &Identity) -> Result<()> {
        let context = (*id, *caller);

        self.with_transaction("delete_reservation", &context, |repo, session, (id, caller)| {
            async move {
                let reservation = repo
                    .reservations()
                    .find_one(doc! { "_id": id, "deleted_at": null })
                    .session(&mut *session)
                    .await
                    .map_err(|e| AppError::database("delete_reservation", e))?
                    .ok_or_else(|| AppError::not_found_id("Reserva", &id.to_hex()))?;

                if !caller.can_act_on(&reservation.user_id) {
                    return Err(AppError::Forbidden(
                        "La reserva pertenece a otro usuario".to_string(),
                    ));
                }

                let now = MongoRepo::current_timestamp();
                repo.reservations()
                    .update_one(
                        doc! { "_id": id, "deleted_at": null },
                        doc! { "$set": { "deleted_at": now, "updated_at": now } },
                    )
                    .session(&mut *session)
                    .await
                    .map_err(|e| AppError::database("delete_reservation", e))?;

                repo.users()
                    .update_one(
                        doc! { "_id": reservation.user_id, "active_reservations": { "$gt": 0 } },
                        doc! { "$inc": { "active_reservations": -1 } },
                    )
                    .session(&mut *session)
                    .await
                    .map_err(|e| AppError::database("release_slot", e))?;

                Ok(())
            }
            .boxed()
        })
        .await?;

        tracing::info!(reservation_id = %id, caller = %caller.user_id, "Reservation deleted");
        Ok(())
    }
}
