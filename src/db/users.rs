//! Almacén de credenciales

use mongodb::bson::{doc, oid::ObjectId, Document};
use mongodb::ClientSession;

use super::models::{Role, User};
use super::mongodb::{collect_all, MongoRepo, Result};
use crate::api::middleware::ErrorLogExt;
use crate::api::AppError;
use crate::auth::password::{hash_password_async, verify_password_async};

/// Datos para crear un usuario; `password` llega en claro y nunca se guarda así
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub telephone: String,
    pub password: String,
    pub role: Role,
}

/// Cambios parciales sobre un usuario
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub telephone: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn live(filter: Document) -> Document {
    let mut filter = filter;
    filter.insert("deleted_at", mongodb::bson::Bson::Null);
    filter
}

impl MongoRepo {
    /// Registra un usuario nuevo.
    ///
    /// # Errores
    /// - `Conflict`: email o teléfono ya registrados (también si la carrera la
    ///   detecta el índice único)
    pub async fn create_user(&self, new: NewUser) -> Result<User> {
        let email = normalize_email(&new.email);
        let telephone = new.telephone.trim().to_string();

        if self.find_any_user(doc! { "email": &email }).await?.is_some() {
            return Err(AppError::Conflict("El email ya está registrado".to_string()));
        }
        if self.find_any_user(doc! { "telephone": &telephone }).await?.is_some() {
            return Err(AppError::Conflict("El teléfono ya está registrado".to_string()));
        }

        let now = MongoRepo::current_timestamp();
        let mut user = User {
            id: None,
            name: new.name.trim().to_string(),
            email,
            telephone,
            role: new.role,
            password_hash: hash_password_async(new.password).await?,
            active_reservations: 0,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        let result = self
            .users()
            .insert_one(&user)
            .await
            .map_err(|e| AppError::database("create_user", e))
            .map_err(|e| {
                if e.is_duplicate_key() {
                    AppError::Conflict("El email o el teléfono ya están registrados".to_string())
                } else {
                    e
                }
            })?;

        user.id = result.inserted_id.as_object_id();
        tracing::info!(user_id = ?user.id, role = ?user.role, "User created");
        Ok(user)
    }

    pub async fn get_user(&self, id: &ObjectId) -> Result<User> {
        self.users()
            .find_one(live(doc! { "_id": id }))
            .await
            .log_error_context("fetching user by id")
            .map_err(|e| AppError::database("get_user", e))?
            .ok_or_else(|| AppError::not_found_id("Usuario", &id.to_hex()))
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.users()
            .find_one(live(doc! { "email": normalize_email(email) }))
            .await
            .map_err(|e| AppError::database("find_user_by_email", e))
    }

    pub async fn find_user_by_telephone(&self, telephone: &str) -> Result<Option<User>> {
        self.users()
            .find_one(live(doc! { "telephone": telephone.trim() }))
            .await
            .map_err(|e| AppError::database("find_user_by_telephone", e))
    }

    /// Carga un usuario no borrado dentro de la transacción en curso.
    ///
    /// Un token sigue siendo válido hasta su caducidad aunque la cuenta se
    /// borre; las escrituras pasan por aquí para rechazar esas cuentas.
    pub(crate) async fn active_user_in(&self, session: &mut ClientSession, id: &ObjectId) -> Result<User> {
        self.users()
            .find_one(live(doc! { "_id": id }))
            .session(&mut *session)
            .await
            .map_err(|e| AppError::database("load_active_user", e))?
            .ok_or_else(|| AppError::Unauthorized("La cuenta del usuario ya no está activa".to_string()))
    }

    // Incluye usuarios borrados: email y teléfono siguen reservados tras el borrado
    async fn find_any_user(&self, filter: Document) -> Result<Option<User>> {
        self.users()
            .find_one(filter)
            .await
            .map_err(|e| AppError::database("check_user_exists", e))
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        let cursor = self
            .users()
            .find(live(doc! {}))
            .sort(doc! { "created_at": 1 })
            .await
            .map_err(|e| AppError::database("list_users", e))?;

        collect_all(cursor, "list_users").await
    }

    /// Devuelve el usuario si email y contraseña coinciden
    pub async fn verify_credentials(&self, email: &str, password: &str) -> Result<Option<User>> {
        let Some(user) = self.find_user_by_email(email).await? else {
            return Ok(None);
        };

        let matches = verify_password_async(password.to_string(), user.password_hash.clone()).await;
        Ok(matches.then_some(user))
    }

    /// `true` solo si la contraseña coincide; cualquier error cuenta como `false`
    pub async fn check_password(&self, email: &str, password: &str) -> bool {
        matches!(self.verify_credentials(email, password).await, Ok(Some(_)))
    }

    pub async fn update_user(&self, id: &ObjectId, changes: UserChanges) -> Result<User> {
        let mut set = Document::new();

        if let Some(name) = changes.name {
            set.insert("name", name.trim());
        }
        if let Some(email) = changes.email {
            let email = normalize_email(&email);
            if self
                .find_any_user(doc! { "email": &email, "_id": { "$ne": id } })
                .await?
                .is_some()
            {
                return Err(AppError::Conflict("El email ya está registrado".to_string()));
            }
            set.insert("email", email);
        }
        if let Some(telephone) = changes.telephone {
            let telephone = telephone.trim().to_string();
            if self
                .find_any_user(doc! { "telephone": &telephone, "_id": { "$ne": id } })
                .await?
                .is_some()
            {
                return Err(AppError::Conflict("El teléfono ya está registrado".to_string()));
            }
            set.insert("telephone", telephone);
        }
        if let Some(password) = changes.password {
            set.insert("password_hash", hash_password_async(password).await?);
        }
        if let Some(role) = changes.role {
            set.insert("role", role.as_str());
        }
        set.insert("updated_at", MongoRepo::current_timestamp());

        let result = self
            .users()
            .update_one(live(doc! { "_id": id }), doc! { "$set": set })
            .await
            .map_err(|e| AppError::database("update_user", e))
            .map_err(|e| {
                if e.is_duplicate_key() {
                    AppError::Conflict("El email o el teléfono ya están registrados".to_string())
                } else {
                    e
                }
            })?;

        if result.matched_count == 0 {
            return Err(AppError::not_found_id("Usuario", &id.to_hex()));
        }

        self.get_user(id).await
    }

    /// Borrado lógico. Se niega mientras el usuario tenga reservas activas.
    pub async fn delete_user(&self, id: &ObjectId) -> Result<()> {
        let now = MongoRepo::current_timestamp();
        let result = self
            .users()
            .update_one(
                live(doc! { "_id": id, "active_reservations": 0 }),
                doc! { "$set": { "deleted_at": now, "updated_at": now } },
            )
            .await
            .map_err(|e| AppError::database("delete_user", e))?;

        if result.matched_count == 0 {
            let user = self.get_user(id).await?;
            return Err(AppError::Conflict(format!(
                "El usuario tiene {} reservas activas",
                user.active_reservations
            )));
        }

        tracing::info!(user_id = %id, "User deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emails_are_normalized() {
        assert_eq!(normalize_email("  A@X.com "), "a@x.com");
    }

    #[test]
    fn live_filter_excludes_deleted() {
        let filter = live(doc! { "email": "a@x.com" });
        assert_eq!(filter, doc! { "email": "a@x.com", "deleted_at": null });
    }
}
