//! # API de usuarios
//!
//! Lectura para cualquier usuario autenticado; alta y baja solo para
//! administradores. Un usuario puede editarse a sí mismo pero no cambiar su rol.

use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::reservations::ReservationResponse;
use super::{parse_id, AppError, AppResult};
use crate::auth::{AdminIdentity, Identity};
use crate::db::{MongoRepo, NewUser, Role, User, UserChanges};

/// Representación pública de un usuario; nunca incluye la contraseña
#[derive(Serialize)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub telephone: String,
    pub role: Role,
    pub active_reservations: i32,
    pub created_at: i64,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            id: user.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: user.name,
            email: user.email,
            telephone: user.telephone,
            role: user.role,
            active_reservations: user.active_reservations,
            created_at: user.created_at,
        }
    }
}

#[derive(Deserialize, Validate)]
struct CreateUserRequest {
    #[validate(length(min = 1, message = "El nombre es requerido"))]
    name: String,
    #[validate(email(message = "Email inválido"))]
    email: String,
    #[validate(length(min = 1, message = "El teléfono es requerido"))]
    telephone: String,
    #[validate(length(min = 6, message = "La contraseña debe tener al menos 6 caracteres"))]
    password: String,
    #[serde(default)]
    role: Role,
}

#[derive(Deserialize, Validate)]
struct UpdateUserRequest {
    #[validate(length(min = 1, message = "El nombre no puede estar vacío"))]
    name: Option<String>,
    #[validate(email(message = "Email inválido"))]
    email: Option<String>,
    #[validate(length(min = 1, message = "El teléfono no puede estar vacío"))]
    telephone: Option<String>,
    #[validate(length(min = 6, message = "La contraseña debe tener al menos 6 caracteres"))]
    password: Option<String>,
    role: Option<Role>,
}

/// Un usuario solo se edita a sí mismo y nunca cambia su propio rol
fn authorize_update(identity: &Identity, target: &ObjectId, changes_role: bool) -> AppResult<()> {
    if !identity.can_act_on(target) {
        return Err(AppError::Forbidden(
            "Solo puedes modificar tu propio usuario".to_string(),
        ));
    }
    if changes_role && !identity.is_admin() {
        return Err(AppError::Forbidden(
            "Solo un administrador puede cambiar roles".to_string(),
        ));
    }
    Ok(())
}

#[get("/users")]
async fn list_users(repo: web::Data<MongoRepo>, _identity: Identity) -> AppResult<impl Responder> {
    let users = repo.list_users().await?;
    let results: Vec<UserResponse> = users.into_iter().map(UserResponse::from).collect();
    Ok(HttpResponse::Ok().json(results))
}

#[get("/users/{id}")]
async fn get_user(
    repo: web::Data<MongoRepo>,
    path: web::Path<String>,
    _identity: Identity,
) -> AppResult<impl Responder> {
    let id = parse_id(&path)?;
    let user = repo.get_user(&id).await?;
    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

/// Reservas activas de un usuario (él mismo o un administrador)
#[get("/users/{id}/reservations")]
async fn get_user_reservations(
    repo: web::Data<MongoRepo>,
    path: web::Path<String>,
    identity: Identity,
) -> AppResult<impl Responder> {
    let id = parse_id(&path)?;
    if !identity.can_act_on(&id) {
        return Err(AppError::Forbidden(
            "Solo puedes consultar tus propias reservas".to_string(),
        ));
    }

    repo.get_user(&id).await?;
    let reservations = repo.list_reservations_of_user(&id).await?;
    let results: Vec<ReservationResponse> = reservations
        .into_iter()
        .map(ReservationResponse::from)
        .collect();
    Ok(HttpResponse::Ok().json(results))
}

/// Alta de usuarios por un administrador (puede asignar rol `admin`)
#[post("/users")]
async fn create_user(
    repo: web::Data<MongoRepo>,
    data: web::Json<CreateUserRequest>,
    _admin: AdminIdentity,
) -> AppResult<impl Responder> {
    data.validate()?;
    let data = data.into_inner();

    let user = repo
        .create_user(NewUser {
            name: data.name,
            email: data.email,
            telephone: data.telephone,
            password: data.password,
            role: data.role,
        })
        .await?;

    Ok(HttpResponse::Created().json(UserResponse::from(user)))
}

#[put("/users/{id}")]
async fn update_user(
    repo: web::Data<MongoRepo>,
    path: web::Path<String>,
    data: web::Json<UpdateUserRequest>,
    identity: Identity,
) -> AppResult<impl Responder> {
    let id = parse_id(&path)?;
    data.validate()?;

    authorize_update(&identity, &id, data.role.is_some())?;

    let data = data.into_inner();
    let user = repo
        .update_user(
            &id,
            UserChanges {
                name: data.name,
                email: data.email,
                telephone: data.telephone,
                password: data.password,
                role: data.role,
            },
        )
        .await?;

    Ok(HttpResponse::Ok().json(UserResponse::from(user)))
}

#[delete("/users/{id}")]
async fn delete_user(
    repo: web::Data<MongoRepo>,
    path: web::Path<String>,
    _admin: AdminIdentity,
) -> AppResult<impl Responder> {
    let id = parse_id(&path)?;
    repo.delete_user(&id).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(list_users);
    cfg.service(get_user_reservations);
    cfg.service(get_user);
    cfg.service(create_user);
    cfg.service(update_user);
    cfg.service(delete_user);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_never_contains_password_hash() {
        let user = User {
            id: Some(ObjectId::new()),
            name: "Ana".into(),
            email: "a@x.com".into(),
            telephone: "600000000".into(),
            role: Role::User,
            password_hash: "$argon2id$v=19$secreto".into(),
            active_reservations: 1,
            created_at: 0,
            updated_at: 0,
            deleted_at: None,
        };

        let json = serde_json::to_value(UserResponse::from(user)).unwrap();
        assert!(json.get("password").is_none());
        assert!(json.get("password_hash").is_none());
        assert!(!json.to_string().contains("argon2"));
        assert_eq!(json["role"], "user");
    }

    #[test]
    fn regular_user_edits_only_themself_without_role_change() {
        let me = Identity { user_id: ObjectId::new(), role: Role::User };
        let other = ObjectId::new();

        assert!(authorize_update(&me, &me.user_id, false).is_ok());
        assert!(matches!(
            authorize_update(&me, &me.user_id, true),
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            authorize_update(&me, &other, false),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn admin_edits_anyone_including_roles() {
        let admin = Identity { user_id: ObjectId::new(), role: Role::Admin };
        let other = ObjectId::new();

        assert!(authorize_update(&admin, &other, true).is_ok());
        assert!(authorize_update(&admin, &admin.user_id, true).is_ok());
    }
}
