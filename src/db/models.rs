//! Documentos almacenados en MongoDB
//!
//! Todas las entidades usan borrado lógico: `deleted_at` con timestamp unix
//! y todas las consultas filtran `deleted_at: null`.

use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Rol de un usuario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub email: String,
    pub telephone: String,
    pub role: Role,
    pub password_hash: String,
    /// Reservas no borradas de las que es propietario
    #[serde(default)]
    pub active_reservations: i32,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default)]
    pub deleted_at: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Restaurant {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub address: String,
    pub telephone: String,
    pub open_time: String,
    pub close_time: String,
    pub instagram: String,
    pub facebook: String,
    pub description: String,
    pub image_url: String,
    /// Media de `rating` de los comentarios vivos
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub comment_count: i64,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default)]
    pub deleted_at: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Reservation {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub date_time: DateTime<Utc>,
    pub table_num: i32,
    pub exit_time: DateTime<Utc>,
    pub user_id: ObjectId,
    pub restaurant_id: ObjectId,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default)]
    pub deleted_at: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Comment {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub date_time: DateTime<Utc>,
    pub text: String,
    pub rating: f64,
    pub user_id: ObjectId,
    pub restaurant_id: ObjectId,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default)]
    pub deleted_at: Option<i64>,
}
