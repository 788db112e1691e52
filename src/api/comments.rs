//! # API de Comentarios
//!
//! Cada comentario lleva una valoración de 0 a 5 que alimenta la media del
//! restaurante.

use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{parse_id, AppResult};
use crate::auth::Identity;
use crate::db::{Comment, CommentChanges, MongoRepo, NewComment};

#[derive(Deserialize, Validate)]
struct CreateComment {
    /// Fecha del comentario; por defecto, ahora
    date_time: Option<DateTime<Utc>>,
    #[validate(length(min = 1, message = "El comentario no puede estar vacío"))]
    text: String,
    #[validate(range(min = 0.0, max = 5.0, message = "La valoración debe estar entre 0 y 5"))]
    rating: f64,
    restaurant_id: String,
}

#[derive(Deserialize, Validate)]
struct UpdateComment {
    #[validate(length(min = 1, message = "El comentario no puede estar vacío"))]
    text: Option<String>,
    #[validate(range(min = 0.0, max = 5.0, message = "La valoración debe estar entre 0 y 5"))]
    rating: Option<f64>,
}

#[derive(Serialize)]
pub struct CommentResponse {
    id: String,
    date_time: DateTime<Utc>,
    text: String,
    rating: f64,
    user_id: String,
    restaurant_id: String,
}

impl From<Comment> for CommentResponse {
    fn from(comment: Comment) -> Self {
        CommentResponse {
            id: comment.id.map(|id| id.to_hex()).unwrap_or_default(),
            date_time: comment.date_time,
            text: comment.text,
            rating: comment.rating,
            user_id: comment.user_id.to_hex(),
            restaurant_id: comment.restaurant_id.to_hex(),
        }
    }
}

#[get("/comments")]
async fn list_comments(repo: web::Data<MongoRepo>, _identity: Identity) -> AppResult<impl Responder> {
    let comments = repo.list_comments().await?;
    let results: Vec<CommentResponse> = comments.into_iter().map(CommentResponse::from).collect();
    Ok(HttpResponse::Ok().json(results))
}

#[get("/comments/{id}")]
async fn get_comment(
    repo: web::Data<MongoRepo>,
    path: web::Path<String>,
    _identity: Identity,
) -> AppResult<impl Responder> {
    let id = parse_id(&path)?;
    let comment = repo.get_comment(&id).await?;
    Ok(HttpResponse::Ok().json(CommentResponse::from(comment)))
}

/// Publica un comentario; la media del restaurante se actualiza en la misma transacción
#[post("/comments")]
async fn create_comment(
    repo: web::Data<MongoRepo>,
    data: web::Json<CreateComment>,
    identity: Identity,
) -> AppResult<impl Responder> {
    data.validate()?;
    let data = data.into_inner();
    let restaurant_id = parse_id(&data.restaurant_id)?;

    let comment = repo
        .create_comment(
            &identity.user_id,
            NewComment {
                date_time: data.date_time,
                text: data.text,
                rating: data.rating,
                restaurant_id,
            },
        )
        .await?;

    Ok(HttpResponse::Created().json(CommentResponse::from(comment)))
}

/// Solo el autor puede editar
#[put("/comments/{id}")]
async fn update_comment(
    repo: web::Data<MongoRepo>,
    path: web::Path<String>,
    data: web::Json<UpdateComment>,
    identity: Identity,
) -> AppResult<impl Responder> {
    let id = parse_id(&path)?;
    data.validate()?;
    let data = data.into_inner();

    let comment = repo
        .update_comment(
            &id,
            &identity,
            CommentChanges {
                text: data.text,
                rating: data.rating,
            },
        )
        .await?;

    Ok(HttpResponse::Ok().json(CommentResponse::from(comment)))
}

/// El autor o un administrador
#[delete("/comments/{id}")]
async fn delete_comment(
    repo: web::Data<MongoRepo>,
    path: web::Path<String>,
    identity: Identity,
) -> AppResult<impl Responder> {
    let id = parse_id(&path)?;
    repo.delete_comment(&id, &identity).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(list_comments);
    cfg.service(get_comment);
    cfg.service(create_comment);
    cfg.service(update_comment);
    cfg.service(delete_comment);
}
