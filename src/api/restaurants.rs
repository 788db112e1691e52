//! # API de Restaurantes
//!
//! - Listado y detalle para cualquier usuario autenticado
//! - Alta, modificación y baja solo para administradores
//!
//! `rating` y `comment_count` no se aceptan en la entrada: los mantiene el
//! módulo de comentarios.

use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::comments::CommentResponse;
use super::{parse_id, AppResult};
use crate::auth::{AdminIdentity, Identity};
use crate::db::{MongoRepo, NewRestaurant, Restaurant, RestaurantChanges};

#[derive(Deserialize, Validate)]
struct CreateRestaurant {
    #[validate(length(min = 1, message = "El nombre del restaurante es requerido"))]
    name: String,
    #[serde(default)]
    address: String,
    #[serde(default)]
    telephone: String,
    #[serde(default)]
    open_time: String,
    #[serde(default)]
    close_time: String,
    #[serde(default)]
    instagram: String,
    #[serde(default)]
    facebook: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    image_url: String,
}

#[derive(Deserialize, Validate)]
struct UpdateRestaurant {
    #[validate(length(min = 1, message = "El nombre no puede estar vacío"))]
    name: Option<String>,
    address: Option<String>,
    telephone: Option<String>,
    open_time: Option<String>,
    close_time: Option<String>,
    instagram: Option<String>,
    facebook: Option<String>,
    description: Option<String>,
    image_url: Option<String>,
}

#[derive(Serialize)]
pub struct RestaurantResponse {
    id: String,
    name: String,
    address: String,
    telephone: String,
    open_time: String,
    close_time: String,
    instagram: String,
    facebook: String,
    description: String,
    image_url: String,
    rating: f64,
    comment_count: i64,
}

impl From<Restaurant> for RestaurantResponse {
    fn from(restaurant: Restaurant) -> Self {
        RestaurantResponse {
            id: restaurant.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: restaurant.name,
            address: restaurant.address,
            telephone: restaurant.telephone,
            open_time: restaurant.open_time,
            close_time: restaurant.close_time,
            instagram: restaurant.instagram,
            facebook: restaurant.facebook,
            description: restaurant.description,
            image_url: restaurant.image_url,
            rating: restaurant.rating,
            comment_count: restaurant.comment_count,
        }
    }
}

#[get("/restaurants")]
async fn list_restaurants(
    repo: web::Data<MongoRepo>,
    _identity: Identity,
) -> AppResult<impl Responder> {
    let restaurants = repo.list_restaurants().await?;
    let results: Vec<RestaurantResponse> = restaurants
        .into_iter()
        .map(RestaurantResponse::from)
        .collect();
    Ok(HttpResponse::Ok().json(results))
}

#[get("/restaurants/{id}")]
async fn get_restaurant(
    repo: web::Data<MongoRepo>,
    path: web::Path<String>,
    _identity: Identity,
) -> AppResult<impl Responder> {
    let id = parse_id(&path)?;
    let restaurant = repo.get_restaurant(&id).await?;
    Ok(HttpResponse::Ok().json(RestaurantResponse::from(restaurant)))
}

/// Comentarios vivos de un restaurante, los más recientes primero
#[get("/restaurants/{id}/comments")]
async fn get_restaurant_comments(
    repo: web::Data<MongoRepo>,
    path: web::Path<String>,
    _identity: Identity,
) -> AppResult<impl Responder> {
    let id = parse_id(&path)?;
    let comments = repo.list_comments_of_restaurant(&id).await?;
    let results: Vec<CommentResponse> = comments.into_iter().map(CommentResponse::from).collect();
    Ok(HttpResponse::Ok().json(results))
}

#[post("/restaurants")]
async fn create_restaurant(
    repo: web::Data<MongoRepo>,
    data: web::Json<CreateRestaurant>,
    _admin: AdminIdentity,
) -> AppResult<impl Responder> {
    data.validate()?;
    let data = data.into_inner();

    let restaurant = repo
        .create_restaurant(NewRestaurant {
            name: data.name.trim().to_string(),
            address: data.address,
            telephone: data.telephone,
            open_time: data.open_time,
            close_time: data.close_time,
            instagram: data.instagram,
            facebook: data.facebook,
            description: data.description,
            image_url: data.image_url,
        })
        .await?;

    Ok(HttpResponse::Created().json(RestaurantResponse::from(restaurant)))
}

#[put("/restaurants/{id}")]
async fn update_restaurant(
    repo: web::Data<MongoRepo>,
    path: web::Path<String>,
    data: web::Json<UpdateRestaurant>,
    _admin: AdminIdentity,
) -> AppResult<impl Responder> {
    let id = parse_id(&path)?;
    data.validate()?;
    let data = data.into_inner();

    let restaurant = repo
        .update_restaurant(
            &id,
            RestaurantChanges {
                name: data.name,
                address: data.address,
                telephone: data.telephone,
                open_time: data.open_time,
                close_time: data.close_time,
                instagram: data.instagram,
                facebook: data.facebook,
                description: data.description,
                image_url: data.image_url,
            },
        )
        .await?;

    Ok(HttpResponse::Ok().json(RestaurantResponse::from(restaurant)))
}

#[delete("/restaurants/{id}")]
async fn delete_restaurant(
    repo: web::Data<MongoRepo>,
    path: web::Path<String>,
    _admin: AdminIdentity,
) -> AppResult<impl Responder> {
    let id = parse_id(&path)?;
    repo.delete_restaurant(&id).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(list_restaurants);
    cfg.service(get_restaurant_comments);
    cfg.service(get_restaurant);
    cfg.service(create_restaurant);
    cfg.service(update_restaurant);
    cfg.service(delete_restaurant);
}
