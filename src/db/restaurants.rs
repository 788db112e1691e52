//! Directorio de restaurantes
//!
//! `rating` y `comment_count` solo se modifican desde las transacciones de
//! comentarios ([`MongoRepo::apply_rating`]).

use mongodb::bson::{doc, oid::ObjectId, Document};
use mongodb::ClientSession;

use super::aggregate::RatingAggregate;
use super::models::Restaurant;
use super::mongodb::{collect_all, MongoRepo, Result};
use crate::api::AppError;

#[derive(Debug, Clone, Default)]
pub struct NewRestaurant {
    pub name: String,
    pub address: String,
    pub telephone: String,
    pub open_time: String,
    pub close_time: String,
    pub instagram: String,
    pub facebook: String,
    pub description: String,
    pub image_url: String,
}

#[derive(Debug, Clone, Default)]
pub struct RestaurantChanges {
    pub name: Option<String>,
    pub address: Option<String>,
    pub telephone: Option<String>,
    pub open_time: Option<String>,
    pub close_time: Option<String>,
    pub instagram: Option<String>,
    pub facebook: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

impl RestaurantChanges {
    fn into_set(self) -> Document {
        let mut set = Document::new();
        let fields = [
            ("name", self.name),
            ("address", self.address),
            ("telephone", self.telephone),
            ("open_time", self.open_time),
            ("close_time", self.close_time),
            ("instagram", self.instagram),
            ("facebook", self.facebook),
            ("description", self.description),
            ("image_url", self.image_url),
        ];
        for (key, value) in fields {
            if let Some(value) = value {
                set.insert(key, value);
            }
        }
        set
    }
}

impl MongoRepo {
    pub async fn create_restaurant(&self, new: NewRestaurant) -> Result<Restaurant> {
        let now = MongoRepo::current_timestamp();
        let mut restaurant = Restaurant {
            id: None,
            name: new.name,
            address: new.address,
            telephone: new.telephone,
            open_time: new.open_time,
            close_time: new.close_time,
            instagram: new.instagram,
            facebook: new.facebook,
            description: new.description,
            image_url: new.image_url,
            rating: 0.0,
            comment_count: 0,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        let result = self
            .restaurants()
            .insert_one(&restaurant)
            .await
            .map_err(|e| AppError::database("create_restaurant", e))?;

        restaurant.id = result.inserted_id.as_object_id();
        tracing::info!(restaurant_id = ?restaurant.id, "Restaurant created");
        Ok(restaurant)
    }

    pub async fn get_restaurant(&self, id: &ObjectId) -> Result<Restaurant> {
        self.restaurants()
            .find_one(doc! { "_id": id, "deleted_at": null })
            .await
            .map_err(|e| AppError::database("get_restaurant", e))?
            .ok_or_else(|| AppError::not_found_id("Restaurante", &id.to_hex()))
    }

    pub async fn list_restaurants(&self) -> Result<Vec<Restaurant>> {
        let cursor = self
            .restaurants()
            .find(doc! { "deleted_at": null })
            .sort(doc! { "name": 1 })
            .await
            .map_err(|e| AppError::database("list_restaurants", e))?;

        collect_all(cursor, "list_restaurants").await
    }

    pub async fn update_restaurant(&self, id: &ObjectId, changes: RestaurantChanges) -> Result<Restaurant> {
        let mut set = changes.into_set();
        set.insert("updated_at", MongoRepo::current_timestamp());

        let result = self
            .restaurants()
            .update_one(doc! { "_id": id, "deleted_at": null }, doc! { "$set": set })
            .await
            .map_err(|e| AppError::database("update_restaurant", e))?;

        if result.matched_count == 0 {
            return Err(AppError::not_found_id("Restaurante", &id.to_hex()));
        }

        self.get_restaurant(id).await
    }

    /// Borrado lógico, igual que el resto de entidades
    pub async fn delete_restaurant(&self, id: &ObjectId) -> Result<()> {
        let now = MongoRepo::current_timestamp();
        let result = self
            .restaurants()
            .update_one(
                doc! { "_id": id, "deleted_at": null },
                doc! { "$set": { "deleted_at": now, "updated_at": now } },
            )
            .await
            .map_err(|e| AppError::database("delete_restaurant", e))?;

        if result.matched_count == 0 {
            return Err(AppError::not_found_id("Restaurante", &id.to_hex()));
        }

        tracing::info!(restaurant_id = %id, "Restaurant deleted");
        Ok(())
    }

    /// Lee el restaurante dentro de una transacción
    pub(crate) async fn restaurant_in(
        &self,
        session: &mut ClientSession,
        id: &ObjectId,
    ) -> Result<Restaurant> {
        self.restaurants()
            .find_one(doc! { "_id": id, "deleted_at": null })
            .session(&mut *session)
            .await
            .map_err(|e| AppError::database("load_restaurant", e))?
            .ok_or_else(|| AppError::not_found_id("Restaurante", &id.to_hex()))
    }

    /// Recalcula la media de un restaurante dentro de la transacción en curso.
    ///
    /// El `update_one` sobre el documento del restaurante hace que dos
    /// transacciones concurrentes sobre el mismo restaurante entren en
    /// conflicto; la perdedora se reintenta y relee el agregado ya actualizado.
    pub(crate) async fn apply_rating<F>(
        &self,
        session: &mut ClientSession,
        restaurant_id: &ObjectId,
        change: F,
    ) -> Result<RatingAggregate>
    where
        F: FnOnce(RatingAggregate) -> RatingAggregate + Send,
    {
        // Sin filtrar `deleted_at`: los comentarios de un restaurante borrado
        // se pueden seguir borrando
        let restaurant = self
            .restaurants()
            .find_one(doc! { "_id": restaurant_id })
            .session(&mut *session)
            .await
            .map_err(|e| AppError::database("load_restaurant", e))?
            .ok_or_else(|| AppError::not_found_id("Restaurante", &restaurant_id.to_hex()))?;
        let current = RatingAggregate::new(restaurant.rating, restaurant.comment_count);
        let next = change(current);

        self.restaurants()
            .update_one(
                doc! { "_id": restaurant_id },
                doc! { "$set": {
                    "rating": next.rating,
                    "comment_count": next.comment_count,
                    "updated_at": MongoRepo::current_timestamp()
                } },
            )
            .session(&mut *session)
            .await
            .map_err(|e| AppError::database("update_rating", e))?;

        tracing::debug!(
            restaurant_id = %restaurant_id,
            rating = next.rating,
            comment_count = next.comment_count,
            "Rating aggregate updated"
        );
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_provided_fields_are_set() {
        let set = RestaurantChanges {
            name: Some("La Tasca".into()),
            open_time: Some("09:00".into()),
            ..Default::default()
        }
        .into_set();

        assert_eq!(set, doc! { "name": "La Tasca", "open_time": "09:00" });
    }
}
