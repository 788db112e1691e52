//! Comentarios y valoraciones
//!
//! Cada escritura de un comentario y el ajuste de la media de su restaurante
//! se confirman juntos en una transacción.

use chrono::{DateTime, Utc};
use futures::FutureExt;
use mongodb::bson::{doc, oid::ObjectId, Document};

use super::models::Comment;
use super::mongodb::{collect_all, MongoRepo, Result};
use crate::api::AppError;
use crate::auth::Identity;

pub const MIN_RATING: f64 = 0.0;
pub const MAX_RATING: f64 = 5.0;

#[derive(Debug, Clone)]
pub struct NewComment {
    pub date_time: Option<DateTime<Utc>>,
    pub text: String,
    pub rating: f64,
    pub restaurant_id: ObjectId,
}

#[derive(Debug, Clone, Default)]
pub struct CommentChanges {
    pub text: Option<String>,
    pub rating: Option<f64>,
}

pub fn validate_rating(rating: f64) -> Result<()> {
    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(AppError::validation_field(
            "rating",
            &format!("La valoración debe estar entre {} y {}", MIN_RATING, MAX_RATING),
        ));
    }
    Ok(())
}

impl MongoRepo {
    /// Publica un comentario y lo suma a la media del restaurante
    pub async fn create_comment(&self, author: &ObjectId, new: NewComment) -> Result<Comment> {
        validate_rating(new.rating)?;

        let now = MongoRepo::current_timestamp();
        let mut comment = Comment {
            id: None,
            date_time: new.date_time.unwrap_or_else(Utc::now),
            text: new.text,
            rating: new.rating,
            user_id: *author,
            restaurant_id: new.restaurant_id,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        let inserted = self
            .with_transaction("create_comment", &comment, |repo, session, comment| {
                async move {
                    repo.active_user_in(session, &comment.user_id).await?;
                    repo.restaurant_in(session, &comment.restaurant_id).await?;

                    let rating = comment.rating;
                    repo.apply_rating(session, &comment.restaurant_id, |current| current.add(rating))
                        .await?;

                    let result = repo
                        .comments()
                        .insert_one(comment)
                        .session(&mut *session)
                        .await
                        .map_err(|e| AppError::database("create_comment", e))?;

                    Ok(result.inserted_id.as_object_id())
                }
                .boxed()
            })
            .await?;

        comment.id = inserted;
        tracing::info!(
            comment_id = ?comment.id,
            user_id = %author,
            restaurant_id = %comment.restaurant_id,
            "Comment created"
        );
        Ok(comment)
    }

    pub async fn get_comment(&self, id: &ObjectId) -> Result<Comment> {
        self.comments()
            .find_one(doc! { "_id": id, "deleted_at": null })
            .await
            .map_err(|e| AppError::database("get_comment", e))?
            .ok_or_else(|| AppError::not_found_id("Comentario", &id.to_hex()))
    }

    pub async fn list_comments(&self) -> Result<Vec<Comment>> {
        self.find_comments(doc! { "deleted_at": null }, "list_comments").await
    }

    pub async fn list_comments_of_restaurant(&self, restaurant_id: &ObjectId) -> Result<Vec<Comment>> {
        self.get_restaurant(restaurant_id).await?;
        self.find_comments(
            doc! { "deleted_at": null, "restaurant_id": restaurant_id },
            "list_comments_of_restaurant",
        )
        .await
    }

    async fn find_comments(&self, filter: Document, operation: &str) -> Result<Vec<Comment>> {
        let cursor = self
            .comments()
            .find(filter)
            .sort(doc! { "created_at": -1 })
            .await
            .map_err(|e| AppError::database(operation, e))?;

        collect_all(cursor, operation).await
    }

    /// Edita un comentario propio; si cambia la valoración se ajusta la media
    pub async fn update_comment(
        &self,
        id: &ObjectId,
        caller: &Identity,
        changes: CommentChanges,
    ) -> Result<Comment> {
        if let Some(rating) = changes.rating {
            validate_rating(rating)?;
        }
        let context = (*id, *caller, changes);

        self.with_transaction("update_comment", &context, |repo, session, (id, caller, changes)| {
            async move {
                repo.active_user_in(session, &caller.user_id).await?;

                let comment = repo
                    .comments()
                    .find_one(doc! { "_id": id, "deleted_at": null })
                    .session(&mut *session)
                    .await
                    .map_err(|e| AppError::database("update_comment", e))?
                    .ok_or_else(|| AppError::not_found_id("Comentario", &id.to_hex()))?;

                if comment.user_id != caller.user_id {
                    return Err(AppError::Forbidden(
                        "Solo el autor puede editar el comentario".to_string(),
                    ));
                }

                let mut set = doc! { "updated_at": MongoRepo::current_timestamp() };
                if let Some(text) = &changes.text {
                    set.insert("text", text.as_str());
                }
                if let Some(rating) = changes.rating {
                    set.insert("rating", rating);
                    if rating != comment.rating {
                        let old = comment.rating;
                        repo.apply_rating(session, &comment.restaurant_id, |current| {
                            current.replace(old, rating)
                        })
                        .await?;
                    }
                }

                repo.comments()
                    .update_one(doc! { "_id": id }, doc! { "$set": set })
                    .session(&mut *session)
                    .await
                    .map_err(|e| AppError::database("update_comment", e))?;

                Ok(())
            }
            .boxed()
        })
        .await?;

        self.get_comment(id).await
    }

    /// Borrado lógico por el autor o un administrador; descuenta la valoración
    pub async fn delete_comment(&self, id: &ObjectId, caller: &Identity) -> Result<()> {
        let context = (*id, *caller);

        self.with_transaction("delete_comment", &context, |repo, session, (id, caller)| {
            async move {
                repo.active_user_in(session, &caller.user_id).await?;

                let comment = repo
                    .comments()
                    .find_one(doc! { "_id": id, "deleted_at": null })
                    .session(&mut *session)
                    .await
                    .map_err(|e| AppError::database("delete_comment", e))?
                    .ok_or_else(|| AppError::not_found_id("Comentario", &id.to_hex()))?;

                if !caller.can_act_on(&comment.user_id) {
                    return Err(AppError::Forbidden(
                        "Solo el autor puede borrar el comentario".to_string(),
                    ));
                }

                let now = MongoRepo::current_timestamp();
                repo.comments()
                    .update_one(
                        doc! { "_id": id, "deleted_at": null },
                        doc! { "$set": { "deleted_at": now, "updated_at": now } },
                    )
                    .session(&mut *session)
                    .await
                    .map_err(|e| AppError::database("delete_comment", e))?;

                let rating = comment.rating;
                repo.apply_rating(session, &comment.restaurant_id, |current| current.remove(rating))
                    .await?;

                Ok(())
            }
            .boxed()
        })
        .await?;

        tracing::info!(comment_id = %id, caller = %caller.user_id, "Comment deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratings_outside_range_are_rejected() {
        assert!(validate_rating(0.0).is_ok());
        assert!(validate_rating(4.0).is_ok());
        assert!(validate_rating(5.0).is_ok());
        assert!(validate_rating(-0.5).is_err());
        assert!(validate_rating(5.1).is_err());
        assert!(validate_rating(f64::NAN).is_err());
    }
}
