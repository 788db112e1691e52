// src/db/mod.rs
pub mod aggregate;
pub mod comments;
pub mod models;
pub mod mongodb;
pub mod reservations;
pub mod restaurants;
pub mod users;

pub use self::aggregate::RatingAggregate;
pub use self::comments::{CommentChanges, NewComment};
pub use self::models::{Comment, Reservation, Restaurant, Role, User};
pub use self::mongodb::MongoRepo;
pub use self::reservations::{NewReservation, ReservationChanges, RESERVATION_QUOTA};
pub use self::restaurants::{NewRestaurant, RestaurantChanges};
pub use self::users::{NewUser, UserChanges};
