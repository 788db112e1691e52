//! Media de valoraciones de un restaurante
//!
//! `rating` es siempre la media aritmética de los comentarios vivos y
//! `comment_count` su número. Con cero comentarios ambos valen 0.

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RatingAggregate {
    pub rating: f64,
    pub comment_count: i64,
}

impl RatingAggregate {
    pub fn new(rating: f64, comment_count: i64) -> Self {
        Self {
            rating,
            comment_count,
        }
    }

    /// Incorpora un comentario nuevo
    pub fn add(self, rating: f64) -> Self {
        if self.comment_count <= 0 {
            return Self::new(rating, 1);
        }
        let count = self.comment_count + 1;
        let total = self.rating * self.comment_count as f64 + rating;
        Self::new(total / count as f64, count)
    }

    /// Retira un comentario borrado
    pub fn remove(self, rating: f64) -> Self {
        if self.comment_count <= 1 {
            return Self::default();
        }
        let count = self.comment_count - 1;
        let total = self.rating * self.comment_count as f64 - rating;
        Self::new(total / count as f64, count)
    }

    /// Sustituye la valoración de un comentario existente
    pub fn replace(self, old_rating: f64, new_rating: f64) -> Self {
        if self.comment_count <= 0 {
            return self;
        }
        let delta = (new_rating - old_rating) / self.comment_count as f64;
        Self::new(self.rating + delta, self.comment_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mean(values: &[f64]) -> f64 {
        values.iter().sum::<f64>() / values.len() as f64
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn first_comment_sets_rating() {
        let aggregate = RatingAggregate::default().add(4.0);
        assert_eq!(aggregate, RatingAggregate::new(4.0, 1));
    }

    #[test]
    fn removing_last_comment_resets_to_zero() {
        let aggregate = RatingAggregate::default().add(4.0).remove(4.0);

        assert_eq!(aggregate, RatingAggregate::default());
        assert!(!aggregate.rating.is_nan());
    }

    #[test]
    fn remove_on_empty_aggregate_stays_zero() {
        assert_eq!(RatingAggregate::default().remove(3.0), RatingAggregate::default());
    }

    #[test]
    fn rating_tracks_mean_through_adds_and_removes() {
        let mut live = vec![];
        let mut aggregate = RatingAggregate::default();

        for rating in [5.0, 3.0, 4.0, 1.0, 2.5] {
            aggregate = aggregate.add(rating);
            live.push(rating);
            assert!(close(aggregate.rating, mean(&live)));
            assert_eq!(aggregate.comment_count, live.len() as i64);
        }

        for rating in [3.0, 5.0, 2.5] {
            aggregate = aggregate.remove(rating);
            let pos = live.iter().position(|r| *r == rating).unwrap();
            live.remove(pos);
            assert!(close(aggregate.rating, mean(&live)));
            assert_eq!(aggregate.comment_count, live.len() as i64);
        }
    }

    #[test]
    fn replace_shifts_mean_without_changing_count() {
        let aggregate = RatingAggregate::default().add(2.0).add(4.0).replace(2.0, 5.0);

        assert!(close(aggregate.rating, 4.5));
        assert_eq!(aggregate.comment_count, 2);
    }
}
