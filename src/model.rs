//! The domain model: entities with validated construction and the helpers
//! that keep both sides of a relationship in step.
//!
//! Relationships are held as IDs. The repository is the arena that resolves
//! them, so no entity owns another through a cycle.

use std::cmp::Ordering;

use crate::errors::ModelError;

pub mod author;
pub mod category;
pub mod episode;
pub mod playlist;
pub mod podcast;
pub mod review;
pub mod subscription;
pub mod user;

pub use author::Author;
pub use category::Category;
pub use episode::Episode;
pub use playlist::Playlist;
pub use podcast::Podcast;
pub use review::Review;
pub use subscription::PodcastSubscription;
pub use user::User;

/// An ID assigned by the caller. Always non-negative.
pub type Id = i64;

/// Something stored under an ID.
pub trait Entity {
    fn id(&self) -> Id;
}

/// The order in which a repository keeps entities of one type.
///
/// This is separate from `Ord` because most entities compare equal by ID
/// but sort by a display field.
pub trait SortOrder: Entity {
    fn sort_cmp(&self, other: &Self) -> Ordering;
}

/// Links a category and a podcast on both sides.
///
/// Fails if the category has already been applied to the podcast.
pub fn make_category_association(
    podcast: &mut Podcast,
    category: &mut Category,
) -> Result<(), ModelError> {
    if category.is_applied_to(podcast.id()) {
        return Err(ModelError::DuplicateAssociation {
            category: category.name().to_owned(),
            podcast: podcast.title().to_owned(),
        });
    }

    podcast.add_category(category.id());
    category.add_podcast(podcast.id());

    Ok(())
}

/// Builds a review of an episode and links it to its author and episode.
pub fn make_review(
    review_id: Id,
    content: &str,
    user: &mut User,
    podcast: &Podcast,
    episode: &mut Episode,
    rating: i64,
    timestamp: time::OffsetDateTime,
) -> Result<Review, ModelError> {
    let review = Review::new(
        review_id,
        user.id(),
        rating,
        content,
        Some(podcast.id()),
        Some(episode.id()),
        timestamp,
    )?;

    user.add_review(review.id());
    episode.add_review(review.id());

    Ok(review)
}

pub(crate) fn validate_id(id: Id) -> Result<Id, ModelError> {
    if id < 0 {
        Err(ModelError::InvalidId(id))
    } else {
        Ok(id)
    }
}

/// Returns the trimmed value, or an error if nothing is left.
pub(crate) fn non_empty(value: impl AsRef<str>, field: &'static str) -> Result<String, ModelError> {
    let trimmed = value.as_ref().trim();

    if trimmed.is_empty() {
        Err(ModelError::EmptyField { field })
    } else {
        Ok(trimmed.to_owned())
    }
}

pub(crate) fn non_negative(value: i64, field: &'static str) -> Result<i64, ModelError> {
    if value < 0 {
        Err(ModelError::NegativeValue { field, value })
    } else {
        Ok(value)
    }
}

pub(crate) fn push_unique(ids: &mut Vec<Id>, id: Id) {
    if !ids.contains(&id) {
        ids.push(id);
    }
}

pub(crate) fn remove_id(ids: &mut Vec<Id>, id: Id) {
    ids.retain(|existing| *existing != id);
}

#[cfg(test)]
pub(crate) mod fixtures {
    use time::macros::datetime;

    use super::*;

    pub fn author(id: Id, name: &str) -> Author {
        Author::new(id, name).unwrap()
    }

    pub fn podcast(id: Id, title: &str) -> Podcast {
        Podcast::new(id, Some(author(1, "Joe Toste")), title).unwrap()
    }

    pub fn episode(id: Id, podcast_id: Id, length: i64) -> Episode {
        Episode::new(
            id,
            podcast_id,
            &format!("Episode {}", id),
            "https://example.com/audio.mp3",
            length,
            "An episode",
            datetime!(2017-12-01 01:37:46 UTC),
        )
        .unwrap()
    }

    pub fn user(id: Id, username: &str) -> User {
        User::new(id, username, "hashed-password").unwrap()
    }
}
