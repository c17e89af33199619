use std::hash::{Hash, Hasher};

use time::OffsetDateTime;

use super::{non_empty, validate_id, Entity, Id};
use crate::errors::ModelError;

pub const MIN_RATING: i64 = 1;
pub const MAX_RATING: i64 = 5;

/// A user's review of a podcast episode.
#[derive(Clone, Debug)]
pub struct Review {
    /// The ID of the review.
    id: Id,

    /// The ID of the user who wrote it.
    user: Id,

    /// Between `MIN_RATING` and `MAX_RATING` inclusive.
    rating: i64,

    content: String,

    /// The ID of the podcast reviewed, if any.
    podcast: Option<Id>,

    /// The ID of the episode reviewed, if any.
    episode: Option<Id>,

    /// When the review was posted.
    timestamp: OffsetDateTime,
}

impl Review {
    pub fn new(
        id: Id,
        user: Id,
        rating: i64,
        content: impl AsRef<str>,
        podcast: Option<Id>,
        episode: Option<Id>,
        timestamp: OffsetDateTime,
    ) -> Result<Self, ModelError> {
        let id = validate_id(id)?;
        let user = validate_id(user)?;
        let content = non_empty(content, "Review content")?;

        if podcast.is_none() && episode.is_none() {
            return Err(ModelError::MissingReviewTarget);
        }

        Ok(Review {
            id,
            user,
            rating: check_rating(rating)?,
            content,
            podcast: podcast.map(validate_id).transpose()?,
            episode: episode.map(validate_id).transpose()?,
            timestamp,
        })
    }

    pub fn id(&self) -> Id {
        self.id
    }

    /// Moves the review to an ID chosen by the repository that stores it.
    pub(crate) fn with_id(self, id: Id) -> Self {
        Review { id, ..self }
    }

    pub fn user(&self) -> Id {
        self.user
    }

    pub fn rating(&self) -> i64 {
        self.rating
    }

    pub fn set_rating(&mut self, rating: i64) -> Result<(), ModelError> {
        self.rating = check_rating(rating)?;
        Ok(())
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn set_content(&mut self, content: impl AsRef<str>) -> Result<(), ModelError> {
        self.content = non_empty(content, "New content")?;
        Ok(())
    }

    pub fn podcast(&self) -> Option<Id> {
        self.podcast
    }

    pub fn set_podcast(&mut self, podcast: Id) -> Result<(), ModelError> {
        self.podcast = Some(validate_id(podcast)?);
        Ok(())
    }

    pub fn episode(&self) -> Option<Id> {
        self.episode
    }

    pub fn set_episode(&mut self, episode: Id) -> Result<(), ModelError> {
        self.episode = Some(validate_id(episode)?);
        Ok(())
    }

    pub fn timestamp(&self) -> OffsetDateTime {
        self.timestamp
    }
}

fn check_rating(rating: i64) -> Result<i64, ModelError> {
    if (MIN_RATING..=MAX_RATING).contains(&rating) {
        Ok(rating)
    } else {
        Err(ModelError::RatingOutOfRange(rating))
    }
}

impl PartialEq for Review {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Review {}

impl Hash for Review {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Entity for Review {
    fn id(&self) -> Id {
        self.id
    }
}
