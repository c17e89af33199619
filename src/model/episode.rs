use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use time::OffsetDateTime;

use super::{non_empty, non_negative, push_unique, remove_id, validate_id, Entity, Id, SortOrder};
use crate::errors::ModelError;

pub const DEFAULT_TITLE: &str = "Untitled";
pub const DEFAULT_AUDIO: &str = "No link";
pub const DEFAULT_DESCRIPTION: &str = "No description";

/// A single episode of a podcast.
#[derive(Clone, Debug)]
pub struct Episode {
    /// The ID of the episode.
    id: Id,

    /// The ID of the podcast this episode belongs to.
    podcast: Id,

    /// The trimmed, non-empty title.
    title: String,

    /// The audio link. May be empty: some source rows have none.
    audio: String,

    /// The length in seconds.
    length: i64,

    /// May be empty for the same reason as `audio`.
    description: String,

    upload_date: OffsetDateTime,

    /// The IDs of the reviews of this episode.
    reviews: Vec<Id>,
}

impl Episode {
    pub fn new(
        id: Id,
        podcast: Id,
        title: impl AsRef<str>,
        audio: impl AsRef<str>,
        length: i64,
        description: impl AsRef<str>,
        upload_date: OffsetDateTime,
    ) -> Result<Self, ModelError> {
        Ok(Episode {
            id: validate_id(id)?,
            podcast: validate_id(podcast)?,
            title: non_empty(title, "Episode title")?,
            audio: audio.as_ref().trim().to_owned(),
            length: non_negative(length, "Episode length")?,
            description: description.as_ref().trim().to_owned(),
            upload_date,
            reviews: vec![],
        })
    }

    /// Creates an episode with the default title, audio link, description
    /// and upload date.
    pub fn untitled(id: Id, podcast: Id) -> Result<Self, ModelError> {
        Episode::new(
            id,
            podcast,
            DEFAULT_TITLE,
            DEFAULT_AUDIO,
            0,
            DEFAULT_DESCRIPTION,
            OffsetDateTime::UNIX_EPOCH,
        )
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn podcast(&self) -> Id {
        self.podcast
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl AsRef<str>) -> Result<(), ModelError> {
        self.title = non_empty(title, "New episode title")?;
        Ok(())
    }

    pub fn audio(&self) -> &str {
        &self.audio
    }

    pub fn set_audio(&mut self, audio: impl AsRef<str>) -> Result<(), ModelError> {
        self.audio = non_empty(audio, "New episode audio link")?;
        Ok(())
    }

    pub fn length(&self) -> i64 {
        self.length
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: impl AsRef<str>) -> Result<(), ModelError> {
        self.description = non_empty(description, "New episode description")?;
        Ok(())
    }

    pub fn upload_date(&self) -> OffsetDateTime {
        self.upload_date
    }

    pub fn reviews(&self) -> &[Id] {
        &self.reviews
    }

    pub fn add_review(&mut self, review_id: Id) {
        push_unique(&mut self.reviews, review_id);
    }

    pub fn remove_review(&mut self, review_id: Id) {
        remove_id(&mut self.reviews, review_id);
    }
}

impl PartialEq for Episode {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Episode {}

impl Hash for Episode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Entity for Episode {
    fn id(&self) -> Id {
        self.id
    }
}

/// Episodes sort by ID alone, even across podcasts.
impl SortOrder for Episode {
    fn sort_cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}
