use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use super::{non_empty, push_unique, remove_id, validate_id, Entity, Id, SortOrder};
use crate::errors::ModelError;

/// The author of one or more podcasts.
#[derive(Clone, Debug)]
pub struct Author {
    /// The ID of the author.
    id: Id,

    /// The trimmed, non-empty name.
    name: String,

    /// The IDs of the podcasts written by this author.
    podcasts: Vec<Id>,
}

impl Author {
    pub fn new(id: Id, name: impl AsRef<str>) -> Result<Self, ModelError> {
        Ok(Author {
            id: validate_id(id)?,
            name: non_empty(name, "Author name")?,
            podcasts: vec![],
        })
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl AsRef<str>) -> Result<(), ModelError> {
        self.name = non_empty(name, "New name")?;
        Ok(())
    }

    pub fn podcasts(&self) -> &[Id] {
        &self.podcasts
    }

    pub fn add_podcast(&mut self, podcast_id: Id) {
        push_unique(&mut self.podcasts, podcast_id);
    }

    pub fn remove_podcast(&mut self, podcast_id: Id) {
        remove_id(&mut self.podcasts, podcast_id);
    }
}

impl PartialEq for Author {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Author {}

impl Hash for Author {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Entity for Author {
    fn id(&self) -> Id {
        self.id
    }
}

impl SortOrder for Author {
    fn sort_cmp(&self, other: &Self) -> Ordering {
        self.name.cmp(&other.name)
    }
}
