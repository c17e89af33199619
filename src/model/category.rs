use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use super::{non_empty, push_unique, validate_id, Entity, Id, SortOrder};
use crate::errors::ModelError;

/// A category podcasts can be tagged with.
#[derive(Clone, Debug)]
pub struct Category {
    id: Id,
    name: String,

    /// The IDs of the podcasts tagged with this category.
    tagged_podcasts: Vec<Id>,
}

impl Category {
    pub fn new(id: Id, name: impl AsRef<str>) -> Result<Self, ModelError> {
        Ok(Category {
            id: validate_id(id)?,
            name: non_empty(name, "Category name")?,
            tagged_podcasts: vec![],
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

    pub fn tagged_podcasts(&self) -> &[Id] {
        &self.tagged_podcasts
    }

    pub fn number_of_tagged_podcasts(&self) -> usize {
        self.tagged_podcasts.len()
    }

    pub fn is_applied_to(&self, podcast_id: Id) -> bool {
        self.tagged_podcasts.contains(&podcast_id)
    }

    /// Records the podcast on this side only. Use
    /// `make_category_association` to link both sides.
    pub fn add_podcast(&mut self, podcast_id: Id) {
        push_unique(&mut self.tagged_podcasts, podcast_id);
    }
}

impl PartialEq for Category {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Category {}

impl Hash for Category {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Entity for Category {
    fn id(&self) -> Id {
        self.id
    }
}

impl SortOrder for Category {
    fn sort_cmp(&self, other: &Self) -> Ordering {
        self.name.cmp(&other.name)
    }
}
