use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use super::{non_empty, push_unique, remove_id, validate_id, Author, Entity, Id, SortOrder};
use crate::errors::ModelError;

pub const DEFAULT_TITLE: &str = "Untitled";
pub const DEFAULT_LANGUAGE: &str = "Unspecified";

/// A podcast and the IDs of what belongs to it.
#[derive(Clone, Debug)]
pub struct Podcast {
    /// The ID of the podcast.
    id: Id,

    /// The author, if the source data named one.
    author: Option<Author>,

    /// The trimmed, non-empty title.
    title: String,

    /// The URL of the cover image.
    image: Option<String>,

    description: String,

    language: String,

    website: String,

    itunes_id: Option<i64>,

    /// The IDs of the categories applied to this podcast.
    categories: Vec<Id>,

    /// The IDs of the episodes of this podcast.
    episodes: Vec<Id>,
}

impl Podcast {
    pub fn new(id: Id, author: Option<Author>, title: impl AsRef<str>) -> Result<Self, ModelError> {
        Ok(Podcast {
            id: validate_id(id)?,
            author,
            title: non_empty(title, "Podcast title")?,
            image: None,
            description: String::new(),
            language: DEFAULT_LANGUAGE.to_owned(),
            website: String::new(),
            itunes_id: None,
            categories: vec![],
            episodes: vec![],
        })
    }

    pub fn with_image(mut self, image: Option<String>) -> Self {
        self.image = image;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_website(mut self, website: impl Into<String>) -> Self {
        self.website = website.into();
        self
    }

    pub fn with_itunes_id(mut self, itunes_id: Option<i64>) -> Self {
        self.itunes_id = itunes_id;
        self
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn author(&self) -> Option<&Author> {
        self.author.as_ref()
    }

    pub(crate) fn author_mut(&mut self) -> Option<&mut Author> {
        self.author.as_mut()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl AsRef<str>) -> Result<(), ModelError> {
        self.title = non_empty(title, "Podcast title")?;
        Ok(())
    }

    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }

    pub fn set_image(&mut self, image: Option<String>) {
        self.image = image;
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn set_language(&mut self, language: impl Into<String>) {
        self.language = language.into();
    }

    pub fn website(&self) -> &str {
        &self.website
    }

    pub fn set_website(&mut self, website: impl AsRef<str>) -> Result<(), ModelError> {
        self.website = non_empty(website, "Podcast website")?;
        Ok(())
    }

    pub fn itunes_id(&self) -> Option<i64> {
        self.itunes_id
    }

    pub fn categories(&self) -> &[Id] {
        &self.categories
    }

    pub fn add_category(&mut self, category_id: Id) {
        push_unique(&mut self.categories, category_id);
    }

    pub fn remove_category(&mut self, category_id: Id) {
        remove_id(&mut self.categories, category_id);
    }

    pub fn episodes(&self) -> &[Id] {
        &self.episodes
    }

    pub fn add_episode(&mut self, episode_id: Id) {
        push_unique(&mut self.episodes, episode_id);
    }

    pub fn remove_episode(&mut self, episode_id: Id) {
        remove_id(&mut self.episodes, episode_id);
    }
}

impl PartialEq for Podcast {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Podcast {}

impl Hash for Podcast {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Entity for Podcast {
    fn id(&self) -> Id {
        self.id
    }
}

impl SortOrder for Podcast {
    fn sort_cmp(&self, other: &Self) -> Ordering {
        self.title.cmp(&other.title)
    }
}
