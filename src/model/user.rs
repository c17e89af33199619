use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use super::{non_empty, push_unique, remove_id, validate_id, Entity, Id, SortOrder};
use crate::errors::ModelError;
use crate::normalization::normalize_username;

/// A registered user.
#[derive(Clone, Debug)]
pub struct User {
    /// The ID of the user.
    id: Id,

    /// The normalized (trimmed, lower-case) username. Unique.
    username: String,

    /// The password hash. Never the plain text.
    password: String,

    /// The IDs of the user's podcast subscriptions.
    subscriptions: Vec<Id>,

    /// The IDs of the reviews written by the user.
    reviews: Vec<Id>,

    /// The IDs of the user's playlists.
    playlists: Vec<Id>,
}

impl User {
    pub fn new(id: Id, username: impl AsRef<str>, password: impl AsRef<str>) -> Result<Self, ModelError> {
        let id = validate_id(id)?;
        let username = non_empty(normalize_username(username), "Username")?;
        let password = non_empty(password, "Password")?;

        Ok(User {
            id,
            username,
            password,
            subscriptions: vec![],
            reviews: vec![],
            playlists: vec![],
        })
    }

    pub fn id(&self) -> Id {
        self.id
    }

    /// Moves the user to an ID chosen by the repository that stores it.
    pub(crate) fn with_id(self, id: Id) -> Self {
        User { id, ..self }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn subscriptions(&self) -> &[Id] {
        &self.subscriptions
    }

    pub fn add_subscription(&mut self, subscription_id: Id) {
        push_unique(&mut self.subscriptions, subscription_id);
    }

    pub fn remove_subscription(&mut self, subscription_id: Id) {
        remove_id(&mut self.subscriptions, subscription_id);
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

    pub fn playlists(&self) -> &[Id] {
        &self.playlists
    }

    pub fn add_playlist(&mut self, playlist_id: Id) {
        push_unique(&mut self.playlists, playlist_id);
    }

    pub fn remove_playlist(&mut self, playlist_id: Id) {
        remove_id(&mut self.playlists, playlist_id);
    }
}

impl PartialEq for User {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for User {}

impl Hash for User {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Entity for User {
    fn id(&self) -> Id {
        self.id
    }
}

impl SortOrder for User {
    fn sort_cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}
