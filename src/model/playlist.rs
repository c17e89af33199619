use std::hash::{Hash, Hasher};

use rand::seq::SliceRandom;

use super::{non_empty, validate_id, Entity, Episode, Id};
use crate::errors::ModelError;

pub const DEFAULT_TITLE: &str = "Untitled";

/// An ordered list of episodes owned by a user.
#[derive(Clone, Debug)]
pub struct Playlist {
    /// The ID of the playlist.
    id: Id,

    /// The ID of the owning user.
    owner: Id,

    title: String,

    /// The episodes in play order. No episode appears twice.
    episodes: Vec<Episode>,
}

impl Playlist {
    pub fn new(id: Id, owner: Id, title: impl AsRef<str>) -> Result<Self, ModelError> {
        Ok(Playlist {
            id: validate_id(id)?,
            owner: validate_id(owner)?,
            title: non_empty(title, "Playlist title")?,
            episodes: vec![],
        })
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn owner(&self) -> Id {
        self.owner
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl AsRef<str>) -> Result<(), ModelError> {
        self.title = non_empty(title, "New title")?;
        Ok(())
    }

    pub fn episodes(&self) -> &[Episode] {
        &self.episodes
    }

    pub fn contains(&self, episode_id: Id) -> bool {
        self.episodes.iter().any(|e| e.id() == episode_id)
    }

    /// Appends the episode unless it is already present. Returns whether
    /// it was added.
    pub fn add_episode(&mut self, episode: Episode) -> bool {
        if self.contains(episode.id()) {
            false
        } else {
            self.episodes.push(episode);
            true
        }
    }

    /// Removes the episode. Returns whether it was present.
    pub fn remove_episode(&mut self, episode_id: Id) -> bool {
        let before = self.episodes.len();
        self.episodes.retain(|e| e.id() != episode_id);

        self.episodes.len() != before
    }

    /// Swaps the episodes at the two positions.
    pub fn swap_episodes(&mut self, first: usize, second: usize) -> Result<(), ModelError> {
        let len = self.episodes.len();

        for index in [first, second] {
            if index >= len {
                return Err(ModelError::IndexOutOfRange { index, len });
            }
        }

        self.episodes.swap(first, second);

        Ok(())
    }

    /// Returns the episodes in random order, leaving the playlist as is.
    pub fn shuffled(&self) -> Vec<Episode> {
        let mut episodes = self.episodes.clone();
        episodes.shuffle(&mut rand::thread_rng());

        episodes
    }

    /// The sum of the episode lengths, in seconds.
    pub fn total_runtime(&self) -> i64 {
        self.episodes.iter().map(Episode::length).sum()
    }

    pub fn len(&self) -> usize {
        self.episodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.episodes.is_empty()
    }
}

impl PartialEq for Playlist {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.owner == other.owner
    }
}

impl Eq for Playlist {}

impl Hash for Playlist {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.owner.hash(state);
    }
}

impl Entity for Playlist {
    fn id(&self) -> Id {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::episode;

    fn playlist_of(lengths: &[i64]) -> Playlist {
        let mut playlist = Playlist::new(1, 1, "My Personal Playlist").unwrap();

        for (i, length) in lengths.iter().enumerate() {
            playlist.add_episode(episode(i as Id, 1, *length));
        }

        playlist
    }

    fn ids(episodes: &[Episode]) -> Vec<Id> {
        episodes.iter().map(Episode::id).collect()
    }

    #[test]
    fn swap_exchanges_only_the_two_positions() {
        let mut playlist = playlist_of(&[100, 200, 300]);

        playlist.swap_episodes(0, 2).unwrap();

        assert_eq!(ids(playlist.episodes()), vec![2, 1, 0]);
        assert_eq!(playlist.total_runtime(), 600);
    }

    #[test]
    fn swap_rejects_out_of_range_positions() {
        let mut playlist = playlist_of(&[100, 200]);

        assert_eq!(
            playlist.swap_episodes(0, 2).unwrap_err(),
            ModelError::IndexOutOfRange { index: 2, len: 2 }
        );
        assert_eq!(ids(playlist.episodes()), vec![0, 1]);
    }

    #[test]
    fn episodes_are_not_duplicated() {
        let mut playlist = playlist_of(&[100]);

        assert!(!playlist.add_episode(episode(0, 1, 100)));
        assert_eq!(playlist.len(), 1);

        assert!(playlist.remove_episode(0));
        assert!(!playlist.remove_episode(0));
        assert!(playlist.is_empty());
        assert_eq!(playlist.total_runtime(), 0);
    }

    #[test]
    fn shuffle_does_not_touch_the_playlist() {
        let playlist = playlist_of(&[1, 2, 3, 4, 5, 6, 7, 8]);

        let mut shuffled = ids(&playlist.shuffled());

        assert_eq!(ids(playlist.episodes()), vec![0, 1, 2, 3, 4, 5, 6, 7]);
        shuffled.sort_unstable();
        assert_eq!(shuffled, vec![0, 1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn construction_validates() {
        assert!(Playlist::new(-1, 1, "x").is_err());
        assert!(Playlist::new(1, 1, " ").is_err());
        assert_eq!(Playlist::new(1, 1, DEFAULT_TITLE).unwrap().title(), DEFAULT_TITLE);
    }

    #[test]
    fn equality_uses_id_and_owner() {
        let a = Playlist::new(1, 1, "a").unwrap();
        let b = Playlist::new(1, 1, "b").unwrap();
        let c = Playlist::new(1, 2, "a").unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
