//! The storage contract the service layer is written against, with an
//! in-process backend and an SQLite backend.
//!
//! Lookups of absent keys give `Ok(None)`. Every `add_*` links both sides of
//! the relationships it stores, after checking that the entities it refers
//! to are already stored.

use futures::future::BoxFuture;

use crate::errors::RepositoryError;
use crate::model::{Author, Category, Episode, Id, Playlist, Podcast, PodcastSubscription, Review, User};

pub mod memory;
pub mod sqlite;

pub use memory::MemoryRepository;
pub use sqlite::SqliteRepository;

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// The repository as the rest of the crate holds it.
pub type Repo = dyn Repository + Send + Sync;

pub trait Repository {
    fn add_author(&self, author: Author) -> BoxFuture<RepositoryResult<()>>;

    fn get_author(&self, name: &str) -> BoxFuture<RepositoryResult<Option<Author>>>;

    /// Stores a podcast and records it on its author. Adding an ID that is
    /// already stored is a no-op in memory and an update in SQL.
    fn add_podcast(&self, podcast: Podcast) -> BoxFuture<RepositoryResult<()>>;

    fn get_podcast(&self, id: Id) -> BoxFuture<RepositoryResult<Option<Podcast>>>;

    fn get_number_of_podcasts(&self) -> BoxFuture<RepositoryResult<usize>>;

    /// Unknown IDs are skipped.
    fn get_podcasts_by_id(&self, ids: &[Id]) -> BoxFuture<RepositoryResult<Vec<Podcast>>>;

    /// All podcasts, ordered by title.
    fn get_list_of_podcasts(&self) -> BoxFuture<RepositoryResult<Vec<Podcast>>>;

    fn get_podcast_ids_by_category(&self, category_name: &str) -> BoxFuture<RepositoryResult<Vec<Id>>>;

    fn get_podcast_ids_by_language(&self, language: &str) -> BoxFuture<RepositoryResult<Vec<Id>>>;

    /// Stores a category and applies it to the stored podcasts it tags.
    fn add_category(&self, category: Category) -> BoxFuture<RepositoryResult<()>>;

    fn get_categories(&self) -> BoxFuture<RepositoryResult<Vec<Category>>>;

    fn add_user(&self, user: User) -> BoxFuture<RepositoryResult<()>>;

    /// Looks a user up by username, ignoring case.
    fn get_user(&self, username: &str) -> BoxFuture<RepositoryResult<Option<User>>>;

    fn get_user_by_id(&self, id: Id) -> BoxFuture<RepositoryResult<Option<User>>>;

    fn get_number_of_users(&self) -> BoxFuture<RepositoryResult<usize>>;

    /// Registers a user under the next free user ID, with a personal playlist
    /// titled `playlist_title` under the next free playlist ID. The ID the
    /// user was built with is replaced. Gives `None`, storing nothing, if the
    /// username is taken.
    ///
    /// Choosing the IDs and storing the rows happen as one step, so
    /// concurrent registrations never share an ID.
    fn add_new_user(&self, user: User, playlist_title: &str) -> BoxFuture<RepositoryResult<Option<User>>>;

    /// Fails with `RepositoryError::Constraint` unless the owner and podcast
    /// are stored.
    fn add_podcast_subscription(
        &self,
        subscription: PodcastSubscription,
    ) -> BoxFuture<RepositoryResult<()>>;

    fn get_podcast_subscription(
        &self,
        id: Id,
    ) -> BoxFuture<RepositoryResult<Option<PodcastSubscription>>>;

    /// Episodes whose podcast is not stored are dropped without an error.
    fn add_episode(&self, episode: Episode) -> BoxFuture<RepositoryResult<()>>;

    fn get_episode(&self, id: Id) -> BoxFuture<RepositoryResult<Option<Episode>>>;

    fn get_number_of_episodes(&self) -> BoxFuture<RepositoryResult<usize>>;

    /// The episode with the lowest ID.
    fn get_first_episode(&self) -> BoxFuture<RepositoryResult<Option<Episode>>>;

    /// The episode with the highest ID.
    fn get_last_episode(&self) -> BoxFuture<RepositoryResult<Option<Episode>>>;

    fn get_episodes_by_id(&self, ids: &[Id]) -> BoxFuture<RepositoryResult<Vec<Episode>>>;

    /// The nearest stored episode ID greater than this episode's, if the
    /// episode is stored.
    fn get_next_episode_id(&self, episode: &Episode) -> BoxFuture<RepositoryResult<Option<Id>>>;

    /// The nearest stored episode ID less than this episode's, if the
    /// episode is stored.
    fn get_previous_episode_id(&self, episode: &Episode) -> BoxFuture<RepositoryResult<Option<Id>>>;

    /// Fails with `RepositoryError::Constraint` unless the review's user and
    /// episode are stored.
    fn add_review(&self, review: Review) -> BoxFuture<RepositoryResult<()>>;

    /// Stores a review under the next free review ID, replacing the ID it
    /// was built with, and returns it as stored. Fails like `add_review`.
    fn add_new_review(&self, review: Review) -> BoxFuture<RepositoryResult<Review>>;

    fn get_reviews(&self) -> BoxFuture<RepositoryResult<Vec<Review>>>;

    fn get_number_of_reviews(&self) -> BoxFuture<RepositoryResult<usize>>;

    /// Fails with `RepositoryError::Constraint` unless the owner is stored.
    fn add_playlist(&self, playlist: Playlist) -> BoxFuture<RepositoryResult<()>>;

    fn get_playlists(&self) -> BoxFuture<RepositoryResult<Vec<Playlist>>>;

    /// Appends the episode to the user's playlist unless it is already there.
    fn add_episode_to_playlist(&self, user: &User, episode: &Episode) -> BoxFuture<RepositoryResult<()>>;

    fn remove_episode_from_playlist(
        &self,
        user: &User,
        episode: &Episode,
    ) -> BoxFuture<RepositoryResult<()>>;

    /// A handle on the same data whose session is its own. Resetting or
    /// closing it leaves every other handle's session alone.
    fn open_session(&self) -> Box<Repo>;

    /// Starts a fresh unit of work on this handle.
    fn reset_session(&self) -> BoxFuture<RepositoryResult<()>>;

    /// Releases the unit of work held by this handle.
    fn close_session(&self) -> BoxFuture<RepositoryResult<()>>;
}

fn missing(what: &str, id: Id) -> RepositoryError {
    RepositoryError::Constraint(format!("{} {} is not stored", what, id))
}
