use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use futures::future::{self, BoxFuture};
use futures::FutureExt;

use super::{missing, Repo, Repository, RepositoryResult};
use crate::errors::RepositoryError;
use crate::model::{
    Author, Category, Episode, Id, Playlist, Podcast, PodcastSubscription, Review, SortOrder, User,
};
use crate::normalization::normalize_username;

/// Entities kept in their sort order, with an index by ID.
#[derive(Debug)]
struct SortedStore<T> {
    order: Vec<Id>,
    index: HashMap<Id, T>,
}

impl<T> Default for SortedStore<T> {
    fn default() -> Self {
        SortedStore {
            order: vec![],
            index: HashMap::new(),
        }
    }
}

impl<T: SortOrder> SortedStore<T> {
    fn len(&self) -> usize {
        self.order.len()
    }

    fn contains(&self, id: Id) -> bool {
        self.index.contains_key(&id)
    }

    fn get(&self, id: Id) -> Option<&T> {
        self.index.get(&id)
    }

    /// Callers must not change the sort key through this reference.
    fn get_mut(&mut self, id: Id) -> Option<&mut T> {
        self.index.get_mut(&id)
    }

    fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.order.iter().filter_map(move |id| self.index.get(id))
    }

    fn first(&self) -> Option<&T> {
        self.order.first().and_then(|id| self.index.get(id))
    }

    fn last(&self) -> Option<&T> {
        self.order.last().and_then(|id| self.index.get(id))
    }

    /// The position of the first element not less than `item`.
    fn lower_bound(&self, item: &T) -> usize {
        let index = &self.index;

        self.order.partition_point(|id| {
            index
                .get(id)
                .map_or(false, |stored| stored.sort_cmp(item) == Ordering::Less)
        })
    }

    /// The position of `item` itself, found by binary search.
    fn position(&self, item: &T) -> Option<usize> {
        let start = self.lower_bound(item);

        self.order[start..]
            .iter()
            .take_while(|id| {
                self.index
                    .get(id)
                    .map_or(false, |stored| stored.sort_cmp(item) == Ordering::Equal)
            })
            .position(|id| *id == item.id())
            .map(|offset| start + offset)
    }

    /// Inserts before any elements with an equal sort key. Returns `false`
    /// without inserting if the ID is already stored.
    fn insert(&mut self, item: T) -> bool {
        if self.contains(item.id()) {
            return false;
        }

        let at = self.lower_bound(&item);
        self.order.insert(at, item.id());
        self.index.insert(item.id(), item);

        true
    }

    /// Inserts or replaces, keeping the order consistent with the new value.
    fn upsert(&mut self, item: T) {
        if self.index.remove(&item.id()).is_some() {
            let id = item.id();
            self.order.retain(|existing| *existing != id);
        }

        self.insert(item);
    }
}

#[derive(Debug, Default)]
struct Inner {
    authors: SortedStore<Author>,
    podcasts: SortedStore<Podcast>,
    categories: SortedStore<Category>,
    users: SortedStore<User>,
    subscriptions: SortedStore<PodcastSubscription>,
    episodes: SortedStore<Episode>,
    reviews: Vec<Review>,
    playlists: Vec<Playlist>,
}

impl Inner {
    fn user_playlist(&mut self, user_id: Id) -> RepositoryResult<&mut Playlist> {
        self.playlists
            .iter_mut()
            .find(|playlist| playlist.owner() == user_id)
            .ok_or(RepositoryError::PlaylistNotFound { user_id })
    }

    fn store_review(&mut self, review: Review) -> RepositoryResult<()> {
        if !self.users.contains(review.user()) {
            return Err(missing("User", review.user()));
        }

        if let Some(podcast_id) = review.podcast() {
            if !self.podcasts.contains(podcast_id) {
                return Err(missing("Podcast", podcast_id));
            }
        }

        if let Some(episode_id) = review.episode() {
            match self.episodes.get_mut(episode_id) {
                Some(episode) => episode.add_review(review.id()),
                None => return Err(missing("Episode", episode_id)),
            }
        }

        if let Some(user) = self.users.get_mut(review.user()) {
            user.add_review(review.id());
        }

        self.reviews.retain(|existing| existing.id() != review.id());
        self.reviews.push(review);

        Ok(())
    }

    fn store_new_user(&mut self, user: User, playlist_title: &str) -> RepositoryResult<Option<User>> {
        if self.users.iter().any(|stored| stored.username() == user.username()) {
            return Ok(None);
        }

        let user_id = self.users.len() as Id;
        let playlist_id = self.playlists.len() as Id;
        let playlist = Playlist::new(playlist_id, user_id, playlist_title)?;

        let mut user = user.with_id(user_id);
        user.add_playlist(playlist_id);

        if !self.users.insert(user.clone()) {
            return Err(RepositoryError::Constraint(format!("User {} is already stored", user_id)));
        }

        self.playlists.push(playlist);

        Ok(Some(user))
    }
}

/// A repository held entirely in process memory. Clones share the same data.
#[derive(Clone, Debug, Default)]
pub struct MemoryRepository {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Default::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn done<'a, T: Send + 'a>(result: RepositoryResult<T>) -> BoxFuture<'a, RepositoryResult<T>> {
    future::ready(result).boxed()
}

impl Repository for MemoryRepository {
    fn add_author(&self, author: Author) -> BoxFuture<RepositoryResult<()>> {
        self.write().authors.insert(author);

        done(Ok(()))
    }

    fn get_author(&self, name: &str) -> BoxFuture<RepositoryResult<Option<Author>>> {
        let inner = self.read();
        let author = inner.authors.iter().find(|author| author.name() == name).cloned();

        done(Ok(author))
    }

    fn add_podcast(&self, mut podcast: Podcast) -> BoxFuture<RepositoryResult<()>> {
        let mut inner = self.write();

        if !inner.podcasts.contains(podcast.id()) {
            let podcast_id = podcast.id();

            if let Some(author) = podcast.author_mut() {
                author.add_podcast(podcast_id);

                if let Some(stored) = inner.authors.get_mut(author.id()) {
                    stored.add_podcast(podcast_id);
                }
            }

            inner.podcasts.insert(podcast);
        }

        done(Ok(()))
    }

    fn get_podcast(&self, id: Id) -> BoxFuture<RepositoryResult<Option<Podcast>>> {
        let podcast = self.read().podcasts.get(id).cloned();

        done(Ok(podcast))
    }

    fn get_number_of_podcasts(&self) -> BoxFuture<RepositoryResult<usize>> {
        done(Ok(self.read().podcasts.len()))
    }

    fn get_podcasts_by_id(&self, ids: &[Id]) -> BoxFuture<RepositoryResult<Vec<Podcast>>> {
        let inner = self.read();
        let podcasts = ids
            .iter()
            .filter_map(|id| inner.podcasts.get(*id))
            .cloned()
            .collect();

        done(Ok(podcasts))
    }

    fn get_list_of_podcasts(&self) -> BoxFuture<RepositoryResult<Vec<Podcast>>> {
        let podcasts = self.read().podcasts.iter().cloned().collect();

        done(Ok(podcasts))
    }

    fn get_podcast_ids_by_category(&self, category_name: &str) -> BoxFuture<RepositoryResult<Vec<Id>>> {
        let inner = self.read();

        let ids = match inner.categories.iter().find(|c| c.name() == category_name) {
            Some(category) => inner
                .podcasts
                .iter()
                .filter(|podcast| podcast.categories().contains(&category.id()))
                .map(Podcast::id)
                .collect(),
            None => vec![],
        };

        done(Ok(ids))
    }

    fn get_podcast_ids_by_language(&self, language: &str) -> BoxFuture<RepositoryResult<Vec<Id>>> {
        let ids = self
            .read()
            .podcasts
            .iter()
            .filter(|podcast| podcast.language() == language)
            .map(Podcast::id)
            .collect();

        done(Ok(ids))
    }

    fn add_category(&self, category: Category) -> BoxFuture<RepositoryResult<()>> {
        let mut inner = self.write();

        for podcast_id in category.tagged_podcasts() {
            if let Some(podcast) = inner.podcasts.get_mut(*podcast_id) {
                podcast.add_category(category.id());
            }
        }

        inner.categories.upsert(category);

        done(Ok(()))
    }

    fn get_categories(&self) -> BoxFuture<RepositoryResult<Vec<Category>>> {
        let categories = self.read().categories.iter().cloned().collect();

        done(Ok(categories))
    }

    fn add_user(&self, user: User) -> BoxFuture<RepositoryResult<()>> {
        self.write().users.insert(user);

        done(Ok(()))
    }

    fn get_user(&self, username: &str) -> BoxFuture<RepositoryResult<Option<User>>> {
        let username = normalize_username(username);
        let inner = self.read();
        let user = inner
            .users
            .iter()
            .find(|user| user.username() == username)
            .cloned();

        done(Ok(user))
    }

    fn get_user_by_id(&self, id: Id) -> BoxFuture<RepositoryResult<Option<User>>> {
        let user = self.read().users.get(id).cloned();

        done(Ok(user))
    }

    fn get_number_of_users(&self) -> BoxFuture<RepositoryResult<usize>> {
        done(Ok(self.read().users.len()))
    }

    fn add_new_user(&self, user: User, playlist_title: &str) -> BoxFuture<RepositoryResult<Option<User>>> {
        done(self.write().store_new_user(user, playlist_title))
    }

    fn add_podcast_subscription(
        &self,
        subscription: PodcastSubscription,
    ) -> BoxFuture<RepositoryResult<()>> {
        let mut inner = self.write();

        if !inner.podcasts.contains(subscription.podcast()) {
            return done(Err(missing("Podcast", subscription.podcast())));
        }

        let owner = match inner.users.get_mut(subscription.owner()) {
            Some(owner) => owner,
            None => return done(Err(missing("User", subscription.owner()))),
        };

        owner.add_subscription(subscription.id());
        inner.subscriptions.upsert(subscription);

        done(Ok(()))
    }

    fn get_podcast_subscription(
        &self,
        id: Id,
    ) -> BoxFuture<RepositoryResult<Option<PodcastSubscription>>> {
        let subscription = self.read().subscriptions.get(id).cloned();

        done(Ok(subscription))
    }

    fn add_episode(&self, episode: Episode) -> BoxFuture<RepositoryResult<()>> {
        let mut inner = self.write();

        if let Some(podcast) = inner.podcasts.get_mut(episode.podcast()) {
            podcast.add_episode(episode.id());
            inner.episodes.insert(episode);
        }

        done(Ok(()))
    }

    fn get_episode(&self, id: Id) -> BoxFuture<RepositoryResult<Option<Episode>>> {
        let episode = self.read().episodes.get(id).cloned();

        done(Ok(episode))
    }

    fn get_number_of_episodes(&self) -> BoxFuture<RepositoryResult<usize>> {
        done(Ok(self.read().episodes.len()))
    }

    fn get_first_episode(&self) -> BoxFuture<RepositoryResult<Option<Episode>>> {
        let episode = self.read().episodes.first().cloned();

        done(Ok(episode))
    }

    fn get_last_episode(&self) -> BoxFuture<RepositoryResult<Option<Episode>>> {
        let episode = self.read().episodes.last().cloned();

        done(Ok(episode))
    }

    fn get_episodes_by_id(&self, ids: &[Id]) -> BoxFuture<RepositoryResult<Vec<Episode>>> {
        let inner = self.read();
        let episodes = ids
            .iter()
            .filter_map(|id| inner.episodes.get(*id))
            .cloned()
            .collect();

        done(Ok(episodes))
    }

    fn get_next_episode_id(&self, episode: &Episode) -> BoxFuture<RepositoryResult<Option<Id>>> {
        let inner = self.read();
        let store = &inner.episodes;

        let next = store.position(episode).and_then(|at| {
            store.order[at + 1..]
                .iter()
                .copied()
                .find(|id| *id > episode.id())
        });

        done(Ok(next))
    }

    fn get_previous_episode_id(&self, episode: &Episode) -> BoxFuture<RepositoryResult<Option<Id>>> {
        let inner = self.read();
        let store = &inner.episodes;

        let previous = store.position(episode).and_then(|at| {
            store.order[..at]
                .iter()
                .rev()
                .copied()
                .find(|id| *id < episode.id())
        });

        done(Ok(previous))
    }

    fn add_review(&self, review: Review) -> BoxFuture<RepositoryResult<()>> {
        done(self.write().store_review(review))
    }

    fn add_new_review(&self, review: Review) -> BoxFuture<RepositoryResult<Review>> {
        let mut inner = self.write();
        let review = review.with_id(inner.reviews.len() as Id);

        done(inner.store_review(review.clone()).map(|_| review))
    }

    fn get_reviews(&self) -> BoxFuture<RepositoryResult<Vec<Review>>> {
        done(Ok(self.read().reviews.clone()))
    }

    fn get_number_of_reviews(&self) -> BoxFuture<RepositoryResult<usize>> {
        done(Ok(self.read().reviews.len()))
    }

    fn add_playlist(&self, playlist: Playlist) -> BoxFuture<RepositoryResult<()>> {
        let mut inner = self.write();

        match inner.users.get_mut(playlist.owner()) {
            Some(owner) => owner.add_playlist(playlist.id()),
            None => return done(Err(missing("User", playlist.owner()))),
        }

        inner.playlists.retain(|existing| existing != &playlist);
        inner.playlists.push(playlist);

        done(Ok(()))
    }

    fn get_playlists(&self) -> BoxFuture<RepositoryResult<Vec<Playlist>>> {
        done(Ok(self.read().playlists.clone()))
    }

    fn add_episode_to_playlist(&self, user: &User, episode: &Episode) -> BoxFuture<RepositoryResult<()>> {
        let mut inner = self.write();

        let result = inner.user_playlist(user.id()).map(|playlist| {
            playlist.add_episode(episode.clone());
        });

        done(result)
    }

    fn remove_episode_from_playlist(
        &self,
        user: &User,
        episode: &Episode,
    ) -> BoxFuture<RepositoryResult<()>> {
        let mut inner = self.write();

        let result = inner.user_playlist(user.id()).and_then(|playlist| {
            if playlist.remove_episode(episode.id()) {
                Ok(())
            } else {
                Err(RepositoryError::EpisodeNotInPlaylist {
                    episode_id: episode.id(),
                })
            }
        });

        done(result)
    }

    fn open_session(&self) -> Box<Repo> {
        Box::new(self.clone())
    }

    fn reset_session(&self) -> BoxFuture<RepositoryResult<()>> {
        done(Ok(()))
    }

    fn close_session(&self) -> BoxFuture<RepositoryResult<()>> {
        done(Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use time::OffsetDateTime;

    use super::*;
    use crate::model::fixtures::{author, episode, podcast, user};
    use crate::model::make_category_association;

    async fn seeded() -> MemoryRepository {
        let repo = MemoryRepository::new();

        repo.add_author(author(1, "Joe Toste")).await.unwrap();
        repo.add_podcast(podcast(1, "D-Hour Radio Network")).await.unwrap();
        repo.add_podcast(podcast(2, "Brian Denny Radio")).await.unwrap();

        for id in [3, 1, 7, 5] {
            repo.add_episode(episode(id, 1, 100 * id)).await.unwrap();
        }

        repo.add_episode(episode(4, 2, 400)).await.unwrap();
        repo.add_user(user(0, "shyamli")).await.unwrap();

        repo
    }

    #[tokio::test]
    async fn adding_a_podcast_twice_keeps_the_count() {
        let repo = MemoryRepository::new();

        repo.add_podcast(podcast(1, "A")).await.unwrap();
        repo.add_podcast(podcast(1, "A")).await.unwrap();

        assert_eq!(repo.get_number_of_podcasts().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn podcasts_are_listed_by_title() {
        let repo = MemoryRepository::new();

        repo.add_podcast(podcast(2, "B")).await.unwrap();
        repo.add_podcast(podcast(1, "A")).await.unwrap();

        let titles: Vec<_> = repo
            .get_list_of_podcasts()
            .await
            .unwrap()
            .iter()
            .map(|p| p.title().to_owned())
            .collect();

        assert_eq!(titles, vec!["A", "B"]);
    }

    #[tokio::test]
    async fn equal_titles_keep_later_insertions_first() {
        let repo = MemoryRepository::new();

        repo.add_podcast(podcast(1, "Same")).await.unwrap();
        repo.add_podcast(podcast(2, "Same")).await.unwrap();

        let ids: Vec<_> = repo
            .get_list_of_podcasts()
            .await
            .unwrap()
            .iter()
            .map(Podcast::id)
            .collect();

        assert_eq!(ids, vec![2, 1]);
        assert_eq!(repo.get_podcast(1).await.unwrap().unwrap().title(), "Same");
    }

    #[tokio::test]
    async fn podcasts_are_recorded_on_their_author() {
        let repo = seeded().await;

        let author = repo.get_author("Joe Toste").await.unwrap().unwrap();
        assert_eq!(author.podcasts(), &[1, 2]);

        let podcast = repo.get_podcast(1).await.unwrap().unwrap();
        assert_eq!(podcast.author().unwrap().podcasts(), &[1]);

        assert!(repo.get_author("Nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn orphan_episodes_are_dropped() {
        let repo = seeded().await;
        let count = repo.get_number_of_episodes().await.unwrap();

        repo.add_episode(episode(99, 42, 10)).await.unwrap();

        assert_eq!(repo.get_number_of_episodes().await.unwrap(), count);
        assert!(repo.get_episode(99).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn episodes_are_linked_and_ordered_by_id() {
        let repo = seeded().await;

        assert_eq!(repo.get_number_of_episodes().await.unwrap(), 5);
        assert_eq!(repo.get_first_episode().await.unwrap().unwrap().id(), 1);
        assert_eq!(repo.get_last_episode().await.unwrap().unwrap().id(), 7);

        let parent = repo.get_podcast(1).await.unwrap().unwrap();
        assert_eq!(parent.episodes(), &[3, 1, 7, 5]);

        let found: Vec<_> = repo
            .get_episodes_by_id(&[5, 100, 3])
            .await
            .unwrap()
            .iter()
            .map(Episode::id)
            .collect();
        assert_eq!(found, vec![5, 3]);
    }

    #[tokio::test]
    async fn neighbouring_episodes() {
        let repo = seeded().await;

        let middle = episode(4, 2, 0);
        assert_eq!(repo.get_next_episode_id(&middle).await.unwrap(), Some(5));
        assert_eq!(repo.get_previous_episode_id(&middle).await.unwrap(), Some(3));

        let first = episode(1, 1, 0);
        assert_eq!(repo.get_previous_episode_id(&first).await.unwrap(), None);
        assert_eq!(repo.get_next_episode_id(&first).await.unwrap(), Some(3));

        let last = episode(7, 1, 0);
        assert_eq!(repo.get_next_episode_id(&last).await.unwrap(), None);

        let unknown = episode(6, 1, 0);
        assert_eq!(repo.get_next_episode_id(&unknown).await.unwrap(), None);
    }

    #[tokio::test]
    async fn filters_by_category_and_language() {
        let repo = MemoryRepository::new();

        let mut comedy = Category::new(1, "Comedy").unwrap();
        let mut first = podcast(1, "B").with_language("English");
        let second = podcast(2, "A").with_language("English");
        let third = podcast(3, "C").with_language("German");
        make_category_association(&mut first, &mut comedy).unwrap();

        for p in [first, second, third] {
            repo.add_podcast(p).await.unwrap();
        }
        repo.add_category(comedy).await.unwrap();

        assert_eq!(repo.get_podcast_ids_by_category("Comedy").await.unwrap(), vec![1]);
        assert!(repo.get_podcast_ids_by_category("Drama").await.unwrap().is_empty());
        assert_eq!(repo.get_podcast_ids_by_language("English").await.unwrap(), vec![2, 1]);
        assert_eq!(repo.get_categories().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn categories_added_after_podcasts_tag_them() {
        let repo = MemoryRepository::new();
        repo.add_podcast(podcast(1, "A")).await.unwrap();

        let mut category = Category::new(2, "News").unwrap();
        category.add_podcast(1);
        repo.add_category(category).await.unwrap();

        assert_eq!(repo.get_podcast(1).await.unwrap().unwrap().categories(), &[2]);
    }

    #[tokio::test]
    async fn users_are_found_ignoring_case() {
        let repo = seeded().await;

        assert_eq!(repo.get_user("Shyamli").await.unwrap().unwrap().id(), 0);
        assert_eq!(repo.get_user_by_id(0).await.unwrap().unwrap().username(), "shyamli");
        assert!(repo.get_user_by_id(1).await.unwrap().is_none());
        assert!(repo.get_user("nobody").await.unwrap().is_none());

        repo.add_user(user(0, "someone-else")).await.unwrap();
        assert_eq!(repo.get_number_of_users().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn reviews_are_visible_from_linked_entities() {
        let repo = seeded().await;
        let review = Review::new(0, 0, 5, "Great", Some(1), Some(3), OffsetDateTime::UNIX_EPOCH).unwrap();

        repo.add_review(review).await.unwrap();

        let reviews = repo.get_reviews().await.unwrap();
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].rating(), 5);
        assert_eq!(repo.get_number_of_reviews().await.unwrap(), 1);
        assert_eq!(repo.get_user("shyamli").await.unwrap().unwrap().reviews(), &[0]);
        assert_eq!(repo.get_episode(3).await.unwrap().unwrap().reviews(), &[0]);
    }

    #[tokio::test]
    async fn unlinked_reviews_are_rejected() {
        let repo = seeded().await;
        let timestamp = OffsetDateTime::UNIX_EPOCH;

        let no_user = Review::new(0, 9, 5, "Great", None, Some(3), timestamp).unwrap();
        let no_episode = Review::new(0, 0, 5, "Great", None, Some(99), timestamp).unwrap();

        for review in [no_user, no_episode] {
            assert!(matches!(
                repo.add_review(review).await,
                Err(RepositoryError::Constraint(_))
            ));
        }

        assert_eq!(repo.get_number_of_reviews().await.unwrap(), 0);
        assert!(repo.get_user("shyamli").await.unwrap().unwrap().reviews().is_empty());
    }

    #[tokio::test]
    async fn new_reviews_take_the_next_id() {
        let repo = seeded().await;
        let timestamp = OffsetDateTime::UNIX_EPOCH;

        let first = repo
            .add_new_review(Review::new(0, 0, 4, "Good", Some(1), Some(3), timestamp).unwrap())
            .await
            .unwrap();
        let second = repo
            .add_new_review(Review::new(0, 0, 2, "Not great", Some(1), Some(1), timestamp).unwrap())
            .await
            .unwrap();

        assert_eq!((first.id(), second.id()), (0, 1));
        assert_eq!(repo.get_episode(1).await.unwrap().unwrap().reviews(), &[1]);
        assert_eq!(repo.get_user("shyamli").await.unwrap().unwrap().reviews(), &[0, 1]);

        let unlinked = Review::new(0, 9, 5, "Great", None, Some(3), timestamp).unwrap();
        assert!(matches!(
            repo.add_new_review(unlinked).await,
            Err(RepositoryError::Constraint(_))
        ));
        assert_eq!(repo.get_number_of_reviews().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn new_users_get_ids_and_a_playlist() {
        let repo = MemoryRepository::new();

        let mario = repo.add_new_user(user(7, "mario"), "Mine").await.unwrap().unwrap();
        let luigi = repo.add_new_user(user(7, "luigi"), "Mine").await.unwrap().unwrap();

        assert_eq!((mario.id(), luigi.id()), (0, 1));
        assert_eq!(luigi.playlists(), &[1]);
        assert_eq!(repo.get_user("luigi").await.unwrap().unwrap().playlists(), &[1]);

        let playlists = repo.get_playlists().await.unwrap();
        assert_eq!(playlists.len(), 2);
        assert_eq!((playlists[1].owner(), playlists[1].title()), (1, "Mine"));

        assert!(repo.add_new_user(user(0, "MARIO"), "Mine").await.unwrap().is_none());
        assert_eq!(repo.get_number_of_users().await.unwrap(), 2);
        assert_eq!(repo.get_playlists().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn sessions_share_the_data() {
        let repo = MemoryRepository::new();
        let session = repo.open_session();

        session.add_podcast(podcast(1, "A")).await.unwrap();

        assert_eq!(repo.get_number_of_podcasts().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn subscriptions_need_a_stored_owner() {
        let repo = seeded().await;

        let orphan = PodcastSubscription::new(1, 5, 1).unwrap();
        assert!(repo.add_podcast_subscription(orphan).await.is_err());
        assert!(repo.get_podcast_subscription(1).await.unwrap().is_none());

        let subscription = PodcastSubscription::new(1, 0, 1).unwrap();
        repo.add_podcast_subscription(subscription.clone()).await.unwrap();

        assert_eq!(repo.get_podcast_subscription(1).await.unwrap(), Some(subscription));
        assert_eq!(repo.get_user("shyamli").await.unwrap().unwrap().subscriptions(), &[1]);
    }

    #[tokio::test]
    async fn playlist_mutation() {
        let repo = seeded().await;
        let owner = repo.get_user("shyamli").await.unwrap().unwrap();
        let first = repo.get_episode(1).await.unwrap().unwrap();
        let second = repo.get_episode(3).await.unwrap().unwrap();

        assert!(matches!(
            repo.add_episode_to_playlist(&owner, &first).await,
            Err(RepositoryError::PlaylistNotFound { user_id: 0 })
        ));

        repo.add_playlist(Playlist::new(0, 0, "My Personal Playlist").unwrap())
            .await
            .unwrap();
        repo.add_episode_to_playlist(&owner, &first).await.unwrap();
        repo.add_episode_to_playlist(&owner, &first).await.unwrap();
        repo.add_episode_to_playlist(&owner, &second).await.unwrap();

        let playlists = repo.get_playlists().await.unwrap();
        assert_eq!(playlists[0].len(), 2);
        assert_eq!(repo.get_user("shyamli").await.unwrap().unwrap().playlists(), &[0]);

        repo.remove_episode_from_playlist(&owner, &first).await.unwrap();
        assert!(matches!(
            repo.remove_episode_from_playlist(&owner, &first).await,
            Err(RepositoryError::EpisodeNotInPlaylist { episode_id: 1 })
        ));
        assert_eq!(repo.get_playlists().await.unwrap()[0].episodes()[0].id(), 3);
    }

    #[tokio::test]
    async fn playlists_need_a_stored_owner() {
        let repo = MemoryRepository::new();

        assert!(repo
            .add_playlist(Playlist::new(0, 3, "Untitled").unwrap())
            .await
            .is_err());
        assert!(repo.get_playlists().await.unwrap().is_empty());
    }

    #[test]
    fn store_upsert_reorders() {
        let mut store = SortedStore::default();

        store.insert(Category::new(1, "B").unwrap());
        store.insert(Category::new(2, "C").unwrap());
        store.upsert(Category::new(2, "A").unwrap());

        let names: Vec<_> = store.iter().map(|c| c.name().to_owned()).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(store.len(), 2);
    }
}
