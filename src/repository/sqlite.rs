use std::collections::HashMap;
use std::str::FromStr;

use futures::future::BoxFuture;
use futures::FutureExt;
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Connection, Sqlite};
use time::OffsetDateTime;
use tokio::sync::{MappedMutexGuard, Mutex, MutexGuard};

use super::{missing, Repo, Repository, RepositoryResult};
use crate::errors::RepositoryError;
use crate::model::{
    Author, Category, Episode, Id, Playlist, Podcast, PodcastSubscription, Review, User,
};
use crate::normalization::normalize_username;

/// The connection shared by the repository calls made through one handle.
///
/// The connection is acquired lazily and kept until the session is reset or
/// closed. Writes run in a transaction on it that rolls back unless it is
/// committed. Each handle from `open_session` has a scope of its own, so a
/// request never sees another request's connection come or go.
pub struct SessionScope {
    pool: SqlitePool,
    connection: Mutex<Option<PoolConnection<Sqlite>>>,
}

impl SessionScope {
    pub fn new(pool: SqlitePool) -> Self {
        SessionScope {
            pool,
            connection: Mutex::new(None),
        }
    }

    async fn acquire(&self) -> RepositoryResult<MappedMutexGuard<'_, SqliteConnection>> {
        let mut slot = self.connection.lock().await;

        if slot.is_none() {
            *slot = Some(self.pool.acquire().await?);
        }

        MutexGuard::try_map(slot, |slot| slot.as_deref_mut())
            .map_err(|_| RepositoryError::from(sqlx::Error::PoolClosed))
    }

    /// Returns the current connection to the pool and acquires a new one.
    pub async fn reset(&self) -> RepositoryResult<()> {
        let mut slot = self.connection.lock().await;

        // the old connection goes back first so a single-connection pool
        // can hand it out again
        drop(slot.take());
        *slot = Some(self.pool.acquire().await?);

        Ok(())
    }

    /// Returns the current connection to the pool, if any.
    pub async fn close(&self) {
        drop(self.connection.lock().await.take());
    }
}

/// A repository backed by an SQLite database.
pub struct SqliteRepository {
    pool: SqlitePool,
    session: SessionScope,
}

impl SqliteRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SqliteRepository {
            session: SessionScope::new(pool.clone()),
            pool,
        }
    }

    /// Opens a pool for the URL, creating the database file if needed.
    ///
    /// In-memory databases get a single connection that is never recycled,
    /// since each new connection would see an empty database.
    pub async fn connect(url: &str) -> RepositoryResult<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

        let pool = if url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePoolOptions::new().connect_with(options).await?
        };

        Ok(SqliteRepository::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Runs the pending migrations.
    pub async fn create_schema(&self) -> RepositoryResult<()> {
        self.session.close().await;
        sqlx::migrate!("./migrations").run(&self.pool).await?;

        Ok(())
    }

    /// Deletes every row in every table.
    pub async fn clear(&self) -> RepositoryResult<()> {
        let mut conn = self.session.acquire().await?;
        let mut tx = conn.begin().await?;

        sqlx::query(include_str!("queries/clear.sql"))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(())
    }
}

// these can be simplified once async functions in traits are object safe
impl Repository for SqliteRepository {
    fn add_author(&self, author: Author) -> BoxFuture<RepositoryResult<()>> {
        async move {
            let mut conn = self.session.acquire().await?;
            let mut tx = conn.begin().await?;

            sqlx::query(include_str!("queries/upsert_author.sql"))
                .bind(author.id())
                .bind(author.name())
                .execute(&mut *tx)
                .await?;

            tx.commit().await?;

            Ok(())
        }
        .boxed()
    }

    fn get_author(&self, name: &str) -> BoxFuture<RepositoryResult<Option<Author>>> {
        let name = name.to_owned();

        async move {
            let mut conn = self.session.acquire().await?;

            let row: Option<(Id, String)> =
                sqlx::query_as(include_str!("queries/retrieve_author_by_name.sql"))
                    .bind(&name)
                    .fetch_optional(&mut *conn)
                    .await?;

            let (id, name) = match row {
                Some(row) => row,
                None => return Ok(None),
            };

            let mut author = Author::new(id, name)?;
            for podcast_id in ids(&mut conn, include_str!("queries/retrieve_author_podcasts.sql"), id).await? {
                author.add_podcast(podcast_id);
            }

            Ok(Some(author))
        }
        .boxed()
    }

    fn add_podcast(&self, podcast: Podcast) -> BoxFuture<RepositoryResult<()>> {
        async move {
            let mut conn = self.session.acquire().await?;
            let mut tx = conn.begin().await?;

            if let Some(author) = podcast.author() {
                sqlx::query(include_str!("queries/insert_author_if_absent.sql"))
                    .bind(author.id())
                    .bind(author.name())
                    .execute(&mut *tx)
                    .await?;
            }

            sqlx::query(include_str!("queries/upsert_podcast.sql"))
                .bind(podcast.id())
                .bind(podcast.author().map(Author::id))
                .bind(podcast.title())
                .bind(podcast.image())
                .bind(podcast.description())
                .bind(podcast.language())
                .bind(podcast.website())
                .bind(podcast.itunes_id())
                .execute(&mut *tx)
                .await?;

            for category_id in podcast.categories() {
                sqlx::query(include_str!("queries/link_podcast_to_category.sql"))
                    .bind(podcast.id())
                    .bind(category_id)
                    .execute(&mut *tx)
                    .await?;
            }

            tx.commit().await?;

            Ok(())
        }
        .boxed()
    }

    fn get_podcast(&self, id: Id) -> BoxFuture<RepositoryResult<Option<Podcast>>> {
        async move {
            let mut conn = self.session.acquire().await?;

            let row = sqlx::query(include_str!("queries/retrieve_podcast.sql"))
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?;

            let mut podcast = match row {
                Some(row) => podcast_from_row(&row)?,
                None => return Ok(None),
            };

            for category_id in ids(&mut conn, include_str!("queries/retrieve_podcast_categories.sql"), id).await? {
                podcast.add_category(category_id);
            }

            for episode_id in ids(&mut conn, include_str!("queries/retrieve_podcast_episodes.sql"), id).await? {
                podcast.add_episode(episode_id);
            }

            Ok(Some(podcast))
        }
        .boxed()
    }

    fn get_number_of_podcasts(&self) -> BoxFuture<RepositoryResult<usize>> {
        async move {
            let mut conn = self.session.acquire().await?;

            count(&mut conn, include_str!("queries/count_podcasts.sql")).await
        }
        .boxed()
    }

    fn get_podcasts_by_id(&self, ids: &[Id]) -> BoxFuture<RepositoryResult<Vec<Podcast>>> {
        let ids = ids.to_vec();

        async move {
            let mut podcasts = Vec::with_capacity(ids.len());

            for id in ids {
                if let Some(podcast) = self.get_podcast(id).await? {
                    podcasts.push(podcast);
                }
            }

            Ok(podcasts)
        }
        .boxed()
    }

    fn get_list_of_podcasts(&self) -> BoxFuture<RepositoryResult<Vec<Podcast>>> {
        async move {
            let mut conn = self.session.acquire().await?;

            let rows = sqlx::query(include_str!("queries/retrieve_podcasts.sql"))
                .fetch_all(&mut *conn)
                .await?;

            let mut categories =
                grouped_ids(&mut conn, include_str!("queries/retrieve_all_podcast_categories.sql")).await?;
            let mut episodes =
                grouped_ids(&mut conn, include_str!("queries/retrieve_all_podcast_episodes.sql")).await?;

            let mut podcasts = Vec::with_capacity(rows.len());

            for row in rows {
                let mut podcast = podcast_from_row(&row)?;

                for category_id in categories.remove(&podcast.id()).unwrap_or_default() {
                    podcast.add_category(category_id);
                }

                for episode_id in episodes.remove(&podcast.id()).unwrap_or_default() {
                    podcast.add_episode(episode_id);
                }

                podcasts.push(podcast);
            }

            Ok(podcasts)
        }
        .boxed()
    }

    fn get_podcast_ids_by_category(&self, category_name: &str) -> BoxFuture<RepositoryResult<Vec<Id>>> {
        let category_name = category_name.to_owned();

        async move {
            let mut conn = self.session.acquire().await?;

            let category: Option<(Id,)> = sqlx::query_as(include_str!("queries/retrieve_category_id.sql"))
                .bind(&category_name)
                .fetch_optional(&mut *conn)
                .await?;

            match category {
                Some((category_id,)) => {
                    ids(
                        &mut conn,
                        include_str!("queries/retrieve_podcast_ids_by_category.sql"),
                        category_id,
                    )
                    .await
                }
                None => Ok(vec![]),
            }
        }
        .boxed()
    }

    fn get_podcast_ids_by_language(&self, language: &str) -> BoxFuture<RepositoryResult<Vec<Id>>> {
        let language = language.to_owned();

        async move {
            let mut conn = self.session.acquire().await?;

            let rows: Vec<(Id,)> = sqlx::query_as(include_str!("queries/retrieve_podcast_ids_by_language.sql"))
                .bind(&language)
                .fetch_all(&mut *conn)
                .await?;

            Ok(rows.into_iter().map(|(id,)| id).collect())
        }
        .boxed()
    }

    fn add_category(&self, category: Category) -> BoxFuture<RepositoryResult<()>> {
        async move {
            let mut conn = self.session.acquire().await?;
            let mut tx = conn.begin().await?;

            sqlx::query(include_str!("queries/upsert_category.sql"))
                .bind(category.id())
                .bind(category.name())
                .execute(&mut *tx)
                .await?;

            for podcast_id in category.tagged_podcasts() {
                sqlx::query(include_str!("queries/link_category_to_podcast.sql"))
                    .bind(category.id())
                    .bind(podcast_id)
                    .execute(&mut *tx)
                    .await?;
            }

            tx.commit().await?;

            Ok(())
        }
        .boxed()
    }

    fn get_categories(&self) -> BoxFuture<RepositoryResult<Vec<Category>>> {
        async move {
            let mut conn = self.session.acquire().await?;

            let rows: Vec<(Id, String)> = sqlx::query_as(include_str!("queries/retrieve_categories.sql"))
                .fetch_all(&mut *conn)
                .await?;

            let mut categories = Vec::with_capacity(rows.len());

            for (id, name) in rows {
                let mut category = Category::new(id, name)?;

                for podcast_id in ids(&mut conn, include_str!("queries/retrieve_category_podcasts.sql"), id).await? {
                    category.add_podcast(podcast_id);
                }

                categories.push(category);
            }

            Ok(categories)
        }
        .boxed()
    }

    fn add_user(&self, user: User) -> BoxFuture<RepositoryResult<()>> {
        async move {
            let mut conn = self.session.acquire().await?;
            let mut tx = conn.begin().await?;

            sqlx::query(include_str!("queries/upsert_user.sql"))
                .bind(user.id())
                .bind(user.username())
                .bind(user.password())
                .execute(&mut *tx)
                .await?;

            tx.commit().await?;

            Ok(())
        }
        .boxed()
    }

    fn get_user(&self, username: &str) -> BoxFuture<RepositoryResult<Option<User>>> {
        let username = normalize_username(username);

        async move {
            let mut conn = self.session.acquire().await?;

            let row: Option<(Id, String, String)> = sqlx::query_as(include_str!("queries/retrieve_user.sql"))
                .bind(&username)
                .fetch_optional(&mut *conn)
                .await?;

            load_user(&mut conn, row).await
        }
        .boxed()
    }

    fn get_user_by_id(&self, id: Id) -> BoxFuture<RepositoryResult<Option<User>>> {
        async move {
            let mut conn = self.session.acquire().await?;

            let row: Option<(Id, String, String)> = sqlx::query_as(include_str!("queries/retrieve_user_by_id.sql"))
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?;

            load_user(&mut conn, row).await
        }
        .boxed()
    }

    fn get_number_of_users(&self) -> BoxFuture<RepositoryResult<usize>> {
        async move {
            let mut conn = self.session.acquire().await?;

            count(&mut conn, include_str!("queries/count_users.sql")).await
        }
        .boxed()
    }

    fn add_new_user(&self, user: User, playlist_title: &str) -> BoxFuture<RepositoryResult<Option<User>>> {
        let playlist_title = playlist_title.to_owned();

        async move {
            let mut conn = self.session.acquire().await?;
            let mut tx = conn.begin().await?;

            // each insert picks its ID under the write lock it takes
            let inserted: Option<(Id,)> = sqlx::query_as(include_str!("queries/insert_next_user.sql"))
                .bind(user.username())
                .bind(user.password())
                .fetch_optional(&mut *tx)
                .await?;

            let user_id = match inserted {
                Some((user_id,)) => user_id,
                None => return Ok(None),
            };

            let (playlist_id,): (Id,) = sqlx::query_as(include_str!("queries/insert_next_playlist.sql"))
                .bind(user_id)
                .bind(&playlist_title)
                .fetch_one(&mut *tx)
                .await?;

            tx.commit().await?;

            let mut user = user.with_id(user_id);
            user.add_playlist(playlist_id);

            Ok(Some(user))
        }
        .boxed()
    }

    fn add_podcast_subscription(
        &self,
        subscription: PodcastSubscription,
    ) -> BoxFuture<RepositoryResult<()>> {
        async move {
            let mut conn = self.session.acquire().await?;
            let mut tx = conn.begin().await?;

            require(&mut tx, Table::Users, subscription.owner()).await?;
            require(&mut tx, Table::Podcasts, subscription.podcast()).await?;

            sqlx::query(include_str!("queries/upsert_subscription.sql"))
                .bind(subscription.id())
                .bind(subscription.owner())
                .bind(subscription.podcast())
                .execute(&mut *tx)
                .await?;

            tx.commit().await?;

            Ok(())
        }
        .boxed()
    }

    fn get_podcast_subscription(
        &self,
        id: Id,
    ) -> BoxFuture<RepositoryResult<Option<PodcastSubscription>>> {
        async move {
            let mut conn = self.session.acquire().await?;

            let row: Option<(Id, Id, Id)> = sqlx::query_as(include_str!("queries/retrieve_subscription.sql"))
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?;

            Ok(row
                .map(|(id, owner, podcast)| PodcastSubscription::new(id, owner, podcast))
                .transpose()?)
        }
        .boxed()
    }

    fn add_episode(&self, episode: Episode) -> BoxFuture<RepositoryResult<()>> {
        async move {
            let mut conn = self.session.acquire().await?;
            let mut tx = conn.begin().await?;

            if !exists(&mut tx, Table::Podcasts, episode.podcast()).await? {
                return Ok(());
            }

            sqlx::query(include_str!("queries/upsert_episode.sql"))
                .bind(episode.id())
                .bind(episode.podcast())
                .bind(episode.title())
                .bind(episode.audio())
                .bind(episode.length())
                .bind(episode.description())
                .bind(episode.upload_date())
                .execute(&mut *tx)
                .await?;

            tx.commit().await?;

            Ok(())
        }
        .boxed()
    }

    fn get_episode(&self, id: Id) -> BoxFuture<RepositoryResult<Option<Episode>>> {
        async move {
            let mut conn = self.session.acquire().await?;

            load_episode(&mut conn, include_str!("queries/retrieve_episode.sql"), Some(id)).await
        }
        .boxed()
    }

    fn get_number_of_episodes(&self) -> BoxFuture<RepositoryResult<usize>> {
        async move {
            let mut conn = self.session.acquire().await?;

            count(&mut conn, include_str!("queries/count_episodes.sql")).await
        }
        .boxed()
    }

    fn get_first_episode(&self) -> BoxFuture<RepositoryResult<Option<Episode>>> {
        async move {
            let mut conn = self.session.acquire().await?;

            load_episode(&mut conn, include_str!("queries/retrieve_first_episode.sql"), None).await
        }
        .boxed()
    }

    fn get_last_episode(&self) -> BoxFuture<RepositoryResult<Option<Episode>>> {
        async move {
            let mut conn = self.session.acquire().await?;

            load_episode(&mut conn, include_str!("queries/retrieve_last_episode.sql"), None).await
        }
        .boxed()
    }

    fn get_episodes_by_id(&self, ids: &[Id]) -> BoxFuture<RepositoryResult<Vec<Episode>>> {
        let ids = ids.to_vec();

        async move {
            let mut conn = self.session.acquire().await?;
            let mut episodes = Vec::with_capacity(ids.len());

            for id in ids {
                if let Some(found) = load_episode(&mut conn, include_str!("queries/retrieve_episode.sql"), Some(id)).await? {
                    episodes.push(found);
                }
            }

            Ok(episodes)
        }
        .boxed()
    }

    fn get_next_episode_id(&self, episode: &Episode) -> BoxFuture<RepositoryResult<Option<Id>>> {
        let id = episode.id();

        async move {
            let mut conn = self.session.acquire().await?;

            neighbour(&mut conn, include_str!("queries/retrieve_next_episode_id.sql"), id).await
        }
        .boxed()
    }

    fn get_previous_episode_id(&self, episode: &Episode) -> BoxFuture<RepositoryResult<Option<Id>>> {
        let id = episode.id();

        async move {
            let mut conn = self.session.acquire().await?;

            neighbour(&mut conn, include_str!("queries/retrieve_previous_episode_id.sql"), id).await
        }
        .boxed()
    }

    fn add_review(&self, review: Review) -> BoxFuture<RepositoryResult<()>> {
        async move {
            let mut conn = self.session.acquire().await?;
            let mut tx = conn.begin().await?;

            require(&mut tx, Table::Users, review.user()).await?;

            if let Some(podcast_id) = review.podcast() {
                require(&mut tx, Table::Podcasts, podcast_id).await?;
            }

            if let Some(episode_id) = review.episode() {
                require(&mut tx, Table::Episodes, episode_id).await?;
            }

            sqlx::query(include_str!("queries/upsert_review.sql"))
                .bind(review.id())
                .bind(review.user())
                .bind(review.podcast())
                .bind(review.episode())
                .bind(review.rating())
                .bind(review.content())
                .bind(review.timestamp())
                .execute(&mut *tx)
                .await?;

            tx.commit().await?;

            Ok(())
        }
        .boxed()
    }

    fn add_new_review(&self, review: Review) -> BoxFuture<RepositoryResult<Review>> {
        async move {
            let mut conn = self.session.acquire().await?;

            // no rows are ever deleted, so these still hold once the insert runs
            require(&mut conn, Table::Users, review.user()).await?;

            if let Some(podcast_id) = review.podcast() {
                require(&mut conn, Table::Podcasts, podcast_id).await?;
            }

            if let Some(episode_id) = review.episode() {
                require(&mut conn, Table::Episodes, episode_id).await?;
            }

            let mut tx = conn.begin().await?;

            let (review_id,): (Id,) = sqlx::query_as(include_str!("queries/insert_next_review.sql"))
                .bind(review.user())
                .bind(review.podcast())
                .bind(review.episode())
                .bind(review.rating())
                .bind(review.content())
                .bind(review.timestamp())
                .fetch_one(&mut *tx)
                .await?;

            tx.commit().await?;

            Ok(review.with_id(review_id))
        }
        .boxed()
    }

    fn get_reviews(&self) -> BoxFuture<RepositoryResult<Vec<Review>>> {
        async move {
            let mut conn = self.session.acquire().await?;

            let rows: Vec<(Id, Id, Option<Id>, Option<Id>, i64, String, OffsetDateTime)> =
                sqlx::query_as(include_str!("queries/retrieve_reviews.sql"))
                    .fetch_all(&mut *conn)
                    .await?;

            let mut reviews = Vec::with_capacity(rows.len());

            for (id, user, podcast, episode, rating, content, timestamp) in rows {
                reviews.push(Review::new(id, user, rating, content, podcast, episode, timestamp)?);
            }

            Ok(reviews)
        }
        .boxed()
    }

    fn get_number_of_reviews(&self) -> BoxFuture<RepositoryResult<usize>> {
        async move {
            let mut conn = self.session.acquire().await?;

            count(&mut conn, include_str!("queries/count_reviews.sql")).await
        }
        .boxed()
    }

    fn add_playlist(&self, playlist: Playlist) -> BoxFuture<RepositoryResult<()>> {
        async move {
            let mut conn = self.session.acquire().await?;
            let mut tx = conn.begin().await?;

            require(&mut tx, Table::Users, playlist.owner()).await?;

            sqlx::query(include_str!("queries/upsert_playlist.sql"))
                .bind(playlist.id())
                .bind(playlist.owner())
                .bind(playlist.title())
                .execute(&mut *tx)
                .await?;

            sqlx::query(include_str!("queries/clear_playlist.sql"))
                .bind(playlist.id())
                .execute(&mut *tx)
                .await?;

            for episode in playlist.episodes() {
                sqlx::query(include_str!("queries/add_playlist_episode.sql"))
                    .bind(playlist.id())
                    .bind(episode.id())
                    .execute(&mut *tx)
                    .await?;
            }

            tx.commit().await?;

            Ok(())
        }
        .boxed()
    }

    fn get_playlists(&self) -> BoxFuture<RepositoryResult<Vec<Playlist>>> {
        async move {
            let mut conn = self.session.acquire().await?;

            let rows: Vec<(Id, Id, String)> = sqlx::query_as(include_str!("queries/retrieve_playlists.sql"))
                .fetch_all(&mut *conn)
                .await?;

            let mut playlists = Vec::with_capacity(rows.len());

            for (id, owner, title) in rows {
                let mut playlist = Playlist::new(id, owner, title)?;

                let episodes = sqlx::query(include_str!("queries/retrieve_playlist_episodes.sql"))
                    .bind(id)
                    .fetch_all(&mut *conn)
                    .await?;

                for row in episodes {
                    playlist.add_episode(episode_from_row(&row)?);
                }

                playlists.push(playlist);
            }

            Ok(playlists)
        }
        .boxed()
    }

    fn add_episode_to_playlist(&self, user: &User, episode: &Episode) -> BoxFuture<RepositoryResult<()>> {
        let user_id = user.id();
        let episode_id = episode.id();

        async move {
            let mut conn = self.session.acquire().await?;
            let mut tx = conn.begin().await?;

            let playlist_id = user_playlist(&mut tx, user_id).await?;
            require(&mut tx, Table::Episodes, episode_id).await?;

            sqlx::query(include_str!("queries/add_playlist_episode.sql"))
                .bind(playlist_id)
                .bind(episode_id)
                .execute(&mut *tx)
                .await?;

            tx.commit().await?;

            Ok(())
        }
        .boxed()
    }

    fn remove_episode_from_playlist(
        &self,
        user: &User,
        episode: &Episode,
    ) -> BoxFuture<RepositoryResult<()>> {
        let user_id = user.id();
        let episode_id = episode.id();

        async move {
            let mut conn = self.session.acquire().await?;
            let mut tx = conn.begin().await?;

            let playlist_id = user_playlist(&mut tx, user_id).await?;

            let removed = sqlx::query(include_str!("queries/remove_playlist_episode.sql"))
                .bind(playlist_id)
                .bind(episode_id)
                .execute(&mut *tx)
                .await?
                .rows_affected();

            if removed == 0 {
                return Err(RepositoryError::EpisodeNotInPlaylist { episode_id });
            }

            tx.commit().await?;

            Ok(())
        }
        .boxed()
    }

    fn open_session(&self) -> Box<Repo> {
        Box::new(SqliteRepository::new(self.pool.clone()))
    }

    fn reset_session(&self) -> BoxFuture<RepositoryResult<()>> {
        self.session.reset().boxed()
    }

    fn close_session(&self) -> BoxFuture<RepositoryResult<()>> {
        async move {
            self.session.close().await;

            Ok(())
        }
        .boxed()
    }
}

#[derive(Clone, Copy, Debug)]
enum Table {
    Episodes,
    Podcasts,
    Users,
}

impl Table {
    fn existence_query(self) -> &'static str {
        match self {
            Table::Episodes => "SELECT id FROM episodes WHERE id = ?",
            Table::Podcasts => "SELECT id FROM podcasts WHERE id = ?",
            Table::Users => "SELECT id FROM users WHERE id = ?",
        }
    }

    fn entity(self) -> &'static str {
        match self {
            Table::Episodes => "Episode",
            Table::Podcasts => "Podcast",
            Table::Users => "User",
        }
    }
}

async fn exists(conn: &mut SqliteConnection, table: Table, id: Id) -> RepositoryResult<bool> {
    let row: Option<(Id,)> = sqlx::query_as(table.existence_query())
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(row.is_some())
}

async fn require(conn: &mut SqliteConnection, table: Table, id: Id) -> RepositoryResult<()> {
    if exists(conn, table, id).await? {
        Ok(())
    } else {
        Err(missing(table.entity(), id))
    }
}

async fn user_playlist(conn: &mut SqliteConnection, user_id: Id) -> RepositoryResult<Id> {
    let row: Option<(Id,)> = sqlx::query_as(include_str!("queries/retrieve_user_playlist.sql"))
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?;

    row.map(|(id,)| id)
        .ok_or(RepositoryError::PlaylistNotFound { user_id })
}

async fn count(conn: &mut SqliteConnection, sql: &str) -> RepositoryResult<usize> {
    let (count,): (i64,) = sqlx::query_as(sql).fetch_one(&mut *conn).await?;

    Ok(usize::try_from(count).unwrap_or_default())
}

/// Runs a query keyed by one ID that selects a single ID column.
async fn ids(conn: &mut SqliteConnection, sql: &str, key: Id) -> RepositoryResult<Vec<Id>> {
    let rows: Vec<(Id,)> = sqlx::query_as(sql).bind(key).fetch_all(&mut *conn).await?;

    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// Runs a query selecting (owner ID, ID) pairs and groups the IDs by owner.
async fn grouped_ids(conn: &mut SqliteConnection, sql: &str) -> RepositoryResult<HashMap<Id, Vec<Id>>> {
    let rows: Vec<(Id, Id)> = sqlx::query_as(sql).fetch_all(&mut *conn).await?;

    let mut grouped: HashMap<Id, Vec<Id>> = HashMap::new();
    for (owner, id) in rows {
        grouped.entry(owner).or_default().push(id);
    }

    Ok(grouped)
}

async fn neighbour(conn: &mut SqliteConnection, sql: &str, id: Id) -> RepositoryResult<Option<Id>> {
    let row: Option<(Id,)> = sqlx::query_as(sql)
        .bind(id)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(row.map(|(id,)| id))
}

/// Builds a user from its row and its relationship IDs.
async fn load_user(conn: &mut SqliteConnection, row: Option<(Id, String, String)>) -> RepositoryResult<Option<User>> {
    let (id, username, password) = match row {
        Some(row) => row,
        None => return Ok(None),
    };

    let mut user = User::new(id, username, password)?;

    for subscription_id in ids(conn, include_str!("queries/retrieve_user_subscriptions.sql"), id).await? {
        user.add_subscription(subscription_id);
    }

    for review_id in ids(conn, include_str!("queries/retrieve_user_reviews.sql"), id).await? {
        user.add_review(review_id);
    }

    for playlist_id in ids(conn, include_str!("queries/retrieve_user_playlists.sql"), id).await? {
        user.add_playlist(playlist_id);
    }

    Ok(Some(user))
}

async fn load_episode(conn: &mut SqliteConnection, sql: &str, id: Option<Id>) -> RepositoryResult<Option<Episode>> {
    let mut query = sqlx::query(sql);
    if let Some(id) = id {
        query = query.bind(id);
    }

    let mut episode = match query.fetch_optional(&mut *conn).await? {
        Some(row) => episode_from_row(&row)?,
        None => return Ok(None),
    };

    for review_id in ids(conn, include_str!("queries/retrieve_episode_reviews.sql"), episode.id()).await? {
        episode.add_review(review_id);
    }

    Ok(Some(episode))
}

fn podcast_from_row(row: &SqliteRow) -> RepositoryResult<Podcast> {
    let id: Id = try_get(row, "id")?;
    let author_id: Option<Id> = try_get(row, "author_id")?;
    let author_name: Option<String> = try_get(row, "author_name")?;

    let author = match (author_id, author_name) {
        (Some(author_id), Some(name)) => {
            let mut author = Author::new(author_id, name)?;
            author.add_podcast(id);
            Some(author)
        }
        _ => None,
    };

    let podcast = Podcast::new(id, author, try_get::<String>(row, "title")?)?
        .with_image(try_get(row, "image_url")?)
        .with_description(try_get::<String>(row, "description")?)
        .with_language(try_get::<String>(row, "language")?)
        .with_website(try_get::<String>(row, "website_url")?)
        .with_itunes_id(try_get(row, "itunes_id")?);

    Ok(podcast)
}

fn episode_from_row(row: &SqliteRow) -> RepositoryResult<Episode> {
    Ok(Episode::new(
        try_get(row, "id")?,
        try_get(row, "podcast_id")?,
        try_get::<String>(row, "title")?,
        try_get::<String>(row, "audio_url")?,
        try_get(row, "length")?,
        try_get::<String>(row, "description")?,
        try_get(row, "upload_date")?,
    )?)
}

fn try_get<'a, T: sqlx::Type<Sqlite> + sqlx::Decode<'a, Sqlite>>(
    row: &'a SqliteRow,
    column: &str,
) -> Result<T, sqlx::Error> {
    use sqlx::Row;

    row.try_get(column)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::{author, episode, podcast, user};
    use crate::model::make_category_association;

    async fn repository() -> SqliteRepository {
        let repo = SqliteRepository::connect("sqlite::memory:").await.unwrap();
        repo.create_schema().await.unwrap();

        repo
    }

    /// A database file, for tests that need more than one connection.
    async fn on_disk(dir: &tempfile::TempDir) -> SqliteRepository {
        let url = format!("sqlite://{}", dir.path().join("podlib.db").display());
        let repo = SqliteRepository::connect(&url).await.unwrap();
        repo.create_schema().await.unwrap();

        repo
    }

    async fn seeded() -> SqliteRepository {
        let repo = repository().await;

        repo.add_author(author(1, "Joe Toste")).await.unwrap();
        repo.add_podcast(podcast(1, "D-Hour Radio Network")).await.unwrap();
        repo.add_podcast(podcast(2, "Brian Denny Radio")).await.unwrap();

        for id in [3, 1, 7, 5] {
            repo.add_episode(episode(id, 1, 100 * id)).await.unwrap();
        }

        repo.add_user(user(0, "shyamli")).await.unwrap();

        repo
    }

    #[tokio::test]
    async fn entities_survive_a_session_reset() {
        let repo = seeded().await;
        let mut category = Category::new(1, "Comedy").unwrap();
        let mut expected = podcast(3, "Tech Talk")
            .with_language("English")
            .with_image(Some("https://example.com/image.png".to_owned()))
            .with_itunes_id(Some(12345));
        make_category_association(&mut expected, &mut category).unwrap();

        repo.add_podcast(expected.clone()).await.unwrap();
        repo.add_category(category).await.unwrap();
        repo.reset_session().await.unwrap();

        let podcast = repo.get_podcast(3).await.unwrap().unwrap();
        assert_eq!(podcast, expected);
        assert_eq!(podcast.title(), "Tech Talk");
        assert_eq!(podcast.language(), "English");
        assert_eq!(podcast.image(), Some("https://example.com/image.png"));
        assert_eq!(podcast.itunes_id(), Some(12345));
        assert_eq!(podcast.categories(), &[1]);
        assert_eq!(podcast.author().unwrap().name(), "Joe Toste");

        let stored = repo.get_episode(5).await.unwrap().unwrap();
        let original = episode(5, 1, 500);
        assert_eq!(stored, original);
        assert_eq!(stored.upload_date(), original.upload_date());
        assert_eq!(stored.length(), 500);

        repo.close_session().await.unwrap();
        assert_eq!(repo.get_user("SHYAMLI").await.unwrap().unwrap().username(), "shyamli");
        assert_eq!(repo.get_user_by_id(0).await.unwrap().unwrap(), user(0, "shyamli"));
    }

    #[tokio::test]
    async fn absent_keys_are_none() {
        let repo = repository().await;

        assert!(repo.get_author("Nobody").await.unwrap().is_none());
        assert!(repo.get_podcast(1).await.unwrap().is_none());
        assert!(repo.get_episode(1).await.unwrap().is_none());
        assert!(repo.get_user("nobody").await.unwrap().is_none());
        assert!(repo.get_podcast_subscription(1).await.unwrap().is_none());
        assert!(repo.get_first_episode().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn adding_twice_updates_in_place() {
        let repo = seeded().await;

        repo.add_podcast(podcast(1, "Renamed")).await.unwrap();

        assert_eq!(repo.get_number_of_podcasts().await.unwrap(), 2);
        assert_eq!(repo.get_podcast(1).await.unwrap().unwrap().title(), "Renamed");
    }

    #[tokio::test]
    async fn podcasts_are_listed_by_title_with_relations() {
        let repo = seeded().await;

        let podcasts = repo.get_list_of_podcasts().await.unwrap();
        let titles: Vec<_> = podcasts.iter().map(|p| p.title().to_owned()).collect();

        assert_eq!(titles, vec!["Brian Denny Radio", "D-Hour Radio Network"]);
        assert_eq!(podcasts[1].episodes(), &[1, 3, 5, 7]);
        assert!(podcasts[0].episodes().is_empty());

        let author = repo.get_author("Joe Toste").await.unwrap().unwrap();
        assert_eq!(author.podcasts(), &[1, 2]);

        let found: Vec<_> = repo
            .get_podcasts_by_id(&[2, 9])
            .await
            .unwrap()
            .iter()
            .map(Podcast::id)
            .collect();
        assert_eq!(found, vec![2]);
    }

    #[tokio::test]
    async fn equal_titles_list_later_ids_first() {
        let repo = repository().await;

        repo.add_podcast(podcast(1, "Same")).await.unwrap();
        repo.add_podcast(podcast(2, "Same")).await.unwrap();
        repo.add_podcast(podcast(3, "Another")).await.unwrap();

        let ids: Vec<_> = repo
            .get_list_of_podcasts()
            .await
            .unwrap()
            .iter()
            .map(Podcast::id)
            .collect();

        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[tokio::test]
    async fn orphan_episodes_are_dropped() {
        let repo = seeded().await;

        repo.add_episode(episode(99, 42, 10)).await.unwrap();

        assert_eq!(repo.get_number_of_episodes().await.unwrap(), 4);
        assert!(repo.get_episode(99).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn episode_navigation() {
        let repo = seeded().await;

        assert_eq!(repo.get_first_episode().await.unwrap().unwrap().id(), 1);
        assert_eq!(repo.get_last_episode().await.unwrap().unwrap().id(), 7);

        let middle = episode(3, 1, 0);
        assert_eq!(repo.get_next_episode_id(&middle).await.unwrap(), Some(5));
        assert_eq!(repo.get_previous_episode_id(&middle).await.unwrap(), Some(1));
        assert_eq!(repo.get_next_episode_id(&episode(7, 1, 0)).await.unwrap(), None);
        assert_eq!(repo.get_previous_episode_id(&episode(1, 1, 0)).await.unwrap(), None);
        assert_eq!(repo.get_next_episode_id(&episode(4, 1, 0)).await.unwrap(), None);

        let found: Vec<_> = repo
            .get_episodes_by_id(&[7, 2, 1])
            .await
            .unwrap()
            .iter()
            .map(Episode::id)
            .collect();
        assert_eq!(found, vec![7, 1]);
    }

    #[tokio::test]
    async fn filters_by_category_and_language() {
        let repo = seeded().await;

        let mut category = Category::new(1, "Comedy").unwrap();
        category.add_podcast(2);
        category.add_podcast(1);
        repo.add_category(category).await.unwrap();
        repo.add_podcast(podcast(3, "Auf Deutsch").with_language("German")).await.unwrap();

        assert_eq!(repo.get_podcast_ids_by_category("Comedy").await.unwrap(), vec![2, 1]);
        assert!(repo.get_podcast_ids_by_category("Drama").await.unwrap().is_empty());
        assert_eq!(repo.get_podcast_ids_by_language("German").await.unwrap(), vec![3]);

        let categories = repo.get_categories().await.unwrap();
        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].number_of_tagged_podcasts(), 2);
    }

    #[tokio::test]
    async fn reviews_are_linked_on_read() {
        let repo = seeded().await;
        let review = Review::new(0, 0, 5, "Great", Some(1), Some(3), OffsetDateTime::UNIX_EPOCH).unwrap();

        repo.add_review(review).await.unwrap();

        let reviews = repo.get_reviews().await.unwrap();
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].rating(), 5);
        assert_eq!(reviews[0].content(), "Great");
        assert_eq!(repo.get_number_of_reviews().await.unwrap(), 1);
        assert_eq!(repo.get_user("shyamli").await.unwrap().unwrap().reviews(), &[0]);
        assert_eq!(repo.get_episode(3).await.unwrap().unwrap().reviews(), &[0]);

        let orphan = Review::new(1, 8, 5, "Great", None, Some(3), OffsetDateTime::UNIX_EPOCH).unwrap();
        assert!(matches!(
            repo.add_review(orphan).await,
            Err(RepositoryError::Constraint(_))
        ));
        assert_eq!(repo.get_number_of_reviews().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn new_reviews_take_the_next_id() {
        let repo = seeded().await;
        let timestamp = OffsetDateTime::UNIX_EPOCH;

        repo.add_review(Review::new(0, 0, 5, "Great", Some(1), Some(3), timestamp).unwrap())
            .await
            .unwrap();

        let review = repo
            .add_new_review(Review::new(0, 0, 3, "Fine", Some(1), Some(1), timestamp).unwrap())
            .await
            .unwrap();

        assert_eq!(review.id(), 1);
        assert_eq!(review.content(), "Fine");
        assert_eq!(repo.get_episode(1).await.unwrap().unwrap().reviews(), &[1]);

        let orphan = Review::new(0, 8, 5, "Great", None, Some(3), timestamp).unwrap();
        assert!(matches!(
            repo.add_new_review(orphan).await,
            Err(RepositoryError::Constraint(_))
        ));
        assert_eq!(repo.get_number_of_reviews().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn new_users_get_ids_and_a_playlist() {
        let repo = repository().await;

        let mario = repo.add_new_user(user(5, "mario"), "Mine").await.unwrap().unwrap();
        let luigi = repo.add_new_user(user(5, "luigi"), "Mine").await.unwrap().unwrap();

        assert_eq!((mario.id(), luigi.id()), (0, 1));
        assert_eq!(luigi.playlists(), &[1]);
        assert_eq!(repo.get_user("luigi").await.unwrap().unwrap().playlists(), &[1]);

        assert!(repo.add_new_user(user(0, "Mario"), "Mine").await.unwrap().is_none());
        assert_eq!(repo.get_number_of_users().await.unwrap(), 2);

        let playlists = repo.get_playlists().await.unwrap();
        assert_eq!(playlists.len(), 2);
        assert_eq!((playlists[1].owner(), playlists[1].title()), (1, "Mine"));
    }

    #[tokio::test]
    async fn concurrent_new_users_get_distinct_ids() {
        let dir = tempfile::tempdir().unwrap();
        let repo = on_disk(&dir).await;
        let (first, second) = (repo.open_session(), repo.open_session());

        let (mario, luigi) = tokio::join!(
            first.add_new_user(user(0, "mario"), "Mine"),
            second.add_new_user(user(0, "luigi"), "Mine"),
        );

        let mut ids = vec![mario.unwrap().unwrap().id(), luigi.unwrap().unwrap().id()];
        ids.sort_unstable();

        assert_eq!(ids, vec![0, 1]);
        assert_eq!(repo.get_number_of_users().await.unwrap(), 2);
        assert_eq!(repo.get_playlists().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn sessions_keep_their_own_connection() {
        let dir = tempfile::tempdir().unwrap();
        let repo = on_disk(&dir).await;
        let first = SqliteRepository::new(repo.pool().clone());
        let second = SqliteRepository::new(repo.pool().clone());

        first.reset_session().await.unwrap();

        // temporary tables are only visible on the connection that made them
        sqlx::query("CREATE TEMP TABLE marker (id INTEGER)")
            .execute(&mut *first.session.acquire().await.unwrap())
            .await
            .unwrap();

        second.reset_session().await.unwrap();
        assert_eq!(second.get_number_of_podcasts().await.unwrap(), 0);
        second.close_session().await.unwrap();

        let (markers,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM marker")
            .fetch_one(&mut *first.session.acquire().await.unwrap())
            .await
            .unwrap();
        assert_eq!(markers, 0);

        first.close_session().await.unwrap();
    }

    #[tokio::test]
    async fn subscriptions_round_trip() {
        let repo = seeded().await;

        assert!(repo
            .add_podcast_subscription(PodcastSubscription::new(1, 4, 1).unwrap())
            .await
            .is_err());

        let subscription = PodcastSubscription::new(1, 0, 2).unwrap();
        repo.add_podcast_subscription(subscription.clone()).await.unwrap();

        assert_eq!(repo.get_podcast_subscription(1).await.unwrap(), Some(subscription));
        assert_eq!(repo.get_user("shyamli").await.unwrap().unwrap().subscriptions(), &[1]);
    }

    #[tokio::test]
    async fn playlist_mutation() {
        let repo = seeded().await;
        let owner = repo.get_user("shyamli").await.unwrap().unwrap();
        let first = episode(1, 1, 100);
        let second = episode(3, 1, 300);

        assert!(matches!(
            repo.remove_episode_from_playlist(&owner, &first).await,
            Err(RepositoryError::PlaylistNotFound { user_id: 0 })
        ));

        repo.add_playlist(Playlist::new(0, 0, "My Personal Playlist").unwrap())
            .await
            .unwrap();
        repo.add_episode_to_playlist(&owner, &second).await.unwrap();
        repo.add_episode_to_playlist(&owner, &first).await.unwrap();
        repo.add_episode_to_playlist(&owner, &first).await.unwrap();

        let playlists = repo.get_playlists().await.unwrap();
        let ids: Vec<_> = playlists[0].episodes().iter().map(Episode::id).collect();
        assert_eq!(ids, vec![3, 1]);
        assert_eq!(playlists[0].total_runtime(), 400);

        repo.remove_episode_from_playlist(&owner, &second).await.unwrap();
        assert!(matches!(
            repo.remove_episode_from_playlist(&owner, &second).await,
            Err(RepositoryError::EpisodeNotInPlaylist { episode_id: 3 })
        ));

        assert!(repo.get_episode(3).await.unwrap().is_some());
        assert_eq!(repo.get_playlists().await.unwrap()[0].len(), 1);
    }

    #[tokio::test]
    async fn clear_removes_everything() {
        let repo = seeded().await;

        repo.clear().await.unwrap();

        assert_eq!(repo.get_number_of_podcasts().await.unwrap(), 0);
        assert_eq!(repo.get_number_of_episodes().await.unwrap(), 0);
        assert_eq!(repo.get_number_of_users().await.unwrap(), 0);
    }
}
