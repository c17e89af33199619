use std::collections::HashMap;

use serde::Serialize;
use time::OffsetDateTime;

use crate::errors::BackendError;
use crate::model::review::{MAX_RATING, MIN_RATING};
use crate::model::{Episode, Id, Review};
use crate::repository::Repo;

pub const MIN_REVIEW_LENGTH: usize = 4;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReviewView {
    pub review_id: Id,
    pub user_name: String,
    pub rating: i64,
    pub content: String,
    pub podcast_id: Option<Id>,
    pub episode_id: Option<Id>,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EpisodeView {
    pub id: Id,
    pub podcast_id: Id,
    pub title: String,
    pub audio: String,
    pub length: i64,
    pub description: String,
    #[serde(with = "time::serde::rfc3339")]
    pub upload_date: OffsetDateTime,
    pub reviews: Vec<ReviewView>,
}

/// The IDs of the episodes either side of another one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Neighbours {
    pub previous: Option<Id>,
    pub next: Option<Id>,
}

/// Reviews an episode on behalf of a user. The review takes the next free ID.
pub async fn add_review(
    podcast_id: Id,
    episode_id: Id,
    review_text: &str,
    user_name: &str,
    rating: i64,
    repo: &Repo,
) -> Result<(), BackendError> {
    let podcast = repo
        .get_podcast(podcast_id)
        .await?
        .ok_or(BackendError::NonExistentPodcast(podcast_id))?;

    let episode = repo
        .get_episode(episode_id)
        .await?
        .filter(|episode| episode.podcast() == podcast_id)
        .ok_or(BackendError::NonExistentEpisode(episode_id))?;

    let user = repo.get_user(user_name).await?.ok_or(BackendError::UnknownUser)?;

    // the repository replaces the ID with the next free one as it stores it
    let review = Review::new(
        0,
        user.id(),
        rating,
        review_text,
        Some(podcast.id()),
        Some(episode.id()),
        OffsetDateTime::now_utc(),
    )?;

    repo.add_new_review(review).await?;

    Ok(())
}

/// Checks review input from the web form.
pub fn validate_review(review_text: &str, rating: i64) -> Result<(), BackendError> {
    if review_text.trim().chars().count() < MIN_REVIEW_LENGTH {
        return Err(BackendError::InvalidForm(format!(
            "Your review must be at least {} characters long",
            MIN_REVIEW_LENGTH
        )));
    }

    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(BackendError::InvalidForm(format!(
            "Your rating must be between {} and {}",
            MIN_RATING, MAX_RATING
        )));
    }

    Ok(())
}

pub async fn get_episode(episode_id: Id, repo: &Repo) -> Result<EpisodeView, BackendError> {
    let episode = repo
        .get_episode(episode_id)
        .await?
        .ok_or(BackendError::NonExistentEpisode(episode_id))?;

    let mut views = episode_views(vec![episode], repo).await?;

    views.pop().ok_or(BackendError::NonExistentEpisode(episode_id))
}

/// Reviews of an episode, oldest first.
pub async fn get_reviews_for_episode(episode_id: Id, repo: &Repo) -> Result<Vec<ReviewView>, BackendError> {
    if repo.get_episode(episode_id).await?.is_none() {
        return Err(BackendError::NonExistentEpisode(episode_id));
    }

    let reviews = repo
        .get_reviews()
        .await?
        .into_iter()
        .filter(|review| review.episode() == Some(episode_id))
        .collect();

    review_views(reviews, repo).await
}

pub async fn get_neighbours(episode_id: Id, repo: &Repo) -> Result<Neighbours, BackendError> {
    let episode = repo
        .get_episode(episode_id)
        .await?
        .ok_or(BackendError::NonExistentEpisode(episode_id))?;

    Ok(Neighbours {
        previous: repo.get_previous_episode_id(&episode).await?,
        next: repo.get_next_episode_id(&episode).await?,
    })
}

/// Builds views for a batch of episodes with one pass over the stored
/// reviews.
pub(crate) async fn episode_views(episodes: Vec<Episode>, repo: &Repo) -> Result<Vec<EpisodeView>, BackendError> {
    let reviews = repo.get_reviews().await?;
    let mut by_episode: HashMap<Id, Vec<ReviewView>> = HashMap::new();

    for view in review_views(reviews, repo).await? {
        if let Some(episode_id) = view.episode_id {
            by_episode.entry(episode_id).or_default().push(view);
        }
    }

    Ok(episodes
        .into_iter()
        .map(|episode| EpisodeView {
            id: episode.id(),
            podcast_id: episode.podcast(),
            title: episode.title().to_owned(),
            audio: episode.audio().to_owned(),
            length: episode.length(),
            description: episode.description().to_owned(),
            upload_date: episode.upload_date(),
            reviews: by_episode.remove(&episode.id()).unwrap_or_default(),
        })
        .collect())
}

async fn review_views(reviews: Vec<Review>, repo: &Repo) -> Result<Vec<ReviewView>, BackendError> {
    let mut user_names: HashMap<Id, String> = HashMap::new();
    let mut views = Vec::with_capacity(reviews.len());

    for review in reviews {
        let user_name = match user_names.get(&review.user()) {
            Some(name) => name.clone(),
            None => {
                let user = repo
                    .get_user_by_id(review.user())
                    .await?
                    .ok_or(BackendError::UnknownUser)?;
                user_names.insert(user.id(), user.username().to_owned());
                user.username().to_owned()
            }
        };

        views.push(ReviewView {
            review_id: review.id(),
            user_name,
            rating: review.rating(),
            content: review.content().to_owned(),
            podcast_id: review.podcast(),
            episode_id: review.episode(),
            timestamp: review.timestamp(),
        });
    }

    Ok(views)
}
