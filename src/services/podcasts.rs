use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::episodes::{episode_views, EpisodeView};
use super::Page;
use crate::errors::BackendError;
use crate::model::{Id, Podcast};
use crate::repository::Repo;

const CATEGORY_SEPARATOR: &str = " | ";

/// What a search query is matched against.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchFilter {
    Title,
    Category,
    Author,
}

impl Default for SearchFilter {
    fn default() -> Self {
        SearchFilter::Title
    }
}

/// A podcast with its relationships resolved for display.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PodcastView {
    pub id: Id,
    pub author: Option<String>,
    pub title: String,
    pub image: Option<String>,
    pub description: String,
    pub website: String,
    pub itunes_id: Option<i64>,
    pub language: String,
    /// Category names joined with `" | "`.
    pub categories: String,
    pub episodes: Vec<EpisodeView>,
}

/// The fields shown when podcasts are listed.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PodcastSummary {
    pub id: Id,
    pub author: Option<String>,
    pub title: String,
    pub image: Option<String>,
    pub language: String,
    pub categories: String,
}

pub async fn get_number_of_podcasts(repo: &Repo) -> Result<usize, BackendError> {
    Ok(repo.get_number_of_podcasts().await?)
}

/// The listing fields of one podcast, without its episodes.
pub async fn get_podcast_summary(podcast_id: Id, repo: &Repo) -> Result<PodcastSummary, BackendError> {
    let podcast = repo
        .get_podcast(podcast_id)
        .await?
        .ok_or(BackendError::NonExistentPodcast(podcast_id))?;

    let mut summaries = summarize(vec![podcast], repo).await?;

    summaries.pop().ok_or(BackendError::NonExistentPodcast(podcast_id))
}

pub async fn get_podcast(podcast_id: Id, repo: &Repo) -> Result<PodcastView, BackendError> {
    let podcast = repo
        .get_podcast(podcast_id)
        .await?
        .ok_or(BackendError::NonExistentPodcast(podcast_id))?;

    let names = category_names(repo).await?;
    let episodes = repo.get_episodes_by_id(podcast.episodes()).await?;
    let episodes = episode_views(episodes, repo).await?;

    Ok(PodcastView {
        id: podcast.id(),
        author: author_name(&podcast),
        title: podcast.title().to_owned(),
        image: podcast.image().map(str::to_owned),
        description: podcast.description().to_owned(),
        website: podcast.website().to_owned(),
        itunes_id: podcast.itunes_id(),
        language: podcast.language().to_owned(),
        categories: join_categories(&podcast, &names),
        episodes,
    })
}

/// One page of all podcasts in title order.
pub async fn get_podcast_page(page: usize, per_page: usize, repo: &Repo) -> Result<Page<PodcastSummary>, BackendError> {
    let podcasts = repo.get_list_of_podcasts().await?;

    Ok(Page::of(summarize(podcasts, repo).await?, page, per_page))
}

/// Podcasts whose title, category names or author name contain `query`,
/// ignoring case, in title order.
pub async fn search_podcasts(query: &str, filter: SearchFilter, repo: &Repo) -> Result<Vec<PodcastSummary>, BackendError> {
    let query = query.trim().to_lowercase();
    let names = category_names(repo).await?;

    let is_match = |podcast: &Podcast| match filter {
        SearchFilter::Title => podcast.title().to_lowercase().contains(&query),
        SearchFilter::Category => podcast
            .categories()
            .iter()
            .filter_map(|id| names.get(id))
            .any(|name| name.to_lowercase().contains(&query)),
        SearchFilter::Author => podcast
            .author()
            .map_or(false, |author| author.name().to_lowercase().contains(&query)),
    };

    let podcasts = repo
        .get_list_of_podcasts()
        .await?
        .into_iter()
        .filter(|podcast| is_match(podcast))
        .collect::<Vec<_>>();

    Ok(summarize_with(&podcasts, &names))
}

pub(crate) async fn summarize(podcasts: Vec<Podcast>, repo: &Repo) -> Result<Vec<PodcastSummary>, BackendError> {
    let names = category_names(repo).await?;

    Ok(summarize_with(&podcasts, &names))
}

fn summarize_with(podcasts: &[Podcast], names: &HashMap<Id, String>) -> Vec<PodcastSummary> {
    podcasts
        .iter()
        .map(|podcast| PodcastSummary {
            id: podcast.id(),
            author: author_name(podcast),
            title: podcast.title().to_owned(),
            image: podcast.image().map(str::to_owned),
            language: podcast.language().to_owned(),
            categories: join_categories(podcast, names),
        })
        .collect()
}

async fn category_names(repo: &Repo) -> Result<HashMap<Id, String>, BackendError> {
    Ok(repo
        .get_categories()
        .await?
        .into_iter()
        .map(|category| (category.id(), category.name().to_owned()))
        .collect())
}

fn author_name(podcast: &Podcast) -> Option<String> {
    podcast.author().map(|author| author.name().to_owned())
}

fn join_categories(podcast: &Podcast, names: &HashMap<Id, String>) -> String {
    podcast
        .categories()
        .iter()
        .filter_map(|id| names.get(id).map(String::as_str))
        .collect::<Vec<_>>()
        .join(CATEGORY_SEPARATOR)
}
