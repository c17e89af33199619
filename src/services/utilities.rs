use rand::seq::SliceRandom;
use rand::thread_rng;

use super::podcasts::{summarize, PodcastSummary};
use crate::errors::BackendError;
use crate::repository::Repo;

pub async fn get_category_names(repo: &Repo) -> Result<Vec<String>, BackendError> {
    Ok(repo
        .get_categories()
        .await?
        .into_iter()
        .map(|category| category.name().to_owned())
        .collect())
}

/// Up to `quantity` distinct podcasts picked at random.
pub async fn get_random_podcasts(quantity: usize, repo: &Repo) -> Result<Vec<PodcastSummary>, BackendError> {
    let podcasts = repo.get_list_of_podcasts().await?;

    let picked = podcasts
        .choose_multiple(&mut thread_rng(), quantity)
        .cloned()
        .collect();

    summarize(picked, repo).await
}
