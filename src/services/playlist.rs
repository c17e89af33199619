use std::collections::HashMap;

use serde::Serialize;

use crate::errors::{BackendError, RepositoryError};
use crate::model::{Episode, Id, Playlist, User};
use crate::repository::Repo;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PlaylistEntry {
    pub id: Id,
    pub title: String,
    pub audio: String,
    pub length: i64,
}

/// The episodes of one podcast, in playlist order.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PlaylistGroup {
    pub podcast_id: Id,
    pub podcast_title: String,
    pub episodes: Vec<PlaylistEntry>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PlaylistView {
    pub id: Id,
    pub title: String,
    pub total_runtime: i64,
    pub podcasts: Vec<PlaylistGroup>,
}

pub async fn add_episode_to_playlist(user_name: &str, episode_id: Id, repo: &Repo) -> Result<(), BackendError> {
    let user = user(user_name, repo).await?;
    let episode = repo
        .get_episode(episode_id)
        .await?
        .ok_or(BackendError::NonExistentEpisode(episode_id))?;

    repo.add_episode_to_playlist(&user, &episode).await?;

    Ok(())
}

/// Adds every episode of a podcast, returning how many were not already in
/// the playlist.
pub async fn add_podcast_to_playlist(user_name: &str, podcast_id: Id, repo: &Repo) -> Result<usize, BackendError> {
    let user = user(user_name, repo).await?;
    let podcast = repo
        .get_podcast(podcast_id)
        .await?
        .ok_or(BackendError::NonExistentPodcast(podcast_id))?;

    let playlist = playlist_of(&user, repo).await?;
    let mut added = 0;

    for episode in repo.get_episodes_by_id(podcast.episodes()).await? {
        if !playlist.contains(episode.id()) {
            repo.add_episode_to_playlist(&user, &episode).await?;
            added += 1;
        }
    }

    Ok(added)
}

pub async fn remove_episode_from_playlist(user_name: &str, episode_id: Id, repo: &Repo) -> Result<(), BackendError> {
    let user = user(user_name, repo).await?;
    let episode = repo
        .get_episode(episode_id)
        .await?
        .ok_or(BackendError::NonExistentEpisode(episode_id))?;

    repo.remove_episode_from_playlist(&user, &episode).await?;

    Ok(())
}

/// The user's playlist grouped by podcast. Groups appear in the order their
/// first episode does; `shuffle` reorders the episodes first without
/// touching the stored playlist.
pub async fn get_playlist(user_name: &str, shuffle: bool, repo: &Repo) -> Result<PlaylistView, BackendError> {
    let user = user(user_name, repo).await?;
    let playlist = playlist_of(&user, repo).await?;

    let episodes = if shuffle {
        playlist.shuffled()
    } else {
        playlist.episodes().to_vec()
    };

    let mut podcast_ids: Vec<Id> = vec![];
    for episode in &episodes {
        if !podcast_ids.contains(&episode.podcast()) {
            podcast_ids.push(episode.podcast());
        }
    }

    let titles: HashMap<Id, String> = repo
        .get_podcasts_by_id(&podcast_ids)
        .await?
        .into_iter()
        .map(|podcast| (podcast.id(), podcast.title().to_owned()))
        .collect();

    let mut groups: Vec<PlaylistGroup> = podcast_ids
        .iter()
        .map(|id| PlaylistGroup {
            podcast_id: *id,
            podcast_title: titles.get(id).cloned().unwrap_or_default(),
            episodes: vec![],
        })
        .collect();

    for episode in episodes {
        if let Some(group) = groups.iter_mut().find(|group| group.podcast_id == episode.podcast()) {
            group.episodes.push(entry(episode));
        }
    }

    Ok(PlaylistView {
        id: playlist.id(),
        title: playlist.title().to_owned(),
        total_runtime: playlist.total_runtime(),
        podcasts: groups,
    })
}

async fn user(user_name: &str, repo: &Repo) -> Result<User, BackendError> {
    repo.get_user(user_name).await?.ok_or(BackendError::UnknownUser)
}

async fn playlist_of(user: &User, repo: &Repo) -> Result<Playlist, BackendError> {
    let user_id = user.id();

    repo.get_playlists()
        .await?
        .into_iter()
        .find(|playlist| playlist.owner() == user_id)
        .ok_or_else(|| RepositoryError::PlaylistNotFound { user_id }.into())
}

fn entry(episode: Episode) -> PlaylistEntry {
    PlaylistEntry {
        id: episode.id(),
        title: episode.title().to_owned(),
        audio: episode.audio().to_owned(),
        length: episode.length(),
    }
}
