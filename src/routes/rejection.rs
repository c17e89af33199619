use serde::Serialize;
use warp::reject;

use crate::errors::BackendError;
use crate::model::Id;

#[derive(Debug)]
pub struct Rejection {
    pub(crate) context: Context,
    pub(crate) error: BackendError,
}

impl Rejection {
    pub fn new(context: Context, error: BackendError) -> Self {
        Rejection { context, error }
    }

    pub fn flatten(&self) -> FlattenedRejection {
        FlattenedRejection {
            context: self.context.clone(),
            message: format!("{}", self.error),
        }
    }
}

impl reject::Reject for Rejection {}

#[derive(Debug, Serialize)]
pub struct FlattenedRejection {
    #[serde(flatten)]
    pub(crate) context: Context,
    pub(crate) message: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum Context {
    Episode { podcast_id: Id, episode_id: Id },
    Login { user_name: String },
    PlaylistEpisode { episode_id: Id },
    PlaylistPodcast { podcast_id: Id },
    Podcast { podcast_id: Id },
    Podcasts { page: usize },
    Register { user_name: String },
    Review { podcast_id: Id, episode_id: Id },
    Search { query: String },
    Categories,
    Home,
    Logout,
    Playlist,
}

impl Context {
    pub fn categories() -> Context {
        Context::Categories
    }

    pub fn episode(podcast_id: Id, episode_id: Id) -> Context {
        Context::Episode {
            podcast_id,
            episode_id,
        }
    }

    pub fn home() -> Context {
        Context::Home
    }

    pub fn login(user_name: String) -> Context {
        Context::Login { user_name }
    }

    pub fn logout() -> Context {
        Context::Logout
    }

    pub fn playlist() -> Context {
        Context::Playlist
    }

    pub fn playlist_episode(episode_id: Id) -> Context {
        Context::PlaylistEpisode { episode_id }
    }

    pub fn playlist_podcast(podcast_id: Id) -> Context {
        Context::PlaylistPodcast { podcast_id }
    }

    pub fn podcast(podcast_id: Id) -> Context {
        Context::Podcast { podcast_id }
    }

    pub fn podcasts(page: usize) -> Context {
        Context::Podcasts { page }
    }

    pub fn register(user_name: String) -> Context {
        Context::Register { user_name }
    }

    pub fn review(podcast_id: Id, episode_id: Id) -> Context {
        Context::Review {
            podcast_id,
            episode_id,
        }
    }

    pub fn search(query: String) -> Context {
        Context::Search { query }
    }
}
