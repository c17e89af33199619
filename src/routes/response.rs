use serde::Serialize;

use crate::model::Id;
use crate::services::authentication::UserView;
use crate::services::episodes::{EpisodeView, ReviewView};
use crate::services::playlist::PlaylistView;
use crate::services::podcasts::{PodcastSummary, PodcastView, SearchFilter};
use crate::services::Page;

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum SuccessResponse<'a> {
    Categories {
        categories: Vec<String>,
    },
    Episode {
        podcast: PodcastSummary,
        episode: EpisodeView,
        previous: Option<Id>,
        next: Option<Id>,
        reviews: Page<ReviewView>,
    },
    Healthz {
        name: &'a str,
        revision: Option<&'a str>,
        timestamp: Option<&'a str>,
        version: &'a str,
    },
    Home {
        podcast_count: usize,
        categories: Vec<String>,
        podcasts: Vec<PodcastSummary>,
    },
    Playlist(PlaylistView),
    PlaylistPodcast {
        added: usize,
        playlist: PlaylistView,
    },
    Podcast {
        podcast: PodcastView,
        episodes: Page<EpisodeView>,
    },
    Podcasts(Page<PodcastSummary>),
    Reviews {
        episode_id: Id,
        reviews: Vec<ReviewView>,
    },
    Search {
        query: String,
        filter: SearchFilter,
        results: Page<PodcastSummary>,
    },
    User(UserView),
}
