use serde::Deserialize;

use crate::model::Id;
use crate::services::podcasts::SearchFilter;

#[derive(Clone, Copy, Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<usize>,
}

impl PageQuery {
    pub fn page(&self) -> usize {
        self.page.unwrap_or(1)
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub filter: SearchFilter,
    pub page: Option<usize>,
}

#[derive(Clone, Copy, Debug, Default, Deserialize)]
pub struct PlaylistQuery {
    #[serde(default)]
    pub shuffle: bool,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RegistrationForm {
    #[serde(deserialize_with = "crate::normalization::deserialize")]
    pub user_name: String,
    pub password: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct LoginForm {
    #[serde(deserialize_with = "crate::normalization::deserialize")]
    pub user_name: String,
    pub password: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ReviewForm {
    pub podcast_id: Id,
    pub episode_id: Id,
    pub review: String,
    pub rating: i64,
}
