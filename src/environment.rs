use std::sync::Arc;

use log::Logger;

use crate::repository::Repo;
use crate::sessions::SessionStore;

/// Everything a request handler needs, cloned into each route.
#[derive(Clone)]
pub struct Environment {
    pub logger: Arc<Logger>,
    pub repo: Arc<Repo>,
    pub sessions: Arc<SessionStore>,
    pub config: Config,
}

impl Environment {
    pub fn new(logger: Arc<Logger>, repo: Arc<Repo>, sessions: Arc<SessionStore>, config: Config) -> Self {
        Self {
            logger,
            repo,
            sessions,
            config,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    pub(crate) podcasts_per_page: usize,
    pub(crate) episodes_per_page: usize,
    pub(crate) reviews_per_page: usize,
    pub(crate) random_podcasts: usize,
}

impl Config {
    pub fn new(podcasts_per_page: usize, episodes_per_page: usize, reviews_per_page: usize, random_podcasts: usize) -> Self {
        Self {
            podcasts_per_page,
            episodes_per_page,
            reviews_per_page,
            random_podcasts,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::new(15, 6, 6, 5)
    }
}
