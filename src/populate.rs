use std::path::Path;

use log::{debug, info, Logger};

use crate::datareader::CsvDataReader;
use crate::errors::BackendError;
use crate::repository::Repository;

/// How many entities of each kind were read from the seed files.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub authors: usize,
    pub podcasts: usize,
    pub episodes: usize,
    pub categories: usize,
}

/// Reads the seed files in `data_path` and adds their entities to the
/// repository.
///
/// Authors go first, then podcasts, so that episodes can find their podcast,
/// then episodes and finally categories.
pub async fn populate(
    data_path: &Path,
    repo: &(dyn Repository + Send + Sync),
    logger: &Logger,
) -> Result<Summary, BackendError> {
    debug!(logger, "Reading seed data"; "data_path" => %data_path.display());

    let data = CsvDataReader::new(data_path).read()?;

    let summary = Summary {
        authors: data.authors.len(),
        podcasts: data.podcasts.len(),
        episodes: data.episodes.len(),
        categories: data.categories.len(),
    };

    for author in data.authors {
        repo.add_author(author).await?;
    }

    for podcast in data.podcasts {
        repo.add_podcast(podcast).await?;
    }

    for episode in data.episodes {
        if repo.get_podcast(episode.podcast()).await?.is_none() {
            debug!(logger, "Dropping orphan episode"; "episode_id" => episode.id(), "podcast_id" => episode.podcast());
        }

        repo.add_episode(episode).await?;
    }

    for category in data.categories {
        repo.add_category(category).await?;
    }

    info!(
        logger,
        "Populated repository";
        "authors" => summary.authors,
        "podcasts" => summary.podcasts,
        "episodes" => summary.episodes,
        "categories" => summary.categories
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use log::discard_logger;

    use super::*;
    use crate::datareader::MISSING_AUTHOR_NAME;
    use crate::repository::{MemoryRepository, SqliteRepository};

    fn sample() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/data")
    }

    async fn check(repo: &(dyn Repository + Send + Sync)) {
        let summary = populate(&sample(), repo, &discard_logger()).await.unwrap();

        assert_eq!(
            summary,
            Summary {
                authors: 3,
                podcasts: 4,
                episodes: 6,
                categories: 6,
            }
        );

        assert_eq!(repo.get_number_of_podcasts().await.unwrap(), 4);
        // the episode of podcast 99 is dropped
        assert_eq!(repo.get_number_of_episodes().await.unwrap(), 5);
        assert_eq!(repo.get_categories().await.unwrap().len(), 6);

        let podcast = repo.get_podcast(2).await.unwrap().unwrap();
        assert_eq!(podcast.author().unwrap().name(), "Brian Denny");
        assert_eq!(podcast.episodes(), &[3, 5]);
        assert_eq!(podcast.categories().len(), 2);

        let author = repo.get_author(MISSING_AUTHOR_NAME).await.unwrap().unwrap();
        assert_eq!(author.podcasts(), &[3]);

        assert_eq!(
            repo.get_podcast_ids_by_category("Society & Culture").await.unwrap(),
            vec![2, 1]
        );
        assert_eq!(repo.get_podcast_ids_by_language("Deutsch").await.unwrap(), vec![4]);
    }

    #[tokio::test]
    async fn populates_memory() {
        check(&MemoryRepository::new()).await;
    }

    #[tokio::test]
    async fn populates_sqlite() {
        let repo = SqliteRepository::connect("sqlite::memory:").await.unwrap();
        repo.create_schema().await.unwrap();

        check(&repo).await;
    }
}
