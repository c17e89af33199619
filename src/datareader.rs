//! Builds the seed entities from `podcasts.csv` and `episodes.csv`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, Trim};
use time::format_description::FormatItem;
use time::macros::format_description;
use time::OffsetDateTime;

use crate::errors::{DataReaderError, ModelError};
use crate::model::{self, Author, Category, Episode, Id, Podcast};

pub const PODCASTS_FILE: &str = "podcasts.csv";
pub const EPISODES_FILE: &str = "episodes.csv";

/// The ID reserved for podcasts without an author.
pub const MISSING_AUTHOR_ID: Id = 1;
pub const MISSING_AUTHOR_NAME: &str = "MISSING: No Author provided";

const UPLOAD_DATE_FORMAT: &[FormatItem<'static>] = format_description!(
    "[year]-[month]-[day] [hour]:[minute]:[second][offset_hour sign:mandatory][offset_minute]"
);

/// Everything read from the seed files, in insertion order.
#[derive(Debug, Default)]
pub struct SeedData {
    pub authors: Vec<Author>,
    pub podcasts: Vec<Podcast>,
    pub episodes: Vec<Episode>,
    pub categories: Vec<Category>,
}

pub struct CsvDataReader {
    podcasts_path: PathBuf,
    episodes_path: PathBuf,
}

impl CsvDataReader {
    /// Reads `podcasts.csv` and `episodes.csv` from the directory.
    pub fn new(data_path: impl AsRef<Path>) -> Self {
        let data_path = data_path.as_ref();

        CsvDataReader::with_files(data_path.join(PODCASTS_FILE), data_path.join(EPISODES_FILE))
    }

    pub fn with_files(podcasts_path: impl Into<PathBuf>, episodes_path: impl Into<PathBuf>) -> Self {
        CsvDataReader {
            podcasts_path: podcasts_path.into(),
            episodes_path: episodes_path.into(),
        }
    }

    pub fn read(&self) -> Result<SeedData, DataReaderError> {
        let mut data = SeedData::default();

        self.read_podcasts(&mut data)?;
        self.read_episodes(&mut data)?;

        Ok(data)
    }

    fn read_podcasts(&self, data: &mut SeedData) -> Result<(), DataReaderError> {
        let file = File::new(&self.podcasts_path);

        let missing_author = Author::new(MISSING_AUTHOR_ID, MISSING_AUTHOR_NAME).map_err(|e| file.invalid(0, e))?;
        let mut author_ids: HashMap<String, Id> = HashMap::new();
        let mut authors = vec![missing_author.clone()];

        // category names in first-seen order, with the podcasts they tag
        let mut category_names: Vec<String> = vec![];
        let mut tagged: HashMap<String, Vec<Id>> = HashMap::new();

        for (line, record) in file.records()? {
            let author = match field(&record, 7) {
                "" => missing_author.clone(),
                name => {
                    let next_id = MISSING_AUTHOR_ID + 1 + author_ids.len() as Id;
                    let id = *author_ids.entry(name.to_owned()).or_insert(next_id);

                    if id == next_id {
                        authors.push(Author::new(id, name).map_err(|e| file.invalid(line, e))?);
                    }

                    Author::new(id, name).map_err(|e| file.invalid(line, e))?
                }
            };

            let id = file.parse_id(line, &record, 0, "id")?;
            let image = Some(field(&record, 2)).filter(|s| !s.is_empty()).map(str::to_owned);
            let language = match field(&record, 4) {
                "" => model::podcast::DEFAULT_LANGUAGE,
                language => language,
            };
            let itunes_id = match field(&record, 8) {
                "" => None,
                _ => Some(file.parse_id(line, &record, 8, "itunes_id")?),
            };

            let podcast = Podcast::new(id, Some(author), field(&record, 1))
                .map_err(|e| file.invalid(line, e))?
                .with_image(image)
                .with_description(field(&record, 3))
                .with_language(language)
                .with_website(field(&record, 6))
                .with_itunes_id(itunes_id);

            for name in field(&record, 5).split('|').map(str::trim).filter(|s| !s.is_empty()) {
                let podcasts = tagged.entry(name.to_owned()).or_insert_with(|| {
                    category_names.push(name.to_owned());
                    vec![]
                });

                if !podcasts.contains(&id) {
                    podcasts.push(id);
                }
            }

            data.podcasts.push(podcast);
        }

        let positions: HashMap<Id, usize> = data
            .podcasts
            .iter()
            .enumerate()
            .map(|(position, podcast)| (podcast.id(), position))
            .collect();

        for (index, name) in category_names.into_iter().enumerate() {
            let mut category = Category::new(index as Id + 1, &name).map_err(|e| file.invalid(0, e))?;

            for podcast_id in tagged.remove(&name).unwrap_or_default() {
                if let Some(at) = positions.get(&podcast_id) {
                    model::make_category_association(&mut data.podcasts[*at], &mut category)
                        .map_err(|e| file.invalid(0, e))?;
                }
            }

            data.categories.push(category);
        }

        data.authors = authors;

        Ok(())
    }

    fn read_episodes(&self, data: &mut SeedData) -> Result<(), DataReaderError> {
        let file = File::new(&self.episodes_path);

        for (line, record) in file.records()? {
            let id = file.parse_id(line, &record, 0, "id")?;
            let podcast_id = file.parse_id(line, &record, 1, "podcast_id")?;
            let length = file.parse_id(line, &record, 4, "audio_length")?;
            let upload_date = parse_upload_date(field(&record, 6)).map_err(|e| file.invalid(line, e))?;

            let episode = Episode::new(
                id,
                podcast_id,
                field(&record, 2),
                field(&record, 3),
                length,
                field(&record, 5),
                upload_date,
            )
            .map_err(|e| file.invalid(line, e))?;

            data.episodes.push(episode);
        }

        Ok(())
    }
}

/// Parses an upload date such as `2017-12-01 01:37:46+00`, whose offset has
/// no minutes, by appending them.
pub fn parse_upload_date(value: &str) -> Result<OffsetDateTime, ModelError> {
    let repaired = format!("{}00", value.trim());

    OffsetDateTime::parse(&repaired, UPLOAD_DATE_FORMAT).map_err(|_| ModelError::InvalidTimestamp {
        value: value.to_owned(),
    })
}

fn field(record: &StringRecord, index: usize) -> &str {
    record.get(index).unwrap_or_default()
}

struct File<'a> {
    path: &'a Path,
}

impl<'a> File<'a> {
    fn new(path: &'a Path) -> Self {
        File { path }
    }

    fn display(&self) -> String {
        self.path.display().to_string()
    }

    /// Returns the trimmed records after the header row, with their line
    /// numbers.
    fn records(&self) -> Result<Vec<(u64, StringRecord)>, DataReaderError> {
        let csv_error = |source| DataReaderError::Csv {
            path: self.display(),
            source,
        };

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_path(self.path)
            .map_err(csv_error)?;

        reader
            .records()
            .map(|record| {
                let record = record.map_err(csv_error)?;
                let line = record.position().map_or(0, |p| p.line());

                Ok((line, record))
            })
            .collect()
    }

    fn parse_id(&self, line: u64, record: &StringRecord, index: usize, column: &'static str) -> Result<i64, DataReaderError> {
        let value = field(record, index);

        value.parse().map_err(|_| DataReaderError::MalformedField {
            path: self.display(),
            line,
            column,
            value: value.to_owned(),
        })
    }

    fn invalid(&self, line: u64, source: ModelError) -> DataReaderError {
        DataReaderError::InvalidRow {
            path: self.display(),
            line,
            source,
        }
    }
}
