use thiserror::Error;

use crate::model::Id;

/// Enumerates validation failures raised while building or mutating
/// domain entities.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ModelError {
    /// Represents an ID that is negative.
    #[error("ID {0} must be a non-negative integer")]
    InvalidId(i64),

    /// Represents a required text field that is blank.
    #[error("{field} must be a non-empty string")]
    EmptyField { field: &'static str },

    /// Represents a negative duration.
    #[error("{field} must be non-negative, got {value}")]
    NegativeValue { field: &'static str, value: i64 },

    /// Represents a review rating outside the accepted range.
    #[error("Rating must be between 1 and 5, got {0}")]
    RatingOutOfRange(i64),

    /// Represents a review that targets neither a podcast nor an episode.
    #[error("A podcast or episode must be provided")]
    MissingReviewTarget,

    /// Represents a category applied to the same podcast twice.
    #[error("Category {category} already applied to Podcast \"{podcast}\"")]
    DuplicateAssociation { category: String, podcast: String },

    /// Represents a playlist position that does not exist.
    #[error("Index {index} is out of range for a playlist of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// Represents a timestamp that could not be parsed.
    #[error("Invalid timestamp {value:?}")]
    InvalidTimestamp { value: String },
}

/// Enumerates errors returned by the repository backends.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Represents an entity stored without the relationship it requires.
    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// Represents a playlist operation for a user who owns no playlist.
    #[error("Playlist for user {user_id} not found")]
    PlaylistNotFound { user_id: Id },

    /// Represents removing an episode that is not in the user's playlist.
    #[error("Episode {episode_id} not found in user's playlist")]
    EpisodeNotInPlaylist { episode_id: Id },

    /// Represents an SQL error.
    #[error("SQLx error")]
    Sqlx {
        #[from]
        source: sqlx::Error,
    },

    /// Represents a failure while creating the schema.
    #[error("Migration error")]
    Migration {
        #[from]
        source: sqlx::migrate::MigrateError,
    },

    /// Represents a stored row that no longer satisfies the model.
    #[error("Invalid stored entity: {0}")]
    Model(#[from] ModelError),
}

/// Enumerates high-level errors returned by this library.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Represents a registration attempt with a username already in use.
    #[error("Username already taken")]
    NameNotUnique,

    /// Represents a lookup of a user who does not exist.
    #[error("Unknown user")]
    UnknownUser,

    /// Represents a password that does not match.
    #[error("Authentication failed")]
    Authentication,

    /// Represents a request that needs a logged-in user.
    #[error("Login required")]
    NotLoggedIn,

    /// Represents a reference to a podcast that does not exist.
    #[error("Podcast {0} does not exist")]
    NonExistentPodcast(Id),

    /// Represents a reference to an episode that does not exist.
    #[error("Episode {0} does not exist")]
    NonExistentEpisode(Id),

    /// Represents form input that failed validation.
    #[error("Invalid form submission: {0}")]
    InvalidForm(String),

    /// Represents a failure in the password hasher.
    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    /// Represents an error reading seed data.
    #[error("Data reader error")]
    DataReader {
        #[from]
        source: DataReaderError,
    },

    /// Represents an error from the active repository.
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Represents a domain validation failure.
    #[error("{0}")]
    Model(#[from] ModelError),
}

/// Enumerates errors returned while reading the seed CSV files.
#[derive(Debug, Error)]
pub enum DataReaderError {
    /// Represents a file that could not be opened or parsed.
    #[error("CSV error in {path}")]
    Csv { path: String, source: csv::Error },

    /// Represents a row with a field that could not be converted.
    #[error("Malformed {column} in {path} at line {line}: {value:?}")]
    MalformedField {
        path: String,
        line: u64,
        column: &'static str,
        value: String,
    },

    /// Represents a row that built an invalid entity.
    #[error("Invalid row in {path} at line {line}")]
    InvalidRow {
        path: String,
        line: u64,
        source: ModelError,
    },
}
