use std::env;
use std::fmt;
use std::str::FromStr;

/// Returns the value of the named environment variable if it exists or panics.
pub fn get_variable(name: &str) -> String {
    env::var(name).unwrap_or_else(|_| panic!("must define {} environment variable", name))
}

/// Returns the value of the named environment variable, or `default` if it
/// is not set.
pub fn get_variable_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_owned())
}

/// Which repository backend serves requests. Fixed at start-up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RepositoryMode {
    Memory,
    Database,
}

impl FromStr for RepositoryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(RepositoryMode::Memory),
            "database" => Ok(RepositoryMode::Database),
            other => Err(format!("unknown repository mode {:?}", other)),
        }
    }
}

impl fmt::Display for RepositoryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepositoryMode::Memory => write!(f, "memory"),
            RepositoryMode::Database => write!(f, "database"),
        }
    }
}
