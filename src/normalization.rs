use serde::{Deserialize, Deserializer};

/// Normalizes a username by stripping surrounding whitespace, lower-casing
/// it and decomposing it into Unicode Normalization Form D.
///
/// ```
/// use podlib::normalization::normalize_username;
/// assert_eq!(normalize_username(" Mario "), "mario");
/// ```
pub fn normalize_username(name: impl AsRef<str>) -> String {
    use unicode_normalization::UnicodeNormalization;

    name.as_ref().trim().to_lowercase().nfd().to_string()
}

/// Deserializes a `String` after running it through `normalize_username`.
pub fn deserialize<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    Ok(normalize_username(s))
}
