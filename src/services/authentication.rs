use serde::Serialize;

use crate::errors::BackendError;
use crate::model::{Id, User};
use crate::password::{hash_password, verify_password};
use crate::repository::Repo;

pub const PERSONAL_PLAYLIST_TITLE: &str = "My Personal Playlist";

pub const MIN_USERNAME_LENGTH: usize = 3;
pub const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UserView {
    pub user_id: Id,
    pub user_name: String,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        UserView {
            user_id: user.id(),
            user_name: user.username().to_owned(),
        }
    }
}

/// Registers a user under the next free ID and gives them an empty personal
/// playlist.
pub async fn add_user(user_name: &str, password: &str, repo: &Repo) -> Result<(), BackendError> {
    if repo.get_user(user_name).await?.is_some() {
        return Err(BackendError::NameNotUnique);
    }

    let password_hash = hash_password(password)?;

    // the repository replaces the ID with the next free one as it stores it
    let user = User::new(0, user_name, password_hash)?;

    repo.add_new_user(user, PERSONAL_PLAYLIST_TITLE)
        .await?
        .ok_or(BackendError::NameNotUnique)?;

    Ok(())
}

pub async fn get_user(user_name: &str, repo: &Repo) -> Result<UserView, BackendError> {
    let user = repo.get_user(user_name).await?.ok_or(BackendError::UnknownUser)?;

    Ok(UserView::from(&user))
}

/// Fails with `BackendError::Authentication` for an unknown user as well as
/// for a wrong password.
pub async fn authenticate_user(user_name: &str, password: &str, repo: &Repo) -> Result<(), BackendError> {
    let user = repo.get_user(user_name).await?;

    match user {
        Some(user) if verify_password(password, user.password())? => Ok(()),
        _ => Err(BackendError::Authentication),
    }
}

/// Checks registration input before anything is stored.
pub fn validate_registration(user_name: &str, password: &str) -> Result<(), BackendError> {
    if user_name.trim().chars().count() < MIN_USERNAME_LENGTH {
        return Err(BackendError::InvalidForm(format!(
            "Your username must be at least {} characters long",
            MIN_USERNAME_LENGTH
        )));
    }

    let strong = password.chars().count() >= MIN_PASSWORD_LENGTH
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(char::is_uppercase)
        && password.chars().any(char::is_lowercase);

    if !strong {
        return Err(BackendError::InvalidForm(format!(
            "Your password must be at least {} characters long and contain an upper case letter, a lower case letter and a digit",
            MIN_PASSWORD_LENGTH
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{MemoryRepository, Repository, SqliteRepository};

    #[tokio::test]
    async fn registered_users_are_normalized() {
        let repo = MemoryRepository::new();

        add_user("Mario", "ILoveMushrooms123", &repo).await.unwrap();

        let user = get_user("mario", &repo).await.unwrap();
        assert_eq!(
            user,
            UserView {
                user_id: 0,
                user_name: "mario".to_owned()
            }
        );

        let stored = repo.get_user("MARIO").await.unwrap().unwrap();
        assert_ne!(stored.password(), "ILoveMushrooms123");
    }

    #[tokio::test]
    async fn usernames_must_be_unique() {
        let repo = MemoryRepository::new();

        add_user("Mario", "ILoveMushrooms123", &repo).await.unwrap();
        let result = add_user(" mario ", "AnotherPassword1", &repo).await;

        assert!(matches!(result, Err(BackendError::NameNotUnique)));
        assert_eq!(repo.get_number_of_users().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn ids_follow_the_user_count() {
        let repo = MemoryRepository::new();

        add_user("mario", "ILoveMushrooms123", &repo).await.unwrap();
        add_user("luigi", "ILoveMushrooms123", &repo).await.unwrap();

        assert_eq!(get_user("luigi", &repo).await.unwrap().user_id, 1);
    }

    #[tokio::test]
    async fn concurrent_registrations_keep_both_users() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("podlib.db").display());
        let repo = SqliteRepository::connect(&url).await.unwrap();
        repo.create_schema().await.unwrap();

        let (first, second) = (repo.open_session(), repo.open_session());
        let (mario, luigi) = tokio::join!(
            add_user("mario", "ILoveMushrooms123", &*first),
            add_user("luigi", "ILoveMushrooms123", &*second),
        );
        mario.unwrap();
        luigi.unwrap();

        let mut ids = vec![
            get_user("mario", &repo).await.unwrap().user_id,
            get_user("luigi", &repo).await.unwrap().user_id,
        ];
        ids.sort_unstable();

        assert_eq!(ids, vec![0, 1]);
        assert_eq!(repo.get_number_of_users().await.unwrap(), 2);
        assert_eq!(repo.get_playlists().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn concurrent_registrations_of_one_name_store_it_once() {
        let repo = MemoryRepository::new();

        let (first, second) = tokio::join!(
            add_user("mario", "ILoveMushrooms123", &repo),
            add_user("Mario", "ILoveMushrooms123", &repo),
        );

        assert_eq!([first.is_ok(), second.is_ok()].iter().filter(|ok| **ok).count(), 1);
        assert_eq!(repo.get_number_of_users().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn users_get_a_personal_playlist() {
        let repo = MemoryRepository::new();

        add_user("mario", "ILoveMushrooms123", &repo).await.unwrap();
        add_user("luigi", "ILoveMushrooms123", &repo).await.unwrap();

        let playlists = repo.get_playlists().await.unwrap();
        assert_eq!(playlists.len(), 2);
        assert_eq!(playlists[1].id(), 1);
        assert_eq!(playlists[1].owner(), 1);
        assert_eq!(playlists[1].title(), PERSONAL_PLAYLIST_TITLE);
        assert!(playlists[1].is_empty());

        let user = repo.get_user("luigi").await.unwrap().unwrap();
        assert_eq!(user.playlists(), &[1]);
    }

    #[tokio::test]
    async fn authentication_checks_the_password() {
        let repo = MemoryRepository::new();

        add_user("mario", "ILoveMushrooms123", &repo).await.unwrap();

        authenticate_user("Mario", "ILoveMushrooms123", &repo).await.unwrap();
        assert!(matches!(
            authenticate_user("mario", "ILoveMushrooms124", &repo).await,
            Err(BackendError::Authentication)
        ));
        assert!(matches!(
            authenticate_user("peach", "ILoveMushrooms123", &repo).await,
            Err(BackendError::Authentication)
        ));
    }

    #[tokio::test]
    async fn unknown_users_are_reported() {
        let repo = MemoryRepository::new();

        assert!(matches!(get_user("bowser", &repo).await, Err(BackendError::UnknownUser)));
    }

    #[test]
    fn registration_rules() {
        assert!(validate_registration("mario", "ILoveMushrooms123").is_ok());

        for (user_name, password) in [
            ("mo", "ILoveMushrooms123"),
            ("  mo  ", "ILoveMushrooms123"),
            ("mario", "Short1"),
            ("mario", "nouppercase1"),
            ("mario", "NOLOWERCASE1"),
            ("mario", "NoDigitsHere"),
        ] {
            assert!(
                matches!(validate_registration(user_name, password), Err(BackendError::InvalidForm(_))),
                "{:?} / {:?} should be rejected",
                user_name,
                password
            );
        }
    }
}
