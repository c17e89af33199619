use std::cmp::Ordering;

use super::{validate_id, Entity, Id, SortOrder};
use crate::errors::ModelError;

/// A user's subscription to a podcast. Equal only when the ID, owner and
/// podcast all match.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PodcastSubscription {
    id: Id,

    /// The ID of the subscribing user.
    owner: Id,

    /// The ID of the podcast subscribed to.
    podcast: Id,
}

impl PodcastSubscription {
    pub fn new(id: Id, owner: Id, podcast: Id) -> Result<Self, ModelError> {
        Ok(PodcastSubscription {
            id: validate_id(id)?,
            owner: validate_id(owner)?,
            podcast: validate_id(podcast)?,
        })
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn owner(&self) -> Id {
        self.owner
    }

    pub fn set_owner(&mut self, owner: Id) -> Result<(), ModelError> {
        self.owner = validate_id(owner)?;
        Ok(())
    }

    pub fn podcast(&self) -> Id {
        self.podcast
    }

    pub fn set_podcast(&mut self, podcast: Id) -> Result<(), ModelError> {
        self.podcast = validate_id(podcast)?;
        Ok(())
    }
}

impl Entity for PodcastSubscription {
    fn id(&self) -> Id {
        self.id
    }
}

impl SortOrder for PodcastSubscription {
    fn sort_cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_compares_owner_and_podcast() {
        let a = PodcastSubscription::new(1, 2, 3).unwrap();
        let b = PodcastSubscription::new(1, 2, 3).unwrap();
        let c = PodcastSubscription::new(1, 4, 3).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn ids_must_be_non_negative() {
        assert!(PodcastSubscription::new(-1, 2, 3).is_err());
        assert!(PodcastSubscription::new(1, -2, 3).is_err());

        let mut subscription = PodcastSubscription::new(1, 2, 3).unwrap();
        assert!(subscription.set_podcast(-3).is_err());
        subscription.set_owner(5).unwrap();
        assert_eq!(subscription.owner(), 5);
    }
}
