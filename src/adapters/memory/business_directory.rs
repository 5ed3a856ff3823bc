//! In-memory user to business mapping and admin roster.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::domain::foundation::{BusinessId, DomainError, UserId};
use crate::ports::BusinessDirectory;

#[derive(Clone, Default)]
pub struct InMemoryBusinessDirectory {
    owners: Arc<RwLock<HashMap<UserId, BusinessId>>>,
    admins: Arc<RwLock<HashSet<UserId>>>,
}

impl InMemoryBusinessDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_owner(self, user_id: UserId, business_id: BusinessId) -> Self {
        if let Ok(mut owners) = self.owners.write() {
            owners.insert(user_id, business_id);
        }
        self
    }

    pub fn with_admin(self, user_id: UserId) -> Self {
        if let Ok(mut admins) = self.admins.write() {
            admins.insert(user_id);
        }
        self
    }
}

#[async_trait]
impl BusinessDirectory for InMemoryBusinessDirectory {
    async fn business_for_user(&self, user_id: &UserId) -> Result<Option<BusinessId>, DomainError> {
        let owners = self
            .owners
            .read()
            .map_err(|_| DomainError::database("business directory lock poisoned"))?;
        Ok(owners.get(user_id).copied())
    }

    async fn is_admin(&self, user_id: &UserId) -> Result<bool, DomainError> {
        let admins = self
            .admins
            .read()
            .map_err(|_| DomainError::database("business directory lock poisoned"))?;
        Ok(admins.contains(user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_registered_owner() {
        let user = UserId::new("user-1").unwrap();
        let business = BusinessId::new();
        let directory = InMemoryBusinessDirectory::new().with_owner(user.clone(), business);

        assert_eq!(directory.business_for_user(&user).await.unwrap(), Some(business));
        let stranger = UserId::new("user-2").unwrap();
        assert_eq!(directory.business_for_user(&stranger).await.unwrap(), None);
    }

    #[tokio::test]
    async fn only_listed_users_are_admins() {
        let admin = UserId::new("ops-1").unwrap();
        let owner = UserId::new("user-1").unwrap();
        let directory = InMemoryBusinessDirectory::new()
            .with_owner(owner.clone(), BusinessId::new())
            .with_admin(admin.clone());

        assert!(directory.is_admin(&admin).await.unwrap());
        assert!(!directory.is_admin(&owner).await.unwrap());
    }
}
