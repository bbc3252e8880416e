use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::{RepositoryError, UserStore};
use crate::models::activations::{ActivationRecord, ActivationStatus};
use crate::models::users::User;

/// In-process store backed by `DashMap`. Used by tests and local runs.
#[derive(Default)]
pub struct MemoryUserStore {
    users: DashMap<String, User>,
    referral_codes: DashMap<String, String>,
    activations: DashMap<String, ActivationRecord>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn insert_user(&self, user: &User) -> Result<(), RepositoryError> {
        match self.referral_codes.entry(user.referral_code.clone()) {
            Entry::Occupied(_) => {
                return Err(RepositoryError::Duplicate(format!(
                    "referral code {}",
                    user.referral_code
                )))
            }
            Entry::Vacant(slot) => {
                slot.insert(user.id.clone());
            }
        }

        match self.users.entry(user.id.clone()) {
            Entry::Occupied(_) => {
                self.referral_codes.remove(&user.referral_code);
                Err(RepositoryError::Duplicate(format!("user {}", user.id)))
            }
            Entry::Vacant(slot) => {
                slot.insert(user.clone());
                Ok(())
            }
        }
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>, RepositoryError> {
        Ok(self.users.get(id).map(|u| u.clone()))
    }

    async fn get_user_by_referral_code(
        &self,
        code: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let Some(user_id) = self.referral_codes.get(code).map(|id| id.clone()) else {
            return Ok(None);
        };

        self.get_user(&user_id).await
    }

    async fn children(&self, parent_ids: &[String]) -> Result<Vec<User>, RepositoryError> {
        let mut children: Vec<User> = self
            .users
            .iter()
            .filter(|u| {
                u.referred_by
                    .as_ref()
                    .is_some_and(|parent| parent_ids.contains(parent))
            })
            .map(|u| u.clone())
            .collect();

        children.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(children)
    }

    async fn save_user(&self, user: &mut User) -> Result<(), RepositoryError> {
        let Some(mut stored) = self.users.get_mut(&user.id) else {
            return Err(RepositoryError::NotFound(format!("user {}", user.id)));
        };

        if stored.version != user.version {
            return Err(RepositoryError::Conflict(user.id.clone()));
        }

        user.version += 1;
        user.updated_at = Utc::now();
        *stored = user.clone();

        Ok(())
    }

    async fn insert_activation(&self, record: &ActivationRecord) -> Result<(), RepositoryError> {
        match self.activations.entry(record.payment_reference.clone()) {
            Entry::Occupied(_) => Err(RepositoryError::Duplicate(format!(
                "payment reference {}",
                record.payment_reference
            ))),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(())
            }
        }
    }

    async fn update_activation_status(
        &self,
        payment_reference: &str,
        status: ActivationStatus,
    ) -> Result<(), RepositoryError> {
        let Some(mut record) = self.activations.get_mut(payment_reference) else {
            return Err(RepositoryError::NotFound(format!(
                "activation {payment_reference}"
            )));
        };

        record.status = status;
        record.updated_at = Utc::now();
        Ok(())
    }

    async fn get_activation(
        &self,
        payment_reference: &str,
    ) -> Result<Option<ActivationRecord>, RepositoryError> {
        Ok(self.activations.get(payment_reference).map(|r| r.clone()))
    }

    async fn unsettled_activations(
        &self,
        limit: i64,
    ) -> Result<Vec<ActivationRecord>, RepositoryError> {
        let mut records: Vec<ActivationRecord> = self
            .activations
            .iter()
            .filter(|r| !r.status.is_settled())
            .map(|r| r.clone())
            .collect();

        records.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        records.truncate(limit.max(0) as usize);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::users::Plan;

    #[tokio::test]
    async fn stale_versions_are_rejected() {
        let store = MemoryUserStore::new();
        let user = User::new("a".into(), "AAAA".into(), None);
        store.insert_user(&user).await.unwrap();

        let mut first = store.get_user("a").await.unwrap().unwrap();
        let mut second = first.clone();

        first.current_plan = Some(Plan::Basic);
        store.save_user(&mut first).await.unwrap();
        assert_eq!(first.version, 1);

        second.current_plan = Some(Plan::Deluxe);
        let err = store.save_user(&mut second).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(id) if id == "a"));

        let stored = store.get_user("a").await.unwrap().unwrap();
        assert_eq!(stored.current_plan, Some(Plan::Basic));
    }

    #[tokio::test]
    async fn referral_codes_are_unique() {
        let store = MemoryUserStore::new();
        store
            .insert_user(&User::new("a".into(), "SAME".into(), None))
            .await
            .unwrap();

        let err = store
            .insert_user(&User::new("b".into(), "SAME".into(), None))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Duplicate(_)));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn children_include_users_without_a_plan() {
        let store = MemoryUserStore::new();
        store
            .insert_user(&User::new("root".into(), "ROOT".into(), None))
            .await
            .unwrap();

        let mut active = User::new("b1".into(), "B1".into(), Some("root".into()));
        active.current_plan = Some(Plan::Classic);
        store.insert_user(&active).await.unwrap();
        store
            .insert_user(&User::new("b2".into(), "B2".into(), Some("root".into())))
            .await
            .unwrap();

        let children = store.children(&["root".to_string()]).await.unwrap();
        let ids: Vec<&str> = children.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&"b1") && ids.contains(&"b2"));
        assert!(store.children(&["b1".to_string()]).await.unwrap().is_empty());
    }
}
