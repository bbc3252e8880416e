use std::collections::HashSet;
use std::sync::Arc;

use super::rules::{MAX_DEPTH, NETWORK_SUMMARY_LEVELS};
use super::{MatrixEngine, MatrixError};
use crate::models::referrals::{LevelCount, NetworkSummary};
use crate::repositories::UserStore;

/// Counts activated descendants by breadth-first expansion.
///
/// Level 0 holds the root's direct children. A user without a plan is never
/// counted, but the walk still expands through them, so an activated user
/// is counted at its distance from the root whatever sits in between. The
/// upline walk credits ancestors under the same rule.
#[derive(Clone)]
pub struct ReferralCounter {
    store: Arc<dyn UserStore>,
}

impl ReferralCounter {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    /// Ids of activated descendants exactly `depth` levels below the root.
    pub async fn at_depth(&self, root_id: &str, depth: u32) -> Result<Vec<String>, MatrixError> {
        if depth > MAX_DEPTH {
            return Err(MatrixError::DepthOutOfRange(depth));
        }

        let mut levels = self.walk(root_id, depth + 1).await?;
        Ok(levels.pop().unwrap_or_default())
    }

    pub async fn count_at_depth(&self, root_id: &str, depth: u32) -> Result<usize, MatrixError> {
        Ok(self.at_depth(root_id, depth).await?.len())
    }

    /// Membership of levels `0..levels` from a single walk.
    pub async fn levels(&self, root_id: &str, levels: u32) -> Result<Vec<Vec<String>>, MatrixError> {
        if levels > MAX_DEPTH + 1 {
            return Err(MatrixError::DepthOutOfRange(levels - 1));
        }

        self.walk(root_id, levels).await
    }

    async fn walk(&self, root_id: &str, levels: u32) -> Result<Vec<Vec<String>>, MatrixError> {
        if self.store.get_user(root_id).await?.is_none() {
            return Err(MatrixError::NotFound(format!("user {root_id}")));
        }

        let mut visited: HashSet<String> = HashSet::from([root_id.to_string()]);
        let mut frontier = vec![root_id.to_string()];
        let mut result = Vec::with_capacity(levels as usize);

        for _ in 0..levels {
            let children = if frontier.is_empty() {
                Vec::new()
            } else {
                self.store.children(&frontier).await?
            };

            let mut next = Vec::with_capacity(children.len());
            let mut activated = Vec::new();
            for child in children {
                // referred_by should never loop; a corrupt chain must not recount
                if !visited.insert(child.id.clone()) {
                    continue;
                }
                if child.is_activated() {
                    activated.push(child.id.clone());
                }
                next.push(child.id);
            }

            result.push(activated);
            frontier = next;
        }

        Ok(result)
    }
}

impl MatrixEngine {
    pub async fn network_summary(&self, user_id: &str) -> Result<NetworkSummary, MatrixError> {
        let levels = self
            .counter
            .levels(user_id, NETWORK_SUMMARY_LEVELS)
            .await?
            .into_iter()
            .enumerate()
            .map(|(level, ids)| LevelCount {
                level: level as u32,
                count: ids.len(),
            })
            .collect();

        Ok(NetworkSummary {
            user_id: user_id.to_string(),
            levels,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::users::{Plan, User};
    use crate::repositories::memory::MemoryUserStore;

    async fn add(store: &MemoryUserStore, id: &str, parent: Option<&str>, activated: bool) {
        let mut user = User::new(id.into(), id.to_uppercase(), parent.map(String::from));
        if activated {
            user.current_plan = Some(Plan::Basic);
        }
        store.insert_user(&user).await.unwrap();
    }

    async fn chain() -> Arc<MemoryUserStore> {
        // root -> a -> b -> c, plus an inactive sibling of a with an active child
        let store = Arc::new(MemoryUserStore::new());
        add(&store, "root", None, true).await;
        add(&store, "a", Some("root"), true).await;
        add(&store, "b", Some("a"), true).await;
        add(&store, "c", Some("b"), true).await;
        add(&store, "idle", Some("root"), false).await;
        add(&store, "hidden", Some("idle"), true).await;
        store
    }

    #[tokio::test]
    async fn counts_each_descendant_at_its_exact_depth() {
        let store = chain().await;
        let counter = ReferralCounter::new(store);

        assert_eq!(counter.at_depth("root", 0).await.unwrap(), vec!["a"]);
        assert_eq!(counter.at_depth("root", 1).await.unwrap(), vec!["b", "hidden"]);
        assert_eq!(counter.at_depth("root", 2).await.unwrap(), vec!["c"]);
        assert_eq!(counter.count_at_depth("root", 3).await.unwrap(), 0);

        let levels = counter.levels("root", 4).await.unwrap();
        let appearances = levels.iter().flatten().filter(|id| *id == "c").count();
        assert_eq!(appearances, 1);
    }

    #[tokio::test]
    async fn inactive_users_are_skipped_but_not_their_subtree() {
        let store = chain().await;
        let counter = ReferralCounter::new(store);

        let levels = counter.levels("root", 4).await.unwrap();
        assert!(levels.iter().flatten().all(|id| id != "idle"));
        assert_eq!(levels[1], vec!["b", "hidden"]);
    }

    #[tokio::test]
    async fn leaf_has_zero_counts_and_unknown_root_fails() {
        let store = chain().await;
        let counter = ReferralCounter::new(store);

        assert_eq!(counter.count_at_depth("c", 0).await.unwrap(), 0);
        assert_eq!(counter.count_at_depth("c", 5).await.unwrap(), 0);
        assert!(matches!(
            counter.at_depth("nobody", 0).await,
            Err(MatrixError::NotFound(_))
        ));
        assert!(matches!(
            counter.at_depth("root", MAX_DEPTH + 1).await,
            Err(MatrixError::DepthOutOfRange(_))
        ));
    }
}
