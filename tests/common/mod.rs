#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use referral_matrix::matrix::upline::ActivationOutcome;
use referral_matrix::matrix::MatrixEngine;
use referral_matrix::models::activations::{ActivationEvent, ActivationRecord, ActivationStatus};
use referral_matrix::models::boards::BoardType;
use referral_matrix::models::users::{Plan, User};
use referral_matrix::repositories::memory::MemoryUserStore;
use referral_matrix::repositories::{RepositoryError, UserStore};

pub const MAX_RETRIES: u32 = 5;

pub fn engine() -> (MatrixEngine, Arc<MemoryUserStore>) {
    let store = Arc::new(MemoryUserStore::new());
    (MatrixEngine::new(store.clone(), MAX_RETRIES), store)
}

pub async fn register(engine: &MatrixEngine, referrer: Option<&User>) -> User {
    engine
        .register_user(referrer.map(|r| r.referral_code.as_str()))
        .await
        .unwrap()
}

pub async fn activate(engine: &MatrixEngine, user: &User) -> ActivationOutcome {
    engine
        .activate(&ActivationEvent {
            user_id: user.id.clone(),
            plan: Plan::Basic,
            payment_reference: format!("pay-{}", user.id),
        })
        .await
        .unwrap()
}

/// Registers and activates `count` users under `referrer`.
pub async fn recruit(engine: &MatrixEngine, referrer: &User, count: usize) -> Vec<User> {
    let mut recruits = Vec::with_capacity(count);
    for _ in 0..count {
        let user = register(engine, Some(referrer)).await;
        activate(engine, &user).await;
        recruits.push(user);
    }
    recruits
}

pub async fn direct_count(engine: &MatrixEngine, user: &User, board: BoardType) -> usize {
    let user = engine.get_user(&user.id).await.unwrap();
    user.board(board).map_or(0, |r| r.direct_count())
}

pub async fn indirect_count(engine: &MatrixEngine, user: &User, board: BoardType) -> usize {
    let user = engine.get_user(&user.id).await.unwrap();
    user.board(board).map_or(0, |r| r.indirect_count())
}

/// No board of `user` counts the same id at both tiers.
pub fn assert_tiers_disjoint(user: &User) {
    for record in &user.board_progress {
        let direct: HashSet<&str> = record.direct_referrals.iter().map(String::as_str).collect();
        assert_eq!(direct.len(), record.direct_referrals.len(), "duplicate direct id");

        let indirect: HashSet<&str> = record
            .indirect_referrals
            .iter()
            .map(|r| r.user_id.as_str())
            .collect();
        assert_eq!(indirect.len(), record.indirect_referrals.len(), "duplicate indirect id");

        assert!(direct.is_disjoint(&indirect), "id counted at two tiers");
    }
}

/// Memory store with switchable faults.
#[derive(Default)]
pub struct FaultyStore {
    pub inner: MemoryUserStore,
    failing_reads: Mutex<HashSet<String>>,
    failing_saves: Mutex<HashSet<String>>,
    conflicts: AtomicU32,
}

impl FaultyStore {
    pub fn fail_reads_of(&self, user_id: &str) {
        self.failing_reads.lock().unwrap().insert(user_id.to_string());
    }

    pub fn fail_saves_of(&self, user_id: &str) {
        self.failing_saves.lock().unwrap().insert(user_id.to_string());
    }

    pub fn heal(&self) {
        self.failing_reads.lock().unwrap().clear();
        self.failing_saves.lock().unwrap().clear();
    }

    /// The next `count` saves report a stale version.
    pub fn inject_conflicts(&self, count: u32) {
        self.conflicts.store(count, Ordering::SeqCst);
    }

    fn unavailable(what: &str) -> RepositoryError {
        RepositoryError::InvalidData(format!("injected fault for {what}"))
    }
}

#[async_trait]
impl UserStore for FaultyStore {
    async fn insert_user(&self, user: &User) -> Result<(), RepositoryError> {
        self.inner.insert_user(user).await
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>, RepositoryError> {
        if self.failing_reads.lock().unwrap().contains(id) {
            return Err(Self::unavailable(id));
        }
        self.inner.get_user(id).await
    }

    async fn get_user_by_referral_code(
        &self,
        code: &str,
    ) -> Result<Option<User>, RepositoryError> {
        self.inner.get_user_by_referral_code(code).await
    }

    async fn children(&self, parent_ids: &[String]) -> Result<Vec<User>, RepositoryError> {
        self.inner.children(parent_ids).await
    }

    async fn save_user(&self, user: &mut User) -> Result<(), RepositoryError> {
        if self.failing_saves.lock().unwrap().contains(&user.id) {
            return Err(Self::unavailable(&user.id));
        }

        let injected = self
            .conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(RepositoryError::Conflict(user.id.clone()));
        }

        self.inner.save_user(user).await
    }

    async fn insert_activation(&self, record: &ActivationRecord) -> Result<(), RepositoryError> {
        self.inner.insert_activation(record).await
    }

    async fn update_activation_status(
        &self,
        payment_reference: &str,
        status: ActivationStatus,
    ) -> Result<(), RepositoryError> {
        self.inner
            .update_activation_status(payment_reference, status)
            .await
    }

    async fn get_activation(
        &self,
        payment_reference: &str,
    ) -> Result<Option<ActivationRecord>, RepositoryError> {
        self.inner.get_activation(payment_reference).await
    }

    async fn unsettled_activations(
        &self,
        limit: i64,
    ) -> Result<Vec<ActivationRecord>, RepositoryError> {
        self.inner.unsettled_activations(limit).await
    }
}

pub fn faulty_engine() -> (MatrixEngine, Arc<FaultyStore>) {
    let store = Arc::new(FaultyStore::default());
    (MatrixEngine::new(store.clone(), MAX_RETRIES), store)
}
