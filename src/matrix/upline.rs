use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::evaluator::{evaluate, Evaluation};
use super::rules::MAX_DEPTH;
use super::{MatrixEngine, MatrixError};
use crate::models::activations::{ActivationEvent, ActivationRecord, ActivationStatus};
use crate::models::boards::BoardType;
use crate::models::users::{Plan, User};
use crate::repositories::RepositoryError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AncestorStep {
    pub ancestor_id: String,
    pub level: u32,
    pub board: Option<BoardType>,
    pub recorded: bool,
    pub evaluation: Option<Evaluation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepFailure {
    pub ancestor_id: String,
    pub level: u32,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WalkReport {
    pub steps: Vec<AncestorStep>,
    pub failures: Vec<StepFailure>,
}

impl WalkReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn completed_boards(&self) -> Vec<(String, BoardType)> {
        self.steps
            .iter()
            .filter(|s| s.evaluation.is_some_and(|e| e.is_newly_completed()))
            .filter_map(|s| s.board.map(|b| (s.ancestor_id.clone(), b)))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ActivationOutcome {
    Applied {
        user_id: String,
        plan: Plan,
        walk: WalkReport,
    },
    Duplicate {
        payment_reference: String,
    },
}

impl MatrixEngine {
    /// Handles a verified plan payment.
    ///
    /// A replayed payment reference is a no-op reported as
    /// [`ActivationOutcome::Duplicate`]. Referral credit is best effort: a
    /// walk with failed steps leaves the activation `partial` for
    /// [`MatrixEngine::reconcile_pending`] to replay.
    pub async fn activate(&self, event: &ActivationEvent) -> Result<ActivationOutcome, MatrixError> {
        self.get_user(&event.user_id).await?;

        match self.record_activation(event).await {
            Ok(()) => {}
            Err(MatrixError::DuplicateActivation(payment_reference)) => {
                log::warn!(
                    "Ignoring replayed activation {payment_reference} for user {}",
                    event.user_id
                );
                return Ok(ActivationOutcome::Duplicate { payment_reference });
            }
            Err(e) => return Err(e),
        }

        self.apply_activation(&event.user_id, event.plan, &event.payment_reference)
            .await
    }

    pub async fn get_activation(
        &self,
        payment_reference: &str,
    ) -> Result<ActivationRecord, MatrixError> {
        self.store
            .get_activation(payment_reference)
            .await?
            .ok_or_else(|| MatrixError::NotFound(format!("activation {payment_reference}")))
    }

    async fn record_activation(&self, event: &ActivationEvent) -> Result<(), MatrixError> {
        match self
            .store
            .insert_activation(&ActivationRecord::pending(event))
            .await
        {
            Ok(()) => Ok(()),
            Err(RepositoryError::Duplicate(_)) => Err(MatrixError::DuplicateActivation(
                event.payment_reference.clone(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    /// Grants the plan, walks the upline and settles the ledger entry.
    async fn apply_activation(
        &self,
        user_id: &str,
        plan: Plan,
        payment_reference: &str,
    ) -> Result<ActivationOutcome, MatrixError> {
        let (_, user) = self
            .mutate_user(user_id, |user| {
                user.current_plan = Some(plan);
                Ok(())
            })
            .await?;
        log::info!("Activated {plan} plan for user {user_id} ({payment_reference})");

        let walk = self.settle_walk(&user, payment_reference).await;

        Ok(ActivationOutcome::Applied {
            user_id: user.id,
            plan,
            walk,
        })
    }

    /// Re-runs referral credit for an unsettled ledger entry.
    ///
    /// The entry's plan is granted only if the user still has none: a plan
    /// already held came from this entry or from a later payment, and must
    /// not be replaced by an older one.
    pub(crate) async fn replay_activation(
        &self,
        record: &ActivationRecord,
    ) -> Result<WalkReport, MatrixError> {
        let (granted, user) = self
            .mutate_user(&record.user_id, |user| {
                if user.is_activated() {
                    return Ok(false);
                }
                user.current_plan = Some(record.plan);
                Ok(true)
            })
            .await?;
        if granted {
            log::info!(
                "Activated {} plan for user {} on replay ({})",
                record.plan,
                record.user_id,
                record.payment_reference
            );
        }

        Ok(self.settle_walk(&user, &record.payment_reference).await)
    }

    async fn settle_walk(&self, user: &User, payment_reference: &str) -> WalkReport {
        let walk = self.propagate(user).await;
        let status = if walk.is_complete() {
            ActivationStatus::Propagated
        } else {
            ActivationStatus::Partial
        };

        for (ancestor_id, board) in walk.completed_boards() {
            log::info!("User {ancestor_id} completed the {board} board");
        }

        if let Err(e) = self
            .store
            .update_activation_status(payment_reference, status)
            .await
        {
            log::error!("Could not mark activation {payment_reference} as {status}: {e}");
        }

        walk
    }

    /// Credits `user` to each ancestor's current board, nearest first.
    ///
    /// Level 1 is the direct referrer; levels 2..=MAX_DEPTH are indirect.
    /// Ancestors are credited whether or not the users between them and
    /// `user` hold a plan, matching the referral counter. A failed write
    /// skips that ancestor. A failed lookup ends the walk, since the next
    /// pointer is unknown.
    async fn propagate(&self, user: &User) -> WalkReport {
        let mut report = WalkReport::default();
        let Some(mut ancestor_id) = user.referred_by.clone() else {
            return report;
        };

        let now = Utc::now();
        let mut visited: HashSet<String> = HashSet::from([user.id.clone()]);

        for level in 1..=MAX_DEPTH {
            if !visited.insert(ancestor_id.clone()) {
                log::error!("Referral cycle detected at user {ancestor_id}");
                break;
            }

            let next = match self.get_user(&ancestor_id).await {
                Ok(ancestor) => ancestor.referred_by,
                Err(e) => {
                    log::warn!("Upline walk for {} stopped at {ancestor_id}: {e}", user.id);
                    report.failures.push(StepFailure {
                        ancestor_id,
                        level,
                        error: e.to_string(),
                    });
                    break;
                }
            };

            match self.credit_ancestor(&ancestor_id, &user.id, level, now).await {
                Ok(step) => {
                    log::debug!(
                        "Level {level}: {} -> {ancestor_id} ({:?}), recorded={}",
                        user.id,
                        step.board,
                        step.recorded
                    );
                    report.steps.push(step);
                }
                Err(e) => {
                    log::warn!("Skipping ancestor {ancestor_id} of {}: {e}", user.id);
                    report.failures.push(StepFailure {
                        ancestor_id: ancestor_id.clone(),
                        level,
                        error: e.to_string(),
                    });
                }
            }

            match next {
                Some(parent) => ancestor_id = parent,
                None => break,
            }
        }

        report
    }

    async fn credit_ancestor(
        &self,
        ancestor_id: &str,
        user_id: &str,
        level: u32,
        now: DateTime<Utc>,
    ) -> Result<AncestorStep, MatrixError> {
        let (step, _) = self
            .mutate_user(ancestor_id, |ancestor| {
                let mut step = AncestorStep {
                    ancestor_id: ancestor.id.clone(),
                    level,
                    board: ancestor.current_board.board(),
                    recorded: false,
                    evaluation: None,
                };

                let Some(board) = step.board else {
                    return Ok(step);
                };
                let already_counted = ancestor.counts_referral(user_id);

                let record = ancestor.board_or_insert(board);
                if !already_counted {
                    step.recorded = if level == 1 {
                        record.add_direct(user_id)
                    } else {
                        record.add_indirect(user_id, level, now)
                    };
                }
                step.evaluation = Some(evaluate(record, now));

                Ok(step)
            })
            .await?;

        Ok(step)
    }
}
