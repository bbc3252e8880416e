use std::collections::HashSet;

use chrono::Utc;
use serde::Serialize;

use super::evaluator::evaluate;
use super::rules::MAX_DEPTH;
use super::{MatrixEngine, MatrixError};
use crate::models::referrals::{DriftReport, MissingReferral, RepairOutcome};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    pub examined: usize,
    pub propagated: usize,
    pub partial: usize,
    pub failed: usize,
}

impl MatrixEngine {
    /// Recounts the activated downline over every level the upline walk
    /// credits and compares it with what the user's boards recorded.
    ///
    /// A user past the final board takes no further credit, so nothing is
    /// reported missing for them.
    pub async fn audit(&self, user_id: &str) -> Result<DriftReport, MatrixError> {
        let user = self.get_user(user_id).await?;
        let levels = self.counter.levels(user_id, MAX_DEPTH).await?;

        let mut missing = Vec::new();
        if user.current_board.board().is_some() {
            for (depth, ids) in levels.iter().enumerate() {
                for id in ids.iter().filter(|id| !user.counts_referral(id)) {
                    missing.push(MissingReferral {
                        user_id: id.clone(),
                        level: depth as u32 + 1,
                    });
                }
            }
        }

        let reachable: HashSet<&str> = levels.iter().flatten().map(String::as_str).collect();
        let unexpected = user
            .counted_referrals()
            .filter(|id| !reachable.contains(id))
            .map(String::from)
            .collect();

        Ok(DriftReport {
            user_id: user.id.clone(),
            activated_direct: levels.first().map_or(0, Vec::len),
            recorded_direct: user.direct_referral_count(),
            activated_indirect: levels.iter().skip(1).map(Vec::len).sum(),
            recorded_indirect: user.indirect_referral_count(),
            missing,
            unexpected,
        })
    }

    /// Credits missing referrals to the user's current board at the tier
    /// their level calls for. Credit is never taken back, so unexpected ids
    /// are only reported.
    pub async fn repair(&self, user_id: &str) -> Result<RepairOutcome, MatrixError> {
        let report = self.audit(user_id).await?;
        let now = Utc::now();

        if !report.unexpected.is_empty() {
            log::warn!(
                "User {user_id} has credit the downline no longer supports: {:?}",
                report.unexpected
            );
        }

        let (outcome, _) = self
            .mutate_user(user_id, |user| {
                let mut outcome = RepairOutcome {
                    user_id: user.id.clone(),
                    board: user.current_board.board(),
                    added: Vec::new(),
                    newly_completed: false,
                };

                let Some(board) = outcome.board else {
                    return Ok(outcome);
                };
                if report.missing.is_empty() {
                    return Ok(outcome);
                }

                let to_add: Vec<MissingReferral> = report
                    .missing
                    .iter()
                    .filter(|m| !user.counts_referral(&m.user_id))
                    .cloned()
                    .collect();

                let record = user.board_or_insert(board);
                for missing in to_add {
                    let added = if missing.level == 1 {
                        record.add_direct(&missing.user_id)
                    } else {
                        record.add_indirect(&missing.user_id, missing.level, now)
                    };
                    if added {
                        outcome.added.push(missing.user_id);
                    }
                }
                outcome.newly_completed = evaluate(record, now).is_newly_completed();

                Ok(outcome)
            })
            .await?;

        if !outcome.added.is_empty() {
            log::warn!(
                "Repaired {} missing referrals for user {user_id}: {:?}",
                outcome.added.len(),
                outcome.added
            );
        }

        Ok(outcome)
    }

    /// Replays activations whose upline walk did not fully land.
    pub async fn reconcile_pending(&self, limit: i64) -> Result<ReconcileSummary, MatrixError> {
        let records = self.store.unsettled_activations(limit).await?;
        let mut summary = ReconcileSummary {
            examined: records.len(),
            ..Default::default()
        };

        for record in records {
            match self.replay_activation(&record).await {
                Ok(walk) if walk.is_complete() => summary.propagated += 1,
                Ok(_) => summary.partial += 1,
                Err(e) => {
                    summary.failed += 1;
                    log::error!(
                        "Could not replay activation {}: {e}",
                        record.payment_reference
                    );
                }
            }
        }

        self.locks.prune();

        if summary.examined > 0 {
            log::info!(
                "Reconciled activations: examined={}, propagated={}, partial={}, failed={}",
                summary.examined,
                summary.propagated,
                summary.partial,
                summary.failed
            );
        }

        Ok(summary)
    }
}
