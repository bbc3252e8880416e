//! End-to-end board progression against the in-memory store.

mod common;

use common::*;
use referral_matrix::matrix::rules::MAX_DEPTH;
use referral_matrix::matrix::upline::ActivationOutcome;
use referral_matrix::matrix::MatrixError;
use referral_matrix::models::activations::ActivationEvent;
use referral_matrix::models::boards::{BoardStage, BoardState, BoardType};
use referral_matrix::models::users::Plan;
use referral_matrix::repositories::UserStore;

#[tokio::test]
async fn bronze_completes_with_seven_active_directs() {
    let (engine, _) = engine();
    let a = register(&engine, None).await;
    activate(&engine, &a).await;

    let recruits = recruit(&engine, &a, 6).await;
    let a_now = engine.get_user(&a.id).await.unwrap();
    assert!(!a_now.board(BoardType::Bronze).unwrap().completed);

    let last = register(&engine, Some(&a)).await;
    match activate(&engine, &last).await {
        ActivationOutcome::Applied { walk, .. } => {
            assert!(walk.is_complete());
            assert_eq!(walk.completed_boards(), vec![(a.id.clone(), BoardType::Bronze)]);
        }
        other => panic!("unexpected outcome {other:?}"),
    }

    let a_now = engine.get_user(&a.id).await.unwrap();
    let bronze = a_now.board(BoardType::Bronze).unwrap();
    assert_eq!(bronze.direct_count(), 7);
    assert!(bronze.completed);
    assert!(bronze.completion_date.is_some());
    assert!(!bronze.rewards_claimed);
    assert!(recruits.iter().all(|r| bronze.has_direct(&r.id)));

    // completion alone never pays out
    assert_eq!(a_now.wallets.food, 0);
}

#[tokio::test]
async fn inactive_referral_is_not_counted() {
    let (engine, _) = engine();
    let a = register(&engine, None).await;
    let b = register(&engine, Some(&a)).await;
    assert_eq!(b.referred_by.as_deref(), Some(a.id.as_str()));

    assert_eq!(direct_count(&engine, &a, BoardType::Bronze).await, 0);

    let status = engine.board_status(&a.id).await.unwrap();
    assert_eq!(status[0].board_type, BoardType::Bronze);
    assert_eq!(status[0].direct_count, 0);
    assert_eq!(status[0].state, BoardState::NotStarted);

    let network = engine.network_summary(&a.id).await.unwrap();
    assert!(network.levels.iter().all(|l| l.count == 0));
}

#[tokio::test]
async fn silver_claim_with_cash_option() {
    let (engine, _) = engine();
    let a = register(&engine, None).await;
    activate(&engine, &a).await;

    recruit(&engine, &a, 7).await;
    let receipt = engine.claim_reward(&a.id, BoardType::Bronze, None).await.unwrap();
    assert_eq!(receipt.current_board, BoardStage::Silver);
    assert_eq!(receipt.wallets.food, 1_300_000);

    // seven new directs, each bringing seven of their own
    let fronts = recruit(&engine, &a, 7).await;
    for front in &fronts {
        recruit(&engine, front, 7).await;
    }

    assert_eq!(direct_count(&engine, &a, BoardType::Silver).await, 7);
    assert_eq!(indirect_count(&engine, &a, BoardType::Silver).await, 49);

    let before = engine.get_user(&a.id).await.unwrap();
    let silver = before.board(BoardType::Silver).unwrap();
    assert!(silver.completed);
    assert!(silver.indirect_referrals.iter().all(|r| r.level == 2));
    assert!(silver
        .indirect_referrals
        .iter()
        .all(|r| r.counted_for_board == BoardType::Silver));

    let missing_option = engine.claim_reward(&a.id, BoardType::Silver, None).await;
    assert!(matches!(missing_option, Err(MatrixError::InvalidOption(_))));

    let receipt = engine
        .claim_reward(&a.id, BoardType::Silver, Some("cash"))
        .await
        .unwrap();
    assert_eq!(receipt.claimed_option.as_deref(), Some("cash"));
    assert_eq!(receipt.wallets.cash, before.wallets.cash + 10_000_000);
    assert_eq!(receipt.wallets.food, before.wallets.food);
    assert_eq!(receipt.wallets.gadget, before.wallets.gadget);
    assert_eq!(receipt.current_board, BoardStage::Gold);

    let after = engine.get_user(&a.id).await.unwrap();
    let silver = after.board(BoardType::Silver).unwrap();
    assert!(silver.rewards_claimed);
    assert!(silver.claimed_at.is_some());

    for option in [Some("cash"), Some("food"), None] {
        let again = engine.claim_reward(&a.id, BoardType::Silver, option).await;
        assert!(matches!(again, Err(MatrixError::AlreadyClaimed { .. })));
    }
    assert_eq!(engine.get_user(&a.id).await.unwrap().wallets, after.wallets);
}

#[tokio::test]
async fn claim_before_completion_fails() {
    let (engine, _) = engine();
    let a = register(&engine, None).await;
    recruit(&engine, &a, 3).await;

    let err = engine
        .claim_reward(&a.id, BoardType::Bronze, None)
        .await
        .unwrap_err();
    assert!(matches!(err, MatrixError::NotCompleted { board: BoardType::Bronze, .. }));

    let err = engine
        .claim_reward("missing", BoardType::Bronze, None)
        .await
        .unwrap_err();
    assert!(matches!(err, MatrixError::NotFound(_)));
}

#[tokio::test]
async fn indirect_credit_is_tagged_by_distance_and_capped() {
    let (engine, _) = engine();

    // chain[0] <- chain[1] <- ... <- chain[9]
    let mut chain = vec![register(&engine, None).await];
    for i in 1..10 {
        let next = register(&engine, Some(&chain[i - 1])).await;
        chain.push(next);
    }

    let deepest = chain.last().unwrap().clone();
    let walk = match activate(&engine, &deepest).await {
        ActivationOutcome::Applied { walk, .. } => walk,
        other => panic!("unexpected outcome {other:?}"),
    };
    assert_eq!(walk.steps.len(), MAX_DEPTH as usize);

    let referrer = engine.get_user(&chain[8].id).await.unwrap();
    assert!(referrer.board(BoardType::Bronze).unwrap().has_direct(&deepest.id));

    for level in 2..=MAX_DEPTH {
        let ancestor = engine
            .get_user(&chain[9 - level as usize].id)
            .await
            .unwrap();
        let bronze = ancestor.board(BoardType::Bronze).unwrap();
        let entry = &bronze.indirect_referrals[0];
        assert_eq!(entry.user_id, deepest.id);
        assert_eq!(entry.level, level);
        assert!(!bronze.has_direct(&deepest.id));
    }

    for beyond in &chain[..(9 - MAX_DEPTH as usize)] {
        let untouched = engine.get_user(&beyond.id).await.unwrap();
        assert!(untouched.board_progress.is_empty());
    }
}

#[tokio::test]
async fn network_summary_counts_levels() {
    let (engine, _) = engine();
    let root = register(&engine, None).await;
    let fronts = recruit(&engine, &root, 2).await;
    let seconds = recruit(&engine, &fronts[0], 3).await;
    recruit(&engine, &seconds[0], 1).await;

    let summary = engine.network_summary(&root.id).await.unwrap();
    let counts: Vec<usize> = summary.levels.iter().map(|l| l.count).collect();
    assert_eq!(counts, vec![2, 3, 1, 0, 0]);
    assert_eq!(engine.counter().count_at_depth(&root.id, 2).await.unwrap(), 1);
}

#[tokio::test]
async fn counts_never_decrease_and_tiers_stay_disjoint() {
    let (engine, _) = engine();
    let root = register(&engine, None).await;
    activate(&engine, &root).await;

    let mut members = vec![root.clone()];
    let mut last_counts: Vec<(usize, usize)> = vec![(0, 0)];

    // deterministic spread over a growing tree
    for i in 0..40usize {
        let parent = members[(i * 7 + 3) % members.len()].clone();
        let user = register(&engine, Some(&parent)).await;
        activate(&engine, &user).await;
        // replaying the same payment must not change anything
        activate(&engine, &user).await;
        members.push(user);
        last_counts.push((0, 0));

        for (index, member) in members.iter().enumerate() {
            let current = engine.get_user(&member.id).await.unwrap();
            assert_tiers_disjoint(&current);

            let direct: usize = current.board_progress.iter().map(|r| r.direct_count()).sum();
            let indirect: usize = current.board_progress.iter().map(|r| r.indirect_count()).sum();
            assert!(direct >= last_counts[index].0);
            assert!(indirect >= last_counts[index].1);
            last_counts[index] = (direct, indirect);
        }
    }
}

#[tokio::test]
async fn registration_needs_a_known_referral_code() {
    let (engine, _) = engine();
    let err = engine.register_user(Some("NOPE1234")).await.unwrap_err();
    assert!(matches!(err, MatrixError::NotFound(_)));

    let a = register(&engine, None).await;
    let b = engine
        .register_user(Some(&a.referral_code.to_lowercase()))
        .await
        .unwrap();
    assert_eq!(b.referred_by, Some(a.id));
}

#[tokio::test]
async fn plan_upgrade_does_not_recount() {
    let (engine, _) = engine();
    let a = register(&engine, None).await;
    let b = register(&engine, Some(&a)).await;
    activate(&engine, &b).await;

    engine
        .activate(&ActivationEvent {
            user_id: b.id.clone(),
            plan: Plan::Deluxe,
            payment_reference: "upgrade-1".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(direct_count(&engine, &a, BoardType::Bronze).await, 1);
    assert_eq!(
        engine.get_user(&b.id).await.unwrap().current_plan,
        Some(Plan::Deluxe)
    );
}

#[tokio::test]
async fn ancestor_past_platinum_is_walked_past_without_credit() {
    let (engine, store) = engine();
    let top = register(&engine, None).await;
    let a = register(&engine, Some(&top)).await;
    activate(&engine, &a).await;

    let mut on_platinum = engine.get_user(&a.id).await.unwrap();
    on_platinum.current_board = BoardStage::Platinum;
    store.save_user(&mut on_platinum).await.unwrap();

    recruit(&engine, &a, 7).await;
    let receipt = engine
        .claim_reward(&a.id, BoardType::Platinum, Some("cash"))
        .await
        .unwrap();
    assert_eq!(receipt.current_board, BoardStage::Exit);

    let late = register(&engine, Some(&a)).await;
    let ActivationOutcome::Applied { walk, .. } = activate(&engine, &late).await else {
        panic!("expected an applied activation");
    };
    assert!(walk.is_complete());
    assert_eq!(walk.steps.len(), 2);

    let exited = &walk.steps[0];
    assert_eq!(exited.ancestor_id, a.id);
    assert_eq!(exited.board, None);
    assert!(!exited.recorded);
    assert_eq!(exited.evaluation, None);

    assert_eq!(walk.steps[1].ancestor_id, top.id);
    assert!(walk.steps[1].recorded);
    assert_eq!(indirect_count(&engine, &top, BoardType::Bronze).await, 8);

    let a_now = engine.get_user(&a.id).await.unwrap();
    assert!(!a_now.counts_referral(&late.id));
    assert_eq!(a_now.wallets.cash, 200_000_000);
    assert!(!engine.audit(&a.id).await.unwrap().has_drift());
}
