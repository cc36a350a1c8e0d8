//! End-to-end settlement: entry, ranking and payout on the ledger

mod common;

use campayn::ledger::{LedgerCall, SettlementState};
use campayn::services::{CampaignOutcome, SubmitRequest};
use chrono::Duration;
use common::{t0, world};
use tokio_test::assert_ok;

fn escrow(campaign_id: u64, total_reward: u128) -> SettlementState {
    SettlementState {
        campaign_id,
        sponsor: "0xsponsor".into(),
        total_reward,
        registration_end: t0() + Duration::days(5),
        campaign_end: t0() + Duration::days(10),
        is_active: true,
        is_completed: false,
        participant_count: 0,
    }
}

#[tokio::test]
async fn single_entry_takes_first_share() {
    let w = world();
    w.campaign(1).await;
    w.ledger.open_campaign(escrow(1, 10)).await;
    w.verified_influencer("0xalice", "UC-alice").await;

    w.clock.advance(Duration::days(1));
    w.video("aaaaaaaaaa1", "UC-alice", 5_000);
    let submission = assert_ok!(
        w.state
            .registry
            .submit(SubmitRequest {
                campaign_id: 1,
                wallet_address: "0xalice".into(),
                video_url: "https://youtu.be/aaaaaaaaaa1".into(),
            })
            .await
    );
    assert_ok!(w.ledger.register_participant(1).await);
    let entered_at = submission.created_at;
    w.drain().await;

    // Before the end nothing happens
    let report = assert_ok!(w.state.scheduler.run_completion_tick().await).unwrap();
    assert_eq!(report.outcome(1), Some(&CampaignOutcome::NotEnded));

    w.clock.set(t0() + Duration::days(10) + Duration::hours(1));
    let report = assert_ok!(w.state.scheduler.run_completion_tick().await).unwrap();
    match report.outcome(1) {
        Some(CampaignOutcome::Settled { winners, shares, .. }) => {
            assert_eq!(winners, &vec!["0xalice".to_string()]);
            assert_eq!(shares, &vec![5]);
        }
        other => panic!("expected settlement, got {:?}", other),
    }

    assert_eq!(
        w.ledger.calls().await,
        vec![LedgerCall::Settle {
            campaign_id: 1,
            winners: vec!["0xalice".into()],
            submission_times: vec![entered_at.timestamp()],
        }]
    );
    assert_eq!(w.ledger.balance_of("0xalice").await, 5);

    // Settlement is final
    w.clock.advance(Duration::hours(1));
    assert_ok!(w.state.scheduler.run_completion_tick().await);
    assert_eq!(w.ledger.calls().await.len(), 1);
    assert_eq!(w.ledger.balance_of("0xalice").await, 5);
}

#[tokio::test]
async fn better_performing_entry_ranks_first() {
    let w = world();
    w.campaign(1).await;
    w.ledger.open_campaign(escrow(1, 1_000)).await;
    w.verified_influencer("0xalice", "UC-alice").await;
    w.verified_influencer("0xbob", "UC-bob").await;

    w.clock.advance(Duration::days(1));
    w.video("aaaaaaaaaa1", "UC-alice", 1_000);
    w.video("bbbbbbbbbb2", "UC-bob", 2_000);
    for (wallet, video) in [("0xalice", "aaaaaaaaaa1"), ("0xbob", "bbbbbbbbbb2")] {
        assert_ok!(
            w.state
                .registry
                .submit(SubmitRequest {
                    campaign_id: 1,
                    wallet_address: wallet.into(),
                    video_url: format!("https://www.youtube.com/watch?v={}", video),
                })
                .await
        );
        assert_ok!(w.ledger.register_participant(1).await);
    }
    w.drain().await;

    let board = assert_ok!(w.state.registry.leaderboard(1).await);
    assert_eq!(board[0].wallet_address, "0xbob");
    assert_eq!(board[1].wallet_address, "0xalice");

    w.clock.set(t0() + Duration::days(11));
    assert_ok!(w.state.scheduler.run_completion_tick().await);
    assert_eq!(w.ledger.balance_of("0xbob").await, 500);
    assert_eq!(w.ledger.balance_of("0xalice").await, 300);
}

#[tokio::test]
async fn empty_campaign_returns_escrow_after_grace() {
    let w = world();
    w.campaign(2).await;
    w.ledger.open_campaign(escrow(2, 1_000)).await;

    w.clock.set(t0() + Duration::days(16));
    let report = assert_ok!(w.state.scheduler.run_completion_tick().await).unwrap();
    assert!(matches!(
        report.outcome(2),
        Some(CampaignOutcome::AwaitingGrace { .. })
    ));
    assert!(w.ledger.calls().await.is_empty());

    w.clock.set(t0() + Duration::days(17));
    let report = assert_ok!(w.state.scheduler.run_completion_tick().await).unwrap();
    assert!(matches!(
        report.outcome(2),
        Some(CampaignOutcome::Recovered { .. })
    ));
    assert_eq!(w.ledger.balance_of("0xsponsor").await, 1_000);
    assert_eq!(
        w.ledger.calls().await,
        vec![LedgerCall::RecoverEscrow { campaign_id: 2 }]
    );
}
