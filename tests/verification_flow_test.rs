//! End-to-end content verification and resubmission

mod common;

use campayn::models::{VerificationErrorCode, VerificationStatus};
use campayn::services::verification::NO_TRANSCRIPT_REASON;
use campayn::services::SubmitRequest;
use campayn::EngineError;
use chrono::Duration;
use common::world;
use tokio_test::assert_ok;

fn entry(video_id: &str) -> SubmitRequest {
    SubmitRequest {
        campaign_id: 1,
        wallet_address: "0xalice".into(),
        video_url: format!("https://youtu.be/{}", video_id),
    }
}

#[tokio::test]
async fn missing_captions_then_resubmission() {
    let w = world();
    w.campaign(1).await;
    w.verified_influencer("0xalice", "UC-alice").await;
    w.clock.advance(Duration::hours(2));
    w.video("aaaaaaaaaa1", "UC-alice", 800);

    let first = assert_ok!(w.state.registry.submit(entry("aaaaaaaaaa1")).await);
    assert_eq!(first.verification.status, VerificationStatus::Pending);
    w.drain().await;

    let record = assert_ok!(
        w.state
            .registry
            .verification_status(&first.submission_id)
            .await
    );
    assert!(!record.approved);
    assert_eq!(record.status, VerificationStatus::Error);
    assert_eq!(record.error_code, Some(VerificationErrorCode::NoTranscript));
    assert_eq!(record.reason.as_deref(), Some(NO_TRANSCRIPT_REASON));
    assert_eq!(w.judge.call_count(), 0);

    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["approved"], false);
    assert_eq!(json["status"], "error");
    assert_eq!(json["errorCode"], "NO_TRANSCRIPT");

    // A captioned upload replaces the failed entry
    w.clock.advance(Duration::hours(1));
    w.video("cccccccccc3", "UC-alice", 1_200);
    w.transcripts.add(
        "cccccccccc3",
        "This video is sponsored by Acme. Acme rockets get you there.",
        Some("en"),
    );
    let second = assert_ok!(w.state.registry.submit(entry("cccccccccc3")).await);
    assert_eq!(second.submission_id, first.submission_id);
    assert_eq!(second.video_id, "cccccccccc3");
    assert_eq!(second.verification.status, VerificationStatus::Pending);
    assert_eq!(second.verification.error_code, None);

    w.drain().await;
    let record = assert_ok!(
        w.state
            .registry
            .verification_status(&first.submission_id)
            .await
    );
    assert_eq!(record.status, VerificationStatus::Approved);
    assert_eq!(record.transcript_language.as_deref(), Some("en"));
    assert_eq!(w.judge.call_count(), 1);

    // Approved entries are final
    w.video("dddddddddd4", "UC-alice", 10);
    let err = w.state.registry.submit(entry("dddddddddd4")).await.unwrap_err();
    assert!(matches!(err, EngineError::AlreadySubmitted { .. }));
}

#[tokio::test]
async fn rejected_entry_can_be_resubmitted() {
    let w = world();
    w.campaign(1).await;
    w.verified_influencer("0xalice", "UC-alice").await;
    w.clock.advance(Duration::hours(2));
    w.video("aaaaaaaaaa1", "UC-alice", 800);
    w.transcripts.add("aaaaaaaaaa1", "A cooking video", None);
    w.judge.set_reply(r#"{"approved": false, "confidence": 80, "reason": "Acme never mentioned"}"#);

    let first = assert_ok!(w.state.registry.submit(entry("aaaaaaaaaa1")).await);
    w.drain().await;
    let record = assert_ok!(
        w.state
            .registry
            .verification_status(&first.submission_id)
            .await
    );
    assert_eq!(record.status, VerificationStatus::Rejected);
    assert_eq!(record.error_code, None);

    w.video("bbbbbbbbbb2", "UC-alice", 900);
    w.transcripts.add("bbbbbbbbbb2", "Acme all day", None);
    w.judge.set_reply(campayn::services::mock::APPROVING_REPLY);
    let second = assert_ok!(w.state.registry.submit(entry("bbbbbbbbbb2")).await);
    assert_eq!(second.submission_id, first.submission_id);
    w.drain().await;

    let submissions = assert_ok!(w.state.registry.list_for_campaign(1).await);
    assert_eq!(submissions.len(), 1);
    assert_eq!(
        submissions[0].verification.status,
        VerificationStatus::Approved
    );
}

#[tokio::test]
async fn video_from_another_channel_is_refused() {
    let w = world();
    w.campaign(1).await;
    w.verified_influencer("0xalice", "UC-alice").await;
    w.verified_influencer("0xbob", "UC-bob").await;
    w.clock.advance(Duration::hours(1));
    w.video("bbbbbbbbbb2", "UC-bob", 100);

    let err = w.state.registry.submit(entry("bbbbbbbbbb2")).await.unwrap_err();
    assert!(matches!(err, EngineError::OwnershipMismatch { .. }));
    assert!(assert_ok!(w.state.registry.list_for_campaign(1).await).is_empty());
}
