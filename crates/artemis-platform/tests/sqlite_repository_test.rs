//! Integration tests for the SQLite proposal repository using a temporary
//! database file.

use std::sync::Arc;

use artemis_core::{
    DecisionKind, DecisionRequest, ProposalPayload, ProposalRepository, ProposalStage,
    RepositoryError, WorkflowError,
};
use artemis_platform::{SqliteProposalRepository, connect_database};
use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use uuid::Uuid;

/// Helper: fresh database file with the schema applied.
async fn setup() -> SqliteProposalRepository {
    let path = std::env::temp_dir()
        .join(format!("artemis-db-{}", Uuid::new_v4()))
        .join("artemis.db");
    let url = format!("sqlite://{}", path.display());
    let pool = connect_database(&url, 5).await.unwrap();
    SqliteProposalRepository::new(pool)
}

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 20, 10, 0, 0).unwrap()
}

fn payload(group_id: &str, total: u32) -> ProposalPayload {
    serde_json::from_value(json!({
        "groupId": group_id,
        "groupName": "Palm Drive traders",
        "leaderName": "Luci Machado",
        "leaderPhone": "(555) 123-4567",
        "totalAmount": total,
        "members": [
            { "memberId": "1001", "name": "Luci Machado", "loanAmount": total,
              "loanGoal": "Inventory purchase",
              "evidence": {
                  "clientSelfie": { "uri": "selfie.jpg", "capturedAt": "2026-01-10T09:00:00Z" },
                  "idFront": { "uri": "id-front.jpg", "capturedAt": "2026-01-10T09:00:00Z" }
              },
              "signature": "data:image/png;base64,AAAA" }
        ],
        "contractText": "Group loan contract"
    }))
    .unwrap()
}

fn decision(stage: ProposalStage, decision: DecisionKind) -> DecisionRequest {
    DecisionRequest {
        stage,
        decision,
        reasons: vec![],
        comment: None,
        user_id: "reviewer-1".to_string(),
    }
}

#[tokio::test]
async fn submission_starts_at_doc_review() {
    let repository = setup().await;
    let receipt = repository
        .submit("p-1", payload("GRP-1", 5_000), base_time())
        .await
        .unwrap();
    assert_eq!(receipt.proposal_id, "p-1");
    assert_eq!(receipt.stage, ProposalStage::DocReview);
    assert_eq!(receipt.submitted_at, base_time());

    let detail = repository.get("p-1").await.unwrap().unwrap();
    assert_eq!(detail.stage, ProposalStage::DocReview);
    assert_eq!(detail.payload, payload("GRP-1", 5_000));
    assert!(detail.decisions.is_empty());
}

#[tokio::test]
async fn duplicate_and_invalid_submissions_are_refused() {
    let repository = setup().await;
    repository
        .submit("p-1", payload("GRP-1", 5_000), base_time())
        .await
        .unwrap();

    let duplicate = repository
        .submit("p-1", payload("GRP-2", 1_000), base_time())
        .await
        .unwrap_err();
    assert!(matches!(duplicate, RepositoryError::Duplicate { .. }));

    let mut invalid = payload("GRP-3", 1_000);
    invalid.members.clear();
    let err = repository
        .submit("p-3", invalid, base_time())
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::Invalid(_)));
    assert!(repository.get("p-3").await.unwrap().is_none());
}

#[tokio::test]
async fn queue_lists_newest_first_with_evidence_counts() {
    let repository = setup().await;
    for (index, id) in ["p-old", "p-mid", "p-new"].into_iter().enumerate() {
        repository
            .submit(
                id,
                payload("GRP-1", 1_000),
                base_time() + Duration::minutes(index as i64),
            )
            .await
            .unwrap();
    }

    let queue = repository
        .list_by_stage(ProposalStage::DocReview)
        .await
        .unwrap();
    let ids: Vec<&str> = queue.iter().map(|item| item.proposal_id.as_str()).collect();
    assert_eq!(ids, vec!["p-new", "p-mid", "p-old"]);
    assert_eq!(queue[0].evidence_required_count, 9);
    assert_eq!(queue[0].evidence_completed_count, 2);
    assert_eq!(queue[0].members_count, 1);

    assert!(
        repository
            .list_by_stage(ProposalStage::RiskReview)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn stage_mismatch_writes_nothing() {
    let repository = setup().await;
    repository
        .submit("p-1", payload("GRP-1", 5_000), base_time())
        .await
        .unwrap();

    let err = repository
        .record_decision(
            "p-1",
            decision(ProposalStage::RiskReview, DecisionKind::Approve),
            base_time(),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RepositoryError::Workflow(WorkflowError::StageMismatch {
            current: ProposalStage::DocReview,
            attempted: ProposalStage::RiskReview
        })
    ));

    let detail = repository.get("p-1").await.unwrap().unwrap();
    assert_eq!(detail.stage, ProposalStage::DocReview);
    assert!(detail.decisions.is_empty());
}

#[tokio::test]
async fn approvals_reach_approved_and_stay_final() {
    let repository = setup().await;
    repository
        .submit("p-1", payload("GRP-1", 5_000), base_time())
        .await
        .unwrap();

    let first = repository
        .record_decision(
            "p-1",
            DecisionRequest {
                reasons: vec!["Documents verified".to_string()],
                comment: Some("All IDs legible".to_string()),
                ..decision(ProposalStage::DocReview, DecisionKind::Approve)
            },
            base_time() + Duration::hours(1),
        )
        .await
        .unwrap();
    assert_eq!(first.previous_stage, ProposalStage::DocReview);
    assert_eq!(first.new_stage, ProposalStage::RiskReview);

    let second = repository
        .record_decision(
            "p-1",
            decision(ProposalStage::RiskReview, DecisionKind::Approve),
            base_time() + Duration::hours(2),
        )
        .await
        .unwrap();
    assert_eq!(second.new_stage, ProposalStage::Approved);

    let detail = repository.get("p-1").await.unwrap().unwrap();
    assert_eq!(detail.stage, ProposalStage::Approved);
    assert_eq!(detail.decisions.len(), 2);
    assert_eq!(detail.decisions[0].decision_id, first.decision_id);
    assert_eq!(detail.decisions[0].reasons, vec!["Documents verified".to_string()]);
    assert_eq!(detail.decisions[0].comment.as_deref(), Some("All IDs legible"));
    assert_eq!(
        detail.decisions[0].created_at,
        base_time() + Duration::hours(1)
    );
    assert_eq!(detail.decisions[1].stage, ProposalStage::RiskReview);

    for stage in [ProposalStage::DocReview, ProposalStage::RiskReview] {
        let err = repository
            .record_decision("p-1", decision(stage, DecisionKind::Reject), base_time())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::Workflow(WorkflowError::AlreadyFinal {
                current: ProposalStage::Approved
            })
        ));
    }
    assert_eq!(repository.get("p-1").await.unwrap().unwrap().decisions.len(), 2);
}

#[tokio::test]
async fn rejection_from_doc_review() {
    let repository = setup().await;
    repository
        .submit("p-1", payload("GRP-1", 5_000), base_time())
        .await
        .unwrap();

    let outcome = repository
        .record_decision(
            "p-1",
            decision(ProposalStage::DocReview, DecisionKind::Reject),
            base_time(),
        )
        .await
        .unwrap();
    assert_eq!(outcome.new_stage, ProposalStage::Rejected);

    let rejected = repository
        .list_by_stage(ProposalStage::Rejected)
        .await
        .unwrap();
    assert_eq!(rejected.len(), 1);
}

#[tokio::test]
async fn unknown_proposal_is_not_found() {
    let repository = setup().await;
    let err = repository
        .record_decision(
            "nope",
            decision(ProposalStage::DocReview, DecisionKind::Approve),
            base_time(),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RepositoryError::Workflow(WorkflowError::NotFound { .. })
    ));
}

#[tokio::test]
async fn concurrent_decisions_apply_once() {
    let repository = Arc::new(setup().await);
    repository
        .submit("p-1", payload("GRP-1", 5_000), base_time())
        .await
        .unwrap();

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let repository = repository.clone();
            tokio::spawn(async move {
                repository
                    .record_decision(
                        "p-1",
                        decision(ProposalStage::DocReview, DecisionKind::Approve),
                        Utc::now(),
                    )
                    .await
            })
        })
        .collect();

    let mut succeeded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(outcome) => {
                succeeded += 1;
                assert_eq!(outcome.new_stage, ProposalStage::RiskReview);
            }
            Err(err) => assert!(
                matches!(err, RepositoryError::Workflow(WorkflowError::StageMismatch { .. })),
                "{err}"
            ),
        }
    }
    assert_eq!(succeeded, 1);

    let detail = repository.get("p-1").await.unwrap().unwrap();
    assert_eq!(detail.stage, ProposalStage::RiskReview);
    assert_eq!(detail.decisions.len(), 1);
}

#[tokio::test]
async fn pipeline_counts_every_stage() {
    let repository = setup().await;
    repository
        .submit("p-1", payload("GRP-1", 5_000), base_time())
        .await
        .unwrap();
    repository
        .submit("p-2", payload("GRP-2", 2_500), base_time())
        .await
        .unwrap();
    repository
        .record_decision(
            "p-2",
            decision(ProposalStage::DocReview, DecisionKind::Approve),
            base_time(),
        )
        .await
        .unwrap();

    let pipeline = repository.pipeline().await.unwrap();
    assert_eq!(pipeline.len(), 4);
    assert_eq!(pipeline[0].stage, ProposalStage::DocReview);
    assert_eq!(pipeline[0].count, 1);
    assert_eq!(pipeline[0].total_amount, Decimal::from(5_000));
    assert_eq!(pipeline[1].count, 1);
    assert_eq!(pipeline[1].total_amount, Decimal::from(2_500));
    assert_eq!(pipeline[2].count, 0);
}
