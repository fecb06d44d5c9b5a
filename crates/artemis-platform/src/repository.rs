use anyhow::Context;
use artemis_core::{
    Decision, DecisionKind, DecisionOutcome, DecisionRequest, PipelineEntry, ProposalDetail,
    ProposalPayload, ProposalRepository, ProposalStage, ProposalSummary, RepositoryError,
    SubmissionReceipt, SubmittedProposal, WorkflowError, plan_decision,
};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::types::Json;
use sqlx::{Row, SqlitePool};
use tracing::debug;
use uuid::Uuid;

/// Fixed-width UTC timestamps so that text ordering in SQL matches time
/// ordering.
fn timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> anyhow::Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("invalid timestamp {raw}"))?
        .with_timezone(&Utc))
}

fn parse_stage(raw: &str) -> anyhow::Result<ProposalStage> {
    raw.parse()
        .with_context(|| format!("invalid stage {raw} in database"))
}

fn proposal_from_row(row: &SqliteRow) -> anyhow::Result<SubmittedProposal> {
    let stage: String = row.try_get("stage")?;
    let submitted_at: String = row.try_get("submitted_at")?;
    let Json(payload): Json<ProposalPayload> = row.try_get("payload")?;

    Ok(SubmittedProposal {
        proposal_id: row.try_get("proposal_id")?,
        stage: parse_stage(&stage)?,
        submitted_at: parse_timestamp(&submitted_at)?,
        payload,
    })
}

fn decision_from_row(row: &SqliteRow) -> anyhow::Result<Decision> {
    let decision_id: String = row.try_get("decision_id")?;
    let stage: String = row.try_get("stage")?;
    let decision: String = row.try_get("decision")?;
    let Json(reasons): Json<Vec<String>> = row.try_get("reasons")?;
    let created_at: String = row.try_get("created_at")?;

    Ok(Decision {
        decision_id: Uuid::parse_str(&decision_id)
            .with_context(|| format!("invalid decision id {decision_id}"))?,
        proposal_id: row.try_get("proposal_id")?,
        stage: parse_stage(&stage)?,
        decision: decision
            .parse::<DecisionKind>()
            .with_context(|| format!("invalid decision {decision} in database"))?,
        reasons,
        comment: row.try_get("comment")?,
        user_id: row.try_get("user_id")?,
        created_at: parse_timestamp(&created_at)?,
    })
}

#[derive(Clone)]
pub struct SqliteProposalRepository {
    pool: SqlitePool,
}

impl SqliteProposalRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn current_stage(&self, proposal_id: &str) -> Result<ProposalStage, RepositoryError> {
        let row = sqlx::query("SELECT stage FROM proposals WHERE proposal_id = ?")
            .bind(proposal_id)
            .fetch_optional(&self.pool)
            .await
            .context("failed to load proposal stage")?;

        let Some(row) = row else {
            return Err(WorkflowError::NotFound {
                proposal_id: proposal_id.to_string(),
            }
            .into());
        };
        let stage: String = row.try_get("stage").context("failed to read stage")?;
        Ok(parse_stage(&stage)?)
    }
}

#[async_trait]
impl ProposalRepository for SqliteProposalRepository {
    async fn submit(
        &self,
        proposal_id: &str,
        payload: ProposalPayload,
        submitted_at: DateTime<Utc>,
    ) -> Result<SubmissionReceipt, RepositoryError> {
        payload.validate()?;
        let proposal = SubmittedProposal::new(proposal_id, payload, submitted_at);

        let inserted = sqlx::query(
            r#"
            INSERT INTO proposals (proposal_id, stage, submitted_at, payload)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&proposal.proposal_id)
        .bind(proposal.stage.as_str())
        .bind(timestamp(proposal.submitted_at))
        .bind(Json(&proposal.payload))
        .execute(&self.pool)
        .await;

        match inserted {
            Ok(_) => Ok(proposal.receipt()),
            Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
                Err(RepositoryError::Duplicate {
                    proposal_id: proposal.proposal_id,
                })
            }
            Err(err) => Err(anyhow::Error::new(err)
                .context("failed to insert proposal")
                .into()),
        }
    }

    async fn list_by_stage(
        &self,
        stage: ProposalStage,
    ) -> Result<Vec<ProposalSummary>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT proposal_id, stage, submitted_at, payload
            FROM proposals
            WHERE stage = ?
            ORDER BY submitted_at DESC, proposal_id ASC
            "#,
        )
        .bind(stage.as_str())
        .fetch_all(&self.pool)
        .await
        .context("failed to list proposals")?;

        let summaries = rows
            .iter()
            .map(|row| proposal_from_row(row).map(|proposal| proposal.summary()))
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(summaries)
    }

    async fn get(&self, proposal_id: &str) -> Result<Option<ProposalDetail>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT proposal_id, stage, submitted_at, payload
            FROM proposals
            WHERE proposal_id = ?
            "#,
        )
        .bind(proposal_id)
        .fetch_optional(&self.pool)
        .await
        .context("failed to load proposal")?;

        let Some(row) = row else {
            return Ok(None);
        };
        let proposal = proposal_from_row(&row)?;

        let decision_rows = sqlx::query(
            r#"
            SELECT decision_id, proposal_id, stage, decision, reasons, comment, user_id, created_at
            FROM decisions
            WHERE proposal_id = ?
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .bind(proposal_id)
        .fetch_all(&self.pool)
        .await
        .context("failed to load decisions")?;

        let decisions = decision_rows
            .iter()
            .map(decision_from_row)
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(Some(ProposalDetail::new(proposal, decisions)))
    }

    async fn record_decision(
        &self,
        proposal_id: &str,
        request: DecisionRequest,
        decided_at: DateTime<Utc>,
    ) -> Result<DecisionOutcome, RepositoryError> {
        let request = request.validate()?;
        let current = self.current_stage(proposal_id).await?;
        let transition = plan_decision(current, request.stage, request.decision)?;

        let mut tx = self
            .pool
            .begin()
            .await
            .context("failed to begin decision transaction")?;

        // Only moves the proposal if nobody else did since `current` was read.
        let updated = sqlx::query(
            "UPDATE proposals SET stage = ? WHERE proposal_id = ? AND stage = ?",
        )
        .bind(transition.to.as_str())
        .bind(proposal_id)
        .bind(transition.from.as_str())
        .execute(&mut *tx)
        .await
        .context("failed to update proposal stage")?;

        if updated.rows_affected() == 0 {
            drop(tx);
            let now_at = self.current_stage(proposal_id).await?;
            debug!(proposal_id, stage = %now_at, "decision lost a race");
            plan_decision(now_at, request.stage, request.decision)?;
            return Err(WorkflowError::StageMismatch {
                current: now_at,
                attempted: request.stage,
            }
            .into());
        }

        let decision = Decision::record(proposal_id, request, decided_at);
        sqlx::query(
            r#"
            INSERT INTO decisions (
                decision_id, proposal_id, stage, decision, reasons, comment, user_id, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(decision.decision_id.to_string())
        .bind(&decision.proposal_id)
        .bind(decision.stage.as_str())
        .bind(decision.decision.as_str())
        .bind(Json(&decision.reasons))
        .bind(decision.comment.as_deref())
        .bind(&decision.user_id)
        .bind(timestamp(decision.created_at))
        .execute(&mut *tx)
        .await
        .context("failed to insert decision")?;

        tx.commit()
            .await
            .context("failed to commit decision transaction")?;

        Ok(DecisionOutcome {
            decision_id: decision.decision_id,
            previous_stage: transition.from,
            new_stage: transition.to,
            decision: transition.decision,
        })
    }

    async fn pipeline(&self) -> Result<Vec<PipelineEntry>, RepositoryError> {
        let rows = sqlx::query("SELECT proposal_id, stage, submitted_at, payload FROM proposals")
            .fetch_all(&self.pool)
            .await
            .context("failed to load pipeline")?;

        let proposals = rows
            .iter()
            .map(proposal_from_row)
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(PipelineEntry::tally(proposals.iter().map(|proposal| {
            (proposal.stage, proposal.payload.total_amount)
        })))
    }
}
