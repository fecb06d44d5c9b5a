use std::fs;
use std::path::{Path, PathBuf};

use artemis_core::{DomainError, DraftProposal, Group};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::demo::{DEMO_PROPOSAL_ID, demo_proposal};

#[derive(Debug, Error)]
pub enum DraftStoreError {
    #[error("draft proposal {0} not found")]
    NotFound(String),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("draft store IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("draft store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    proposals: Vec<DraftProposal>,
}

/// File-backed collection of draft proposals.
///
/// Every mutation is written through to disk (temp file, then rename), so
/// the file always holds the last committed state. [`DraftStore::close`]
/// performs a final flush and releases the store.
#[derive(Debug)]
pub struct DraftStore {
    path: PathBuf,
    data: StoreFile,
}

impl DraftStore {
    /// Loads the store from `path`. A missing or empty file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, DraftStoreError> {
        let path = path.into();
        let data = if path.exists() {
            let bytes = fs::read(&path)?;
            if bytes.is_empty() {
                StoreFile::default()
            } else {
                serde_json::from_slice(&bytes)?
            }
        } else {
            StoreFile::default()
        };

        debug!(path = %path.display(), drafts = data.proposals.len(), "draft store opened");
        Ok(Self { path, data })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn create_from_group(
        &mut self,
        group: Group,
        now: DateTime<Utc>,
    ) -> Result<DraftProposal, DraftStoreError> {
        let draft = DraftProposal::from_group(Uuid::new_v4().to_string(), group, now);
        self.data.proposals.push(draft.clone());
        self.flush()?;
        info!(proposal_id = %draft.id, group_id = %draft.group_id, "draft proposal created");
        Ok(draft)
    }

    /// Applies `edit` to the draft and persists the result. The summary
    /// fields are refreshed afterwards; when `edit` fails the stored draft is
    /// left untouched.
    pub fn update<T, F>(
        &mut self,
        id: &str,
        now: DateTime<Utc>,
        edit: F,
    ) -> Result<T, DraftStoreError>
    where
        F: FnOnce(&mut DraftProposal) -> Result<T, DomainError>,
    {
        let index = self.position(id)?;
        let mut draft = self.data.proposals[index].clone();
        let output = edit(&mut draft)?;
        draft.refresh_summary(now);

        self.data.proposals[index] = draft;
        self.flush()?;
        Ok(output)
    }

    /// Replaces a stored draft wholesale, e.g. after a contract session hands
    /// it back.
    pub fn save(&mut self, draft: DraftProposal) -> Result<(), DraftStoreError> {
        let index = self.position(&draft.id)?;
        self.data.proposals[index] = draft;
        self.flush()
    }

    pub fn get(&self, id: &str) -> Option<&DraftProposal> {
        self.data.proposals.iter().find(|draft| draft.id == id)
    }

    /// Drafts, most recently updated first.
    pub fn list(&self) -> Vec<&DraftProposal> {
        let mut drafts: Vec<&DraftProposal> = self.data.proposals.iter().collect();
        drafts.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        drafts
    }

    pub fn delete(&mut self, id: &str) -> Result<DraftProposal, DraftStoreError> {
        let index = self.position(id)?;
        let removed = self.data.proposals.remove(index);
        self.flush()?;
        info!(proposal_id = %id, "draft proposal deleted");
        Ok(removed)
    }

    /// Inserts the demo proposal unless it is already present. Returns
    /// whether it was inserted.
    pub fn seed_demo(&mut self, now: DateTime<Utc>) -> Result<bool, DraftStoreError> {
        if self.get(DEMO_PROPOSAL_ID).is_some() {
            return Ok(false);
        }

        self.data.proposals.push(demo_proposal(now)?);
        self.flush()?;
        info!(proposal_id = DEMO_PROPOSAL_ID, "demo proposal seeded");
        Ok(true)
    }

    pub fn flush(&self) -> Result<(), DraftStoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let bytes = serde_json::to_vec_pretty(&self.data)?;
        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, bytes)?;
        fs::rename(tmp_path, &self.path)?;
        Ok(())
    }

    pub fn close(self) -> Result<(), DraftStoreError> {
        self.flush()?;
        debug!(path = %self.path.display(), "draft store closed");
        Ok(())
    }

    fn position(&self, id: &str) -> Result<usize, DraftStoreError> {
        self.data
            .proposals
            .iter()
            .position(|draft| draft.id == id)
            .ok_or_else(|| DraftStoreError::NotFound(id.to_string()))
    }
}
