use async_trait::async_trait;
use dashmap::DashMap;

use prism_core::{CaseId, CoreError, EntityId};

use crate::case::VerificationCase;

/// A case plus the optimistic-concurrency version guarding it.
#[derive(Debug, Clone)]
pub struct CaseRecord {
    pub case: VerificationCase,
    pub version: u64,
}

/// Persistence boundary for verification cases.
///
/// Updates are guarded by an expected-version check so that two reviewers
/// can never decide the same case simultaneously — a mismatch fails with
/// [`CoreError::ConcurrentModification`] and the caller must re-fetch and
/// retry, never silently overwrite.
#[async_trait]
pub trait CaseRepository: Send + Sync {
    /// Insert a freshly opened case at version 1.
    async fn insert(&self, case: VerificationCase) -> Result<CaseRecord, CoreError>;

    async fn get(&self, case_id: &CaseId) -> Result<CaseRecord, CoreError>;

    /// Atomically replace the case if the stored version matches
    /// `expected_version`. Returns the updated record.
    async fn update(
        &self,
        case: VerificationCase,
        expected_version: u64,
    ) -> Result<CaseRecord, CoreError>;

    /// The entity's case that is still in flight (not rejected or revoked),
    /// if any. A terminal history permits opening a fresh case.
    async fn active_for_entity(
        &self,
        entity_id: &EntityId,
    ) -> Result<Option<CaseRecord>, CoreError>;

    /// Every case ever opened for the entity, retained for audit.
    async fn history_for_entity(
        &self,
        entity_id: &EntityId,
    ) -> Result<Vec<CaseRecord>, CoreError>;
}

/// In-memory repository used by the node and tests. The version check runs
/// under the map entry's exclusive guard, so exactly one of two concurrent
/// updates at the same expected version can win.
pub struct InMemoryCaseRepository {
    records: DashMap<CaseId, CaseRecord>,
}

impl InMemoryCaseRepository {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for InMemoryCaseRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CaseRepository for InMemoryCaseRepository {
    async fn insert(&self, case: VerificationCase) -> Result<CaseRecord, CoreError> {
        let record = CaseRecord { case, version: 1 };
        let case_id = record.case.case_id.clone();
        if self.records.contains_key(&case_id) {
            return Err(CoreError::ValidationError(format!(
                "case {} already exists",
                case_id
            )));
        }
        self.records.insert(case_id, record.clone());
        Ok(record)
    }

    async fn get(&self, case_id: &CaseId) -> Result<CaseRecord, CoreError> {
        self.records
            .get(case_id)
            .map(|r| r.clone())
            .ok_or_else(|| CoreError::NotFound(format!("case {}", case_id)))
    }

    async fn update(
        &self,
        case: VerificationCase,
        expected_version: u64,
    ) -> Result<CaseRecord, CoreError> {
        let case_id = case.case_id.clone();
        let mut entry = self
            .records
            .get_mut(&case_id)
            .ok_or_else(|| CoreError::NotFound(format!("case {}", case_id)))?;

        if entry.version != expected_version {
            return Err(CoreError::ConcurrentModification {
                case_id: case_id.to_string(),
                expected: expected_version,
                actual: entry.version,
            });
        }

        entry.case = case;
        entry.version += 1;
        Ok(entry.clone())
    }

    async fn active_for_entity(
        &self,
        entity_id: &EntityId,
    ) -> Result<Option<CaseRecord>, CoreError> {
        Ok(self
            .records
            .iter()
            .filter(|r| r.case.entity_id == *entity_id && !r.case.state.is_terminal())
            .map(|r| r.clone())
            .max_by(|a, b| a.case.created_at.cmp(&b.case.created_at)))
    }

    async fn history_for_entity(
        &self,
        entity_id: &EntityId,
    ) -> Result<Vec<CaseRecord>, CoreError> {
        let mut history: Vec<CaseRecord> = self
            .records
            .iter()
            .filter(|r| r.case.entity_id == *entity_id)
            .map(|r| r.clone())
            .collect();
        history.sort_by(|a, b| a.case.created_at.cmp(&b.case.created_at));
        Ok(history)
    }
}
