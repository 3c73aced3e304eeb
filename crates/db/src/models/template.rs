//! Chain template entity model.

use folio_core::chain::StepSpec;
use folio_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `chain_templates` table.
///
/// `steps` holds the ordered [`StepSpec`] list as JSONB. A template is
/// immutable once any non-terminal job references it; edits create a new
/// row with the same `name` and a bumped `version`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ChainTemplate {
    pub id: DbId,
    pub name: String,
    pub version: i32,
    pub steps: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ChainTemplate {
    /// Decode the JSONB step list into typed [`StepSpec`]s.
    pub fn parsed_steps(&self) -> Result<Vec<StepSpec>, serde_json::Error> {
        serde_json::from_value(self.steps.clone())
    }
}
