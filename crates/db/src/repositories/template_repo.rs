//! Repository for the `chain_templates` table.
//!
//! Templates are immutable once a non-terminal job references them: an
//! edit either creates a new `(name, version + 1)` row or is rejected.
//! Step-list validation itself lives in `folio_core::chain` and is the
//! caller's responsibility; this repository only persists.

use sqlx::PgPool;

use folio_core::status::{JobState, StatusId};
use folio_core::types::DbId;

use crate::models::template::ChainTemplate;

/// Column list for `chain_templates` queries.
const COLUMNS: &str = "id, name, version, steps, created_at, updated_at";

/// Job states that no longer pin their template.
const TERMINAL_JOB_STATES: [StatusId; 4] = [
    JobState::Completed as StatusId,
    JobState::CompletedWithErrors as StatusId,
    JobState::Failed as StatusId,
    JobState::Cancelled as StatusId,
];

/// Provides persistence for chain templates.
pub struct TemplateRepo;

impl TemplateRepo {
    /// Create a new template at version 1.
    ///
    /// Fails with a unique-constraint violation (mapped to 409 at the API
    /// layer) if `(name, 1)` already exists.
    pub async fn create(
        pool: &PgPool,
        name: &str,
        steps: &serde_json::Value,
    ) -> Result<ChainTemplate, sqlx::Error> {
        let query = format!(
            "INSERT INTO chain_templates (name, version, steps) \
             VALUES ($1, 1, $2) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ChainTemplate>(&query)
            .bind(name)
            .bind(steps)
            .fetch_one(pool)
            .await
    }

    /// Create the next version of an existing template.
    ///
    /// The new row shares the original's `name` with `version` set to one
    /// past the highest existing version for that name.
    pub async fn create_version(
        pool: &PgPool,
        template_id: DbId,
        steps: &serde_json::Value,
    ) -> Result<Option<ChainTemplate>, sqlx::Error> {
        let query = format!(
            "INSERT INTO chain_templates (name, version, steps) \
             SELECT t.name, \
                    (SELECT MAX(version) + 1 FROM chain_templates WHERE name = t.name), \
                    $2 \
             FROM chain_templates t WHERE t.id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ChainTemplate>(&query)
            .bind(template_id)
            .bind(steps)
            .fetch_optional(pool)
            .await
    }

    /// Find a template by its ID.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<ChainTemplate>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM chain_templates WHERE id = $1");
        sqlx::query_as::<_, ChainTemplate>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List all templates, newest version of each name first.
    pub async fn list(pool: &PgPool) -> Result<Vec<ChainTemplate>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM chain_templates ORDER BY name ASC, version DESC"
        );
        sqlx::query_as::<_, ChainTemplate>(&query).fetch_all(pool).await
    }

    /// Whether any non-terminal job still references this template.
    ///
    /// While this returns `true`, the template must not be edited in
    /// place; editors are directed to [`create_version`](Self::create_version).
    pub async fn is_pinned(pool: &PgPool, template_id: DbId) -> Result<bool, sqlx::Error> {
        let (pinned,): (bool,) = sqlx::query_as(
            "SELECT EXISTS ( \
                 SELECT 1 FROM jobs \
                 WHERE template_id = $1 AND state_id NOT IN ($2, $3, $4, $5) \
             )",
        )
        .bind(template_id)
        .bind(TERMINAL_JOB_STATES[0])
        .bind(TERMINAL_JOB_STATES[1])
        .bind(TERMINAL_JOB_STATES[2])
        .bind(TERMINAL_JOB_STATES[3])
        .fetch_one(pool)
        .await?;
        Ok(pinned)
    }
}
