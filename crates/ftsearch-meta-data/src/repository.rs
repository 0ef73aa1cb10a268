//! Database repository for searchable records

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use crate::error::{DatabaseErrorExt, DatabaseOperation, DatabaseResult};
use crate::models::SearcherRecord;
use crate::traits::SearcherRecordRepository;

const SELECT_COLUMNS: &str = r"
    SELECT id, original_id, original_type,
           container_id, container_type,
           project_id, project_name, issue_id, status_id, is_private,
           filename, description, original_created_on, content
    FROM searcher_records
";

/// `PostgreSQL` repository for the `searcher_records` table
#[derive(Clone)]
pub struct DbSearcherRecordRepository {
    pool: PgPool,
}

impl DbSearcherRecordRepository {
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SearcherRecordRepository for DbSearcherRecordRepository {
    async fn find_by_original(
        &self,
        original_id: i64,
        original_type: &str,
    ) -> DatabaseResult<Option<SearcherRecord>> {
        let operation = DatabaseOperation::FindByOriginal {
            original_id,
            original_type: original_type.to_string(),
        };

        sqlx::query_as::<_, SearcherRecord>(&format!(
            "{SELECT_COLUMNS} WHERE original_id = $1 AND original_type = $2"
        ))
        .bind(original_id)
        .bind(original_type)
        .fetch_optional(&self.pool)
        .await
        .map_db_err(operation, None)
    }

    async fn find_by_id(&self, id: i64) -> DatabaseResult<Option<SearcherRecord>> {
        sqlx::query_as::<_, SearcherRecord>(&format!("{SELECT_COLUMNS} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_db_err(DatabaseOperation::FindById { id }, None)
    }

    async fn save(&self, record: &SearcherRecord) -> DatabaseResult<i64> {
        let operation = DatabaseOperation::SaveRecord {
            original_id: record.original_id,
            original_type: record.original_type.clone(),
        };

        // Content is owned by update_content; an upsert never touches it.
        let row = sqlx::query(
            r"
            INSERT INTO searcher_records (
                original_id, original_type,
                container_id, container_type,
                project_id, project_name, issue_id, status_id, is_private,
                filename, description, original_created_on
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (original_id, original_type) DO UPDATE
            SET container_id = EXCLUDED.container_id,
                container_type = EXCLUDED.container_type,
                project_id = EXCLUDED.project_id,
                project_name = EXCLUDED.project_name,
                issue_id = EXCLUDED.issue_id,
                status_id = EXCLUDED.status_id,
                is_private = EXCLUDED.is_private,
                filename = EXCLUDED.filename,
                description = EXCLUDED.description,
                original_created_on = EXCLUDED.original_created_on
            RETURNING id
            ",
        )
        .bind(record.original_id)
        .bind(&record.original_type)
        .bind(record.container_id)
        .bind(&record.container_type)
        .bind(record.project_id)
        .bind(&record.project_name)
        .bind(record.issue_id)
        .bind(record.status_id)
        .bind(record.is_private)
        .bind(&record.filename)
        .bind(&record.description)
        .bind(record.original_created_on)
        .fetch_one(&self.pool)
        .await
        .map_db_err(operation.clone(), None)?;

        row.try_get("id").map_db_err(operation, None)
    }

    async fn update_content(&self, id: i64, content: &str) -> DatabaseResult<()> {
        let operation = DatabaseOperation::UpdateContent {
            id,
            content_bytes: content.len(),
        };

        sqlx::query("UPDATE searcher_records SET content = $2 WHERE id = $1")
            .bind(id)
            .bind(content)
            .execute(&self.pool)
            .await
            .map_db_err(operation, None)?;

        Ok(())
    }
}
