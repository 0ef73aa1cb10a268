//! Attachment lookup against the host application's `attachments` table
//!
//! Files live under `<storage_dir>/<disk_directory>/<disk_filename>`. The
//! container is carried only as an id and type name: the worker needs the
//! file, and scope was already resolved when the host upserted the record.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::{PgPool, Row, postgres::PgRow};

use ftsearch_indexing::{AttachmentSource, IndexerError, IndexerResult};
use ftsearch_meta_data::{Attachment, Container, ContainerEntity};

const FIND_ATTACHMENT: &str = "SELECT id, container_id, container_type, filename, description, \
     created_on, content_type, disk_directory, disk_filename \
     FROM attachments WHERE id = $1";

/// Container known only by the host's polymorphic reference
#[derive(Debug)]
struct HostContainer {
    id: i64,
    type_name: String,
}

impl ContainerEntity for HostContainer {
    fn id(&self) -> i64 {
        self.id
    }

    fn type_name(&self) -> &str {
        &self.type_name
    }
}

pub struct HostAttachmentSource {
    pool: PgPool,
    storage_dir: PathBuf,
}

impl HostAttachmentSource {
    pub const fn new(pool: PgPool, storage_dir: PathBuf) -> Self {
        Self { pool, storage_dir }
    }

    fn attachment_from_row(&self, row: &PgRow) -> Result<Attachment, sqlx::Error> {
        let container_id: Option<i64> = row.try_get("container_id")?;
        let container_type: Option<String> = row.try_get("container_type")?;
        let container = container_id.zip(container_type).map(|(id, type_name)| {
            Container::Other(Arc::new(HostContainer { id, type_name }) as Arc<dyn ContainerEntity>)
        });

        let directory: Option<String> = row.try_get("disk_directory")?;
        let disk_filename: String = row.try_get("disk_filename")?;
        let created_on: NaiveDateTime = row.try_get("created_on")?;

        Ok(Attachment {
            id: row.try_get("id")?,
            filename: row.try_get("filename")?,
            description: row.try_get("description")?,
            created_on: created_on.and_utc(),
            content_type: row.try_get("content_type")?,
            disk_path: disk_path(&self.storage_dir, directory.as_deref(), &disk_filename),
            container,
        })
    }
}

#[async_trait]
impl AttachmentSource for HostAttachmentSource {
    async fn find_attachment(&self, original_id: i64) -> IndexerResult<Option<Attachment>> {
        let lookup_failed = |e: sqlx::Error| IndexerError::AttachmentSource {
            attachment_id: original_id,
            message: e.to_string(),
        };

        let row = sqlx::query(FIND_ATTACHMENT)
            .bind(original_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(lookup_failed)?;

        row.map(|row| self.attachment_from_row(&row))
            .transpose()
            .map_err(lookup_failed)
    }
}

fn disk_path(storage_dir: &Path, directory: Option<&str>, disk_filename: &str) -> PathBuf {
    let mut path = storage_dir.to_path_buf();
    if let Some(directory) = directory.filter(|directory| !directory.is_empty()) {
        path.push(directory);
    }
    path.push(disk_filename);
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disk_path_includes_directory() {
        let path = disk_path(Path::new("/srv/files"), Some("2024/05"), "1715_report.pdf");
        assert_eq!(path, PathBuf::from("/srv/files/2024/05/1715_report.pdf"));
    }

    #[test]
    fn test_disk_path_without_directory() {
        assert_eq!(
            disk_path(Path::new("files"), None, "a.txt"),
            PathBuf::from("files/a.txt")
        );
        assert_eq!(
            disk_path(Path::new("files"), Some(""), "a.txt"),
            PathBuf::from("files/a.txt")
        );
    }

    #[test]
    fn test_host_container_reports_reference() {
        let container = Container::Other(Arc::new(HostContainer {
            id: 7,
            type_name: "Document".to_string(),
        }));
        assert_eq!(container.id(), 7);
        assert_eq!(container.type_name(), "Document");
    }
}
