//! Data models for searchable records, host attachments and the extraction queue

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Entity kind stored in `original_type` for attachment-backed records
pub const ATTACHMENT_TYPE: &str = "Attachment";

/// Indexed, denormalized projection of an attachment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SearcherRecord {
    /// Database id, `None` until first saved
    pub id: Option<i64>,
    pub original_id: i64,
    pub original_type: String,

    // Scope
    pub container_id: Option<i64>,
    pub container_type: Option<String>,
    pub project_id: Option<i64>,
    pub project_name: Option<String>,
    pub issue_id: Option<i64>,
    pub status_id: Option<i64>,
    pub is_private: Option<bool>,

    // Content
    pub filename: Option<String>,
    pub description: Option<String>,
    pub original_created_on: Option<DateTime<Utc>>,
    /// Extracted text, absent until an extraction succeeds
    pub content: Option<String>,
}

impl SearcherRecord {
    /// Unsaved record carrying only its identity
    pub fn new(original_id: i64, original_type: impl Into<String>) -> Self {
        Self {
            original_id,
            original_type: original_type.into(),
            ..Self::default()
        }
    }

    /// Clear every scope field before a container variant fills in its own
    pub fn clear_scope(&mut self) {
        self.project_id = None;
        self.project_name = None;
        self.issue_id = None;
        self.status_id = None;
        self.is_private = None;
    }
}

/// Project reference as seen from the host application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRef {
    pub id: i64,
    pub name: String,
}

impl ProjectRef {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    pub id: i64,
    pub project: ProjectRef,
}

/// Forum message, scoped through its board
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: i64,
    pub board: Board,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wiki {
    pub id: i64,
    pub project: ProjectRef,
}

/// Wiki page, scoped through its wiki
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WikiPage {
    pub id: i64,
    pub wiki: Wiki,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub id: i64,
    pub project: ProjectRef,
    pub status_id: i64,
    pub is_private: bool,
}

/// Capability of a container to name the project it belongs to
pub trait HasProjectAssociation {
    fn project(&self) -> &ProjectRef;
}

/// Container kinds outside the built-in set (documents, versions, ...)
pub trait ContainerEntity: fmt::Debug + Send + Sync {
    fn id(&self) -> i64;

    /// Host-side type name stored in `container_type`
    fn type_name(&self) -> &str;

    /// Capability query; containers without a project return `None`
    fn project_association(&self) -> Option<&dyn HasProjectAssociation> {
        None
    }
}

/// Entity an attachment is attached to
#[derive(Debug, Clone)]
pub enum Container {
    Project(ProjectRef),
    Message(Message),
    WikiPage(WikiPage),
    Issue(Issue),
    Other(Arc<dyn ContainerEntity>),
}

impl Container {
    pub fn id(&self) -> i64 {
        match self {
            Self::Project(project) => project.id,
            Self::Message(message) => message.id,
            Self::WikiPage(page) => page.id,
            Self::Issue(issue) => issue.id,
            Self::Other(entity) => entity.id(),
        }
    }

    pub fn type_name(&self) -> &str {
        match self {
            Self::Project(_) => "Project",
            Self::Message(_) => "Message",
            Self::WikiPage(_) => "WikiPage",
            Self::Issue(_) => "Issue",
            Self::Other(entity) => entity.type_name(),
        }
    }
}

/// Attachment metadata handed over by the host application
#[derive(Debug, Clone)]
pub struct Attachment {
    pub id: i64,
    pub filename: String,
    pub description: Option<String>,
    pub created_on: DateTime<Utc>,
    /// MIME type reported at upload time
    pub content_type: Option<String>,
    pub disk_path: PathBuf,
    /// `None` while the upload is not attached to anything yet
    pub container: Option<Container>,
}

impl Attachment {
    pub fn container_type(&self) -> Option<&str> {
        self.container.as_ref().map(Container::type_name)
    }

    /// Whether the stored file can currently be opened for reading
    pub fn is_readable(&self) -> bool {
        std::fs::File::open(&self.disk_path)
            .and_then(|file| file.metadata())
            .is_ok_and(|metadata| metadata.is_file())
    }
}

/// Status of an extraction job
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(Self::Queued),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Invalid job status: {s}")),
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = match self {
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        write!(f, "{status}")
    }
}

/// Claimed entry of the `extract_text_jobs` queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ExtractionJob {
    pub id: i64,
    pub searcher_record_id: i64,
    pub retry_count: i32,
}

/// Queue depth statistics for monitoring
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueDepth {
    pub queued: i64,
    pub processing: i64,
    pub completed: i64,
    pub failed: i64,
}
