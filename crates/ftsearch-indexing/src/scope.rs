//! Scope resolution from an attachment's container
//!
//! Each container kind has its own mapping function. Containers outside the
//! built-in kinds are indexed only when they expose a project association.

use ftsearch_meta_data::{
    Container, ContainerEntity, Issue, Message, ProjectRef, SearcherRecord, WikiPage,
};

/// Issue-specific scope fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IssueScope {
    pub issue_id: i64,
    pub status_id: i64,
    pub is_private: bool,
}

/// Denormalized scope copied onto a searcher record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    pub project_id: i64,
    pub project_name: String,
    pub issue: Option<IssueScope>,
}

impl Scope {
    fn of_project(project: &ProjectRef) -> Self {
        Self {
            project_id: project.id,
            project_name: project.name.clone(),
            issue: None,
        }
    }

    /// Overwrite the scope fields of `record`
    pub fn apply_to(&self, record: &mut SearcherRecord) {
        record.clear_scope();
        record.project_id = Some(self.project_id);
        record.project_name = Some(self.project_name.clone());
        if let Some(issue) = self.issue {
            record.issue_id = Some(issue.issue_id);
            record.status_id = Some(issue.status_id);
            record.is_private = Some(issue.is_private);
        }
    }
}

/// Resolve the scope of a container, `None` when it cannot be indexed
pub fn resolve_scope(container: &Container) -> Option<Scope> {
    match container {
        Container::Project(project) => Some(Scope::of_project(project)),
        Container::Message(message) => Some(message_scope(message)),
        Container::WikiPage(page) => Some(wiki_page_scope(page)),
        Container::Issue(issue) => Some(issue_scope(issue)),
        Container::Other(entity) => associated_scope(entity.as_ref()),
    }
}

fn message_scope(message: &Message) -> Scope {
    Scope::of_project(&message.board.project)
}

fn wiki_page_scope(page: &WikiPage) -> Scope {
    Scope::of_project(&page.wiki.project)
}

fn issue_scope(issue: &Issue) -> Scope {
    Scope {
        issue: Some(IssueScope {
            issue_id: issue.id,
            status_id: issue.status_id,
            is_private: issue.is_private,
        }),
        ..Scope::of_project(&issue.project)
    }
}

fn associated_scope(entity: &dyn ContainerEntity) -> Option<Scope> {
    entity
        .project_association()
        .map(|association| Scope::of_project(association.project()))
}
