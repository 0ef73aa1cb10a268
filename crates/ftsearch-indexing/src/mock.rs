//! In-memory attachment source for testing

#![allow(clippy::unwrap_used)] // Mocks can panic on lock poisoning

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use ftsearch_meta_data::Attachment;

use crate::error::{IndexerError, IndexerResult};
use crate::source::AttachmentSource;

/// Mock attachment source backed by a map
#[derive(Clone, Default)]
pub struct MockAttachmentSource {
    pub attachments: Arc<Mutex<HashMap<i64, Attachment>>>,
    fail_next: Arc<Mutex<Option<String>>>,
}

impl MockAttachmentSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attachments(attachments: impl IntoIterator<Item = Attachment>) -> Self {
        let source = Self::new();
        for attachment in attachments {
            source.insert(attachment);
        }
        source
    }

    pub fn insert(&self, attachment: Attachment) {
        self.attachments
            .lock()
            .unwrap()
            .insert(attachment.id, attachment);
    }

    pub fn remove(&self, attachment_id: i64) -> Option<Attachment> {
        self.attachments.lock().unwrap().remove(&attachment_id)
    }

    /// Configure to fail on next lookup
    pub fn fail_next(&self, message: &str) {
        *self.fail_next.lock().unwrap() = Some(message.to_string());
    }
}

#[async_trait]
impl AttachmentSource for MockAttachmentSource {
    async fn find_attachment(&self, original_id: i64) -> IndexerResult<Option<Attachment>> {
        if let Some(message) = self.fail_next.lock().unwrap().take() {
            return Err(IndexerError::AttachmentSource {
                attachment_id: original_id,
                message,
            });
        }
        Ok(self.attachments.lock().unwrap().get(&original_id).cloned())
    }
}
