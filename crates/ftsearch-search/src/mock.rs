//! Canned search executor for testing

#![allow(clippy::unwrap_used)] // Mocks can panic on lock poisoning

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::client::SearchExecutor;
use crate::compiler::CompiledQuery;

/// Returns queued responses in order and records every query it receives
#[derive(Clone, Default)]
pub struct MockSearchExecutor {
    pub queries: Arc<Mutex<Vec<CompiledQuery>>>,
    responses: Arc<Mutex<VecDeque<Result<Option<String>, String>>>>,
}

impl MockSearchExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a raw JSON response
    pub fn respond_with(&self, raw: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(Some(raw.to_string())));
    }

    /// Queue a NULL result
    pub fn respond_null(&self) {
        self.responses.lock().unwrap().push_back(Ok(None));
    }

    /// Queue a driver failure
    pub fn fail_with(&self, message: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
    }

    pub fn last_query(&self) -> Option<CompiledQuery> {
        self.queries.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl SearchExecutor for MockSearchExecutor {
    async fn select_value(&self, query: &CompiledQuery) -> Result<Option<String>, sqlx::Error> {
        self.queries.lock().unwrap().push(query.clone());
        match self.responses.lock().unwrap().pop_front() {
            Some(Ok(raw)) => Ok(raw),
            Some(Err(message)) => Err(sqlx::Error::Protocol(message)),
            None => Err(sqlx::Error::RowNotFound),
        }
    }
}
