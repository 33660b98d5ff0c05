//! Test utilities shared by handler and application tests.

use crate::storage::{BlobCopier, CopyBlobRequest, CopyStarted, StorageError};
use crate::{AppState, config::Config};
use async_trait::async_trait;
use axum_test::TestServer;
use reqwest::StatusCode;
use std::sync::{Arc, Mutex};

/// Config with docs and metrics off, so tests do not touch global recorders.
pub fn create_test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        enable_metrics: false,
        enable_docs: false,
        ..Default::default()
    }
}

/// Serve the full router with `copier` standing in for the blob service.
pub fn create_test_server(copier: Arc<dyn BlobCopier>) -> TestServer {
    let state = AppState::builder().config(create_test_config()).copier(copier).build();
    let router = crate::build_router(&state).expect("Failed to build router");
    TestServer::new(router).expect("Failed to create test server")
}

/// [`BlobCopier`] that records every request and answers with a canned outcome.
pub struct RecordingCopier {
    calls: Mutex<Vec<CopyBlobRequest>>,
    outcome: Outcome,
}

enum Outcome {
    Accept(String),
    Reject(StatusCode, String),
}

impl RecordingCopier {
    pub fn accepting(status: &str) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            outcome: Outcome::Accept(status.to_string()),
        }
    }

    pub fn rejecting(status: StatusCode, message: &str) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            outcome: Outcome::Reject(status, message.to_string()),
        }
    }

    pub fn calls(&self) -> Vec<CopyBlobRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl BlobCopier for RecordingCopier {
    async fn start_copy(&self, request: &CopyBlobRequest) -> Result<CopyStarted, StorageError> {
        self.calls.lock().unwrap().push(request.clone());
        match &self.outcome {
            Outcome::Accept(status) => Ok(CopyStarted {
                status: status.clone(),
                copy_id: Some("00000000-0000-0000-0000-000000000000".to_string()),
            }),
            Outcome::Reject(status, message) => Err(StorageError::Service {
                status: *status,
                code: None,
                message: Some(message.clone()),
            }),
        }
    }
}
