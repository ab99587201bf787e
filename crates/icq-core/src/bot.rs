//! The [`Bot`] trait: the seam between the framework and the HTTP transport.
//!
//! A bot implementation only has to move bytes: run a GET with query
//! parameters, run a multipart POST, and (optionally) specialise the long-poll
//! fetch. Every typed vendor method lives in [`BotApi`](crate::api::BotApi),
//! which is implemented for all bots.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{ApiError, ApiResult};
use crate::markup::ParseMode;
use crate::model::EventBatch;
use crate::query::Query;

/// A file to upload with `messages/sendFile` or `messages/sendVoice`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub mime: Option<String>,
}

impl FileUpload {
    pub fn from_bytes(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
            mime: None,
        }
    }

    /// Reads a local file; the upload is named after the file.
    pub async fn from_path(path: impl AsRef<Path>) -> ApiResult<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| ApiError::Io(format!("not a file path: {}", path.display())))?;
        Ok(Self {
            file_name,
            bytes,
            mime: None,
        })
    }

    pub fn mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }
}

/// A connection to the bot API.
#[async_trait]
pub trait Bot: Send + Sync {
    /// Calls `method` (relative to `/bot/v1/`) with the given query and
    /// returns the decoded JSON body.
    async fn call(&self, method: &str, query: Query) -> ApiResult<Value>;

    /// Calls `method` as a multipart POST carrying `file`.
    async fn upload(&self, method: &str, query: Query, file: FileUpload) -> ApiResult<Value>;

    /// Long-polls `events/get`.
    ///
    /// A timeout must surface as [`ApiError::Timeout`], never as an empty batch.
    async fn fetch_events(&self, last_event_id: i64, poll_time: u64) -> ApiResult<EventBatch> {
        let query = Query::new()
            .param("lastEventId", last_event_id)
            .param("pollTime", poll_time);
        let body = self.call("events/get", query).await?;
        Ok(serde_json::from_value(body)?)
    }

    /// Parse mode applied when a call does not choose one.
    fn parse_mode(&self) -> ParseMode {
        ParseMode::Html
    }
}

/// A shared bot handle.
pub type BoxedBot = Arc<dyn Bot>;
