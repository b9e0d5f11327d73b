//! The server-held employee table and the sources it is fetched from.

use std::{path::PathBuf, sync::Arc};

use async_graphql::{Enum, SimpleObject};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use entity::RecordTable;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, instrument, warn};

use crate::config::SourceConfig;

pub type RawRows = Vec<Vec<Value>>;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("dataset response is malformed: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("failed to read dataset file {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[async_trait]
pub trait RecordSource: Send + Sync {
    fn describe(&self) -> String;

    async fn fetch(&self) -> Result<RawRows, FetchError>;
}

#[derive(Deserialize)]
struct TableEnvelope {
    #[serde(rename = "TABLE_DATA")]
    table_data: TableData,
}

#[derive(Deserialize)]
struct TableData {
    data: RawRows,
}

/// Extract the nested `TABLE_DATA.data` rows from a response body.
pub fn parse_envelope(body: &[u8]) -> Result<RawRows, FetchError> {
    let envelope: TableEnvelope = serde_json::from_slice(body)?;
    Ok(envelope.table_data.data)
}

#[derive(Serialize)]
struct FetchCredentials<'a> {
    username: &'a str,
    password: &'a str,
}

/// The dataset endpoint: one POST carrying a fixed credential payload.
pub struct RemoteSource {
    client: reqwest::Client,
    config: SourceConfig,
}

impl RemoteSource {
    pub fn new(config: SourceConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl RecordSource for RemoteSource {
    fn describe(&self) -> String {
        self.config.url.clone()
    }

    async fn fetch(&self) -> Result<RawRows, FetchError> {
        let body = self
            .client
            .post(&self.config.url)
            .json(&FetchCredentials {
                username: &self.config.credentials.username,
                password: &self.config.credentials.password,
            })
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        parse_envelope(&body)
    }
}

/// A saved response body on disk, for offline development.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl RecordSource for FileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn fetch(&self) -> Result<RawRows, FetchError> {
        let body = tokio::fs::read(&self.path)
            .await
            .map_err(|source| FetchError::File {
                path: self.path.clone(),
                source,
            })?;
        parse_envelope(&body)
    }
}

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq, Serialize)]
pub enum LoadStatus {
    Pending,
    Loading,
    Ready,
    Failed,
}

#[derive(Clone, Debug, SimpleObject, Serialize)]
pub struct StoreStatus {
    pub status: LoadStatus,
    /// True until the first fetch has resolved or failed.
    pub loading: bool,
    pub rows: usize,
    pub row_issues: usize,
    pub last_error: Option<String>,
    pub fetched_at: Option<DateTime<Utc>>,
    /// True once any fetch has succeeded, even if a later reload failed.
    pub dataset_loaded: bool,
    pub source: String,
}

struct StoreState {
    table: Arc<RecordTable>,
    status: LoadStatus,
    resolved: bool,
    row_issues: usize,
    last_error: Option<String>,
    fetched_at: Option<DateTime<Utc>>,
}

/// Holds the current table. A successful fetch replaces it wholesale; a
/// failed one leaves it untouched.
pub struct RecordStore {
    source: Arc<dyn RecordSource>,
    state: RwLock<StoreState>,
    refresh_lock: Mutex<()>,
}

impl RecordStore {
    pub fn new(source: Arc<dyn RecordSource>) -> Self {
        Self {
            source,
            state: RwLock::new(StoreState {
                table: Arc::new(RecordTable::default()),
                status: LoadStatus::Pending,
                resolved: false,
                row_issues: 0,
                last_error: None,
                fetched_at: None,
            }),
            refresh_lock: Mutex::new(()),
        }
    }

    pub async fn snapshot(&self) -> Arc<RecordTable> {
        self.state.read().await.table.clone()
    }

    pub async fn is_loading(&self) -> bool {
        !self.state.read().await.resolved
    }

    pub async fn status(&self) -> StoreStatus {
        let state = self.state.read().await;
        StoreStatus {
            status: state.status,
            loading: !state.resolved,
            rows: state.table.len(),
            row_issues: state.row_issues,
            last_error: state.last_error.clone(),
            fetched_at: state.fetched_at,
            dataset_loaded: state.fetched_at.is_some(),
            source: self.source.describe(),
        }
    }

    #[instrument(name = "store.refresh", skip_all, fields(source = %self.source.describe()))]
    pub async fn refresh(&self) -> StoreStatus {
        let _serial = self.refresh_lock.lock().await;
        self.state.write().await.status = LoadStatus::Loading;

        let outcome = self.source.fetch().await;
        {
            let mut state = self.state.write().await;
            state.resolved = true;
            match outcome {
                Ok(rows) => {
                    let (table, issues) = RecordTable::from_rows(&rows);
                    for issue in &issues {
                        warn!(%issue, "coerced dataset cell");
                    }
                    info!(rows = table.len(), issues = issues.len(), "employee table loaded");
                    state.table = Arc::new(table);
                    state.row_issues = issues.len();
                    state.status = LoadStatus::Ready;
                    state.last_error = None;
                    state.fetched_at = Some(Utc::now());
                }
                Err(err) => {
                    warn!(error = %err, "employee table fetch failed");
                    state.status = LoadStatus::Failed;
                    state.last_error = Some(err.to_string());
                }
            }
        }
        self.status().await
    }
}
