//! BigQuery REST loader.
//!
//! Runs `SELECT *` over the configured table with `jobs.query` and pages
//! through `jobs.getQueryResults` until the job is complete and no page
//! token remains. Rows come back as `{"f": [{"v": ..}]}` cells aligned with
//! `schema.fields`; they are flattened into name-keyed objects here.
//!
//! The whole fetch, polls included, is bounded by the configured query
//! deadline.

use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::{Value, json};

use super::{DataLoader, LoadError};
use crate::config::BigQueryConfig;
use crate::domain::RawRecord;

/// Rows requested per page.
const PAGE_SIZE: u32 = 10_000;

/// Server-side wait per request while the job is running.
const JOB_WAIT_MS: u32 = 10_000;

/// Pause before re-polling a job that is still running.
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Upstream error bodies are cut to this many characters in errors.
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    #[serde(default)]
    job_complete: bool,
    schema: Option<TableSchema>,
    #[serde(default)]
    rows: Vec<TableRow>,
    page_token: Option<String>,
    job_reference: Option<JobReference>,
    #[serde(default)]
    errors: Vec<ErrorProto>,
}

#[derive(Debug, Deserialize)]
struct TableSchema {
    #[serde(default)]
    fields: Vec<FieldSchema>,
}

#[derive(Debug, Deserialize)]
struct FieldSchema {
    name: String,
    #[serde(rename = "type", default)]
    field_type: String,
}

#[derive(Debug, Deserialize)]
struct TableRow {
    #[serde(default)]
    f: Vec<TableCell>,
}

#[derive(Debug, Deserialize)]
struct TableCell {
    #[serde(default)]
    v: Value,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobReference {
    project_id: String,
    job_id: String,
    location: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorProto {
    #[serde(default)]
    message: String,
    reason: Option<String>,
}

/// Loads the homeowners table through the BigQuery v2 REST API.
#[derive(Debug, Clone)]
pub struct BigQueryLoader {
    client: Client,
    config: BigQueryConfig,
}

impl BigQueryLoader {
    /// Creates a loader with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Http`] if the HTTP client cannot be built.
    pub fn new(config: BigQueryConfig) -> Result<Self, LoadError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    async fn start_query(&self) -> Result<QueryResponse, LoadError> {
        let url = format!(
            "{}/projects/{}/queries",
            self.config.api_base, self.config.project
        );
        let body = json!({
            "query": format!("SELECT * FROM {}", self.config.table_ref()),
            "useLegacySql": false,
            "maxResults": PAGE_SIZE,
            "timeoutMs": JOB_WAIT_MS,
        });
        self.send(self.client.post(url).json(&body)).await
    }

    async fn query_results(
        &self,
        job: &JobReference,
        page_token: Option<&str>,
    ) -> Result<QueryResponse, LoadError> {
        let url = format!(
            "{}/projects/{}/queries/{}",
            self.config.api_base, job.project_id, job.job_id
        );
        let mut query: Vec<(&str, String)> = vec![
            ("maxResults", PAGE_SIZE.to_string()),
            ("timeoutMs", JOB_WAIT_MS.to_string()),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token.to_string()));
        }
        if let Some(location) = &job.location {
            query.push(("location", location.clone()));
        }
        self.send(self.client.get(url).query(&query)).await
    }

    async fn send(&self, request: RequestBuilder) -> Result<QueryResponse, LoadError> {
        let request = match &self.config.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LoadError::Status {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY).collect(),
            });
        }
        let parsed: QueryResponse = response.json().await?;
        if let Some(err) = parsed.errors.first() {
            return Err(LoadError::Query(match &err.reason {
                Some(reason) => format!("{reason}: {}", err.message),
                None => err.message.clone(),
            }));
        }
        Ok(parsed)
    }

    async fn fetch_pages(&self) -> Result<Vec<RawRecord>, LoadError> {
        let mut response = self.start_query().await?;
        let mut fields: Option<Vec<FieldSchema>> = None;
        let mut records = Vec::new();

        loop {
            let page_token = response.page_token.take();
            if response.job_complete {
                if fields.is_none() {
                    fields = response.schema.take().map(|s| s.fields);
                }
                let Some(fields) = fields.as_deref() else {
                    return Err(LoadError::Query("response has no schema".to_string()));
                };
                records.extend(response.rows.into_iter().map(|row| decode_row(fields, row)));
                if page_token.is_none() {
                    break;
                }
            }
            let Some(job) = response.job_reference.take() else {
                return Err(LoadError::Query("response has no job reference".to_string()));
            };
            if response.job_complete {
                tracing::debug!(job_id = %job.job_id, rows = records.len(), "fetching next result page");
            } else {
                tracing::debug!(job_id = %job.job_id, "job still running");
                tokio::time::sleep(POLL_INTERVAL).await;
            }
            response = self.query_results(&job, page_token.as_deref()).await?;
        }

        Ok(records)
    }
}

#[async_trait]
impl DataLoader for BigQueryLoader {
    async fn fetch_all(&self) -> Result<Vec<RawRecord>, LoadError> {
        let deadline = self.config.query_deadline;
        tokio::time::timeout(deadline, self.fetch_pages())
            .await
            .map_err(|_| {
                LoadError::Query(format!(
                    "job did not complete within {}s",
                    deadline.as_secs()
                ))
            })?
    }

    fn describe(&self) -> String {
        format!("bigquery:{}", self.config.table_ref())
    }
}

fn decode_row(fields: &[FieldSchema], row: TableRow) -> RawRecord {
    fields
        .iter()
        .zip(row.f)
        .map(|(field, cell)| {
            let value = if field.field_type.eq_ignore_ascii_case("TIMESTAMP") {
                timestamp_to_rfc3339(&cell.v)
            } else {
                cell.v
            };
            (field.name.clone(), value)
        })
        .collect()
}

/// TIMESTAMP cells are epoch seconds encoded as a float string.
#[allow(clippy::cast_possible_truncation)]
fn timestamp_to_rfc3339(value: &Value) -> Value {
    let Some(secs) = value.as_str().and_then(|s| s.parse::<f64>().ok()) else {
        return Value::Null;
    };
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1e9).round() as u32;
    DateTime::from_timestamp(whole as i64, nanos.min(999_999_999))
        .map_or(Value::Null, |dt| Value::String(dt.to_rfc3339()))
}
