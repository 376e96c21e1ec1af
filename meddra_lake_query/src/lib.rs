//! Client for the ad-hoc query execution service that reads the lake's
//! catalog.
//!
//! The query service is an external collaborator behind the [`QueryEngine`]
//! trait: submit a statement, poll its state, page through its results. This
//! crate owns the polling discipline, a fixed interval against a hard
//! wall-clock deadline, and the shaping of raw result rows into records.
//! A run that outlives the deadline yields a distinct timeout outcome
//! carrying the execution id so a caller can keep polling out-of-band; it
//! never yields a partial result set.

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

/// How long [`QueryClient::run`] waits for a terminal state before giving
/// up on the run (the execution itself keeps going server-side).
pub const DEFAULT_QUERY_DEADLINE: Duration = Duration::from_secs(60);

/// Pause between successive state polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unknown query execution {id}")]
    UnknownExecution { id: String },

    #[error("query engine transport error: {message}")]
    Transport { message: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Identifier the engine assigns to a submitted execution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ExecutionId(String);

impl ExecutionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueryState {
    Queued,
    Running,
    Succeeded,
    Failed { reason: String },
    Cancelled,
}

impl QueryState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed { .. } | Self::Cancelled)
    }
}

/// Opaque continuation token for result pagination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageToken(String);

impl PageToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One page of raw result rows. The first row of the first page is the
/// column header row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultPage {
    pub rows: Vec<Vec<String>>,
    pub next: Option<PageToken>,
}

/// The query execution service boundary.
#[async_trait]
pub trait QueryEngine: fmt::Debug + Send + Sync + 'static {
    async fn start_query(&self, sql: &str, database: &str) -> Result<ExecutionId>;

    async fn query_state(&self, id: &ExecutionId) -> Result<QueryState>;

    async fn result_page(&self, id: &ExecutionId, token: Option<&PageToken>)
        -> Result<ResultPage>;
}

/// One result record: header name to cleaned string value, in header order.
pub type Row = IndexMap<String, String>;

/// What one query run produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QueryOutcome {
    /// `row_count` counts data rows; the header row is consumed into the
    /// record keys.
    Success { row_count: usize, data: Vec<Row> },
    Failed { state: QueryState },
    /// The deadline elapsed before the execution reached a terminal state.
    /// The id allows polling the still-running execution out-of-band.
    TimedOut { execution_id: ExecutionId },
}

/// Submits statements against one database and shepherds each execution to
/// an outcome.
#[derive(Debug)]
pub struct QueryClient<E> {
    engine: E,
    database: String,
    poll_interval: Duration,
    deadline: Duration,
}

impl<E: QueryEngine> QueryClient<E> {
    pub fn new(engine: E, database: impl Into<String>) -> Self {
        Self {
            engine,
            database: database.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            deadline: DEFAULT_QUERY_DEADLINE,
        }
    }

    /// Set a deadline other than [`DEFAULT_QUERY_DEADLINE`].
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Set a poll interval other than [`DEFAULT_POLL_INTERVAL`].
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Submit `sql` and poll it to an outcome.
    pub async fn run(&self, sql: &str) -> Result<QueryOutcome> {
        debug!(database = %self.database, sql, "executing query");
        let execution_id = self.engine.start_query(sql, &self.database).await?;
        debug!(%execution_id, "query execution started");

        let deadline = Instant::now() + self.deadline;
        let final_state = loop {
            if Instant::now() >= deadline {
                info!(%execution_id, "query deadline exceeded, leaving execution in flight");
                return Ok(QueryOutcome::TimedOut { execution_id });
            }

            let state = self.engine.query_state(&execution_id).await?;
            debug!(%execution_id, ?state, "query status");
            if state.is_terminal() {
                break state;
            }
            tokio::time::sleep(self.poll_interval).await;
        };

        if final_state != QueryState::Succeeded {
            return Ok(QueryOutcome::Failed { state: final_state });
        }

        let mut rows = Vec::new();
        let mut token: Option<PageToken> = None;
        loop {
            let page = self.engine.result_page(&execution_id, token.as_ref()).await?;
            rows.extend(page.rows);
            match page.next {
                Some(next) => token = Some(next),
                None => break,
            }
        }
        debug!(%execution_id, fetched = rows.len(), "fetched result rows including header");

        let data = rows_to_records(rows);
        Ok(QueryOutcome::Success {
            row_count: data.len(),
            data,
        })
    }
}

/// Convert raw rows into records: the first row becomes the column headers,
/// every later row a header-to-value map with cleaned values. Fewer than two
/// rows means there is no data.
fn rows_to_records(rows: Vec<Vec<String>>) -> Vec<Row> {
    let mut rows = rows.into_iter();
    let Some(columns) = rows.next() else {
        return Vec::new();
    };

    rows.map(|row| {
        columns
            .iter()
            .cloned()
            .zip(row.into_iter().map(|value| clean_value(&value)))
            .collect()
    })
    .collect()
}

/// Undo the engine's string quoting: trim, strip one layer of wrapping
/// quotes, and collapse doubled quote characters.
fn clean_value(value: &str) -> String {
    let trimmed = value.trim();
    let unwrapped = if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    };
    unwrapped.replace("\"\"", "\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replays a fixed state sequence (repeating the last entry) and serves
    /// a fixed set of result pages.
    #[derive(Debug, Default)]
    struct ScriptedEngine {
        states: Mutex<Vec<QueryState>>,
        pages: Vec<ResultPage>,
        pages_served: AtomicUsize,
    }

    impl ScriptedEngine {
        fn with_states(states: Vec<QueryState>) -> Self {
            Self {
                states: Mutex::new(states),
                ..Default::default()
            }
        }

        fn with_pages(mut self, pages: Vec<ResultPage>) -> Self {
            self.pages = pages;
            self
        }
    }

    #[async_trait]
    impl QueryEngine for ScriptedEngine {
        async fn start_query(&self, _sql: &str, _database: &str) -> Result<ExecutionId> {
            Ok(ExecutionId::new("exec-1"))
        }

        async fn query_state(&self, _id: &ExecutionId) -> Result<QueryState> {
            let mut states = self.states.lock();
            if states.len() > 1 {
                Ok(states.remove(0))
            } else {
                states.first().cloned().ok_or(Error::UnknownExecution {
                    id: "exec-1".to_string(),
                })
            }
        }

        async fn result_page(
            &self,
            _id: &ExecutionId,
            token: Option<&PageToken>,
        ) -> Result<ResultPage> {
            let index = match token {
                None => 0,
                Some(token) => token.as_str().parse::<usize>().unwrap(),
            };
            self.pages_served.fetch_add(1, Ordering::SeqCst);
            Ok(self.pages[index].clone())
        }
    }

    fn row(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test_log::test(tokio::test(start_paused = true))]
    async fn polls_to_success_and_shapes_rows() {
        let engine = ScriptedEngine::with_states(vec![
            QueryState::Queued,
            QueryState::Running,
            QueryState::Succeeded,
        ])
        .with_pages(vec![
            ResultPage {
                rows: vec![row(&["pt_code", "pt_name"]), row(&["10001", "\"Headache\""])],
                next: Some(PageToken::new("1")),
            },
            ResultPage {
                rows: vec![row(&["10002", "\"He said \"\"ow\"\"\""])],
                next: None,
            },
        ]);
        let client = QueryClient::new(engine, "meddra");

        let outcome = client.run("SELECT pt_code, pt_name FROM terms").await.unwrap();
        let QueryOutcome::Success { row_count, data } = outcome else {
            panic!("expected success, got {outcome:?}");
        };
        assert_eq!(row_count, 2);
        assert_eq!(data[0]["pt_code"], "10001");
        assert_eq!(data[0]["pt_name"], "Headache");
        assert_eq!(data[1]["pt_name"], "He said \"ow\"");
    }

    #[test_log::test(tokio::test(start_paused = true))]
    async fn failed_execution_reports_the_reason() {
        let engine = ScriptedEngine::with_states(vec![
            QueryState::Running,
            QueryState::Failed {
                reason: "SYNTAX_ERROR: line 1".to_string(),
            },
        ]);
        let client = QueryClient::new(engine, "meddra");

        let outcome = client.run("SELEKT 1").await.unwrap();
        assert_eq!(
            outcome,
            QueryOutcome::Failed {
                state: QueryState::Failed {
                    reason: "SYNTAX_ERROR: line 1".to_string()
                }
            }
        );
    }

    #[test_log::test(tokio::test(start_paused = true))]
    async fn deadline_yields_timeout_with_execution_id_and_no_rows() {
        let engine = ScriptedEngine::with_states(vec![QueryState::Running]);
        let client = QueryClient::new(engine, "meddra");

        let outcome = client.run("SELECT * FROM terms").await.unwrap();
        let QueryOutcome::TimedOut { execution_id } = outcome else {
            panic!("expected timeout, got {outcome:?}");
        };
        assert_eq!(execution_id.as_str(), "exec-1");
        assert_eq!(client.engine.pages_served.load(Ordering::SeqCst), 0);
    }

    #[test_log::test(tokio::test(start_paused = true))]
    async fn header_only_result_has_no_data_rows() {
        let engine = ScriptedEngine::with_states(vec![QueryState::Succeeded]).with_pages(vec![
            ResultPage {
                rows: vec![row(&["pt_code"])],
                next: None,
            },
        ]);
        let client = QueryClient::new(engine, "meddra");

        let outcome = client.run("SELECT pt_code FROM terms WHERE 1=0").await.unwrap();
        assert_eq!(
            outcome,
            QueryOutcome::Success {
                row_count: 0,
                data: vec![]
            }
        );
    }

    #[test]
    fn clean_value_unwraps_and_unescapes() {
        assert_eq!(clean_value("  plain  "), "plain");
        assert_eq!(clean_value("\"wrapped\""), "wrapped");
        assert_eq!(clean_value("\"he said \"\"ow\"\"\""), "he said \"ow\"");
        assert_eq!(clean_value("\""), "\"");
        assert_eq!(clean_value(""), "");
    }
}
