//! Predictive search session: debounced query completion with
//! cooperative cancellation, plus the HTTP backend it talks to.
//!
//! Each keystroke lands in [`PredictiveSearch::set_input`]. The
//! session keeps at most one in-flight prediction request and one
//! in-flight search request; issuing a new one aborts the previous
//! task, and a per-slot generation counter discards any response that
//! was superseded while in flight, so stale data can never reach
//! visible state.

use crate::error::SearchError;
use crate::models::SearchHit;
use crate::traits::SearchBackend;
use async_trait::async_trait;
use reqwest::Client;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::debug;
use url::Url;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(150);
pub const RETRY_MESSAGE: &str = "Search is unavailable right now, please retry.";

const MIN_PREDICT_CHARS: usize = 2;

/// HTTP implementation of [`SearchBackend`] speaking the search API
/// contract.
pub struct HttpSearchBackend {
    base_url: Url,
    client: Client,
}

impl HttpSearchBackend {
    /// `base_url` is the root of the search service, e.g.
    /// `http://localhost:8000`.
    pub fn new(base_url: &str) -> Result<Self, SearchError> {
        Ok(Self {
            base_url: Url::parse(base_url)?,
            client: Client::new(),
        })
    }
}

#[async_trait]
impl SearchBackend for HttpSearchBackend {
    async fn predict(
        &self,
        partial_query: &str,
        limit: usize,
    ) -> Result<Vec<String>, SearchError> {
        let url = self.base_url.join("/search/search/predict")?;
        let limit = limit.to_string();
        let response = self
            .client
            .get(url)
            .query(&[("partial_query", partial_query), ("limit", limit.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SearchError::BackendResponse {
                backend: "search-api".to_string(),
                details: response.status().to_string(),
            });
        }

        Ok(response.json().await?)
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, SearchError> {
        let url = self.base_url.join("/search/search")?;
        let limit = limit.to_string();
        let response = self
            .client
            .get(url)
            .query(&[("query", query), ("limit", limit.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SearchError::BackendResponse {
                backend: "search-api".to_string(),
                details: response.status().to_string(),
            });
        }

        Ok(response.json().await?)
    }
}

#[derive(Default)]
struct SessionState {
    input: String,
    /// Extension of `input` offered by the latest prediction, shown
    /// pre-selected so one keystroke accepts it.
    completion: Option<String>,
    last_predicted: String,
    last_submitted: Option<String>,
    results: Vec<SearchHit>,
    error: Option<&'static str>,
    predict_seq: u64,
    search_seq: u64,
    predict_task: Option<JoinHandle<()>>,
    search_task: Option<JoinHandle<()>>,
}

/// Client-side state machine for the autocomplete search box.
pub struct PredictiveSearch {
    backend: Arc<dyn SearchBackend>,
    debounce: Duration,
    limit: usize,
    state: Arc<Mutex<SessionState>>,
}

impl PredictiveSearch {
    pub fn new(backend: Arc<dyn SearchBackend>, debounce: Duration, limit: usize) -> Self {
        Self {
            backend,
            debounce,
            limit,
            state: Arc::new(Mutex::new(SessionState::default())),
        }
    }

    /// Record a keystroke. Inputs of at least two characters that
    /// differ from the last predicted query schedule a debounced
    /// prediction request, replacing any pending one.
    pub fn set_input(&self, text: &str) {
        let mut state = lock(&self.state);
        state.input = text.to_string();
        state.completion = None;

        if let Some(task) = state.predict_task.take() {
            task.abort();
        }

        if text.chars().count() < MIN_PREDICT_CHARS || text == state.last_predicted {
            return;
        }

        state.predict_seq += 1;
        let seq = state.predict_seq;
        let issued_for = text.to_string();
        let backend = Arc::clone(&self.backend);
        let shared = Arc::clone(&self.state);
        let debounce = self.debounce;
        let limit = self.limit;

        let task = tokio::spawn(async move {
            sleep(debounce).await;
            let outcome = backend.predict(&issued_for, limit).await;

            let mut state = lock(&shared);
            if seq != state.predict_seq {
                return;
            }
            state.last_predicted = issued_for;
            match outcome {
                Ok(predictions) => {
                    state.completion = completion_for(&state.input, &predictions);
                }
                Err(error) => debug!(%error, "prediction request failed"),
            }
        });
        state.predict_task = Some(task);
    }

    /// Fold the pre-selected completion into the input, returning the
    /// new query.
    pub fn accept_completion(&self) -> Option<String> {
        let mut state = lock(&self.state);
        let completion = state.completion.take()?;
        state.input.push_str(&completion);
        Some(state.input.clone())
    }

    /// Revert to the raw typed input.
    pub fn dismiss_completion(&self) {
        lock(&self.state).completion = None;
    }

    /// Submit the current input as a search. Submitting a query
    /// identical to the last submitted one is a no-op; otherwise any
    /// in-flight search is canceled and replaced.
    pub fn submit(&self) {
        let mut state = lock(&self.state);
        let query = state.input.trim().to_string();
        if query.is_empty() || state.last_submitted.as_deref() == Some(query.as_str()) {
            return;
        }
        state.last_submitted = Some(query.clone());

        if let Some(task) = state.search_task.take() {
            task.abort();
        }

        state.search_seq += 1;
        let seq = state.search_seq;
        let backend = Arc::clone(&self.backend);
        let shared = Arc::clone(&self.state);
        let limit = self.limit;

        let task = tokio::spawn(async move {
            let outcome = backend.search(&query, limit).await;

            let mut state = lock(&shared);
            if seq != state.search_seq {
                return;
            }
            match outcome {
                Ok(hits) => {
                    state.results = hits;
                    state.error = None;
                }
                Err(error) => {
                    debug!(%error, "search request failed");
                    state.results.clear();
                    state.error = Some(RETRY_MESSAGE);
                }
            }
        });
        state.search_task = Some(task);
    }

    pub fn input(&self) -> String {
        lock(&self.state).input.clone()
    }

    pub fn completion(&self) -> Option<String> {
        lock(&self.state).completion.clone()
    }

    pub fn results(&self) -> Vec<SearchHit> {
        lock(&self.state).results.clone()
    }

    pub fn error(&self) -> Option<&'static str> {
        lock(&self.state).error
    }
}

fn lock(state: &Mutex<SessionState>) -> MutexGuard<'_, SessionState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A prediction is usable only when it extends the current input,
/// compared case-insensitively. Returns the part beyond the input.
fn completion_for(input: &str, predictions: &[String]) -> Option<String> {
    let lowered = input.to_lowercase();
    let input_chars = input.chars().count();

    predictions.iter().find_map(|prediction| {
        let candidate = prediction.to_lowercase();
        if candidate.starts_with(&lowered) && prediction.chars().count() > input_chars {
            Some(prediction.chars().skip(input_chars).collect())
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    struct RecordingBackend {
        predict_calls: Mutex<Vec<String>>,
        predictions: Vec<String>,
        search_calls: Mutex<Vec<String>>,
        hits: Vec<SearchHit>,
        fail_search: bool,
    }

    impl RecordingBackend {
        fn new(predictions: Vec<String>) -> Self {
            Self {
                predict_calls: Mutex::new(Vec::new()),
                predictions,
                search_calls: Mutex::new(Vec::new()),
                hits: Vec::new(),
                fail_search: false,
            }
        }

        fn predict_calls(&self) -> Vec<String> {
            self.predict_calls
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .clone()
        }

        fn search_calls(&self) -> Vec<String> {
            self.search_calls
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .clone()
        }
    }

    #[async_trait]
    impl SearchBackend for RecordingBackend {
        async fn predict(
            &self,
            partial_query: &str,
            _limit: usize,
        ) -> Result<Vec<String>, SearchError> {
            self.predict_calls
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .push(partial_query.to_string());
            Ok(self.predictions.clone())
        }

        async fn search(&self, query: &str, _limit: usize) -> Result<Vec<SearchHit>, SearchError> {
            self.search_calls
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .push(query.to_string());
            if self.fail_search {
                return Err(SearchError::Request("backend down".to_string()));
            }
            Ok(self.hits.clone())
        }
    }

    fn session(backend: Arc<RecordingBackend>) -> PredictiveSearch {
        PredictiveSearch::new(backend, Duration::from_millis(150), 10)
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_keystrokes_issue_exactly_one_request() {
        let backend = Arc::new(RecordingBackend::new(vec!["neural networks".to_string()]));
        let search = session(Arc::clone(&backend));

        search.set_input("neu");
        search.set_input("neur");
        sleep(Duration::from_millis(300)).await;

        assert_eq!(backend.predict_calls(), vec!["neur".to_string()]);
        assert_eq!(search.completion().as_deref(), Some("al networks"));
    }

    #[tokio::test(start_paused = true)]
    async fn single_character_input_never_predicts() {
        let backend = Arc::new(RecordingBackend::new(vec!["n".to_string()]));
        let search = session(Arc::clone(&backend));

        search.set_input("n");
        sleep(Duration::from_millis(300)).await;

        assert!(backend.predict_calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn prediction_must_extend_the_input() {
        let backend = Arc::new(RecordingBackend::new(vec!["unrelated".to_string()]));
        let search = session(Arc::clone(&backend));

        search.set_input("neur");
        sleep(Duration::from_millis(300)).await;

        assert!(search.completion().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn accept_and_dismiss_manage_the_completion() {
        let backend = Arc::new(RecordingBackend::new(vec!["Neural Networks".to_string()]));
        let search = session(Arc::clone(&backend));

        search.set_input("neural n");
        sleep(Duration::from_millis(300)).await;
        assert_eq!(search.completion().as_deref(), Some("etworks"));

        assert_eq!(search.accept_completion().as_deref(), Some("neural networks"));
        assert_eq!(search.input(), "neural networks");
        assert!(search.completion().is_none());

        search.set_input("neonat");
        sleep(Duration::from_millis(300)).await;
        search.dismiss_completion();
        assert!(search.completion().is_none());
        assert_eq!(search.input(), "neonat");
    }

    #[tokio::test(start_paused = true)]
    async fn resubmitting_the_same_query_is_a_noop() {
        let backend = Arc::new(RecordingBackend::new(Vec::new()));
        let search = session(Arc::clone(&backend));

        search.set_input("malaria");
        search.submit();
        sleep(Duration::from_millis(50)).await;
        search.submit();
        sleep(Duration::from_millis(50)).await;

        assert_eq!(backend.search_calls(), vec!["malaria".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_searches_surface_the_retry_message() {
        let backend = Arc::new(RecordingBackend {
            predict_calls: Mutex::new(Vec::new()),
            predictions: Vec::new(),
            search_calls: Mutex::new(Vec::new()),
            hits: Vec::new(),
            fail_search: true,
        });
        let search = session(Arc::clone(&backend));

        search.set_input("malaria");
        search.submit();
        sleep(Duration::from_millis(50)).await;

        assert_eq!(search.error(), Some(RETRY_MESSAGE));
        assert!(search.results().is_empty());
    }

    #[tokio::test]
    async fn http_backend_speaks_the_wire_contract() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/search/search/predict")
                    .query_param("partial_query", "neu")
                    .query_param("limit", "10");
                then.status(200)
                    .json_body(serde_json::json!(["neural networks"]));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/search/search")
                    .query_param("query", "neural networks")
                    .query_param("limit", "10");
                then.status(200).json_body(serde_json::json!([
                    { "title": "Deep learning primer", "doi": "10.1000/dl" }
                ]));
            })
            .await;

        let backend = HttpSearchBackend::new(&server.base_url()).expect("base url parses");
        let predictions = backend.predict("neu", 10).await.expect("predict succeeds");
        assert_eq!(predictions, vec!["neural networks".to_string()]);

        let hits = backend
            .search("neural networks", 10)
            .await
            .expect("search succeeds");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Deep learning primer");
        assert_eq!(hits[0].doi, "10.1000/dl");
    }
}
