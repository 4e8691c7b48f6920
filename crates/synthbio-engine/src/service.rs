//! The stateless query operation: validate, invoke, normalize.

use std::sync::Arc;
use std::time::{Duration, Instant};

use synthbio_core::{
    emit_engine_invoked, emit_query_failed, emit_query_finished, emit_query_started, Answer,
    CitationPolicy, EngineError, Query, QueryError, QueryRequest, ValidationError, METRICS,
};
use tracing::Instrument;
use uuid::Uuid;

use crate::engine::RetrievalEngine;

/// Handles one question at a time with no state carried between requests.
#[derive(Clone)]
pub struct QueryService {
    engine: Arc<dyn RetrievalEngine>,
    policy: CitationPolicy,
    timeout: Option<Duration>,
}

impl QueryService {
    /// `timeout_secs == 0` disables the request timeout.
    pub fn new(engine: Arc<dyn RetrievalEngine>, policy: CitationPolicy, timeout_secs: u64) -> Self {
        Self {
            engine,
            policy,
            timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
        }
    }

    pub fn engine(&self) -> &Arc<dyn RetrievalEngine> {
        &self.engine
    }

    pub fn policy(&self) -> CitationPolicy {
        self.policy
    }

    /// Answer a raw request under a freshly generated request id.
    pub async fn handle_query(&self, request: QueryRequest) -> Result<Answer, QueryError> {
        let request_id = Uuid::new_v4().to_string();
        self.handle_query_with_id(&request_id, request).await
    }

    /// Answer a raw request. Validation failures never reach the engine.
    pub async fn handle_query_with_id(
        &self,
        request_id: &str,
        request: QueryRequest,
    ) -> Result<Answer, QueryError> {
        METRICS.inc_received();
        let query = Query::try_from(request).map_err(|e| self.reject(request_id, e))?;
        self.answer(request_id, &query)
            .instrument(synthbio_core::query_span(request_id))
            .await
    }

    /// Answer a raw JSON request body, as received over HTTP.
    pub async fn handle_body(&self, request_id: &str, body: &[u8]) -> Result<Answer, QueryError> {
        match QueryRequest::from_slice(body) {
            Ok(request) => self.handle_query_with_id(request_id, request).await,
            Err(e) => {
                METRICS.inc_received();
                Err(self.reject(request_id, e))
            }
        }
    }

    fn reject(&self, request_id: &str, error: ValidationError) -> QueryError {
        METRICS.inc_rejected();
        let err = QueryError::from(error);
        emit_query_failed(request_id, err.kind(), &err);
        err
    }

    /// Run an already validated query through the engine.
    pub async fn answer(&self, request_id: &str, query: &Query) -> Result<Answer, QueryError> {
        let start = Instant::now();
        emit_query_started(request_id, self.engine.method().name(), query.question.len());
        emit_engine_invoked(
            request_id,
            &self.engine.describe(),
            self.timeout.map(|t| t.as_secs()).unwrap_or(0),
        );

        let result = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.engine.retrieve(query))
                .await
                .unwrap_or_else(|_| {
                    Err(EngineError::Timeout {
                        seconds: limit.as_secs(),
                    }
                    .into())
                }),
            None => self.engine.retrieve(query).await,
        };

        match result {
            Ok(mut answer) => {
                answer.citations = self.policy.apply(answer.citations);
                METRICS.inc_answered();
                emit_query_finished(
                    request_id,
                    start.elapsed().as_millis() as u64,
                    answer.citations.len(),
                );
                Ok(answer)
            }
            Err(err) => {
                if err.is_timeout() {
                    METRICS.inc_engine_timeouts();
                } else {
                    METRICS.inc_engine_failures();
                }
                emit_query_failed(request_id, err.kind(), &err);
                Err(err)
            }
        }
    }
}
