//! In-process engines (testing only)
//!
//! Provides `StaticEngine`, `FailingEngine` and `SlowEngine`, which satisfy
//! the `RetrievalEngine` contract without spawning the GraphRAG CLI.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use synthbio_core::{Answer, Query, QueryError};

use crate::engine::RetrievalEngine;
use crate::invocation::QueryMethod;

// ---------------------------------------------------------------------------
// StaticEngine
// ---------------------------------------------------------------------------

/// Returns the same answer for every question and records what it was asked.
#[derive(Debug)]
pub struct StaticEngine {
    answer: Answer,
    calls: AtomicUsize,
    last_question: Mutex<Option<String>>,
}

impl StaticEngine {
    pub fn new(answer: Answer) -> Self {
        Self {
            answer,
            calls: AtomicUsize::new(0),
            last_question: Mutex::new(None),
        }
    }

    /// Number of `retrieve` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_question(&self) -> Option<String> {
        self.last_question.lock().unwrap().clone()
    }
}

#[async_trait]
impl RetrievalEngine for StaticEngine {
    async fn retrieve(&self, query: &Query) -> Result<Answer, QueryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_question.lock().unwrap() = Some(query.question.clone());
        Ok(self.answer.clone())
    }

    fn method(&self) -> QueryMethod {
        QueryMethod::Global
    }

    fn describe(&self) -> String {
        "static".to_string()
    }
}

// ---------------------------------------------------------------------------
// FailingEngine
// ---------------------------------------------------------------------------

/// Fails every call with the configured error.
#[derive(Debug)]
pub struct FailingEngine {
    error: QueryError,
}

impl FailingEngine {
    pub fn new(error: impl Into<QueryError>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[async_trait]
impl RetrievalEngine for FailingEngine {
    async fn retrieve(&self, _query: &Query) -> Result<Answer, QueryError> {
        Err(self.error.clone())
    }

    fn method(&self) -> QueryMethod {
        QueryMethod::Global
    }

    fn describe(&self) -> String {
        "failing".to_string()
    }
}

// ---------------------------------------------------------------------------
// SlowEngine
// ---------------------------------------------------------------------------

/// Sleeps before answering; used to exercise request timeouts.
#[derive(Debug)]
pub struct SlowEngine {
    delay: Duration,
}

impl SlowEngine {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl RetrievalEngine for SlowEngine {
    async fn retrieve(&self, query: &Query) -> Result<Answer, QueryError> {
        tokio::time::sleep(self.delay).await;
        Ok(Answer::new(format!("eventually: {}", query.question)))
    }

    fn method(&self) -> QueryMethod {
        QueryMethod::Global
    }

    fn describe(&self) -> String {
        format!("slow({}ms)", self.delay.as_millis())
    }
}
