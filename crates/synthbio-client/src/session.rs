//! The client request lifecycle.
//!
//! A session is in exactly one of four states. Submitting moves it to
//! `Loading` and clears whatever the previous request produced; the
//! response resolves it to `Success` or `Error`. Every submission carries
//! a [`Ticket`] and a response is applied only if its ticket is the one
//! still outstanding, so a late response can never overwrite a newer one.

use synthbio_core::Answer;
use thiserror::Error;
use tracing::debug;

use crate::error::ClientError;

/// Sequence token for one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ticket(u64);

impl Ticket {
    pub fn seq(&self) -> u64 {
        self.0
    }
}

/// What the UI is showing.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RequestState {
    #[default]
    Idle,

    /// A request is in flight. Results from earlier requests are gone.
    Loading { ticket: Ticket },

    /// Answer and citations, citations in service order.
    Success(Answer),

    /// The message to display.
    Error(String),
}

impl RequestState {
    pub fn is_loading(&self) -> bool {
        matches!(self, RequestState::Loading { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            RequestState::Idle => "idle",
            RequestState::Loading { .. } => "loading",
            RequestState::Success(_) => "success",
            RequestState::Error(_) => "error",
        }
    }
}

/// Submission refused because one is already in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("a query is already in flight (ticket {0})")]
pub struct SubmitRejected(pub u64);

/// Outcome of handing a response to [`QuerySession::resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The response updated the session.
    Applied,

    /// The response belonged to a superseded submission and was dropped.
    Stale,
}

/// Single-question session state machine.
#[derive(Debug, Default)]
pub struct QuerySession {
    state: RequestState,
    input: String,
    last_seq: u64,
    outstanding: Option<Ticket>,
}

impl QuerySession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &RequestState {
        &self.state
    }

    /// Current contents of the question input. Editable in every state.
    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, input: impl Into<String>) {
        self.input = input.into();
    }

    /// Submit is disabled while a request is in flight.
    pub fn is_submit_disabled(&self) -> bool {
        self.state.is_loading()
    }

    /// Ticket of the in-flight request, if any.
    pub fn outstanding(&self) -> Option<Ticket> {
        self.outstanding
    }

    /// Submit the current input.
    pub fn submit(&mut self) -> Result<(Ticket, String), SubmitRejected> {
        let question = self.input.clone();
        let ticket = self.begin(question.clone())?;
        Ok((ticket, question))
    }

    /// Start a request for `question`.
    ///
    /// The question is sent as typed; validation belongs to the service.
    pub fn begin(&mut self, question: impl Into<String>) -> Result<Ticket, SubmitRejected> {
        if let Some(ticket) = self.outstanding {
            return Err(SubmitRejected(ticket.seq()));
        }
        self.input = question.into();
        Ok(self.start())
    }

    /// Start a request even if one is in flight. The older request's
    /// response will resolve as [`Resolution::Stale`].
    pub fn supersede(&mut self, question: impl Into<String>) -> Ticket {
        if let Some(old) = self.outstanding {
            debug!(ticket = old.seq(), "superseding in-flight query");
        }
        self.input = question.into();
        self.start()
    }

    fn start(&mut self) -> Ticket {
        self.last_seq += 1;
        let ticket = Ticket(self.last_seq);
        self.outstanding = Some(ticket);
        self.state = RequestState::Loading { ticket };
        ticket
    }

    /// Apply the response for `ticket`.
    pub fn resolve(
        &mut self,
        ticket: Ticket,
        outcome: Result<Answer, ClientError>,
    ) -> Resolution {
        if self.outstanding != Some(ticket) {
            debug!(
                ticket = ticket.seq(),
                latest = self.last_seq,
                "discarding stale response"
            );
            return Resolution::Stale;
        }
        self.outstanding = None;
        self.state = match outcome {
            Ok(answer) => RequestState::Success(answer),
            Err(err) => RequestState::Error(err.to_string()),
        };
        Resolution::Applied
    }
}
