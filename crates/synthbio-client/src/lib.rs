//! SynthBio Client
//!
//! Everything a front end needs to talk to the query service:
//! - `QuerySession`: the Idle → Loading → Success/Error request lifecycle
//! - `QueryClient`: `POST /query` over HTTP
//! - `render`: citation labels and terminal rendering of Markdown answers

pub mod error;
pub mod render;
pub mod session;
pub mod transport;

pub use error::ClientError;
pub use render::{
    citation_label, render_answer, render_citations, render_markdown, render_state, NO_CITATIONS,
};
pub use session::{QuerySession, RequestState, Resolution, SubmitRejected, Ticket};
pub use transport::QueryClient;
