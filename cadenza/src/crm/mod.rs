//! CRM/prospecting backend client seam.
//!
//! The orchestrator only needs four capabilities: contact search, company
//! search, cadence creation (plus step setup), and recipient enrollment.
//! Arguments and results are JSON objects; the tools shape them into the
//! documented result forms (`contacts`, `companies`, `cadence_id`, ...).

mod http;
mod mock;

pub use http::HttpCrmClient;
pub use mock::MockCrm;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Errors from the CRM backend, aligned with the step-error taxonomy.
#[derive(Debug, Clone, Error)]
pub enum CrmError {
    #[error("network: {0}")]
    Network(String),
    #[error("decode: {0}")]
    Decode(String),
    #[error("api error ({status}): {message}")]
    Api { status: u16, message: String },
}

/// CRM client: the outbound HTTP seam for all prospecting tools.
///
/// **Interaction**: Implemented by [`HttpCrmClient`] (real backend) and
/// [`MockCrm`] (tests); consumed by the tools in `crate::tools`.
#[async_trait]
pub trait CrmClient: Send + Sync {
    /// Search contacts/leads. Body carries the filter payload.
    async fn search_contacts(&self, body: Value) -> Result<Value, CrmError>;

    /// Search companies.
    async fn search_companies(&self, body: Value) -> Result<Value, CrmError>;

    /// Create an email cadence; returns the created cadence document.
    async fn create_cadence(&self, body: Value) -> Result<Value, CrmError>;

    /// Add a step (email template + schedule) to an existing cadence.
    async fn create_cadence_step(&self, cadence_id: &str, body: Value) -> Result<Value, CrmError>;

    /// Enroll recipients into a cadence.
    async fn add_contacts_to_cadence(&self, body: Value) -> Result<Value, CrmError>;
}
