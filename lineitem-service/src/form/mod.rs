//! Form lifecycle contract and the pieces shared by form controllers.

mod i18n;
mod schema;
mod submission;

pub use i18n::{MessageCatalog, Translator};
pub use schema::{Button, ButtonKind, FieldKind, FieldSpec, FormLayout, LineItemField, SelectOption};
pub use submission::{is_whole_number, LineItemSubmission};

use async_trait::async_trait;
use service_core::error::AppError;
use std::sync::Arc;

/// Per-request state handed to every lifecycle hook.
#[derive(Clone)]
pub struct RequestContext {
    pub request_id: String,
    /// Test-mode submissions post test transactions and emit no UI signals.
    pub is_test: bool,
    pub translator: Arc<dyn Translator>,
}

impl RequestContext {
    pub fn new(request_id: impl Into<String>, translator: Arc<dyn Translator>) -> Self {
        Self {
            request_id: request_id.into(),
            is_test: false,
            translator,
        }
    }

    pub fn for_test(&self) -> Self {
        Self {
            is_test: true,
            ..self.clone()
        }
    }

    /// Translate a UI string.
    pub fn ts(&self, message: &str) -> String {
        self.translator.translate(message)
    }
}

impl std::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("request_id", &self.request_id)
            .field("is_test", &self.is_test)
            .finish()
    }
}

/// Lifecycle hooks a form engine drives in order: load, build fields,
/// validate, submit.
#[async_trait]
pub trait FormController: Send + Sync {
    /// Immutable snapshot produced by `load` and consumed by later hooks.
    type Loaded: Send + Sync;
    type Submission: Send + Sync;
    type Outcome: Send;

    async fn load(&self, ctx: &RequestContext, id: i64) -> Result<Self::Loaded, AppError>;

    async fn build_fields(
        &self,
        ctx: &RequestContext,
        loaded: &Self::Loaded,
    ) -> Result<FormLayout, AppError>;

    /// Reject the submission with field-level errors before anything is written.
    fn validate(
        &self,
        ctx: &RequestContext,
        loaded: &Self::Loaded,
        submission: &Self::Submission,
    ) -> Result<(), AppError>;

    async fn submit(
        &self,
        ctx: &RequestContext,
        loaded: &Self::Loaded,
        submission: Self::Submission,
    ) -> Result<Self::Outcome, AppError>;

    /// Validate, then submit.
    async fn process(
        &self,
        ctx: &RequestContext,
        loaded: &Self::Loaded,
        submission: Self::Submission,
    ) -> Result<Self::Outcome, AppError> {
        self.validate(ctx, loaded, &submission)?;
        self.submit(ctx, loaded, submission).await
    }
}
