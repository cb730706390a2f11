//! CLI command implementations.

pub mod cart;
pub mod order;
pub mod session;

use thiserror::Error;
use tienda_client::{ClientConfig, NoticeQueue, OrderError, Storefront, StorefrontError};
use tienda_core::NoticeKind;

/// Errors that end a command with a failure status.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Storefront(#[from] StorefrontError),

    #[error("{}", .0.user_message())]
    Order(#[from] OrderError),

    /// An operation failed and reported why through its notices.
    #[error("{0}")]
    Rejected(String),
}

impl CliError {
    /// The active error notice, or `fallback` if none is showing.
    pub(crate) fn from_notices(notices: &NoticeQueue, fallback: &str) -> Self {
        Self::Rejected(
            notices
                .get(NoticeKind::Error)
                .map_or_else(|| fallback.to_string(), |notice| notice.message),
        )
    }
}

/// Build the storefront for this invocation.
pub fn open(config: &ClientConfig) -> Result<Storefront, CliError> {
    tracing::debug!(api = %config.api_base_url, "Opening storefront");
    Ok(Storefront::from_config(config)?)
}
