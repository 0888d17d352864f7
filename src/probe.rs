//! Connection probe for a configured provider.
//!
//! One request, no retry. When the backend reports the provider as
//! unreachable, its message is passed through verbatim.

use crate::client::ConsoleApi;
use crate::error::ApiResult;
use crate::models::VerificationResult;
use crate::store::SyncStore;

/// Ask the backend to verify the connection to `provider_id`.
pub async fn test_connection(
    api: &dyn ConsoleApi,
    provider_id: i64,
) -> ApiResult<VerificationResult> {
    let result = api.test_connection(provider_id).await?;
    if result.valid {
        tracing::info!(provider_id, "connection verified");
    } else {
        tracing::warn!(provider_id, message = %result.message, "connection check failed");
    }
    Ok(result)
}

/// [`test_connection`] with the outcome recorded in the store's load state.
///
/// An invalid connection is recorded as an error state carrying the
/// backend's message; the verification result itself is still returned.
pub async fn probe(
    api: &dyn ConsoleApi,
    store: &mut SyncStore,
    provider_id: i64,
) -> ApiResult<VerificationResult> {
    let ticket = store.begin(provider_id);
    match test_connection(api, provider_id).await {
        Ok(result) => {
            let outcome = if result.valid {
                Ok(())
            } else {
                Err(result.message.clone())
            };
            store.finish(ticket, outcome);
            Ok(result)
        }
        Err(e) => {
            store.finish(ticket, Err(e.to_string()));
            Err(e)
        }
    }
}
