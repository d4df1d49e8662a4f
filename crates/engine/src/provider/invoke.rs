use std::time::Instant;

use cep_types::{LookupKey, ProviderError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{FetchError, ProviderFetcher, ProviderSpec};

/// Run one provider call: build the endpoint, fetch under the provider's
/// deadline, then transform.
///
/// The fetch receives a child of `cancellation`. That child is cancelled when
/// this function returns for any reason, so a fetch that outlives its deadline
/// is told to stop rather than left running.
///
/// Every failure except caller cancellation is logged here at `warn`.
pub(crate) async fn invoke_provider<R>(
    spec: &ProviderSpec<R>,
    key: &LookupKey,
    fetcher: &dyn ProviderFetcher,
    cancellation: &CancellationToken,
) -> Result<R, ProviderError> {
    let start = Instant::now();
    let result = invoke_inner(spec, key, fetcher, cancellation).await;

    match &result {
        Ok(_) => debug!(
            provider = %spec.name(),
            key = %key,
            duration_ms = start.elapsed().as_millis(),
            "provider call succeeded"
        ),
        Err(ProviderError::Cancelled { .. }) => debug!(
            provider = %spec.name(),
            key = %key,
            duration_ms = start.elapsed().as_millis(),
            "provider call cancelled by caller"
        ),
        Err(error) => warn!(
            provider = %spec.name(),
            key = %key,
            kind = error.kind(),
            error = %error,
            duration_ms = start.elapsed().as_millis(),
            "provider call failed"
        ),
    }
    result
}

async fn invoke_inner<R>(
    spec: &ProviderSpec<R>,
    key: &LookupKey,
    fetcher: &dyn ProviderFetcher,
    cancellation: &CancellationToken,
) -> Result<R, ProviderError> {
    let name = spec.name();
    let endpoint = spec.endpoint_for(key);
    let url = cep_api::parse_endpoint(&endpoint).map_err(|error| ProviderError::transport(name, error.to_string()))?;
    debug!(provider = %name, %url, timeout_ms = spec.timeout_ms(), "provider call started");

    let call_token = cancellation.child_token();
    let _abandon_on_exit = call_token.clone().drop_guard();

    let response = tokio::select! {
        biased;
        _ = cancellation.cancelled() => return Err(ProviderError::cancelled(name)),
        outcome = tokio::time::timeout(spec.timeout(), fetcher.fetch(&url, &call_token)) => match outcome {
            Ok(Ok(response)) => response,
            Ok(Err(FetchError::Cancelled)) if cancellation.is_cancelled() => return Err(ProviderError::cancelled(name)),
            // The fetcher gave up on its own; treat as a transport failure.
            Ok(Err(FetchError::Cancelled)) => return Err(ProviderError::transport(name, "request cancelled")),
            Ok(Err(error)) => return Err(error.into_provider_error(name)),
            Err(_elapsed) => return Err(ProviderError::timeout(name, spec.timeout_ms())),
        },
    };

    if response.status >= 500 {
        return Err(ProviderError::transport(name, format!("HTTP {}", response.status)));
    }

    spec.transform(key, &response)
        .map_err(|error| error.into_provider_error(name))
}
