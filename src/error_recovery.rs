// src/error_recovery.rs
//! Retry with exponential backoff for upstream reads.

use crate::error::{AppError, StoreErrorCode};
use std::time::Duration;

/// Whether an upstream failure is worth another attempt.
pub fn is_transient(error: &AppError) -> bool {
    match error {
        AppError::NetworkFailure(e) => e.is_timeout() || e.is_connect() || e.is_request(),
        AppError::StoreService { code, .. } => matches!(code, StoreErrorCode::Unavailable),
        _ => false,
    }
}

/// Retries an async operation with exponential backoff while its error is
/// transient. Permanent errors are returned immediately.
pub async fn retry_with_backoff<F, T, Fut>(
    mut operation: F,
    max_attempts: u32,
    initial_delay: Duration,
    max_delay: Duration,
) -> Result<T, AppError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, AppError>>,
{
    let mut delay = initial_delay;
    let mut last_error = None;

    for attempt in 1..=max_attempts {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if !is_transient(&e) => return Err(e),
            Err(e) => {
                last_error = Some(e);

                if attempt < max_attempts {
                    log::warn!("Attempt {} failed, retrying after {:?}", attempt, delay);
                    tokio::time::sleep(delay).await;

                    // Exponential backoff with cap
                    delay = std::cmp::min(delay * 2, max_delay);
                }
            }
        }
    }

    Err(last_error.unwrap_or_else(|| AppError::InternalError {
        message: "Retry failed with no error".to_string(),
        source: None,
    }))
}
