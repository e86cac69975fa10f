//! Content-source session resolution.

use tracing::{info, warn};

use recap_cache::CacheGateway;
use recap_source::{ContentSource, Session};

use crate::error::{PipelineError, PipelineResult};

/// Reuse the stored session for `login` if the source still accepts it,
/// otherwise log in and store the fresh session.
pub async fn resolve_session(
    source: &dyn ContentSource,
    cache: &CacheGateway,
    login: &str,
    password: &str,
) -> PipelineResult<Session> {
    if let Some(blob) = cache.get_session(login).await {
        match source.resume(&blob).await {
            Ok(session) => {
                info!(login = %login, "Resumed stored session");
                return Ok(session);
            }
            Err(e) => warn!(login = %login, "Stored session rejected, logging in again: {}", e),
        }
    }

    let session = source
        .authenticate(login, password)
        .await
        .map_err(PipelineError::SessionUnavailable)?;

    match session.export() {
        Ok(blob) => cache.put_session(login, &blob).await,
        Err(e) => warn!(login = %login, "Failed to export session: {}", e),
    }

    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeSource;

    #[tokio::test]
    async fn test_fresh_login_is_stored() {
        let source = FakeSource::new();
        let cache = CacheGateway::in_memory();

        let session = resolve_session(&source, &cache, "svc", "pw").await.unwrap();
        assert_eq!(source.login_count(), 1);

        let stored = cache.get_session("svc").await.unwrap();
        assert_eq!(Session::import(&stored).unwrap(), session);
    }

    #[tokio::test]
    async fn test_stored_session_is_resumed() {
        let source = FakeSource::new();
        let cache = CacheGateway::in_memory();
        let blob = Session::new("svc", "kept").export().unwrap();
        cache.put_session("svc", &blob).await;

        let session = resolve_session(&source, &cache, "svc", "pw").await.unwrap();
        assert_eq!(session.token, "kept");
        assert_eq!(source.login_count(), 0);
    }

    #[tokio::test]
    async fn test_rejected_session_falls_back_to_login() {
        let source = FakeSource::new().rejecting_resume();
        let cache = CacheGateway::in_memory();
        cache.put_session("svc", "garbage").await;

        resolve_session(&source, &cache, "svc", "pw").await.unwrap();
        assert_eq!(source.login_count(), 1);
    }

    #[tokio::test]
    async fn test_login_failure_is_fatal() {
        let source = FakeSource::new().failing_login();
        let cache = CacheGateway::in_memory();

        let err = resolve_session(&source, &cache, "svc", "pw").await.unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(cache.get_session("svc").await, None);
    }
}
