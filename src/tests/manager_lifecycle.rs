// Start/stop state machine, blocking start, deterministic teardown.

#[cfg(test)]
mod test {

    use std::sync::Arc;
    use std::time::Duration;

    use serial_test::serial;
    use tokio::time::sleep;

    use crate::error::TokenError;
    use crate::manager::config::TokenManagerConfig;
    use crate::manager::token_manager::TokenManager;
    use crate::resilience::retry::RetryPolicy;
    use crate::tests::common::{recording_listener, FakeProvider, Recorded, Scripted};

    fn long_lived_provider() -> Arc<FakeProvider> {
        Arc::new(FakeProvider::new(vec![Scripted::Ok { ttl_ms: 10_000 }]))
    }

    fn config() -> TokenManagerConfig {
        TokenManagerConfig {
            retry_policy: RetryPolicy::new(1, Duration::from_millis(10)),
            ..Default::default()
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn start_twice_is_an_invalid_state() {
        let manager = TokenManager::new(long_lived_provider(), config()).unwrap();
        let recorded = Arc::new(Recorded::default());
        let listener = recording_listener(&recorded);

        let _handle = manager.start(&listener, true, Duration::ZERO).await.unwrap();

        let second = manager.start(&listener, false, Duration::ZERO).await;
        assert!(matches!(second, Err(TokenError::InvalidState(_))));

        manager.stop();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn start_after_stop_is_an_invalid_state() {
        let manager = TokenManager::new(long_lived_provider(), config()).unwrap();
        let recorded = Arc::new(Recorded::default());
        let listener = recording_listener(&recorded);

        manager.stop();

        let started = manager.start(&listener, false, Duration::ZERO).await;
        assert!(matches!(started, Err(TokenError::InvalidState(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn stop_is_idempotent_and_cancels_pending_work() {
        let provider = long_lived_provider();
        let manager = TokenManager::new(provider.clone(), config()).unwrap();
        let recorded = Arc::new(Recorded::default());
        let listener = recording_listener(&recorded);

        // first cycle armed 200ms out, stopped long before it fires
        let handle = manager
            .start(&listener, false, Duration::from_millis(200))
            .await
            .unwrap();
        handle.stop();
        handle.stop();
        manager.stop();

        sleep(Duration::from_millis(300)).await;
        assert_eq!(provider.calls(), 0);
        assert!(recorded.tokens.lock().is_empty());
        assert!(recorded.errors.lock().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    #[serial]
    async fn blocking_start_waits_for_first_delivery() {
        let provider = Arc::new(
            FakeProvider::new(vec![Scripted::Ok { ttl_ms: 10_000 }])
                .with_latency(Duration::from_millis(50)),
        );
        let manager = TokenManager::new(provider, config()).unwrap();
        let recorded = Arc::new(Recorded::default());
        let listener = recording_listener(&recorded);

        let _handle = manager.start(&listener, true, Duration::ZERO).await.unwrap();

        // the callback already ran by the time start returned
        assert_eq!(recorded.tokens.lock().len(), 1);

        manager.stop();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    #[serial]
    async fn non_blocking_start_returns_before_first_delivery() {
        let provider = Arc::new(
            FakeProvider::new(vec![Scripted::Ok { ttl_ms: 10_000 }])
                .with_latency(Duration::from_millis(50)),
        );
        let manager = TokenManager::new(provider, config()).unwrap();
        let recorded = Arc::new(Recorded::default());
        let listener = recording_listener(&recorded);

        let _handle = manager
            .start(&listener, false, Duration::ZERO)
            .await
            .unwrap();
        assert!(recorded.tokens.lock().is_empty());

        sleep(Duration::from_millis(150)).await;
        assert_eq!(recorded.tokens.lock().len(), 1);

        manager.stop();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn drop_cancels_pending_renewal() {
        let provider = long_lived_provider();
        let recorded = Arc::new(Recorded::default());
        let listener = recording_listener(&recorded);

        {
            let manager = TokenManager::new(provider.clone(), config()).unwrap();
            let _handle = manager
                .start(&listener, false, Duration::from_millis(100))
                .await
                .unwrap();
        }

        sleep(Duration::from_millis(250)).await;
        assert_eq!(provider.calls(), 0);
        assert!(recorded.tokens.lock().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn acquire_token_still_works_after_stop() {
        let provider = long_lived_provider();
        let manager = TokenManager::new(provider.clone(), config()).unwrap();
        let recorded = Arc::new(Recorded::default());
        let listener = recording_listener(&recorded);

        let handle = manager.start(&listener, true, Duration::ZERO).await.unwrap();
        handle.stop();

        let response = manager.acquire_token(true).await.unwrap();
        assert_eq!(response.ttl_ms(), Some(10_000));
    }
}
