//! Span helpers for permission loading and evaluation.

use std::time::Instant;
use tracing::{debug, info_span, Span};

/// Span covering one permission-store load. `generation` is the store
/// epoch the load started under.
pub fn store_span(user: &str, generation: u64) -> Span {
    info_span!("rbac_store", user = %user, generation)
}

/// Span covering a single backend fetch.
pub fn fetch_span(endpoint: &str) -> Span {
    info_span!("rbac_fetch", endpoint = %endpoint)
}

/// Elapsed-time record for a named operation, logged at `debug` on
/// [`Timer::finish`]. Dropping it unfinished logs nothing.
#[derive(Debug)]
pub struct Timer {
    started: Instant,
    operation: &'static str,
}

impl Timer {
    pub fn start(operation: &'static str) -> Self {
        Self {
            started: Instant::now(),
            operation,
        }
    }

    pub fn elapsed_ms(&self) -> u128 {
        self.started.elapsed().as_millis()
    }

    pub fn finish(self) {
        debug!(operation = self.operation, elapsed_ms = self.elapsed_ms() as u64, "finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::Instrument;
    use tracing_subscriber::EnvFilter;

    fn with_subscriber<F: FnOnce()>(f: F) {
        let subscriber = tracing_subscriber::fmt()
            .with_test_writer()
            .with_env_filter(EnvFilter::new("trace"))
            .finish();
        tracing::subscriber::with_default(subscriber, f);
    }

    #[test]
    fn test_fetch_nests_inside_store_span() {
        with_subscriber(|| {
            let store = store_span("user-7", 3);
            let _store = store.enter();
            let fetch = fetch_span("/admin/user-permissions");
            let _fetch = fetch.enter();
            tracing::info!("fetching");
        });
    }

    #[tokio::test]
    async fn test_instrumented_load() {
        let loaded = async {
            let timer = Timer::start("rbac_load");
            let modules = async { 3 }.instrument(fetch_span("/admin/user-permissions")).await;
            timer.finish();
            modules
        }
        .instrument(store_span("user-7", 1))
        .await;
        assert_eq!(loaded, 3);
    }
}
