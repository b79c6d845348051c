//! Shared fixtures for treewatch's integration tests.

pub mod builders;
pub mod events;
pub mod fake_primitive;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use tracing_subscriber::{EnvFilter, fmt};

pub use builders::TempTree;
pub use events::{assert_quiet, collect_until, next_event, next_matching};
pub use fake_primitive::FakePrimitive;

/// Upper bound for any single wait in a test.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

static TRACING: Once = Once::new();

/// Route `tracing` output through the test harness, once per test binary.
///
/// Output is only shown for failing tests (or with `--nocapture`). Pick the
/// level with `RUST_LOG`, e.g. `RUST_LOG=treewatch=trace`; the default keeps
/// root lifecycle and warnings only.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("treewatch=info"));
        // Another harness may have installed one already.
        let _ = fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// Await `f`, panicking after [`TEST_TIMEOUT`].
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    match tokio::time::timeout(TEST_TIMEOUT, f).await {
        Ok(value) => value,
        Err(_) => panic!("timed out after {TEST_TIMEOUT:?}"),
    }
}
