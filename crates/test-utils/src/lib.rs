pub mod builders;
pub mod recording;

use std::sync::Once;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use tracing_subscriber::{EnvFilter, fmt};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .with_thread_names(true)
            .init();
    });
}

/// Run `f` on its own thread and fail the test if it takes longer than
/// `limit`. A hung scheduler leaks its thread; the test still fails.
pub fn with_timeout<F, T>(limit: Duration, f: F) -> T
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("test-run".to_string())
        .spawn(move || {
            let _ = tx.send(f());
        })
        .expect("spawning test thread");

    match rx.recv_timeout(limit) {
        Ok(value) => value,
        Err(mpsc::RecvTimeoutError::Timeout) => {
            panic!("test timed out after {limit:?}; scheduler hung")
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            panic!("test thread panicked before producing a result")
        }
    }
}

/// [`with_timeout`] with the default 10 second limit.
pub fn within_deadline<F, T>(f: F) -> T
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    with_timeout(Duration::from_secs(10), f)
}
