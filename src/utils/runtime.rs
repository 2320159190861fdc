use std::future::Future;

use anyhow::Result;

/// The CLI only awaits a single worker and Ctrl-C, one thread plus the blocking pool is enough.
pub fn single_thread_runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}

/// Drives `future` on a fresh runtime and returns as soon as it resolves, without waiting for
/// blocking tasks it left behind.
pub fn run_detached<F: Future>(future: F) -> Result<F::Output> {
    let runtime = single_thread_runtime()?;
    let output = runtime.block_on(future);
    runtime.shutdown_background();
    Ok(output)
}

#[cfg(test)]
mod tests {
    use std::{
        thread,
        time::{Duration, Instant},
    };

    use super::*;

    #[test]
    fn test_run_detached_does_not_wait_for_blocking_tasks() -> Result<()> {
        let started = Instant::now();

        let value = run_detached(async {
            tokio::task::spawn_blocking(|| thread::sleep(Duration::from_secs(30)));
            7
        })?;

        assert_eq!(value, 7);
        assert!(started.elapsed() < Duration::from_secs(10));
        Ok(())
    }
}
