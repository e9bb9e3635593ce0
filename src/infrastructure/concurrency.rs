/// Worker pool setup for parallel scans.
/// Keeps about half of the CPU capacity free for the host.

use anyhow::Result;
use tracing::info;

/// Worker count used when none is configured: half the cores, minimum 1.
pub fn default_workers() -> usize {
    std::cmp::max(1, num_cpus::get() / 2)
}

/// Initialize the global rayon thread pool used by parallel usage scans.
pub fn init_thread_pool(workers: Option<usize>) -> Result<()> {
    let cores = num_cpus::get();
    let workers = workers.filter(|w| *w > 0).unwrap_or_else(default_workers);

    rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build_global()?;

    info!(workers, cores, "initialized scan thread pool");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_workers_at_least_one() {
        assert!(default_workers() >= 1);
    }

    #[test]
    fn test_init_thread_pool_once() {
        // The global pool can be built only once per process; a second call errors.
        let _ = init_thread_pool(Some(1));
        assert!(init_thread_pool(Some(1)).is_err());
    }
}
