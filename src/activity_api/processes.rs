use std::thread;

use anyhow::Result;
use chrono::DateTime;
use sysinfo::{Process, ProcessStatus, ProcessesToUpdate, System, MINIMUM_CPU_UPDATE_INTERVAL};
use tracing::{debug, instrument};

use super::ProcessEntry;

const SOURCE: &str = "sysinfo";

/// Takes a single snapshot of running processes. CPU usage is a difference between two refreshes,
/// so this blocks for [MINIMUM_CPU_UPDATE_INTERVAL].
#[instrument]
pub fn running_processes() -> Result<Vec<ProcessEntry>> {
    let mut system = System::new_all();
    thread::sleep(MINIMUM_CPU_UPDATE_INTERVAL);
    system.refresh_processes(ProcessesToUpdate::All, true);

    let total_memory = system.total_memory();
    let mut entries = system
        .processes()
        .values()
        .filter_map(|process| to_entry(process, total_memory))
        .collect::<Vec<_>>();
    entries.sort_by_key(|entry| entry.pid);
    debug!("Found {} processes with an executable", entries.len());
    Ok(entries)
}

fn to_entry(process: &Process, total_memory: u64) -> Option<ProcessEntry> {
    // Zombies may still be listed after they exited.
    if matches!(process.status(), ProcessStatus::Zombie | ProcessStatus::Dead) {
        return None;
    }
    // Access denied shows up as a missing executable.
    let exe = process.exe().filter(|exe| !exe.as_os_str().is_empty())?;

    Some(ProcessEntry {
        name: process.name().to_string_lossy().into_owned(),
        exe: exe.to_path_buf(),
        pid: process.pid().as_u32(),
        started: i64::try_from(process.start_time())
            .ok()
            .and_then(|seconds| DateTime::from_timestamp(seconds, 0)),
        cpu_percent: process.cpu_usage(),
        memory_percent: memory_percent(process.memory(), total_memory),
        source: SOURCE,
    })
}

fn memory_percent(used: u64, total: u64) -> f32 {
    if total == 0 {
        return 0.;
    }
    (used as f64 / total as f64 * 100.) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_percent() {
        assert_eq!(memory_percent(0, 0), 0.);
        assert_eq!(memory_percent(50, 200), 25.);
        assert_eq!(memory_percent(200, 200), 100.);
    }

    #[test]
    fn test_snapshot_contains_only_processes_with_executables() -> Result<()> {
        let entries = running_processes()?;
        assert!(entries.iter().all(|e| !e.exe.as_os_str().is_empty()));
        assert!(entries.windows(2).all(|w| w[0].pid <= w[1].pid));
        Ok(())
    }
}
