use std::{
    ffi::OsStr,
    fs,
    io::ErrorKind,
    path::PathBuf,
};

use anyhow::Result;
use tracing::{debug, instrument};

use super::{
    install_date_from, processes, utmpx, ActivitySource, InstalledAppEntry, ProcessEntry,
    RecentFileEntry, SessionEntry, ShareEntry, VolumeEntry,
};

/// macOS has no readable recent-items or share history outside of private databases, so only
/// sessions, processes and applications are collected.
pub struct MacActivitySource {
    applications: PathBuf,
}

impl MacActivitySource {
    pub fn new() -> Self {
        Self {
            applications: PathBuf::from("/Applications"),
        }
    }
}

impl ActivitySource for MacActivitySource {
    fn sessions(&self) -> Result<Vec<SessionEntry>> {
        utmpx::active_sessions()
    }

    fn recent_files(&self) -> Result<Vec<RecentFileEntry>> {
        Ok(vec![])
    }

    fn network_volumes(&self) -> Result<Vec<VolumeEntry>> {
        Ok(vec![])
    }

    fn share_history(&self) -> Result<Vec<ShareEntry>> {
        Ok(vec![])
    }

    fn running_processes(&self) -> Result<Vec<ProcessEntry>> {
        processes::running_processes()
    }

    #[instrument(skip(self))]
    fn installed_apps(&self) -> Result<Vec<InstalledAppEntry>> {
        let entries = match fs::read_dir(&self.applications) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No applications folder at {:?}", self.applications);
                return Ok(vec![]);
            }
            Err(e) => return Err(e.into()),
        };

        let mut apps = vec![];
        for entry in entries {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(e) => {
                    debug!("Skipping unreadable application entry: {e}");
                    continue;
                }
            };
            if path.extension() != Some(OsStr::new("app")) {
                continue;
            }
            let Some(display_name) = path.file_stem().map(|s| s.to_string_lossy().into_owned())
            else {
                continue;
            };
            let install_date = fs::metadata(&path)
                .and_then(|m| m.modified())
                .ok()
                .map(install_date_from);
            apps.push(InstalledAppEntry {
                key: path.to_string_lossy().into_owned(),
                display_name,
                install_date,
                source: "applications_folder",
            });
        }
        apps.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        Ok(apps)
    }
}
