//! Contains logic for extracting activity traces from different operating systems.
//! [GenericActivitySource] is the main artifact of this module, it picks an implementation based
//! on a [Platform] tag.

#[cfg(target_os = "linux")]
pub mod linux;
#[cfg(target_os = "macos")]
pub mod macos;
pub mod processes;
#[cfg(any(all(target_os = "linux", target_env = "gnu"), target_os = "macos"))]
mod utmpx;
#[cfg(windows)]
pub mod win;

#[cfg(feature = "win")]
extern crate windows;

use std::path::PathBuf;
#[cfg(any(target_os = "linux", target_os = "macos"))]
use std::time::SystemTime;

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::{error::CollectError, platform::Platform};

/// An active login session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionEntry {
    pub username: String,
    /// Remote host or terminal the session is attached to, if the OS reports one.
    pub host: Option<String>,
    pub started: DateTime<Utc>,
    pub source: &'static str,
}

/// A file the user opened recently.
#[derive(Debug, Clone, PartialEq)]
pub struct RecentFileEntry {
    pub path: String,
    /// Whatever the source considers the last access. Semantics differ between platforms.
    pub accessed: DateTime<Utc>,
    pub source: &'static str,
}

/// An attached network volume.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeEntry {
    pub path: String,
    pub modified: DateTime<Utc>,
    pub source: &'static str,
}

/// A share the user mounted at some point. There is no timestamp available for these.
#[derive(Debug, Clone, PartialEq)]
pub struct ShareEntry {
    pub path: String,
    pub source: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessEntry {
    pub name: String,
    pub exe: PathBuf,
    pub pid: u32,
    pub started: Option<DateTime<Utc>>,
    pub cpu_percent: f32,
    pub memory_percent: f32,
    pub source: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstalledAppEntry {
    /// Registry key or package identifier.
    pub key: String,
    pub display_name: String,
    pub install_date: Option<String>,
    pub source: &'static str,
}

/// Contract every platform backend implements. Each method is one independent sub-source, a
/// failure in one must not affect the others.
#[cfg_attr(test, mockall::automock)]
pub trait ActivitySource: Send + Sync {
    fn sessions(&self) -> Result<Vec<SessionEntry>>;

    fn recent_files(&self) -> Result<Vec<RecentFileEntry>>;

    fn network_volumes(&self) -> Result<Vec<VolumeEntry>>;

    fn share_history(&self) -> Result<Vec<ShareEntry>>;

    /// Processes without a resolvable executable, zombies and processes that vanish while being
    /// inspected are skipped.
    fn running_processes(&self) -> Result<Vec<ProcessEntry>>;

    /// Missing package registries are not an error and produce no entries.
    fn installed_apps(&self) -> Result<Vec<InstalledAppEntry>>;
}

/// Serves as a cross-compatible [ActivitySource] implementation.
pub struct GenericActivitySource {
    inner: Box<dyn ActivitySource>,
}

impl GenericActivitySource {
    pub fn new(platform: &Platform) -> Result<Self, CollectError> {
        let inner = match platform {
            Platform::Linux => linux_source(),
            Platform::MacOs => macos_source(),
            Platform::Windows => windows_source(),
            Platform::Other(name) => return Err(CollectError::UnsupportedPlatform(name.to_string())),
        };
        Ok(Self { inner })
    }
}

fn linux_source() -> Box<dyn ActivitySource> {
    cfg_if::cfg_if! {
        if #[cfg(target_os = "linux")] {
            Box::new(linux::LinuxActivitySource::from_env())
        } else {
            Box::new(EmptyActivitySource)
        }
    }
}

fn macos_source() -> Box<dyn ActivitySource> {
    cfg_if::cfg_if! {
        if #[cfg(target_os = "macos")] {
            Box::new(macos::MacActivitySource::new())
        } else {
            Box::new(EmptyActivitySource)
        }
    }
}

fn windows_source() -> Box<dyn ActivitySource> {
    cfg_if::cfg_if! {
        if #[cfg(windows)] {
            Box::new(win::WindowsActivitySource::from_env())
        } else {
            Box::new(EmptyActivitySource)
        }
    }
}

impl ActivitySource for GenericActivitySource {
    fn sessions(&self) -> Result<Vec<SessionEntry>> {
        self.inner.sessions()
    }

    fn recent_files(&self) -> Result<Vec<RecentFileEntry>> {
        self.inner.recent_files()
    }

    fn network_volumes(&self) -> Result<Vec<VolumeEntry>> {
        self.inner.network_volumes()
    }

    fn share_history(&self) -> Result<Vec<ShareEntry>> {
        self.inner.share_history()
    }

    fn running_processes(&self) -> Result<Vec<ProcessEntry>> {
        self.inner.running_processes()
    }

    fn installed_apps(&self) -> Result<Vec<InstalledAppEntry>> {
        self.inner.installed_apps()
    }
}

/// Used for platforms this binary has no native backend for.
pub struct EmptyActivitySource;

impl ActivitySource for EmptyActivitySource {
    fn sessions(&self) -> Result<Vec<SessionEntry>> {
        Ok(vec![])
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
        Ok(vec![])
    }

    fn installed_apps(&self) -> Result<Vec<InstalledAppEntry>> {
        Ok(vec![])
    }
}

/// Install dates are reported in the same `YYYYMMDD` shape the Windows registry uses.
#[cfg(any(target_os = "linux", target_os = "macos"))]
pub(crate) fn install_date_from(modified: SystemTime) -> String {
    DateTime::<chrono::Local>::from(modified).format("%Y%m%d").to_string()
}
