use std::{
    env, fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use super::{
    processes, ActivitySource, InstalledAppEntry, ProcessEntry, RecentFileEntry, SessionEntry,
    ShareEntry, VolumeEntry,
};

/// Drive letters that are conventionally assigned to mapped network drives.
const MAPPED_DRIVES: std::ops::RangeInclusive<char> = 'D'..='Z';

pub struct WindowsActivitySource {
    recent_folder: Option<PathBuf>,
}

impl WindowsActivitySource {
    pub fn from_env() -> Self {
        Self {
            recent_folder: env::var_os("APPDATA")
                .map(|appdata| Path::new(&appdata).join(r"Microsoft\Windows\Recent")),
        }
    }
}

impl ActivitySource for WindowsActivitySource {
    fn sessions(&self) -> Result<Vec<SessionEntry>> {
        cfg_if::cfg_if! {
            if #[cfg(feature = "win")] {
                wts::active_sessions()
            } else {
                debug!("Built without the win feature, sessions are unavailable");
                Ok(vec![])
            }
        }
    }

    #[instrument(skip(self))]
    fn recent_files(&self) -> Result<Vec<RecentFileEntry>> {
        let Some(folder) = &self.recent_folder else {
            return Ok(vec![]);
        };
        let entries = match fs::read_dir(folder) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(e.into()),
        };

        let mut files = vec![];
        for entry in entries {
            let (entry, metadata) = match entry.and_then(|e| e.metadata().map(|m| (e, m))) {
                Ok(found) => found,
                Err(e) => {
                    debug!("Skipping unreadable recent item: {e}");
                    continue;
                }
            };
            if !metadata.is_file() {
                continue;
            }
            let Ok(modified) = metadata.modified() else {
                debug!("No modification time for {:?}", entry.path());
                continue;
            };
            files.push(RecentFileEntry {
                path: entry.file_name().to_string_lossy().into_owned(),
                accessed: DateTime::<Utc>::from(modified),
                source: "recent_folder",
            });
        }
        Ok(files)
    }

    #[instrument(skip(self))]
    fn network_volumes(&self) -> Result<Vec<VolumeEntry>> {
        let mut volumes = vec![];
        for letter in MAPPED_DRIVES.rev() {
            let root = format!("{letter}:\\");
            let Ok(modified) = fs::metadata(&root).and_then(|m| m.modified()) else {
                continue;
            };
            volumes.push(VolumeEntry {
                path: format!("{letter}:"),
                modified: DateTime::<Utc>::from(modified),
                source: "drive_check",
            });
        }
        Ok(volumes)
    }

    fn share_history(&self) -> Result<Vec<ShareEntry>> {
        cfg_if::cfg_if! {
            if #[cfg(feature = "win")] {
                registry::mount_points()
            } else {
                Ok(vec![])
            }
        }
    }

    fn running_processes(&self) -> Result<Vec<ProcessEntry>> {
        processes::running_processes()
    }

    fn installed_apps(&self) -> Result<Vec<InstalledAppEntry>> {
        cfg_if::cfg_if! {
            if #[cfg(feature = "win")] {
                registry::uninstall_entries()
            } else {
                Ok(vec![])
            }
        }
    }
}

/// FILETIME counts 100ns ticks since 1601-01-01.
#[cfg(feature = "win")]
fn from_filetime(ticks: i64) -> Option<DateTime<Utc>> {
    const EPOCH_DIFFERENCE: i64 = 11_644_473_600;
    if ticks <= 0 {
        return None;
    }
    DateTime::from_timestamp(ticks / 10_000_000 - EPOCH_DIFFERENCE, 0)
}

#[cfg(feature = "win")]
fn from_wide(chars: &[u16]) -> String {
    let len = chars.iter().position(|c| *c == 0).unwrap_or(chars.len());
    String::from_utf16_lossy(&chars[..len])
}

#[cfg(feature = "win")]
mod wts {
    use anyhow::Result;
    use tracing::{instrument, trace, warn};
    use windows::{
        core::PWSTR,
        Win32::System::RemoteDesktop::{
            WTSActive, WTSEnumerateSessionsW, WTSFreeMemory, WTSQuerySessionInformationW,
            WTSSessionInfo, WTSINFOW, WTS_CURRENT_SERVER_HANDLE, WTS_SESSION_INFOW,
        },
    };

    use super::{from_filetime, from_wide, SessionEntry};

    #[instrument]
    pub fn active_sessions() -> Result<Vec<SessionEntry>> {
        let mut sessions_ptr: *mut WTS_SESSION_INFOW = std::ptr::null_mut();
        let mut count = 0u32;
        unsafe { WTSEnumerateSessionsW(WTS_CURRENT_SERVER_HANDLE, 0, 1, &mut sessions_ptr, &mut count) }?;

        let mut result = vec![];
        let infos = unsafe { std::slice::from_raw_parts(sessions_ptr, count as usize) };
        for info in infos.iter().filter(|info| info.State == WTSActive) {
            match session_info(info.SessionId) {
                Ok(Some(session)) => {
                    trace!("Found session {session:?}");
                    result.push(session)
                }
                Ok(None) => {}
                Err(e) => warn!("Failed to query session {}: {e:?}", info.SessionId),
            }
        }
        unsafe { WTSFreeMemory(sessions_ptr.cast()) };
        Ok(result)
    }

    fn session_info(id: u32) -> Result<Option<SessionEntry>> {
        let mut buffer = PWSTR::null();
        let mut bytes = 0u32;
        unsafe {
            WTSQuerySessionInformationW(WTS_CURRENT_SERVER_HANDLE, id, WTSSessionInfo, &mut buffer, &mut bytes)
        }?;
        let info = unsafe { &*(buffer.0 as *const WTSINFOW) };
        let username = from_wide(&info.UserName);
        let station = from_wide(&info.WinStationName);
        let started = from_filetime(info.LogonTime);
        unsafe { WTSFreeMemory(buffer.0.cast()) };

        // Services and the console before logon have no user attached.
        let (false, Some(started)) = (username.is_empty(), started) else {
            return Ok(None);
        };
        Ok(Some(SessionEntry {
            username,
            host: (!station.is_empty()).then_some(station),
            started,
            source: "wts",
        }))
    }
}

#[cfg(feature = "win")]
mod registry {
    use anyhow::Result;
    use tracing::{instrument, warn};
    use windows::{
        core::{PCWSTR, PWSTR},
        Win32::{
            Foundation::ERROR_NO_MORE_ITEMS,
            System::Registry::{
                RegCloseKey, RegEnumKeyExW, RegOpenKeyExW, RegQueryValueExW, HKEY,
                HKEY_CURRENT_USER, HKEY_LOCAL_MACHINE, KEY_READ, REG_SZ, REG_VALUE_TYPE,
            },
        },
    };

    use super::{from_wide, share_path, InstalledAppEntry, ShareEntry};

    const MOUNT_POINTS: &str = r"Software\Microsoft\Windows\CurrentVersion\Explorer\MountPoints2";
    const UNINSTALL: [&str; 2] = [
        r"SOFTWARE\Microsoft\Windows\CurrentVersion\Uninstall",
        r"SOFTWARE\WOW6432Node\Microsoft\Windows\CurrentVersion\Uninstall",
    ];

    /// Closes the handle on drop.
    struct RegistryKey(HKEY);

    impl RegistryKey {
        fn open(parent: HKEY, path: &str) -> Result<Self> {
            let path = wide(path);
            let mut key = HKEY::default();
            unsafe { RegOpenKeyExW(parent, PCWSTR(path.as_ptr()), 0, KEY_READ, &mut key) }.ok()?;
            Ok(Self(key))
        }

        fn subkeys(&self) -> Result<Vec<String>> {
            let mut names = vec![];
            let mut buffer = [0u16; 256];
            for index in 0.. {
                let mut len = buffer.len() as u32;
                let status = unsafe {
                    RegEnumKeyExW(
                        self.0,
                        index,
                        PWSTR(buffer.as_mut_ptr()),
                        &mut len,
                        None,
                        PWSTR::null(),
                        None,
                        None,
                    )
                };
                if status == ERROR_NO_MORE_ITEMS {
                    break;
                }
                status.ok()?;
                names.push(String::from_utf16_lossy(&buffer[..len as usize]));
            }
            Ok(names)
        }

        fn string_value(&self, name: &str) -> Option<String> {
            let name = wide(name);
            let mut buffer = [0u16; 512];
            let mut size = (buffer.len() * 2) as u32;
            let mut kind = REG_VALUE_TYPE::default();
            unsafe {
                RegQueryValueExW(
                    self.0,
                    PCWSTR(name.as_ptr()),
                    None,
                    Some(&mut kind),
                    Some(buffer.as_mut_ptr().cast()),
                    Some(&mut size),
                )
            }
            .ok()
            .ok()?;
            if kind != REG_SZ {
                return None;
            }
            let value = from_wide(&buffer[..size as usize / 2]);
            (!value.is_empty()).then_some(value)
        }
    }

    impl Drop for RegistryKey {
        fn drop(&mut self) {
            let _ = unsafe { RegCloseKey(self.0) };
        }
    }

    fn wide(value: &str) -> Vec<u16> {
        value.encode_utf16().chain(std::iter::once(0)).collect()
    }

    /// Every volume the user mounted. Network shares show up as `##server#share` keys and are
    /// reported as UNC paths, volume GUIDs and drive letters are kept as named.
    #[instrument]
    pub fn mount_points() -> Result<Vec<ShareEntry>> {
        let key = RegistryKey::open(HKEY_CURRENT_USER, MOUNT_POINTS)?;
        Ok(key
            .subkeys()?
            .into_iter()
            .map(|name| ShareEntry {
                path: share_path(&name),
                source: "registry",
            })
            .collect())
    }

    #[instrument]
    pub fn uninstall_entries() -> Result<Vec<InstalledAppEntry>> {
        let mut apps = vec![];
        for root in UNINSTALL {
            let key = match RegistryKey::open(HKEY_LOCAL_MACHINE, root) {
                Ok(key) => key,
                Err(e) => {
                    warn!("Failed to open {root}: {e:?}");
                    continue;
                }
            };
            for name in key.subkeys()? {
                let Ok(app) = RegistryKey::open(key.0, &name) else {
                    continue;
                };
                let Some(display_name) = app.string_value("DisplayName") else {
                    continue;
                };
                apps.push(InstalledAppEntry {
                    key: name,
                    display_name,
                    install_date: app.string_value("InstallDate"),
                    source: "registry",
                });
            }
        }
        Ok(apps)
    }
}

/// `##server#share` becomes `\\server\share`.
#[cfg(any(feature = "win", test))]
fn share_path(key_name: &str) -> String {
    match key_name.strip_prefix("##") {
        Some(unc) => format!("\\\\{}", unc.replace('#', "\\")),
        None => key_name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_recent_folder_is_empty() -> Result<()> {
        let source = WindowsActivitySource {
            recent_folder: Some(PathBuf::from(r"C:\does\not\exist")),
        };
        assert!(source.recent_files()?.is_empty());
        Ok(())
    }

    #[test]
    fn test_recent_folder_lists_file_names() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join("report.docx.lnk"), b"")?;
        let source = WindowsActivitySource {
            recent_folder: Some(dir.path().to_path_buf()),
        };
        let files = source.recent_files()?;
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "report.docx.lnk");
        Ok(())
    }

    #[test]
    fn test_recent_folder_skips_directories() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::create_dir(dir.path().join("AutomaticDestinations"))?;
        fs::create_dir(dir.path().join("CustomDestinations"))?;
        fs::write(dir.path().join("budget.xlsx.lnk"), b"")?;
        let source = WindowsActivitySource {
            recent_folder: Some(dir.path().to_path_buf()),
        };

        let files = source.recent_files()?;

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "budget.xlsx.lnk");
        Ok(())
    }

    #[test]
    fn test_share_path() {
        assert_eq!(share_path("##fileserver#team"), r"\\fileserver\team");
        let volume = "{6a0f1c2e-0000-0000-0000-100000000000}";
        assert_eq!(share_path(volume), volume);
        assert_eq!(share_path("E"), "E");
    }

    #[cfg(feature = "win")]
    #[test]
    fn test_from_filetime() {
        assert_eq!(from_filetime(0), None);
        // 1970-01-01 expressed in FILETIME ticks.
        assert_eq!(
            from_filetime(116_444_736_000_000_000),
            DateTime::from_timestamp(0, 0)
        );
    }
}
