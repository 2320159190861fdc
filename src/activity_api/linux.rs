use std::{
    env,
    ffi::OsStr,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use percent_encoding::percent_decode_str;
use quick_xml::{events::Event, Reader};
use tracing::{debug, instrument};

use super::{
    install_date_from, processes, ActivitySource, InstalledAppEntry, ProcessEntry,
    RecentFileEntry, SessionEntry, ShareEntry, VolumeEntry,
};

const NETWORK_FILESYSTEMS: [&str; 9] = [
    "cifs",
    "smb3",
    "smbfs",
    "nfs",
    "nfs4",
    "fuse.sshfs",
    "sshfs",
    "davfs",
    "fuse.davfs2",
];

const SHARE_SCHEMES: [&str; 6] = ["smb://", "sftp://", "nfs://", "ftp://", "dav://", "davs://"];

/// Locations of the files the Linux backend reads.
#[derive(Debug, Clone)]
pub struct LinuxPaths {
    /// freedesktop `recently-used.xbel`.
    pub recently_used: Option<PathBuf>,
    /// GTK file chooser bookmarks, which is where mounted shares are remembered.
    pub bookmarks: Option<PathBuf>,
    pub mounts: PathBuf,
    /// dpkg keeps one `<package>.list` per installed package here.
    pub package_info: PathBuf,
}

impl LinuxPaths {
    pub fn from_env() -> Self {
        let home = env::var_os("HOME").map(PathBuf::from);
        let data_home = env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .or_else(|| home.as_ref().map(|home| home.join(".local/share")));
        let config_home = env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| home.as_ref().map(|home| home.join(".config")));

        Self {
            recently_used: data_home.map(|dir| dir.join("recently-used.xbel")),
            bookmarks: config_home.map(|dir| dir.join("gtk-3.0/bookmarks")),
            mounts: PathBuf::from("/proc/mounts"),
            package_info: PathBuf::from("/var/lib/dpkg/info"),
        }
    }
}

pub struct LinuxActivitySource {
    paths: LinuxPaths,
}

impl LinuxActivitySource {
    pub fn from_env() -> Self {
        Self::with_paths(LinuxPaths::from_env())
    }

    pub fn with_paths(paths: LinuxPaths) -> Self {
        Self { paths }
    }
}

impl ActivitySource for LinuxActivitySource {
    fn sessions(&self) -> Result<Vec<SessionEntry>> {
        cfg_if::cfg_if! {
            if #[cfg(target_env = "gnu")] {
                super::utmpx::active_sessions()
            } else {
                Ok(vec![])
            }
        }
    }

    #[instrument(skip(self))]
    fn recent_files(&self) -> Result<Vec<RecentFileEntry>> {
        let Some(content) = read_optional(self.paths.recently_used.as_deref())? else {
            return Ok(vec![]);
        };
        parse_recently_used(&content)
    }

    #[instrument(skip(self))]
    fn network_volumes(&self) -> Result<Vec<VolumeEntry>> {
        let mounts = fs::read_to_string(&self.paths.mounts)
            .with_context(|| format!("Failed to read {:?}", self.paths.mounts))?;
        let mut volumes = vec![];
        for mount_point in network_mount_points(&mounts) {
            match fs::metadata(&mount_point).and_then(|m| m.modified()) {
                Ok(modified) => volumes.push(VolumeEntry {
                    path: mount_point,
                    modified: DateTime::<Utc>::from(modified),
                    source: "proc_mounts",
                }),
                // Stale mounts can't be inspected.
                Err(e) => debug!("Skipping mount {mount_point}: {e}"),
            }
        }
        Ok(volumes)
    }

    fn share_history(&self) -> Result<Vec<ShareEntry>> {
        let Some(content) = read_optional(self.paths.bookmarks.as_deref())? else {
            return Ok(vec![]);
        };
        Ok(parse_share_bookmarks(&content))
    }

    fn running_processes(&self) -> Result<Vec<ProcessEntry>> {
        processes::running_processes()
    }

    #[instrument(skip(self))]
    fn installed_apps(&self) -> Result<Vec<InstalledAppEntry>> {
        let entries = match fs::read_dir(&self.paths.package_info) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No dpkg database at {:?}", self.paths.package_info);
                return Ok(vec![]);
            }
            Err(e) => return Err(e.into()),
        };

        let mut apps = vec![];
        for entry in entries {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(e) => {
                    debug!("Skipping unreadable dpkg entry: {e}");
                    continue;
                }
            };
            if path.extension() != Some(OsStr::new("list")) {
                continue;
            }
            let Some(key) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
                continue;
            };
            // Multiarch packages are listed as `name:arch`.
            let display_name = key.split(':').next().unwrap_or(&key).to_string();
            let install_date = fs::metadata(&path)
                .and_then(|m| m.modified())
                .ok()
                .map(install_date_from);
            apps.push(InstalledAppEntry {
                key,
                display_name,
                install_date,
                source: "dpkg",
            });
        }
        apps.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(apps)
    }
}

/// Reads a file that is allowed not to exist.
fn read_optional(path: Option<&Path>) -> Result<Option<String>> {
    let Some(path) = path else {
        return Ok(None);
    };
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("Failed to read {path:?}")),
    }
}

fn parse_recently_used(xml: &str) -> Result<Vec<RecentFileEntry>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut files = vec![];
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"bookmark" => {
                let mut href = None;
                let mut visited = None;
                let mut modified = None;
                let mut added = None;
                for attribute in e.attributes().flatten() {
                    let value = attribute.unescape_value()?.into_owned();
                    match attribute.key.as_ref() {
                        b"href" => href = Some(value),
                        b"visited" => visited = parse_stamp(&value),
                        b"modified" => modified = parse_stamp(&value),
                        b"added" => added = parse_stamp(&value),
                        _ => {}
                    }
                }
                let (Some(href), Some(accessed)) = (href, visited.or(modified).or(added)) else {
                    continue;
                };
                files.push(RecentFileEntry {
                    path: decode_file_uri(&href),
                    accessed,
                    source: "recently_used",
                });
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(files)
}

fn parse_stamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|stamp| stamp.with_timezone(&Utc))
}

/// Turns `file:///home/a%20b` or `file://localhost/home/a%20b` into `/home/a b`. URIs of other
/// schemes or naming a remote host are kept as they are.
fn decode_file_uri(href: &str) -> String {
    let Some(rest) = href.strip_prefix("file://") else {
        return href.to_string();
    };
    let path = match rest.find('/') {
        Some(0) => rest,
        Some(slash) if rest[..slash].eq_ignore_ascii_case("localhost") => &rest[slash..],
        _ => return href.to_string(),
    };
    percent_decode_str(path).decode_utf8_lossy().into_owned()
}

/// Mount points of network filesystems, in the order `/proc/mounts` lists them.
fn network_mount_points(mounts: &str) -> Vec<String> {
    mounts
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let _device = fields.next()?;
            let mount_point = fields.next()?;
            let fs_type = fields.next()?;
            NETWORK_FILESYSTEMS
                .contains(&fs_type)
                .then(|| unescape_mount_path(mount_point))
        })
        .collect()
}

/// The kernel escapes whitespace and backslashes in mount paths as octal.
fn unescape_mount_path(path: &str) -> String {
    path.replace("\\040", " ")
        .replace("\\011", "\t")
        .replace("\\012", "\n")
        .replace("\\134", "\\")
}

/// GTK bookmarks are `<uri> [label]` per line.
fn parse_share_bookmarks(content: &str) -> Vec<ShareEntry> {
    content
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .filter(|uri| SHARE_SCHEMES.iter().any(|scheme| uri.starts_with(scheme)))
        .map(|uri| ShareEntry {
            path: uri.to_string(),
            source: "gtk_bookmarks",
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::fs::File;

    use chrono::TimeZone;
    use tempfile::tempdir;

    use super::*;

    const RECENTLY_USED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xbel version="1.0"
      xmlns:bookmark="http://www.freedesktop.org/standards/desktop-bookmarks"
      xmlns:mime="http://www.freedesktop.org/standards/shared-mime-info">
  <bookmark href="file:///home/alice/Documents/Quarterly%20plan.odt" added="2024-01-10T09:00:00.000000Z" modified="2024-01-10T09:00:00.000000Z" visited="2024-01-12T15:30:00.000000Z">
    <info><metadata owner="http://freedesktop.org"><mime:mime-type type="application/vnd.oasis.opendocument.text"/></metadata></info>
  </bookmark>
  <bookmark href="smb://fileserver/team/notes.txt" added="2024-01-11T08:00:00Z" modified="2024-01-11T08:05:00Z"/>
  <bookmark href="file:///tmp/no-stamp.txt"/>
</xbel>"#;

    fn paths_in(dir: &Path) -> LinuxPaths {
        LinuxPaths {
            recently_used: Some(dir.join("recently-used.xbel")),
            bookmarks: Some(dir.join("bookmarks")),
            mounts: dir.join("mounts"),
            package_info: dir.join("dpkg/info"),
        }
    }

    #[test]
    fn test_parse_recently_used() -> Result<()> {
        let files = parse_recently_used(RECENTLY_USED)?;

        assert_eq!(files.len(), 2);
        assert_eq!(files[0].path, "/home/alice/Documents/Quarterly plan.odt");
        assert_eq!(
            files[0].accessed,
            Utc.with_ymd_and_hms(2024, 1, 12, 15, 30, 0).unwrap()
        );
        assert_eq!(files[1].path, "smb://fileserver/team/notes.txt");
        assert_eq!(
            files[1].accessed,
            Utc.with_ymd_and_hms(2024, 1, 11, 8, 5, 0).unwrap()
        );
        Ok(())
    }

    #[test]
    fn test_decode_file_uri() {
        assert_eq!(decode_file_uri("file:///a%20b/c%25d"), "/a b/c%d");
        assert_eq!(decode_file_uri("file:///trailing%2"), "/trailing%2");
        assert_eq!(decode_file_uri("sftp://host/x"), "sftp://host/x");
        assert_eq!(decode_file_uri("file://localhost/home/a%20b"), "/home/a b");
        assert_eq!(decode_file_uri("file://server/share/x"), "file://server/share/x");
    }

    #[test]
    fn test_network_mount_points() {
        let mounts = "\
/dev/sda1 / ext4 rw,relatime 0 0
//server/share /mnt/team\\040share cifs rw,vers=3.0 0 0
proc /proc proc rw 0 0
nas:/export /mnt/nas nfs4 rw 0 0
";
        assert_eq!(
            network_mount_points(mounts),
            ["/mnt/team share", "/mnt/nas"]
        );
    }

    #[test]
    fn test_parse_share_bookmarks() {
        let content = "file:///home/alice/Music Music\nsmb://server/share Team\nsftp://host/srv\n\n";
        let shares = parse_share_bookmarks(content);
        let paths = shares.iter().map(|s| s.path.as_str()).collect::<Vec<_>>();
        assert_eq!(paths, ["smb://server/share", "sftp://host/srv"]);
    }

    #[test]
    fn test_missing_files_produce_no_entries() -> Result<()> {
        let dir = tempdir()?;
        let source = LinuxActivitySource::with_paths(paths_in(dir.path()));

        assert!(source.recent_files()?.is_empty());
        assert!(source.share_history()?.is_empty());
        assert!(source.installed_apps()?.is_empty());
        // Unlike the others, a missing mount table is an actual failure.
        assert!(source.network_volumes().is_err());
        Ok(())
    }

    #[test]
    fn test_installed_apps_from_dpkg_lists() -> Result<()> {
        let dir = tempdir()?;
        let paths = paths_in(dir.path());
        fs::create_dir_all(&paths.package_info)?;
        File::create(paths.package_info.join("zsh.list"))?;
        File::create(paths.package_info.join("libc6:amd64.list"))?;
        File::create(paths.package_info.join("zsh.md5sums"))?;

        let apps = LinuxActivitySource::with_paths(paths).installed_apps()?;

        let names = apps.iter().map(|a| a.display_name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, ["libc6", "zsh"]);
        assert_eq!(apps[0].key, "libc6:amd64");
        assert!(apps
            .iter()
            .all(|a| a.install_date.as_ref().is_some_and(|d| d.len() == 8)));
        Ok(())
    }
}
