use std::{env, io, path::PathBuf};

use anyhow::Result;

const APPLICATION_DIRECTORY: &str = "footprint";

/// Directory for state that outlives a run, currently only logs.
///
/// Resolution order is `%APPDATA%` on Windows, then `$XDG_STATE_HOME`, then
/// `$HOME/.local/state`, and finally the system temp directory.
pub fn create_application_default_path() -> Result<PathBuf> {
    let mut path = state_base(|name| env::var_os(name).filter(|value| !value.is_empty()));
    path.push(APPLICATION_DIRECTORY);

    match std::fs::create_dir_all(&path) {
        Ok(_) => Ok(path),
        Err(v) if v.kind() == io::ErrorKind::AlreadyExists => Ok(path),
        Err(v) => Err(v.into()),
    }
}

fn state_base(lookup: impl Fn(&str) -> Option<std::ffi::OsString>) -> PathBuf {
    if cfg!(windows) {
        if let Some(appdata) = lookup("APPDATA") {
            return PathBuf::from(appdata);
        }
    }
    lookup("XDG_STATE_HOME")
        .map(PathBuf::from)
        .or_else(|| lookup("HOME").map(|home| PathBuf::from(home).join(".local/state")))
        .unwrap_or_else(env::temp_dir)
}
