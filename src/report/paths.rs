use std::{
    fs, io,
    path::{Path, PathBuf},
};

pub const REPORTS_DIRECTORY: &str = "reports";

/// Creates `base/reports` if it doesn't exist yet.
pub fn create_output_directory(base: &Path) -> io::Result<PathBuf> {
    let path = base.join(REPORTS_DIRECTORY);
    match fs::create_dir_all(&path) {
        Ok(_) => Ok(path),
        Err(v) if v.kind() == io::ErrorKind::AlreadyExists => Ok(path),
        Err(v) => Err(v),
    }
}

/// First of `base.ext`, `base_1.ext`, `base_2.ext`, ... that doesn't exist in `dir`.
pub fn unique_filename(dir: &Path, base: &str, extension: &str) -> PathBuf {
    let extension = extension.trim_start_matches('.');
    let mut candidate = dir.join(format!("{base}.{extension}"));
    let mut counter = 1;
    while candidate.exists() {
        candidate = dir.join(format!("{base}_{counter}.{extension}"));
        counter += 1;
    }
    candidate
}
