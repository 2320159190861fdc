use std::{env, fmt::Display, sync::Arc};

use sysinfo::System;

/// Platform tag resolved once at startup and handed to collectors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Platform {
    Windows,
    MacOs,
    Linux,
    Other(Arc<str>),
}

impl Platform {
    pub fn current() -> Self {
        Self::from_os_name(env::consts::OS)
    }

    /// Accepts names in the format of [std::env::consts::OS].
    pub fn from_os_name(name: &str) -> Self {
        match name {
            "windows" => Platform::Windows,
            "macos" => Platform::MacOs,
            "linux" => Platform::Linux,
            other => Platform::Other(other.into()),
        }
    }
}

impl Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Platform::Windows => write!(f, "Windows"),
            Platform::MacOs => write!(f, "Darwin"),
            Platform::Linux => write!(f, "Linux"),
            Platform::Other(name) => write!(f, "{name}"),
        }
    }
}

const USERNAME_VARIABLES: [&str; 3] = ["USERNAME", "USER", "LOGNAME"];
const UNKNOWN: &str = "Unknown";

/// Name of the user running the tool. There is no authenticated-user API in use, so this goes
/// through the usual environment variables.
pub fn resolve_username() -> String {
    resolve_username_with(|name| env::var(name).ok())
}

fn resolve_username_with(lookup: impl Fn(&str) -> Option<String>) -> String {
    USERNAME_VARIABLES
        .iter()
        .filter_map(|name| lookup(name))
        .find(|value| !value.trim().is_empty())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

/// Read-only snapshot of the machine. Queried once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemInfo {
    pub platform: String,
    pub platform_version: String,
    pub machine: String,
    pub processor: String,
    pub hostname: String,
    pub username: String,
}

impl SystemInfo {
    pub fn query(platform: &Platform) -> Self {
        let system = System::new_all();
        let processor = system
            .cpus()
            .first()
            .map(|cpu| cpu.brand().trim().to_string())
            .filter(|brand| !brand.is_empty())
            .unwrap_or_else(|| UNKNOWN.to_string());

        Self {
            platform: platform.to_string(),
            platform_version: System::long_os_version()
                .or_else(System::kernel_version)
                .unwrap_or_else(|| UNKNOWN.to_string()),
            machine: env::consts::ARCH.to_string(),
            processor,
            hostname: System::host_name().unwrap_or_else(|| UNKNOWN.to_string()),
            username: resolve_username(),
        }
    }

    /// Key/value pairs in display order.
    pub fn entries(&self) -> [(&'static str, &str); 6] {
        [
            ("platform", &self.platform),
            ("platform_version", &self.platform_version),
            ("machine", &self.machine),
            ("processor", &self.processor),
            ("hostname", &self.hostname),
            ("username", &self.username),
        ]
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_platform_from_os_name() {
        assert_eq!(Platform::from_os_name("linux"), Platform::Linux);
        assert_eq!(Platform::from_os_name("macos"), Platform::MacOs);
        assert_eq!(Platform::from_os_name("windows"), Platform::Windows);
        assert_eq!(
            Platform::from_os_name("freebsd"),
            Platform::Other("freebsd".into())
        );
    }

    #[test]
    fn test_username_fallback_order() {
        let vars = HashMap::from([("USER", "bob"), ("LOGNAME", "carol")]);
        let name = resolve_username_with(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(name, "bob");

        let vars = HashMap::from([("USERNAME", " "), ("LOGNAME", "carol")]);
        let name = resolve_username_with(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(name, "carol");

        assert_eq!(resolve_username_with(|_| None), "Unknown");
    }

    #[test]
    fn test_system_info_entries_order() {
        let info = SystemInfo {
            platform: "Linux".into(),
            platform_version: "6.1".into(),
            machine: "x86_64".into(),
            processor: "cpu".into(),
            hostname: "box".into(),
            username: "alice".into(),
        };
        let keys = info.entries().map(|(k, _)| k);
        assert_eq!(
            keys,
            ["platform", "platform_version", "machine", "processor", "hostname", "username"]
        );
    }
}
