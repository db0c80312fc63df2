use std::{fs, sync::OnceLock, time::Instant};

use crate::config::DEFAULT_DEVICE_ID;

static START_TIME: OnceLock<Instant> = OnceLock::new();

/// Initialize agent start time.
pub fn init_uptime() {
    START_TIME.get_or_init(Instant::now);
}

/// Get agent uptime in seconds.
pub fn uptime_seconds() -> u64 {
    let start = START_TIME.get_or_init(Instant::now);
    start.elapsed().as_secs()
}

/// Get platform (OS family).
#[inline]
pub fn platform() -> &'static str {
    std::env::consts::OS
}

/// Get architecture.
#[inline]
pub fn arch() -> &'static str {
    std::env::consts::ARCH
}

/// Host name of the machine, if it is valid UTF-8.
pub fn host_name() -> Option<String> {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty())
}

/// Device identity used to namespace uploaded objects.
///
/// The configured `DeviceId` wins; an empty or placeholder id falls back to
/// the host name, then to the placeholder itself.
pub fn resolve_device_id(configured: &str) -> String {
    let configured = configured.trim();
    if !configured.is_empty() && configured != DEFAULT_DEVICE_ID {
        return configured.to_string();
    }
    host_name().unwrap_or_else(|| DEFAULT_DEVICE_ID.to_string())
}

/// Get OS distribution info (Linux only, best effort).
///
/// Returns OS name from `/etc/os-release` or generic platform name.
pub fn os_info() -> String {
    #[cfg(target_os = "linux")]
    {
        if let Ok(content) = fs::read_to_string("/etc/os-release") {
            for line in content.lines() {
                if let Some(name) = line.strip_prefix("PRETTY_NAME=") {
                    return name.trim_matches('"').to_string();
                }
            }
        }
    }

    platform().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_device_id_wins() {
        assert_eq!(resolve_device_id(" nest-042 "), "nest-042");
    }

    #[test]
    fn placeholder_device_id_falls_back() {
        let id = resolve_device_id(DEFAULT_DEVICE_ID);
        assert!(!id.is_empty());
        assert_eq!(id, resolve_device_id(""));
    }

    #[test]
    fn test_platform() {
        assert!(!platform().is_empty());
        assert!(!arch().is_empty());
        assert!(!os_info().is_empty());
    }
}
