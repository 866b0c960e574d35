//! Device classification from an injected [`DeviceInfo`].

use serde::{Deserialize, Serialize};

use crate::quality::DeviceTier;

/// Memory assumed when the platform does not report it.
pub const UNKNOWN_MEMORY_GB: f32 = 4.0;

const MOBILE_MARKERS: [&str; 6] = ["android", "iphone", "ipad", "ipod", "mobile", "ios"];

/// Platform facts used for tier detection. Read once, never looked up again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Approximate memory in GB, if known.
    pub memory_gb: Option<f32>,
    /// Logical cores.
    pub cores: usize,
    /// User-agent equivalent string.
    pub user_agent: String,
}

impl DeviceInfo {
    #[must_use]
    pub fn new(memory_gb: Option<f32>, cores: usize, user_agent: impl Into<String>) -> Self {
        Self {
            memory_gb,
            cores,
            user_agent: user_agent.into(),
        }
    }

    /// Facts about the current host. Memory is left unknown.
    #[must_use]
    pub fn from_host() -> Self {
        let cores = std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get);
        Self {
            memory_gb: None,
            cores,
            user_agent: format!("{}/{}", std::env::consts::OS, std::env::consts::ARCH),
        }
    }

    /// Case-insensitive match of whole words in the user agent. Words are
    /// runs of ASCII letters, so `iPhone13,2` still reads as `iphone` while
    /// `BIOS` is not `ios`.
    #[must_use]
    pub fn is_mobile(&self) -> bool {
        self.user_agent
            .split(|c: char| !c.is_ascii_alphabetic())
            .any(|word| {
                MOBILE_MARKERS
                    .iter()
                    .any(|marker| word.eq_ignore_ascii_case(marker))
            })
    }

    /// Bucket into a tier. Desktops are never `Low`.
    #[must_use]
    pub fn tier(&self) -> DeviceTier {
        let memory = self.memory_gb.unwrap_or(UNKNOWN_MEMORY_GB);
        if self.is_mobile() {
            if memory <= 2.0 || self.cores <= 2 {
                DeviceTier::Low
            } else if memory <= 4.0 || self.cores <= 4 {
                DeviceTier::Medium
            } else {
                DeviceTier::High
            }
        } else if memory >= 8.0 && self.cores >= 4 {
            DeviceTier::High
        } else {
            DeviceTier::Medium
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X)";
    const ANDROID: &str = "Mozilla/5.0 (Linux; Android 14; Pixel 8) Mobile";
    const DESKTOP: &str = "Mozilla/5.0 (X11; Linux x86_64)";

    #[test]
    fn mobile_detection_is_case_insensitive() {
        assert!(DeviceInfo::new(None, 4, IPHONE).is_mobile());
        assert!(DeviceInfo::new(None, 4, "SOMETHING-ANDROID").is_mobile());
        assert!(DeviceInfo::new(None, 4, "ios/aarch64").is_mobile());
        assert!(!DeviceInfo::new(None, 4, DESKTOP).is_mobile());
    }

    #[test]
    fn markers_match_whole_words_only() {
        assert!(DeviceInfo::new(None, 4, "iPhone13,2").is_mobile());
        assert!(DeviceInfo::new(None, 4, "Mozilla/5.0 (iPad; CPU OS 17_0)").is_mobile());
        assert!(!DeviceInfo::new(None, 4, "linux/x86_64 BIOS 2.1").is_mobile());
        assert!(!DeviceInfo::new(None, 4, "Mozilla/5.0 (compatible; Curiosity/1.0)").is_mobile());
        assert!(!DeviceInfo::new(None, 4, "Symbiosis desktop").is_mobile());
    }

    #[test]
    fn mobile_buckets() {
        assert_eq!(DeviceInfo::new(Some(2.0), 8, ANDROID).tier(), DeviceTier::Low);
        assert_eq!(DeviceInfo::new(Some(6.0), 2, ANDROID).tier(), DeviceTier::Low);
        assert_eq!(DeviceInfo::new(Some(4.0), 8, IPHONE).tier(), DeviceTier::Medium);
        assert_eq!(DeviceInfo::new(Some(6.0), 4, IPHONE).tier(), DeviceTier::Medium);
        assert_eq!(DeviceInfo::new(Some(8.0), 8, ANDROID).tier(), DeviceTier::High);
    }

    #[test]
    fn desktop_has_no_low_bucket() {
        assert_eq!(DeviceInfo::new(Some(1.0), 1, DESKTOP).tier(), DeviceTier::Medium);
        assert_eq!(DeviceInfo::new(Some(16.0), 2, DESKTOP).tier(), DeviceTier::Medium);
        assert_eq!(DeviceInfo::new(Some(8.0), 4, DESKTOP).tier(), DeviceTier::High);
    }

    #[test]
    fn unknown_memory_counts_as_four_gb() {
        // Desktop with unknown memory: 4 GB < 8 GB, so medium.
        assert_eq!(DeviceInfo::new(None, 16, DESKTOP).tier(), DeviceTier::Medium);
        // Mobile with unknown memory: 4 GB falls in the medium bucket.
        assert_eq!(DeviceInfo::new(None, 8, ANDROID).tier(), DeviceTier::Medium);
    }

    #[test]
    fn host_info_has_cores() {
        let info = DeviceInfo::from_host();
        assert!(info.cores >= 1);
        assert!(info.user_agent.contains('/'));
    }
}
