use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Ios,
    Android,
    Desktop,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Ios => "ios",
            Platform::Android => "android",
            Platform::Desktop => "desktop",
        }
    }

    pub fn is_mobile(&self) -> bool {
        matches!(self, Platform::Ios | Platform::Android)
    }
}

/// Works out which platform a visitor is on. Kept behind a trait so tests
/// can pin the answer.
pub trait PlatformDetector: Send + Sync {
    fn detect(&self, user_agent: Option<&str>) -> Platform;
}

/// Classifies by User-Agent substrings.
pub struct UserAgentDetector;

impl PlatformDetector for UserAgentDetector {
    fn detect(&self, user_agent: Option<&str>) -> Platform {
        let ua = user_agent.unwrap_or_default().to_lowercase();
        if ["iphone", "ipad", "ipod"].iter().any(|d| ua.contains(d)) {
            Platform::Ios
        } else if ua.contains("android") {
            Platform::Android
        } else {
            Platform::Desktop
        }
    }
}
