//! Browser/OS detection for platform-specific behavior.
//!
//! Only the pieces the editor acts on are detected: which modifier is the
//! primary one for shortcuts.

/// Detected platform traits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Platform {
    pub mac: bool,
    pub ios: bool,
    pub android: bool,
}

impl Platform {
    /// Detect from a `navigator.userAgent` string.
    pub fn from_user_agent(ua: &str) -> Self {
        let ios = ua.contains("iPhone") || ua.contains("iPad") || ua.contains("iPod");
        Self {
            mac: !ios && (ua.contains("Macintosh") || ua.contains("Mac OS X")),
            ios,
            android: ua.contains("Android"),
        }
    }

    /// Cmd is the primary modifier on Apple platforms.
    pub fn uses_meta(&self) -> bool {
        self.mac || self.ios
    }
}

/// Platform of the running browser.
#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
pub fn platform() -> Platform {
    let ua = web_sys::window()
        .and_then(|w| w.navigator().user_agent().ok())
        .unwrap_or_default();
    Platform::from_user_agent(&ua)
}

/// Outside the browser nothing is detected.
#[cfg(not(all(target_arch = "wasm32", target_os = "unknown")))]
pub fn platform() -> Platform {
    Platform::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mac_safari() {
        let p = Platform::from_user_agent(
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 Version/17.0 Safari/605.1.15",
        );
        assert!(p.mac);
        assert!(p.uses_meta());
    }

    #[test]
    fn test_iphone_is_not_mac_but_uses_meta() {
        let p = Platform::from_user_agent(
            "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15",
        );
        assert!(p.ios);
        assert!(!p.mac);
        assert!(p.uses_meta());
    }

    #[test]
    fn test_windows_and_android_use_ctrl() {
        let win = Platform::from_user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) Chrome/120.0");
        assert!(!win.uses_meta());
        let android = Platform::from_user_agent("Mozilla/5.0 (Linux; Android 14; Pixel 8) Chrome/120.0");
        assert!(android.android);
        assert!(!android.uses_meta());
    }
}
