//! Build target codes stored in serialized files

use std::fmt;
use std::str::FromStr;

/// Well-known build targets: code, display name, accepted aliases
const KNOWN_TARGETS: &[(u32, &str, &[&str])] = &[
    (2, "StandaloneOSX", &["osx", "mac", "macos"]),
    (5, "StandaloneWindows", &["pc", "windows", "win"]),
    (9, "iOS", &["ios", "iphone"]),
    (13, "Android", &["android"]),
    (17, "StandaloneLinux", &[]),
    (19, "StandaloneWindows64", &["win64", "windows64"]),
    (20, "WebGL", &["webgl", "web", "browser"]),
    (21, "WSAPlayer", &["uwp", "wsa"]),
    (24, "StandaloneLinux64", &["linux", "linux64"]),
    (31, "PS4", &["ps4"]),
    (33, "XboxOne", &["xboxone"]),
    (37, "tvOS", &["tvos"]),
    (38, "Switch", &["switch"]),
    (44, "PS5", &["ps5"]),
];

/// A build target code.
///
/// Any integer is accepted; names exist only for the codes in the table
/// above.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BuildTarget(pub u32);

impl BuildTarget {
    /// Desktop Windows
    pub const STANDALONE_WINDOWS: Self = Self(5);
    /// Android
    pub const ANDROID: Self = Self(13);
    /// WebGL
    pub const WEBGL: Self = Self(20);

    /// Raw code
    pub fn code(self) -> u32 {
        self.0
    }

    /// Display name for known codes
    pub fn name(self) -> Option<&'static str> {
        KNOWN_TARGETS
            .iter()
            .find(|(code, _, _)| *code == self.0)
            .map(|(_, name, _)| *name)
    }

    /// Resolve a name or alias (case-insensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        KNOWN_TARGETS
            .iter()
            .find(|(_, display, aliases)| {
                display.eq_ignore_ascii_case(&lower) || aliases.contains(&lower.as_str())
            })
            .map(|(code, _, _)| Self(*code))
    }
}

impl From<u32> for BuildTarget {
    fn from(code: u32) -> Self {
        Self(code)
    }
}

impl FromStr for BuildTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(code) = s.parse::<u32>() {
            return Ok(Self(code));
        }
        Self::from_name(s).ok_or_else(|| {
            format!("unknown platform '{s}' (use a numeric code, e.g. 5, 13 or 20)")
        })
    }
}

impl fmt::Display for BuildTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name} ({})", self.0),
            None => write!(f, "{}", self.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_codes_and_names() {
        assert_eq!("5".parse::<BuildTarget>().unwrap(), BuildTarget::STANDALONE_WINDOWS);
        assert_eq!("android".parse::<BuildTarget>().unwrap(), BuildTarget::ANDROID);
        assert_eq!("WebGL".parse::<BuildTarget>().unwrap(), BuildTarget::WEBGL);
        assert_eq!("pc".parse::<BuildTarget>().unwrap().code(), 5);
        assert!("gamecube".parse::<BuildTarget>().is_err());
        assert!("-1".parse::<BuildTarget>().is_err());
    }

    #[test]
    fn test_unknown_codes_are_valid() {
        let target: BuildTarget = "999".parse().unwrap();
        assert_eq!(target.name(), None);
        assert_eq!(target.to_string(), "999");
    }

    #[test]
    fn test_display() {
        assert_eq!(BuildTarget::ANDROID.to_string(), "Android (13)");
    }
}
