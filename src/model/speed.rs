//! USB signaling rates as reported by the `Spd=` topology field.

use std::fmt;

/// USB speed variants known to the devices dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UsbSpeed {
    /// USB 1.0 Low Speed - 1.5 Mbps
    Low,
    /// USB 1.1 Full Speed - 12 Mbps
    Full,
    /// USB 2.0 High Speed - 480 Mbps
    High,
    /// Anything else, including a missing `Spd=` field.
    #[default]
    Unknown,
}

impl UsbSpeed {
    /// Map a rate in Mbps to a speed.
    pub fn from_mbps(mbps: u32) -> Self {
        match mbps {
            1 => Self::Low,
            12 => Self::Full,
            480 => Self::High,
            _ => Self::Unknown,
        }
    }

    /// Parse the raw `Spd=` value. Low speed is printed as "1.5"; every
    /// other rate is a whole number.
    pub fn from_field(raw: &str) -> Option<Self> {
        match raw.trim() {
            "1.5" => Some(Self::Low),
            other => other.parse::<u32>().ok().map(Self::from_mbps),
        }
    }

    /// Label used in device descriptions.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "1.5Mb/s (low)",
            Self::Full => "12Mb/s (full)",
            Self::High => "480Mb/s (high)",
            Self::Unknown => "unknown",
        }
    }

    /// Short display name for TUI.
    pub fn short_name(&self) -> &'static str {
        match self {
            Self::Low => "1.5M",
            Self::Full => "12M",
            Self::High => "480M",
            Self::Unknown => "?",
        }
    }
}

impl fmt::Display for UsbSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_mbps() {
        assert_eq!(UsbSpeed::from_mbps(1).label(), "1.5Mb/s (low)");
        assert_eq!(UsbSpeed::from_mbps(12).label(), "12Mb/s (full)");
        assert_eq!(UsbSpeed::from_mbps(480).label(), "480Mb/s (high)");
        assert_eq!(UsbSpeed::from_mbps(5000).label(), "unknown");
        assert_eq!(UsbSpeed::from_mbps(0), UsbSpeed::Unknown);
    }

    #[test]
    fn test_from_field() {
        assert_eq!(UsbSpeed::from_field("1.5"), Some(UsbSpeed::Low));
        assert_eq!(UsbSpeed::from_field("12 "), Some(UsbSpeed::Full));
        assert_eq!(UsbSpeed::from_field("480"), Some(UsbSpeed::High));
        assert_eq!(UsbSpeed::from_field("fast"), None);
        assert_eq!(UsbSpeed::from_field("1.9"), None);
        assert_eq!(UsbSpeed::from_field("12.5"), None);
        assert_eq!(UsbSpeed::from_field("5000"), Some(UsbSpeed::Unknown));
    }
}
