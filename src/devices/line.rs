//! Line classification by leading record marker.
//!
//! Every record line in the dump starts with a one-letter tag and a colon,
//! e.g. `T:`, `C:*`. Indentation carries no meaning.

/// Record type a line belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineKind {
    /// `T:` starts a new device.
    Topology,
    /// `B:` bus bandwidth.
    Bandwidth,
    /// `D:` device descriptor.
    Descriptor,
    /// `P:` vendor/product ids.
    ProductIds,
    /// `S:` string descriptor.
    Strings,
    /// `C:` starts a configuration.
    Config,
    /// `I:` starts an interface.
    Interface,
    /// `E:` starts an endpoint.
    Endpoint,
    /// Anything else; ignored.
    Unrecognized,
}

impl LineKind {
    fn from_marker(marker: char) -> Self {
        match marker {
            'T' => Self::Topology,
            'B' => Self::Bandwidth,
            'D' => Self::Descriptor,
            'P' => Self::ProductIds,
            'S' => Self::Strings,
            'C' => Self::Config,
            'I' => Self::Interface,
            'E' => Self::Endpoint,
            _ => Self::Unrecognized,
        }
    }

    /// Short name used in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Topology => "topology",
            Self::Bandwidth => "bandwidth",
            Self::Descriptor => "device descriptor",
            Self::ProductIds => "product ids",
            Self::Strings => "string",
            Self::Config => "configuration",
            Self::Interface => "interface",
            Self::Endpoint => "endpoint",
            Self::Unrecognized => "unrecognized",
        }
    }
}

/// A line split into its record type and payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifiedLine<'a> {
    pub kind: LineKind,
    /// `*` after the marker: active configuration or interface.
    pub active: bool,
    /// Text after the marker.
    pub payload: &'a str,
}

impl<'a> ClassifiedLine<'a> {
    fn unrecognized(line: &'a str) -> Self {
        Self {
            kind: LineKind::Unrecognized,
            active: false,
            payload: line,
        }
    }
}

/// Classify one line of the devices dump.
pub fn classify(line: &str) -> ClassifiedLine<'_> {
    let trimmed = line.trim_start();
    let mut chars = trimmed.chars();

    let (Some(marker), Some(':')) = (chars.next(), chars.next()) else {
        return ClassifiedLine::unrecognized(line);
    };
    if !marker.is_ascii_alphabetic() {
        return ClassifiedLine::unrecognized(line);
    }

    let rest = chars.as_str();
    let (active, payload) = match rest.strip_prefix('*') {
        Some(payload) => (true, payload),
        None => (false, rest),
    };

    ClassifiedLine {
        kind: LineKind::from_marker(marker),
        active,
        payload: payload.trim_end_matches(['\n', '\r']),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markers() {
        let cases = [
            ("T:  Bus=01", LineKind::Topology),
            ("B:  Alloc=  0/900 us ( 0%)", LineKind::Bandwidth),
            ("D:  Ver= 1.10", LineKind::Descriptor),
            ("P:  Vendor=0000", LineKind::ProductIds),
            ("S:  Product=UHCI Host Controller", LineKind::Strings),
            ("C:  #Ifs= 1", LineKind::Config),
            ("I:  If#= 0", LineKind::Interface),
            ("E:  Ad=81(I)", LineKind::Endpoint),
        ];
        for (line, kind) in cases {
            assert_eq!(classify(line).kind, kind, "{}", line);
        }
    }

    #[test]
    fn test_leading_whitespace_is_ignored() {
        let line = classify("      E:  Ad=81(I) Atr=03(Int.)\n");
        assert_eq!(line.kind, LineKind::Endpoint);
        assert_eq!(line.payload, "  Ad=81(I) Atr=03(Int.)");
    }

    #[test]
    fn test_active_marker() {
        let line = classify("C:* #Ifs= 1 Cfg#= 1 Atr=e0 MxPwr=100mA");
        assert_eq!(line.kind, LineKind::Config);
        assert!(line.active);
        assert_eq!(line.payload, " #Ifs= 1 Cfg#= 1 Atr=e0 MxPwr=100mA");

        assert!(!classify("I:  If#= 0").active);
    }

    #[test]
    fn test_unrecognized() {
        assert_eq!(classify("").kind, LineKind::Unrecognized);
        assert_eq!(classify("\n").kind, LineKind::Unrecognized);
        assert_eq!(classify("X:  Whatever=1").kind, LineKind::Unrecognized);
        assert_eq!(classify("T  Bus=01").kind, LineKind::Unrecognized);
        assert_eq!(classify("1:  Bus=01").kind, LineKind::Unrecognized);
    }
}
