//! USB endpoint model.

use std::fmt;

/// USB transfer types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferType {
    Control,
    Bulk,
    Interrupt,
    Isochronous,
}

impl TransferType {
    /// Parse the abbreviation printed after the `Atr=` value, e.g. `Int.`.
    pub fn from_dump(s: &str) -> Option<Self> {
        match s.trim() {
            "Ctrl" | "Control" => Some(Self::Control),
            "Bulk" => Some(Self::Bulk),
            "Int." | "Int" | "Interrupt" => Some(Self::Interrupt),
            "Isoc" | "Isochronous" => Some(Self::Isochronous),
            _ => None,
        }
    }

    /// Transfer type from bits 1:0 of bmAttributes.
    pub fn from_attributes(attributes: u8) -> Self {
        match attributes & 0x03 {
            0 => Self::Control,
            1 => Self::Isochronous,
            2 => Self::Bulk,
            _ => Self::Interrupt,
        }
    }
}

impl fmt::Display for TransferType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Control => "Control",
            Self::Bulk => "Bulk",
            Self::Interrupt => "Interrupt",
            Self::Isochronous => "Isochronous",
        };
        write!(f, "{}", name)
    }
}

/// Endpoint direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    /// Parse the `(I)`/`(O)` marker following the `Ad=` value.
    pub fn from_dump(s: &str) -> Option<Self> {
        match s.trim() {
            "I" => Some(Self::In),
            "O" => Some(Self::Out),
            _ => None,
        }
    }

    /// Direction from bit 7 of bEndpointAddress.
    pub fn from_address(address: u8) -> Self {
        if address & 0x80 != 0 {
            Self::In
        } else {
            Self::Out
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::In => write!(f, "IN"),
            Self::Out => write!(f, "OUT"),
        }
    }
}

/// A USB endpoint descriptor (`E:` line).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Endpoint address (e.g., 0x81 = IN endpoint 1, 0x02 = OUT endpoint 2).
    pub address: u8,
    pub direction: Direction,
    /// Raw bmAttributes.
    pub attribute: u8,
    pub transfer_type: TransferType,
    /// Maximum packet size in bytes.
    pub max_packet_size: Option<u16>,
    /// Polling interval as printed, e.g. "255ms" or "125us".
    pub interval: Option<String>,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EP{:02X} {} {}",
            self.address, self.transfer_type, self.direction
        )?;
        if let Some(size) = self.max_packet_size {
            write!(f, " {}B", size)?;
        }
        if let Some(interval) = &self.interval {
            write!(f, " @ {}", interval)?;
        }
        Ok(())
    }
}
