//! Message types and control item codes.
//!
//! The message type lives in the top 3 bits of the header, so all eight
//! values are defined and conversion from the wire never fails.

use std::fmt;
use std::hash::{Hash, Hasher};

/// Frame type carried in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// Host asks the receiver to set a control item.
    SetControlItem,
    /// Receiver reports the current value of a control item.
    CurrentControlItem,
    /// Receiver reports the valid range of a control item.
    ControlItemRange,
    /// Receiver acknowledges a control item.
    Ack,
    DataItem0,
    DataItem1,
    DataItem2,
    DataItem3,
}

impl MessageType {
    /// All data-item types, indexed by stream number.
    pub const DATA_ITEMS: [MessageType; 4] = [
        MessageType::DataItem0,
        MessageType::DataItem1,
        MessageType::DataItem2,
        MessageType::DataItem3,
    ];

    /// Build from the 3-bit wire value. Higher bits are ignored.
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x07 {
            0 => MessageType::SetControlItem,
            1 => MessageType::CurrentControlItem,
            2 => MessageType::ControlItemRange,
            3 => MessageType::Ack,
            4 => MessageType::DataItem0,
            5 => MessageType::DataItem1,
            6 => MessageType::DataItem2,
            _ => MessageType::DataItem3,
        }
    }

    /// The 3-bit wire value.
    pub fn bits(self) -> u8 {
        match self {
            MessageType::SetControlItem => 0,
            MessageType::CurrentControlItem => 1,
            MessageType::ControlItemRange => 2,
            MessageType::Ack => 3,
            MessageType::DataItem0 => 4,
            MessageType::DataItem1 => 5,
            MessageType::DataItem2 => 6,
            MessageType::DataItem3 => 7,
        }
    }

    /// True for the four streaming types.
    pub fn is_data_item(self) -> bool {
        self.data_stream_index().is_some()
    }

    /// True for types that carry an item code after the header.
    pub fn is_control(self) -> bool {
        !self.is_data_item()
    }

    /// Stream number (0..=3) for data-item types.
    pub fn data_stream_index(self) -> Option<usize> {
        match self {
            MessageType::DataItem0 => Some(0),
            MessageType::DataItem1 => Some(1),
            MessageType::DataItem2 => Some(2),
            MessageType::DataItem3 => Some(3),
            _ => None,
        }
    }

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            MessageType::SetControlItem => "SetControlItem",
            MessageType::CurrentControlItem => "CurrentControlItem",
            MessageType::ControlItemRange => "ControlItemRange",
            MessageType::Ack => "Ack",
            MessageType::DataItem0 => "DataItem0",
            MessageType::DataItem1 => "DataItem1",
            MessageType::DataItem2 => "DataItem2",
            MessageType::DataItem3 => "DataItem3",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Device parameter addressed by a control-item frame.
///
/// Codes compare and hash by wire value, so `Unknown(0x0018)` equals
/// `ReceiverState`. [`from_u16`](Self::from_u16) always yields the named
/// variant.
#[derive(Debug, Clone, Copy)]
pub enum ControlItemCode {
    /// Reported for data-item frames, which carry no item code.
    None,
    ReceiverState,
    ReceiverFrequency,
    RFFilter,
    ADModes,
    IQOutputDataSampleRate,
    /// A code this crate does not name. Kept verbatim.
    Unknown(u16),
}

impl ControlItemCode {
    /// Named codes, in wire-value order.
    pub const KNOWN: [ControlItemCode; 5] = [
        ControlItemCode::ReceiverState,
        ControlItemCode::ReceiverFrequency,
        ControlItemCode::RFFilter,
        ControlItemCode::ADModes,
        ControlItemCode::IQOutputDataSampleRate,
    ];

    pub fn from_u16(value: u16) -> Self {
        match value {
            0x0000 => ControlItemCode::None,
            0x0018 => ControlItemCode::ReceiverState,
            0x0020 => ControlItemCode::ReceiverFrequency,
            0x0044 => ControlItemCode::RFFilter,
            0x008A => ControlItemCode::ADModes,
            0x00B8 => ControlItemCode::IQOutputDataSampleRate,
            other => ControlItemCode::Unknown(other),
        }
    }

    pub fn to_u16(self) -> u16 {
        match self {
            ControlItemCode::None => 0x0000,
            ControlItemCode::ReceiverState => 0x0018,
            ControlItemCode::ReceiverFrequency => 0x0020,
            ControlItemCode::RFFilter => 0x0044,
            ControlItemCode::ADModes => 0x008A,
            ControlItemCode::IQOutputDataSampleRate => 0x00B8,
            ControlItemCode::Unknown(value) => value,
        }
    }

    /// The named variant for this wire value, if there is one.
    pub fn canonical(self) -> Self {
        Self::from_u16(self.to_u16())
    }

    /// Human-readable name. Unknown codes render as `Unknown`.
    pub fn name(self) -> &'static str {
        match self.canonical() {
            ControlItemCode::None => "None",
            ControlItemCode::ReceiverState => "ReceiverState",
            ControlItemCode::ReceiverFrequency => "ReceiverFrequency",
            ControlItemCode::RFFilter => "RFFilter",
            ControlItemCode::ADModes => "ADModes",
            ControlItemCode::IQOutputDataSampleRate => "IQOutputDataSampleRate",
            ControlItemCode::Unknown(_) => "Unknown",
        }
    }

    /// Look up a named code, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::KNOWN
            .into_iter()
            .chain(std::iter::once(ControlItemCode::None))
            .find(|code| code.name().eq_ignore_ascii_case(name))
    }
}

impl PartialEq for ControlItemCode {
    fn eq(&self, other: &Self) -> bool {
        self.to_u16() == other.to_u16()
    }
}

impl Eq for ControlItemCode {}

impl Hash for ControlItemCode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.to_u16().hash(state);
    }
}

impl fmt::Display for ControlItemCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.canonical() {
            ControlItemCode::Unknown(value) => write!(f, "Unknown(0x{value:04X})"),
            known => f.write_str(known.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_type_bits_cover_all_values() {
        for bits in 0u8..8 {
            assert_eq!(MessageType::from_bits(bits).bits(), bits);
        }
    }

    #[test]
    fn from_bits_ignores_high_bits() {
        assert_eq!(MessageType::from_bits(0b1111_1011), MessageType::Ack);
    }

    #[test]
    fn data_items_are_indexed_by_stream() {
        for (index, msg_type) in MessageType::DATA_ITEMS.iter().enumerate() {
            assert!(msg_type.is_data_item());
            assert_eq!(msg_type.data_stream_index(), Some(index));
        }
        assert!(MessageType::Ack.is_control());
        assert!(MessageType::ControlItemRange.is_control());
        assert_eq!(MessageType::SetControlItem.data_stream_index(), None);
    }

    #[test]
    fn known_item_codes_keep_wire_values() {
        assert_eq!(ControlItemCode::ReceiverState.to_u16(), 0x0018);
        assert_eq!(ControlItemCode::RFFilter.to_u16(), 0x0044);
        for code in ControlItemCode::KNOWN {
            assert_eq!(ControlItemCode::from_u16(code.to_u16()), code);
        }
    }

    #[test]
    fn unknown_item_code_is_preserved() {
        let code = ControlItemCode::from_u16(0x1234);
        assert_eq!(code, ControlItemCode::Unknown(0x1234));
        assert_eq!(code.to_u16(), 0x1234);
        assert_eq!(code.to_string(), "Unknown(0x1234)");
    }

    #[test]
    fn unknown_holding_a_named_value_is_that_code() {
        use std::collections::HashSet;

        let alias = ControlItemCode::Unknown(0x0018);
        assert_eq!(alias, ControlItemCode::ReceiverState);
        assert_eq!(alias.canonical(), ControlItemCode::ReceiverState);
        assert!(matches!(alias.canonical(), ControlItemCode::ReceiverState));
        assert_eq!(alias.name(), "ReceiverState");
        assert_eq!(alias.to_string(), "ReceiverState");
        assert_eq!(ControlItemCode::Unknown(0), ControlItemCode::None);
        assert_ne!(ControlItemCode::Unknown(0x0019), ControlItemCode::ReceiverState);

        let codes: HashSet<_> = [alias, ControlItemCode::ReceiverState].into_iter().collect();
        assert_eq!(codes.len(), 1);
    }

    #[test]
    fn item_code_lookup_by_name() {
        assert_eq!(
            ControlItemCode::from_name("receiverstate"),
            Some(ControlItemCode::ReceiverState)
        );
        assert_eq!(ControlItemCode::from_name("bogus"), None);
    }
}
