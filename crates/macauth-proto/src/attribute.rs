use crate::packet::PacketError;
use std::io::{Cursor, Read, Write};

/// RADIUS attribute types used by this server
///
/// Tunnel attributes (64/65/81) come from RFC 2868 and carry the VLAN
/// assignment on Access-Accept; the rest are RFC 2865 request
/// attributes a MAC-auth NAS commonly sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AttributeType {
    /// User-Name (1) - the device MAC address for MAC-auth
    UserName = 1,
    /// NAS-IP-Address (4)
    NasIpAddress = 4,
    /// Reply-Message (18)
    ReplyMessage = 18,
    /// Called-Station-Id (30)
    CalledStationId = 30,
    /// Calling-Station-Id (31)
    CallingStationId = 31,
    /// NAS-Identifier (32)
    NasIdentifier = 32,
    /// Proxy-State (33) - echoed back unmodified
    ProxyState = 33,
    /// Tunnel-Type (64) - RFC 2868
    TunnelType = 64,
    /// Tunnel-Medium-Type (65) - RFC 2868
    TunnelMediumType = 65,
    /// Tunnel-Private-Group-Id (81) - RFC 2868
    TunnelPrivateGroupId = 81,
}

impl AttributeType {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Tunnel-Type value for VLAN (RFC 3580 Section 3.31)
pub const TUNNEL_TYPE_VLAN: u32 = 13;
/// Tunnel-Medium-Type value for IEEE-802 (RFC 3580 Section 3.31)
pub const TUNNEL_MEDIUM_IEEE_802: u32 = 6;

/// RADIUS Attribute structure as defined in RFC 2865 Section 5
///
/// ```text
///  0                   1                   2
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |     Type      |    Length     |  Value ...
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Attribute type (1 byte)
    pub attr_type: u8,
    /// Attribute value (0-253 bytes)
    pub value: Vec<u8>,
}

impl Attribute {
    /// Minimum attribute length (type + length fields = 2 bytes)
    pub const MIN_LENGTH: usize = 2;
    /// Maximum attribute length (255 bytes including type and length)
    pub const MAX_LENGTH: usize = 255;
    /// Maximum value length (253 bytes)
    pub const MAX_VALUE_LENGTH: usize = 253;

    pub fn new(attr_type: u8, value: Vec<u8>) -> Result<Self, PacketError> {
        if value.len() > Self::MAX_VALUE_LENGTH {
            return Err(PacketError::AttributeError(format!(
                "Attribute value too long: {} bytes (max {})",
                value.len(),
                Self::MAX_VALUE_LENGTH
            )));
        }
        Ok(Attribute { attr_type, value })
    }

    /// Create a string attribute
    pub fn string(attr_type: u8, value: impl Into<String>) -> Result<Self, PacketError> {
        Self::new(attr_type, value.into().into_bytes())
    }

    /// Create an integer attribute (32-bit big-endian)
    pub fn integer(attr_type: u8, value: u32) -> Result<Self, PacketError> {
        Self::new(attr_type, value.to_be_bytes().to_vec())
    }

    /// Create a tagged integer attribute (RFC 2868 Section 3.1)
    ///
    /// One tag octet followed by the low 3 bytes of the value. Tag 0
    /// means the attribute is not grouped with other tunnel attributes.
    pub fn tagged_integer(attr_type: u8, tag: u8, value: u32) -> Result<Self, PacketError> {
        if tag > 0x1f {
            return Err(PacketError::AttributeError(format!(
                "Invalid tunnel tag: {tag:#04x}"
            )));
        }
        let be = value.to_be_bytes();
        Self::new(attr_type, vec![tag, be[1], be[2], be[3]])
    }

    /// Encode attribute to bytes
    pub fn encode(&self) -> Result<Vec<u8>, PacketError> {
        let length = self.encoded_length();
        if length > Self::MAX_LENGTH {
            return Err(PacketError::AttributeError(format!(
                "Encoded attribute too long: {} bytes",
                length
            )));
        }

        let mut buffer = Vec::with_capacity(length);
        buffer.write_all(&[self.attr_type])?;
        buffer.write_all(&[length as u8])?;
        buffer.write_all(&self.value)?;

        Ok(buffer)
    }

    /// Decode attribute from bytes
    pub fn decode(data: &[u8]) -> Result<Self, PacketError> {
        if data.len() < Self::MIN_LENGTH {
            return Err(PacketError::AttributeError(format!(
                "Attribute data too short: {} bytes",
                data.len()
            )));
        }

        let mut cursor = Cursor::new(data);

        let mut type_buf = [0u8; 1];
        cursor.read_exact(&mut type_buf)?;
        let attr_type = type_buf[0];

        let mut len_buf = [0u8; 1];
        cursor.read_exact(&mut len_buf)?;
        let length = len_buf[0] as usize;

        if !(Self::MIN_LENGTH..=Self::MAX_LENGTH).contains(&length) {
            return Err(PacketError::AttributeError(format!(
                "Invalid attribute length: {}",
                length
            )));
        }

        if data.len() < length {
            return Err(PacketError::AttributeError(format!(
                "Insufficient data for attribute: expected {}, got {}",
                length,
                data.len()
            )));
        }

        let value_length = length - Self::MIN_LENGTH;
        let mut value = vec![0u8; value_length];
        cursor.read_exact(&mut value)?;

        Ok(Attribute { attr_type, value })
    }

    /// Get the encoded length of this attribute
    pub fn encoded_length(&self) -> usize {
        Self::MIN_LENGTH + self.value.len()
    }

    /// Try to interpret value as a string
    pub fn as_string(&self) -> Result<String, std::string::FromUtf8Error> {
        String::from_utf8(self.value.clone())
    }

    /// Try to interpret value as an integer (32-bit big-endian)
    pub fn as_integer(&self) -> Result<u32, PacketError> {
        if self.value.len() != 4 {
            return Err(PacketError::AttributeError(format!(
                "Expected 4 bytes for integer, got {}",
                self.value.len()
            )));
        }
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.value);
        Ok(u32::from_be_bytes(bytes))
    }

    /// Try to interpret value as a tagged integer (RFC 2868)
    ///
    /// Returns `(tag, value)`.
    pub fn as_tagged_integer(&self) -> Result<(u8, u32), PacketError> {
        if self.value.len() != 4 {
            return Err(PacketError::AttributeError(format!(
                "Expected 4 bytes for tagged integer, got {}",
                self.value.len()
            )));
        }
        let value = u32::from_be_bytes([0, self.value[1], self.value[2], self.value[3]]);
        Ok((self.value[0], value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_attribute() {
        let attr = Attribute::string(AttributeType::UserName.as_u8(), "AABBCCDDEEFF").unwrap();
        assert_eq!(attr.attr_type, 1);
        assert_eq!(attr.as_string().unwrap(), "AABBCCDDEEFF");
    }

    #[test]
    fn test_integer_attribute() {
        let attr = Attribute::integer(6, 1234).unwrap();
        assert_eq!(attr.as_integer().unwrap(), 1234);
    }

    #[test]
    fn test_tagged_integer_attribute() {
        let attr =
            Attribute::tagged_integer(AttributeType::TunnelType.as_u8(), 0, TUNNEL_TYPE_VLAN)
                .unwrap();
        assert_eq!(attr.value.len(), 4);
        assert_eq!(attr.value[0], 0);
        assert_eq!(attr.as_tagged_integer().unwrap(), (0, 13));
    }

    #[test]
    fn test_tagged_integer_rejects_out_of_range_tag() {
        assert!(Attribute::tagged_integer(64, 0x20, 13).is_err());
    }

    #[test]
    fn test_attribute_encode_decode() {
        let attr = Attribute::string(81, "505").unwrap();
        let encoded = attr.encode().unwrap();
        let decoded = Attribute::decode(&encoded).unwrap();
        assert_eq!(attr, decoded);
    }

    #[test]
    fn test_max_value_length() {
        let value = vec![0u8; 254];
        assert!(Attribute::new(1, value).is_err());
    }

    #[test]
    fn test_decode_truncated() {
        // Length field claims 10 bytes but only 4 are present
        assert!(Attribute::decode(&[1, 10, 0x41, 0x41]).is_err());
    }
}
