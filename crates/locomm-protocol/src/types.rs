//! Common types used in the protocol.

use crate::constants::*;
use crate::error::FrameError;

// ============================================================================
// Message Types
// ============================================================================

/// The operation a frame carries, identified by its 4-byte ASCII tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// `CONN` - connection announcement from the host. No response is defined.
    Connect,
    /// `DCON` - disconnect request.
    Disconnect,
    /// `DCAK` - disconnect acknowledgement.
    DisconnectAck,
    /// `PASS` - password entry request.
    EnterPassword,
    /// `PWAK` - password acknowledgement.
    PasswordAck,
    /// `STPW` - password change request.
    SetPassword,
    /// `SPAK` - password change acknowledgement.
    SetPasswordAck,
    /// `RSPW` - password reset request (wipes pairing keys on the device).
    ResetPassword,
    /// `RPAK` - password reset acknowledgement.
    ResetPasswordAck,
    /// `SNOD` - store the host's display name on the device.
    StoreName,
    /// `SNAK` - store name acknowledgement.
    StoreNameAck,
    /// `SCAN` - scan for reachable devices.
    Scan,
    /// `SCAK` - scan acknowledgement carrying the device bitmap.
    ScanAck,
    /// `EPAR` - enter a pairing key.
    EnterPairingKey,
    /// `EPAK` - pairing key entry acknowledgement.
    EnterPairingKeyAck,
    /// `GPKY` - fetch the stored pairing key.
    GetPairingKey,
    /// `GPAK` - pairing key fetch acknowledgement.
    GetPairingKeyAck,
    /// `SEND` - one chunk of a chat message, in either direction.
    ChatMessage,
    /// `SACK` - chunk acknowledgement echoing the sequence number.
    ChatAck,
}

impl MessageType {
    /// All message types that are synchronous responses to a request.
    pub const RESPONSE_TYPES: [MessageType; 9] = [
        MessageType::DisconnectAck,
        MessageType::PasswordAck,
        MessageType::SetPasswordAck,
        MessageType::ResetPasswordAck,
        MessageType::StoreNameAck,
        MessageType::ScanAck,
        MessageType::EnterPairingKeyAck,
        MessageType::GetPairingKeyAck,
        MessageType::ChatAck,
    ];

    /// The 4-byte ASCII tag for this message type.
    pub fn tag(&self) -> [u8; 4] {
        match self {
            MessageType::Connect => *b"CONN",
            MessageType::Disconnect => *b"DCON",
            MessageType::DisconnectAck => *b"DCAK",
            MessageType::EnterPassword => *b"PASS",
            MessageType::PasswordAck => *b"PWAK",
            MessageType::SetPassword => *b"STPW",
            MessageType::SetPasswordAck => *b"SPAK",
            MessageType::ResetPassword => *b"RSPW",
            MessageType::ResetPasswordAck => *b"RPAK",
            MessageType::StoreName => *b"SNOD",
            MessageType::StoreNameAck => *b"SNAK",
            MessageType::Scan => *b"SCAN",
            MessageType::ScanAck => *b"SCAK",
            MessageType::EnterPairingKey => *b"EPAR",
            MessageType::EnterPairingKeyAck => *b"EPAK",
            MessageType::GetPairingKey => *b"GPKY",
            MessageType::GetPairingKeyAck => *b"GPAK",
            MessageType::ChatMessage => *b"SEND",
            MessageType::ChatAck => *b"SACK",
        }
    }

    /// Look up a message type from its wire tag. Returns `None` for tags the
    /// protocol does not define.
    pub fn from_tag(tag: &[u8; 4]) -> Option<Self> {
        match tag {
            b"CONN" => Some(MessageType::Connect),
            b"DCON" => Some(MessageType::Disconnect),
            b"DCAK" => Some(MessageType::DisconnectAck),
            b"PASS" => Some(MessageType::EnterPassword),
            b"PWAK" => Some(MessageType::PasswordAck),
            b"STPW" => Some(MessageType::SetPassword),
            b"SPAK" => Some(MessageType::SetPasswordAck),
            b"RSPW" => Some(MessageType::ResetPassword),
            b"RPAK" => Some(MessageType::ResetPasswordAck),
            b"SNOD" => Some(MessageType::StoreName),
            b"SNAK" => Some(MessageType::StoreNameAck),
            b"SCAN" => Some(MessageType::Scan),
            b"SCAK" => Some(MessageType::ScanAck),
            b"EPAR" => Some(MessageType::EnterPairingKey),
            b"EPAK" => Some(MessageType::EnterPairingKeyAck),
            b"GPKY" => Some(MessageType::GetPairingKey),
            b"GPAK" => Some(MessageType::GetPairingKeyAck),
            b"SEND" => Some(MessageType::ChatMessage),
            b"SACK" => Some(MessageType::ChatAck),
            _ => None,
        }
    }

    /// Whether this type is a synchronous response routed to a mailbox.
    pub fn is_response(&self) -> bool {
        Self::RESPONSE_TYPES.contains(self)
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = self.tag();
        for b in tag {
            write!(f, "{}", b as char)?;
        }
        Ok(())
    }
}

// ============================================================================
// Fixed-Width String Fields
// ============================================================================

/// A device display name, carried as a 32-byte null-padded field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceName(String);

impl DeviceName {
    /// Create a device name. Fails if the name exceeds the field width.
    pub fn new(name: &str) -> Result<Self, FrameError> {
        if name.len() > DEVICE_NAME_LEN {
            return Err(FrameError::FieldTooLong {
                field: "device name",
                max: DEVICE_NAME_LEN,
                actual: name.len(),
            });
        }
        Ok(DeviceName(name.to_string()))
    }

    /// Encode as a null-padded fixed-width field.
    pub fn encode(&self) -> [u8; DEVICE_NAME_LEN] {
        pad_field(self.0.as_bytes())
    }

    /// Decode a fixed-width field, trimming trailing nulls.
    pub fn decode(field: &[u8]) -> Result<Self, FrameError> {
        if field.len() != DEVICE_NAME_LEN {
            return Err(FrameError::PayloadTruncated {
                expected: DEVICE_NAME_LEN,
                actual: field.len(),
            });
        }
        let trimmed = trim_nulls(field);
        let name = std::str::from_utf8(trimmed).map_err(|_| FrameError::InvalidUtf8)?;
        Ok(DeviceName(name.to_string()))
    }

    /// The name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A device pairing key, carried as a 20-byte null-padded field.
///
/// Keys are drawn from a base85 alphabet; anything outside it is rejected
/// before a frame is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairingKey(String);

impl PairingKey {
    /// Create a pairing key, validating width and alphabet.
    pub fn new(key: &str) -> Result<Self, FrameError> {
        if key.len() > PAIRING_KEY_LEN {
            return Err(FrameError::FieldTooLong {
                field: "pairing key",
                max: PAIRING_KEY_LEN,
                actual: key.len(),
            });
        }
        for ch in key.chars() {
            if !PAIRING_KEY_ALPHABET.contains(ch) {
                return Err(FrameError::InvalidKeyChar { ch });
            }
        }
        Ok(PairingKey(key.to_string()))
    }

    /// Encode as a null-padded fixed-width field.
    pub fn encode(&self) -> [u8; PAIRING_KEY_LEN] {
        pad_field(self.0.as_bytes())
    }

    /// Decode a fixed-width field, trimming trailing nulls.
    pub fn decode(field: &[u8]) -> Result<Self, FrameError> {
        if field.len() != PAIRING_KEY_LEN {
            return Err(FrameError::PayloadTruncated {
                expected: PAIRING_KEY_LEN,
                actual: field.len(),
            });
        }
        let trimmed = trim_nulls(field);
        let key = std::str::from_utf8(trimmed).map_err(|_| FrameError::InvalidUtf8)?;
        Ok(PairingKey(key.to_string()))
    }

    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Null-pad `bytes` into a fixed-width field.
fn pad_field<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut field = [0u8; N];
    field[..bytes.len()].copy_from_slice(bytes);
    field
}

/// Strip trailing null padding from a fixed-width field.
fn trim_nulls(field: &[u8]) -> &[u8] {
    let end = field
        .iter()
        .rposition(|&b| b != 0)
        .map(|p| p + 1)
        .unwrap_or(0);
    &field[..end]
}

// ============================================================================
// Discovered Devices
// ============================================================================

/// One device discovered by a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredDevice {
    /// Synthetic label derived from the bitmap index. Real names are resolved
    /// by a separate name-lookup transaction.
    pub label: String,
    /// Position of the device's bit in the scan bitmap.
    pub index: usize,
}

// ============================================================================
// Message Chunks
// ============================================================================

/// One fragment of a chat message.
///
/// Large texts are split into chunks of at most [`MAX_CHUNK_TEXT`] bytes,
/// all sharing one frame tag. Every chunk repeats the sender name so a
/// receiver can attribute a transfer from any chunk that carries one.
///
/// Payload layout: `total (u16) | sequence (u16) | name_len (u8) |
/// text_len (u16) | name | text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageChunk {
    /// Number of chunks in the transfer.
    pub total: u16,
    /// Zero-based position of this chunk.
    pub seq: u16,
    /// Sender display name.
    pub sender: String,
    /// Text bytes of this chunk. Raw bytes, because a transfer may split a
    /// multi-byte character across chunks; the reassembled transfer is
    /// decoded as UTF-8 once complete.
    pub text: Vec<u8>,
}

impl MessageChunk {
    /// Split a text into an ordered chunk sequence.
    ///
    /// A zero-length text still produces one (empty) chunk so the transfer is
    /// observable on the wire. Fails if the sender name overflows its length
    /// field or the text needs more chunks than the total field can count.
    pub fn split(sender: &str, text: &str) -> Result<Vec<MessageChunk>, FrameError> {
        if sender.len() > MAX_SENDER_LEN {
            return Err(FrameError::FieldTooLong {
                field: "sender name",
                max: MAX_SENDER_LEN,
                actual: sender.len(),
            });
        }

        let bytes = text.as_bytes();
        let pieces: Vec<&[u8]> = if bytes.is_empty() {
            vec![bytes]
        } else {
            bytes.chunks(MAX_CHUNK_TEXT).collect()
        };

        if pieces.len() > u16::MAX as usize {
            return Err(FrameError::FieldTooLong {
                field: "chunk count",
                max: u16::MAX as usize,
                actual: pieces.len(),
            });
        }

        let total = pieces.len() as u16;
        Ok(pieces
            .into_iter()
            .enumerate()
            .map(|(i, piece)| MessageChunk {
                total,
                seq: i as u16,
                sender: sender.to_string(),
                text: piece.to_vec(),
            })
            .collect())
    }

    /// Encode the chunk payload.
    pub fn encode_payload(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(CHUNK_FIXED_LEN + self.sender.len() + self.text.len());
        buf.extend_from_slice(&self.total.to_be_bytes());
        buf.extend_from_slice(&self.seq.to_be_bytes());
        buf.push(self.sender.len() as u8);
        buf.extend_from_slice(&(self.text.len() as u16).to_be_bytes());
        buf.extend_from_slice(self.sender.as_bytes());
        buf.extend_from_slice(&self.text);
        buf
    }

    /// Decode a chunk payload.
    pub fn decode_payload(payload: &[u8]) -> Result<Self, FrameError> {
        if payload.len() < CHUNK_FIXED_LEN {
            return Err(FrameError::PayloadTruncated {
                expected: CHUNK_FIXED_LEN,
                actual: payload.len(),
            });
        }

        let total = u16::from_be_bytes([payload[0], payload[1]]);
        let seq = u16::from_be_bytes([payload[2], payload[3]]);
        let name_len = payload[4] as usize;
        let text_len = u16::from_be_bytes([payload[5], payload[6]]) as usize;

        let rest = &payload[CHUNK_FIXED_LEN..];
        if rest.len() != name_len + text_len {
            return Err(FrameError::LengthMismatch {
                field: "chunk",
                declared: name_len + text_len,
                remaining: rest.len(),
            });
        }

        let sender = std::str::from_utf8(&rest[..name_len])
            .map_err(|_| FrameError::InvalidUtf8)?
            .to_string();
        let text = rest[name_len..].to_vec();

        Ok(MessageChunk {
            total,
            seq,
            sender,
            text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_type_tag_round_trip() {
        for ty in [
            MessageType::Connect,
            MessageType::Disconnect,
            MessageType::EnterPassword,
            MessageType::ScanAck,
            MessageType::ChatMessage,
            MessageType::ChatAck,
        ] {
            assert_eq!(MessageType::from_tag(&ty.tag()), Some(ty));
        }
        assert_eq!(MessageType::from_tag(b"XXXX"), None);
    }

    #[test]
    fn test_response_classification() {
        assert!(MessageType::PasswordAck.is_response());
        assert!(MessageType::ChatAck.is_response());
        assert!(!MessageType::EnterPassword.is_response());
        assert!(!MessageType::ChatMessage.is_response());
    }

    #[test]
    fn test_device_name_padding() {
        let name = DeviceName::new("base-station").expect("valid name");
        let field = name.encode();
        assert_eq!(field.len(), DEVICE_NAME_LEN);
        assert_eq!(&field[..12], b"base-station");
        assert!(field[12..].iter().all(|&b| b == 0));

        let decoded = DeviceName::decode(&field).expect("decode");
        assert_eq!(decoded.as_str(), "base-station");
    }

    #[test]
    fn test_device_name_too_long() {
        let long = "x".repeat(DEVICE_NAME_LEN + 1);
        assert!(matches!(
            DeviceName::new(&long),
            Err(FrameError::FieldTooLong { .. })
        ));
    }

    #[test]
    fn test_pairing_key_alphabet() {
        assert!(PairingKey::new("a1B2-c3:d4").is_ok());
        assert!(matches!(
            PairingKey::new("bad key"),
            Err(FrameError::InvalidKeyChar { ch: ' ' })
        ));
        let long = "a".repeat(PAIRING_KEY_LEN + 1);
        assert!(matches!(
            PairingKey::new(&long),
            Err(FrameError::FieldTooLong { .. })
        ));
    }

    #[test]
    fn test_chunk_split_sizes() {
        let text = "a".repeat(2500);
        let chunks = MessageChunk::split("alice", &text).expect("split");
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].text.len(), 1000);
        assert_eq!(chunks[1].text.len(), 1000);
        assert_eq!(chunks[2].text.len(), 500);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.seq, i as u16);
            assert_eq!(chunk.total, 3);
            assert_eq!(chunk.sender, "alice");
        }
    }

    #[test]
    fn test_chunk_split_empty_text() {
        let chunks = MessageChunk::split("alice", "").expect("split");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].total, 1);
        assert_eq!(chunks[0].seq, 0);
        assert!(chunks[0].text.is_empty());
    }

    #[test]
    fn test_chunk_payload_round_trip() {
        let chunk = MessageChunk {
            total: 3,
            seq: 1,
            sender: "alice".to_string(),
            text: b"hello over lora".to_vec(),
        };
        let payload = chunk.encode_payload();
        let decoded = MessageChunk::decode_payload(&payload).expect("decode");
        assert_eq!(decoded, chunk);
    }

    #[test]
    fn test_chunk_payload_length_mismatch() {
        let chunk = MessageChunk {
            total: 1,
            seq: 0,
            sender: "bob".to_string(),
            text: b"hi".to_vec(),
        };
        let mut payload = chunk.encode_payload();
        payload.truncate(payload.len() - 1);
        assert!(matches!(
            MessageChunk::decode_payload(&payload),
            Err(FrameError::LengthMismatch { .. })
        ));
    }
}
