//! Requests that can be sent to the device.

use crate::frame::Frame;
use crate::types::{DeviceName, MessageChunk, MessageType, PairingKey};

/// Requests that start a request/response transaction.
///
/// The connection announcement (`CONN`) is not represented here because the
/// device defines no response for it; hosts emit it directly as a bare frame.
#[derive(Debug, Clone)]
pub enum Request {
    /// Ask the device to release the session.
    Disconnect,

    /// Present the device password.
    EnterPassword {
        /// Password to present.
        password: String,
    },

    /// Change the device password.
    SetPassword {
        /// Current password.
        old: String,
        /// Replacement password.
        new: String,
    },

    /// Reset the device password. The device wipes its stored pairing keys.
    ResetPassword {
        /// Password to reset to.
        password: String,
    },

    /// Store the host's display name on the device.
    StoreName {
        /// Name to store.
        name: DeviceName,
    },

    /// Scan for reachable devices.
    Scan,

    /// Enter a pairing key obtained from another device.
    EnterPairingKey {
        /// Key to enter.
        key: PairingKey,
    },

    /// Fetch the pairing key stored on the device.
    GetPairingKey,

    /// Transmit one chunk of a chat message.
    MessageChunk(MessageChunk),
}

impl Request {
    /// The message type this request is sent as.
    pub fn message_type(&self) -> MessageType {
        match self {
            Request::Disconnect => MessageType::Disconnect,
            Request::EnterPassword { .. } => MessageType::EnterPassword,
            Request::SetPassword { .. } => MessageType::SetPassword,
            Request::ResetPassword { .. } => MessageType::ResetPassword,
            Request::StoreName { .. } => MessageType::StoreName,
            Request::Scan => MessageType::Scan,
            Request::EnterPairingKey { .. } => MessageType::EnterPairingKey,
            Request::GetPairingKey => MessageType::GetPairingKey,
            Request::MessageChunk(_) => MessageType::ChatMessage,
        }
    }

    /// The message type the device answers this request with.
    pub fn response_type(&self) -> MessageType {
        match self {
            Request::Disconnect => MessageType::DisconnectAck,
            Request::EnterPassword { .. } => MessageType::PasswordAck,
            Request::SetPassword { .. } => MessageType::SetPasswordAck,
            Request::ResetPassword { .. } => MessageType::ResetPasswordAck,
            Request::StoreName { .. } => MessageType::StoreNameAck,
            Request::Scan => MessageType::ScanAck,
            Request::EnterPairingKey { .. } => MessageType::EnterPairingKeyAck,
            Request::GetPairingKey => MessageType::GetPairingKeyAck,
            Request::MessageChunk(_) => MessageType::ChatAck,
        }
    }

    /// Encode the request payload.
    pub fn encode_payload(&self) -> Vec<u8> {
        match self {
            Request::Disconnect | Request::Scan | Request::GetPairingKey => Vec::new(),

            Request::EnterPassword { password } | Request::ResetPassword { password } => {
                password.as_bytes().to_vec()
            }

            Request::SetPassword { old, new } => {
                let mut buf = Vec::with_capacity(2 + old.len() + new.len());
                buf.push(old.len() as u8);
                buf.push(new.len() as u8);
                buf.extend_from_slice(old.as_bytes());
                buf.extend_from_slice(new.as_bytes());
                buf
            }

            Request::StoreName { name } => name.encode().to_vec(),

            Request::EnterPairingKey { key } => key.encode().to_vec(),

            Request::MessageChunk(chunk) => chunk.encode_payload(),
        }
    }

    /// Build the complete frame for this request under the given tag.
    pub fn encode(&self, tag: u32) -> Vec<u8> {
        Frame::new(self.message_type(), tag, self.encode_payload()).encode()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{DEVICE_NAME_LEN, FRAME_OVERHEAD, PAIRING_KEY_LEN};

    #[test]
    fn test_password_payload() {
        let req = Request::EnterPassword {
            password: "hunter2".to_string(),
        };
        assert_eq!(req.encode_payload(), b"hunter2");
        assert_eq!(req.message_type(), MessageType::EnterPassword);
        assert_eq!(req.response_type(), MessageType::PasswordAck);
    }

    #[test]
    fn test_set_password_payload_layout() {
        let req = Request::SetPassword {
            old: "old".to_string(),
            new: "newer".to_string(),
        };
        let payload = req.encode_payload();
        assert_eq!(payload[0], 3);
        assert_eq!(payload[1], 5);
        assert_eq!(&payload[2..5], b"old");
        assert_eq!(&payload[5..10], b"newer");
    }

    #[test]
    fn test_store_name_frame_size() {
        let req = Request::StoreName {
            name: DeviceName::new("node-7").expect("valid name"),
        };
        let frame = req.encode(1);
        assert_eq!(frame.len(), FRAME_OVERHEAD + DEVICE_NAME_LEN);
    }

    #[test]
    fn test_enter_pairing_key_frame_size() {
        let req = Request::EnterPairingKey {
            key: PairingKey::new("a1B2c3").expect("valid key"),
        };
        let frame = req.encode(1);
        assert_eq!(frame.len(), FRAME_OVERHEAD + PAIRING_KEY_LEN);
    }

    #[test]
    fn test_empty_payload_requests() {
        for req in [Request::Disconnect, Request::Scan, Request::GetPairingKey] {
            assert!(req.encode_payload().is_empty());
            assert_eq!(req.encode(9).len(), FRAME_OVERHEAD);
        }
    }
}
