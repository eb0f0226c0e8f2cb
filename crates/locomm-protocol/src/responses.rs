//! Responses and unsolicited messages received from the device.

use crate::constants::*;
use crate::error::FrameError;
use crate::frame::Frame;
use crate::types::{DiscoveredDevice, MessageChunk, MessageType, PairingKey};

/// Decoded contents of an inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Disconnect acknowledged.
    DisconnectAck,

    /// Password accepted.
    PasswordAck,

    /// Password change accepted.
    SetPasswordAck,

    /// Password reset accepted.
    ResetPasswordAck,

    /// Display name stored.
    StoreNameAck,

    /// Scan finished; carries the devices decoded from the bitmap.
    ScanAck {
        /// Devices discovered, in bitmap order.
        devices: Vec<DiscoveredDevice>,
    },

    /// Pairing key accepted.
    EnterPairingKeyAck,

    /// Stored pairing key, or `None` when the device holds no key.
    PairingKey {
        /// The key, if one is stored.
        key: Option<PairingKey>,
    },

    /// Chat chunk acknowledged.
    MessageAck {
        /// Sequence number the device acknowledges.
        seq: u16,
    },

    /// An unsolicited chat chunk from a peer.
    Message(MessageChunk),
}

impl Response {
    /// Decode the payload of a structurally valid frame according to its
    /// message type.
    pub fn decode(frame: &Frame) -> Result<Self, FrameError> {
        match frame.message_type {
            MessageType::DisconnectAck => {
                expect_okay(&frame.payload)?;
                Ok(Response::DisconnectAck)
            }
            MessageType::PasswordAck => {
                expect_okay(&frame.payload)?;
                Ok(Response::PasswordAck)
            }
            MessageType::SetPasswordAck => {
                expect_okay(&frame.payload)?;
                Ok(Response::SetPasswordAck)
            }
            MessageType::ResetPasswordAck => {
                expect_okay(&frame.payload)?;
                Ok(Response::ResetPasswordAck)
            }

            MessageType::StoreNameAck => {
                expect_empty(&frame.payload)?;
                Ok(Response::StoreNameAck)
            }
            MessageType::EnterPairingKeyAck => {
                expect_empty(&frame.payload)?;
                Ok(Response::EnterPairingKeyAck)
            }

            MessageType::ScanAck => Ok(Response::ScanAck {
                devices: decode_device_bitmap(&frame.payload)?,
            }),

            MessageType::GetPairingKeyAck => Ok(Response::PairingKey {
                key: decode_pairing_key(&frame.payload)?,
            }),

            MessageType::ChatAck => {
                if frame.payload.len() != 2 {
                    return Err(FrameError::PayloadTruncated {
                        expected: 2,
                        actual: frame.payload.len(),
                    });
                }
                let seq = u16::from_be_bytes([frame.payload[0], frame.payload[1]]);
                Ok(Response::MessageAck { seq })
            }

            MessageType::ChatMessage => Ok(Response::Message(MessageChunk::decode_payload(
                &frame.payload,
            )?)),

            other => Err(FrameError::UnknownMessageType(other.tag())),
        }
    }
}

/// Check the `OKAY` literal carried by fixed-content acknowledgements.
fn expect_okay(payload: &[u8]) -> Result<(), FrameError> {
    if payload != ACK_OKAY {
        return Err(FrameError::BadAck);
    }
    Ok(())
}

/// Check that an acknowledgement with no defined payload is empty.
fn expect_empty(payload: &[u8]) -> Result<(), FrameError> {
    if !payload.is_empty() {
        return Err(FrameError::PayloadTruncated {
            expected: 0,
            actual: payload.len(),
        });
    }
    Ok(())
}

/// Decode the fixed-width device bitmap from a scan acknowledgement.
///
/// Bytes are scanned in order and bits within each byte from most to least
/// significant, so device indices come out ordered. Labels are synthetic;
/// real names come from a separate name-lookup transaction.
pub fn decode_device_bitmap(payload: &[u8]) -> Result<Vec<DiscoveredDevice>, FrameError> {
    if payload.len() != SCAN_BITMAP_LEN {
        return Err(FrameError::PayloadTruncated {
            expected: SCAN_BITMAP_LEN,
            actual: payload.len(),
        });
    }

    let mut devices = Vec::new();
    for (byte_index, byte) in payload.iter().enumerate() {
        for bit_index in 0..8 {
            if (byte >> (7 - bit_index)) & 1 == 1 {
                let index = byte_index * 8 + bit_index;
                devices.push(DiscoveredDevice {
                    label: format!("Device{index}"),
                    index,
                });
            }
        }
    }
    Ok(devices)
}

/// Decode a `GPAK` payload: a presence flag followed by the key field.
pub fn decode_pairing_key(payload: &[u8]) -> Result<Option<PairingKey>, FrameError> {
    let expected = KEY_PRESENT_LEN + PAIRING_KEY_LEN;
    if payload.len() != expected {
        return Err(FrameError::PayloadTruncated {
            expected,
            actual: payload.len(),
        });
    }
    if payload[0] == 0 {
        return Ok(None);
    }
    PairingKey::decode(&payload[KEY_PRESENT_LEN..]).map(Some)
}
