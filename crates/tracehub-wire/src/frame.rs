//! Message framing: a 4-byte big-endian length prefix followed by that many
//! payload bytes. The prefix counts the payload only, not itself.
//!
//! The stream-reading side lives with the connection handler; these helpers
//! are pure so the codec can be tested without a socket.

use crate::WireError;

/// Size of the length prefix preceding every payload.
pub const FRAME_HEADER_BYTES: usize = 4;

/// Default upper bound on a single payload. Guards the decoder against
/// hostile or corrupt length prefixes before any allocation happens.
pub const DEFAULT_MAX_FRAME_BYTES: usize = 1024 * 1024;

/// Frame a payload for transmission.
pub fn encode_frame(payload: &[u8], limit: usize) -> Result<Vec<u8>, WireError> {
    if payload.len() > limit {
        return Err(WireError::FrameTooLarge {
            got: payload.len(),
            limit,
        });
    }
    let mut framed = Vec::with_capacity(FRAME_HEADER_BYTES + payload.len());
    framed.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    framed.extend_from_slice(payload);
    Ok(framed)
}

/// Validate a length prefix and return the payload length it announces.
pub fn decode_frame_len(header: [u8; FRAME_HEADER_BYTES], limit: usize) -> Result<usize, WireError> {
    let len = u32::from_be_bytes(header) as usize;
    if len > limit {
        return Err(WireError::FrameTooLarge { got: len, limit });
    }
    Ok(len)
}
