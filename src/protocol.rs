//! TP-Link wire protocol framing.
//! A frame is a 4-byte big-endian plaintext length followed by the ciphered payload.

use crate::crypto::AutokeyCipher;
use crate::error::{Result, TpLinkError};
use byteorder::{BigEndian, ByteOrder, WriteBytesExt};

/// TCP port devices listen on.
pub const DEFAULT_PORT: u16 = 9999;
/// Length of the frame header.
pub const HEADER_LEN: usize = 4;
/// Header plus at least one payload byte.
pub const MIN_FRAME_LEN: usize = HEADER_LEN + 1;
/// Largest declared payload length accepted from a device.
pub const MAX_FRAME_LEN: u32 = 1024 * 1024;

/// Pack a plaintext payload into an encrypted frame.
///
/// The header always carries the plaintext length. Empty payloads are rejected.
pub fn pack_frame(plaintext: &[u8]) -> Result<Vec<u8>> {
    if plaintext.is_empty() {
        return Err(TpLinkError::EncodeFailed);
    }
    let len = u32::try_from(plaintext.len()).map_err(|_| TpLinkError::EncodeFailed)?;

    let mut frame = Vec::with_capacity(HEADER_LEN + plaintext.len());
    frame
        .write_u32::<BigEndian>(len)
        .map_err(|_| TpLinkError::EncodeFailed)?;

    let mut cipher = AutokeyCipher::new();
    frame.extend(plaintext.iter().map(|&b| cipher.encrypt_byte(b)));
    Ok(frame)
}

/// Read the declared plaintext length from a frame header.
pub fn parse_header(data: &[u8]) -> Result<u32> {
    if data.len() < HEADER_LEN {
        return Err(TpLinkError::DecodeFailed(format!(
            "Header too short ({} bytes)",
            data.len()
        )));
    }
    Ok(BigEndian::read_u32(&data[..HEADER_LEN]))
}

/// Unpack an encrypted frame into its plaintext payload.
///
/// Decryption stops at the declared length or at the end of the input; a
/// truncated frame yields the bytes that arrived.
pub fn unpack_frame(data: &[u8]) -> Result<Vec<u8>> {
    if data.len() < MIN_FRAME_LEN {
        return Err(TpLinkError::DecodeFailed(format!(
            "Frame too short ({} bytes)",
            data.len()
        )));
    }

    let declared = parse_header(data)? as usize;
    let mut cipher = AutokeyCipher::new();
    let plaintext: Vec<u8> = data[HEADER_LEN..]
        .iter()
        .take(declared)
        .map(|&b| cipher.decrypt_byte(b))
        .collect();

    if plaintext.is_empty() {
        return Err(TpLinkError::DecodeFailed("Empty payload".into()));
    }
    Ok(plaintext)
}
