use anyhow::{Context, Result, bail};
use bincode::config;
use serde::{Serialize, de::DeserializeOwned};
use std::io::{self, Read, Write};

/// Largest frame either side will accept.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Read a single length-prefixed bincode message from `reader`.
///
/// Wire format:
///   - 4-byte big-endian length (u32)
///   - that many bytes of bincode payload
pub fn read_message<R, T>(reader: &mut R) -> Result<T>
where
    R: Read,
    T: DeserializeOwned,
{
    match read_message_opt(reader)? {
        Some(msg) => Ok(msg),
        None => bail!("connection closed before a message was read"),
    }
}

/// Like [`read_message`], but a clean end of stream before the length
/// prefix yields `None`.
pub fn read_message_opt<R, T>(reader: &mut R) -> Result<Option<T>>
where
    R: Read,
    T: DeserializeOwned,
{
    let mut len_buf = [0u8; 4];
    let mut filled = 0;
    while filled < len_buf.len() {
        match reader.read(&mut len_buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => bail!("connection closed inside a frame header"),
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        bail!("frame of {len} bytes exceeds limit of {MAX_FRAME_LEN}");
    }

    let mut buf = vec![0u8; len];
    reader
        .read_exact(&mut buf)
        .context("connection closed inside a frame body")?;

    let (msg, _bytes_read): (T, usize) =
        bincode::serde::decode_from_slice(&buf, config::standard())?;
    Ok(Some(msg))
}

/// Write a single length-prefixed bincode message to `writer`.
///
/// Wire format:
///   - 4-byte big-endian length (u32)
///   - bincode payload
pub fn write_message<W, T>(writer: &mut W, msg: &T) -> Result<()>
where
    W: Write,
    T: Serialize,
{
    let bytes = bincode::serde::encode_to_vec(msg, config::standard())?;
    if bytes.len() > MAX_FRAME_LEN {
        bail!(
            "message of {} bytes exceeds limit of {MAX_FRAME_LEN}",
            bytes.len()
        );
    }
    let len = bytes.len() as u32;

    let len_buf = len.to_be_bytes();
    writer.write_all(&len_buf)?;
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
#[path = "codec_tests.rs"]
mod tests;
