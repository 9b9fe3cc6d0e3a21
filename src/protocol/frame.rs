//! MSSP frame codec.
//!
//! Wire layout, offsets fixed by the protocol:
//!
//! ```text
//! +--------+---------+---------+---------+-----------+----------+------+
//! | length | control | address | command | payload   | checksum | ETX  |
//! |   0    |    1    |    2    |    3    | 4..len-2  |  len-2   | len-1|
//! +--------+---------+---------+---------+-----------+----------+------+
//! ```
//!
//! `length` counts the whole frame including itself and the terminator.
//! The checksum is the two's complement of the byte sum over
//! `frame[0..len-2]`, so summing every byte up to and including the
//! checksum yields zero. Payload fields are little-endian.

use bytes::BytesMut;

use crate::error::FramingError;

/// Minimum header: length, control, address, command.
pub const MIN_HEADER: usize = 4;
/// Smallest complete frame: header plus checksum and terminator.
pub const MIN_FRAME: usize = 6;
/// Largest payload the one-byte length field can carry.
pub const MAX_PAYLOAD: usize = u8::MAX as usize - MIN_FRAME;
/// Frame terminator byte.
pub const ETX: u8 = 0x03;

/// One complete MSSP message.
///
/// A `Frame` holds the semantic fields only; length, checksum and terminator
/// are derived on encode and validated on decode. Construct responses through
/// [`crate::registry::dispatch`] rather than by hand to keep payload widths
/// within what the one-byte length field can carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub address: u8,
    pub control: u8,
    pub command: u8,
    pub payload: Vec<u8>,
}

impl Frame {
    /// Create a frame. The payload is truncated to [`MAX_PAYLOAD`] here, at
    /// construction, so the frame value always matches what `encode` puts on
    /// the wire; the builders in this crate never hit the limit.
    pub fn new(address: u8, control: u8, command: u8, mut payload: Vec<u8>) -> Self {
        payload.truncate(MAX_PAYLOAD);
        Self { address, control, command, payload }
    }

    /// Serialize to wire bytes, deriving length, checksum and terminator.
    pub fn encode(&self) -> Vec<u8> {
        let total = MIN_FRAME + self.payload.len();
        let mut out = Vec::with_capacity(total);
        out.push(total as u8);
        out.push(self.control);
        out.push(self.address);
        out.push(self.command);
        out.extend_from_slice(&self.payload);
        out.push(checksum(&out));
        out.push(ETX);
        out
    }

    /// Parse and validate one complete frame region.
    ///
    /// Never yields a partially populated frame: any validation failure is a
    /// [`FramingError`] and the caller discards the region.
    pub fn decode(bytes: &[u8]) -> Result<Self, FramingError> {
        if bytes.len() < MIN_HEADER {
            return Err(FramingError::TooShort { len: bytes.len(), min: MIN_HEADER });
        }
        if bytes.len() < MIN_FRAME {
            return Err(FramingError::TooShort { len: bytes.len(), min: MIN_FRAME });
        }
        let declared = bytes[0] as usize;
        if declared != bytes.len() {
            return Err(FramingError::LengthMismatch { declared: bytes[0], actual: bytes.len() });
        }
        let last = bytes.len() - 1;
        if bytes[last] != ETX {
            return Err(FramingError::BadTerminator { expected: ETX, found: bytes[last] });
        }
        let expected = checksum(&bytes[..last - 1]);
        if bytes[last - 1] != expected {
            return Err(FramingError::ChecksumMismatch {
                offset: last - 1,
                expected,
                found: bytes[last - 1],
            });
        }
        Ok(Frame {
            control: bytes[1],
            address: bytes[2],
            command: bytes[3],
            payload: bytes[4..last - 1].to_vec(),
        })
    }
}

/// Two's-complement checksum over the given bytes.
fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b)).wrapping_neg()
}

/// Reassembles a byte stream into length-delimited frame regions.
///
/// The transport hands over whatever the serial layer produced; chunks may
/// split a frame or carry several. Regions that cannot start a frame are
/// drained and handed back so the session can report them, keeping the
/// stream in sync.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    buffer: BytesMut,
}

impl FrameBuffer {
    pub fn new() -> Self {
        FrameBuffer { buffer: BytesMut::with_capacity(256) }
    }

    /// Append received bytes.
    pub fn push(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Take the next complete region, or `None` if more bytes are needed.
    ///
    /// A returned region is either a full valid frame or a run of leading
    /// garbage that cannot begin one; in both cases the caller passes it to
    /// [`Frame::decode`], which accepts or rejects it. A noise byte is never
    /// trusted as a declared length: candidate regions are validated before
    /// the buffer commits to them, so a valid frame arriving right behind
    /// line noise is found by scanning, not withheld until the bogus length
    /// is satisfied.
    pub fn next_region(&mut self) -> Option<Vec<u8>> {
        let len = self.buffer.len();

        // First complete region that validates as a frame wins; anything in
        // front of it is garbage.
        for start in 0..len {
            let declared = self.buffer[start] as usize;
            if declared < MIN_FRAME || declared > len - start {
                continue;
            }
            let region = &self.buffer[start..start + declared];
            if region[declared - 1] == ETX
                && region[declared - 2] == checksum(&region[..declared - 2])
            {
                if start > 0 {
                    return Some(self.buffer.split_to(start).to_vec());
                }
                return Some(self.buffer.split_to(declared).to_vec());
            }
        }

        // No valid frame anywhere. Drain the leading bytes that can never
        // begin one, keeping only a tail whose declared length might still
        // be satisfied by bytes yet to arrive.
        let mut junk = 0;
        while junk < len {
            let declared = self.buffer[junk] as usize;
            if declared >= MIN_FRAME && declared > len - junk {
                break;
            }
            junk += 1;
        }
        if junk > 0 {
            return Some(self.buffer.split_to(junk).to_vec());
        }
        None
    }

    /// Bytes waiting for a complete frame.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Discard any partial input, e.g. after a transport reset.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}
