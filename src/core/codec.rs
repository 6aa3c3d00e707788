//! Decoding of frames as they appear in recording files and on the stream.

use thiserror::Error;

use super::dataframe::{DataFrame, FrameType, Payload, HEADER_SIZE};
use super::superframe::Superframe;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("buffer too small: need {needed} bytes, have {available}")]
    BufferTooSmall { needed: usize, available: usize },

    #[error("truncated frame: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },

    #[error("unknown frame type code {0}")]
    UnknownType(u8),

    #[error("frame type {0:?} has no payload layout")]
    UnsupportedType(FrameType),

    #[error("{frame_type:?} frame declares {found} payload bytes, expected {expected}")]
    SizeMismatch {
        frame_type: FrameType,
        expected: usize,
        found: usize,
    },

    #[error("superframe holds at most {max} frames, got {count}")]
    TooManyFrames { count: usize, max: usize },

    #[error("superframe declares {declared} frames, found {found}")]
    CountMismatch { declared: usize, found: usize },
}

/// Raw 10-byte header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub frame_type: FrameType,
    pub timestamp: u64,
    /// Payload length, or sub-frame count for superframes
    pub size: u8,
}

impl Header {
    pub fn parse(bytes: &[u8]) -> Result<Self, FrameError> {
        if bytes.len() < HEADER_SIZE {
            return Err(FrameError::Truncated {
                needed: HEADER_SIZE,
                available: bytes.len(),
            });
        }
        let frame_type = FrameType::from_code(bytes[0]).ok_or(FrameError::UnknownType(bytes[0]))?;
        let mut ts = [0u8; 8];
        ts.copy_from_slice(&bytes[1..9]);
        Ok(Self {
            frame_type,
            timestamp: u64::from_le_bytes(ts),
            size: bytes[9],
        })
    }
}

impl DataFrame {
    /// Decodes one plain frame from the front of `bytes`.
    ///
    /// Returns the frame and the number of bytes consumed.
    pub fn decode(bytes: &[u8]) -> Result<(DataFrame, usize), FrameError> {
        let header = Header::parse(bytes)?;
        let expected = header
            .frame_type
            .payload_size()
            .ok_or(FrameError::UnsupportedType(header.frame_type))?;
        if header.size as usize != expected {
            return Err(FrameError::SizeMismatch {
                frame_type: header.frame_type,
                expected,
                found: header.size as usize,
            });
        }
        let total = HEADER_SIZE + expected;
        if bytes.len() < total {
            return Err(FrameError::Truncated {
                needed: total,
                available: bytes.len(),
            });
        }
        let payload = Payload::read(header.frame_type, &bytes[HEADER_SIZE..total])?;
        Ok((DataFrame::new(header.timestamp, payload), total))
    }
}

/// Iterates the frames of a recording file.
///
/// Stops after the first error; trailing bytes too short for a header
/// are reported as `Truncated`.
pub struct FrameReader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> FrameReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl<'a> Iterator for FrameReader<'a> {
    type Item = Result<DataFrame, FrameError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.bytes.len() {
            return None;
        }
        match DataFrame::decode(&self.bytes[self.offset..]) {
            Ok((frame, used)) => {
                self.offset += used;
                Some(Ok(frame))
            }
            Err(e) => {
                self.offset = self.bytes.len();
                Some(Err(e))
            }
        }
    }
}

/// One message of the live stream
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Frame(DataFrame),
    Superframe(Superframe),
}

impl Packet {
    pub fn decode(bytes: &[u8]) -> Result<(Packet, usize), FrameError> {
        let header = Header::parse(bytes)?;
        if header.frame_type == FrameType::Superframe {
            let (superframe, used) = Superframe::decode(bytes)?;
            Ok((Packet::Superframe(superframe), used))
        } else {
            let (frame, used) = DataFrame::decode(bytes)?;
            Ok((Packet::Frame(frame), used))
        }
    }

    /// Frames carried by the packet, in wire order
    pub fn frames(&self) -> &[DataFrame] {
        match self {
            Packet::Frame(frame) => std::slice::from_ref(frame),
            Packet::Superframe(superframe) => &superframe.frames,
        }
    }
}
