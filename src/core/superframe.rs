use super::codec::{FrameError, Header};
use super::dataframe::{write_header, DataFrame, FrameType, HEADER_SIZE};

/// Most sub-frames one superframe can announce in its count byte
pub const MAX_SUBFRAMES: usize = u8::MAX as usize;

/// Batch of frames sent as one network message.
///
/// Wire layout: `[255][timestamp:u64][count:u8]` followed by the
/// back-to-back serialization of `count` frames.
#[derive(Debug, Clone, PartialEq)]
pub struct Superframe {
    pub timestamp: u64,
    pub frames: Vec<DataFrame>,
}

impl Superframe {
    pub fn encoded_len(frames: &[DataFrame]) -> usize {
        HEADER_SIZE + frames.iter().map(DataFrame::total_size).sum::<usize>()
    }

    /// Appends a superframe holding `frames` to `out`, returning its length.
    pub fn encode_into(
        timestamp: u64,
        frames: &[DataFrame],
        out: &mut Vec<u8>,
    ) -> Result<usize, FrameError> {
        if frames.len() > MAX_SUBFRAMES {
            return Err(FrameError::TooManyFrames {
                count: frames.len(),
                max: MAX_SUBFRAMES,
            });
        }
        let start = out.len();
        out.reserve(Self::encoded_len(frames));
        out.resize(start + HEADER_SIZE, 0);
        write_header(
            &mut out[start..],
            FrameType::Superframe.code(),
            timestamp,
            frames.len() as u8,
        );
        for frame in frames {
            frame.write_to(out);
        }
        Ok(out.len() - start)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, FrameError> {
        let mut out = Vec::new();
        Self::encode_into(self.timestamp, &self.frames, &mut out)?;
        Ok(out)
    }

    pub fn decode(bytes: &[u8]) -> Result<(Superframe, usize), FrameError> {
        let header = Header::parse(bytes)?;
        if header.frame_type != FrameType::Superframe {
            return Err(FrameError::UnknownType(header.frame_type.code()));
        }
        let declared = header.size as usize;
        let mut frames = Vec::with_capacity(declared);
        let mut offset = HEADER_SIZE;
        while frames.len() < declared {
            if offset >= bytes.len() {
                return Err(FrameError::CountMismatch {
                    declared,
                    found: frames.len(),
                });
            }
            let (frame, used) = DataFrame::decode(&bytes[offset..])?;
            frames.push(frame);
            offset += used;
        }
        Ok((
            Superframe {
                timestamp: header.timestamp,
                frames,
            },
            offset,
        ))
    }
}
