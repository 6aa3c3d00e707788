pub mod clock;
pub mod codec;
pub mod dataframe;
pub mod superframe;

pub use clock::Clock;
pub use codec::{FrameError, FrameReader, Header, Packet};
pub use dataframe::{
    AdcSample, DataFrame, FrameType, ImuSample, Payload, PowerFlags, PowerSample, ADC_CHANNELS,
    HEADER_SIZE, IMU_AXES, MAX_FRAME_SIZE,
};
pub use superframe::{Superframe, MAX_SUBFRAMES};
