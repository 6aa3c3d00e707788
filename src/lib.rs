pub mod app;
pub mod buffers;
pub mod config;
pub mod core;
pub mod engine;
pub mod hal;
pub mod observability;
pub mod tasks;

pub use app::{AppController, AppParts, NextWheelApp, SensorSet};
pub use config::{AppSettings, ConfigData, GlobalConfig};
pub use core::{DataFrame, FrameType, Payload, Superframe};
