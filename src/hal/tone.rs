use log::debug;

use super::traits::ToneOutput;

/// Tone output for hosts without a speaker; reports tones to the log
#[derive(Debug, Default)]
pub struct LogToneOutput;

impl ToneOutput for LogToneOutput {
    fn tone(&mut self, frequency_hz: u32) {
        debug!("tone {} Hz", frequency_hz);
    }

    fn silence(&mut self) {
        debug!("tone off");
    }
}
