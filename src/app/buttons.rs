use log::debug;

use super::controller::AppController;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    /// Button 1
    StartRecording,
    /// Button 2
    StopRecording,
}

/// Edge detector for the two recording buttons.
pub struct Buttons {
    controller: AppController,
    levels: [bool; 2],
}

impl Buttons {
    pub fn new(controller: AppController) -> Self {
        Self {
            controller,
            levels: [false; 2],
        }
    }

    /// Feeds a new pin level. A rising edge issues the button's command;
    /// returns true when a command was sent.
    pub fn update(&mut self, button: Button, level: bool) -> bool {
        let slot = match button {
            Button::StartRecording => 0,
            Button::StopRecording => 1,
        };
        let rising = level && !self.levels[slot];
        self.levels[slot] = level;
        if !rising {
            return false;
        }

        debug!("{:?} pressed", button);
        match button {
            Button::StartRecording => self.controller.start_recording(),
            Button::StopRecording => self.controller.stop_recording(),
        }
    }
}
