/// Turns a polled "button is down" signal into one interaction per press.
#[derive(Debug, Default)]
pub struct InteractButton {
    was_down: bool,
    /// Set for one frame when a press is detected.
    pub pressed: bool,
    /// Total presses since creation.
    pub presses: u64,
}

impl InteractButton {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update from raw button polling. Call once per frame.
    pub fn update(&mut self, down: bool) -> bool {
        // Edge-detect (press, not hold)
        self.pressed = down && !self.was_down;
        self.was_down = down;
        if self.pressed {
            self.presses += 1;
        }
        self.pressed
    }
}
