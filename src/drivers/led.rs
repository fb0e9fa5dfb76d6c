//! Status indicator driver trait

/// On-board indicator LED toggled by the main loop housekeeping
pub trait StatusLed {
    fn set(&mut self, on: bool);
}
