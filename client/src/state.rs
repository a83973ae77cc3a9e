use pixboard_shared::Color;

/// What a click does to the pixel under it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Instrument {
    Brush(Color),
    Eraser,
}

impl Default for Instrument {
    fn default() -> Self {
        Instrument::Brush(Color::BLACK)
    }
}

impl Instrument {
    /// The color and erased flag an edit made with this instrument carries.
    pub fn edit(self) -> (Color, bool) {
        match self {
            Instrument::Brush(color) => (color, false),
            Instrument::Eraser => (Color::TRANSPARENT, true),
        }
    }
}

/// Where the poll loop stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPhase {
    /// No poll pending: dragging, disabled, or waiting to be rescheduled.
    Idle,
    Scheduled,
    InFlight,
}
