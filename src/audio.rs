/// Fire-and-forget sound cues. The simulation queues them; the host
/// drains the queue once per frame and plays whatever it likes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioCue {
    /// A table is ready to order.
    OrderBell,
    /// The kitchen finished a plate.
    OrderComplete,
    /// A table walked out with an order outstanding.
    OrderFailed,
    /// The last of a seated party walked out.
    PartyQuit,
}

impl AudioCue {
    pub fn label(self) -> &'static str {
        match self {
            AudioCue::OrderBell => "order-bell",
            AudioCue::OrderComplete => "order-complete",
            AudioCue::OrderFailed => "order-failed",
            AudioCue::PartyQuit => "party-quit",
        }
    }
}
