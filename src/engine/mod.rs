// Load-in overlay engine: phase machine, sub-animations and their scheduling.

pub mod block_wipe;
pub mod driver;
pub mod odometer;
pub mod phase;
pub mod sequencer;
pub mod timers;
