//! Level analysis: mixer → accumulator → converter

pub mod accumulator;
pub mod level;
pub mod mixer;

pub use accumulator::WindowAccumulator;
pub use level::{convert, rms_to_db, LevelVector, LIVE_FLOOR_DB, OFFLINE_FLOOR_DB};
pub use mixer::{mix, VirtualChannel, CHANNEL_WEIGHTS, VIRTUAL_CHANNELS};
