//! panmeter: stereo level meter with five virtual pan positions
//!
//! Reads interleaved 16-bit stereo PCM, mixes every frame into five
//! virtual channels between hard left and hard right, and publishes one
//! RMS level vector in dBFS per analysis window. Playback of the same
//! bytes runs alongside through an optional sink.

pub mod analysis;
pub mod audio;
pub mod config;
pub mod display;
pub mod engine;
pub mod error;

pub use analysis::{LevelVector, VirtualChannel};
pub use audio::{AudioFormat, PcmSource, PlaybackSink};
pub use engine::{
    AccumulationScope, Engine, EngineConfig, EngineHandle, EngineState, LevelListener, RunOutcome,
    RunSummary, StopHandle,
};
pub use error::{Error, FormatError, Result, SinkError};
