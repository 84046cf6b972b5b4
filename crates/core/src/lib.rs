//! Core library for the Prism audio-reactive visualiser.
//!
//! A host supplies two inputs, a frequency-magnitude snapshot and a paint
//! timestamp, and the crate turns them into a rotating prism drawn on any
//! [`DrawingSurface`]. The modules split along the same lines: band
//! reduction (`analysis`), PCM to spectrum conversion (`audio`), frame
//! pacing and scheduling (`timeline`), the drawing abstraction (`surface`)
//! and the renderer itself (`render`).

pub mod analysis;
pub mod audio;
pub mod config;
pub mod error;
pub mod render;
pub mod surface;
pub mod timeline;

pub use analysis::{analyze_frequency_bands, FrequencyBands, FrequencySnapshot, MAX_MAGNITUDE};
pub use audio::SpectrumAnalyser;
pub use config::{
    InnerPatternConfig, PrismConfig, RotationConfig, SpectrumConfig, TimingConfig, TrailConfig,
    VisualiserConfig,
};
pub use error::{Result, VisualiserError};
pub use render::{LoopControl, PrismGeometry, RenderState, Renderer};
pub use surface::{
    Canvas2d, DrawCommand, DrawingSurface, Hsla, LinearGradient, Paint, Point, RecordingSurface,
    Size,
};
pub use timeline::{
    Clock, FixedStepScheduler, FrameScheduler, FrameTimer, ManualClock, PacedScheduler,
    SystemClock,
};
