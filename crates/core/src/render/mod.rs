mod prism;

use tracing::{debug, trace, warn};

use crate::{
    analysis::{analyze_frequency_bands, FrequencyBands, FrequencySnapshot},
    config::VisualiserConfig,
    surface::{Canvas2d, DrawingSurface, Hsla, Point, Size},
    timeline::{Clock, FrameScheduler, FrameTimer, SystemClock},
    Result, VisualiserError,
};

pub use prism::{
    draw_prism, glow_blur, inner_gradient, outer_gradient, shimmer, PrismFrame, PrismGeometry,
};

/// What the host should do after delivering a paint opportunity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    /// Request another paint opportunity.
    Continue,
    /// The renderer is stopped; do not re-arm until `start` is called.
    Exit,
}

/// Surface geometry and animation state owned by the renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderState {
    pub size: Size,
    pub center: Point,
    /// Radians. Only grows, and only while frames are being drawn.
    pub rotation: f64,
    pub running: bool,
}

/// Audio-reactive prism renderer.
///
/// The renderer is a small state machine: it starts stopped, `start` arms
/// it and `stop` disarms it. The host pumps the animation loop by calling
/// [`Renderer::animation_frame`] at every paint opportunity (or hands a
/// [`FrameScheduler`] to [`Renderer::run`]); frames are further throttled
/// to the configured rate by a [`FrameTimer`].
pub struct Renderer<S: DrawingSurface> {
    surface: S,
    context: S::Context,
    config: VisualiserConfig,
    clock: Box<dyn Clock>,
    frame_timer: FrameTimer,
    state: RenderState,
    frequency_data: Option<FrequencySnapshot>,
    last_bands: FrequencyBands,
    last_geometry: Option<PrismGeometry>,
    frames_drawn: u64,
    frame_errors: u64,
}

impl<S: DrawingSurface> Renderer<S> {
    /// Creates a renderer reading shimmer time from the system clock.
    pub fn new(surface: S, config: VisualiserConfig) -> Result<Self> {
        Self::with_clock(surface, config, SystemClock::new())
    }

    /// Creates a renderer with an explicit time source for the
    /// clock-driven effects.
    ///
    /// Fails with [`VisualiserError::SurfaceUnavailable`] when the surface
    /// has no 2D context.
    pub fn with_clock(
        mut surface: S,
        config: VisualiserConfig,
        clock: impl Clock + 'static,
    ) -> Result<Self> {
        config.validate()?;
        let context = surface
            .context_2d()
            .ok_or(VisualiserError::SurfaceUnavailable)?;
        let frame_timer = FrameTimer::new(config.timing.target_fps)?;

        let mut renderer = Self {
            surface,
            context,
            frame_timer,
            clock: Box::new(clock),
            state: RenderState {
                size: Size::default(),
                center: Point::default(),
                rotation: config.rotation.initial,
                running: false,
            },
            config,
            frequency_data: None,
            last_bands: FrequencyBands::ZERO,
            last_geometry: None,
            frames_drawn: 0,
            frame_errors: 0,
        };
        renderer.resize();
        Ok(renderer)
    }

    /// Re-reads the viewport and fits the surface and centre point to it.
    /// Hosts forward every viewport resize notification here.
    pub fn resize(&mut self) {
        let size = self.surface.viewport_size();
        self.surface.set_size(size);
        self.state.size = size;
        self.state.center = Point::new(f64::from(size.width) / 2.0, f64::from(size.height) / 2.0);
        debug!(width = size.width, height = size.height, "surface resized");
    }

    /// Arms the animation loop. Calling it while running changes nothing.
    pub fn start(&mut self) {
        if self.state.running {
            trace!("start ignored, renderer already running");
            return;
        }
        self.state.running = true;
        debug!("renderer started");
    }

    /// Disarms the animation loop; it exits at its next iteration.
    pub fn stop(&mut self) {
        if !self.state.running {
            return;
        }
        self.state.running = false;
        debug!(frames = self.frames_drawn, "renderer stopped");
    }

    /// Replaces the pending frequency snapshot. The latest snapshot wins.
    pub fn update_frequency_data(&mut self, snapshot: FrequencySnapshot) {
        self.frequency_data = Some(snapshot);
    }

    /// One iteration of the animation loop, run at a paint opportunity.
    ///
    /// A failed frame is logged and counted but never ends the loop.
    pub fn animation_frame(&mut self, timestamp: f64) -> LoopControl {
        if !self.state.running {
            return LoopControl::Exit;
        }

        if let Err(error) = self.draw_frame(timestamp) {
            self.frame_errors += 1;
            warn!(%error, timestamp, "frame failed, continuing with the next one");
        }
        LoopControl::Continue
    }

    /// Pumps the animation loop until the renderer stops or the scheduler
    /// runs dry. `on_resume` runs at each paint opportunity before the
    /// running flag is checked, which is where a host feeds frequency data,
    /// forwards resizes or calls `stop`. Returns the number of frames drawn.
    pub fn run<F>(&mut self, scheduler: &mut dyn FrameScheduler, mut on_resume: F) -> u64
    where
        F: FnMut(&mut Self, f64),
    {
        let first_frame = self.frames_drawn;

        while self.state.running {
            let Some(timestamp) = scheduler.next_frame() else {
                debug!("frame scheduler exhausted");
                break;
            };

            on_resume(self, timestamp);
            if self.animation_frame(timestamp) == LoopControl::Exit {
                break;
            }
        }

        self.frames_drawn - first_frame
    }

    /// Draws a frame if the renderer is running and the frame gate lets
    /// `timestamp` through. Returns whether a frame was drawn.
    pub fn draw_frame(&mut self, timestamp: f64) -> Result<bool> {
        if !self.state.running || !self.frame_timer.should_draw_frame(timestamp) {
            return Ok(false);
        }

        let size = self.state.size;
        self.context
            .set_fill_style(Hsla::black(self.config.trail.alpha).into())?;
        self.context
            .fill_rect(0.0, 0.0, f64::from(size.width), f64::from(size.height))?;

        let bands = analyze_frequency_bands(self.frequency_data.as_ref());
        self.state.rotation += bands.mid * self.config.rotation.mid_gain;
        self.last_bands = bands;

        let geometry = PrismGeometry::compute(&bands, size, &self.config.prism, &self.config.inner);
        let frame = PrismFrame {
            center: self.state.center,
            rotation: self.state.rotation,
            bands: &bands,
            geometry: &geometry,
            now_ms: self.clock.now_ms(),
        };
        let drawn = draw_prism(
            &mut self.context,
            &frame,
            &self.config.prism,
            &self.config.inner,
        );
        self.last_geometry = Some(geometry);
        drawn?;

        self.frames_drawn += 1;
        trace!(
            timestamp,
            bass = bands.bass,
            mid = bands.mid,
            treble = bands.treble,
            rotation = self.state.rotation,
            "frame drawn"
        );
        Ok(true)
    }

    pub fn state(&self) -> &RenderState {
        &self.state
    }

    pub fn is_running(&self) -> bool {
        self.state.running
    }

    pub fn rotation(&self) -> f64 {
        self.state.rotation
    }

    pub fn size(&self) -> Size {
        self.state.size
    }

    pub fn center(&self) -> Point {
        self.state.center
    }

    /// Bands used by the most recent frame.
    pub fn last_bands(&self) -> FrequencyBands {
        self.last_bands
    }

    /// Layout of the most recent frame, if any frame was attempted.
    pub fn last_geometry(&self) -> Option<&PrismGeometry> {
        self.last_geometry.as_ref()
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    /// Frames that failed and were skipped by the animation loop.
    pub fn frame_errors(&self) -> u64 {
        self.frame_errors
    }

    pub fn config(&self) -> &VisualiserConfig {
        &self.config
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }
}

impl<S: DrawingSurface> std::fmt::Debug for Renderer<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("state", &self.state)
            .field("frame_timer", &self.frame_timer)
            .field("has_frequency_data", &self.frequency_data.is_some())
            .field("frames_drawn", &self.frames_drawn)
            .field("frame_errors", &self.frame_errors)
            .finish()
    }
}
