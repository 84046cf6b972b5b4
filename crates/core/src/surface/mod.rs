//! Immediate-mode 2D drawing abstraction.
//!
//! [`Canvas2d`] mirrors the small subset of canvas-style operations the
//! renderer needs; [`DrawingSurface`] is the host object whose size tracks
//! the viewport and which hands out the context once.

mod recording;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Result;

pub use recording::{DrawCommand, RecordingContext, RecordingSurface};

/// Pixel dimensions of a surface or viewport.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn min_side(&self) -> f64 {
        f64::from(self.width.min(self.height))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Colour in the HSL model. Hue is in degrees and wraps like CSS; saturation
/// and lightness are percentages; alpha is in `0..=1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hsla {
    pub hue: f64,
    pub saturation: f64,
    pub lightness: f64,
    pub alpha: f64,
}

impl Hsla {
    pub fn new(hue: f64, saturation: f64, lightness: f64, alpha: f64) -> Self {
        Self {
            hue: hue.rem_euclid(360.0),
            saturation: saturation.clamp(0.0, 100.0),
            lightness: lightness.clamp(0.0, 100.0),
            alpha: alpha.clamp(0.0, 1.0),
        }
    }

    /// Opaque colour.
    pub fn hsl(hue: f64, saturation: f64, lightness: f64) -> Self {
        Self::new(hue, saturation, lightness, 1.0)
    }

    pub fn black(alpha: f64) -> Self {
        Self::new(0.0, 0.0, 0.0, alpha)
    }
}

impl fmt::Display for Hsla {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hsla({}, {}%, {}%, {})",
            self.hue, self.saturation, self.lightness, self.alpha
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorStop {
    pub offset: f64,
    pub color: Hsla,
}

/// Gradient along the line `start -> end`. Stops stay sorted by offset;
/// a stop added at an existing offset goes after the earlier ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearGradient {
    pub start: Point,
    pub end: Point,
    stops: Vec<ColorStop>,
}

impl LinearGradient {
    pub fn new(start: Point, end: Point) -> Self {
        Self {
            start,
            end,
            stops: Vec::new(),
        }
    }

    /// Adds a stop; offsets outside `0..=1` are clamped.
    pub fn add_color_stop(&mut self, offset: f64, color: Hsla) {
        let offset = offset.clamp(0.0, 1.0);
        let index = self.stops.partition_point(|stop| stop.offset <= offset);
        self.stops.insert(index, ColorStop { offset, color });
    }

    pub fn with_stop(mut self, offset: f64, color: Hsla) -> Self {
        self.add_color_stop(offset, color);
        self
    }

    pub fn stops(&self) -> &[ColorStop] {
        &self.stops
    }
}

/// Fill or stroke style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Paint {
    Solid(Hsla),
    Linear(LinearGradient),
}

impl From<Hsla> for Paint {
    fn from(value: Hsla) -> Self {
        Self::Solid(value)
    }
}

impl From<LinearGradient> for Paint {
    fn from(value: LinearGradient) -> Self {
        Self::Linear(value)
    }
}

/// Canvas-style 2D drawing context.
///
/// Transform, styles and shadow form the drawing state that `save` pushes
/// and `restore` pops. Path building and painting follow the usual
/// begin/move/line/close then fill/stroke sequence.
pub trait Canvas2d {
    fn save(&mut self) -> Result<()>;
    fn restore(&mut self) -> Result<()>;
    fn translate(&mut self, x: f64, y: f64) -> Result<()>;
    /// Rotates the current transform clockwise by `angle` radians.
    fn rotate(&mut self, angle: f64) -> Result<()>;

    fn begin_path(&mut self) -> Result<()>;
    fn move_to(&mut self, x: f64, y: f64) -> Result<()>;
    fn line_to(&mut self, x: f64, y: f64) -> Result<()>;
    fn close_path(&mut self) -> Result<()>;

    fn set_fill_style(&mut self, paint: Paint) -> Result<()>;
    fn set_stroke_style(&mut self, paint: Paint) -> Result<()>;
    fn set_line_width(&mut self, width: f64) -> Result<()>;
    fn set_shadow(&mut self, blur: f64, color: Hsla) -> Result<()>;

    fn fill(&mut self) -> Result<()>;
    fn stroke(&mut self) -> Result<()>;
    /// Paints a rectangle with the fill style, bypassing the current path.
    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64) -> Result<()>;

    /// Builds a closed path through `points`.
    fn polygon(&mut self, points: &[Point]) -> Result<()> {
        self.begin_path()?;
        if let Some((first, rest)) = points.split_first() {
            self.move_to(first.x, first.y)?;
            for point in rest {
                self.line_to(point.x, point.y)?;
            }
        }
        self.close_path()
    }
}

/// Host drawing surface.
pub trait DrawingSurface {
    type Context: Canvas2d;

    /// Current extents of the host viewport the surface should fill.
    fn viewport_size(&self) -> Size;

    /// Size of the backing store.
    fn size(&self) -> Size;

    /// Resizes the backing store.
    fn set_size(&mut self, size: Size);

    /// Acquires the 2D context, or `None` if the surface cannot offer one.
    fn context_2d(&mut self) -> Option<Self::Context>;
}
