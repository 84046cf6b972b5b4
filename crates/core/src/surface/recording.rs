use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use serde::Serialize;

use super::{Canvas2d, DrawingSurface, Hsla, Paint, Size};
use crate::{Result, VisualiserError};

/// One canvas call as seen by a [`RecordingContext`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawCommand {
    Save,
    Restore,
    Translate { x: f64, y: f64 },
    Rotate { angle: f64 },
    BeginPath,
    MoveTo { x: f64, y: f64 },
    LineTo { x: f64, y: f64 },
    ClosePath,
    SetFillStyle { paint: Paint },
    SetStrokeStyle { paint: Paint },
    SetLineWidth { width: f64 },
    SetShadow { blur: f64, color: Hsla },
    Fill,
    Stroke,
    FillRect { x: f64, y: f64, width: f64, height: f64 },
}

#[derive(Debug, Default)]
struct Shared {
    commands: RefCell<Vec<DrawCommand>>,
    viewport: Cell<Size>,
    fail_paint: Cell<bool>,
}

/// Offscreen surface that logs every draw call instead of rasterising.
///
/// Clones are handles onto the same surface: a host can keep one to move
/// the simulated viewport or inspect the log while the renderer owns
/// another. Handy for headless runs and tests.
#[derive(Debug, Clone)]
pub struct RecordingSurface {
    shared: Rc<Shared>,
    size: Size,
    context_available: bool,
}

impl RecordingSurface {
    /// Creates a surface whose viewport starts at `viewport`.
    pub fn new(viewport: Size) -> Self {
        let shared = Shared::default();
        shared.viewport.set(viewport);
        Self {
            shared: Rc::new(shared),
            size: Size::default(),
            context_available: true,
        }
    }

    /// A surface that refuses to hand out a context.
    pub fn without_context(viewport: Size) -> Self {
        Self {
            context_available: false,
            ..Self::new(viewport)
        }
    }

    /// Simulates the host viewport changing size.
    pub fn set_viewport(&self, viewport: Size) {
        self.shared.viewport.set(viewport);
    }

    /// While set, `fill`, `stroke` and `fill_rect` fail.
    pub fn fail_paint(&self, fail: bool) {
        self.shared.fail_paint.set(fail);
    }

    pub fn commands(&self) -> Vec<DrawCommand> {
        self.shared.commands.borrow().clone()
    }

    /// Drains the log.
    pub fn take_commands(&self) -> Vec<DrawCommand> {
        std::mem::take(&mut *self.shared.commands.borrow_mut())
    }
}

impl DrawingSurface for RecordingSurface {
    type Context = RecordingContext;

    fn viewport_size(&self) -> Size {
        self.shared.viewport.get()
    }

    fn size(&self) -> Size {
        self.size
    }

    fn set_size(&mut self, size: Size) {
        self.size = size;
    }

    fn context_2d(&mut self) -> Option<Self::Context> {
        self.context_available.then(|| RecordingContext {
            shared: Rc::clone(&self.shared),
            depth: 0,
        })
    }
}

/// Context handed out by [`RecordingSurface`].
#[derive(Debug)]
pub struct RecordingContext {
    shared: Rc<Shared>,
    depth: usize,
}

impl RecordingContext {
    fn record(&mut self, command: DrawCommand) -> Result<()> {
        self.shared.commands.borrow_mut().push(command);
        Ok(())
    }

    fn paint(&mut self, command: DrawCommand) -> Result<()> {
        if self.shared.fail_paint.get() {
            return Err(VisualiserError::surface(format!(
                "recording surface rejected {command:?}"
            )));
        }
        self.record(command)
    }
}

impl Canvas2d for RecordingContext {
    fn save(&mut self) -> Result<()> {
        self.depth += 1;
        self.record(DrawCommand::Save)
    }

    fn restore(&mut self) -> Result<()> {
        // An unbalanced restore is a no-op on a canvas.
        self.depth = self.depth.saturating_sub(1);
        self.record(DrawCommand::Restore)
    }

    fn translate(&mut self, x: f64, y: f64) -> Result<()> {
        self.record(DrawCommand::Translate { x, y })
    }

    fn rotate(&mut self, angle: f64) -> Result<()> {
        self.record(DrawCommand::Rotate { angle })
    }

    fn begin_path(&mut self) -> Result<()> {
        self.record(DrawCommand::BeginPath)
    }

    fn move_to(&mut self, x: f64, y: f64) -> Result<()> {
        self.record(DrawCommand::MoveTo { x, y })
    }

    fn line_to(&mut self, x: f64, y: f64) -> Result<()> {
        self.record(DrawCommand::LineTo { x, y })
    }

    fn close_path(&mut self) -> Result<()> {
        self.record(DrawCommand::ClosePath)
    }

    fn set_fill_style(&mut self, paint: Paint) -> Result<()> {
        self.record(DrawCommand::SetFillStyle { paint })
    }

    fn set_stroke_style(&mut self, paint: Paint) -> Result<()> {
        self.record(DrawCommand::SetStrokeStyle { paint })
    }

    fn set_line_width(&mut self, width: f64) -> Result<()> {
        self.record(DrawCommand::SetLineWidth { width })
    }

    fn set_shadow(&mut self, blur: f64, color: Hsla) -> Result<()> {
        self.record(DrawCommand::SetShadow { blur, color })
    }

    fn fill(&mut self) -> Result<()> {
        self.paint(DrawCommand::Fill)
    }

    fn stroke(&mut self) -> Result<()> {
        self.paint(DrawCommand::Stroke)
    }

    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64) -> Result<()> {
        self.paint(DrawCommand::FillRect {
            x,
            y,
            width,
            height,
        })
    }
}

impl RecordingContext {
    /// Number of `save` calls not yet matched by `restore`.
    pub fn depth(&self) -> usize {
        self.depth
    }
}
