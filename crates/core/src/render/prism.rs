use std::f64::consts::{FRAC_PI_2, PI, TAU};

use serde::Serialize;

use crate::{
    config::{InnerPatternConfig, PrismConfig},
    surface::{Canvas2d, Hsla, LinearGradient, Point, Size},
    FrequencyBands, Result,
};

/// Vertex count of each inner pattern triangle.
const INNER_SIDES: u32 = 3;

/// Numeric layout of one frame, in the prism's local (centred, unrotated)
/// coordinates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrismGeometry {
    pub base_size: f64,
    pub outer_radius: f64,
    pub outer_vertices: Vec<Point>,
    pub inner_size: f64,
    pub inner_scale: f64,
    pub inner_vertices: Vec<Point>,
    /// Extra rotation applied to each inner triangle.
    pub inner_rotations: Vec<f64>,
}

impl PrismGeometry {
    pub fn compute(
        bands: &FrequencyBands,
        size: Size,
        prism: &PrismConfig,
        inner: &InnerPatternConfig,
    ) -> Self {
        let base_size = size.min_side() * prism.base_size_factor;
        let outer_radius = base_size * (prism.radius_floor + bands.bass * prism.bass_gain);

        let inner_size = base_size * inner.size_factor;
        let inner_scale = 1.0 + bands.mid * inner.mid_gain;
        let angle_step = PI / f64::from(inner.triangles);

        Self {
            base_size,
            outer_radius,
            outer_vertices: regular_polygon(prism.sides, outer_radius),
            inner_size,
            inner_scale,
            inner_vertices: regular_polygon(INNER_SIDES, inner_size * inner_scale),
            inner_rotations: (0..inner.triangles)
                .map(|index| f64::from(index) * angle_step)
                .collect(),
        }
    }
}

/// Vertices at equal angular spacing, the first pointing straight up.
fn regular_polygon(sides: u32, radius: f64) -> Vec<Point> {
    (0..sides)
        .map(|index| {
            let angle = f64::from(index) * TAU / f64::from(sides) - FRAC_PI_2;
            Point::new(angle.cos() * radius, angle.sin() * radius)
        })
        .collect()
}

/// Diagonal gradient stroking the outer polygon. Each stop takes its hue
/// from a different band; the last one sits opposite the bass hue.
pub fn outer_gradient(bands: &FrequencyBands, base_size: f64) -> LinearGradient {
    let FrequencyBands { bass, mid, treble } = *bands;
    LinearGradient::new(
        Point::new(-base_size, -base_size),
        Point::new(base_size, base_size),
    )
    .with_stop(0.0, Hsla::hsl(bass * 0.5, 85.0, 45.0))
    .with_stop(0.3, Hsla::hsl(mid + 30.0, 70.0, 55.0))
    .with_stop(0.6, Hsla::hsl(treble + 60.0, 75.0, 40.0))
    .with_stop(1.0, Hsla::hsl((bass + 180.0) % 360.0, 80.0, 35.0))
}

/// Vertical gradient filling the inner triangles. The two gold stops carry
/// the shimmer alpha.
pub fn inner_gradient(bands: &FrequencyBands, inner_size: f64, shimmer: f64) -> LinearGradient {
    let FrequencyBands { mid, treble, .. } = *bands;
    LinearGradient::new(Point::new(0.0, -inner_size), Point::new(0.0, inner_size))
        .with_stop(0.0, Hsla::new(treble + 180.0, 100.0, 20.0, 0.8))
        .with_stop(0.5, Hsla::new(mid + 270.0, 90.0, 15.0, 0.6))
        .with_stop(1.0, Hsla::new(treble + 90.0, 95.0, 25.0, 0.7))
        .with_stop(0.2, Hsla::new(38.0, 100.0, 50.0, shimmer))
        .with_stop(0.7, Hsla::new(0.0, 0.0, 0.0, 0.9))
        .with_stop(0.9, Hsla::new(38.0, 90.0, 40.0, shimmer))
}

/// Slow pulse of the gold stops' alpha, driven by wall-clock time only.
pub fn shimmer(now_ms: f64, inner: &InnerPatternConfig) -> f64 {
    (now_ms * inner.shimmer_rate).sin() * inner.shimmer_depth + inner.shimmer_base
}

/// Blur radius of the glow behind the inner triangles.
pub fn glow_blur(now_ms: f64, inner: &InnerPatternConfig) -> f64 {
    inner.glow_base + (now_ms * inner.glow_rate).sin() * inner.glow_depth
}

/// Everything [`draw_prism`] needs for one frame.
#[derive(Debug, Clone, Copy)]
pub struct PrismFrame<'a> {
    pub center: Point,
    pub rotation: f64,
    pub bands: &'a FrequencyBands,
    pub geometry: &'a PrismGeometry,
    pub now_ms: f64,
}

/// Paints the outer polygon and the inner pattern around `frame.center`.
///
/// Every `save` is matched by a `restore` even when a draw call fails, so a
/// broken frame cannot leak transforms into the next one.
pub fn draw_prism<C: Canvas2d>(
    ctx: &mut C,
    frame: &PrismFrame<'_>,
    prism: &PrismConfig,
    inner: &InnerPatternConfig,
) -> Result<()> {
    with_saved_state(ctx, |ctx| {
        ctx.translate(frame.center.x, frame.center.y)?;
        ctx.rotate(frame.rotation)?;

        let geometry = frame.geometry;
        ctx.polygon(&geometry.outer_vertices)?;
        ctx.set_stroke_style(outer_gradient(frame.bands, geometry.base_size).into())?;
        ctx.set_line_width(prism.stroke_width)?;
        ctx.stroke()?;

        draw_inner_pattern(ctx, frame, inner)
    })
}

fn draw_inner_pattern<C: Canvas2d>(
    ctx: &mut C,
    frame: &PrismFrame<'_>,
    inner: &InnerPatternConfig,
) -> Result<()> {
    let geometry = frame.geometry;
    let FrequencyBands { mid, treble, .. } = *frame.bands;
    let shimmer = shimmer(frame.now_ms, inner);
    let blur = glow_blur(frame.now_ms, inner);

    for &angle in &geometry.inner_rotations {
        with_saved_state(ctx, |ctx| {
            ctx.rotate(angle)?;
            ctx.polygon(&geometry.inner_vertices)?;

            ctx.set_shadow(blur, Hsla::new(treble, 90.0, 50.0, 0.6))?;
            ctx.set_stroke_style(Hsla::new(mid, 80.0, 40.0, 0.4).into())?;
            ctx.set_line_width(inner.stroke_width)?;
            ctx.stroke()?;

            let gradient = inner_gradient(frame.bands, geometry.inner_size, shimmer);
            ctx.set_fill_style(gradient.into())?;
            ctx.fill()
        })?;
    }
    Ok(())
}

fn with_saved_state<C, F>(ctx: &mut C, draw: F) -> Result<()>
where
    C: Canvas2d,
    F: FnOnce(&mut C) -> Result<()>,
{
    ctx.save()?;
    let drawn = draw(ctx);
    let restored = ctx.restore();
    drawn.and(restored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{DrawCommand, DrawingSurface, Paint, RecordingSurface};

    const EPS: f64 = 1e-9;

    fn geometry(bands: FrequencyBands, size: Size) -> PrismGeometry {
        PrismGeometry::compute(
            &bands,
            size,
            &PrismConfig::default(),
            &InnerPatternConfig::default(),
        )
    }

    #[test]
    fn outer_radius_tracks_bass() {
        let quiet = geometry(FrequencyBands::ZERO, Size::new(800, 600));
        assert!((quiet.base_size - 51.0).abs() < EPS);
        assert!((quiet.outer_radius - 51.0 * 0.00445).abs() < EPS);

        let loud = geometry(FrequencyBands::new(255.0, 0.0, 0.0), Size::new(800, 600));
        assert!((loud.outer_radius - 51.0 * (0.00445 + 255.0 * 0.018)).abs() < EPS);
    }

    #[test]
    fn triangle_starts_at_the_top() {
        let layout = geometry(FrequencyBands::new(100.0, 0.0, 0.0), Size::new(400, 400));
        let top = layout.outer_vertices[0];

        assert_eq!(layout.outer_vertices.len(), 3);
        assert!(top.x.abs() < EPS);
        assert!((top.y + layout.outer_radius).abs() < EPS);
        for vertex in &layout.outer_vertices {
            assert!((vertex.x.hypot(vertex.y) - layout.outer_radius).abs() < EPS);
        }
    }

    #[test]
    fn inner_triangle_scales_with_mid() {
        let layout = geometry(FrequencyBands::new(0.0, 100.0, 0.0), Size::new(1000, 500));
        let size = layout.inner_size;
        let scale = layout.inner_scale;

        assert!((size - 500.0 * 0.085 * 0.999).abs() < EPS);
        assert!((scale - 4.3).abs() < EPS);

        let right = layout.inner_vertices[1];
        let left = layout.inner_vertices[2];
        let half = (PI / 6.0).cos() * size * scale;
        assert!((right.x - half).abs() < EPS);
        assert!((left.x + half).abs() < EPS);
        assert!((right.y - size * scale * 0.5).abs() < EPS);
        assert_eq!(layout.inner_rotations, vec![0.0]);
    }

    #[test]
    fn extra_inner_triangles_split_half_a_turn() {
        let inner = InnerPatternConfig {
            triangles: 4,
            ..Default::default()
        };
        let layout = PrismGeometry::compute(
            &FrequencyBands::ZERO,
            Size::new(100, 100),
            &PrismConfig::default(),
            &inner,
        );
        assert_eq!(layout.inner_rotations.len(), 4);
        assert!((layout.inner_rotations[3] - 3.0 * PI / 4.0).abs() < EPS);
    }

    #[test]
    fn gradients_follow_band_hues() {
        let bands = FrequencyBands::new(200.0, 100.0, 300.0);
        let outer = outer_gradient(&bands, 10.0);
        let hues: Vec<_> = outer.stops().iter().map(|s| s.color.hue).collect();
        assert_eq!(hues, vec![100.0, 130.0, 0.0, 20.0]);

        let inner = inner_gradient(&bands, 10.0, 0.75);
        let offsets: Vec<_> = inner.stops().iter().map(|s| s.offset).collect();
        assert_eq!(offsets, vec![0.0, 0.2, 0.5, 0.7, 0.9, 1.0]);
        assert_eq!(inner.stops()[1].color.alpha, 0.75);
        assert_eq!(inner.stops()[4].color.alpha, 0.75);
        assert_eq!(inner.start, Point::new(0.0, -10.0));
    }

    #[test]
    fn shimmer_and_glow_oscillate_around_their_base() {
        let inner = InnerPatternConfig::default();
        assert!((shimmer(0.0, &inner) - 0.8).abs() < EPS);
        assert!((shimmer(FRAC_PI_2 / 0.002, &inner) - 1.0).abs() < EPS);
        assert!((glow_blur(0.0, &inner) - 15.0).abs() < EPS);
        assert!((glow_blur(FRAC_PI_2 / 0.003, &inner) - 25.0).abs() < EPS);
    }

    #[test]
    fn failed_stroke_still_restores_state() {
        let mut surface = RecordingSurface::new(Size::new(100, 100));
        let mut ctx = surface.context_2d().unwrap();
        surface.fail_paint(true);

        let bands = FrequencyBands::ZERO;
        let layout = geometry(bands, Size::new(100, 100));
        let frame = PrismFrame {
            center: Point::new(50.0, 50.0),
            rotation: 0.0,
            bands: &bands,
            geometry: &layout,
            now_ms: 0.0,
        };

        let result = draw_prism(
            &mut ctx,
            &frame,
            &PrismConfig::default(),
            &InnerPatternConfig::default(),
        );
        assert!(result.is_err());
        assert_eq!(ctx.depth(), 0);
        assert_eq!(surface.commands().last(), Some(&DrawCommand::Restore));
    }

    #[test]
    fn inner_pattern_strokes_before_filling() {
        let mut surface = RecordingSurface::new(Size::new(100, 100));
        let mut ctx = surface.context_2d().unwrap();
        let bands = FrequencyBands::new(10.0, 20.0, 30.0);
        let layout = geometry(bands, Size::new(100, 100));
        let frame = PrismFrame {
            center: Point::new(50.0, 50.0),
            rotation: 1.0,
            bands: &bands,
            geometry: &layout,
            now_ms: 0.0,
        };

        draw_prism(
            &mut ctx,
            &frame,
            &PrismConfig::default(),
            &InnerPatternConfig::default(),
        )
        .unwrap();

        let commands = surface.commands();
        let strokes: Vec<_> = commands
            .iter()
            .enumerate()
            .filter(|(_, c)| **c == DrawCommand::Stroke)
            .map(|(i, _)| i)
            .collect();
        let fill = commands.iter().position(|c| *c == DrawCommand::Fill).unwrap();

        assert_eq!(strokes.len(), 2);
        assert!(strokes[1] < fill);
        assert!(commands.iter().any(|c| matches!(
            c,
            DrawCommand::SetFillStyle {
                paint: Paint::Linear(_)
            }
        )));
        assert_eq!(ctx.depth(), 0);
    }
}
