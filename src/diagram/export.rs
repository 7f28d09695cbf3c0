//! Canvas serialization: SVG markup and PNG raster.
//!
//! Both exports are pure reads of a shape list. Text shapes are rasterized
//! as a baseline bar sized from the font size; the SVG output keeps the
//! real text.

use std::fmt::Write as _;
use std::io::Cursor;

use base64::Engine as _;
use image::{ImageFormat, Rgba, RgbaImage};

use crate::models::shape::{Geometry, Point, Shape};
use crate::{AppError, Result};

const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);
const FALLBACK_STROKE: Rgba<u8> = Rgba([0, 0, 0, 255]);
/// Approximate glyph advance relative to the font size.
const GLYPH_ADVANCE: f64 = 0.6;

/// Render `shapes` as a standalone SVG document.
#[must_use]
pub fn to_svg(shapes: &[Shape], width: u32, height: u32) -> String {
    let mut svg = format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">\n"
    );
    svg.push_str("<rect width=\"100%\" height=\"100%\" fill=\"white\"/>\n");
    for shape in shapes {
        svg_shape(&mut svg, shape);
    }
    svg.push_str("</svg>\n");
    svg
}

/// Render `shapes` onto a white `width` x `height` canvas, PNG-encoded.
///
/// # Errors
///
/// Returns `AppError::Export` for an empty canvas or an encoder failure.
pub fn to_png(shapes: &[Shape], width: u32, height: u32) -> Result<Vec<u8>> {
    if width == 0 || height == 0 {
        return Err(AppError::Export(format!(
            "canvas must be non-empty, got {width}x{height}"
        )));
    }
    let mut canvas = RgbaImage::from_pixel(width, height, BACKGROUND);
    for shape in shapes {
        raster_shape(&mut canvas, shape);
    }
    let mut bytes = Vec::new();
    canvas.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

/// Wrap PNG bytes as a `data:` URL.
#[must_use]
pub fn png_data_url(bytes: &[u8]) -> String {
    format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

fn svg_shape(out: &mut String, shape: &Shape) {
    let stroke = escape(&shape.stroke);
    let fill = shape
        .fill
        .as_deref()
        .map_or_else(|| "none".to_owned(), escape);
    let sw = shape.stroke_width;
    // Writing to a String cannot fail.
    let _ = match &shape.geometry {
        Geometry::Rectangle {
            origin,
            width,
            height,
        } => writeln!(
            out,
            "<rect id=\"{id}\" x=\"{}\" y=\"{}\" width=\"{width}\" height=\"{height}\" stroke=\"{stroke}\" stroke-width=\"{sw}\" fill=\"{fill}\"/>",
            origin.x,
            origin.y,
            id = escape(&shape.id),
        ),
        Geometry::Circle { center, radius } => writeln!(
            out,
            "<circle id=\"{id}\" cx=\"{}\" cy=\"{}\" r=\"{radius}\" stroke=\"{stroke}\" stroke-width=\"{sw}\" fill=\"{fill}\"/>",
            center.x,
            center.y,
            id = escape(&shape.id),
        ),
        Geometry::Line { start, end } => writeln!(
            out,
            "<line id=\"{id}\" x1=\"{}\" y1=\"{}\" x2=\"{}\" y2=\"{}\" stroke=\"{stroke}\" stroke-width=\"{sw}\"/>",
            start.x,
            start.y,
            end.x,
            end.y,
            id = escape(&shape.id),
        ),
        Geometry::Arrow { start, end } => {
            let (left, right) = arrow_head(*start, *end, head_length(sw));
            writeln!(
                out,
                "<g id=\"{id}\" stroke=\"{stroke}\" stroke-width=\"{sw}\" fill=\"none\"><line x1=\"{}\" y1=\"{}\" x2=\"{}\" y2=\"{}\"/><polyline points=\"{},{} {},{} {},{}\"/></g>",
                start.x,
                start.y,
                end.x,
                end.y,
                left.x,
                left.y,
                end.x,
                end.y,
                right.x,
                right.y,
                id = escape(&shape.id),
            )
        }
        Geometry::Text {
            position,
            text,
            font_size,
        } => writeln!(
            out,
            "<text id=\"{id}\" x=\"{}\" y=\"{}\" font-size=\"{font_size}\" fill=\"{stroke}\">{}</text>",
            position.x,
            position.y,
            escape(text),
            id = escape(&shape.id),
        ),
        Geometry::Freehand { points } => {
            let path = points
                .iter()
                .map(|p| format!("{},{}", p.x, p.y))
                .collect::<Vec<_>>()
                .join(" ");
            writeln!(
                out,
                "<polyline id=\"{id}\" points=\"{path}\" stroke=\"{stroke}\" stroke-width=\"{sw}\" fill=\"none\" stroke-linecap=\"round\" stroke-linejoin=\"round\"/>",
                id = escape(&shape.id),
            )
        }
    };
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn head_length(stroke_width: f64) -> f64 {
    (stroke_width * 4.0).max(8.0)
}

/// The two barb endpoints of an arrow head at `end`.
fn arrow_head(start: Point, end: Point, length: f64) -> (Point, Point) {
    let angle = (end.y - start.y).atan2(end.x - start.x);
    let spread = std::f64::consts::PI / 7.0;
    let barb = |a: f64| Point::new(end.x - length * a.cos(), end.y - length * a.sin());
    (barb(angle - spread), barb(angle + spread))
}

fn raster_shape(canvas: &mut RgbaImage, shape: &Shape) {
    let stroke = parse_color(&shape.stroke).unwrap_or(FALLBACK_STROKE);
    let fill = shape.fill.as_deref().and_then(parse_color);
    let half = (shape.stroke_width / 2.0).max(0.5);

    match &shape.geometry {
        Geometry::Rectangle {
            origin,
            width,
            height,
        } => {
            let (x0, y0) = (origin.x, origin.y);
            let (x1, y1) = (origin.x + width, origin.y + height);
            if let Some(fill) = fill {
                paint(canvas, (x0, y0, x1, y1), fill, |_, _| true);
            }
            let corners = [
                Point::new(x0, y0),
                Point::new(x1, y0),
                Point::new(x1, y1),
                Point::new(x0, y1),
            ];
            for i in 0..4 {
                segment(canvas, corners[i], corners[(i + 1) % 4], half, stroke);
            }
        }
        Geometry::Circle { center, radius } => {
            let reach = radius + half;
            let bounds = (
                center.x - reach,
                center.y - reach,
                center.x + reach,
                center.y + reach,
            );
            if let Some(fill) = fill {
                paint(canvas, bounds, fill, |x, y| {
                    distance(Point::new(x, y), *center) <= *radius
                });
            }
            paint(canvas, bounds, stroke, |x, y| {
                (distance(Point::new(x, y), *center) - radius).abs() <= half
            });
        }
        Geometry::Line { start, end } => segment(canvas, *start, *end, half, stroke),
        Geometry::Arrow { start, end } => {
            segment(canvas, *start, *end, half, stroke);
            let (left, right) = arrow_head(*start, *end, head_length(shape.stroke_width));
            segment(canvas, left, *end, half, stroke);
            segment(canvas, right, *end, half, stroke);
        }
        Geometry::Text {
            position,
            text,
            font_size,
        } => {
            #[allow(clippy::cast_precision_loss)] // label lengths are small
            let advance = GLYPH_ADVANCE * font_size * text.chars().count() as f64;
            let thickness = (font_size * 0.1).max(1.0) / 2.0;
            let end = Point::new(position.x + advance, position.y);
            segment(canvas, *position, end, thickness, stroke);
        }
        Geometry::Freehand { points } => {
            for pair in points.windows(2) {
                segment(canvas, pair[0], pair[1], half, stroke);
            }
        }
    }
}

fn segment(canvas: &mut RgbaImage, a: Point, b: Point, half: f64, color: Rgba<u8>) {
    let bounds = (
        a.x.min(b.x) - half,
        a.y.min(b.y) - half,
        a.x.max(b.x) + half,
        a.y.max(b.y) + half,
    );
    paint(canvas, bounds, color, |x, y| {
        distance_to_segment(Point::new(x, y), a, b) <= half
    });
}

/// Set every pixel inside `bounds` whose center satisfies `inside`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // clamped to canvas bounds first
fn paint(
    canvas: &mut RgbaImage,
    bounds: (f64, f64, f64, f64),
    color: Rgba<u8>,
    inside: impl Fn(f64, f64) -> bool,
) {
    let (min_x, min_y, max_x, max_y) = bounds;
    let width = f64::from(canvas.width());
    let height = f64::from(canvas.height());
    let x0 = min_x.floor().clamp(0.0, width) as u32;
    let x1 = max_x.ceil().clamp(0.0, width) as u32;
    let y0 = min_y.floor().clamp(0.0, height) as u32;
    let y1 = max_y.ceil().clamp(0.0, height) as u32;

    for y in y0..y1 {
        for x in x0..x1 {
            if inside(f64::from(x) + 0.5, f64::from(y) + 0.5) {
                canvas.put_pixel(x, y, color);
            }
        }
    }
}

fn distance(a: Point, b: Point) -> f64 {
    (a.x - b.x).hypot(a.y - b.y)
}

fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len_sq = dx * dx + dy * dy;
    if len_sq <= f64::EPSILON {
        return distance(p, a);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    distance(p, Point::new(a.x + t * dx, a.y + t * dy))
}

/// Parse `#rgb`, `#rrggbb` or a basic color name. `none` and
/// `transparent` yield `None`.
pub(crate) fn parse_color(value: &str) -> Option<Rgba<u8>> {
    let value = value.trim();
    if let Some(hex) = value.strip_prefix('#') {
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        return match hex.len() {
            3 => {
                let mut rgb = [0_u8; 3];
                for (slot, c) in rgb.iter_mut().zip(hex.chars()) {
                    let v = c.to_digit(16)?;
                    *slot = u8::try_from(v * 17).ok()?;
                }
                Some(Rgba([rgb[0], rgb[1], rgb[2], 255]))
            }
            6 => Some(Rgba([
                channel(hex.get(0..2)?)?,
                channel(hex.get(2..4)?)?,
                channel(hex.get(4..6)?)?,
                255,
            ])),
            _ => None,
        };
    }
    let rgb = match value.to_ascii_lowercase().as_str() {
        "black" => [0, 0, 0],
        "white" => [255, 255, 255],
        "red" => [220, 38, 38],
        "green" => [22, 163, 74],
        "blue" => [37, 99, 235],
        "yellow" => [234, 179, 8],
        "orange" => [249, 115, 22],
        "purple" => [147, 51, 234],
        "gray" | "grey" => [107, 114, 128],
        _ => return None,
    };
    Some(Rgba([rgb[0], rgb[1], rgb[2], 255]))
}
