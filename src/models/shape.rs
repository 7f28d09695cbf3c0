//! Vector shapes for the diagram editor.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A point in canvas coordinates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Point {
    /// Horizontal offset.
    pub x: f64,
    /// Vertical offset (down is positive).
    pub y: f64,
}

impl Point {
    /// Construct a point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Shape discriminant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    /// Axis-aligned rectangle.
    Rectangle,
    /// Circle.
    Circle,
    /// Straight segment.
    Line,
    /// Segment with an arrow head at `end`.
    Arrow,
    /// Text label.
    Text,
    /// Freehand polyline.
    Freehand,
}

/// Kind-specific geometry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Geometry {
    /// Rectangle from its top-left corner.
    Rectangle {
        /// Top-left corner.
        origin: Point,
        /// Width.
        width: f64,
        /// Height.
        height: f64,
    },
    /// Circle around a center.
    Circle {
        /// Center.
        center: Point,
        /// Radius.
        radius: f64,
    },
    /// Segment.
    Line {
        /// Start.
        start: Point,
        /// End.
        end: Point,
    },
    /// Segment with a head at `end`.
    Arrow {
        /// Tail.
        start: Point,
        /// Head.
        end: Point,
    },
    /// Text anchored at its baseline start.
    Text {
        /// Baseline start.
        position: Point,
        /// Content.
        text: String,
        /// Font size in canvas units.
        font_size: f64,
    },
    /// Polyline through the sampled pointer positions.
    Freehand {
        /// Sampled points.
        points: Vec<Point>,
    },
}

impl Geometry {
    /// Discriminant of this geometry.
    #[must_use]
    pub fn kind(&self) -> ShapeKind {
        match self {
            Self::Rectangle { .. } => ShapeKind::Rectangle,
            Self::Circle { .. } => ShapeKind::Circle,
            Self::Line { .. } => ShapeKind::Line,
            Self::Arrow { .. } => ShapeKind::Arrow,
            Self::Text { .. } => ShapeKind::Text,
            Self::Freehand { .. } => ShapeKind::Freehand,
        }
    }

    /// Same geometry shifted by `(dx, dy)`.
    #[must_use]
    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        let shift = |p: &Point| Point::new(p.x + dx, p.y + dy);
        match self {
            Self::Rectangle {
                origin,
                width,
                height,
            } => Self::Rectangle {
                origin: shift(origin),
                width: *width,
                height: *height,
            },
            Self::Circle { center, radius } => Self::Circle {
                center: shift(center),
                radius: *radius,
            },
            Self::Line { start, end } => Self::Line {
                start: shift(start),
                end: shift(end),
            },
            Self::Arrow { start, end } => Self::Arrow {
                start: shift(start),
                end: shift(end),
            },
            Self::Text {
                position,
                text,
                font_size,
            } => Self::Text {
                position: shift(position),
                text: text.clone(),
                font_size: *font_size,
            },
            Self::Freehand { points } => Self::Freehand {
                points: points.iter().map(shift).collect(),
            },
        }
    }
}

/// Immutable shape record; edits produce a new value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct Shape {
    /// Identity used by selection, transforms and deletion.
    pub id: String,
    /// Kind-specific geometry.
    pub geometry: Geometry,
    /// Stroke color (`#rrggbb`, `#rgb` or a basic color name).
    pub stroke: String,
    /// Stroke width in canvas units.
    pub stroke_width: f64,
    /// Optional fill color.
    #[serde(default)]
    pub fill: Option<String>,
}

impl Shape {
    /// Construct a shape with a generated id.
    #[must_use]
    pub fn new(geometry: Geometry, stroke: impl Into<String>, stroke_width: f64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            geometry,
            stroke: stroke.into(),
            stroke_width,
            fill: None,
        }
    }

    /// Set the fill color.
    #[must_use]
    pub fn with_fill(mut self, fill: impl Into<String>) -> Self {
        self.fill = Some(fill.into());
        self
    }

    /// Discriminant of this shape.
    #[must_use]
    pub fn kind(&self) -> ShapeKind {
        self.geometry.kind()
    }

    /// Copy of this shape with replaced geometry.
    #[must_use]
    pub fn with_geometry(&self, geometry: Geometry) -> Self {
        Self {
            geometry,
            ..self.clone()
        }
    }
}
