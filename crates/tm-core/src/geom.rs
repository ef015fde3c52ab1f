/// Sub-pixel location in image coordinates (x right, y down).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point2f {
    pub x: f32,
    pub y: f32,
}

impl Point2f {
    /// Center of the integer pixel `(x, y)`.
    pub fn pixel(x: usize, y: usize) -> Self {
        Self {
            x: x as f32,
            y: y as f32,
        }
    }

    /// Moves `t` units along `dir`.
    pub fn along(self, dir: Vec2f, t: f32) -> Self {
        Self {
            x: self.x + dir.x * t,
            y: self.y + dir.y * t,
        }
    }
}

/// Direction vector, usually a unit edge normal.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec2f {
    pub x: f32,
    pub y: f32,
}

impl Vec2f {
    pub fn length(self) -> f32 {
        self.x.hypot(self.y)
    }

    /// Unit normal of a gradient `(gx, gy)`; `None` on a flat or non-finite
    /// gradient.
    pub fn edge_normal(gx: f32, gy: f32) -> Option<Self> {
        let len = gx.hypot(gy);
        if len == 0.0 || !len.is_finite() {
            return None;
        }
        Some(Self {
            x: gx / len,
            y: gy / len,
        })
    }

    /// Integer pixel step along the dominant component, e.g. `(0.8, -0.3)`
    /// steps `(1, 0)`. Ties go to x.
    pub fn dominant_step(self) -> (isize, isize) {
        let sign = |v: f32| if v > 0.0 { 1 } else { -1 };
        if self.x == 0.0 && self.y == 0.0 {
            (0, 0)
        } else if self.x.abs() >= self.y.abs() {
            (sign(self.x), 0)
        } else {
            (0, sign(self.y))
        }
    }
}
