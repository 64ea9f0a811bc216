//! Canvas geometry.
//!
//! World and screen positions share one unit type; the viewport's [`Transform`] is what tells
//! them apart. Screen points are canvas pixels after client-rect normalisation.

/// Unit tag for every length on the tree canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Canvas {}

pub type Unit = Canvas;

pub type Point = euclid::Point2D<f64, Unit>;
pub type Vector = euclid::Vector2D<f64, Unit>;
pub type Size = euclid::Size2D<f64, Unit>;
pub type Rect = euclid::Rect<f64, Unit>;
pub type Transform = euclid::Transform2D<f64, Unit, Unit>;

pub fn point(x: f64, y: f64) -> Point {
    euclid::point2(x, y)
}

pub fn vector(x: f64, y: f64) -> Vector {
    euclid::vec2(x, y)
}

pub fn rect(x: f64, y: f64, w: f64, h: f64) -> Rect {
    euclid::rect(x, y, w, h)
}

/// CSS `matrix(a, b, c, d, e, f)` arguments for a 2D transform.
pub fn css_matrix(t: &Transform) -> [f64; 6] {
    [t.m11, t.m12, t.m21, t.m22, t.m31, t.m32]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn css_matrix_orders_scale_then_translation() {
        let t = Transform::scale(2.0, 2.0).then_translate(vector(10.0, -5.0));
        assert_eq!(css_matrix(&t), [2.0, 0.0, 0.0, 2.0, 10.0, -5.0]);
        assert_eq!(t.transform_point(point(1.0, 1.0)), point(12.0, -3.0));
    }
}
