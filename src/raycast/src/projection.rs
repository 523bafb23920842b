//! Perspective projection of world points onto screen columns.

use std::f32::consts::{PI, TAU};

use serde::{Deserialize, Serialize};

/// Window height the perspective constants were tuned for
pub const REFERENCE_HEIGHT: f32 = 600.0;
/// Pixels of sprite height per world unit at distance 1 (at reference height)
pub const SPRITE_SCALE: f32 = 200.0;
/// Vertical perspective factor placing the ground line under the horizon
pub const VERTICAL_PERSPECTIVE_FACTOR: f32 = 160.0;
/// Added to every divisor that involves a distance
pub const DISTANCE_EPSILON: f32 = 0.1;

/// The slice of a camera pose the projection needs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewpoint {
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    pub fov: f32,
}

impl Viewpoint {
    pub fn half_fov(&self) -> f32 {
        self.fov / 2.0
    }

    /// View angle of a screen column, left edge at `angle - fov/2`
    pub fn column_angle(&self, column: f32, screen_width: f32) -> f32 {
        if screen_width <= 0.0 {
            return self.angle;
        }
        self.angle - self.half_fov() + (column / screen_width) * self.fov
    }
}

/// Where an entity lands on screen
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub distance: f32,
    /// Angle between the view direction and the entity, in `(-π, π]`
    pub angle_diff: f32,
    /// Screen column of the entity centre (may lie outside the screen)
    pub column: f32,
    /// `|angle_diff| <= fov/2`; callers cull when false
    pub visible: bool,
}

/// Wrap an angle into `(-π, π]`
pub fn normalize_angle(angle: f32) -> f32 {
    if !angle.is_finite() {
        return 0.0;
    }
    let mut a = angle.rem_euclid(TAU);
    if a > PI {
        a -= TAU;
    }
    if a <= -PI {
        a += TAU;
    }
    a
}

/// Project a world point relative to the viewer onto a screen column.
///
/// `column = width/2 + (angle_diff / (fov/2)) * width/2`. A point at the
/// viewer's own position is treated as dead ahead.
pub fn project(entity: (f32, f32), view: &Viewpoint, screen_width: f32) -> Projection {
    let dx = entity.0 - view.x;
    let dy = entity.1 - view.y;
    let distance = (dx * dx + dy * dy).sqrt();
    let half_width = screen_width / 2.0;

    if distance == 0.0 {
        return Projection {
            distance,
            angle_diff: 0.0,
            column: half_width,
            visible: true,
        };
    }

    let angle_diff = normalize_angle(dy.atan2(dx) - view.angle);
    let half_fov = view.half_fov();
    let column = if half_fov > 0.0 {
        half_width + (angle_diff / half_fov) * half_width
    } else {
        half_width
    };

    Projection {
        distance,
        angle_diff,
        column,
        visible: angle_diff.abs() <= half_fov,
    }
}

/// Screen-space rectangle of a ground-standing billboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpriteRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    /// Row where the billboard touches the ground
    pub ground_y: i32,
}

/// Size and place a billboard standing on the ground at the projected point.
///
/// Height is `real_height * 200 / (d + 0.1)` (never below `min_height`), the
/// ground line sits `eye_height * 160 / (d + 0.1)` below the horizon; both are
/// scaled by `screen_height / 600`.
pub fn sprite_rect(
    projection: &Projection,
    real_height: f32,
    eye_height: f32,
    screen_height: f32,
    min_height: i32,
    aspect_ratio: f32,
) -> SpriteRect {
    let scale = screen_height / REFERENCE_HEIGHT;
    let perspective = 1.0 / (projection.distance + DISTANCE_EPSILON);
    let height = ((real_height * SPRITE_SCALE * scale * perspective) as i32).max(min_height);
    let width = (height as f32 * aspect_ratio) as i32;
    let horizon = (screen_height / 2.0) as i32;
    let ground_y = horizon + (eye_height * VERTICAL_PERSPECTIVE_FACTOR * scale * perspective) as i32;
    SpriteRect {
        x: projection.column as i32 - width / 2,
        y: ground_y - height,
        width,
        height,
        ground_y,
    }
}
