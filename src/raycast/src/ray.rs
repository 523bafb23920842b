//! Fixed-step ray marching against the occupancy grid.

use dungeon::GridMap;

/// Default march length in grid units
pub const MAX_DISTANCE: f32 = 20.0;
/// Default march increment in grid units
pub const STEP: f32 = 0.1;

/// Result of a single ray march
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Euclidean distance from the origin to the hit point
    /// (or `max_distance` when nothing was hit)
    pub distance: f32,
    pub hit_x: f32,
    pub hit_y: f32,
    /// Whether a wall cell was reached before `max_distance`
    pub hit_wall: bool,
}

/// March a point from `origin` along `angle` until it enters a wall cell or
/// `max_distance` worth of steps have been taken.
pub fn cast_ray(
    origin: (f32, f32),
    angle: f32,
    grid: &GridMap,
    max_distance: f32,
    step: f32,
) -> RayHit {
    let (ox, oy) = origin;
    let (mut x, mut y) = origin;
    if step <= 0.0 || max_distance <= 0.0 {
        return RayHit {
            distance: max_distance.max(0.0),
            hit_x: x,
            hit_y: y,
            hit_wall: false,
        };
    }

    let dx = angle.cos() * step;
    let dy = angle.sin() * step;
    let steps = (max_distance / step) as usize;

    for _ in 0..steps {
        x += dx;
        y += dy;
        if grid.is_wall(x, y) {
            let distance = ((x - ox).powi(2) + (y - oy).powi(2)).sqrt();
            return RayHit {
                distance,
                hit_x: x,
                hit_y: y,
                hit_wall: true,
            };
        }
    }

    RayHit {
        distance: max_distance,
        hit_x: x,
        hit_y: y,
        hit_wall: false,
    }
}

/// `cast_ray` with the default distance and step
pub fn cast_default(origin: (f32, f32), angle: f32, grid: &GridMap) -> RayHit {
    cast_ray(origin, angle, grid, MAX_DISTANCE, STEP)
}
