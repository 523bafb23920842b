//! Ray casting and perspective projection over a `dungeon::GridMap`.
//!
//! Everything here is pure math returning plain data, so the renderer can be
//! exercised without a display.

pub mod projection;
pub mod ray;
pub mod walls;

pub use crate::projection::{
    Projection, SpriteRect, Viewpoint, normalize_angle, project, sprite_rect,
};
pub use crate::ray::{RayHit, cast_default, cast_ray};
pub use crate::walls::{WallColumn, wall_columns, wall_shade};

#[cfg(test)]
mod tests {
    use super::*;
    use dungeon::{GridMap, Room};
    use proptest::prelude::*;

    proptest! {
        // A larger march budget never reports a shorter hit than a smaller one
        // that already reached the wall.
        #[test]
        fn cast_ray_is_monotonic_in_max_distance(
            ox in 1.05f32..8.95,
            oy in 1.05f32..8.95,
            angle in -3.2f32..3.2,
            short in 0.5f32..10.0,
            extra in 0.0f32..10.0,
        ) {
            let mut grid = GridMap::new(10, 10);
            grid.try_add_room(Room::new(1, 1, 8, 8));
            let a = cast_ray((ox, oy), angle, &grid, short, 0.1);
            let b = cast_ray((ox, oy), angle, &grid, short + extra, 0.1);
            if a.hit_wall {
                prop_assert!(b.hit_wall);
                prop_assert!(b.distance >= a.distance - 1e-4);
            }
        }
    }
}
