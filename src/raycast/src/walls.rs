//! Per-column wall slices for the pseudo-3D view.

use dungeon::GridMap;

use crate::projection::{DISTANCE_EPSILON, Viewpoint};
use crate::ray::{MAX_DISTANCE, STEP, cast_ray};

/// Horizontal pixel stride between sampled columns
pub const COLUMN_STRIDE: usize = 2;

/// Bands per grid unit in the stone pattern
const BANDS_PER_CELL: f32 = 8.0;

/// One vertical wall slice, ready to be drawn as a line
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallColumn {
    pub x: i32,
    pub top: i32,
    pub bottom: i32,
    /// Fish-eye corrected distance
    pub distance: f32,
    pub color: [u8; 3],
    /// Which of the two alternating bands the hit fell in
    pub light_band: bool,
}

/// Pick the wall shade for a hit.
///
/// The fractional hit coordinate along the wall's long axis selects one of
/// two base shades in alternating bands; distance dims it.
pub fn wall_shade(hit_x: f32, hit_y: f32, ray_angle: f32, distance: f32) -> ([u8; 3], bool) {
    let along = if ray_angle.cos().abs() > ray_angle.sin().abs() {
        hit_y - hit_y.floor()
    } else {
        hit_x - hit_x.floor()
    };
    let light_band = ((along * BANDS_PER_CELL) as i32) % 2 == 0;
    let base: i32 = if light_band { 120 } else { 100 };
    let brightness = (255 - (distance * 12.0) as i32).max(50);
    let color = [
        (base + brightness / 3).min(255) as u8,
        (base / 2 + brightness / 4).min(255) as u8,
        (base / 3 + brightness / 5).min(255) as u8,
    ];
    (color, light_band)
}

/// Cast one ray per sampled column and turn the hits into wall slices.
pub fn wall_columns(view: &Viewpoint, grid: &GridMap, width: usize, height: usize) -> Vec<WallColumn> {
    let mut columns = Vec::with_capacity(width / COLUMN_STRIDE + 1);
    let screen_h = height as f32;

    for x in (0..width).step_by(COLUMN_STRIDE) {
        let angle = view.column_angle(x as f32, width as f32);
        let hit = cast_ray((view.x, view.y), angle, grid, MAX_DISTANCE, STEP);
        let distance = hit.distance * (angle - view.angle).cos();
        if distance <= 0.0 {
            continue;
        }

        let wall_height = (screen_h / (distance + DISTANCE_EPSILON)) as i32;
        let top = (height as i32 - wall_height) / 2;
        let (color, light_band) = wall_shade(hit.hit_x, hit.hit_y, angle, distance);
        columns.push(WallColumn {
            x: x as i32,
            top,
            bottom: top + wall_height,
            distance,
            color,
            light_band,
        });
    }

    columns
}

#[cfg(test)]
mod tests {
    use super::*;
    use dungeon::Room;
    use std::f32::consts::PI;

    fn room_view() -> (GridMap, Viewpoint) {
        let mut grid = GridMap::new(12, 12);
        grid.try_add_room(Room::new(1, 1, 10, 10));
        let view = Viewpoint {
            x: 6.0,
            y: 6.0,
            angle: 0.0,
            fov: PI / 3.0,
        };
        (grid, view)
    }

    #[test]
    fn one_column_per_stride() {
        let (grid, view) = room_view();
        let columns = wall_columns(&view, &grid, 80, 60);
        assert_eq!(columns.len(), 40);
        assert!(columns.iter().all(|c| c.x % 2 == 0));
    }

    #[test]
    fn walls_are_centred_on_horizon() {
        let (grid, view) = room_view();
        for c in wall_columns(&view, &grid, 80, 60) {
            assert!(c.top <= 30 && c.bottom >= 30);
            assert!((c.top + c.bottom - 60).abs() <= 1);
        }
    }

    #[test]
    fn fish_eye_correction_flattens_a_facing_wall() {
        let (grid, view) = room_view();
        let columns = wall_columns(&view, &grid, 200, 100);
        let centre = columns[columns.len() / 2].distance;
        let edge = columns[0].distance;
        // a flat wall seen head-on: corrected distances stay within a step
        assert!((centre - edge).abs() < 0.25, "centre {centre} edge {edge}");
    }

    #[test]
    fn closer_walls_are_taller() {
        let (grid, mut view) = room_view();
        let far = wall_columns(&view, &grid, 40, 100)[10];
        view.x = 9.5;
        let near = wall_columns(&view, &grid, 40, 100)[10];
        assert!(near.bottom - near.top > far.bottom - far.top);
    }

    #[test]
    fn banding_alternates_along_the_wall() {
        let (a, band_a) = wall_shade(11.0, 3.05, 0.0, 2.0);
        let (b, band_b) = wall_shade(11.0, 3.18, 0.0, 2.0);
        assert!(band_a);
        assert!(!band_b);
        assert_ne!(a, b);
    }

    #[test]
    fn distant_walls_are_dimmer() {
        let (near, _) = wall_shade(11.0, 3.05, 0.0, 1.0);
        let (far, _) = wall_shade(11.0, 3.05, 0.0, 15.0);
        assert!(near[0] > far[0]);
    }
}
