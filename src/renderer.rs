//! Frame rendering onto an abstract pixel surface, plus the traits the game
//! loop drives the front end through.

use combat::Enemy;
use combat::enemy::{DEATH_TICKS, HIT_ANIMATION_TICKS};
use dungeon::has_line_of_sight;
use hero::{Player, SHOOT_FLASH};
use image::RgbaImage;
use items::Bullet;
use ratatui::layout::Rect;
use raycast::projection::{DISTANCE_EPSILON, REFERENCE_HEIGHT, VERTICAL_PERSPECTIVE_FACTOR};
use raycast::walls::COLUMN_STRIDE;
use raycast::{Projection, project, sprite_rect, wall_columns};
use std::f32::consts::TAU;
use std::time::{Duration, Instant};

use crate::assets::SpriteRepository;
use crate::ecs::ECSWorld;
use crate::explorer::{EXPLORER_COLOR, Explorer, TARGET_COLOR, cell_color};
use crate::game_loop::Game;

pub type Rgb = [u8; 3];

pub const SKY: Rgb = [50, 50, 100];
pub const FLOOR: Rgb = [100, 50, 0];
pub const WHITE: Rgb = [255, 255, 255];

/// Enemies further than this are not drawn
pub const ENEMY_VIEW_DISTANCE: f32 = 10.0;
/// Potions and bullets further than this are not drawn
pub const ITEM_VIEW_DISTANCE: f32 = 8.0;
const POTION_HEIGHT: f32 = 0.3;
/// Reference canvas width for HUD sizes
const REFERENCE_WIDTH: f32 = 800.0;

/// Trait for rendering the game state
pub trait Renderer {
    fn init(&mut self) -> anyhow::Result<()>;

    /// Draw the current game state
    fn draw(&mut self, game: &Game) -> anyhow::Result<()>;

    /// Terminal area the 3D view occupied in the last frame
    fn canvas_viewport(&self) -> Option<Rect> {
        None
    }

    fn cleanup(&mut self) -> anyhow::Result<()>;
}

/// Trait for time management
pub trait Clock {
    fn now(&self) -> Instant;

    fn elapsed(&self, since: Instant) -> Duration {
        self.now().saturating_duration_since(since)
    }

    fn sleep(&self, duration: Duration);

    /// Fixed time step for game logic updates
    fn tick_rate(&self) -> Duration;
}

/// Wall clock pacing
pub struct GameClock {
    tick_rate: Duration,
}

impl GameClock {
    pub fn new(tick_rate: Duration) -> Self {
        Self { tick_rate }
    }
}

impl Clock for GameClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }

    fn tick_rate(&self) -> Duration {
        self.tick_rate
    }
}

/// Drawing primitives the frame renderer needs. Coordinates may fall
/// outside the surface; implementations clip.
pub trait Surface {
    fn size(&self) -> (u32, u32);

    fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: Rgb);

    fn draw_line(&mut self, from: (i32, i32), to: (i32, i32), color: Rgb);

    /// Nearest-neighbour scaled blit. Each sprite channel is multiplied by
    /// `tint / 255`; mostly transparent pixels are skipped.
    fn blit_scaled(&mut self, sprite: &RgbaImage, x: i32, y: i32, w: i32, h: i32, tint: Rgb);

    fn fill_circle(&mut self, center: (i32, i32), radius: i32, color: Rgb) {
        if radius <= 0 {
            self.fill_rect(center.0, center.1, 1, 1, color);
            return;
        }
        for dy in -radius..=radius {
            let half = (((radius * radius - dy * dy) as f32).sqrt()) as i32;
            self.fill_rect(center.0 - half, center.1 + dy, 2 * half + 1, 1, color);
        }
    }

    fn stroke_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: Rgb) {
        if w <= 0 || h <= 0 {
            return;
        }
        let (r, b) = (x + w - 1, y + h - 1);
        self.draw_line((x, y), (r, y), color);
        self.draw_line((x, b), (r, b), color);
        self.draw_line((x, y), (x, b), color);
        self.draw_line((r, y), (r, b), color);
    }
}

/// Sizes tuned for 800x600 shrink with the canvas
fn ui_scale(width: f32, height: f32) -> f32 {
    (width / REFERENCE_WIDTH).min(height / REFERENCE_HEIGHT)
}

fn scaled(value: f32, scale: f32) -> i32 {
    ((value * scale).round() as i32).max(1)
}

/// Draw one complete frame of the 3D view
pub fn render_frame(surface: &mut dyn Surface, ecs: &ECSWorld, sprites: &SpriteRepository) {
    let (w, h) = surface.size();
    if w == 0 || h == 0 {
        return;
    }
    let player = &ecs.resources.player;

    draw_background(surface);
    draw_walls(surface, ecs);
    draw_sprites(surface, ecs, sprites);
    draw_health(surface, player);
    draw_crosshair(surface, player);
    draw_flash(surface, player);
    draw_minimap(surface, ecs);
}

fn draw_background(surface: &mut dyn Surface) {
    let (w, h) = surface.size();
    let (w, h) = (w as i32, h as i32);
    surface.fill_rect(0, 0, w, h, SKY);
    surface.fill_rect(0, h / 2, w, h - h / 2, FLOOR);
}

fn draw_walls(surface: &mut dyn Surface, ecs: &ECSWorld) {
    let (w, h) = surface.size();
    let view = ecs.resources.player.viewpoint();
    for column in wall_columns(&view, &ecs.resources.grid, w as usize, h as usize) {
        surface.fill_rect(
            column.x,
            column.top,
            COLUMN_STRIDE as i32,
            column.bottom - column.top,
            column.color,
        );
    }
}

/// Anything billboarded into the view
enum Billboard<'a> {
    Enemy(&'a Enemy),
    Potion,
    Bullet(&'a Bullet),
}

fn draw_sprites(surface: &mut dyn Surface, ecs: &ECSWorld, sprites: &SpriteRepository) {
    let (w, _) = surface.size();
    let player = &ecs.resources.player;
    let grid = &ecs.resources.grid;
    let view = player.viewpoint();
    let eye = (player.x, player.y);

    let enemies = ecs.enemies();
    let potions = ecs.potions();
    let bullets = ecs.bullets();

    let mut visible: Vec<(Projection, Billboard<'_>)> = Vec::new();
    for enemy in &enemies {
        let p = project((enemy.x, enemy.y), &view, w as f32);
        if p.visible
            && p.distance < ENEMY_VIEW_DISTANCE
            && has_line_of_sight(eye, (enemy.x, enemy.y), grid)
        {
            visible.push((p, Billboard::Enemy(enemy)));
        }
    }
    for potion in &potions {
        let p = project((potion.x, potion.y), &view, w as f32);
        if p.visible
            && p.distance < ITEM_VIEW_DISTANCE
            && has_line_of_sight(eye, (potion.x, potion.y), grid)
        {
            visible.push((p, Billboard::Potion));
        }
    }
    for bullet in &bullets {
        let p = project((bullet.x, bullet.y), &view, w as f32);
        if p.visible && p.distance < ITEM_VIEW_DISTANCE {
            visible.push((p, Billboard::Bullet(bullet)));
        }
    }

    // 由远及近
    visible.sort_by(|a, b| b.0.distance.total_cmp(&a.0.distance));

    for (projection, billboard) in &visible {
        match billboard {
            Billboard::Enemy(enemy) => draw_enemy(surface, projection, enemy, player, sprites),
            Billboard::Potion => draw_potion(surface, projection, player),
            Billboard::Bullet(bullet) => draw_bullet(surface, projection, bullet, player),
        }
    }
}

/// Brightness falls off with distance; a fresh hit flashes red
pub fn enemy_tint(enemy: &Enemy, distance: f32) -> Rgb {
    let fade = enemy
        .death_countdown()
        .map(|left| left as f32 / DEATH_TICKS as f32)
        .unwrap_or(1.0);
    if enemy.hit_animation > 0 {
        let intensity = enemy.hit_animation as f32 / HIT_ANIMATION_TICKS as f32;
        let gb = (100.0 * intensity * fade) as u8;
        return [(255.0 * fade) as u8, gb, gb];
    }
    let brightness = (1.0 - distance / ENEMY_VIEW_DISTANCE).max(0.3) * fade;
    let v = (255.0 * brightness) as u8;
    [v, v, v]
}

fn draw_enemy(
    surface: &mut dyn Surface,
    projection: &Projection,
    enemy: &Enemy,
    player: &Player,
    sprites: &SpriteRepository,
) {
    let (w, h) = surface.size();
    let scale = ui_scale(w as f32, h as f32);
    let column = projection.column as i32;
    if column < 0 || column >= w as i32 {
        return;
    }
    let Some(sprite) = sprites.get(enemy.kind) else {
        return;
    };
    let aspect = sprite.width() as f32 / sprite.height().max(1) as f32;
    let rect = sprite_rect(
        projection,
        enemy.height,
        player.eye_height,
        h as f32,
        scaled(40.0, scale),
        aspect,
    );
    if rect.height <= scaled(10.0, scale) {
        return;
    }
    let tint = enemy_tint(enemy, projection.distance);
    surface.blit_scaled(sprite, rect.x, rect.y, rect.width, rect.height, tint);
}

fn draw_potion(surface: &mut dyn Surface, projection: &Projection, player: &Player) {
    let (w, h) = surface.size();
    let scale = h as f32 / REFERENCE_HEIGHT;
    let column = projection.column as i32;
    if column < 0 || column >= w as i32 {
        return;
    }
    let rect = sprite_rect(
        projection,
        POTION_HEIGHT,
        player.eye_height,
        h as f32,
        scaled(20.0, scale),
        1.0,
    );
    let size = rect.height;
    let cy = rect.y + size / 2;
    surface.fill_circle((column, cy), size / 3, [0, 255, 0]);
    let arm = size / 4;
    surface.draw_line((column - arm, cy), (column + arm, cy), WHITE);
    surface.draw_line((column, cy - arm), (column, cy + arm), WHITE);
}

fn draw_bullet(surface: &mut dyn Surface, projection: &Projection, bullet: &Bullet, player: &Player) {
    let (w, h) = surface.size();
    let scale = h as f32 / REFERENCE_HEIGHT;
    let column = projection.column as i32;
    if column < 0 || column >= w as i32 {
        return;
    }
    let perspective = 1.0 / (projection.distance + DISTANCE_EPSILON);
    let radius = ((20.0 * scale * perspective) as i32).max(scaled(3.0, scale));
    // 按高度放在视平线上下
    let drop = (player.eye_height - bullet.z) * VERTICAL_PERSPECTIVE_FACTOR * scale * perspective;
    let y = (h as f32 / 2.0 + drop) as i32;
    let color = if bullet.is_player_bullet() {
        [255, 255, 0]
    } else {
        [255, 100, 100]
    };
    surface.fill_circle((column, y), radius, color);
}

fn draw_health(surface: &mut dyn Surface, player: &Player) {
    let (w, h) = surface.size();
    let scale = ui_scale(w as f32, h as f32);
    let bar_w = scaled(200.0, scale);
    let bar_h = scaled(20.0, scale);
    let x = w as i32 - bar_w - scaled(10.0, scale);
    let y = scaled(10.0, scale);

    surface.fill_rect(x, y, bar_w, bar_h, [100, 0, 0]);
    let ratio = if player.max_hp > 0 {
        player.hp as f32 / player.max_hp as f32
    } else {
        0.0
    };
    surface.fill_rect(x, y, (bar_w as f32 * ratio) as i32, bar_h, [0, 255, 0]);
    surface.stroke_rect(x, y, bar_w, bar_h, WHITE);

    // 经验条
    let xp_y = y + bar_h + scaled(4.0, scale);
    let xp_h = scaled(6.0, scale);
    surface.fill_rect(x, xp_y, bar_w, xp_h, [30, 30, 60]);
    let xp_w = (bar_w as f32 * player.progression.fraction()) as i32;
    surface.fill_rect(x, xp_y, xp_w, xp_h, [80, 140, 255]);
}

fn draw_crosshair(surface: &mut dyn Surface, player: &Player) {
    let (w, h) = surface.size();
    let scale = ui_scale(w as f32, h as f32);
    let (cx, cy) = (w as i32 / 2, h as i32 / 2);
    let size = scaled(10.0, scale);
    let color = if player.can_shoot() { WHITE } else { [255, 0, 0] };
    surface.draw_line((cx - size, cy), (cx + size, cy), color);
    surface.draw_line((cx, cy - size), (cx, cy + size), color);
}

fn draw_flash(surface: &mut dyn Surface, player: &Player) {
    if player.shoot_flash == 0 {
        return;
    }
    let (w, h) = surface.size();
    let scale = ui_scale(w as f32, h as f32);
    let (cx, cy) = (w as i32 / 2, h as i32 / 2);
    let intensity = player.shoot_flash as f32 / SHOOT_FLASH as f32;
    let size = (30.0 * intensity * scale) as i32;
    surface.fill_circle((cx, cy), size / 2, [255, (255.0 * intensity) as u8, 0]);

    // 火花：围绕准星均匀分布，每帧转一点
    let spark = ((size / 4) as f32 * intensity).max(1.0) as i32;
    for i in 0..5 {
        let angle = i as f32 * TAU / 5.0 + player.shoot_flash as f32 * 0.7;
        let px = cx + (angle.cos() * size as f32) as i32;
        let py = cy + (angle.sin() * size as f32 / 2.0) as i32;
        surface.fill_circle((px, py), spark, [255, 200, 0]);
    }
}

/// Top-down view of the timed explorer, scaled to fit the surface
pub fn render_explorer(surface: &mut dyn Surface, explorer: &Explorer) {
    let (w, h) = surface.size();
    let grid = explorer.grid();
    surface.fill_rect(0, 0, w as i32, h as i32, [0, 0, 0]);
    if grid.width() <= 0 || grid.height() <= 0 {
        return;
    }
    let cell = (w as f32 / grid.width() as f32).min(h as f32 / grid.height() as f32);
    for y in 0..grid.height() {
        for x in 0..grid.width() {
            let kind = grid.cell(x, y).unwrap_or_default();
            if !kind.is_wall() {
                paint_cell(surface, cell, (x, y), cell_color(kind));
            }
        }
    }
    paint_cell(surface, cell, explorer.target(), TARGET_COLOR);
    paint_cell(surface, cell, explorer.player(), EXPLORER_COLOR);
}

fn paint_cell(surface: &mut dyn Surface, cell: f32, (x, y): (i32, i32), color: Rgb) {
    let px = (x as f32 * cell) as i32;
    let py = (y as f32 * cell) as i32;
    let next_x = ((x + 1) as f32 * cell) as i32;
    let next_y = ((y + 1) as f32 * cell) as i32;
    surface.fill_rect(px, py, (next_x - px).max(1), (next_y - py).max(1), color);
}

fn draw_minimap(surface: &mut dyn Surface, ecs: &ECSWorld) {
    let (w, h) = surface.size();
    let scale = ui_scale(w as f32, h as f32);
    let grid = &ecs.resources.grid;
    let size = scaled(150.0, scale);
    let origin = scaled(10.0, scale);
    let cell = size as f32 / grid.width().max(grid.height()).max(1) as f32;

    surface.fill_rect(origin, origin, size, size, [0, 0, 0]);
    for y in 0..grid.height() {
        for x in 0..grid.width() {
            if !grid.is_wall_cell(x, y) {
                continue;
            }
            let px = origin + (x as f32 * cell) as i32;
            let py = origin + (y as f32 * cell) as i32;
            let next_x = origin + ((x + 1) as f32 * cell) as i32;
            let next_y = origin + ((y + 1) as f32 * cell) as i32;
            surface.fill_rect(px, py, (next_x - px).max(1), (next_y - py).max(1), [100, 100, 100]);
        }
    }

    let to_map = |x: f32, y: f32| {
        (
            origin + (x * cell) as i32,
            origin + (y * cell) as i32,
        )
    };
    let dot = |r: f32| ((r * scale).round() as i32).max(0);

    for potion in ecs.potions() {
        surface.fill_circle(to_map(potion.x, potion.y), dot(2.0), [0, 255, 0]);
    }
    for enemy in ecs.enemies() {
        surface.fill_circle(to_map(enemy.x, enemy.y), dot(2.0), [255, 0, 0]);
    }
    let player = &ecs.resources.player;
    surface.fill_circle(to_map(player.x, player.y), dot(3.0), [255, 255, 0]);
}
