//! Per-tick input snapshots built from crossterm events.

use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent,
    MouseEventKind,
};
use ratatui::layout::Rect;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::config::Difficulty;

/// Everything the simulation reads from the player in one tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputSnapshot {
    pub forward: bool,
    pub backward: bool,
    pub strafe_left: bool,
    pub strafe_right: bool,
    pub turn_left: bool,
    pub turn_right: bool,
    pub use_potion: bool,
    /// Canvas pixel to shoot at
    pub fire: Option<(f32, f32)>,
    /// SPACE / Enter on menu screens
    pub confirm: bool,
    pub restart: bool,
    pub quit: bool,
    /// Difficulty picked on the menu (0-3)
    pub select: Option<Difficulty>,
    /// Start the timed explorer
    pub explore: bool,
    /// Write the current map to a PNG
    pub export_map: bool,
}

impl InputSnapshot {
    /// +1 forward, -1 backward
    pub fn forward_axis(&self) -> f32 {
        axis(self.forward, self.backward)
    }

    /// +1 right, -1 left
    pub fn strafe_axis(&self) -> f32 {
        axis(self.strafe_right, self.strafe_left)
    }

    /// +1 clockwise (right), -1 left
    pub fn turn_axis(&self) -> f32 {
        axis(self.turn_right, self.turn_left)
    }
}

fn axis(positive: bool, negative: bool) -> f32 {
    match (positive, negative) {
        (true, false) => 1.0,
        (false, true) => -1.0,
        _ => 0.0,
    }
}

/// Source of per-tick input
pub trait InputSource {
    /// Collect input for up to `budget`, then return this tick's snapshot.
    fn poll(&mut self, budget: Duration) -> anyhow::Result<InputSnapshot>;

    /// Terminal area the canvas was last drawn into, for mouse mapping
    fn set_viewport(&mut self, _viewport: Rect, _canvas: (u16, u16)) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum HeldKey {
    Forward,
    Backward,
    StrafeLeft,
    StrafeRight,
    TurnLeft,
    TurnRight,
}

/// How long a movement key counts as held after its last press or repeat.
/// Most terminals never send key releases.
pub const HOLD_WINDOW: Duration = Duration::from_millis(120);

/// crossterm-backed input
pub struct TerminalInput {
    held: HashMap<HeldKey, Instant>,
    pending: InputSnapshot,
    viewport: Rect,
    canvas: (u16, u16),
}

impl TerminalInput {
    pub fn new(canvas: (u16, u16)) -> Self {
        Self {
            held: HashMap::new(),
            pending: InputSnapshot::default(),
            viewport: Rect::default(),
            canvas,
        }
    }

    fn crosshair(&self) -> (f32, f32) {
        (
            (self.canvas.0 / 2) as f32,
            (self.canvas.1 / 2) as f32,
        )
    }

    /// Fold one terminal event into the pending snapshot
    pub fn apply_event(&mut self, event: Event, now: Instant) {
        match event {
            Event::Key(key) => self.apply_key(key, now),
            Event::Mouse(mouse) => self.apply_mouse(mouse),
            _ => {}
        }
    }

    fn apply_key(&mut self, key: KeyEvent, now: Instant) {
        if let Some(held) = held_key(key.code) {
            match key.kind {
                KeyEventKind::Release => {
                    self.held.remove(&held);
                }
                KeyEventKind::Press | KeyEventKind::Repeat => {
                    self.held.insert(held, now);
                }
            }
            return;
        }
        if key.kind == KeyEventKind::Release {
            return;
        }
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.pending.quit = true;
            }
            KeyCode::Esc => self.pending.quit = true,
            KeyCode::Char(' ') => {
                self.pending.confirm = true;
                self.pending.fire = Some(self.crosshair());
            }
            KeyCode::Enter => self.pending.confirm = true,
            KeyCode::Char('f') | KeyCode::Char('F') => self.pending.fire = Some(self.crosshair()),
            KeyCode::Char('p') | KeyCode::Char('P') => self.pending.use_potion = true,
            KeyCode::Char('r') | KeyCode::Char('R') => self.pending.restart = true,
            KeyCode::Char('e') | KeyCode::Char('E') => self.pending.explore = true,
            KeyCode::Char('m') | KeyCode::Char('M') => self.pending.export_map = true,
            KeyCode::Char(c) if c.is_ascii_digit() => {
                if let Some(difficulty) = Difficulty::from_hotkey(c) {
                    self.pending.select = Some(difficulty);
                }
            }
            _ => {}
        }
    }

    fn apply_mouse(&mut self, mouse: MouseEvent) {
        if let MouseEventKind::Down(MouseButton::Left) = mouse.kind {
            if let Some(pixel) = self.cell_to_pixel(mouse.column, mouse.row) {
                self.pending.fire = Some(pixel);
            }
        }
    }

    /// Map a terminal cell to the canvas pixel under its centre
    pub fn cell_to_pixel(&self, column: u16, row: u16) -> Option<(f32, f32)> {
        let vp = self.viewport;
        if vp.width == 0 || vp.height == 0 {
            return None;
        }
        if column < vp.x || row < vp.y || column >= vp.x + vp.width || row >= vp.y + vp.height {
            return None;
        }
        let fx = ((column - vp.x) as f32 + 0.5) / vp.width as f32;
        let fy = ((row - vp.y) as f32 + 0.5) / vp.height as f32;
        Some((fx * self.canvas.0 as f32, fy * self.canvas.1 as f32))
    }

    /// Take the snapshot for this tick and reset one-shot actions
    pub fn snapshot(&mut self, now: Instant) -> InputSnapshot {
        self.held
            .retain(|_, pressed| now.saturating_duration_since(*pressed) <= HOLD_WINDOW);
        let mut snapshot = std::mem::take(&mut self.pending);
        for key in self.held.keys() {
            match key {
                HeldKey::Forward => snapshot.forward = true,
                HeldKey::Backward => snapshot.backward = true,
                HeldKey::StrafeLeft => snapshot.strafe_left = true,
                HeldKey::StrafeRight => snapshot.strafe_right = true,
                HeldKey::TurnLeft => snapshot.turn_left = true,
                HeldKey::TurnRight => snapshot.turn_right = true,
            }
        }
        snapshot
    }
}

fn held_key(code: KeyCode) -> Option<HeldKey> {
    match code {
        KeyCode::Char('w' | 'W' | 'z' | 'Z') | KeyCode::Up => Some(HeldKey::Forward),
        KeyCode::Char('s' | 'S') | KeyCode::Down => Some(HeldKey::Backward),
        KeyCode::Char('a' | 'A' | 'q' | 'Q') => Some(HeldKey::TurnLeft),
        KeyCode::Char('d' | 'D') => Some(HeldKey::TurnRight),
        KeyCode::Left => Some(HeldKey::StrafeLeft),
        KeyCode::Right => Some(HeldKey::StrafeRight),
        _ => None,
    }
}

impl InputSource for TerminalInput {
    fn poll(&mut self, budget: Duration) -> anyhow::Result<InputSnapshot> {
        let deadline = Instant::now() + budget;
        loop {
            let now = Instant::now();
            let remaining = deadline.saturating_duration_since(now);
            if !event::poll(remaining)? {
                break;
            }
            let event = event::read()?;
            self.apply_event(event, Instant::now());
            if Instant::now() >= deadline {
                break;
            }
        }
        Ok(self.snapshot(Instant::now()))
    }

    fn set_viewport(&mut self, viewport: Rect, canvas: (u16, u16)) {
        self.viewport = viewport;
        self.canvas = canvas;
    }
}
