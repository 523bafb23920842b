//! Terminal front end: an RGB pixel canvas, the widget that shows it with
//! half-block cells, and the ratatui renderer for every game screen.

use crossterm::execute;
use crossterm::terminal::{Clear, ClearType};
use image::RgbaImage;
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear as ClearWidget, Paragraph, Widget, Wrap},
};
use std::io::{self, Stdout};
use strum::IntoEnumIterator;

use crate::assets::SpriteRepository;
use crate::config::{Difficulty, GameConfig};
use crate::explorer::ExplorerOutcome;
use crate::game_loop::{Game, GameStatus};
use crate::renderer::{Renderer, Rgb, Surface, render_explorer, render_frame};

/// 内存中的 RGB 画布
#[derive(Debug, Clone, PartialEq)]
pub struct PixelCanvas {
    width: u32,
    height: u32,
    pixels: Vec<Rgb>,
}

impl PixelCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![[0, 0, 0]; width as usize * height as usize],
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get(self.index(x, y)).copied()
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    fn put(&mut self, x: i32, y: i32, color: Rgb) {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return;
        }
        let i = self.index(x as u32, y as u32);
        self.pixels[i] = color;
    }
}

impl Surface for PixelCanvas {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: Rgb) {
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = x.saturating_add(w).min(self.width as i32);
        let y1 = y.saturating_add(h).min(self.height as i32);
        for py in y0..y1 {
            let row = py as usize * self.width as usize;
            for px in x0..x1 {
                self.pixels[row + px as usize] = color;
            }
        }
    }

    /// Bresenham, both endpoints included
    fn draw_line(&mut self, from: (i32, i32), to: (i32, i32), color: Rgb) {
        let (mut x, mut y) = from;
        let dx = (to.0 - x).abs();
        let dy = -(to.1 - y).abs();
        let sx = if x < to.0 { 1 } else { -1 };
        let sy = if y < to.1 { 1 } else { -1 };
        let mut err = dx + dy;
        loop {
            self.put(x, y, color);
            if (x, y) == to {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    fn blit_scaled(&mut self, sprite: &RgbaImage, x: i32, y: i32, w: i32, h: i32, tint: Rgb) {
        if w <= 0 || h <= 0 || sprite.width() == 0 || sprite.height() == 0 {
            return;
        }
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = x.saturating_add(w).min(self.width as i32);
        let y1 = y.saturating_add(h).min(self.height as i32);
        for py in y0..y1 {
            let sy = ((py - y) as u64 * sprite.height() as u64 / h as u64) as u32;
            for px in x0..x1 {
                let sx = ((px - x) as u64 * sprite.width() as u64 / w as u64) as u32;
                let [r, g, b, a] = sprite.get_pixel(sx, sy).0;
                if a < 128 {
                    continue;
                }
                let color = [
                    (u16::from(r) * u16::from(tint[0]) / 255) as u8,
                    (u16::from(g) * u16::from(tint[1]) / 255) as u8,
                    (u16::from(b) * u16::from(tint[2]) / 255) as u8,
                ];
                self.put(px, py, color);
            }
        }
    }
}

/// Shows a canvas with "▀" cells: foreground is the upper pixel,
/// background the lower one. The canvas is stretched to fill the area.
pub struct CanvasWidget<'a> {
    canvas: &'a PixelCanvas,
}

impl<'a> CanvasWidget<'a> {
    pub fn new(canvas: &'a PixelCanvas) -> Self {
        Self { canvas }
    }
}

impl Widget for CanvasWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let (cw, ch) = self.canvas.size();
        if area.width == 0 || area.height == 0 || cw == 0 || ch == 0 {
            return;
        }
        let rows = u32::from(area.height) * 2;
        for row in 0..area.height {
            let top_y = u32::from(row) * 2 * ch / rows;
            let bottom_y = (u32::from(row) * 2 + 1) * ch / rows;
            for col in 0..area.width {
                let x = u32::from(col) * cw / u32::from(area.width);
                let top = self.canvas.pixel(x, top_y).unwrap_or_default();
                let bottom = self.canvas.pixel(x, bottom_y).unwrap_or_default();
                if let Some(cell) = buf.cell_mut((area.x + col, area.y + row)) {
                    cell.set_symbol("▀")
                        .set_fg(Color::Rgb(top[0], top[1], top[2]))
                        .set_bg(Color::Rgb(bottom[0], bottom[1], bottom[2]));
                }
            }
        }
    }
}

/// Draw whichever screen the game is on. Returns the area the 3D view
/// occupies, if one was drawn.
pub fn draw_game(
    frame: &mut Frame,
    game: &Game,
    canvas: &mut PixelCanvas,
    sprites: &SpriteRepository,
) -> Option<Rect> {
    let area = frame.area();
    match game.status() {
        GameStatus::Instructions => {
            draw_instructions(frame, area, game);
            None
        }
        GameStatus::Running => draw_view(frame, area, game, canvas, sprites),
        GameStatus::LevelCleared => {
            let view = draw_view(frame, area, game, canvas, sprites);
            draw_level_cleared(frame, area, game);
            view
        }
        GameStatus::GameOver => {
            draw_game_over(frame, area, game);
            None
        }
        GameStatus::Exploring => {
            draw_explorer(frame, area, game);
            None
        }
        GameStatus::ExplorerFinished => {
            draw_explorer(frame, area, game);
            draw_explorer_result(frame, area, game);
            None
        }
    }
}

fn draw_view(
    frame: &mut Frame,
    area: Rect,
    game: &Game,
    canvas: &mut PixelCanvas,
    sprites: &SpriteRepository,
) -> Option<Rect> {
    let sim = game.simulation()?;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(area);

    render_frame(canvas, &sim.ecs, sprites);
    frame.render_widget(CanvasWidget::new(canvas), chunks[0]);
    frame.render_widget(status_line(game), chunks[1]);
    Some(chunks[0])
}

/// 底部状态栏
fn status_line(game: &Game) -> Paragraph<'static> {
    let Some(sim) = game.simulation() else {
        return Paragraph::new("");
    };
    let player = sim.player();
    let hp_color = if player.hp * 4 <= player.max_hp {
        Color::Red
    } else {
        Color::Green
    };
    let sep = || Span::styled(" | ", Style::default().fg(Color::DarkGray));
    let mut line = Line::from(vec![
        Span::styled(
            format!("HP {}/{}", player.hp, player.max_hp),
            Style::default().fg(hp_color).add_modifier(Modifier::BOLD),
        ),
        sep(),
        Span::styled(
            format!("Potions {}", player.potions),
            Style::default().fg(Color::LightGreen),
        ),
        sep(),
        Span::styled(format!("Lv {}", player.level()), Style::default().fg(Color::Yellow)),
        sep(),
        Span::raw(format!(
            "XP {}/{}",
            player.progression.xp,
            player.progression.xp_to_next_level
        )),
        sep(),
        Span::raw(format!("Kills {}", game.total_kills())),
        sep(),
        Span::styled(format!("Depth {}", sim.depth()), Style::default().fg(Color::Cyan)),
        sep(),
        Span::raw(format!("Enemies {}", sim.ecs.living_enemy_count())),
    ]);
    if let Some(notice) = game.notice() {
        line.push_span(sep());
        line.push_span(Span::styled(notice.to_string(), Style::default().fg(Color::Magenta)));
    }
    Paragraph::new(line).style(Style::default().bg(Color::Black))
}

/// 限时探索：整张地图一格一像素，由画布控件拉伸到终端
fn draw_explorer(frame: &mut Frame, area: Rect, game: &Game) {
    let Some(explorer) = game.explorer() else {
        return;
    };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(area);

    let grid = explorer.grid();
    let mut canvas = PixelCanvas::new(grid.width().max(1) as u32, grid.height().max(1) as u32);
    render_explorer(&mut canvas, explorer);
    frame.render_widget(CanvasWidget::new(&canvas), chunks[0]);

    let remaining = explorer.remaining_seconds();
    let time_color = if remaining <= 5 { Color::Red } else { Color::White };
    let sep = || Span::styled(" | ", Style::default().fg(Color::DarkGray));
    let mut line = Line::from(vec![
        Span::styled(
            format!("Time: {remaining}s"),
            Style::default().fg(time_color).add_modifier(Modifier::BOLD),
        ),
        sep(),
        Span::styled(
            format!("Difficulty {}", explorer.difficulty()),
            Style::default().fg(Color::Cyan),
        ),
        sep(),
        Span::raw("Reach the red stairs"),
    ]);
    if let Some(notice) = game.notice() {
        line.push_span(sep());
        line.push_span(Span::styled(notice.to_string(), Style::default().fg(Color::Magenta)));
    }
    frame.render_widget(
        Paragraph::new(line).style(Style::default().bg(Color::Black)),
        chunks[1],
    );
}

fn draw_explorer_result(frame: &mut Frame, area: Rect, game: &Game) {
    let Some(explorer) = game.explorer() else {
        return;
    };
    let (title, color, label) = match explorer.outcome() {
        ExplorerOutcome::Won => ("VICTORY!", Color::Green, "Time"),
        _ => ("TIME'S UP!", Color::Red, "Duration"),
    };
    let lines = vec![
        Line::from(Span::styled(
            title,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(format!("{label}: {:.1}s", explorer.elapsed_seconds())),
        Line::from(""),
        Line::from("Press R to play again, SPACE for the menu or Esc to quit"),
    ];
    let popup = centered_rect(area, 60, 40);
    frame.render_widget(ClearWidget, popup);
    frame.render_widget(
        Paragraph::new(lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(color)),
            )
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true }),
        popup,
    );
}

fn draw_instructions(frame: &mut Frame, area: Rect, game: &Game) {
    let key = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);
    let mut lines = vec![
        Line::from(Span::styled(
            "TERMINAL RAYCAST DUNGEON",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(vec![Span::styled("W / S", key), Span::raw("  move forward / back")]),
        Line::from(vec![Span::styled("A / D", key), Span::raw("  turn left / right")]),
        Line::from(vec![Span::styled("← / →", key), Span::raw("  strafe")]),
        Line::from(vec![Span::styled("Click / F", key), Span::raw("  shoot")]),
        Line::from(vec![Span::styled("P", key), Span::raw("  drink a potion")]),
        Line::from(vec![Span::styled("M", key), Span::raw("  save the map as PNG")]),
        Line::from(vec![Span::styled("Esc", key), Span::raw("  quit")]),
        Line::from(""),
        Line::from("Kill every enemy to clear the level."),
        Line::from(""),
        difficulty_line(game.config().difficulty),
        Line::from(vec![
            Span::styled("E", key),
            Span::raw(format!(
                "  timed explorer: reach the down stairs in {}s",
                game.config().difficulty.explorer_time_limit().as_secs()
            )),
        ]),
        Line::from(""),
    ];
    let prompt = if game.saves().has_save() {
        "Press SPACE to continue your saved game"
    } else {
        "Press SPACE to start"
    };
    lines.push(Line::from(Span::styled(
        prompt,
        Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
    )));

    let popup = centered_rect(area, 70, 90);
    let block = Block::default()
        .title(" How to play ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    frame.render_widget(ClearWidget, popup);
    frame.render_widget(
        Paragraph::new(lines)
            .block(block)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true }),
        popup,
    );
}

/// "0 classic 1 easy 2 medium 3 hard" with the current pick highlighted
fn difficulty_line(current: Difficulty) -> Line<'static> {
    let mut spans = vec![Span::raw("Difficulty: ")];
    for (i, difficulty) in Difficulty::iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw("  "));
        }
        let style = if difficulty == current {
            Style::default().fg(Color::Black).bg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };
        spans.push(Span::styled(format!("{i} {difficulty}"), style));
    }
    Line::from(spans)
}

fn draw_level_cleared(frame: &mut Frame, area: Rect, game: &Game) {
    let (depth, kills) = game
        .simulation()
        .map(|sim| (sim.depth(), sim.kills()))
        .unwrap_or_default();
    let lines = vec![
        Line::from(Span::styled(
            format!("LEVEL {depth} CLEARED"),
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(format!("Enemies killed: {kills}")),
        Line::from(format!("Time: {}s", game.level_seconds())),
        Line::from(""),
        Line::from("Press SPACE to descend"),
    ];
    let popup = centered_rect(area, 50, 40);
    frame.render_widget(ClearWidget, popup);
    frame.render_widget(
        Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL))
            .alignment(Alignment::Center),
        popup,
    );
}

fn draw_game_over(frame: &mut Frame, area: Rect, game: &Game) {
    let depth = game.simulation().map(|sim| sim.depth()).unwrap_or(1);
    let background = Paragraph::new("").style(Style::default().bg(Color::Black));
    frame.render_widget(background, area);

    let lines = vec![
        Line::from(Span::styled(
            "GAME OVER",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(format!("Reached depth {depth}")),
        Line::from(format!("Enemies killed: {}", game.total_kills())),
        Line::from(format!("Time on level: {}s", game.level_seconds())),
        Line::from(""),
        Line::from("Press R to restart or Esc to quit"),
    ];
    let popup = centered_rect(area, 50, 50);
    frame.render_widget(
        Paragraph::new(lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Red)),
            )
            .alignment(Alignment::Center),
        popup,
    );
}

fn centered_rect(r: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

/// ratatui + crossterm renderer. Raw mode and the alternate screen are
/// owned by `main`.
pub struct TerminalRenderer {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    canvas: PixelCanvas,
    sprites: SpriteRepository,
    viewport: Option<Rect>,
}

impl TerminalRenderer {
    pub fn new(config: &GameConfig, sprites: SpriteRepository) -> anyhow::Result<Self> {
        let terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
        Ok(Self {
            terminal,
            canvas: PixelCanvas::new(
                u32::from(config.canvas_width),
                u32::from(config.canvas_height),
            ),
            sprites,
            viewport: None,
        })
    }
}

impl Renderer for TerminalRenderer {
    fn init(&mut self) -> anyhow::Result<()> {
        execute!(io::stdout(), Clear(ClearType::All))?;
        self.terminal.hide_cursor()?;
        self.terminal.clear()?;
        Ok(())
    }

    fn draw(&mut self, game: &Game) -> anyhow::Result<()> {
        let Self {
            terminal,
            canvas,
            sprites,
            viewport,
        } = self;
        let mut shown = None;
        terminal.draw(|frame| {
            shown = draw_game(frame, game, canvas, sprites);
        })?;
        *viewport = shown;
        Ok(())
    }

    fn canvas_viewport(&self) -> Option<Rect> {
        self.viewport
    }

    fn cleanup(&mut self) -> anyhow::Result<()> {
        self.terminal.show_cursor()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use pretty_assertions::assert_eq;

    #[test]
    fn fill_rect_clips_to_the_canvas() {
        let mut canvas = PixelCanvas::new(4, 4);
        canvas.fill_rect(-2, -2, 4, 4, [9, 9, 9]);
        assert_eq!(canvas.pixel(0, 0), Some([9, 9, 9]));
        assert_eq!(canvas.pixel(1, 1), Some([9, 9, 9]));
        assert_eq!(canvas.pixel(2, 2), Some([0, 0, 0]));
        canvas.fill_rect(3, 3, 100, 100, [1, 2, 3]);
        assert_eq!(canvas.pixel(3, 3), Some([1, 2, 3]));
        assert_eq!(canvas.pixel(4, 4), None);
    }

    #[test]
    fn lines_include_both_endpoints() {
        let mut canvas = PixelCanvas::new(10, 10);
        canvas.draw_line((1, 1), (8, 4), [255, 0, 0]);
        assert_eq!(canvas.pixel(1, 1), Some([255, 0, 0]));
        assert_eq!(canvas.pixel(8, 4), Some([255, 0, 0]));

        let mut dot = PixelCanvas::new(3, 3);
        dot.draw_line((1, 1), (1, 1), [1, 1, 1]);
        assert_eq!(dot.pixel(1, 1), Some([1, 1, 1]));
    }

    #[test]
    fn blit_tints_and_skips_transparent_pixels() {
        let mut sprite = RgbaImage::new(2, 1);
        sprite.put_pixel(0, 0, Rgba([200, 100, 50, 255]));
        sprite.put_pixel(1, 0, Rgba([255, 255, 255, 0]));

        let mut canvas = PixelCanvas::new(4, 2);
        canvas.blit_scaled(&sprite, 0, 0, 4, 2, [255, 127, 0]);
        assert_eq!(canvas.pixel(0, 0), Some([200, 49, 0]));
        assert_eq!(canvas.pixel(1, 1), Some([200, 49, 0]));
        // 透明部分保持原样
        assert_eq!(canvas.pixel(3, 0), Some([0, 0, 0]));
    }

    #[test]
    fn widget_packs_two_rows_per_cell() {
        let mut canvas = PixelCanvas::new(2, 2);
        canvas.fill_rect(0, 0, 2, 1, [255, 0, 0]);
        canvas.fill_rect(0, 1, 2, 1, [0, 0, 255]);

        let area = Rect::new(0, 0, 2, 1);
        let mut buf = Buffer::empty(area);
        CanvasWidget::new(&canvas).render(area, &mut buf);

        let cell = &buf[(1, 0)];
        assert_eq!(cell.symbol(), "▀");
        assert_eq!(cell.fg, Color::Rgb(255, 0, 0));
        assert_eq!(cell.bg, Color::Rgb(0, 0, 255));
    }
}
