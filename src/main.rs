use anyhow::Context;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use scopeguard::defer;
use std::io;
use tracing::{info, warn};

use terminal_raycast_dungeon::{
    assets::{DirectorySpriteProvider, SpriteRepository},
    audio::TerminalBell,
    config::GameConfig,
    game_loop::{Game, run},
    gfx::TerminalRenderer,
    input::TerminalInput,
    logging,
    renderer::GameClock,
};

fn main() -> anyhow::Result<()> {
    let (config, config_error) = GameConfig::load();
    logging::init(&config.log_path)?;
    if let Some(err) = config_error {
        warn!(%err, "config unusable, falling back to defaults");
    }
    info!(difficulty = %config.difficulty, tick_rate = config.tick_rate, "starting");

    let sprites = SpriteRepository::load(&DirectorySpriteProvider::new(&config.sprite_dir));

    // 无论如何退出都要还原终端
    defer! {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), DisableMouseCapture, LeaveAlternateScreen);
    }
    enable_raw_mode().context("Failed to enable raw mode")?;
    execute!(io::stdout(), EnterAlternateScreen, EnableMouseCapture)
        .context("Failed to enter alternate screen")?;

    let mut renderer = TerminalRenderer::new(&config, sprites)?;
    let mut input = TerminalInput::new((config.canvas_width, config.canvas_height));
    let mut audio = TerminalBell::new(io::stdout());
    let clock = GameClock::new(config.tick_duration());

    let mut game = Game::new(config);
    run(&mut game, &mut renderer, &mut input, &mut audio, &clock)
}
