pub mod assets;
pub mod audio;
pub mod config;
pub mod ecs;
pub mod explorer;
pub mod game_loop;
pub mod gfx;
pub mod input;
pub mod level;
pub mod logging;
pub mod renderer;
pub mod systems;
