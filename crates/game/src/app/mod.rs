mod bootstrap;
mod dialog;
mod title;
mod world;

#[cfg(test)]
mod tests;

use std::error::Error;

use tracing::info;

use engine::{FrameClock, GameConfig, GameLoop, SceneManager, SoftwareRenderer, WindowEventPump};

pub(crate) fn run() -> Result<(), Box<dyn Error>> {
    bootstrap::init_tracing();
    let settings = bootstrap::load_settings()?;
    info!(
        title = %settings.window_title,
        width = settings.window_width,
        height = settings.window_height,
        target_fps = settings.target_fps,
        debug_collision = settings.debug_collision,
        "startup"
    );

    // Map construction fails fast on configuration mistakes, before any
    // window exists.
    let village = world::build_village_scene()?;

    let events = WindowEventPump::new(
        &settings.window_title,
        settings.window_width,
        settings.window_height,
    )?;
    let renderer = SoftwareRenderer::new(events.window())?;
    let clock = FrameClock::default();

    let mut scenes = SceneManager::new(GameConfig {
        debug_collision: settings.debug_collision,
    });
    scenes.set_scene(Box::new(title::TitleScene::new(Box::new(village))));

    let mut game_loop = GameLoop::new(scenes, renderer, events, clock, settings.target_fps);
    game_loop.run();
    Ok(())
}
