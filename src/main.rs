//! Mockup Studio: drop a UI screenshot onto a 3D phone, frame the shot,
//! export it as PNG and keep the composition as a JSON project.

mod app;
mod assets;
mod config;
mod render;
mod scene;
mod ui;

fn main() -> eframe::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let result = app::run();
    log::info!("Mockup Studio closed");
    result
}
