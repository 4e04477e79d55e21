mod app;
mod assets;
mod config;
mod objects;
mod params;
mod render;
mod scene;
mod ui;

fn main() {
    app::run();
}
