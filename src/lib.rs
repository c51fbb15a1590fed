pub mod app;
pub mod audio;
pub mod beat;
pub mod config;
pub mod emitter;
pub mod flake;
pub mod gesture;
pub mod render;
pub mod scene;
pub mod spectrum;
pub mod terminal;
