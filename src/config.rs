use clap::{Parser, ValueEnum};

#[derive(Parser, Debug, Clone)]
#[command(name = "flurry", version, about = "Audio-reactive snowflake particle visualizer for the terminal")]
pub struct Config {
    #[arg(long, value_enum, default_value_t = Variant::Classic)]
    pub variant: Variant,

    #[arg(long, value_enum, default_value_t = RendererMode::HalfBlock)]
    pub renderer: RendererMode,

    #[arg(long, default_value_t = 60)]
    pub fps: u32,

    #[arg(long, default_value_t = false)]
    pub list_devices: bool,

    #[arg(long)]
    pub device: Option<String>,

    /// Enable the webcam gesture freeze controller (neon variant).
    #[arg(long, default_value_t = false)]
    pub gesture: bool,

    /// Override the live particle cap (default: 4000 classic, 2000 neon).
    #[arg(long)]
    pub max_particles: Option<usize>,

    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub sync_updates: bool,
}

/// Which rendition of the visualizer runs.
///
/// Classic: 3D-rotated dot particles, star tips available.
/// Neon: depth-only projection, polygonal shards, hue drift, gesture freeze.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Variant {
    Classic,
    Neon,
}

impl Variant {
    pub fn particle_cap(self) -> usize {
        match self {
            Variant::Classic => 4000,
            Variant::Neon => 2000,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Variant::Classic => "classic",
            Variant::Neon => "neon",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Variant::Classic => Variant::Neon,
            Variant::Neon => Variant::Classic,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RendererMode {
    #[value(alias = "ansi", alias = "text")]
    Ascii,
    #[value(name = "half-block", alias = "halfblock", alias = "hb")]
    HalfBlock,
    #[value(alias = "hires", alias = "dots")]
    Braille,
}
