use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cfg = flurry::config::Config::parse();
    if cfg.list_devices {
        flurry::audio::list_input_devices()?;
        return Ok(());
    }

    flurry::app::run(cfg)
}
