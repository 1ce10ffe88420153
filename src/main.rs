mod app;

use std::path::PathBuf;

use bistro::LevelConfig;

fn main() {
    env_logger::init();
    log::info!("Bistro starting up");

    if let Err(e) = start() {
        log::error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

/// `bistro [level.toml] [seed]`
fn start() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let level = match args.next() {
        Some(path) => {
            let path = PathBuf::from(path);
            log::info!("loading level {}", path.display());
            LevelConfig::load(&path)?
        }
        None => LevelConfig::default(),
    };
    let seed = match args.next() {
        Some(s) => s.parse()?,
        None => fastrand::u64(..),
    };
    app::run(level, seed)
}
