//! Balance Sheet Demo
//!
//! Prints the derived statistics of one tower skin as CSV.
//!
//! ```text
//! balance_sheet [TOWER] [SKIN]
//! ```
//!
//! Settings are read from `towerlab.ron` in the working directory when it
//! exists. Set `RUST_LOG=debug` to see rebuilds and rule attachment.

use std::env;
use std::sync::Arc;
use towerlab_db::{Settings, Store, TowerManager};

const SETTINGS_FILE: &str = "towerlab.ron";

fn main() -> towerlab_db::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings = Settings::load_or_default(SETTINGS_FILE)?;
    let mut args = env::args().skip(1);
    let tower = args.next().unwrap_or_else(|| "Scout".to_string());
    let skin = args.next().unwrap_or_else(|| settings.default_skin.clone());

    let store = match &settings.database {
        Some(path) => Store::open(path)?,
        None => Store::in_memory()?,
    };
    let manager = TowerManager::new(Arc::new(store))?;

    let Some(entity) = manager.entities().get(&tower) else {
        eprintln!("Unknown tower {tower}. Available towers:");
        for name in manager.entities().names() {
            eprintln!("  {name}");
        }
        return Ok(());
    };
    tracing::info!(tower = %tower, skins = ?entity.skin_names().collect::<Vec<_>>(), "tower found");

    print!("{}", manager.csv(&tower, &skin, &settings.buffs)?);
    Ok(())
}
