//! Odyssey save - operator tool
//!
//! Inspects or seeds a save directory using the same store and coordinator
//! the game embeds.
//!
//! ```text
//! odyssey-save [--config FILE] show
//! odyssey-save [--config FILE] collect ID...
//! odyssey-save [--config FILE] where
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};

use odyssey_save::config::{BackendKind, SaveConfig};
use odyssey_save::save::{
    DurableStore, EmptyWorld, FilePrefs, KeyValueStore, LoadSource, SaveCoordinator,
};

const DEFAULT_CONFIG: &str = "odyssey.ron";
const PREFS_FILE_NAME: &str = "prefs.json";

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let config_path = match args.iter().position(|a| a == "--config") {
        Some(i) => {
            if i + 1 >= args.len() {
                bail!("--config needs a file argument");
            }
            let path = PathBuf::from(args.remove(i + 1));
            args.remove(i);
            path
        }
        None => PathBuf::from(DEFAULT_CONFIG),
    };

    let config = SaveConfig::load(&config_path);
    log::info!("Starting odyssey-save v{}", env!("CARGO_PKG_VERSION"));

    let prefs: Arc<dyn KeyValueStore> = Arc::new(
        FilePrefs::open(config.save_root().join(PREFS_FILE_NAME))
            .context("opening preference store")?,
    );
    let store = DurableStore::from_config(&config, Some(Arc::clone(&prefs)));

    let command = args.first().map(String::as_str).unwrap_or("show");
    match command {
        "where" => {
            println!("{}", store.location());
            if config.backend == BackendKind::KeyValue {
                println!("{}", config.save_root().join(PREFS_FILE_NAME).display());
            }
        }
        "show" => {
            match store.read().context("reading save data")? {
                Some(record) => println!("{}", record.to_json(true)?),
                None => println!("no save data at {}", store.location()),
            }
        }
        "collect" => {
            let ids = args.get(1..).unwrap_or_default();
            if ids.is_empty() {
                bail!("collect needs at least one collectible id");
            }

            let mut coordinator = SaveCoordinator::new(store, config)
                .context("starting save writer")?
                .with_legacy_flags(prefs);
            let report = coordinator.load(&mut EmptyWorld);
            if let LoadSource::ReadFailed(e) = &report.source {
                bail!("refusing to overwrite unreadable save: {}", e);
            }

            for id in ids {
                if !coordinator.register_collectible(id) {
                    println!("skipped {:?} (already collected or invalid)", id);
                }
            }
            coordinator.shutdown().context("writing save data")?;
            println!("{} collectible(s) recorded", coordinator.collected_ids().len());
        }
        other => bail!("unknown command {:?} (expected show, collect or where)", other),
    }

    Ok(())
}
