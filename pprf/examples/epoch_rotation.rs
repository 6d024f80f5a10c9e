//! Example epoch rotation loop for a puncturable key store.
//!
//! Readers keep evaluating wrapping keys while a background thread
//! punctures one leaf per epoch and persists the updated store. The
//! store is written to a temporary file next to the destination and
//! renamed over it, so a crash never leaves a partially punctured store
//! on disk.
//!
//! ```sh
//! TREE_DEPTH=16 PUNCTURE_COUNT=8 cargo run --example epoch_rotation
//! ```

use std::env;
use std::io::{self, Write};
use std::ops::Range;
use std::path::{Path as FsPath, PathBuf};
use std::thread;
use std::time::Duration;

use dotenv::dotenv;
use env_logger::Env;
use log::{info, warn};
use tempfile::NamedTempFile;

use ggm_pprf::shared::SharedPprf;
use ggm_pprf::{Params, Path, PPRFError, GGM, PPRF};

const DEFAULT_TREE_DEPTH: u8 = 16;
const DEFAULT_KEY_SIZE: usize = 16;
const DEFAULT_PUNCTURE_COUNT: u64 = 5;
const DEFAULT_STORE_PATH: &str = "pprf.store";
const TREE_DEPTH_ENV_KEY: &str = "TREE_DEPTH";
const KEY_SIZE_ENV_KEY: &str = "KEY_SIZE";
const PUNCTURE_COUNT_ENV_KEY: &str = "PUNCTURE_COUNT";
const STORE_PATH_ENV_KEY: &str = "STORE_PATH";

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(val) => val.parse().unwrap_or_else(|_| {
            warn!("Could not parse {}={:?}, using default", key, val);
            default
        }),
        Err(_) => default,
    }
}

fn persist(store: &SharedPprf, dest: &FsPath) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = store.encode()?;
    let dir = dest.parent().filter(|p| !p.as_os_str().is_empty());
    let mut tmp = NamedTempFile::new_in(dir.unwrap_or_else(|| FsPath::new(".")))?;
    tmp.write_all(&bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(dest)?;
    Ok(())
}

fn load_or_setup(params: Params, dest: &FsPath) -> Result<GGM, Box<dyn std::error::Error>> {
    match std::fs::read(dest) {
        Ok(bytes) => {
            let pprf = GGM::from_bytes(&bytes)?;
            info!(
                "Loaded store from {} with {} punctures",
                dest.display(),
                pprf.num_punctures()
            );
            Ok(pprf)
        }
        // Only a missing store may be replaced; anything else would get
        // the existing store overwritten on the first persist.
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            info!("No store at {}, generating a fresh root", dest.display());
            Ok(GGM::setup(params)?)
        }
        Err(e) => Err(format!("could not read store {}: {}", dest.display(), e).into()),
    }
}

fn epochs(start: u64, count: u64) -> Range<u64> {
    start..start.saturating_add(count)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let params = Params::new(
        env_or(TREE_DEPTH_ENV_KEY, DEFAULT_TREE_DEPTH),
        env_or(KEY_SIZE_ENV_KEY, DEFAULT_KEY_SIZE),
    )?;
    let punctures = env_or(PUNCTURE_COUNT_ENV_KEY, DEFAULT_PUNCTURE_COUNT);
    let dest: PathBuf = env_or(STORE_PATH_ENV_KEY, PathBuf::from(DEFAULT_STORE_PATH));
    info!(
        "Configured with depth {}, key size {}, store {}",
        params.tree_depth(),
        params.key_size(),
        dest.display()
    );

    let store = SharedPprf::new(load_or_setup(params, &dest)?);
    let depth = params.tree_depth();
    let start = store.snapshot()?.num_punctures();

    // Epoch n wraps under leaf n; once the epoch ends the leaf is punctured.
    let background = store.clone();
    let background_dest = dest.clone();
    let rotation = thread::spawn(move || -> Result<(), PPRFError> {
        info!("Spawned background epoch rotation task");
        for epoch in epochs(start, punctures) {
            thread::sleep(Duration::from_millis(100));
            let leaf = Path::from_index(epoch, depth)?;
            info!("Epoch rotation: puncturing {}", leaf);
            background.puncture(&leaf)?;
            if let Err(e) = persist(&background, &background_dest) {
                warn!("Could not persist store: {}", e);
            }
        }
        info!("Epoch rotation complete");
        Ok(())
    });

    for epoch in epochs(start, punctures) {
        let leaf = Path::from_index(epoch, depth)?;
        match store.eval(&leaf) {
            Ok(key) => info!("Epoch {} wrapping key has {} bytes", epoch, key.len()),
            Err(e) => info!("Epoch {}: {}", epoch, e),
        }
        thread::sleep(Duration::from_millis(80));
    }

    rotation
        .join()
        .map_err(|_| "rotation thread panicked")??;
    info!(
        "Store at {} holds {} frontier entries",
        dest.display(),
        store.snapshot()?.frontier().len()
    );
    Ok(())
}
