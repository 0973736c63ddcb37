use fs_err as fs;
use serde_json::to_string_pretty;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::wire::Instruction;

/// Installs the global subscriber. `RUST_LOG` wins over the default level.
pub fn init_tracing(debug: bool) {
    let default = if debug { "sitegen=debug,tower_http=debug,info" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_target(false).try_init();
}

pub struct SavedPaths {
    pub dir: PathBuf,
    pub prompt: PathBuf,
    pub completion: PathBuf,
}

fn site_dir(root: &Path, site: Uuid) -> PathBuf {
    root.join(site.to_string())
}

/// Keeps the prompt and the raw completion of one generation on disk, for
/// looking at responses the repair stages struggled with.
pub fn save_generation(
    root: &Path,
    site: Uuid,
    ins: &Instruction,
    raw: &str,
) -> anyhow::Result<SavedPaths> {
    let dir = site_dir(root, site);
    fs::create_dir_all(&dir)?;

    let prompt = dir.join("prompt.json");
    fs::write(&prompt, to_string_pretty(ins)?)?;

    let completion = dir.join("completion.txt");
    fs::write(&completion, raw)?;

    Ok(SavedPaths { dir, prompt, completion })
}
