//! Configuration inspection commands.

use std::path::Path;

use anyhow::Context;

use crate::backends::CandidateBackends;
use crate::config::{self, Config};

/// Print backends in the order a search walks them
pub fn cmd_backends(config: &Config) {
    let backends = CandidateBackends::from_config(config);
    if backends.is_empty() {
        println!("No backends configured.");
        return;
    }

    for backend in backends.ordered() {
        println!(
            "{:>2}. {:<10} {} (timeout {} ms, container {:?})",
            backend.priority, backend.id, backend.base_url, backend.timeout_ms, backend.container
        );
        let mut extras = Vec::new();
        if backend.stream.is_some() {
            extras.push("stream resolution");
        }
        if backend.album_path_template.is_some() {
            extras.push("album listing");
        }
        if !extras.is_empty() {
            println!("    supports {}", extras.join(", "));
        }
    }
}

/// Print where the config file is read from
pub fn cmd_config_path(override_path: Option<&Path>) {
    match override_path.map(Path::to_path_buf).or_else(config::config_path) {
        Some(path) => {
            let note = if path.exists() { "" } else { " (not created yet)" };
            println!("{}{}", path.display(), note);
        }
        None => eprintln!("Could not determine config directory"),
    }
}

/// Write the default configuration, refusing to overwrite unless `force`
pub fn cmd_config_init(override_path: Option<&Path>, force: bool) -> anyhow::Result<()> {
    let path = override_path
        .map(Path::to_path_buf)
        .or_else(config::config_path)
        .context("Could not determine config directory")?;
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }

    let defaults = Config::default();
    match override_path {
        Some(path) => config::save_to(&defaults, path)?,
        None => config::save(&defaults)?,
    }
    println!("Wrote {}", path.display());
    Ok(())
}
