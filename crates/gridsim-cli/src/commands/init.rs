use std::path::Path;

use anyhow::bail;
use gridsim_core::{PolicyKind, SimConfig};

pub fn init(path: &Path, policy: PolicyKind, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    let config = SimConfig::scaffold(policy);
    std::fs::write(path, config.to_toml_string()?)?;
    println!("✓ Generated {}", path.display());
    Ok(())
}
