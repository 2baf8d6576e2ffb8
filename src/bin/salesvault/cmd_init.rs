use anyhow::Result;

use salesvault::ops::Vault;

pub fn exec(vault: Vault) -> Result<()> {
    vault.init()?;
    let cfg = vault.config();
    println!(
        "init: db={} snapshots={}",
        cfg.db_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default(),
        cfg.snapshot_dir().display()
    );
    Ok(())
}
