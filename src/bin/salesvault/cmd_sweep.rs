use anyhow::Result;

use salesvault::ops::Vault;

use crate::util::print_json;

pub fn exec(vault: Vault, json: bool) -> Result<()> {
    let rep = vault.sweep_placeholders()?;
    if json {
        return print_json(&rep);
    }
    println!(
        "sweep: placeholders={} deleted={} kept={} failed={}",
        rep.examined,
        rep.deleted.len(),
        rep.kept,
        rep.failed
    );
    Ok(())
}
