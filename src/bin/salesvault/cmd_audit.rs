use anyhow::{bail, Result};

use salesvault::ops::Vault;

use crate::util::print_json;

pub fn exec(vault: Vault, json: bool, strict: bool) -> Result<()> {
    let defects = vault.audit()?;
    if json {
        print_json(&defects)?;
    } else if defects.is_empty() {
        println!("audit: consistent");
    } else {
        for d in &defects {
            println!("{}", d);
        }
        println!("audit: {} broken reference(s)", defects.len());
    }
    if strict && !defects.is_empty() {
        bail!("store is not consistent: {} broken reference(s)", defects.len());
    }
    Ok(())
}
