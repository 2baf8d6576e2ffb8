use anyhow::Result;

use salesvault::ops::Vault;

use crate::util::print_json;

pub fn exec(vault: Vault, name: String, json: bool, strict: bool) -> Result<()> {
    let rep = vault.restore(&name)?;
    if json {
        print_json(&rep)?;
    } else {
        println!(
            "restore: from={} restored={} total={} failed={}",
            name,
            rep.restored,
            rep.total,
            rep.failed()
        );
        for f in &rep.failures {
            println!(
                "  row {} id={} [{}] {}",
                f.index,
                f.id.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string()),
                f.kind,
                f.error
            );
        }
    }
    if strict {
        rep.ensure_complete()?;
    }
    Ok(())
}
