use anyhow::Result;

use salesvault::ops::Vault;

use crate::util::print_json;

pub fn exec(vault: Vault, json: bool, strict: bool) -> Result<()> {
    let rep = vault.audit_and_repair()?;
    if json {
        print_json(&rep)?;
    } else {
        println!(
            "repair: resolved={} placeholders_created={} placeholders_reused={} already_consistent={} unresolved={} remaining={}",
            rep.resolved,
            rep.placeholders_created,
            rep.placeholders_reused,
            rep.already_consistent,
            rep.unresolved.len(),
            rep.remaining
                .map(|n| n.to_string())
                .unwrap_or_else(|| "?".to_string())
        );
        for u in &rep.unresolved {
            println!("  {} [{}] {}", u.defect, u.kind, u.reason);
        }
    }
    if strict {
        rep.ensure_complete()?;
    }
    Ok(())
}

/// Dry run: defects and the planned fix for each, nothing written.
pub fn exec_plan(vault: Vault, json: bool) -> Result<()> {
    let plan = vault.plan_repair()?;
    if json {
        return print_json(&plan);
    }
    if plan.is_empty() {
        println!("repair (dry run): nothing to do");
        return Ok(());
    }
    for p in &plan {
        println!("{}  =>  {}", p.defect, p.action);
    }
    println!("repair (dry run): {} defect(s)", plan.len());
    Ok(())
}
