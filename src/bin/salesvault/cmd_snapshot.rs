use anyhow::{anyhow, Result};

use salesvault::ops::Vault;

use crate::util::{human_size, print_json};

/// Export all tables into a new artifact and print its name and counts.
pub fn exec_create(vault: Vault, name: Option<String>, json: bool, strict: bool) -> Result<()> {
    let out = vault.snapshot(name.as_deref())?;
    if json {
        print_json(&out)?;
    } else {
        println!(
            "snapshot: name={} path={} rows={}",
            out.export.name,
            out.export.path.display(),
            out.export.total_rows()
        );
        for (table, n) in &out.export.counts {
            println!("  {:<16} {}", table, n);
        }
        if !out.export.incomplete.is_empty() {
            println!("  incomplete: {}", out.export.incomplete.join(", "));
        }
        for p in &out.pruned {
            println!("pruned: {}", p);
        }
    }
    if strict {
        out.export.ensure_complete()?;
    }
    Ok(())
}

pub fn exec_list(vault: Vault, json: bool) -> Result<()> {
    let list = vault.list_snapshots()?;
    if json {
        return print_json(&list);
    }
    if list.is_empty() {
        println!("(no snapshots)");
        return Ok(());
    }
    for i in list {
        println!(
            "{:<32} {:>10}  {}{}",
            i.name,
            human_size(i.size),
            i.created_at.to_rfc3339(),
            if i.alias { "  (alias)" } else { "" }
        );
    }
    Ok(())
}

pub fn exec_inspect(vault: Vault, name: String, json: bool) -> Result<()> {
    if name.trim().is_empty() {
        return Err(anyhow!("provide snapshot name"));
    }
    let s = vault.inspect_snapshot(&name)?;
    if json {
        return print_json(&s);
    }
    println!("name:       {}", s.name);
    println!("created_at: {}", s.created_at.to_rfc3339());
    println!("version:    {}", s.version);
    println!("size:       {} ({} B)", human_size(s.size), s.size);
    println!("sha256:     {}", s.sha256);
    if !s.incomplete.is_empty() {
        println!("incomplete: {}", s.incomplete.join(", "));
    }
    println!("tables:");
    for (table, n) in &s.counts {
        println!("  {:<16} {}", table, n);
    }
    Ok(())
}

pub fn exec_prune(vault: Vault, keep: usize) -> Result<()> {
    let deleted = vault.prune_snapshots(keep)?;
    if deleted.is_empty() {
        println!("prune: nothing to delete (keep={})", keep);
    } else {
        for n in &deleted {
            println!("pruned: {}", n);
        }
        println!("prune: deleted={} keep={}", deleted.len(), keep);
    }
    Ok(())
}
