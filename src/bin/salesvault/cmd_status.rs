use anyhow::Result;

use salesvault::ops::Vault;

use crate::util::{human_size, print_json};

pub fn exec(vault: Vault, json: bool) -> Result<()> {
    let st = vault.status()?;
    if json {
        return print_json(&st);
    }

    println!("db:            {}", st.db_path.display());
    println!("snapshot dir:  {}", st.snapshot_dir.display());
    println!("tables:");
    for (name, n) in &st.tables {
        println!("  {:<16} {}", name, n);
    }
    println!(
        "integrity:     {}",
        if st.defects == 0 {
            "consistent".to_string()
        } else {
            format!("{} broken reference(s)", st.defects)
        }
    );
    match &st.latest {
        Some(i) => println!(
            "snapshots:     {} (newest {} at {}, {})",
            st.snapshots,
            i.name,
            i.created_at.to_rfc3339(),
            human_size(i.size)
        ),
        None => println!("snapshots:     0"),
    }
    println!("config:        {}", vault.config());
    Ok(())
}
