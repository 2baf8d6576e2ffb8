use std::path::PathBuf;

use salesvault::config::{VaultBuilder, VaultConfig, DEFAULT_PLACEHOLDER_PREFIX};

#[test]
fn defaults_are_conservative() {
    let cfg = VaultConfig::default();
    assert!(cfg.db_path.is_none());
    assert!(cfg.snapshot_keep.is_none());
    assert!(!cfg.snapshot_gzip);
    assert!(!cfg.foreign_keys);
    assert_eq!(cfg.busy_timeout_ms, 5000);
    assert_eq!(cfg.placeholder_prefix, DEFAULT_PLACEHOLDER_PREFIX);
    assert!(cfg.fallback_representative.is_none());

    let opts = cfg.store_options();
    assert!(!opts.foreign_keys);
    assert_eq!(opts.busy_timeout_ms, 5000);
}

#[test]
fn snapshot_dir_resolves_against_db_dir() {
    let base = VaultBuilder::from_default().db_path("/srv/sales/app.db");

    let cfg = base.clone().build();
    assert_eq!(cfg.snapshot_dir(), PathBuf::from("/srv/sales/backups"));

    let cfg = base.clone().snapshot_dir("nightly").build();
    assert_eq!(cfg.snapshot_dir(), PathBuf::from("/srv/sales/nightly"));

    let cfg = base.snapshot_dir("/var/backups/sales").build();
    assert_eq!(cfg.snapshot_dir(), PathBuf::from("/var/backups/sales"));

    // no database configured: relative to the working directory
    let cfg = VaultConfig::default();
    assert_eq!(cfg.snapshot_dir(), PathBuf::from("backups"));
}

#[test]
fn builder_and_overrides_feed_the_repair_policy() {
    let cfg = VaultBuilder::from_default()
        .db_path("/tmp/x.db")
        .snapshot_keep(Some(5))
        .snapshot_gzip(true)
        .foreign_keys(true)
        .busy_timeout_ms(250)
        .placeholder_prefix("HIST_")
        .fallback_representative(Some(3))
        .build();
    assert_eq!(cfg.snapshot_keep, Some(5));
    assert!(cfg.snapshot_gzip);
    assert_eq!(cfg.store_options().busy_timeout_ms, 250);
    assert!(cfg.store_options().foreign_keys);

    let policy = cfg.repair_policy();
    assert_eq!(policy.placeholder_prefix, "HIST_");
    assert_eq!(policy.fallback_representative, Some(3));

    // `None` overrides leave configured values alone
    let cfg = cfg
        .with_snapshot_keep(None)
        .with_fallback_representative(None)
        .with_db_path(None::<PathBuf>);
    assert_eq!(cfg.snapshot_keep, Some(5));
    assert_eq!(cfg.fallback_representative, Some(3));
    assert_eq!(cfg.db_path, Some(PathBuf::from("/tmp/x.db")));

    let shown = cfg.to_string();
    assert!(shown.contains("placeholder_prefix: HIST_"), "{shown}");
    assert!(shown.contains("snapshot_keep: 5"), "{shown}");
}

#[test]
fn env_variables_are_read() {
    // the only test in this binary touching SV_* variables
    std::env::set_var("SV_DB_PATH", "/data/sales.db");
    std::env::set_var("SV_SNAPSHOT_DIR", "snaps");
    std::env::set_var("SV_SNAPSHOT_KEEP", "7");
    std::env::set_var("SV_SNAPSHOT_GZIP", "yes");
    std::env::set_var("SV_FOREIGN_KEYS", "1");
    std::env::set_var("SV_FALLBACK_REP", "not-a-number");

    let cfg = VaultBuilder::new().build();
    assert_eq!(cfg.db_path, Some(PathBuf::from("/data/sales.db")));
    assert_eq!(cfg.snapshot_dir(), PathBuf::from("/data/snaps"));
    assert_eq!(cfg.snapshot_keep, Some(7));
    assert!(cfg.snapshot_gzip);
    assert!(cfg.foreign_keys);
    assert_eq!(cfg.fallback_representative, None);

    for k in [
        "SV_DB_PATH",
        "SV_SNAPSHOT_DIR",
        "SV_SNAPSHOT_KEEP",
        "SV_SNAPSHOT_GZIP",
        "SV_FOREIGN_KEYS",
        "SV_FALLBACK_REP",
    ] {
        std::env::remove_var(k);
    }
}
