use crate::output::{print_json, print_table};
use anyhow::Context;
use std::path::Path;
use wsboot_core::snapshot::SnapshotKind;
use wsboot_core::workspace;

pub fn create(root: &Path, name: &str, json: bool) -> anyhow::Result<()> {
    let handle = workspace::snapshot(root, name)
        .with_context(|| format!("failed to snapshot '{name}'"))?;

    if json {
        let value = serde_json::json!({
            "id": handle.id,
            "path": handle.path,
            "tier": handle.manifest.tier,
            "files": handle.manifest.file_count(),
        });
        return print_json(&value);
    }

    println!(
        "Snapshot {} created ({} files)",
        handle.id,
        handle.manifest.file_count()
    );
    Ok(())
}

pub fn list(root: &Path, json: bool) -> anyhow::Result<()> {
    let snapshots = workspace::snapshots(root).context("failed to list snapshots")?;

    if json {
        let items: Vec<serde_json::Value> = snapshots
            .iter()
            .map(|s| {
                serde_json::json!({
                    "id": s.id,
                    "name": s.manifest.name,
                    "created": s.manifest.created,
                    "tier": s.manifest.tier,
                    "kind": s.manifest.kind,
                    "files": s.manifest.file_count(),
                })
            })
            .collect();
        return print_json(&items);
    }

    if snapshots.is_empty() {
        println!("No snapshots.");
        return Ok(());
    }

    let rows = snapshots
        .iter()
        .map(|s| {
            vec![
                s.id.clone(),
                s.manifest.tier.as_str().to_string(),
                match s.manifest.kind {
                    SnapshotKind::Manual => "manual".to_string(),
                    SnapshotKind::PreUpgrade => "pre-upgrade".to_string(),
                },
                s.manifest.file_count().to_string(),
            ]
        })
        .collect();
    print_table(&["ID", "TIER", "KIND", "FILES"], rows);
    Ok(())
}
