use crate::output::{print_json, print_table};
use wsboot_core::Tier;

pub fn run(json: bool) -> anyhow::Result<()> {
    if json {
        let items: Vec<serde_json::Value> = Tier::all()
            .iter()
            .map(|t| {
                serde_json::json!({
                    "tier": t,
                    "name": t.name(),
                    "description": t.description(),
                    "required": t.required_entries().len(),
                    "make_targets": t.make_targets(),
                    "snapshot_dirs": t.snapshot_dirs(),
                })
            })
            .collect();
        return print_json(&items);
    }

    let rows = Tier::all()
        .iter()
        .map(|t| {
            vec![
                t.as_str().to_string(),
                t.name().to_string(),
                t.required_entries().len().to_string(),
                t.description().to_string(),
            ]
        })
        .collect();
    print_table(&["TIER", "NAME", "ENTRIES", "DESCRIPTION"], rows);
    Ok(())
}
