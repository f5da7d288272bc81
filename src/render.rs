//! Tables for stdout.

use comfy_table::presets::UTF8_FULL;
use comfy_table::Table;

use crate::grid::{CapacityNode, MachineRecord};
use crate::profile::Profile;
use crate::units::format_size;

fn table_with_header(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(header);
    table
}

/// Two-column key/value table, no header.
pub fn key_values(pairs: &[(&str, String)]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    for (key, value) in pairs {
        table.add_row(vec![key.to_string(), value.clone()]);
    }
    table
}

pub fn profile(profile: &Profile) -> Table {
    key_values(&[
        ("mnemonic", profile.masked_mnemonic()),
        ("network", profile.network.clone()),
        ("ssh_key", profile.ssh_key.clone()),
        ("balance", profile.balance.clone()),
        ("twin_id", profile.twin_id.clone()),
    ])
}

pub fn nodes(nodes: &[CapacityNode]) -> Table {
    let mut table = table_with_header(vec![
        "nodeId", "farmId", "healthy", "rentable", "CPU", "Memory", "HDD", "SSD", "status",
        "country",
    ]);
    for node in nodes {
        let free = node.available();
        table.add_row(vec![
            node.node_id.to_string(),
            node.farm_id.to_string(),
            node.healthy.to_string(),
            node.rentable.to_string(),
            node.total.cpu.to_string(),
            format_size(free.memory),
            format_size(free.hdd),
            format_size(free.ssd),
            node.status.to_string(),
            node.country.clone(),
        ]);
    }
    table
}

pub fn machines(machines: &[MachineRecord]) -> Table {
    let mut table = table_with_header(vec![
        "name",
        "nodeId",
        "publicIP",
        "myceliumIP",
        "planetaryIP",
        "contractId",
    ]);
    let or_dash = |ip: &Option<String>| ip.clone().unwrap_or_else(|| "-".into());
    for m in machines {
        table.add_row(vec![
            m.name.clone(),
            m.node_id.to_string(),
            or_dash(&m.public_ip),
            or_dash(&m.mycelium_ip),
            or_dash(&m.planetary_ip),
            m.contract_id.to_string(),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::testing::node;

    /// Content lines only, box-drawing separators dropped.
    fn rows(table: &Table) -> Vec<String> {
        table
            .to_string()
            .lines()
            .filter(|line| line.starts_with('│'))
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn profile_table_masks_mnemonic() {
        let out = profile(&crate::profile::tests::connected_profile()).to_string();
        assert!(out.contains("abandon ****"));
        assert!(!out.contains("about"));

        let lines = rows(&profile(&crate::profile::tests::connected_profile()));
        assert_eq!(lines.len(), 5);
        assert!(lines[1].contains("network") && lines[1].contains("dev"));
    }

    #[test]
    fn node_table_shows_free_capacity() {
        let mut n = node(7, 8, 16, 100);
        n.used.memory = 4 * crate::grid::testing::GIB;
        let lines = rows(&nodes(&[n]));
        assert!(lines[0].contains("nodeId"));
        assert!(lines[1].starts_with("│ 7 "));
        assert!(lines[1].contains("12.0 GiB"));
        assert!(lines[1].contains("Belgium"));
    }

    #[test]
    fn machine_table_fills_missing_ips() {
        let table = machines(&[MachineRecord {
            name: "vm1".into(),
            node_id: 3,
            contract_id: 1000,
            mycelium_ip: Some("4b5:1::2".into()),
            ..MachineRecord::default()
        }]);
        let lines = rows(&table);
        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains("4b5:1::2"));
        assert!(lines[1].contains("│ - "));
        assert!(lines[1].contains("1000"));
    }
}
