//! Rendering for building -> floor -> device trees (devices and clients).

use serde::Serialize;
use tabled::Tabled;

use nilo_core::{AuthState, DeviceTree, NetworkDevice};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output::{self, Palette};

use super::util::dash;

// ── Floor overrides ─────────────────────────────────────────────────

/// Force every floor group open (`Some(true)`) or shut (`Some(false)`).
pub fn apply_floor_override(tree: &mut DeviceTree, expanded: Option<bool>) {
    let Some(expanded) = expanded else {
        return;
    };
    for (building, floors) in &tree.grouping.groups {
        for floor in floors.keys() {
            if tree.expansion.is_floor_expanded(building, floor) != expanded {
                tree.expansion.toggle_floor(building, floor);
            }
        }
    }
}

/// `--expand-floors` / `--collapse-floors` as an override.
pub fn floor_override(expand: bool, collapse: bool) -> Option<bool> {
    match (expand, collapse) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

// ── Serializable view ───────────────────────────────────────────────

#[derive(Serialize)]
struct BuildingView<'a> {
    id: &'a str,
    name: &'a str,
    expanded: bool,
    floors: Vec<FloorView<'a>>,
}

#[derive(Serialize)]
struct FloorView<'a> {
    id: &'a str,
    name: &'a str,
    expanded: bool,
    devices: &'a [NetworkDevice],
}

fn views(tree: &DeviceTree) -> Vec<BuildingView<'_>> {
    let grouping = &tree.grouping;
    grouping
        .building_order
        .iter()
        .filter_map(|b| grouping.groups.get_key_value(b))
        .map(|(building, floors)| BuildingView {
            id: building,
            name: grouping.building_name(building),
            expanded: tree.expansion.is_building_expanded(building),
            floors: floors
                .iter()
                .map(|(floor, devices)| FloorView {
                    id: floor,
                    name: grouping.floor_name(floor),
                    expanded: tree.expansion.is_floor_expanded(building, floor),
                    devices,
                })
                .collect(),
        })
        .collect()
}

// ── Table rendering ─────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "MAC")]
    mac: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "IP")]
    ip: String,
    #[tabled(rename = "Port")]
    port: String,
    #[tabled(rename = "Segment")]
    segment: String,
    #[tabled(rename = "Authenticated By")]
    authenticated_by: String,
    #[tabled(rename = "ID")]
    id: String,
}

impl From<&NetworkDevice> for DeviceRow {
    fn from(d: &NetworkDevice) -> Self {
        Self {
            mac: d.mac.to_string(),
            state: d.state.to_string(),
            ip: dash(d.ip()),
            port: dash(d.port.as_deref()),
            segment: dash(d.segment_id.as_deref()),
            authenticated_by: dash(d.authenticated_by.as_deref()),
            id: dash(Some(&d.id)),
        }
    }
}

fn count_label(n: usize, noun: &str) -> String {
    let noun = if n == 1 { noun.trim_end_matches('s') } else { noun };
    format!("{n} {noun}")
}

fn state_summary(devices: &[NetworkDevice], palette: Palette) -> String {
    let waiting = devices
        .iter()
        .filter(|d| d.state == AuthState::WaitingForApproval)
        .count();
    if waiting == 0 {
        String::new()
    } else {
        format!(", {}", palette.waiting(&format!("{waiting} waiting")))
    }
}

fn render_text(buildings: &[BuildingView<'_>], noun: &str, palette: Palette) -> String {
    if buildings.is_empty() {
        return palette.muted(&format!("No {noun}"));
    }

    let mut lines = Vec::new();
    for building in buildings {
        let total: usize = building.floors.iter().map(|f| f.devices.len()).sum();
        let marker = if building.expanded { "▾" } else { "▸" };
        lines.push(format!(
            "{marker} {} {}",
            palette.building(building.name),
            palette.muted(&format!("({})", count_label(total, noun))),
        ));
        if !building.expanded {
            continue;
        }

        for floor in &building.floors {
            let marker = if floor.expanded { "▾" } else { "▸" };
            lines.push(format!(
                "  {marker} {} {}{}",
                palette.floor(floor.name),
                palette.muted(&format!("({})", count_label(floor.devices.len(), noun))),
                state_summary(floor.devices, palette),
            ));
            if floor.expanded {
                let rows: Vec<DeviceRow> = floor.devices.iter().map(DeviceRow::from).collect();
                for line in output::render_table(&rows).lines() {
                    lines.push(format!("    {line}"));
                }
            }
        }
    }
    lines.join("\n")
}

/// Render a grouped tree in the selected output format.
pub fn render(tree: &DeviceTree, noun: &str, global: &GlobalOpts) -> Result<String, CliError> {
    let buildings = views(tree);
    let palette = Palette::new(output::should_color(global.color));
    output::render_single(
        global.output,
        buildings.as_slice(),
        |b| render_text(b, noun, palette),
        |b| {
            b.iter()
                .flat_map(|b| &b.floors)
                .flat_map(|f| f.devices)
                .map(|d| d.mac.to_string())
                .collect::<Vec<_>>()
                .join("\n")
        },
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use nilo_core::{Building, Floor, GroupedView, MacAddress};

    use super::*;

    fn device(mac: &str, building: Option<&str>, floor: &str, state: AuthState) -> NetworkDevice {
        NetworkDevice {
            mac: MacAddress::new(mac),
            building_id: building.map(str::to_owned),
            floor_id: Some(floor.into()),
            state,
            ..NetworkDevice::default()
        }
    }

    fn tree(floor_default: bool) -> DeviceTree {
        let mut view = GroupedView::new(floor_default);
        view.set_items(Arc::new(vec![
            device("bb", Some("B1"), "F1", AuthState::Ok),
            device("aa", Some("B1"), "F1", AuthState::WaitingForApproval),
            device("cc", None, "F9", AuthState::Denied),
        ]));
        view.set_buildings(Arc::new(vec![Building {
            id: "B1".into(),
            name: "HQ".into(),
            ..Building::default()
        }]));
        view.set_floors(Arc::new(vec![Floor {
            id: "F1".into(),
            name: "Ground".into(),
            ..Floor::default()
        }]));
        let (grouping, expansion) = view.into_parts().unwrap();
        DeviceTree {
            grouping,
            expansion,
        }
    }

    #[test]
    fn collapsed_floors_show_only_counts() {
        let text = render_text(&views(&tree(false)), "devices", Palette::new(false));
        assert!(text.contains("▾ HQ (2 devices)"));
        assert!(text.contains("▸ Ground (2 devices), 1 waiting"));
        assert!(!text.contains("aa"));
        assert!(text.contains("Unknown Building (1 device)"));
    }

    #[test]
    fn expand_override_lists_devices_in_mac_order() {
        let mut t = tree(false);
        apply_floor_override(&mut t, floor_override(true, false));
        let text = render_text(&views(&t), "devices", Palette::new(false));
        let aa = text.find("aa").unwrap();
        let bb = text.find("bb").unwrap();
        assert!(aa < bb);
        assert!(text.contains("AUTH_WAITING_FOR_APPROVAL"));
    }

    #[test]
    fn collapse_override_closes_default_open_floors() {
        let mut t = tree(true);
        apply_floor_override(&mut t, floor_override(false, true));
        assert!(views(&t).iter().flat_map(|b| &b.floors).all(|f| !f.expanded));
    }

    #[test]
    fn buildings_follow_resolved_names() {
        let t = tree(true);
        let v = views(&t);
        let names: Vec<&str> = v.iter().map(|b| b.name).collect();
        assert_eq!(names, ["HQ", "Unknown Building"]);
    }
}
