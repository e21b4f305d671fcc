// ── Expand / collapse state ──
//
// Derived entirely from the latest grouping. Rebuilding it after a
// refetch discards earlier toggles.

use std::collections::HashMap;

use crate::reconcile::Grouping;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpansionState {
    buildings: HashMap<String, bool>,
    /// Keyed by `"{building}-{floor}"`.
    floors: HashMap<String, bool>,
    floor_default: bool,
}

impl ExpansionState {
    /// Every building starts expanded; floors start at `floor_default`.
    pub fn from_grouping<T>(grouping: &Grouping<T>, floor_default: bool) -> Self {
        let mut buildings = HashMap::new();
        let mut floors = HashMap::new();
        for (building, by_floor) in &grouping.groups {
            buildings.insert(building.clone(), true);
            for floor in by_floor.keys() {
                floors.insert(Self::floor_key(building, floor), floor_default);
            }
        }
        Self {
            buildings,
            floors,
            floor_default,
        }
    }

    pub fn floor_key(building: &str, floor: &str) -> String {
        format!("{building}-{floor}")
    }

    pub fn is_building_expanded(&self, building: &str) -> bool {
        self.buildings.get(building).copied().unwrap_or(true)
    }

    pub fn is_floor_expanded(&self, building: &str, floor: &str) -> bool {
        self.floors
            .get(&Self::floor_key(building, floor))
            .copied()
            .unwrap_or(self.floor_default)
    }

    /// Flip one building; returns the new state.
    pub fn toggle_building(&mut self, building: &str) -> bool {
        let entry = self.buildings.entry(building.to_owned()).or_insert(true);
        *entry = !*entry;
        *entry
    }

    /// Flip one floor; returns the new state.
    pub fn toggle_floor(&mut self, building: &str, floor: &str) -> bool {
        let default = self.floor_default;
        let entry = self
            .floors
            .entry(Self::floor_key(building, floor))
            .or_insert(default);
        *entry = !*entry;
        *entry
    }
}
