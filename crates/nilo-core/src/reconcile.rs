// ── Hierarchical reconciliation ──
//
// Groups a flat device list into building -> floor -> devices, using the
// flat building and floor listings only as name lookups. The output is a
// pure function of its inputs: same lists in, same structure and order
// out.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::Serialize;

use crate::model::{Building, Floor, NetworkDevice};

/// Group key for items without a building.
pub const UNKNOWN_BUILDING: &str = "Unknown Building";

/// Group key for items without a floor.
pub const UNKNOWN_FLOOR: &str = "Unknown Floor";

/// Anything that can be placed in the building/floor hierarchy.
pub trait Groupable {
    fn building_key(&self) -> Option<&str>;
    fn floor_key(&self) -> Option<&str>;
    /// Natural key used to order items inside a floor group.
    fn sort_key(&self) -> &str;
}

impl Groupable for NetworkDevice {
    fn building_key(&self) -> Option<&str> {
        self.building_id.as_deref()
    }

    fn floor_key(&self) -> Option<&str> {
        self.floor_id.as_deref()
    }

    fn sort_key(&self) -> &str {
        self.mac.as_str()
    }
}

/// The display-ready grouping.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Grouping<T> {
    /// building key -> floor key -> items, every level already sorted.
    pub groups: IndexMap<String, IndexMap<String, Vec<T>>>,
    /// Building keys in display order.
    pub building_order: Vec<String>,
    pub building_names: BTreeMap<String, String>,
    pub floor_names: BTreeMap<String, String>,
}

impl<T> Default for Grouping<T> {
    fn default() -> Self {
        Self {
            groups: IndexMap::new(),
            building_order: Vec::new(),
            building_names: BTreeMap::new(),
            floor_names: BTreeMap::new(),
        }
    }
}

impl<T> Grouping<T> {
    /// Resolved building name, falling back to the key itself.
    pub fn building_name<'a>(&'a self, key: &'a str) -> &'a str {
        self.building_names.get(key).map_or(key, String::as_str)
    }

    pub fn floor_name<'a>(&'a self, key: &'a str) -> &'a str {
        self.floor_names.get(key).map_or(key, String::as_str)
    }

    pub fn item_count(&self) -> usize {
        self.groups
            .values()
            .flat_map(IndexMap::values)
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Normalize a grouping key: absent, blank and the backend's `"Unknown"`
/// placeholder all collapse to the sentinel.
fn group_key(raw: Option<&str>, sentinel: &str) -> String {
    match raw.map(str::trim) {
        Some(k) if !k.is_empty() && k != "Unknown" => k.to_owned(),
        _ => sentinel.to_owned(),
    }
}

/// Compare display names the way a person reads them: letters first
/// compared without case, then exact spelling breaks ties.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    let folded = a
        .chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase));
    folded.then_with(|| a.cmp(b))
}

fn name_lookup<'a>(entries: impl Iterator<Item = (&'a str, &'a str)>) -> BTreeMap<String, String> {
    entries
        .filter(|(id, name)| !id.is_empty() && !name.trim().is_empty())
        .map(|(id, name)| (id.to_owned(), name.to_owned()))
        .collect()
}

/// Group `items` by building and floor.
///
/// Items whose building or floor is unknown are grouped under
/// [`UNKNOWN_BUILDING`] / [`UNKNOWN_FLOOR`], never dropped. Items inside a
/// floor are ordered by [`Groupable::sort_key`] with plain case-sensitive
/// comparison; buildings and floors by resolved name.
pub fn reconcile<T: Groupable + Clone>(
    items: &[T],
    buildings: &[Building],
    floors: &[Floor],
) -> Grouping<T> {
    let building_names = name_lookup(buildings.iter().map(|b| (b.id.as_str(), b.name.as_str())));
    let floor_names = name_lookup(floors.iter().map(|f| (f.id.as_str(), f.name.as_str())));

    let mut unsorted: BTreeMap<String, BTreeMap<String, Vec<T>>> = BTreeMap::new();
    for item in items {
        let building = group_key(item.building_key(), UNKNOWN_BUILDING);
        let floor = group_key(item.floor_key(), UNKNOWN_FLOOR);
        unsorted
            .entry(building)
            .or_default()
            .entry(floor)
            .or_default()
            .push(item.clone());
    }

    let resolve = |names: &BTreeMap<String, String>, key: &str| -> String {
        names.get(key).cloned().unwrap_or_else(|| key.to_owned())
    };

    let mut building_keys: Vec<String> = unsorted.keys().cloned().collect();
    building_keys.sort_by(|a, b| {
        compare_names(&resolve(&building_names, a), &resolve(&building_names, b))
            .then_with(|| a.cmp(b))
    });

    let mut groups = IndexMap::with_capacity(building_keys.len());
    for building in &building_keys {
        let Some(mut by_floor) = unsorted.remove(building) else {
            continue;
        };

        let mut floor_keys: Vec<String> = by_floor.keys().cloned().collect();
        floor_keys.sort_by(|a, b| {
            compare_names(&resolve(&floor_names, a), &resolve(&floor_names, b))
                .then_with(|| a.cmp(b))
        });

        let mut sorted_floors = IndexMap::with_capacity(floor_keys.len());
        for floor in floor_keys {
            if let Some(mut members) = by_floor.remove(&floor) {
                members.sort_by(|a, b| a.sort_key().cmp(b.sort_key()));
                sorted_floors.insert(floor, members);
            }
        }
        groups.insert(building.clone(), sorted_floors);
    }

    Grouping {
        groups,
        building_order: building_keys,
        building_names,
        floor_names,
    }
}
