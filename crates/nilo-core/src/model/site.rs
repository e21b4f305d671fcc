// ── Physical hierarchy ──
//
// Tenant -> Site -> Building -> Floor. Nested children are only filled
// when the hierarchy is assembled as a tree; flat listings leave them
// empty and carry the parent ids instead.

use serde::{Deserialize, Serialize};

use super::address::Address;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: String,
    pub sites: Vec<Site>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub id: String,
    pub tenant_id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub address: Address,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buildings: Vec<Building>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Building {
    pub id: String,
    pub site_id: Option<String>,
    pub name: String,
    pub address: Address,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub floors: Vec<Floor>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Floor {
    pub id: String,
    pub building_id: Option<String>,
    pub site_id: Option<String>,
    pub name: String,
    /// Floor number as text; the API sends strings or numbers.
    pub number: Option<String>,
    /// Resolved names, filled by floor enrichment.
    pub site_name: Option<String>,
    pub building_name: Option<String>,
}

macro_rules! display_name {
    ($($ty:ty),*) => {$(
        impl $ty {
            /// The display name, falling back to the id.
            pub fn display_name(&self) -> &str {
                if self.name.trim().is_empty() { &self.id } else { &self.name }
            }
        }
    )*};
}

display_name!(Site, Building, Floor);

impl Tenant {
    pub fn building_count(&self) -> usize {
        self.sites.iter().map(|s| s.buildings.len()).sum()
    }

    pub fn floor_count(&self) -> usize {
        self.sites
            .iter()
            .flat_map(|s| &s.buildings)
            .map(|b| b.floors.len())
            .sum()
    }
}
