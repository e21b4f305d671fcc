// ── Hierarchy assembly ──
//
// Builds Tenant -> Site -> Building -> Floor from the three flat
// listings, and enriches flat floor listings with their parents' names.

use std::collections::HashMap;

use tracing::debug;

use crate::model::{Building, Floor, Site, Tenant};

/// Name used when a floor's site or building cannot be resolved.
pub const UNKNOWN_NAME: &str = "Unknown";

/// Assemble the tenant tree from flat listings.
///
/// Sites without an id are skipped. Buildings attach to their site and
/// floors to their building, in listing order; children whose parent is
/// not listed are left out of the tree.
pub fn assemble_tenant(
    tenant_id: &str,
    sites: Vec<Site>,
    buildings: Vec<Building>,
    floors: Vec<Floor>,
) -> Tenant {
    let mut floors_by_building: HashMap<String, Vec<Floor>> = HashMap::new();
    for floor in floors {
        if let Some(building_id) = floor.building_id.clone() {
            floors_by_building.entry(building_id).or_default().push(floor);
        }
    }

    let mut buildings_by_site: HashMap<String, Vec<Building>> = HashMap::new();
    for mut building in buildings {
        building.floors = floors_by_building.remove(&building.id).unwrap_or_default();
        if let Some(site_id) = building.site_id.clone() {
            buildings_by_site.entry(site_id).or_default().push(building);
        }
    }

    let sites: Vec<Site> = sites
        .into_iter()
        .filter(|site| !site.id.is_empty())
        .map(|mut site| {
            site.buildings = buildings_by_site.remove(&site.id).unwrap_or_default();
            site
        })
        .collect();

    debug!(tenant_id, sites = sites.len(), "tenant tree assembled");

    Tenant {
        id: tenant_id.to_owned(),
        sites,
    }
}

/// Fill each floor's `site_name` and `building_name`, defaulting to
/// [`UNKNOWN_NAME`]. A floor without a site id inherits its building's.
pub fn enrich_floors(floors: Vec<Floor>, sites: &[Site], buildings: &[Building]) -> Vec<Floor> {
    let site_names: HashMap<&str, &str> = sites
        .iter()
        .map(|s| (s.id.as_str(), s.name.as_str()))
        .collect();
    let building_index: HashMap<&str, &Building> =
        buildings.iter().map(|b| (b.id.as_str(), b)).collect();

    floors
        .into_iter()
        .map(|mut floor| {
            let building = floor
                .building_id
                .as_deref()
                .and_then(|id| building_index.get(id));

            let site_id = floor
                .site_id
                .clone()
                .or_else(|| building.and_then(|b| b.site_id.clone()));

            floor.building_name = Some(
                building
                    .map(|b| b.name.as_str())
                    .filter(|n| !n.is_empty())
                    .unwrap_or(UNKNOWN_NAME)
                    .to_owned(),
            );
            floor.site_name = Some(
                site_id
                    .as_deref()
                    .and_then(|id| site_names.get(id).copied())
                    .filter(|n| !n.is_empty())
                    .unwrap_or(UNKNOWN_NAME)
                    .to_owned(),
            );
            floor.site_id = site_id;
            floor
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn site(id: &str, name: &str) -> Site {
        Site {
            id: id.into(),
            name: name.into(),
            ..Site::default()
        }
    }

    fn building(id: &str, site_id: &str, name: &str) -> Building {
        Building {
            id: id.into(),
            site_id: Some(site_id.into()),
            name: name.into(),
            ..Building::default()
        }
    }

    fn floor(id: &str, building_id: Option<&str>) -> Floor {
        Floor {
            id: id.into(),
            building_id: building_id.map(Into::into),
            name: format!("Floor {id}"),
            ..Floor::default()
        }
    }

    #[test]
    fn tree_nests_children_under_parents() {
        let tenant = assemble_tenant(
            "t1",
            vec![site("s1", "HQ"), site("", "nameless"), site("s2", "Lab")],
            vec![building("b1", "s1", "North"), building("b2", "s2", "Annex")],
            vec![floor("f1", Some("b1")), floor("f2", Some("b1")), floor("f3", None)],
        );

        assert_eq!(tenant.id, "t1");
        assert_eq!(tenant.sites.len(), 2);
        assert_eq!(tenant.sites[0].buildings[0].floors.len(), 2);
        assert!(tenant.sites[1].buildings[0].floors.is_empty());
        assert_eq!(tenant.building_count(), 2);
        assert_eq!(tenant.floor_count(), 2);
    }

    #[test]
    fn empty_listings_give_an_empty_tenant() {
        let tenant = assemble_tenant("t1", vec![], vec![], vec![]);
        assert!(tenant.sites.is_empty());
    }

    #[test]
    fn floors_get_parent_names_or_unknown() {
        let sites = vec![site("s1", "HQ")];
        let buildings = vec![building("b1", "s1", "North")];
        let floors = enrich_floors(
            vec![floor("f1", Some("b1")), floor("f2", Some("missing"))],
            &sites,
            &buildings,
        );

        assert_eq!(floors[0].site_name.as_deref(), Some("HQ"));
        assert_eq!(floors[0].building_name.as_deref(), Some("North"));
        assert_eq!(floors[0].site_id.as_deref(), Some("s1"));
        assert_eq!(floors[1].site_name.as_deref(), Some(UNKNOWN_NAME));
        assert_eq!(floors[1].building_name.as_deref(), Some(UNKNOWN_NAME));
    }
}
