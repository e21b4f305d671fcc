//! Tenant hierarchy handlers: tree, sites, buildings, floors, segments.

use tabled::Tabled;

use nilo_core::{Building, Floor, NetworkSegment, SegmentDetail, Site, Tenant};

use crate::cli::{GlobalOpts, OutputFormat, SegmentsArgs, TreeArgs};
use crate::error::CliError;
use crate::output;

use super::Context;
use super::util::{self, dash};

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct SiteRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Address")]
    address: String,
}

impl From<&Site> for SiteRow {
    fn from(s: &Site) -> Self {
        Self {
            id: s.id.clone(),
            name: s.display_name().to_owned(),
            address: dash(Some(&s.address.one_line())),
        }
    }
}

#[derive(Tabled)]
struct BuildingRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Site")]
    site: String,
    #[tabled(rename = "Address")]
    address: String,
}

impl From<&Building> for BuildingRow {
    fn from(b: &Building) -> Self {
        Self {
            id: b.id.clone(),
            name: b.display_name().to_owned(),
            site: dash(b.site_id.as_deref()),
            address: dash(Some(&b.address.one_line())),
        }
    }
}

#[derive(Tabled)]
struct FloorRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Number")]
    number: String,
    #[tabled(rename = "Building")]
    building: String,
    #[tabled(rename = "Site")]
    site: String,
}

impl From<&Floor> for FloorRow {
    fn from(f: &Floor) -> Self {
        Self {
            id: f.id.clone(),
            name: f.display_name().to_owned(),
            number: dash(f.number.as_deref()),
            building: dash(f.building_name.as_deref()),
            site: dash(f.site_name.as_deref()),
        }
    }
}

#[derive(Tabled)]
struct SegmentRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Encrypted")]
    encrypted: String,
    #[tabled(rename = "Status")]
    status: String,
}

impl From<&NetworkSegment> for SegmentRow {
    fn from(s: &NetworkSegment) -> Self {
        Self {
            id: s.id.clone(),
            name: s.display_name().to_owned(),
            encrypted: s.encrypted.map_or_else(|| "-".into(), |e| e.to_string()),
            status: dash(s.setting_status.as_deref()),
        }
    }
}

// ── Detail views ────────────────────────────────────────────────────

fn tenant_detail(t: &Tenant) -> String {
    let mut lines = vec![format!(
        "Tenant {} ({} sites, {} buildings, {} floors)",
        if t.id.is_empty() { "-" } else { &t.id },
        t.sites.len(),
        t.building_count(),
        t.floor_count(),
    )];
    for site in &t.sites {
        lines.push(format!("  {}  [{}]", site.display_name(), site.id));
        let address = site.address.one_line();
        if !address.is_empty() {
            lines.push(format!("    {address}"));
        }
        for building in &site.buildings {
            lines.push(format!("    {}  [{}]", building.display_name(), building.id));
            for floor in &building.floors {
                let number = floor
                    .number
                    .as_deref()
                    .map(|n| format!(" #{n}"))
                    .unwrap_or_default();
                lines.push(format!(
                    "      {}{number}  [{}]",
                    floor.display_name(),
                    floor.id
                ));
            }
        }
    }
    lines.join("\n")
}

fn segment_detail(s: &NetworkSegment, d: &SegmentDetail) -> String {
    let row = |label: &str, value: &str| format!("{:<21}{value}", format!("{label}:"));
    let flag = |on: bool| if on { "yes" } else { "no" };
    let list = |items: &[String]| {
        if items.is_empty() {
            "-".to_owned()
        } else {
            items.join(", ")
        }
    };

    let mut lines = vec![
        row("Segment", &format!("{} [{}]", s.display_name(), s.id)),
        row("URLs", &list(&d.urls)),
        row("Pop tunnel", flag(d.pop_tunnel_enabled)),
        row("Wired self-register", flag(d.wired_self_register_enabled)),
        row("Wired SSO", flag(d.wired_sso_enabled)),
        row("Wired guest", flag(d.wired_guest_enabled)),
        row("Sites", &list(&d.geo_scope.site_ids)),
        row("Buildings", &list(&d.geo_scope.building_ids)),
        row("Zones", &list(&d.geo_scope.zone_ids)),
    ];
    let linked = &d.linked_settings;
    if !linked.is_empty() {
        lines.push(row("Linked (global)", &linked.global.len().to_string()));
        for (label, settings) in [
            ("Linked (site)", &linked.sites),
            ("Linked (building)", &linked.buildings),
            ("Linked (zone)", &linked.zones),
        ] {
            for setting in settings {
                lines.push(row(label, setting.display_name()));
            }
        }
    }
    lines.join("\n")
}

// ── Handlers ────────────────────────────────────────────────────────

pub async fn tree(ctx: &Context, args: &TreeArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let tenant = if args.assemble {
        let fetch = ctx.dashboard.assembled_tenant(&ctx.cancel);
        util::with_spinner(global, "Assembling tenant", fetch).await?
    } else {
        let fetch = ctx.dashboard.tenant(&ctx.cancel);
        util::with_spinner(global, "Loading tenant", fetch).await?
    };
    let out = output::render_single(global.output, &tenant, tenant_detail, |t| {
        t.sites
            .iter()
            .map(|s| s.id.clone())
            .collect::<Vec<_>>()
            .join("\n")
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn sites(ctx: &Context, global: &GlobalOpts) -> Result<(), CliError> {
    let sites = ctx.dashboard.sites(&ctx.cancel).await?;
    let out = output::render_list(
        global.output,
        &sites,
        |s| SiteRow::from(s),
        |s| s.id.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn buildings(ctx: &Context, global: &GlobalOpts) -> Result<(), CliError> {
    let buildings = ctx.dashboard.buildings(&ctx.cancel).await?;
    let out = output::render_list(
        global.output,
        &buildings,
        |b| BuildingRow::from(b),
        |b| b.id.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn floors(ctx: &Context, global: &GlobalOpts) -> Result<(), CliError> {
    let floors = ctx.dashboard.floors(&ctx.cancel).await?;
    let out = output::render_list(
        global.output,
        &floors,
        |f| FloorRow::from(f),
        |f| f.id.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn segments(
    ctx: &Context,
    args: &SegmentsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let segments = ctx.dashboard.segments(&ctx.cancel).await?;

    let out = if args.detail && global.output == OutputFormat::Table {
        segments
            .iter()
            .map(|s| match &s.detail {
                Some(d) => segment_detail(s, d),
                None => format!("{} [{}]: no detail", s.display_name(), s.id),
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    } else {
        output::render_list(
            global.output,
            &segments,
            |s| SegmentRow::from(s),
            |s| s.id.clone(),
        )?
    };
    output::print_output(&out, global.quiet);
    Ok(())
}
