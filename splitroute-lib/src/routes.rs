use std::net::Ipv4Addr;

/// Read-only view of a live routing-table entry. Only ever parsed from the
/// OS table and matched against, never constructed for installation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteTableEntry {
    pub network: Ipv4Addr,
    pub netmask: Ipv4Addr,
    /// `None` for on-link routes.
    pub gateway: Option<Ipv4Addr>,
    pub interface: Ipv4Addr,
    pub metric: u32,
}

// Section markers of the route-table dump, per locale.
const IPV4_SECTION: [&str; 2] = ["IPv4 Route Table", "IPv4 路由表"];
const IPV6_SECTION: [&str; 2] = ["IPv6 Route Table", "IPv6 路由表"];
const ON_LINK: [&str; 2] = ["On-link", "在链路上"];

/// Parses the IPv4 section of a route-table dump.
///
/// Scanning starts at the IPv4 section header and stops at the IPv6 one.
/// Header, separator and otherwise non-conforming lines (the persistent
/// routes block included) are skipped row by row.
pub fn parse_route_table(output: &str) -> Vec<RouteTableEntry> {
    let mut entries = Vec::new();
    let mut in_ipv4_section = false;
    for line in output.lines() {
        if IPV4_SECTION.iter().any(|marker| line.contains(marker)) {
            in_ipv4_section = true;
            continue;
        }
        if IPV6_SECTION.iter().any(|marker| line.contains(marker)) {
            break;
        }
        if !in_ipv4_section {
            continue;
        }
        if let Some(entry) = parse_route_row(line) {
            entries.push(entry);
        }
    }
    entries
}

fn parse_route_row(line: &str) -> Option<RouteTableEntry> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != 5 {
        return None;
    }
    let gateway = if ON_LINK.contains(&fields[2]) {
        None
    } else {
        Some(fields[2].parse().ok()?)
    };
    Some(RouteTableEntry {
        network: fields[0].parse().ok()?,
        netmask: fields[1].parse().ok()?,
        gateway,
        interface: fields[3].parse().ok()?,
        metric: fields[4].parse().ok()?,
    })
}

/// Structurally exact existence check: parsed network and netmask equality.
///
/// A plain substring test against the dump false-positives whenever the
/// queried network is a textual substring of an unrelated entry
/// (10.1.0.0 inside 10.1.0.0.../210.1.0.0 style rows), so matching happens
/// on parsed values instead.
pub fn route_matches(entries: &[RouteTableEntry], network: Ipv4Addr, netmask: Ipv4Addr) -> bool {
    entries
        .iter()
        .any(|entry| entry.network == network && entry.netmask == netmask)
}
