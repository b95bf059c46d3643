use serde::{Deserialize, Serialize};

use std::fmt::{self, Display};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdminState {
    Enabled,
    Disabled,
    Unknown,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperState {
    Connected,
    Disconnected,
    Unknown,
}

/// Network interface as reported by the OS enumeration command. Discovered
/// fresh each run, never persisted on its own.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Interface {
    pub name: String,
    pub admin_state: AdminState,
    pub oper_state: OperState,
}

impl Interface {
    /// An interface worth offering for selection: administratively enabled
    /// and currently connected.
    pub fn is_candidate(&self) -> bool {
        self.admin_state == AdminState::Enabled && self.oper_state == OperState::Connected
    }
}

impl Display for Interface {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({:?}/{:?})", self.name, self.admin_state, self.oper_state)
    }
}

// Column headers marking the interface-name column, per locale.
const NAME_HEADERS: [&str; 2] = ["Interface Name", "接口名称"];

fn admin_state_from_label(label: &str) -> AdminState {
    match label {
        "Enabled" | "已启用" => AdminState::Enabled,
        "Disabled" | "已禁用" => AdminState::Disabled,
        _ => AdminState::Unknown,
    }
}

fn oper_state_from_label(label: &str) -> OperState {
    match label {
        "Connected" | "已连接" => OperState::Connected,
        "Disconnected" | "已断开连接" => OperState::Disconnected,
        _ => OperState::Unknown,
    }
}

fn is_header_or_separator(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.starts_with('-') || NAME_HEADERS.iter().any(|h| trimmed.contains(h))
}

/// Parses the tabular interface listing into interface records.
///
/// Two schemes are applied per row: slicing at the name-column offset taken
/// from the header row (keeps interface names containing spaces intact), and
/// a fixed-column whitespace split as fallback when the header is missing or
/// the row is too short. Rows that yield no plausible name are dropped.
pub fn parse_interface_table(output: &str) -> Vec<Interface> {
    let name_column = output.lines().find_map(|line| {
        NAME_HEADERS.iter().find_map(|header| line.find(header))
    });

    let mut interfaces = Vec::new();
    for line in output.lines() {
        if line.trim().is_empty() || is_header_or_separator(line) {
            continue;
        }
        let parsed = name_column
            .and_then(|column| parse_positional(line, column))
            .or_else(|| parse_fixed_columns(line));
        match parsed {
            Some(interface) => interfaces.push(interface),
            None => tracing::debug!(row = %line, "dropping unparseable interface row"),
        }
    }
    interfaces
}

fn parse_positional(line: &str, column: usize) -> Option<Interface> {
    // get() rather than slicing: column widths shift with locale and the
    // offset may not land on a character boundary.
    let name = line.get(column..)?.trim();
    if !plausible_name(name) {
        return None;
    }
    let mut states = line.get(..column)?.split_whitespace();
    let admin_state = states.next().map(admin_state_from_label)?;
    let oper_state = states.next().map(oper_state_from_label)?;
    Some(Interface {
        name: name.to_string(),
        admin_state,
        oper_state,
    })
}

fn parse_fixed_columns(line: &str) -> Option<Interface> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 4 {
        return None;
    }
    let name = fields[3..].join(" ");
    if !plausible_name(&name) {
        return None;
    }
    Some(Interface {
        name,
        admin_state: admin_state_from_label(fields[0]),
        oper_state: oper_state_from_label(fields[1]),
    })
}

fn plausible_name(name: &str) -> bool {
    !name.is_empty() && !name.chars().all(|c| c == '-' || c == '=')
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENGLISH_LISTING: &str = "\
Admin State    State          Type             Interface Name
-------------------------------------------------------------------------
Enabled        Connected      Dedicated        Ethernet
Enabled        Disconnected   Dedicated        Local Area Connection 2
Disabled       Disconnected   Dedicated        Wi-Fi
";

    const LOCALIZED_LISTING: &str = "\
管理员状态     状态           类型             接口名称
-------------------------------------------------------------------------
已启用         已连接         专用             以太网
已启用         已断开连接     专用             WLAN
";

    #[test]
    fn parses_english_listing_with_header_offsets() {
        let interfaces = parse_interface_table(ENGLISH_LISTING);
        assert_eq!(interfaces.len(), 3);
        assert_eq!(interfaces[0].name, "Ethernet");
        assert_eq!(interfaces[0].admin_state, AdminState::Enabled);
        assert_eq!(interfaces[0].oper_state, OperState::Connected);
        // spaces in the name survive positional parsing
        assert_eq!(interfaces[1].name, "Local Area Connection 2");
        assert_eq!(interfaces[2].admin_state, AdminState::Disabled);
    }

    #[test]
    fn only_enabled_and_connected_interfaces_are_candidates() {
        let interfaces = parse_interface_table(ENGLISH_LISTING);
        let candidates: Vec<&str> = interfaces
            .iter()
            .filter(|interface| interface.is_candidate())
            .map(|interface| interface.name.as_str())
            .collect();
        assert_eq!(candidates, ["Ethernet"]);
    }

    #[test]
    fn parses_localized_listing() {
        let interfaces = parse_interface_table(LOCALIZED_LISTING);
        assert_eq!(interfaces.len(), 2);
        assert_eq!(interfaces[0].name, "以太网");
        assert!(interfaces[0].is_candidate());
        assert_eq!(interfaces[1].oper_state, OperState::Disconnected);
    }

    #[test]
    fn falls_back_to_fixed_columns_without_header_row() {
        let listing = "Enabled        Connected      Dedicated        Ethernet 3\n";
        let interfaces = parse_interface_table(listing);
        assert_eq!(interfaces.len(), 1);
        assert_eq!(interfaces[0].name, "Ethernet 3");
        assert!(interfaces[0].is_candidate());
    }

    #[test]
    fn unknown_state_labels_are_preserved_as_unknown() {
        let listing = "Activé        Connecté      Dédié        Ethernet\n";
        let interfaces = parse_interface_table(listing);
        assert_eq!(interfaces.len(), 1);
        assert_eq!(interfaces[0].admin_state, AdminState::Unknown);
        assert_eq!(interfaces[0].oper_state, OperState::Unknown);
    }

    #[test]
    fn rows_without_a_plausible_name_are_dropped() {
        let listing = "Enabled Connected\n---\n\n";
        assert!(parse_interface_table(listing).is_empty());
    }
}
