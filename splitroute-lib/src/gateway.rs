use regex::Regex;
use serde::{Deserialize, Serialize};

use std::fmt::{self, Display};
use std::net::Ipv4Addr;
use std::sync::LazyLock;

/// Default gateway of an interface at resolution time. A missing gateway is
/// an expected runtime condition, not an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gateway {
    Resolved(Ipv4Addr),
    Unresolved,
}

impl Gateway {
    pub fn address(&self) -> Option<Ipv4Addr> {
        match self {
            Gateway::Resolved(addr) => Some(*addr),
            Gateway::Unresolved => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Gateway::Resolved(_))
    }
}

impl Display for Gateway {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Gateway::Resolved(addr) => write!(f, "{addr}"),
            Gateway::Unresolved => write!(f, "unresolved"),
        }
    }
}

// Ordered by specificity: localized label, English label, generic label.
// The first match wins. Labels may be padded with dots ("Default Gateway
// . . . : 10.0.0.1") depending on OS locale settings.
static GATEWAY_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"默认网关\s*[.\s]*:\s*(\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3})",
        r"Default Gateway\s*[.\s]*:\s*(\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3})",
        r"Gateway\s*[.\s]*:\s*(\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3})",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("hard-coded gateway pattern"))
    .collect()
});

const GATEWAY_LABELS: [&str; 3] = ["默认网关", "Default Gateway", "Gateway"];

/// Extracts the default gateway from per-interface configuration output.
///
/// Tries the ordered pattern list first; when no pattern matches, falls back
/// to scanning for any gateway-labelled line, splitting on the first colon
/// and validating the remainder as a dotted quad. Total function: always a
/// `Gateway`, never an error.
pub fn parse_gateway(output: &str) -> Gateway {
    for pattern in GATEWAY_PATTERNS.iter() {
        if let Some(captures) = pattern.captures(output) {
            if let Ok(address) = captures[1].parse::<Ipv4Addr>() {
                return Gateway::Resolved(address);
            }
        }
    }

    for line in output.lines() {
        if !GATEWAY_LABELS.iter().any(|label| line.contains(label)) {
            continue;
        }
        if let Some((_, rest)) = line.split_once(':') {
            if let Ok(address) = rest.trim().parse::<Ipv4Addr>() {
                return Gateway::Resolved(address);
            }
        }
    }

    Gateway::Unresolved
}
