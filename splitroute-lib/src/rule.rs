use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use std::fmt::{self, Display};
use std::net::Ipv4Addr;
use std::str::FromStr;

pub const RULE_TAG: &str = "IP-CIDR";
pub const ACTION_DIRECT: &str = "DIRECT";

/// Rules the campus uplink carries when no explicit rule list is supplied.
pub const DEFAULT_RULES: [&str; 11] = [
    "IP-CIDR,202.118.0.0/19,DIRECT",
    "IP-CIDR,202.199.0.0/20,DIRECT",
    "IP-CIDR,210.30.192.0/20,DIRECT",
    "IP-CIDR,219.216.64.0/18,DIRECT",
    "IP-CIDR,58.154.160.0/19,DIRECT",
    "IP-CIDR,58.154.192.0/18,DIRECT",
    "IP-CIDR,118.202.0.0/19,DIRECT",
    "IP-CIDR,118.202.32.0/20,DIRECT",
    "IP-CIDR,172.16.0.0/12,DIRECT",
    "IP-CIDR,100.64.0.0/10,DIRECT",
    "IP-CIDR,192.168.1.1/24,DIRECT",
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("'{rule}': expected 3 comma separated fields, found {count}")]
    FieldCount { rule: String, count: usize },
    #[error("'{rule}': rule type must be {RULE_TAG}")]
    Tag { rule: String },
    #[error("'{rule}': action must be {ACTION_DIRECT}")]
    Action { rule: String },
    #[error("'{rule}': expected address/prefix notation")]
    MissingPrefix { rule: String },
    #[error("'{rule}': not a valid IPv4 address")]
    Address { rule: String },
    #[error("'{rule}': prefix length must be an integer in 0-32")]
    Prefix { rule: String },
}

/// A single split-tunnel rule: route `network/prefix` via the campus gateway.
///
/// The only supported action is DIRECT, so it is not stored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rule {
    pub network: Ipv4Addr,
    pub prefix: u8,
}

impl FromStr for Rule {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rule = || s.to_string();
        let fields: Vec<&str> = s.split(',').collect();
        if fields.len() != 3 {
            return Err(Error::FieldCount {
                rule: rule(),
                count: fields.len(),
            });
        }
        if fields[0].trim() != RULE_TAG {
            return Err(Error::Tag { rule: rule() });
        }
        if fields[2].trim() != ACTION_DIRECT {
            return Err(Error::Action { rule: rule() });
        }
        let (address, prefix) = fields[1]
            .trim()
            .split_once('/')
            .ok_or_else(|| Error::MissingPrefix { rule: rule() })?;
        let network = address
            .parse::<Ipv4Addr>()
            .map_err(|_| Error::Address { rule: rule() })?;
        let prefix = prefix
            .parse::<u8>()
            .ok()
            .filter(|p| *p <= 32)
            .ok_or_else(|| Error::Prefix { rule: rule() })?;
        Ok(Rule { network, prefix })
    }
}

impl Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{RULE_TAG},{}/{},{ACTION_DIRECT}", self.network, self.prefix)
    }
}

// Persisted and exchanged in wire format, not as a struct.
impl Serialize for Rule {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Rule {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Result of validating a batch of rule strings. Errors are accumulated so a
/// single pass reports every malformed entry.
#[derive(Debug, Default)]
pub struct Validated {
    pub rules: Vec<Rule>,
    pub errors: Vec<String>,
}

impl Validated {
    pub fn all_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

pub fn validate<S: AsRef<str>>(raw: &[S]) -> Validated {
    let mut validated = Validated::default();
    for entry in raw {
        match entry.as_ref().parse::<Rule>() {
            Ok(rule) => validated.rules.push(rule),
            Err(e) => validated.errors.push(e.to_string()),
        }
    }
    validated
}

/// Parses a plain-text rule list, one rule per line. Blank lines and `#`
/// comments are skipped.
pub fn parse_rule_lines(text: &str) -> Validated {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .collect();
    validate(&lines)
}

pub fn default_rules() -> Vec<Rule> {
    DEFAULT_RULES.iter().filter_map(|s| s.parse().ok()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wire_format_and_round_trips_through_display() -> anyhow::Result<()> {
        let rule: Rule = "IP-CIDR,202.118.0.0/19,DIRECT".parse()?;
        assert_eq!(rule.network, Ipv4Addr::new(202, 118, 0, 0));
        assert_eq!(rule.prefix, 19);
        assert_eq!(rule.to_string(), "IP-CIDR,202.118.0.0/19,DIRECT");
        Ok(())
    }

    #[test]
    fn validate_reports_only_the_malformed_entry() {
        let validated = validate(&["IP-CIDR,202.118.0.0/19,DIRECT", "IP-CIDR,bad,DIRECT"]);
        assert!(!validated.all_valid());
        assert_eq!(validated.rules.len(), 1);
        assert_eq!(validated.errors.len(), 1);
        assert!(validated.errors[0].contains("IP-CIDR,bad,DIRECT"));
    }

    #[test]
    fn validate_accumulates_every_error_in_one_pass() {
        let validated = validate(&[
            "IP-CIDR,10.0.0.0/8",
            "GEOIP,CN,DIRECT",
            "IP-CIDR,10.0.0.0/8,PROXY",
            "IP-CIDR,10.0.0.256/8,DIRECT",
            "IP-CIDR,10.0.0.0/33,DIRECT",
        ]);
        assert_eq!(validated.errors.len(), 5);
        assert!(validated.rules.is_empty());
    }

    #[test]
    fn rule_lines_skip_blanks_and_comments() {
        let text = "# campus ranges\n\nIP-CIDR,172.16.0.0/12,DIRECT\n  \nIP-CIDR,100.64.0.0/10,DIRECT\n";
        let validated = parse_rule_lines(text);
        assert!(validated.all_valid());
        assert_eq!(validated.rules.len(), 2);
    }

    #[test]
    fn built_in_default_rules_are_all_valid() {
        assert_eq!(default_rules().len(), DEFAULT_RULES.len());
    }

    #[test]
    fn serde_uses_the_wire_format() -> anyhow::Result<()> {
        let rule: Rule = "IP-CIDR,118.202.0.0/19,DIRECT".parse()?;
        let json = serde_json::to_string(&rule)?;
        assert_eq!(json, "\"IP-CIDR,118.202.0.0/19,DIRECT\"");
        let back: Rule = serde_json::from_str(&json)?;
        assert_eq!(back, rule);
        Ok(())
    }
}
