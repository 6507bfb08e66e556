//! Security classification of issues, derived from their CWE list.
//!
//! Two views are computed at indexing time: the SANS Top 25 groups an issue
//! falls in, and the single SonarSource category with its vulnerability
//! probability.

use std::fmt;

use serde::{Deserialize, Serialize};

pub const SANS_TOP_25_INSECURE_INTERACTION: &str = "insecure-interaction";
pub const SANS_TOP_25_RISKY_RESOURCE: &str = "risky-resource";
pub const SANS_TOP_25_POROUS_DEFENSES: &str = "porous-defenses";

const INSECURE_INTERACTION_CWES: &[&str] = &["89", "78", "79", "434", "352", "601"];
const RISKY_RESOURCE_CWES: &[&str] = &["120", "22", "494", "829", "676", "131", "134", "190"];
const POROUS_DEFENSES_CWES: &[&str] = &[
    "306", "862", "798", "311", "807", "250", "863", "732", "327", "307", "759",
];

const SANS_TOP_25: &[(&str, &[&str])] = &[
    (SANS_TOP_25_INSECURE_INTERACTION, INSECURE_INTERACTION_CWES),
    (SANS_TOP_25_RISKY_RESOURCE, RISKY_RESOURCE_CWES),
    (SANS_TOP_25_POROUS_DEFENSES, POROUS_DEFENSES_CWES),
];

/// SANS Top 25 groups containing at least one of `cwes`, in group order.
pub fn sans_top25(cwes: &[String]) -> Vec<String> {
    SANS_TOP_25
        .iter()
        .filter(|(_, group)| contains_any(group, cwes))
        .map(|(name, _)| name.to_string())
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VulnerabilityProbability {
    High,
    Medium,
    #[default]
    Low,
}

/// SonarSource security category. An issue gets exactly one: the first
/// category, in declaration order, sharing a CWE with it, else `Others`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SqCategory {
    BufferOverflow,
    SqlInjection,
    CommandInjection,
    PathTraversalInjection,
    LdapInjection,
    XpathInjection,
    Rce,
    Dos,
    Ssrf,
    Csrf,
    Xss,
    LogInjection,
    HttpResponseSplitting,
    OpenRedirect,
    Xxe,
    ObjectInjection,
    WeakCryptography,
    Auth,
    InsecureConf,
    FileManipulation,
    EncryptData,
    Traceability,
    Permission,
    #[default]
    Others,
}

impl SqCategory {
    pub const ALL: [SqCategory; 24] = [
        SqCategory::BufferOverflow,
        SqCategory::SqlInjection,
        SqCategory::CommandInjection,
        SqCategory::PathTraversalInjection,
        SqCategory::LdapInjection,
        SqCategory::XpathInjection,
        SqCategory::Rce,
        SqCategory::Dos,
        SqCategory::Ssrf,
        SqCategory::Csrf,
        SqCategory::Xss,
        SqCategory::LogInjection,
        SqCategory::HttpResponseSplitting,
        SqCategory::OpenRedirect,
        SqCategory::Xxe,
        SqCategory::ObjectInjection,
        SqCategory::WeakCryptography,
        SqCategory::Auth,
        SqCategory::InsecureConf,
        SqCategory::FileManipulation,
        SqCategory::EncryptData,
        SqCategory::Traceability,
        SqCategory::Permission,
        SqCategory::Others,
    ];

    pub fn from_cwes(cwes: &[String]) -> Self {
        Self::ALL
            .into_iter()
            .find(|category| contains_any(category.cwes(), cwes))
            .unwrap_or(SqCategory::Others)
    }

    pub fn key(&self) -> &'static str {
        match self {
            SqCategory::BufferOverflow => "buffer-overflow",
            SqCategory::SqlInjection => "sql-injection",
            SqCategory::CommandInjection => "command-injection",
            SqCategory::PathTraversalInjection => "path-traversal-injection",
            SqCategory::LdapInjection => "ldap-injection",
            SqCategory::XpathInjection => "xpath-injection",
            SqCategory::Rce => "rce",
            SqCategory::Dos => "dos",
            SqCategory::Ssrf => "ssrf",
            SqCategory::Csrf => "csrf",
            SqCategory::Xss => "xss",
            SqCategory::LogInjection => "log-injection",
            SqCategory::HttpResponseSplitting => "http-response-splitting",
            SqCategory::OpenRedirect => "open-redirect",
            SqCategory::Xxe => "xxe",
            SqCategory::ObjectInjection => "object-injection",
            SqCategory::WeakCryptography => "weak-cryptography",
            SqCategory::Auth => "auth",
            SqCategory::InsecureConf => "insecure-conf",
            SqCategory::FileManipulation => "file-manipulation",
            SqCategory::EncryptData => "encrypt-data",
            SqCategory::Traceability => "traceability",
            SqCategory::Permission => "permission",
            SqCategory::Others => "others",
        }
    }

    pub fn vulnerability(&self) -> VulnerabilityProbability {
        use VulnerabilityProbability::{High, Low, Medium};
        match self {
            SqCategory::BufferOverflow
            | SqCategory::SqlInjection
            | SqCategory::CommandInjection
            | SqCategory::PathTraversalInjection
            | SqCategory::LdapInjection
            | SqCategory::XpathInjection
            | SqCategory::Csrf
            | SqCategory::Xss
            | SqCategory::Auth => High,
            SqCategory::Rce
            | SqCategory::Dos
            | SqCategory::Ssrf
            | SqCategory::OpenRedirect
            | SqCategory::Xxe
            | SqCategory::WeakCryptography
            | SqCategory::Permission => Medium,
            SqCategory::LogInjection
            | SqCategory::HttpResponseSplitting
            | SqCategory::ObjectInjection
            | SqCategory::InsecureConf
            | SqCategory::FileManipulation
            | SqCategory::EncryptData
            | SqCategory::Traceability
            | SqCategory::Others => Low,
        }
    }

    fn cwes(&self) -> &'static [&'static str] {
        match self {
            SqCategory::BufferOverflow => &["119", "120", "131", "676", "788"],
            SqCategory::SqlInjection => &["89", "564", "943"],
            SqCategory::CommandInjection => &["77", "78", "88", "214"],
            SqCategory::PathTraversalInjection => &["22"],
            SqCategory::LdapInjection => &["90"],
            SqCategory::XpathInjection => &["643"],
            SqCategory::Rce => &["94", "95"],
            SqCategory::Dos => &["400", "624"],
            SqCategory::Ssrf => &["918"],
            SqCategory::Csrf => &["352"],
            SqCategory::Xss => &["79", "80", "81", "82", "83", "84", "85", "86", "87"],
            SqCategory::LogInjection => &["117"],
            SqCategory::HttpResponseSplitting => &["113"],
            SqCategory::OpenRedirect => &["601"],
            SqCategory::Xxe => &["611", "827"],
            SqCategory::ObjectInjection => &["134", "470", "502"],
            SqCategory::WeakCryptography => &[
                "295", "297", "321", "322", "323", "324", "325", "326", "327", "328", "330", "780",
            ],
            SqCategory::Auth => &[
                "798", "640", "620", "549", "522", "521", "263", "262", "261", "259", "308",
            ],
            SqCategory::InsecureConf => &["102", "215", "346", "614", "489", "942"],
            SqCategory::FileManipulation => &["97", "73"],
            SqCategory::EncryptData => &["311", "315", "319"],
            SqCategory::Traceability => &["778"],
            SqCategory::Permission => &["266", "269", "284", "668", "732"],
            SqCategory::Others => &[],
        }
    }
}

impl fmt::Display for SqCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

fn contains_any(group: &[&str], cwes: &[String]) -> bool {
    cwes.iter().any(|cwe| group.contains(&cwe.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cwes(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_sans_top25_groups_in_order() {
        assert_eq!(sans_top25(&cwes(&["123", "863"])), vec!["porous-defenses"]);
        assert_eq!(
            sans_top25(&cwes(&["22", "89"])),
            vec!["insecure-interaction", "risky-resource"]
        );
        assert!(sans_top25(&cwes(&["unknown"])).is_empty());
    }

    #[test]
    fn test_first_matching_category_wins() {
        // 120 is listed under buffer-overflow before anything else.
        assert_eq!(SqCategory::from_cwes(&cwes(&["352", "120"])), SqCategory::BufferOverflow);
        assert_eq!(SqCategory::from_cwes(&cwes(&["89"])), SqCategory::SqlInjection);
        assert_eq!(SqCategory::from_cwes(&cwes(&["123", "863"])), SqCategory::Others);
        assert_eq!(SqCategory::from_cwes(&[]), SqCategory::Others);
    }

    #[test]
    fn test_probability_per_category() {
        assert_eq!(SqCategory::Xss.vulnerability(), VulnerabilityProbability::High);
        assert_eq!(SqCategory::Permission.vulnerability(), VulnerabilityProbability::Medium);
        assert_eq!(SqCategory::Others.vulnerability(), VulnerabilityProbability::Low);
    }

    #[test]
    fn test_serialized_names() {
        assert_eq!(
            serde_json::to_string(&SqCategory::PathTraversalInjection).unwrap(),
            "\"path-traversal-injection\""
        );
        assert_eq!(
            serde_json::to_string(&VulnerabilityProbability::High).unwrap(),
            "\"HIGH\""
        );
        for category in SqCategory::ALL {
            let json = serde_json::to_string(&category).unwrap();
            assert_eq!(json, format!("\"{}\"", category.key()));
        }
    }
}
