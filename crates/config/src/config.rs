use crate::{ConfigError, Result};
use lualint_linter::{RuleRegistry, Severity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Suffix of the sidecar file holding a source file's serialized tree
pub const DEFAULT_TREE_SUFFIX: &str = ".ast.json";

/// Severity level for a lint rule, as written in config files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleSeverity {
    Off,
    Info,
    Warn,
    Error,
}

impl RuleSeverity {
    /// The issue severity, or `None` when the rule is turned off
    #[must_use]
    pub const fn to_severity(self) -> Option<Severity> {
        match self {
            Self::Off => None,
            Self::Info => Some(Severity::Info),
            Self::Warn => Some(Severity::Warning),
            Self::Error => Some(Severity::Error),
        }
    }
}

/// Configuration for a single lint rule
///
/// Supports multiple formats:
/// ```yaml
/// # Simple severity
/// rule_name: warn
///
/// # Object style with options
/// rule_name:
///   severity: warn
///   options:
///     max: 3
///
/// # ESLint-style array: [severity, options]
/// rule_name: [warn, { max: 3 }]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LintRuleConfig {
    /// Just a severity level (simple case)
    Severity(RuleSeverity),

    /// Detailed config with options
    Detailed {
        severity: RuleSeverity,
        #[serde(skip_serializing_if = "Option::is_none")]
        options: Option<serde_json::Value>,
    },
}

impl LintRuleConfig {
    #[must_use]
    pub const fn severity(&self) -> RuleSeverity {
        match self {
            Self::Severity(s) | Self::Detailed { severity: s, .. } => *s,
        }
    }

    #[must_use]
    pub const fn options(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Severity(_) => None,
            Self::Detailed { options, .. } => options.as_ref(),
        }
    }
}

fn parse_severity<E: serde::de::Error>(value: &str) -> std::result::Result<RuleSeverity, E> {
    match value {
        "off" => Ok(RuleSeverity::Off),
        "info" => Ok(RuleSeverity::Info),
        "warn" | "warning" => Ok(RuleSeverity::Warn),
        "error" => Ok(RuleSeverity::Error),
        _ => Err(E::custom(format!("unknown severity: {value}"))),
    }
}

/// Custom deserializer for `LintRuleConfig` to handle ESLint-style array syntax
impl<'de> Deserialize<'de> for LintRuleConfig {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::{self, MapAccess, SeqAccess, Visitor};

        struct LintRuleConfigVisitor;

        impl<'de> Visitor<'de> for LintRuleConfigVisitor {
            type Value = LintRuleConfig;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str(
                    "a severity string ('off', 'info', 'warn', 'error'), \
                     an array [severity, options], \
                     or an object { severity, options }",
                )
            }

            fn visit_str<E>(self, value: &str) -> std::result::Result<Self::Value, E>
            where
                E: de::Error,
            {
                parse_severity(value).map(LintRuleConfig::Severity)
            }

            // YAML 1.1 readers turn a bare `off` into `false`
            fn visit_bool<E>(self, value: bool) -> std::result::Result<Self::Value, E>
            where
                E: de::Error,
            {
                if value {
                    Err(E::custom("`true` is not a severity; use 'warn' or 'error'"))
                } else {
                    Ok(LintRuleConfig::Severity(RuleSeverity::Off))
                }
            }

            fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                // ESLint-style: [severity, options]
                let severity: RuleSeverity = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(0, &"array with severity"))?;

                let options: Option<serde_json::Value> = seq.next_element()?;

                Ok(LintRuleConfig::Detailed { severity, options })
            }

            fn visit_map<A>(self, map: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                // Object style: { severity, options }
                #[derive(Deserialize)]
                #[serde(deny_unknown_fields)]
                struct DetailedConfig {
                    severity: RuleSeverity,
                    #[serde(default)]
                    options: Option<serde_json::Value>,
                }

                let config =
                    DetailedConfig::deserialize(de::value::MapAccessDeserializer::new(map))?;
                Ok(LintRuleConfig::Detailed {
                    severity: config.severity,
                    options: config.options,
                })
            }
        }

        deserializer.deserialize_any(LintRuleConfigVisitor)
    }
}

/// Top-level lint configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LintConfig {
    /// Glob patterns a file must match to be linted (empty means every file)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,

    /// Glob patterns excluding files, checked before `include`
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,

    /// Suffix of the sidecar tree file (defaults to [`DEFAULT_TREE_SUFFIX`])
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tree_suffix: Option<String>,

    /// Per-rule configuration
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub rules: BTreeMap<String, LintRuleConfig>,
}

impl LintConfig {
    #[must_use]
    pub fn tree_suffix(&self) -> &str {
        self.tree_suffix.as_deref().unwrap_or(DEFAULT_TREE_SUFFIX)
    }

    /// Configured severity, if the rule is mentioned
    #[must_use]
    pub fn get_severity(&self, rule_id: &str) -> Option<RuleSeverity> {
        self.rules.get(rule_id).map(LintRuleConfig::severity)
    }

    #[must_use]
    pub fn get_options(&self, rule_id: &str) -> Option<&serde_json::Value> {
        self.rules.get(rule_id).and_then(LintRuleConfig::options)
    }

    /// Rules not mentioned in the config stay enabled
    #[must_use]
    pub fn is_enabled(&self, rule_id: &str) -> bool {
        self.get_severity(rule_id) != Some(RuleSeverity::Off)
    }

    /// Check rule names against `known_rules` and reject empty glob patterns
    pub fn validate(&self, known_rules: &[&str]) -> Result<()> {
        for (field, patterns) in [("include", &self.include), ("exclude", &self.exclude)] {
            if patterns.iter().any(|p| p.trim().is_empty()) {
                return Err(ConfigError::EmptyPattern { field });
            }
        }

        if let Some(name) = self.rules.keys().find(|name| !known_rules.contains(&name.as_str())) {
            return Err(ConfigError::UnknownRule {
                name: name.clone(),
                suggestion: closest_match(name, known_rules),
            });
        }

        Ok(())
    }

    /// Enable, disable, and configure the rules of `registry`
    #[tracing::instrument(skip_all, fields(rules = self.rules.len()))]
    pub fn apply(&self, registry: &mut RuleRegistry) -> Result<()> {
        for (rule_id, rule_config) in &self.rules {
            if !registry.is_rule_registered(rule_id) {
                let known: Vec<&str> = registry.get_all_rules().iter().map(|r| r.id()).collect();
                return Err(ConfigError::UnknownRule {
                    name: rule_id.clone(),
                    suggestion: closest_match(rule_id, &known),
                });
            }

            match rule_config.severity().to_severity() {
                Some(severity) => {
                    registry.set_rule_enabled(rule_id, true);
                    registry.set_rule_severity(rule_id, severity);
                }
                None => {
                    registry.set_rule_enabled(rule_id, false);
                }
            }
            if let Some(options) = rule_config.options() {
                registry.set_rule_options(rule_id, Some(options.clone()));
            }
            tracing::debug!(rule = rule_id, severity = ?rule_config.severity(), "Applied rule config");
        }
        Ok(())
    }

    /// Whether a path (relative to the config root) is in scope
    #[must_use]
    pub fn matches_path(&self, rel_path: &Path) -> bool {
        let rel_path_str = rel_path.to_string_lossy().replace('\\', "/");

        if self
            .exclude
            .iter()
            .any(|pattern| pattern_matches(pattern, &rel_path_str))
        {
            tracing::trace!(path = %rel_path_str, "Excluded by config");
            return false;
        }

        self.include.is_empty()
            || self
                .include
                .iter()
                .any(|pattern| pattern_matches(pattern, &rel_path_str))
    }
}

fn closest_match(name: &str, candidates: &[&str]) -> Option<String> {
    candidates
        .iter()
        .map(|candidate| (strsim::levenshtein(name, candidate), *candidate))
        .filter(|(distance, _)| *distance <= 3)
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, candidate)| candidate.to_string())
}

fn pattern_matches(pattern: &str, path: &str) -> bool {
    expand_braces(pattern).iter().any(|expanded| {
        glob::Pattern::new(expanded).is_ok_and(|glob_pattern| glob_pattern.matches(path))
    })
}

/// Normalize a glob pattern for consistent matching
///
/// Handles:
/// - Leading "./" prefix (removes it)
/// - Leading "/" prefix (removes it - patterns are relative to the config root)
/// - Consecutive slashes (collapses to single slash)
fn normalize_pattern(pattern: &str) -> String {
    let mut normalized = pattern.trim();
    normalized = normalized.strip_prefix("./").unwrap_or(normalized);
    normalized = normalized.strip_prefix('/').unwrap_or(normalized);

    let mut normalized = normalized.to_string();
    while normalized.contains("//") {
        normalized = normalized.replace("//", "/");
    }
    normalized
}

/// Expand brace patterns like "src/**/*.{lua,luau}" into separate patterns
fn expand_braces(pattern: &str) -> Vec<String> {
    let normalized = normalize_pattern(pattern);

    // Single brace group only
    if let (Some(start), Some(end)) = (normalized.find('{'), normalized.find('}')) {
        if start < end {
            let before = &normalized[..start];
            let after = &normalized[end + 1..];
            return normalized[start + 1..end]
                .split(',')
                .map(|opt| format!("{before}{}{after}", opt.trim()))
                .collect();
        }
    }

    vec![normalized]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const KNOWN: &[&str] = &["max_nesting_depth", "no_empty_block", "prefer_generalized_iteration"];

    #[test]
    fn test_rule_config_formats() {
        let yaml = r"
rules:
  no_empty_block: error
  max_nesting_depth: [error, { max: 3 }]
  prefer_generalized_iteration:
    severity: info
";
        let config: LintConfig = serde_saphyr::from_str(yaml).unwrap();
        assert_eq!(config.get_severity("no_empty_block"), Some(RuleSeverity::Error));
        assert_eq!(config.get_options("max_nesting_depth"), Some(&json!({ "max": 3 })));
        assert_eq!(
            config.get_severity("prefer_generalized_iteration"),
            Some(RuleSeverity::Info)
        );
        assert_eq!(config.get_options("prefer_generalized_iteration"), None);
    }

    #[test]
    fn test_off_disables_rule() {
        let config: LintConfig =
            serde_json::from_str(r#"{ "rules": { "no_empty_block": "off" } }"#).unwrap();
        assert!(!config.is_enabled("no_empty_block"));
        assert!(config.is_enabled("max_nesting_depth"));
    }

    #[test]
    fn test_unknown_severity_is_rejected() {
        let result: std::result::Result<LintConfig, _> =
            serde_json::from_str(r#"{ "rules": { "no_empty_block": "loud" } }"#);
        let err = result.unwrap_err();
        assert!(err.to_string().contains("unknown severity: loud"), "{err}");
    }

    #[test]
    fn test_unknown_top_level_key_is_rejected() {
        let result: std::result::Result<LintConfig, _> =
            serde_json::from_str(r#"{ "rulez": {} }"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_suggests_close_rule_name() {
        let config: LintConfig =
            serde_json::from_str(r#"{ "rules": { "no_empty_blocks": "warn" } }"#).unwrap();
        let err = config.validate(KNOWN).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::UnknownRule { ref name, suggestion: Some(ref s) }
                if name == "no_empty_blocks" && s == "no_empty_block"
        ));
    }

    #[test]
    fn test_validate_rejects_empty_patterns() {
        let config = LintConfig {
            exclude: vec!["vendor/**".to_string(), "  ".to_string()],
            ..LintConfig::default()
        };
        assert!(matches!(
            config.validate(KNOWN),
            Err(ConfigError::EmptyPattern { field: "exclude" })
        ));
    }

    #[test]
    fn test_apply_to_registry() {
        let mut registry = RuleRegistry::with_builtin_rules().unwrap();
        let config: LintConfig = serde_json::from_str(
            r#"{
                "rules": {
                    "no_empty_block": "off",
                    "max_nesting_depth": ["error", { "max": 2 }]
                }
            }"#,
        )
        .unwrap();

        config.apply(&mut registry).unwrap();

        let empty_block = registry.get_rule_by_id("no_empty_block").unwrap();
        assert!(!empty_block.is_enabled());

        let nesting = registry.get_rule_by_id("max_nesting_depth").unwrap();
        assert!(nesting.is_enabled());
        assert_eq!(nesting.severity(), Severity::Error);
        assert_eq!(nesting.options(), Some(&json!({ "max": 2 })));

        let iteration = registry.get_rule_by_id("prefer_generalized_iteration").unwrap();
        assert!(iteration.is_enabled());
        assert_eq!(iteration.severity(), Severity::Warning);
    }

    #[test]
    fn test_apply_unknown_rule_fails() {
        let mut registry = RuleRegistry::new();
        let config: LintConfig =
            serde_json::from_str(r#"{ "rules": { "no_empty_block": "warn" } }"#).unwrap();
        assert!(matches!(
            config.apply(&mut registry),
            Err(ConfigError::UnknownRule { .. })
        ));
    }

    #[test]
    fn test_matches_path() {
        let config = LintConfig {
            include: vec!["./src/**/*.{lua,luau}".to_string()],
            exclude: vec!["src/vendor/**".to_string()],
            ..LintConfig::default()
        };
        assert!(config.matches_path(Path::new("src/init.lua")));
        assert!(config.matches_path(Path::new("src/net/socket.luau")));
        assert!(!config.matches_path(Path::new("src/vendor/json.lua")));
        assert!(!config.matches_path(Path::new("tests/init.lua")));

        assert!(LintConfig::default().matches_path(Path::new("anything.lua")));
    }

    #[test]
    fn test_pattern_normalization() {
        assert_eq!(normalize_pattern("./src//lib/*.lua"), "src/lib/*.lua");
        assert_eq!(normalize_pattern("/src/*.lua"), "src/*.lua");
        assert_eq!(
            expand_braces("src/*.{lua, luau}"),
            vec!["src/*.lua", "src/*.luau"]
        );
    }

    #[test]
    fn test_tree_suffix_default() {
        assert_eq!(LintConfig::default().tree_suffix(), ".ast.json");
        let config = LintConfig {
            tree_suffix: Some(".tree.json".to_string()),
            ..LintConfig::default()
        };
        assert_eq!(config.tree_suffix(), ".tree.json");
    }
}
