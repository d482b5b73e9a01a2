use crate::{ConfigError, LintConfig, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Config file names to search for, in order of preference
pub const CONFIG_FILES: &[&str] = &[
    ".lualintrc.yml",
    ".lualintrc.yaml",
    ".lualintrc.json",
    ".lualintrc.toml",
    "lualint.toml",
];

/// Find a lualint config file by walking up the directory tree from the given start directory.
/// Returns the path to the config file if found.
#[tracing::instrument(fields(start = %start_dir.display()))]
pub fn find_config(start_dir: &Path) -> Result<Option<PathBuf>> {
    let mut current_dir = start_dir.to_path_buf();
    let mut checked_dirs = 0;

    loop {
        tracing::trace!(dir = %current_dir.display(), "Checking directory for config files");
        for file_name in CONFIG_FILES {
            let config_path = current_dir.join(file_name);
            if config_path.is_file() {
                tracing::info!(path = %config_path.display(), checked_dirs, "Found config file");
                return Ok(Some(config_path));
            }
        }

        checked_dirs += 1;
        if !current_dir.pop() {
            tracing::debug!(checked_dirs, "No config file found");
            break;
        }
    }

    Ok(None)
}

/// Load a lualint config from the specified path.
/// Automatically detects the format based on file extension.
#[tracing::instrument(fields(path = %path.display()))]
pub fn load_config(path: &Path) -> Result<LintConfig> {
    tracing::debug!("Reading config file");
    let contents = fs::read_to_string(path)?;
    let config = load_config_from_str(&contents, path)?;
    tracing::info!(rules = config.rules.len(), "Config loaded successfully");
    Ok(config)
}

/// Load a lualint config from a string.
/// The path is used for error messages and format detection.
#[tracing::instrument(skip(contents), fields(path = %path.display(), size = contents.len()))]
pub fn load_config_from_str(contents: &str, path: &Path) -> Result<LintConfig> {
    let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

    tracing::debug!(extension, "Detecting config format");

    let config = match extension {
        "yml" | "yaml" => {
            tracing::trace!("Parsing as YAML");
            parse_yaml(contents, path)?
        }
        "json" => {
            tracing::trace!("Parsing as JSON");
            parse_json(contents, path)?
        }
        "toml" => {
            tracing::trace!("Parsing as TOML");
            parse_toml(contents, path)?
        }
        _ => return Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
    };

    tracing::debug!("Validating config");
    config.validate(&lualint_linter::builtin_rule_ids())?;

    Ok(config)
}

/// Parse YAML configuration
fn parse_yaml(contents: &str, path: &Path) -> Result<LintConfig> {
    serde_saphyr::from_str(contents).map_err(|e| ConfigError::Invalid {
        path: path.to_path_buf(),
        message: format!("YAML parse error: {e}"),
    })
}

/// Parse JSON configuration
fn parse_json(contents: &str, path: &Path) -> Result<LintConfig> {
    serde_json::from_str(contents).map_err(|e| ConfigError::Invalid {
        path: path.to_path_buf(),
        message: format!("JSON parse error: {e}"),
    })
}

/// Parse TOML configuration
fn parse_toml(contents: &str, path: &Path) -> Result<LintConfig> {
    toml::from_str(contents).map_err(|e| ConfigError::Invalid {
        path: path.to_path_buf(),
        message: format!("TOML parse error: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RuleSeverity;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_yaml() {
        let yaml = r#"
include: ["src/**/*.luau"]
rules:
  max_nesting_depth: [error, { max: 3 }]
  prefer_generalized_iteration: { severity: warn }
"#;

        let mut file = NamedTempFile::with_suffix(".yml").unwrap();
        file.write_all(yaml.as_bytes()).unwrap();
        file.flush().unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.include, vec!["src/**/*.luau"]);
        assert_eq!(
            config.get_severity("max_nesting_depth"),
            Some(RuleSeverity::Error)
        );
        assert_eq!(
            config.get_severity("prefer_generalized_iteration"),
            Some(RuleSeverity::Warn)
        );
    }

    #[test]
    fn test_load_json() {
        let json = r#"
{
  "exclude": ["vendor/**"],
  "tree_suffix": ".tree.json",
  "rules": { "no_empty_block": "off" }
}
"#;

        let mut file = NamedTempFile::with_suffix(".json").unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file.flush().unwrap();

        let config = load_config(file.path()).unwrap();
        assert!(!config.is_enabled("no_empty_block"));
        assert_eq!(config.tree_suffix(), ".tree.json");
    }

    #[test]
    fn test_load_toml() {
        let toml = r#"
exclude = ["vendor/**"]

[rules]
no_empty_block = "off"
max_nesting_depth = ["warn", { max = 6 }]
"#;

        let config = load_config_from_str(toml, Path::new("lualint.toml")).unwrap();
        assert!(!config.is_enabled("no_empty_block"));
        assert_eq!(
            config.get_options("max_nesting_depth"),
            Some(&serde_json::json!({ "max": 6 }))
        );
    }

    #[test]
    fn test_unknown_rule_is_rejected() {
        let result = load_config_from_str(
            r#"{ "rules": { "max_nesting": "warn" } }"#,
            Path::new(".lualintrc.json"),
        );
        let err = result.unwrap_err();
        assert!(
            err.to_string().contains("did you mean 'max_nesting_depth'"),
            "{err}"
        );
    }

    #[test]
    fn test_malformed_yaml_is_invalid() {
        let result = load_config_from_str("rules: [unclosed", Path::new(".lualintrc.yml"));
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_unsupported_extension() {
        let result = load_config_from_str("", Path::new("lualint.ini"));
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_find_config_in_current_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join(".lualintrc.yml");
        fs::write(&config_path, "rules: {}").unwrap();

        let found = find_config(temp_dir.path()).unwrap();
        assert_eq!(found, Some(config_path));
    }

    #[test]
    fn test_find_config_in_parent_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("lualint.toml");
        fs::write(&config_path, "").unwrap();

        let sub_dir = temp_dir.path().join("src").join("net");
        fs::create_dir_all(&sub_dir).unwrap();

        let found = find_config(&sub_dir).unwrap();
        assert_eq!(found, Some(config_path));
    }

    #[test]
    fn test_find_config_not_found() {
        let temp_dir = tempfile::tempdir().unwrap();
        let found = find_config(temp_dir.path()).unwrap();
        assert_eq!(found, None);
    }

    #[test]
    fn test_config_file_priority() {
        let temp_dir = tempfile::tempdir().unwrap();

        fs::write(temp_dir.path().join(".lualintrc.yml"), "rules: {}").unwrap();
        fs::write(temp_dir.path().join("lualint.toml"), "").unwrap();

        let found = find_config(temp_dir.path()).unwrap().unwrap();

        assert_eq!(found.file_name().unwrap(), ".lualintrc.yml");
    }
}
