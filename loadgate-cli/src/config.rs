//! Profile loading
//!
//! A profile is a TOML rendition of [`AnalyzerConfig`]: retention cap,
//! sample kinds, request groups and tolerance rules. Analyses without a
//! profile run on the defaults (thread-group keying, checks disabled).

use std::path::Path;

use anyhow::{Context, Result};
use loadgate_core::AnalyzerConfig;

/// Load an [`AnalyzerConfig`] from a TOML profile file.
pub fn load_profile(path: &Path) -> Result<AnalyzerConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read profile: {}", path.display()))?;
    let config: AnalyzerConfig =
        toml::from_str(&text).with_context(|| format!("invalid profile: {}", path.display()))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use loadgate_core::ToleranceDirection;
    use std::io::Write;

    #[test]
    fn test_load_profile() {
        let path = std::env::temp_dir().join("loadgate_profile_test.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            r#"
max_samples = 1000
generate_details = true

[[request_groups]]
name = "pages"
pattern = "/pages/**"

[checks.throughput]
threshold = 100.0
direction = "upper"

[checks.errors]
threshold = 1.0
tolerance = 10.0
direction = "upper-tolerance"
"#
        )
        .unwrap();
        drop(file);

        let config = load_profile(&path).unwrap();
        assert_eq!(config.max_samples, 1000);
        assert!(config.generate_details);
        assert_eq!(config.request_groups.len(), 1);
        assert_eq!(config.request_groups[0].name, "pages");
        assert_eq!(config.checks.throughput.threshold, 100.0);
        assert_eq!(config.checks.throughput.direction, ToleranceDirection::Upper);
        assert_eq!(config.checks.errors.tolerance, 10.0);
        // unspecified fields keep their defaults
        assert!(config.sample_kinds.contains("httpSample"));

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_invalid_profile() {
        let path = std::env::temp_dir().join("loadgate_profile_invalid.toml");
        std::fs::write(&path, "max_samples = \"many\"").unwrap();

        let result = load_profile(&path);
        assert!(result.is_err());

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_missing_profile() {
        let path = std::env::temp_dir().join("loadgate_profile_does_not_exist.toml");
        assert!(load_profile(&path).is_err());
    }
}
