//! Shared argument presets.
//!
//! Parameters that nearly every module needs are declared once here so the
//! flag spelling, metavar and help text stay identical across modules.

use crate::table::ArgSpec;

/// Keys accepted by [`parameter`].
pub const COMMON_PARAMETER_KEYS: &[&str] = &["resource_group_name", "location"];

/// Look up a preset by its key.
pub fn parameter(key: &str) -> Option<ArgSpec> {
    match key {
        "resource_group_name" => Some(resource_group()),
        "location" => Some(location()),
        _ => None,
    }
}

/// `--resourcegroup -g RESOURCE GROUP` (required).
pub fn resource_group() -> ArgSpec {
    ArgSpec::new("--resourcegroup -g")
        .metavar("RESOURCE GROUP")
        .help("Name of resource group")
        .required(true)
}

/// `--location -l LOCATION` (required).
pub fn location() -> ArgSpec {
    ArgSpec::new("--location -l")
        .metavar("LOCATION")
        .help("Location")
        .required(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_key_resolves() {
        for key in COMMON_PARAMETER_KEYS {
            assert!(parameter(key).is_some(), "missing preset for {key}");
        }
        assert!(parameter("subscription").is_none());
    }

    #[test]
    fn test_resource_group_preset() {
        let spec = parameter("resource_group_name").expect("preset");
        assert_eq!(spec.name, "--resourcegroup -g");
        assert!(spec.is_required());
        assert_eq!(
            spec.get("metavar").and_then(|v| v.as_str()),
            Some("RESOURCE GROUP")
        );
    }
}
