use crate::config::components::global::DuctConfig;
use crate::config::error::ConfigError;
use log::{debug, info};
use serde_yaml::Value;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_ENV_VAR: &str = "DATADUCT_CONFIG_PATH";
pub const SYSTEM_CONFIG_PATH: &str = "/etc/dataduct.cfg";
const USER_CONFIG_PATH: &str = ".dataduct/dataduct.cfg";

/// Candidate config files in precedence order; later entries override earlier.
pub fn config_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(SYSTEM_CONFIG_PATH)];
    if let Some(home) = env::var_os("HOME") {
        paths.push(PathBuf::from(home).join(USER_CONFIG_PATH));
    }
    if let Ok(extra) = env::var(CONFIG_ENV_VAR) {
        paths.extend(
            extra
                .split(':')
                .filter(|p| !p.trim().is_empty())
                .map(|p| PathBuf::from(p.trim())),
        );
    }
    paths
}

/// Load the process configuration from the standard search path.
pub fn load_config() -> Result<DuctConfig, ConfigError> {
    load_config_from(&config_paths())
}

/// Merge every existing file of `paths` (in order) into one config record.
/// At least one file must exist.
pub fn load_config_from(paths: &[PathBuf]) -> Result<DuctConfig, ConfigError> {
    let mut merged: Option<Value> = None;
    for path in paths {
        if !path.is_file() {
            debug!("config file {} not present, skipping", path.display());
            continue;
        }
        info!("loading config from {}", path.display());
        let overlay = read_yaml(path)?;
        match merged.as_mut() {
            Some(base) => merge_yaml(base, overlay),
            None => merged = Some(overlay),
        }
    }

    match merged {
        Some(value) => DuctConfig::from_value(value),
        None => Err(ConfigError::no_config_file(paths)),
    }
}

fn read_yaml(path: &Path) -> Result<Value, ConfigError> {
    let raw = fs::read_to_string(path)?;
    let value: Value = serde_yaml::from_str(&raw).map_err(|e| {
        ConfigError::parse_error(format!("{}: {}", path.display(), e))
    })?;
    Ok(match value {
        Value::Null => Value::Mapping(Default::default()),
        other => other,
    })
}

/// Deep-merge `overlay` into `base`: mappings merge key by key, anything else
/// is replaced wholesale.
pub fn merge_yaml(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_yaml(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use test_utils::with_env_var;

    fn write_cfg(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = fs::File::create(&path).expect("create cfg");
        file.write_all(body.as_bytes()).expect("write cfg");
        path
    }

    #[test]
    fn later_files_override_earlier() {
        let tmp = tempfile::tempdir().unwrap();
        let base = write_cfg(
            tmp.path(),
            "base.cfg",
            "etl:\n  s3_etl_bucket: base-bucket\n  max_retries: 2\nec2:\n  instance_type: m3.xlarge\n",
        );
        let over = write_cfg(tmp.path(), "over.cfg", "etl:\n  s3_etl_bucket: override-bucket\n");

        let config = load_config_from(&[base, tmp.path().join("missing.cfg"), over])
            .expect("load layered config");
        assert_eq!(config.etl.bucket().unwrap(), "override-bucket");
        // untouched keys survive the merge
        assert_eq!(config.etl.max_retries, 2);
        assert_eq!(config.ec2.instance_type, "m3.xlarge");
    }

    #[test]
    fn no_existing_file_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = load_config_from(&[tmp.path().join("nope.cfg")]).unwrap_err();
        assert!(matches!(err, ConfigError::NoConfigFile { .. }));
    }

    #[test]
    fn env_var_entries_are_appended() {
        let paths = with_env_var(CONFIG_ENV_VAR, Some("/tmp/a.cfg:/tmp/b.cfg"), config_paths);
        assert_eq!(paths[0], PathBuf::from(SYSTEM_CONFIG_PATH));
        assert_eq!(paths[paths.len() - 2], PathBuf::from("/tmp/a.cfg"));
        assert_eq!(paths[paths.len() - 1], PathBuf::from("/tmp/b.cfg"));
    }

    #[test]
    fn lists_are_replaced_not_appended() {
        let mut base: Value = serde_yaml::from_str("bootstrap:\n  ec2: [a, b]\n").unwrap();
        let overlay: Value = serde_yaml::from_str("bootstrap:\n  ec2: [c]\n").unwrap();
        merge_yaml(&mut base, overlay);
        let expected: Value = serde_yaml::from_str("bootstrap:\n  ec2: [c]\n").unwrap();
        assert_eq!(base, expected);
    }
}
