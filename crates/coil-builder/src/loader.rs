//! Experiment config loading from JSON files

use crate::config::ExperimentConfig;
use crate::Result;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::info;

/// Load an experiment config from a JSON file
pub fn load_config(path: impl AsRef<Path>) -> Result<ExperimentConfig> {
    let path = path.as_ref();
    info!("Loading experiment config from {:?}", path);

    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let config: ExperimentConfig = serde_json::from_reader(reader)?;

    info!(
        "Loaded config: {} x {} at {:?} MHz",
        config.count, config.antenna.kind, config.frequencies_mhz
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BuilderError;
    use coil_geometry::AntennaKind;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config() {
        let json = r#"{
            "name": "Lumped Array",
            "count": 4,
            "antenna": {"kind": "Lumped", "length": 300, "matching": true},
            "spacers": {"length": 300, "width": 100, "height": 10},
            "bounding_margin": 20,
            "phantom": {"scale": 0.95},
            "frequencies_mhz": [298, 596],
            "lumped_values": ["5pF", "20nH"],
            "clear": ["Lumped Array", "Spacer Group", "Bounding Box"]
        }"#;

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.count, 4);
        assert_eq!(config.antenna.kind, AntennaKind::Lumped);
        assert!(config.antenna.matching);
        assert_eq!(config.frequencies_mhz, vec![298, 596]);
        assert_eq!(config.lumped_values.len(), 2);
        assert_eq!(config.clear.len(), 3);
        assert_eq!(config.bounding_margin, Some(20.0));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_config(dir.path().join("absent.json"));
        assert!(matches!(result, Err(BuilderError::Io(_))));
    }

    #[test]
    fn test_load_malformed_json() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"{\"count\": ").unwrap();
        assert!(matches!(load_config(file.path()), Err(BuilderError::Json(_))));
    }
}
