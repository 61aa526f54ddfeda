use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::physics::PhysicsSettings;

/// Settings for the headless runner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Number of particles in the field
    pub particle_count: i64,
    /// Frames to advance before exiting
    pub frames: u64,
    /// Frames between progress reports, 0 to disable
    pub report_every: u64,
    /// Fixed seed; a clock seed is used when absent
    pub seed: Option<u64>,
    pub physics: PhysicsSettings,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            particle_count: 2500,
            frames: 600,
            report_every: 60,
            seed: None,
            physics: PhysicsSettings::default(),
        }
    }
}

impl AppSettings {
    const SETTINGS_FILE: &'static str = "settings.toml";

    /// Loads settings from the settings file, or returns default settings if the file doesn't exist
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        Self::load_from(Self::SETTINGS_FILE)
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let path = path.as_ref();
        if path.exists() {
            let contents = fs::read_to_string(path)?;
            Ok(Self::from_toml_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(AppSettings::from_toml_str("").unwrap(), AppSettings::default());
    }

    #[test]
    fn partial_tables_keep_remaining_defaults() {
        let settings = AppSettings::from_toml_str(
            r#"
            particle_count = 300
            seed = 42

            [physics]
            rmax = 0.05
            "#,
        )
        .unwrap();
        assert_eq!(settings.particle_count, 300);
        assert_eq!(settings.seed, Some(42));
        assert_eq!(settings.frames, 600);
        assert_eq!(settings.physics.rmax, 0.05);
        assert_eq!(settings.physics.dt, 0.02);
        assert_eq!(settings.physics.grid_size(), 20);
    }

    #[test]
    fn malformed_file_is_an_error() {
        assert!(AppSettings::from_toml_str("frames = \"many\"").is_err());
    }

    #[test]
    fn missing_file_gives_defaults() {
        let settings = AppSettings::load_from("definitely/not/here/settings.toml").unwrap();
        assert_eq!(settings, AppSettings::default());
    }
}
