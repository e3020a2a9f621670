use lodestone_common::{LodestoneError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Process configuration, loaded once from a TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Directory containing one subdirectory per world.
    pub worlds_dir: PathBuf,
    /// Directory containing the static reference tables
    /// (`biomes.json`, `items.json`).
    pub assets_dir: PathBuf,
    /// Identities allowed to call member-only endpoints.
    #[serde(default)]
    pub members: Vec<String>,
    /// Known players: display name to Minecraft UUID.
    #[serde(default)]
    pub players: HashMap<String, Uuid>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|err| {
            LodestoneError::FormatError(format!("config {}: {}", path.display(), err))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let config: Config = toml::from_str(
            r#"
            worlds_dir = "/srv/worlds"
            assets_dir = "/srv/assets/json"
            "#,
        )
        .unwrap();
        assert_eq!(config.worlds_dir, PathBuf::from("/srv/worlds"));
        assert!(config.members.is_empty());
        assert!(config.players.is_empty());
    }

    #[test]
    fn test_parse_members_and_players() {
        let config: Config = toml::from_str(
            r#"
            worlds_dir = "/srv/worlds"
            assets_dir = "/srv/assets/json"
            members = ["fenhl", "wurstpick"]

            [players]
            fenhl = "be9ec550-5da2-46eb-ab11-cfcf088e2c9c"
            "#,
        )
        .unwrap();
        assert_eq!(config.members.len(), 2);
        assert!(config.players.contains_key("fenhl"));
    }
}
