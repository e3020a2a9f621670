//! The member/world directory is an external collaborator; this layer only
//! needs three lookups from it.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use uuid::Uuid;

/// Capability for resolving worlds, players and membership. The real site
/// backs this with its people database; the binary and the tests use
/// [`StaticDirectory`].
pub trait Directory {
    /// Root directory of a world's save data, if the world exists.
    fn world_dir(&self, world: &str) -> Option<PathBuf>;

    /// Minecraft UUID of a player, by display name or textual UUID.
    fn player_uuid(&self, player: &str) -> Option<Uuid>;

    /// Whether the presented identity may call member-only endpoints.
    fn is_member(&self, identity: &str) -> bool;
}

/// Directory backed by a fixed configuration: worlds are subdirectories of
/// one base path, members and players come from the config file.
pub struct StaticDirectory {
    worlds_dir: PathBuf,
    members: HashSet<String>,
    players: HashMap<String, Uuid>,
}

impl StaticDirectory {
    pub fn new(
        worlds_dir: PathBuf,
        members: impl IntoIterator<Item = String>,
        players: HashMap<String, Uuid>,
    ) -> Self {
        StaticDirectory {
            worlds_dir,
            members: members.into_iter().collect(),
            players,
        }
    }

    pub fn from_config(config: &crate::Config) -> Self {
        StaticDirectory::new(
            config.worlds_dir.clone(),
            config.members.iter().cloned(),
            config.players.clone(),
        )
    }
}

impl Directory for StaticDirectory {
    fn world_dir(&self, world: &str) -> Option<PathBuf> {
        // World names come from URLs; never let them traverse the tree.
        if world.is_empty() || !world.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-') {
            return None;
        }
        let dir = self.worlds_dir.join(world);
        dir.is_dir().then_some(dir)
    }

    fn player_uuid(&self, player: &str) -> Option<Uuid> {
        self.players
            .get(player)
            .copied()
            .or_else(|| Uuid::parse_str(player).ok())
    }

    fn is_member(&self, identity: &str) -> bool {
        self.members.contains(identity)
    }
}
