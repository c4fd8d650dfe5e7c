use crate::world::generator::TerrainVariant;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldGenConfig {
    // World Generation
    pub world_seed: u64,
    pub terrain: TerrainVariant,
}

impl Default for WorldGenConfig {
    fn default() -> Self {
        Self {
            world_seed: 12345,
            terrain: TerrainVariant::Mountainous,
        }
    }
}
