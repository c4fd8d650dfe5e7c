pub mod biome;
pub mod terrain;

pub use biome::Biome;
pub use terrain::{HeightField, Octave, TerrainGenerator};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerrainVariant {
    Mountainous,
    Valley,
    FlatDebug,
}

impl TerrainVariant {
    pub fn height_field(self) -> HeightField {
        match self {
            TerrainVariant::Mountainous => HeightField::MOUNTAINOUS,
            TerrainVariant::Valley => HeightField::VALLEY,
            TerrainVariant::FlatDebug => HeightField::FLAT_DEBUG,
        }
    }

    pub fn default_biome(self) -> Biome {
        match self {
            TerrainVariant::Mountainous => Biome::Alpine { snow_line: 0.55 },
            TerrainVariant::Valley => Biome::Grassland,
            TerrainVariant::FlatDebug => Biome::Bare,
        }
    }
}
