use serde::{Deserialize, Serialize};

/// Full-strength sunlight value written by the lighting stage.
pub const MAX_SUNLIGHT: u8 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u16)]
pub enum BlockType {
    #[default]
    None = 0,
    Rock = 1,
    Dirt = 2,
    Grass = 3,
    Sand = 4,
    Snow = 5,
    Water = 6,
    Log = 7,
    Leaves = 8,
}

impl BlockType {
    pub fn from_id(id: u16) -> Self {
        match id {
            1 => Self::Rock,
            2 => Self::Dirt,
            3 => Self::Grass,
            4 => Self::Sand,
            5 => Self::Snow,
            6 => Self::Water,
            7 => Self::Log,
            8 => Self::Leaves,
            _ => Self::None,
        }
    }

    pub fn id(self) -> u16 {
        self as u16
    }

    pub fn is_solid(self) -> bool {
        !matches!(self, Self::None | Self::Water)
    }

    /// Base vertex color used by the mesher.
    pub fn color(self) -> [u8; 3] {
        match self {
            Self::None => [0, 0, 0],
            Self::Rock => [128, 128, 128],
            Self::Dirt => [134, 96, 67],
            Self::Grass => [95, 159, 53],
            Self::Sand => [219, 207, 163],
            Self::Snow => [240, 240, 250],
            Self::Water => [64, 96, 220],
            Self::Log => [102, 81, 51],
            Self::Leaves => [60, 120, 40],
        }
    }
}

/// A single voxel. Plain value type, six bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(C)]
pub struct Block {
    pub block_type: BlockType,
    pub sun_light: u8,
    pub color_r: u8,
    pub color_g: u8,
    pub color_b: u8,
}

impl Block {
    pub const AIR: Block = Block {
        block_type: BlockType::None,
        sun_light: 0,
        color_r: 0,
        color_g: 0,
        color_b: 0,
    };

    pub fn new(block_type: BlockType) -> Self {
        Self {
            block_type,
            ..Self::AIR
        }
    }

    pub fn with_light(block_type: BlockType, sun_light: u8) -> Self {
        Self {
            block_type,
            sun_light,
            ..Self::AIR
        }
    }

    pub fn is_solid(&self) -> bool {
        self.block_type.is_solid()
    }

    pub fn is_empty(&self) -> bool {
        self.block_type == BlockType::None
    }

    // Layout: type in bits 0..16, sunlight 16..24, then r, g, b.
    pub(crate) fn pack(self) -> u64 {
        self.block_type.id() as u64
            | (self.sun_light as u64) << 16
            | (self.color_r as u64) << 24
            | (self.color_g as u64) << 32
            | (self.color_b as u64) << 40
    }

    pub(crate) fn unpack(bits: u64) -> Self {
        Self {
            block_type: BlockType::from_id((bits & 0xFFFF) as u16),
            sun_light: (bits >> 16) as u8,
            color_r: (bits >> 24) as u8,
            color_g: (bits >> 32) as u8,
            color_b: (bits >> 40) as u8,
        }
    }
}
