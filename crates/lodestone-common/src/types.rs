pub type Result<T> = std::result::Result<T, crate::error::LodestoneError>;

/// A world dimension, as it appears in API URLs and on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Overworld,
    Nether,
    End,
}

impl Dimension {
    pub fn from_url_part(part: &str) -> Option<Self> {
        match part {
            "overworld" => Some(Dimension::Overworld),
            "nether" => Some(Dimension::Nether),
            "end" => Some(Dimension::End),
            _ => None,
        }
    }

    /// Subdirectory of the world directory holding this dimension's region
    /// files.
    pub fn region_subdir(&self) -> &'static str {
        match self {
            Dimension::Overworld => "region",
            Dimension::Nether => "DIM-1/region",
            Dimension::End => "DIM1/region",
        }
    }
}

/// Region coordinate containing a chunk coordinate. Arithmetic shift so that
/// negative chunks land in the right region (floor division by 32).
pub fn region_coord(chunk_coord: i32) -> i32 {
    chunk_coord >> 5
}

/// Index of a chunk column inside its region's 32x32 location table.
pub fn location_index(chunk_x: i32, chunk_z: i32) -> usize {
    ((chunk_z.rem_euclid(32)) * 32 + chunk_x.rem_euclid(32)) as usize
}
