//! Processing element.

use serde::Serialize;

/// A single simulated core with fixed capacity in MIPS.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct Pe {
    pub id: u32,
    pub mips: f64,
}

impl Pe {
    pub fn new(id: u32, mips: f64) -> Self {
        Self { id, mips }
    }
}
