use serde::{Deserialize, Serialize};

/// Floating-point width used for stored parameters and layer outputs.
///
/// Values are always carried as `f64`; `F32` rounds every decoded parameter
/// and every layer output to the nearest `f32`, which reproduces models that
/// were evaluated with 32-bit arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Precision {
    #[default]
    F32,
    F64,
}

impl Precision {
    pub fn round(self, x: f64) -> f64 {
        match self {
            Precision::F32 => x as f32 as f64,
            Precision::F64 => x,
        }
    }
}

impl std::str::FromStr for Precision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "f32" | "32" => Ok(Precision::F32),
            "f64" | "64" => Ok(Precision::F64),
            other => Err(format!("unknown precision `{other}` (expected f32 or f64)")),
        }
    }
}
