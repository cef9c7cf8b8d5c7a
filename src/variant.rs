use serde::{Deserialize, Serialize};

/// Rendering pipeline configuration under evaluation.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
pub enum Variant {
    /// Rasterizer with baked textures.
    #[serde(rename = "rast")]
    #[value(name = "rast")]
    Rasterizer,
    /// Gaussian-splatting viewer.
    #[serde(rename = "3dgs")]
    #[value(name = "3dgs")]
    Splatting,
    /// PBR without shadows.
    #[serde(rename = "pbr")]
    #[value(name = "pbr")]
    Pbr,
    /// PBR with shadow mapping.
    #[serde(rename = "pbr_shadow")]
    #[value(name = "pbr_shadow")]
    PbrShadow,
    /// PBR with percentage-closer-filtered shadows.
    #[serde(rename = "pbr_pcf")]
    #[value(name = "pbr_pcf")]
    PbrPcf,
}

/// Which ground-truth set a variant is scored against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Baseline {
    /// Opaque captures shared by the rasterizer and PBR family.
    Opaque,
    /// Held-out ground truth produced alongside the splatting renders.
    Splatting,
}

impl Variant {
    pub const ALL: [Variant; 5] = [
        Variant::Rasterizer,
        Variant::Splatting,
        Variant::Pbr,
        Variant::PbrShadow,
        Variant::PbrPcf,
    ];

    /// Short name used in directory names and CSV column suffixes.
    pub fn as_str(self) -> &'static str {
        match self {
            Variant::Rasterizer => "rast",
            Variant::Splatting => "3dgs",
            Variant::Pbr => "pbr",
            Variant::PbrShadow => "pbr_shadow",
            Variant::PbrPcf => "pbr_pcf",
        }
    }

    pub fn baseline(self) -> Baseline {
        match self {
            Variant::Splatting => Baseline::Splatting,
            _ => Baseline::Opaque,
        }
    }

    pub fn is_pbr(self) -> bool {
        matches!(self, Variant::Pbr | Variant::PbrShadow | Variant::PbrPcf)
    }
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
