use clap::Args;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Tuning knobs for the consolidation pipeline.
///
/// Every field has a default so a partial JSON file is accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsolidationConfig {
    /// Decimal digits kept when keying keypoints by their uv coordinate.
    pub uv_precision: u32,
    /// Relative tolerance of the uv closeness test.
    pub remap_rtol: f64,
    /// Absolute tolerance of the uv closeness test.
    pub remap_atol: f64,
    /// The assumed ground under a camera is kept at least this far below it.
    pub elevation_floor_margin: f64,
    /// Where the linker persists its working list between passes.
    pub checkpoint_path: Option<PathBuf>,
    /// Run the per image and per track stages on the rayon pool.
    pub parallel: bool,
}

impl Default for ConsolidationConfig {
    fn default() -> Self {
        Self {
            uv_precision: 2,
            remap_rtol: 1e-4,
            remap_atol: 1e-8,
            elevation_floor_margin: 1.0,
            checkpoint_path: None,
            parallel: true,
        }
    }
}

impl ConsolidationConfig {
    /// Multiplier turning a uv coordinate into its fixed point key.
    pub fn uv_scale(&self) -> f64 {
        10f64.powi(self.uv_precision as i32)
    }

    /// Same test as numpy `allclose`, component wise.
    pub fn uv_close(&self, a: glam::DVec2, b: glam::DVec2) -> bool {
        let close =
            |x: f64, y: f64| (x - y).abs() <= self.remap_atol + self.remap_rtol * y.abs();
        close(a.x, b.x) && close(a.y, b.y)
    }
}

/// Command line flags layered over a [`ConsolidationConfig`].
#[derive(Debug, Clone, Default, Args)]
pub struct ConfigOverrides {
    /// decimal digits kept when comparing keypoint uv coordinates
    #[arg(long)]
    pub uv_precision: Option<u32>,

    /// relative tolerance of the keypoint remap sanity check
    #[arg(long)]
    pub remap_rtol: Option<f64>,

    /// absolute tolerance of the keypoint remap sanity check
    #[arg(long)]
    pub remap_atol: Option<f64>,

    /// minimum gap between a camera and the ground assumed beneath it
    #[arg(long)]
    pub elevation_floor_margin: Option<f64>,

    /// persist linker passes here so an interrupted run can resume
    #[arg(long)]
    pub checkpoint: Option<PathBuf>,

    /// run every stage on a single thread
    #[arg(long, default_value_t = false)]
    pub sequential: bool,
}

impl ConfigOverrides {
    /// Replaces every field of `config` that has a flag set.
    pub fn apply(&self, config: &mut ConsolidationConfig) {
        if let Some(v) = self.uv_precision {
            config.uv_precision = v;
        }
        if let Some(v) = self.remap_rtol {
            config.remap_rtol = v;
        }
        if let Some(v) = self.remap_atol {
            config.remap_atol = v;
        }
        if let Some(v) = self.elevation_floor_margin {
            config.elevation_floor_margin = v;
        }
        if let Some(v) = &self.checkpoint {
            config.checkpoint_path = Some(v.clone());
        }
        if self.sequential {
            config.parallel = false;
        }
    }
}
