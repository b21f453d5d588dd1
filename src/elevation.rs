use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Ground height lookup, meters above the NED origin (positive up).
pub trait ElevationModel: Sync {
    fn elevation_at(&self, north: f64, east: f64) -> f64;
}

/// Prior surface estimate per image, e.g. from an earlier reconstruction.
pub trait SurfaceElevation: Sync {
    fn surface_elevation(&self, image_name: &str) -> Option<f64>;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlatElevation(pub f64);

impl ElevationModel for FlatElevation {
    fn elevation_at(&self, _north: f64, _east: f64) -> f64 {
        self.0
    }
}

/// Heights sampled on a regular north/east grid.
///
/// `heights` is row major with `rows` rows along north and `cols` columns
/// along east. Queries outside the grid use the nearest border value. A grid
/// can only be built (or deserialized) with at least one sample, a matching
/// number of heights and a positive spacing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GridSamples")]
pub struct GridElevation {
    origin_ne: [f64; 2],
    spacing: f64,
    rows: usize,
    cols: usize,
    heights: Vec<f64>,
}

/// Unchecked wire form of [`GridElevation`].
#[derive(Deserialize)]
struct GridSamples {
    origin_ne: [f64; 2],
    spacing: f64,
    rows: usize,
    cols: usize,
    heights: Vec<f64>,
}

impl TryFrom<GridSamples> for GridElevation {
    type Error = Error;

    fn try_from(s: GridSamples) -> Result<GridElevation> {
        GridElevation::new(s.origin_ne, s.spacing, s.rows, s.cols, s.heights)
    }
}

impl GridElevation {
    pub fn new(
        origin_ne: [f64; 2],
        spacing: f64,
        rows: usize,
        cols: usize,
        heights: Vec<f64>,
    ) -> Result<GridElevation> {
        if rows == 0 || cols == 0 {
            return Err(Error::InvalidGrid("grid has no samples".to_string()));
        }
        if heights.len() != rows * cols {
            return Err(Error::InvalidGrid(format!(
                "{} heights for a {}x{} grid",
                heights.len(),
                rows,
                cols
            )));
        }
        if !(spacing > 0.0) {
            return Err(Error::InvalidGrid(format!(
                "spacing {} must be positive",
                spacing
            )));
        }
        Ok(GridElevation {
            origin_ne,
            spacing,
            rows,
            cols,
            heights,
        })
    }

    pub fn origin_ne(&self) -> [f64; 2] {
        self.origin_ne
    }

    pub fn spacing(&self) -> f64 {
        self.spacing
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    fn at(&self, r: usize, c: usize) -> f64 {
        self.heights[r * self.cols + c]
    }

    /// Fractional grid coordinate clamped into `[0, n - 1]`, split into the
    /// lower cell index and the weight of the upper one.
    fn cell(x: f64, n: usize) -> (usize, f64) {
        let x = x.clamp(0.0, (n - 1) as f64);
        let i = (x.floor() as usize).min(n.saturating_sub(2));
        (i, x - i as f64)
    }
}

impl ElevationModel for GridElevation {
    fn elevation_at(&self, north: f64, east: f64) -> f64 {
        let (r, fr) = Self::cell((north - self.origin_ne[0]) / self.spacing, self.rows);
        let (c, fc) = Self::cell((east - self.origin_ne[1]) / self.spacing, self.cols);
        let r1 = (r + 1).min(self.rows - 1);
        let c1 = (c + 1).min(self.cols - 1);
        let top = self.at(r, c) * (1.0 - fc) + self.at(r, c1) * fc;
        let bottom = self.at(r1, c) * (1.0 - fc) + self.at(r1, c1) * fc;
        top * (1.0 - fr) + bottom * fr
    }
}

/// Elevation source as stored in a project's `elevation.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ElevationSource {
    Flat { elevation_m: f64 },
    Grid(GridElevation),
}

impl ElevationModel for ElevationSource {
    fn elevation_at(&self, north: f64, east: f64) -> f64 {
        match self {
            ElevationSource::Flat { elevation_m } => *elevation_m,
            ElevationSource::Grid(grid) => grid.elevation_at(north, east),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoSurface;

impl SurfaceElevation for NoSurface {
    fn surface_elevation(&self, _image_name: &str) -> Option<f64> {
        None
    }
}

impl SurfaceElevation for HashMap<String, f64> {
    fn surface_elevation(&self, image_name: &str) -> Option<f64> {
        self.get(image_name).copied()
    }
}
