// 🔌 Analysis model seam
//
// Entities describe what they contribute to a time-domain analysis model;
// the model itself (OrcaFlex or anything else) lives behind `ModelBuilder`.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// A mooring line as handed to the analysis model (SI units)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineSpec {
    pub name: String,

    /// Anchor position (x, y, z), z negative below MSL
    pub anchor: [f64; 3],

    /// Fairlead position; None while the line is not hooked up
    pub fairlead: Option<[f64; 3]>,

    pub length: f64,

    /// Structural (nominal) diameter after corrosion
    pub nominal_diameter: f64,

    /// Diameter seen by the fluid, including marine growth
    pub hydrodynamic_diameter: f64,

    /// Mass per unit length in air, including marine growth
    pub mass_per_length: f64,

    pub connected: bool,
}

impl LineSpec {
    pub fn heading_deg(&self) -> f64 {
        self.anchor[1].atan2(self.anchor[0]).to_degrees()
    }
}

/// Receiver of generated model objects
pub trait ModelBuilder {
    fn add_line(&mut self, line: LineSpec) -> Result<()>;
}

/// In-memory model that keeps everything it receives
#[derive(Debug, Clone, Default, Serialize)]
pub struct RecordingModel {
    lines: Vec<LineSpec>,
}

impl RecordingModel {
    pub fn new() -> Self {
        RecordingModel::default()
    }

    pub fn lines(&self) -> &[LineSpec] {
        &self.lines
    }

    pub fn line(&self, name: &str) -> Option<&LineSpec> {
        self.lines.iter().find(|l| l.name == name)
    }
}

impl ModelBuilder for RecordingModel {
    fn add_line(&mut self, line: LineSpec) -> Result<()> {
        if self.line(&line.name).is_some() {
            bail!("Model already contains a line named '{}'", line.name);
        }
        self.lines.push(line);
        Ok(())
    }
}
