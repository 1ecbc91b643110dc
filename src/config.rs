//! Tunable dimensions, speeds and colors of the puzzle.

use std::f32::consts::PI;

use crate::cube::{Color, Face};
use crate::error::CubeError;

/// Edge length of a single cubie
const CUBE_SIZE: f32 = 1.0;
/// Space left between neighbouring cubies
const GAP: f32 = 0.1;
/// Angle advanced per rendered frame, in radians
const ROTATION_SPEED: f32 = 0.02 * PI;
/// Maximum distance between a cubie and a layer for it to count as on that layer
const SELECTION_TOLERANCE: f32 = 0.1;

/// Colors used for the six puzzle faces and for hidden faces.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Palette {
    /// Indexed by `Face as usize`
    faces: [Color; 6],
    interior: Color,
}

impl Palette {
    pub(crate) fn face(&self, face: Face) -> Color {
        self.faces[face as usize]
    }

    pub(crate) fn interior(&self) -> Color {
        self.interior
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            faces: [
                Color::Green,  // Right
                Color::Blue,   // Left
                Color::White,  // Up
                Color::Yellow, // Down
                Color::Red,    // Front
                Color::Orange, // Back
            ],
            interior: Color::Interior,
        }
    }
}

/// Geometry and animation settings shared by the builder, selector and animator.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct CubeConfig {
    /// Edge length of a single cubie
    pub(crate) cube_size: f32,
    /// Space between neighbouring cubies
    pub(crate) gap: f32,
    /// Fixed angular increment per frame (radians)
    pub(crate) rotation_speed: f32,
    /// Layer matching tolerance, must stay below half the spacing
    pub(crate) selection_tolerance: f32,
    pub(crate) palette: Palette,
}

impl CubeConfig {
    /// Distance between the centers of two neighbouring cubies.
    pub(crate) fn spacing(&self) -> f32 {
        self.cube_size + self.gap
    }

    /// Rejects settings under which layer selection could pick the wrong pieces
    /// or a turn would never finish.
    pub(crate) fn validate(&self) -> Result<(), CubeError> {
        if self.cube_size.is_nan() || self.cube_size <= 0.0 {
            return Err(CubeError::InvalidConfig {
                reason: format!("cube size must be positive, got {}", self.cube_size),
            });
        }
        if self.gap.is_nan() || self.gap < 0.0 {
            return Err(CubeError::InvalidConfig {
                reason: format!("gap must not be negative, got {}", self.gap),
            });
        }
        if self.rotation_speed.is_nan() || self.rotation_speed <= 0.0 {
            return Err(CubeError::InvalidConfig {
                reason: format!(
                    "rotation speed must be positive, got {}",
                    self.rotation_speed
                ),
            });
        }
        let half_spacing = self.spacing() / 2.0;
        let tolerance = self.selection_tolerance;
        if tolerance.is_nan() || tolerance <= 0.0 || tolerance >= half_spacing {
            return Err(CubeError::InvalidConfig {
                reason: format!(
                    "selection tolerance {} must lie in (0, {half_spacing})",
                    self.selection_tolerance
                ),
            });
        }
        Ok(())
    }
}

impl Default for CubeConfig {
    fn default() -> Self {
        Self {
            cube_size: CUBE_SIZE,
            gap: GAP,
            rotation_speed: ROTATION_SPEED,
            selection_tolerance: SELECTION_TOLERANCE,
            palette: Palette::default(),
        }
    }
}
