//! Error types for cube construction and layer turns.

use std::fmt;

use crate::cube::Axis;

/// Errors arising from building the lattice or requesting a turn.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum CubeError {
    /// A turn is already animating; the request was dropped.
    Busy,
    /// No cubie lies on the requested layer.
    EmptyLayer {
        /// Axis the layer was selected along.
        axis: Axis,
        /// Layer coordinate that matched nothing.
        layer: f32,
    },
    /// The requested edge length cannot be built.
    UnsupportedSize {
        /// The offending size.
        size: usize,
    },
    /// A configuration value would break lattice selection.
    InvalidConfig {
        /// What went wrong.
        reason: String,
    },
}

impl fmt::Display for CubeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Busy => write!(f, "a layer turn is already in progress"),
            Self::EmptyLayer { axis, layer } => {
                write!(f, "no cubies on layer {axis}={layer:.3}")
            }
            Self::UnsupportedSize { size } => {
                write!(f, "cube size {size} is not supported")
            }
            Self::InvalidConfig { reason } => write!(f, "invalid cube config: {reason}"),
        }
    }
}

impl std::error::Error for CubeError {}
