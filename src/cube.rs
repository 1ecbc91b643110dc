//! Rubik's cube lattice data structures and geometry.
//!
//! This module defines the pieces of an N×N×N cube: colors, faces, axes, the
//! individual cubies and the lattice that owns them. Only surface cubies are
//! built; hidden interior pieces are never created.

use std::fmt;

use nalgebra::{IsometryMatrix3, Matrix3, Rotation3, Translation3, Unit, Vector3, Vector4};

use crate::config::CubeConfig;
use crate::error::CubeError;
use crate::math::{reparent, snap_to_lattice, snap_rotation};

/// Cartesian axis a layer is selected along and turned about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub(crate) const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Component index of this axis in a 3-vector
    pub(crate) fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    pub(crate) fn unit(self) -> Unit<Vector3<f32>> {
        match self {
            Axis::X => Vector3::x_axis(),
            Axis::Y => Vector3::y_axis(),
            Axis::Z => Vector3::z_axis(),
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::X => write!(f, "x"),
            Axis::Y => write!(f, "y"),
            Axis::Z => write!(f, "z"),
        }
    }
}

/// The six outward faces of a cubie, in the order their colors are stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum Face {
    Right,
    Left,
    Up,
    Down,
    Front,
    Back,
}

impl Face {
    pub(crate) const ALL: [Face; 6] = [
        Face::Right,
        Face::Left,
        Face::Up,
        Face::Down,
        Face::Front,
        Face::Back,
    ];

    pub(crate) fn axis(self) -> Axis {
        match self {
            Face::Right | Face::Left => Axis::X,
            Face::Up | Face::Down => Axis::Y,
            Face::Front | Face::Back => Axis::Z,
        }
    }

    /// `true` for the face pointing along the positive direction of its axis.
    pub(crate) fn is_positive(self) -> bool {
        matches!(self, Face::Right | Face::Up | Face::Front)
    }

    /// Outward unit normal of this face in the cubie's local frame.
    pub(crate) fn normal(self) -> Vector3<f32> {
        let sign = if self.is_positive() { 1.0 } else { -1.0 };
        self.axis().unit().into_inner() * sign
    }

    /// Face turned by the given key letter, case-insensitive.
    pub(crate) fn from_key(key: &str) -> Option<Face> {
        let mut chars = key.chars();
        let letter = chars.next()?;
        if chars.next().is_some() {
            return None;
        }
        match letter.to_ascii_uppercase() {
            'U' => Some(Face::Up),
            'D' => Some(Face::Down),
            'L' => Some(Face::Left),
            'R' => Some(Face::Right),
            'F' => Some(Face::Front),
            'B' => Some(Face::Back),
            _ => None,
        }
    }
}

impl fmt::Display for Face {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Face::Right => "right",
            Face::Left => "left",
            Face::Up => "up",
            Face::Down => "down",
            Face::Front => "front",
            Face::Back => "back",
        };
        write!(f, "{name}")
    }
}

/// Sticker colors, plus the dark color of faces hidden inside the cube.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Color {
    White,
    Yellow,
    Blue,
    Green,
    Red,
    Orange,
    Interior,
}

impl From<Color> for Vector4<f32> {
    /// Converts a color to sRGB-encoded RGBA.
    fn from(color: Color) -> Self {
        match color {
            Color::White => Vector4::new(1.0, 1.0, 1.0, 1.0),
            Color::Yellow => Vector4::new(1.0, 1.0, 0.0, 1.0),
            Color::Blue => Vector4::new(0.0, 0.0, 1.0, 1.0),
            Color::Green => Vector4::new(0.0, 1.0, 0.0, 1.0),
            Color::Red => Vector4::new(1.0, 0.0, 0.0, 1.0),
            Color::Orange => Vector4::new(1.0, 165.0 / 255.0, 0.0, 1.0),
            Color::Interior => Vector4::new(26.0 / 255.0, 26.0 / 255.0, 26.0 / 255.0, 1.0),
        }
    }
}

/// Edge lengths offered by the size selector.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CubeSize {
    Two,
    Three,
    Four,
}

impl CubeSize {
    pub(crate) const ALL: [CubeSize; 3] = [CubeSize::Two, CubeSize::Three, CubeSize::Four];

    /// Number of cubies along one edge
    pub(crate) fn edge(self) -> usize {
        match self {
            CubeSize::Two => 2,
            CubeSize::Three => 3,
            CubeSize::Four => 4,
        }
    }
}

impl TryFrom<usize> for CubeSize {
    type Error = CubeError;

    fn try_from(size: usize) -> Result<Self, Self::Error> {
        CubeSize::ALL
            .into_iter()
            .find(|candidate| candidate.edge() == size)
            .ok_or(CubeError::UnsupportedSize { size })
    }
}

impl fmt::Display for CubeSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.edge();
        write!(f, "{n}x{n}")
    }
}

/// Integer lattice coordinate a cubie was built at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct GridCoord(pub(crate) [usize; 3]);

impl GridCoord {
    pub(crate) fn get(&self, axis: Axis) -> usize {
        self.0[axis.index()]
    }

    /// Whether the coordinate touches the boundary a face looks out of.
    pub(crate) fn on_face(&self, face: Face, size: usize) -> bool {
        let g = self.get(face.axis());
        if face.is_positive() { g == size - 1 } else { g == 0 }
    }

    fn is_interior(&self, size: usize) -> bool {
        self.0.iter().all(|&g| g > 0 && g + 1 < size)
    }
}

/// Number of visible pieces in a cube of edge `size`.
pub(crate) fn piece_count(size: usize) -> usize {
    size.pow(3) - size.saturating_sub(2).pow(3)
}

/// World coordinate of grid index `g` along any axis.
pub(crate) fn grid_to_world(g: usize, size: usize, spacing: f32) -> f32 {
    (g as f32 - (size as f32 - 1.0) / 2.0) * spacing
}

/// One visible unit piece of the puzzle.
#[derive(Clone, Debug)]
pub(crate) struct Cubie {
    /// Stable identity across turns
    pub(crate) id: usize,
    /// Grid coordinate the cubie was built at
    pub(crate) home: GridCoord,
    /// Face colors in `Face::ALL` order, fixed in the cubie's local frame
    pub(crate) faces: [Color; 6],
    /// Transform relative to whichever frame currently holds the cubie
    pub(crate) transform: IsometryMatrix3<f32>,
}

impl Cubie {
    pub(crate) fn position(&self) -> Vector3<f32> {
        self.transform.translation.vector
    }

    pub(crate) fn face_color(&self, face: Face) -> Color {
        self.faces[face as usize]
    }
}

/// All surface cubies of one cube, held in a single container frame.
#[derive(Clone, Debug)]
pub(crate) struct Lattice {
    size: usize,
    spacing: f32,
    /// World transform of the container the cubies are parented to
    container: IsometryMatrix3<f32>,
    cubies: Vec<Cubie>,
}

impl Lattice {
    /// Builds a solved cube of edge `size`.
    ///
    /// Every cubie on the surface gets its puzzle colors on boundary faces and
    /// the interior color everywhere else. Strictly interior pieces are skipped.
    pub(crate) fn build(size: usize, config: &CubeConfig) -> Result<Self, CubeError> {
        if size == 0 {
            return Err(CubeError::UnsupportedSize { size });
        }
        let spacing = config.spacing();
        let palette = &config.palette;
        let mut cubies = Vec::with_capacity(piece_count(size));

        for i in 0..size {
            for j in 0..size {
                for k in 0..size {
                    let home = GridCoord([i, j, k]);
                    if home.is_interior(size) {
                        continue;
                    }

                    let faces = Face::ALL.map(|face| {
                        if home.on_face(face, size) {
                            palette.face(face)
                        } else {
                            palette.interior()
                        }
                    });
                    let translation = Translation3::new(
                        grid_to_world(i, size, spacing),
                        grid_to_world(j, size, spacing),
                        grid_to_world(k, size, spacing),
                    );

                    cubies.push(Cubie {
                        id: cubies.len(),
                        home,
                        faces,
                        transform: IsometryMatrix3::from_parts(translation, Rotation3::identity()),
                    });
                }
            }
        }

        Ok(Self {
            size,
            spacing,
            container: IsometryMatrix3::identity(),
            cubies,
        })
    }

    #[cfg(test)]
    pub(crate) fn size(&self) -> usize {
        self.size
    }

    #[cfg(test)]
    pub(crate) fn spacing(&self) -> f32 {
        self.spacing
    }

    pub(crate) fn container(&self) -> &IsometryMatrix3<f32> {
        &self.container
    }

    /// Cubies currently parented to the container.
    pub(crate) fn cubies(&self) -> &[Cubie] {
        &self.cubies
    }

    pub(crate) fn len(&self) -> usize {
        self.cubies.len()
    }

    /// Coordinate of the outermost layer on the positive (`true`) or negative side.
    pub(crate) fn boundary_layer(&self, positive: bool) -> f32 {
        let extent = grid_to_world(self.size - 1, self.size, self.spacing);
        if positive { extent } else { -extent }
    }

    /// Every valid layer coordinate along an axis, from negative to positive.
    #[cfg(test)]
    pub(crate) fn layer_positions(&self) -> Vec<f32> {
        (0..self.size)
            .map(|g| grid_to_world(g, self.size, self.spacing))
            .collect()
    }

    /// Cubies whose current position along `axis` lies within `tolerance` of `layer`.
    pub(crate) fn select(&self, axis: Axis, layer: f32, tolerance: f32) -> Vec<&Cubie> {
        self.cubies
            .iter()
            .filter(|cubie| on_layer(cubie, axis, layer, tolerance))
            .collect()
    }

    /// Removes the cubies of one layer, handing ownership to the caller.
    ///
    /// Transforms are left relative to the container; the caller reparents them.
    pub(crate) fn take_layer(&mut self, axis: Axis, layer: f32, tolerance: f32) -> Vec<Cubie> {
        let (taken, kept): (Vec<Cubie>, Vec<Cubie>) = std::mem::take(&mut self.cubies)
            .into_iter()
            .partition(|cubie| on_layer(cubie, axis, layer, tolerance));
        self.cubies = kept;
        taken
    }

    /// Reparents a cubie into the container without changing its world transform.
    pub(crate) fn attach(&mut self, mut cubie: Cubie, world: &IsometryMatrix3<f32>) {
        cubie.transform = reparent(world, &self.container);
        self.cubies.push(cubie);
    }

    /// Quantizes every position to the nearest lattice value and every
    /// orientation to the nearest quarter-turn rotation.
    pub(crate) fn snap(&mut self) {
        for cubie in &mut self.cubies {
            let mut position = cubie.position();
            for value in position.iter_mut() {
                *value = snap_to_lattice(*value, self.size, self.spacing);
            }
            cubie.transform = IsometryMatrix3::from_parts(
                Translation3::from(position),
                snap_rotation(&cubie.transform.rotation),
            );
        }
    }

    /// Whether every cubie sits at the coordinate it was built at, unrotated.
    ///
    /// Only exact equality counts; callers snap before asking.
    pub(crate) fn is_solved(&self) -> bool {
        self.cubies.iter().all(|cubie| {
            let position = cubie.position();
            *cubie.transform.rotation.matrix() == Matrix3::identity()
                && Axis::ALL.iter().all(|&axis| {
                    position[axis.index()]
                        == grid_to_world(cubie.home.get(axis), self.size, self.spacing)
                })
        })
    }
}

fn on_layer(cubie: &Cubie, axis: Axis, layer: f32, tolerance: f32) -> bool {
    (cubie.position()[axis.index()] - layer).abs() < tolerance
}

/// Corner positions of a unit cubie, four per face in `Face::ALL` order.
///
/// Each quad winds counter-clockwise when seen from outside the cubie.
#[rustfmt::skip]
pub(crate) const CUBIE_VERTICES: [[f32; 3]; 24] = [
    // Right (+x)
    [ 0.5, -0.5, -0.5], [ 0.5,  0.5, -0.5], [ 0.5,  0.5,  0.5], [ 0.5, -0.5,  0.5],
    // Left (-x)
    [-0.5, -0.5, -0.5], [-0.5, -0.5,  0.5], [-0.5,  0.5,  0.5], [-0.5,  0.5, -0.5],
    // Up (+y)
    [-0.5,  0.5, -0.5], [-0.5,  0.5,  0.5], [ 0.5,  0.5,  0.5], [ 0.5,  0.5, -0.5],
    // Down (-y)
    [-0.5, -0.5, -0.5], [ 0.5, -0.5, -0.5], [ 0.5, -0.5,  0.5], [-0.5, -0.5,  0.5],
    // Front (+z)
    [-0.5, -0.5,  0.5], [ 0.5, -0.5,  0.5], [ 0.5,  0.5,  0.5], [-0.5,  0.5,  0.5],
    // Back (-z)
    [-0.5, -0.5, -0.5], [-0.5,  0.5, -0.5], [ 0.5,  0.5, -0.5], [ 0.5, -0.5, -0.5],
];

/// Two triangles per face quad of `CUBIE_VERTICES`.
#[rustfmt::skip]
pub(crate) const CUBIE_INDICES: [u16; 36] = [
    0, 1, 2, 0, 2, 3,       // right
    4, 5, 6, 4, 6, 7,       // left
    8, 9, 10, 8, 10, 11,    // up
    12, 13, 14, 12, 14, 15, // down
    16, 17, 18, 16, 18, 19, // front
    20, 21, 22, 20, 22, 23, // back
];
