//! Layer turn animation.
//!
//! A turn detaches one layer of cubies into a temporary pivot frame, rotates
//! the pivot by a fixed angle every frame until it reaches a quarter turn, then
//! hands the cubies back to the lattice and snaps them onto the grid.
//!
//! The animator never blocks: the host calls [`RotationAnimator::tick`] once per
//! rendered frame and all progress lives in [`AnimatorState`].

use std::f32::consts::FRAC_PI_2;

use log::{debug, trace, warn};
use nalgebra::IsometryMatrix3;

use crate::cube::{Axis, Cubie, Lattice};
use crate::error::CubeError;
use crate::math::{axis_rotation, reparent};

/// Sense of a quarter turn about the positive axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Direction {
    Positive,
    Negative,
}

impl Direction {
    pub(crate) fn sign(self) -> f32 {
        match self {
            Direction::Positive => 1.0,
            Direction::Negative => -1.0,
        }
    }

    pub(crate) fn reversed(self) -> Self {
        match self {
            Direction::Positive => Direction::Negative,
            Direction::Negative => Direction::Positive,
        }
    }
}

/// A request to turn one layer by a quarter turn.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct TurnRequest {
    pub(crate) axis: Axis,
    /// Coordinate of the layer along `axis`
    pub(crate) layer: f32,
    pub(crate) direction: Direction,
}

impl TurnRequest {
    /// Final pivot angle, ±π/2.
    pub(crate) fn target_angle(&self) -> f32 {
        FRAC_PI_2 * self.direction.sign()
    }

    /// Same layer, opposite direction.
    pub(crate) fn inverse(&self) -> Self {
        Self {
            direction: self.direction.reversed(),
            ..*self
        }
    }
}

/// Temporary frame holding the cubies of the layer being turned.
#[derive(Debug)]
pub(crate) struct Pivot {
    /// World transform of the pivot
    transform: IsometryMatrix3<f32>,
    members: Vec<Cubie>,
}

impl Pivot {
    fn new() -> Self {
        Self {
            transform: IsometryMatrix3::identity(),
            members: Vec::new(),
        }
    }

    /// Takes ownership of cubies whose transforms are relative to `from`,
    /// keeping their world transforms unchanged.
    fn attach_all(&mut self, cubies: Vec<Cubie>, from: &IsometryMatrix3<f32>) {
        for mut cubie in cubies {
            let world = from * cubie.transform;
            cubie.transform = reparent(&world, &self.transform);
            self.members.push(cubie);
        }
    }

    fn rotate_to(&mut self, axis: Axis, angle: f32) {
        self.transform.rotation = axis_rotation(axis, angle);
    }

    /// Returns every member to the lattice, keeping world transforms.
    fn release_into(&mut self, lattice: &mut Lattice) -> usize {
        let count = self.members.len();
        for cubie in self.members.drain(..) {
            let world = self.transform * cubie.transform;
            lattice.attach(cubie, &world);
        }
        count
    }

    pub(crate) fn transform(&self) -> &IsometryMatrix3<f32> {
        &self.transform
    }

    pub(crate) fn members(&self) -> &[Cubie] {
        &self.members
    }
}

/// Progress of the turn currently animating.
#[derive(Debug)]
pub(crate) struct Turn {
    request: TurnRequest,
    pivot: Pivot,
    /// Accumulated unsigned angle, radians
    angle: f32,
}

impl Turn {
    pub(crate) fn request(&self) -> &TurnRequest {
        &self.request
    }

    pub(crate) fn pivot(&self) -> &Pivot {
        &self.pivot
    }

    pub(crate) fn angle(&self) -> f32 {
        self.angle
    }
}

#[derive(Debug, Default)]
pub(crate) enum AnimatorState {
    #[default]
    Idle,
    Animating(Turn),
}

/// What a single frame tick did.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum TickOutcome {
    /// No turn was in progress.
    Idle,
    /// The pivot advanced to the given signed angle.
    InProgress { angle: f32 },
    /// The turn reached its target and the cubies were snapped back.
    Completed { request: TurnRequest, cubies: usize },
}

/// Owns the turn state machine: `Idle → Animating → Idle`.
#[derive(Debug)]
pub(crate) struct RotationAnimator {
    state: AnimatorState,
    /// Angle added per tick, radians
    speed: f32,
    tolerance: f32,
}

impl RotationAnimator {
    pub(crate) fn new(speed: f32, tolerance: f32) -> Self {
        Self {
            state: AnimatorState::Idle,
            speed,
            tolerance,
        }
    }

    /// The busy flag: `true` from turn start until its completion.
    pub(crate) fn is_busy(&self) -> bool {
        matches!(self.state, AnimatorState::Animating(_))
    }

    pub(crate) fn current_turn(&self) -> Option<&Turn> {
        match &self.state {
            AnimatorState::Idle => None,
            AnimatorState::Animating(turn) => Some(turn),
        }
    }

    /// Starts a turn, moving the selected layer into a fresh pivot.
    ///
    /// Fails with [`CubeError::Busy`] while another turn animates and with
    /// [`CubeError::EmptyLayer`] when nothing lies on the layer; in both cases
    /// neither the lattice nor the animator changes.
    pub(crate) fn begin(
        &mut self,
        lattice: &mut Lattice,
        request: TurnRequest,
    ) -> Result<usize, CubeError> {
        if self.is_busy() {
            trace!("dropping turn {request:?}: busy");
            return Err(CubeError::Busy);
        }
        if lattice
            .select(request.axis, request.layer, self.tolerance)
            .is_empty()
        {
            warn!(
                "no cubies on layer {}={:.3}, ignoring turn",
                request.axis, request.layer
            );
            return Err(CubeError::EmptyLayer {
                axis: request.axis,
                layer: request.layer,
            });
        }

        let mut pivot = Pivot::new();
        let layer = lattice.take_layer(request.axis, request.layer, self.tolerance);
        pivot.attach_all(layer, lattice.container());
        let count = pivot.members.len();

        debug!(
            "turn started: {count} cubies on {}={:.3}, {:?}, ids {:?}",
            request.axis,
            request.layer,
            request.direction,
            pivot.members.iter().map(|cubie| cubie.id).collect::<Vec<_>>()
        );
        self.state = AnimatorState::Animating(Turn {
            request,
            pivot,
            angle: 0.0,
        });
        Ok(count)
    }

    /// Advances the current turn by one frame.
    pub(crate) fn tick(&mut self, lattice: &mut Lattice) -> TickOutcome {
        let AnimatorState::Animating(turn) = &mut self.state else {
            return TickOutcome::Idle;
        };

        turn.angle += self.speed;
        let axis = turn.request.axis;
        if turn.angle < FRAC_PI_2 {
            let angle = turn.angle * turn.request.direction.sign();
            turn.pivot.rotate_to(axis, angle);
            trace!("pivot {axis} at {angle:.4} rad");
            return TickOutcome::InProgress { angle };
        }

        // Land exactly on the target; the increment rarely divides π/2.
        turn.pivot.rotate_to(axis, turn.request.target_angle());
        let cubies = turn.pivot.release_into(lattice);
        let request = turn.request;
        self.state = AnimatorState::Idle;
        lattice.snap();

        debug!("turn finished: {cubies} cubies on {axis}={:.3}", request.layer);
        TickOutcome::Completed { request, cubies }
    }

    /// Iterates every cubie still held by the pivot with its world transform.
    pub(crate) fn pivot_cubies(&self) -> impl Iterator<Item = (&Cubie, IsometryMatrix3<f32>)> {
        self.current_turn().into_iter().flat_map(|turn| {
            let pivot = turn.pivot();
            pivot
                .members()
                .iter()
                .map(move |cubie| (cubie, pivot.transform() * cubie.transform))
        })
    }
}
