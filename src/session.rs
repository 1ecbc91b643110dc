//! Single owner of the puzzle state.
//!
//! A [`CubeSession`] holds the configuration, the active size, the lattice and
//! the rotation animator. The host keeps one session and drives it with input
//! and frame ticks; nothing else mutates cube state.

use log::{debug, info};
use nalgebra::IsometryMatrix3;

use crate::config::CubeConfig;
#[cfg(test)]
use crate::cube::Axis;
use crate::cube::{Cubie, CubeSize, Lattice};
use crate::error::CubeError;
use crate::rotation::{RotationAnimator, TickOutcome, TurnRequest};

#[derive(Debug)]
pub(crate) struct CubeSession {
    config: CubeConfig,
    size: CubeSize,
    lattice: Lattice,
    animator: RotationAnimator,
}

impl CubeSession {
    /// Validates the configuration and builds a solved cube of the given size.
    pub(crate) fn new(config: CubeConfig, size: CubeSize) -> Result<Self, CubeError> {
        config.validate()?;
        let lattice = Lattice::build(size.edge(), &config)?;
        let animator = RotationAnimator::new(config.rotation_speed, config.selection_tolerance);
        info!("built {size} cube with {} cubies", lattice.len());
        Ok(Self {
            config,
            size,
            lattice,
            animator,
        })
    }

    pub(crate) fn config(&self) -> &CubeConfig {
        &self.config
    }

    pub(crate) fn size(&self) -> CubeSize {
        self.size
    }

    pub(crate) fn lattice(&self) -> &Lattice {
        &self.lattice
    }

    pub(crate) fn animator(&self) -> &RotationAnimator {
        &self.animator
    }

    pub(crate) fn is_busy(&self) -> bool {
        self.animator.is_busy()
    }

    /// Replaces the whole lattice with a solved cube of `size`.
    ///
    /// Refused while a turn is animating, so no pivot can outlive its lattice.
    pub(crate) fn rebuild(&mut self, size: CubeSize) -> Result<(), CubeError> {
        if self.is_busy() {
            return Err(CubeError::Busy);
        }
        self.lattice = Lattice::build(size.edge(), &self.config)?;
        self.size = size;
        debug!("rebuilt as {size}: {} cubies", self.lattice.len());
        Ok(())
    }

    /// Coordinate of the outermost layer on the positive or negative side.
    pub(crate) fn boundary_layer(&self, positive: bool) -> f32 {
        self.lattice.boundary_layer(positive)
    }

    /// Whether every cubie is back at its starting coordinate and orientation.
    pub(crate) fn is_solved(&self) -> bool {
        !self.is_busy() && self.lattice.is_solved()
    }

    /// Cubies on a layer, selected by their current positions.
    #[cfg(test)]
    pub(crate) fn select(&self, axis: Axis, layer: f32) -> Vec<&Cubie> {
        self.lattice
            .select(axis, layer, self.config.selection_tolerance)
    }

    /// Starts a quarter turn; returns how many cubies it moves.
    pub(crate) fn request_turn(&mut self, request: TurnRequest) -> Result<usize, CubeError> {
        self.animator.begin(&mut self.lattice, request)
    }

    /// Advances the animation by one frame.
    pub(crate) fn tick(&mut self) -> TickOutcome {
        self.animator.tick(&mut self.lattice)
    }

    /// Every cubie with its current world transform, including those mid-turn.
    pub(crate) fn cubie_transforms(&self) -> impl Iterator<Item = (&Cubie, IsometryMatrix3<f32>)> {
        let container = *self.lattice.container();
        self.lattice
            .cubies()
            .iter()
            .map(move |cubie| (cubie, container * cubie.transform))
            .chain(self.animator.pivot_cubies())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use nalgebra::{Matrix3, Vector3};
    use proptest::prelude::*;

    use super::*;
    use crate::math::axis_rotation;
    use crate::rotation::Direction;

    type Snapshot = HashMap<usize, (Vector3<f32>, Matrix3<f32>)>;

    fn session(size: CubeSize) -> CubeSession {
        CubeSession::new(CubeConfig::default(), size).unwrap()
    }

    fn snapshot(session: &CubeSession) -> Snapshot {
        session
            .cubie_transforms()
            .map(|(cubie, world)| {
                (
                    cubie.id,
                    (world.translation.vector, *world.rotation.matrix()),
                )
            })
            .collect()
    }

    fn finish(session: &mut CubeSession) {
        for _ in 0..1000 {
            if let TickOutcome::Completed { .. } = session.tick() {
                return;
            }
        }
        panic!("turn never finished");
    }

    fn turn(session: &mut CubeSession, request: TurnRequest) {
        session.request_turn(request).unwrap();
        finish(session);
    }

    fn assert_same(a: &Snapshot, b: &Snapshot) {
        assert_eq!(a.len(), b.len());
        for (id, (position, rotation)) in a {
            let (other_position, other_rotation) = &b[id];
            assert!(
                (position - other_position).norm() < 1e-5,
                "cubie {id} moved from {position:?} to {other_position:?}"
            );
            assert!((rotation - other_rotation).norm() < 1e-5, "cubie {id} rotated");
        }
    }

    #[test]
    fn up_layer_turns_exactly_nine_cubies() {
        let mut session = session(CubeSize::Three);
        let before = snapshot(&session);
        let layer = session.boundary_layer(true);
        turn(
            &mut session,
            TurnRequest {
                axis: Axis::Y,
                layer,
                direction: Direction::Positive,
            },
        );
        let after = snapshot(&session);
        let quarter = axis_rotation(Axis::Y, std::f32::consts::FRAC_PI_2);

        let mut turned = 0;
        for (id, (position, rotation)) in &before {
            let (new_position, new_rotation) = &after[id];
            if (position.y - layer).abs() < 0.1 {
                turned += 1;
                let expected = quarter * position;
                assert!((new_position - expected).norm() < 1e-5);
                assert!((new_rotation - quarter.matrix() * rotation).norm() < 1e-5);
            } else {
                assert_eq!(new_position, position);
                assert_eq!(new_rotation, rotation);
            }
        }
        assert_eq!(turned, 9);
        assert!(!session.is_busy());
    }

    #[test]
    fn four_quarter_turns_are_identity() {
        let mut session = session(CubeSize::Three);
        let before = snapshot(&session);
        let request = TurnRequest {
            axis: Axis::X,
            layer: session.boundary_layer(false),
            direction: Direction::Negative,
        };
        for turns in 1..=4 {
            turn(&mut session, request);
            assert_eq!(session.is_solved(), turns == 4);
        }
        assert_same(&before, &snapshot(&session));
    }

    #[test]
    fn solved_state_tracks_turns() {
        let mut session = session(CubeSize::Two);
        assert!(session.is_solved());
        let request = TurnRequest {
            axis: Axis::Y,
            layer: session.boundary_layer(true),
            direction: Direction::Positive,
        };
        session.request_turn(request).unwrap();
        assert!(!session.is_solved());
        finish(&mut session);
        assert!(!session.is_solved());
        turn(&mut session, request.inverse());
        assert!(session.is_solved());
    }

    #[test]
    fn turn_then_inverse_restores_exactly() {
        let mut session = session(CubeSize::Four);
        let before = snapshot(&session);
        let request = TurnRequest {
            axis: Axis::Z,
            layer: session.boundary_layer(true),
            direction: Direction::Positive,
        };
        turn(&mut session, request);
        turn(&mut session, request.inverse());
        assert_eq!(before, snapshot(&session));
    }

    #[test]
    fn selection_stays_exact_after_many_turns() {
        let mut session = session(CubeSize::Three);
        let positions = session.lattice().layer_positions();
        let sequence = [
            (Axis::Y, 2, Direction::Positive),
            (Axis::X, 0, Direction::Negative),
            (Axis::Z, 1, Direction::Positive),
            (Axis::Y, 1, Direction::Negative),
            (Axis::X, 2, Direction::Positive),
            (Axis::Z, 0, Direction::Negative),
        ];
        for _ in 0..5 {
            for (axis, index, direction) in sequence {
                turn(
                    &mut session,
                    TurnRequest {
                        axis,
                        layer: positions[index],
                        direction,
                    },
                );
            }
        }
        for axis in Axis::ALL {
            for (index, &layer) in positions.iter().enumerate() {
                let boundary = index == 0 || index == positions.len() - 1;
                assert_eq!(session.select(axis, layer).len(), layer_population(3, boundary));
            }
        }
    }

    #[test]
    fn busy_request_does_not_change_running_turn() {
        let mut reference = session(CubeSize::Three);
        let first = TurnRequest {
            axis: Axis::Y,
            layer: reference.boundary_layer(true),
            direction: Direction::Positive,
        };
        turn(&mut reference, first);

        let mut session = session(CubeSize::Three);
        session.request_turn(first).unwrap();
        for _ in 0..10 {
            session.tick();
        }
        let intruder = TurnRequest {
            axis: Axis::X,
            layer: session.boundary_layer(true),
            direction: Direction::Negative,
        };
        assert_eq!(session.request_turn(intruder), Err(CubeError::Busy));
        finish(&mut session);

        assert_eq!(snapshot(&reference), snapshot(&session));
    }

    #[test]
    fn rebuild_replaces_lattice() {
        let mut session = session(CubeSize::Three);
        let layer = session.boundary_layer(true);
        turn(
            &mut session,
            TurnRequest {
                axis: Axis::Y,
                layer,
                direction: Direction::Positive,
            },
        );
        session.rebuild(CubeSize::Two).unwrap();
        assert_eq!(session.size(), CubeSize::Two);
        assert_eq!(session.cubie_transforms().count(), 8);
        assert!(!session.is_busy());
        assert!((session.boundary_layer(true) - 0.55).abs() < 1e-6);
    }

    #[test]
    fn rebuild_is_refused_mid_turn() {
        let mut session = session(CubeSize::Three);
        let request = TurnRequest {
            axis: Axis::Y,
            layer: session.boundary_layer(false),
            direction: Direction::Positive,
        };
        session.request_turn(request).unwrap();
        assert_eq!(session.rebuild(CubeSize::Four), Err(CubeError::Busy));
        assert_eq!(session.size(), CubeSize::Three);
        assert_eq!(session.cubie_transforms().count(), 26);
    }

    #[test]
    fn transforms_include_pivot_members_mid_turn() {
        let mut session = session(CubeSize::Two);
        let request = TurnRequest {
            axis: Axis::Z,
            layer: session.boundary_layer(true),
            direction: Direction::Negative,
        };
        session.request_turn(request).unwrap();
        session.tick();
        assert_eq!(session.lattice().len(), 4);
        assert_eq!(session.cubie_transforms().count(), 8);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = CubeConfig {
            gap: -1.0,
            ..CubeConfig::default()
        };
        assert!(matches!(
            CubeSession::new(config, CubeSize::Three),
            Err(CubeError::InvalidConfig { .. })
        ));
    }

    /// Surface cubies in one layer: a full face, or the ring of an inner slice.
    fn layer_population(n: usize, boundary: bool) -> usize {
        if boundary { n * n } else { n * n - (n - 2) * (n - 2) }
    }

    fn arb_size() -> impl Strategy<Value = CubeSize> {
        prop_oneof![
            Just(CubeSize::Two),
            Just(CubeSize::Three),
            Just(CubeSize::Four),
        ]
    }

    fn arb_axis() -> impl Strategy<Value = Axis> {
        prop_oneof![Just(Axis::X), Just(Axis::Y), Just(Axis::Z)]
    }

    fn arb_direction() -> impl Strategy<Value = Direction> {
        prop_oneof![Just(Direction::Positive), Just(Direction::Negative)]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn any_turn_and_its_inverse_cancel(
            size in arb_size(),
            axis in arb_axis(),
            index in 0usize..4,
            direction in arb_direction(),
        ) {
            let mut session = session(size);
            let positions = session.lattice().layer_positions();
            let layer = positions[index % positions.len()];
            let before = snapshot(&session);
            let request = TurnRequest { axis, layer, direction };
            turn(&mut session, request);
            turn(&mut session, request.inverse());
            prop_assert_eq!(before, snapshot(&session));
        }

        #[test]
        fn random_sequences_keep_lattice_invariants(
            size in arb_size(),
            moves in prop::collection::vec((arb_axis(), 0usize..4, arb_direction()), 1..12),
        ) {
            let mut session = session(size);
            let positions = session.lattice().layer_positions();
            let spacing = session.lattice().spacing();
            for (axis, index, direction) in moves {
                let layer = positions[index % positions.len()];
                turn(&mut session, TurnRequest { axis, layer, direction });
            }

            let n = size.edge();
            prop_assert_eq!(session.cubie_transforms().count(), crate::cube::piece_count(n));
            for (_, world) in session.cubie_transforms() {
                for value in world.translation.vector.iter() {
                    let g = value / spacing + (n as f32 - 1.0) / 2.0;
                    prop_assert!((g - g.round()).abs() < 1e-4);
                }
                for entry in world.rotation.matrix().iter() {
                    prop_assert!(*entry == 0.0 || entry.abs() == 1.0);
                }
            }
            for axis in Axis::ALL {
                for (index, &layer) in positions.iter().enumerate() {
                    let boundary = index == 0 || index == n - 1;
                    prop_assert_eq!(session.select(axis, layer).len(), layer_population(n, boundary));
                }
            }
        }
    }
}
