//! Keyboard and size-selector routing.
//!
//! Keys name a face (`U D L R F B`); holding the reverse modifier turns it the
//! other way. The router only produces requests while no turn is animating.

use log::{debug, trace};

use crate::cube::{CubeSize, Face};
use crate::error::CubeError;
use crate::rotation::{Direction, TurnRequest};
use crate::session::CubeSession;

/// Builds the turn a face key asks for.
///
/// `extent` is the coordinate of the outermost layer. Faces on the positive
/// side of their axis turn with the negated direction so that every key turns
/// its face clockwise as seen from outside.
pub(crate) fn face_turn(face: Face, reverse: bool, extent: f32) -> TurnRequest {
    let request = if face.is_positive() {
        TurnRequest {
            axis: face.axis(),
            layer: extent,
            direction: Direction::Negative,
        }
    } else {
        TurnRequest {
            axis: face.axis(),
            layer: -extent,
            direction: Direction::Positive,
        }
    };
    if reverse { request.inverse() } else { request }
}

pub(crate) trait InputHandler {
    /// Handles a key press, returning `true` if it started a turn.
    fn handle_key(&mut self, key: &str, reverse: bool) -> bool;
    /// Handles a size button, returning `true` if the cube was rebuilt.
    fn handle_size_selection(&mut self, size: CubeSize) -> bool;
}

impl InputHandler for CubeSession {
    fn handle_key(&mut self, key: &str, reverse: bool) -> bool {
        if self.is_busy() {
            trace!("ignoring key {key:?}: turn in progress");
            return false;
        }
        let Some(face) = Face::from_key(key) else {
            trace!("ignoring unmapped key {key:?}");
            return false;
        };

        let request = face_turn(face, reverse, self.boundary_layer(true));
        match self.request_turn(request) {
            Ok(_) => {
                debug!("key {key:?} turns {face} face");
                true
            }
            Err(CubeError::Busy | CubeError::EmptyLayer { .. }) => false,
            Err(err) => {
                debug!("key {key:?} rejected: {err}");
                false
            }
        }
    }

    fn handle_size_selection(&mut self, size: CubeSize) -> bool {
        if size == self.size() {
            return false;
        }
        match self.rebuild(size) {
            Ok(()) => true,
            Err(err) => {
                trace!("ignoring size {size}: {err}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CubeConfig;
    use crate::cube::Axis;

    fn session(size: CubeSize) -> CubeSession {
        CubeSession::new(CubeConfig::default(), size).unwrap()
    }

    #[test]
    fn key_table_matches_face_layout() {
        let extent = 1.1;
        let cases = [
            (Face::Up, Axis::Y, extent, Direction::Negative),
            (Face::Down, Axis::Y, -extent, Direction::Positive),
            (Face::Left, Axis::X, -extent, Direction::Positive),
            (Face::Right, Axis::X, extent, Direction::Negative),
            (Face::Front, Axis::Z, extent, Direction::Negative),
            (Face::Back, Axis::Z, -extent, Direction::Positive),
        ];
        for (face, axis, layer, direction) in cases {
            let request = face_turn(face, false, extent);
            assert_eq!(request, TurnRequest { axis, layer, direction });
            assert_eq!(face_turn(face, true, extent), request.inverse());
        }
    }

    #[test]
    fn lowercase_key_starts_turn() {
        let mut session = session(CubeSize::Three);
        assert!(session.handle_key("u", false));
        let turn = session.animator().current_turn().unwrap();
        assert_eq!(turn.request().axis, Axis::Y);
        assert!((turn.request().layer - 1.1).abs() < 1e-6);
        assert_eq!(turn.request().direction, Direction::Negative);
    }

    #[test]
    fn shift_reverses_direction() {
        let mut session = session(CubeSize::Three);
        assert!(session.handle_key("R", true));
        let turn = session.animator().current_turn().unwrap();
        assert_eq!(turn.request().direction, Direction::Positive);
    }

    #[test]
    fn keys_are_ignored_while_busy() {
        let mut session = session(CubeSize::Three);
        assert!(session.handle_key("F", false));
        assert!(!session.handle_key("B", false));
        let turn = session.animator().current_turn().unwrap();
        assert_eq!(turn.request().axis, Axis::Z);
        assert!(turn.request().layer > 0.0);
    }

    #[test]
    fn unmapped_keys_are_noops() {
        let mut session = session(CubeSize::Three);
        assert!(!session.handle_key("Q", false));
        assert!(!session.handle_key("Enter", false));
        assert!(!session.is_busy());
    }

    #[test]
    fn boundary_layer_tracks_cube_size() {
        let mut session = session(CubeSize::Four);
        assert!(session.handle_key("D", false));
        let turn = session.animator().current_turn().unwrap();
        assert!((turn.request().layer + 1.65).abs() < 1e-6);
        assert_eq!(turn.pivot().members().len(), 16);
    }

    #[test]
    fn size_selection_rebuilds_only_when_idle_and_different() {
        let mut session = session(CubeSize::Three);
        assert!(!session.handle_size_selection(CubeSize::Three));
        assert!(session.handle_size_selection(CubeSize::Two));
        assert_eq!(session.size(), CubeSize::Two);
        assert_eq!(session.lattice().len(), 8);

        assert!(session.handle_key("L", false));
        assert!(!session.handle_size_selection(CubeSize::Four));
        assert_eq!(session.size(), CubeSize::Two);
    }
}
