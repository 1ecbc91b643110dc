//! Interactive Rubik's cube with iced UI.
//!
//! A 2x2, 3x3 or 4x4 cube whose faces turn in animated quarter turns from the
//! keyboard. Uses iced for UI and wgpu for GPU rendering.

use iced::keyboard::{self, Key, Modifiers};
use iced::time::Instant;
use iced::widget::{Column, Row, Shader, button, text};
use iced::{Element, Length, Settings, Subscription, Task, window};
use log::{debug, info};

mod camera;
mod config;
mod cube;
mod error;
mod input;
mod math;
mod renderer;
mod rotation;
mod session;
mod shader_widget;

use config::CubeConfig;
use cube::CubeSize;
use input::InputHandler;
use renderer::generate_instances;
use rotation::TickOutcome;
use session::CubeSession;
use shader_widget::CubeShaderProgram;

const KEY_LEGEND: [&str; 4] = [
    "U / D  up / down face",
    "L / R  left / right face",
    "F / B  front / back face",
    "Shift  reverse direction",
];

/// Main application state
#[derive(Debug)]
pub(crate) struct RubikApp {
    session: CubeSession,
}

/// Messages that the application can receive
#[derive(Debug, Clone)]
pub(crate) enum Message {
    KeyPressed { key: String, reverse: bool },
    SelectSize(CubeSize),
    Tick(Instant),
}

/// Forwards single-character keys; everything else never reaches the router.
fn key_message(key: Key, modifiers: Modifiers) -> Option<Message> {
    match key {
        Key::Character(c) => Some(Message::KeyPressed {
            key: c.to_string(),
            reverse: modifiers.shift(),
        }),
        _ => None,
    }
}

impl RubikApp {
    pub(crate) fn new(session: CubeSession) -> Self {
        Self { session }
    }

    pub(crate) fn title(&self) -> &'static str {
        "Rubik's Cube"
    }

    pub(crate) fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::KeyPressed { key, reverse } => {
                self.session.handle_key(&key, reverse);
            }
            Message::SelectSize(size) => {
                if self.session.handle_size_selection(size) {
                    info!("switched to {size} cube");
                }
            }
            Message::Tick(_) => {
                if let TickOutcome::Completed { request, cubies } = self.session.tick() {
                    debug!(
                        "turn about {} at {:+.2} finished, {cubies} cubies snapped",
                        request.axis, request.layer
                    );
                }
            }
        }

        Task::none()
    }

    /// Frames are only requested while a turn is animating.
    pub(crate) fn subscription(&self) -> Subscription<Message> {
        let keys = keyboard::on_key_press(key_message);
        if self.session.is_busy() {
            Subscription::batch([keys, window::frames().map(Message::Tick)])
        } else {
            keys
        }
    }

    fn status(&self) -> String {
        match self.session.animator().current_turn() {
            Some(turn) => format!(
                "Turning {} layer at {:+.2} ({:.0}°)",
                turn.request().axis,
                turn.request().layer,
                turn.angle().to_degrees()
            ),
            None if self.session.is_solved() => format!("{} cube, solved", self.session.size()),
            None => format!("{} cube, ready", self.session.size()),
        }
    }

    pub(crate) fn view(&self) -> Element<Message> {
        let sizes = CubeSize::ALL.into_iter().fold(Row::new().spacing(5), |row, size| {
            let style = if size == self.session.size() {
                button::primary
            } else {
                button::secondary
            };
            row.push(
                button(text(size.to_string()))
                    .style(style)
                    .on_press(Message::SelectSize(size)),
            )
        });

        let legend = KEY_LEGEND
            .into_iter()
            .fold(Column::new().spacing(2), |column, line| column.push(text(line).size(14)));

        // Left pane with controls
        let controls = Column::new()
            .spacing(20)
            .width(220)
            .push(Column::new().spacing(5).push(text("Cube Size")).push(sizes))
            .push(text(self.status()))
            .push(Column::new().spacing(5).push(text("Keys")).push(legend));

        // Right pane with 3D viewport
        let viewport = Shader::new(CubeShaderProgram::new(generate_instances(&self.session)))
            .width(Length::Fill)
            .height(Length::Fill);

        Row::new()
            .spacing(10)
            .padding(10)
            .push(
                iced::widget::container(controls)
                    .width(Length::Shrink)
                    .height(Length::Fill),
            )
            .push(viewport)
            .into()
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::builder().format_timestamp(None).init();

    let session = CubeSession::new(CubeConfig::default(), CubeSize::Three)?;
    info!("starting with {} cube, {} cubies", session.size(), session.lattice().len());

    let app = RubikApp::new(session);
    iced::application(app.title(), RubikApp::update, RubikApp::view)
        .subscription(RubikApp::subscription)
        .settings(Settings {
            antialiasing: true,
            ..Settings::default()
        })
        .run_with(move || (app, Task::none()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app() -> RubikApp {
        RubikApp::new(CubeSession::new(CubeConfig::default(), CubeSize::Three).unwrap())
    }

    #[test]
    fn shift_marks_key_as_reversed() {
        let message = key_message(Key::Character("r".into()), Modifiers::SHIFT);
        assert!(matches!(
            message,
            Some(Message::KeyPressed { ref key, reverse: true }) if key == "r"
        ));
        assert!(key_message(Key::Named(keyboard::key::Named::Enter), Modifiers::empty()).is_none());
    }

    #[test]
    fn ticks_drive_turn_to_completion() {
        let mut app = app();
        let _ = app.update(Message::KeyPressed {
            key: "F".to_string(),
            reverse: false,
        });
        assert!(app.session.is_busy());
        assert!(app.status().starts_with("Turning z"));

        for _ in 0..30 {
            let _ = app.update(Message::Tick(Instant::now()));
        }
        assert!(!app.session.is_busy());
        assert_eq!(app.status(), "3x3 cube, ready");
    }

    #[test]
    fn status_reports_solved_cube() {
        let app = app();
        assert_eq!(app.status(), "3x3 cube, solved");
    }

    #[test]
    fn size_buttons_rebuild_cube() {
        let mut app = app();
        let _ = app.update(Message::SelectSize(CubeSize::Four));
        assert_eq!(app.session.lattice().len(), 56);
    }
}
