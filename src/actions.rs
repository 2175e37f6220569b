//! OS side effects for classified gestures.

use std::path::{Path, PathBuf};

use enigo::{Button, Coordinate, Direction, Enigo, Mouse, Settings};
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{
    config::ActionConfig,
    error::ActionError,
    types::{Gesture, Point},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
}

/// Backend that performs cursor, click and screen-capture actions.
pub trait MouseActions {
    /// Primary screen size in pixels.
    fn screen_size(&self) -> (u32, u32);
    fn move_to(&mut self, x: i32, y: i32) -> Result<(), ActionError>;
    fn click(&mut self, button: MouseButton) -> Result<(), ActionError>;
    fn double_click(&mut self) -> Result<(), ActionError>;
    fn screenshot(&mut self, path: &Path) -> Result<(), ActionError>;
}

/// Random suffix range for screenshot filenames.
const SCREENSHOT_LABELS: std::ops::RangeInclusive<u32> = 1..=1000;

pub fn screenshot_path(dir: &Path, prefix: &str, label: u32) -> PathBuf {
    dir.join(format!("{prefix}_{label}.png"))
}

/// Normalized point to absolute screen pixel, truncating.
pub fn to_screen(point: Point, (width, height): (u32, u32)) -> (i32, i32) {
    ((point.x * width as f32) as i32, (point.y * height as f32) as i32)
}

/// Maps gestures onto a [`MouseActions`] backend.
pub struct Dispatcher<A> {
    actions: A,
    screenshot_dir: PathBuf,
    screenshot_prefix: String,
    rng: StdRng,
}

impl<A: MouseActions> Dispatcher<A> {
    pub fn new(actions: A, config: &ActionConfig) -> Self {
        Self::with_rng(actions, config, StdRng::from_entropy())
    }

    pub fn with_rng(actions: A, config: &ActionConfig, rng: StdRng) -> Self {
        Self {
            actions,
            screenshot_dir: config.screenshot_dir.clone(),
            screenshot_prefix: config.screenshot_prefix.clone(),
            rng,
        }
    }

    pub fn actions(&self) -> &A {
        &self.actions
    }

    pub fn dispatch(&mut self, gesture: &Gesture) -> Result<(), ActionError> {
        match *gesture {
            Gesture::Move(point) => {
                let (x, y) = to_screen(point, self.actions.screen_size());
                log::debug!("cursor -> ({x}, {y})");
                self.actions.move_to(x, y)
            }
            Gesture::LeftClick => {
                log::info!("left click");
                self.actions.click(MouseButton::Left)
            }
            Gesture::RightClick => {
                log::info!("right click");
                self.actions.click(MouseButton::Right)
            }
            Gesture::DoubleClick => {
                log::info!("double click");
                self.actions.double_click()
            }
            Gesture::Screenshot => {
                let label = self.rng.gen_range(SCREENSHOT_LABELS);
                let path = screenshot_path(&self.screenshot_dir, &self.screenshot_prefix, label);
                self.actions.screenshot(&path)?;
                log::info!("screenshot saved to {}", path.display());
                Ok(())
            }
        }
    }
}

/// Real mouse through `enigo`, screen capture through `xcap`.
pub struct DesktopActions {
    enigo: Enigo,
    screen: (u32, u32),
}

impl DesktopActions {
    pub fn new() -> Result<Self, ActionError> {
        let enigo = Enigo::new(&Settings::default())
            .map_err(|err| ActionError::Input(format!("failed to connect: {err:?}")))?;
        let (w, h) = enigo
            .main_display()
            .map_err(|err| ActionError::Input(format!("failed to query display: {err:?}")))?;
        log::info!("main display is {w}x{h}");
        Ok(Self {
            enigo,
            screen: (w.max(1) as u32, h.max(1) as u32),
        })
    }
}

impl MouseActions for DesktopActions {
    fn screen_size(&self) -> (u32, u32) {
        self.screen
    }

    fn move_to(&mut self, x: i32, y: i32) -> Result<(), ActionError> {
        self.enigo
            .move_mouse(x, y, Coordinate::Abs)
            .map_err(|err| ActionError::Input(format!("{err:?}")))
    }

    fn click(&mut self, button: MouseButton) -> Result<(), ActionError> {
        let button = match button {
            MouseButton::Left => Button::Left,
            MouseButton::Right => Button::Right,
        };
        self.enigo
            .button(button, Direction::Click)
            .map_err(|err| ActionError::Input(format!("{err:?}")))
    }

    fn double_click(&mut self) -> Result<(), ActionError> {
        self.click(MouseButton::Left)?;
        self.click(MouseButton::Left)
    }

    fn screenshot(&mut self, path: &Path) -> Result<(), ActionError> {
        let monitors =
            xcap::Monitor::all().map_err(|err| ActionError::Capture(err.to_string()))?;
        let monitor = monitors
            .iter()
            .find(|m| m.is_primary())
            .or_else(|| monitors.first())
            .ok_or(ActionError::NoMonitor)?;
        let image = monitor
            .capture_image()
            .map_err(|err| ActionError::Capture(err.to_string()))?;
        image.save(path).map_err(|source| ActionError::Save {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Logs every action without touching the desktop.
#[derive(Debug)]
pub struct DryRunActions {
    screen: (u32, u32),
}

impl DryRunActions {
    pub fn new(screen: (u32, u32)) -> Self {
        Self { screen }
    }
}

impl Default for DryRunActions {
    fn default() -> Self {
        Self::new((1920, 1080))
    }
}

impl MouseActions for DryRunActions {
    fn screen_size(&self) -> (u32, u32) {
        self.screen
    }

    fn move_to(&mut self, x: i32, y: i32) -> Result<(), ActionError> {
        log::debug!("[dry-run] move cursor to ({x}, {y})");
        Ok(())
    }

    fn click(&mut self, button: MouseButton) -> Result<(), ActionError> {
        log::info!("[dry-run] {button:?} click");
        Ok(())
    }

    fn double_click(&mut self) -> Result<(), ActionError> {
        log::info!("[dry-run] double click");
        Ok(())
    }

    fn screenshot(&mut self, path: &Path) -> Result<(), ActionError> {
        log::info!("[dry-run] screenshot to {}", path.display());
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::recording::{Action, RecordingActions};
    use super::*;

    fn dispatcher() -> Dispatcher<RecordingActions> {
        let actions = RecordingActions {
            screen: (1920, 1080),
            ..RecordingActions::default()
        };
        Dispatcher::with_rng(actions, &ActionConfig::default(), StdRng::seed_from_u64(7))
    }

    #[test]
    fn move_scales_to_screen() {
        let mut d = dispatcher();
        d.dispatch(&Gesture::Move(Point::new(0.5, 0.25))).unwrap();
        d.dispatch(&Gesture::Move(Point::new(0.999, 0.999))).unwrap();
        assert_eq!(
            d.actions().log,
            vec![Action::Move(960, 270), Action::Move(1918, 1078)]
        );
    }

    #[test]
    fn clicks_map_to_buttons() {
        let mut d = dispatcher();
        d.dispatch(&Gesture::LeftClick).unwrap();
        d.dispatch(&Gesture::RightClick).unwrap();
        d.dispatch(&Gesture::DoubleClick).unwrap();
        assert_eq!(
            d.actions().log,
            vec![
                Action::Click(MouseButton::Left),
                Action::Click(MouseButton::Right),
                Action::DoubleClick,
            ]
        );
    }

    #[test]
    fn screenshot_gets_random_label_in_range() {
        let mut d = dispatcher();
        for _ in 0..50 {
            d.dispatch(&Gesture::Screenshot).unwrap();
        }
        for action in &d.actions().log {
            let Action::Screenshot(path) = action else {
                panic!("unexpected action {action:?}");
            };
            let name = path.file_name().unwrap().to_str().unwrap();
            let label: u32 = name
                .strip_prefix("my_screenshot_")
                .and_then(|rest| rest.strip_suffix(".png"))
                .unwrap()
                .parse()
                .unwrap();
            assert!(SCREENSHOT_LABELS.contains(&label));
        }
    }

    #[test]
    fn screenshot_path_layout() {
        assert_eq!(
            screenshot_path(Path::new("shots"), "cap", 42),
            Path::new("shots").join("cap_42.png")
        );
    }

    #[test]
    fn backend_errors_propagate() {
        let actions = RecordingActions {
            fail: true,
            ..RecordingActions::default()
        };
        let mut d = Dispatcher::new(actions, &ActionConfig::default());
        assert!(matches!(
            d.dispatch(&Gesture::LeftClick),
            Err(ActionError::Input(_))
        ));
    }

    #[test]
    fn dry_run_accepts_everything() {
        let mut d = Dispatcher::new(DryRunActions::default(), &ActionConfig::default());
        for g in [
            Gesture::Move(Point::new(0.1, 0.1)),
            Gesture::LeftClick,
            Gesture::RightClick,
            Gesture::DoubleClick,
            Gesture::Screenshot,
        ] {
            assert!(d.dispatch(&g).is_ok());
        }
    }
}
