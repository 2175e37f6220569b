use std::time::Instant;

/// Number of landmarks the handpose model reports for one hand.
pub const NUM_LANDMARKS: usize = 21;

#[derive(Clone, Debug)]
pub struct Frame {
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub timestamp: Instant,
}

/// A landmark in normalized image coordinates, both axes in `[0, 1]`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Landmarks of one hand, indexed as in the MediaPipe hand model.
pub type HandLandmarks = Vec<Point>;

/// One hand as seen in a single frame.
#[derive(Clone, Debug)]
pub struct HandDetection {
    pub landmarks: HandLandmarks,
    pub confidence: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Gesture {
    /// Cursor placement at the index fingertip.
    Move(Point),
    LeftClick,
    RightClick,
    DoubleClick,
    Screenshot,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GestureKind {
    Move,
    LeftClick,
    RightClick,
    DoubleClick,
    Screenshot,
}

impl Gesture {
    pub fn kind(&self) -> GestureKind {
        match self {
            Gesture::Move(_) => GestureKind::Move,
            Gesture::LeftClick => GestureKind::LeftClick,
            Gesture::RightClick => GestureKind::RightClick,
            Gesture::DoubleClick => GestureKind::DoubleClick,
            Gesture::Screenshot => GestureKind::Screenshot,
        }
    }
}

impl GestureKind {
    pub const ALL: [GestureKind; 5] = [
        GestureKind::Move,
        GestureKind::LeftClick,
        GestureKind::RightClick,
        GestureKind::DoubleClick,
        GestureKind::Screenshot,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            GestureKind::Move => "Move",
            GestureKind::LeftClick => "Left Click",
            GestureKind::RightClick => "Right Click",
            GestureKind::DoubleClick => "Double Click",
            GestureKind::Screenshot => "Screenshot",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            GestureKind::Move => "🤏 ",
            GestureKind::LeftClick => "👆 ",
            GestureKind::RightClick => "🖕 ",
            GestureKind::DoubleClick => "✊ ",
            GestureKind::Screenshot => "📸 ",
        }
    }

    /// Banner colour used when annotating frames, RGBA.
    pub fn overlay_color(&self) -> [u8; 4] {
        match self {
            GestureKind::Move => [148, 163, 184, 255],
            GestureKind::LeftClick => [0, 255, 0, 255],
            GestureKind::RightClick => [255, 0, 0, 255],
            GestureKind::DoubleClick => [0, 0, 255, 255],
            GestureKind::Screenshot => [0, 255, 255, 255],
        }
    }
}
