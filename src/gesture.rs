use crate::{
    config::GestureThresholds,
    geometry::{angle, distance},
    types::{Gesture, NUM_LANDMARKS, Point},
};

const THUMB_TIP: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Finger {
    Index,
    Middle,
    Ring,
    Pinky,
}

impl Finger {
    pub const ALL: [Finger; 4] = [Finger::Index, Finger::Middle, Finger::Ring, Finger::Pinky];

    /// Landmark indices of the base (MCP), middle (PIP) and tip joints.
    pub const fn joints(self) -> [usize; 3] {
        match self {
            Finger::Index => [5, 6, 8],
            Finger::Middle => [9, 10, 12],
            Finger::Ring => [13, 14, 16],
            Finger::Pinky => [17, 18, 20],
        }
    }

    pub const fn tip(self) -> usize {
        self.joints()[2]
    }

    pub const fn base(self) -> usize {
        self.joints()[0]
    }
}

/// Per-finger quantities the gesture predicates are written against.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HandMeasurements {
    /// Thumb tip to index base, rescaled distance units.
    pub thumb_index_distance: f32,
    /// Bend angle at the PIP joint, indexed like [`Finger::ALL`].
    pub angles: [f32; 4],
    /// Fingertip to base distance, indexed like [`Finger::ALL`].
    pub reaches: [f32; 4],
    pub index_tip: Point,
}

impl HandMeasurements {
    /// Returns `None` unless exactly [`NUM_LANDMARKS`] points are given.
    pub fn from_landmarks(landmarks: &[Point]) -> Option<Self> {
        if landmarks.len() != NUM_LANDMARKS {
            return None;
        }

        let mut angles = [0.0; 4];
        let mut reaches = [0.0; 4];
        for (slot, finger) in Finger::ALL.iter().enumerate() {
            let [mcp, pip, tip] = finger.joints();
            angles[slot] = angle(landmarks[mcp], landmarks[pip], landmarks[tip]);
            reaches[slot] = distance(landmarks[tip], landmarks[mcp]);
        }

        Some(Self {
            thumb_index_distance: distance(landmarks[THUMB_TIP], landmarks[Finger::Index.base()]),
            angles,
            reaches,
            index_tip: landmarks[Finger::Index.tip()],
        })
    }

    pub fn angle(&self, finger: Finger) -> f32 {
        self.angles[finger as usize]
    }

    pub fn reach(&self, finger: Finger) -> f32 {
        self.reaches[finger as usize]
    }
}

/// Stateless frame-by-frame gesture decision.
#[derive(Clone, Debug, Default)]
pub struct GestureClassifier {
    thresholds: GestureThresholds,
}

impl GestureClassifier {
    pub fn new(thresholds: GestureThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &GestureThresholds {
        &self.thresholds
    }

    /// Classifies one frame. Predicates are tried in priority order and the
    /// first match wins: move, left click, right click, double click,
    /// screenshot.
    pub fn classify(&self, landmarks: &[Point]) -> Option<Gesture> {
        let m = HandMeasurements::from_landmarks(landmarks)?;
        self.classify_measurements(&m)
    }

    pub fn classify_measurements(&self, m: &HandMeasurements) -> Option<Gesture> {
        if self.is_move(m) {
            Some(Gesture::Move(m.index_tip))
        } else if self.is_left_click(m) {
            Some(Gesture::LeftClick)
        } else if self.is_right_click(m) {
            Some(Gesture::RightClick)
        } else if self.is_double_click(m) {
            Some(Gesture::DoubleClick)
        } else if self.is_screenshot(m) {
            Some(Gesture::Screenshot)
        } else {
            None
        }
    }

    /// Thumb pinched against the index base. An index angle of exactly zero
    /// disables it.
    pub fn is_move(&self, m: &HandMeasurements) -> bool {
        m.thumb_index_distance < self.thresholds.near_distance && m.angle(Finger::Index) != 0.0
    }

    pub fn is_left_click(&self, m: &HandMeasurements) -> bool {
        self.bent(m, Finger::Index)
            && self.extended(m, Finger::Middle)
            && self.thumb_away(m)
            && self.bent(m, Finger::Ring)
            && self.bent(m, Finger::Pinky)
    }

    pub fn is_right_click(&self, m: &HandMeasurements) -> bool {
        self.extended(m, Finger::Index)
            && self.bent(m, Finger::Middle)
            && self.thumb_away(m)
            && self.bent(m, Finger::Ring)
            && self.bent(m, Finger::Pinky)
    }

    pub fn is_double_click(&self, m: &HandMeasurements) -> bool {
        self.bent(m, Finger::Index)
            && self.bent(m, Finger::Middle)
            && self.thumb_away(m)
            && self.bent(m, Finger::Ring)
            && self.bent(m, Finger::Pinky)
    }

    /// Index and pinky stretched, middle and ring curled, judged by reach
    /// rather than joint angle.
    pub fn is_screenshot(&self, m: &HandMeasurements) -> bool {
        let reach = self.thresholds.reach_distance;
        self.thumb_away(m)
            && m.reach(Finger::Index) > reach
            && m.reach(Finger::Ring) < reach
            && m.reach(Finger::Middle) < reach
            && m.reach(Finger::Pinky) > reach
    }

    fn thumb_away(&self, m: &HandMeasurements) -> bool {
        m.thumb_index_distance > self.thresholds.near_distance
    }

    fn bent(&self, m: &HandMeasurements, finger: Finger) -> bool {
        m.angle(finger) < self.thresholds.bent_angle
    }

    fn extended(&self, m: &HandMeasurements, finger: Finger) -> bool {
        m.angle(finger) > self.thresholds.extended_angle
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::{INDEX_BASE, Pose, THUMB_FAR, THUMB_NEAR, hand};
    use super::fixtures::Pose::{Bent, Extended, Half};
    use super::*;

    fn classifier() -> GestureClassifier {
        GestureClassifier::default()
    }

    #[test]
    fn measurements_of_fixture_poses() {
        let m = HandMeasurements::from_landmarks(&hand(THUMB_FAR, [Extended, Bent, Half, Bent]))
            .unwrap();
        assert!((m.angle(Finger::Index) - 180.0).abs() < 1e-3);
        assert!(m.angle(Finger::Middle) < 50.0);
        assert!((m.angle(Finger::Ring) - 90.0).abs() < 1e-3);
        assert!(m.reach(Finger::Index) > 190.0);
        assert!(m.reach(Finger::Middle) < 50.0);
        assert!(m.thumb_index_distance > 150.0);
    }

    #[test]
    fn pinch_moves_cursor_to_index_tip() {
        let lm = hand(THUMB_NEAR, [Extended, Bent, Bent, Bent]);
        let tip = lm[Finger::Index.tip()];
        assert_eq!(classifier().classify(&lm), Some(Gesture::Move(tip)));
    }

    #[test]
    fn move_wins_over_click_poses() {
        let lm = hand(THUMB_NEAR, [Bent, Extended, Bent, Bent]);
        assert!(matches!(classifier().classify(&lm), Some(Gesture::Move(_))));
    }

    #[test]
    fn move_needs_nonzero_index_angle() {
        let mut lm = hand(THUMB_NEAR, [Extended, Bent, Bent, Bent]);
        // Tip between base and PIP on the same line: both rays share a heading.
        lm[Finger::Index.tip()] = Point::new(INDEX_BASE.x, INDEX_BASE.y - 0.05);
        let m = HandMeasurements::from_landmarks(&lm).unwrap();
        assert_eq!(m.angle(Finger::Index), 0.0);
        assert_eq!(classifier().classify(&lm), None);
    }

    #[test]
    fn left_click() {
        let lm = hand(THUMB_FAR, [Bent, Extended, Bent, Bent]);
        assert_eq!(classifier().classify(&lm), Some(Gesture::LeftClick));
    }

    #[test]
    fn right_click() {
        let lm = hand(THUMB_FAR, [Extended, Bent, Bent, Bent]);
        assert_eq!(classifier().classify(&lm), Some(Gesture::RightClick));
    }

    #[test]
    fn double_click() {
        let lm = hand(THUMB_FAR, [Bent, Bent, Bent, Bent]);
        assert_eq!(classifier().classify(&lm), Some(Gesture::DoubleClick));
    }

    #[test]
    fn screenshot() {
        let lm = hand(THUMB_FAR, [Extended, Bent, Bent, Extended]);
        assert_eq!(classifier().classify(&lm), Some(Gesture::Screenshot));
    }

    #[test]
    fn open_palm_is_no_gesture() {
        let lm = hand(THUMB_FAR, [Extended, Extended, Extended, Extended]);
        assert_eq!(classifier().classify(&lm), None);
    }

    #[test]
    fn half_bent_fingers_match_nothing() {
        let lm = hand(THUMB_FAR, [Half, Bent, Bent, Bent]);
        assert_eq!(classifier().classify(&lm), None);
    }

    #[test]
    fn short_landmark_list_is_ignored() {
        let lm = hand(THUMB_FAR, [Bent, Bent, Bent, Bent]);
        assert_eq!(classifier().classify(&lm[..20]), None);
        assert_eq!(classifier().classify(&[]), None);
    }

    #[test]
    fn oversized_landmark_list_is_ignored() {
        let mut lm = hand(THUMB_FAR, [Bent, Bent, Bent, Bent]);
        lm.push(Point::new(0.5, 0.5));
        assert_eq!(classifier().classify(&lm), None);
    }

    #[test]
    fn first_matching_predicate_wins() {
        let c = classifier();
        let poses = [Extended, Bent, Half];
        for thumb in [THUMB_NEAR, THUMB_FAR] {
            for a in poses {
                for b in poses {
                    for r in poses {
                        for p in poses {
                            let lm = hand(thumb, [a, b, r, p]);
                            let m = HandMeasurements::from_landmarks(&lm).unwrap();
                            let expected = [
                                c.is_move(&m).then_some(Gesture::Move(m.index_tip)),
                                c.is_left_click(&m).then_some(Gesture::LeftClick),
                                c.is_right_click(&m).then_some(Gesture::RightClick),
                                c.is_double_click(&m).then_some(Gesture::DoubleClick),
                                c.is_screenshot(&m).then_some(Gesture::Screenshot),
                            ]
                            .into_iter()
                            .flatten()
                            .next();
                            assert_eq!(c.classify(&lm), expected, "{a:?} {b:?} {r:?} {p:?}");
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn thresholds_are_strict() {
        let c = classifier();
        let lm = hand(THUMB_FAR, [Bent, Extended, Bent, Bent]);
        let mut m = HandMeasurements::from_landmarks(&lm).unwrap();

        m.thumb_index_distance = c.thresholds().near_distance;
        assert!(!c.is_move(&m));
        assert!(!c.is_left_click(&m));

        m.thumb_index_distance = 200.0;
        m.angles[Finger::Index as usize] = c.thresholds().bent_angle;
        assert!(!c.is_left_click(&m));
    }

    #[test]
    fn custom_thresholds_apply() {
        let strict = GestureClassifier::new(GestureThresholds {
            near_distance: 10.0,
            ..GestureThresholds::default()
        });
        let lm = hand(THUMB_NEAR, [Extended, Bent, Bent, Bent]);
        // 22 units apart: a pinch by default, an open thumb here.
        assert_eq!(strict.classify(&lm), Some(Gesture::RightClick));
    }
}
