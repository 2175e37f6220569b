//! Synchronous read, detect, classify, dispatch loop.

use std::{
    collections::HashMap,
    io::BufRead,
    thread,
    time::Duration,
};

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, Sender, TryRecvError};

use crate::{
    actions::{Dispatcher, MouseActions},
    error::FrameError,
    gesture::GestureClassifier,
    pipeline::{FrameSource, HandDetector},
    types::GestureKind,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// `q` entered on the terminal.
    Key,
    /// Ctrl-C.
    Interrupt,
    CameraFailure,
}

#[derive(Debug)]
pub struct RunSummary {
    pub stop: StopReason,
    pub frames: usize,
    pub skipped_frames: usize,
    pub frames_without_hand: usize,
    pub failed_actions: usize,
    pub gestures: HashMap<GestureKind, usize>,
    /// Slowest capture-to-action time over dispatched gestures.
    pub max_latency: Duration,
}

impl RunSummary {
    fn new() -> Self {
        Self {
            stop: StopReason::Key,
            frames: 0,
            skipped_frames: 0,
            frames_without_hand: 0,
            failed_actions: 0,
            gestures: HashMap::new(),
            max_latency: Duration::ZERO,
        }
    }

    pub fn count(&self, kind: GestureKind) -> usize {
        self.gestures.get(&kind).copied().unwrap_or(0)
    }
}

pub struct Runner<S, D, A> {
    source: S,
    detector: D,
    classifier: GestureClassifier,
    dispatcher: Dispatcher<A>,
    stop_rx: Receiver<StopReason>,
}

impl<S, D, A> Runner<S, D, A>
where
    S: FrameSource,
    D: HandDetector,
    A: MouseActions,
{
    pub fn new(
        source: S,
        detector: D,
        classifier: GestureClassifier,
        dispatcher: Dispatcher<A>,
        stop_rx: Receiver<StopReason>,
    ) -> Self {
        Self {
            source,
            detector,
            classifier,
            dispatcher,
            stop_rx,
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher<A> {
        &self.dispatcher
    }

    /// Runs until a stop request arrives or the source fails for good.
    pub fn run(&mut self) -> RunSummary {
        let mut summary = RunSummary::new();

        loop {
            match self.stop_rx.try_recv() {
                Ok(reason) => {
                    log::info!("stop requested: {reason:?}");
                    summary.stop = reason;
                    break;
                }
                // Watchers may be gone (stdin closed); keep going until Ctrl-C.
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => {}
            }

            let frame = match self.source.read_frame() {
                Ok(frame) => frame,
                Err(FrameError::Fatal(err)) => {
                    log::error!("camera read failed, stopping: {err:#}");
                    summary.stop = StopReason::CameraFailure;
                    break;
                }
                Err(err @ FrameError::Unusable(_)) => {
                    log::warn!("{err}");
                    summary.skipped_frames += 1;
                    continue;
                }
            };
            summary.frames += 1;

            let detection = match self.detector.detect(&frame) {
                Ok(Some(detection)) => detection,
                Ok(None) => {
                    log::debug!("no hand in frame");
                    summary.frames_without_hand += 1;
                    continue;
                }
                Err(err) => {
                    log::warn!("hand detection failed: {err:#}");
                    summary.skipped_frames += 1;
                    continue;
                }
            };

            let Some(gesture) = self.classifier.classify(&detection.landmarks) else {
                log::debug!("hand ({:.2}) matched no gesture", detection.confidence);
                continue;
            };
            log::debug!("gesture {gesture:?}");
            *summary.gestures.entry(gesture.kind()).or_insert(0) += 1;

            if let Err(err) = self.dispatcher.dispatch(&gesture) {
                log::warn!("{} failed: {err}", gesture.kind().display_name());
                summary.failed_actions += 1;
                continue;
            }
            let latency = frame.timestamp.elapsed();
            log::debug!("{} done {latency:?} after capture", gesture.kind().display_name());
            summary.max_latency = summary.max_latency.max(latency);
        }

        summary
    }
}

/// Sends [`StopReason::Key`] once a line reading `q` arrives.
pub fn watch_for_quit<R: BufRead>(reader: R, tx: &Sender<StopReason>) {
    for line in reader.lines() {
        let Ok(line) = line else {
            break;
        };
        if line.trim().eq_ignore_ascii_case("q") {
            let _ = tx.try_send(StopReason::Key);
            return;
        }
    }
    log::debug!("stdin closed, quit key disabled");
}

pub fn spawn_stdin_watcher(tx: Sender<StopReason>) -> Result<()> {
    thread::Builder::new()
        .name("stdin-quit".into())
        .spawn(move || watch_for_quit(std::io::stdin().lock(), &tx))
        .context("failed to spawn stdin watcher")?;
    Ok(())
}

pub fn install_interrupt_handler(tx: Sender<StopReason>) -> Result<()> {
    ctrlc::set_handler(move || {
        let _ = tx.try_send(StopReason::Interrupt);
    })
    .context("failed to install Ctrl-C handler")
}

#[cfg(test)]
mod tests {
    use std::{collections::VecDeque, io::Cursor, time::Instant};

    use anyhow::anyhow;
    use crossbeam_channel::{bounded, unbounded};

    use super::*;
    use crate::{
        actions::{
            MouseButton,
            recording::{Action, RecordingActions},
        },
        config::ActionConfig,
        gesture::fixtures::{
            Pose::{Bent, Extended},
            THUMB_FAR, THUMB_NEAR, hand,
        },
        types::{Frame, HandDetection, Point},
    };

    struct ScriptedSource(VecDeque<Result<Frame, FrameError>>);

    impl FrameSource for ScriptedSource {
        fn read_frame(&mut self) -> Result<Frame, FrameError> {
            self.0
                .pop_front()
                .unwrap_or_else(|| Err(FrameError::Fatal(anyhow!("unplugged"))))
        }
    }

    struct ScriptedDetector(VecDeque<anyhow::Result<Option<HandDetection>>>);

    impl HandDetector for ScriptedDetector {
        fn detect(&mut self, _frame: &Frame) -> anyhow::Result<Option<HandDetection>> {
            self.0.pop_front().unwrap_or(Ok(None))
        }
    }

    fn frame() -> Frame {
        Frame {
            rgba: vec![0; 4 * 4 * 4],
            width: 4,
            height: 4,
            timestamp: Instant::now(),
        }
    }

    fn frames(n: usize) -> ScriptedSource {
        ScriptedSource((0..n).map(|_| Ok(frame())).collect())
    }

    fn seen(landmarks: Vec<Point>) -> anyhow::Result<Option<HandDetection>> {
        Ok(Some(HandDetection {
            landmarks,
            confidence: 0.9,
        }))
    }

    fn runner(
        source: ScriptedSource,
        detections: Vec<anyhow::Result<Option<HandDetection>>>,
        actions: RecordingActions,
        stop_rx: Receiver<StopReason>,
    ) -> Runner<ScriptedSource, ScriptedDetector, RecordingActions> {
        Runner::new(
            source,
            ScriptedDetector(detections.into()),
            GestureClassifier::default(),
            Dispatcher::new(actions, &ActionConfig::default()),
            stop_rx,
        )
    }

    fn screen() -> RecordingActions {
        RecordingActions {
            screen: (1000, 500),
            ..RecordingActions::default()
        }
    }

    #[test]
    fn camera_failure_stops_the_loop() {
        let (_tx, rx) = unbounded();
        let mut r = runner(frames(3), Vec::new(), screen(), rx);
        let summary = r.run();
        assert_eq!(summary.stop, StopReason::CameraFailure);
        assert_eq!(summary.frames, 3);
        assert_eq!(summary.frames_without_hand, 3);
        assert!(r.dispatcher().actions().log.is_empty());
    }

    #[test]
    fn stop_request_is_honoured_before_reading() {
        let (tx, rx) = bounded(1);
        tx.send(StopReason::Interrupt).unwrap();
        let mut r = runner(frames(5), Vec::new(), screen(), rx);
        let summary = r.run();
        assert_eq!(summary.stop, StopReason::Interrupt);
        assert_eq!(summary.frames, 0);
    }

    #[test]
    fn each_gesture_is_dispatched_once() {
        let (_tx, rx) = unbounded();
        let pinch = hand(THUMB_NEAR, [Extended, Bent, Bent, Bent]);
        let tip = pinch[8];
        let detections = vec![
            seen(pinch),
            Ok(None),
            seen(hand(THUMB_FAR, [Bent, Extended, Bent, Bent])),
            seen(hand(THUMB_FAR, [Extended, Extended, Extended, Extended])),
            seen(hand(THUMB_FAR, [Bent, Bent, Bent, Bent])),
        ];
        let mut r = runner(frames(5), detections, screen(), rx);
        let summary = r.run();

        let expected_move = ((tip.x * 1000.0) as i32, (tip.y * 500.0) as i32);
        assert_eq!(
            r.dispatcher().actions().log,
            vec![
                Action::Move(expected_move.0, expected_move.1),
                Action::Click(MouseButton::Left),
                Action::DoubleClick,
            ]
        );
        assert_eq!(summary.frames, 5);
        assert_eq!(summary.frames_without_hand, 1);
        assert_eq!(summary.count(GestureKind::Move), 1);
        assert_eq!(summary.count(GestureKind::LeftClick), 1);
        assert_eq!(summary.count(GestureKind::DoubleClick), 1);
        assert_eq!(summary.count(GestureKind::RightClick), 0);
    }

    #[test]
    fn unusable_frames_and_detector_errors_are_skipped() {
        let (_tx, rx) = unbounded();
        let source = ScriptedSource(
            vec![
                Err(FrameError::Unusable(anyhow!("short buffer"))),
                Ok(frame()),
                Ok(frame()),
            ]
            .into(),
        );
        let detections = vec![
            Err(anyhow!("inference failed")),
            seen(hand(THUMB_FAR, [Extended, Bent, Bent, Bent])),
        ];
        let mut r = runner(source, detections, screen(), rx);
        let summary = r.run();
        assert_eq!(summary.skipped_frames, 2);
        assert_eq!(summary.frames, 2);
        assert_eq!(
            r.dispatcher().actions().log,
            vec![Action::Click(MouseButton::Right)]
        );
    }

    #[test]
    fn dispatch_failure_does_not_stop_the_loop() {
        let (_tx, rx) = unbounded();
        let actions = RecordingActions {
            fail: true,
            ..screen()
        };
        let detections = vec![
            seen(hand(THUMB_FAR, [Bent, Extended, Bent, Bent])),
            seen(hand(THUMB_FAR, [Bent, Extended, Bent, Bent])),
        ];
        let mut r = runner(frames(2), detections, actions, rx);
        let summary = r.run();
        assert_eq!(summary.failed_actions, 2);
        assert_eq!(summary.count(GestureKind::LeftClick), 2);
        assert_eq!(summary.stop, StopReason::CameraFailure);
    }

    #[test]
    fn disconnected_stop_channel_keeps_running() {
        let (tx, rx) = unbounded::<StopReason>();
        drop(tx);
        let mut r = runner(frames(2), Vec::new(), screen(), rx);
        let summary = r.run();
        assert_eq!(summary.frames, 2);
        assert_eq!(summary.stop, StopReason::CameraFailure);
    }

    #[test]
    fn latency_is_measured_from_capture() {
        let (_tx, rx) = unbounded();
        let captured = Instant::now() - Duration::from_millis(40);
        let source = ScriptedSource(
            vec![Ok(Frame {
                timestamp: captured,
                ..frame()
            })]
            .into(),
        );
        let detections = vec![seen(hand(THUMB_FAR, [Bent, Bent, Bent, Bent]))];
        let mut r = runner(source, detections, screen(), rx);
        let summary = r.run();
        assert_eq!(summary.count(GestureKind::DoubleClick), 1);
        assert!(summary.max_latency >= Duration::from_millis(40));
    }

    #[test]
    fn failed_actions_do_not_count_towards_latency() {
        let (_tx, rx) = unbounded();
        let actions = RecordingActions {
            fail: true,
            ..screen()
        };
        let source = ScriptedSource(
            vec![Ok(Frame {
                timestamp: Instant::now() - Duration::from_millis(40),
                ..frame()
            })]
            .into(),
        );
        let detections = vec![seen(hand(THUMB_FAR, [Bent, Bent, Bent, Bent]))];
        let summary = runner(source, detections, actions, rx).run();
        assert_eq!(summary.max_latency, Duration::ZERO);
    }

    #[test]
    fn quit_line_sends_key() {
        let (tx, rx) = unbounded();
        watch_for_quit(Cursor::new("hello\n  Q \nq\n"), &tx);
        assert_eq!(rx.try_recv(), Ok(StopReason::Key));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn eof_without_quit_sends_nothing() {
        let (tx, rx) = unbounded();
        watch_for_quit(Cursor::new("quit\nexit\n"), &tx);
        assert!(rx.try_recv().is_err());
    }
}
