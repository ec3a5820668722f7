//
// Microstacker - Focus stacking rig control panel
// Copyright (c) 2024 Microstacker contributors
//
// This project is licensed under the terms of the MIT license
// (see the LICENSE file for details).
//

//!
//! Capture stack sequencer.
//!
//! A stack run repeats, for each frame: wait (pre-shot delay), capture, wait (pre-focus delay), rotate the stage,
//! wait (rotation settle time). The sequencer never waits by itself: `start` and `tick` return the delay after which
//! the host event loop must call `tick` again. All waits are sequential, i.e., each one begins when the preceding
//! step's side effects have been issued; one frame takes `pre_shot_delay + pre_focus_delay + settle_time`.
//!
//! Cancellation is cooperative: `cancel` only sets a flag, which is checked at the beginning of every `tick`
//! (i.e., at the end of each wait).
//!

use crate::capture::{CaptureError, CapturedImage};
use crate::devices::stage::{self, StageCommand, StageError};
use std::time::Duration;

/// Nominal time needed by the stage to perform a full revolution.
const FULL_REVOLUTION_TIME: Duration = Duration::from_secs(2);

/// Modeled time for the stage to complete a rotation by `angle` degrees (rounded to the nearest millisecond).
pub fn settle_time(angle: u32) -> Duration {
    let full_ms = FULL_REVOLUTION_TIME.as_millis() as u64;
    Duration::from_millis((full_ms * angle as u64 + 180) / 360)
}

#[derive(Debug)]
pub enum StackError {
    AlreadyRunning,
    InvalidRequest(String),
    /// Failed to create the run's destination folder.
    Folder(std::io::Error)
}

impl std::fmt::Display for StackError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StackError::AlreadyRunning => write!(f, "a stack capture is already in progress"),
            StackError::InvalidRequest(msg) => write!(f, "invalid stack parameters: {}", msg),
            StackError::Folder(e) => write!(f, "cannot create stack folder: {}", e)
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, strum_macros::EnumString, strum_macros::IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum CaptureFailurePolicy {
    /// Log the failure and continue with the next frame.
    #[default]
    Continue,
    /// Release the stage and end the run.
    Abort
}

#[derive(Clone, Debug, PartialEq)]
pub struct StackRequest {
    frame_count: usize,
    pre_shot_delay: Duration,
    pre_focus_delay: Duration,
    rotation_angle: u32
}

impl StackRequest {
    pub fn new(
        frame_count: usize,
        pre_shot_delay: Duration,
        pre_focus_delay: Duration,
        rotation_angle: u32
    ) -> Result<StackRequest, StackError> {
        if frame_count == 0 {
            return Err(StackError::InvalidRequest("number of frames must be at least 1".into()));
        }
        if rotation_angle > stage::MAX_ANGLE {
            return Err(StackError::InvalidRequest(
                format!("rotation angle must not exceed {}° (got {}°)", stage::MAX_ANGLE, rotation_angle)
            ));
        }

        Ok(StackRequest{ frame_count, pre_shot_delay, pre_focus_delay, rotation_angle })
    }

    pub fn frame_count(&self) -> usize { self.frame_count }

    pub fn pre_shot_delay(&self) -> Duration { self.pre_shot_delay }

    pub fn pre_focus_delay(&self) -> Duration { self.pre_focus_delay }

    pub fn rotation_angle(&self) -> u32 { self.rotation_angle }

    /// Sum of all waits of a complete run; `None` if it does not fit in a `Duration`.
    pub fn total_duration(&self) -> Option<Duration> {
        let frame_count = u32::try_from(self.frame_count).ok()?;
        self.pre_shot_delay
            .checked_add(self.pre_focus_delay)?
            .checked_add(settle_time(self.rotation_angle))?
            .checked_mul(frame_count)
    }
}

/// Side effects required by the sequencer.
pub trait StackHost {
    /// Creates the destination folder for a new run and returns its name.
    fn create_run_folder(&mut self) -> Result<String, std::io::Error>;

    fn send_command(&mut self, command: StageCommand) -> Result<(), StageError>;

    /// Captures an image into `folder`. Notifying the image display is up to the host.
    fn capture(&mut self, folder: &str, frame_index: usize) -> Result<CapturedImage, CaptureError>;

    fn set_active_style(&mut self);

    fn set_idle_style(&mut self);
}

/// What the current wait of a running stack leads to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for the pre-shot delay; capture follows.
    PreShot,
    /// Waiting for the pre-focus delay; rotation follows.
    PreFocus,
    /// Waiting for the stage to finish rotating.
    Settle
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SequencerState {
    Idle,
    Running{ frame_index: usize, phase: Phase }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CancelReason {
    UserRequest,
    CaptureFailure
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StackOutcome {
    Completed,
    Cancelled(CancelReason)
}

#[derive(Clone, Debug, PartialEq)]
pub struct FrameFailure {
    pub frame_index: usize,
    pub message: String
}

/// Summary of a finished run.
#[derive(Clone, Debug, PartialEq)]
pub struct RunReport {
    pub outcome: StackOutcome,
    pub folder: String,
    pub frames_attempted: usize,
    pub images: Vec<CapturedImage>,
    pub capture_failures: Vec<FrameFailure>,
    /// Number of stage commands which could not be sent.
    pub command_failures: usize
}

#[derive(Debug)]
pub enum Step {
    /// `tick` must be called again after the specified delay.
    Wait(Duration),
    Finished(RunReport),
    /// There is no active run; nothing to do.
    Idle
}

#[derive(Debug)]
struct StackRun {
    request: StackRequest,
    frame_index: usize,
    phase: Phase,
    cancelled: bool,
    folder: String,
    frames_attempted: usize,
    images: Vec<CapturedImage>,
    capture_failures: Vec<FrameFailure>,
    command_failures: usize
}

impl StackRun {
    fn send<H: StackHost>(&mut self, command: StageCommand, host: &mut H) {
        if host.send_command(command).is_err() {
            self.command_failures += 1;
        }
    }

    fn into_report(self, outcome: StackOutcome) -> RunReport {
        RunReport{
            outcome,
            folder: self.folder,
            frames_attempted: self.frames_attempted,
            images: self.images,
            capture_failures: self.capture_failures,
            command_failures: self.command_failures
        }
    }
}

pub struct StackSequencer {
    run: Option<StackRun>,
    failure_policy: CaptureFailurePolicy
}

impl StackSequencer {
    pub fn new(failure_policy: CaptureFailurePolicy) -> StackSequencer {
        StackSequencer{ run: None, failure_policy }
    }

    pub fn state(&self) -> SequencerState {
        match &self.run {
            None => SequencerState::Idle,
            Some(run) => SequencerState::Running{ frame_index: run.frame_index, phase: run.phase }
        }
    }

    pub fn is_running(&self) -> bool { self.run.is_some() }

    /// Begins a new run; returns the delay after which `tick` is to be called.
    pub fn start<H: StackHost>(&mut self, request: StackRequest, host: &mut H) -> Result<Duration, StackError> {
        if self.run.is_some() {
            log::warn!("stack capture requested while another one is in progress; ignoring");
            return Err(StackError::AlreadyRunning);
        }

        let folder = host.create_run_folder().map_err(StackError::Folder)?;

        log::info!(
            "starting stack capture into \"{}\": {} frame(s), pre-shot delay {:.1} s, pre-focus delay {:.1} s, \
            angle {}°, expected duration {}",
            folder,
            request.frame_count,
            request.pre_shot_delay.as_secs_f64(),
            request.pre_focus_delay.as_secs_f64(),
            request.rotation_angle,
            request.total_duration().map(|d| format!("{:.1} s", d.as_secs_f64())).unwrap_or("unknown".to_string())
        );

        let first_delay = request.pre_shot_delay;
        let mut run = StackRun{
            request,
            frame_index: 0,
            phase: Phase::PreShot,
            cancelled: false,
            folder,
            frames_attempted: 0,
            images: vec![],
            capture_failures: vec![],
            command_failures: 0
        };
        run.send(StageCommand::Arm, host);
        host.set_active_style();
        self.run = Some(run);

        Ok(first_delay)
    }

    /// Requests cancellation; takes effect at the end of the current wait.
    pub fn cancel(&mut self) {
        if let Some(run) = &mut self.run {
            if !run.cancelled {
                log::info!("stack capture cancellation requested (frame {} of {})",
                    run.frame_index + 1, run.request.frame_count);
            }
            run.cancelled = true;
        }
    }

    /// Advances the run after the most recently returned delay has elapsed.
    pub fn tick<H: StackHost>(&mut self, host: &mut H) -> Step {
        let run = match &mut self.run {
            Some(run) => run,
            None => return Step::Idle
        };

        if run.cancelled {
            return self.finish(StackOutcome::Cancelled(CancelReason::UserRequest), host);
        }

        match run.phase {
            Phase::PreShot => {
                run.frames_attempted += 1;
                match host.capture(&run.folder, run.frame_index) {
                    Ok(image) => run.images.push(image),
                    Err(e) => {
                        run.capture_failures.push(FrameFailure{ frame_index: run.frame_index, message: e.to_string() });
                        if self.failure_policy == CaptureFailurePolicy::Abort {
                            log::error!("aborting stack capture after failure at frame {}", run.frame_index + 1);
                            return self.finish(StackOutcome::Cancelled(CancelReason::CaptureFailure), host);
                        }
                    }
                }
                run.phase = Phase::PreFocus;
                Step::Wait(run.request.pre_focus_delay)
            },

            Phase::PreFocus => {
                let angle = run.request.rotation_angle;
                run.send(StageCommand::Up(angle), host);
                run.phase = Phase::Settle;
                Step::Wait(settle_time(angle))
            },

            Phase::Settle => {
                if run.frame_index + 1 >= run.request.frame_count {
                    self.finish(StackOutcome::Completed, host)
                } else {
                    run.frame_index += 1;
                    run.phase = Phase::PreShot;
                    Step::Wait(run.request.pre_shot_delay)
                }
            }
        }
    }

    fn finish<H: StackHost>(&mut self, outcome: StackOutcome, host: &mut H) -> Step {
        let mut run = match self.run.take() {
            Some(run) => run,
            None => return Step::Idle
        };

        run.send(StageCommand::Release, host);
        host.set_idle_style();

        let report = run.into_report(outcome);
        log::info!(
            "stack capture finished ({:?}): {} image(s) in \"{}\", {} capture failure(s), {} command failure(s)",
            report.outcome,
            report.images.len(),
            report.folder,
            report.capture_failures.len(),
            report.command_failures
        );

        Step::Finished(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[derive(Debug, PartialEq)]
    enum Event {
        Folder(String),
        Command(String),
        Capture{ folder: String, frame_index: usize },
        Active,
        Idle
    }

    /// Records all side effects; captures fail for frame indices listed in `failing_frames`.
    #[derive(Default)]
    struct FakeHost {
        events: Vec<Event>,
        failing_frames: Vec<usize>,
        connected: bool,
        folder_error: bool,
        runs: usize
    }

    impl FakeHost {
        fn connected() -> FakeHost {
            FakeHost{ connected: true, ..Default::default() }
        }

        fn commands(&self) -> Vec<&str> {
            self.events.iter().filter_map(|e| match e { Event::Command(c) => Some(c.as_str()), _ => None }).collect()
        }

        fn captures(&self) -> usize {
            self.events.iter().filter(|e| matches!(e, Event::Capture{..})).count()
        }
    }

    impl StackHost for FakeHost {
        fn create_run_folder(&mut self) -> Result<String, std::io::Error> {
            if self.folder_error {
                return Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"));
            }
            self.runs += 1;
            let name = format!("Stack_{}", self.runs);
            self.events.push(Event::Folder(name.clone()));
            Ok(name)
        }

        fn send_command(&mut self, command: StageCommand) -> Result<(), StageError> {
            if self.connected {
                self.events.push(Event::Command(command.wire_string()));
                Ok(())
            } else {
                Err(StageError::NotConnected)
            }
        }

        fn capture(&mut self, folder: &str, frame_index: usize) -> Result<CapturedImage, CaptureError> {
            self.events.push(Event::Capture{ folder: folder.to_string(), frame_index });
            if self.failing_frames.contains(&frame_index) {
                Err(CaptureError::NoCamera)
            } else {
                Ok(CapturedImage{
                    file_path: PathBuf::from(folder).join(format!("IMG_{}.JPG", frame_index)),
                    source_frame_index: Some(frame_index)
                })
            }
        }

        fn set_active_style(&mut self) { self.events.push(Event::Active); }

        fn set_idle_style(&mut self) { self.events.push(Event::Idle); }
    }

    fn secs(s: u64) -> Duration { Duration::from_secs(s) }

    /// Drives the sequencer with a virtual clock until the run ends; returns the report and total waited time.
    fn run_to_end(sequencer: &mut StackSequencer, first_delay: Duration, host: &mut FakeHost) -> (RunReport, Duration) {
        let mut elapsed = first_delay;
        loop {
            match sequencer.tick(host) {
                Step::Wait(delay) => elapsed += delay,
                Step::Finished(report) => return (report, elapsed),
                Step::Idle => panic!("sequencer became idle without finishing"),
            }
        }
    }

    #[test]
    fn given_angles_compute_settle_time() {
        assert_eq!(Duration::from_millis(2000), settle_time(360));
        assert_eq!(Duration::from_millis(167), settle_time(30));
        assert_eq!(Duration::from_millis(1000), settle_time(180));
        assert_eq!(Duration::ZERO, settle_time(0));
    }

    #[test]
    fn given_invalid_parameters_request_is_rejected() {
        assert!(matches!(StackRequest::new(0, secs(1), secs(0), 30), Err(StackError::InvalidRequest(_))));
        assert!(matches!(StackRequest::new(3, secs(1), secs(0), 361), Err(StackError::InvalidRequest(_))));
        assert!(StackRequest::new(1, secs(0), secs(0), 360).is_ok());
    }

    #[test]
    fn given_three_frames_run_sends_expected_commands_and_takes_expected_time() {
        let mut host = FakeHost::connected();
        let mut sequencer = StackSequencer::new(CaptureFailurePolicy::Continue);
        let request = StackRequest::new(3, secs(1), secs(0), 30).unwrap();
        assert_eq!(Some(Duration::from_millis(3501)), request.total_duration());

        let first_delay = sequencer.start(request, &mut host).unwrap();
        assert_eq!(secs(1), first_delay);
        assert_eq!(SequencerState::Running{ frame_index: 0, phase: Phase::PreShot }, sequencer.state());

        let (report, elapsed) = run_to_end(&mut sequencer, first_delay, &mut host);

        assert_eq!(vec!["A", "U30", "U30", "U30", "R"], host.commands());
        assert_eq!(3, host.captures());
        assert_eq!(Duration::from_millis(3 * (1000 + 167)), elapsed);
        assert_eq!(StackOutcome::Completed, report.outcome);
        assert_eq!(3, report.images.len());
        assert_eq!(vec![Some(0), Some(1), Some(2)], report.images.iter().map(|i| i.source_frame_index).collect::<Vec<_>>());
        assert_eq!(SequencerState::Idle, sequencer.state());
    }

    #[test]
    fn given_n_frames_run_produces_n_captures_and_rotations() {
        for n in 1..=6 {
            let mut host = FakeHost::connected();
            let mut sequencer = StackSequencer::new(CaptureFailurePolicy::Continue);
            let first_delay = sequencer.start(StackRequest::new(n, secs(2), secs(1), 90).unwrap(), &mut host).unwrap();
            let (report, elapsed) = run_to_end(&mut sequencer, first_delay, &mut host);

            let commands = host.commands();
            assert_eq!(n, host.captures());
            assert_eq!(n, commands.iter().filter(|c| **c == "U90").count());
            assert_eq!(Some(&"A"), commands.first());
            assert_eq!(Some(&"R"), commands.last());
            assert_eq!(1, commands.iter().filter(|c| **c == "A").count());
            assert_eq!(1, commands.iter().filter(|c| **c == "R").count());
            assert_eq!(n, report.frames_attempted);
            assert_eq!(Duration::from_millis(n as u64 * (2000 + 1000 + 500)), elapsed);
        }
    }

    #[test]
    fn given_start_side_effects_occur_in_order() {
        let mut host = FakeHost::connected();
        let mut sequencer = StackSequencer::new(CaptureFailurePolicy::Continue);
        let first_delay = sequencer.start(StackRequest::new(1, secs(0), secs(0), 10).unwrap(), &mut host).unwrap();
        run_to_end(&mut sequencer, first_delay, &mut host);

        assert_eq!(
            vec![
                Event::Folder("Stack_1".into()),
                Event::Command("A".into()),
                Event::Active,
                Event::Capture{ folder: "Stack_1".into(), frame_index: 0 },
                Event::Command("U10".into()),
                Event::Command("R".into()),
                Event::Idle
            ],
            host.events
        );
    }

    #[test]
    fn given_phases_waits_follow_sequential_timing() {
        let mut host = FakeHost::connected();
        let mut sequencer = StackSequencer::new(CaptureFailurePolicy::Continue);
        let first_delay = sequencer.start(StackRequest::new(2, secs(3), secs(5), 360).unwrap(), &mut host).unwrap();
        assert_eq!(secs(3), first_delay);

        let mut delays = vec![];
        while let Step::Wait(delay) = sequencer.tick(&mut host) {
            delays.push(delay);
        }
        assert_eq!(vec![secs(5), secs(2), secs(3), secs(5), secs(2)], delays);
    }

    #[test]
    fn given_cancel_during_pre_shot_wait_no_further_capture_is_made() {
        let mut host = FakeHost::connected();
        let mut sequencer = StackSequencer::new(CaptureFailurePolicy::Continue);
        let first_delay = sequencer.start(StackRequest::new(5, secs(1), secs(1), 30).unwrap(), &mut host).unwrap();

        // frame 0 complete, frame 1 waiting for its pre-shot delay
        for _ in 0..3 { sequencer.tick(&mut host); }
        assert_eq!(SequencerState::Running{ frame_index: 1, phase: Phase::PreShot }, sequencer.state());
        sequencer.cancel();
        assert!(sequencer.is_running(), "cancellation must not end the run before the current wait elapses");

        let (report, _) = run_to_end(&mut sequencer, first_delay, &mut host);
        assert_eq!(StackOutcome::Cancelled(CancelReason::UserRequest), report.outcome);
        assert_eq!(1, host.captures());
        assert_eq!(vec!["A", "U30", "R"], host.commands());
        assert_eq!(Some(&Event::Idle), host.events.last());
    }

    #[test]
    fn given_cancel_after_capture_rotation_is_skipped() {
        let mut host = FakeHost::connected();
        let mut sequencer = StackSequencer::new(CaptureFailurePolicy::Continue);
        let first_delay = sequencer.start(StackRequest::new(3, secs(1), secs(1), 45).unwrap(), &mut host).unwrap();

        sequencer.tick(&mut host); // capture of frame 0
        sequencer.cancel();
        sequencer.cancel();
        let (report, _) = run_to_end(&mut sequencer, first_delay, &mut host);

        assert_eq!(StackOutcome::Cancelled(CancelReason::UserRequest), report.outcome);
        assert_eq!(1, host.captures());
        assert_eq!(vec!["A", "R"], host.commands());
    }

    #[test]
    fn given_cancel_during_last_settle_run_ends_cancelled_with_single_release() {
        let mut host = FakeHost::connected();
        let mut sequencer = StackSequencer::new(CaptureFailurePolicy::Continue);
        let first_delay = sequencer.start(StackRequest::new(2, secs(0), secs(0), 30).unwrap(), &mut host).unwrap();
        for _ in 0..5 { sequencer.tick(&mut host); }
        assert_eq!(SequencerState::Running{ frame_index: 1, phase: Phase::Settle }, sequencer.state());
        sequencer.cancel();

        let (report, _) = run_to_end(&mut sequencer, first_delay, &mut host);
        assert_eq!(StackOutcome::Cancelled(CancelReason::UserRequest), report.outcome);
        assert_eq!(2, host.captures());
        assert_eq!(vec!["A", "U30", "U30", "R"], host.commands());
    }

    #[test]
    fn given_cancel_while_idle_nothing_happens() {
        let mut host = FakeHost::connected();
        let mut sequencer = StackSequencer::new(CaptureFailurePolicy::Continue);
        sequencer.cancel();
        assert!(matches!(sequencer.tick(&mut host), Step::Idle));
        assert!(host.events.is_empty());
    }

    #[test]
    fn given_capture_failure_run_continues_by_default() {
        let mut host = FakeHost{ failing_frames: vec![1], ..FakeHost::connected() };
        let mut sequencer = StackSequencer::new(CaptureFailurePolicy::Continue);
        let first_delay = sequencer.start(StackRequest::new(3, secs(1), secs(0), 30).unwrap(), &mut host).unwrap();
        let (report, _) = run_to_end(&mut sequencer, first_delay, &mut host);

        assert_eq!(StackOutcome::Completed, report.outcome);
        assert_eq!(3, host.captures());
        assert_eq!(3, report.frames_attempted);
        assert_eq!(2, report.images.len());
        assert_eq!(1, report.capture_failures.len());
        assert_eq!(1, report.capture_failures[0].frame_index);
        assert_eq!(vec!["A", "U30", "U30", "U30", "R"], host.commands());
    }

    #[test]
    fn given_abort_policy_capture_failure_ends_run() {
        let mut host = FakeHost{ failing_frames: vec![1], ..FakeHost::connected() };
        let mut sequencer = StackSequencer::new(CaptureFailurePolicy::Abort);
        let first_delay = sequencer.start(StackRequest::new(4, secs(1), secs(0), 30).unwrap(), &mut host).unwrap();
        let (report, _) = run_to_end(&mut sequencer, first_delay, &mut host);

        assert_eq!(StackOutcome::Cancelled(CancelReason::CaptureFailure), report.outcome);
        assert_eq!(2, host.captures());
        assert_eq!(vec!["A", "U30", "R"], host.commands());
    }

    #[test]
    fn given_disconnected_stage_run_completes_and_counts_command_failures() {
        let mut host = FakeHost::default();
        let mut sequencer = StackSequencer::new(CaptureFailurePolicy::Continue);
        let first_delay = sequencer.start(StackRequest::new(2, secs(1), secs(0), 30).unwrap(), &mut host).unwrap();
        let (report, _) = run_to_end(&mut sequencer, first_delay, &mut host);

        assert_eq!(StackOutcome::Completed, report.outcome);
        assert_eq!(2, host.captures());
        // A, 2 x U, R
        assert_eq!(4, report.command_failures);
    }

    #[test]
    fn given_active_run_second_start_is_rejected() {
        let mut host = FakeHost::connected();
        let mut sequencer = StackSequencer::new(CaptureFailurePolicy::Continue);
        let request = StackRequest::new(2, secs(1), secs(0), 30).unwrap();
        sequencer.start(request.clone(), &mut host).unwrap();
        sequencer.tick(&mut host);

        assert!(matches!(sequencer.start(request, &mut host), Err(StackError::AlreadyRunning)));
        assert_eq!(SequencerState::Running{ frame_index: 0, phase: Phase::PreFocus }, sequencer.state());
        assert_eq!(1, host.runs);
        assert_eq!(vec!["A"], host.commands());
    }

    #[test]
    fn given_idle_sequencer_consecutive_starts_produce_independent_runs() {
        let mut host = FakeHost::connected();
        let mut sequencer = StackSequencer::new(CaptureFailurePolicy::Continue);
        let request = StackRequest::new(2, secs(1), secs(0), 30).unwrap();

        let delay = sequencer.start(request.clone(), &mut host).unwrap();
        let (first, _) = run_to_end(&mut sequencer, delay, &mut host);
        let delay = sequencer.start(request, &mut host).unwrap();
        let (second, _) = run_to_end(&mut sequencer, delay, &mut host);

        assert_ne!(first.folder, second.folder);
        assert_eq!(2, first.images.len());
        assert_eq!(2, second.images.len());
        assert!(second.images.iter().all(|i| i.file_path.starts_with(&second.folder)));
        assert_eq!(vec!["A", "U30", "U30", "R", "A", "U30", "U30", "R"], host.commands());
    }

    #[test]
    fn given_folder_creation_failure_run_does_not_start() {
        let mut host = FakeHost{ folder_error: true, ..FakeHost::connected() };
        let mut sequencer = StackSequencer::new(CaptureFailurePolicy::Continue);

        assert!(matches!(
            sequencer.start(StackRequest::new(2, secs(1), secs(0), 30).unwrap(), &mut host),
            Err(StackError::Folder(_))
        ));
        assert_eq!(SequencerState::Idle, sequencer.state());
        assert!(host.events.is_empty());
    }

    #[test]
    fn given_policy_names_parse() {
        assert_eq!(CaptureFailurePolicy::Abort, "abort".parse().unwrap());
        assert_eq!(CaptureFailurePolicy::Continue, "continue".parse().unwrap());
        assert!("sometimes".parse::<CaptureFailurePolicy>().is_err());
        assert_eq!("abort", <&'static str>::from(CaptureFailurePolicy::Abort));
    }

    #[test]
    fn given_huge_delays_or_frame_count_total_duration_is_unknown_and_start_succeeds() {
        let request = StackRequest::new(3, secs(u64::MAX / 2), secs(0), 30).unwrap();
        assert_eq!(None, request.total_duration());

        if let Some(frame_count) = (u32::MAX as usize).checked_add(2) {
            let request = StackRequest::new(frame_count, secs(1), secs(0), 0).unwrap();
            assert_eq!(None, request.total_duration());
        }

        log::set_max_level(log::LevelFilter::Info);
        let mut host = FakeHost::connected();
        let mut sequencer = StackSequencer::new(CaptureFailurePolicy::Continue);
        let first_delay = sequencer.start(StackRequest::new(3, secs(u64::MAX / 2), secs(0), 30).unwrap(), &mut host);
        assert_eq!(Ok(secs(u64::MAX / 2)), first_delay.map_err(|e| e.to_string()));
        assert!(sequencer.is_running());
    }
}
