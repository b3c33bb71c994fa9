use log::{debug, trace};
use serde::Serialize;
use thiserror::Error;

use crate::runtime::{ManualTicks, TickScheduler};
use crate::sample::{Sample, TEST_DURATION_SECS};
use crate::session::{Session, Status};
use crate::stats::Stats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("cannot {operation} while test is {status}")]
    InvalidStateTransition {
        operation: &'static str,
        status: Status,
    },
}

/// What a call to `submit_input` did to the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputOutcome {
    /// The test was not running, nothing changed
    Ignored,
    /// Input recorded for the current word, no commit
    Pending,
    /// Current word committed, moved on to the next one
    Committed,
    /// Final word committed, test completed
    Completed,
}

/// Final results handed to the completion listener.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionReport {
    pub stats: Stats,
    pub words_committed: usize,
    pub elapsed_secs: u32,
    pub timed_out: bool,
    pub mistyped_positions: Vec<usize>,
}

type CompletionListener = Box<dyn FnMut(&CompletionReport) + Send>;

/// Read-only view of the engine's state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub session: Session,
    pub stats: Stats,
}

/// Scores a typing test over a fixed [`Sample`].
///
/// The engine never reads a clock. While a test is running it keeps its
/// scheduler armed, and whoever drives the scheduler calls [`tick`] once a
/// second.
///
/// [`tick`]: TypingTestEngine::tick
pub struct TypingTestEngine<S: TickScheduler = ManualTicks> {
    sample: Sample,
    session: Session,
    stats: Stats,
    scheduler: S,
    on_complete: Option<CompletionListener>,
}

impl TypingTestEngine<ManualTicks> {
    pub fn new(source: &str) -> Self {
        Self::with_scheduler(source, TEST_DURATION_SECS, ManualTicks::new())
    }
}

impl<S: TickScheduler> TypingTestEngine<S> {
    pub fn with_scheduler(source: &str, duration_secs: u32, scheduler: S) -> Self {
        Self {
            sample: Sample::new(source),
            session: Session::new(duration_secs),
            stats: Stats::default(),
            scheduler,
            on_complete: None,
        }
    }

    pub fn with_duration(mut self, duration_secs: u32) -> Self {
        self.session = Session::new(duration_secs);
        self
    }

    /// Register the listener that receives the final results, once per
    /// completed run.
    pub fn on_complete<F>(&mut self, listener: F)
    where
        F: FnMut(&CompletionReport) + Send + 'static,
    {
        self.on_complete = Some(Box::new(listener));
    }

    pub fn sample(&self) -> &Sample {
        &self.sample
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn status(&self) -> Status {
        self.session.status
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            session: self.session.clone(),
            stats: self.stats,
        }
    }

    /// Start the test. Ignored unless idle.
    pub fn start(&mut self) {
        if let Err(e) = self.try_start() {
            trace!("start ignored: {e}");
        }
    }

    pub fn try_start(&mut self) -> Result<(), EngineError> {
        self.expect_status("start", Status::Idle)?;

        self.session.status = Status::Running;
        self.session.remaining_secs = self.session.duration_secs;
        self.session.elapsed_secs = 0;
        self.scheduler.arm();
        debug!(
            "test started: {} words, {}s",
            self.sample.len(),
            self.session.duration_secs
        );

        if self.session.duration_secs == 0 {
            self.complete(true);
        }
        Ok(())
    }

    /// One second of wall-clock time passed.
    pub fn tick(&mut self) {
        if !self.session.is_running() {
            trace!("tick ignored while {}", self.session.status);
            return;
        }

        self.session.remaining_secs = self.session.remaining_secs.saturating_sub(1);
        self.session.elapsed_secs = self.session.duration_secs - self.session.remaining_secs;
        self.stats = Stats::calculate(
            self.stats.correct_chars,
            self.stats.incorrect_chars,
            self.stats.total_chars,
            self.session.elapsed_secs,
        );

        if self.session.remaining_secs == 0 {
            self.complete(true);
        }
    }

    /// Deliver a tick sent by the scheduler for `schedule`. Ticks left over
    /// from a cancelled schedule are dropped.
    pub fn scheduled_tick(&mut self, schedule: u64) {
        if self.scheduler.accepts(schedule) {
            self.tick();
        } else {
            trace!("stale tick from schedule {schedule} dropped");
        }
    }

    /// Score the current contents of the input field. Ignored unless running.
    pub fn submit_input(&mut self, raw_value: &str) -> InputOutcome {
        self.try_submit_input(raw_value).unwrap_or_else(|e| {
            trace!("input ignored: {e}");
            InputOutcome::Ignored
        })
    }

    pub fn try_submit_input(&mut self, raw_value: &str) -> Result<InputOutcome, EngineError> {
        self.expect_status("submit input", Status::Running)?;

        let idx = self.session.current_word_index;
        let current_word = self.sample.word(idx).unwrap_or_default().to_string();
        let typed_len = raw_value.chars().count();

        let prefix = self.sample.committed_prefix(idx);
        let expected: Vec<char> = prefix
            .chars()
            .chain(current_word.chars().chain(Some(' ')).take(typed_len))
            .collect();
        let actual: Vec<char> = prefix.chars().chain(raw_value.chars()).collect();

        let mut correct = 0;
        let mut incorrect = 0;
        self.session.error_positions.clear();

        for (i, c) in actual.iter().enumerate() {
            if expected.get(i) == Some(c) {
                correct += 1;
            } else {
                incorrect += 1;
                self.session.error_positions.insert(i);
                self.session.mistyped_positions.insert(i);
            }
        }

        self.stats = Stats::calculate(correct, incorrect, actual.len(), self.session.elapsed_secs);

        let commits = raw_value.ends_with(' ') && raw_value.trim() == current_word;
        if !commits {
            self.session.current_input = raw_value.to_string();
            return Ok(InputOutcome::Pending);
        }

        self.session.current_word_index += 1;
        self.session.current_input.clear();
        trace!("committed word {idx} {current_word:?}");

        if self.session.current_word_index >= self.sample.len() {
            self.complete(false);
            return Ok(InputOutcome::Completed);
        }
        Ok(InputOutcome::Committed)
    }

    /// Abandon whatever is in progress and return to a fresh idle session.
    pub fn reset(&mut self) {
        self.scheduler.disarm();
        self.session = Session::new(self.session.duration_secs);
        self.stats = Stats::default();
        debug!("test reset");
    }

    /// Share of the test duration used so far, 0..=100.
    pub fn progress_percent(&self) -> u32 {
        match self.session.duration_secs {
            0 => 100,
            d => ((self.session.elapsed_secs as f64 / d as f64) * 100.0).round() as u32,
        }
    }

    fn expect_status(&self, operation: &'static str, wanted: Status) -> Result<(), EngineError> {
        if self.session.status == wanted {
            Ok(())
        } else {
            Err(EngineError::InvalidStateTransition {
                operation,
                status: self.session.status,
            })
        }
    }

    fn complete(&mut self, timed_out: bool) {
        self.session.status = Status::Completed;
        self.scheduler.disarm();

        let report = CompletionReport {
            stats: self.stats,
            words_committed: self.session.current_word_index,
            elapsed_secs: self.session.elapsed_secs,
            timed_out,
            mistyped_positions: self.session.mistyped_positions.iter().copied().collect(),
        };
        debug!(
            "test completed ({}): {} wpm, {}% accuracy",
            if timed_out { "timeout" } else { "finished" },
            report.stats.wpm,
            report.stats.accuracy
        );

        if let Some(listener) = self.on_complete.as_mut() {
            listener(&report);
        }
    }
}

impl<S: TickScheduler> Drop for TypingTestEngine<S> {
    fn drop(&mut self) {
        self.scheduler.disarm();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::sync::{Arc, Mutex};

    fn running(source: &str) -> TypingTestEngine {
        let mut engine = TypingTestEngine::new(source);
        engine.start();
        engine
    }

    #[test]
    fn starts_idle_with_default_stats() {
        let engine = TypingTestEngine::new("cat dog");

        assert_eq!(engine.status(), Status::Idle);
        assert_eq!(engine.session().remaining_secs, 60);
        assert_eq!(*engine.stats(), Stats::default());
        assert!(!engine.scheduler().is_armed());
    }

    #[test]
    fn start_arms_scheduler_once() {
        let mut engine = running("cat dog");

        assert_eq!(engine.status(), Status::Running);
        assert!(engine.scheduler().is_armed());

        engine.start();
        assert_eq!(engine.scheduler().arm_count(), 1);
    }

    #[test]
    fn try_start_rejects_running_test() {
        let mut engine = running("cat dog");

        assert_matches!(
            engine.try_start(),
            Err(EngineError::InvalidStateTransition {
                operation: "start",
                status: Status::Running
            })
        );
    }

    #[test]
    fn committing_first_word() {
        let mut engine = running("cat dog");

        let outcome = engine.submit_input("cat ");

        assert_eq!(outcome, InputOutcome::Committed);
        assert_eq!(engine.session().current_word_index, 1);
        assert!(engine.session().current_input.is_empty());
        assert!(engine.session().error_positions.is_empty());
        assert_eq!(engine.stats().correct_chars, 4);
        assert_eq!(engine.stats().total_chars, 4);
    }

    #[test]
    fn mistyped_char_flags_its_offset() {
        let mut engine = running("cat dog");

        let outcome = engine.submit_input("cag ");

        assert_eq!(outcome, InputOutcome::Pending);
        assert_eq!(engine.session().current_word_index, 0);
        assert_eq!(engine.session().current_input, "cag ");
        assert_eq!(
            engine.session().error_positions.iter().copied().collect::<Vec<_>>(),
            vec![2]
        );
        assert_eq!(engine.stats().incorrect_chars, 1);
        assert_eq!(engine.stats().correct_chars, 3);
        assert_eq!(engine.stats().accuracy, 75);
    }

    #[test]
    fn errors_on_second_word_use_absolute_offsets() {
        let mut engine = running("cat dog");
        engine.submit_input("cat ");

        engine.submit_input("dxg");

        assert_eq!(
            engine.session().error_positions.iter().copied().collect::<Vec<_>>(),
            vec![5]
        );
        // "cat " prefix counts again on every comparison
        assert_eq!(engine.stats().correct_chars, 6);
        assert_eq!(engine.stats().total_chars, 7);
    }

    #[test]
    fn overtyping_a_word_flags_extra_chars() {
        let mut engine = running("cat dog");

        engine.submit_input("catss");

        // offset 3 expects the separating space, offset 4 expects nothing
        assert_eq!(
            engine.session().error_positions.iter().copied().collect::<Vec<_>>(),
            vec![3, 4]
        );
        assert_eq!(engine.stats().incorrect_chars, 2);
        assert_eq!(engine.stats().correct_chars, 3);
    }

    #[test]
    fn correcting_clears_error_positions() {
        let mut engine = running("cat dog");

        engine.submit_input("cx");
        assert!(!engine.session().error_positions.is_empty());

        engine.submit_input("c");
        assert!(engine.session().error_positions.is_empty());
        assert!(engine.session().mistyped_positions.contains(&1));
    }

    #[test]
    fn trailing_space_without_match_does_not_commit() {
        let mut engine = running("cat dog");

        assert_eq!(engine.submit_input("ca "), InputOutcome::Pending);
        assert_eq!(engine.session().current_word_index, 0);
    }

    #[test]
    fn repeated_input_is_idempotent() {
        let mut engine = running("cat dog");

        engine.submit_input("cxt");
        let first = engine.snapshot();
        engine.submit_input("cxt");
        let second = engine.snapshot();

        assert_eq!(first, second);
    }

    #[test]
    fn input_ignored_unless_running() {
        let mut engine = TypingTestEngine::new("cat dog");

        assert_eq!(engine.submit_input("cat "), InputOutcome::Ignored);
        assert_matches!(
            engine.try_submit_input("c"),
            Err(EngineError::InvalidStateTransition { status: Status::Idle, .. })
        );
        assert_eq!(engine.session().current_word_index, 0);
        assert_eq!(*engine.stats(), Stats::default());
    }

    #[test]
    fn final_word_completes_test() {
        let mut engine = running("cat dog");
        engine.submit_input("cat ");

        assert_eq!(engine.submit_input("dog "), InputOutcome::Completed);
        assert_eq!(engine.status(), Status::Completed);
        assert_eq!(engine.session().current_word_index, 2);
        assert!(!engine.scheduler().is_armed());
        assert_eq!(engine.stats().accuracy, 100);
        assert!(engine.session().error_positions.is_empty());

        assert_eq!(engine.submit_input("more"), InputOutcome::Ignored);
    }

    #[test]
    fn ticks_count_down_to_completion() {
        let mut engine = TypingTestEngine::new("cat dog").with_duration(3);
        engine.start();
        engine.submit_input("ca");

        engine.tick();
        engine.tick();
        assert_eq!(engine.status(), Status::Running);
        assert_eq!(engine.session().remaining_secs, 1);
        assert_eq!(engine.session().elapsed_secs, 2);

        engine.tick();
        assert_eq!(engine.status(), Status::Completed);
        assert_eq!(engine.session().remaining_secs, 0);
        assert!(!engine.scheduler().is_armed());

        engine.tick();
        assert_eq!(engine.session().remaining_secs, 0);
    }

    #[test]
    fn default_duration_completes_after_sixty_ticks() {
        let mut engine = running("cat dog");

        for _ in 0..59 {
            engine.tick();
        }
        assert_eq!(engine.status(), Status::Running);
        assert_eq!(engine.session().remaining_secs, 1);

        engine.tick();
        assert_eq!(engine.status(), Status::Completed);
        assert_eq!(engine.session().remaining_secs, 0);
        assert_eq!(engine.session().elapsed_secs, 60);
    }

    #[test]
    fn ticks_recompute_wpm_after_typing_stops() {
        let reports = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&reports);

        let mut engine = TypingTestEngine::new("cat dog");
        engine.on_complete(move |r| sink.lock().unwrap().push(r.clone()));
        engine.start();
        engine.submit_input("cat ");
        assert_eq!(engine.stats().wpm, 48);

        engine.tick();
        assert_eq!(engine.stats().wpm, 48);
        for _ in 1..60 {
            engine.tick();
        }

        // 4 chars over a full minute
        assert_eq!(engine.stats().wpm, 1);
        assert_eq!(engine.stats().correct_chars, 4);
        let reports = reports.lock().unwrap();
        assert_eq!(reports.len(), 1);
        assert!(reports[0].timed_out);
        assert_eq!(reports[0].stats.wpm, 1);
        assert_eq!(reports[0].elapsed_secs, 60);
    }

    #[test]
    fn stale_scheduled_tick_is_dropped() {
        let mut engine = running("cat dog");
        let old = engine.scheduler().schedule();

        engine.reset();
        engine.start();
        engine.scheduled_tick(old);
        assert_eq!(engine.session().remaining_secs, 60);

        engine.scheduled_tick(engine.scheduler().schedule());
        assert_eq!(engine.session().remaining_secs, 59);
    }

    #[test]
    fn tick_ignored_while_idle() {
        let mut engine = TypingTestEngine::new("cat dog");

        engine.tick();

        assert_eq!(engine.session().remaining_secs, 60);
        assert_eq!(engine.status(), Status::Idle);
    }

    #[test]
    fn wpm_uses_elapsed_ticks() {
        let mut engine = running("cat dog");
        for _ in 0..30 {
            engine.tick();
        }

        // 4 chars over half a minute
        engine.submit_input("cat ");
        assert_eq!(engine.stats().wpm, 2);
    }

    #[test]
    fn completion_listener_fires_once() {
        let reports = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&reports);

        let mut engine = TypingTestEngine::new("cat").with_duration(2);
        engine.on_complete(move |r| sink.lock().unwrap().push(r.clone()));
        engine.start();
        engine.submit_input("cat ");
        engine.tick();
        engine.tick();
        engine.submit_input("cat ");

        let reports = reports.lock().unwrap();
        assert_eq!(reports.len(), 1);
        assert!(!reports[0].timed_out);
        assert_eq!(reports[0].words_committed, 1);
        assert_eq!(reports[0].stats.correct_chars, 4);
    }

    #[test]
    fn completion_report_keeps_mistyped_positions() {
        let reports = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&reports);

        let mut engine = TypingTestEngine::new("cat dog").with_duration(1);
        engine.on_complete(move |r| sink.lock().unwrap().push(r.clone()));
        engine.start();
        engine.submit_input("cx");
        engine.submit_input("cat ");
        engine.tick();

        let reports = reports.lock().unwrap();
        assert_eq!(reports.len(), 1);
        assert!(reports[0].timed_out);
        assert_eq!(reports[0].mistyped_positions, vec![1]);
    }

    #[test]
    fn reset_from_any_state() {
        let mut engine = running("cat dog");
        engine.submit_input("cag");
        engine.tick();

        engine.reset();

        let snapshot = engine.snapshot();
        assert_eq!(snapshot.session.status, Status::Idle);
        assert_eq!(snapshot.session.current_word_index, 0);
        assert_eq!(snapshot.session.remaining_secs, 60);
        assert!(snapshot.session.error_positions.is_empty());
        assert!(snapshot.session.mistyped_positions.is_empty());
        assert_eq!(snapshot.stats, Stats::default());
        assert!(!engine.scheduler().is_armed());

        engine.submit_input("cat dog ");
        engine.reset();
        assert_eq!(engine.status(), Status::Idle);
    }

    #[test]
    fn reset_after_completion_allows_new_run() {
        let mut engine = running("cat");
        engine.submit_input("cat ");
        assert_eq!(engine.status(), Status::Completed);

        engine.reset();
        engine.start();

        assert_eq!(engine.status(), Status::Running);
        assert_eq!(engine.scheduler().arm_count(), 2);
    }

    #[test]
    fn zero_duration_completes_on_start() {
        let mut engine = TypingTestEngine::new("cat").with_duration(0);

        engine.start();

        assert_eq!(engine.status(), Status::Completed);
        assert_eq!(engine.progress_percent(), 100);
    }

    #[test]
    fn progress_follows_elapsed_time() {
        let mut engine = TypingTestEngine::new("cat").with_duration(4);
        engine.start();
        assert_eq!(engine.progress_percent(), 0);

        engine.tick();
        assert_eq!(engine.progress_percent(), 25);
    }

    #[test]
    fn non_ascii_input_compares_per_char() {
        let mut engine = running("café au");

        assert_eq!(engine.submit_input("café "), InputOutcome::Committed);
        assert_eq!(engine.stats().correct_chars, 5);
    }
}
