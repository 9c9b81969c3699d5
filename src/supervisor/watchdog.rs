//! Idle watchdog: the single consumer of both drainer queues.
//!
//! Liveness is judged from the diagnostic stream alone. Subagent CLIs emit
//! progress notices on stderr while holding stdout silent for long
//! stretches, so only a stderr chunk resets the activity clock.
//!
//! Each iteration:
//! 1. waits up to `poll_interval` for output-queue items (once output has
//!    ended the bounded wait moves to the diagnostic queue, so the loop
//!    never spins);
//! 2. takes whatever is already queued on the diagnostic stream, resetting
//!    the activity clock if any chunk arrived;
//! 3. returns when both streams have delivered their end-of-stream marker;
//! 4. otherwise terminates the child once the diagnostic stream has been
//!    silent for longer than `idle_timeout`.
//!
//! Process exit is not a loop-termination signal. Only end-of-stream is,
//! so pipe contents buffered at exit are still drained.

use super::clock::Clock;
use super::drainer::{StreamBuffer, StreamEvent};
use std::io;
use std::sync::mpsc::{Receiver, RecvTimeoutError, TryRecvError};
use std::time::{Duration, Instant};

/// Something the watchdog can forcibly stop.
pub trait Terminate {
    fn terminate(&mut self) -> io::Result<()>;
}

/// Idle-timeout policy for one supervised child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Watchdog {
    idle_timeout: Duration,
    poll_interval: Duration,
}

/// What the watchdog observed before returning.
#[derive(Debug, Default)]
pub struct WatchOutcome {
    pub stdout: StreamBuffer,
    pub stderr: StreamBuffer,
    /// Set when the child was terminated for diagnostic-stream inactivity.
    pub timed_out: bool,
}

impl Watchdog {
    pub fn new(idle_timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            idle_timeout,
            poll_interval,
        }
    }

    /// Consume both queues until natural completion or idle timeout.
    ///
    /// `target` is only touched on timeout. A failure to terminate it is
    /// logged; the run is still reported as timed out.
    pub fn watch<C, T>(
        &self,
        stdout: &Receiver<StreamEvent>,
        stderr: &Receiver<StreamEvent>,
        clock: &C,
        target: &mut T,
    ) -> WatchOutcome
    where
        C: Clock + ?Sized,
        T: Terminate + ?Sized,
    {
        let mut outcome = WatchOutcome::default();
        let mut last_activity = clock.now();

        loop {
            if !outcome.stdout.is_complete() {
                wait_and_drain(stdout, &mut outcome.stdout, self.poll_interval);
            }

            let saw_diagnostic = if outcome.stderr.is_complete() {
                false
            } else if outcome.stdout.is_complete() {
                wait_and_drain(stderr, &mut outcome.stderr, self.poll_interval)
            } else {
                drain_ready(stderr, &mut outcome.stderr)
            };

            if saw_diagnostic {
                last_activity = clock.now();
            }

            if outcome.stdout.is_complete() && outcome.stderr.is_complete() {
                tracing::debug!(
                    stdout_bytes = outcome.stdout.len(),
                    stderr_bytes = outcome.stderr.len(),
                    "both streams reached end of stream"
                );
                break;
            }

            if self.idle_expired(clock.now(), last_activity) {
                tracing::warn!(
                    idle_timeout_secs = self.idle_timeout.as_secs(),
                    "no diagnostic output within idle timeout, terminating child"
                );
                if let Err(e) = target.terminate() {
                    tracing::warn!(error = %e, "failed to terminate child");
                }
                outcome.timed_out = true;
                break;
            }
        }

        outcome
    }

    fn idle_expired(&self, now: Instant, last_activity: Instant) -> bool {
        now.saturating_duration_since(last_activity) > self.idle_timeout
    }
}

/// Wait up to `timeout` for the first item, then take everything already
/// queued. Returns whether any chunk arrived.
fn wait_and_drain(queue: &Receiver<StreamEvent>, buffer: &mut StreamBuffer, timeout: Duration) -> bool {
    match queue.recv_timeout(timeout) {
        Ok(event) => {
            let first = accept(event, buffer);
            drain_ready(queue, buffer) || first
        }
        Err(RecvTimeoutError::Timeout) => false,
        Err(RecvTimeoutError::Disconnected) => {
            buffer.mark_complete();
            false
        }
    }
}

/// Take everything already queued without blocking. Returns whether any
/// chunk arrived.
fn drain_ready(queue: &Receiver<StreamEvent>, buffer: &mut StreamBuffer) -> bool {
    let mut saw_chunk = false;
    while !buffer.is_complete() {
        match queue.try_recv() {
            Ok(event) => saw_chunk |= accept(event, buffer),
            Err(TryRecvError::Empty) => break,
            // A drainer that vanished without its marker has ended all the same.
            Err(TryRecvError::Disconnected) => buffer.mark_complete(),
        }
    }
    saw_chunk
}

fn accept(event: StreamEvent, buffer: &mut StreamBuffer) -> bool {
    match event {
        StreamEvent::Chunk(chunk) => {
            buffer.push(chunk);
            true
        }
        StreamEvent::Eof => {
            buffer.mark_complete();
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::supervisor::clock::{ManualClock, SystemClock};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc::{self, Sender};
    use std::thread;

    /// Counts terminate calls.
    #[derive(Clone, Default)]
    struct Probe {
        calls: Arc<AtomicUsize>,
    }

    impl Probe {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Terminate for Probe {
        fn terminate(&mut self) -> io::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn chunk(text: &str) -> StreamEvent {
        StreamEvent::Chunk(text.as_bytes().to_vec())
    }

    fn queues() -> (
        (Sender<StreamEvent>, Receiver<StreamEvent>),
        (Sender<StreamEvent>, Receiver<StreamEvent>),
    ) {
        (mpsc::channel(), mpsc::channel())
    }

    /// Let the watchdog thread run a few iterations.
    fn settle() {
        thread::sleep(Duration::from_millis(100));
    }

    fn spawn_watch(
        watchdog: Watchdog,
        stdout: Receiver<StreamEvent>,
        stderr: Receiver<StreamEvent>,
        clock: Arc<ManualClock>,
        probe: Probe,
    ) -> thread::JoinHandle<WatchOutcome> {
        let handle = thread::spawn(move || {
            let mut probe = probe;
            watchdog.watch(&stdout, &stderr, &*clock, &mut probe)
        });
        // The watchdog reads its starting time on entry; advancing the
        // clock before that would shift the baseline.
        settle();
        handle
    }

    #[test]
    fn natural_completion_collects_both_streams() {
        let ((out_tx, out_rx), (err_tx, err_rx)) = queues();
        out_tx.send(chunk("result ")).unwrap();
        out_tx.send(chunk("text")).unwrap();
        out_tx.send(StreamEvent::Eof).unwrap();
        err_tx.send(chunk("progress")).unwrap();
        err_tx.send(StreamEvent::Eof).unwrap();

        let watchdog = Watchdog::new(Duration::from_secs(60), Duration::from_millis(5));
        let mut probe = Probe::default();
        let outcome = watchdog.watch(&out_rx, &err_rx, &SystemClock, &mut probe);

        assert!(!outcome.timed_out);
        assert_eq!(probe.calls(), 0);
        assert_eq!(outcome.stdout.to_text_lossy(), "result text");
        assert_eq!(outcome.stderr.to_text_lossy(), "progress");
        assert!(outcome.stdout.is_complete());
        assert!(outcome.stderr.is_complete());
    }

    #[test]
    fn stream_end_order_does_not_matter() {
        for stderr_first in [true, false] {
            let ((out_tx, out_rx), (err_tx, err_rx)) = queues();
            let watchdog = Watchdog::new(Duration::from_secs(60), Duration::from_millis(5));
            let handle = thread::spawn(move || {
                let mut probe = Probe::default();
                watchdog.watch(&out_rx, &err_rx, &SystemClock, &mut probe)
            });

            if stderr_first {
                err_tx.send(StreamEvent::Eof).unwrap();
                settle();
                out_tx.send(chunk("late output")).unwrap();
                out_tx.send(StreamEvent::Eof).unwrap();
            } else {
                out_tx.send(StreamEvent::Eof).unwrap();
                settle();
                err_tx.send(chunk("late diagnostics")).unwrap();
                err_tx.send(StreamEvent::Eof).unwrap();
            }

            let outcome = handle.join().unwrap();
            assert!(!outcome.timed_out);
            assert_eq!(outcome.stdout.is_empty(), !stderr_first);
            assert_eq!(outcome.stderr.is_empty(), stderr_first);
        }
    }

    #[test]
    fn diagnostic_chunk_resets_idle_clock() {
        let ((out_tx, out_rx), (err_tx, err_rx)) = queues();
        let clock = Arc::new(ManualClock::new());
        let probe = Probe::default();
        let watchdog = Watchdog::new(Duration::from_secs(10), Duration::from_millis(5));
        let handle = spawn_watch(watchdog, out_rx, err_rx, clock.clone(), probe.clone());

        clock.advance(Duration::from_secs(8));
        err_tx.send(chunk("still working")).unwrap();
        settle();
        clock.advance(Duration::from_secs(8));
        settle();
        assert_eq!(probe.calls(), 0, "16s total but only 8s since last diagnostic");

        out_tx.send(StreamEvent::Eof).unwrap();
        err_tx.send(StreamEvent::Eof).unwrap();
        let outcome = handle.join().unwrap();
        assert!(!outcome.timed_out);
        assert_eq!(probe.calls(), 0);
    }

    #[test]
    fn output_activity_never_prevents_timeout() {
        let ((out_tx, out_rx), (_err_tx, err_rx)) = queues();
        let clock = Arc::new(ManualClock::new());
        let probe = Probe::default();
        let watchdog = Watchdog::new(Duration::from_secs(10), Duration::from_millis(5));
        let handle = spawn_watch(watchdog, out_rx, err_rx, clock.clone(), probe.clone());

        clock.advance(Duration::from_secs(8));
        out_tx.send(chunk("busy on stdout")).unwrap();
        settle();
        clock.advance(Duration::from_secs(8));

        let outcome = handle.join().unwrap();
        assert!(outcome.timed_out);
        assert_eq!(probe.calls(), 1);
        assert_eq!(outcome.stdout.to_text_lossy(), "busy on stdout");
        assert!(!outcome.stdout.is_complete());
    }

    #[test]
    fn idle_timeout_is_strictly_greater_than() {
        let ((_out_tx, out_rx), (_err_tx, err_rx)) = queues();
        let clock = Arc::new(ManualClock::new());
        let probe = Probe::default();
        let watchdog = Watchdog::new(Duration::from_secs(10), Duration::from_millis(5));
        let handle = spawn_watch(watchdog, out_rx, err_rx, clock.clone(), probe.clone());

        clock.advance(Duration::from_secs(10));
        settle();
        assert_eq!(probe.calls(), 0);

        clock.advance(Duration::from_millis(1));
        let outcome = handle.join().unwrap();
        assert!(outcome.timed_out);
    }

    #[test]
    fn silent_child_is_terminated_within_timeout_plus_poll() {
        let ((_out_tx, out_rx), (_err_tx, err_rx)) = queues();
        let idle = Duration::from_millis(300);
        let poll = Duration::from_millis(50);
        let watchdog = Watchdog::new(idle, poll);
        let mut probe = Probe::default();

        let start = Instant::now();
        let outcome = watchdog.watch(&out_rx, &err_rx, &SystemClock, &mut probe);
        let elapsed = start.elapsed();

        assert!(outcome.timed_out);
        assert_eq!(probe.calls(), 1);
        assert!(elapsed > idle, "returned early after {:?}", elapsed);
        // One poll interval of allowance plus scheduling slack.
        assert!(elapsed < idle + poll + Duration::from_millis(200), "took {:?}", elapsed);
    }

    #[test]
    fn finished_diagnostics_with_stalled_output_still_terminates() {
        let ((_out_tx, out_rx), (err_tx, err_rx)) = queues();
        err_tx.send(chunk("done talking")).unwrap();
        err_tx.send(StreamEvent::Eof).unwrap();

        let watchdog = Watchdog::new(Duration::from_millis(100), Duration::from_millis(10));
        let mut probe = Probe::default();
        let outcome = watchdog.watch(&out_rx, &err_rx, &SystemClock, &mut probe);

        assert!(outcome.timed_out);
        assert!(outcome.stderr.is_complete());
        assert_eq!(probe.calls(), 1);
    }

    #[test]
    fn finished_output_with_chatty_diagnostics_completes() {
        let ((out_tx, out_rx), (err_tx, err_rx)) = queues();
        out_tx.send(StreamEvent::Eof).unwrap();

        let feeder = thread::spawn(move || {
            for i in 0..20 {
                err_tx.send(chunk(&format!("tick {}\n", i))).unwrap();
                thread::sleep(Duration::from_millis(10));
            }
            err_tx.send(StreamEvent::Eof).unwrap();
        });

        let watchdog = Watchdog::new(Duration::from_secs(5), Duration::from_millis(10));
        let mut probe = Probe::default();
        let outcome = watchdog.watch(&out_rx, &err_rx, &SystemClock, &mut probe);
        feeder.join().unwrap();

        assert!(!outcome.timed_out);
        assert_eq!(outcome.stderr.chunk_count(), 20);
        assert!(outcome.stderr.to_text_lossy().ends_with("tick 19\n"));
    }

    #[test]
    fn vanished_drainers_count_as_ended() {
        let ((out_tx, out_rx), (err_tx, err_rx)) = queues();
        out_tx.send(chunk("partial")).unwrap();
        drop(out_tx);
        drop(err_tx);

        let watchdog = Watchdog::new(Duration::from_secs(60), Duration::from_millis(5));
        let mut probe = Probe::default();
        let outcome = watchdog.watch(&out_rx, &err_rx, &SystemClock, &mut probe);

        assert!(!outcome.timed_out);
        assert_eq!(outcome.stdout.to_text_lossy(), "partial");
    }

    #[test]
    fn terminate_failure_still_reports_timeout() {
        struct Stubborn;
        impl Terminate for Stubborn {
            fn terminate(&mut self) -> io::Result<()> {
                Err(io::Error::new(io::ErrorKind::PermissionDenied, "no"))
            }
        }

        let ((_out_tx, out_rx), (_err_tx, err_rx)) = queues();
        let watchdog = Watchdog::new(Duration::from_millis(20), Duration::from_millis(5));
        let outcome = watchdog.watch(&out_rx, &err_rx, &SystemClock, &mut Stubborn);
        assert!(outcome.timed_out);
    }
}
