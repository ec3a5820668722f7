//
// Microstacker - Focus stacking rig control panel
// Copyright (c) 2024 Microstacker contributors
//
// This project is licensed under the terms of the MIT license
// (see the LICENSE file for details).
//

//!
//! One-shot timer delivering its handler on a GLib main context.
//!

use glib::clone;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};

const INFINITY: Duration = Duration::from_secs(9_999_999_999);

/// Message to the waiting thread.
enum Schedule {
    /// Expire at the given time, reporting the given generation.
    At(u64, Instant),
    Cancel
}

struct PendingHandler {
    /// Incremented by every `run_once` and `stop`; expirations of older generations are ignored.
    generation: u64,
    handler: Option<Box<dyn FnOnce() + 'static>>
}

pub struct OneShotTimer {
    sender_main: mpsc::Sender<Schedule>,
    pending: Rc<RefCell<PendingHandler>>
}

impl OneShotTimer {
    /// Creates a timer whose handlers run on the thread-default main context.
    pub fn new() -> OneShotTimer {
        OneShotTimer::with_context(None)
    }

    pub fn with_context(context: Option<&glib::MainContext>) -> OneShotTimer {
        let pending = Rc::new(RefCell::new(PendingHandler{ generation: 0, handler: None }));

        let (sender_timer, receiver_main) = glib::MainContext::channel::<u64>(glib::PRIORITY_DEFAULT);
        receiver_main.attach(context, clone!(@weak pending => @default-return glib::Continue(false), move |generation| {
            let handler = {
                let mut pending = pending.borrow_mut();
                if pending.generation == generation { pending.handler.take() } else { None }
            };
            // the borrow is released here, so the handler may schedule the timer again
            if let Some(handler) = handler { handler(); }
            glib::Continue(true)
        }));

        let (sender_main, receiver_timer) = mpsc::channel::<Schedule>();

        std::thread::spawn(move || {
            let mut target: Option<(u64, Instant)> = None;

            loop {
                let timeout = match &target {
                    Some((_, t)) => t.saturating_duration_since(Instant::now()),
                    None => INFINITY
                };

                match receiver_timer.recv_timeout(timeout) {
                    Ok(Schedule::At(generation, t)) => target = Some((generation, t)),

                    Ok(Schedule::Cancel) => target = None,

                    Err(RecvTimeoutError::Timeout) => if let Some((generation, _)) = target.take() {
                        if sender_timer.send(generation).is_err() { break; }
                    },

                    Err(RecvTimeoutError::Disconnected) => break
                }
            }
        });

        OneShotTimer{ sender_main, pending }
    }

    /// Runs provided `handler` once after `delay`; any previously scheduled run is cancelled.
    pub fn run_once<F: FnOnce() + 'static>(&self, delay: Duration, handler: F) {
        let generation = {
            let mut pending = self.pending.borrow_mut();
            pending.generation += 1;
            pending.handler = Some(Box::new(handler));
            pending.generation
        };
        if self.sender_main.send(Schedule::At(generation, Instant::now() + delay)).is_err() {
            log::error!("timer thread has ended; scheduled action will not run");
        }
    }

    pub fn stop(&self) {
        {
            let mut pending = self.pending.borrow_mut();
            pending.generation += 1;
            pending.handler = None;
        }
        let _ = self.sender_main.send(Schedule::Cancel);
    }

    pub fn is_pending(&self) -> bool {
        self.pending.borrow().handler.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn ms(num_millis: u64) -> Duration {
        Duration::from_millis(num_millis)
    }

    /// Dispatches events of `context` for the specified time.
    fn pump(context: &glib::MainContext, duration: Duration) {
        let t_end = Instant::now() + duration;
        while Instant::now() < t_end {
            while context.iteration(false) {}
            std::thread::sleep(ms(2));
        }
    }

    /// Dispatches events of `context` until `done` returns true or `timeout` passes.
    fn pump_until<F: Fn() -> bool>(context: &glib::MainContext, done: F, timeout: Duration) {
        let t_end = Instant::now() + timeout;
        while !done() && Instant::now() < t_end {
            while context.iteration(false) {}
            std::thread::sleep(ms(2));
        }
    }

    #[test]
    fn given_scheduled_handler_it_runs_once_after_delay() {
        let context = glib::MainContext::new();
        let _guard = context.acquire().unwrap();
        let timer = OneShotTimer::with_context(Some(&context));

        let elapsed = Rc::new(Cell::new(None));
        let tstart = Instant::now();
        timer.run_once(ms(100), clone!(@strong elapsed => move || elapsed.set(Some(tstart.elapsed()))));
        assert!(timer.is_pending());

        pump_until(&context, || elapsed.get().is_some(), ms(5000));
        let fired_after = elapsed.get().unwrap();
        assert!(fired_after >= ms(100));
        assert!(!timer.is_pending());

        // no second run
        elapsed.set(None);
        pump(&context, ms(150));
        assert_eq!(None, elapsed.get());
    }

    #[test]
    fn given_rescheduling_only_newest_handler_runs() {
        let context = glib::MainContext::new();
        let _guard = context.acquire().unwrap();
        let timer = OneShotTimer::with_context(Some(&context));

        let runs = Rc::new(RefCell::new(vec![]));
        timer.run_once(ms(100), clone!(@strong runs => move || runs.borrow_mut().push("first")));
        pump(&context, ms(50));
        timer.run_once(ms(100), clone!(@strong runs => move || runs.borrow_mut().push("second")));

        pump_until(&context, || !runs.borrow().is_empty(), ms(5000));
        pump(&context, ms(150));
        assert_eq!(vec!["second"], *runs.borrow());
    }

    #[test]
    fn given_stopped_timer_handler_does_not_run() {
        let context = glib::MainContext::new();
        let _guard = context.acquire().unwrap();
        let timer = OneShotTimer::with_context(Some(&context));

        let run = Rc::new(Cell::new(false));
        timer.run_once(ms(50), clone!(@strong run => move || run.set(true)));
        timer.stop();

        pump(&context, ms(200));
        assert!(!run.get());
        assert!(!timer.is_pending());
    }

    #[test]
    fn given_handler_scheduling_again_timer_runs_repeatedly() {
        let context = glib::MainContext::new();
        let _guard = context.acquire().unwrap();
        let timer = Rc::new(OneShotTimer::with_context(Some(&context)));
        let counter = Rc::new(Cell::new(0));

        fn schedule(timer: &Rc<OneShotTimer>, counter: &Rc<Cell<usize>>) {
            timer.run_once(ms(20), clone!(@strong timer, @strong counter => move || {
                counter.set(counter.get() + 1);
                if counter.get() < 3 { schedule(&timer, &counter); }
            }));
        }
        schedule(&timer, &counter);

        pump_until(&context, || counter.get() >= 3, ms(5000));
        pump(&context, ms(100));
        assert_eq!(3, counter.get());
    }
}
