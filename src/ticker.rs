//! Timer-driven [`CommandSource`].
//!
//! Emits [`Command::Poll`] every poll interval and [`Command::Sweep`] every
//! sweep interval.  The poll covers focus changes between windows of one
//! application, which the compositor's activation events may not report.

use crate::command::Command;
use crate::traits::CommandSource;
use log::info;
use std::convert::Infallible;
use std::sync::mpsc;
use std::time::{Duration, Instant};

pub struct Ticker {
    poll: Duration,
    sweep: Duration,
}

impl Ticker {
    pub fn new(poll: Duration, sweep: Duration) -> Self {
        Self { poll, sweep }
    }
}

impl CommandSource for Ticker {
    type Error = Infallible;

    /// Tick until the sink is closed.
    fn run(&mut self, sink: mpsc::Sender<Command>) -> Result<(), Infallible> {
        let mut last_sweep = Instant::now();
        loop {
            std::thread::sleep(self.poll);
            if sink.send(Command::Poll).is_err() {
                break;
            }
            if last_sweep.elapsed() >= self.sweep {
                last_sweep = Instant::now();
                if sink.send(Command::Sweep).is_err() {
                    break;
                }
            }
        }
        info!("sink closed, ticker stopping");
        Ok(())
    }
}
