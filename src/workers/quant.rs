//! Quantification tick worker.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crate::error::Result;
use crate::quantifier::Quantifier;
use crate::queue::{Queue, Task};
use crate::state::ParamState;

/// Drives external quantifiers for the sample indices it pops and copies
/// their abundance vectors into the corresponding rows of Q.
///
/// Quantifier failures are reported through the notification queue so the
/// coordinator can abort the run at the next barrier.
pub struct QuantWorker<Q: Quantifier> {
    /// The per-sample quantifier handles, shared with the coordinator.
    pub quantifiers: Arc<Vec<Mutex<Q>>>,
    /// Shared parameter block.
    pub state: Arc<ParamState>,
    /// Incoming sample index ranges.
    pub tasks: Arc<Queue<Task>>,
    /// One `Result` per processed range.
    pub notify: Arc<Queue<Result<()>>>,
    /// True while the coordinator is in the optimization phase.
    pub optimize_mode: Arc<AtomicBool>,
}

impl<Q: Quantifier + 'static> QuantWorker<Q> {
    /// Start the worker thread.
    pub fn spawn(self) -> JoinHandle<()> {
        std::thread::spawn(move || self.run())
    }

    fn run(self) {
        loop {
            match self.tasks.pop() {
                Task::Shutdown => break,
                Task::Range(first, last) => {
                    let mut outcome = Ok(());
                    for k in first..last {
                        if let Err(err) = self.tick_one(k) {
                            outcome = Err(err);
                            break;
                        }
                    }
                    self.notify.push(outcome);
                }
            }
        }
    }

    fn tick_one(&self, k: usize) -> Result<()> {
        let mut quantifier = self.quantifiers[k].lock().unwrap();
        if self.optimize_mode.load(Ordering::Relaxed) {
            quantifier.optimize()?;
        } else {
            quantifier.sample()?;
        }

        // SAFETY: sample index k is handed to exactly one worker per
        // quantification fan-out, and no other worker kind touches Q until
        // the coordinator's barrier.
        unsafe {
            self.state.q.set_row(k, quantifier.state());
        }
        Ok(())
    }
}
