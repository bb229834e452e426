//! Cancellable recurring task driving the past-due refresh.

use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// One firing of the recurring task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick;

/// A running recurring task. Cancelling is idempotent.
pub trait TickHandle: Send {
    fn cancel(&mut self);

    fn is_active(&self) -> bool;
}

pub trait TickScheduler: Send + Sync {
    /// Starts firing every `period`, beginning one period from now.
    fn start(&self, period: Duration) -> Box<dyn TickHandle>;
}

/// Spawns a tokio interval task per start; ticks arrive on the paired receiver.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    tx: UnboundedSender<Tick>,
}

impl TokioScheduler {
    pub fn new() -> (Self, UnboundedReceiver<Tick>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl TickScheduler for TokioScheduler {
    fn start(&self, period: Duration) -> Box<dyn TickHandle> {
        let tx = self.tx.clone();
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // first tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                if tx.send(Tick).is_err() {
                    break;
                }
            }
        });
        Box::new(TokioTickHandle {
            task,
            cancelled: false,
        })
    }
}

struct TokioTickHandle {
    task: JoinHandle<()>,
    cancelled: bool,
}

impl TickHandle for TokioTickHandle {
    fn cancel(&mut self) {
        self.task.abort();
        self.cancelled = true;
    }

    fn is_active(&self) -> bool {
        !self.cancelled && !self.task.is_finished()
    }
}

impl Drop for TokioTickHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
pub(crate) mod recording {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    /// Scheduler that only records starts and cancellations.
    #[derive(Debug, Clone, Default)]
    pub(crate) struct RecordingScheduler {
        handles: Arc<Mutex<Vec<Arc<AtomicBool>>>>,
    }

    impl RecordingScheduler {
        pub(crate) fn started(&self) -> usize {
            self.handles.lock().unwrap().len()
        }

        pub(crate) fn active(&self) -> usize {
            self.handles
                .lock()
                .unwrap()
                .iter()
                .filter(|flag| flag.load(Ordering::SeqCst))
                .count()
        }
    }

    impl TickScheduler for RecordingScheduler {
        fn start(&self, _period: Duration) -> Box<dyn TickHandle> {
            let flag = Arc::new(AtomicBool::new(true));
            self.handles.lock().unwrap().push(flag.clone());
            Box::new(RecordingHandle(flag))
        }
    }

    struct RecordingHandle(Arc<AtomicBool>);

    impl TickHandle for RecordingHandle {
        fn cancel(&mut self) {
            self.0.store(false, Ordering::SeqCst);
        }

        fn is_active(&self) -> bool {
            self.0.load(Ordering::SeqCst)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::timeout;

    #[tokio::test(start_paused = true)]
    async fn ticks_every_period_until_cancelled() {
        let (scheduler, mut ticks) = TokioScheduler::new();
        let mut handle = scheduler.start(Duration::from_secs(30));
        assert!(handle.is_active());

        // nothing fires before the first full period
        assert!(timeout(Duration::from_secs(29), ticks.recv()).await.is_err());
        assert_eq!(
            timeout(Duration::from_secs(2), ticks.recv()).await.unwrap(),
            Some(Tick)
        );
        assert_eq!(
            timeout(Duration::from_secs(31), ticks.recv()).await.unwrap(),
            Some(Tick)
        );

        handle.cancel();
        assert!(!handle.is_active());
        assert!(timeout(Duration::from_secs(120), ticks.recv()).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_handle_stops_the_task() {
        let (scheduler, mut ticks) = TokioScheduler::new();
        drop(scheduler.start(Duration::from_secs(30)));
        assert!(timeout(Duration::from_secs(120), ticks.recv()).await.is_err());
    }
}
