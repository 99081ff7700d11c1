//! Bounded background delivery of category events.

use super::{CategoryEvent, CategoryNotifier};
use log::{error, warn};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

const WORKER_THREAD_NAME: &str = "boardcat-notify";

/// Queue in front of a [`CategoryNotifier`], drained by one worker thread.
///
/// `dispatch` never blocks: a full queue drops the event. Dropping the
/// dispatcher closes the queue and waits for already-queued events.
pub struct NotificationDispatcher {
    sender: Option<SyncSender<CategoryEvent>>,
    worker: Option<JoinHandle<()>>,
}

impl NotificationDispatcher {
    /// Starts the worker thread. `capacity` of `0` is treated as `1`.
    pub fn start(notifier: Arc<dyn CategoryNotifier>, capacity: usize) -> Self {
        let (sender, receiver) = mpsc::sync_channel(capacity.max(1));
        let worker = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || run_worker(receiver, notifier));

        match worker {
            Ok(handle) => Self {
                sender: Some(sender),
                worker: Some(handle),
            },
            Err(err) => {
                error!(
                    "event=notify_start module=notify status=error error_code=worker_spawn_failed error={err}"
                );
                // Without a worker every dispatch is dropped.
                Self {
                    sender: None,
                    worker: None,
                }
            }
        }
    }

    /// Enqueues one event without waiting for delivery.
    ///
    /// Returns `false` when the event was dropped.
    pub fn dispatch(&self, event: CategoryEvent) -> bool {
        let Some(sender) = self.sender.as_ref() else {
            warn!(
                "event=notify_dispatch module=notify status=dropped reason=no_worker kind={}",
                event.name()
            );
            return false;
        };

        match sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                warn!(
                    "event=notify_dispatch module=notify status=dropped reason=queue_full kind={}",
                    event.name()
                );
                false
            }
            Err(TrySendError::Disconnected(event)) => {
                error!(
                    "event=notify_dispatch module=notify status=dropped reason=worker_gone kind={}",
                    event.name()
                );
                false
            }
        }
    }
}

impl Drop for NotificationDispatcher {
    fn drop(&mut self) {
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("event=notify_shutdown module=notify status=error error_code=worker_panicked");
            }
        }
    }
}

fn run_worker(receiver: Receiver<CategoryEvent>, notifier: Arc<dyn CategoryNotifier>) {
    while let Ok(event) = receiver.recv() {
        let outcome = catch_unwind(AssertUnwindSafe(|| event.deliver(notifier.as_ref())));
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(err)) => warn!(
                "event=notify_deliver module=notify status=error kind={} error={err}",
                event.name()
            ),
            Err(_) => error!(
                "event=notify_deliver module=notify status=error kind={} error_code=notifier_panicked",
                event.name()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::NotificationDispatcher;
    use crate::model::category::{Category, CategoryId};
    use crate::notify::{CategoryEvent, CategoryNotifier, NotifyError};
    use std::sync::{Arc, Barrier, Mutex};

    #[derive(Default)]
    struct Recorder {
        names: Mutex<Vec<&'static str>>,
        fail: bool,
    }

    impl CategoryNotifier for Recorder {
        fn broadcast_category_change(&self, _category: &Category) -> Result<(), NotifyError> {
            self.names.lock().unwrap().push("change");
            if self.fail {
                return Err(NotifyError("socket closed".to_string()));
            }
            Ok(())
        }

        fn broadcast_category_reorder(
            &self,
            _team_id: &str,
            _user_id: &str,
            _order: &[CategoryId],
        ) -> Result<(), NotifyError> {
            self.names.lock().unwrap().push("reorder");
            Ok(())
        }

        fn broadcast_category_boards_change(
            &self,
            _team_id: &str,
            _user_id: &str,
            _category_id: CategoryId,
            _board_ids: &[String],
        ) -> Result<(), NotifyError> {
            panic!("sink bug");
        }
    }

    /// Blocks inside delivery until the test releases the barrier.
    struct Gate {
        entered: Barrier,
        release: Barrier,
    }

    impl CategoryNotifier for Gate {
        fn broadcast_category_change(&self, _category: &Category) -> Result<(), NotifyError> {
            self.entered.wait();
            self.release.wait();
            Ok(())
        }

        fn broadcast_category_reorder(
            &self,
            _team_id: &str,
            _user_id: &str,
            _order: &[CategoryId],
        ) -> Result<(), NotifyError> {
            Ok(())
        }

        fn broadcast_category_boards_change(
            &self,
            _team_id: &str,
            _user_id: &str,
            _category_id: CategoryId,
            _board_ids: &[String],
        ) -> Result<(), NotifyError> {
            Ok(())
        }
    }

    fn changed() -> CategoryEvent {
        let mut category = Category::new("user1", "team1", "Work");
        category.hydrate(1);
        CategoryEvent::Changed(category)
    }

    fn reordered() -> CategoryEvent {
        CategoryEvent::Reordered {
            team_id: "team1".to_string(),
            user_id: "user1".to_string(),
            order: Vec::new(),
        }
    }

    #[test]
    fn drop_drains_queued_events_in_order() {
        let recorder = Arc::new(Recorder::default());
        let dispatcher = NotificationDispatcher::start(recorder.clone(), 8);
        assert!(dispatcher.dispatch(changed()));
        assert!(dispatcher.dispatch(reordered()));
        drop(dispatcher);

        assert_eq!(*recorder.names.lock().unwrap(), vec!["change", "reorder"]);
    }

    #[test]
    fn sink_errors_and_panics_do_not_stop_the_worker() {
        let recorder = Arc::new(Recorder {
            fail: true,
            ..Recorder::default()
        });
        let dispatcher = NotificationDispatcher::start(recorder.clone(), 8);
        dispatcher.dispatch(changed());
        dispatcher.dispatch(CategoryEvent::BoardsChanged {
            team_id: "team1".to_string(),
            user_id: "user1".to_string(),
            category_id: CategoryId::new_v4(),
            board_ids: vec!["board1".to_string()],
        });
        dispatcher.dispatch(reordered());
        drop(dispatcher);

        assert_eq!(*recorder.names.lock().unwrap(), vec!["change", "reorder"]);
    }

    #[test]
    fn full_queue_drops_instead_of_blocking() {
        let gate = Arc::new(Gate {
            entered: Barrier::new(2),
            release: Barrier::new(2),
        });
        let dispatcher = NotificationDispatcher::start(gate.clone(), 1);

        assert!(dispatcher.dispatch(changed()));
        // Worker now holds the first event; the queue has one free slot.
        gate.entered.wait();
        assert!(dispatcher.dispatch(reordered()));
        assert!(!dispatcher.dispatch(reordered()));

        gate.release.wait();
        drop(dispatcher);
    }
}
