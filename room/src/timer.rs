//! Cancellable, extendable per-phase countdown.
//!
//! Each activation spawns one task that ticks once per second into the
//! room's request channel and fires exactly one expiry when it reaches
//! zero. Events carry the activation epoch so a tick or expiry that was
//! already queued when the run was stopped or superseded is ignored by the
//! room instead of advancing a phase it no longer belongs to.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Duration};

use crate::room::{RoomReq, TimerKind};

enum Ctrl {
    Extend(u32),
}

pub struct Countdown {
    kind: TimerKind,
    events: mpsc::Sender<RoomReq>,
    epoch: u64,
    running: Option<Running>,
}

struct Running {
    ctrl: mpsc::UnboundedSender<Ctrl>,
    task: JoinHandle<()>,
}

impl Countdown {
    pub fn new(kind: TimerKind, events: mpsc::Sender<RoomReq>) -> Self {
        Self {
            kind,
            events,
            epoch: 0,
            running: None,
        }
    }

    /// Epoch of the latest activation. Events stamped with anything older
    /// are stale.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn is_active(&self) -> bool {
        self.running
            .as_ref()
            .map_or(false, |running| !running.task.is_finished())
    }

    /// Arms a fresh run, superseding any previous one. The first tick
    /// (carrying the full duration) is emitted immediately.
    pub fn start(&mut self, duration_secs: u32) {
        self.stop();
        self.epoch += 1;

        let (ctrl_tx, mut ctrl_rx) = mpsc::unbounded_channel();
        let events = self.events.clone();
        let kind = self.kind;
        let epoch = self.epoch;

        let task = tokio::spawn(async move {
            let mut remaining = duration_secs;
            while remaining > 0 {
                if events
                    .send(RoomReq::Tick {
                        kind,
                        epoch,
                        remaining,
                    })
                    .await
                    .is_err()
                {
                    return;
                }
                let second = time::sleep(Duration::from_secs(1));
                tokio::pin!(second);
                // an extension must not disturb the second already in flight
                loop {
                    tokio::select! {
                        () = &mut second => break,
                        ctrl = ctrl_rx.recv() => match ctrl {
                            Some(Ctrl::Extend(secs)) => remaining += secs,
                            None => return,
                        },
                    }
                }
                remaining -= 1;
            }
            let _ = events.send(RoomReq::Expired { kind, epoch }).await;
        });

        self.running = Some(Running {
            ctrl: ctrl_tx,
            task,
        });
    }

    /// Deactivates without firing expiry. Idempotent. Bumps the epoch so
    /// events already queued from the aborted run are dropped by the room.
    pub fn stop(&mut self) {
        if let Some(running) = self.running.take() {
            running.task.abort();
            self.epoch += 1;
        }
    }

    /// Extends the remaining time of the active run; no-op otherwise.
    pub fn add_time(&mut self, secs: u32) {
        if let Some(running) = &self.running {
            if !running.task.is_finished() {
                let _ = running.ctrl.send(Ctrl::Extend(secs));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn countdown(capacity: usize) -> (Countdown, mpsc::Receiver<RoomReq>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Countdown::new(TimerKind::Draw, tx), rx)
    }

    async fn next_event(rx: &mut mpsc::Receiver<RoomReq>) -> RoomReq {
        rx.recv().await.expect("timer task dropped its channel")
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_down_then_expires_once() {
        let (mut timer, mut rx) = countdown(16);
        timer.start(3);

        for expected in (1..=3).rev() {
            match next_event(&mut rx).await {
                RoomReq::Tick { remaining, .. } => assert_eq!(remaining, expected),
                other => panic!("expected a tick, got {other:?}"),
            }
        }
        assert!(matches!(next_event(&mut rx).await, RoomReq::Expired { .. }));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn add_time_yields_duration_plus_extension_ticks() {
        // capacity 1 keeps the task in lock-step with the test, so the
        // extension always lands before the run can expire
        let (mut timer, mut rx) = countdown(1);
        timer.start(4);

        assert!(matches!(
            next_event(&mut rx).await,
            RoomReq::Tick { remaining: 4, .. }
        ));
        timer.add_time(3);

        let mut ticks = 1;
        loop {
            match next_event(&mut rx).await {
                RoomReq::Tick { .. } => ticks += 1,
                RoomReq::Expired { .. } => break,
                other => panic!("unexpected event {other:?}"),
            }
        }
        assert_eq!(ticks, 4 + 3);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_prevents_expiry() {
        let (mut timer, mut rx) = countdown(16);
        timer.start(2);
        assert!(matches!(next_event(&mut rx).await, RoomReq::Tick { .. }));

        timer.stop();
        assert!(!timer.is_active());

        // give an erroneous survivor every chance to fire
        time::sleep(Duration::from_secs(10)).await;
        while let Ok(event) = rx.try_recv() {
            assert!(
                !matches!(event, RoomReq::Expired { .. }),
                "stopped timer must not expire"
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn restart_supersedes_the_previous_run() {
        let (mut timer, mut rx) = countdown(16);
        timer.start(5);
        let first_epoch = timer.epoch();
        assert!(matches!(next_event(&mut rx).await, RoomReq::Tick { .. }));

        timer.start(2);
        let second_epoch = timer.epoch();
        assert!(second_epoch > first_epoch);

        loop {
            match next_event(&mut rx).await {
                RoomReq::Expired { epoch, .. } => {
                    assert_eq!(epoch, second_epoch);
                    break;
                }
                RoomReq::Tick { epoch, .. } => assert_ne!(
                    epoch, first_epoch,
                    "superseded run kept ticking after restart"
                ),
                other => panic!("unexpected event {other:?}"),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn add_time_after_stop_is_a_no_op() {
        let (mut timer, mut rx) = countdown(16);
        timer.start(1);
        timer.stop();
        timer.add_time(30);

        time::sleep(Duration::from_secs(5)).await;
        while let Ok(event) = rx.try_recv() {
            assert!(!matches!(event, RoomReq::Expired { .. }));
        }
    }
}
