use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep, Duration};

use super::request::{Request as RoomReq, TimerType};

/// A single restartable deadline that reports back through the room queue.
///
/// Every arm or stop bumps the epoch; a fire carrying an older epoch was
/// already superseded and must be ignored even if it slipped into the
/// queue before the stop.
#[derive(Debug, Default)]
pub struct PhaseTimer {
    epoch: u64,
    kind: Option<TimerType>,
    stopper: Option<oneshot::Sender<()>>,
}

impl PhaseTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&mut self, kind: TimerType, after: Duration, loopback: mpsc::Sender<RoomReq>) {
        self.stop();
        let (stopper, stopped) = oneshot::channel::<()>();
        let epoch = self.epoch;
        tokio::spawn(async move {
            tokio::select! {
                _ = sleep(after) => {
                    loopback.send(RoomReq::Timer { kind, epoch }).await.unwrap_or_default();
                }
                _ = stopped => {}
            }
        });
        self.kind = Some(kind);
        self.stopper = Some(stopper);
    }

    pub fn stop(&mut self) {
        if let Some(stopper) = self.stopper.take() {
            stopper.send(()).unwrap_or_default();
        }
        self.kind = None;
        self.epoch = self.epoch.wrapping_add(1);
    }

    /// Consumes a fire: true only for the live deadline of `kind`.
    pub fn fire(&mut self, kind: TimerType, epoch: u64) -> bool {
        if self.kind == Some(kind) && self.epoch == epoch {
            self.stopper = None;
            self.kind = None;
            self.epoch = self.epoch.wrapping_add(1);
            true
        } else {
            false
        }
    }

    pub fn is_armed(&self) -> bool {
        self.kind.is_some()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn next_fire(rx: &mut mpsc::Receiver<RoomReq>) -> (TimerType, u64) {
        match rx.recv().await {
            Some(RoomReq::Timer { kind, epoch }) => (kind, epoch),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fires_once_after_deadline() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut timer = PhaseTimer::new();
        timer.arm(TimerType::Odai, Duration::from_secs(63), tx);
        assert!(timer.is_armed());

        let (kind, epoch) = next_fire(&mut rx).await;
        assert_eq!(kind, TimerType::Odai);
        assert!(timer.fire(kind, epoch));
        assert!(!timer.is_armed());
        assert!(!timer.fire(kind, epoch));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_pending_fire() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut timer = PhaseTimer::new();
        timer.arm(TimerType::Draw, Duration::from_secs(5), tx);
        timer.stop();
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn rearm_makes_old_epoch_stale() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut timer = PhaseTimer::new();
        timer.arm(TimerType::Draw, Duration::from_secs(1), tx.clone());
        let (kind, stale) = next_fire(&mut rx).await;

        // the fire is still queued when the room moves on and re-arms
        timer.arm(TimerType::Draw, Duration::from_secs(60), tx);
        assert!(!timer.fire(kind, stale));
        assert!(timer.is_armed());
    }

    #[test]
    fn wrong_kind_is_ignored() {
        let mut timer = PhaseTimer::new();
        assert!(!timer.fire(TimerType::Answer, 0));
    }
}
