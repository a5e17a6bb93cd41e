use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;

use super::registry::InstanceId;

/// Whatever should happen once a question's time is up.
#[async_trait]
pub trait TimeoutHandler: Send + Sync {
    async fn on_timeout(&self, instance_id: InstanceId);
}

/// Deferred timeouts as detached tokio tasks. A fired timer never checks
/// whether the question was answered; the handler does.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeoutScheduler;

impl TimeoutScheduler {
    pub fn new() -> Self {
        Self
    }

    pub fn schedule_timeout(
        &self,
        instance_id: InstanceId,
        delay: Duration,
        on_fire: Arc<dyn TimeoutHandler>,
    ) -> JoinHandle<()> {
        tracing::debug!(%instance_id, ?delay, "timeout scheduled");
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tracing::debug!(%instance_id, "timeout fired");
            on_fire.on_timeout(instance_id).await;
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        fired: Mutex<Vec<InstanceId>>,
    }

    #[async_trait]
    impl TimeoutHandler for Recorder {
        async fn on_timeout(&self, instance_id: InstanceId) {
            self.fired.lock().unwrap().push(instance_id);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fires_once_after_delay() {
        let recorder = Arc::new(Recorder::default());
        let id = InstanceId::new();

        let handle =
            TimeoutScheduler::new().schedule_timeout(id, Duration::from_secs(10), recorder.clone());

        tokio::time::sleep(Duration::from_secs(9)).await;
        assert!(recorder.fired.lock().unwrap().is_empty());

        handle.await.unwrap();
        assert_eq!(*recorder.fired.lock().unwrap(), vec![id]);
    }
}
