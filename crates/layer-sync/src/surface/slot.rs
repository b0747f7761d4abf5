//! Deferred access to a surface that attaches after its users exist.

use std::sync::Arc;

use map_common::{MapError, MapResult};
use tokio::sync::watch;
use tracing::debug;

use super::SurfaceHandle;

/// A slot the map container fills once the surface has loaded.
///
/// Readiness is level-triggered: waiting on a slot that is already filled
/// resolves immediately.
#[derive(Clone)]
pub struct SurfaceSlot {
    tx: Arc<watch::Sender<Option<SurfaceHandle>>>,
    rx: watch::Receiver<Option<SurfaceHandle>>,
}

impl SurfaceSlot {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(None);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    /// Fill the slot and wake every waiter.
    pub fn attach(&self, surface: SurfaceHandle) {
        debug!("Surface attached");
        self.tx.send_replace(Some(surface));
    }

    pub fn is_ready(&self) -> bool {
        self.rx.borrow().is_some()
    }

    /// Wait until the surface is attached.
    pub async fn ready(&self) -> MapResult<SurfaceHandle> {
        let mut rx = self.rx.clone();
        let attached = rx
            .wait_for(|surface| surface.is_some())
            .await
            .map_err(|_| MapError::SurfaceDetached)?;
        (*attached).clone().ok_or(MapError::SurfaceDetached)
    }
}

impl Default for SurfaceSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SurfaceSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurfaceSlot")
            .field("ready", &self.is_ready())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::InMemorySurface;
    use std::time::Duration;
    use tokio::sync::Mutex;

    fn handle() -> SurfaceHandle {
        Arc::new(Mutex::new(InMemorySurface::new()))
    }

    #[tokio::test]
    async fn test_ready_resolves_immediately_when_attached() {
        let slot = SurfaceSlot::new();
        slot.attach(handle());
        assert!(slot.is_ready());

        let ready = tokio::time::timeout(Duration::from_millis(100), slot.ready()).await;
        assert!(ready.is_ok());
    }

    #[tokio::test]
    async fn test_ready_waits_for_attach() {
        let slot = SurfaceSlot::new();
        let waiter = {
            let slot = slot.clone();
            tokio::spawn(async move { slot.ready().await.is_ok() })
        };

        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        slot.attach(handle());
        assert!(waiter.await.unwrap());
    }
}
