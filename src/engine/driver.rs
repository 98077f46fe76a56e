// Real-time driver: runs an overlay on the tokio clock until done or unmounted.

use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::sequencer::{LoadInOverlay, OverlayMode, OverlayView};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverExit {
    /// Sequence (or reduced-motion fade) ran to the end.
    Finished,
    /// Nothing to play this session.
    Skipped,
    /// Cancelled, or the frame receiver went away.
    Unmounted,
}

pub struct OverlayDriver {
    overlay: LoadInOverlay,
    shutdown_token: CancellationToken,
}

impl OverlayDriver {
    pub fn new(overlay: LoadInOverlay) -> Self {
        Self {
            overlay,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Token whose cancellation unmounts the overlay.
    pub fn unmount_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// Mount the overlay and drive it, sending a view every time its phase changes.
    pub async fn run(mut self, frames: mpsc::Sender<OverlayView>) -> (LoadInOverlay, DriverExit) {
        let started = Instant::now();
        self.overlay.mount();
        let mut revision = self.overlay.revision();

        if frames.send(self.overlay.view()).await.is_err() {
            self.overlay.unmount();
            return (self.overlay, DriverExit::Unmounted);
        }

        loop {
            if self.overlay.is_finished() {
                let exit = if self.overlay.mode() == OverlayMode::Skipped {
                    DriverExit::Skipped
                } else {
                    DriverExit::Finished
                };
                return (self.overlay, exit);
            }

            let Some(deadline) = self.overlay.next_deadline() else {
                // Nothing scheduled and not finished: only an unmount can end this.
                self.shutdown_token.cancelled().await;
                self.overlay.unmount();
                return (self.overlay, DriverExit::Unmounted);
            };

            tokio::select! {
                _ = tokio::time::sleep_until(started + deadline) => {
                    self.overlay.advance_to(deadline);
                }
                _ = self.shutdown_token.cancelled() => {
                    debug!("overlay driver cancelled at_ms={}", started.elapsed().as_millis());
                    self.overlay.unmount();
                    return (self.overlay, DriverExit::Unmounted);
                }
            }

            if self.overlay.revision() != revision {
                revision = self.overlay.revision();
                if frames.send(self.overlay.view()).await.is_err() {
                    debug!("overlay frame receiver dropped");
                    self.overlay.unmount();
                    return (self.overlay, DriverExit::Unmounted);
                }
            }
        }
    }
}
