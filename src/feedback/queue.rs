//! Notification queue
//!
//! Cues are rendered one at a time in submission order by a drain task.
//! The task is spawned when a cue arrives on an idle queue and exits once
//! the backlog is empty. Clearing the queue aborts the task, which drops
//! the in-flight render future.

use super::renderer::CueRenderer;
use super::NotificationCue;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::task::{AbortHandle, JoinHandle};

/// Aborts a render task when the drain task is cancelled mid-cue
struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

#[derive(Default)]
struct QueueInner {
    pending: VecDeque<NotificationCue>,
    is_playing: bool,
    /// Bumped on every clear so a stale drain task can tell it was superseded
    generation: u64,
    drain: Option<JoinHandle<()>>,
}

/// Serializes feedback cues so at most one plays at a time
#[derive(Clone)]
pub struct NotificationQueue {
    inner: Arc<Mutex<QueueInner>>,
    renderer: Arc<dyn CueRenderer>,
}

impl NotificationQueue {
    pub fn new(renderer: Arc<dyn CueRenderer>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(QueueInner::default())),
            renderer,
        }
    }

    /// Append a cue and start draining if nothing is playing.
    ///
    /// Must be called from within a tokio runtime.
    pub fn enqueue(&self, cue: NotificationCue) {
        let mut inner = self.inner.lock();
        tracing::debug!("Queueing cue {:?} (backlog {})", cue, inner.pending.len());
        inner.pending.push_back(cue);

        if inner.is_playing {
            return;
        }

        // Dequeue and mark playing under the same lock
        let Some(first) = inner.pending.pop_front() else {
            return;
        };
        inner.is_playing = true;
        let generation = inner.generation;

        let queue = self.clone();
        inner.drain = Some(tokio::spawn(async move {
            queue.drain(first, generation).await;
        }));
    }

    async fn drain(&self, first: NotificationCue, generation: u64) {
        let mut cue = first;
        loop {
            self.render_one(&cue).await;

            let mut inner = self.inner.lock();
            if inner.generation != generation {
                return;
            }
            match inner.pending.pop_front() {
                Some(next) => cue = next,
                None => {
                    inner.is_playing = false;
                    inner.drain = None;
                    return;
                }
            }
        }
    }

    /// Render on a child task so a panicking renderer counts as completion.
    /// The child is aborted if the drain task is.
    async fn render_one(&self, cue: &NotificationCue) {
        let renderer = self.renderer.clone();
        let owned = cue.clone();
        let render = tokio::spawn(async move { renderer.render(&owned).await });
        let _guard = AbortOnDrop(render.abort_handle());

        match render.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!("Failed to render cue {:?}: {}", cue, e),
            Err(e) => tracing::warn!("Render task for cue {:?} failed: {}", cue, e),
        }
    }

    /// Drop the backlog and cancel whatever is rendering.
    ///
    /// The queue stays usable afterwards.
    pub fn clear(&self) {
        let drain = {
            let mut inner = self.inner.lock();
            inner.pending.clear();
            inner.is_playing = false;
            inner.generation += 1;
            inner.drain.take()
        };

        if let Some(drain) = drain {
            drain.abort();
            self.renderer.cancel();
            tracing::debug!("Notification queue cleared, in-flight cue cancelled");
        }
    }

    pub fn is_playing(&self) -> bool {
        self.inner.lock().is_playing
    }

    /// Number of cues waiting behind the one currently playing
    pub fn backlog(&self) -> usize {
        self.inner.lock().pending.len()
    }

    /// True once nothing is playing or waiting
    pub fn is_idle(&self) -> bool {
        let inner = self.inner.lock();
        !inner.is_playing && inner.pending.is_empty()
    }
}
