//! Frame scheduling
//!
//! Layout passes are deferred to the next frame. Every trigger replaces the
//! pending request, so any number of triggers between two frames produce a
//! single pass.

use serde::Serialize;

/// Identifies one scheduled layout pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct FrameToken(u64);

#[derive(Debug, Default)]
pub struct FrameScheduler {
    next_token: u64,
    pending: Option<FrameToken>,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules a pass for the next frame, cancelling any pending one
    pub fn request(&mut self) -> FrameToken {
        if let Some(cancelled) = self.pending.take() {
            tracing::trace!(token = cancelled.0, "cancelled pending layout frame");
        }
        let token = FrameToken(self.next_token);
        self.next_token += 1;
        self.pending = Some(token);
        token
    }

    /// Drops the pending request, if any
    pub fn cancel(&mut self) -> Option<FrameToken> {
        self.pending.take()
    }

    /// Consumes the pending request when its frame fires
    pub fn take(&mut self) -> Option<FrameToken> {
        self.pending.take()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

#[cfg(test)]
mod tests;
