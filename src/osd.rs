//! On-screen messages, shown on top of the emulator until they expire.

use crate::host::Notifier;
use parking_lot::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq)]
pub struct OsdMessage {
    pub text: String,
    /// Packed as `0xRRGGBB`.
    pub color: u32,
    pub priority: i32,
    pub is_warning: bool,
    pub id: Option<String>,
    pub expires_at: Instant,
}

impl OsdMessage {
    pub fn rgb(&self) -> [u8; 3] {
        let [_, r, g, b] = self.color.to_be_bytes();
        [r, g, b]
    }
}

#[derive(Debug, Default)]
pub struct OnScreenMessages {
    messages: Mutex<Vec<OsdMessage>>,
}

impl OnScreenMessages {
    /// Messages never stay up for longer than this.
    pub const LONGEST: Duration = Duration::from_secs(24 * 60 * 60);

    pub fn new() -> Self {
        Self::default()
    }

    #[allow(clippy::too_many_arguments)]
    fn show_at(
        &self,
        now: Instant,
        message: &str,
        duration: f32,
        color: u32,
        priority: i32,
        is_warning: bool,
        id: Option<&str>,
    ) {
        let lifetime = Duration::try_from_secs_f32(duration.max(0.0))
            .map_or(Self::LONGEST, |lifetime| lifetime.min(Self::LONGEST));
        let message = OsdMessage {
            text: message.to_string(),
            color,
            priority,
            is_warning,
            id: id.map(str::to_string),
            expires_at: now.checked_add(lifetime).unwrap_or(now),
        };

        let mut messages = self.messages.lock();
        if let Some(id) = id {
            messages.retain(|existing| existing.id.as_deref() != Some(id));
        }
        messages.push(message);
    }

    fn active_at(&self, now: Instant) -> Vec<OsdMessage> {
        let mut messages = self.messages.lock();
        messages.retain(|message| message.expires_at > now);
        messages.clone()
    }

    /// Drops expired messages and returns the rest, oldest first.
    pub fn active(&self) -> Vec<OsdMessage> {
        self.active_at(Instant::now())
    }
}

impl Notifier for OnScreenMessages {
    fn show(
        &self,
        message: &str,
        duration: f32,
        color: u32,
        priority: i32,
        is_warning: bool,
        id: Option<&str>,
    ) {
        tracing::debug!("on-screen message: {}", message);
        self.show_at(
            Instant::now(),
            message,
            duration,
            color,
            priority,
            is_warning,
            id,
        );
    }
}
