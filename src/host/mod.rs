//! The boundary between the emulation core and whatever presents it.
//!
//! The emulation thread holds a single `Arc<dyn Host>` for the lifetime of the process and calls
//! into it at fixed trigger points (boot, graphics/sound lifecycle, debug toggles). Which policy
//! sits behind it is decided once at startup: [`NullHost`] when running headless, or
//! [`InteractiveHost`] when a debugging window is attached.

mod gpu_step;
mod interactive;
mod null;

pub use gpu_step::{GpuStep, GpuStepState};
pub use interactive::{
    symbol_map_filename, DebugPanel, InteractiveHost, MainWindow, PanelKind, WindowTitle,
};
pub use null::NullHost;

use std::{fmt, sync::Arc};

/// Priority every host notification is shown with.
pub const NOTIFICATION_PRIORITY: i32 = -1;

/// Opaque handle to whatever the presentation layer renders with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphicsContext {
    pub backend: &'static str,
}

impl GraphicsContext {
    pub const fn new(backend: &'static str) -> Self {
        Self { backend }
    }
}

/// On-screen message display, owned by the embedding application.
pub trait Notifier: Send + Sync {
    fn show(
        &self,
        message: &str,
        duration: f32,
        color: u32,
        priority: i32,
        is_warning: bool,
        id: Option<&str>,
    );
}

/// Entry point of the embedding application for named key/value events.
pub trait UiMessageSink: Send + Sync {
    fn message_received(&self, message: &str, value: &str);
}

/// The collaborators both policies forward to in exactly the same way.
#[derive(Clone)]
pub struct Channels {
    pub notifier: Arc<dyn Notifier>,
    pub ui_messages: Arc<dyn UiMessageSink>,
}

impl fmt::Debug for Channels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channels").finish_non_exhaustive()
    }
}

/// A transient message for the user.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub text: String,
    /// Seconds to keep the message on screen.
    pub duration: f32,
    /// Packed as `0xRRGGBB`.
    pub color: u32,
    /// Messages sharing an id replace each other.
    pub id: Option<String>,
}

impl Notification {
    pub const DEFAULT_DURATION: f32 = 1.0;
    pub const DEFAULT_COLOR: u32 = 0x00FF_FFFF;

    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            duration: Self::DEFAULT_DURATION,
            color: Self::DEFAULT_COLOR,
            id: None,
        }
    }

    pub fn duration(mut self, seconds: f32) -> Self {
        self.duration = seconds;
        self
    }

    pub fn color(mut self, color: u32) -> Self {
        self.color = color;
        self
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Everything the emulation core may ask of its presentation layer.
///
/// None of these panic or retry: failures come back as `false` or an `Err`, and a debug panel
/// that doesn't exist turns the call into a no-op.
pub trait Host: Send + Sync {
    /// Request a general refresh of the UI. Must not block.
    fn update_ui(&self);

    fn update_mem_view(&self);
    fn update_disassembly(&self);

    /// Propagate the global debug-mode toggle to the disassembly panel, if open.
    fn set_debug_mode(&self, enabled: bool);

    /// On failure the message explains why; the core treats it as fatal to the boot.
    fn init_graphics(&self) -> Result<Option<GraphicsContext>, String>;

    /// Idempotent.
    fn shutdown_graphics(&self);

    fn init_sound(&self);
    fn update_sound(&self);
    fn shutdown_sound(&self);

    /// Sent from the emulation thread once the guest program is loaded and about to run.
    /// Implementations must not touch UI-thread data without synchronizing.
    fn boot_done(&self);

    fn is_debugging_enabled(&self) -> bool;

    /// Returns whether a symbol map was found and loaded.
    fn attempt_load_symbol_map(&self) -> bool;

    /// Called once, before teardown.
    fn prepare_shutdown(&self);

    fn set_window_title(&self, message: &str);

    fn channels(&self) -> &Channels;

    fn notify_user_message(&self, notification: Notification) {
        self.channels().notifier.show(
            &notification.text,
            notification.duration,
            notification.color,
            NOTIFICATION_PRIORITY,
            true,
            notification.id.as_deref(),
        );
    }

    fn send_ui_message(&self, message: &str, value: &str) {
        self.channels().ui_messages.message_received(message, value);
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    pub struct Shown {
        pub message: String,
        pub duration: f32,
        pub color: u32,
        pub priority: i32,
        pub is_warning: bool,
        pub id: Option<String>,
    }

    #[derive(Default)]
    pub struct RecordingNotifier {
        pub shown: Mutex<Vec<Shown>>,
    }

    impl Notifier for RecordingNotifier {
        fn show(
            &self,
            message: &str,
            duration: f32,
            color: u32,
            priority: i32,
            is_warning: bool,
            id: Option<&str>,
        ) {
            self.shown.lock().push(Shown {
                message: message.to_string(),
                duration,
                color,
                priority,
                is_warning,
                id: id.map(str::to_string),
            });
        }
    }

    #[derive(Default)]
    pub struct RecordingSink {
        pub received: Mutex<Vec<(String, String)>>,
    }

    impl UiMessageSink for RecordingSink {
        fn message_received(&self, message: &str, value: &str) {
            self.received
                .lock()
                .push((message.to_string(), value.to_string()));
        }
    }

    pub fn channels() -> (Channels, Arc<RecordingNotifier>, Arc<RecordingSink>) {
        let notifier = Arc::new(RecordingNotifier::default());
        let sink = Arc::new(RecordingSink::default());
        let channels = Channels {
            notifier: notifier.clone(),
            ui_messages: sink.clone(),
        };
        (channels, notifier, sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notification_defaults() {
        let notification = Notification::new("hello");
        assert_eq!(notification.duration, 1.0);
        assert_eq!(notification.color, 0x00FFFFFF);
        assert_eq!(notification.id, None);
    }

    #[test]
    fn notify_forwards_once_with_fixed_priority() {
        let (channels, notifier, _) = testing::channels();
        let host = NullHost::new(channels);

        host.notify_user_message(Notification::new("Saved").duration(2.0).color(0x00FF00));

        let shown = notifier.shown.lock();
        assert_eq!(shown.len(), 1);
        assert_eq!(
            shown[0],
            testing::Shown {
                message: "Saved".to_string(),
                duration: 2.0,
                color: 0x00FF00,
                priority: -1,
                is_warning: true,
                id: None,
            }
        );
    }

    #[test]
    fn notify_passes_id_through() {
        let (channels, notifier, _) = testing::channels();
        let host = NullHost::new(channels);

        host.notify_user_message(Notification::new("Loading").id("boot"));

        assert_eq!(notifier.shown.lock()[0].id.as_deref(), Some("boot"));
    }

    #[test]
    fn ui_message_reaches_sink() {
        let (channels, _, sink) = testing::channels();
        let host = NullHost::new(channels);

        host.send_ui_message("gpu_break", "08800000");

        assert_eq!(
            *sink.received.lock(),
            vec![("gpu_break".to_string(), "08800000".to_string())]
        );
    }
}
