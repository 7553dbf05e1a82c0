use super::{Channels, GraphicsContext, Host};

/// Host used when no debugging UI is attached. Touches nothing and answers every capability
/// query as conservatively as possible.
#[derive(Debug)]
pub struct NullHost {
    span: tracing::Span,
    channels: Channels,
}

impl NullHost {
    pub fn new(channels: Channels) -> Self {
        Self {
            span: tracing::span!(tracing::Level::INFO, "null_host"),
            channels,
        }
    }
}

impl Host for NullHost {
    fn update_ui(&self) {}

    fn update_mem_view(&self) {}

    fn update_disassembly(&self) {}

    fn set_debug_mode(&self, _enabled: bool) {}

    // Graphics are set up by whoever embeds us in this configuration.
    fn init_graphics(&self) -> Result<Option<GraphicsContext>, String> {
        Ok(None)
    }

    fn shutdown_graphics(&self) {}

    #[tracing::instrument(skip(self), parent = &self.span)]
    fn init_sound(&self) {
        tracing::debug!("no audio output attached");
    }

    fn update_sound(&self) {}

    fn shutdown_sound(&self) {}

    #[tracing::instrument(skip(self), parent = &self.span)]
    fn boot_done(&self) {
        tracing::debug!("boot done");
    }

    fn is_debugging_enabled(&self) -> bool {
        false
    }

    fn attempt_load_symbol_map(&self) -> bool {
        false
    }

    fn prepare_shutdown(&self) {}

    fn set_window_title(&self, _message: &str) {}

    fn channels(&self) -> &Channels {
        &self.channels
    }
}
