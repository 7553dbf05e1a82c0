//! Drives the host through the lifecycle of an emulated program: boot, frames, pausing and
//! shutdown.

use crate::{
    gpu::{DisplayList, GpuDebugger, RunResult},
    host::{GraphicsContext, Host},
};
use parking_lot::RwLock;
use std::{path::PathBuf, sync::Arc};
use thiserror::Error;

/// Where guest memory starts in the emulated address space.
pub const GUEST_MEMORY_BASE: u32 = 0x0880_0000;
pub const GUEST_MEMORY_SIZE: usize = 0x1_0000;

/// Parameters the core was booted with.
#[derive(Debug, Default, Clone)]
pub struct CoreParameter {
    pub file_to_start: PathBuf,
}

pub type SharedCoreParameter = Arc<RwLock<CoreParameter>>;
pub type SharedMemory = Arc<RwLock<Vec<u8>>>;

#[derive(Error, Debug)]
pub enum BootError {
    #[error("failed to read \"{path}\": {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to initialize graphics: {0}")]
    Graphics(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Running,
}

pub struct System {
    span: tracing::Span,
    host: Arc<dyn Host>,
    gpu_debugger: Option<Arc<dyn GpuDebugger>>,
    core_parameter: SharedCoreParameter,
    memory: SharedMemory,
    graphics: Option<GraphicsContext>,
    display_list: DisplayList,
    stalled_at: Option<u32>,
    state: State,
    frames: u64,
}

impl System {
    pub fn new(
        host: Arc<dyn Host>,
        gpu_debugger: Option<Arc<dyn GpuDebugger>>,
        core_parameter: SharedCoreParameter,
        memory: SharedMemory,
    ) -> Self {
        Self {
            span: tracing::span!(tracing::Level::INFO, "system"),
            host,
            gpu_debugger,
            core_parameter,
            memory,
            graphics: None,
            display_list: DisplayList::new(GUEST_MEMORY_BASE, Vec::new()),
            stalled_at: None,
            state: State::Idle,
            frames: 0,
        }
    }

    pub fn host(&self) -> &dyn Host {
        self.host.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.state == State::Running
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn graphics(&self) -> Option<&GraphicsContext> {
        self.graphics.as_ref()
    }

    fn load_executable(&self) -> Result<PathBuf, BootError> {
        let path = self.core_parameter.read().file_to_start.clone();
        let data = std::fs::read(&path).map_err(|source| BootError::Io {
            path: path.clone(),
            source,
        })?;

        let mut memory = self.memory.write();
        memory.clear();
        memory.resize(GUEST_MEMORY_SIZE, 0);
        let len = data.len().min(GUEST_MEMORY_SIZE);
        if len < data.len() {
            tracing::warn!(
                "executable is {} bytes, only the first {} are loaded",
                data.len(),
                len
            );
        }
        memory[..len].copy_from_slice(&data[..len]);
        tracing::info!("loaded {} bytes from \"{}\"", len, path.display());

        Ok(path)
    }

    /// Load `path` and bring the host up. A running program is shut down first, while
    /// `file_to_start` still names it.
    #[tracing::instrument(skip(self), parent = &self.span)]
    pub fn boot(&mut self, path: PathBuf) -> Result<(), BootError> {
        self.shutdown();
        self.core_parameter.write().file_to_start = path;

        let path = self.load_executable()?;
        self.graphics = self.host.init_graphics().map_err(BootError::Graphics)?;
        self.host.init_sound();

        if self.host.attempt_load_symbol_map() {
            tracing::info!("symbol map loaded");
        }

        self.display_list = DisplayList::from_memory(&self.memory.read(), GUEST_MEMORY_BASE);
        self.stalled_at = None;
        self.frames = 0;
        self.state = State::Running;

        self.host.boot_done();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.host.set_window_title(&name);
        self.host.update_ui();
        Ok(())
    }

    #[tracing::instrument(skip(self), parent = &self.span)]
    pub fn run_frame(&mut self) {
        if !self.is_running() {
            return;
        }

        self.host.update_sound();
        match self.display_list.run(self.gpu_debugger.as_deref()) {
            RunResult::Finished { .. } => {
                self.stalled_at = None;
                self.frames += 1;
            }
            RunResult::Break { address, executed } => {
                if executed > 0 || self.stalled_at != Some(address) {
                    self.stalled_at = Some(address);
                    self.host
                        .send_ui_message("gpu_break", &format!("{address:08x}"));
                    self.host.update_disassembly();
                }
            }
        }
    }

    /// Enter or leave stepping mode.
    #[tracing::instrument(skip(self), parent = &self.span)]
    pub fn set_paused(&mut self, paused: bool) {
        tracing::debug!("debug mode {}", if paused { "on" } else { "off" });
        self.host.set_debug_mode(paused);
        self.host.update_mem_view();
        self.host.update_disassembly();
        self.host.update_ui();
    }

    #[tracing::instrument(skip(self), parent = &self.span)]
    pub fn shutdown(&mut self) {
        if !self.is_running() {
            return;
        }

        tracing::info!("shutting down after {} frame(s)", self.frames);
        self.host.prepare_shutdown();
        self.host.shutdown_sound();
        self.host.shutdown_graphics();
        self.graphics = None;
        self.state = State::Idle;
        self.host.update_ui();
    }
}
