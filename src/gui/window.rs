use crate::host::{DebugPanel, GraphicsContext, MainWindow, PanelKind};
use parking_lot::Mutex;
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
};

/// Debug panel state shared between the GUI and the host.
#[derive(Debug)]
pub struct Panel {
    kind: PanelKind,
    visible: AtomicBool,
    dirty: AtomicBool,
    debug_mode: AtomicBool,
}

impl Panel {
    fn new(kind: PanelKind) -> Self {
        Self {
            kind,
            visible: AtomicBool::new(false),
            // Freshly created panels have nothing cached yet
            dirty: AtomicBool::new(true),
            debug_mode: AtomicBool::new(false),
        }
    }

    pub fn kind(&self) -> PanelKind {
        self.kind
    }

    pub fn set_visible(&self, visible: bool) {
        self.visible.store(visible, Ordering::Release);
    }

    /// Whether an update was requested since the last call.
    pub fn take_dirty(&self) -> bool {
        self.dirty.swap(false, Ordering::AcqRel)
    }

    pub fn debug_mode(&self) -> bool {
        self.debug_mode.load(Ordering::Acquire)
    }
}

impl DebugPanel for Panel {
    fn update(&self) {
        self.dirty.store(true, Ordering::Release);
    }

    fn is_visible(&self) -> bool {
        self.visible.load(Ordering::Acquire)
    }

    fn set_debug_mode(&self, enabled: bool) {
        self.debug_mode.store(enabled, Ordering::Release);
    }
}

/// The part of the main window the emulation thread is allowed to poke at.
#[derive(Debug, Default)]
pub struct Window {
    panels: Mutex<HashMap<PanelKind, Arc<Panel>>>,
    title: Mutex<Option<String>>,
    booted: AtomicBool,
    menu_generation: AtomicU64,
}

impl Window {
    pub const GRAPHICS_BACKEND: &'static str = "glow";

    pub fn new() -> Self {
        Self::default()
    }

    /// The panel of the given kind, created on first use.
    pub fn open_panel(&self, kind: PanelKind) -> Arc<Panel> {
        self.panels
            .lock()
            .entry(kind)
            .or_insert_with(|| Arc::new(Panel::new(kind)))
            .clone()
    }

    pub fn existing_panel(&self, kind: PanelKind) -> Option<Arc<Panel>> {
        self.panels.lock().get(&kind).cloned()
    }

    pub fn take_title(&self) -> Option<String> {
        self.title.lock().take()
    }

    pub fn is_booted(&self) -> bool {
        self.booted.load(Ordering::Acquire)
    }

    /// Bumped every time the host asks for a menu refresh.
    pub fn menu_generation(&self) -> u64 {
        self.menu_generation.load(Ordering::Acquire)
    }
}

impl MainWindow for Window {
    fn update_menus(&self) {
        self.menu_generation.fetch_add(1, Ordering::AcqRel);
    }

    fn panel(&self, kind: PanelKind) -> Option<Arc<dyn DebugPanel>> {
        self.existing_panel(kind)
            .map(|panel| panel as Arc<dyn DebugPanel>)
    }

    fn boot(&self) {
        self.booted.store(true, Ordering::Release);
        self.update_menus();
    }

    fn shutdown(&self) {
        self.booted.store(false, Ordering::Release);
        self.update_menus();
    }

    fn set_title(&self, title: &str) {
        *self.title.lock() = Some(title.to_string());
    }

    fn graphics_context(&self) -> Option<GraphicsContext> {
        Some(GraphicsContext::new(Self::GRAPHICS_BACKEND))
    }
}
