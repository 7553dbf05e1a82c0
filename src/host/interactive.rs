use super::{Channels, GpuStep, GpuStepState, GraphicsContext, Host};
use crate::{
    gpu::GpuDebugger,
    symbol_map::{SymbolMapError, SymbolStore},
    system::SharedCoreParameter,
};
use std::{
    fmt,
    path::Path,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Weak,
    },
};

/// The debug panels a main window may have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PanelKind {
    Memory,
    Disassembly,
    DisplayList,
}

impl PanelKind {
    pub const ALL: [PanelKind; 3] = [Self::Memory, Self::Disassembly, Self::DisplayList];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Disassembly => "disassembly",
            Self::DisplayList => "display-list",
        }
    }
}

impl fmt::Display for PanelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

pub trait DebugPanel: Send + Sync {
    fn update(&self);
    fn is_visible(&self) -> bool;

    /// Only the disassembly panel cares about this.
    fn set_debug_mode(&self, _enabled: bool) {}
}

/// The window an [`InteractiveHost`] forwards to. Implemented by the GUI.
pub trait MainWindow: Send + Sync {
    fn update_menus(&self);

    /// `None` if the panel was never created.
    fn panel(&self, kind: PanelKind) -> Option<Arc<dyn DebugPanel>>;

    /// Switch the window over to its "running" state.
    fn boot(&self);

    /// Leave the "running" state again.
    fn shutdown(&self);

    fn set_title(&self, title: &str);

    fn graphics_context(&self) -> Option<GraphicsContext>;
}

/// Product and version shown in front of every window title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowTitle {
    pub product: String,
    pub version: String,
}

impl WindowTitle {
    pub fn new(product: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            product: product.into(),
            version: version.into(),
        }
    }

    pub fn compose(&self, message: &str) -> String {
        format!("{} {} - {}", self.product, self.version, message)
    }
}

impl Default for WindowTitle {
    fn default() -> Self {
        Self::new(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
    }
}

/// Replace everything after the last `.` with `.map`, or append `.map` if there is no `.`.
pub fn symbol_map_filename(current_filename: &str) -> String {
    match current_filename.rfind('.') {
        Some(dot) => format!("{}.map", &current_filename[..dot]),
        None => format!("{current_filename}.map"),
    }
}

/// Host backed by a debugging window.
pub struct InteractiveHost {
    span: tracing::Span,
    window: Weak<dyn MainWindow>,
    symbols: Arc<dyn SymbolStore>,
    core_parameter: SharedCoreParameter,
    channels: Channels,
    title: WindowTitle,
    gpu_step: GpuStep,
    graphics_active: AtomicBool,
}

impl InteractiveHost {
    pub fn new(
        window: Weak<dyn MainWindow>,
        symbols: Arc<dyn SymbolStore>,
        core_parameter: SharedCoreParameter,
        channels: Channels,
        title: WindowTitle,
    ) -> Self {
        Self {
            span: tracing::span!(tracing::Level::INFO, "interactive_host"),
            window,
            symbols,
            core_parameter,
            channels,
            title,
            gpu_step: GpuStep::new(),
            graphics_active: AtomicBool::new(false),
        }
    }

    fn with_panel(&self, kind: PanelKind, f: impl FnOnce(&dyn DebugPanel)) {
        if let Some(panel) = self.window.upgrade().and_then(|window| window.panel(kind)) {
            f(panel.as_ref());
        }
    }

    fn symbol_map_path(&self) -> String {
        let parameter = self.core_parameter.read();
        symbol_map_filename(&parameter.file_to_start.to_string_lossy())
    }

    /// Arm or disarm GPU single-stepping. UI thread only.
    #[tracing::instrument(skip(self), parent = &self.span)]
    pub fn set_gpu_step(&self, enable: bool, flag: i32, data: u32) {
        tracing::debug!("gpu step set");
        self.gpu_step.set(enable, flag, data);
    }

    pub fn gpu_step_state(&self) -> GpuStepState {
        self.gpu_step.state()
    }

    /// Whether the display list panel is visible. GPU path only.
    ///
    /// Not idempotent: a visible panel also acknowledges a pending re-arm, resetting the flag to
    /// 0. A hidden panel never changes the stepping state.
    pub fn gpu_debugging_active(&self) -> bool {
        let mut visible = false;
        self.with_panel(PanelKind::DisplayList, |panel| visible = panel.is_visible());

        if visible && self.gpu_step.acknowledge_pending() {
            tracing::trace!(parent: &self.span, "pending gpu step acknowledged");
        }
        visible
    }
}

impl fmt::Debug for InteractiveHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InteractiveHost")
            .field("title", &self.title)
            .field("gpu_step", &self.gpu_step.state())
            .finish_non_exhaustive()
    }
}

impl Host for InteractiveHost {
    fn update_ui(&self) {
        if let Some(window) = self.window.upgrade() {
            window.update_menus();
        }
    }

    fn update_mem_view(&self) {
        self.with_panel(PanelKind::Memory, |panel| panel.update());
    }

    fn update_disassembly(&self) {
        self.with_panel(PanelKind::Disassembly, |panel| panel.update());
        self.with_panel(PanelKind::DisplayList, |panel| panel.update());
    }

    fn set_debug_mode(&self, enabled: bool) {
        self.with_panel(PanelKind::Disassembly, |panel| panel.set_debug_mode(enabled));
    }

    #[tracing::instrument(skip(self), parent = &self.span)]
    fn init_graphics(&self) -> Result<Option<GraphicsContext>, String> {
        let window = self
            .window
            .upgrade()
            .ok_or_else(|| "the main window has already been closed".to_string())?;
        let context = window
            .graphics_context()
            .ok_or_else(|| "the main window has no graphics context".to_string())?;

        tracing::info!("graphics initialized with {}", context.backend);
        self.graphics_active.store(true, Ordering::Release);
        Ok(Some(context))
    }

    #[tracing::instrument(skip(self), parent = &self.span)]
    fn shutdown_graphics(&self) {
        if self.graphics_active.swap(false, Ordering::AcqRel) {
            tracing::info!("graphics shut down");
        }
    }

    #[tracing::instrument(skip(self), parent = &self.span)]
    fn init_sound(&self) {
        tracing::debug!("sound initialized");
    }

    fn update_sound(&self) {}

    #[tracing::instrument(skip(self), parent = &self.span)]
    fn shutdown_sound(&self) {
        tracing::debug!("sound shut down");
    }

    #[tracing::instrument(skip(self), parent = &self.span)]
    fn boot_done(&self) {
        self.symbols.sort();
        if let Some(window) = self.window.upgrade() {
            window.boot();
        }
    }

    fn is_debugging_enabled(&self) -> bool {
        cfg!(debug_assertions)
    }

    #[tracing::instrument(skip(self), parent = &self.span)]
    fn attempt_load_symbol_map(&self) -> bool {
        let path = self.symbol_map_path();
        self.symbols.clear();
        match self.symbols.load(Path::new(&path)) {
            Ok(()) => {
                tracing::info!("loaded symbol map \"{}\"", path);
                true
            }
            Err(SymbolMapError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("no symbol map at \"{}\"", path);
                false
            }
            Err(err) => {
                tracing::warn!("failed to load symbol map \"{}\": {}", path, err);
                false
            }
        }
    }

    #[tracing::instrument(skip(self), parent = &self.span)]
    fn prepare_shutdown(&self) {
        let path = self.symbol_map_path();
        if let Err(err) = self.symbols.save(Path::new(&path)) {
            tracing::error!("failed to save symbol map \"{}\": {}", path, err);
        }
        if let Some(window) = self.window.upgrade() {
            window.shutdown();
        }
    }

    fn set_window_title(&self, message: &str) {
        if let Some(window) = self.window.upgrade() {
            window.set_title(&self.title.compose(message));
        }
    }

    fn channels(&self) -> &Channels {
        &self.channels
    }
}

impl GpuDebugger for InteractiveHost {
    fn gpu_debugging_active(&self) -> bool {
        InteractiveHost::gpu_debugging_active(self)
    }

    fn gpu_step_state(&self) -> GpuStepState {
        InteractiveHost::gpu_step_state(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{host::testing, symbol_map::SymbolMap, system::CoreParameter};
    use parking_lot::{Mutex, RwLock};
    use std::{
        path::PathBuf,
        sync::atomic::{AtomicUsize, Ordering},
    };

    #[derive(Default)]
    struct FakePanel {
        visible: AtomicBool,
        updates: AtomicUsize,
        debug_mode: Mutex<Option<bool>>,
    }

    impl DebugPanel for FakePanel {
        fn update(&self) {
            self.updates.fetch_add(1, Ordering::SeqCst);
        }

        fn is_visible(&self) -> bool {
            self.visible.load(Ordering::SeqCst)
        }

        fn set_debug_mode(&self, enabled: bool) {
            *self.debug_mode.lock() = Some(enabled);
        }
    }

    #[derive(Default)]
    struct FakeWindow {
        memory: Option<Arc<FakePanel>>,
        disassembly: Option<Arc<FakePanel>>,
        display_list: Option<Arc<FakePanel>>,
        menu_updates: AtomicUsize,
        booted: AtomicBool,
        title: Mutex<Option<String>>,
        graphics: bool,
    }

    impl FakeWindow {
        fn with_all_panels() -> Self {
            Self {
                memory: Some(Arc::default()),
                disassembly: Some(Arc::default()),
                display_list: Some(Arc::default()),
                graphics: true,
                ..Default::default()
            }
        }

        fn display_list(&self) -> &FakePanel {
            self.display_list.as_deref().unwrap()
        }
    }

    impl MainWindow for FakeWindow {
        fn update_menus(&self) {
            self.menu_updates.fetch_add(1, Ordering::SeqCst);
        }

        fn panel(&self, kind: PanelKind) -> Option<Arc<dyn DebugPanel>> {
            let panel = match kind {
                PanelKind::Memory => self.memory.clone(),
                PanelKind::Disassembly => self.disassembly.clone(),
                PanelKind::DisplayList => self.display_list.clone(),
            };
            panel.map(|panel| panel as Arc<dyn DebugPanel>)
        }

        fn boot(&self) {
            self.booted.store(true, Ordering::SeqCst);
        }

        fn shutdown(&self) {
            self.booted.store(false, Ordering::SeqCst);
        }

        fn set_title(&self, title: &str) {
            *self.title.lock() = Some(title.to_string());
        }

        fn graphics_context(&self) -> Option<GraphicsContext> {
            self.graphics.then(|| GraphicsContext::new("fake"))
        }
    }

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "psp-host-interactive-{}-{}",
            name,
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn host_for(
        window: &Arc<FakeWindow>,
        symbols: Arc<SymbolMap>,
        file_to_start: PathBuf,
    ) -> InteractiveHost {
        let (channels, _, _) = testing::channels();
        let window: Arc<dyn MainWindow> = window.clone();
        let core_parameter = Arc::new(RwLock::new(CoreParameter { file_to_start }));
        InteractiveHost::new(
            Arc::downgrade(&window),
            symbols,
            core_parameter,
            channels,
            WindowTitle::new("PPSSPP", "v1.0"),
        )
    }

    fn host(window: &Arc<FakeWindow>) -> InteractiveHost {
        host_for(window, Arc::default(), PathBuf::from("game.iso"))
    }

    #[test]
    fn symbol_map_paths() {
        assert_eq!(symbol_map_filename("game.iso"), "game.map");
        assert_eq!(symbol_map_filename("game"), "game.map");
        assert_eq!(symbol_map_filename("a.b.iso"), "a.b.map");
        assert_eq!(symbol_map_filename("/roms/game.elf"), "/roms/game.map");
    }

    #[test]
    fn window_title() {
        let window = Arc::new(FakeWindow::with_all_panels());
        let host = host(&window);

        host.set_window_title("Paused");

        assert_eq!(window.title.lock().as_deref(), Some("PPSSPP v1.0 - Paused"));
    }

    #[test]
    fn panel_updates_are_forwarded() {
        let window = Arc::new(FakeWindow::with_all_panels());
        let host = host(&window);

        host.update_ui();
        host.update_mem_view();
        host.update_disassembly();
        host.set_debug_mode(true);

        assert_eq!(window.menu_updates.load(Ordering::SeqCst), 1);
        let updates = |panel: &Option<Arc<FakePanel>>| {
            panel.as_ref().unwrap().updates.load(Ordering::SeqCst)
        };
        assert_eq!(updates(&window.memory), 1);
        assert_eq!(updates(&window.disassembly), 1);
        assert_eq!(updates(&window.display_list), 1);
        assert_eq!(
            *window.disassembly.as_ref().unwrap().debug_mode.lock(),
            Some(true)
        );
    }

    #[test]
    fn missing_panels_are_ignored() {
        let window = Arc::new(FakeWindow::default());
        let host = host(&window);

        host.update_mem_view();
        host.update_disassembly();
        host.set_debug_mode(false);
        assert!(!host.gpu_debugging_active());
    }

    #[test]
    fn dropped_window_turns_calls_into_no_ops() {
        let window = Arc::new(FakeWindow::with_all_panels());
        let host = host(&window);
        drop(window);

        host.update_ui();
        host.boot_done();
        host.set_window_title("Running");
        assert!(!host.gpu_debugging_active());
        assert!(host.init_graphics().is_err());
    }

    #[test]
    fn graphics_without_context_fail_with_a_message() {
        let window = Arc::new(FakeWindow {
            graphics: false,
            ..FakeWindow::with_all_panels()
        });
        let host = host(&window);

        let err = host.init_graphics().unwrap_err();
        assert!(err.contains("graphics context"));
    }

    #[test]
    fn graphics_lifecycle() {
        let window = Arc::new(FakeWindow::with_all_panels());
        let host = host(&window);

        assert_eq!(host.init_graphics(), Ok(Some(GraphicsContext::new("fake"))));
        host.shutdown_graphics();
        host.shutdown_graphics();
    }

    #[test]
    fn boot_done_sorts_symbols_and_boots_window() {
        let window = Arc::new(FakeWindow::with_all_panels());
        let symbols = Arc::new(SymbolMap::new());
        symbols.add("late", 0x0880_2000, 4);
        symbols.add("early", 0x0880_1000, 4);
        let host = host_for(&window, symbols.clone(), PathBuf::from("game.iso"));

        host.boot_done();

        assert!(window.booted.load(Ordering::SeqCst));
        let names: Vec<_> = symbols.symbols().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["early", "late"]);
    }

    #[test]
    fn symbol_map_persists_next_to_executable() {
        let dir = temp_dir("persist");
        let window = Arc::new(FakeWindow::with_all_panels());

        let symbols = Arc::new(SymbolMap::new());
        let host = host_for(&window, symbols.clone(), dir.join("game.iso"));
        assert!(!host.attempt_load_symbol_map());
        symbols.add("main", 0x0880_4000, 0x10);
        host.prepare_shutdown();
        assert!(dir.join("game.map").exists());

        let reloaded = Arc::new(SymbolMap::new());
        let host = host_for(&window, reloaded.clone(), dir.join("game.iso"));
        assert!(host.attempt_load_symbol_map());
        assert_eq!(reloaded.symbols()[0].name, "main");

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn symbols_do_not_leak_into_the_next_program() {
        let dir = temp_dir("leak");
        let window = Arc::new(FakeWindow::with_all_panels());
        let symbols = Arc::new(SymbolMap::new());
        symbols.add("from_previous_game", 0x0880_0000, 4);
        let host = host_for(&window, symbols.clone(), dir.join("c.bin"));

        assert!(!host.attempt_load_symbol_map());
        assert!(symbols.symbols().is_empty());

        host.prepare_shutdown();
        assert_eq!(std::fs::read_to_string(dir.join("c.map")).unwrap(), "");

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn prepare_shutdown_leaves_running_state() {
        let window = Arc::new(FakeWindow::with_all_panels());
        let dir = temp_dir("running");
        let host = host_for(&window, Arc::default(), dir.join("game.iso"));

        host.boot_done();
        assert!(window.booted.load(Ordering::SeqCst));
        host.prepare_shutdown();
        assert!(!window.booted.load(Ordering::SeqCst));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn gpu_step_rearms_only_when_panel_visible() {
        let window = Arc::new(FakeWindow::with_all_panels());
        let host = host(&window);
        assert_eq!(host.gpu_step_state(), GpuStepState::Disabled);

        host.set_gpu_step(true, -1, 0);
        assert_eq!(host.gpu_step_state(), GpuStepState::PendingRearm { data: 0 });

        assert!(!host.gpu_debugging_active());
        assert_eq!(host.gpu_step_state(), GpuStepState::PendingRearm { data: 0 });

        window.display_list().visible.store(true, Ordering::SeqCst);
        assert!(host.gpu_debugging_active());
        assert_eq!(
            host.gpu_step_state(),
            GpuStepState::Armed { flag: 0, data: 0 }
        );
    }

    #[test]
    fn gpu_step_is_fully_overwritten() {
        let window = Arc::new(FakeWindow::with_all_panels());
        let host = host(&window);

        host.set_gpu_step(true, 5, 42);
        host.set_gpu_step(false, 0, 0);

        assert_eq!(host.gpu_step_state(), GpuStepState::Disabled);
    }

    #[test]
    fn debugging_follows_build_profile() {
        let window = Arc::new(FakeWindow::with_all_panels());
        assert_eq!(host(&window).is_debugging_enabled(), cfg!(debug_assertions));
    }
}
