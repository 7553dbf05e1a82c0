mod disassembly;
mod display_list;
mod memory_view;
pub mod step_state;
mod window;

use crate::{
    glue::{UiCommunication, UiMessage},
    host::{InteractiveHost, PanelKind},
    osd::OnScreenMessages,
    symbol_map::SymbolMap,
    system::{SharedCoreParameter, SharedMemory},
};
use bitflags::bitflags;
use disassembly::DisassemblyView;
use display_list::DisplayListView;
use eframe::egui;
use memory_view::MemoryView;
use std::{
    path::PathBuf,
    sync::{mpsc::Receiver, Arc},
};
pub use window::Window;

bitflags! {
    /// Debug panels the user has open.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
    pub struct Panels: u8 {
        const Memory      = 0b0000_0001;
        const Disassembly = 0b0000_0010;
        const DisplayList = 0b0000_0100;
    }
}

impl From<PanelKind> for Panels {
    fn from(kind: PanelKind) -> Self {
        match kind {
            PanelKind::Memory => Self::Memory,
            PanelKind::Disassembly => Self::Disassembly,
            PanelKind::DisplayList => Self::DisplayList,
        }
    }
}

impl FromIterator<PanelKind> for Panels {
    fn from_iter<T: IntoIterator<Item = PanelKind>>(iter: T) -> Self {
        iter.into_iter()
            .fold(Panels::empty(), |panels, kind| panels | Panels::from(kind))
    }
}

fn panel_title(kind: PanelKind) -> &'static str {
    match kind {
        PanelKind::Memory => "Memory",
        PanelKind::Disassembly => "Disassembly",
        PanelKind::DisplayList => "Display list",
    }
}

/// Everything the GUI shares with the rest of the program.
pub struct GuiContext {
    pub window: Arc<Window>,
    pub host: Arc<InteractiveHost>,
    pub osd: Arc<OnScreenMessages>,
    pub symbols: Arc<SymbolMap>,
    pub memory: SharedMemory,
    pub core_parameter: SharedCoreParameter,
    pub ui_messages: Receiver<UiMessage>,
    pub ui_comm: UiCommunication,
    pub open_panels: Panels,
}

pub struct Gui {
    span: tracing::Span,
    window: Arc<Window>,
    osd: Arc<OnScreenMessages>,
    core_parameter: SharedCoreParameter,
    ui_messages: Receiver<UiMessage>,
    ui_comm: UiCommunication,

    open_panels: Panels,
    memory_view: MemoryView,
    disassembly: DisassemblyView,
    display_list: DisplayListView,

    menu_generation: u64,
    status: String,
}

impl Gui {
    fn new(span: tracing::Span, context: GuiContext) -> Self {
        let memory_view = MemoryView::new(context.memory);
        let disassembly =
            DisassemblyView::new(context.symbols.clone(), context.ui_comm.step_sender.clone());
        let display_list = DisplayListView::new(context.host, context.symbols);

        Self {
            span,
            window: context.window,
            osd: context.osd,
            core_parameter: context.core_parameter,
            ui_messages: context.ui_messages,
            ui_comm: context.ui_comm,

            open_panels: context.open_panels,
            memory_view,
            disassembly,
            display_list,

            menu_generation: u64::MAX,
            status: "No file loaded".to_string(),
        }
    }

    pub fn run(window_title: &str, context: GuiContext) {
        let span = tracing::span!(tracing::Level::INFO, "gui");
        let options = eframe::NativeOptions::default();
        eframe::run_native(
            window_title,
            options,
            Box::new(|_cc| Box::new(Self::new(span, context))),
        );
    }

    fn open_file(&mut self, path: PathBuf) {
        tracing::info!("opening \"{}\"", path.display());
        if let Err(err) = self.ui_comm.file_sender.send(path) {
            tracing::error!("failed to send file to the emulation thread: {}", err);
        }
    }

    fn handle_ui_messages(&mut self) {
        while let Ok(UiMessage { message, value }) = self.ui_messages.try_recv() {
            match message.as_str() {
                "gpu_break" => self.display_list.on_break(&value),
                _ => tracing::debug!("unhandled ui message {}: {}", message, value),
            }
        }
    }

    fn refresh_status(&mut self) {
        let generation = self.window.menu_generation();
        if generation == self.menu_generation {
            return;
        }

        self.menu_generation = generation;
        self.status = if self.window.is_booted() {
            format!(
                "Running \"{}\"",
                self.core_parameter.read().file_to_start.display()
            )
        } else {
            "No file loaded".to_string()
        };
    }

    /// Mirror which panels are open into the state the host reads.
    fn sync_panels(&self) {
        for kind in PanelKind::ALL {
            if self.open_panels.contains(kind.into()) {
                self.window.open_panel(kind).set_visible(true);
            } else if let Some(panel) = self.window.existing_panel(kind) {
                panel.set_visible(false);
            }
        }
    }

    fn menu_bar(&mut self, ui: &mut egui::Ui, frame: &mut eframe::Frame) {
        egui::menu::bar(ui, |ui| {
            ui.menu_button("File", |ui| {
                if ui.button("Open...").clicked() {
                    ui.close_menu();
                    let picked = rfd::FileDialog::new()
                        .add_filter("PSP executables", &["iso", "cso", "elf", "prx", "pbp", "bin"])
                        .pick_file();
                    if let Some(path) = picked {
                        self.open_file(path);
                    }
                }

                if ui.button("Quit").clicked() {
                    frame.close();
                }
            });

            ui.menu_button("Debug", |ui| {
                for kind in PanelKind::ALL {
                    let mut open = self.open_panels.contains(kind.into());
                    if ui.checkbox(&mut open, panel_title(kind)).changed() {
                        self.open_panels.set(kind.into(), open);
                    }
                }
            });
        });
    }

    fn panel_windows(&mut self, ctx: &egui::Context) {
        for kind in PanelKind::ALL {
            let flag = Panels::from(kind);
            let mut open = self.open_panels.contains(flag);
            if !open {
                continue;
            }

            let panel = self.window.open_panel(kind);
            egui::Window::new(panel_title(kind))
                .open(&mut open)
                .show(ctx, |ui| match panel.kind() {
                    PanelKind::Memory => self.memory_view.ui(ui, &panel),
                    PanelKind::Disassembly => self.disassembly.ui(ui, &panel),
                    PanelKind::DisplayList => self.display_list.ui(ui, &panel),
                });
            self.open_panels.set(flag, open);
        }
    }

    fn on_screen_messages(&self, ctx: &egui::Context) {
        let messages = self.osd.active();
        if messages.is_empty() {
            return;
        }

        egui::Area::new("on_screen_messages")
            .anchor(egui::Align2::LEFT_BOTTOM, [8.0, -8.0])
            .show(ctx, |ui| {
                for message in messages {
                    let [r, g, b] = message.rgb();
                    ui.label(
                        egui::RichText::new(message.text)
                            .color(egui::Color32::from_rgb(r, g, b))
                            .strong(),
                    );
                }
            });
    }
}

impl eframe::App for Gui {
    #[tracing::instrument(skip(self, ctx, frame), parent = &self.span)]
    fn update(&mut self, ctx: &egui::Context, frame: &mut eframe::Frame) {
        if let Some(title) = self.window.take_title() {
            frame.set_window_title(&title);
        }
        self.handle_ui_messages();
        self.refresh_status();

        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            self.menu_bar(ui, frame);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            header_label(ui, &self.status);
        });

        self.panel_windows(ctx);
        self.sync_panels();
        self.on_screen_messages(ctx);

        // Calling this here will request another frame immediately after this one
        ctx.request_repaint();
    }
}

fn header_label(ui: &mut egui::Ui, name: &str) {
    ui.vertical_centered(|ui| {
        ui.heading(egui::RichText::new(name).strong());
    });
}
