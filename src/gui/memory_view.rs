use super::{header_label, window::Panel};
use crate::system::{SharedMemory, GUEST_MEMORY_SIZE};
use eframe::egui;
use egui_memory_editor::MemoryEditor;

pub struct MemoryView {
    span: tracing::Span,
    memory: SharedMemory,
    snapshot: Vec<u8>,
    viewer: MemoryEditor,
}

impl MemoryView {
    pub fn new(memory: SharedMemory) -> Self {
        let mut options = egui_memory_editor::option_data::MemoryEditorOptions::default();
        options.show_ascii = true;
        options.is_options_collapsed = true;
        options.column_count = 16;
        let viewer = MemoryEditor::new()
            .with_options(options)
            .with_address_range("Guest memory", 0..GUEST_MEMORY_SIZE);

        Self {
            span: tracing::span!(tracing::Level::INFO, "memory_view"),
            memory,
            snapshot: Vec::new(),
            viewer,
        }
    }

    #[tracing::instrument(skip(self, ui, panel), parent = &self.span)]
    pub fn ui(&mut self, ui: &mut egui::Ui, panel: &Panel) {
        // Only copy guest memory when the emulator says it changed
        if panel.take_dirty() {
            self.snapshot = self.memory.read().clone();
        }

        header_label(ui, "Memory");
        if self.snapshot.is_empty() {
            ui.label("Nothing loaded");
            return;
        }

        self.viewer
            .draw_editor_contents_read_only(ui, &mut self.snapshot, |mem, addr| {
                if addr >= mem.len() {
                    tracing::warn!("memory viewer address out of bounds: {}", addr);
                    return None;
                }
                Some(mem[addr])
            });
    }
}
