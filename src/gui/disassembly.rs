use super::{header_label, step_state::StepState, window::Panel};
use crate::symbol_map::{Symbol, SymbolMap};
use eframe::egui;
use std::sync::{mpsc::Sender, Arc};

pub struct DisassemblyView {
    span: tracing::Span,
    symbols: Arc<SymbolMap>,
    cached_symbols: Vec<Symbol>,

    step_sender: Option<Sender<StepState>>,
    step_state: StepState,
}

impl DisassemblyView {
    pub fn new(symbols: Arc<SymbolMap>, step_sender: Option<Sender<StepState>>) -> Self {
        Self {
            span: tracing::span!(tracing::Level::INFO, "disassembly"),
            symbols,
            cached_symbols: Vec::new(),
            step_sender,
            step_state: StepState::default(),
        }
    }

    fn send_step_state(&self) {
        if let Some(sender) = &self.step_sender {
            sender.send(self.step_state.clone()).unwrap_or_else(|err| {
                tracing::error!("failed to send step state: {}", err);
            });
        }
    }

    #[tracing::instrument(skip(self, ui, panel), parent = &self.span)]
    pub fn ui(&mut self, ui: &mut egui::Ui, panel: &Panel) {
        if panel.take_dirty() {
            self.cached_symbols = self.symbols.symbols();
        }

        header_label(ui, "Disassembly");
        ui.label(if panel.debug_mode() {
            "Debug mode: stepping"
        } else {
            "Debug mode: running"
        });

        ui.horizontal_top(|ui| {
            let step = ui.button("Step").on_hover_text("Run a single frame");
            if step.clicked() {
                self.step_state.step();
                self.send_step_state();
            }

            let toggle = ui
                .button(if self.step_state.paused { "Resume" } else { "Pause" })
                .on_hover_text("Toggle between being paused and running");
            if toggle.clicked() {
                self.step_state.toggle_pause();
                self.send_step_state();
            }
        });

        ui.separator();

        if self.cached_symbols.is_empty() {
            ui.label("No symbols");
            return;
        }

        egui::ScrollArea::vertical()
            .auto_shrink([false, true])
            .show(ui, |ui| {
                egui::Grid::new("symbols").striped(true).show(ui, |ui| {
                    for symbol in &self.cached_symbols {
                        ui.label(format!("{:08X}", symbol.address));
                        ui.label(format!("{:X}", symbol.size));
                        ui.label(symbol.kind.to_string());
                        ui.label(symbol.name.as_str());
                        ui.end_row();
                    }
                });
            });
    }
}
