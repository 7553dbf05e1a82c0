use super::{header_label, window::Panel};
use crate::{
    gpu::StepMode,
    host::{GpuStep, GpuStepState, InteractiveHost},
    symbol_map::SymbolMap,
};
use eframe::egui;
use std::sync::Arc;

pub struct DisplayListView {
    span: tracing::Span,
    host: Arc<InteractiveHost>,
    symbols: Arc<SymbolMap>,
    break_address: Option<u32>,
    run_to_input: String,
}

impl DisplayListView {
    pub fn new(host: Arc<InteractiveHost>, symbols: Arc<SymbolMap>) -> Self {
        Self {
            span: tracing::span!(tracing::Level::INFO, "display_list"),
            host,
            symbols,
            break_address: None,
            run_to_input: String::new(),
        }
    }

    /// Called for every `gpu_break` message from the emulation thread.
    pub fn on_break(&mut self, value: &str) {
        match u32::from_str_radix(value, 16) {
            Ok(address) => self.break_address = Some(address),
            Err(err) => tracing::warn!("invalid break address \"{}\": {}", value, err),
        }
    }

    fn describe(state: GpuStepState) -> String {
        match state {
            GpuStepState::Disabled => "Running".to_string(),
            GpuStepState::PendingRearm { .. } => "Step requested".to_string(),
            GpuStepState::Armed { flag, data } => match StepMode::from_flag(flag) {
                Some(StepMode::Command) => "Stepping commands".to_string(),
                Some(StepMode::ToAddress) => format!("Running to {data:08X}"),
                Some(StepMode::NextList) => "Waiting for the next list".to_string(),
                None => format!("Armed with unknown flag {flag}"),
            },
        }
    }

    #[tracing::instrument(skip(self, ui, panel), parent = &self.span)]
    pub fn ui(&mut self, ui: &mut egui::Ui, panel: &Panel) {
        if panel.take_dirty() && self.host.gpu_step_state() == GpuStepState::Disabled {
            self.break_address = None;
        }

        header_label(ui, "Display list");
        ui.label(Self::describe(self.host.gpu_step_state()));

        match self.break_address {
            Some(address) => {
                let symbol = self
                    .symbols
                    .lookup(address)
                    .map(|symbol| format!(" ({})", symbol.name))
                    .unwrap_or_default();
                ui.label(format!("Stopped at {address:08X}{symbol}"));
            }
            None => {
                ui.label("Not stopped");
            }
        }

        ui.separator();

        ui.horizontal_top(|ui| {
            if ui
                .button("Step")
                .on_hover_text("Execute a single command")
                .clicked()
            {
                self.host.set_gpu_step(true, GpuStep::PENDING_REARM, 0);
            }

            if ui
                .button("Break")
                .on_hover_text("Stop before the next command")
                .clicked()
            {
                self.host.set_gpu_step(true, StepMode::Command.flag(), 0);
            }

            if ui
                .button("Next list")
                .on_hover_text("Stop at the start of the next display list")
                .clicked()
            {
                self.host.set_gpu_step(true, StepMode::NextList.flag(), 0);
            }

            if ui.button("Continue").clicked() {
                self.host.set_gpu_step(false, 0, 0);
                self.break_address = None;
            }
        });

        ui.horizontal_top(|ui| {
            ui.label("Run to");
            ui.text_edit_singleline(&mut self.run_to_input);
            if ui.button("Go").clicked() {
                match u32::from_str_radix(self.run_to_input.trim().trim_start_matches("0x"), 16) {
                    Ok(address) => {
                        self.host
                            .set_gpu_step(true, StepMode::ToAddress.flag(), address)
                    }
                    Err(_) => tracing::warn!("invalid address \"{}\"", self.run_to_input),
                }
            }
        });
    }
}
