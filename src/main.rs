mod glue;
mod gpu;
mod gui;
mod host;
mod osd;
mod symbol_map;
mod system;

use clap::Parser;
use gui::{Gui, GuiContext, Panels, Window};
use host::{Channels, Host, InteractiveHost, MainWindow, NullHost, PanelKind, WindowTitle};
use osd::OnScreenMessages;
use std::{path::PathBuf, sync::mpsc::channel, sync::Arc};
use symbol_map::SymbolMap;
use system::{SharedCoreParameter, SharedMemory, System};

#[derive(Parser)]
#[command(about = "Host layer of a PSP emulator, with an optional debugging UI.")]
struct Args {
    /// Executable to boot at startup
    #[arg(short, long)]
    file: Option<PathBuf>,

    #[arg(short, long)]
    without_gui: bool,

    /// How many frames to run for without the GUI
    #[arg(long, default_value_t = 600)]
    frames: u64,

    // https://docs.rs/tracing-subscriber/0.3.16/tracing_subscriber/filter/struct.EnvFilter.html#example-syntax
    // Without the GUI framework cluttering logs: '--log-level trace,eframe=info'
    #[arg(short, long)]
    log_level: Option<String>,

    /// Debug panels to show at startup
    #[arg(long, value_delimiter = ',', value_parser = parse_panel)]
    open_panels: Vec<PanelKind>,
}

fn parse_panel(name: &str) -> Result<PanelKind, String> {
    PanelKind::ALL
        .into_iter()
        .find(|kind| kind.name() == name)
        .ok_or_else(|| {
            let names: Vec<_> = PanelKind::ALL.iter().map(|kind| kind.name()).collect();
            format!("expected one of: {}", names.join(", "))
        })
}

fn main() {
    let args = Args::parse();

    // Set up the logger
    let log_level = args.log_level.unwrap_or_else(|| "debug".to_string());
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_target(false) // Dont display 'psp_host' for every span
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set default subscriber");

    let osd = Arc::new(OnScreenMessages::new());
    let core_parameter = SharedCoreParameter::default();
    let memory = SharedMemory::default();
    let (emu_comm, ui_comm) = glue::init(!args.without_gui);

    if args.without_gui {
        let Some(file) = args.file else {
            tracing::error!("a file to boot is required when running without the GUI");
            std::process::exit(1);
        };

        let channels = Channels {
            notifier: osd,
            ui_messages: Arc::new(glue::LogUiMessages),
        };
        let host: Arc<dyn Host> = Arc::new(NullHost::new(channels));
        let system = System::new(host, None, core_parameter, memory);

        if ui_comm.file_sender.send(file).is_err() {
            tracing::error!("emulation thread is not listening");
            std::process::exit(1);
        }

        let emu_handle = emu_comm.spawn(system, Some(args.frames));
        if emu_handle.join().is_err() {
            tracing::error!("emulation thread panicked");
            std::process::exit(1);
        }
        return;
    }

    let (ui_message_sender, ui_message_receiver) = channel();
    let channels = Channels {
        notifier: osd.clone(),
        ui_messages: Arc::new(glue::UiMessageSender::new(ui_message_sender)),
    };

    // The host only gets a weak reference, the GUI owns the window
    let window = Arc::new(Window::new());
    let main_window: Arc<dyn MainWindow> = window.clone();
    let symbols = Arc::new(SymbolMap::new());
    let host = Arc::new(InteractiveHost::new(
        Arc::downgrade(&main_window),
        symbols.clone(),
        core_parameter.clone(),
        channels,
        WindowTitle::default(),
    ));
    let system = System::new(
        host.clone(),
        Some(host.clone()),
        core_parameter.clone(),
        memory.clone(),
    );

    if let Some(file) = args.file {
        if ui_comm.file_sender.send(file).is_err() {
            tracing::error!("emulation thread is not listening");
        }
    }

    let shutdown_sender = ui_comm.shutdown_sender.clone();
    let emu_handle = emu_comm.spawn(system, None);

    let title = WindowTitle::default().compose("No file loaded");
    Gui::run(
        &title,
        GuiContext {
            window,
            host,
            osd,
            symbols,
            memory,
            core_parameter,
            ui_messages: ui_message_receiver,
            ui_comm,
            open_panels: args.open_panels.into_iter().collect::<Panels>(),
        },
    );

    // Saves the symbol map on the way out
    if shutdown_sender.send(()).is_err() {
        tracing::debug!("emulation thread already stopped");
    }
    if emu_handle.join().is_err() {
        tracing::error!("emulation thread panicked");
    };
}
