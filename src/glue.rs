// Glues the emulation thread and the UI together: the channels between them, and the loop that
// drives the system on its own thread.

use crate::{
    gui::step_state::StepState,
    host::{Notification, UiMessageSink},
    system::System,
};
use parking_lot::Mutex;
use std::{
    path::PathBuf,
    sync::mpsc::{channel, Receiver, Sender, TryRecvError},
    time::Duration,
};

const FRAME_TIME: Duration = Duration::from_micros(16_667);
const BOOT_ERROR_COLOR: u32 = 0x00FF_3030;

/// A named event for the UI, see [`UiMessageSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiMessage {
    pub message: String,
    pub value: String,
}

/// Delivers UI messages to the GUI thread.
pub struct UiMessageSender {
    sender: Mutex<Sender<UiMessage>>,
}

impl UiMessageSender {
    pub fn new(sender: Sender<UiMessage>) -> Self {
        Self {
            sender: Mutex::new(sender),
        }
    }
}

impl UiMessageSink for UiMessageSender {
    fn message_received(&self, message: &str, value: &str) {
        let message = UiMessage {
            message: message.to_string(),
            value: value.to_string(),
        };
        if let Err(err) = self.sender.lock().send(message) {
            tracing::warn!("failed to send UI message: {}", err);
        }
    }
}

/// Without a GUI there is nobody to receive messages, so they only get logged.
#[derive(Debug, Default)]
pub struct LogUiMessages;

impl UiMessageSink for LogUiMessages {
    fn message_received(&self, message: &str, value: &str) {
        tracing::info!("ui message {}: {}", message, value);
    }
}

pub struct EmuCommunication {
    file_receiver: Receiver<PathBuf>,
    step_receiver: Option<Receiver<StepState>>,
    shutdown_receiver: Receiver<()>,
}

impl EmuCommunication {
    /// Run `system` on its own thread. With a `frame_limit` the thread exits after that many
    /// frames, or as soon as a boot fails.
    pub fn spawn(
        self,
        mut system: System,
        frame_limit: Option<u64>,
    ) -> std::thread::JoinHandle<()> {
        std::thread::spawn(move || {
            let span = tracing::span!(tracing::Level::INFO, "emu_thread");
            let _enter = span.enter();
            let mut step_state = StepState::default();

            loop {
                match self.shutdown_receiver.try_recv() {
                    Ok(()) | Err(TryRecvError::Disconnected) => {
                        system.shutdown();
                        break;
                    }
                    Err(TryRecvError::Empty) => {}
                }

                if let Ok(path) = self.file_receiver.try_recv() {
                    if let Err(err) = system.boot(path) {
                        tracing::error!("{}", err);
                        system.host().notify_user_message(
                            Notification::new(err.to_string())
                                .duration(5.0)
                                .color(BOOT_ERROR_COLOR)
                                .id("boot"),
                        );
                        if frame_limit.is_some() {
                            break;
                        }
                    }
                }

                if !system.is_running() {
                    std::thread::sleep(Duration::from_millis(100));
                    continue;
                }

                if let Some(step_receiver) = self.step_receiver.as_ref() {
                    if let Ok(new_step_state) = step_receiver.try_recv() {
                        if new_step_state.paused != step_state.paused {
                            system.set_paused(new_step_state.paused);
                        }
                        step_state = new_step_state;
                    }

                    if step_state.paused {
                        if step_state.step {
                            step_state.step = false;
                        } else {
                            std::thread::sleep(Duration::from_millis(10));
                            continue;
                        }
                    }
                }

                system.run_frame();

                if let Some(limit) = frame_limit {
                    if system.frames() >= limit {
                        tracing::info!("reached the frame limit of {}", limit);
                        system.shutdown();
                        break;
                    }
                }

                std::thread::sleep(FRAME_TIME);
            }
        })
    }
}

pub struct UiCommunication {
    pub file_sender: Sender<PathBuf>,
    pub step_sender: Option<Sender<StepState>>,
    pub shutdown_sender: Sender<()>,
}

pub fn init(with_gui: bool) -> (EmuCommunication, UiCommunication) {
    let (file_sender, file_receiver) = channel();
    let (shutdown_sender, shutdown_receiver) = channel();

    let (step_sender, step_receiver) = if with_gui {
        let (step_sender, step_receiver) = channel();
        (Some(step_sender), Some(step_receiver))
    } else {
        (None, None)
    };

    let emu_comm = EmuCommunication {
        file_receiver,
        step_receiver,
        shutdown_receiver,
    };

    let ui_comm = UiCommunication {
        file_sender,
        step_sender,
        shutdown_sender,
    };

    (emu_comm, ui_comm)
}
