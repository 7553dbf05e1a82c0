//! The GPU side of single-step debugging: walks a display list and asks the debugger before
//! every command whether it may run.

use crate::host::GpuStepState;

/// What the GPU path needs from whoever owns the stepping state.
pub trait GpuDebugger: Send + Sync {
    /// Whether a display list panel is visible. May acknowledge a pending step as a side effect.
    fn gpu_debugging_active(&self) -> bool;
    fn gpu_step_state(&self) -> GpuStepState;
}

/// Meaning of the stepping flag while armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepMode {
    /// Break before every command.
    Command,
    /// Break when the command at the address held in the data word is reached.
    ToAddress,
    /// Break at the start of the next display list.
    NextList,
}

impl StepMode {
    pub const fn flag(self) -> i32 {
        match self {
            Self::Command => 0,
            Self::ToAddress => 1,
            Self::NextList => 2,
        }
    }

    pub const fn from_flag(flag: i32) -> Option<Self> {
        match flag {
            0 => Some(Self::Command),
            1 => Some(Self::ToAddress),
            2 => Some(Self::NextList),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepAction {
    Proceed,
    Break,
}

/// Decide whether the command at `address` may execute.
pub fn before_command(debugger: &dyn GpuDebugger, address: u32, list_start: bool) -> StepAction {
    // Read before polling, the poll consumes the pending state.
    let was_pending = matches!(
        debugger.gpu_step_state(),
        GpuStepState::PendingRearm { .. }
    );
    if !debugger.gpu_debugging_active() {
        return StepAction::Proceed;
    }
    if was_pending {
        // The step that was just acknowledged lets exactly one command through
        return StepAction::Proceed;
    }

    let should_break = match debugger.gpu_step_state() {
        GpuStepState::Armed { flag, data } => match StepMode::from_flag(flag) {
            Some(StepMode::Command) => true,
            Some(StepMode::ToAddress) => address == data,
            Some(StepMode::NextList) => list_start,
            None => false,
        },
        GpuStepState::Disabled | GpuStepState::PendingRearm { .. } => false,
    };

    if should_break {
        StepAction::Break
    } else {
        StepAction::Proceed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunResult {
    Finished { executed: usize },
    /// Stopped before the command at `address`, which will be retried on the next run.
    Break { address: u32, executed: usize },
}

pub struct DisplayList {
    span: tracing::Span,
    base: u32,
    commands: Vec<u32>,
    pc: usize,
}

impl DisplayList {
    pub const MAX_COMMANDS: usize = 0x1000;
    const OPCODE_END: u8 = 0x0C;

    pub fn new(base: u32, commands: Vec<u32>) -> Self {
        Self {
            span: tracing::span!(tracing::Level::INFO, "display_list"),
            base,
            commands,
            pc: 0,
        }
    }

    /// Read little-endian command words up to and including the first END command.
    pub fn from_memory(memory: &[u8], base: u32) -> Self {
        let mut commands = Vec::new();
        for word in memory.chunks_exact(4).take(Self::MAX_COMMANDS) {
            let command = u32::from_le_bytes([word[0], word[1], word[2], word[3]]);
            commands.push(command);
            if Self::opcode(command) == Self::OPCODE_END {
                break;
            }
        }
        Self::new(base, commands)
    }

    const fn opcode(command: u32) -> u8 {
        (command >> 24) as u8
    }

    pub fn current_address(&self) -> u32 {
        self.base.wrapping_add((self.pc as u32).wrapping_mul(4))
    }

    /// Run until the end of the list or until the debugger asks for a break.
    #[tracing::instrument(skip(self, debugger), parent = &self.span)]
    pub fn run(&mut self, debugger: Option<&dyn GpuDebugger>) -> RunResult {
        let mut executed = 0;
        while let Some(&command) = self.commands.get(self.pc) {
            let address = self.current_address();
            if let Some(debugger) = debugger {
                if before_command(debugger, address, self.pc == 0) == StepAction::Break {
                    tracing::debug!("break before {:08X} at {:08X}", command, address);
                    return RunResult::Break { address, executed };
                }
            }

            tracing::trace!("{:08X}  {:08X}", address, command);
            self.pc += 1;
            executed += 1;
        }

        self.pc = 0;
        RunResult::Finished { executed }
    }
}
