/// State of execution. This is used to pause the emulation thread and to step it frame by frame.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StepState {
    pub paused: bool,
    pub step: bool,
}

impl StepState {
    pub fn step(&mut self) {
        self.step = true;
        self.paused = true;
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
        self.step = false;
    }
}
