use super::{Chip8, Chip8Error, Chip8Result, Framebuffer};
use crate::u4;

pub const DEFAULT_CYCLES_PER_SECOND: u32 = 500;

/// Pacing settings for [`Chip8Runner`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunnerConfig {
    /// How many `step()` calls to run per second of elapsed time.
    /// Timers tick once per step, so this also sets the timer rate.
    pub cycles_per_second: u32,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            cycles_per_second: DEFAULT_CYCLES_PER_SECOND,
        }
    }
}

/// Signals collected while running the steps of one `update` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameReport {
    /// The framebuffer changed and should be repainted.
    pub redraw: bool,
    /// The sound timer ran out at least once.
    pub tone: bool,
}

/// High-level emulator runner that paces CPU cycles against elapsed time.
pub struct Chip8Runner {
    chip8: Chip8,
    time_step: f32,
    cpu_dt_accumulator: f32,
}

impl Chip8Runner {
    pub fn new(chip8: Chip8, config: RunnerConfig) -> Self {
        Self {
            chip8,
            time_step: 1.0 / config.cycles_per_second.max(1) as f32,
            cpu_dt_accumulator: 0.0,
        }
    }

    /// Update emulator by delta time.
    ///
    /// Runs as many CPU cycles as are due for the elapsed time `dt`.
    /// Stops early once a frame has to be rendered before the next cycle.
    /// Unknown opcodes are logged and skipped; fatal errors are returned.
    pub fn update(&mut self, dt: f32) -> Result<FrameReport, Chip8Error> {
        self.cpu_dt_accumulator += dt;

        let mut report = FrameReport::default();
        while self.cpu_dt_accumulator >= self.time_step {
            self.cpu_dt_accumulator -= self.time_step;

            let result = self.chip8.step();
            report.redraw |= self.chip8.consume_redraw_flag();
            report.tone |= self.chip8.pending_tone();

            match result {
                Ok(Chip8Result::Continue) => {}
                Ok(Chip8Result::WaitForNextFrame) => {
                    // We clear the accumulator to avoid "catching up" in the next frame.
                    self.cpu_dt_accumulator = 0.0;
                    break;
                }
                Err(err) if !err.is_fatal() => {}
                Err(err) => return Err(err),
            }
        }

        Ok(report)
    }

    /// Set the state of a key on the keypad.
    pub fn set_key(&mut self, key: u4, pressed: bool) {
        self.chip8.set_key(key, pressed)
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        self.chip8.framebuffer()
    }

    pub fn chip8(&self) -> &Chip8 {
        &self.chip8
    }

    pub fn chip8_mut(&mut self) -> &mut Chip8 {
        &mut self.chip8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runner(program: &[u8], cycles_per_second: u32) -> Chip8Runner {
        let mut chip8 = Chip8::with_seed(0);
        chip8.load_program(program).unwrap();
        Chip8Runner::new(chip8, RunnerConfig { cycles_per_second })
    }

    #[test]
    fn runs_due_cycles_only() {
        // 6001 7001 7001 ... : V0 = 1 then keep incrementing
        let mut program = vec![0x60, 0x01];
        for _ in 0..20 {
            program.extend_from_slice(&[0x70, 0x01]);
        }
        let mut runner = runner(&program, 100);

        runner.update(0.005).unwrap();
        assert_eq!(runner.chip8().pc(), 0x200);

        runner.update(0.1).unwrap();
        // 0.105s at 100Hz is 10 cycles, allow for float rounding
        let executed = (runner.chip8().pc() - 0x200) / 2;
        assert!((9..=10).contains(&executed), "executed {executed}");
    }

    #[test]
    fn stops_at_draw_and_reports_redraw() {
        // A000 D001 1202
        let mut runner = runner(&[0xA0, 0x00, 0xD0, 0x01, 0x12, 0x02], 1000);
        let report = runner.update(1.0).unwrap();
        assert!(report.redraw);
        assert_eq!(runner.chip8().pc(), 0x204);
        assert!(!runner.chip8_mut().consume_redraw_flag());
        // Top row of glyph "0" is 0xF0
        assert_eq!(&runner.framebuffer()[..5], &[true, true, true, true, false]);
    }

    #[test]
    fn skips_unknown_opcodes() {
        // FFFF 6007 1204
        let mut runner = runner(&[0xFF, 0xFF, 0x60, 0x07, 0x12, 0x04], 1000);
        runner.update(0.01).unwrap();
        assert_eq!(runner.chip8().v(u4::new(0)), 7);
    }

    #[test]
    fn propagates_fatal_errors() {
        // 00EE with an empty stack
        let mut runner = runner(&[0x00, 0xEE], 1000);
        let err = runner.update(0.01).unwrap_err();
        assert_eq!(err, Chip8Error::StackUnderflow { address: 0x200 });
    }

    #[test]
    fn reports_tone() {
        // 6002 F018 1204
        let mut runner = runner(&[0x60, 0x02, 0xF0, 0x18, 0x12, 0x04], 1000);
        let report = runner.update(0.01).unwrap();
        assert!(report.tone);
    }
}
