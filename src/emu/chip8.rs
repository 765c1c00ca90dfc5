use rand::{SeedableRng, rngs::StdRng};

use super::{
    Chip8Error, Chip8Result, DISPLAY_SIZE, DISPLAY_X, DISPLAY_Y, FONT, FONT_END_ADDRESS,
    FONT_START_ADDRESS, Framebuffer, Mode, Opcode,
};
use crate::u4;

// Fixed by the CHIP-8 memory layout
pub const ROM_START_ADDRESS: usize = 0x200;
pub const MEMORY_SIZE: usize = 4096;
pub const STACK_DEPTH: usize = 16;
pub const MAX_PROGRAM_SIZE: usize = MEMORY_SIZE - ROM_START_ADDRESS;

/// CHIP-8 virtual machine state
pub struct Chip8 {
    /// 4KB memory array
    pub(crate) memory: [u8; MEMORY_SIZE],
    /// Display buffer: 64x32 monochrome pixels, row-major
    pub(crate) display: Framebuffer,

    /// Program counter: address of the next instruction to execute
    pub(crate) pc: u16,
    /// Index register: used for memory operations
    pub(crate) i: u16,
    /// General-purpose registers V0-VF (VF is used as a flag register)
    pub(crate) v: [u8; 16],
    /// Return addresses for subroutine calls
    pub(crate) stack: [u16; STACK_DEPTH],
    /// Number of occupied stack slots
    pub(crate) sp: usize,

    /// Delay timer: decrements once per cycle until it reaches 0
    pub(crate) delay_timer: u8,
    /// Sound timer: decrements once per cycle, raises a tone when it runs out
    pub(crate) sound_timer: u8,

    /// Keypad state: 16 keys mapped as booleans (true = pressed)
    pub(crate) keypad: [bool; 16],
    pub(crate) redraw: bool,
    pub(crate) tone: bool,
    pub(crate) mode: Mode,

    pub(crate) rng: StdRng,
}

impl Chip8 {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    /// Creates a machine whose `Cxnn` random source is seeded deterministically.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        let mut chip8 = Chip8 {
            memory: [0; MEMORY_SIZE],
            display: [false; DISPLAY_SIZE],
            pc: ROM_START_ADDRESS as u16,
            i: 0,
            v: [0; 16],
            stack: [0; STACK_DEPTH],
            sp: 0,
            delay_timer: 0,
            sound_timer: 0,
            keypad: [false; 16],
            redraw: false,
            tone: false,
            mode: Mode::Running,
            rng,
        };
        chip8.initialize();
        chip8
    }

    /// Resets all machine state and writes the font table.
    ///
    /// Any loaded program is erased along with the rest of memory.
    pub fn initialize(&mut self) {
        self.memory = [0; MEMORY_SIZE];
        self.memory[FONT_START_ADDRESS..FONT_END_ADDRESS].copy_from_slice(&FONT);
        self.display = [false; DISPLAY_SIZE];
        self.pc = ROM_START_ADDRESS as u16;
        self.i = 0;
        self.v = [0; 16];
        self.stack = [0; STACK_DEPTH];
        self.sp = 0;
        self.delay_timer = 0;
        self.sound_timer = 0;
        self.keypad = [false; 16];
        self.redraw = false;
        self.tone = false;
        self.mode = Mode::Running;

        log::debug!("machine initialized");
    }

    /// Copies a program into memory at 0x200.
    ///
    /// On error nothing is written.
    pub fn load_program(&mut self, program: &[u8]) -> Result<(), Chip8Error> {
        let program_end = ROM_START_ADDRESS + program.len();
        self.memory
            .get_mut(ROM_START_ADDRESS..program_end)
            .ok_or(Chip8Error::ProgramTooLarge {
                size: program.len(),
                max_size: MAX_PROGRAM_SIZE,
            })?
            .copy_from_slice(program);

        log::debug!("loaded {} byte program at {ROM_START_ADDRESS:#05X}", program.len());
        Ok(())
    }

    /// Executes a single cycle: fetch, decode, execute, then tick the timers.
    ///
    /// The timers tick even when the instruction fails. A fatal error halts the
    /// machine; `UnknownOpcode` skips the word and leaves it running.
    pub fn step(&mut self) -> Result<Chip8Result, Chip8Error> {
        if self.mode == Mode::Halted {
            return Err(Chip8Error::Halted);
        }

        let result = self.cpu_cycle();
        self.timers_cycle();

        if let Err(err) = &result {
            if err.is_fatal() {
                log::error!("halting: {err}");
                self.mode = Mode::Halted;
            } else {
                log::warn!("{err}");
            }
        }

        result
    }

    fn cpu_cycle(&mut self) -> Result<Chip8Result, Chip8Error> {
        let address = self.pc;
        let opcode = self.fetch()?;
        let decoded_opcode = Opcode::decode(opcode);
        log::trace!("{address:#05X}: {opcode:04X}  {decoded_opcode}");
        self.execute(decoded_opcode, address)
    }

    fn timers_cycle(&mut self) {
        self.delay_timer = self.delay_timer.saturating_sub(1);

        if self.sound_timer > 0 {
            if self.sound_timer == 1 {
                log::debug!("sound timer expired");
                self.tone = true;
            }
            self.sound_timer -= 1;
        }
    }

    /// Fetches the 16-bit big-endian opcode at PC.
    fn fetch(&mut self) -> Result<u16, Chip8Error> {
        let high = *self.mem_get(self.pc)?;
        let low = *self.mem_get(self.pc.wrapping_add(1))?;

        Ok(u16::from_be_bytes([high, low]))
    }

    /// Helper to get a mutable reference to a memory location with bounds checking.
    pub(crate) fn mem_get(&mut self, addr: u16) -> Result<&mut u8, Chip8Error> {
        self.memory
            .get_mut(addr as usize)
            .ok_or(Chip8Error::MemoryOutOfBounds { address: addr })
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.display
    }

    /// Get the state of a pixel on the display (true = on, false = off).
    pub fn pixel(&self, x: usize, y: usize) -> bool {
        x < DISPLAY_X && y < DISPLAY_Y && self.display[y * DISPLAY_X + x]
    }

    /// Returns whether the framebuffer changed since the last call, and clears the flag.
    pub fn consume_redraw_flag(&mut self) -> bool {
        std::mem::take(&mut self.redraw)
    }

    /// Returns whether the sound timer ran out since the last call, and clears the signal.
    pub fn pending_tone(&mut self) -> bool {
        std::mem::take(&mut self.tone)
    }

    /// Returns true while the sound timer is non-zero.
    pub fn is_sound_active(&self) -> bool {
        self.sound_timer > 0
    }

    /// Set the state of a key on the keypad.
    pub fn set_key(&mut self, key: u4, pressed: bool) {
        self.keypad[key] = pressed;
    }

    pub fn is_key_pressed(&self, key: u4) -> bool {
        self.keypad[key]
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn v(&self, reg: u4) -> u8 {
        self.v[reg]
    }

    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn index(&self) -> u16 {
        self.i
    }

    pub fn sp(&self) -> usize {
        self.sp
    }

    pub fn delay_timer(&self) -> u8 {
        self.delay_timer
    }

    pub fn sound_timer(&self) -> u8 {
        self.sound_timer
    }

    pub fn memory(&self) -> &[u8; MEMORY_SIZE] {
        &self.memory
    }
}

impl Default for Chip8 {
    fn default() -> Self {
        Self::new()
    }
}
