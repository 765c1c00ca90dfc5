use super::{
    AluOp, Chip8, Chip8Error, Chip8Result, DISPLAY_SIZE, DISPLAY_X, FONT_GLYPH_SIZE,
    FONT_START_ADDRESS, Mode, Opcode, STACK_DEPTH,
};
use crate::u4;
use rand::Rng;

impl Chip8 {
    /// Executes a decoded instruction fetched from `address`.
    ///
    /// PC is advanced past the instruction before it runs, so jumps overwrite it,
    /// calls push the address of the following instruction, and skips add 2 more.
    pub(crate) fn execute(
        &mut self,
        opcode: Opcode,
        address: u16,
    ) -> Result<Chip8Result, Chip8Error> {
        self.pc = self.pc.wrapping_add(2);

        match opcode {
            Opcode::ClearDisplay => {
                self.display = [false; DISPLAY_SIZE];
                self.redraw = true;
                return Ok(Chip8Result::WaitForNextFrame);
            }
            Opcode::Jump { nnn } => {
                self.pc = nnn;
            }
            Opcode::JumpWithOffset { nnn } => {
                self.pc = nnn.wrapping_add(self.v[0].into());
            }
            Opcode::Call { nnn } => {
                if self.sp >= STACK_DEPTH {
                    return Err(Chip8Error::StackOverflow { address });
                }
                self.stack[self.sp] = self.pc;
                self.sp += 1;
                self.pc = nnn;
            }
            Opcode::Return => {
                if self.sp == 0 {
                    return Err(Chip8Error::StackUnderflow { address });
                }
                self.sp -= 1;
                self.pc = self.stack[self.sp];
            }
            Opcode::SkipRegEqualImm { x, nn } => {
                self.skip_if(self.v[x] == nn);
            }
            Opcode::SkipRegNotEqualImm { x, nn } => {
                self.skip_if(self.v[x] != nn);
            }
            Opcode::SkipRegEqualReg { x, y } => {
                self.skip_if(self.v[x] == self.v[y]);
            }
            Opcode::SkipRegNotEqualReg { x, y } => {
                self.skip_if(self.v[x] != self.v[y]);
            }
            Opcode::SetRegImm { x, nn } => {
                self.v[x] = nn;
            }
            Opcode::AddRegImm { x, nn } => {
                self.v[x] = self.v[x].wrapping_add(nn);
            }
            Opcode::Alu { x, y, op } => {
                self.execute_alu(x, y, op);
            }
            Opcode::Random { x, nn } => {
                let rand_byte: u8 = self.rng.random();
                self.v[x] = rand_byte & nn;
            }
            Opcode::SetIndexImm { nnn } => {
                self.i = nnn;
            }
            Opcode::AddIndexReg { x } => {
                self.i = self.i.wrapping_add(self.v[x].into());
            }
            Opcode::Draw { x, y, n } => {
                return self.execute_draw(x, y, n);
            }
            Opcode::SkipIfPressed { x } => {
                self.skip_if(self.keypad[u4::low(self.v[x])]);
            }
            Opcode::SkipIfNotPressed { x } => {
                self.skip_if(!self.keypad[u4::low(self.v[x])]);
            }
            Opcode::WaitForKey { x } => {
                return Ok(self.execute_wait_for_key(x));
            }
            Opcode::ReadDelayTimer { x } => {
                self.v[x] = self.delay_timer;
            }
            Opcode::SetDelayTimer { x } => {
                self.delay_timer = self.v[x];
            }
            Opcode::SetSoundTimer { x } => {
                self.sound_timer = self.v[x];
            }
            Opcode::FontChar { x } => {
                self.i = FONT_START_ADDRESS as u16 + self.v[x] as u16 * FONT_GLYPH_SIZE as u16;
            }
            Opcode::Bcd { x } => {
                let value = self.v[x];
                *self.mem_get(self.i)? = value / 100;
                *self.mem_get(self.i.wrapping_add(1))? = (value / 10) % 10;
                *self.mem_get(self.i.wrapping_add(2))? = value % 10;
            }
            Opcode::StoreRegs { x } => {
                for reg_index in 0..=usize::from(x) {
                    *self.mem_get(self.i.wrapping_add(reg_index as u16))? = self.v[reg_index];
                }
            }
            Opcode::LoadRegs { x } => {
                for reg_index in 0..=usize::from(x) {
                    self.v[reg_index] = *self.mem_get(self.i.wrapping_add(reg_index as u16))?;
                }
            }
            Opcode::Unknown(opcode) => {
                return Err(Chip8Error::UnknownOpcode { opcode, address });
            }
        };

        Ok(Chip8Result::Continue)
    }

    fn skip_if(&mut self, condition: bool) {
        if condition {
            self.pc = self.pc.wrapping_add(2);
        }
    }

    fn execute_alu(&mut self, x: u4, y: u4, op: AluOp) {
        match op {
            AluOp::Set => self.v[x] = self.v[y],
            AluOp::Or => self.v[x] |= self.v[y],
            AluOp::And => self.v[x] &= self.v[y],
            AluOp::Xor => self.v[x] ^= self.v[y],
            // VF is written before Vx, so with x = F the result wins
            AluOp::Add => {
                let (res, overflow) = self.v[x].overflowing_add(self.v[y]);
                self.v[0xF] = overflow as u8;
                self.v[x] = res;
            }
            AluOp::Sub => {
                let (res, borrow) = self.v[x].overflowing_sub(self.v[y]);
                self.v[0xF] = !borrow as u8;
                self.v[x] = res;
            }
            AluOp::SubReverse => {
                let (res, borrow) = self.v[y].overflowing_sub(self.v[x]);
                self.v[0xF] = !borrow as u8;
                self.v[x] = res;
            }
            AluOp::ShiftRight => {
                let (res, lsb) = (self.v[x] >> 1, self.v[x] & 1);
                self.v[0xF] = lsb;
                self.v[x] = res;
            }
            AluOp::ShiftLeft => {
                let (res, msb) = (self.v[x] << 1, self.v[x] >> 7);
                self.v[0xF] = msb;
                self.v[x] = res;
            }
        }
    }

    fn execute_draw(&mut self, x: u4, y: u4, n: u4) -> Result<Chip8Result, Chip8Error> {
        let x_pos = self.v[x] as usize;
        let y_pos = self.v[y] as usize;
        let height = usize::from(n);

        // Fetch the whole sprite first so a bad I leaves the screen untouched
        let mut sprite = [0u8; 15];
        for (row, byte) in sprite.iter_mut().take(height).enumerate() {
            *byte = *self.mem_get(self.i.wrapping_add(row as u16))?;
        }

        let mut any_erased = false;
        for (row, &sprite_byte) in sprite[..height].iter().enumerate() {
            for col in 0..8 {
                if (sprite_byte & (0x80 >> col)) != 0 {
                    // Columns past the right edge carry into the next row;
                    // anything past the last cell is skipped.
                    let pos = (x_pos + col) + (y_pos + row) * DISPLAY_X;
                    let Some(pixel) = self.display.get_mut(pos) else {
                        continue;
                    };

                    *pixel ^= true;
                    if !*pixel {
                        any_erased = true;
                    }
                }
            }
        }

        self.v[0xF] = any_erased as u8;
        self.redraw = true;
        Ok(Chip8Result::WaitForNextFrame)
    }

    fn execute_wait_for_key(&mut self, x: u4) -> Chip8Result {
        match self.keypad.iter().position(|&pressed| pressed) {
            Some(key) => {
                self.v[x] = key as u8;
                self.mode = Mode::Running;
                Chip8Result::Continue
            }
            None => {
                // Repeat this instruction on the next cycle
                self.pc = self.pc.wrapping_sub(2);
                self.mode = Mode::AwaitingKey { x };
                Chip8Result::WaitForNextFrame
            }
        }
    }
}
