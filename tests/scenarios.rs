//! Whole-program scenarios driven only through the public API
use chip8_interp::*;

fn boot(program: &[u8]) -> Chip8 {
    let mut chip8 = Chip8::with_seed(1);
    chip8.load_program(program).expect("program fits in memory");
    chip8
}

#[test]
fn add_two_registers() {
    let mut chip8 = boot(&[0x60, 0x0A, 0x61, 0x05, 0x80, 0x14]);
    for _ in 0..3 {
        assert_eq!(chip8.step(), Ok(Chip8Result::Continue));
    }
    assert_eq!(chip8.v(u4::new(0)), 15);
    assert_eq!(chip8.v(u4::new(0xF)), 0);
    assert_eq!(chip8.pc(), 0x206);
}

#[test]
fn draw_font_glyph_zero() {
    let mut program = vec![0xA2, 0x10, 0xD0, 0x05];
    program.resize(0x10, 0);
    program.extend_from_slice(&FONT[..5]);
    let mut chip8 = boot(&program);

    chip8.step().unwrap();
    assert_eq!(chip8.step(), Ok(Chip8Result::WaitForNextFrame));
    assert!(chip8.consume_redraw_flag());

    let expected = [
        "####", //
        "#..#", //
        "#..#", //
        "#..#", //
        "####", //
    ];
    for (y, row) in expected.iter().enumerate() {
        for (x, cell) in row.chars().enumerate() {
            assert_eq!(chip8.pixel(x, y), cell == '#', "pixel ({x}, {y})");
        }
        // Nothing to the right of the glyph in its 8-pixel sprite row
        for x in 4..8 {
            assert!(!chip8.framebuffer()[y * DISPLAY_X + x]);
        }
    }
    let lit = chip8.framebuffer().iter().filter(|&&p| p).count();
    assert_eq!(lit, 14);
}

#[test]
fn runaway_recursion_overflows_stack() {
    // 0x200: CALL 0x200
    let mut chip8 = boot(&[0x22, 0x00]);
    for _ in 0..16 {
        chip8.step().unwrap();
    }
    let err = chip8.step().unwrap_err();
    assert_eq!(err, Chip8Error::StackOverflow { address: 0x200 });
    assert!(err.is_fatal());
    assert_eq!(chip8.mode(), Mode::Halted);
}

#[test]
fn unknown_opcode_is_reported_and_skipped() {
    // FFFF, LD V2, 0x33
    let mut chip8 = boot(&[0xFF, 0xFF, 0x62, 0x33]);
    let err = chip8.step().unwrap_err();
    assert_eq!(
        err,
        Chip8Error::UnknownOpcode {
            opcode: 0xFFFF,
            address: 0x200
        }
    );
    assert!(!err.is_fatal());
    assert_eq!(err.to_string(), "unknown opcode 0xFFFF at 0x200");

    chip8.step().unwrap();
    assert_eq!(chip8.v(u4::new(2)), 0x33);
}

#[test]
fn countdown_loop_with_key_wait() {
    // 0x200: LD V0, K
    // 0x202: LD V1, 3
    // 0x204: ADD V1, 0xFF   (decrement)
    // 0x206: SE V1, 0
    // 0x208: JP 0x204
    // 0x20A: JP 0x20A
    let program = [
        0xF0, 0x0A, 0x61, 0x03, 0x71, 0xFF, 0x31, 0x00, 0x12, 0x04, 0x12, 0x0A,
    ];
    let mut chip8 = boot(&program);

    chip8.step().unwrap();
    assert!(matches!(chip8.mode(), Mode::AwaitingKey { .. }));

    chip8.set_key(u4::new(0xB), true);
    chip8.step().unwrap();
    chip8.set_key(u4::new(0xB), false);
    assert_eq!(chip8.v(u4::new(0)), 0xB);
    assert_eq!(chip8.mode(), Mode::Running);

    while chip8.pc() != 0x20A {
        chip8.step().unwrap();
    }
    assert_eq!(chip8.v(u4::new(1)), 0);
}

#[test]
fn runner_drives_program_to_completion() {
    // LD V0, 5; LD ST, V0; CLS; JP 0x206
    let mut chip8 = Chip8::with_seed(2);
    chip8
        .load_program(&[0x60, 0x05, 0xF0, 0x18, 0x00, 0xE0, 0x12, 0x06])
        .unwrap();
    let mut runner = Chip8Runner::new(chip8, RunnerConfig::default());

    let first = runner.update(0.5).unwrap();
    assert!(first.redraw);
    assert!(!first.tone);

    let second = runner.update(0.5).unwrap();
    assert!(!second.redraw);
    assert!(second.tone);
    assert_eq!(runner.chip8().pc(), 0x206);
}

#[test]
fn key_index_must_be_a_nibble() {
    assert!(u4::try_from(0x0Fu8).is_ok());
    assert_eq!(u4::try_from(0x10u8), Err(NibbleOutOfRange(0x10)));
}
