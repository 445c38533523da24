//! HD44780 controller behind a PCF8574 I2C port expander (4-bit mode).
//!
//! Expander pin map: P0 = RS, P2 = EN, P3 = backlight, P4..P7 = D4..D7.
//! Every byte goes out as two nibbles, each latched by an EN high→low edge,
//! so one byte is four expander writes:
//!
//! ```text
//!   [ hi|BL|RS|EN , hi|BL|RS , lo|BL|RS|EN , lo|BL|RS ]
//! ```

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::{error, info};

use super::Subcommand;
use crate::error::DisplayError;

/// 7-bit expander address.
pub const I2C_ADDRESS: u8 = 0x27;
pub const LCD_COLS: usize = 16;
pub const LCD_ROWS: usize = 2;

const ROW_OFFSETS: [u8; 4] = [0x00, 0x40, 0x14, 0x54];

const RS: u8 = 0x01;
const EN: u8 = 0x04;
const BACKLIGHT: u8 = 0x08;

// Instruction set
const CMD_CLEAR: u8 = 0x01;
const CMD_ENTRY_MODE: u8 = 0x04;
const CMD_DISPLAY_CONTROL: u8 = 0x08;
const CMD_FUNCTION_SET: u8 = 0x20;
const CMD_SET_DDRAM: u8 = 0x80;

const ENTRY_LEFT: u8 = 0x02;
const DISPLAY_ON: u8 = 0x04;
const TWO_LINE: u8 = 0x08;

/// Frame for one byte.  `data` selects the data register (RS high).
pub const fn frame(byte: u8, data: bool) -> [u8; 4] {
    let rs = if data { RS } else { 0 };
    let hi = (byte & 0xF0) | BACKLIGHT | rs;
    let lo = ((byte << 4) & 0xF0) | BACKLIGHT | rs;
    [hi | EN, hi, lo | EN, lo]
}

/// DDRAM address command for column 0 of `line`, clamped to the last row.
pub const fn move_to_command(line: u8) -> u8 {
    let row = if (line as usize) < LCD_ROWS {
        line as usize
    } else {
        LCD_ROWS - 1
    };
    CMD_SET_DDRAM | ROW_OFFSETS[row]
}

/// Encode a subcommand into its transfer frame.
pub const fn encode(sub: Subcommand) -> [u8; 4] {
    match sub {
        Subcommand::MoveTo(line) => frame(move_to_command(line), false),
        Subcommand::WriteChar(ch) => frame(ch, true),
    }
}

/// Blocking controller initialisation.
///
/// Runs before the pipeline is live, so it talks to the expander directly.
pub fn init<I: I2c, D: DelayNs>(i2c: &mut I, delay: &mut D, address: u8) -> Result<(), DisplayError> {
    let mut lcd = InitBus {
        i2c,
        delay,
        address,
    };
    let result = lcd.sequence();
    match result {
        Ok(()) => info!("lcd: initialised at 0x{address:02x}"),
        Err(e) => error!("lcd: init failed: {e}"),
    }
    result
}

struct InitBus<'a, I, D> {
    i2c: &'a mut I,
    delay: &'a mut D,
    address: u8,
}

impl<I: I2c, D: DelayNs> InitBus<'_, I, D> {
    fn sequence(&mut self) -> Result<(), DisplayError> {
        self.delay.delay_ms(50);

        // Force 8-bit mode three times, then switch to 4-bit.
        self.write_nibble(0x30, 0)?;
        self.delay.delay_ms(5);
        self.write_nibble(0x30, 0)?;
        self.delay.delay_ms(5);
        self.write_nibble(0x30, 0)?;
        self.delay.delay_us(150);
        self.write_nibble(0x20, 0)?;

        self.command(CMD_FUNCTION_SET | TWO_LINE)?;
        self.command(CMD_DISPLAY_CONTROL | DISPLAY_ON)?;
        self.command(CMD_ENTRY_MODE | ENTRY_LEFT)?;
        self.command(CMD_CLEAR)?;
        self.delay.delay_ms(2);
        Ok(())
    }

    fn command(&mut self, byte: u8) -> Result<(), DisplayError> {
        self.write_nibble(byte & 0xF0, 0)?;
        self.write_nibble((byte << 4) & 0xF0, 0)
    }

    fn write_nibble(&mut self, nibble: u8, rs: u8) -> Result<(), DisplayError> {
        let val = nibble | BACKLIGHT | rs;
        self.expander_write(val)?;
        self.expander_write(val | EN)?;
        self.delay.delay_us(2);
        self.expander_write(val)?;
        self.delay.delay_us(50);
        Ok(())
    }

    fn expander_write(&mut self, byte: u8) -> Result<(), DisplayError> {
        self.i2c
            .write(self.address, &[byte])
            .map_err(|_| DisplayError::BusFault)
    }
}
