//! Character display: screen model, command expansion and the transfer
//! pipeline.
//!
//! ```text
//!  move_to_line / write_string          one subcommand per transfer
//!  ─────────────────────────▶ [Subcommand; 64] ─────────────▶ DisplayBus
//!                                   ▲                             │
//!                                   └──── on_transfer_complete ◀──┘
//! ```
//!
//! * [`Screen`] is the 16x2 text buffer the tasks render into.
//! * [`sequencer::LcdPipeline`] expands commands into [`Subcommand`]s and
//!   feeds them to the bus one transfer at a time.
//! * [`hd44780`] holds the controller encoding and the blocking init.

pub mod hd44780;
pub mod sequencer;

use core::fmt::{self, Write};

pub use hd44780::{LCD_COLS, LCD_ROWS};

/// One unit of work for the sequencer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subcommand {
    /// Move the cursor to column 0 of `line`.
    MoveTo(u8),
    /// Write one glyph at the cursor.
    WriteChar(u8),
}

/// Map a Unicode character to the controller's A00 character ROM.
pub fn glyph(c: char) -> u8 {
    match c {
        '\u{b0}' => 0xDF,
        ' '..='}' => c as u8,
        _ => b'?',
    }
}

/// Render `text` as one padded display row.  Extra characters are cut.
pub fn lcd_row(text: &str) -> [u8; LCD_COLS] {
    let mut row = [b' '; LCD_COLS];
    for (slot, c) in row.iter_mut().zip(text.chars()) {
        *slot = glyph(c);
    }
    row
}

/// Two rows of glyphs, always space padded to the full width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Screen {
    rows: [[u8; LCD_COLS]; LCD_ROWS],
}

impl Default for Screen {
    fn default() -> Self {
        Self::blank()
    }
}

impl Screen {
    pub const fn blank() -> Self {
        Self {
            rows: [[b' '; LCD_COLS]; LCD_ROWS],
        }
    }

    /// Replace `row` with formatted text, truncated and padded.
    pub fn set_row(&mut self, row: usize, args: fmt::Arguments<'_>) {
        let Some(dst) = self.rows.get_mut(row) else {
            return;
        };
        *dst = [b' '; LCD_COLS];
        let mut writer = RowWriter { row: dst, col: 0 };
        // RowWriter never fails; overflow is truncated.
        let _ = writer.write_fmt(args);
    }

    pub fn set_text(&mut self, row: usize, text: &str) {
        if let Some(dst) = self.rows.get_mut(row) {
            *dst = lcd_row(text);
        }
    }

    pub fn row(&self, row: usize) -> &[u8; LCD_COLS] {
        &self.rows[row.min(LCD_ROWS - 1)]
    }

    /// Readable copy of a row.
    #[cfg(test)]
    pub fn row_text(&self, row: usize) -> heapless::String<{ LCD_COLS * 2 }> {
        let mut out = heapless::String::new();
        for &b in self.row(row) {
            let c = if b == 0xDF { '\u{b0}' } else { b as char };
            let _ = out.push(c);
        }
        out
    }
}

struct RowWriter<'a> {
    row: &'a mut [u8; LCD_COLS],
    col: usize,
}

impl Write for RowWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for c in s.chars() {
            if self.col >= LCD_COLS {
                break;
            }
            self.row[self.col] = glyph(c);
            self.col += 1;
        }
        Ok(())
    }
}
