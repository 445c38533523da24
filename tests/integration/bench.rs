//! Test bench: the real service, display pipeline and EEPROM driver wired
//! to the mock board, with the interrupts simulated after every tick.

use embassy_time::Instant;
use thermovac::Error;
use thermovac::app::commands::AppCommand;
use thermovac::app::service::AppService;
use thermovac::config::{ChamberConfig, RECORD_LEN};
use thermovac::display::hd44780::{self, I2C_ADDRESS};
use thermovac::display::sequencer::{self, LcdHandle, LcdPipeline, SharedLcd, with_lcd};
use thermovac::events::{Button, ButtonEvent};
use thermovac::process::{ProcessData, celsius_to_temp_raw, kpa_to_press_raw};
use thermovac::storage::{self, Eeprom, EepromHandle, SharedEeprom, with_eeprom};
use thermovac::tick::TickSource;

use super::mock_hw::{MockActuators, MockEepromBus, MockI2c, MockLcdBus, NoDelay, RecordingSink};

pub struct Bench {
    pub app: AppService,
    pub ticks: TickSource,
    pub hw: MockActuators,
    pub lcd: SharedLcd<MockLcdBus>,
    pub eeprom: SharedEeprom<MockEepromBus>,
    pub sink: RecordingSink,
    pub now_ms: u64,
    /// Deliver EEPROM write-complete interrupts after each tick.
    pub complete_writes: bool,
}

#[allow(dead_code)]
impl Bench {
    pub fn new() -> Self {
        Self::with_eeprom(MockEepromBus::default())
    }

    pub fn with_eeprom(bus: MockEepromBus) -> Self {
        Self {
            app: AppService::new(),
            ticks: TickSource::new(),
            hw: MockActuators::default(),
            lcd: sequencer::shared(LcdPipeline::new(MockLcdBus::default())),
            eeprom: storage::shared(Eeprom::new(bus)),
            sink: RecordingSink::default(),
            now_ms: 0,
            complete_writes: true,
        }
    }

    /// Bench whose EEPROM already holds `config`.
    pub fn with_config(config: &ChamberConfig) -> Self {
        let mut bus = MockEepromBus::default();
        bus.mem[..RECORD_LEN].copy_from_slice(&config.to_record());
        Self::with_eeprom(bus)
    }

    /// Boot at ambient conditions.
    pub fn booted() -> Self {
        let mut bench = Self::new();
        bench.sample(21, 101);
        bench.boot();
        bench
    }

    pub fn boot(&mut self) {
        self.app
            .boot(&mut EepromHandle(&self.eeprom), &mut self.hw, &mut self.sink);
    }

    pub fn sample(&mut self, celsius: u16, kpa: u16) {
        self.app.handle_command(AppCommand::Sample(ProcessData {
            temp_raw: celsius_to_temp_raw(celsius),
            press_raw: kpa_to_press_raw(kpa),
        }));
    }

    pub fn press(&mut self, button: Button) {
        self.app
            .handle_command(AppCommand::Button(ButtonEvent::pressed(button)));
        self.app
            .handle_command(AppCommand::Button(ButtonEvent::released(button)));
        self.run(120).unwrap();
    }

    pub fn enable(&mut self, on: bool) {
        self.app.handle_command(AppCommand::EnableSwitch(on));
        self.run(5).unwrap();
    }

    /// Advance `n` ticks.  Returns the first error, after running them all.
    pub fn run(&mut self, n: u32) -> Result<(), Error> {
        let mut first = Ok(());
        for _ in 0..n {
            if let Err(e) = self.tick() {
                if first.is_ok() {
                    first = Err(e);
                }
            }
        }
        first
    }

    pub fn tick(&mut self) -> Result<(), Error> {
        self.ticks.on_tick();
        self.now_ms += 1;
        let now = Instant::from_millis(self.now_ms);
        let result = self.app.run_pending(
            &self.ticks,
            now,
            &mut self.hw,
            &mut LcdHandle(&self.lcd),
            &mut EepromHandle(&self.eeprom),
            &mut self.sink,
        );
        self.drain_display();
        if self.complete_writes {
            with_eeprom(&self.eeprom, |e| {
                if std::mem::take(&mut e.bus_mut().write_pending) {
                    e.on_write_complete(now);
                }
            });
        }
        result
    }

    /// Let `n` ticks pile up, then serve them with a single call and no
    /// transfer completions in between, as a stalled main loop would.
    pub fn catch_up(&mut self, n: u32) -> Result<(), Error> {
        for _ in 0..n {
            self.ticks.on_tick();
        }
        self.now_ms += u64::from(n);
        self.app.run_pending(
            &self.ticks,
            Instant::from_millis(self.now_ms),
            &mut self.hw,
            &mut LcdHandle(&self.lcd),
            &mut EepromHandle(&self.eeprom),
            &mut self.sink,
        )
    }

    /// Deliver transfer-complete interrupts until the chain stops.
    pub fn drain_display(&mut self) {
        while with_lcd(&self.lcd, |p| p.bus_mut().complete_one()) {
            let _ = with_lcd(&self.lcd, |p| p.on_transfer_complete());
        }
    }

    /// Reset the pipeline and re-run the init sequence.
    pub fn reinit_display(&mut self) {
        with_lcd(&self.lcd, |p| p.reset());
        hd44780::init(&mut MockI2c::default(), &mut NoDelay, I2C_ADDRESS).unwrap();
    }

    pub fn lcd_row(&self, row: usize) -> String {
        with_lcd(&self.lcd, |p| p.bus().row(row))
    }
}
