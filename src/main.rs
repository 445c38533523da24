//! ThermoVac host simulator.
//!
//! Runs the controller core against a simulated board:
//!
//! ```text
//!  tick thread ──(1 ms)──▶ TickSource
//!
//!  main loop:  script ─▶ AppService::run_pending ─▶ GpioActuators ─▶ SimPin ─▶ SimPlant
//!                              │             │
//!                          LcdHandle    EepromHandle
//!                              ▼             ▼
//!                        LcdPipeline ⇄ SimLcdBus     (completion each loop)
//!                             Eeprom ⇄ SimEepromBus  (completion each loop)
//! ```
//!
//! Usage: `thermovac-sim [SECONDS] [--no-eeprom]`.  Log level comes from
//! `THERMOVAC_LOG` (default `info`).

use std::cell::Cell;
use std::convert::Infallible;
use std::io::Write as _;
use std::rc::Rc;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration as StdDuration;

use anyhow::{Context, Result, bail};
use embassy_time::{Duration, Instant};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, OutputPin};
use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, Operation};
use log::{LevelFilter, Log, Metadata, Record, info, warn};

use thermovac::RecoveryAction;
use thermovac::adapters::hardware::{ActuatorPins, GpioActuators};
use thermovac::adapters::log_sink::LogEventSink;
use thermovac::app::commands::AppCommand;
use thermovac::app::ports::{DisplayBus, EepromBus};
use thermovac::app::service::AppService;
use thermovac::config::timing;
use thermovac::display::hd44780::{self, I2C_ADDRESS};
use thermovac::display::sequencer::{self, LcdHandle, LcdPipeline, with_lcd};
use thermovac::display::{LCD_COLS, LCD_ROWS};
use thermovac::error::{DisplayError, StorageError};
use thermovac::events::{Button, ButtonEvent};
use thermovac::process::{ADC_MAX, PRESS_FULL_SCALE_KPA, ProcessData, TEMP_FULL_SCALE_C};
use thermovac::storage::{self, Eeprom, EepromHandle, MAX_ADDRESS, READ_TIMEOUT, with_eeprom};
use thermovac::tick::TickSource;

// ── Logger ────────────────────────────────────────────────────

struct StderrLogger {
    start: std::time::Instant,
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if self.enabled(record.metadata()) {
            let t = self.start.elapsed();
            let _ = writeln!(
                std::io::stderr(),
                "[{:>5}.{:03}] {:<5} {}",
                t.as_secs(),
                t.subsec_millis(),
                record.level(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

fn init_logging() -> Result<()> {
    let level = match std::env::var("THERMOVAC_LOG") {
        Ok(v) => LevelFilter::from_str(&v).with_context(|| format!("bad THERMOVAC_LOG '{v}'"))?,
        Err(_) => LevelFilter::Info,
    };
    let logger = Box::leak(Box::new(StderrLogger {
        start: std::time::Instant::now(),
    }));
    log::set_logger(logger).map_err(|e| anyhow::anyhow!("logger: {e}"))?;
    log::set_max_level(level);
    Ok(())
}

// ── Simulated plant ───────────────────────────────────────────

/// Output line shared between the GPIO adapter and the plant model.
#[derive(Clone, Default)]
struct SimPin(Rc<Cell<bool>>);

impl SimPin {
    fn is_high(&self) -> bool {
        self.0.get()
    }
}

impl digital::ErrorType for SimPin {
    type Error = Infallible;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.0.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.0.set(true);
        Ok(())
    }
}

type SimActuators = GpioActuators<SimPin, SimPin, SimPin, SimPin, SimPin>;

/// First-order chamber model.  The output pins pull the values towards
/// their targets; with everything off both drift back to ambient.
struct SimPlant {
    temp_c: f32,
    press_kpa: f32,
    pins: ActuatorPins<SimPin, SimPin, SimPin, SimPin, SimPin>,
}

impl SimPlant {
    const AMBIENT_C: f32 = 21.0;
    const ATMOSPHERE_KPA: f32 = 101.0;

    fn new() -> Self {
        Self {
            temp_c: Self::AMBIENT_C,
            press_kpa: Self::ATMOSPHERE_KPA,
            pins: ActuatorPins {
                heater: SimPin::default(),
                cooler: SimPin::default(),
                vacuum_pump: SimPin::default(),
                vent_valve: SimPin::default(),
                beacon: SimPin::default(),
            },
        }
    }

    /// GPIO adapter wired to this plant's output lines.
    fn actuators(&self) -> SimActuators {
        GpioActuators::new(ActuatorPins {
            heater: self.pins.heater.clone(),
            cooler: self.pins.cooler.clone(),
            vacuum_pump: self.pins.vacuum_pump.clone(),
            vent_valve: self.pins.vent_valve.clone(),
            beacon: self.pins.beacon.clone(),
        })
    }

    fn step(&mut self, dt_s: f32) {
        let t_target = match (self.pins.heater.is_high(), self.pins.cooler.is_high()) {
            (true, false) => 90.0,
            (false, true) => 0.0,
            _ => Self::AMBIENT_C,
        };
        self.temp_c += (t_target - self.temp_c) * 0.05 * dt_s;

        let p_target = if self.pins.vacuum_pump.is_high() {
            0.0
        } else if self.pins.vent_valve.is_high() {
            Self::ATMOSPHERE_KPA + 8.0
        } else {
            self.press_kpa
        };
        self.press_kpa += (p_target - self.press_kpa) * 0.1 * dt_s;
    }

    fn sample(&self) -> ProcessData {
        let raw = |v: f32, full_scale: u32| {
            (v.max(0.0) * ADC_MAX as f32 / full_scale as f32).min(ADC_MAX as f32) as u16
        };
        ProcessData {
            temp_raw: raw(self.temp_c, TEMP_FULL_SCALE_C),
            press_raw: raw(self.press_kpa, PRESS_FULL_SCALE_KPA),
        }
    }
}

// ── Simulated display ─────────────────────────────────────────

/// Expander transport.  Frames are decoded into a framebuffer the way the
/// controller would latch them; completion is signalled by the main loop.
struct SimLcdBus {
    in_flight: Option<[u8; 4]>,
    framebuffer: [[u8; LCD_COLS]; LCD_ROWS],
    cursor: (usize, usize),
}

impl SimLcdBus {
    fn new() -> Self {
        Self {
            in_flight: None,
            framebuffer: [[b' '; LCD_COLS]; LCD_ROWS],
            cursor: (0, 0),
        }
    }

    /// Latch the in-flight frame.  Returns `false` if nothing was in flight.
    fn complete(&mut self) -> bool {
        let Some(frame) = self.in_flight.take() else {
            return false;
        };
        let byte = (frame[0] & 0xF0) | (frame[2] >> 4);
        let data = frame[0] & 0x01 != 0;
        if data {
            let (row, col) = self.cursor;
            if col < LCD_COLS {
                self.framebuffer[row][col] = byte;
            }
            self.cursor.1 += 1;
        } else if byte & 0x80 != 0 {
            let row = usize::from(byte & 0x40 != 0);
            self.cursor = (row, 0);
        }
        true
    }

    fn text(&self) -> String {
        self.framebuffer
            .iter()
            .map(|row| {
                row.iter()
                    .map(|&b| if b == 0xDF { '\u{b0}' } else { b as char })
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

impl DisplayBus for SimLcdBus {
    fn start_transfer(&mut self, frame: [u8; 4]) -> Result<(), DisplayError> {
        if self.in_flight.is_some() {
            return Err(DisplayError::BusFault);
        }
        self.in_flight = Some(frame);
        Ok(())
    }
}

/// Blocking I2C used only by the init sequence.
struct SimI2c;

impl ErrorType for SimI2c {
    type Error = ErrorKind;
}

impl I2c for SimI2c {
    fn transaction(&mut self, address: u8, _ops: &mut [Operation<'_>]) -> Result<(), ErrorKind> {
        if address == I2C_ADDRESS {
            Ok(())
        } else {
            Err(ErrorKind::NoAcknowledge(
                embedded_hal::i2c::NoAcknowledgeSource::Address,
            ))
        }
    }
}

struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(StdDuration::from_nanos(u64::from(ns)));
    }
}

// ── Simulated EEPROM ──────────────────────────────────────────

struct SimEepromBus {
    mem: Vec<u8>,
    responsive: bool,
    write_pending: bool,
}

impl SimEepromBus {
    fn new(responsive: bool) -> Self {
        Self {
            mem: vec![0xFF; MAX_ADDRESS as usize + 1],
            responsive,
            write_pending: false,
        }
    }
}

impl EepromBus for SimEepromBus {
    fn start_write(&mut self, address: u16, data: &[u8]) -> Result<(), StorageError> {
        if !self.responsive {
            return Err(StorageError::Bus);
        }
        let start = usize::from(address);
        self.mem[start..start + data.len()].copy_from_slice(data);
        self.write_pending = true;
        Ok(())
    }

    fn read(&mut self, address: u16, buf: &mut [u8]) -> Result<(), StorageError> {
        let deadline = std::time::Instant::now() + StdDuration::from_millis(READ_TIMEOUT.as_millis());
        while !self.responsive {
            if std::time::Instant::now() >= deadline {
                return Err(StorageError::Timeout);
            }
            std::thread::sleep(StdDuration::from_millis(10));
        }
        let start = usize::from(address);
        buf.copy_from_slice(&self.mem[start..start + buf.len()]);
        Ok(())
    }
}

/// Beacon half-period.
const BLINK_PERIOD_MS: u64 = 250;

// ── Scripted operator ─────────────────────────────────────────

/// Front-panel actions, by simulated millisecond.
fn script() -> Vec<(u64, AppCommand)> {
    let press = |b| AppCommand::Button(ButtonEvent::pressed(b));
    let release = |b| AppCommand::Button(ButtonEvent::released(b));
    vec![
        // Raise the temperature setpoint by five degrees and save.
        (500, press(Button::Enter)),
        (550, release(Button::Enter)),
        (700, press(Button::Enter)),
        (900, press(Button::Enter)),
        (1_100, press(Button::Next)),
        (1_200, press(Button::Next)),
        (1_300, press(Button::Next)),
        (1_400, press(Button::Next)),
        (1_500, press(Button::Next)),
        (1_600, press(Button::Enter)),
        (1_800, press(Button::Escape)),
        (2_000, press(Button::Escape)),
        // Back to the status screen, then switch the chamber on.
        (2_500, press(Button::Escape)),
        (3_000, AppCommand::EnableSwitch(true)),
    ]
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    init_logging()?;

    let mut seconds = 10u64;
    let mut eeprom_present = true;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--no-eeprom" => eeprom_present = false,
            s => seconds = s.parse().with_context(|| format!("bad duration '{s}'"))?,
        }
    }
    if seconds == 0 {
        bail!("duration must be at least one second");
    }

    info!("ThermoVac simulator v{}", env!("CARGO_PKG_VERSION"));

    // ── Peripherals ───────────────────────────────────────────
    let mut i2c = SimI2c;
    let mut delay = StdDelay;
    hd44780::init(&mut i2c, &mut delay, I2C_ADDRESS).context("display init")?;
    let lcd = sequencer::shared(LcdPipeline::new(SimLcdBus::new()));
    let eeprom = storage::shared(Eeprom::new(SimEepromBus::new(eeprom_present)));

    let mut plant = SimPlant::new();
    let mut outputs = plant.actuators();
    let mut sink = LogEventSink::new();
    let mut app = AppService::new();
    app.handle_command(AppCommand::Sample(plant.sample()));
    app.boot(&mut EepromHandle(&eeprom), &mut outputs, &mut sink);

    // ── Tick interrupt ────────────────────────────────────────
    let ticks = Arc::new(TickSource::new());
    let running = Arc::new(AtomicBool::new(true));
    let tick_thread = {
        let ticks = Arc::clone(&ticks);
        let running = Arc::clone(&running);
        std::thread::spawn(move || {
            let period = StdDuration::from_millis(u64::from(timing::TICK_PERIOD_MS));
            while running.load(Ordering::Acquire) {
                std::thread::sleep(period);
                ticks.on_tick();
            }
        })
    };

    // ── Main loop ─────────────────────────────────────────────
    let start = Instant::now();
    let end = start + Duration::from_secs(seconds);
    let mut script = script().into_iter().peekable();
    let mut last_sample = start;
    let mut last_blink = start;
    let mut was_blinking = false;
    let mut last_screen = String::new();

    while Instant::now() < end {
        let now = Instant::now();
        let elapsed_ms = (now - start).as_millis();

        while let Some((at, cmd)) = script.next_if(|(at, _)| *at <= elapsed_ms) {
            info!("sim: t={at}ms {cmd:?}");
            if !app.handle_command(cmd) {
                warn!("sim: input dropped");
            }
        }

        if now - last_sample >= Duration::from_millis(10) {
            plant.step((now - last_sample).as_micros() as f32 / 1e6);
            app.handle_command(AppCommand::Sample(plant.sample()));
            last_sample = now;
        }

        let result = app.run_pending(
            &ticks,
            now,
            &mut outputs,
            &mut LcdHandle(&lcd),
            &mut EepromHandle(&eeprom),
            &mut sink,
        );
        if let Err(e) = result {
            match e.recovery() {
                RecoveryAction::ReinitDisplay => {
                    warn!("sim: {e}, re-initialising display");
                    with_lcd(&lcd, |p| p.reset());
                    hd44780::init(&mut i2c, &mut delay, I2C_ADDRESS).context("display re-init")?;
                }
                RecoveryAction::RetryLater | RecoveryAction::Ignore => warn!("sim: {e}"),
            }
        }

        // Transfer-complete interrupts.
        while with_lcd(&lcd, |p| p.bus_mut().complete()) {
            if let Err(e) = with_lcd(&lcd, |p| p.on_transfer_complete()) {
                warn!("sim: display chain stopped: {e}");
                break;
            }
        }
        with_eeprom(&eeprom, |e| {
            if std::mem::take(&mut e.bus_mut().write_pending) {
                e.on_write_complete(now);
            }
        });

        // Beacon blink timer.
        if now - last_blink >= Duration::from_millis(BLINK_PERIOD_MS) {
            outputs.on_blink_tick();
            last_blink = now;
        }
        if outputs.is_blinking() != was_blinking {
            was_blinking = outputs.is_blinking();
            info!("sim: beacon {}", if was_blinking { "BLINKING" } else { "off" });
        }

        let screen = with_lcd(&lcd, |p| p.bus().text());
        if screen != last_screen {
            info!("lcd: [{screen}]");
            last_screen = screen;
        }

        std::thread::sleep(StdDuration::from_millis(1));
    }

    running.store(false, Ordering::Release);
    tick_thread
        .join()
        .map_err(|_| anyhow::anyhow!("tick thread panicked"))?;

    let drops = app.queue_drops();
    info!(
        "sim: done, T={:.1}C P={:.1}kPa mode={:?} config={:?} drops={} refused saves={}",
        plant.temp_c,
        plant.press_kpa,
        app.mode(),
        app.config(),
        drops.total(),
        app.saves_failed()
    );
    Ok(())
}
