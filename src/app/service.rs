//! Application service: the cooperative scheduler core.
//!
//! [`AppService`] owns the four task FSMs and the shared blackboard.  The
//! main loop calls [`AppService::run_pending`] whenever it likes; each call
//! drains every task's pending ticks in a fixed order and applies what the
//! passes asked for through the port traits.
//!
//! ```text
//!  TickSource ──▶ ┌──────────────────────────────────┐ ──▶ ActuatorPort
//!  AppCommand ──▶ │            AppService            │ ──▶ TextDisplay
//!                 │ temperature · pressure · system  │ ──▶ ConfigPort
//!                 │              · menu              │ ──▶ EventSink
//!                 └──────────────────────────────────┘
//! ```

use embassy_time::Instant;
use log::{error, info, warn};

use crate::config::ChamberConfig;
use crate::control::Drive;
use crate::control::pressure::{PressState, PressureControl};
use crate::control::temperature::{TempState, TemperatureControl};
use crate::display::Screen;
use crate::error::Error;
use crate::events::{ControlEvent, SystemEvent};
use crate::menu::{MenuState, MenuTask};
use crate::process::SharedData;
use crate::system::{SystemMode, SystemTask};
use crate::tick::{Task, TickSource};

use super::commands::AppCommand;
use super::events::{AppEvent, Plant};
use super::ports::{ActuatorPort, ConfigPort, EventSink, TextDisplay};

/// Events discarded by each task queue since boot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueDrops {
    pub temperature: u32,
    pub pressure: u32,
    pub system: u32,
    pub menu: u32,
}

impl QueueDrops {
    pub fn total(&self) -> u32 {
        self.temperature
            .saturating_add(self.pressure)
            .saturating_add(self.system)
            .saturating_add(self.menu)
    }
}

/// Outputs last written to the actuators, so commands go out on change only.
#[derive(Debug, Default)]
struct Applied {
    temperature: Drive,
    pressure: Drive,
    blink: bool,
}

pub struct AppService {
    shared: SharedData,
    temperature: TemperatureControl,
    pressure: PressureControl,
    system: SystemTask,
    menu: MenuTask,
    applied: Applied,
    saves_failed: u32,
}

impl Default for AppService {
    fn default() -> Self {
        Self::new()
    }
}

impl AppService {
    /// Construct the service.  Nothing runs until [`boot`](Self::boot).
    pub fn new() -> Self {
        Self {
            shared: SharedData::default(),
            temperature: TemperatureControl::new(),
            pressure: PressureControl::new(),
            system: SystemTask::new(),
            menu: MenuTask::new(),
            applied: Applied::default(),
            saves_failed: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Load the configuration, put the plant in its safe state and start
    /// every FSM in its initial state.
    ///
    /// A failed load is not fatal: the controller runs on the defaults.
    pub fn boot(
        &mut self,
        store: &mut impl ConfigPort,
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) {
        hw.all_off();
        self.applied = Applied::default();

        self.shared.config = match store.load() {
            Ok(config) => config,
            Err(e) => {
                warn!("boot: config load failed ({e}), using defaults");
                ChamberConfig::default()
            }
        };

        self.temperature.start();
        self.pressure.start();
        self.system.start();
        self.menu.start();

        info!("boot: controller up, config {:?}", self.shared.config);
        sink.emit(&AppEvent::Started(self.shared.config));
    }

    // ── Inputs ────────────────────────────────────────────────

    /// Accept an input from a collaborator.  Returns `false` if the event
    /// was dropped because the system queue was full.
    pub fn handle_command(&mut self, cmd: AppCommand) -> bool {
        match cmd {
            AppCommand::Button(edge) => self.system.put(SystemEvent::Button(edge)),
            AppCommand::EnableSwitch(true) => self.system.put(SystemEvent::EnableActive),
            AppCommand::EnableSwitch(false) => self.system.put(SystemEvent::EnableIdle),
            AppCommand::Sample(process) => {
                self.shared.process = process;
                true
            }
        }
    }

    // ── Scheduling ────────────────────────────────────────────

    /// Drain every task's pending ticks, in order temperature, pressure,
    /// system, menu.  One pass runs per pending tick.
    ///
    /// Passes only say what they want on screen; the newest screen is sent
    /// to the display once, after every task has run.  A backlog of ticks
    /// therefore costs one screen of subcommands, not one per pass.
    ///
    /// A display failure does not stop the tasks.  It is returned at the
    /// end; its [`Error::recovery`] tells the caller to re-initialise the
    /// display.
    pub fn run_pending(
        &mut self,
        ticks: &TickSource,
        now: Instant,
        hw: &mut impl ActuatorPort,
        display: &mut impl TextDisplay,
        store: &mut impl ConfigPort,
        sink: &mut impl EventSink,
    ) -> Result<(), Error> {
        let mut latest = None;

        ticks
            .counter(Task::Temperature)
            .run_pending(|| self.temperature_pass(hw, sink));
        ticks
            .counter(Task::Pressure)
            .run_pending(|| self.pressure_pass(hw, sink));
        ticks.counter(Task::System).run_pending(|| {
            if let Some(screen) = self.system_pass(hw, sink) {
                latest = Some(screen);
            }
        });
        ticks.counter(Task::Menu).run_pending(|| {
            if let Some(screen) = self.menu_pass(now, store, sink) {
                latest = Some(screen);
            }
        });

        match latest {
            Some(screen) => render(display, &screen, sink),
            None => Ok(()),
        }
    }

    fn temperature_pass(&mut self, hw: &mut impl ActuatorPort, sink: &mut impl EventSink) {
        self.temperature.pass(&self.shared);
        let drive = self.temperature.drive();
        if drive != self.applied.temperature {
            self.applied.temperature = drive;
            hw.set_heater(drive == Drive::Raise);
            hw.set_cooler(drive == Drive::Lower);
            sink.emit(&AppEvent::DriveChanged {
                plant: Plant::Temperature,
                drive,
            });
        }
    }

    fn pressure_pass(&mut self, hw: &mut impl ActuatorPort, sink: &mut impl EventSink) {
        self.pressure.pass(&self.shared);
        let drive = self.pressure.drive();
        if drive != self.applied.pressure {
            self.applied.pressure = drive;
            hw.set_vacuum_pump(drive == Drive::Lower);
            hw.set_vent_valve(drive == Drive::Raise);
            sink.emit(&AppEvent::DriveChanged {
                plant: Plant::Pressure,
                drive,
            });
        }
    }

    /// Returns the screen the system wants shown, if any.
    fn system_pass(
        &mut self,
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) -> Option<Screen> {
        let from = self.system.mode();
        let out = self.system.pass(&self.shared);

        if let Some(edge) = out.to_menu {
            self.menu.put(edge);
        }
        if let Some(cmd) = out.control {
            self.broadcast(cmd);
        }
        if let Some(on) = out.blink.filter(|&on| on != self.applied.blink) {
            self.applied.blink = on;
            hw.set_alarm_blink(on);
            sink.emit(&if on {
                AppEvent::AlarmRaised {
                    temp_c: self.shared.process.temperature_c(),
                    press_kpa: self.shared.process.pressure_kpa(),
                }
            } else {
                AppEvent::AlarmCleared
            });
        }

        let to = self.system.mode();
        if to != from {
            sink.emit(&AppEvent::ModeChanged { from, to });
        }

        out.screen
    }

    /// Returns the menu screen while the menu owns the display.
    fn menu_pass(
        &mut self,
        now: Instant,
        store: &mut impl ConfigPort,
        sink: &mut impl EventSink,
    ) -> Option<Screen> {
        let out = self
            .menu
            .tick(&self.shared.process, &mut self.shared.config)?;

        if out.exit_menu {
            self.system.put(SystemEvent::ExitMenu);
        }
        if let Some((field, value)) = out.committed {
            sink.emit(&AppEvent::ConfigCommitted { field, value });
        }
        if out.persist {
            self.persist(now, store, sink);
        }

        // The menu owns the display only while the system is in menu mode.
        (self.system.mode() == SystemMode::Menu).then_some(out.screen)
    }

    fn broadcast(&mut self, cmd: ControlEvent) {
        self.temperature.put(cmd);
        self.pressure.put(cmd);
    }

    /// Launch the persistent write.  A refused write is reported, not retried.
    fn persist(&mut self, now: Instant, store: &mut impl ConfigPort, sink: &mut impl EventSink) {
        match store.save(&self.shared.config, now) {
            Ok(()) => {
                info!("config: save started");
                sink.emit(&AppEvent::ConfigSaved);
            }
            Err(e) => {
                self.saves_failed = self.saves_failed.saturating_add(1);
                warn!(
                    "config: save refused ({e}), change kept in RAM only ({} refused)",
                    self.saves_failed
                );
                sink.emit(&AppEvent::ConfigSaveFailed(e));
            }
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn mode(&self) -> SystemMode {
        self.system.mode()
    }

    pub fn menu_state(&self) -> MenuState {
        self.menu.state()
    }

    pub fn temperature_state(&self) -> TempState {
        self.temperature.state()
    }

    pub fn pressure_state(&self) -> PressState {
        self.pressure.state()
    }

    /// Live configuration (menu edits included, saved or not).
    pub fn config(&self) -> ChamberConfig {
        self.shared.config
    }

    pub fn shared(&self) -> &SharedData {
        &self.shared
    }

    pub fn enabled(&self) -> bool {
        self.system.enabled()
    }

    /// Persistent writes refused since boot.
    pub fn saves_failed(&self) -> u32 {
        self.saves_failed
    }

    pub fn queue_drops(&self) -> QueueDrops {
        QueueDrops {
            temperature: self.temperature.queue().dropped(),
            pressure: self.pressure.queue().dropped(),
            system: self.system.queue().dropped(),
            menu: self.menu.queue().dropped(),
        }
    }
}

fn render(
    display: &mut impl TextDisplay,
    screen: &Screen,
    sink: &mut impl EventSink,
) -> Result<(), Error> {
    display.show(screen).map_err(|e| {
        error!("display: {e}, rendering suspended");
        sink.emit(&AppEvent::DisplayFault(e));
        Error::from(e)
    })
}
