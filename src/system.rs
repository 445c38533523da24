//! System FSM: top-level mode arbiter.
//!
//! ```text
//!             ExitMenu                     alarm test positive
//!  MENU_MODE ─────────▶ NORMAL_MODE ─────────────────────────▶ ALARM_MODE
//!      ▲                    │  ▲                                    │
//!      └──── Enter press ───┘  └──────────── EnableIdle ────────────┘
//! ```
//!
//! * MENU_MODE forwards every button edge to the menu and only tracks the
//!   enable switch.
//! * NORMAL_MODE renders the status bar, runs the alarm test and relays the
//!   enable switch to both regulators.
//! * ALARM_MODE is sticky: only the enable switch going off leaves it.

use log::warn;

use crate::config::{ChamberConfig, timing};
use crate::display::Screen;
use crate::events::{Button, ButtonEvent, ControlEvent, SystemEvent, TaskQueue};
use crate::fsm::{Fsm, StateDescriptor, StateId};
use crate::process::SharedData;
use crate::tick::Interval;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SystemMode {
    Menu = 0,
    Normal = 1,
    Alarm = 2,
}

impl StateId for SystemMode {
    fn index(self) -> usize {
        self as usize
    }
}

/// Side effects requested by one pass, applied by the application.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SystemOutputs {
    /// Button edge for the menu queue.
    pub to_menu: Option<ButtonEvent>,
    /// Command for both regulators.
    pub control: Option<ControlEvent>,
    /// Start (`true`) or stop the alarm blink.
    pub blink: Option<bool>,
    /// Status screen to draw.
    pub screen: Option<Screen>,
}

#[derive(Debug)]
pub struct SystemContext {
    pub pending: Option<SystemEvent>,
    pub enabled: bool,
    pub temp_c: u16,
    pub press_kpa: u16,
    pub config: ChamberConfig,
    status: Interval,
    refresh: bool,
    pub outputs: SystemOutputs,
}

impl SystemContext {
    fn new() -> Self {
        Self {
            pending: None,
            enabled: false,
            temp_c: 0,
            press_kpa: 0,
            config: ChamberConfig::default(),
            status: Interval::new(timing::STATUS_INTERVAL_TICKS),
            refresh: false,
            outputs: SystemOutputs::default(),
        }
    }

    fn take_event(&mut self, event: SystemEvent) -> bool {
        if self.pending == Some(event) {
            self.pending = None;
            true
        } else {
            false
        }
    }

    fn alarm_tripped(&self) -> bool {
        let cfg = &self.config;
        limit_exceeded(self.temp_c, cfg.temp_setpoint, cfg.temp_alarm_limit)
            | limit_exceeded(self.press_kpa, cfg.press_setpoint, cfg.press_alarm_limit)
    }

    fn render_status(&mut self, second_line: &str) {
        let mut screen = Screen::blank();
        screen.set_row(
            0,
            format_args!("{:>3}\u{b0}C | {:>4}kPa ", self.temp_c, self.press_kpa),
        );
        screen.set_text(1, second_line);
        self.outputs.screen = Some(screen);
    }
}

/// Alarm test for one process value.
///
/// The direction is inferred from where the limit sits: a limit above the
/// setpoint is a high alarm, anything else (including a limit equal to the
/// setpoint) is a low alarm.
pub const fn limit_exceeded(value: u16, setpoint: u16, limit: u16) -> bool {
    if limit > setpoint {
        value > limit
    } else {
        value < limit
    }
}

// ═══════════════════════════════════════════════════════════════
// State table
// ═══════════════════════════════════════════════════════════════

pub fn build_state_table() -> [StateDescriptor<SystemMode, SystemContext>; 3] {
    [
        StateDescriptor {
            id: SystemMode::Menu,
            name: "MENU_MODE",
            on_enter: None,
            on_exit: None,
            on_update: menu_update,
        },
        StateDescriptor {
            id: SystemMode::Normal,
            name: "NORMAL_MODE",
            on_enter: Some(refresh_on_next_pass),
            on_exit: None,
            on_update: normal_update,
        },
        StateDescriptor {
            id: SystemMode::Alarm,
            name: "ALARM_MODE",
            on_enter: Some(refresh_on_next_pass),
            on_exit: None,
            on_update: alarm_update,
        },
    ]
}

fn refresh_on_next_pass(ctx: &mut SystemContext) {
    ctx.status.trigger();
}

fn menu_update(ctx: &mut SystemContext) -> Option<SystemMode> {
    match ctx.pending? {
        SystemEvent::Button(button) => {
            ctx.pending = None;
            ctx.outputs.to_menu = Some(button);
            None
        }
        SystemEvent::EnableActive => {
            ctx.pending = None;
            ctx.enabled = true;
            None
        }
        SystemEvent::EnableIdle => {
            ctx.pending = None;
            ctx.enabled = false;
            None
        }
        SystemEvent::ExitMenu => {
            ctx.pending = None;
            // Bring the regulators in line with the switch flipped while in the menu.
            ctx.outputs.control = Some(if ctx.enabled {
                ControlEvent::EnableOn
            } else {
                ControlEvent::EnableOff
            });
            Some(SystemMode::Normal)
        }
    }
}

fn normal_update(ctx: &mut SystemContext) -> Option<SystemMode> {
    if ctx.refresh {
        ctx.render_status(if ctx.enabled { "State: on" } else { "State: off" });
    }

    if ctx.enabled && ctx.config.alarm_enable && ctx.alarm_tripped() {
        warn!(
            "system: alarm, T={}C P={}kPa (limits {}C / {}kPa)",
            ctx.temp_c, ctx.press_kpa, ctx.config.temp_alarm_limit, ctx.config.press_alarm_limit
        );
        ctx.outputs.blink = Some(true);
        return Some(SystemMode::Alarm);
    }

    if ctx.take_event(SystemEvent::Button(ButtonEvent::pressed(Button::Enter))) {
        ctx.outputs.to_menu = Some(ButtonEvent::pressed(Button::Enter));
        Some(SystemMode::Menu)
    } else if ctx.take_event(SystemEvent::EnableActive) {
        ctx.enabled = true;
        ctx.outputs.control = Some(ControlEvent::EnableOn);
        None
    } else if ctx.take_event(SystemEvent::EnableIdle) {
        ctx.enabled = false;
        ctx.outputs.control = Some(ControlEvent::EnableOff);
        None
    } else {
        None
    }
}

fn alarm_update(ctx: &mut SystemContext) -> Option<SystemMode> {
    if ctx.refresh {
        ctx.render_status("     ALARM!     ");
    }

    if ctx.take_event(SystemEvent::EnableIdle) {
        ctx.enabled = false;
        ctx.outputs.control = Some(ControlEvent::EnableOff);
        ctx.outputs.blink = Some(false);
        Some(SystemMode::Normal)
    } else {
        None
    }
}

// ═══════════════════════════════════════════════════════════════
// Task
// ═══════════════════════════════════════════════════════════════

pub struct SystemTask {
    fsm: Fsm<SystemMode, SystemContext, 3>,
    ctx: SystemContext,
    queue: TaskQueue<SystemEvent>,
}

impl Default for SystemTask {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemTask {
    pub fn new() -> Self {
        Self {
            fsm: Fsm::new("system", build_state_table(), SystemMode::Menu),
            ctx: SystemContext::new(),
            queue: TaskQueue::new(),
        }
    }

    pub fn start(&mut self) {
        self.fsm.start(&mut self.ctx);
    }

    pub fn put(&mut self, event: SystemEvent) -> bool {
        self.queue.put(event, "system")
    }

    /// One elapsed tick.
    pub fn pass(&mut self, shared: &SharedData) -> SystemOutputs {
        self.ctx.outputs = SystemOutputs::default();
        self.ctx.temp_c = shared.process.temperature_c();
        self.ctx.press_kpa = shared.process.pressure_kpa();
        self.ctx.config = shared.config;
        self.ctx.refresh = self.ctx.status.expired();
        if let Some(event) = self.queue.pop() {
            self.ctx.pending = Some(event);
        }
        self.fsm.step(&mut self.ctx);
        self.ctx.outputs
    }

    pub fn mode(&self) -> SystemMode {
        self.fsm.current_state()
    }

    pub fn enabled(&self) -> bool {
        self.ctx.enabled
    }

    pub fn queue(&self) -> &TaskQueue<SystemEvent> {
        &self.queue
    }
}
