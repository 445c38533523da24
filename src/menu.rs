//! Menu FSM: hierarchical configuration editor.
//!
//! ```text
//!  IDLE_VIEW ──Enter──▶ MAIN_SELECT ──Enter──▶ TEMP_SELECT  ──Enter──▶ MOD_TEMP_SET / MOD_TEMP_HYST
//!      ▲                    │                  PRESS_SELECT ──Enter──▶ MOD_PRESS_SET / MOD_PRESS_HYST
//!      └───── Escape ───────┘ (persist)        ALARM_SELECT ──Enter──▶ MOD_ALARM_EN / MOD_TEMP_ALARM
//!                                                                      / MOD_PRESS_ALARM
//! ```
//!
//! Select screens cycle a selection index with Next/Previous.  Edit screens
//! work on a shadow copy of one field: Enter commits it into the live
//! configuration, Escape throws it away.  Leaving the top level with Escape
//! requests a persistent save.  Any other press on the idle view hands the
//! display back to the system with `ExitMenu`.
//!
//! Only press edges navigate; release edges are consumed and ignored.

use log::{debug, info};

use crate::config::{ChamberConfig, Field, timing};
use crate::display::Screen;
use crate::events::{Button, ButtonEvent, TaskQueue};
use crate::fsm::{Fsm, StateDescriptor, StateId};
use crate::process::ProcessData;
use crate::tick::Interval;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MenuState {
    IdleView = 0,
    MainSelect = 1,
    TempSelect = 2,
    PressSelect = 3,
    AlarmSelect = 4,
    ModTempSet = 5,
    ModTempHyst = 6,
    ModPressSet = 7,
    ModPressHyst = 8,
    ModAlarmEnable = 9,
    ModTempAlarm = 10,
    ModPressAlarm = 11,
}

impl StateId for MenuState {
    fn index(self) -> usize {
        self as usize
    }
}

impl MenuState {
    /// Field edited in this state, if it is an edit state.
    pub const fn field(self) -> Option<Field> {
        match self {
            Self::ModTempSet => Some(Field::TempSetpoint),
            Self::ModTempHyst => Some(Field::TempHysteresis),
            Self::ModPressSet => Some(Field::PressSetpoint),
            Self::ModPressHyst => Some(Field::PressHysteresis),
            Self::ModAlarmEnable => Some(Field::AlarmEnable),
            Self::ModTempAlarm => Some(Field::TempAlarmLimit),
            Self::ModPressAlarm => Some(Field::PressAlarmLimit),
            _ => None,
        }
    }
}

/// Select screen the edit of `field` returns to.
const fn parent_of(field: Field) -> MenuState {
    match field {
        Field::TempSetpoint | Field::TempHysteresis => MenuState::TempSelect,
        Field::PressSetpoint | Field::PressHysteresis => MenuState::PressSelect,
        Field::AlarmEnable | Field::TempAlarmLimit | Field::PressAlarmLimit => {
            MenuState::AlarmSelect
        }
    }
}

struct SelectMenu {
    title: &'static str,
    options: &'static [(&'static str, MenuState)],
}

const MAIN_MENU: SelectMenu = SelectMenu {
    title: "Configure:",
    options: &[
        ("Temperature", MenuState::TempSelect),
        ("Pressure", MenuState::PressSelect),
        ("Alarms", MenuState::AlarmSelect),
    ],
};

const TEMP_MENU: SelectMenu = SelectMenu {
    title: "Temperature:",
    options: &[
        ("Setpoint", MenuState::ModTempSet),
        ("Hysteresis", MenuState::ModTempHyst),
    ],
};

const PRESS_MENU: SelectMenu = SelectMenu {
    title: "Pressure:",
    options: &[
        ("Setpoint", MenuState::ModPressSet),
        ("Hysteresis", MenuState::ModPressHyst),
    ],
};

const ALARM_MENU: SelectMenu = SelectMenu {
    title: "Alarms:",
    options: &[
        ("Enable", MenuState::ModAlarmEnable),
        ("Temp limit", MenuState::ModTempAlarm),
        ("Press limit", MenuState::ModPressAlarm),
    ],
};

/// Side effects requested by one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuOutputs {
    pub screen: Screen,
    /// Hand the display back to the system.
    pub exit_menu: bool,
    /// Write the live configuration to persistent storage.
    pub persist: bool,
    /// A field was committed this pass.
    pub committed: Option<(Field, u16)>,
}

#[derive(Debug)]
pub struct MenuContext {
    pub pending: Option<ButtonEvent>,
    /// Index into the current select screen's options.
    pub selection: usize,
    /// Field under edit while in a `MOD_*` state.
    pub editing: Option<Field>,
    /// Working copy of the edited field.
    pub shadow: u16,
    pub config: ChamberConfig,
    pub process: ProcessData,
    screen: Screen,
    exit_menu: bool,
    persist: bool,
    committed: Option<(Field, u16)>,
}

impl MenuContext {
    fn new() -> Self {
        Self {
            pending: None,
            selection: 0,
            editing: None,
            shadow: 0,
            config: ChamberConfig::default(),
            process: ProcessData::default(),
            screen: Screen::blank(),
            exit_menu: false,
            persist: false,
            committed: None,
        }
    }

    /// Consume the pending event; only a press is returned.
    fn take_press(&mut self) -> Option<Button> {
        self.pending
            .take()
            .filter(ButtonEvent::is_press)
            .map(|e| e.button)
    }

    fn render(&mut self, top: &str, bottom: core::fmt::Arguments<'_>) {
        self.screen = Screen::blank();
        self.screen.set_text(0, top);
        self.screen.set_row(1, bottom);
    }
}

// ═══════════════════════════════════════════════════════════════
// State table
// ═══════════════════════════════════════════════════════════════

pub fn build_state_table() -> [StateDescriptor<MenuState, MenuContext>; 12] {
    const fn select(
        id: MenuState,
        name: &'static str,
        on_update: fn(&mut MenuContext) -> Option<MenuState>,
    ) -> StateDescriptor<MenuState, MenuContext> {
        StateDescriptor {
            id,
            name,
            on_enter: None,
            on_exit: None,
            on_update,
        }
    }

    const fn edit(id: MenuState, name: &'static str) -> StateDescriptor<MenuState, MenuContext> {
        StateDescriptor {
            id,
            name,
            on_enter: Some(edit_enter),
            on_exit: Some(edit_exit),
            on_update: edit_update,
        }
    }

    [
        select(MenuState::IdleView, "IDLE_VIEW", idle_update),
        select(MenuState::MainSelect, "MAIN_SELECT", main_update),
        select(MenuState::TempSelect, "TEMP_SELECT", temp_update),
        select(MenuState::PressSelect, "PRESS_SELECT", press_update),
        select(MenuState::AlarmSelect, "ALARM_SELECT", alarm_update),
        edit(MenuState::ModTempSet, "MOD_TEMP_SET"),
        edit(MenuState::ModTempHyst, "MOD_TEMP_HYST"),
        edit(MenuState::ModPressSet, "MOD_PRESS_SET"),
        edit(MenuState::ModPressHyst, "MOD_PRESS_HYST"),
        edit(MenuState::ModAlarmEnable, "MOD_ALARM_EN"),
        edit(MenuState::ModTempAlarm, "MOD_TEMP_ALARM"),
        edit(MenuState::ModPressAlarm, "MOD_PRESS_ALARM"),
    ]
}

fn idle_update(ctx: &mut MenuContext) -> Option<MenuState> {
    let mut screen = Screen::blank();
    screen.set_row(
        0,
        format_args!(
            "T:{}\u{b0}C P:{}kPa",
            ctx.process.temperature_c(),
            ctx.process.pressure_kpa()
        ),
    );
    screen.set_text(1, "ENTER to config");
    ctx.screen = screen;

    match ctx.take_press()? {
        Button::Enter => {
            ctx.selection = 0;
            Some(MenuState::MainSelect)
        }
        other => {
            debug!("menu: {other:?} on idle view, leaving menu");
            ctx.exit_menu = true;
            None
        }
    }
}

fn main_update(ctx: &mut MenuContext) -> Option<MenuState> {
    select_update(ctx, &MAIN_MENU, true)
}

fn temp_update(ctx: &mut MenuContext) -> Option<MenuState> {
    select_update(ctx, &TEMP_MENU, false)
}

fn press_update(ctx: &mut MenuContext) -> Option<MenuState> {
    select_update(ctx, &PRESS_MENU, false)
}

fn alarm_update(ctx: &mut MenuContext) -> Option<MenuState> {
    select_update(ctx, &ALARM_MENU, false)
}

/// `top_level` marks the main menu, whose Escape leaves the editor.
fn select_update(ctx: &mut MenuContext, menu: &SelectMenu, top_level: bool) -> Option<MenuState> {
    let count = menu.options.len();
    if ctx.selection >= count {
        ctx.selection = 0;
    }
    let (label, target) = menu.options[ctx.selection];
    ctx.render(menu.title, format_args!("> {label}"));

    match ctx.take_press()? {
        Button::Next => {
            ctx.selection = (ctx.selection + 1) % count;
            None
        }
        Button::Previous => {
            ctx.selection = (ctx.selection + count - 1) % count;
            None
        }
        Button::Enter => {
            match target.field() {
                Some(field) => ctx.editing = Some(field),
                None => ctx.selection = 0,
            }
            Some(target)
        }
        Button::Escape if top_level => {
            ctx.persist = true;
            Some(MenuState::IdleView)
        }
        Button::Escape => {
            ctx.selection = 0;
            Some(MenuState::MainSelect)
        }
    }
}

fn edit_enter(ctx: &mut MenuContext) {
    if let Some(field) = ctx.editing {
        ctx.shadow = ctx.config.get(field);
    }
}

fn edit_exit(ctx: &mut MenuContext) {
    ctx.editing = None;
}

fn edit_update(ctx: &mut MenuContext) -> Option<MenuState> {
    let Some(field) = ctx.editing else {
        return Some(MenuState::IdleView);
    };
    let shadow = ctx.shadow;
    if field == Field::AlarmEnable {
        let word = if shadow != 0 { "on" } else { "off" };
        ctx.render(field.label(), format_args!("Val: {word}"));
    } else {
        ctx.render(field.label(), format_args!("Val: {shadow} {}", field.unit()));
    }

    let limits = field.limits();
    match ctx.take_press()? {
        Button::Next => {
            ctx.shadow = limits.next(shadow);
            None
        }
        Button::Previous => {
            ctx.shadow = limits.previous(shadow);
            None
        }
        Button::Enter => {
            ctx.config.set(field, shadow);
            ctx.committed = Some((field, ctx.config.get(field)));
            info!("menu: {field:?} set to {shadow}");
            Some(parent_of(field))
        }
        Button::Escape => {
            ctx.shadow = ctx.config.get(field);
            Some(parent_of(field))
        }
    }
}

// ═══════════════════════════════════════════════════════════════
// Task
// ═══════════════════════════════════════════════════════════════

pub struct MenuTask {
    fsm: Fsm<MenuState, MenuContext, 12>,
    ctx: MenuContext,
    queue: TaskQueue<ButtonEvent>,
    interval: Interval,
}

impl Default for MenuTask {
    fn default() -> Self {
        Self::new()
    }
}

impl MenuTask {
    pub fn new() -> Self {
        Self {
            fsm: Fsm::new("menu", build_state_table(), MenuState::IdleView),
            ctx: MenuContext::new(),
            queue: TaskQueue::new(),
            interval: Interval::new(timing::MENU_INTERVAL_TICKS),
        }
    }

    pub fn start(&mut self) {
        self.fsm.start(&mut self.ctx);
    }

    pub fn put(&mut self, event: ButtonEvent) -> bool {
        self.queue.put(event, "menu")
    }

    /// One elapsed tick.  Runs a pass only when the menu interval expires.
    pub fn tick(&mut self, process: &ProcessData, config: &mut ChamberConfig) -> Option<MenuOutputs> {
        self.interval
            .expired()
            .then(|| self.pass(process, config))
    }

    /// One menu pass.  `config` is the live configuration; committed edits
    /// are written back into it.
    pub fn pass(&mut self, process: &ProcessData, config: &mut ChamberConfig) -> MenuOutputs {
        self.ctx.process = *process;
        self.ctx.config = *config;
        self.ctx.exit_menu = false;
        self.ctx.persist = false;
        self.ctx.committed = None;
        if let Some(event) = self.queue.pop() {
            self.ctx.pending = Some(event);
        }
        self.fsm.step(&mut self.ctx);
        *config = self.ctx.config;
        MenuOutputs {
            screen: self.ctx.screen,
            exit_menu: self.ctx.exit_menu,
            persist: self.ctx.persist,
            committed: self.ctx.committed,
        }
    }

    pub fn state(&self) -> MenuState {
        self.fsm.current_state()
    }

    pub fn selection(&self) -> usize {
        self.ctx.selection
    }

    /// Working value of the field under edit.
    pub fn shadow(&self) -> Option<u16> {
        self.ctx.editing.map(|_| self.ctx.shadow)
    }

    pub fn queue(&self) -> &TaskQueue<ButtonEvent> {
        &self.queue
    }
}
