//! Regulation, alarm and display behaviour of the assembled controller.

use thermovac::RecoveryAction;
use thermovac::app::commands::AppCommand;
use thermovac::app::events::{AppEvent, Plant};
use thermovac::config::ChamberConfig;
use thermovac::control::Drive;
use thermovac::control::pressure::PressState;
use thermovac::control::temperature::TempState;
use thermovac::display::sequencer::with_lcd;
use thermovac::error::{DisplayError, Error};
use thermovac::events::{Button, ButtonEvent, EVENT_QUEUE_CAP};
use thermovac::system::SystemMode;

use super::bench::Bench;
use super::mock_hw::ActuatorCall;

/// Booted, menu left, chamber enabled.
fn running() -> Bench {
    let mut b = Bench::booted();
    b.press(Button::Escape);
    b.enable(true);
    b
}

/// Same, on a configuration whose pressure alarm never fires.
fn running_without_pressure_alarm() -> Bench {
    let mut cfg = ChamberConfig::default();
    cfg.press_alarm_limit = 110;
    let mut b = Bench::with_config(&cfg);
    b.sample(21, 101);
    b.boot();
    b.press(Button::Escape);
    b.enable(true);
    b
}

#[test]
fn boot_switches_everything_off_and_starts_in_menu_mode() {
    let b = Bench::booted();
    assert_eq!(b.app.mode(), SystemMode::Menu);
    assert_eq!(b.app.temperature_state(), TempState::Off);
    assert_eq!(b.app.pressure_state(), PressState::Off);
    assert!(b.hw.calls.contains(&ActuatorCall::Heater(false)));
    assert!(b.hw.calls.contains(&ActuatorCall::AlarmBlink(false)));
    assert!(matches!(b.sink.events[0], AppEvent::Started(_)));
}

#[test]
fn heating_runs_until_the_setpoint_is_crossed() {
    let mut b = running();
    b.sample(15, 101);
    b.run(5).unwrap();
    assert_eq!(b.app.temperature_state(), TempState::Heating);
    assert!(b.hw.heater_on());
    assert!(!b.hw.cooler_on());

    // Inside the band: keep heating.
    b.sample(24, 101);
    b.run(5).unwrap();
    assert_eq!(b.app.temperature_state(), TempState::Heating);

    b.sample(26, 101);
    b.run(5).unwrap();
    assert_eq!(b.app.temperature_state(), TempState::Idle);
    assert!(!b.hw.heater_on());
}

#[test]
fn cooling_starts_above_the_band() {
    let mut b = running();
    b.sample(27, 101);
    b.run(5).unwrap();
    assert_eq!(b.app.temperature_state(), TempState::Idle);
    b.sample(28, 101);
    b.run(5).unwrap();
    assert_eq!(b.app.temperature_state(), TempState::Cooling);
    assert!(b.hw.cooler_on());
}

#[test]
fn vacuum_and_release_drive_pump_and_vent() {
    let mut b = running_without_pressure_alarm();
    b.sample(25, 107);
    b.run(5).unwrap();
    assert_eq!(b.app.pressure_state(), PressState::Vacuum);
    assert!(b.hw.pump_on());
    assert!(!b.hw.vent_open());

    b.sample(25, 100);
    b.run(5).unwrap();
    assert_eq!(b.app.pressure_state(), PressState::Idle);
    assert!(!b.hw.pump_on());

    b.sample(25, 90);
    b.run(5).unwrap();
    assert_eq!(b.app.pressure_state(), PressState::Release);
    assert!(b.hw.vent_open());
    assert!(b.sink.contains(&AppEvent::DriveChanged {
        plant: Plant::Pressure,
        drive: Drive::Raise,
    }));
}

#[test]
fn disable_turns_both_regulators_off() {
    let mut b = running();
    b.sample(15, 101);
    b.run(5).unwrap();
    assert!(b.hw.heater_on());
    b.enable(false);
    assert_eq!(b.app.temperature_state(), TempState::Off);
    assert_eq!(b.app.pressure_state(), PressState::Off);
    assert!(!b.hw.heater_on());
}

#[test]
fn status_bar_shows_values_and_switch_state() {
    let mut b = Bench::booted();
    b.press(Button::Escape);
    assert_eq!(b.app.mode(), SystemMode::Normal);
    assert_eq!(b.lcd_row(0), " 21\u{b0}C |  101kPa ");
    assert_eq!(b.lcd_row(1), "State: off      ");

    b.enable(true);
    b.run(500).unwrap();
    assert_eq!(b.lcd_row(1), "State: on       ");
}

#[test]
fn alarm_latches_until_switch_off() {
    let mut b = running();
    b.sample(45, 101);
    b.run(3).unwrap();
    assert_eq!(b.app.mode(), SystemMode::Alarm);
    assert!(b.hw.blinking());
    assert_eq!(b.lcd_row(1), "     ALARM!     ");
    assert!(b.sink.contains(&AppEvent::AlarmRaised {
        temp_c: 45,
        press_kpa: 101,
    }));

    // Back in range and buttons pressed: still latched.
    b.sample(25, 101);
    b.press(Button::Enter);
    b.run(600).unwrap();
    assert_eq!(b.app.mode(), SystemMode::Alarm);

    b.enable(false);
    assert_eq!(b.app.mode(), SystemMode::Normal);
    assert!(!b.hw.blinking());
    assert!(b.sink.contains(&AppEvent::AlarmCleared));
}

#[test]
fn low_alarm_fires_below_a_limit_under_the_setpoint() {
    let mut cfg = ChamberConfig::default();
    cfg.temp_alarm_limit = 10;
    cfg.press_alarm_limit = 110;
    let mut b = Bench::with_config(&cfg);
    b.sample(21, 101);
    b.boot();
    b.press(Button::Escape);
    b.enable(true);

    b.sample(11, 101);
    b.run(3).unwrap();
    assert_eq!(b.app.mode(), SystemMode::Normal);
    b.sample(9, 101);
    b.run(3).unwrap();
    assert_eq!(b.app.mode(), SystemMode::Alarm);
}

#[test]
fn no_alarm_while_disabled() {
    let mut b = Bench::booted();
    b.press(Button::Escape);
    b.sample(90, 101);
    b.run(10).unwrap();
    assert_eq!(b.app.mode(), SystemMode::Normal);
    assert!(!b.hw.blinking());
}

#[test]
fn display_fault_needs_reinit() {
    let mut b = Bench::booted();
    with_lcd(&b.lcd, |p| p.bus_mut().fail_transfers = 1);
    let err = b.run(60).unwrap_err();
    assert_eq!(err, Error::Display(DisplayError::BusFault));
    assert_eq!(err.recovery(), RecoveryAction::ReinitDisplay);
    assert!(b.sink.contains(&AppEvent::DisplayFault(DisplayError::BusFault)));

    // Still halted on the next render.
    assert!(b.run(60).is_err());

    b.reinit_display();
    b.run(60).unwrap();
    assert_eq!(b.lcd_row(1), "ENTER to config ");
}

#[test]
fn regulation_keeps_running_while_the_display_is_down() {
    let mut b = running();
    b.sample(15, 101);
    b.run(5).unwrap();
    assert!(b.hw.heater_on());

    with_lcd(&b.lcd, |p| p.bus_mut().fail_transfers = u32::MAX);
    b.sample(30, 101);
    assert!(b.run(600).is_err());
    assert_eq!(b.app.temperature_state(), TempState::Idle);
    assert!(!b.hw.heater_on());
}

#[test]
fn one_display_transfer_in_flight_at_a_time() {
    let mut b = running();
    b.sample(45, 101);
    b.run(1200).unwrap();
    let (overlapped, frames) = with_lcd(&b.lcd, |p| (p.bus().overlapped, p.bus().frames));
    assert!(!overlapped);
    assert!(frames > 0);
}

#[test]
fn full_system_queue_drops_and_counts() {
    let mut b = Bench::booted();
    let accepted = (0..EVENT_QUEUE_CAP + 4)
        .filter(|_| {
            b.app
                .handle_command(AppCommand::Button(ButtonEvent::pressed(Button::Next)))
        })
        .count();
    assert_eq!(accepted, EVENT_QUEUE_CAP);
    assert_eq!(b.app.queue_drops().system, 4);
}

#[test]
fn menu_backlog_fits_the_display_queue() {
    let mut b = Bench::booted();
    b.sample(30, 101);
    b.catch_up(200).unwrap();
    assert_eq!(with_lcd(&b.lcd, |p| p.dropped()), 0);

    b.drain_display();
    assert_eq!(b.lcd_row(0), "T:30\u{b0}C P:101kPa ");
    assert_eq!(b.lcd_row(1), "ENTER to config ");
}

#[test]
fn status_backlog_fits_the_display_queue() {
    let mut b = running();
    b.catch_up(1_200).unwrap();
    assert_eq!(with_lcd(&b.lcd, |p| p.dropped()), 0);

    b.drain_display();
    assert_eq!(b.lcd_row(1), "State: on       ");
    assert_eq!(b.app.temperature_state(), TempState::Heating);
}
