//! Front-panel navigation through the assembled controller.

use thermovac::app::events::AppEvent;
use thermovac::config::Field;
use thermovac::control::temperature::TempState;
use thermovac::events::Button;
use thermovac::menu::MenuState;
use thermovac::system::SystemMode;

use super::bench::Bench;

/// Idle view → main → temperature → setpoint edit.
fn editing_temp_setpoint() -> Bench {
    let mut b = Bench::booted();
    b.press(Button::Enter);
    b.press(Button::Enter);
    b.press(Button::Enter);
    assert_eq!(b.app.menu_state(), MenuState::ModTempSet);
    b
}

#[test]
fn idle_view_shows_live_values() {
    let mut b = Bench::booted();
    b.run(1).unwrap();
    assert_eq!(b.lcd_row(0), "T:21\u{b0}C P:101kPa ");
    assert_eq!(b.lcd_row(1), "ENTER to config ");
}

#[test]
fn select_screens_follow_the_cursor() {
    let mut b = Bench::booted();
    b.press(Button::Enter);
    assert_eq!(b.lcd_row(0), "Configure:      ");
    assert_eq!(b.lcd_row(1), "> Temperature   ");

    b.press(Button::Previous);
    assert_eq!(b.lcd_row(1), "> Alarms        ");

    b.press(Button::Enter);
    assert_eq!(b.app.menu_state(), MenuState::AlarmSelect);
    assert_eq!(b.lcd_row(0), "Alarms:         ");
    assert_eq!(b.lcd_row(1), "> Enable        ");
}

#[test]
fn edit_screen_shows_shadow_value() {
    let mut b = editing_temp_setpoint();
    b.press(Button::Next);
    assert_eq!(b.lcd_row(0), "Temp setpoint   ");
    assert_eq!(b.lcd_row(1), "Val: 26 \u{b0}C      ");
}

#[test]
fn escape_discards_and_enter_commits() {
    let mut b = editing_temp_setpoint();
    for _ in 0..3 {
        b.press(Button::Next);
    }
    b.press(Button::Escape);
    assert_eq!(b.app.config().temp_setpoint, 25);
    assert_eq!(b.app.menu_state(), MenuState::TempSelect);

    b.press(Button::Enter);
    for _ in 0..3 {
        b.press(Button::Next);
    }
    b.press(Button::Enter);
    assert_eq!(b.app.config().temp_setpoint, 28);
    assert!(b.sink.contains(&AppEvent::ConfigCommitted {
        field: Field::TempSetpoint,
        value: 28,
    }));
}

#[test]
fn committed_setpoint_drives_the_regulator() {
    let mut b = editing_temp_setpoint();
    // 25 -> 20: ambient 21 is now above the setpoint but inside the band.
    for _ in 0..5 {
        b.press(Button::Previous);
    }
    b.press(Button::Enter);
    b.press(Button::Escape);
    b.press(Button::Escape);
    b.press(Button::Escape);
    assert_eq!(b.app.mode(), SystemMode::Normal);

    b.enable(true);
    assert_eq!(b.app.temperature_state(), TempState::Idle);
    b.sample(23, 101);
    b.run(5).unwrap();
    assert_eq!(b.app.temperature_state(), TempState::Cooling);
}

#[test]
fn any_other_press_on_idle_view_leaves_the_menu() {
    let mut b = Bench::booted();
    b.press(Button::Next);
    assert_eq!(b.app.mode(), SystemMode::Normal);
    assert_eq!(b.app.menu_state(), MenuState::IdleView);
}

#[test]
fn enter_from_normal_mode_opens_main_menu() {
    let mut b = Bench::booted();
    b.press(Button::Escape);
    assert_eq!(b.app.mode(), SystemMode::Normal);
    b.press(Button::Enter);
    assert_eq!(b.app.mode(), SystemMode::Menu);
    assert_eq!(b.app.menu_state(), MenuState::MainSelect);
    assert_eq!(b.lcd_row(0), "Configure:      ");
}

#[test]
fn switch_flipped_in_menu_applies_on_exit() {
    let mut b = Bench::booted();
    b.enable(true);
    assert!(b.app.enabled());
    b.run(10).unwrap();
    assert_eq!(b.app.temperature_state(), TempState::Off);

    b.press(Button::Escape);
    assert_eq!(b.app.mode(), SystemMode::Normal);
    assert_eq!(b.app.temperature_state(), TempState::Heating);
}

#[test]
fn alarm_flag_can_be_switched_off() {
    let mut b = Bench::booted();
    b.press(Button::Enter);
    b.press(Button::Previous);
    b.press(Button::Enter);
    b.press(Button::Enter);
    assert_eq!(b.app.menu_state(), MenuState::ModAlarmEnable);
    b.press(Button::Next);
    assert_eq!(b.lcd_row(1), "Val: off        ");
    b.press(Button::Enter);
    assert!(!b.app.config().alarm_enable);

    b.press(Button::Escape);
    b.press(Button::Escape);
    b.press(Button::Escape);
    b.enable(true);
    b.sample(60, 101);
    b.run(10).unwrap();
    assert_eq!(b.app.mode(), SystemMode::Normal);
}
