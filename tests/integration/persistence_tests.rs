//! Configuration persistence through the EEPROM driver.

use thermovac::app::events::AppEvent;
use thermovac::config::{ChamberConfig, RECORD_LEN, RECORD_OFFSET};
use thermovac::error::StorageError;
use thermovac::events::Button;
use thermovac::storage::{Eeprom, with_eeprom};

use super::bench::Bench;
use super::mock_hw::MockEepromBus;

fn stored_bytes(b: &Bench) -> Vec<u8> {
    with_eeprom(&b.eeprom, |e| e.bus().mem.clone())
}

#[test]
fn blank_device_boots_on_defaults() {
    let b = Bench::booted();
    assert_eq!(b.app.config(), ChamberConfig::default());
    assert_eq!(b.sink.events[0], AppEvent::Started(ChamberConfig::default()));
}

#[test]
fn stored_record_is_loaded_at_boot() {
    let mut cfg = ChamberConfig::default();
    cfg.temp_setpoint = 60;
    cfg.press_hysteresis = 12;
    cfg.alarm_enable = false;
    let mut b = Bench::with_config(&cfg);
    b.boot();
    assert_eq!(b.app.config(), cfg);
}

#[test]
fn corrupted_field_falls_back_alone() {
    let mut cfg = ChamberConfig::default();
    cfg.press_setpoint = 80;
    cfg.temp_alarm_limit = 70;
    let mut bus = MockEepromBus::default();
    bus.mem[..RECORD_LEN].copy_from_slice(&cfg.to_record());
    // temp_setpoint = 500, outside 0..=80
    bus.mem[0] = 0xF4;
    bus.mem[1] = 0x01;

    let mut b = Bench::with_eeprom(bus);
    b.boot();
    let loaded = b.app.config();
    assert_eq!(loaded.temp_setpoint, 25);
    assert_eq!(loaded.press_setpoint, 80);
    assert_eq!(loaded.temp_alarm_limit, 70);
}

#[test]
fn unresponsive_device_boots_on_defaults() {
    let mut b = Bench::with_eeprom(MockEepromBus {
        unresponsive: true,
        ..MockEepromBus::default()
    });
    b.sample(21, 101);
    b.boot();
    assert_eq!(b.app.config(), ChamberConfig::default());
    b.run(10).unwrap();
}

#[test]
fn leaving_the_main_menu_writes_the_record() {
    let mut b = Bench::booted();
    b.press(Button::Enter);
    b.press(Button::Next);
    b.press(Button::Enter); // pressure
    b.press(Button::Next);
    b.press(Button::Enter); // hysteresis
    b.press(Button::Next);
    b.press(Button::Next);
    b.press(Button::Enter); // 5 -> 7
    b.press(Button::Escape);
    b.press(Button::Escape);

    assert!(b.sink.contains(&AppEvent::ConfigSaved));
    let writes = with_eeprom(&b.eeprom, |e| e.bus().writes.clone());
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].0, RECORD_OFFSET);
    assert_eq!(writes[0].1, b.app.config().to_record());

    // A fresh driver on the same memory sees the edit.
    let mem = stored_bytes(&b);
    let mut reread = Eeprom::new(MockEepromBus {
        mem,
        ..MockEepromBus::default()
    });
    let cfg = thermovac::app::ports::ConfigPort::load(&mut reread).unwrap();
    assert_eq!(cfg.press_hysteresis, 7);
}

#[test]
fn save_during_write_cycle_is_refused() {
    let mut b = Bench::booted();
    b.complete_writes = false;

    b.press(Button::Enter);
    b.press(Button::Escape);
    assert!(b.sink.contains(&AppEvent::ConfigSaved));

    b.press(Button::Enter);
    b.press(Button::Escape);
    assert_eq!(b.app.saves_failed(), 1);
    assert!(b.sink.contains(&AppEvent::ConfigSaveFailed(StorageError::Busy)));
    assert_eq!(with_eeprom(&b.eeprom, |e| e.rejected_writes()), 1);

    // Completion, then the device's write cycle, then it accepts again.
    b.complete_writes = true;
    b.run(10).unwrap();
    b.press(Button::Enter);
    b.press(Button::Escape);
    assert_eq!(b.app.saves_failed(), 1);
    assert_eq!(with_eeprom(&b.eeprom, |e| e.bus().writes.len()), 2);
}
