//! GPIO actuator adapter.
//!
//! Drives the five plant outputs through `embedded-hal` output pins.  The
//! alarm output is a blink pattern: [`set_alarm_blink`] only arms it, and the
//! board's blink timer calls [`GpioActuators::on_blink_tick`] to toggle it.
//!
//! Pin errors are logged and otherwise ignored: a stuck output cannot be
//! fixed from here, and the regulators will try again on the next change.
//!
//! `thermovac-sim` drives its plant model through this adapter over
//! simulated pins.
//!
//! [`set_alarm_blink`]: ActuatorPort::set_alarm_blink

use embedded_hal::digital::{OutputPin, PinState};
use log::warn;

use crate::app::ports::ActuatorPort;

/// Output pins, one per actuator.
pub struct ActuatorPins<H, C, V, A, B> {
    pub heater: H,
    pub cooler: C,
    pub vacuum_pump: V,
    pub vent_valve: A,
    pub beacon: B,
}

pub struct GpioActuators<H, C, V, A, B> {
    pins: ActuatorPins<H, C, V, A, B>,
    blinking: bool,
    beacon_lit: bool,
}

impl<H, C, V, A, B> GpioActuators<H, C, V, A, B>
where
    H: OutputPin,
    C: OutputPin,
    V: OutputPin,
    A: OutputPin,
    B: OutputPin,
{
    pub fn new(pins: ActuatorPins<H, C, V, A, B>) -> Self {
        Self {
            pins,
            blinking: false,
            beacon_lit: false,
        }
    }

    /// Blink timer callback: toggles the beacon while the alarm is armed.
    pub fn on_blink_tick(&mut self) {
        if self.blinking {
            self.beacon_lit = !self.beacon_lit;
            drive(&mut self.pins.beacon, self.beacon_lit, "beacon");
        }
    }

    pub fn is_blinking(&self) -> bool {
        self.blinking
    }

    pub fn release(self) -> ActuatorPins<H, C, V, A, B> {
        self.pins
    }
}

fn drive(pin: &mut impl OutputPin, on: bool, name: &str) {
    if pin.set_state(PinState::from(on)).is_err() {
        warn!("hw: failed to switch {name} {}", if on { "on" } else { "off" });
    }
}

impl<H, C, V, A, B> ActuatorPort for GpioActuators<H, C, V, A, B>
where
    H: OutputPin,
    C: OutputPin,
    V: OutputPin,
    A: OutputPin,
    B: OutputPin,
{
    fn set_heater(&mut self, on: bool) {
        drive(&mut self.pins.heater, on, "heater");
    }

    fn set_cooler(&mut self, on: bool) {
        drive(&mut self.pins.cooler, on, "cooler");
    }

    fn set_vacuum_pump(&mut self, on: bool) {
        drive(&mut self.pins.vacuum_pump, on, "vacuum pump");
    }

    fn set_vent_valve(&mut self, on: bool) {
        drive(&mut self.pins.vent_valve, on, "vent valve");
    }

    fn set_alarm_blink(&mut self, on: bool) {
        self.blinking = on;
        if !on {
            self.beacon_lit = false;
            drive(&mut self.pins.beacon, false, "beacon");
        }
    }
}
