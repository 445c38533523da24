//! Shared process data: raw sensor samples plus the live configuration.
//!
//! The sampling collaborator writes the raw ADC counts; the control, system
//! and menu tasks read them through the conversions below.  Only the menu
//! writes `config`.

use crate::config::ChamberConfig;

/// Full-scale reading of the 12-bit ADC.
pub const ADC_MAX: u32 = 4095;
/// Temperature at full scale, degrees Celsius.
pub const TEMP_FULL_SCALE_C: u32 = 100;
/// Pressure at full scale, kPa.
pub const PRESS_FULL_SCALE_KPA: u32 = 110;

pub const fn temp_raw_to_celsius(raw: u16) -> u16 {
    (raw as u32 * TEMP_FULL_SCALE_C / ADC_MAX) as u16
}

pub const fn press_raw_to_kpa(raw: u16) -> u16 {
    (raw as u32 * PRESS_FULL_SCALE_KPA / ADC_MAX) as u16
}

/// Inverse of [`temp_raw_to_celsius`], rounded up so it converts back exactly.
pub const fn celsius_to_temp_raw(celsius: u16) -> u16 {
    ((celsius as u32 * ADC_MAX).div_ceil(TEMP_FULL_SCALE_C)) as u16
}

/// Inverse of [`press_raw_to_kpa`], rounded up so it converts back exactly.
pub const fn kpa_to_press_raw(kpa: u16) -> u16 {
    ((kpa as u32 * ADC_MAX).div_ceil(PRESS_FULL_SCALE_KPA)) as u16
}

/// Latest raw samples.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessData {
    pub temp_raw: u16,
    pub press_raw: u16,
}

impl ProcessData {
    pub fn temperature_c(&self) -> u16 {
        temp_raw_to_celsius(self.temp_raw)
    }

    pub fn pressure_kpa(&self) -> u16 {
        press_raw_to_kpa(self.press_raw)
    }
}

/// Blackboard read by every task each pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct SharedData {
    pub process: ProcessData,
    pub config: ChamberConfig,
}
