//! Chamber configuration record.
//!
//! Seven operator-tunable parameters, edited from the menu and persisted
//! as one fixed-size record in the EEPROM.  Every field has a compiled
//! `[min, max]` domain; [`ChamberConfig::from_record`] keeps a stored value
//! only when it lies inside that domain and falls back to the compiled
//! default otherwise, field by field.

use serde::{Deserialize, Serialize};

/// Timing constants shared by the scheduler and the tasks.
pub mod timing {
    /// Period of the tick interrupt in milliseconds.
    pub const TICK_PERIOD_MS: u32 = 1;
    /// System FSM status-bar refresh interval, in elapsed ticks.
    pub const STATUS_INTERVAL_TICKS: u32 = 500;
    /// Menu FSM pass interval, in elapsed ticks.
    pub const MENU_INTERVAL_TICKS: u32 = 50;
}

/// Byte offset of the record inside the EEPROM.
pub const RECORD_OFFSET: u16 = 0;
/// Size of the encoded record: six little-endian `u16` plus one flag byte.
pub const RECORD_LEN: usize = 13;

// ---------------------------------------------------------------------------
// Field catalogue
// ---------------------------------------------------------------------------

/// Identity of a single configuration field, in record order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    TempSetpoint,
    TempHysteresis,
    TempAlarmLimit,
    PressSetpoint,
    PressHysteresis,
    PressAlarmLimit,
    AlarmEnable,
}

/// Compiled domain of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLimits {
    pub min: u16,
    pub max: u16,
    pub default: u16,
    pub step: u16,
}

impl FieldLimits {
    const fn new(min: u16, max: u16, default: u16, step: u16) -> Self {
        Self {
            min,
            max,
            default,
            step,
        }
    }

    pub const fn contains(&self, value: u16) -> bool {
        value >= self.min && value <= self.max
    }

    /// `value + step`, wrapping to `min` past `max`.
    pub const fn next(&self, value: u16) -> u16 {
        match value.checked_add(self.step) {
            Some(v) if v <= self.max => v,
            _ => self.min,
        }
    }

    /// `value - step`, wrapping to `max` below `min`.
    pub const fn previous(&self, value: u16) -> u16 {
        match value.checked_sub(self.step) {
            Some(v) if v >= self.min => v,
            _ => self.max,
        }
    }
}

impl Field {
    pub const ALL: [Field; 7] = [
        Field::TempSetpoint,
        Field::TempHysteresis,
        Field::TempAlarmLimit,
        Field::PressSetpoint,
        Field::PressHysteresis,
        Field::PressAlarmLimit,
        Field::AlarmEnable,
    ];

    pub const fn limits(self) -> FieldLimits {
        match self {
            Self::TempSetpoint => FieldLimits::new(0, 80, 25, 1),
            Self::TempHysteresis => FieldLimits::new(1, 10, 2, 1),
            Self::TempAlarmLimit => FieldLimits::new(0, 100, 40, 1),
            Self::PressSetpoint => FieldLimits::new(0, 110, 101, 1),
            Self::PressHysteresis => FieldLimits::new(1, 20, 5, 1),
            Self::PressAlarmLimit => FieldLimits::new(0, 110, 105, 1),
            Self::AlarmEnable => FieldLimits::new(0, 1, 1, 1),
        }
    }

    /// Screen title used while the field is being edited (max 16 chars).
    pub const fn label(self) -> &'static str {
        match self {
            Self::TempSetpoint => "Temp setpoint",
            Self::TempHysteresis => "Temp hysteresis",
            Self::TempAlarmLimit => "Temp alarm limit",
            Self::PressSetpoint => "Press setpoint",
            Self::PressHysteresis => "Press hysteresis",
            Self::PressAlarmLimit => "Press alarm lim.",
            Self::AlarmEnable => "Alarm enable",
        }
    }

    pub const fn unit(self) -> &'static str {
        match self {
            Self::TempSetpoint | Self::TempHysteresis | Self::TempAlarmLimit => "\u{b0}C",
            Self::PressSetpoint | Self::PressHysteresis | Self::PressAlarmLimit => "kPa",
            Self::AlarmEnable => "",
        }
    }
}

// ---------------------------------------------------------------------------
// Live configuration
// ---------------------------------------------------------------------------

/// Live configuration, in display units (degrees Celsius, kPa).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChamberConfig {
    pub temp_setpoint: u16,
    pub temp_hysteresis: u16,
    pub temp_alarm_limit: u16,
    pub press_setpoint: u16,
    pub press_hysteresis: u16,
    pub press_alarm_limit: u16,
    pub alarm_enable: bool,
}

impl Default for ChamberConfig {
    fn default() -> Self {
        Self {
            temp_setpoint: Field::TempSetpoint.limits().default,
            temp_hysteresis: Field::TempHysteresis.limits().default,
            temp_alarm_limit: Field::TempAlarmLimit.limits().default,
            press_setpoint: Field::PressSetpoint.limits().default,
            press_hysteresis: Field::PressHysteresis.limits().default,
            press_alarm_limit: Field::PressAlarmLimit.limits().default,
            alarm_enable: Field::AlarmEnable.limits().default != 0,
        }
    }
}

impl ChamberConfig {
    pub fn get(&self, field: Field) -> u16 {
        match field {
            Field::TempSetpoint => self.temp_setpoint,
            Field::TempHysteresis => self.temp_hysteresis,
            Field::TempAlarmLimit => self.temp_alarm_limit,
            Field::PressSetpoint => self.press_setpoint,
            Field::PressHysteresis => self.press_hysteresis,
            Field::PressAlarmLimit => self.press_alarm_limit,
            Field::AlarmEnable => u16::from(self.alarm_enable),
        }
    }

    /// Store `value`, clamped into the field's domain.
    pub fn set(&mut self, field: Field, value: u16) {
        let limits = field.limits();
        let value = value.clamp(limits.min, limits.max);
        match field {
            Field::TempSetpoint => self.temp_setpoint = value,
            Field::TempHysteresis => self.temp_hysteresis = value,
            Field::TempAlarmLimit => self.temp_alarm_limit = value,
            Field::PressSetpoint => self.press_setpoint = value,
            Field::PressHysteresis => self.press_hysteresis = value,
            Field::PressAlarmLimit => self.press_alarm_limit = value,
            Field::AlarmEnable => self.alarm_enable = value != 0,
        }
    }

    /// True when every field lies inside its compiled domain.
    pub fn is_valid(&self) -> bool {
        Field::ALL
            .iter()
            .all(|f| f.limits().contains(self.get(*f)))
    }

    /// Encode into the fixed persisted layout.
    pub fn to_record(&self) -> [u8; RECORD_LEN] {
        let mut buf = [0u8; RECORD_LEN];
        let written = postcard::to_slice(&StoredRecord::from(self), &mut buf).map(|s| s.len());
        debug_assert!(matches!(written, Ok(RECORD_LEN)));
        buf
    }

    /// Decode a stored record and repair it field by field.
    ///
    /// Never fails: a short or undecodable buffer yields the defaults, and
    /// each out-of-domain field is replaced by its default independently.
    pub fn from_record(bytes: &[u8]) -> Self {
        match postcard::from_bytes::<StoredRecord>(bytes) {
            Ok(record) => Self::recover(&record),
            Err(_) => Self::default(),
        }
    }

    fn recover(record: &StoredRecord) -> Self {
        let pick = |field: Field, raw: u16| {
            let limits = field.limits();
            if limits.contains(raw) {
                raw
            } else {
                log::warn!(
                    "config: {:?}={} outside [{}, {}], using default {}",
                    field,
                    raw,
                    limits.min,
                    limits.max,
                    limits.default
                );
                limits.default
            }
        };

        Self {
            temp_setpoint: pick(Field::TempSetpoint, record.temp_setpoint),
            temp_hysteresis: pick(Field::TempHysteresis, record.temp_hysteresis),
            temp_alarm_limit: pick(Field::TempAlarmLimit, record.temp_alarm_limit),
            press_setpoint: pick(Field::PressSetpoint, record.press_setpoint),
            press_hysteresis: pick(Field::PressHysteresis, record.press_hysteresis),
            press_alarm_limit: pick(Field::PressAlarmLimit, record.press_alarm_limit),
            // Boolean flag: any byte is a valid value.
            alarm_enable: record.alarm_enable != 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Persisted layout
// ---------------------------------------------------------------------------

/// On-device layout. Fixed-width integers keep the record at a constant size.
#[derive(Debug, Serialize, Deserialize)]
struct StoredRecord {
    #[serde(with = "postcard::fixint::le")]
    temp_setpoint: u16,
    #[serde(with = "postcard::fixint::le")]
    temp_hysteresis: u16,
    #[serde(with = "postcard::fixint::le")]
    temp_alarm_limit: u16,
    #[serde(with = "postcard::fixint::le")]
    press_setpoint: u16,
    #[serde(with = "postcard::fixint::le")]
    press_hysteresis: u16,
    #[serde(with = "postcard::fixint::le")]
    press_alarm_limit: u16,
    alarm_enable: u8,
}

impl From<&ChamberConfig> for StoredRecord {
    fn from(cfg: &ChamberConfig) -> Self {
        Self {
            temp_setpoint: cfg.temp_setpoint,
            temp_hysteresis: cfg.temp_hysteresis,
            temp_alarm_limit: cfg.temp_alarm_limit,
            press_setpoint: cfg.press_setpoint,
            press_hysteresis: cfg.press_hysteresis,
            press_alarm_limit: cfg.press_alarm_limit,
            alarm_enable: u8::from(cfg.alarm_enable),
        }
    }
}
