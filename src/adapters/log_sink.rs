//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events through
//! the `log` facade, which the board routes to its serial console.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started(cfg) => {
                info!(
                    "START | T sp={}C hyst={} lim={} | P sp={}kPa hyst={} lim={} | alarm={}",
                    cfg.temp_setpoint,
                    cfg.temp_hysteresis,
                    cfg.temp_alarm_limit,
                    cfg.press_setpoint,
                    cfg.press_hysteresis,
                    cfg.press_alarm_limit,
                    if cfg.alarm_enable { "on" } else { "off" },
                );
            }
            AppEvent::ModeChanged { from, to } => {
                info!("MODE  | {:?} -> {:?}", from, to);
            }
            AppEvent::DriveChanged { plant, drive } => {
                info!("DRIVE | {:?} {:?}", plant, drive);
            }
            AppEvent::AlarmRaised { temp_c, press_kpa } => {
                warn!("ALARM | raised at T={}C P={}kPa", temp_c, press_kpa);
            }
            AppEvent::AlarmCleared => {
                info!("ALARM | cleared");
            }
            AppEvent::ConfigCommitted { field, value } => {
                info!("CONF  | {:?} = {}", field, value);
            }
            AppEvent::ConfigSaved => {
                info!("CONF  | save started");
            }
            AppEvent::ConfigSaveFailed(e) => {
                warn!("CONF  | save refused: {}", e);
            }
            AppEvent::DisplayFault(e) => {
                warn!("LCD   | {}", e);
            }
        }
    }
}
