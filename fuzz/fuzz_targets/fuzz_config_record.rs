//! Fuzz target: persisted configuration record
//!
//! Feeds arbitrary EEPROM contents to the record decoder and checks:
//! - No panics for any length or content
//! - Every decoded field lies inside its limits
//! - Re-encoding a decoded record and decoding again is stable
//!
//! cargo fuzz run fuzz_config_record

#![no_main]

use libfuzzer_sys::fuzz_target;
use thermovac::config::ChamberConfig;

fuzz_target!(|data: &[u8]| {
    let cfg = ChamberConfig::from_record(data);
    assert!(cfg.is_valid(), "out-of-range field survived decoding: {cfg:?}");

    let again = ChamberConfig::from_record(&cfg.to_record());
    assert_eq!(again, cfg);
});
