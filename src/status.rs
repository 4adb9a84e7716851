//! Alarm/status register bit layout.

use modular_bitfield::prelude::*;

/// Decoded alarm/status word, bit 0 first.
#[bitfield]
#[derive(Debug, Clone, Copy)]
pub struct StatusFlags {
    pub high_alarm_1: bool,
    pub low_alarm_1: bool,
    pub high_alarm_2: bool,
    pub low_alarm_2: bool,
    pub open_control_sensor: bool,
    pub open_secondary_sensor: bool,
    pub keypad_value_change: bool,
    #[skip]
    __: B9,
}

/// Display names, in bit order.
const LABELS: [&str; 7] = [
    "HIGH ALARM 1",
    "LOW ALARM 1",
    "HIGH ALARM 2",
    "LOW ALARM 2",
    "OPEN CONTROL SENSOR",
    "OPEN SECONDARY SENSOR",
    "KEYPAD VALUE CHANGE",
];

impl StatusFlags {
    /// Decode the raw status/alarm register value.
    pub fn from_raw(raw: i16) -> Self {
        Self::from_bytes((raw as u16).to_le_bytes())
    }

    /// Names of the flags currently set, in bit order.
    pub fn active_labels(&self) -> impl Iterator<Item = &'static str> {
        let set = [
            self.high_alarm_1(),
            self.low_alarm_1(),
            self.high_alarm_2(),
            self.low_alarm_2(),
            self.open_control_sensor(),
            self.open_secondary_sensor(),
            self.keypad_value_change(),
        ];
        LABELS.iter().zip(set).filter_map(|(label, bit)| bit.then_some(*label))
    }

    /// Whether the secondary sensor reading is meaningful. An open
    /// secondary sensor makes the auxiliary temperature read garbage.
    pub fn aux_sensor_present(&self) -> bool {
        !self.open_secondary_sensor()
    }
}
