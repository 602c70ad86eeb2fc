//! Thermostat schedule rules.
//!
//! Schedules are the list attribute the engine was first built for. Each
//! schedule drives one system mode and holds a list of weekly transitions.
//! Quotas come from the device's [`ScheduleLimits`]: a total number of
//! schedules plus a per-mode number from the matching [`ScheduleType`].

use crate::error::{TxnError, TxnResult};
use crate::rules::EntryRules;
use crate::types::{Entry, Handle};
use serde::{Deserialize, Serialize};

/// Last valid transition time, in minutes after midnight.
pub const MAX_TRANSITION_TIME: u16 = 1439;

/// Bits of the day-of-week bitmap, Sunday through Saturday.
pub const ALL_DAYS: u8 = 0x7F;

/// Thermostat system mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemMode {
    /// System off.
    Off,
    /// Heat or cool as needed.
    Auto,
    /// Cooling.
    Cool,
    /// Heating.
    Heat,
    /// Emergency heating.
    EmergencyHeat,
    /// Pre-cooling.
    Precooling,
    /// Fan only.
    FanOnly,
    /// Dehumidifying.
    Dry,
    /// Sleep.
    Sleep,
}

/// One weekly transition of a schedule.
///
/// Exactly one of `preset_handle`, `system_mode` or the setpoints must be
/// given. The setpoints count as one choice and may be given together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleTransition {
    /// Days the transition applies to, bit 0 is Sunday.
    pub day_of_week: u8,
    /// Minutes after midnight.
    pub transition_time: u16,
    /// Preset to switch to.
    #[serde(default)]
    pub preset_handle: Option<Handle>,
    /// System mode to switch to.
    #[serde(default)]
    pub system_mode: Option<SystemMode>,
    /// Cooling setpoint in hundredths of a degree Celsius.
    #[serde(default)]
    pub cooling_setpoint: Option<i16>,
    /// Heating setpoint in hundredths of a degree Celsius.
    #[serde(default)]
    pub heating_setpoint: Option<i16>,
}

impl ScheduleTransition {
    /// Creates a transition to a preset.
    #[must_use]
    pub fn to_preset(day_of_week: u8, transition_time: u16, preset: Handle) -> Self {
        Self {
            day_of_week,
            transition_time,
            preset_handle: Some(preset),
            system_mode: None,
            cooling_setpoint: None,
            heating_setpoint: None,
        }
    }

    /// Creates a transition to a system mode.
    #[must_use]
    pub fn to_mode(day_of_week: u8, transition_time: u16, mode: SystemMode) -> Self {
        Self {
            day_of_week,
            transition_time,
            preset_handle: None,
            system_mode: Some(mode),
            cooling_setpoint: None,
            heating_setpoint: None,
        }
    }

    /// Creates a transition to a heating setpoint.
    #[must_use]
    pub fn to_heating(day_of_week: u8, transition_time: u16, setpoint: i16) -> Self {
        Self {
            day_of_week,
            transition_time,
            preset_handle: None,
            system_mode: None,
            cooling_setpoint: None,
            heating_setpoint: Some(setpoint),
        }
    }

    fn uses_setpoints(&self) -> bool {
        self.cooling_setpoint.is_some() || self.heating_setpoint.is_some()
    }

    fn targets(&self) -> usize {
        usize::from(self.preset_handle.is_some())
            + usize::from(self.system_mode.is_some())
            + usize::from(self.uses_setpoints())
    }
}

/// A thermostat schedule, the payload of a schedule list entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    /// Mode the schedule drives; also its quota category.
    pub system_mode: SystemMode,
    /// Optional user-visible name.
    #[serde(default)]
    pub name: Option<String>,
    /// Preset applied for the whole schedule.
    #[serde(default)]
    pub preset_handle: Option<Handle>,
    /// Weekly transitions.
    pub transitions: Vec<ScheduleTransition>,
}

impl Schedule {
    /// Creates an unnamed schedule.
    #[must_use]
    pub fn new(system_mode: SystemMode, transitions: Vec<ScheduleTransition>) -> Self {
        Self {
            system_mode,
            name: None,
            preset_handle: None,
            transitions,
        }
    }

    /// Sets the name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the schedule-wide preset.
    #[must_use]
    pub fn with_preset(mut self, preset: Handle) -> Self {
        self.preset_handle = Some(preset);
        self
    }
}

/// What the device supports for schedules of one system mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleType {
    /// The system mode.
    pub system_mode: SystemMode,
    /// Maximum number of schedules for this mode.
    pub number_of_schedules: usize,
    /// Whether schedules may carry a name.
    #[serde(default)]
    pub supports_names: bool,
    /// Whether schedules and transitions may reference presets.
    #[serde(default)]
    pub supports_presets: bool,
    /// Whether transitions may carry setpoints.
    #[serde(default)]
    pub supports_setpoints: bool,
    /// Whether transitions may switch the system off.
    #[serde(default)]
    pub supports_off: bool,
}

/// Schedule limits published by a thermostat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleLimits {
    /// Maximum number of schedules.
    pub number_of_schedules: usize,
    /// Maximum number of transitions in one schedule.
    pub number_of_schedule_transitions: usize,
    /// Maximum number of transitions on any one day, if limited.
    #[serde(default)]
    pub number_of_schedule_transitions_per_day: Option<usize>,
    /// Supported schedule types, one per system mode.
    pub schedule_types: Vec<ScheduleType>,
}

impl ScheduleLimits {
    /// Returns the schedule type for `mode`.
    #[must_use]
    pub fn schedule_type(&self, mode: SystemMode) -> Option<&ScheduleType> {
        self.schedule_types.iter().find(|t| t.system_mode == mode)
    }
}

/// [`EntryRules`] for thermostat schedules.
#[derive(Debug, Clone)]
pub struct ScheduleRules {
    limits: ScheduleLimits,
}

impl ScheduleRules {
    /// Creates rules from the device limits.
    #[must_use]
    pub fn new(limits: ScheduleLimits) -> Self {
        Self { limits }
    }

    /// Returns the device limits.
    #[must_use]
    pub fn limits(&self) -> &ScheduleLimits {
        &self.limits
    }

    fn check_transition(
        schedule_type: &ScheduleType,
        index: usize,
        transition: &ScheduleTransition,
    ) -> TxnResult<()> {
        if transition.transition_time > MAX_TRANSITION_TIME {
            return Err(TxnError::constraint(format!(
                "transition {index}: time {} is past {MAX_TRANSITION_TIME}",
                transition.transition_time
            )));
        }
        if transition.day_of_week == 0 || transition.day_of_week > ALL_DAYS {
            return Err(TxnError::constraint(format!(
                "transition {index}: invalid day bitmap {:#04x}",
                transition.day_of_week
            )));
        }
        if transition.targets() != 1 {
            return Err(TxnError::constraint(format!(
                "transition {index}: needs exactly one of preset, system mode or setpoints"
            )));
        }
        if transition.preset_handle.is_some() && !schedule_type.supports_presets {
            return Err(TxnError::constraint(format!(
                "transition {index}: presets are not supported"
            )));
        }
        if transition.uses_setpoints() && !schedule_type.supports_setpoints {
            return Err(TxnError::constraint(format!(
                "transition {index}: setpoints are not supported"
            )));
        }
        if transition.system_mode == Some(SystemMode::Off) && !schedule_type.supports_off {
            return Err(TxnError::constraint(format!(
                "transition {index}: off is not supported"
            )));
        }
        Ok(())
    }

    fn check_transitions_per_day(&self, transitions: &[ScheduleTransition]) -> TxnResult<()> {
        let Some(per_day) = self.limits.number_of_schedule_transitions_per_day else {
            return Ok(());
        };

        for day in 0..7 {
            let count = transitions
                .iter()
                .filter(|t| t.day_of_week & (1 << day) != 0)
                .count();
            if count > per_day {
                return Err(TxnError::constraint(format!(
                    "day {day} has {count} transitions, limit is {per_day}"
                )));
            }
        }
        Ok(())
    }
}

impl EntryRules<Schedule> for ScheduleRules {
    type Category = SystemMode;

    fn category_of(&self, entry: &Entry<Schedule>) -> SystemMode {
        entry.payload.system_mode
    }

    fn max_entries(&self) -> usize {
        self.limits.number_of_schedules
    }

    fn max_per_category(&self, category: &SystemMode) -> usize {
        self.limits
            .schedule_type(*category)
            .map_or(0, |t| t.number_of_schedules)
    }

    fn check_entry(&self, entry: &Entry<Schedule>) -> TxnResult<()> {
        let schedule = &entry.payload;
        let schedule_type = self
            .limits
            .schedule_type(schedule.system_mode)
            .ok_or_else(|| {
                TxnError::constraint(format!(
                    "no schedule type for {:?}",
                    schedule.system_mode
                ))
            })?;

        if schedule.name.is_some() && !schedule_type.supports_names {
            return Err(TxnError::constraint("schedule names are not supported"));
        }
        if schedule.preset_handle.is_some() && !schedule_type.supports_presets {
            return Err(TxnError::constraint("schedule presets are not supported"));
        }

        let count = schedule.transitions.len();
        if count == 0 || count > self.limits.number_of_schedule_transitions {
            return Err(TxnError::constraint(format!(
                "schedule has {count} transitions, allowed 1..={}",
                self.limits.number_of_schedule_transitions
            )));
        }

        for (index, transition) in schedule.transitions.iter().enumerate() {
            Self::check_transition(schedule_type, index, transition)?;
        }
        self.check_transitions_per_day(&schedule.transitions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heat_type() -> ScheduleType {
        ScheduleType {
            system_mode: SystemMode::Heat,
            number_of_schedules: 2,
            supports_names: true,
            supports_presets: false,
            supports_setpoints: true,
            supports_off: false,
        }
    }

    fn rules() -> ScheduleRules {
        ScheduleRules::new(ScheduleLimits {
            number_of_schedules: 3,
            number_of_schedule_transitions: 4,
            number_of_schedule_transitions_per_day: Some(2),
            schedule_types: vec![heat_type()],
        })
    }

    fn heat(transitions: Vec<ScheduleTransition>) -> Entry<Schedule> {
        Entry::new(Schedule::new(SystemMode::Heat, transitions))
    }

    fn is_constraint<T>(result: TxnResult<T>) -> bool {
        matches!(result, Err(TxnError::ConstraintViolation { .. }))
    }

    #[test]
    fn quotas_follow_schedule_types() {
        let rules = rules();
        assert_eq!(rules.max_entries(), 3);
        assert_eq!(rules.max_per_category(&SystemMode::Heat), 2);
        assert_eq!(rules.max_per_category(&SystemMode::Cool), 0);
        assert_eq!(rules.category_of(&heat(vec![])), SystemMode::Heat);
    }

    #[test]
    fn accepts_valid_schedule() {
        let entry = heat(vec![
            ScheduleTransition::to_heating(0b000_0001, 360, 2100),
            ScheduleTransition::to_heating(0b011_1110, 1380, 1800),
        ]);
        rules().check_entry(&entry).unwrap();

        let named = Entry::new(entry.payload.with_name("weekday"));
        rules().check_entry(&named).unwrap();
    }

    #[test]
    fn rejects_unknown_mode() {
        let entry = Entry::new(Schedule::new(
            SystemMode::Cool,
            vec![ScheduleTransition::to_mode(1, 0, SystemMode::Cool)],
        ));
        assert!(is_constraint(rules().check_entry(&entry)));
    }

    #[test]
    fn rejects_unsupported_features() {
        let preset = Handle::from_bytes(vec![1]);

        let entry = Entry::new(
            Schedule::new(SystemMode::Heat, vec![ScheduleTransition::to_heating(1, 0, 2000)])
                .with_preset(preset.clone()),
        );
        assert!(is_constraint(rules().check_entry(&entry)));

        let entry = heat(vec![ScheduleTransition::to_preset(1, 0, preset)]);
        assert!(is_constraint(rules().check_entry(&entry)));

        let entry = heat(vec![ScheduleTransition::to_mode(1, 0, SystemMode::Off)]);
        assert!(is_constraint(rules().check_entry(&entry)));
    }

    #[test]
    fn rejects_bad_transition_counts() {
        assert!(is_constraint(rules().check_entry(&heat(vec![]))));

        let five = (0..5)
            .map(|i| ScheduleTransition::to_heating(1 << i, 0, 2000))
            .collect();
        assert!(is_constraint(rules().check_entry(&heat(five))));

        let crowded_monday = vec![
            ScheduleTransition::to_heating(0b10, 0, 2000),
            ScheduleTransition::to_heating(0b10, 60, 2000),
            ScheduleTransition::to_heating(0b11, 120, 2000),
        ];
        assert!(is_constraint(rules().check_entry(&heat(crowded_monday))));
    }

    #[test]
    fn rejects_malformed_transitions() {
        let late = ScheduleTransition::to_heating(1, 1440, 2000);
        assert!(is_constraint(rules().check_entry(&heat(vec![late]))));

        let no_day = ScheduleTransition::to_heating(0, 0, 2000);
        assert!(is_constraint(rules().check_entry(&heat(vec![no_day]))));

        let eighth_day = ScheduleTransition::to_heating(0x80, 0, 2000);
        assert!(is_constraint(rules().check_entry(&heat(vec![eighth_day]))));

        let mut two_targets = ScheduleTransition::to_heating(1, 0, 2000);
        two_targets.system_mode = Some(SystemMode::Heat);
        assert!(is_constraint(rules().check_entry(&heat(vec![two_targets]))));

        let mut no_target = ScheduleTransition::to_heating(1, 0, 2000);
        no_target.heating_setpoint = None;
        assert!(is_constraint(rules().check_entry(&heat(vec![no_target]))));
    }

    #[test]
    fn limits_from_json() {
        let json = r#"{
            "number_of_schedules": 4,
            "number_of_schedule_transitions": 6,
            "schedule_types": [
                {"system_mode": "heat", "number_of_schedules": 2, "supports_setpoints": true}
            ]
        }"#;
        let limits: ScheduleLimits = serde_json::from_str(json).unwrap();
        assert_eq!(limits.number_of_schedule_transitions_per_day, None);
        let heat = limits.schedule_type(SystemMode::Heat).unwrap();
        assert!(heat.supports_setpoints);
        assert!(!heat.supports_names);
    }
}
