// ── Point domain types ──

use chrono::{DateTime, Utc};
use reiri_api::{Attributes, PointTable, PointValue};
use serde::Serialize;
use strum::IntoEnumIterator;

use super::hvac::{FanStep, Flap, HvacMode, Power};
use crate::command::MAX_FLAP_POSITION;

/// Flap step count assumed when a unit does not report `flap_cap.D`.
const DEFAULT_FLAP_STEPS: u32 = 3;

/// One controller point (an indoor unit) with typed attribute access.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Point {
    pub id: String,
    pub attributes: Attributes,
}

impl Point {
    pub fn new(id: impl Into<String>, attributes: Attributes) -> Self {
        Self {
            id: id.into(),
            attributes,
        }
    }

    pub fn attribute(&self, key: &str) -> Option<&PointValue> {
        self.attributes.get(key)
    }

    fn text(&self, key: &str) -> Option<&str> {
        self.attribute(key).and_then(PointValue::as_str)
    }

    fn is_on(&self, key: &str) -> Option<bool> {
        self.attribute(key).map(|v| v.as_str() == Some("on"))
    }

    /// Display name, falling back to the point id.
    pub fn name(&self) -> &str {
        self.text("name").unwrap_or(&self.id)
    }

    /// Points with a `name` are air-conditioning units; others are auxiliary.
    pub fn is_climate_unit(&self) -> bool {
        self.attributes.contains_key("name")
    }

    /// Room temperature in °C.
    pub fn temperature(&self) -> Option<f64> {
        self.attribute("temp").and_then(PointValue::as_f64)
    }

    /// Outdoor temperature in °C, for units that report one.
    pub fn outdoor_temperature(&self) -> Option<f64> {
        self.attribute("otemp").and_then(PointValue::as_f64)
    }

    pub fn power(&self) -> Option<Power> {
        self.text("stat").and_then(Power::from_code)
    }

    pub fn mode(&self) -> Option<HvacMode> {
        self.text("mode").and_then(HvacMode::from_code)
    }

    /// Target temperature for the current mode.
    ///
    /// Cooling and heating keep separate setpoints (`csp`, `hsp`); every
    /// other mode uses the shared `sp`.
    pub fn setpoint(&self) -> Option<f64> {
        let key = match self.mode() {
            Some(HvacMode::Cool) => "csp",
            Some(HvacMode::Heat) => "hsp",
            _ => "sp",
        };
        self.attribute(key).and_then(PointValue::as_f64)
    }

    pub fn fan_step(&self) -> Option<FanStep> {
        self.text("fanstep").and_then(FanStep::from_code)
    }

    pub fn flap(&self) -> Option<Flap> {
        self.attribute("flap").and_then(Flap::from_value)
    }

    /// `Some(true)` when the filter needs cleaning; `None` if not reported.
    pub fn filter_alert(&self) -> Option<bool> {
        self.is_on("filter")
    }

    /// `Some(true)` while the compressor is running; `None` if not reported.
    pub fn thermo_active(&self) -> Option<bool> {
        self.is_on("thermo")
    }

    // ── Capabilities ─────────────────────────────────────────────────

    fn capability(&self, key: &str, flag: &str) -> Option<&PointValue> {
        self.attribute(key)?.as_map()?.get(flag)
    }

    /// Modes flagged in `mode_cap`.
    pub fn supported_modes(&self) -> Vec<HvacMode> {
        HvacMode::iter()
            .filter(|mode| {
                self.capability("mode_cap", mode.code())
                    .is_some_and(PointValue::is_truthy)
            })
            .collect()
    }

    /// Fan speeds derived from `fanstep_cap`.
    ///
    /// `A` adds auto; `S` is the number of fixed steps, with 2, 3 and 5
    /// mapping to the standard low/medium/high ladders.
    pub fn fan_steps(&self) -> Vec<FanStep> {
        let mut steps = Vec::new();
        if self
            .capability("fanstep_cap", "A")
            .is_some_and(PointValue::is_truthy)
        {
            steps.push(FanStep::Auto);
        }

        let count = self
            .capability("fanstep_cap", "S")
            .and_then(PointValue::as_i64)
            .unwrap_or(0);
        match count {
            2 => steps.extend([FanStep::Low, FanStep::High]),
            3 => steps.extend([FanStep::Low, FanStep::Medium, FanStep::High]),
            5 => steps.extend([
                FanStep::Low,
                FanStep::MediumLow,
                FanStep::Medium,
                FanStep::MediumHigh,
                FanStep::High,
            ]),
            n => {
                if n >= 1 {
                    steps.push(FanStep::Low);
                }
                if n >= 2 {
                    steps.push(FanStep::High);
                }
                if n >= 3 {
                    steps.push(FanStep::Medium);
                }
            }
        }
        steps
    }

    /// Louver step count from `flap_cap.D`; zero means no flap control.
    pub fn flap_steps(&self) -> u32 {
        self.capability("flap_cap", "D")
            .and_then(PointValue::as_i64)
            .map_or(DEFAULT_FLAP_STEPS, |n| u32::try_from(n).unwrap_or(0))
    }

    /// Flap settings offered for this unit: swing plus every fixed position.
    pub fn flap_options(&self) -> Vec<Flap> {
        if self.flap_steps() == 0 {
            return Vec::new();
        }
        std::iter::once(Flap::Swing)
            .chain((0..=MAX_FLAP_POSITION).map(Flap::Position))
            .collect()
    }
}

/// A point table captured at one instant, ordered by point id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointSnapshot {
    pub fetched_at: DateTime<Utc>,
    pub points: Vec<Point>,
}

impl PointSnapshot {
    pub fn new(table: PointTable, fetched_at: DateTime<Utc>) -> Self {
        // BTreeMap iteration is already sorted by id.
        let points = table
            .into_iter()
            .map(|(id, attributes)| Point::new(id, attributes))
            .collect();
        Self { fetched_at, points }
    }

    pub fn get(&self, id: &str) -> Option<&Point> {
        self.points.iter().find(|p| p.id == id)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Point> {
        self.points.iter()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn point(json: &str) -> Point {
        Point::new("p1", serde_json::from_str(json).unwrap())
    }

    #[test]
    fn reads_core_attributes() {
        let p = point(
            r#"{"name":"Living Room","temp":"24","otemp":31,"stat":"on","mode":"C",
                "csp":"22","hsp":"26","sp":"20","fanstep":"MH","flap":"S",
                "filter":"off","thermo":"on"}"#,
        );
        assert_eq!(p.name(), "Living Room");
        assert!(p.is_climate_unit());
        assert_eq!(p.temperature(), Some(24.0));
        assert_eq!(p.outdoor_temperature(), Some(31.0));
        assert_eq!(p.power(), Some(Power::On));
        assert_eq!(p.mode(), Some(HvacMode::Cool));
        assert_eq!(p.setpoint(), Some(22.0));
        assert_eq!(p.fan_step(), Some(FanStep::MediumHigh));
        assert_eq!(p.flap(), Some(Flap::Swing));
        assert_eq!(p.filter_alert(), Some(false));
        assert_eq!(p.thermo_active(), Some(true));
    }

    #[test]
    fn setpoint_follows_mode() {
        let heat = point(r#"{"mode":"H","csp":22,"hsp":26,"sp":20}"#);
        assert_eq!(heat.setpoint(), Some(26.0));
        let dry = point(r#"{"mode":"D","csp":22,"hsp":26,"sp":20}"#);
        assert_eq!(dry.setpoint(), Some(20.0));
        let unknown = point(r#"{"csp":22,"sp":21.5}"#);
        assert_eq!(unknown.setpoint(), Some(21.5));
    }

    #[test]
    fn missing_name_falls_back_to_id() {
        let p = point(r#"{"otemp":30}"#);
        assert_eq!(p.name(), "p1");
        assert!(!p.is_climate_unit());
        assert_eq!(p.filter_alert(), None);
        assert_eq!(p.temperature(), None);
    }

    #[test]
    fn supported_modes_follow_mode_cap() {
        let p = point(r#"{"mode_cap":{"A":1,"C":true,"D":false,"H":true}}"#);
        assert_eq!(
            p.supported_modes(),
            vec![HvacMode::Cool, HvacMode::Heat, HvacMode::Auto]
        );
        assert!(point("{}").supported_modes().is_empty());
    }

    #[test]
    fn fan_step_ladders() {
        let ladder = |cap: &str| point(&format!(r#"{{"fanstep_cap":{cap}}}"#)).fan_steps();

        assert_eq!(
            ladder(r#"{"A":true,"S":2}"#),
            vec![FanStep::Auto, FanStep::Low, FanStep::High]
        );
        assert_eq!(
            ladder(r#"{"S":3}"#),
            vec![FanStep::Low, FanStep::Medium, FanStep::High]
        );
        assert_eq!(
            ladder(r#"{"S":"5"}"#),
            vec![
                FanStep::Low,
                FanStep::MediumLow,
                FanStep::Medium,
                FanStep::MediumHigh,
                FanStep::High
            ]
        );
        assert_eq!(
            ladder(r#"{"S":4}"#),
            vec![FanStep::Low, FanStep::High, FanStep::Medium]
        );
        assert_eq!(ladder(r#"{"S":1}"#), vec![FanStep::Low]);
        assert!(ladder(r#"{"A":0}"#).is_empty());
    }

    #[test]
    fn flap_capability_defaults_to_supported() {
        assert_eq!(point("{}").flap_steps(), 3);
        assert_eq!(point("{}").flap_options().len(), 6);
        assert_eq!(point(r#"{"flap_cap":{"D":5}}"#).flap_steps(), 5);

        let fixed = point(r#"{"flap_cap":{"D":0}}"#);
        assert_eq!(fixed.flap_steps(), 0);
        assert!(fixed.flap_options().is_empty());
    }

    #[test]
    fn snapshot_orders_points_by_id() {
        let table: PointTable =
            serde_json::from_str(r#"{"p2":{"name":"B"},"p10":{"name":"C"},"p1":{"name":"A"}}"#)
                .unwrap();
        let snapshot = PointSnapshot::new(table, Utc::now());
        let ids: Vec<&str> = snapshot.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p10", "p2"]);
        assert_eq!(snapshot.get("p10").map(Point::name), Some("C"));
        assert!(snapshot.get("p3").is_none());
    }
}
