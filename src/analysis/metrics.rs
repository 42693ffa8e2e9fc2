//! Metrics calculator and maintenance indicators.
//!
//! `efficiency_ratio` is consumption over production (a load factor), kept
//! with this exact definition for compatibility with existing reports.

use crate::domain::{MaintenanceAlert, MetricsSnapshot, Record};

/// Efficiency below this percentage raises a low-efficiency alert.
pub const LOW_EFFICIENCY_THRESHOLD_PCT: f64 = 70.0;

/// Battery consumption above this share of total consumption raises an alert.
pub const HIGH_BATTERY_LOAD_SHARE: f64 = 0.8;

/// Energy-type label identifying battery records.
pub const BATTERY_ENERGY_TYPE: &str = "Batterie";

/// Compute the metrics snapshot of a filtered view.
pub fn compute_metrics(records: &[Record]) -> MetricsSnapshot {
    // `f64::sum` of an empty iterator is -0.0.
    let total_production = records.iter().fold(0.0_f64, |acc, r| acc + r.production_kwh);
    let total_consumption = records.iter().fold(0.0_f64, |acc, r| acc + r.consumption_kwh);

    let efficiency_ratio = if total_production > 0.0 {
        total_consumption / total_production * 100.0
    } else {
        0.0
    };

    let is_battery = |r: &&Record| r.energy_type == BATTERY_ENERGY_TYPE;
    let battery_consumption = records
        .iter()
        .any(|r| is_battery(&r))
        .then(|| records.iter().filter(is_battery).fold(0.0_f64, |acc, r| acc + r.consumption_kwh));

    let battery_load_ratio = battery_consumption.map(|b| {
        if total_consumption > 0.0 {
            b / total_consumption
        } else {
            0.0
        }
    });

    let high_battery_load = battery_consumption
        .is_some_and(|b| b > HIGH_BATTERY_LOAD_SHARE * total_consumption);

    MetricsSnapshot {
        total_production,
        total_consumption,
        efficiency_ratio,
        battery_consumption,
        battery_load_ratio,
        low_efficiency: efficiency_ratio < LOW_EFFICIENCY_THRESHOLD_PCT,
        high_battery_load,
    }
}

/// Alerts raised by a snapshot, low efficiency first.
pub fn maintenance_alerts(metrics: &MetricsSnapshot) -> Vec<MaintenanceAlert> {
    let mut alerts = Vec::new();
    if metrics.low_efficiency {
        alerts.push(MaintenanceAlert::LowEfficiency {
            efficiency_ratio: metrics.efficiency_ratio,
            threshold: LOW_EFFICIENCY_THRESHOLD_PCT,
        });
    }
    if metrics.high_battery_load {
        alerts.push(MaintenanceAlert::HighBatteryLoad {
            battery_load_ratio: metrics.battery_load_ratio.unwrap_or(0.0),
        });
    }
    alerts
}
