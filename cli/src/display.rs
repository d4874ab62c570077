//! Terminal rendering for metric records
//!
//! Plain-text bar gauges for the sleep/recovery/strain views. Presentation
//! only: absent values render as `-`, and nothing here validates the
//! records beyond reading optional fields.

use whoop_api::{CycleRecord, RecoveryRecord, SleepRecord};

const BAR_WIDTH: usize = 28;

/// Fixed-width gauge: `value` out of `max` as filled/empty blocks.
fn bar(value: f64, max: f64, width: usize) -> String {
    let safe = if max > 0.0 {
        value.clamp(0.0, max)
    } else {
        0.0
    };
    let fill = if max > 0.0 {
        ((safe / max) * width as f64).round() as usize
    } else {
        0
    };
    let fill = fill.min(width);
    format!("{}{}", "█".repeat(fill), "░".repeat(width - fill))
}

fn ms_to_hours(ms: Option<u64>) -> String {
    match ms {
        Some(ms) if ms > 0 => format!("{:.2}h", ms as f64 / 3_600_000.0),
        _ => "-".to_string(),
    }
}

fn fmt_count(value: Option<u64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

fn fmt_bpm(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.0}"))
}

/// Date part of an ISO-8601 timestamp, `unknown` when absent.
fn day_label(iso: Option<&str>) -> String {
    iso.map_or_else(
        || "unknown".to_string(),
        |s| s.split('T').next().unwrap_or(s).to_string(),
    )
}

pub fn print_sleep(records: &[SleepRecord]) {
    println!("\nSleep (last {})", records.len());
    for r in records {
        let score = r.score.as_ref();
        let stages = score.and_then(|s| s.stage_summary.as_ref());
        let perf = score
            .and_then(|s| s.sleep_performance_percentage)
            .unwrap_or(0.0);
        let eff = score
            .and_then(|s| s.sleep_efficiency_percentage)
            .unwrap_or(0.0);
        let in_bed_hours = stages
            .and_then(|s| s.total_in_bed_time_milli)
            .unwrap_or(0) as f64
            / 3_600_000.0;

        println!(
            "\n{}  {} → {}",
            day_label(r.start.as_deref()),
            r.start.as_deref().unwrap_or("-"),
            r.end.as_deref().unwrap_or("-")
        );
        println!("  perf  {} {perf:>3.0}%", bar(perf, 100.0, BAR_WIDTH));
        println!("  eff   {} {eff:>3.0}%", bar(eff, 100.0, BAR_WIDTH));
        println!(
            "  bed   {} {in_bed_hours:.1}h",
            bar(in_bed_hours, 12.0, BAR_WIDTH)
        );
        println!(
            "  awake {} | disturbances: {}",
            ms_to_hours(stages.and_then(|s| s.total_awake_time_milli)),
            fmt_count(stages.and_then(|s| s.disturbance_count))
        );
    }
}

pub fn print_recovery(records: &[RecoveryRecord]) {
    println!("\nRecovery (last {})", records.len());

    // Scale the HRV gauge to the best observed value, with a floor so a
    // quiet week still renders on a sane axis
    let hrv_max = records
        .iter()
        .filter_map(|r| r.score.as_ref().and_then(|s| s.hrv_rmssd_milli))
        .filter(|v| v.is_finite() && *v > 0.0)
        .fold(60.0_f64, f64::max);

    for r in records {
        let score = r.score.as_ref();
        let rec = score.and_then(|s| s.recovery_score).unwrap_or(0.0);
        let hrv = score.and_then(|s| s.hrv_rmssd_milli).unwrap_or(0.0);

        println!("\n{}", day_label(r.created_at.as_deref()));
        println!("  rec   {} {rec:>3.0}%", bar(rec, 100.0, BAR_WIDTH));
        println!(
            "  hrv   {} {}",
            bar(hrv, hrv_max, BAR_WIDTH),
            if hrv > 0.0 {
                format!("{hrv:.1} ms")
            } else {
                "-".to_string()
            }
        );
        println!(
            "  RHR: {} bpm | SpO2: {}%",
            fmt_bpm(score.and_then(|s| s.resting_heart_rate)),
            score
                .and_then(|s| s.spo2_percentage)
                .map_or_else(|| "-".to_string(), |v| format!("{v:.1}"))
        );
    }
}

pub fn print_strain(records: &[CycleRecord]) {
    println!("\nStrain (last {} cycles)", records.len());
    for r in records {
        let score = r.score.as_ref();
        let strain = score.and_then(|s| s.strain).unwrap_or(0.0);

        println!("\n{}", day_label(r.start.as_deref()));
        println!(
            "  strain {} {}",
            // WHOOP strain tops out at 21
            bar(strain, 21.0, BAR_WIDTH),
            if strain > 0.0 {
                format!("{strain:.1}")
            } else {
                "-".to_string()
            }
        );
        println!(
            "  avg HR: {} bpm | max HR: {} bpm",
            fmt_bpm(score.and_then(|s| s.average_heart_rate)),
            fmt_bpm(score.and_then(|s| s.max_heart_rate))
        );
    }
}

pub fn print_profile(profile: &whoop_api::UserProfile) {
    println!("\nProfile");
    println!(
        "  {} {}",
        profile.first_name.as_deref().unwrap_or("-"),
        profile.last_name.as_deref().unwrap_or("-")
    );
    println!("  {}", profile.email.as_deref().unwrap_or("-"));
    println!(
        "  user_id: {}",
        profile
            .user_id
            .map_or_else(|| "-".to_string(), |v| v.to_string())
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill_count(rendered: &str) -> usize {
        rendered.chars().filter(|c| *c == '█').count()
    }

    #[test]
    fn bar_is_always_the_requested_width() {
        for value in [-5.0, 0.0, 13.0, 100.0, 250.0] {
            let rendered = bar(value, 100.0, 28);
            assert_eq!(rendered.chars().count(), 28, "value {value}");
        }
    }

    #[test]
    fn bar_fills_proportionally() {
        assert_eq!(fill_count(&bar(0.0, 100.0, 28)), 0);
        assert_eq!(fill_count(&bar(50.0, 100.0, 28)), 14);
        assert_eq!(fill_count(&bar(100.0, 100.0, 28)), 28);
    }

    #[test]
    fn bar_clamps_out_of_range_values() {
        assert_eq!(fill_count(&bar(500.0, 100.0, 28)), 28);
        assert_eq!(fill_count(&bar(-3.0, 100.0, 28)), 0);
    }

    #[test]
    fn bar_with_zero_max_is_empty() {
        assert_eq!(fill_count(&bar(10.0, 0.0, 28)), 0);
    }

    #[test]
    fn ms_to_hours_formats_and_dashes() {
        assert_eq!(ms_to_hours(Some(3_600_000)), "1.00h");
        assert_eq!(ms_to_hours(Some(27_000_000)), "7.50h");
        assert_eq!(ms_to_hours(Some(0)), "-");
        assert_eq!(ms_to_hours(None), "-");
    }

    #[test]
    fn day_label_takes_date_part() {
        assert_eq!(day_label(Some("2025-03-04T22:10:00Z")), "2025-03-04");
        assert_eq!(day_label(Some("2025-03-04")), "2025-03-04");
        assert_eq!(day_label(None), "unknown");
    }

    #[test]
    fn print_functions_tolerate_empty_records() {
        // Records with every optional field absent must render, not panic
        print_sleep(&[SleepRecord::default()]);
        print_recovery(&[RecoveryRecord::default()]);
        print_strain(&[CycleRecord::default()]);
        print_profile(&whoop_api::UserProfile::default());
    }
}
