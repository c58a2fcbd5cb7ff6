//! Time features: normalized `HH:MM`, shift duration, peak-window flag.

use chrono::NaiveDate;

use super::{round_to, Stage};
use crate::config::{CalibrationConfig, PeakWindow};
use crate::error::PipelineError;
use crate::types::{ShiftRecord, TimeFeatures};

const MINUTES_PER_DAY: u32 = 1440;

/// Accepted date layouts, tried in order.
const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%d/%m/%Y"];

/// Trim and left-pad to the fixed `HH:MM` width (`"9:05"` -> `"09:05"`).
pub fn normalize_time(raw: &str) -> String {
    format!("{:0>5}", raw.trim())
}

/// Parse `HH:MM` into `(hour, minute)`.
pub fn parse_hh_mm(raw: &str) -> Result<(u32, u32), PipelineError> {
    let normalized = normalize_time(raw);
    let malformed = || PipelineError::format("time", format!("malformed time '{raw}', expected HH:MM"));

    let (h, m) = normalized.split_once(':').ok_or_else(malformed)?;
    let hour: u32 = h.parse().map_err(|_| malformed())?;
    let minute: u32 = m.parse().map_err(|_| malformed())?;
    if hour > 23 || minute > 59 {
        return Err(malformed());
    }
    Ok((hour, minute))
}

/// Minutes since midnight for an `HH:MM` string.
pub fn time_to_minutes(raw: &str) -> Result<u32, PipelineError> {
    let (hour, minute) = parse_hh_mm(raw)?;
    Ok(hour * 60 + minute)
}

/// Shift length in hours (2 dp). An end before the start crossed midnight.
pub fn shift_duration_hours(start: &str, end: &str) -> Result<f64, PipelineError> {
    let start_min = time_to_minutes(start).map_err(|e| e.in_column("start_time"))?;
    let mut end_min = time_to_minutes(end).map_err(|e| e.in_column("end_time"))?;
    if end_min < start_min {
        end_min += MINUTES_PER_DAY;
    }
    Ok(round_to(f64::from(end_min - start_min) / 60.0, 2))
}

/// Start hour falls inside the half-open peak window. Uses the start time only.
pub fn is_peak_start(start: &str, window: &PeakWindow) -> Result<bool, PipelineError> {
    let (hour, _) = parse_hh_mm(start).map_err(|e| e.in_column("start_time"))?;
    Ok(window.contains(hour))
}

/// Check that a date cell parses in one of the accepted layouts.
pub fn validate_date(raw: &str) -> Result<(), PipelineError> {
    let trimmed = raw.trim();
    if DATE_FORMATS
        .iter()
        .any(|fmt| NaiveDate::parse_from_str(trimmed, fmt).is_ok())
    {
        Ok(())
    } else {
        Err(PipelineError::format(
            "date",
            format!("malformed date '{raw}', expected YYYY-MM-DD or DD/MM/YYYY"),
        ))
    }
}

/// Normalizes time strings in place and attaches [`TimeFeatures`].
pub struct TimeStage;

impl Stage for TimeStage {
    fn name(&self) -> &'static str {
        "time"
    }

    fn apply(
        &self,
        records: &mut [ShiftRecord],
        calibration: &CalibrationConfig,
    ) -> Result<(), PipelineError> {
        for (idx, record) in records.iter_mut().enumerate() {
            let line = record.source_line(idx);
            let raw = &mut record.raw;

            validate_date(&raw.date).map_err(|e| e.at_line(line))?;
            raw.start_time = normalize_time(&raw.start_time);
            raw.end_time = normalize_time(&raw.end_time);

            let duration_hours = shift_duration_hours(&raw.start_time, &raw.end_time)
                .map_err(|e| e.at_line(line))?;
            let peak_window =
                is_peak_start(&raw.start_time, &calibration.peak).map_err(|e| e.at_line(line))?;

            record.time = Some(TimeFeatures {
                duration_hours,
                peak_window,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_pads_to_five_chars() {
        assert_eq!(normalize_time("0:12"), "00:12");
        assert_eq!(normalize_time(" 9:05 "), "09:05");
        assert_eq!(normalize_time("17:00"), "17:00");
    }

    #[test]
    fn minutes_since_midnight() {
        assert_eq!(time_to_minutes("00:00").unwrap(), 0);
        assert_eq!(time_to_minutes("0:12").unwrap(), 12);
        assert_eq!(time_to_minutes("23:59").unwrap(), 1439);
    }

    #[test]
    fn malformed_times_are_format_errors() {
        for bad in ["", "1700", "ab:cd", "25:00", "12:60", "12:"] {
            assert!(
                matches!(time_to_minutes(bad), Err(PipelineError::Format { .. })),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn duration_plain_and_midnight_crossing() {
        assert_eq!(shift_duration_hours("17:00", "21:00").unwrap(), 4.0);
        assert_eq!(shift_duration_hours("23:30", "00:15").unwrap(), 0.75);
        assert_eq!(shift_duration_hours("22:00", "02:20").unwrap(), 4.33);
        assert_eq!(shift_duration_hours("10:00", "10:00").unwrap(), 0.0);
    }

    #[test]
    fn peak_window_boundaries() {
        let w = PeakWindow::default();
        assert!(!is_peak_start("16:59", &w).unwrap());
        assert!(is_peak_start("17:00", &w).unwrap());
        assert!(is_peak_start("20:59", &w).unwrap());
        assert!(!is_peak_start("21:00", &w).unwrap());
    }

    #[test]
    fn errors_name_the_offending_column() {
        let column = |err: PipelineError| match err {
            PipelineError::Format { column, .. } => column,
            other => panic!("expected format error, got {other:?}"),
        };
        let w = PeakWindow::default();
        assert_eq!(column(shift_duration_hours("17h00", "21:00").unwrap_err()), "start_time");
        assert_eq!(column(shift_duration_hours("17:00", "25:00").unwrap_err()), "end_time");
        assert_eq!(column(is_peak_start("x", &w).unwrap_err()), "start_time");
    }

    #[test]
    fn dates_accept_both_layouts() {
        assert!(validate_date("2025-12-06").is_ok());
        assert!(validate_date("06/12/2025").is_ok());
        assert!(validate_date("2025-13-40").is_err());
        assert!(validate_date("yesterday").is_err());
    }
}
