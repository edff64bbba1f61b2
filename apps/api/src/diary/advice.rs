//! Canned advice returned with every accepted submission.

use chrono::NaiveDate;

use super::capture_time::CaptureTime;

pub const DAILY_STEP_GOAL: u64 = 8000;

pub fn for_text_log() -> String {
    "Aim for a balanced plate: a staple, a main dish and a side dish.".to_string()
}

pub fn for_photo(capture: &CaptureTime) -> String {
    match capture {
        CaptureTime::Found(_) => "Logged the photo's capture time as your meal time.".to_string(),
        CaptureTime::NotPresent => {
            "The photo has no Exif data, so the meal time could not be determined. \
             Logged it at the time of upload."
                .to_string()
        }
        CaptureTime::MetadataNoTimestamp => {
            "The photo's Exif data has no capture time. Logged it at the time of upload."
                .to_string()
        }
        CaptureTime::Failed(_) => {
            "The photo's metadata could not be read. Logged it at the time of upload.".to_string()
        }
    }
}

pub fn for_steps(steps: u64) -> String {
    if steps >= DAILY_STEP_GOAL {
        format!("{steps} steps: goal of {DAILY_STEP_GOAL} reached. Keep it up!")
    } else {
        let remaining = DAILY_STEP_GOAL - steps;
        format!(
            "{remaining} steps left to reach {DAILY_STEP_GOAL}. Take the stairs where you can!"
        )
    }
}

pub fn for_summary(date: NaiveDate, meals: usize) -> String {
    if meals == 0 {
        format!("Nothing logged for {date} yet. A quick note after each meal helps.")
    } else {
        format!("{date}: {meals} meal(s) logged. Remember to drink plenty of water.")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_advice_counts_down_to_goal() {
        assert!(for_steps(7200).starts_with("800 steps left"));
        assert!(for_steps(8000).contains("reached"));
        assert!(for_steps(12000).contains("reached"));
    }

    #[test]
    fn test_summary_advice_mentions_date() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        assert!(for_summary(date, 3).starts_with("2024-05-01"));
        assert!(for_summary(date, 0).contains("Nothing logged"));
    }

    #[test]
    fn test_photo_advice_per_outcome() {
        assert!(for_photo(&CaptureTime::Found("2024:05:01 12:00:00".into())).contains("capture time"));
        assert!(for_photo(&CaptureTime::NotPresent).contains("no Exif"));
    }
}
