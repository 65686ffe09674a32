//! Finalized attendance reports.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Student;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceReport {
    pub id: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub date_string: String,
    pub course_name: String,
    pub class_name: String,
    pub expected_count: u32,
    pub actual_count: u32,
    pub absent_count: u32,
    pub absent_names: Vec<String>,
}

impl AttendanceReport {
    /// Tallies the roster as it stands. `actual + absent == expected` holds by
    /// construction since every entry is counted exactly once.
    pub fn from_roster(
        students: &[Student],
        course_name: &str,
        class_name: &str,
        created_at: DateTime<Utc>,
    ) -> Self {
        let absent_names: Vec<String> = students
            .iter()
            .filter(|student| !student.is_present)
            .map(|student| student.name.clone())
            .collect();
        let expected_count = students.len() as u32;
        let absent_count = absent_names.len() as u32;

        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: created_at.timestamp_millis(),
            date_string: created_at
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
            course_name: course_name.to_string(),
            class_name: class_name.to_string(),
            expected_count,
            actual_count: expected_count - absent_count,
            absent_count,
            absent_names,
        }
    }

    /// Present share as a whole percentage, 0 for an empty roster.
    pub fn attendance_rate(&self) -> u32 {
        if self.expected_count == 0 {
            return 0;
        }
        ((self.actual_count as f64 / self.expected_count as f64) * 100.0).round() as u32
    }
}
