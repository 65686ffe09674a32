mod analysis;
mod report;
mod student;

pub use analysis::AnalysisResult;
pub use report::AttendanceReport;
pub use student::Student;
