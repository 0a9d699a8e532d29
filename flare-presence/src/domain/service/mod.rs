//! 领域服务

mod alert_band_scanner;
mod alert_range_service;
mod job_switch;
mod scan_guard;
mod session_accrual_service;
mod sleep_reminder_scanner;

pub use alert_band_scanner::{AlertBandScanner, AlertScanPolicy};
pub use alert_range_service::AlertRangeService;
pub use job_switch::JobSwitch;
pub use scan_guard::{ScanGuard, ScanGuardToken, ScanReport};
pub use session_accrual_service::{AccrualOutcome, AccrualPolicy, SessionAccrualService};
pub use sleep_reminder_scanner::SleepReminderScanner;
