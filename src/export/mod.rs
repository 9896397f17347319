pub mod file;
pub mod notifier;
pub mod search;
pub mod table;

pub use file::{DataSearchFile, ExportSettings, ExportState, ExportUser, LIMIT};
pub use notifier::{DeliveryReport, NotificationQueue, RetryPolicy};
pub use search::{ExportQuery, HttpSearchBackend, SearchBackend, fetch};
pub use table::{ExportTable, build_table, serialize};
