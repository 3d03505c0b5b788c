use chrono::Utc;
use log::info;
use std::path::PathBuf;

use crate::error::{DashboardError, Result};
use crate::table::{Table, TableStore};

/// A submitted feedback form.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackRecord {
    pub name: String,
    pub email: String,
    pub feedback: String,
}

/// Append-only feedback table.
#[derive(Debug)]
pub struct FeedbackStore {
    table: TableStore,
}

impl FeedbackStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FeedbackStore {
            table: TableStore::new(path, &["Name", "Email", "Feedback", "Submitted"]),
        }
    }

    pub fn load_table(&self) -> Result<Table> {
        self.table.load()
    }

    pub fn append(&self, record: &FeedbackRecord) -> Result<()> {
        if record.feedback.trim().is_empty() {
            return Err(DashboardError::Validation(
                "Please write some feedback before submitting.".to_string(),
            ));
        }
        let submitted = Utc::now().to_rfc3339();
        self.table.modify(|table| {
            table.push_record(&[
                ("Name", record.name.as_str()),
                ("Email", record.email.as_str()),
                ("Feedback", record.feedback.as_str()),
                ("Submitted", submitted.as_str()),
            ]);
            Ok(())
        })?;
        info!("feedback received from {}", record.email);
        Ok(())
    }
}
