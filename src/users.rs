use log::info;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{DashboardError, Result};
use crate::table::{Table, TableStore};

pub const COL_NAME: &str = "Name";
pub const COL_EMAIL: &str = "Email";
pub const COL_PASSWORD: &str = "Password";
pub const COL_PHONE: &str = "Phone";
pub const COL_ROLE: &str = "Role";

/// Columns a profile edit may never touch.
const PROTECTED: [&str; 3] = [COL_EMAIL, COL_PASSWORD, COL_ROLE];

/// Capability attached to an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    /// Anything other than `admin` is an ordinary user, including an empty
    /// cell in tables written before the column existed.
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("admin") {
            Role::Admin
        } else {
            Role::User
        }
    }
}

/// One row of the users table.
#[derive(Debug, Clone, PartialEq)]
pub struct UserRecord {
    pub email: String,
    /// Argon2id PHC string.
    pub password: String,
    pub name: String,
    pub role: Role,
    /// `None` when the table has no phone column at all.
    pub phone: Option<String>,
    /// Every other named column as `(header, value)`, in header order.
    pub extra: Vec<(String, String)>,
}

impl UserRecord {
    fn from_row(table: &Table, row: usize) -> Self {
        let get = |name: &str| {
            table
                .column(name)
                .map(|c| table.cell(row, c).to_string())
                .unwrap_or_default()
        };
        let known = [COL_EMAIL, COL_PASSWORD, COL_NAME, COL_PHONE, COL_ROLE];
        let extra = table
            .header
            .iter()
            .enumerate()
            .filter(|(_, h)| !h.trim().is_empty())
            .filter(|(_, h)| !known.iter().any(|k| h.trim().eq_ignore_ascii_case(k)))
            .map(|(c, h)| (h.clone(), table.cell(row, c).to_string()))
            .collect();
        UserRecord {
            email: get(COL_EMAIL),
            password: get(COL_PASSWORD),
            name: get(COL_NAME),
            phone: table
                .column(COL_PHONE)
                .map(|c| table.cell(row, c).to_string()),
            role: Role::parse(&get(COL_ROLE)),
            extra,
        }
    }

    /// Profile fields in column order, without email and password.
    pub fn profile_fields(&self) -> Vec<(String, String)> {
        let mut fields = vec![(COL_NAME.to_string(), self.name.clone())];
        if let Some(phone) = &self.phone {
            fields.push((COL_PHONE.to_string(), display_phone(phone)));
        }
        fields.extend(self.extra.iter().cloned());
        fields
    }
}

/// Phone numbers that went through a spreadsheet tend to come back as
/// floats (`5551234.0`); show them as integers when they parse.
pub fn display_phone(raw: &str) -> String {
    match raw.trim().parse::<f64>() {
        Ok(n) if n.is_finite() && n.fract() == 0.0 => format!("{}", n as i64),
        _ => raw.to_string(),
    }
}

/// Users table keyed by email.
#[derive(Debug)]
pub struct UserStore {
    table: TableStore,
}

impl UserStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        UserStore {
            table: TableStore::new(
                path,
                &[COL_NAME, COL_EMAIL, COL_PASSWORD, COL_PHONE, COL_ROLE],
            ),
        }
    }

    pub fn has_table(&self) -> bool {
        self.table.exists()
    }

    /// The raw table, for the admin panel.
    pub fn load_table(&self) -> Result<Table> {
        self.table.load()
    }

    /// Look up a user by email
    ///
    /// # Arguments
    /// * `email` - Exact email to match against the Email column
    ///
    /// # Returns
    /// * `Result<Option<UserRecord>>` - The matching record, `None` if no row
    ///   matches, or `NotFound` if the users file does not exist
    pub fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let table = self.table.load()?;
        let col = table.require_column(COL_EMAIL)?;
        Ok(table
            .find_row(col, email)
            .map(|row| UserRecord::from_row(&table, row)))
    }

    /// A missing users file simply means nobody has signed up yet.
    pub fn exists(&self, email: &str) -> Result<bool> {
        match self.find_by_email(email) {
            Ok(found) => Ok(found.is_some()),
            Err(DashboardError::NotFound(_)) if !self.table.exists() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Appends a record. The existence check and the write happen under the
    /// same lock, so two concurrent sign-ups for one email cannot both win.
    pub fn insert(&self, record: &UserRecord) -> Result<()> {
        self.table.modify(|table| {
            let col = match table.column(COL_EMAIL) {
                Some(col) => col,
                None => table.add_column(COL_EMAIL),
            };
            if table.find_row(col, &record.email).is_some() {
                return Err(DashboardError::DuplicateAccount(record.email.clone()));
            }

            let mut fields: Vec<(&str, &str)> = vec![
                (COL_NAME, record.name.as_str()),
                (COL_EMAIL, record.email.as_str()),
                (COL_PASSWORD, record.password.as_str()),
                (COL_ROLE, record.role.as_str()),
            ];
            if let Some(phone) = &record.phone {
                fields.push((COL_PHONE, phone.as_str()));
            }
            for (k, v) in &record.extra {
                fields.push((k.as_str(), v.as_str()));
            }
            table.push_record(&fields);
            Ok(())
        })?;
        info!("registered user {}", record.email);
        Ok(())
    }

    /// Set one field of the row matching `email`
    ///
    /// Only that cell changes; every other row is written back as read.
    ///
    /// # Arguments
    /// * `email` - Key of the row to change
    /// * `field` - Column name, matched case-insensitively
    /// * `value` - New cell contents
    ///
    /// # Returns
    /// * `Result<()>` - `Validation` for Email, Password or Role, `NotFound`
    ///   for an unknown email or column
    pub fn update(&self, email: &str, field: &str, value: &str) -> Result<()> {
        if PROTECTED.iter().any(|p| field.trim().eq_ignore_ascii_case(p)) {
            return Err(DashboardError::Validation(format!(
                "The {} field cannot be edited here.",
                field.trim().to_lowercase()
            )));
        }
        self.table.modify(|table| {
            let email_col = table.require_column(COL_EMAIL)?;
            let row = table
                .find_row(email_col, email)
                .ok_or_else(|| DashboardError::NotFound("User not found.".to_string()))?;
            let col = table.require_column(field)?;
            table.set_cell(row, col, value);
            Ok(())
        })
    }

    /// Applies several field updates in one rewrite. Fails without writing
    /// anything if any field is protected or missing.
    pub fn update_many(&self, email: &str, fields: &[(String, String)]) -> Result<()> {
        if let Some((field, _)) = fields
            .iter()
            .find(|(f, _)| PROTECTED.iter().any(|p| f.trim().eq_ignore_ascii_case(p)))
        {
            return Err(DashboardError::Validation(format!(
                "The {} field cannot be edited here.",
                field.trim().to_lowercase()
            )));
        }
        self.table.modify(|table| {
            let email_col = table.require_column(COL_EMAIL)?;
            let row = table
                .find_row(email_col, email)
                .ok_or_else(|| DashboardError::NotFound("User not found.".to_string()))?;
            for (field, value) in fields {
                let col = table.require_column(field)?;
                table.set_cell(row, col, value);
            }
            Ok(())
        })
    }
}
