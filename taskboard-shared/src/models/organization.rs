/// Organization model
///
/// An organization is created together with its first admin user at sign-up
/// (`POST auth/signup`) and owns every user created afterwards.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Organization as returned by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: i64,
    pub name: String,
    pub industry: String,
    pub established: NaiveDate,
}

/// Industries offered on the sign-up form
///
/// `Other` lets the user type a free-form industry instead.
pub const INDUSTRIES: [&str; 6] = [
    "IT",
    "Graphic Design and Multimedia",
    "E-commerce and Retail Technology",
    "Manufacturing and Industrial Automation",
    "Personal",
    "Other",
];
