/// Client-side form validation
///
/// Every form is validated before any request is issued. Errors are reported
/// per field so the form can show them inline; a form with errors never
/// reaches the network.
///
/// Field-level rules use `validator` derives; rules spanning several fields
/// (date ranges, password confirmation) are checked by hand afterwards.
///
/// # Example
///
/// ```
/// use taskboard_shared::forms::ProjectForm;
/// use chrono::NaiveDate;
///
/// let form = ProjectForm {
///     name: "Apollo".to_string(),
///     description: String::new(),
///     start_date: NaiveDate::from_ymd_opt(2024, 6, 1),
///     end_date: NaiveDate::from_ymd_opt(2024, 5, 1),
/// };
///
/// let errors = form.into_new_project().unwrap_err();
/// assert_eq!(errors.get("date"), Some("Start date should be before end date"));
/// ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::models::credentials::{SignInRequest, SignUpRequest};
use crate::models::project::NewProject;
use crate::models::task::{NewTask, Priority, Status};
use crate::models::user::{NewUser, Role, User, UserUpdate};

/// Per-field validation errors
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormErrors {
    fields: BTreeMap<String, String>,
}

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an error; a later error on the same field replaces the earlier one
    pub fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.fields.insert(field.into(), message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `Ok(())` when no errors were recorded
    pub fn into_result(self) -> Result<(), FormErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    /// Collects derive-level errors, one message per field
    fn from_validation(errors: &ValidationErrors) -> Self {
        let mut form_errors = FormErrors::new();
        for (field, errors) in errors.field_errors() {
            if let Some(error) = errors.last() {
                let message = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "Invalid value".to_string());
                form_errors.insert(field.to_string(), message);
            }
        }
        form_errors
    }

    fn validated<T: Validate>(form: &T) -> Self {
        match form.validate() {
            Ok(()) => FormErrors::new(),
            Err(errors) => FormErrors::from_validation(&errors),
        }
    }
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Validation failed: ")?;
        let mut first = true;
        for (field, message) in &self.fields {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", field, message)?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for FormErrors {}

/// Accepts an empty string or comma-separated tags without whitespace
///
/// Equivalent to `^(\s*|[^,\s]+(,[^,\s]+)*)$` on the trimmed input.
pub fn validate_tags(tags: &str) -> Result<(), ValidationError> {
    let trimmed = tags.trim();
    if trimmed.is_empty() {
        return Ok(());
    }

    let well_formed = trimmed
        .split(',')
        .all(|tag| !tag.is_empty() && !tag.chars().any(char::is_whitespace));

    if well_formed {
        Ok(())
    } else {
        let mut error = ValidationError::new("tags");
        error.message = Some("Invalid tags format".into());
        Err(error)
    }
}

fn check_date_order(
    errors: &mut FormErrors,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    message: &str,
) {
    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            errors.insert("date", message);
        }
    }
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Sign-in form
#[derive(Debug, Clone, Default, Validate)]
pub struct SignInForm {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

impl SignInForm {
    pub fn into_request(self) -> Result<SignInRequest, FormErrors> {
        FormErrors::validated(&self).into_result()?;
        Ok(SignInRequest {
            username: self.username,
            password: self.password,
        })
    }
}

/// Sign-up form (organization + first admin)
#[derive(Debug, Clone, Default, Validate)]
pub struct SignUpForm {
    #[validate(length(min = 2, message = "Username should be at least 2 characters long"))]
    pub username: String,

    #[validate(length(min = 6, message = "Password should be at least 6 characters long"))]
    pub password: String,

    #[validate(length(min = 1, message = "Organization name is required"))]
    pub organization_name: String,

    /// One of [`crate::models::organization::INDUSTRIES`]
    #[validate(length(min = 1, message = "Industry type is required"))]
    pub industry: String,

    /// Free-form industry, used when `industry` is "Other"
    pub custom_industry: String,

    #[validate(required(message = "Established date is required"))]
    pub established: Option<NaiveDate>,
}

impl SignUpForm {
    pub fn into_request(self) -> Result<SignUpRequest, FormErrors> {
        let mut errors = FormErrors::validated(&self);

        let other = self.industry == "Other";
        if other && self.custom_industry.trim().is_empty() {
            errors.insert("industry", "Industry type is required");
        }
        errors.into_result()?;

        let established = self.established.ok_or_else(|| {
            let mut errors = FormErrors::new();
            errors.insert("established", "Established date is required");
            errors
        })?;

        Ok(SignUpRequest {
            username: self.username,
            password: self.password,
            organization_name: self.organization_name,
            industry: if other {
                self.custom_industry.trim().to_string()
            } else {
                self.industry
            },
            established,
        })
    }
}

/// New project form
#[derive(Debug, Clone, Default, Validate)]
pub struct ProjectForm {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,

    pub description: String,

    pub start_date: Option<NaiveDate>,

    pub end_date: Option<NaiveDate>,
}

impl ProjectForm {
    pub fn into_new_project(self) -> Result<NewProject, FormErrors> {
        let mut errors = FormErrors::validated(&self);
        check_date_order(
            &mut errors,
            self.start_date,
            self.end_date,
            "Start date should be before end date",
        );
        errors.into_result()?;

        Ok(NewProject {
            name: self.name,
            description: non_empty(self.description),
            start_date: self.start_date.map(start_of_day),
            end_date: self.end_date.map(start_of_day),
        })
    }
}

/// New task form
#[derive(Debug, Clone, Validate)]
pub struct TaskForm {
    pub project_id: i64,

    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,

    pub description: String,

    pub status: Status,

    pub priority: Priority,

    #[validate(custom(function = "validate_tags"))]
    pub tags: String,

    pub start_date: Option<NaiveDate>,

    pub due_date: Option<NaiveDate>,

    pub points: Option<i32>,

    pub author_user_id: Option<i64>,

    pub assigned_user_id: Option<i64>,
}

impl TaskForm {
    /// Blank form with the dashboard defaults (To Do, Medium)
    pub fn new(project_id: i64) -> Self {
        TaskForm {
            project_id,
            title: String::new(),
            description: String::new(),
            status: Status::ToDo,
            priority: Priority::Medium,
            tags: String::new(),
            start_date: None,
            due_date: None,
            points: None,
            author_user_id: None,
            assigned_user_id: None,
        }
    }

    pub fn into_new_task(self) -> Result<NewTask, FormErrors> {
        let mut errors = FormErrors::validated(&self);
        check_date_order(
            &mut errors,
            self.start_date,
            self.due_date,
            "Start date can not be after due date",
        );
        errors.into_result()?;

        Ok(NewTask {
            title: self.title,
            description: non_empty(self.description),
            status: self.status,
            priority: self.priority,
            tags: non_empty(self.tags),
            start_date: self.start_date.map(start_of_day),
            due_date: self.due_date.map(start_of_day),
            points: self.points,
            author_user_id: self.author_user_id,
            assigned_user_id: self.assigned_user_id,
            project_id: self.project_id,
        })
    }
}

/// Add/update user form
#[derive(Debug, Clone, Validate)]
pub struct UserForm {
    #[validate(length(min = 2, message = "Username must be at least 2 characters long"))]
    pub username: String,

    /// Required on create; optional on update (blank keeps the old one)
    pub password: String,

    pub role: Role,
}

impl UserForm {
    fn check(&self, is_update: bool) -> Result<(), FormErrors> {
        let mut errors = FormErrors::validated(self);
        if !is_update && self.password.is_empty() {
            errors.insert("password", "Password is required");
        }
        if !self.password.is_empty() && self.password.chars().count() < 6 {
            errors.insert("password", "Password must be at least 6 characters long");
        }
        errors.into_result()
    }

    pub fn into_new_user(
        self,
        profile_picture_url: Option<String>,
        organization_id: Option<i64>,
    ) -> Result<NewUser, FormErrors> {
        self.check(false)?;
        Ok(NewUser {
            username: self.username,
            password: self.password,
            role: self.role,
            profile_picture_url,
            organization_id,
        })
    }

    /// Builds a full replacement of `existing`
    ///
    /// A freshly uploaded picture wins over the existing one.
    pub fn into_update(
        self,
        existing: &User,
        profile_picture_url: Option<String>,
    ) -> Result<UserUpdate, FormErrors> {
        self.check(true)?;
        let mut update = UserUpdate::from_user(existing);
        update.username = self.username;
        update.role = self.role;
        update.password = non_empty(self.password);
        if profile_picture_url.is_some() {
            update.profile_picture_url = profile_picture_url;
        }
        Ok(update)
    }
}

/// Own-profile form (password and picture)
#[derive(Debug, Clone, Default)]
pub struct ProfileForm {
    pub password: String,
    pub confirm_password: String,
    pub has_new_picture: bool,
}

impl ProfileForm {
    pub fn validate(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::new();
        let password = self.password.trim();

        if password != self.confirm_password.trim() {
            errors.insert("password", "Passwords do not match");
        }
        if password.is_empty() && !self.has_new_picture {
            errors.insert("other", "Please provide something to update");
        }
        let len = password.chars().count();
        if !password.is_empty() && !(6..=12).contains(&len) {
            errors.insert(
                "password",
                "Password must be between 6 and 12 characters long",
            );
        }

        errors.into_result()
    }

    /// Builds the partial update for the signed-in user
    pub fn into_update(
        self,
        current: &User,
        profile_picture_url: Option<String>,
    ) -> Result<UserUpdate, FormErrors> {
        self.validate()?;
        let mut update = UserUpdate::from_user(current);
        update.password = non_empty(self.password);
        if profile_picture_url.is_some() {
            update.profile_picture_url = profile_picture_url;
        }
        Ok(update)
    }
}
