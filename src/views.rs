//! Response bodies. Times are rendered in the configured offset.

use chrono::FixedOffset;
use serde::Serialize;

use crate::models::{Admin, Application, ApplicationStatus, Room, User};
use crate::timefmt::{format_detail_time, format_form_time};

pub const CONFLICT_WARNING: &str = "This application conflicts with an approved application for the same room. \
     Consider changing and resubmitting it, or coordinate with the staff.";
pub const ROOM_UNAVAILABLE_WARNING: &str = "The room reserved by this application is no longer available.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    Conflict { conflict_id: i32, message: &'static str },
    RoomUnavailable { message: &'static str },
}

#[derive(Debug, Serialize)]
pub struct ApplicationView {
    pub id: i32,
    pub applicant_id: i32,
    pub room_id: i32,
    pub room_number: Option<String>,
    pub organization: String,
    pub phone: String,
    pub event: String,
    pub start_time: String,
    pub end_time: String,
    pub status: ApplicationStatus,
    pub status_label: &'static str,
    pub can_update: bool,
    pub created_at: String,
    pub updated_at: String,
    pub warnings: Vec<Warning>,
}

impl ApplicationView {
    pub fn new(application: &Application, room: Option<&Room>, now: i64, offset: &FixedOffset) -> Self {
        Self {
            id: application.id,
            applicant_id: application.applicant_id,
            room_id: application.room_id,
            room_number: room.map(|r| r.number.clone()),
            organization: application.organization.clone(),
            phone: application.phone.clone(),
            event: application.event.clone(),
            start_time: format_form_time(application.start_time, offset),
            end_time: format_form_time(application.end_time, offset),
            status: application.status,
            status_label: application.status.label(),
            can_update: application.can_update(now),
            created_at: format_detail_time(application.created_at, offset),
            updated_at: format_detail_time(application.updated_at, offset),
            warnings: Vec::new(),
        }
    }

    /// Adds the applicant-facing warnings: a conflict matters only while the
    /// application is pending and still editable, an unavailable room only
    /// while it is editable.
    pub fn with_warnings(mut self, conflict_id: Option<i32>, room: Option<&Room>) -> Self {
        if self.can_update {
            if let (Some(conflict_id), ApplicationStatus::Pending) = (conflict_id, self.status) {
                self.warnings.push(Warning::Conflict {
                    conflict_id,
                    message: CONFLICT_WARNING,
                });
            }
            if room.map_or(false, |r| !r.available) {
                self.warnings.push(Warning::RoomUnavailable {
                    message: ROOM_UNAVAILABLE_WARNING,
                });
            }
        }
        self
    }
}

/// What another applicant may see of a conflicting application.
#[derive(Debug, Serialize)]
pub struct ConflictDetailView {
    pub id: i32,
    pub room_id: i32,
    pub room_number: Option<String>,
    pub organization: String,
    pub event: String,
    pub start_time: String,
    pub end_time: String,
    pub status: ApplicationStatus,
    pub status_label: &'static str,
}

impl ConflictDetailView {
    pub fn new(application: &Application, room: Option<&Room>, offset: &FixedOffset) -> Self {
        Self {
            id: application.id,
            room_id: application.room_id,
            room_number: room.map(|r| r.number.clone()),
            organization: application.organization.clone(),
            event: application.event.clone(),
            start_time: format_form_time(application.start_time, offset),
            end_time: format_form_time(application.end_time, offset),
            status: application.status,
            status_label: application.status.label(),
        }
    }
}

/// Current values of the update form.
#[derive(Debug, Serialize)]
pub struct ApplicationFormView {
    pub room_id: i32,
    pub organization: String,
    pub phone: String,
    pub event: String,
    pub start_time: String,
    pub end_time: String,
}

impl ApplicationFormView {
    pub fn new(application: &Application, offset: &FixedOffset) -> Self {
        Self {
            room_id: application.room_id,
            organization: application.organization.clone(),
            phone: application.phone.clone(),
            event: application.event.clone(),
            start_time: format_form_time(application.start_time, offset),
            end_time: format_form_time(application.end_time, offset),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AccountView {
    pub id: i32,
    pub student_id: String,
    pub username: String,
    pub email: String,
    pub status: &'static str,
    pub created_at: String,
    pub updated_at: String,
}

impl AccountView {
    pub fn new(user: &User, offset: &FixedOffset) -> Self {
        Self {
            id: user.id,
            student_id: user.student_id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            status: user.status_label(),
            created_at: format_detail_time(user.created_at, offset),
            updated_at: format_detail_time(user.updated_at, offset),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AdminView {
    pub id: i32,
    pub admin_id: String,
    pub admin_name: String,
    pub email: String,
    pub created_at: String,
    pub updated_at: String,
}

impl AdminView {
    pub fn new(admin: &Admin, offset: &FixedOffset) -> Self {
        Self {
            id: admin.id,
            admin_id: admin.admin_id.clone(),
            admin_name: admin.admin_name.clone(),
            email: admin.email.clone(),
            created_at: format_detail_time(admin.created_at, offset),
            updated_at: format_detail_time(admin.updated_at, offset),
        }
    }
}

/// Returned by the login endpoints.
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub id: i32,
    pub auth_key: String,
}

#[derive(Debug, Serialize)]
pub struct ResetTokenView {
    pub admin_id: String,
    pub token: String,
    pub expires_at: String,
}

/// Plain-text slip for the print endpoint.
pub fn render_print_slip(application: &Application, room: Option<&Room>, applicant: Option<&User>, offset: &FixedOffset) -> String {
    let room_number = room.map_or_else(|| format!("#{}", application.room_id), |r| r.number.clone());
    let applicant = applicant.map_or_else(|| format!("#{}", application.applicant_id), |u| {
        format!("{} ({})", u.username, u.student_id)
    });

    let lines = [
        format!("Room application #{}", application.id),
        String::new(),
        format!("Applicant:    {}", applicant),
        format!("Organization: {}", application.organization),
        format!("Phone:        {}", application.phone),
        format!("Event:        {}", application.event),
        format!("Room:         {}", room_number),
        format!("From:         {}", format_form_time(application.start_time, offset)),
        format!("To:           {}", format_form_time(application.end_time, offset)),
        format!("Status:       {}", application.status.label()),
        format!("Submitted:    {}", format_detail_time(application.created_at, offset)),
    ];

    let mut slip = lines.join("\n");
    slip.push('\n');
    slip
}
