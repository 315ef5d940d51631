use std::fmt;
use std::str::FromStr;

use crate::conflict::TimeRange;
use crate::schema::{admins, applications, rooms, users};
use diesel::{
    deserialize::{self, FromSql},
    pg::{Pg, PgValue},
    prelude::*,
    serialize::{self, Output, ToSql},
    sql_types::Text,
    AsExpression, FromSqlRow,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsExpression, FromSqlRow)]
#[diesel(sql_type = crate::schema::sql_types::ApplicationStatus)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "Awaiting approval",
            ApplicationStatus::Approved => "Approved",
            ApplicationStatus::Rejected => "Rejected",
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(ApplicationStatus::Pending),
            "approved" => Ok(ApplicationStatus::Approved),
            "rejected" => Ok(ApplicationStatus::Rejected),
            other => Err(format!("Unrecognized application status: {}", other)),
        }
    }
}

impl ToSql<crate::schema::sql_types::ApplicationStatus, Pg> for ApplicationStatus {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        <str as ToSql<Text, Pg>>::to_sql(self.as_str(), out)
    }
}

impl FromSql<crate::schema::sql_types::ApplicationStatus, Pg> for ApplicationStatus {
    fn from_sql(bytes: PgValue) -> deserialize::Result<Self> {
        let raw = <String as FromSql<Text, Pg>>::from_sql(bytes)?;
        raw.parse().map_err(Into::into)
    }
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Identifiable)]
#[diesel(table_name = admins)]
#[diesel(check_for_backend(Pg))]
pub struct Admin {
    pub id: i32,
    pub admin_id: String,
    pub admin_name: String,
    pub auth_key: String,
    pub password_hash: String,
    pub password_reset_token: Option<String>,
    pub email: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = admins)]
pub struct NewAdmin {
    pub admin_id: String,
    pub admin_name: String,
    pub auth_key: String,
    pub password_hash: String,
    pub email: String,
    pub created_at: i64,
    pub updated_at: i64,
}

pub const USER_STATUS_DELETED: i16 = 0;
pub const USER_STATUS_INACTIVE: i16 = 9;
pub const USER_STATUS_ACTIVE: i16 = 10;

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Identifiable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(Pg))]
pub struct User {
    pub id: i32,
    pub student_id: String,
    pub username: String,
    pub auth_key: String,
    pub password_hash: String,
    pub email: String,
    pub status: i16,
    pub created_at: i64,
    pub updated_at: i64,
}

impl User {
    pub fn is_active(&self) -> bool {
        self.status == USER_STATUS_ACTIVE
    }

    pub fn status_label(&self) -> &'static str {
        match self.status {
            USER_STATUS_ACTIVE => "Active",
            USER_STATUS_INACTIVE => "Inactive",
            USER_STATUS_DELETED => "Deleted",
            _ => "Unknown",
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub student_id: String,
    pub username: String,
    pub auth_key: String,
    pub password_hash: String,
    pub email: String,
    pub status: i16,
    pub created_at: i64,
    pub updated_at: i64,
}

// None leaves the column untouched
#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = users)]
pub struct UserProfileChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = rooms)]
#[diesel(check_for_backend(Pg))]
pub struct Room {
    pub id: i32,
    pub number: String,
    pub capacity: i32,
    pub available: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = rooms)]
pub struct NewRoom {
    pub number: String,
    pub capacity: i32,
    pub available: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = applications)]
#[diesel(check_for_backend(Pg))]
pub struct Application {
    pub id: i32,
    pub applicant_id: i32,
    pub room_id: i32,
    pub organization: String,
    pub phone: String,
    pub event: String,
    pub start_time: i64,
    pub end_time: i64,
    pub status: ApplicationStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Application {
    pub fn time_range(&self) -> TimeRange {
        TimeRange::new_unchecked(self.start_time, self.end_time)
    }

    /// An application can still be changed by its applicant until it has
    /// been rejected or its reserved interval has begun.
    pub fn can_update(&self, now: i64) -> bool {
        self.status != ApplicationStatus::Rejected && self.start_time > now
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = applications)]
pub struct NewApplication {
    pub applicant_id: i32,
    pub room_id: i32,
    pub organization: String,
    pub phone: String,
    pub event: String,
    pub start_time: i64,
    pub end_time: i64,
    pub status: ApplicationStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = applications)]
pub struct ApplicationChanges {
    pub room_id: i32,
    pub organization: String,
    pub phone: String,
    pub event: String,
    pub start_time: i64,
    pub end_time: i64,
    pub status: ApplicationStatus,
    pub updated_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn application(status: ApplicationStatus, start_time: i64) -> Application {
        Application {
            id: 1,
            applicant_id: 1,
            room_id: 1,
            organization: "Chess club".into(),
            phone: "13800000000".into(),
            event: "Weekly meeting".into(),
            start_time,
            end_time: start_time + 3600,
            status,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("Approved".parse::<ApplicationStatus>(), Ok(ApplicationStatus::Approved));
        assert_eq!(" pending ".parse::<ApplicationStatus>(), Ok(ApplicationStatus::Pending));
        assert!("cancelled".parse::<ApplicationStatus>().is_err());
    }

    #[test]
    fn rejected_or_started_applications_are_frozen() {
        let now = 10_000;
        assert!(application(ApplicationStatus::Pending, now + 60).can_update(now));
        assert!(application(ApplicationStatus::Approved, now + 60).can_update(now));
        assert!(!application(ApplicationStatus::Rejected, now + 60).can_update(now));
        assert!(!application(ApplicationStatus::Pending, now).can_update(now));
        assert!(!application(ApplicationStatus::Approved, now - 60).can_update(now));
    }

    #[test]
    fn user_status_labels() {
        let mut user = User {
            id: 1,
            student_id: "2021001".into(),
            username: "alice".into(),
            auth_key: "k".into(),
            password_hash: "h".into(),
            email: "alice@example.com".into(),
            status: USER_STATUS_ACTIVE,
            created_at: 0,
            updated_at: 0,
        };
        assert!(user.is_active());
        assert_eq!(user.status_label(), "Active");
        user.status = USER_STATUS_INACTIVE;
        assert!(!user.is_active());
        assert_eq!(user.status_label(), "Inactive");
    }
}
