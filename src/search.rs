//! Search filters and pagination for list pages.

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use crate::models::{Admin, Application, ApplicationStatus};
use crate::timefmt;

pub const ADMIN_PAGE_SIZE: i64 = 30;
pub const APPLICATION_PAGE_SIZE: i64 = 20;
pub const DEFAULT_WINDOW_SECS: i64 = 3600 * 24 * 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub page_size: i64,
}

impl PageRequest {
    pub fn new(page: Option<i64>, page_size: i64) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            page_size: page_size.max(1),
        }
    }

    pub fn page_count(&self, total: i64) -> i64 {
        if total <= 0 {
            1
        } else {
            (total + self.page_size - 1) / self.page_size
        }
    }

    /// Past-the-end pages clamp to the last page.
    pub fn clamp(self, total: i64) -> Self {
        Self {
            page: self.page.min(self.page_count(total)),
            ..self
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.page_size
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub page_size: i64,
    pub total: i64,
    pub page_count: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total: i64) -> Self {
        Self {
            items,
            page: request.page,
            page_size: request.page_size,
            total,
            page_count: request.page_count(total),
        }
    }

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            page_size: self.page_size,
            total: self.total,
            page_count: self.page_count,
        }
    }

    /// Slices an already filtered and sorted row set.
    pub fn from_sorted(rows: Vec<T>, request: PageRequest) -> Self {
        let total = rows.len() as i64;
        let request = request.clamp(total);
        let items = rows
            .into_iter()
            .skip(request.offset() as usize)
            .take(request.page_size as usize)
            .collect();
        Self::new(items, request, total)
    }
}

/// Escapes LIKE wildcards so user input matches literally.
pub fn like_pattern(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    escaped.push('%');
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Case-insensitive substring test with the same meaning as `ILIKE like_pattern(needle)`.
pub fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminSortField {
    Id,
    AdminId,
    AdminName,
    Email,
    CreatedAt,
    UpdatedAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdminSort {
    pub field: AdminSortField,
    pub descending: bool,
}

impl Default for AdminSort {
    fn default() -> Self {
        Self {
            field: AdminSortField::AdminId,
            descending: false,
        }
    }
}

impl AdminSort {
    /// `admin_name` sorts ascending, `-admin_name` descending; unknown
    /// attributes fall back to the default order.
    pub fn parse(value: Option<&str>) -> Self {
        let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
            return Self::default();
        };
        let (descending, name) = match value.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, value),
        };
        let field = match name {
            "id" => AdminSortField::Id,
            "admin_id" => AdminSortField::AdminId,
            "admin_name" => AdminSortField::AdminName,
            "email" => AdminSortField::Email,
            "created_at" => AdminSortField::CreatedAt,
            "updated_at" => AdminSortField::UpdatedAt,
            _ => return Self::default(),
        };
        Self { field, descending }
    }

    pub fn compare(&self, a: &Admin, b: &Admin) -> std::cmp::Ordering {
        let ordering = match self.field {
            AdminSortField::Id => a.id.cmp(&b.id),
            AdminSortField::AdminId => a.admin_id.cmp(&b.admin_id),
            AdminSortField::AdminName => a.admin_name.cmp(&b.admin_name),
            AdminSortField::Email => a.email.cmp(&b.email),
            AdminSortField::CreatedAt => a.created_at.cmp(&b.created_at),
            AdminSortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        };
        if self.descending {
            ordering.reverse()
        } else {
            ordering
        }
    }
}

/// Raw query string of the admin list. Integer attributes arrive as text so
/// that a malformed value can disable filtering instead of failing the request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminSearchParams {
    pub id: Option<String>,
    pub admin_id: Option<String>,
    pub admin_name: Option<String>,
    pub email: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub sort: Option<String>,
    pub page: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminFilter {
    pub id: Option<i32>,
    pub admin_id: Option<String>,
    pub admin_name: Option<String>,
    pub email: Option<String>,
    pub created_at: Option<i64>,
    pub updated_at: Option<i64>,
    pub sort: AdminSort,
}

impl AdminFilter {
    pub fn matches(&self, admin: &Admin) -> bool {
        self.id.map_or(true, |id| admin.id == id)
            && self.created_at.map_or(true, |t| admin.created_at == t)
            && self.updated_at.map_or(true, |t| admin.updated_at == t)
            && self.admin_id.as_deref().map_or(true, |v| contains_ci(&admin.admin_id, v))
            && self.admin_name.as_deref().map_or(true, |v| contains_ci(&admin.admin_name, v))
            && self.email.as_deref().map_or(true, |v| contains_ci(&admin.email, v))
    }
}

/// A page number that does not parse is page 1.
fn parse_page(value: &Option<String>) -> Option<i64> {
    parse_int(value).ok().flatten()
}

fn parse_int<T: std::str::FromStr>(value: &Option<String>) -> Result<Option<T>, ()> {
    match non_empty(value) {
        Some(v) => v.parse().map(Some).map_err(|_| ()),
        None => Ok(None),
    }
}

impl AdminSearchParams {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(parse_page(&self.page), ADMIN_PAGE_SIZE)
    }

    /// A filter that fails validation searches nothing but keeps the sort.
    pub fn into_filter(self) -> AdminFilter {
        let sort = AdminSort::parse(self.sort.as_deref());
        let validated = (|| -> Result<AdminFilter, ()> {
            Ok(AdminFilter {
                id: parse_int(&self.id)?,
                created_at: parse_int(&self.created_at)?,
                updated_at: parse_int(&self.updated_at)?,
                admin_id: non_empty(&self.admin_id),
                admin_name: non_empty(&self.admin_name),
                email: non_empty(&self.email),
                sort,
            })
        })();

        validated.unwrap_or_else(|_| {
            log::debug!("Admin search parameters failed validation; listing unfiltered");
            AdminFilter {
                sort,
                ..AdminFilter::default()
            }
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApplicationSearchParams {
    pub room_id: Option<String>,
    pub status: Option<String>,
    pub start_time_picker: Option<String>,
    pub end_time_picker: Option<String>,
    pub page: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationFilter {
    pub applicant_id: Option<i32>,
    pub room_id: Option<i32>,
    pub status: Option<ApplicationStatus>,
    pub window_start: i64,
    pub window_end: i64,
}

impl ApplicationFilter {
    pub fn matches(&self, application: &Application) -> bool {
        self.applicant_id.map_or(true, |id| application.applicant_id == id)
            && self.room_id.map_or(true, |id| application.room_id == id)
            && self.status.map_or(true, |s| application.status == s)
            && application.start_time < self.window_end
            && self.window_start < application.end_time
    }
}

impl ApplicationSearchParams {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(parse_page(&self.page), APPLICATION_PAGE_SIZE)
    }

    /// Unparseable pickers fall back to the default window of the next 30 days.
    pub fn to_filter(&self, applicant_id: Option<i32>, now: i64, offset: &FixedOffset) -> ApplicationFilter {
        let window_start = self
            .start_time_picker
            .as_deref()
            .and_then(|v| timefmt::parse_form_time(v, offset))
            .unwrap_or(now);
        let window_end = self
            .end_time_picker
            .as_deref()
            .and_then(|v| timefmt::parse_form_time(v, offset))
            .unwrap_or(window_start + DEFAULT_WINDOW_SECS);

        ApplicationFilter {
            applicant_id,
            room_id: parse_int(&self.room_id).ok().flatten(),
            status: self.status.as_deref().and_then(|s| s.parse().ok()),
            window_start,
            window_end,
        }
    }
}
