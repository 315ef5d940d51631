use std::collections::BTreeMap;

use parking_lot::Mutex;

use super::{AdminRepository, ApplicationRepository, Approval, RoomRepository, StoreResult, UserRepository};
use crate::conflict;
use crate::error::StoreError;
use crate::models::{
    Admin, Application, ApplicationChanges, ApplicationStatus, NewAdmin, NewApplication, NewRoom, NewUser, Room, User,
    UserProfileChanges,
};
use crate::search::{AdminFilter, ApplicationFilter, Page, PageRequest};

/// Rows keyed by id, with a serial counter like a Postgres `SERIAL`.
struct Table<T> {
    rows: BTreeMap<i32, T>,
    next_id: i32,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl<T> Table<T> {
    fn next_id(&mut self) -> i32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

#[derive(Default)]
struct Tables {
    users: Table<User>,
    admins: Table<Admin>,
    rooms: Table<Room>,
    applications: Table<Application>,
}

/// Process-local store behind a single mutex. Enforces the same unique
/// columns the migrations declare.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn ensure_unique<'a, T: 'a>(
    rows: impl IntoIterator<Item = &'a T>,
    skip_id: Option<i32>,
    field: &str,
    id_of: impl Fn(&T) -> i32,
    taken: impl Fn(&T) -> bool,
) -> StoreResult<()> {
    let clash = rows
        .into_iter()
        .any(|row| Some(id_of(row)) != skip_id && taken(row));
    if clash {
        Err(StoreError::Duplicate(field.to_string()))
    } else {
        Ok(())
    }
}

impl UserRepository for MemoryStore {
    fn create(&self, user: NewUser) -> StoreResult<User> {
        let mut tables = self.tables.lock();
        let users = &mut tables.users;
        let existing = users.rows.values();
        ensure_unique(existing.clone(), None, "student_id", |u| u.id, |u| u.student_id == user.student_id)?;
        ensure_unique(existing.clone(), None, "username", |u| u.id, |u| u.username == user.username)?;
        ensure_unique(existing, None, "email", |u| u.id, |u| u.email == user.email)?;

        let id = users.next_id();
        let row = User {
            id,
            student_id: user.student_id,
            username: user.username,
            auth_key: user.auth_key,
            password_hash: user.password_hash,
            email: user.email,
            status: user.status,
            created_at: user.created_at,
            updated_at: user.updated_at,
        };
        users.rows.insert(id, row.clone());
        Ok(row)
    }

    fn find_by_id(&self, id: i32) -> StoreResult<Option<User>> {
        Ok(self.tables.lock().users.rows.get(&id).cloned())
    }

    fn find_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.lock();
        Ok(tables.users.rows.values().find(|u| u.username == username).cloned())
    }

    fn find_by_auth_key(&self, auth_key: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.lock();
        Ok(tables.users.rows.values().find(|u| u.auth_key == auth_key).cloned())
    }

    fn update_profile(&self, id: i32, changes: UserProfileChanges) -> StoreResult<Option<User>> {
        let mut tables = self.tables.lock();
        let users = &mut tables.users;
        if let Some(username) = &changes.username {
            ensure_unique(users.rows.values(), Some(id), "username", |u| u.id, |u| &u.username == username)?;
        }
        if let Some(email) = &changes.email {
            ensure_unique(users.rows.values(), Some(id), "email", |u| u.id, |u| &u.email == email)?;
        }

        let Some(user) = users.rows.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(username) = changes.username {
            user.username = username;
        }
        if let Some(email) = changes.email {
            user.email = email;
        }
        user.updated_at = changes.updated_at;
        Ok(Some(user.clone()))
    }

    fn update_password(&self, id: i32, password_hash: &str, auth_key: &str, now: i64) -> StoreResult<Option<User>> {
        let mut tables = self.tables.lock();
        Ok(tables.users.rows.get_mut(&id).map(|user| {
            user.password_hash = password_hash.to_owned();
            user.auth_key = auth_key.to_owned();
            user.updated_at = now;
            user.clone()
        }))
    }
}

impl AdminRepository for MemoryStore {
    fn create(&self, admin: NewAdmin) -> StoreResult<Admin> {
        let mut tables = self.tables.lock();
        let admins = &mut tables.admins;
        let existing = admins.rows.values();
        ensure_unique(existing.clone(), None, "admin_id", |a| a.id, |a| a.admin_id == admin.admin_id)?;
        ensure_unique(existing, None, "email", |a| a.id, |a| a.email == admin.email)?;

        let id = admins.next_id();
        let row = Admin {
            id,
            admin_id: admin.admin_id,
            admin_name: admin.admin_name,
            auth_key: admin.auth_key,
            password_hash: admin.password_hash,
            password_reset_token: None,
            email: admin.email,
            created_at: admin.created_at,
            updated_at: admin.updated_at,
        };
        admins.rows.insert(id, row.clone());
        Ok(row)
    }

    fn find_by_id(&self, id: i32) -> StoreResult<Option<Admin>> {
        Ok(self.tables.lock().admins.rows.get(&id).cloned())
    }

    fn find_by_admin_id(&self, admin_id: &str) -> StoreResult<Option<Admin>> {
        let tables = self.tables.lock();
        Ok(tables.admins.rows.values().find(|a| a.admin_id == admin_id).cloned())
    }

    fn find_by_auth_key(&self, auth_key: &str) -> StoreResult<Option<Admin>> {
        let tables = self.tables.lock();
        Ok(tables.admins.rows.values().find(|a| a.auth_key == auth_key).cloned())
    }

    fn find_by_reset_token(&self, token: &str) -> StoreResult<Option<Admin>> {
        let tables = self.tables.lock();
        Ok(tables
            .admins
            .rows
            .values()
            .find(|a| a.password_reset_token.as_deref() == Some(token))
            .cloned())
    }

    fn set_reset_token(&self, id: i32, token: &str, now: i64) -> StoreResult<Option<Admin>> {
        let mut tables = self.tables.lock();
        let admins = &mut tables.admins;
        ensure_unique(admins.rows.values(), Some(id), "password_reset_token", |a| a.id, |a| {
            a.password_reset_token.as_deref() == Some(token)
        })?;
        Ok(admins.rows.get_mut(&id).map(|admin| {
            admin.password_reset_token = Some(token.to_owned());
            admin.updated_at = now;
            admin.clone()
        }))
    }

    fn reset_password(&self, id: i32, password_hash: &str, auth_key: &str, now: i64) -> StoreResult<Option<Admin>> {
        let mut tables = self.tables.lock();
        Ok(tables.admins.rows.get_mut(&id).map(|admin| {
            admin.password_hash = password_hash.to_owned();
            admin.auth_key = auth_key.to_owned();
            admin.password_reset_token = None;
            admin.updated_at = now;
            admin.clone()
        }))
    }

    fn delete(&self, id: i32) -> StoreResult<bool> {
        Ok(self.tables.lock().admins.rows.remove(&id).is_some())
    }

    fn search(&self, filter: &AdminFilter, request: PageRequest) -> StoreResult<Page<Admin>> {
        let tables = self.tables.lock();
        let mut rows: Vec<Admin> = tables
            .admins
            .rows
            .values()
            .filter(|admin| filter.matches(admin))
            .cloned()
            .collect();
        // ties fall back to id, as the SQL query does
        rows.sort_by(|a, b| filter.sort.compare(a, b).then(a.id.cmp(&b.id)));
        Ok(Page::from_sorted(rows, request))
    }
}

impl RoomRepository for MemoryStore {
    fn create(&self, room: NewRoom) -> StoreResult<Room> {
        let mut tables = self.tables.lock();
        let rooms = &mut tables.rooms;
        ensure_unique(rooms.rows.values(), None, "number", |r| r.id, |r| r.number == room.number)?;

        let id = rooms.next_id();
        let row = Room {
            id,
            number: room.number,
            capacity: room.capacity,
            available: room.available,
            created_at: room.created_at,
            updated_at: room.updated_at,
        };
        rooms.rows.insert(id, row.clone());
        Ok(row)
    }

    fn find_by_id(&self, id: i32) -> StoreResult<Option<Room>> {
        Ok(self.tables.lock().rooms.rows.get(&id).cloned())
    }

    fn list(&self) -> StoreResult<Vec<Room>> {
        let tables = self.tables.lock();
        let mut rooms: Vec<Room> = tables.rooms.rows.values().cloned().collect();
        rooms.sort_by(|a, b| a.number.cmp(&b.number));
        Ok(rooms)
    }

    fn set_available(&self, id: i32, available: bool, now: i64) -> StoreResult<Option<Room>> {
        let mut tables = self.tables.lock();
        Ok(tables.rooms.rows.get_mut(&id).map(|room| {
            room.available = available;
            room.updated_at = now;
            room.clone()
        }))
    }
}

impl ApplicationRepository for MemoryStore {
    fn create(&self, application: NewApplication) -> StoreResult<Application> {
        let mut tables = self.tables.lock();
        let applications = &mut tables.applications;

        let id = applications.next_id();
        let row = Application {
            id,
            applicant_id: application.applicant_id,
            room_id: application.room_id,
            organization: application.organization,
            phone: application.phone,
            event: application.event,
            start_time: application.start_time,
            end_time: application.end_time,
            status: application.status,
            created_at: application.created_at,
            updated_at: application.updated_at,
        };
        applications.rows.insert(id, row.clone());
        Ok(row)
    }

    fn find_by_id(&self, id: i32) -> StoreResult<Option<Application>> {
        Ok(self.tables.lock().applications.rows.get(&id).cloned())
    }

    fn search(&self, filter: &ApplicationFilter, request: PageRequest) -> StoreResult<Page<Application>> {
        let tables = self.tables.lock();
        let mut rows: Vec<Application> = tables
            .applications
            .rows
            .values()
            .filter(|application| filter.matches(application))
            .cloned()
            .collect();
        rows.sort_by_key(|a| (a.start_time, a.id));
        Ok(Page::from_sorted(rows, request))
    }

    fn update(&self, id: i32, changes: ApplicationChanges) -> StoreResult<Option<Application>> {
        let mut tables = self.tables.lock();
        Ok(tables.applications.rows.get_mut(&id).map(|application| {
            application.room_id = changes.room_id;
            application.organization = changes.organization;
            application.phone = changes.phone;
            application.event = changes.event;
            application.start_time = changes.start_time;
            application.end_time = changes.end_time;
            application.status = changes.status;
            application.updated_at = changes.updated_at;
            application.clone()
        }))
    }

    fn set_status(&self, id: i32, status: ApplicationStatus, now: i64) -> StoreResult<Option<Application>> {
        let mut tables = self.tables.lock();
        Ok(tables.applications.rows.get_mut(&id).map(|application| {
            application.status = status;
            application.updated_at = now;
            application.clone()
        }))
    }

    fn delete(&self, id: i32) -> StoreResult<bool> {
        Ok(self.tables.lock().applications.rows.remove(&id).is_some())
    }

    fn find_conflict_id(&self, application: &Application) -> StoreResult<Option<i32>> {
        let tables = self.tables.lock();
        Ok(conflict::find_conflict_id(application, tables.applications.rows.values()))
    }

    fn approve(&self, id: i32, now: i64) -> StoreResult<Option<Approval>> {
        let mut tables = self.tables.lock();
        let applications = &mut tables.applications;

        let Some(mut as_pending) = applications.rows.get(&id).cloned() else {
            return Ok(None);
        };
        as_pending.status = ApplicationStatus::Pending;
        if let Some(conflict_id) = conflict::find_conflict_id(&as_pending, applications.rows.values()) {
            return Ok(Some(Approval::Conflicts(conflict_id)));
        }

        Ok(applications.rows.get_mut(&id).map(|application| {
            application.status = ApplicationStatus::Approved;
            application.updated_at = now;
            Approval::Approved(application.clone())
        }))
    }
}
