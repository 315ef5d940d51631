use diesel::PgConnection;

use super::{AdminRepository, ApplicationRepository, Approval, DbPool, RoomRepository, StoreResult, UserRepository};
use crate::actions;
use crate::models::{
    Admin, Application, ApplicationChanges, ApplicationStatus, NewAdmin, NewApplication, NewRoom, NewUser, Room, User,
    UserProfileChanges,
};
use crate::search::{AdminFilter, ApplicationFilter, Page, PageRequest};

/// Repository implementations over an r2d2 pool. Callers run these on the
/// blocking thread pool (`web::block`).
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn with_conn<T>(&self, f: impl FnOnce(&mut PgConnection) -> StoreResult<T>) -> StoreResult<T> {
        let mut conn = self.pool.get()?;
        f(&mut *conn)
    }
}

impl UserRepository for PgStore {
    fn create(&self, user: NewUser) -> StoreResult<User> {
        self.with_conn(|conn| actions::insert_new_user(conn, &user))
    }

    fn find_by_id(&self, id: i32) -> StoreResult<Option<User>> {
        self.with_conn(|conn| actions::get_user_by_id(conn, id))
    }

    fn find_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        self.with_conn(|conn| actions::get_user_by_username(conn, username))
    }

    fn find_by_auth_key(&self, auth_key: &str) -> StoreResult<Option<User>> {
        self.with_conn(|conn| actions::get_user_by_auth_key(conn, auth_key))
    }

    fn update_profile(&self, id: i32, changes: UserProfileChanges) -> StoreResult<Option<User>> {
        self.with_conn(|conn| actions::update_user_profile(conn, id, &changes))
    }

    fn update_password(&self, id: i32, password_hash: &str, auth_key: &str, now: i64) -> StoreResult<Option<User>> {
        self.with_conn(|conn| actions::update_user_password(conn, id, password_hash, auth_key, now))
    }
}

impl AdminRepository for PgStore {
    fn create(&self, admin: NewAdmin) -> StoreResult<Admin> {
        self.with_conn(|conn| actions::insert_new_admin(conn, &admin))
    }

    fn find_by_id(&self, id: i32) -> StoreResult<Option<Admin>> {
        self.with_conn(|conn| actions::get_admin_by_id(conn, id))
    }

    fn find_by_admin_id(&self, admin_id: &str) -> StoreResult<Option<Admin>> {
        self.with_conn(|conn| actions::get_admin_by_admin_id(conn, admin_id))
    }

    fn find_by_auth_key(&self, auth_key: &str) -> StoreResult<Option<Admin>> {
        self.with_conn(|conn| actions::get_admin_by_auth_key(conn, auth_key))
    }

    fn find_by_reset_token(&self, token: &str) -> StoreResult<Option<Admin>> {
        self.with_conn(|conn| actions::get_admin_by_reset_token(conn, token))
    }

    fn set_reset_token(&self, id: i32, token: &str, now: i64) -> StoreResult<Option<Admin>> {
        self.with_conn(|conn| actions::set_admin_reset_token(conn, id, token, now))
    }

    fn reset_password(&self, id: i32, password_hash: &str, auth_key: &str, now: i64) -> StoreResult<Option<Admin>> {
        self.with_conn(|conn| actions::reset_admin_password(conn, id, password_hash, auth_key, now))
    }

    fn delete(&self, id: i32) -> StoreResult<bool> {
        self.with_conn(|conn| actions::delete_admin(conn, id))
    }

    fn search(&self, filter: &AdminFilter, request: PageRequest) -> StoreResult<Page<Admin>> {
        self.with_conn(|conn| actions::search_admins(conn, filter, request))
    }
}

impl RoomRepository for PgStore {
    fn create(&self, room: NewRoom) -> StoreResult<Room> {
        self.with_conn(|conn| actions::insert_new_room(conn, &room))
    }

    fn find_by_id(&self, id: i32) -> StoreResult<Option<Room>> {
        self.with_conn(|conn| actions::get_room_by_id(conn, id))
    }

    fn list(&self) -> StoreResult<Vec<Room>> {
        self.with_conn(actions::list_rooms)
    }

    fn set_available(&self, id: i32, available: bool, now: i64) -> StoreResult<Option<Room>> {
        self.with_conn(|conn| actions::set_room_available(conn, id, available, now))
    }
}

impl ApplicationRepository for PgStore {
    fn create(&self, application: NewApplication) -> StoreResult<Application> {
        self.with_conn(|conn| actions::insert_new_application(conn, &application))
    }

    fn find_by_id(&self, id: i32) -> StoreResult<Option<Application>> {
        self.with_conn(|conn| actions::get_application_by_id(conn, id))
    }

    fn search(&self, filter: &ApplicationFilter, request: PageRequest) -> StoreResult<Page<Application>> {
        self.with_conn(|conn| actions::search_applications(conn, filter, request))
    }

    fn update(&self, id: i32, changes: ApplicationChanges) -> StoreResult<Option<Application>> {
        self.with_conn(|conn| actions::update_application(conn, id, &changes))
    }

    fn set_status(&self, id: i32, status: ApplicationStatus, now: i64) -> StoreResult<Option<Application>> {
        self.with_conn(|conn| actions::set_application_status(conn, id, status, now))
    }

    fn delete(&self, id: i32) -> StoreResult<bool> {
        self.with_conn(|conn| actions::delete_application(conn, id))
    }

    fn find_conflict_id(&self, application: &Application) -> StoreResult<Option<i32>> {
        self.with_conn(|conn| actions::find_conflict_id(conn, application))
    }

    fn approve(&self, id: i32, now: i64) -> StoreResult<Option<Approval>> {
        self.with_conn(|conn| actions::approve_application(conn, id, now))
    }
}
