//! Repository traits and the registry handlers resolve them through.
//!
//! Each entity gets its own trait; the Postgres backend delegates to the
//! query functions in [`crate::actions`], the memory backend keeps rows in a
//! mutex-guarded map and is what the integration tests run against.

use std::sync::Arc;

use diesel::{r2d2, PgConnection};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use log::info;

use crate::config::{BootstrapAdmin, Config, StoreBackend};
use crate::error::{ServiceError, StoreError};
use crate::models::{
    Admin, Application, ApplicationChanges, ApplicationStatus, NewAdmin, NewApplication, NewRoom, NewUser, Room, User,
    UserProfileChanges,
};
use crate::search::{AdminFilter, ApplicationFilter, Page, PageRequest};
use crate::{security, timefmt};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub type DbPool = r2d2::Pool<r2d2::ConnectionManager<PgConnection>>;
pub type StoreResult<T> = Result<T, StoreError>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub trait UserRepository: Send + Sync {
    fn create(&self, user: NewUser) -> StoreResult<User>;
    fn find_by_id(&self, id: i32) -> StoreResult<Option<User>>;
    fn find_by_username(&self, username: &str) -> StoreResult<Option<User>>;
    fn find_by_auth_key(&self, auth_key: &str) -> StoreResult<Option<User>>;
    fn update_profile(&self, id: i32, changes: UserProfileChanges) -> StoreResult<Option<User>>;
    /// Also rotates the auth key, signing out other sessions.
    fn update_password(&self, id: i32, password_hash: &str, auth_key: &str, now: i64) -> StoreResult<Option<User>>;
}

pub trait AdminRepository: Send + Sync {
    fn create(&self, admin: NewAdmin) -> StoreResult<Admin>;
    fn find_by_id(&self, id: i32) -> StoreResult<Option<Admin>>;
    fn find_by_admin_id(&self, admin_id: &str) -> StoreResult<Option<Admin>>;
    fn find_by_auth_key(&self, auth_key: &str) -> StoreResult<Option<Admin>>;
    fn find_by_reset_token(&self, token: &str) -> StoreResult<Option<Admin>>;
    fn set_reset_token(&self, id: i32, token: &str, now: i64) -> StoreResult<Option<Admin>>;
    /// Stores the new hash, rotates the auth key and clears the reset token.
    fn reset_password(&self, id: i32, password_hash: &str, auth_key: &str, now: i64) -> StoreResult<Option<Admin>>;
    fn delete(&self, id: i32) -> StoreResult<bool>;
    fn search(&self, filter: &AdminFilter, request: PageRequest) -> StoreResult<Page<Admin>>;
}

pub trait RoomRepository: Send + Sync {
    fn create(&self, room: NewRoom) -> StoreResult<Room>;
    fn find_by_id(&self, id: i32) -> StoreResult<Option<Room>>;
    fn list(&self) -> StoreResult<Vec<Room>>;
    fn set_available(&self, id: i32, available: bool, now: i64) -> StoreResult<Option<Room>>;
}

/// Result of an approval attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Approval {
    Approved(Application),
    /// Refused: the given approved application already holds the room.
    Conflicts(i32),
}

pub trait ApplicationRepository: Send + Sync {
    fn create(&self, application: NewApplication) -> StoreResult<Application>;
    fn find_by_id(&self, id: i32) -> StoreResult<Option<Application>>;
    fn search(&self, filter: &ApplicationFilter, request: PageRequest) -> StoreResult<Page<Application>>;
    fn update(&self, id: i32, changes: ApplicationChanges) -> StoreResult<Option<Application>>;
    fn set_status(&self, id: i32, status: ApplicationStatus, now: i64) -> StoreResult<Option<Application>>;
    fn delete(&self, id: i32) -> StoreResult<bool>;
    fn find_conflict_id(&self, application: &Application) -> StoreResult<Option<i32>>;
    /// Checks for conflicts and approves in one atomic step. A rejected
    /// application is checked as if it had been resubmitted.
    fn approve(&self, id: i32, now: i64) -> StoreResult<Option<Approval>>;
}

#[derive(Clone)]
pub struct Registry {
    users: Arc<dyn UserRepository>,
    admins: Arc<dyn AdminRepository>,
    rooms: Arc<dyn RoomRepository>,
    applications: Arc<dyn ApplicationRepository>,
}

impl Registry {
    pub fn new<S>(store: Arc<S>) -> Self
    where
        S: UserRepository + AdminRepository + RoomRepository + ApplicationRepository + 'static,
    {
        Self {
            users: store.clone(),
            admins: store.clone(),
            rooms: store.clone(),
            applications: store,
        }
    }

    pub fn memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn users(&self) -> &dyn UserRepository {
        self.users.as_ref()
    }

    pub fn admins(&self) -> &dyn AdminRepository {
        self.admins.as_ref()
    }

    pub fn rooms(&self) -> &dyn RoomRepository {
        self.rooms.as_ref()
    }

    pub fn applications(&self) -> &dyn ApplicationRepository {
        self.applications.as_ref()
    }
}

pub fn initialize_db_pool(database_url: &str, pool_size: u32) -> StoreResult<DbPool> {
    let manager = r2d2::ConnectionManager::<PgConnection>::new(database_url);
    let pool = r2d2::Pool::builder().max_size(pool_size).build(manager)?;

    let mut conn = pool.get()?;
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| StoreError::Migration(e.to_string()))?;
    for version in applied {
        info!("Applied migration {}", version);
    }

    Ok(pool)
}

/// Builds the backend named by the configuration.
pub fn build_registry(config: &Config) -> StoreResult<Registry> {
    match config.backend {
        StoreBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .ok_or_else(|| StoreError::Unavailable("DATABASE_URL is not set".to_string()))?;
            let pool = initialize_db_pool(url, config.pool_size)?;
            info!("Using postgres store (pool size {})", config.pool_size);
            Ok(Registry::new(Arc::new(PgStore::new(pool))))
        }
        StoreBackend::Memory => {
            info!("Using in-memory store; data is lost on restart");
            Ok(Registry::memory())
        }
    }
}

/// Creates the configured admin unless an admin with that login exists.
pub fn seed_admin(registry: &Registry, seed: &BootstrapAdmin) -> Result<(), ServiceError> {
    if registry.admins().find_by_admin_id(&seed.admin_id)?.is_some() {
        return Ok(());
    }

    let now = timefmt::now_epoch();
    let admin = registry.admins().create(NewAdmin {
        admin_id: seed.admin_id.clone(),
        admin_name: seed.admin_name.clone(),
        auth_key: security::generate_auth_key(),
        password_hash: security::hash_password(&seed.password)?,
        email: seed.email.clone(),
        created_at: now,
        updated_at: now,
    })?;
    info!("Seeded admin {} (id {})", admin.admin_id, admin.id);

    Ok(())
}
