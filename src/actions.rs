use diesel::pg::Pg;
use diesel::prelude::*;

use crate::conflict::BLOCKING_STATUS;
use crate::error::StoreError;
use crate::models::{self, ApplicationStatus};
use crate::schema::{admins, applications};
use crate::search::{like_pattern, AdminFilter, AdminSortField, ApplicationFilter, Page, PageRequest};
use crate::store::Approval;

type DbResult<T> = Result<T, StoreError>;

// users

pub fn insert_new_user(conn: &mut PgConnection, new_user: &models::NewUser) -> DbResult<models::User> {
    use crate::schema::users::dsl::*;

    let user = diesel::insert_into(users)
        .values(new_user)
        .returning(models::User::as_returning())
        .get_result(conn)?;

    Ok(user)
}

pub fn get_user_by_id(conn: &mut PgConnection, uid: i32) -> DbResult<Option<models::User>> {
    use crate::schema::users::dsl::users;

    let user = users
        .find(uid)
        .select(models::User::as_select())
        .first(conn)
        .optional()?;

    Ok(user)
}

pub fn get_user_by_username(conn: &mut PgConnection, name: &str) -> DbResult<Option<models::User>> {
    use crate::schema::users::dsl::{username, users};

    let user = users
        .filter(username.eq(name))
        .select(models::User::as_select())
        .first(conn)
        .optional()?;

    Ok(user)
}

pub fn get_user_by_auth_key(conn: &mut PgConnection, key: &str) -> DbResult<Option<models::User>> {
    use crate::schema::users::dsl::{auth_key, users};

    let user = users
        .filter(auth_key.eq(key))
        .select(models::User::as_select())
        .first(conn)
        .optional()?;

    Ok(user)
}

pub fn update_user_profile(
    conn: &mut PgConnection,
    uid: i32,
    changes: &models::UserProfileChanges,
) -> DbResult<Option<models::User>> {
    use crate::schema::users::dsl::users;

    let user = diesel::update(users.find(uid))
        .set(changes)
        .returning(models::User::as_returning())
        .get_result(conn)
        .optional()?;

    Ok(user)
}

pub fn update_user_password(
    conn: &mut PgConnection,
    uid: i32,
    new_hash: &str,
    new_auth_key: &str,
    now: i64,
) -> DbResult<Option<models::User>> {
    use crate::schema::users::dsl::*;

    let user = diesel::update(users.find(uid))
        .set((
            password_hash.eq(new_hash),
            auth_key.eq(new_auth_key),
            updated_at.eq(now),
        ))
        .returning(models::User::as_returning())
        .get_result(conn)
        .optional()?;

    Ok(user)
}

// admins

pub fn insert_new_admin(conn: &mut PgConnection, new_admin: &models::NewAdmin) -> DbResult<models::Admin> {
    use crate::schema::admins::dsl::admins;

    let admin = diesel::insert_into(admins)
        .values(new_admin)
        .returning(models::Admin::as_returning())
        .get_result(conn)?;

    Ok(admin)
}

pub fn get_admin_by_id(conn: &mut PgConnection, aid: i32) -> DbResult<Option<models::Admin>> {
    use crate::schema::admins::dsl::admins;

    let admin = admins
        .find(aid)
        .select(models::Admin::as_select())
        .first(conn)
        .optional()?;

    Ok(admin)
}

pub fn get_admin_by_admin_id(conn: &mut PgConnection, login: &str) -> DbResult<Option<models::Admin>> {
    use crate::schema::admins::dsl::{admin_id, admins};

    let admin = admins
        .filter(admin_id.eq(login))
        .select(models::Admin::as_select())
        .first(conn)
        .optional()?;

    Ok(admin)
}

pub fn get_admin_by_auth_key(conn: &mut PgConnection, key: &str) -> DbResult<Option<models::Admin>> {
    use crate::schema::admins::dsl::{admins, auth_key};

    let admin = admins
        .filter(auth_key.eq(key))
        .select(models::Admin::as_select())
        .first(conn)
        .optional()?;

    Ok(admin)
}

pub fn get_admin_by_reset_token(conn: &mut PgConnection, token: &str) -> DbResult<Option<models::Admin>> {
    use crate::schema::admins::dsl::{admins, password_reset_token};

    let admin = admins
        .filter(password_reset_token.eq(token))
        .select(models::Admin::as_select())
        .first(conn)
        .optional()?;

    Ok(admin)
}

pub fn set_admin_reset_token(
    conn: &mut PgConnection,
    aid: i32,
    token: &str,
    now: i64,
) -> DbResult<Option<models::Admin>> {
    use crate::schema::admins::dsl::{admins, password_reset_token, updated_at};

    let admin = diesel::update(admins.find(aid))
        .set((password_reset_token.eq(Some(token)), updated_at.eq(now)))
        .returning(models::Admin::as_returning())
        .get_result(conn)
        .optional()?;

    Ok(admin)
}

/// Stores the new hash, rotates the auth key and burns the reset token.
pub fn reset_admin_password(
    conn: &mut PgConnection,
    aid: i32,
    new_hash: &str,
    new_auth_key: &str,
    now: i64,
) -> DbResult<Option<models::Admin>> {
    use crate::schema::admins::dsl::{admins, auth_key, password_hash, password_reset_token, updated_at};

    let admin = diesel::update(admins.find(aid))
        .set((
            password_hash.eq(new_hash),
            auth_key.eq(new_auth_key),
            password_reset_token.eq::<Option<String>>(None),
            updated_at.eq(now),
        ))
        .returning(models::Admin::as_returning())
        .get_result(conn)
        .optional()?;

    Ok(admin)
}

pub fn delete_admin(conn: &mut PgConnection, aid: i32) -> DbResult<bool> {
    use crate::schema::admins::dsl::admins;

    let deleted = diesel::delete(admins.find(aid)).execute(conn)?;
    Ok(deleted > 0)
}

fn filtered_admins(filter: &AdminFilter) -> admins::BoxedQuery<'static, Pg> {
    let mut query = admins::table.into_boxed();

    if let Some(id) = filter.id {
        query = query.filter(admins::id.eq(id));
    }
    if let Some(created) = filter.created_at {
        query = query.filter(admins::created_at.eq(created));
    }
    if let Some(updated) = filter.updated_at {
        query = query.filter(admins::updated_at.eq(updated));
    }
    if let Some(value) = &filter.admin_id {
        query = query.filter(admins::admin_id.ilike(like_pattern(value)));
    }
    if let Some(value) = &filter.admin_name {
        query = query.filter(admins::admin_name.ilike(like_pattern(value)));
    }
    if let Some(value) = &filter.email {
        query = query.filter(admins::email.ilike(like_pattern(value)));
    }

    query
}

pub fn search_admins(
    conn: &mut PgConnection,
    filter: &AdminFilter,
    request: PageRequest,
) -> DbResult<Page<models::Admin>> {
    conn.transaction(|conn| {
        let total: i64 = filtered_admins(filter).count().get_result(conn)?;
        let request = request.clamp(total);

        let query = filtered_admins(filter);
        let sort = filter.sort;
        macro_rules! ordered {
            ($column:expr) => {
                if sort.descending {
                    query.order($column.desc())
                } else {
                    query.order($column.asc())
                }
            };
        }
        let query = match sort.field {
            AdminSortField::Id => ordered!(admins::id),
            AdminSortField::AdminId => ordered!(admins::admin_id),
            AdminSortField::AdminName => ordered!(admins::admin_name),
            AdminSortField::Email => ordered!(admins::email),
            AdminSortField::CreatedAt => ordered!(admins::created_at),
            AdminSortField::UpdatedAt => ordered!(admins::updated_at),
        };

        let items = query
            .then_order_by(admins::id.asc())
            .limit(request.page_size)
            .offset(request.offset())
            .select(models::Admin::as_select())
            .load(conn)?;

        Ok(Page::new(items, request, total))
    })
}

// rooms

pub fn insert_new_room(conn: &mut PgConnection, new_room: &models::NewRoom) -> DbResult<models::Room> {
    use crate::schema::rooms::dsl::*;

    let room = diesel::insert_into(rooms)
        .values(new_room)
        .returning(models::Room::as_returning())
        .get_result(conn)?;

    Ok(room)
}

pub fn get_room_by_id(conn: &mut PgConnection, rid: i32) -> DbResult<Option<models::Room>> {
    use crate::schema::rooms::dsl::rooms;

    let room = rooms
        .find(rid)
        .select(models::Room::as_select())
        .first(conn)
        .optional()?;

    Ok(room)
}

pub fn list_rooms(conn: &mut PgConnection) -> DbResult<Vec<models::Room>> {
    use crate::schema::rooms::dsl::*;

    let all = rooms
        .order(number.asc())
        .select(models::Room::as_select())
        .load(conn)?;

    Ok(all)
}

pub fn set_room_available(
    conn: &mut PgConnection,
    rid: i32,
    flag: bool,
    now: i64,
) -> DbResult<Option<models::Room>> {
    use crate::schema::rooms::dsl::*;

    let room = diesel::update(rooms.find(rid))
        .set((available.eq(flag), updated_at.eq(now)))
        .returning(models::Room::as_returning())
        .get_result(conn)
        .optional()?;

    Ok(room)
}

// applications

pub fn insert_new_application(
    conn: &mut PgConnection,
    new_application: &models::NewApplication,
) -> DbResult<models::Application> {
    use crate::schema::applications::dsl::applications;

    let application = diesel::insert_into(applications)
        .values(new_application)
        .returning(models::Application::as_returning())
        .get_result(conn)?;

    Ok(application)
}

pub fn get_application_by_id(conn: &mut PgConnection, app_id: i32) -> DbResult<Option<models::Application>> {
    use crate::schema::applications::dsl::applications;

    let application = applications
        .find(app_id)
        .select(models::Application::as_select())
        .first(conn)
        .optional()?;

    Ok(application)
}

fn filtered_applications(filter: &ApplicationFilter) -> applications::BoxedQuery<'static, Pg> {
    let mut query = applications::table
        .filter(applications::start_time.lt(filter.window_end))
        .filter(applications::end_time.gt(filter.window_start))
        .into_boxed();

    if let Some(uid) = filter.applicant_id {
        query = query.filter(applications::applicant_id.eq(uid));
    }
    if let Some(rid) = filter.room_id {
        query = query.filter(applications::room_id.eq(rid));
    }
    if let Some(status) = filter.status {
        query = query.filter(applications::status.eq(status));
    }

    query
}

pub fn search_applications(
    conn: &mut PgConnection,
    filter: &ApplicationFilter,
    request: PageRequest,
) -> DbResult<Page<models::Application>> {
    conn.transaction(|conn| {
        let total: i64 = filtered_applications(filter).count().get_result(conn)?;
        let request = request.clamp(total);

        let items = filtered_applications(filter)
            .order((applications::start_time.asc(), applications::id.asc()))
            .limit(request.page_size)
            .offset(request.offset())
            .select(models::Application::as_select())
            .load(conn)?;

        Ok(Page::new(items, request, total))
    })
}

pub fn update_application(
    conn: &mut PgConnection,
    app_id: i32,
    changes: &models::ApplicationChanges,
) -> DbResult<Option<models::Application>> {
    use crate::schema::applications::dsl::applications;

    let application = diesel::update(applications.find(app_id))
        .set(changes)
        .returning(models::Application::as_returning())
        .get_result(conn)
        .optional()?;

    Ok(application)
}

pub fn set_application_status(
    conn: &mut PgConnection,
    app_id: i32,
    new_status: ApplicationStatus,
    now: i64,
) -> DbResult<Option<models::Application>> {
    use crate::schema::applications::dsl::{applications, status, updated_at};

    let application = diesel::update(applications.find(app_id))
        .set((status.eq(new_status), updated_at.eq(now)))
        .returning(models::Application::as_returning())
        .get_result(conn)
        .optional()?;

    Ok(application)
}

pub fn delete_application(conn: &mut PgConnection, app_id: i32) -> DbResult<bool> {
    use crate::schema::applications::dsl::applications;

    let deleted = diesel::delete(applications.find(app_id)).execute(conn)?;
    Ok(deleted > 0)
}

/// Lowest id of an approved application on the same room whose interval
/// overlaps `candidate`.
pub fn find_conflict_id(conn: &mut PgConnection, candidate: &models::Application) -> DbResult<Option<i32>> {
    use crate::schema::applications::dsl::{applications, end_time, id, room_id, start_time, status};

    if candidate.status == ApplicationStatus::Rejected {
        return Ok(None);
    }

    let conflict = applications
        .filter(room_id.eq(candidate.room_id))
        .filter(id.ne(candidate.id))
        .filter(status.eq(BLOCKING_STATUS))
        .filter(
            // overlap: (start1 < end2) AND (start2 < end1)
            start_time.lt(candidate.end_time).and(end_time.gt(candidate.start_time)),
        )
        .select(id)
        .order(id.asc())
        .first::<i32>(conn)
        .optional()?;

    Ok(conflict)
}

/// Approves `app_id` unless an approved application already holds the room.
/// The room row is locked for the duration, so approvals on one room run one
/// at a time.
pub fn approve_application(conn: &mut PgConnection, app_id: i32, now: i64) -> DbResult<Option<Approval>> {
    use crate::schema::rooms;

    conn.transaction(|conn| {
        let candidate: Option<models::Application> = applications::table
            .find(app_id)
            .select(models::Application::as_select())
            .for_update()
            .first(conn)
            .optional()?;
        let Some(mut as_pending) = candidate else {
            return Ok(None);
        };

        rooms::table
            .find(as_pending.room_id)
            .select(rooms::id)
            .for_update()
            .first::<i32>(conn)
            .optional()?;

        as_pending.status = ApplicationStatus::Pending;
        if let Some(conflict_id) = find_conflict_id(conn, &as_pending)? {
            return Ok(Some(Approval::Conflicts(conflict_id)));
        }

        let approved = set_application_status(conn, app_id, ApplicationStatus::Approved, now)?;
        Ok(approved.map(Approval::Approved))
    })
}
