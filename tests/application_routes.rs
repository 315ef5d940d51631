mod support;

use actix_web::{http::header, http::StatusCode, test};
use serde_json::{json, Value};

use roombook::models::ApplicationStatus;
use roombook::store::Registry;
use support::*;

fn form(room_id: i32, start: i64, end: i64) -> Value {
    json!({
        "room_id": room_id,
        "organization": "Chess club",
        "phone": "13800000000",
        "event": "Spring tournament",
        "start_time": form_time(start),
        "end_time": form_time(end),
    })
}

#[actix_web::test]
async fn requests_without_token_are_unauthorized() {
    let registry = Registry::memory();
    let app = test::init_service(app(&registry)).await;

    let req = test::TestRequest::get().uri("/application").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(resp.headers().get(header::WWW_AUTHENTICATE).unwrap(), "Bearer");

    let req = test::TestRequest::get()
        .uri("/application")
        .insert_header(bearer("no-such-key"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn create_redirects_to_the_new_application() {
    let registry = Registry::memory();
    let alice = seed_user(&registry, "alice");
    let room = seed_room(&registry, "A-101", true);
    let app = test::init_service(app(&registry)).await;

    let start = days_from_now(3);
    let req = test::TestRequest::post()
        .uri("/application/create")
        .insert_header(bearer(&alice.auth_key))
        .set_json(form(room.id, start, start + 7200))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(resp.headers().get(header::LOCATION).unwrap(), "/application/1");

    let stored = registry.applications().find_by_id(1).unwrap().unwrap();
    assert_eq!(stored.applicant_id, alice.id);
    assert_eq!(stored.status, ApplicationStatus::Pending);
    assert_eq!(stored.start_time, start);
}

#[actix_web::test]
async fn invalid_form_returns_field_errors() {
    let registry = Registry::memory();
    let alice = seed_user(&registry, "alice");
    let room = seed_room(&registry, "A-101", true);
    let app = test::init_service(app(&registry)).await;

    let start = days_from_now(3);
    let mut body = form(room.id, start, start - 3600);
    body["phone"] = json!("");
    let req = test::TestRequest::post()
        .uri("/application/create")
        .insert_header(bearer(&alice.auth_key))
        .set_json(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body: Value = test::read_body_json(resp).await;
    assert!(body["errors"]["phone"].is_array());
    assert!(body["errors"]["end_time"].is_array());
    assert!(body["errors"].get("organization").is_none());
}

#[actix_web::test]
async fn unavailable_rooms_cannot_be_booked() {
    let registry = Registry::memory();
    let alice = seed_user(&registry, "alice");
    let closed = seed_room(&registry, "B-201", false);
    let app = test::init_service(app(&registry)).await;

    let start = days_from_now(3);
    let req = test::TestRequest::post()
        .uri("/application/create")
        .insert_header(bearer(&alice.auth_key))
        .set_json(form(closed.id, start, start + 3600))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["errors"]["room_id"].is_array());
}

#[actix_web::test]
async fn non_owners_are_forbidden() {
    let registry = Registry::memory();
    let alice = seed_user(&registry, "alice");
    let mallory = seed_user(&registry, "mallory");
    let room = seed_room(&registry, "A-101", true);
    let start = days_from_now(3);
    let application = seed_application(&registry, &alice, &room, start, start + 3600, ApplicationStatus::Pending);
    let app = test::init_service(app(&registry)).await;

    let id = application.id;
    let requests = vec![
        test::TestRequest::get().uri(&format!("/application/{}", id)),
        test::TestRequest::get().uri(&format!("/application/{}/update", id)),
        test::TestRequest::post()
            .uri(&format!("/application/{}/update", id))
            .set_json(form(room.id, start, start + 3600)),
        test::TestRequest::post().uri(&format!("/application/{}/delete", id)),
        test::TestRequest::get().uri(&format!("/application/{}/print", id)),
    ];
    for req in requests {
        let req = req.insert_header(bearer(&mallory.auth_key)).to_request();
        let path = req.path().to_owned();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN, "{}", path);
    }

    assert!(registry.applications().find_by_id(id).unwrap().is_some());
}

#[actix_web::test]
async fn unknown_ids_are_not_found() {
    let registry = Registry::memory();
    let alice = seed_user(&registry, "alice");
    let app = test::init_service(app(&registry)).await;

    for uri in [
        "/application/99",
        "/application/99/conflict-detail",
        "/application/99/update",
        "/application/99/print",
        "/application/abc",
    ] {
        let req = test::TestRequest::get()
            .uri(uri)
            .insert_header(bearer(&alice.auth_key))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{}", uri);
    }

    let req = test::TestRequest::post()
        .uri("/application/99/delete")
        .insert_header(bearer(&alice.auth_key))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn update_resets_status_to_pending() {
    let registry = Registry::memory();
    let alice = seed_user(&registry, "alice");
    let room = seed_room(&registry, "A-101", true);
    let start = days_from_now(5);
    let application = seed_application(&registry, &alice, &room, start, start + 3600, ApplicationStatus::Approved);
    let app = test::init_service(app(&registry)).await;

    let new_start = start + 2 * 3600;
    let req = test::TestRequest::post()
        .uri(&format!("/application/{}/update", application.id))
        .insert_header(bearer(&alice.auth_key))
        .set_json(form(room.id, new_start, new_start + 3600))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        resp.headers().get(header::LOCATION).unwrap().to_str().unwrap(),
        format!("/application/{}", application.id)
    );

    let stored = registry.applications().find_by_id(application.id).unwrap().unwrap();
    assert_eq!(stored.status, ApplicationStatus::Pending);
    assert_eq!(stored.start_time, new_start);
    assert_eq!(stored.end_time, new_start + 3600);
    assert_eq!(stored.event, "Spring tournament");
}

#[actix_web::test]
async fn update_form_shows_times_in_form_format() {
    let registry = Registry::memory();
    let alice = seed_user(&registry, "alice");
    let room = seed_room(&registry, "A-101", true);
    let start = days_from_now(2);
    let application = seed_application(&registry, &alice, &room, start, start + 5400, ApplicationStatus::Pending);
    let app = test::init_service(app(&registry)).await;

    let req = test::TestRequest::get()
        .uri(&format!("/application/{}/update", application.id))
        .insert_header(bearer(&alice.auth_key))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["start_time"], form_time(start));
    assert_eq!(body["end_time"], form_time(start + 5400));
    assert_eq!(body["room_id"], room.id);
}

#[actix_web::test]
async fn rejected_applications_cannot_be_changed() {
    let registry = Registry::memory();
    let alice = seed_user(&registry, "alice");
    let room = seed_room(&registry, "A-101", true);
    let start = days_from_now(5);
    let application = seed_application(&registry, &alice, &room, start, start + 3600, ApplicationStatus::Rejected);
    let app = test::init_service(app(&registry)).await;

    let req = test::TestRequest::post()
        .uri(&format!("/application/{}/update", application.id))
        .insert_header(bearer(&alice.auth_key))
        .set_json(form(room.id, start, start + 3600))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let req = test::TestRequest::post()
        .uri(&format!("/application/{}/delete", application.id))
        .insert_header(bearer(&alice.auth_key))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let stored = registry.applications().find_by_id(application.id).unwrap().unwrap();
    assert_eq!(stored.status, ApplicationStatus::Rejected);
}

#[actix_web::test]
async fn delete_removes_and_redirects_to_list() {
    let registry = Registry::memory();
    let alice = seed_user(&registry, "alice");
    let room = seed_room(&registry, "A-101", true);
    let start = days_from_now(5);
    let application = seed_application(&registry, &alice, &room, start, start + 3600, ApplicationStatus::Pending);
    let app = test::init_service(app(&registry)).await;

    let req = test::TestRequest::post()
        .uri(&format!("/application/{}/delete", application.id))
        .insert_header(bearer(&alice.auth_key))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(resp.headers().get(header::LOCATION).unwrap(), "/application");

    assert!(registry.applications().find_by_id(application.id).unwrap().is_none());

    let req = test::TestRequest::get()
        .uri(&format!("/application/{}", application.id))
        .insert_header(bearer(&alice.auth_key))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn view_warns_about_conflicts_and_closed_rooms() {
    let registry = Registry::memory();
    let alice = seed_user(&registry, "alice");
    let bob = seed_user(&registry, "bob");
    let room = seed_room(&registry, "A-101", true);
    let start = days_from_now(4);
    let approved = seed_application(&registry, &bob, &room, start, start + 7200, ApplicationStatus::Approved);
    let mine = seed_application(&registry, &alice, &room, start + 3600, start + 10800, ApplicationStatus::Pending);
    registry.rooms().set_available(room.id, false, 1).unwrap();
    let app = test::init_service(app(&registry)).await;

    let req = test::TestRequest::get()
        .uri(&format!("/application/{}", mine.id))
        .insert_header(bearer(&alice.auth_key))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let warnings = body["warnings"].as_array().unwrap();
    assert_eq!(warnings.len(), 2);
    assert_eq!(warnings[0]["kind"], "conflict");
    assert_eq!(warnings[0]["conflict_id"], approved.id);
    assert_eq!(warnings[1]["kind"], "room_unavailable");
    assert_eq!(body["room_number"], "A-101");

    // the conflicting application is visible without its phone number
    let req = test::TestRequest::get()
        .uri(&format!("/application/{}/conflict-detail", approved.id))
        .insert_header(bearer(&alice.auth_key))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["id"], approved.id);
    assert_eq!(body["organization"], "Debate society");
    assert!(body.get("phone").is_none());
}

#[actix_web::test]
async fn touching_intervals_do_not_warn() {
    let registry = Registry::memory();
    let alice = seed_user(&registry, "alice");
    let bob = seed_user(&registry, "bob");
    let room = seed_room(&registry, "A-101", true);
    let start = days_from_now(4);
    seed_application(&registry, &bob, &room, start, start + 3600, ApplicationStatus::Approved);
    let mine = seed_application(&registry, &alice, &room, start + 3600, start + 7200, ApplicationStatus::Pending);
    let app = test::init_service(app(&registry)).await;

    let req = test::TestRequest::get()
        .uri(&format!("/application/{}", mine.id))
        .insert_header(bearer(&alice.auth_key))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert!(body["warnings"].as_array().unwrap().is_empty());
}

#[actix_web::test]
async fn index_lists_only_own_applications_in_window() {
    let registry = Registry::memory();
    let alice = seed_user(&registry, "alice");
    let bob = seed_user(&registry, "bob");
    let room = seed_room(&registry, "A-101", true);
    let day_after = days_from_now(2);
    let tomorrow = days_from_now(1);
    let far = days_from_now(60);
    let a = seed_application(&registry, &alice, &room, day_after, day_after + 3600, ApplicationStatus::Pending);
    let b = seed_application(&registry, &alice, &room, tomorrow, tomorrow + 3600, ApplicationStatus::Approved);
    seed_application(&registry, &alice, &room, far, far + 3600, ApplicationStatus::Pending);
    seed_application(&registry, &bob, &room, day_after, day_after + 3600, ApplicationStatus::Pending);
    let app = test::init_service(app(&registry)).await;

    let req = test::TestRequest::get()
        .uri("/application")
        .insert_header(bearer(&alice.auth_key))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let ids: Vec<i64> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![b.id as i64, a.id as i64]);
    assert_eq!(body["total"], 2);
    assert_eq!(body["page_size"], 20);

    let req = test::TestRequest::get()
        .uri("/application?status=approved")
        .insert_header(bearer(&alice.auth_key))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"][0]["id"], b.id);
}

#[actix_web::test]
async fn print_returns_a_plain_text_slip() {
    let registry = Registry::memory();
    let alice = seed_user(&registry, "alice");
    let room = seed_room(&registry, "C-301", true);
    let start = days_from_now(3);
    let application = seed_application(&registry, &alice, &room, start, start + 3600, ApplicationStatus::Approved);
    let app = test::init_service(app(&registry)).await;

    let req = test::TestRequest::get()
        .uri(&format!("/application/{}/print", application.id))
        .insert_header(bearer(&alice.auth_key))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp
        .headers()
        .get(header::CONTENT_TYPE)
        .unwrap()
        .to_str()
        .unwrap()
        .starts_with("text/plain"));

    let body = test::read_body(resp).await;
    let slip = std::str::from_utf8(&body).unwrap();
    assert!(slip.contains("Room:         C-301"));
    assert!(slip.contains("Applicant:    alice (Salice)"));
    assert!(slip.contains(&form_time(start)));
}

#[actix_web::test]
async fn malformed_json_is_a_bad_request() {
    let registry = Registry::memory();
    let alice = seed_user(&registry, "alice");
    let app = test::init_service(app(&registry)).await;

    let req = test::TestRequest::post()
        .uri("/application/create")
        .insert_header(bearer(&alice.auth_key))
        .insert_header((header::CONTENT_TYPE, "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["message"].is_string());
}

#[actix_web::test]
async fn bad_query_values_fall_back_to_defaults() {
    let registry = Registry::memory();
    let alice = seed_user(&registry, "alice");
    let room = seed_room(&registry, "A-101", true);
    let start = days_from_now(2);
    seed_application(&registry, &alice, &room, start, start + 3600, ApplicationStatus::Pending);
    let app = test::init_service(app(&registry)).await;

    let req = test::TestRequest::get()
        .uri("/application?room_id=x&page=abc")
        .insert_header(bearer(&alice.auth_key))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["page"], 1);
    assert_eq!(body["total"], 1);
}

#[actix_web::test]
async fn unmatched_paths_answer_with_json() {
    let registry = Registry::memory();
    let alice = seed_user(&registry, "alice");
    let app = test::init_service(app(&registry)).await;

    for uri in ["/application/abc", "/application/99999999999", "/no/such/page"] {
        let req = test::TestRequest::get()
            .uri(uri)
            .insert_header(bearer(&alice.auth_key))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{}", uri);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "The requested page does not exist.", "{}", uri);
    }
}
