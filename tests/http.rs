mod common;

use actix_web::http::StatusCode;
use actix_web::web::Data;
use actix_web::{App, test};
use common::*;
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;

use ponto::clock::ManualClock;
use ponto::config::Config;
use ponto::model::{EmployeeUpdate, Role};
use ponto::routes;
use ponto::state::AppState;
use ponto::store::{MemoryStore, PersistencePort};

const SECRET: &str = "test-secret";

fn peer() -> SocketAddr {
    "127.0.0.1:40000".parse().unwrap()
}

/// Store seeded with one employee (`10000-01`) and one HR user (`20000-01`).
async fn people() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    seed(store.as_ref(), "10000-01", Role::Employee).await;
    let mut rh = employee("20000-01", Role::Hr);
    rh.document = VALID_DOCUMENTS[1].into();
    store.create_employee(rh).await.unwrap();
    store
}

macro_rules! init_app {
    ($store:expr) => {{
        let clock = Arc::new(ManualClock::new(local(2026, 10, 19, 8, 0)));
        let state = Data::new(AppState::new($store.clone(), clock, calendar()));
        let config = Config::for_memory(SECRET);
        test::init_service(
            App::new()
                .app_data(state)
                .app_data(Data::new(config.clone()))
                .configure(|cfg| routes::configure(cfg, &config)),
        )
        .await
    }};
}

macro_rules! login {
    ($app:expr, $email:expr, $document:expr) => {{
        let req = test::TestRequest::post()
            .uri("/auth/login")
            .peer_addr(peer())
            .set_json(json!({ "email": $email, "document": $document }))
            .to_request();
        let resp = test::call_service(&$app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        body
    }};
}

fn bearer(token: &Value) -> (&'static str, String) {
    (
        "Authorization",
        format!("Bearer {}", token.as_str().unwrap_or_default()),
    )
}

#[actix_web::test]
async fn login_rejects_wrong_document() {
    let store = people().await;
    let app = init_app!(store);
    let req = test::TestRequest::post()
        .uri("/auth/login")
        .peer_addr(peer())
        .set_json(json!({ "email": "10000-01@empresa.com", "document": VALID_DOCUMENTS[2] }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "INVALID_CREDENTIALS");
}

#[actix_web::test]
async fn protected_routes_require_an_access_token() {
    let store = people().await;
    let app = init_app!(store);

    let req = test::TestRequest::get()
        .uri("/api/me")
        .peer_addr(peer())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // A refresh token is not an access token.
    let tokens = login!(app, "10000-01@empresa.com", VALID_DOCUMENTS[0]);
    let req = test::TestRequest::get()
        .uri("/api/me")
        .peer_addr(peer())
        .insert_header(bearer(&tokens["refresh_token"]))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn employee_punches_through_the_day() {
    let store = people().await;
    let app = init_app!(store);
    let tokens = login!(app, "10000-01@empresa.com", "529.982.247-25");
    assert_eq!(tokens["employee"]["matricula"], "10000-01");
    let auth = bearer(&tokens["access_token"]);

    let req = test::TestRequest::get()
        .uri("/api/me")
        .peer_addr(peer())
        .insert_header(auth.clone())
        .to_request();
    let me: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(me["role"], "Funcionario");

    let req = test::TestRequest::post()
        .uri("/api/punches")
        .peer_addr(peer())
        .insert_header(auth.clone())
        .set_json(json!({ "location": { "latitude": -23.5, "longitude": -46.6, "accuracy": 5.0 } }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let recorded: Value = test::read_body_json(resp).await;
    assert_eq!(recorded["punch"]["punch_type"], "CHEGADA");
    assert_eq!(recorded["day"].as_array().map(Vec::len), Some(1));

    let req = test::TestRequest::get()
        .uri("/api/punches/next")
        .peer_addr(peer())
        .insert_header(auth.clone())
        .to_request();
    let next: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(next["complete"], false);
    assert_eq!(next["next"], "ALMOCO");
    assert_eq!(next["label"], "Almoço");

    let req = test::TestRequest::get()
        .uri("/api/punches?date=2026-10-19")
        .peer_addr(peer())
        .insert_header(auth.clone())
        .to_request();
    let day: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(day["total"], 1);
}

#[actix_web::test]
async fn employee_is_kept_out_of_hr_endpoints() {
    let store = people().await;
    let app = init_app!(store);
    let tokens = login!(app, "10000-01@empresa.com", VALID_DOCUMENTS[0]);
    let auth = bearer(&tokens["access_token"]);

    for uri in ["/api/employees", "/api/employees/20000-01", "/api/punches?employee=20000-01"] {
        let req = test::TestRequest::get()
            .uri(uri)
            .peer_addr(peer())
            .insert_header(auth.clone())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN, "{uri}");
    }

    let req = test::TestRequest::put()
        .uri("/api/punches/any-id")
        .peer_addr(peer())
        .insert_header(auth)
        .set_json(json!({ "punch_type": "CHEGADA", "timestamp": 1792400000000i64 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn hr_registers_and_corrects() {
    let store = people().await;
    let app = init_app!(store);
    let tokens = login!(app, "20000-01@empresa.com", VALID_DOCUMENTS[1]);
    let auth = bearer(&tokens["access_token"]);

    let req = test::TestRequest::post()
        .uri("/api/employees")
        .peer_addr(peer())
        .insert_header(auth.clone())
        .set_json(json!({
            "name": "Paulo Souza",
            "email": "paulo@empresa.com",
            "document": "111.444.777-35",
            "role": "Funcionario",
            "branch": "Filial",
            "shift": "Tarde"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let paulo: Value = test::read_body_json(resp).await;
    let matricula = paulo["matricula"].as_str().unwrap_or_default().to_string();
    assert_eq!(matricula.len(), 8);

    // Punch on Paulo's behalf.
    let req = test::TestRequest::post()
        .uri("/api/punches")
        .peer_addr(peer())
        .insert_header(auth.clone())
        .set_json(json!({ "employee": matricula }))
        .to_request();
    let recorded: Value = test::call_and_read_body_json(&app, req).await;
    let punch_id = recorded["punch"]["id"].as_str().unwrap_or_default().to_string();

    // Move it to 07:50 local (10:50 UTC) on the same day.
    let req = test::TestRequest::put()
        .uri(&format!("/api/punches/{punch_id}"))
        .peer_addr(peer())
        .insert_header(auth.clone())
        .set_json(json!({
            "punch_type": "CHEGADA",
            "timestamp": local(2026, 10, 19, 7, 50).timestamp_millis()
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let stored = store.get_punch(&punch_id.as_str().into()).await.unwrap().unwrap();
    assert_eq!(stored.timestamp, local(2026, 10, 19, 7, 50));
    assert!(stored.amendment.is_some());

    // Next day is rejected.
    let req = test::TestRequest::put()
        .uri(&format!("/api/punches/{punch_id}"))
        .peer_addr(peer())
        .insert_header(auth.clone())
        .set_json(json!({
            "punch_type": "CHEGADA",
            "timestamp": local(2026, 10, 20, 7, 50).timestamp_millis()
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // Deletion needs explicit confirmation.
    let req = test::TestRequest::delete()
        .uri(&format!("/api/punches/{punch_id}"))
        .peer_addr(peer())
        .insert_header(auth.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/punches/{punch_id}?confirm=true"))
        .peer_addr(peer())
        .insert_header(auth)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(store.get_punch(&punch_id.as_str().into()).await.unwrap().is_none());
}

#[actix_web::test]
async fn demotion_takes_effect_before_the_access_token_expires() {
    let store = people().await;
    let app = init_app!(store);
    let tokens = login!(app, "20000-01@empresa.com", VALID_DOCUMENTS[1]);
    let auth = bearer(&tokens["access_token"]);

    let req = test::TestRequest::get()
        .uri("/api/employees")
        .peer_addr(peer())
        .insert_header(auth.clone())
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    store
        .update_employee(
            &matricula("20000-01"),
            EmployeeUpdate {
                role: Some(Role::Employee),
                ..Default::default()
            },
            local(2026, 10, 19, 8, 5),
        )
        .await
        .unwrap();

    let req = test::TestRequest::get()
        .uri("/api/employees")
        .peer_addr(peer())
        .insert_header(auth.clone())
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::FORBIDDEN
    );

    store.delete_employee(&matricula("20000-01")).await.unwrap();
    let req = test::TestRequest::get()
        .uri("/api/me")
        .peer_addr(peer())
        .insert_header(auth)
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::UNAUTHORIZED
    );
}

#[actix_web::test]
async fn refresh_rotates_tokens() {
    let store = people().await;
    let app = init_app!(store);
    let tokens = login!(app, "10000-01@empresa.com", VALID_DOCUMENTS[0]);

    let req = test::TestRequest::post()
        .uri("/auth/refresh")
        .peer_addr(peer())
        .insert_header(bearer(&tokens["refresh_token"]))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let pair: Value = test::read_body_json(resp).await;
    assert!(pair["access_token"].is_string());

    // Access tokens cannot be used to refresh.
    let req = test::TestRequest::post()
        .uri("/auth/refresh")
        .peer_addr(peer())
        .insert_header(bearer(&tokens["access_token"]))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn malformed_registration_number_is_a_bad_request() {
    let store = people().await;
    let app = init_app!(store);
    let tokens = login!(app, "20000-01@empresa.com", VALID_DOCUMENTS[1]);

    let req = test::TestRequest::get()
        .uri("/api/employees/abc")
        .peer_addr(peer())
        .insert_header(bearer(&tokens["access_token"]))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
