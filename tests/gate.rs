//! Control de acceso de las rutas protegidas, sin base de datos.

use actix_web::http::{header, StatusCode};
use actix_web::middleware::from_fn;
use actix_web::{test, web, App, HttpResponse};
use chrono::{Duration, Utc};
use mongodb::bson::oid::ObjectId;
use serde_json::Value;

use redrice_backend::api;
use redrice_backend::auth::{require_auth, AdminIdentity, Identity, TokenService};
use redrice_backend::config::TokenConfig;
use redrice_backend::db::{MongoRepo, Role};

fn tokens() -> TokenService {
    TokenService::new(&TokenConfig {
        secret: "clave-de-pruebas-con-32-caracteres!!".to_string(),
        expiration_hours: 24,
    })
}

async fn whoami(identity: Identity) -> HttpResponse {
    HttpResponse::Ok().body(identity.user_id.to_hex())
}

async fn admin_only(_admin: AdminIdentity) -> HttpResponse {
    HttpResponse::Ok().finish()
}

macro_rules! gated_app {
    () => {
        test::init_service(
            App::new().app_data(web::Data::new(tokens())).service(
                web::scope("/api/v1")
                    .wrap(from_fn(require_auth))
                    .route("/whoami", web::get().to(whoami))
                    .route("/admin", web::get().to(admin_only)),
            ),
        )
        .await
    };
}

#[actix_web::test]
async fn request_without_header_is_unauthorized() {
    let app = gated_app!();
    let req = test::TestRequest::get().uri("/api/v1/whoami").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn malformed_header_is_unauthorized() {
    let app = gated_app!();
    let req = test::TestRequest::get()
        .uri("/api/v1/whoami")
        .insert_header((header::AUTHORIZATION, "Token abc"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn garbage_token_is_unauthorized() {
    let app = gated_app!();
    let req = test::TestRequest::get()
        .uri("/api/v1/whoami")
        .insert_header((header::AUTHORIZATION, "Bearer not.a.jwt"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn token_signed_with_other_secret_is_unauthorized() {
    let app = gated_app!();
    let other = TokenService::new(&TokenConfig {
        secret: "otra-clave-distinta-de-32-caracteres".to_string(),
        expiration_hours: 24,
    });
    let token = other.issue(&ObjectId::new(), "a@x.com", Role::User).unwrap();

    let req = test::TestRequest::get()
        .uri("/api/v1/whoami")
        .insert_header((header::AUTHORIZATION, format!("Bearer {}", token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn expired_token_is_unauthorized() {
    let app = gated_app!();
    let issued = Utc::now() - Duration::hours(25);
    let token = tokens()
        .issue_at(&ObjectId::new(), "a@x.com", Role::User, issued)
        .unwrap();

    let req = test::TestRequest::get()
        .uri("/api/v1/whoami")
        .insert_header((header::AUTHORIZATION, format!("Bearer {}", token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Token caducado");
}

#[actix_web::test]
async fn valid_token_reaches_handler_with_identity() {
    let app = gated_app!();
    let id = ObjectId::new();
    let token = tokens().issue(&id, "a@x.com", Role::User).unwrap();

    let req = test::TestRequest::get()
        .uri("/api/v1/whoami")
        .insert_header((header::AUTHORIZATION, format!("Bearer {}", token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body = test::read_body(resp).await;
    assert_eq!(body, id.to_hex().as_bytes());
}

#[actix_web::test]
async fn admin_route_rejects_regular_user() {
    let app = gated_app!();
    let token = tokens().issue(&ObjectId::new(), "a@x.com", Role::User).unwrap();

    let req = test::TestRequest::get()
        .uri("/api/v1/admin")
        .insert_header((header::AUTHORIZATION, format!("Bearer {}", token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn admin_route_accepts_admin() {
    let app = gated_app!();
    let token = tokens().issue(&ObjectId::new(), "root@x.com", Role::Admin).unwrap();

    let req = test::TestRequest::get()
        .uri("/api/v1/admin")
        .insert_header((header::AUTHORIZATION, format!("Bearer {}", token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn api_routes_require_token_before_touching_storage() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(tokens()))
            .configure(api::init_routes),
    )
    .await;

    for uri in ["/api/v1/me", "/api/v1/restaurants", "/api/v1/reservations", "/api/v1/comments"] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{uri}");

        let body: Value = test::read_body_json(resp).await;
        assert!(body["error"].is_string(), "{uri}");
    }
}

// Repositorio sin servidor detrás: sirve para rutas que deciden antes de tocar la base de datos
async fn unreachable_repo() -> MongoRepo {
    let client = mongodb::Client::with_uri_str("mongodb://127.0.0.1:1/?serverSelectionTimeoutMS=200")
        .await
        .unwrap();
    let database = client.database("redrice_sin_servidor");
    MongoRepo { client, database }
}

async fn put_user(target: ObjectId, caller: ObjectId, role: Role, body: Value) -> StatusCode {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(tokens()))
            .app_data(web::Data::new(unreachable_repo().await))
            .configure(api::init_routes),
    )
    .await;
    let token = tokens().issue(&caller, "a@x.com", role).unwrap();

    let req = test::TestRequest::put()
        .uri(&format!("/api/v1/users/{}", target.to_hex()))
        .insert_header((header::AUTHORIZATION, format!("Bearer {}", token)))
        .set_json(body)
        .to_request();
    test::call_service(&app, req).await.status()
}

#[actix_web::test]
async fn user_cannot_edit_another_user() {
    let status = put_user(
        ObjectId::new(),
        ObjectId::new(),
        Role::User,
        serde_json::json!({ "name": "Intruso" }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn user_cannot_promote_themself() {
    let me = ObjectId::new();
    let status = put_user(me, me, Role::User, serde_json::json!({ "role": "admin" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn regular_user_cannot_create_restaurants() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(tokens()))
            .app_data(web::Data::new(unreachable_repo().await))
            .configure(api::init_routes),
    )
    .await;
    let token = tokens().issue(&ObjectId::new(), "a@x.com", Role::User).unwrap();

    let req = test::TestRequest::post()
        .uri("/api/v1/restaurants")
        .insert_header((header::AUTHORIZATION, format!("Bearer {}", token)))
        .set_json(serde_json::json!({ "name": "Casa Pepe" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn malformed_id_in_path_is_bad_request() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(tokens()))
            .app_data(web::Data::new(unreachable_repo().await))
            .configure(api::init_routes),
    )
    .await;
    let token = tokens().issue(&ObjectId::new(), "a@x.com", Role::User).unwrap();

    let req = test::TestRequest::get()
        .uri("/api/v1/reservations/no-es-un-id")
        .insert_header((header::AUTHORIZATION, format!("Bearer {}", token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"].as_str().unwrap().contains("id"));
}
