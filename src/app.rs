use std::net::SocketAddr;

use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use crate::{adoptions, auth, pets, routes};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(routes::router())
        .merge(auth::router())
        .merge(pets::router())
        .merge(adoptions::router())
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const BOUNDARY: &str = "petadopt-test-boundary";

    async fn send(app: &Router, req: Request<Body>) -> Response {
        app.clone().oneshot(req).await.expect("router is infallible")
    }

    async fn body_json(res: Response) -> Value {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
        let mut b = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(t) = token {
            b = b.header(header::AUTHORIZATION, format!("Bearer {t}"));
        }
        b.body(Body::from(body.to_string())).unwrap()
    }

    fn authed(method: Method, uri: &str, token: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap()
    }

    fn pet_multipart(token: &str, name: &str, breed: &str) -> Request<Body> {
        pet_form(token, "/add-pet/", name, breed)
    }

    fn pet_form(token: &str, uri: &str, name: &str, breed: &str) -> Request<Body> {
        let mut body = String::new();
        for (k, v) in [
            ("name", name),
            ("category", "Dog"),
            ("age", "3"),
            ("breed", breed),
            ("description", "Good boy"),
            ("contact_email", "owner@example.com"),
        ] {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{k}\"\r\n\r\n{v}\r\n"
            ));
        }
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"rex.png\"\r\nContent-Type: image/png\r\n\r\nPNGDATA\r\n--{BOUNDARY}--\r\n"
        ));
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn signup(app: &Router, username: &str) -> String {
        let res = send(
            app,
            post_json(
                "/signup/",
                None,
                json!({"username": username, "password": "password123", "password_confirm": "password123"}),
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::CREATED);
        body_json(res).await["access_token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn home_redirects_signed_in_users() {
        let app = build_app(AppState::fake().await);
        let anon = send(&app, Request::get("/").body(Body::empty()).unwrap()).await;
        assert_eq!(anon.status(), StatusCode::OK);
        assert_eq!(body_json(anon).await["login"], "/login/");

        let token = signup(&app, "alice").await;
        let res = send(&app, authed(Method::GET, "/", &token)).await;
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(res.headers()[header::LOCATION], "/explore/");
    }

    #[tokio::test]
    async fn protected_routes_need_a_token() {
        let app = build_app(AppState::fake().await);
        for uri in ["/explore/", "/my-pets/", "/my-requests/", "/dashboard/"] {
            let res = send(&app, Request::get(uri).body(Body::empty()).unwrap()).await;
            assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "{uri}");
            assert_eq!(body_json(res).await["error"]["code"], "unauthorized");
        }
    }

    #[tokio::test]
    async fn login_issues_tokens_and_rejects_bad_password() {
        let app = build_app(AppState::fake().await);
        signup(&app, "alice").await;

        let ok = send(
            &app,
            post_json("/login/", None, json!({"username": "alice", "password": "password123"})),
        )
        .await;
        assert_eq!(ok.status(), StatusCode::OK);
        let tokens = body_json(ok).await;
        assert_eq!(tokens["user"]["username"], "alice");

        let refreshed = send(
            &app,
            post_json("/token/refresh/", None, json!({"refresh_token": tokens["refresh_token"]})),
        )
        .await;
        assert_eq!(refreshed.status(), StatusCode::OK);

        let bad = send(
            &app,
            post_json("/login/", None, json!({"username": "alice", "password": "nope-nope"})),
        )
        .await;
        assert_eq!(bad.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn adoption_flow_over_http() {
        let app = build_app(AppState::fake().await);
        let alice = signup(&app, "alice").await;
        let bob = signup(&app, "bob").await;
        let carol = signup(&app, "carol").await;

        let created = send(&app, pet_multipart(&alice, "Rex", "Labrador")).await;
        assert_eq!(created.status(), StatusCode::CREATED);
        assert_eq!(created.headers()[header::LOCATION], "/pet/1/");
        let rex = body_json(created).await;
        assert_eq!(rex["available"], true);
        assert_eq!(rex["status"], "Available");
        assert_eq!(rex["owner_username"], "alice");

        let found = body_json(send(&app, authed(Method::GET, "/explore/?q=lab", &bob)).await).await;
        assert_eq!(found["pets"].as_array().unwrap().len(), 1);
        assert_eq!(found["query"], "lab");
        assert!(found["user_pets"].as_array().unwrap().is_empty());

        let adopt = send(
            &app,
            post_json("/adopt/1/", Some(&bob), json!({"message": "Please!"})),
        )
        .await;
        assert_eq!(adopt.status(), StatusCode::CREATED);
        let request_id = body_json(adopt).await["request"]["id"].as_i64().unwrap();

        let forbidden = send(
            &app,
            authed(Method::POST, &format!("/update-request/{request_id}/Approved/"), &bob),
        )
        .await;
        assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

        let pending = body_json(send(&app, authed(Method::GET, "/owner-requests/?pet_id=", &alice)).await).await;
        assert_eq!(pending.as_array().unwrap().len(), 1);

        let approved = send(
            &app,
            authed(Method::POST, &format!("/update-request/{request_id}/Approved/"), &alice),
        )
        .await;
        assert_eq!(approved.status(), StatusCode::OK);
        assert_eq!(body_json(approved).await["request"]["status"], "Approved");

        let pet = body_json(send(&app, Request::get("/pet/1/").body(Body::empty()).unwrap()).await).await;
        assert_eq!(pet["available"], false);
        assert_eq!(pet["status"], "Adopted");

        let late = send(&app, authed(Method::POST, "/adopt/1/", &carol)).await;
        assert_eq!(late.status(), StatusCode::CONFLICT);
        assert_eq!(body_json(late).await["error"]["code"], "pet_unavailable");

        let adopted = body_json(send(&app, authed(Method::GET, "/my-adopted-pets/", &bob)).await).await;
        assert_eq!(adopted[0]["name"], "Rex");

        let counts = body_json(send(&app, authed(Method::GET, "/dashboard/", &carol)).await).await;
        assert_eq!(counts["total_pets"], 1);
        assert_eq!(counts["adopted_pets"], 1);
    }

    #[tokio::test]
    async fn non_owner_edit_and_delete_look_like_missing_pet() {
        let app = build_app(AppState::fake().await);
        let alice = signup(&app, "alice").await;
        let bob = signup(&app, "bob").await;
        send(&app, pet_multipart(&alice, "Rex", "Beagle")).await;

        let edit = send(&app, authed(Method::GET, "/edit-pet/1/", &bob)).await;
        assert_eq!(edit.status(), StatusCode::NOT_FOUND);
        let delete = send(&app, authed(Method::POST, "/delete-pet/1/", &bob)).await;
        assert_eq!(delete.status(), StatusCode::NOT_FOUND);

        let own = send(&app, authed(Method::POST, "/delete-pet/1/", &alice)).await;
        assert_eq!(own.status(), StatusCode::OK);
        let gone = send(&app, Request::get("/pet/1/").body(Body::empty()).unwrap()).await;
        assert_eq!(gone.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn invalid_decision_is_a_validation_error() {
        let app = build_app(AppState::fake().await);
        let alice = signup(&app, "alice").await;
        let res = send(&app, authed(Method::POST, "/update-request/1/Maybe/", &alice)).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(res).await["error"]["code"], "validation_error");
    }

    #[tokio::test]
    async fn owner_edits_pet_over_multipart() {
        let app = build_app(AppState::fake().await);
        let alice = signup(&app, "alice").await;
        let bob = signup(&app, "bob").await;
        send(&app, pet_multipart(&alice, "Rex", "Beagle")).await;

        let stranger = send(&app, pet_form(&bob, "/edit-pet/1/", "Stolen", "Beagle")).await;
        assert_eq!(stranger.status(), StatusCode::NOT_FOUND);

        let edited = send(&app, pet_form(&alice, "/edit-pet/1/", "Max", "Poodle")).await;
        assert_eq!(edited.status(), StatusCode::OK);
        let pet = body_json(edited).await;
        assert_eq!(pet["name"], "Max");
        assert_eq!(pet["breed"], "Poodle");
        assert_eq!(pet["owner_username"], "alice");

        let shown = body_json(send(&app, Request::get("/pet/1/").body(Body::empty()).unwrap()).await).await;
        assert_eq!(shown["name"], "Max");
    }

    #[tokio::test]
    async fn listings_are_scoped_to_the_caller() {
        let app = build_app(AppState::fake().await);
        let alice = signup(&app, "alice").await;
        let bob = signup(&app, "bob").await;
        send(&app, pet_multipart(&alice, "Rex", "Beagle")).await;
        send(&app, pet_multipart(&bob, "Tweety", "Canary")).await;

        let mine = send(&app, authed(Method::GET, "/my-pets/", &alice)).await;
        assert_eq!(mine.status(), StatusCode::OK);
        let mine = body_json(mine).await;
        assert_eq!(mine.as_array().unwrap().len(), 1);
        assert_eq!(mine[0]["name"], "Rex");

        let adopt = send(&app, post_json("/adopt/1/", Some(&bob), json!({"message": "Hi"}))).await;
        assert_eq!(adopt.status(), StatusCode::CREATED);

        let requests = send(&app, authed(Method::GET, "/my-requests/", &bob)).await;
        assert_eq!(requests.status(), StatusCode::OK);
        let requests = body_json(requests).await;
        assert_eq!(requests.as_array().unwrap().len(), 1);
        assert_eq!(requests[0]["pet_name"], "Rex");
        assert_eq!(requests[0]["status"], "Pending");
        assert_eq!(requests[0]["message"], "Hi");

        let none = body_json(send(&app, authed(Method::GET, "/my-requests/", &alice)).await).await;
        assert!(none.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn adoption_info_is_public_and_searchable() {
        let app = build_app(AppState::fake().await);
        let alice = signup(&app, "alice").await;
        send(&app, pet_multipart(&alice, "Rex", "Beagle")).await;
        send(&app, pet_multipart(&alice, "Max", "Poodle")).await;

        let all = send(&app, Request::get("/adoption-info/").body(Body::empty()).unwrap()).await;
        assert_eq!(all.status(), StatusCode::OK);
        assert_eq!(body_json(all).await["pets"].as_array().unwrap().len(), 2);

        let found = body_json(
            send(&app, Request::get("/adoption-info/?q=poo").body(Body::empty()).unwrap()).await,
        )
        .await;
        assert_eq!(found["query"], "poo");
        let pets = found["pets"].as_array().unwrap();
        assert_eq!(pets.len(), 1);
        assert_eq!(pets[0]["name"], "Max");
    }

    #[tokio::test]
    async fn me_and_logout_need_a_token() {
        let app = build_app(AppState::fake().await);
        let alice = signup(&app, "alice").await;

        let me = send(&app, authed(Method::GET, "/me/", &alice)).await;
        assert_eq!(me.status(), StatusCode::OK);
        let me = body_json(me).await;
        assert_eq!(me["username"], "alice");
        assert!(me["id"].as_i64().is_some());
        assert!(me.get("password_hash").is_none());

        let anon = send(&app, Request::get("/me/").body(Body::empty()).unwrap()).await;
        assert_eq!(anon.status(), StatusCode::UNAUTHORIZED);

        let out = send(&app, authed(Method::POST, "/logout/", &alice)).await;
        assert_eq!(out.status(), StatusCode::OK);
        assert_eq!(body_json(out).await["message"], "Logged out");

        let anon = send(&app, Request::post("/logout/").body(Body::empty()).unwrap()).await;
        assert_eq!(anon.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn malformed_adopt_body_is_rejected() {
        let app = build_app(AppState::fake().await);
        let alice = signup(&app, "alice").await;
        let bob = signup(&app, "bob").await;
        send(&app, pet_multipart(&alice, "Rex", "Beagle")).await;

        let broken = Request::builder()
            .method(Method::POST)
            .uri("/adopt/1/")
            .header(header::AUTHORIZATION, format!("Bearer {bob}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"message": "Please"#))
            .unwrap();
        let res = send(&app, broken).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let err = body_json(res).await;
        assert_eq!(err["error"]["code"], "validation_error");
        assert!(err["error"]["details"]["body"].is_array());

        let requests = body_json(send(&app, authed(Method::GET, "/my-requests/", &bob)).await).await;
        assert!(requests.as_array().unwrap().is_empty());

        let bare = send(&app, authed(Method::POST, "/adopt/1/", &bob)).await;
        assert_eq!(bare.status(), StatusCode::CREATED);
        assert!(body_json(bare).await["request"]["message"].is_null());
    }

    #[tokio::test]
    async fn second_decision_is_a_conflict() {
        let app = build_app(AppState::fake().await);
        let alice = signup(&app, "alice").await;
        let bob = signup(&app, "bob").await;
        send(&app, pet_multipart(&alice, "Rex", "Beagle")).await;
        let adopt = send(&app, authed(Method::POST, "/adopt/1/", &bob)).await;
        let id = body_json(adopt).await["request"]["id"].as_i64().unwrap();

        let ok = send(&app, authed(Method::POST, &format!("/update-request/{id}/Approved/"), &alice)).await;
        assert_eq!(ok.status(), StatusCode::OK);

        let again = send(&app, authed(Method::POST, &format!("/update-request/{id}/Rejected/"), &alice)).await;
        assert_eq!(again.status(), StatusCode::CONFLICT);
        assert_eq!(body_json(again).await["error"]["code"], "already_decided");

        let mine = body_json(send(&app, authed(Method::GET, "/my-requests/", &bob)).await).await;
        assert_eq!(mine[0]["status"], "Approved");
    }
}
