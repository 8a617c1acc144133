mod common;

use std::time::Duration;

use common::{pages, requests_to, transport, Route};
use homescrape::contract::{Body, HttpRequest};
use homescrape::error::ScrapeError;
use homescrape::session::{establish, Credentials};
use homescrape::sites::library::arena;
use homescrape::sites::transit::ostgotatrafiken;
use homescrape::sites::{AuthShape, TicketAuth};

const PROFILE: &str = "https://www.gotabiblioteken.se/web/arena/protected/profile";
const SIGN_IN: &str = "https://www.gotabiblioteken.se/web/arena/welcome?signInForm";

fn form_fields(req: &HttpRequest) -> Vec<(String, String)> {
    req.form().expect("form body").fields().to_vec()
}

#[tokio::test]
async fn form_login_posts_hidden_fields_then_credentials() {
    let (mock, log) = transport(vec![
        Route::get(PROFILE, pages::ARENA_LOGIN),
        Route::post(SIGN_IN, pages::ARENA_LOGGED_IN),
    ]);
    let site = arena();

    let session = establish(&mock, &Credentials::new("user", "pass"), &site.auth).await;
    assert!(session.is_ok(), "login should be accepted: {:?}", session.err());

    let posts = requests_to(&log, SIGN_IN);
    assert_eq!(posts.len(), 1);
    assert_eq!(
        form_fields(&posts[0]),
        vec![
            ("token".to_string(), "abc123".to_string()),
            ("openTextUsernameContainer:openTextUsername".to_string(), "user".to_string()),
            ("textPassword".to_string(), "pass".to_string()),
        ]
    );
    assert_eq!(
        posts[0].form().unwrap().encode(),
        "token=abc123&openTextUsernameContainer%3AopenTextUsername=user&textPassword=pass"
    );
    assert!(posts[0]
        .headers
        .iter()
        .any(|(n, v)| n == "Referer" && v == PROFILE));
}

#[tokio::test]
async fn form_login_without_marker_is_rejected() {
    let (mock, _log) = transport(vec![
        Route::get(PROFILE, pages::ARENA_LOGIN),
        Route::post(SIGN_IN, "<html><body>Fel lösenord</body></html>"),
    ]);

    let err = establish(&mock, &Credentials::new("user", "wrong"), &arena().auth)
        .await
        .err()
        .expect("login must fail");
    assert!(matches!(err, ScrapeError::Authentication(_)), "got {err:?}");
}

#[tokio::test]
async fn form_login_rejected_status_is_authentication_error() {
    let (mock, _log) = transport(vec![
        Route::get(PROFILE, pages::ARENA_LOGIN),
        Route::post(SIGN_IN, pages::ARENA_LOGGED_IN).status(403),
    ]);

    let err = establish(&mock, &Credentials::new("user", "pass"), &arena().auth)
        .await
        .err()
        .expect("login must fail");
    assert!(matches!(err, ScrapeError::Authentication(_)));
}

const TICKET_LOGIN: &str = "https://api.example.se/login";
const BALANCE: &str = "https://api.example.se/balance";

fn ticket_auth() -> AuthShape {
    AuthShape::Ticket(TicketAuth {
        login_url: TICKET_LOGIN,
        ticket_header: "AuthenticationTicket",
        timeout: Duration::from_secs(10),
    })
}

#[tokio::test]
async fn ticket_is_attached_to_later_requests() {
    let (mock, log) = transport(vec![
        Route::get(TICKET_LOGIN, "").header("authenticationticket", "T-42"),
        Route::get(BALANCE, "{}"),
    ]);

    let session = establish(&mock, &Credentials::new("user", "pass"), &ticket_auth())
        .await
        .expect("ticket login");
    assert_eq!(session.ticket(), Some("T-42"));
    session.send(HttpRequest::get(BALANCE)).await.expect("fetch");

    let login = &requests_to(&log, TICKET_LOGIN)[0];
    assert_eq!(login.basic_auth, Some(("user".to_string(), "pass".to_string())));
    assert_eq!(login.timeout, Some(Duration::from_secs(10)));

    let fetch = &requests_to(&log, BALANCE)[0];
    assert!(fetch
        .headers
        .iter()
        .any(|(n, v)| n == "AuthenticationTicket" && v == "T-42"));
}

#[tokio::test]
async fn missing_ticket_header_is_authentication_error() {
    let (mock, _log) = transport(vec![Route::get(TICKET_LOGIN, "")]);
    let err = establish(&mock, &Credentials::new("user", "pass"), &ticket_auth())
        .await
        .err()
        .expect("no ticket");
    assert!(matches!(err, ScrapeError::Authentication(_)));
}

#[tokio::test]
async fn json_dashboard_login_requires_marker() {
    let site = ostgotatrafiken();
    let AuthShape::JsonDashboard(auth) = site.auth else {
        panic!("transit uses the json dashboard shape");
    };

    let (mock, log) = transport(vec![
        Route::post(auth.login_url, r#"{"ok":true}"#),
        Route::get(auth.dashboard_url, pages::CARD_OVERVIEW),
    ]);
    establish(&mock, &Credentials::new("anna", "p\"w"), &site.auth)
        .await
        .expect("dashboard carries the marker");

    let login = &requests_to(&log, auth.login_url)[0];
    let Body::Raw { data, .. } = &login.body else {
        panic!("json login is a raw body");
    };
    assert!(data.contains(r#""userName":"anna""#));
    assert!(data.contains(r#""password":"p\"w""#));

    let (mock, _log) = transport(vec![
        Route::post(auth.login_url, r#"{"ok":true}"#),
        Route::get(auth.dashboard_url, "<html><body>Logga in</body></html>"),
    ]);
    let err = establish(&mock, &Credentials::new("anna", "pw"), &site.auth)
        .await
        .err()
        .expect("marker missing");
    assert!(matches!(err, ScrapeError::Authentication(_)));
}
