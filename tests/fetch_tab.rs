mod common;

use common::{pages, requests_to, transport, Route};
use homescrape::error::ScrapeError;
use homescrape::fetch::{fetch_tab, tab_click};
use homescrape::session::Session;
use homescrape::sites::transit::ostgotatrafiken;

#[test]
fn tab_click_replays_payload_and_target() {
    let site = ostgotatrafiken();
    let form = tab_click(pages::CARD_OVERVIEW, &site.tabs, "Jobbkort").expect("tab exists");

    let fields = form.fields();
    assert_eq!(&fields[0], &("ice.window".to_string(), "w1".to_string()));
    assert_eq!(form.get("javax.faces.ViewState"), Some("-123:456"));
    assert_eq!(form.get("nothing"), None);

    let target = "form1cardOverviewTabs:1Link";
    assert_eq!(form.get(target), Some(target));
    for name in site.tabs.target_fields {
        assert_eq!(form.get(name), Some(target), "{name}");
    }
    assert_eq!(form.get("ice.event.type"), Some("onclick"));
    assert_eq!(form.get("javax.faces.partial.execute"), Some("@all"));
}

#[test]
fn unknown_tab_is_resource_not_found() {
    let site = ostgotatrafiken();
    let err = tab_click(pages::CARD_OVERVIEW, &site.tabs, "Pendlarkort").unwrap_err();
    match err {
        ScrapeError::ResourceNotFound(msg) => {
            assert!(msg.contains("Busskort"), "lists available tabs: {msg}");
        }
        other => panic!("expected ResourceNotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn fetch_tab_posts_click_back_to_view() {
    let site = ostgotatrafiken();
    let view = site.card_overview;
    let (mock, log) = transport(vec![
        Route::get(view.url, pages::CARD_OVERVIEW),
        Route::post(view.url, pages::CARD_TAB),
    ]);
    let session = Session::cookies(&mock);

    let resp = fetch_tab(&session, &view, &site.tabs, "Busskort").await.expect("tab fetched");
    assert!(resp.body.contains("75 kr"));

    let requests = requests_to(&log, view.url);
    assert_eq!(requests.len(), 2);
    let click = requests[1].form().expect("click is a form post");
    assert_eq!(click.get("form1cardOverviewTabs:0Link"), Some("form1cardOverviewTabs:0Link"));
}

#[tokio::test]
async fn fetch_tab_does_not_fall_back_to_default_tab() {
    let site = ostgotatrafiken();
    let view = site.card_overview;
    let (mock, log) = transport(vec![Route::get(view.url, pages::CARD_OVERVIEW)]);
    let session = Session::cookies(&mock);

    let err = fetch_tab(&session, &view, &site.tabs, "Saknas").await.unwrap_err();
    assert!(matches!(err, ScrapeError::ResourceNotFound(_)));
    assert_eq!(requests_to(&log, view.url).len(), 1, "no click is posted");
}
