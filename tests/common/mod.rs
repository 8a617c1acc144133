#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use homescrape::config::AccountConfig;
use homescrape::contract::{HttpRequest, HttpResponse, Method, MockTransport, MockTransportFactory, Transport};

/// Canned response for one method and exact URL.
#[derive(Clone)]
pub struct Route {
    method: Method,
    url: String,
    status: u16,
    headers: Vec<(String, String)>,
    body: String,
}

impl Route {
    pub fn get(url: &str, body: &str) -> Self {
        Self {
            method: Method::Get,
            url: url.to_string(),
            status: 200,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    pub fn post(url: &str, body: &str) -> Self {
        Self {
            method: Method::Post,
            ..Self::get(url, body)
        }
    }

    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }
}

pub type RequestLog = Arc<Mutex<Vec<HttpRequest>>>;

/// A transport answering from `routes`, 404 for anything else, recording every request.
pub fn routed_transport(routes: Vec<Route>, log: RequestLog) -> MockTransport {
    let mut mock = MockTransport::new();
    mock.expect_send().returning(move |req: HttpRequest| {
        log.lock().unwrap().push(req.clone());
        let resp = match routes.iter().find(|r| r.method == req.method && r.url == req.url) {
            Some(route) => HttpResponse {
                status: route.status,
                url: req.url.clone(),
                headers: route.headers.clone(),
                body: route.body.clone(),
            },
            None => HttpResponse {
                status: 404,
                url: req.url.clone(),
                headers: Vec::new(),
                body: String::new(),
            },
        };
        Ok(resp)
    });
    mock
}

pub fn transport(routes: Vec<Route>) -> (MockTransport, RequestLog) {
    let log = RequestLog::default();
    (routed_transport(routes, Arc::clone(&log)), log)
}

/// A factory handing out a fresh routed transport per account run.
pub fn factory(routes: Vec<Route>, log: RequestLog) -> MockTransportFactory {
    let mut factory = MockTransportFactory::new();
    factory.expect_open().returning(move || {
        Ok(Box::new(routed_transport(routes.clone(), Arc::clone(&log))) as Box<dyn Transport>)
    });
    factory
}

pub fn requests_to(log: &RequestLog, url: &str) -> Vec<HttpRequest> {
    log.lock()
        .unwrap()
        .iter()
        .filter(|r| r.url == url)
        .cloned()
        .collect()
}

pub fn account(name: &str) -> AccountConfig {
    AccountConfig::new(name, "user", "pass")
}

pub mod pages {
    pub const ARENA_LOGIN: &str = r#"<html><body>
        <form id="id3_signInForm" method="post" action="/web/arena/welcome?signInForm">
          <input type="hidden" name="token" value="abc123">
          <input type="text" name="openTextUsernameContainer:openTextUsername">
          <input type="password" name="textPassword">
        </form></body></html>"#;

    pub const ARENA_LOGGED_IN: &str = r#"<html><body><a href="/logout">Logga ut</a></body></html>"#;

    pub const ARENA_LOANS: &str = r#"<html><body>
        <div class="arena-renewal-true">
          <span class="arena-record-title">Mio min Mio</span>
          <div class="arena-renewal-branch"><span class="arena-value">Stadsbiblioteket</span></div>
          <div class="arena-renewal-date"><span class="arena-renewal-date-value">2023-05-02</span></div>
        </div></body></html>"#;

    pub const ARENA_RESERVATIONS: &str = r#"<html><body>
        <div class="arena-record">
          <span class="arena-record-title">Ronja</span>
          <div class="arena-record-queue"><span class="arena-value">1 i kön av 2 exemplar</span></div>
          <div class="arena-record-pickup"><span class="arena-value">7</span></div>
        </div></body></html>"#;

    pub const ARENA_DEBTS: &str = r#"<html><body><table>
        <tr><td class="arena-debts-amount">12,50</td></tr>
        <tr><td class="arena-debts-amount">0,00</td></tr>
        </table></body></html>"#;

    pub const CARD_OVERVIEW: &str = r#"<html><body>
        <form id="formLinkedCardRequests">
          <input type="hidden" name="ice.window" value="w1">
          <input type="hidden" name="ice.view" value="v9">
          <input type="hidden" name="javax.faces.ViewState" value="-123:456">
          <input type="button" name="nothing">
        </form>
        <div id="form1cardOverviewTabs">
          <span id="form1cardOverviewTabs:0">Busskort</span>
          <span id="form1cardOverviewTabs:1">Jobbkort</span>
        </div>
        <div>Reskassa 230 kr</div>
        <div>Fr&#229;n 2023-01-01 Till 2023-01-31</div>
        <div>(Senast uppdaterat 2023-01-15 08:42)</div>
        </body></html>"#;

    pub const CARD_TAB: &str = r#"<partial-response><changes><update id="form1"><![CDATA[
        <div>Reskassa 75 kr</div>
        ]]></update></changes></partial-response>"#;
}
