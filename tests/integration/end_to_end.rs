use std::collections::HashMap;

use flux_probe::config::AppConfig;
use flux_probe::transport::{HttpResponse, Method};
use flux_probe::types::{Credentials, ProbeError, Stage};
use flux_probe::{probe_once, BalanceProbe};

use crate::stub_transport::StubTransport;

const LOGIN_PAGE: &str = include_str!("../fixtures/login_page.html");
const LOGIN_PAGE_NO_VIEWSTATE: &str = include_str!("../fixtures/login_page_no_viewstate.html");
const DETAILS_PAGE: &str = include_str!("../fixtures/details_page.html");

fn login_redirect() -> HttpResponse {
    HttpResponse {
        status: 302,
        set_cookies: vec!["ASP.NET_SessionId=ABC123; path=/; HttpOnly".to_string()],
        body: String::new(),
    }
}

fn full_portal() -> StubTransport {
    StubTransport::new()
        .respond(HttpResponse::ok(LOGIN_PAGE))
        .respond(login_redirect())
        .respond(HttpResponse::ok(DETAILS_PAGE))
}

fn env() -> HashMap<String, String> {
    HashMap::from([
        ("FLUX_THU_USER".to_string(), "2020011234".to_string()),
        ("FLUX_THU_PASS".to_string(), "hunter2".to_string()),
    ])
}

#[tokio::test]
async fn test_run_end_to_end() {
    let transport = full_portal();
    let probe = BalanceProbe::new(transport.clone(), &AppConfig::default()).unwrap();

    let line = probe
        .run(&Credentials::new("2020011234", "hunter2"))
        .await
        .unwrap();

    assert_eq!(
        line.to_string(),
        "electricity_balance value=42.5 1700000000000000000"
    );
    assert_eq!(transport.requests().len(), 3);
}

#[tokio::test]
async fn test_requests_carry_tokens_and_session() {
    let transport = full_portal();
    let cfg = AppConfig::default();
    let env = env();
    probe_once(&cfg, transport.clone(), |k| env.get(k).cloned())
        .await
        .unwrap();

    let requests = transport.requests();
    let [login, form, details] = requests.as_slice() else {
        panic!("expected three requests, got {}", requests.len());
    };

    assert_eq!(login.method, Method::Get);
    assert_eq!(login.url, cfg.portal.login_url);
    assert!(login.cookie.is_none());

    assert_eq!(form.method, Method::Post);
    assert_eq!(form.url, cfg.portal.login_url);
    assert_eq!(
        form.form_value("__VIEWSTATE"),
        Some("/wEPDwUKMTY1NDU2MTA1MmRkNFZ4kQ2bq+f0Rj8dE1sVZ7sw3xI=")
    );
    assert_eq!(form.form_value("__VIEWSTATEGENERATOR"), Some("CA0B0334"));
    assert_eq!(
        form.form_value("net_Default_LoginCtrl1$txtUserName"),
        Some("2020011234")
    );
    assert_eq!(form.form_value("net_Default_LoginCtrl1$txtUserPwd"), Some("hunter2"));

    assert_eq!(details.method, Method::Get);
    assert_eq!(details.url, cfg.portal.details_url);
    assert_eq!(details.cookie.as_deref(), Some("ASP.NET_SessionId=ABC123"));
}

#[tokio::test]
async fn test_missing_viewstate_issues_no_post() {
    let transport = StubTransport::new()
        .respond(HttpResponse::ok(LOGIN_PAGE_NO_VIEWSTATE))
        .respond(login_redirect())
        .respond(HttpResponse::ok(DETAILS_PAGE));
    let env = env();

    let err = probe_once(&AppConfig::default(), transport.clone(), |k| env.get(k).cloned())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ProbeError::Extraction {
            stage: Stage::LoginPage,
            field: "__VIEWSTATE",
            ..
        }
    ));
    assert_eq!(transport.post_count(), 0);
    assert_eq!(transport.requests().len(), 1);
}

#[tokio::test]
async fn test_missing_user_makes_no_network_calls() {
    let transport = full_portal();
    let env = HashMap::from([("FLUX_THU_PASS".to_string(), "hunter2".to_string())]);

    let err = probe_once(&AppConfig::default(), transport.clone(), |k| env.get(k).cloned())
        .await
        .unwrap_err();

    assert!(err.is_config());
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn test_expired_session_lands_on_login_page() {
    // The portal answers the details GET with the login form again
    let transport = StubTransport::new()
        .respond(HttpResponse::ok(LOGIN_PAGE))
        .respond(login_redirect())
        .respond(HttpResponse::ok(LOGIN_PAGE));
    let env = env();

    let err = probe_once(&AppConfig::default(), transport, |k| env.get(k).cloned())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ProbeError::Extraction {
            stage: Stage::DetailsPage,
            ..
        }
    ));
}

#[tokio::test]
async fn test_network_failure_on_first_call() {
    let transport = StubTransport::new().fail("dns error: failed to lookup address");
    let env = env();

    let err = probe_once(&AppConfig::default(), transport.clone(), |k| env.get(k).cloned())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ProbeError::Network {
            stage: Stage::LoginPage,
            ..
        }
    ));
    assert_eq!(transport.requests().len(), 1);
}

#[tokio::test]
async fn test_config_file_overrides_flow_through() {
    let cfg = AppConfig::from_toml(
        r#"
        [probe]
        metric_name = "dorm_electricity"

        [portal]
        login_url = "https://portal.example.edu/default.aspx"
        details_url = "https://portal.example.edu/detail.aspx"
        utc_offset_hours = 0

        [credentials]
        username_env = "DORM_USER"
        password_env = "DORM_PASS"
        "#,
    )
    .unwrap();
    let env = HashMap::from([
        ("DORM_USER".to_string(), "u".to_string()),
        ("DORM_PASS".to_string(), "p".to_string()),
    ]);
    let transport = full_portal();

    let line = probe_once(&cfg, transport.clone(), |k| env.get(k).cloned())
        .await
        .unwrap();

    // Same wall-clock text read as UTC is eight hours later
    assert_eq!(
        line.to_string(),
        "dorm_electricity value=42.5 1700028800000000000"
    );
    assert_eq!(
        transport.requests()[2].url,
        "https://portal.example.edu/detail.aspx"
    );
}
