//! Session and cart surviving a restart of the application state.

#![allow(clippy::unwrap_used)]

use rust_decimal::Decimal;
use secrecy::SecretString;

use harbor_core::ProductId;
use harbor_integration_tests::MockBackend;
use harbor_storefront::AppState;
use harbor_storefront::cart::ProductCatalog;

const CATALOG: &str = r#"{
    "products": [
        {"id": "mug", "name": "Harbor Mug",
         "price": {"amount": "288", "currency_code": "TWD"},
         "originalPrice": {"amount": "388", "currency_code": "TWD"}},
        {"id": "tote", "name": "Canvas Tote",
         "price": {"amount": "388", "currency_code": "TWD"},
         "originalPrice": {"amount": "388", "currency_code": "TWD"}}
    ],
    "addOns": [
        {"id": "wrap", "name": "Gift wrap", "image": "/wrap.png",
         "originalPrice": {"amount": "50", "currency_code": "TWD"},
         "discountPrice": {"amount": "30", "currency_code": "TWD"}}
    ]
}"#;

async fn log_in(state: &AppState) {
    let mut flow = state.auth_flow();
    flow.open();
    flow.forms_mut().login.email = "ada@example.com".to_string();
    flow.forms_mut().login.password = SecretString::from("hunter22".to_string());
    flow.submit_login().await.unwrap();
}

#[tokio::test]
async fn test_session_and_cart_survive_restart() {
    let backend = MockBackend::start().await.unwrap();
    backend.add_account("ada@example.com", "hunter22").await;
    let dir = tempfile::tempdir().unwrap();
    let catalog_path = dir.path().join("catalog.json");
    std::fs::write(&catalog_path, CATALOG).unwrap();

    let mut config = backend.config(&dir.path().join("state"));
    config.catalog_path = Some(catalog_path);

    {
        let state = AppState::new(config.clone()).unwrap();
        log_in(&state).await;

        let catalog = state.catalog().unwrap();
        let mut cart = state.load_cart(&catalog);
        cart.add_item(catalog.product(&ProductId::new("mug")).unwrap());
        cart.add_item(catalog.product(&ProductId::new("mug")).unwrap());
        cart.add_item(catalog.product(&ProductId::new("tote")).unwrap());
        cart.update_quantity(&ProductId::new("tote"), 2);
        state.save_cart(&cart).unwrap();
    }

    let state = AppState::new(config).unwrap();
    let user = state.session().user().unwrap();
    assert_eq!(user.email.as_str(), "ada@example.com");
    assert!(state.session().is_durable());

    let catalog = state.catalog().unwrap();
    let cart = state.load_cart(&catalog);
    assert_eq!(cart.len(), 2);
    assert_eq!(cart.add_ons().len(), 1);
    let totals = cart.totals();
    assert_eq!(totals.subtotal.amount, Decimal::from(1352));
    assert_eq!(totals.total.amount, Decimal::from(1412));
    assert_eq!(totals.total.to_string(), "NT$1,412");

    // The restored token is accepted by the backend.
    let profile = state.profile().load_profile().await.unwrap();
    assert_eq!(profile.email.unwrap().as_str(), "ada@example.com");
}

#[tokio::test]
async fn test_logout_is_remembered() {
    let backend = MockBackend::start().await.unwrap();
    backend.add_account("ada@example.com", "hunter22").await;
    let dir = tempfile::tempdir().unwrap();

    let state = AppState::new(backend.config(dir.path())).unwrap();
    log_in(&state).await;
    state.session().logout();
    drop(state);

    let state = AppState::new(backend.config(dir.path())).unwrap();
    assert!(!state.session().is_authenticated());
    assert!(state.session().token().is_none());
}

#[tokio::test]
async fn test_unusable_state_dir_runs_in_memory() {
    let backend = MockBackend::start().await.unwrap();
    backend.add_account("ada@example.com", "hunter22").await;
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, "file in the way").unwrap();

    let state = AppState::new(backend.config(&blocker.join("state"))).unwrap();
    assert!(!state.session().is_durable());

    log_in(&state).await;
    assert!(state.session().is_authenticated());

    let restarted = AppState::new(backend.config(&blocker.join("state"))).unwrap();
    assert!(!restarted.session().is_authenticated());
}

#[tokio::test]
async fn test_corrupt_session_record_starts_logged_out() {
    let backend = MockBackend::start().await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("harbor.session.json"), "{not json").unwrap();

    let state = AppState::new(backend.config(dir.path())).unwrap();
    assert!(!state.session().is_authenticated());
    assert!(state.session().is_durable());
}
