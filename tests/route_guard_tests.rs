use std::sync::Arc;

use storefront::api::ApiClient;
use storefront::config::ClientConfig;
use storefront::identity::{Role, SessionStore};
use storefront::mock::{MockServer, SEED_PASSWORD, SEED_USERS};
use storefront::routing::{Navigator, RedirectReason, Screen, LOGIN_PATH, ROUTES};

async fn navigator_for(server: &MockServer) -> Navigator {
    let api = Arc::new(ApiClient::new(ClientConfig::new(server.api_url())).expect("client"));
    let session = Arc::new(SessionStore::new(api));
    session.initialize().await;
    Navigator::new(session)
}

fn home_screen(role: Role) -> Screen {
    match role {
        Role::Admin => Screen::ProductAdmin,
        Role::Buyer => Screen::Catalog,
        Role::Cs1 => Screen::PaymentDesk,
        Role::Cs2 => Screen::ShipmentDesk,
    }
}

#[tokio::test]
async fn visitors_only_reach_login() {
    let server = MockServer::start().await.unwrap();
    let nav = navigator_for(&server).await;
    for route in ROUTES.iter() {
        let landed = nav.navigate(route.path);
        assert_eq!(landed.screen(), Some(Screen::Login), "{}", route.path);
        assert_eq!(landed.path(), LOGIN_PATH);
    }
    assert!(nav.menu().is_empty());
}

#[tokio::test]
async fn every_seeded_role_sees_only_its_own_screens() {
    let server = MockServer::start().await.unwrap();
    for (email, _, role) in SEED_USERS {
        let nav = navigator_for(&server).await;
        nav.session().login(email, SEED_PASSWORD).await.unwrap();

        for route in ROUTES.iter() {
            let landed = nav.navigate(route.path);
            if route.required.contains(role) {
                assert_eq!(landed.screen(), Some(route.screen), "{} on {}", role, route.path);
                assert_eq!(landed.path(), route.path);
            } else {
                assert_eq!(landed.screen(), Some(home_screen(role)), "{} on {}", role, route.path);
                assert_eq!(landed.path(), role.home_path());
            }
        }
    }
}

#[tokio::test]
async fn forbidden_route_redirects_to_home_with_reason() {
    let server = MockServer::start().await.unwrap();
    let nav = navigator_for(&server).await;
    nav.session().login("cs1@shop.test", SEED_PASSWORD).await.unwrap();

    let landed = nav.navigate("/admin");
    assert_eq!(landed.path(), "/cs1");
    match landed {
        storefront::routing::Navigation::Rendered { redirects, .. } => {
            assert_eq!(redirects, vec![("/admin".to_string(), RedirectReason::Forbidden)]);
        }
        other => panic!("unexpected {:?}", other),
    }

    let login = nav.navigate("/auth?next=/admin");
    assert_eq!(login.path(), "/cs1");
    assert_eq!(nav.location(), "/cs1");
}

#[tokio::test]
async fn menu_follows_the_role() {
    let server = MockServer::start().await.unwrap();
    let nav = navigator_for(&server).await;
    nav.session().login("buyer@shop.test", SEED_PASSWORD).await.unwrap();
    let paths: Vec<&str> = nav.menu().iter().map(|l| l.path).collect();
    assert_eq!(paths, vec!["/my-orders"]);

    let admin = navigator_for(&server).await;
    admin.session().login("admin@shop.test", SEED_PASSWORD).await.unwrap();
    let labels: Vec<&str> = admin.menu().iter().map(|l| l.label).collect();
    assert_eq!(labels, vec!["Master Product"]);
}

#[tokio::test]
async fn logout_sends_current_screen_back_to_login() {
    let server = MockServer::start().await.unwrap();
    let nav = navigator_for(&server).await;
    nav.session().login("cs2@shop.test", SEED_PASSWORD).await.unwrap();
    assert_eq!(nav.navigate("/cs2").screen(), Some(Screen::ShipmentDesk));

    nav.session().logout().await.unwrap();
    let after = nav.revalidate();
    assert_eq!(after.screen(), Some(Screen::Login));
    assert_eq!(nav.location(), LOGIN_PATH);
    assert!(nav.menu().is_empty());
}

#[tokio::test]
async fn unknown_path_falls_back_to_login_or_home() {
    let server = MockServer::start().await.unwrap();
    let nav = navigator_for(&server).await;
    assert_eq!(nav.navigate("/nowhere").path(), LOGIN_PATH);

    nav.session().login("buyer@shop.test", SEED_PASSWORD).await.unwrap();
    assert_eq!(nav.navigate("/nowhere").path(), "/buyer");
}
