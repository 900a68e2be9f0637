use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use storefront::api::{ApiClient, Order, Product};
use storefront::config::ClientConfig;
use storefront::identity::SessionStore;
use storefront::mock::{MockServer, SEED_PASSWORD};
use storefront::pagination::{LoadOutcome, Paginator};

async fn signed_in(server: &MockServer, email: &str) -> Arc<ApiClient> {
    let api = Arc::new(ApiClient::new(ClientConfig::new(server.api_url())).expect("client"));
    let session = SessionStore::new(api.clone());
    session.initialize().await;
    session.login(email, SEED_PASSWORD).await.expect("login");
    api
}

#[tokio::test]
async fn follows_cursor_until_exhausted() {
    let server = MockServer::start().await.unwrap();
    let api = signed_in(&server, "buyer@shop.test").await;
    let pager: Paginator<Product> = Paginator::new();

    let message = pager.load_first(&*api, "/products").await.unwrap();
    assert_eq!(message.as_deref(), Some("Fetch data success"));
    assert_eq!(pager.len(), 10);
    assert!(pager.has_more());
    assert!(pager.next_cursor().unwrap().ends_with("/products?page=2"));

    assert_eq!(pager.load_more(&*api).await.unwrap(), LoadOutcome::Appended { added: 10 });
    assert_eq!(pager.load_more(&*api).await.unwrap(), LoadOutcome::Appended { added: 3 });
    assert!(!pager.has_more());
    assert_eq!(pager.load_more(&*api).await.unwrap(), LoadOutcome::Exhausted);

    // Arrival order, no duplicates, only active products for buyers.
    let items = pager.items();
    let ids: Vec<i64> = items.iter().map(|p| p.id).collect();
    let unique: HashSet<i64> = ids.iter().copied().collect();
    assert_eq!(unique.len(), 23);
    assert!(ids.windows(2).all(|w| w[0] < w[1]));
    assert!(items.iter().all(|p| p.is_active));
}

#[tokio::test]
async fn second_load_while_busy_is_ignored() {
    let server = MockServer::start().await.unwrap();
    let api = signed_in(&server, "buyer@shop.test").await;
    let pager: Paginator<Product> = Paginator::new();
    pager.load_first(&*api, "/products").await.unwrap();

    server.faults().delay_listings(Duration::from_millis(200));
    let outcomes = futures::future::join_all((0..3).map(|_| pager.load_more(&*api))).await;
    let outcomes: Vec<LoadOutcome> = outcomes.into_iter().map(|o| o.unwrap()).collect();
    assert_eq!(outcomes, vec![LoadOutcome::Appended { added: 10 }, LoadOutcome::Busy, LoadOutcome::Busy]);
    assert_eq!(pager.len(), 20);
    assert!(!pager.is_busy());
}

#[tokio::test]
async fn late_page_after_close_is_dropped() {
    let server = MockServer::start().await.unwrap();
    let api = signed_in(&server, "buyer@shop.test").await;
    let pager: Arc<Paginator<Product>> = Arc::new(Paginator::new());
    pager.load_first(&*api, "/products").await.unwrap();

    server.faults().delay_listings(Duration::from_millis(300));
    let task = {
        let pager = pager.clone();
        let api = api.clone();
        tokio::spawn(async move { pager.load_more(&*api).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    pager.close();

    assert_eq!(task.await.unwrap().unwrap(), LoadOutcome::Stale);
    assert_eq!(pager.len(), 10);
    assert!(!pager.has_more());
}

#[tokio::test]
async fn refetch_supersedes_in_flight_page() {
    let server = MockServer::start().await.unwrap();
    let api = signed_in(&server, "buyer@shop.test").await;
    let pager: Arc<Paginator<Product>> = Arc::new(Paginator::new());
    pager.load_first(&*api, "/products").await.unwrap();

    server.faults().delay_listings(Duration::from_millis(300));
    let task = {
        let pager = pager.clone();
        let api = api.clone();
        tokio::spawn(async move { pager.load_more(&*api).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    server.faults().delay_listings(Duration::ZERO);
    pager.load_first(&*api, "/products").await.unwrap();

    assert_eq!(task.await.unwrap().unwrap(), LoadOutcome::Stale);
    assert_eq!(pager.len(), 10);
    assert!(pager.has_more());
}

#[tokio::test]
async fn failed_page_leaves_state_untouched() {
    let server = MockServer::start().await.unwrap();
    let api = signed_in(&server, "buyer@shop.test").await;
    let pager: Paginator<Order> = Paginator::new();
    server.with_store(|s| {
        for _ in 0..5 {
            let pid = s.products(false)[0].id;
            s.add_to_cart(2, pid, 1).unwrap();
            s.checkout(2, chrono::Utc::now()).unwrap();
        }
    });
    pager.load_first(&*api, "/orders").await.unwrap();
    let cursor = pager.next_cursor();
    assert!(cursor.is_some());

    server.drop_sessions().await;
    let err = pager.load_more(&*api).await.unwrap_err();
    assert!(err.is_auth());
    assert_eq!(pager.len(), 10);
    assert_eq!(pager.next_cursor(), cursor);
    assert!(!pager.is_busy());
}
