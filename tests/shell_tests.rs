use storefront::cli::{CommandError, Shell};
use storefront::config::ClientConfig;
use storefront::mock::{MockServer, SEED_PASSWORD};

fn notices(shell: &Shell) -> Vec<String> {
    shell.notifier().drain().into_iter().map(|n| n.text).collect()
}

#[tokio::test]
async fn shell_walks_a_buyer_session() {
    let server = MockServer::start().await.unwrap();
    let shell = Shell::new(ClientConfig::new(server.api_url())).unwrap();
    let start = shell.start().await;
    assert_eq!(shell.location(), "/auth");
    assert!(start.text.contains("login <email> <password>"));

    let err = shell.execute("add 101").await.unwrap_err();
    assert!(matches!(err, CommandError::WrongScreen { command: "add", .. }));

    let reply = shell.execute(&format!("login buyer@shop.test {}", SEED_PASSWORD)).await.unwrap();
    assert_eq!(shell.location(), "/buyer");
    assert!(reply.text.contains("Product 01"));
    assert!(reply.text.contains("more available"));
    assert!(notices(&shell).contains(&"Login successfully".to_string()));

    let reply = shell.execute("add 101").await.unwrap();
    assert!(reply.text.contains("total: 1 item(s)"));
    assert!(notices(&shell).contains(&"Product 01 added to cart!".to_string()));

    let reply = shell.execute("go /admin").await.unwrap();
    assert_eq!(shell.location(), "/buyer");
    assert!(reply.text.contains("redirected from /admin"));

    let menu = shell.execute("menu").await.unwrap();
    assert!(menu.text.contains("/my-orders"));
    assert!(!menu.text.contains("/cs1"));

    shell.execute("checkout").await.unwrap();
    assert_eq!(shell.location(), "/my-orders");

    shell.execute("logout").await.unwrap();
    assert_eq!(shell.location(), "/auth");
    assert!(notices(&shell).contains(&"Logout successfully".to_string()));
    assert_eq!(shell.execute("whoami").await.unwrap().text, "not logged in");
}

#[tokio::test]
async fn wrong_password_reports_and_stays_on_login() {
    let server = MockServer::start().await.unwrap();
    let shell = Shell::new(ClientConfig::new(server.api_url())).unwrap();
    shell.start().await;
    notices(&shell);

    shell.execute("login cs1@shop.test nope").await.unwrap();
    assert_eq!(shell.location(), "/auth");
    assert_eq!(notices(&shell), vec!["Invalid email or password".to_string()]);
}

#[tokio::test]
async fn quit_stops_the_loop() {
    let server = MockServer::start().await.unwrap();
    let shell = Shell::new(ClientConfig::new(server.api_url())).unwrap();
    assert!(shell.execute("quit").await.unwrap().quit);
    assert!(!shell.execute("help").await.unwrap().quit);
}
