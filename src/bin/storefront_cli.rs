//!
//! storefront shell
//! ----------------
//! Interactive terminal client for the shop API. Drives the same session store,
//! route guard and paginated listings as any other front end would.

use anyhow::{Context, Result};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::env;

use storefront::cli::{Reply, Shell, HELP};
use storefront::config::{flag_value, has_flag, ClientConfig, ENV_API_URL};

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} [--connect <url>] [--email <e> --password <p>] [-c <command>]\n\nFlags:\n  --connect <url>      API base URL (env: {ENV_API_URL}, default http://127.0.0.1:8000/api)\n  --email, --password  log in before running commands\n  -c <command>         run one command and exit\n  -h, --help           show this help\n\nCommands:\n{HELP}"
    );
}

fn print_reply(shell: &Shell, reply: &Reply) {
    if !reply.text.is_empty() {
        println!("{}", reply.text);
    }
    for notice in shell.notifier().drain() {
        eprintln!("{}", notice);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();

    let args: Vec<String> = env::args().collect();
    let program = args.first().cloned().unwrap_or_else(|| "storefront_cli".to_string());
    if has_flag(&args, "--help") || has_flag(&args, "-h") {
        print_usage(&program);
        return Ok(());
    }

    let mut config = ClientConfig::from_env();
    if let Some(url) = flag_value(&args, "--connect") {
        config = config.with_base_url(url);
    }
    let shell = Shell::new(config).context("cannot build API client")?;

    let reply = shell.start().await;
    print_reply(&shell, &reply);

    match (flag_value(&args, "--email"), flag_value(&args, "--password")) {
        (Some(email), Some(password)) => {
            let reply = shell.execute(&format!("login {} {}", email, password)).await?;
            print_reply(&shell, &reply);
        }
        (Some(_), None) | (None, Some(_)) => eprintln!("--email and --password must be given together"),
        (None, None) => {}
    }

    if let Some(cmd) = flag_value(&args, "-c") {
        let reply = shell.execute(&cmd).await?;
        print_reply(&shell, &reply);
        return Ok(());
    }

    let mut rl = DefaultEditor::new()?;
    println!("storefront shell. Type 'help' for commands.");
    loop {
        let prompt = format!("{}> ", shell.location());
        let line = match rl.readline(&prompt) {
            Ok(l) => l,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(line);
        match shell.execute(line).await {
            Ok(reply) => {
                print_reply(&shell, &reply);
                if reply.quit {
                    break;
                }
            }
            Err(e) => eprintln!("error: {}", e),
        }
    }
    Ok(())
}
