//!
//! prolens CLI binary
//! ------------------
//! Drives the session layer from a terminal: sign in and out, inspect the
//! stored session, list and change cameras, rentals and users, reset a
//! password, sit in `watch` mode reacting to role changes, or check how an
//! activation-page link would be rewritten.

use std::env;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde_json::Value;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use prolens::api::{self, CameraForm, ImageUpload, PasswordReset, RegisterRequest, RentalAction};
use prolens::cli::{print_table, ConsoleFrontend};
use prolens::identity::{FileStore, SessionGuard};
use prolens::links::{self, Element};
use prolens::roles::{RoleBus, RoleWatcher};
use prolens::{AuthClient, ClientConfig, Outcome};

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} [-v] <command> [args]\n\nCommands:\n  login <username> <password>            sign in and store the session\n  logout                                 end the session\n  whoami                                 show the stored session\n  register <first> <last> <user> <email> <password>\n  dashboard                              role-specific statistics\n  cameras [list]\n  cameras add <brand> <model> <price> [--image <path>]\n  cameras update <id> <brand> <model> <price> [--image <path>]\n  cameras delete <id>\n  rentals [all|employee|mine]\n  rentals create <json>\n  rentals extend <id> <days>\n  rentals <approve|decline|cancel|handle-camera|return|complete> <id>\n  users [list]\n  users add <json> | users update <id> <json> | users delete <id>\n  forgot                                 interactive password reset\n  watch                                  follow role changes until Ctrl-C; tabs\n                                         in other processes catch up by polling\n  links <href> <text>                    rewrite an activation-page link\n  links --button <text> [<onclick>]      rewrite an activation-page button\n\nFlags:\n  -v, --verbose            print full error reports\n  -h, --help               show this help\n\nEnvironment:\n  PROLENS_API_BASE, PROLENS_POLL_SECS, PROLENS_TIMEOUT_SECS, PROLENS_STORE,\n  PROLENS_FRONTEND_HOST, PROLENS_OUTPUT=json, RUST_LOG"
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("warn"))
        .context("invalid RUST_LOG filter")?;
    let _ = fmt().with_env_filter(filter).with_writer(io::stderr).try_init();

    let mut args: Vec<String> = env::args().collect();
    let program = args.remove(0);
    let mut verbose = false;
    args.retain(|a| match a.as_str() {
        "-v" | "--verbose" => {
            verbose = true;
            false
        }
        _ => true,
    });
    if args.is_empty() || matches!(args[0].as_str(), "-h" | "--help" | "help") {
        print_usage(&program);
        return Ok(());
    }

    let config = ClientConfig::from_env().context("reading configuration")?;
    info!(target: "prolens", "api base {}, credentials at {}", config.api_base, config.store_path.display());
    let store = Arc::new(FileStore::new(&config.store_path));
    let frontend = Arc::new(ConsoleFrontend::new(verbose));
    let client = Arc::new(
        AuthClient::from_config(&config, store.clone(), frontend.clone()).context("building HTTP client")?,
    );

    let command = args.remove(0);
    let rest: Vec<&str> = args.iter().map(String::as_str).collect();
    match command.as_str() {
        "login" => {
            let [user, password] = rest[..] else { bail!("usage: login <username> <password>") };
            let cred = api::auth::login(&client, user, password).await?;
            println!("signed in, role: {}", cred.role.map(|r| r.to_string()).unwrap_or_else(|| "-".into()));
        }
        "logout" => api::auth::logout(&client).await?,
        "whoami" => {
            let guard = SessionGuard::new(store.clone(), frontend.clone());
            if let Some(cred) = guard.require_auth().await {
                println!("role: {}", cred.role.map(|r| r.to_string()).unwrap_or_else(|| "-".into()));
                println!("{}", serde_json::to_string_pretty(&cred.profile)?);
            }
        }
        "register" => {
            let [firstname, lastname, username, email, password] = rest[..] else {
                bail!("usage: register <first> <last> <username> <email> <password>")
            };
            let req = RegisterRequest {
                firstname: firstname.into(),
                lastname: lastname.into(),
                username: username.into(),
                email: email.into(),
                password: password.into(),
            };
            api::auth::register(&client, &req).await?;
        }
        "dashboard" => {
            require_session(&store, &frontend).await?;
            show(api::dashboard::stats(&client).await)?;
        }
        "cameras" => {
            require_session(&store, &frontend).await?;
            cameras(&client, &rest).await?;
        }
        "rentals" => {
            require_session(&store, &frontend).await?;
            rentals(&client, &rest).await?;
        }
        "users" => {
            require_session(&store, &frontend).await?;
            users(&client, &rest).await?;
        }
        "forgot" => forgot(&client).await?,
        "watch" => {
            require_session(&store, &frontend).await?;
            let watcher = Arc::new(RoleWatcher::new(client.clone(), RoleBus::new()).with_interval(config.poll_interval));
            eprintln!("watching role changes every {}s, Ctrl-C to stop", watcher.interval().as_secs());
            let mut handle = watcher.spawn();
            let interrupted = tokio::select! {
                r = tokio::signal::ctrl_c() => {
                    r.context("waiting for Ctrl-C")?;
                    true
                }
                _ = handle.finished() => false,
            };
            if interrupted {
                handle.stop().await;
            }
        }
        "links" => {
            let element = match rest[..] {
                ["--button", text] => Element::Button { text, onclick: None },
                ["--button", text, onclick] => Element::Button { text, onclick: Some(onclick) },
                [href, text] => Element::Link { href, text },
                _ => bail!("usage: links <href> <text> | links --button <text> [<onclick>]"),
            };
            match links::redirect(&config.frontend_host, element) {
                Some(target) => println!("{}", target),
                None => println!("unchanged"),
            }
        }
        other => {
            eprintln!("unknown command: {}", other);
            print_usage(&program);
            std::process::exit(2);
        }
    }
    Ok(())
}

async fn require_session(store: &Arc<FileStore>, frontend: &Arc<ConsoleFrontend>) -> Result<()> {
    let guard = SessionGuard::new(store.clone(), frontend.clone());
    match guard.require_auth().await {
        Some(_) => Ok(()),
        None => bail!("not signed in"),
    }
}

/// Print a response; lists render as tables, everything else as JSON.
fn show(result: prolens::ApiResult<Outcome<Value>>) -> Result<()> {
    match result? {
        Outcome::Data(v) => {
            if !print_table(&v) {
                println!("{}", serde_json::to_string_pretty(&v)?);
            }
            Ok(())
        }
        Outcome::Handled => bail!("session expired"),
    }
}

fn parse_id(s: &str) -> Result<u64> { s.parse::<u64>().with_context(|| format!("invalid id '{}'", s)) }

fn parse_json(s: &str) -> Result<Value> { serde_json::from_str(s).with_context(|| format!("invalid JSON '{}'", s)) }

/// Splits off a trailing `--image <path>` pair.
async fn camera_form(args: &[&str]) -> Result<CameraForm> {
    let (fields, image) = match args.iter().position(|a| *a == "--image") {
        Some(i) => {
            let path = args.get(i + 1).context("--image requires a path")?;
            let img = ImageUpload::from_path(Path::new(*path)).await?;
            (&args[..i], Some(img))
        }
        None => (args, None),
    };
    let [brand, model, price] = fields[..] else { bail!("expected <brand> <model> <price>") };
    Ok(CameraForm { brand: brand.into(), model: model.into(), rental_price: price.into(), image })
}

async fn cameras(client: &AuthClient, rest: &[&str]) -> Result<()> {
    match rest {
        [] | ["list"] => show(api::cameras::list(client).await),
        ["add", args @ ..] => show(api::cameras::add(client, camera_form(args).await?).await),
        ["update", id, args @ ..] => show(api::cameras::update(client, parse_id(id)?, camera_form(args).await?).await),
        ["delete", id] => show(api::cameras::delete(client, parse_id(id)?).await),
        _ => bail!("unknown cameras command; see --help"),
    }
}

async fn rentals(client: &AuthClient, rest: &[&str]) -> Result<()> {
    match rest {
        [] | ["all"] => show(api::rentals::list_all(client).await),
        ["employee"] => show(api::rentals::list_employee(client).await),
        ["mine"] => show(api::rentals::list_mine(client).await),
        ["create", body] => show(api::rentals::create(client, parse_json(body)?).await),
        ["extend", id, days] => {
            let days = days.parse::<u32>().with_context(|| format!("invalid day count '{}'", days))?;
            show(api::rentals::extend(client, parse_id(id)?, days).await)
        }
        [action, id] => {
            let action = RentalAction::parse(action).with_context(|| format!("unknown rental action '{}'", action))?;
            show(api::rentals::act(client, parse_id(id)?, action).await)
        }
        _ => bail!("unknown rentals command; see --help"),
    }
}

async fn users(client: &AuthClient, rest: &[&str]) -> Result<()> {
    match rest {
        [] | ["list"] => show(api::users::list(client).await),
        ["add", body] => show(api::users::add(client, parse_json(body)?).await),
        ["update", id, body] => show(api::users::update(client, parse_id(id)?, parse_json(body)?).await),
        ["delete", id] => show(api::users::delete(client, parse_id(id)?).await),
        _ => bail!("unknown users command; see --help"),
    }
}

fn prompt(label: &str) -> Result<String> {
    eprint!("{}: ", label);
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line).context("reading stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Walks the three reset steps, re-prompting a step until it succeeds.
async fn forgot(client: &AuthClient) -> Result<()> {
    let mut flow = PasswordReset::new(client);
    loop {
        match flow.send_otp(&prompt("email")?).await {
            Ok(msg) => { eprintln!("{}", msg); break; }
            Err(e) => eprintln!("{}", e.user_message()),
        }
    }
    loop {
        match flow.verify_otp(&prompt("OTP")?).await {
            Ok(msg) => { eprintln!("{}", msg); break; }
            Err(e) => eprintln!("{}", e.user_message()),
        }
    }
    loop {
        let password = prompt("new password")?;
        let confirm = prompt("confirm password")?;
        match flow.reset(&password, &confirm).await {
            Ok(msg) => { eprintln!("{}", msg); return Ok(()); }
            Err(e) => eprintln!("{}", e.user_message()),
        }
    }
}
