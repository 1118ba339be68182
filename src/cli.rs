use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

use lectern::config::AppConfig;
use lectern::types::push::{NotificationMessage, VapidConfig};

const DEFAULT_NOTIFICATION_TITLE: &str = "New lecture available";
const DEFAULT_NOTIFICATION_BODY: &str = "Fresh content was just published.";
const DEFAULT_NOTIFICATION_ICON: &str = "/favicon.png";
const DEFAULT_NOTIFICATION_URL: &str = "/";

#[allow(clippy::large_enum_variant)]
pub(crate) enum RunOutcome {
    Serve(SocketAddr, AppConfig),
    Exit(i32),
}

pub(crate) fn run() -> RunOutcome {
    let cli = Cli::parse();
    if let Some(Command::Init(args)) = cli.command {
        let code = run_init(args);
        return RunOutcome::Exit(code);
    }

    let store_path = match cli.store.as_ref() {
        Some(store) => store.clone(),
        None => {
            eprintln!("error: --store is required unless using a subcommand");
            return RunOutcome::Exit(2);
        }
    };

    let vapid = match resolve_vapid_config(&cli) {
        Ok(vapid) => vapid,
        Err(err) => {
            eprintln!("error: {err}");
            return RunOutcome::Exit(2);
        }
    };

    RunOutcome::Serve(
        cli.listen,
        AppConfig {
            store_path,
            app_name: cli.app_name,
            vapid,
            default_notification: NotificationMessage {
                title: cli.default_title,
                body: cli.default_body,
                icon: cli.default_icon,
                url: cli.default_url,
            },
        },
    )
}

#[derive(Parser, Debug)]
#[command(
    name = "lectern",
    version,
    about = "Web push notification service for a lecture PWA"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
    /// Path of the subscription store file. Created on first subscribe.
    #[arg(long)]
    store: Option<PathBuf>,
    #[arg(long, default_value = "127.0.0.1:3000")]
    listen: SocketAddr,
    #[arg(long, default_value = "Lectern")]
    app_name: String,
    #[arg(long, env = "LECTERN_VAPID_PRIVATE_KEY")]
    vapid_private_key: Option<String>,
    #[arg(long, env = "LECTERN_VAPID_PUBLIC_KEY")]
    vapid_public_key: Option<String>,
    #[arg(long, env = "LECTERN_VAPID_SUBJECT")]
    vapid_subject: Option<String>,
    #[arg(long, default_value = DEFAULT_NOTIFICATION_TITLE)]
    default_title: String,
    #[arg(long, default_value = DEFAULT_NOTIFICATION_BODY)]
    default_body: String,
    #[arg(long, default_value = DEFAULT_NOTIFICATION_ICON)]
    default_icon: String,
    #[arg(long, default_value = DEFAULT_NOTIFICATION_URL)]
    default_url: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a fresh VAPID key pair and print it as configuration.
    Init(InitArgs),
}

#[derive(Args, Debug)]
struct InitArgs {
    #[arg(long)]
    subject: Option<String>,
}

fn run_init(args: InitArgs) -> i32 {
    let credentials = match lectern::generate_vapid_credentials() {
        Ok(credentials) => credentials,
        Err(err) => {
            eprintln!("failed to generate VAPID credentials: {err}");
            return 1;
        }
    };
    let (subject, show_subject_note) = match args.subject {
        Some(subject) => (subject, false),
        None => ("mailto:you@example.com".to_string(), true),
    };

    println!("VAPID credentials generated.");
    println!();
    println!("LECTERN_VAPID_PRIVATE_KEY=\"{}\"", credentials.private_key);
    println!("LECTERN_VAPID_PUBLIC_KEY=\"{}\"", credentials.public_key);
    println!("LECTERN_VAPID_SUBJECT=\"{subject}\"");
    if show_subject_note {
        println!();
        println!("Note: replace LECTERN_VAPID_SUBJECT with a contact URI you control.");
    }
    println!();
    println!(
        "--vapid-private-key \"{}\" --vapid-public-key \"{}\" --vapid-subject \"{subject}\"",
        credentials.private_key, credentials.public_key
    );
    0
}

fn resolve_vapid_config(cli: &Cli) -> Result<Option<VapidConfig>, String> {
    let has_any = cli.vapid_private_key.is_some()
        || cli.vapid_public_key.is_some()
        || cli.vapid_subject.is_some();

    if !has_any {
        return Ok(None);
    }

    let private_key = cli
        .vapid_private_key
        .as_deref()
        .ok_or("VAPID is configured but --vapid-private-key is missing")?
        .trim();
    let public_key = cli
        .vapid_public_key
        .as_deref()
        .ok_or("VAPID is configured but --vapid-public-key is missing")?
        .trim();
    let subject = cli
        .vapid_subject
        .as_deref()
        .ok_or("VAPID is configured but --vapid-subject is missing")?
        .trim();
    if private_key.is_empty() || public_key.is_empty() || subject.is_empty() {
        return Err("VAPID options cannot be empty".to_string());
    }

    Ok(Some(VapidConfig {
        private_key: private_key.to_string(),
        public_key: public_key.to_string(),
        subject: subject.to_string(),
    }))
}
