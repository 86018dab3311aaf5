//! Warden CLI
//!
//! Command-line front end for the monitoring console:
//! - Sign in and out
//! - List, acknowledge and resolve alarms
//! - Watch the real-time alarm channel
//! - Look up devices and dictionaries, download files

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use warden::api::auth::LoginForm;
use warden::api::devices::DeviceQuery;
use warden::config::generate_default_config;
use warden::{
    AlarmEvent, AlarmFilter, ChannelEvent, Config, Console, EventKind, LoggingConfig, Severity,
};

#[derive(Parser)]
#[command(name = "warden")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Command-line client for the IoT monitoring console")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: ~/.config/warden/config.toml or ./warden.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Table, global = true)]
    format: Format,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and store the tokens
    Login {
        #[arg(short, long)]
        username: String,
        /// Read from stdin when omitted
        #[arg(short, long)]
        password: Option<String>,
        #[arg(long, default_value = "")]
        captcha_key: String,
        #[arg(long, default_value = "")]
        captcha_code: String,
    },

    /// Sign out and clear stored credentials
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Fetch a login captcha
    Captcha,

    /// Alarm monitoring
    Alarms {
        #[command(subcommand)]
        command: AlarmCommands,
    },

    /// Device registry
    Devices {
        #[command(subcommand)]
        command: DeviceCommands,
    },

    /// Show the items of a dictionary
    Dict {
        /// Dictionary code, e.g. `gender`
        code: String,
    },

    /// Download a file
    Download {
        /// File path or URL under the API base
        path: String,
        /// Target directory
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },

    /// Configuration helpers
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum AlarmCommands {
    /// List active alarms
    List {
        #[arg(long)]
        dept: Option<String>,
        #[arg(short, long)]
        limit: Option<u32>,
        /// Only these severities (critical, high, medium, low)
        #[arg(short, long, value_delimiter = ',')]
        severity: Vec<String>,
    },

    /// Show the dashboard summary
    Dashboard {
        #[arg(long)]
        dept: Option<String>,
    },

    /// Acknowledge alarms
    Ack {
        #[arg(required = true)]
        ids: Vec<String>,
        #[arg(short, long)]
        note: Option<String>,
    },

    /// Resolve alarms
    Resolve {
        #[arg(required = true)]
        ids: Vec<String>,
        #[arg(short, long)]
        note: Option<String>,
    },

    /// Print live alarm events until Ctrl-C
    Watch,
}

#[derive(Subcommand)]
enum DeviceCommands {
    /// List devices
    List {
        #[arg(short, long)]
        keywords: Option<String>,
        #[arg(long)]
        dept: Option<i64>,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Write a commented default config file
    Init {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::Config {
        command: ConfigCommands::Init { output },
    } = &cli.command
    {
        return write_default_config(output.as_deref());
    }

    let config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    init_logging(&config.logging);

    let console = Console::open(config)?;
    run(cli.command, cli.format, &console).await
}

fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("warden={}", logging.level).into());
    let registry = tracing_subscriber::registry().with(filter);

    // Logs go to stderr so command output stays parseable
    if logging.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn run(command: Commands, format: Format, console: &Console) -> anyhow::Result<()> {
    let client = console.client();

    match command {
        Commands::Login {
            username,
            password,
            captcha_key,
            captcha_code,
        } => {
            let password = match password {
                Some(p) => p,
                None => read_password()?,
            };
            let form = LoginForm {
                username,
                password,
                captcha_key,
                captcha_code,
                remember_me: true,
            };
            let result = client.auth().login(&form).await?;
            match format {
                Format::Json => print_json(&result)?,
                Format::Table => println!("Signed in ({} token)", result.token_type),
            }
        }

        Commands::Logout => {
            client.auth().logout().await?;
            println!("Signed out");
        }

        Commands::Whoami => {
            let me = client.users().me().await?;
            match format {
                Format::Json => print_json(&me)?,
                Format::Table => {
                    println!("User:     {}", me.username.as_deref().unwrap_or("-"));
                    println!("Nickname: {}", me.nickname.as_deref().unwrap_or("-"));
                    println!("Roles:    {}", me.roles.join(", "));
                    println!("Perms:    {}", me.perms.len());
                }
            }
        }

        Commands::Captcha => {
            let captcha = client.auth().captcha().await?;
            println!("Key:   {}", captcha.captcha_key);
            println!("Image: {}", captcha.captcha_base64);
        }

        Commands::Alarms { command } => run_alarms(command, format, console).await?,

        Commands::Devices {
            command: DeviceCommands::List { keywords, dept },
        } => {
            let query = DeviceQuery {
                keywords,
                dept_id: dept,
                ..Default::default()
            };
            let devices = client.devices().list(&query).await?;
            match format {
                Format::Json => print_json(&devices)?,
                Format::Table => {
                    if devices.is_empty() {
                        println!("No devices found.");
                    } else {
                        println!("{:<20} {:<30} {:<10} {}", "ID", "Name", "Status", "Location");
                        println!("{}", "-".repeat(80));
                        for d in &devices {
                            println!(
                                "{:<20} {:<30} {:<10} {}",
                                d.device_id,
                                d.device_name,
                                d.status.as_deref().unwrap_or("-"),
                                d.location.as_deref().unwrap_or("-")
                            );
                        }
                    }
                }
            }
        }

        Commands::Dict { code } => {
            let items = console.dicts().load(&code).await?;
            match format {
                Format::Json => print_json(&items)?,
                Format::Table => {
                    println!("{:<12} {}", "Value", "Label");
                    println!("{}", "-".repeat(40));
                    for item in &items {
                        let value = match &item.value {
                            serde_json::Value::String(s) => s.clone(),
                            other => other.to_string(),
                        };
                        println!("{:<12} {}", value, item.label);
                    }
                }
            }
        }

        Commands::Download { path, out } => {
            let file = client.files().download(&path).await?;
            let saved = file
                .save(&out, None)
                .with_context(|| format!("Failed to save download into {:?}", out))?;
            println!("Saved {} bytes to {}", file.len(), saved.display());
        }

        Commands::Config {
            command: ConfigCommands::Init { output },
        } => write_default_config(output.as_deref())?,
    }

    Ok(())
}

async fn run_alarms(command: AlarmCommands, format: Format, console: &Console) -> anyhow::Result<()> {
    let board = console.alarm_board();

    match command {
        AlarmCommands::List {
            dept,
            limit,
            severity,
        } => {
            let severities = severity
                .iter()
                .map(|s| parse_severity(s))
                .collect::<anyhow::Result<Vec<_>>>()?;

            board.load_active(dept.as_deref(), limit).await?;
            board.set_filter(AlarmFilter {
                severities,
                ..Default::default()
            });
            let alarms = board.filtered();

            match format {
                Format::Json => print_json(&alarms)?,
                Format::Table => {
                    print_alarm_table(&alarms);
                    let summary = board.summary();
                    println!();
                    println!(
                        "{} active: {} critical, {} high, {} medium, {} low ({} acknowledged)",
                        summary.total,
                        summary.critical,
                        summary.high,
                        summary.medium,
                        summary.low,
                        summary.acknowledged
                    );
                }
            }
        }

        AlarmCommands::Dashboard { dept } => {
            let dashboard = board.load_dashboard(dept.as_deref()).await?;
            match format {
                Format::Json => print_json(&dashboard)?,
                Format::Table => {
                    println!("Active alarms:   {}", dashboard.total_active_alarms);
                    println!(
                        "  critical {} / high {} / medium {} / low {}",
                        dashboard.critical_alarms,
                        dashboard.high_alarms,
                        dashboard.medium_alarms,
                        dashboard.low_alarms
                    );
                    println!("Raised today:    {}", dashboard.total_alarms_today);
                    println!("Resolved today:  {}", dashboard.resolved_alarms_today);
                    if let Some(avg) = &dashboard.avg_resolution_time {
                        println!("Avg resolution:  {}", avg);
                    }
                    if !dashboard.top_affected_devices.is_empty() {
                        println!();
                        println!("Most affected devices:");
                        for device in &dashboard.top_affected_devices {
                            println!(
                                "  {:<20} {:>5}  {}",
                                device.device_id,
                                device.alarm_count,
                                device.device_name.as_deref().unwrap_or("")
                            );
                        }
                    }
                }
            }
        }

        AlarmCommands::Ack { ids, note } => {
            board.acknowledge_many(&ids, note.as_deref()).await?;
            println!("Acknowledged {} alarm(s)", ids.len());
        }

        AlarmCommands::Resolve { ids, note } => {
            board.resolve_many(&ids, note.as_deref()).await?;
            println!("Resolved {} alarm(s)", ids.len());
        }

        AlarmCommands::Watch => watch(format, console).await?,
    }

    Ok(())
}

/// Stream channel events to stdout until Ctrl-C or until the channel gives up
async fn watch(format: Format, console: &Console) -> anyhow::Result<()> {
    if !console.session().is_logged_in() {
        bail!("Not signed in; run `warden login` first");
    }

    let channel = console.alarm_channel();
    let (tx, mut rx) = mpsc::unbounded_channel::<ChannelEvent>();

    let kinds = [
        EventKind::Connected,
        EventKind::Disconnected,
        EventKind::Error,
        EventKind::AlarmTriggered,
        EventKind::AlarmUpdated,
        EventKind::AlarmResolved,
        EventKind::GaveUp,
    ];
    let subscriptions: Vec<_> = kinds
        .into_iter()
        .map(|kind| {
            let tx = tx.clone();
            channel.subscribe(kind, move |event| {
                let _ = tx.send(event.clone());
            })
        })
        .collect();
    drop(tx);

    console.attach_board();
    println!("Watching {} (Ctrl-C to stop)", channel.url());
    channel.connect();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = rx.recv() => match event {
                Some(event) => {
                    print_event(&event, format)?;
                    if matches!(event, ChannelEvent::GaveUp { .. }) {
                        break;
                    }
                }
                None => break,
            },
        }
    }

    channel.disconnect();
    for subscription in subscriptions {
        channel.unsubscribe(subscription);
    }
    Ok(())
}

fn print_event(event: &ChannelEvent, format: Format) -> anyhow::Result<()> {
    let now = chrono::Local::now().format("%H:%M:%S");

    if format == Format::Json {
        let line = match event {
            ChannelEvent::AlarmTriggered(data) => serde_json::json!({ "type": "ALARM_TRIGGERED", "data": data }),
            ChannelEvent::AlarmUpdated(data) => serde_json::json!({ "type": "ALARM_UPDATED", "data": data }),
            ChannelEvent::AlarmResolved(data) => serde_json::json!({ "type": "ALARM_RESOLVED", "data": data }),
            other => serde_json::json!({ "type": format!("{:?}", other.kind()), "detail": format!("{:?}", other) }),
        };
        println!("{}", serde_json::to_string(&line)?);
        return Ok(());
    }

    match event {
        ChannelEvent::Connected => println!("[{}] connected", now),
        ChannelEvent::Disconnected { code, reason } => {
            println!("[{}] disconnected ({:?}) {}", now, code, reason)
        }
        ChannelEvent::Error { message } => println!("[{}] error: {}", now, message),
        ChannelEvent::AlarmTriggered(data) => println!("[{}] TRIGGERED {}", now, data),
        ChannelEvent::AlarmUpdated(data) => println!("[{}] UPDATED   {}", now, data),
        ChannelEvent::AlarmResolved(data) => println!("[{}] RESOLVED  {}", now, data),
        ChannelEvent::GaveUp { attempts } => {
            println!("[{}] gave up after {} reconnect attempts", now, attempts)
        }
        ChannelEvent::Message(_) => {}
    }
    Ok(())
}

fn print_alarm_table(alarms: &[AlarmEvent]) {
    if alarms.is_empty() {
        println!("No active alarms.");
        return;
    }

    println!(
        "{:<12} {:<9} {:<13} {:<20} {:<20} {}",
        "ID", "Severity", "Status", "Device", "Created", "Message"
    );
    println!("{}", "-".repeat(100));
    for alarm in alarms {
        println!(
            "{:<12} {:<9} {:<13} {:<20} {:<20} {}",
            alarm.id,
            alarm.severity,
            alarm.status.as_str(),
            alarm
                .device_name
                .as_deref()
                .or(alarm.device_id.as_deref())
                .unwrap_or("-"),
            alarm.created_at.as_deref().unwrap_or("-"),
            alarm.message.as_deref().unwrap_or("")
        );
    }
}

fn parse_severity(raw: &str) -> anyhow::Result<Severity> {
    serde_json::from_value(serde_json::Value::String(raw.trim().to_uppercase()))
        .with_context(|| format!("Unknown severity: {}", raw))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_password() -> anyhow::Result<String> {
    eprint!("Password: ");
    std::io::stderr().flush()?;

    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        bail!("Empty password");
    }
    Ok(password)
}

fn write_default_config(output: Option<&std::path::Path>) -> anyhow::Result<()> {
    let content = generate_default_config();
    match output {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write config to {:?}", path))?;
            println!("Config written to {}", path.display());
        }
        None => print!("{}", content),
    }
    Ok(())
}
