//! Study room attendance CLI
//!
//! ```sh
//! # Today's dashboard with the default config (~/.config/studyroom/config.toml)
//! studyroom report
//!
//! # Mileage leaderboard filtered by name or student id
//! studyroom leaderboard --search 김민
//!
//! # Kiosk actions
//! studyroom checkin --student-id 20315 --name 김민준
//! studyroom checkout --student-id 20315 --name 김민준
//!
//! # Keep refreshing and print the counters after every refresh
//! studyroom watch
//!
//! # Validate config without doing anything
//! studyroom --check
//! ```

use std::path::PathBuf;

use chrono::{Local, NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use studyroom::application::{BookingRequest, CheckinRequest, DashboardQuery, DashboardView};
use studyroom::domain::{StudyRecord, TeamMember};
use studyroom::runtime::{init_tracing, AppHandle, RuntimeOptions};
use studyroom::AppConfig;

/// Study room attendance: reconciliation, mileage and kiosk check-in.
#[derive(Parser, Debug)]
#[command(
    name = "studyroom",
    version,
    about = "Study room attendance reconciliation and mileage scoring",
    long_about = "Reconciles study room reservations against the check-in/check-out \
                  log and scores mileage points per student.\n\n\
                  Default config: ~/.config/studyroom/config.toml"
)]
struct Cli {
    /// Path to the configuration file (TOML).
    #[arg(short, long, env = "STUDYROOM_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Override the JSON data file.
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Evaluate as of this local time (YYYY-MM-DDTHH:MM:SS) instead of now.
    #[arg(long, global = true, value_parser = parse_instant)]
    at: Option<NaiveDateTime>,

    /// Validate the configuration file and exit.
    #[arg(long)]
    check: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print today's counters and reservation listing.
    Report {
        /// Name or student-id search; lists matching records of every date.
        #[arg(short, long)]
        search: Option<String>,
        /// Restrict the listing to one slot id (lunch, dinner, study1, ...).
        #[arg(long)]
        slot: Option<String>,
        /// Print the dashboard as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Print the mileage leaderboard.
    Leaderboard {
        #[arg(short, long)]
        search: Option<String>,
        /// Show only the first N rows.
        #[arg(long)]
        top: Option<usize>,
        #[arg(long)]
        json: bool,
    },
    /// Refresh periodically and print counters until Ctrl+C.
    Watch,
    /// Record a check-in.
    Checkin {
        #[arg(long)]
        student_id: String,
        #[arg(long)]
        name: String,
    },
    /// Record a check-out.
    Checkout {
        #[arg(long)]
        student_id: String,
        #[arg(long)]
        name: String,
    },
    /// Book a seat for a time slot.
    Book {
        #[arg(long)]
        student_id: String,
        #[arg(long)]
        name: String,
        /// Slot id (lunch, dinner, study1, ...).
        #[arg(long)]
        slot: String,
        #[arg(long)]
        location: String,
        /// Seat number; omit for whole-room locations.
        #[arg(long, default_value = "")]
        seat: String,
        /// Booking date (defaults to today; only today is bookable).
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Team member as STUDENT_ID:NAME; repeatable.
        #[arg(long = "member", value_parser = parse_member)]
        members: Vec<TeamMember>,
    },
    /// Write the effective configuration to the config path.
    InitConfig,
}

fn parse_instant(s: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M"))
        .map_err(|e| format!("expected YYYY-MM-DDTHH:MM[:SS]: {e}"))
}

fn parse_member(s: &str) -> Result<TeamMember, String> {
    let (student_id, name) = s
        .split_once(':')
        .ok_or_else(|| "expected STUDENT_ID:NAME".to_string())?;
    Ok(TeamMember {
        student_id: student_id.trim().to_string(),
        name: name.trim().to_string(),
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // ── Load configuration ─────────────────────────────────────
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(studyroom::default_config_path);

    let (mut config, load_error) = match AppConfig::load(&config_path) {
        Ok(cfg) => (cfg, None),
        Err(e) if cli.check => {
            eprintln!("❌ Invalid configuration in {}: {}", config_path.display(), e);
            std::process::exit(1);
        }
        Err(e) => (AppConfig::default(), Some(e)),
    };

    // ── Apply CLI overrides ────────────────────────────────────
    if let Some(ref level) = cli.log_level {
        config.logging.level = level.clone();
    }
    if let Some(ref data) = cli.data {
        config.source.path = data.clone();
    }

    init_tracing(&config);
    match load_error {
        None => info!("Configuration loaded from {}", config_path.display()),
        Some(e) => {
            error!("Failed to load config from {}: {}", config_path.display(), e);
            error!("Using default configuration.");
        }
    }

    // ── Config validation mode ─────────────────────────────────
    if cli.check {
        config.validate()?;
        println!("✅ Configuration is valid");
        println!("   Config file : {}", config_path.display());
        println!("   Data file   : {}", config.source.path.display());
        println!("   Refresh     : every {}s", config.refresh.interval_secs);
        println!("   Time slots  : {}", config.time_slots.len());
        println!("   Locations   : {}", config.locations.len());
        println!("   Log level   : {}", config.logging.level);
        return Ok(());
    }

    let Some(command) = cli.command else {
        println!("Nothing to do. Try `studyroom --help`.");
        return Ok(());
    };

    if let Command::InitConfig = command {
        config.save(&config_path)?;
        println!("Wrote {}", config_path.display());
        return Ok(());
    }

    let now = cli.at.unwrap_or_else(|| Local::now().naive_local());
    // Only `watch` keeps refreshing; one-shot commands fetch once themselves
    let mut options = RuntimeOptions::new(config);
    if !matches!(command, Command::Watch) {
        options = options.without_background_refresh();
    }
    let handle = AppHandle::start(options)?;

    let result = run(&handle, command, now).await;
    handle.shutdown().await;
    result
}

async fn run(
    handle: &AppHandle,
    command: Command,
    now: NaiveDateTime,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Report { search, slot, json } => {
            if let Some(id) = slot.as_deref() {
                if handle.catalog.find_by_id(id).is_none() {
                    return Err(format!("Unknown time slot: {id}").into());
                }
            }
            refresh(handle).await?;
            let query = DashboardQuery {
                search,
                slot_id: slot,
            };
            let (view, _) = handle.dashboard(&query, now).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                print_stats(&view);
                println!();
                for record in &view.records {
                    print_record(record);
                }
            }
        }
        Command::Leaderboard { search, top, json } => {
            refresh(handle).await?;
            let query = DashboardQuery {
                search,
                slot_id: None,
            };
            let (view, _) = handle.dashboard(&query, now).await;
            let rows = &view.leaderboard[..top.unwrap_or(usize::MAX).min(view.leaderboard.len())];
            if json {
                println!("{}", serde_json::to_string_pretty(rows)?);
            } else {
                for (rank, s) in rows.iter().enumerate() {
                    println!(
                        "{:>3}. {} {:<8} {:>4}점  출석 {:>3}  노쇼 {:>3}  {}",
                        rank + 1,
                        s.student_id,
                        s.name,
                        s.total_mileage,
                        s.attended_count,
                        s.no_show_count,
                        s.study_time_display()
                    );
                }
            }
        }
        Command::Watch => {
            handle.install_signal_handler();
            let shutdown = handle.shutdown_signal();
            let mut updates = handle.updates();
            info!("🚀 Watching. Press Ctrl+C to stop.");

            loop {
                tokio::select! {
                    changed = updates.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let now = Local::now().naive_local();
                        let (view, state) = handle.dashboard(&DashboardQuery::default(), now).await;
                        if let Some(err) = state.last_error {
                            warn!("Showing previous data: {}", err);
                        }
                        print_stats(&view);
                    }
                    _ = shutdown.notified().wait() => break,
                }
            }
        }
        Command::Checkin { student_id, name } => {
            let receipt = handle
                .checkin_service()
                .check_in(&CheckinRequest::new(student_id, name), now)
                .await?;
            println!(
                "✅ {}({}) checked in at {}",
                receipt.name,
                receipt.student_id,
                receipt.timestamp.format("%H:%M")
            );
        }
        Command::Checkout { student_id, name } => {
            let receipt = handle
                .checkin_service()
                .check_out(&CheckinRequest::new(student_id, name), now)
                .await?;
            println!(
                "✅ {}({}) checked out at {}",
                receipt.name,
                receipt.student_id,
                receipt.timestamp.format("%H:%M")
            );
        }
        Command::Book {
            student_id,
            name,
            slot,
            location,
            seat,
            date,
            members,
        } => {
            let request = BookingRequest {
                date: date.unwrap_or_else(|| now.date()),
                student_id,
                name,
                location,
                seat,
                slot_id: slot,
                team_members: members,
            };
            let reservation = handle
                .booking_policy()
                .book(handle.source.as_ref(), &request, now)
                .await?;
            println!(
                "✅ Booked {} {} {} for {} ({})",
                reservation.date, reservation.time_slot, reservation.location, reservation.name,
                reservation.reservation_id
            );
        }
        Command::InitConfig => {}
    }
    Ok(())
}

/// One fetch for one-shot commands. Nothing loaded at all is an error;
/// a failed refresh over earlier data is only a notice.
async fn refresh(handle: &AppHandle) -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = handle.refresher.refresh_once().await {
        if !handle.refresher.state().await.is_loaded() {
            return Err(e.into());
        }
        warn!("Could not refresh data, showing previous snapshot: {}", e);
    }
    Ok(())
}

fn print_stats(view: &DashboardView) {
    let s = &view.stats;
    println!(
        "오늘 예약 {}  |  학습 중 {}  |  오늘 노쇼 {}  |  출석 기록 {}",
        s.today_reservations, s.studying_now, s.today_no_shows, s.total_attendance_events
    );
}

fn print_record(record: &StudyRecord) {
    let r = &record.reservation;
    let time = |t: Option<NaiveDateTime>| {
        t.map(|t| t.format("%H:%M").to_string())
            .unwrap_or_else(|| "-".to_string())
    };
    let duration = record
        .study_duration_minutes
        .map(|m| format!("{m}분"))
        .unwrap_or_else(|| "-".to_string());
    let seat = if r.seat.is_empty() {
        String::new()
    } else {
        format!(" {}번", r.seat)
    };

    println!(
        "{} {:<8} {}{} {} {:<8} {:<11} {}~{} {:>6} {}점",
        r.date,
        r.time_slot,
        r.location,
        seat,
        r.student_id,
        r.name,
        record.status,
        time(record.checkin_time),
        time(record.checkout_time),
        duration,
        record.mileage_points
    );
    if let Some(team) = r.team_members_display() {
        println!("           팀원: {}", team);
    }
}
