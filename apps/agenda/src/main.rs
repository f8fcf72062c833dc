use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{Local, NaiveDate};
use dotenv::dotenv;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agenda_cell::models::{Appointment, Shift, SubmissionError, TimeSlot};
use agenda_cell::services::appointments::AppointmentService;
use agenda_cell::services::availability::AvailabilityService;
use agenda_cell::services::booking::BookingService;
use agenda_cell::services::session::BookingSession;
use shared_api::ApiClient;
use shared_config::AppConfig;

#[tokio::main]
async fn main() -> Result<()> {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env();
    if !config.is_configured() {
        bail!("AGENDA_API_URL is not set");
    }
    let api = Arc::new(ApiClient::new(&config));
    info!("Agenda client configured for {}", api.get_base_url());

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("free-hours") => free_hours(&api, &args[1..]).await,
        Some("book") => book(&api, &args[1..]).await,
        Some("reschedule") => reschedule(&api, &args[1..]).await,
        Some("cancel") => change_status(&api, &args[1..], "cancel").await,
        Some("finalize") => change_status(&api, &args[1..], "finalize").await,
        Some("no-show") => change_status(&api, &args[1..], "no-show").await,
        Some("show") => show(&api, &args[1..]).await,
        Some("list") => list(&api, &args[1..]).await,
        _ => {
            print_usage();
            Ok(())
        }
    }
}

fn print_usage() {
    println!("Usage: agenda <command> [args]");
    println!();
    println!("Commands:");
    println!("  free-hours <specialist-id> <date>");
    println!("  book <patient-id> <specialist-id> <specialty-id> <date> <start-hour> [hours]");
    println!("  reschedule <appointment-id> <date> <start-hour> [hours]");
    println!("  cancel | finalize | no-show <appointment-id>");
    println!("  show <appointment-id>");
    println!("  list <specialty-id> [page] [size]");
    println!();
    println!("Dates are YYYY-MM-DD, start hours are HH:00 within 08:00-17:00.");
}

async fn free_hours(api: &Arc<ApiClient>, args: &[String]) -> Result<()> {
    let specialist_id = parse_id(args.first(), "specialist-id")?;
    let date = parse_date(args.get(1))?;

    let availability = AvailabilityService::new(Arc::clone(api));
    let free = availability.fetch_free_slots(specialist_id, date).await?;

    if free.is_empty() {
        println!("No free hours for specialist {} on {}", specialist_id, date);
        return Ok(());
    }

    println!("Free hours for specialist {} on {}:", specialist_id, date);
    for shift in [Shift::Morning, Shift::Afternoon] {
        let hours: Vec<String> = free
            .iter()
            .filter(|slot| slot.shift() == shift)
            .map(|slot| slot.to_string())
            .collect();
        if !hours.is_empty() {
            println!("  {}: {}", shift, hours.join("  "));
        }
    }
    Ok(())
}

async fn book(api: &Arc<ApiClient>, args: &[String]) -> Result<()> {
    let patient_id = parse_id(args.first(), "patient-id")?;
    let specialist_id = parse_id(args.get(1), "specialist-id")?;
    let specialty_id = parse_id(args.get(2), "specialty-id")?;
    let date = parse_date(args.get(3))?;
    let start = parse_start_hour(args.get(4))?;
    let hours = parse_hours(args.get(5))?;

    let mut session = BookingSession::new();
    session.choose_specialist(specialist_id);
    let selection = drive_session(api, &mut session, date, start, hours).await?;

    let booking = BookingService::new(Arc::clone(api));
    match booking.book(&selection, patient_id, specialist_id, specialty_id).await {
        Ok(appointment) => {
            session.submission_succeeded(appointment.id);
            println!("Booked appointment {}", appointment.id);
            print_appointment(&appointment);
            Ok(())
        }
        Err(SubmissionError::Rejected(message)) => {
            session.submission_rejected(message.clone());
            bail!("Booking rejected: {}", message);
        }
        Err(err) => Err(err.into()),
    }
}

async fn reschedule(api: &Arc<ApiClient>, args: &[String]) -> Result<()> {
    let appointment_id = parse_id(args.first(), "appointment-id")?;
    let date = parse_date(args.get(1))?;
    let start = parse_start_hour(args.get(2))?;
    let hours = parse_hours(args.get(3))?;

    let appointments = AppointmentService::new(Arc::clone(api));
    let original = appointments.get(appointment_id).await?;
    let reservation = original
        .reservation_range()
        .ok_or_else(|| anyhow!("appointment {} has no usable hour range", appointment_id))?;

    let mut session = BookingSession::for_reschedule(reservation);
    session.choose_specialist(original.specialist.id);
    let selection = drive_session(api, &mut session, date, start, hours).await?;

    let booking = BookingService::new(Arc::clone(api));
    match booking
        .reschedule(
            appointment_id,
            &selection,
            original.patient.id,
            original.specialist.id,
            original.specialty.id,
        )
        .await
    {
        Ok(appointment) => {
            session.submission_succeeded(appointment.id);
            println!("Rescheduled appointment {}", appointment.id);
            print_appointment(&appointment);
            Ok(())
        }
        Err(SubmissionError::Rejected(message)) => {
            session.submission_rejected(message.clone());
            bail!("Reschedule rejected: {}", message);
        }
        Err(err) => Err(err.into()),
    }
}

/// Walk the session through date selection, the availability fetch and the
/// start/duration choices, up to the final local validation.
async fn drive_session(
    api: &Arc<ApiClient>,
    session: &mut BookingSession,
    date: NaiveDate,
    start: TimeSlot,
    hours: u8,
) -> Result<agenda_cell::models::CandidateSelection> {
    let specialist_id = session
        .specialist_id()
        .ok_or_else(|| anyhow!("no specialist selected"))?;
    let token = session
        .choose_date(date)
        .ok_or_else(|| anyhow!("no specialist selected"))?;

    let availability = AvailabilityService::new(Arc::clone(api));
    match availability.fetch_free_slots(specialist_id, date).await {
        Ok(slots) => {
            session.slots_loaded(&token, slots);
        }
        Err(err) => {
            session.fetch_failed(&token, &err);
            return Err(err).context("could not read availability; try again");
        }
    }

    let now = Local::now().naive_local();
    session.choose_start(start, now)?;
    session.choose_duration(hours, now)?;
    Ok(session.begin_submit(now)?)
}

async fn change_status(api: &Arc<ApiClient>, args: &[String], action: &str) -> Result<()> {
    let appointment_id = parse_id(args.first(), "appointment-id")?;
    let appointments = AppointmentService::new(Arc::clone(api));

    let message = match action {
        "cancel" => appointments.cancel(appointment_id).await?,
        "finalize" => appointments.finalize(appointment_id).await?,
        _ => appointments.mark_missed(appointment_id).await?,
    };

    println!("{}", message);
    Ok(())
}

async fn show(api: &Arc<ApiClient>, args: &[String]) -> Result<()> {
    let appointment_id = parse_id(args.first(), "appointment-id")?;
    let appointments = AppointmentService::new(Arc::clone(api));
    let appointment = appointments.get(appointment_id).await?;
    print_appointment(&appointment);
    Ok(())
}

async fn list(api: &Arc<ApiClient>, args: &[String]) -> Result<()> {
    let specialty_id = parse_id(args.first(), "specialty-id")?;
    let page = args.get(1).map_or(Ok(0), |raw| raw.parse()).context("page must be a number")?;
    let size = args.get(2).map_or(Ok(50), |raw| raw.parse()).context("size must be a number")?;

    let appointments = AppointmentService::new(Arc::clone(api));
    let listing = appointments.list_by_specialty(specialty_id, page, size).await?;

    println!(
        "{} appointments for specialty {} (page {} of {}):",
        listing.total_elements,
        specialty_id,
        listing.number + 1,
        listing.total_pages.max(1)
    );
    for appointment in &listing.content {
        println!(
            "  #{}  {} {} - {}  {}  {} / {}",
            appointment.id,
            appointment.date,
            appointment.start_hour,
            appointment.end_hour,
            appointment.status,
            appointment.patient.full_name,
            appointment.specialist.full_name,
        );
    }
    Ok(())
}

fn print_appointment(appointment: &Appointment) {
    println!("  Date:       {} {} - {}", appointment.date, appointment.start_hour, appointment.end_hour);
    println!("  Status:     {}", appointment.status);
    println!("  Patient:    {}", appointment.patient.full_name);
    println!("  Specialist: {}", appointment.specialist.full_name);
    println!("  Specialty:  {}", appointment.specialty.area);
}

fn parse_id(raw: Option<&String>, name: &str) -> Result<i64> {
    raw.ok_or_else(|| anyhow!("missing <{}>", name))?
        .parse()
        .with_context(|| format!("<{}> must be a number", name))
}

fn parse_date(raw: Option<&String>) -> Result<NaiveDate> {
    let raw = raw.ok_or_else(|| anyhow!("missing <date>"))?;
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").context("<date> must be YYYY-MM-DD")
}

fn parse_start_hour(raw: Option<&String>) -> Result<TimeSlot> {
    let raw = raw.ok_or_else(|| anyhow!("missing <start-hour>"))?;
    TimeSlot::from_hour_string(raw)
        .ok_or_else(|| anyhow!("<start-hour> must be an hour between 08:00 and 16:00, excluding 12:00"))
}

fn parse_hours(raw: Option<&String>) -> Result<u8> {
    raw.map_or(Ok(1), |value| value.parse())
        .context("[hours] must be a number between 1 and 4")
}
