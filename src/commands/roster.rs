use anyhow::{Context, Result};

use rota::config::Config;
use rota::lifecycle::RosterService;
use rota::models::{Assignment, AssignmentStatus, Event};
use rota::scheduler::{SelectionTier, YearMonth};

pub fn generate(service: &RosterService, month: YearMonth) -> Result<()> {
    println!("Generating roster for {month}");
    println!("==========================");

    let report = service
        .generate_month(month)
        .with_context(|| format!("Failed to generate {month}"))?;

    for date in &report.skipped {
        println!("  {date}  (already scheduled, skipped)");
    }
    for outcome in &report.created {
        let slots: Vec<String> = outcome
            .slots
            .iter()
            .map(|s| {
                let marker = match s.tier {
                    SelectionTier::OverCap => " [over cap]",
                    SelectionTier::GapRelaxed => " [gap relaxed]",
                    SelectionTier::FatigueRelaxed => " [fatigue relaxed]",
                    _ => "",
                };
                format!("{}: {}{marker}", s.role, s.occupant)
            })
            .collect();
        println!("  {}  {}", outcome.date, slots.join(", "));
    }

    let degraded = report.degraded_slots().count();
    println!(
        "\nCreated {} event(s), skipped {}.",
        report.created.len(),
        report.skipped.len()
    );
    if degraded > 0 {
        println!("{degraded} slot(s) need attention (over cap or unfilled).");
    }
    Ok(())
}

pub fn show(service: &RosterService, month: YearMonth) -> Result<()> {
    let events = service.events_in_month(month)?;
    if events.is_empty() {
        println!("No events scheduled for {month}.");
        return Ok(());
    }

    for event in &events {
        print_event(event);
    }
    Ok(())
}

fn print_event(event: &Event) {
    println!("{} ({})  {}", event.date, event.date.format("%A"), event.display_title());
    if let Some(notes) = &event.notes {
        println!("  Notes: {notes}");
    }
    for a in &event.assignments {
        println!("  #{} {}", a.position, describe(a));
    }
    println!();
}

fn describe(a: &Assignment) -> String {
    let mut line = format!("{}: {}", a.role, a.person);
    if let Some(cover) = &a.cover {
        line.push_str(&format!(" (covered by {cover})"));
    }
    if let Some(previous) = &a.swapped_with {
        line.push_str(&format!(" (swapped with {previous})"));
    }
    match a.status {
        AssignmentStatus::Confirmed => {}
        AssignmentStatus::Pending => line.push_str(" [pending]"),
        AssignmentStatus::NeedsCoverage => line.push_str(" [NEEDS COVERAGE]"),
    }
    line
}

pub fn check_config(config: &Config) -> Result<()> {
    config.validate()?;

    println!("Configuration OK");
    println!("  People: {}", config.roster.people.len());
    println!("  Priority pool: {}", config.roster.priority_pool.join(", "));
    println!(
        "  Rotation ({}): {}",
        config.roster.rotation_role,
        config.roster.rotation_order.join(" -> ")
    );
    println!(
        "  Caps: total {}, primary {}, leader {}, gap {} days",
        config.policy.monthly_total_cap,
        config.policy.primary_monthly_cap,
        config.policy.leader_monthly_cap,
        config.policy.min_primary_gap_days
    );
    println!("  Database: {}", config.storage.sqlite_path.display());
    println!(
        "  Webhook: {}",
        config.notifications.webhook_url.as_deref().unwrap_or("(none)")
    );
    println!(
        "  Telegram: {}",
        if config.notifications.telegram.is_some() {
            "configured"
        } else {
            "(none)"
        }
    );
    Ok(())
}
