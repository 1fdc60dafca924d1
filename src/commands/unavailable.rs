use anyhow::Result;
use chrono::NaiveDate;

use rota::availability::RecurrencePattern;
use rota::lifecycle::RosterService;
use rota::models::NewUnavailability;

#[derive(Debug, Clone)]
pub struct UnavailableArgs {
    pub person: String,
    pub start: NaiveDate,
    /// Defaults to `start`
    pub end: Option<NaiveDate>,
    pub reason: Option<String>,
    pub pattern: Option<RecurrencePattern>,
}

pub fn unavailable_add(service: &RosterService, args: UnavailableArgs) -> Result<()> {
    let period = NewUnavailability {
        end: args.end.unwrap_or(args.start),
        person: args.person,
        start: args.start,
        reason: args.reason,
        pattern: args.pattern,
    };

    let stored = service.add_unavailability(period)?;
    println!(
        "Recorded #{}: {} unavailable {} to {}",
        stored.id, stored.person, stored.start, stored.end
    );
    Ok(())
}

pub fn unavailable_list(service: &RosterService, person: Option<&str>) -> Result<()> {
    let periods = service.list_unavailability(person)?;
    if periods.is_empty() {
        println!("No unavailability recorded.");
        return Ok(());
    }

    for p in &periods {
        let mut line = format!("#{:<4} {:<16} {} to {}", p.id, p.person, p.start, p.end);
        if let Some(pattern) = &p.pattern {
            line.push_str(&format!("  ({pattern})"));
        }
        if let Some(reason) = &p.reason {
            line.push_str(&format!("  {reason}"));
        }
        println!("{line}");
    }
    Ok(())
}

pub fn unavailable_remove(service: &RosterService, id: i64) -> Result<()> {
    if service.remove_unavailability(id)? {
        println!("Removed #{id}");
    } else {
        println!("No unavailability #{id}");
    }
    Ok(())
}
