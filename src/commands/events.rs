use anyhow::{bail, Result};
use chrono::NaiveDate;

use rota::lifecycle::{Actor, RosterService};
use rota::models::{EventKind, Role};
use rota::scheduler::YearMonth;

pub fn add_event(
    service: &RosterService,
    date: NaiveDate,
    kind: EventKind,
    title: Option<String>,
    roles: Vec<Role>,
) -> Result<()> {
    if kind == EventKind::Custom && roles.is_empty() {
        bail!("custom events need at least one --role");
    }

    let event = service.create_event(date, kind, title.as_deref(), &roles)?;
    println!(
        "Created {} on {} with {} open slot(s)",
        event.display_title(),
        event.date,
        event.assignments.len()
    );
    Ok(())
}

pub fn edit_event(
    service: &RosterService,
    date: NaiveDate,
    title: Option<String>,
    notes: Option<String>,
) -> Result<()> {
    if title.is_none() && notes.is_none() {
        bail!("nothing to change: pass --title and/or --notes");
    }
    // an empty string clears the field
    if let Some(title) = title {
        service.set_title(date, Some(title.as_str()))?;
    }
    if let Some(notes) = notes {
        service.set_notes(date, Some(notes.as_str()))?;
    }
    println!("Updated event on {date}");
    Ok(())
}

pub fn delete_event(service: &RosterService, date: NaiveDate) -> Result<()> {
    service.delete_event(date)?;
    println!("Deleted event on {date}");
    Ok(())
}

pub fn wipe_month(service: &RosterService, month: YearMonth, actor: &Actor, yes: bool) -> Result<()> {
    if !yes {
        bail!("refusing to wipe {month} without --yes");
    }
    let removed = service.wipe_month(month, actor)?;
    println!("Removed {removed} event(s) from {month}");
    Ok(())
}

pub fn bulk_confirm(service: &RosterService, month: YearMonth, actor: &Actor) -> Result<()> {
    let count = service.bulk_confirm(month, actor)?;
    println!("Confirmed {count} pending assignment(s) in {month}");
    Ok(())
}
