use anyhow::{bail, Context, Result};
use clap::ValueEnum;

use rota::lifecycle::{Action, ActionOutcome, Actor, RosterService};
use rota::models::{AssignmentRef, Occupant};
use rota::notifications::NotificationManager;

/// Action names accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ActionName {
    Confirm,
    Decline,
    Volunteer,
    PickUp,
    Swap,
    Reassign,
    Undo,
}

/// Parsed `action` subcommand arguments
#[derive(Debug, Clone)]
pub struct ActionArgs {
    pub slot: AssignmentRef,
    pub name: ActionName,
    pub actor: String,
    pub manager: bool,
    pub offer: Option<AssignmentRef>,
    pub person: Option<String>,
}

impl ActionArgs {
    fn action(&self) -> Result<Action> {
        let action = match self.name {
            ActionName::Confirm => Action::Confirm,
            ActionName::Decline => Action::Decline,
            ActionName::Volunteer => Action::Volunteer,
            ActionName::PickUp => Action::PickUp,
            ActionName::Undo => Action::Undo,
            ActionName::Swap => match self.offer {
                Some(offer) => Action::Swap { offer },
                None => bail!("swap needs --offer YYYY-MM-DD#N"),
            },
            ActionName::Reassign => {
                let person = self
                    .person
                    .as_deref()
                    .context("reassign needs --person")?
                    .parse::<Occupant>()?;
                Action::Reassign { person }
            }
        };
        Ok(action)
    }

    fn actor(&self) -> Actor {
        if self.manager {
            Actor::manager(&self.actor)
        } else {
            Actor::person(&self.actor)
        }
    }
}

pub async fn action(service: &RosterService, args: ActionArgs) -> Result<()> {
    let action = args.action()?;
    let actor = args.actor();

    let outcome = service.apply_action(args.slot, &actor, action)?;
    print_outcome(&outcome);
    deliver(service, &outcome).await;
    Ok(())
}

pub fn issue_token(service: &RosterService, slot: AssignmentRef) -> Result<()> {
    let token = service.issue_handoff_token(slot)?;
    println!("Token: {}", token.token);
    println!(
        "Pickup URL: {}",
        service.config().notifications.pickup_url(&token.token)
    );
    Ok(())
}

pub async fn redeem(service: &RosterService, token: &str, actor: &str) -> Result<()> {
    let outcome = service.redeem_handoff_token(token, &Actor::person(actor))?;
    print_outcome(&outcome);
    deliver(service, &outcome).await;
    Ok(())
}

fn print_outcome(outcome: &ActionOutcome) {
    let a = &outcome.assignment;
    println!("{}: {} [{}]", a.role, a.person, a.status);
    if let Some(cover) = &a.cover {
        println!("  covered by {cover}");
    }
    if let Some(other) = &outcome.counterpart {
        println!("  {}: {} [{}]", other.role, other.person, other.status);
    }
    if let Some(token) = &outcome.token {
        println!("  hand-off token: {}", token.token);
    }
}

async fn deliver(service: &RosterService, outcome: &ActionOutcome) {
    // delivery failures are reported but never fail the action
    let statuses =
        NotificationManager::notify(&service.config().notifications, &outcome.notifications).await;
    for status in statuses {
        if status.success {
            println!("  notified via {}", status.channel);
        } else {
            println!(
                "  notification via {} failed: {}",
                status.channel,
                status.message.as_deref().unwrap_or("unknown error")
            );
        }
    }
}
