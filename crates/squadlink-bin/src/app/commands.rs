//! One-shot inspection commands that work on the persisted state.

use crate::app::ServiceState;
use message_outbox::{MessageStatus, QueuedMessage};
use session_checkin_monitor::SessionCheckIn;
use squadlink_config_and_utils::{Config, Paths};

/// Print queue counts and every message needing attention.
pub async fn queue_status(config: &Config, paths: &Paths) -> Result<(), Box<dyn std::error::Error>> {
    let state = ServiceState::build(config.clone(), paths.clone())?;
    let status = state.queue.status().await;

    println!("Message queue");
    println!("  Total:   {}", status.total);
    println!("  Pending: {}", status.pending);
    println!("  Sending: {}", status.sending);
    println!("  Failed:  {}", status.failed);
    println!("  Stuck:   {}", status.stuck);

    let max_attempts = config.queue.max_send_attempts;
    for message in state
        .queue
        .messages()
        .await
        .iter()
        .filter(|m| m.status == MessageStatus::Failed)
    {
        println!("{}", describe_message(message, max_attempts));
    }

    Ok(())
}

/// Drop every queued message.
pub async fn queue_clear(config: &Config, paths: &Paths) -> Result<(), Box<dyn std::error::Error>> {
    if paths.pid_file().exists() {
        println!("Warning: the service appears to be running; it may rewrite the queue");
    }

    let state = ServiceState::build(config.clone(), paths.clone())?;
    let count = state.queue.len().await;
    state.queue.clear_queue().await;

    println!("Cleared {} queued message(s)", count);
    Ok(())
}

/// Print every check-in grouped by collection.
pub async fn list_check_ins(
    config: &Config,
    paths: &Paths,
) -> Result<(), Box<dyn std::error::Error>> {
    let state = ServiceState::build(config.clone(), paths.clone())?;
    let manager = &state.check_ins;

    for (title, check_ins) in [
        ("Scheduled", manager.scheduled().await),
        ("Active", manager.active().await),
        ("Past", manager.past().await),
    ] {
        println!("{} ({})", title, check_ins.len());
        for check_in in &check_ins {
            println!("{}", describe_check_in(check_in));
        }
    }

    Ok(())
}

fn describe_message(message: &QueuedMessage, max_attempts: u32) -> String {
    let marker = if message.is_stuck(max_attempts) {
        "stuck"
    } else {
        message.status.as_str()
    };
    format!(
        "  [{}] {} match={} attempts={} error={}",
        marker,
        message.id,
        message.match_id,
        message.retry_count,
        message.last_error.as_deref().unwrap_or("-"),
    )
}

fn describe_check_in(check_in: &SessionCheckIn) -> String {
    format!(
        "  [{}] {} {} at {} due {}",
        check_in.status.as_str(),
        check_in.id,
        check_in.squad_member_name,
        check_in.location,
        check_in.check_in_time.format("%Y-%m-%d %H:%M UTC"),
    )
}
