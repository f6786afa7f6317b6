//! Direct message texts.
//!
//! Members are written as platform mentions (`<@id>`) and times as platform
//! timestamps (`<t:secs:t>`), which clients render in the reader's locale.

use office_hours_core::{Notice, Timestamp};

fn time(at: Timestamp) -> String {
    format!("<t:{}:t>", at.as_secs())
}

/// Render a notice as message text.
pub fn render_notice(notice: &Notice) -> String {
    match notice {
        Notice::IncomingStudent { student, requested, purpose, tried, moving_at, .. } => {
            let mut text = format!("<@{student}> is heading to your room");
            if *requested {
                text.push_str(" (they asked for you)");
            }
            if let Some(at) = moving_at {
                text.push_str(&format!(" and will be moved in at {}", time(*at)));
            }
            text.push('.');
            let purpose = if purpose.is_empty() { "not given" } else { purpose };
            let tried = if tried.is_empty() { "not given" } else { tried };
            text.push_str(&format!("\nNeeds help with: {purpose}\nAlready tried: {tried}"));
            text
        },
        Notice::MetadataExpired { resubmit_by, .. } => format!(
            "Your help request has expired. Please submit it again by {} to keep your place in \
             the queue.",
            time(*resubmit_by)
        ),
        Notice::RemovedForStaleRequest { .. } => {
            "You were removed from the queue because your help request was not resubmitted."
                .to_string()
        },
        Notice::BreakStarted { until, .. } => {
            format!("Your room is empty, so your break has started. It ends at {}.", time(*until))
        },
        Notice::BreakEnded { .. } => "Your break is over and your room is open again.".to_string(),
        Notice::QueueIsForStudents { .. } => {
            "The waiting room is for students. Join your own room to hold office hours.".to_string()
        },
    }
}
