//! Chat replies and their `--json` counterparts.

use remind_core::error::AppError;
use remind_core::model::{DEFAULT_LIST, Priority, Task};
use remind_core::task_api::{Added, DoneOutcome, Listing};
use std::collections::BTreeMap;
use std::fmt::Write;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

pub const BANNER: &str = "✅ Bot is running and reminders are active.";

pub fn help_text() -> String {
    [
        "👋 Hi! I'm your task reminder bot.",
        "",
        "Commands:",
        "/add [List] <task> [time] [repeat=daily|weekly|hourly|monday..] [priority=low|normal|high]",
        "/list — show tasks",
        "/summary — today's tasks",
        "/done <id or name> — mark as done",
        "/history — show completed tasks",
        "/remove <id or name> — delete permanently",
        "/clear — delete everything",
        "/next — next upcoming task",
        "",
        "Times: 17:30, 5pm, noon, tonight, tomorrow 9:00, friday 10am, 2025-12-24 18:00, in 20 minutes",
    ]
    .join("\n")
}

/// `HH:MM` when `at` falls on `today`, otherwise `YYYY-MM-DD HH:MM`.
pub fn when(at: OffsetDateTime, today: Date) -> String {
    let formatted = if at.date() == today {
        at.format(format_description!("[hour]:[minute]"))
    } else {
        at.format(format_description!("[year]-[month]-[day] [hour]:[minute]"))
    };
    formatted.unwrap_or_else(|_| at.to_string())
}

fn task_line(task: &Task, today: Date) -> String {
    let mut line = format!("{}. {}", task.id, task.description);
    if let Some(at) = task.scheduled_at {
        let _ = write!(line, " — {}", when(at, today));
    }
    if let Some(repeat) = task.repeat.as_ref() {
        let _ = write!(line, " ({repeat})");
    }
    if task.priority == Priority::High {
        line.push_str(" ❗");
    }
    line
}

pub fn added(added: &Added, today: Date) -> String {
    let task = &added.task;
    let mut reply = format!("✅ Task added: {}", task.description);
    if let Some(at) = task.scheduled_at {
        let _ = write!(reply, " at {}", when(at, today));
    }
    if let Some(repeat) = task.repeat.as_ref() {
        let _ = write!(reply, " ({repeat})");
    }
    if task.priority != Priority::Normal {
        let _ = write!(reply, " [priority: {}]", task.priority);
    }
    if task.list_name != DEFAULT_LIST {
        let _ = write!(reply, " in {}", task.list_name);
    }
    if task.scheduled_at.is_some() && !added.registered {
        reply.push_str("\n⚠️ That time has already passed, so no reminder will be sent.");
    }
    reply
}

pub fn listing(listing: &Listing, today: Date) -> String {
    let mut reply = String::from("🗓️ Your Tasks:\n");

    if listing.pending.is_empty() {
        reply.push_str("\nNo pending tasks.\n");
    } else {
        let mut lists: BTreeMap<&str, Vec<&Task>> = BTreeMap::new();
        for task in &listing.pending {
            lists.entry(task.list_name.as_str()).or_default().push(task);
        }
        for (name, tasks) in lists {
            let _ = writeln!(reply, "\n📂 {name}:");
            for task in tasks {
                let _ = writeln!(reply, "{}", task_line(task, today));
            }
        }
    }

    if !listing.done.is_empty() {
        reply.push_str("\n✅ Completed:\n");
        for task in &listing.done {
            let _ = writeln!(reply, "{}. {} (done)", task.id, task.description);
        }
    }

    reply.trim_end().to_string()
}

pub fn summary(tasks: &[Task], today: Date) -> String {
    if tasks.is_empty() {
        return "Nothing scheduled for today.".to_string();
    }

    let mut reply = String::from("📋 Today's tasks:");
    for task in tasks {
        let _ = write!(reply, "\n{}", task_line(task, today));
    }
    reply
}

pub fn done(outcome: &DoneOutcome, today: Date) -> String {
    match outcome {
        DoneOutcome::Completed(task) => format!("✅ Marked as done: {}", task.description),
        DoneOutcome::Advanced(task) => {
            let next = task
                .scheduled_at
                .map(|at| when(at, today))
                .unwrap_or_else(|| "-".to_string());
            format!("🔁 Done for now: {}. Next reminder: {next}", task.description)
        }
    }
}

pub fn history(tasks: &[Task], today: Date) -> String {
    if tasks.is_empty() {
        return "No completed tasks yet.".to_string();
    }

    let mut reply = String::from("📜 Completed Tasks:");
    for task in tasks {
        let _ = write!(reply, "\n{}. {}", task.id, task.description);
        if let Some(at) = task.completed_at {
            let _ = write!(reply, " (done {})", when(at, today));
        }
    }
    reply
}

pub fn removed(tasks: &[Task]) -> String {
    match tasks {
        [task] => format!("🗑️ Permanently removed: {}", task.description),
        _ => {
            let names: Vec<&str> = tasks.iter().map(|task| task.description.as_str()).collect();
            format!(
                "🗑️ Permanently removed {} tasks: {}",
                tasks.len(),
                names.join(", ")
            )
        }
    }
}

pub fn cleared(count: usize) -> String {
    match count {
        0 => "🧹 Nothing to clear.".to_string(),
        _ => "🧹 All tasks cleared!".to_string(),
    }
}

pub fn next(task: Option<&Task>, today: Date) -> String {
    let Some(task) = task else {
        return "No upcoming tasks.".to_string();
    };

    let mut reply = format!("🔜 Next task: {}", task.description);
    if let Some(at) = task.scheduled_at {
        let _ = write!(reply, " at {}", when(at, today));
    }
    if let Some(repeat) = task.repeat.as_ref() {
        let _ = write!(reply, " ({repeat})");
    }
    reply
}

/// Announcement for one-shot tasks whose time passed while the bot was down.
pub fn missed(tasks: &[Task], today: Date) -> Option<String> {
    if tasks.is_empty() {
        return None;
    }

    let mut reply = String::from("⚠️ Missed reminders while offline:");
    for task in tasks {
        let _ = write!(reply, "\n- {}", task.description);
        if let Some(at) = task.scheduled_at {
            let _ = write!(reply, " at {}", when(at, today));
        }
    }
    Some(reply)
}

pub fn error(err: &AppError) -> String {
    if err.is_user_facing() {
        format!("⚠️ {}", err.message())
    } else {
        format!("⚠️ Something went wrong: {}", err.message())
    }
}

pub fn task_json(task: &Task) -> serde_json::Value {
    serde_json::to_value(task).unwrap_or(serde_json::Value::Null)
}

pub fn tasks_json(tasks: &[Task]) -> serde_json::Value {
    serde_json::Value::Array(tasks.iter().map(task_json).collect())
}

pub fn added_json(added: &Added) -> serde_json::Value {
    serde_json::json!({
        "task": task_json(&added.task),
        "registered": added.registered,
    })
}

pub fn done_json(outcome: &DoneOutcome) -> serde_json::Value {
    let (kind, task) = match outcome {
        DoneOutcome::Completed(task) => ("completed", task),
        DoneOutcome::Advanced(task) => ("advanced", task),
    };
    serde_json::json!({
        "outcome": kind,
        "task": task_json(task),
    })
}

pub fn listing_json(listing: &Listing) -> serde_json::Value {
    serde_json::json!({
        "pending": tasks_json(&listing.pending),
        "done": tasks_json(&listing.done),
    })
}

#[cfg(test)]
mod tests {
    use super::{added, done, error, listing, missed, next, removed, when};
    use remind_core::error::AppError;
    use remind_core::model::{Priority, Repeat, Task, TaskStatus};
    use remind_core::task_api::{Added, DoneOutcome, Listing};
    use time::macros::{date, datetime};

    fn task(id: u64, description: &str) -> Task {
        Task {
            id,
            list_name: "General".to_string(),
            description: description.to_string(),
            scheduled_at: None,
            repeat: None,
            priority: Priority::Normal,
            status: TaskStatus::Pending,
            created_at: datetime!(2025-12-20 08:00 UTC),
            completed_at: None,
            reminded_at: None,
        }
    }

    const TODAY: time::Date = date!(2025-12-20);

    #[test]
    fn when_drops_date_for_today() {
        assert_eq!(when(datetime!(2025-12-20 17:45 UTC), TODAY), "17:45");
        assert_eq!(when(datetime!(2025-12-21 09:00 UTC), TODAY), "2025-12-21 09:00");
    }

    #[test]
    fn added_reply_mentions_schedule_details() {
        let mut task = task(1, "Finish report");
        task.scheduled_at = Some(datetime!(2025-12-20 17:30 UTC));
        task.repeat = Some(Repeat::Daily);
        task.priority = Priority::High;
        task.list_name = "Work".to_string();

        let reply = added(
            &Added {
                task,
                registered: true,
            },
            TODAY,
        );

        assert_eq!(
            reply,
            "✅ Task added: Finish report at 17:30 (daily) [priority: high] in Work"
        );
    }

    #[test]
    fn added_reply_warns_about_past_time() {
        let mut task = task(1, "breakfast");
        task.scheduled_at = Some(datetime!(2025-12-20 08:00 UTC));

        let reply = added(
            &Added {
                task,
                registered: false,
            },
            TODAY,
        );

        assert!(reply.contains("no reminder will be sent"));
    }

    #[test]
    fn listing_groups_by_list_then_done() {
        let mut work = task(2, "deploy");
        work.list_name = "Work".to_string();
        let mut finished = task(3, "laundry");
        finished.status = TaskStatus::Done;

        let reply = listing(
            &Listing {
                pending: vec![work, task(1, "milk")],
                done: vec![finished],
            },
            TODAY,
        );

        assert_eq!(
            reply,
            "🗓️ Your Tasks:\n\n📂 General:\n1. milk\n\n📂 Work:\n2. deploy\n\n✅ Completed:\n3. laundry (done)"
        );
    }

    #[test]
    fn empty_listing() {
        let reply = listing(
            &Listing {
                pending: Vec::new(),
                done: Vec::new(),
            },
            TODAY,
        );
        assert_eq!(reply, "🗓️ Your Tasks:\n\nNo pending tasks.");
    }

    #[test]
    fn done_replies() {
        let mut recurring = task(1, "stretch");
        recurring.scheduled_at = Some(datetime!(2025-12-21 18:00 UTC));

        assert_eq!(
            done(&DoneOutcome::Completed(task(2, "milk")), TODAY),
            "✅ Marked as done: milk"
        );
        assert_eq!(
            done(&DoneOutcome::Advanced(recurring), TODAY),
            "🔁 Done for now: stretch. Next reminder: 2025-12-21 18:00"
        );
    }

    #[test]
    fn removed_reply_counts_duplicates() {
        assert_eq!(removed(&[task(1, "milk")]), "🗑️ Permanently removed: milk");
        assert_eq!(
            removed(&[task(1, "milk"), task(2, "milk")]),
            "🗑️ Permanently removed 2 tasks: milk, milk"
        );
    }

    #[test]
    fn next_reply() {
        let mut upcoming = task(1, "dinner");
        upcoming.scheduled_at = Some(datetime!(2025-12-20 19:00 UTC));

        assert_eq!(next(Some(&upcoming), TODAY), "🔜 Next task: dinner at 19:00");
        assert_eq!(next(None, TODAY), "No upcoming tasks.");
    }

    #[test]
    fn missed_batch_lists_each_task() {
        let mut call = task(1, "call bank");
        call.scheduled_at = Some(datetime!(2025-12-19 10:00 UTC));

        assert_eq!(missed(&[], TODAY), None);
        assert_eq!(
            missed(&[call], TODAY).as_deref(),
            Some("⚠️ Missed reminders while offline:\n- call bank at 2025-12-19 10:00")
        );
    }

    #[test]
    fn error_replies_hide_codes() {
        assert_eq!(
            error(&AppError::invalid_input("please provide a task description")),
            "⚠️ please provide a task description"
        );
        assert_eq!(
            error(&AppError::io("disk full")),
            "⚠️ Something went wrong: disk full"
        );
    }
}
