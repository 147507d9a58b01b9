use crate::cli::{Cli, Command, normalize_parse_error, split_command_line};
use crate::render;
use clap::Parser;
use remind_core::error::AppError;
use remind_core::model::Task;
use remind_core::notify::Notifier;
use remind_core::task_api::TaskApi;
use std::io::{self, BufRead, Write};

/// A rendered answer to one command, in chat and JSON form.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub text: String,
    pub json: serde_json::Value,
}

impl Reply {
    fn new(text: String, json: serde_json::Value) -> Self {
        Self { text, json }
    }
}

/// Turns chat commands into task operations and their replies.
pub struct Bot {
    api: TaskApi,
}

impl Bot {
    pub fn new(api: TaskApi) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &TaskApi {
        &self.api
    }

    pub fn execute(&self, command: &Command) -> Result<Reply, AppError> {
        let today = self.api.now().date();

        let reply = match command {
            Command::Start => {
                let text = render::help_text();
                let json = serde_json::json!({ "help": text });
                Reply::new(text, json)
            }
            Command::Add { text } => {
                let added = self.api.add(&text.join(" "))?;
                Reply::new(render::added(&added, today), render::added_json(&added))
            }
            Command::List => {
                let listing = self.api.list();
                Reply::new(
                    render::listing(&listing, today),
                    render::listing_json(&listing),
                )
            }
            Command::Summary => {
                let tasks = self.api.summary();
                Reply::new(render::summary(&tasks, today), render::tasks_json(&tasks))
            }
            Command::Done { target } => {
                let outcome = self.api.done(&target.join(" "))?;
                Reply::new(render::done(&outcome, today), render::done_json(&outcome))
            }
            Command::History => {
                let tasks = self.api.history();
                Reply::new(render::history(&tasks, today), render::tasks_json(&tasks))
            }
            Command::Remove { target } => {
                let removed = self.api.remove(&target.join(" "))?;
                Reply::new(render::removed(&removed), render::tasks_json(&removed))
            }
            Command::Clear => {
                let count = self.api.clear()?;
                Reply::new(
                    render::cleared(count),
                    serde_json::json!({ "cleared": count }),
                )
            }
            Command::Next => {
                let task = self.api.next();
                let json = task
                    .as_ref()
                    .map(render::task_json)
                    .unwrap_or(serde_json::Value::Null);
                Reply::new(render::next(task.as_ref(), today), json)
            }
        };

        Ok(reply)
    }

    /// Answers one chat line. Blank lines get no reply; every failure
    /// becomes a warning reply.
    pub fn handle_line(&self, line: &str) -> Option<String> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let text = match self.dispatch(line.strip_prefix('/').unwrap_or(line)) {
            Ok(reply) => reply.text,
            Err(err) => {
                log::debug!("command '{line}' failed: {err}");
                render::error(&err)
            }
        };
        Some(text)
    }

    fn dispatch(&self, line: &str) -> Result<Reply, AppError> {
        let args = split_command_line(line)?;

        let mut argv = Vec::with_capacity(args.len() + 1);
        argv.push("remind_bot".to_string());
        argv.extend(args);

        let cli = Cli::try_parse_from(argv).map_err(normalize_parse_error)?;
        self.execute(&cli.command.unwrap_or(Command::Start))
    }

    /// Reads chat lines until EOF or `exit`, writing one reply per command.
    pub fn run<R: BufRead, W: Write>(&self, input: R, mut output: W) -> Result<(), AppError> {
        for line in input.lines() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.eq_ignore_ascii_case("exit") || trimmed.eq_ignore_ascii_case("quit") {
                break;
            }

            if let Some(reply) = self.handle_line(trimmed) {
                writeln!(output, "{reply}")?;
                output.flush()?;
            }
        }

        Ok(())
    }
}

/// Delivers reminders into the chat, which for the console transport is
/// standard output.
pub struct ChatNotifier;

impl Notifier for ChatNotifier {
    fn notify(&self, _task: &Task, message: &str) -> Result<(), AppError> {
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{message}")?;
        stdout.flush()?;
        Ok(())
    }
}
