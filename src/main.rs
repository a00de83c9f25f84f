use anyhow::{Context, Result};
use chrono_tz::Tz;
use log::{error, info};
use remindly::config::get_config_path;
use remindly::parser::parse_reminder_with;
use remindly::rrule::{describe, RecurrenceRule};
use remindly::ParserConfig;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

fn main() -> Result<()> {
    remindly::init_logger();

    let config = ParserConfig::load().context("Failed to load configuration")?;
    info!("Starting Remindly with default hour {:02}:00", config.default_hour);

    let mut rl = DefaultEditor::new()?;
    println!("Type a reminder to parse it, or 'help' for commands.");

    loop {
        let readline = rl.readline(">> ");
        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line);
                match process_line(line, &config) {
                    Ok(true) => {}
                    Ok(false) => break,
                    Err(err) => error!("Failed to process input: {:?}", err),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("CTRL-D");
                break;
            }
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        }
    }
    Ok(())
}

/// Handle one line of input; `Ok(false)` ends the session
fn process_line(line: &str, config: &ParserConfig) -> Result<bool> {
    match line {
        "help" => {
            println!("Available commands:");
            println!("  <reminder text> - Parse a reminder, e.g. \"Team standup every Friday\"");
            println!("  config - Show the active configuration");
            println!("  help - Show this help");
            println!("  exit - Exit the application");
        }
        "config" => {
            println!("Config file: {}", get_config_path()?.display());
            println!("{}", toml::to_string_pretty(config)?);
        }
        "exit" | "quit" => return Ok(false),
        text => parse_and_print(text, config)?,
    }
    Ok(true)
}

fn parse_and_print(text: &str, config: &ParserConfig) -> Result<()> {
    let now = config.now()?;
    let result = parse_reminder_with(text, now, &config.options());
    println!("{}", serde_json::to_string_pretty(&result)?);

    if result.date.is_none() {
        println!("No date found; a date and time must be supplied separately.");
    }
    let tz = config.tz()?.unwrap_or(Tz::UTC);
    if let Some(rule) = RecurrenceRule::from_info(&result.recurrence, &tz) {
        println!("{}", rule);
        println!("Repeats: {}", describe(&result.recurrence));
        if result.recurrence.needs_end_date {
            println!("No end date given; the series repeats forever unless one is set.");
        }
    }
    Ok(())
}
