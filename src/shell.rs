use anyhow::Result;
use colored::Colorize;
use std::io::{self, Write};

use crate::orchestrator::{CommandResult, ConsoleEventListener, InstructionPipeline};

/// Interactive prompt: every line is an instruction, plus a few built-ins.
pub async fn run_shell(pipeline: &InstructionPipeline) -> Result<()> {
    tokio::spawn(ConsoleEventListener::listen(
        pipeline.orchestrator().events().subscribe(),
    ));

    println!("\n{}", "=== sim-pilot Interactive Shell ===".bold().green());
    println!("Type instructions (e.g., 'create session', 'tap at 100 200', 'take screenshot') or 'exit' to quit.");
    println!("Built-ins: help, suggest <text>, history [n], session\n");

    let stdin = io::stdin();
    let mut input = String::new();

    loop {
        print!("{} ", "sim-pilot>".blue().bold());
        io::stdout().flush()?;

        input.clear();
        if stdin.read_line(&mut input)? == 0 {
            break; // EOF
        }

        let line = input.trim();
        if line.is_empty() {
            continue;
        }

        match line.split_once(' ').unwrap_or((line, "")) {
            ("exit" | "quit", _) => break,
            ("help", _) => print_commands(pipeline),
            ("suggest", partial) => {
                for suggestion in pipeline.parser().registry().suggest(partial) {
                    println!("  {}", suggestion.cyan());
                }
            }
            ("history", limit) => {
                let limit = limit.trim().parse().ok();
                for entry in pipeline.orchestrator().get_command_history(limit) {
                    let mark = if entry.result.success { "✓".green() } else { "✗".red() };
                    println!(
                        "  {} {} {}",
                        entry.timestamp.format("%H:%M:%S").to_string().dimmed(),
                        mark,
                        entry.command.description.unwrap_or_else(|| entry.command.kind.to_string())
                    );
                }
            }
            ("session", _) => match pipeline.orchestrator().get_active_session_id() {
                Some(id) => println!("Active session: {}", id.cyan()),
                None => println!("No active session"),
            },
            _ => {
                let result = pipeline.process(line).await;
                print_result(&result);
            }
        }
    }

    pipeline.orchestrator().dispose().await;
    println!("\nExiting shell. Goodbye!");
    Ok(())
}

pub fn print_commands(pipeline: &InstructionPipeline) {
    for group in pipeline.parser().registry().groups() {
        println!("{}", group.name.bold());
        for definition in &group.definitions {
            println!("  {:<24} {}", definition.name.cyan(), definition.description.dimmed());
        }
    }
}

pub fn print_result(result: &CommandResult) {
    if result.success {
        println!("{} Done", "✅".green());
        if let Some(data) = &result.data {
            let rendered = serde_json::to_string_pretty(data).unwrap_or_else(|_| data.to_string());
            println!("{}", rendered);
        }
    } else {
        println!(
            "{} {}",
            "❌".red(),
            result.error.as_deref().unwrap_or("Command failed").red()
        );
        if let Some(suggestions) = result
            .data
            .as_ref()
            .and_then(|d| d.get("suggestions"))
            .and_then(|s| s.as_array())
            .filter(|s| !s.is_empty())
        {
            println!("Did you mean:");
            for suggestion in suggestions.iter().filter_map(|s| s.as_str()) {
                println!("  {}", suggestion.cyan());
            }
        }
    }
}
