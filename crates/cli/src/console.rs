use std::io::BufRead;
use std::path::PathBuf;

use crossbeam_channel::Sender;
use mocap_stream_core::pipeline::pipeline_event::PipelineEvent;
use mocap_stream_core::shared::channel_id::ChannelId;

pub const HELP: &str =
    "commands: enable <channel> | disable <channel> | url [<base url>] | source <frames dir> | quit";

/// A line typed on stdin while the pipeline runs.
#[derive(Debug)]
pub enum ConsoleCommand {
    Pipeline(PipelineEvent),
    SwitchSource(PathBuf),
}

pub fn parse_command(line: &str) -> Result<Option<ConsoleCommand>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (verb, arg) = match line.split_once(char::is_whitespace) {
        Some((verb, arg)) => (verb, arg.trim()),
        None => (line, ""),
    };

    let command = match verb.to_ascii_lowercase().as_str() {
        "enable" | "disable" => {
            let channel: ChannelId = arg.parse()?;
            let enabled = verb.eq_ignore_ascii_case("enable");
            ConsoleCommand::Pipeline(PipelineEvent::SetChannelEnabled(channel, enabled))
        }
        "url" => ConsoleCommand::Pipeline(PipelineEvent::SetEndpointUrl(arg.to_string())),
        "source" if !arg.is_empty() => ConsoleCommand::SwitchSource(PathBuf::from(arg)),
        "source" => return Err("source needs a frames directory".to_string()),
        "quit" | "exit" => ConsoleCommand::Pipeline(PipelineEvent::Shutdown),
        other => return Err(format!("unknown command '{other}'")),
    };
    Ok(Some(command))
}

/// Reads commands from stdin on a detached thread until stdin closes.
pub fn spawn(commands: Sender<ConsoleCommand>) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            match parse_command(&line) {
                Ok(Some(command)) => {
                    if commands.send(command).is_err() {
                        break;
                    }
                }
                Ok(None) => {}
                Err(e) => eprintln!("{e}\n{HELP}"),
            }
        }
    });
}
