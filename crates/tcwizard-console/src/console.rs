//! Terminal front end
//!
//! Paints controller events as text and turns stdin lines into handle calls.

use anyhow::Result;
use std::fmt::Write as _;
use std::path::PathBuf;
use std::str::FromStr;
use tcwizard_client::{UiEvent, WizardHandle};
use tcwizard_core::{
    strip_tags, DetailDirective, FirmwareDetails, FirmwarePanelView, FirmwareSource, StatusView,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing::{debug, warn};

const HELP: &str = "commands: convert | cancel | flash | firmware | source url|upload | \
                    url <address> | upload <path> | quit";

/// One parsed stdin line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Convert,
    Cancel,
    Flash,
    Firmware,
    Source(FirmwareSource),
    Url(String),
    Upload(PathBuf),
    Help,
    Quit,
}

impl FromStr for ConsoleCommand {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let command = match (word, rest) {
            ("convert", "") => ConsoleCommand::Convert,
            ("cancel", "") => ConsoleCommand::Cancel,
            ("flash", "") => ConsoleCommand::Flash,
            ("firmware", "") => ConsoleCommand::Firmware,
            ("help", "") | ("?", "") => ConsoleCommand::Help,
            ("quit", "") | ("exit", "") => ConsoleCommand::Quit,
            ("source", source) => ConsoleCommand::Source(source.parse()?),
            ("url", address) if !address.is_empty() => ConsoleCommand::Url(address.to_string()),
            ("upload", path) if !path.is_empty() => ConsoleCommand::Upload(PathBuf::from(path)),
            ("url", _) | ("upload", _) => return Err(format!("{} needs an argument", word)),
            _ => return Err(format!("unknown command: {}", line)),
        };
        Ok(command)
    }
}

/// Text rendering of a status event
pub fn render_status(view: &StatusView) -> String {
    let mut out = String::new();
    let label = if view.label.is_empty() {
        view.state.name()
    } else {
        view.label.as_str()
    };
    let marker = if view.spin { " ..." } else { "" };
    let _ = writeln!(out, "== {}{} ==", label, marker);

    for directive in &view.details {
        let line = match directive {
            DetailDirective::Message { html } => strip_tags(html),
            DetailDirective::Text { message } => message.clone(),
            DetailDirective::Button { label, .. } => format!("[{}]", label),
            DetailDirective::Link {
                label,
                message,
                href,
            } => format!("{} {} <{}>", strip_tags(message), label, href),
        };
        let _ = writeln!(out, "  {}", line);
    }
    out
}

/// Text rendering of a firmware panel event
pub fn render_panel(view: &FirmwarePanelView) -> String {
    if !view.visible {
        return "-- firmware panel closed --\n".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(out, "-- firmware ({}) --", view.source);
    if !view.url.is_empty() {
        let _ = writeln!(out, "  url: {}", view.url);
    }
    match &view.details {
        FirmwareDetails::Hidden => {}
        FirmwareDetails::Checking { message } => {
            let _ = writeln!(out, "  {}", message);
        }
        FirmwareDetails::Verdict(verdict) => {
            let mark = if verdict.valid { "ok" } else { "error" };
            match verdict.size_in_bytes {
                Some(size) => {
                    let _ = writeln!(out, "  {}: {} ({} bytes)", mark, verdict.message, size);
                }
                None => {
                    let _ = writeln!(out, "  {}: {}", mark, verdict.message);
                }
            }
        }
    }
    if view.point_of_no_return {
        let _ = writeln!(out, "  [Flash] type 'flash' to overwrite the device firmware");
    }
    out
}

fn render(event: &UiEvent) -> String {
    match event {
        UiEvent::Status(view) => render_status(view),
        UiEvent::FirmwarePanel(view) => render_panel(view),
    }
}

/// Print controller events until the controller goes away
pub async fn print_events(mut events: broadcast::Receiver<UiEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => print!("{}", render(&event)),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "Console fell behind controller events");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Forward one command to the controller. Returns `false` on quit.
pub fn dispatch(handle: &WizardHandle, command: ConsoleCommand) -> Result<bool> {
    match command {
        ConsoleCommand::Convert => handle.start_conversion()?,
        ConsoleCommand::Cancel => handle.cancel_conversion()?,
        ConsoleCommand::Flash => handle.start_flash()?,
        ConsoleCommand::Firmware => handle.show_firmware_panel()?,
        ConsoleCommand::Source(source) => handle.select_firmware_source(source)?,
        ConsoleCommand::Url(address) => handle.fetch_firmware_url(address)?,
        ConsoleCommand::Upload(path) => handle.upload_firmware(path)?,
        ConsoleCommand::Help => println!("{}", HELP),
        ConsoleCommand::Quit => return Ok(false),
    }
    Ok(true)
}

/// Read commands from stdin until `quit` or end of input
pub async fn read_commands(handle: WizardHandle) -> Result<()> {
    println!("{}", HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match line.parse::<ConsoleCommand>() {
            Ok(command) => {
                debug!(command = ?command, "Console command");
                if !dispatch(&handle, command)? {
                    break;
                }
            }
            Err(e) => println!("{} ({})", e, HELP),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tcwizard_core::{StateParams, ValidationVerdict, WorkflowState};

    #[test]
    fn test_parse_commands() {
        assert_eq!("convert".parse::<ConsoleCommand>(), Ok(ConsoleCommand::Convert));
        assert_eq!("  flash ".parse::<ConsoleCommand>(), Ok(ConsoleCommand::Flash));
        assert_eq!(
            "source upload".parse::<ConsoleCommand>(),
            Ok(ConsoleCommand::Source(FirmwareSource::Upload))
        );
        assert_eq!(
            "url http://example.com/fw.bin".parse::<ConsoleCommand>(),
            Ok(ConsoleCommand::Url("http://example.com/fw.bin".to_string()))
        );
        assert_eq!(
            "upload /tmp/my firmware.bin".parse::<ConsoleCommand>(),
            Ok(ConsoleCommand::Upload(PathBuf::from("/tmp/my firmware.bin")))
        );
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!("url".parse::<ConsoleCommand>().is_err());
        assert!("source ftp".parse::<ConsoleCommand>().is_err());
        assert!("convert now".parse::<ConsoleCommand>().is_err());
        assert!("reboot".parse::<ConsoleCommand>().is_err());
    }

    #[test]
    fn test_render_converted_status() {
        let params = StateParams::new()
            .with("flash_freq", 40)
            .with("flash_mode", "DOUT")
            .with("flash_size", 1048576);
        let text = render_status(&WorkflowState::Converted.view(&params));

        assert!(text.starts_with("== CONVERTED =="));
        assert!(text.contains("  Flash mode: DOUT\n"));
        assert!(text.contains("  Flash size: 1024 KB\n"));
        assert!(text.contains("original.bin </firmware/original.bin>"));
        assert!(text.contains("  [Flash Firmware]\n"));
    }

    #[test]
    fn test_render_spinning_status() {
        let text = render_status(&WorkflowState::Loading.view(&StateParams::message("Loading...")));
        assert_eq!(text, "== loading ... ==\n  Loading...\n");
    }

    #[test]
    fn test_render_panel() {
        let closed = FirmwarePanelView {
            visible: false,
            source: FirmwareSource::Url,
            url: String::new(),
            details: FirmwareDetails::Hidden,
            point_of_no_return: false,
        };
        assert_eq!(render_panel(&closed), "-- firmware panel closed --\n");

        let armed = FirmwarePanelView {
            visible: true,
            source: FirmwareSource::Url,
            url: "http://example.com/fw.bin".to_string(),
            details: FirmwareDetails::Verdict(ValidationVerdict {
                valid: true,
                message: "firmware is valid".to_string(),
                size_in_bytes: Some(4096),
            }),
            point_of_no_return: true,
        };
        let text = render_panel(&armed);
        assert!(text.contains("url: http://example.com/fw.bin"));
        assert!(text.contains("ok: firmware is valid (4096 bytes)"));
        assert!(text.contains("[Flash]"));
    }
}
