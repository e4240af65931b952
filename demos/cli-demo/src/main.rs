//! Terminal demo host for the capflow permission flow
//!
//! Plays the role of the OS: the oracle is an in-memory script, the
//! "OS prompt" is a y/n question per capability, and the settings screen is
//! simulated by waiting for the user to press enter.

use std::io::{self, BufRead, Write};

use capflow_api::{CapabilityRequest, CapabilityStatus, GrantResults, Outcome};
use capflow_host::flow::{
    FlowHostBuilder, FlowStep, MemoryOracle, PermissionFlow, RecordingSettingsGateway,
    TerminalDialogHandler,
};

fn ask(question: &str) -> bool {
    print!("{} [y/n]: ", question);
    io::stdout().flush().expect("flush stdout");
    let mut input = String::new();
    io::stdin()
        .lock()
        .read_line(&mut input)
        .expect("read stdin");
    matches!(input.trim().to_lowercase().as_str(), "y" | "yes")
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let oracle = MemoryOracle::new();
    oracle.set_status("demo.location", CapabilityStatus::DeniedCanAskAgain);
    oracle.set_status("demo.storage", CapabilityStatus::DeniedCanAskAgain);
    oracle.set_rationale("demo.location", true);

    let host = FlowHostBuilder::new()
        .oracle(oracle)
        .dialogs(TerminalDialogHandler::new())
        .settings(RecordingSettingsGateway::new())
        .build()
        .expect("oracle is set");

    let request = CapabilityRequest::new(
        ["demo.location", "demo.storage"],
        "This demo uses location and storage to show the request flow.",
        "Grant location and storage from the system settings screen.",
    )
    .expect("messages are non-empty");

    let (mut flow, outcome) = PermissionFlow::start(request, host);

    let mut step = flow.on_session_start(false);
    loop {
        match step {
            FlowStep::RequestOsPrompt(capabilities) => {
                println!("\n-- OS permission prompt --");
                let mut results = GrantResults::new();
                for capability in &capabilities {
                    results.push(capability, ask(&format!("Grant '{}'?", capability)));
                }
                step = flow.on_os_prompt_result(results);
            }
            FlowStep::SettingsOpened => {
                println!("\n-- settings screen (simulated) --");
                println!("Press enter to come back to the app.");
                let mut input = String::new();
                io::stdin().lock().read_line(&mut input).expect("read stdin");
                step = flow.on_foreground_regained();
            }
            FlowStep::Finished(outcome) => {
                match outcome {
                    Outcome::AllGranted => println!("\nAll capabilities granted."),
                    Outcome::SomeDenied => println!("\nSome capabilities were denied."),
                }
                break;
            }
            FlowStep::Pending => break,
        }
    }

    if let Some(outcome) = outcome.blocking_recv() {
        println!("delivered outcome: {:?}", outcome);
    }
}
