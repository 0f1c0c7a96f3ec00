use bbacl::cli::Cli;
use bbacl::{
    init_subscriber_with_config, AppState, CliResult, IntoResponse, Settings, State,
    TerminalSelectionPrompt,
};
use clap::Parser;

/// Conventional exit status for SIGINT
const INTERRUPTED: i32 = 130;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_subscriber_with_config(cli.tracing_config());

    // Prompts block on stdin, so the watcher runs as its own task.
    tokio::spawn(async {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted; requests already sent are not rolled back");
            eprintln!("Interrupted");
            std::process::exit(INTERRUPTED);
        }
    });

    let response = match build_state(&cli) {
        Ok(state) => cli.command.execute(state).await,
        Err(e) => Err::<(), _>(e).into_response(),
    };

    if !response.output.is_empty() {
        if response.is_success() {
            println!("{}", response.output);
        } else {
            eprintln!("{}", response.output);
        }
    }
    std::process::exit(response.exit_code);
}

fn build_state(cli: &Cli) -> CliResult<State<AppState>> {
    let settings = Settings::load(cli.config.as_deref())?.with_overrides(cli.overrides());
    let state = AppState::from_settings(&settings, Box::new(TerminalSelectionPrompt::new()))?;
    Ok(State::new(state))
}
