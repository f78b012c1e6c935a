use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use client_core::{
    config::load_settings, AppState, Dispatcher, HttpResourceApi, Navigator, Notifier,
    NotifyLevel,
};
use shared::{
    domain::{JobId, PortSide, ServiceId, VolumeId},
    protocol::DispatchEvent,
};
use tokio::sync::mpsc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "gefctl", about = "Drive the GEF resource API and print state events")]
struct Cli {
    /// Settings file (defaults to ./gef.toml when present).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Overrides the configured API base URL.
    #[arg(long)]
    api_base: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(subcommand)]
    Services(ServicesCommand),
    #[command(subcommand)]
    Jobs(JobsCommand),
    #[command(subcommand)]
    Volumes(VolumesCommand),
    /// Fetch the current user record.
    User,
}

#[derive(Subcommand, Debug)]
enum ServicesCommand {
    List,
    Show {
        id: String,
    },
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        version: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    AddPort {
        id: String,
        #[command(flatten)]
        port: PortArgs,
    },
    RemovePort {
        id: String,
        #[arg(long, value_enum)]
        side: Side,
        index: usize,
    },
}

#[derive(Args, Debug)]
struct PortArgs {
    #[arg(long, value_enum)]
    side: Side,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    path: Option<String>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Side {
    Input,
    Output,
}

impl From<Side> for PortSide {
    fn from(value: Side) -> Self {
        match value {
            Side::Input => PortSide::Input,
            Side::Output => PortSide::Output,
        }
    }
}

#[derive(Subcommand, Debug)]
enum JobsCommand {
    List,
    Submit {
        service_id: String,
        /// Submitted form field, repeatable.
        #[arg(long = "field", value_parser = parse_field)]
        fields: Vec<(String, String)>,
    },
    Remove {
        id: String,
    },
    /// Console output of a job; without an ID nothing is requested.
    Output {
        id: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum VolumesCommand {
    List,
    /// Volume content listing; without an ID nothing is requested.
    Inspect {
        id: Option<String>,
    },
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got {raw:?}")),
    }
}

struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, level: NotifyLevel, message: &str) {
        match level {
            NotifyLevel::Info => eprintln!("info: {message}"),
            NotifyLevel::Error => eprintln!("error: {message}"),
        }
    }
}

struct ConsoleNavigator;

impl Navigator for ConsoleNavigator {
    fn navigate(&self, location: &str) {
        println!("location: {location}");
    }
}

/// Dispatcher plus a locally reduced store; events are applied and printed
/// after every operation.
struct Session {
    dispatcher: Dispatcher,
    events: mpsc::UnboundedReceiver<DispatchEvent>,
    state: AppState,
    failed: bool,
}

impl Session {
    fn pump(&mut self) -> Result<()> {
        while let Ok(event) = self.events.try_recv() {
            self.failed |= event.error().is_some();
            self.state.apply(&event);
            println!("{}", serde_json::to_string(&event)?);
        }
        Ok(())
    }

    async fn select_service(&mut self, id: &str) -> Result<()> {
        self.dispatcher.fetch_service(&ServiceId::from(id)).await;
        self.pump()?;
        if self.state.selected_service.is_none() {
            bail!("service {id} could not be loaded");
        }
        debug!(service_id = id, "gefctl: service selected");
        Ok(())
    }

    async fn run(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Services(command) => self.run_services(command).await?,
            Command::Jobs(command) => self.run_jobs(command).await?,
            Command::Volumes(VolumesCommand::List) => self.dispatcher.fetch_volumes().await,
            Command::Volumes(VolumesCommand::Inspect { id }) => {
                let id = id.map(VolumeId::from);
                self.dispatcher.inspect_volume(id.as_ref()).await
            }
            Command::User => self.dispatcher.fetch_user().await,
        }
        self.pump()
    }

    async fn run_services(&mut self, command: ServicesCommand) -> Result<()> {
        match command {
            ServicesCommand::List => self.dispatcher.fetch_services().await,
            ServicesCommand::Show { id } => {
                self.dispatcher.fetch_service(&ServiceId::from(id)).await
            }
            ServicesCommand::Update {
                id,
                name,
                version,
                description,
            } => {
                self.dispatcher.fetch_services().await;
                self.select_service(&id).await?;
                let edit = &mut self.state.service_edit;
                edit.service_name = name;
                edit.service_version = version;
                edit.service_description = description;
                let snapshot = self.state.snapshot();
                self.dispatcher.update_service(&snapshot).await;
            }
            ServicesCommand::AddPort { id, port } => {
                self.select_service(&id).await?;
                let edit = &mut self.state.service_edit;
                match port.side {
                    Side::Input => {
                        edit.input_source_name = port.name;
                        edit.input_source_path = port.path;
                    }
                    Side::Output => {
                        edit.output_source_name = port.name;
                        edit.output_source_path = port.path;
                    }
                }
                let snapshot = self.state.snapshot();
                self.dispatcher
                    .add_io_port(&snapshot, port.side.into())
                    .await;
            }
            ServicesCommand::RemovePort { id, side, index } => {
                self.select_service(&id).await?;
                let snapshot = self.state.snapshot();
                self.dispatcher
                    .remove_io_port(&snapshot, side.into(), index)
                    .await;
            }
        }
        Ok(())
    }

    async fn run_jobs(&mut self, command: JobsCommand) -> Result<()> {
        match command {
            JobsCommand::List => self.dispatcher.fetch_jobs().await,
            JobsCommand::Submit { service_id, fields } => {
                self.select_service(&service_id).await?;
                for (key, value) in fields {
                    self.state.job_creator.set(key, value);
                }
                let snapshot = self.state.snapshot();
                self.dispatcher.submit_job(&snapshot).await;
            }
            JobsCommand::Remove { id } => self.dispatcher.remove_job(&JobId::from(id)).await,
            JobsCommand::Output { id } => {
                let id = id.map(JobId::from);
                self.dispatcher.fetch_job_output(id.as_ref()).await
            }
        }
        Ok(())
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut settings = load_settings(cli.config.as_deref());
    if let Some(api_base) = cli.api_base {
        settings.api_base = api_base;
    }
    settings.validate().context("invalid client settings")?;

    let api = HttpResourceApi::new(&settings.api_base)
        .with_context(|| format!("failed to build client for {}", settings.api_base))?;
    let dispatcher = Dispatcher::new_with_dependencies(
        Arc::new(api),
        Arc::new(ConsoleNotifier),
        Arc::new(ConsoleNavigator),
        settings.event_buffer,
    );
    let events = dispatcher.subscribe_ordered();
    let mut session = Session {
        dispatcher,
        events,
        state: AppState::default(),
        failed: false,
    };

    session.run(cli.command).await?;
    if session.failed {
        bail!("operation finished with an error event");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_key_value_fields() {
        assert_eq!(
            parse_field("input0=https://example.org/a=b"),
            Ok(("input0".to_string(), "https://example.org/a=b".to_string()))
        );
        assert!(parse_field("novalue").is_err());
        assert!(parse_field("=value").is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_remove_port_command() {
        let cli = Cli::parse_from([
            "gefctl",
            "--api-base",
            "http://gef.local/api",
            "services",
            "remove-port",
            "svc-1",
            "--side",
            "output",
            "2",
        ]);
        assert_eq!(cli.api_base.as_deref(), Some("http://gef.local/api"));
        assert!(matches!(
            cli.command,
            Command::Services(ServicesCommand::RemovePort {
                side: Side::Output,
                index: 2,
                ..
            })
        ));
    }
}
