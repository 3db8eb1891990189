//! Interactive session and single-shot answers.

use ctxeng_agent::Orchestrator;
use ctxeng_config::{AgentConfig, AppConfig};
use ctxeng_core::session::ShortTermMemory;
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::debug;

use super::{GraphChoice, build_orchestrator};

pub async fn run(
    graph: Option<GraphChoice>,
    document: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    let orchestrator = build_orchestrator(&config, graph, document)?;

    println!("ctxeng — interactive session");
    println!(
        "   Provider: {} | Model: {}",
        config.provider.kind, config.provider.model
    );
    if let Some(choice) = graph {
        println!("   Graph: {choice:?}");
    }
    println!(
        "   Type {} to end the session.",
        config.agent.exit_sentinels.join(" / ")
    );
    println!();

    let mut events = orchestrator.events().subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => debug!(event = event.name(), "Domain event"),
                Err(RecvError::Lagged(skipped)) => debug!(skipped, "Event log lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    let memory = run_session(&orchestrator, &config.agent, stdin, &mut stdout).await?;

    println!("Sessão encerrada ({} turnos).", memory.len());
    Ok(())
}

pub async fn ask(
    message: &str,
    graph: Option<GraphChoice>,
    document: Option<PathBuf>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    let orchestrator = build_orchestrator(&config, graph, document)?;

    let mut memory = ShortTermMemory::new();
    let outcome = orchestrator.handle_turn(&mut memory, message).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        println!("{}", outcome.response);
    }
    Ok(())
}

/// Prints the recent turns instead of starting a new one.
const HISTORY_COMMAND: &str = "/history";

/// Drive one session: one line per turn until an exit sentinel or EOF.
///
/// Blank lines and `/history` are not turns. A fatal orchestration error
/// ends the session and is returned.
pub async fn run_session<R, W>(
    orchestrator: &Orchestrator,
    agent: &AgentConfig,
    reader: R,
    out: &mut W,
) -> Result<ShortTermMemory, Box<dyn std::error::Error>>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut memory = ShortTermMemory::new();
    let mut lines = reader.lines();

    loop {
        write!(out, "Você: ")?;
        out.flush()?;

        let Some(line) = lines.next_line().await? else {
            writeln!(out)?;
            break;
        };
        let input = line.trim();
        if agent.is_exit(input) {
            break;
        }
        if input.is_empty() {
            continue;
        }
        if input == HISTORY_COMMAND {
            writeln!(out, "{}\n", memory.render(agent.context_window))?;
            continue;
        }

        let outcome = orchestrator.handle_turn(&mut memory, input).await?;
        writeln!(out, "Agente: {}", outcome.response)?;
        if let Some(key) = &outcome.remembered {
            writeln!(out, "Fato adicionado à memória de longo prazo (chave: {key}).")?;
        }
        writeln!(out)?;
    }

    Ok(memory)
}
