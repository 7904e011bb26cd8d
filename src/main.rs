use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};

use circl_tutorial::config::TutorialConfig;
use circl_tutorial::store::{LibSqlBackend, SettingsStore};
use circl_tutorial::tutorial::{
    FlowFactory, LaunchGate, OnboardingAnswers, Persona, PrimaryControl, ProgressReader,
    ProgressRecorder, TabNavigator, TutorialController, detect_persona,
};

const HELP: &str = "\
Commands:
  n            next step
  p            previous step
  b            tap the backdrop
  s            skip the tutorial
  c            complete the tutorial
  r [persona]  restart (defaults to the detected persona)
  onboard <usage interests> [| <industry interests>]
               finish onboarding; the tutorial starts on next launch
  reset [persona]
               clear every tutorial flag, or one persona's
  status       show the current state
  q            quit";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = TutorialConfig::from_env().context("invalid tutorial configuration")?;

    eprintln!("Circl tutorial v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Database: {}", config.db_path.display());
    eprintln!("   User: {}", config.user_id);
    eprintln!("   Type 'help' for commands.\n");

    // ── Database ─────────────────────────────────────────────────────────
    let store: Arc<dyn SettingsStore> = Arc::new(
        LibSqlBackend::new_local(&config.db_path)
            .await
            .with_context(|| format!("failed to open database at {}", config.db_path.display()))?,
    );

    // ── Tutorial engine ──────────────────────────────────────────────────
    let (recorder, writer) = ProgressRecorder::spawn(Arc::clone(&store), config.user_id.clone());
    let reader = ProgressReader::new(Arc::clone(&store), config.user_id.clone());
    let navigator = Arc::new(TabNavigator::new());
    let factory = FlowFactory::builtin().context("failed to load tutorial content")?;
    let mut controller = TutorialController::new(factory, navigator.clone(), recorder.clone());

    // Log every published snapshot, as an overlay renderer would consume them.
    let mut snapshots = controller.subscribe();
    tokio::spawn(async move {
        while snapshots.changed().await.is_ok() {
            let snap = snapshots.borrow_and_update().clone();
            tracing::debug!(
                phase = %snap.phase,
                step = snap.step_index,
                steps = snap.step_count,
                "Snapshot published"
            );
        }
    });

    if let Some(persona) = LaunchGate::new(reader.clone()).resolve().await {
        eprintln!("Starting the {} tutorial...", persona.display_name());
        tokio::time::sleep(config.autostart_delay).await;
        controller.start(persona);
        render(&controller, &navigator);
    }

    let stdin = tokio::io::stdin();
    let mut lines = BufReader::new(stdin).lines();
    eprint!("> ");

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();

        match command {
            "" => {}
            "n" => {
                controller.next();
                render(&controller, &navigator);
            }
            "p" => {
                controller.previous();
                render(&controller, &navigator);
            }
            "b" => {
                controller.backdrop_tap();
                render(&controller, &navigator);
            }
            "s" => {
                controller.skip();
                render(&controller, &navigator);
            }
            "c" => {
                controller.complete();
                render(&controller, &navigator);
            }
            "r" => {
                let persona = if rest.is_empty() {
                    reader
                        .detected_persona()
                        .await?
                        .unwrap_or(Persona::CommunityBuilder)
                } else {
                    match rest.parse::<Persona>() {
                        Ok(p) => p,
                        Err(e) => {
                            eprintln!("{e}");
                            eprint!("> ");
                            continue;
                        }
                    }
                };
                controller.restart(persona);
                render(&controller, &navigator);
            }
            "onboard" => {
                let (usage, industry) = rest.split_once('|').unwrap_or((rest, ""));
                let persona = detect_persona(&OnboardingAnswers::new(usage.trim(), industry.trim()));
                reader.record_onboarding(persona).await?;
                println!(
                    "Onboarding recorded as {}. Restart to see the tutorial.",
                    persona.display_name()
                );
            }
            "reset" => {
                if rest.is_empty() {
                    recorder.clear_all();
                } else {
                    match rest.parse::<Persona>() {
                        Ok(p) => recorder.clear_completed(p),
                        Err(e) => {
                            eprintln!("{e}");
                            eprint!("> ");
                            continue;
                        }
                    }
                }
                recorder.flush().await;
                println!("Tutorial flags cleared.");
            }
            "status" => {
                let snap = controller.snapshot();
                println!("{}", serde_json::to_string_pretty(&snap)?);
                for persona in Persona::ALL {
                    println!(
                        "  {:<22} {}",
                        persona.display_name(),
                        if reader.has_completed(persona).await? { "seen" } else { "-" }
                    );
                }
            }
            "help" | "?" => println!("{HELP}"),
            "q" | "quit" | "/quit" => break,
            other => eprintln!("Unknown command '{other}'. Type 'help'."),
        }
        eprint!("> ");
    }

    // Let queued completion writes land before exiting.
    recorder.flush().await;
    drop(controller);
    drop(recorder);
    writer.await?;
    Ok(())
}

fn render(controller: &TutorialController, navigator: &TabNavigator) {
    let Some(view) = controller.overlay() else {
        println!("[tutorial closed] screen: {}", navigator.selected_screen());
        return;
    };

    println!();
    println!(
        "── {} ── {} ({}%) ── screen: {}",
        view.counter(),
        view.step.short_description,
        view.progress_percent,
        navigator.selected_screen()
    );
    println!("{}", view.step.title);
    println!("{}", view.step.message);
    if let Some(rect) = view.cutout {
        println!(
            "  highlight {:.0}x{:.0} at ({:.0}, {:.0}), tooltip {:?}",
            rect.width, rect.height, rect.x, rect.y, view.step.tooltip_placement
        );
    }

    let mut controls = Vec::new();
    if view.show_previous {
        controls.push("[p] Previous");
    }
    controls.push(match view.primary {
        PrimaryControl::Complete => "[n] Complete",
        PrimaryControl::Next => "[n] Next",
    });
    if view.backdrop_advances {
        controls.push("[b] tap anywhere");
    }
    controls.push("[s] Skip");
    println!("{}", controls.join("  "));
}
