//! Screen Handoff
//!
//! This example shows the two transition orderings side by side. A shop and
//! an inventory screen occupy different halves of the display, so switching
//! between them overlaps the fade-out of one with the fade-in of the other.
//! The game machine waits for the UI to settle before starting a match.
//!
//! Key concepts:
//! - Overlapped ordering for screens that do not share space
//! - Exit-first ordering for screens that do
//! - `wait_until_idle` to coordinate two machines
//! - Transition history for inspecting the path taken
//!
//! Run with: RUST_LOG=debug cargo run --example screen_handoff

use async_trait::async_trait;
use flowstate::core::TransitionOptions;
use flowstate::{
    state_ids, AsyncStateMachine, Enterable, Exitable, HookError, MachineConfig, StateHandle,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing_subscriber::EnvFilter;

state_ids! {
    enum Panel {
        Shop,
        Inventory,
        Briefing,
    }
}

state_ids! {
    enum Mode {
        Lobby,
        Match,
    }
}

struct Fade {
    label: &'static str,
    fade_in: Duration,
    fade_out: Duration,
    started: Instant,
}

impl Fade {
    fn stamp(&self, event: &str) {
        println!(
            "  [{:>4}ms] {} {}",
            self.started.elapsed().as_millis(),
            self.label,
            event
        );
    }
}

#[async_trait]
impl Enterable for Fade {
    async fn on_enter(&self) -> Result<(), HookError> {
        self.stamp("fading in");
        sleep(self.fade_in).await;
        self.stamp("visible");
        Ok(())
    }
}

#[async_trait]
impl Exitable for Fade {
    async fn on_exit(&self) -> Result<(), HookError> {
        self.stamp("fading out");
        sleep(self.fade_out).await;
        self.stamp("hidden");
        Ok(())
    }
}

struct MatchStart {
    ui: Arc<AsyncStateMachine<Panel>>,
}

#[async_trait]
impl Enterable for MatchStart {
    async fn on_enter(&self) -> Result<(), HookError> {
        if self.ui.is_transitioning() {
            println!("  [game] waiting for the UI to settle");
        }
        self.ui.wait_until_idle().await;
        self.ui
            .enter_state(Panel::Briefing)
            .await
            .map_err(|err| HookError::with_source("briefing", err))?;
        println!("  [game] match started");
        Ok(())
    }
}

struct LobbyMode;

#[async_trait]
impl Exitable for LobbyMode {
    async fn on_exit(&self) -> Result<(), HookError> {
        println!("  [game] leaving lobby");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Screen Handoff Example ===\n");

    let started = Instant::now();
    let panel = |label, fade_in, fade_out| {
        StateHandle::full(Arc::new(Fade {
            label,
            fade_in: Duration::from_millis(fade_in),
            fade_out: Duration::from_millis(fade_out),
            started,
        }))
    };

    let ui = Arc::new(AsyncStateMachine::with_config(MachineConfig::named("ui")));
    ui.initialize_with(|registry| {
        registry.register(Panel::Shop, panel("Shop", 100, 250))?;
        registry.register(Panel::Inventory, panel("Inventory", 100, 250))?;
        registry.register(Panel::Briefing, panel("Briefing", 150, 100))
    })?;

    let game = AsyncStateMachine::with_config(MachineConfig::named("game"));
    let match_ui = ui.clone();
    game.initialize_with(|registry| {
        registry.register(Mode::Lobby, StateHandle::exitable(Arc::new(LobbyMode)))?;
        registry.register(
            Mode::Match,
            StateHandle::enterable(Arc::new(MatchStart { ui: match_ui })),
        )
    })?;

    println!("1. Lobby opens on the shop");
    game.enter_state(Mode::Lobby).await?;
    ui.enter_state(Panel::Shop).await?;

    println!("\n2. Shop to inventory, overlapped (inventory shows before shop hides)");
    ui.enter_state_with(Panel::Inventory, TransitionOptions::new().overlapped())
        .await?;

    println!("\n3. Inventory back to shop in the background, then start a match");
    let handoff = ui.enter_detached(Panel::Shop, TransitionOptions::new().overlapped());
    sleep(Duration::from_millis(20)).await;
    game.enter_state(Mode::Match).await?;
    handoff.await?;

    println!("\nUI path:");
    for record in ui.history().records() {
        println!("  {:?} -> {:?} ({:?})", record.from, record.to, record.ordering);
    }

    println!("\n=== Example Complete ===");
    Ok(())
}
