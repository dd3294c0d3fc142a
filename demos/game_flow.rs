//! Game Flow
//!
//! This example wires two independent machines: one for the top-level game
//! flow and one for UI screens. Game states drive the UI machine from their
//! hooks, and the menu waits for the UI to settle before leaving.
//!
//! Key concepts:
//! - State identities declared with `state_ids!`
//! - Lazily created singleton states through `StateFactory`
//! - Exit-first versus overlapped transitions
//! - Detached navigation from a click handler
//!
//! Run with: RUST_LOG=debug cargo run --example game_flow

use async_trait::async_trait;
use flowstate::core::TransitionOptions;
use flowstate::{
    state_ids, AsyncStateMachine, Enterable, Exitable, HookError, MachineConfig, StateFactory,
    StateHandle,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing_subscriber::EnvFilter;

state_ids! {
    enum Game {
        Boot,
        MainMenu,
        Gameplay,
    }
}

state_ids! {
    enum Ui {
        Loading,
        MainMenu,
        Settings,
        Hud,
    }
}

/// A UI screen that fades in and out over a fixed duration.
struct FadingScreen {
    title: &'static str,
    fade: Duration,
}

#[async_trait]
impl Enterable for FadingScreen {
    async fn on_enter(&self) -> Result<(), HookError> {
        println!("  [ui] {} fading in", self.title);
        sleep(self.fade).await;
        Ok(())
    }
}

#[async_trait]
impl Exitable for FadingScreen {
    async fn on_exit(&self) -> Result<(), HookError> {
        println!("  [ui] {} fading out", self.title);
        sleep(self.fade).await;
        Ok(())
    }
}

struct BootFlow {
    ui: Arc<AsyncStateMachine<Ui>>,
}

#[async_trait]
impl Enterable for BootFlow {
    async fn on_enter(&self) -> Result<(), HookError> {
        println!("  [game] loading assets");
        self.ui
            .enter_state(Ui::Loading)
            .await
            .map_err(|err| HookError::with_source("loading screen", err))?;
        sleep(Duration::from_millis(200)).await;
        Ok(())
    }
}

struct MenuFlow {
    ui: Arc<AsyncStateMachine<Ui>>,
}

#[async_trait]
impl Enterable for MenuFlow {
    async fn on_enter(&self) -> Result<(), HookError> {
        self.ui
            .enter_state_with(Ui::MainMenu, TransitionOptions::new().overlapped())
            .await
            .map_err(|err| HookError::with_source("main menu", err))?;
        Ok(())
    }
}

#[async_trait]
impl Exitable for MenuFlow {
    async fn on_exit(&self) -> Result<(), HookError> {
        self.ui.wait_until_idle().await;
        Ok(())
    }
}

struct GameplayFlow {
    ui: Arc<AsyncStateMachine<Ui>>,
}

#[async_trait]
impl Enterable for GameplayFlow {
    async fn on_enter(&self) -> Result<(), HookError> {
        println!("  [game] match started");
        self.ui
            .enter_state(Ui::Hud)
            .await
            .map_err(|err| HookError::with_source("hud", err))?;
        Ok(())
    }
}

fn screen(title: &'static str, millis: u64) -> StateHandle {
    StateHandle::full(Arc::new(FadingScreen {
        title,
        fade: Duration::from_millis(millis),
    }))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Game Flow Example ===\n");

    let ui = Arc::new(AsyncStateMachine::with_config(MachineConfig::named("ui")));
    let mut screens = StateFactory::new()
        .bind(Ui::Loading, || screen("Loading", 300))
        .bind(Ui::MainMenu, || screen("Main menu", 150))
        .bind(Ui::Settings, || screen("Settings", 100))
        .bind(Ui::Hud, || screen("HUD", 50));
    ui.initialize_from(
        &mut screens,
        [Ui::Loading, Ui::MainMenu, Ui::Settings, Ui::Hud],
    )?;

    let game = AsyncStateMachine::with_config(MachineConfig::named("game"));
    let (boot_ui, menu_ui, play_ui) = (ui.clone(), ui.clone(), ui.clone());
    let mut flows = StateFactory::new()
        .bind(Game::Boot, move || {
            StateHandle::enterable(Arc::new(BootFlow { ui: boot_ui.clone() }))
        })
        .bind(Game::MainMenu, move || {
            StateHandle::full(Arc::new(MenuFlow { ui: menu_ui.clone() }))
        })
        .bind(Game::Gameplay, move || {
            StateHandle::enterable(Arc::new(GameplayFlow { ui: play_ui.clone() }))
        });
    game.initialize_from(&mut flows, [Game::Boot, Game::MainMenu, Game::Gameplay])?;

    println!("1. Boot");
    game.enter_state(Game::Boot).await?;

    println!("\n2. Main menu (loading screen fades out in the background)");
    game.enter_state(Game::MainMenu).await?;

    println!("\n3. Settings clicked twice without waiting");
    let first = ui.enter_detached(Ui::Settings, TransitionOptions::new());
    let second = ui.enter_detached(Ui::Settings, TransitionOptions::new());
    first.await?;
    second.await?;
    ui.wait_until_idle().await;

    println!("\n4. Gameplay");
    game.enter_state(Game::Gameplay).await?;

    println!("\nUI path:");
    for id in ui.history().get_path() {
        println!("  -> {id:?}");
    }

    println!("\n=== Example Complete ===");
    Ok(())
}
