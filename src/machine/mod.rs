//! Asynchronous state machine driving enter/exit hooks.
//!
//! The machine holds the currently active state and sequences the exit hook
//! of the outgoing state against the enter hook of the incoming one. It is
//! shareable behind an `Arc`; all bookkeeping happens under a short-lived
//! lock that is never held across an `.await`, so hooks run freely.
//!
//! # Key behaviours
//!
//! - **Short-circuit**: entering the state that is already current is a
//!   no-op unless the call forces it.
//! - **Early commit**: the target becomes current before any hook runs, so a
//!   second call for the same target issued mid-transition is skipped.
//! - **Ordering**: [`ExitOrdering::ExitFirst`] finishes the exit before the
//!   enter starts; [`ExitOrdering::Overlapped`] runs both together.
//! - **Transitioning flag**: tracked with a drop guard, so it clears on
//!   success, hook failure, or when the transition future is dropped.

mod error;

pub use error::{HookPhase, MachineError};

use crate::config::MachineConfig;
use crate::core::{
    Enterable, ExitOrdering, Exitable, Identified, StateHandle, StateId, TransitionHistory,
    TransitionOptions, TransitionRecord,
};
use crate::registry::{RegistryError, StateRegistry, StateResolver};
use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use stillwater::validation::Validation;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Result of a successful `enter_state` call
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnterOutcome {
    /// Hooks ran and the target is now current
    Entered,

    /// The target was already current; nothing ran
    AlreadyCurrent,
}

/// Populates a machine's registry. Runs exactly once per machine.
///
/// Implemented for closures taking the registry, and by
/// [`ResolvedStates`] for the common "resolve this list of identities" case.
pub trait Initializer<I: StateId> {
    fn initialize(self, registry: &mut StateRegistry<I>) -> Result<(), Vec<RegistryError>>;
}

impl<I, F> Initializer<I> for F
where
    I: StateId,
    F: FnOnce(&mut StateRegistry<I>) -> Result<(), RegistryError>,
{
    fn initialize(self, registry: &mut StateRegistry<I>) -> Result<(), Vec<RegistryError>> {
        self(registry).map_err(|err| vec![err])
    }
}

/// Registers every listed identity through a resolver, reporting all
/// failures together.
pub struct ResolvedStates<'r, R: ?Sized, It> {
    resolver: &'r mut R,
    ids: It,
}

impl<'r, R: ?Sized, It> ResolvedStates<'r, R, It> {
    pub fn new(resolver: &'r mut R, ids: It) -> Self {
        Self { resolver, ids }
    }
}

impl<I, R, It> Initializer<I> for ResolvedStates<'_, R, It>
where
    I: StateId,
    R: StateResolver<I> + ?Sized,
    It: IntoIterator<Item = I>,
{
    fn initialize(self, registry: &mut StateRegistry<I>) -> Result<(), Vec<RegistryError>> {
        match registry.register_all(self.resolver, self.ids) {
            Validation::Success(_) => Ok(()),
            Validation::Failure(errors) => Err(errors.iter().cloned().collect()),
        }
    }
}

struct Current<I> {
    id: I,
    handle: StateHandle,
}

struct Slot<I> {
    current: Option<Current<I>>,
    history: TransitionHistory<I>,
}

/// Keeps the in-flight counter raised for as long as it lives.
struct InFlight<'a> {
    counter: &'a watch::Sender<usize>,
}

impl<'a> InFlight<'a> {
    fn begin(counter: &'a watch::Sender<usize>) -> Self {
        counter.send_modify(|count| *count += 1);
        Self { counter }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.counter
            .send_modify(|count| *count = count.saturating_sub(1));
    }
}

/// Generic asynchronous state machine.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use flowstate::core::{Enterable, HookError, StateHandle};
/// use flowstate::machine::{AsyncStateMachine, EnterOutcome};
/// use std::sync::Arc;
///
/// struct Screen;
///
/// #[async_trait]
/// impl Enterable for Screen {
///     async fn on_enter(&self) -> Result<(), HookError> {
///         Ok(())
///     }
/// }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let machine: AsyncStateMachine<&'static str> = AsyncStateMachine::new();
/// machine
///     .initialize_with(|registry| {
///         registry.register("Boot", StateHandle::enterable(Arc::new(Screen)))?;
///         registry.register("Menu", StateHandle::enterable(Arc::new(Screen)))
///     })
///     .unwrap();
///
/// assert_eq!(machine.enter_state("Boot").await.unwrap(), EnterOutcome::Entered);
/// assert_eq!(machine.enter_state("Boot").await.unwrap(), EnterOutcome::AlreadyCurrent);
/// assert_eq!(machine.current_identity(), Some("Boot"));
/// # }
/// ```
pub struct AsyncStateMachine<I: StateId> {
    config: MachineConfig,
    registry: OnceLock<StateRegistry<I>>,
    slot: Mutex<Slot<I>>,
    in_flight: watch::Sender<usize>,
}

impl<I: StateId> AsyncStateMachine<I> {
    /// Create an uninitialized machine with the default configuration.
    pub fn new() -> Self {
        Self::with_config(MachineConfig::default())
    }

    pub fn with_config(config: MachineConfig) -> Self {
        let (in_flight, _) = watch::channel(0);
        let history = TransitionHistory::with_limit(config.history_limit);
        Self {
            config,
            registry: OnceLock::new(),
            slot: Mutex::new(Slot {
                current: None,
                history,
            }),
            in_flight,
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    /// Register every state this machine can enter.
    ///
    /// Must be called exactly once, before the first transition. If the
    /// initializer rejects any state the machine stays uninitialized.
    pub fn initialize<Init>(&self, initializer: Init) -> Result<(), MachineError>
    where
        Init: Initializer<I>,
    {
        if self.registry.get().is_some() {
            return Err(self.already_initialized());
        }

        let mut registry = StateRegistry::new();
        initializer
            .initialize(&mut registry)
            .map_err(|errors| MachineError::Configuration {
                machine: self.config.name.clone(),
                errors,
            })?;

        let count = registry.len();
        self.registry
            .set(registry)
            .map_err(|_| self.already_initialized())?;

        tracing::info!(machine = %self.config.name, states = count, "state machine initialized");
        Ok(())
    }

    /// Initialize from a closure that fills the registry.
    pub fn initialize_with<F>(&self, register: F) -> Result<(), MachineError>
    where
        F: FnOnce(&mut StateRegistry<I>) -> Result<(), RegistryError>,
    {
        self.initialize(register)
    }

    /// Shorthand for initializing from a resolver and a list of identities.
    pub fn initialize_from<R, It>(&self, resolver: &mut R, ids: It) -> Result<(), MachineError>
    where
        R: StateResolver<I> + ?Sized,
        It: IntoIterator<Item = I>,
    {
        self.initialize(ResolvedStates::new(resolver, ids))
    }

    pub fn is_initialized(&self) -> bool {
        self.registry.get().is_some()
    }

    /// Registry populated by [`initialize`](Self::initialize).
    pub fn registry(&self) -> Result<&StateRegistry<I>, MachineError> {
        self.registry
            .get()
            .ok_or_else(|| MachineError::NotInitialized {
                machine: self.config.name.clone(),
            })
    }

    /// Enter `id` using the configured default ordering.
    pub async fn enter_state(&self, id: I) -> Result<EnterOutcome, MachineError> {
        self.enter_state_with(id, self.config.default_options())
            .await
    }

    /// Enter the state identified by type `T`.
    pub async fn enter<T: Identified<I>>(&self) -> Result<EnterOutcome, MachineError> {
        self.enter_state(T::state_id()).await
    }

    /// Enter the state identified by type `T` with explicit options.
    pub async fn enter_with<T: Identified<I>>(
        &self,
        options: TransitionOptions,
    ) -> Result<EnterOutcome, MachineError> {
        self.enter_state_with(T::state_id(), options).await
    }

    /// Transition to `id`.
    ///
    /// Resolves once every applicable hook has finished. A failing hook is
    /// reported to the caller, but the target stays committed as current:
    /// the machine does not roll back to the previous state.
    #[tracing::instrument(
        level = "debug",
        name = "transition",
        skip_all,
        fields(machine = %self.config.name, to = id.name())
    )]
    pub async fn enter_state_with(
        &self,
        id: I,
        options: TransitionOptions,
    ) -> Result<EnterOutcome, MachineError> {
        let registry = self.registry()?;

        let (previous, target, _in_flight) = {
            let mut slot = self.lock_slot();

            let is_current = slot.current.as_ref().is_some_and(|c| c.id == id);
            if is_current && !options.ignore_if_current {
                tracing::debug!("already current, skipping");
                return Ok(EnterOutcome::AlreadyCurrent);
            }

            let target = registry
                .validate_identity(&id)
                .map_err(MachineError::from_lookup)?
                .clone();

            let in_flight = InFlight::begin(&self.in_flight);
            let previous = slot.current.replace(Current {
                id: id.clone(),
                handle: target.clone(),
            });
            slot.history.record(TransitionRecord {
                from: previous.as_ref().map(|p| p.id.clone()),
                to: id.clone(),
                ordering: options.ordering,
                forced: is_current,
                timestamp: Utc::now(),
            });

            tracing::debug!(
                from = previous.as_ref().map(|p| p.id.name()).unwrap_or("<none>"),
                ordering = ?options.ordering,
                "committed"
            );
            (previous, target, in_flight)
        };

        let exit = previous.and_then(|p| p.handle.exit_hook().map(|hook| (p.id, hook)));
        let enter = target.enter_hook();

        let result = match options.ordering {
            ExitOrdering::ExitFirst => match run_exit(exit).await {
                Ok(()) => run_enter(&id, enter).await,
                Err(err) => Err(err),
            },
            ExitOrdering::Overlapped => {
                let (exited, entered) =
                    futures::future::join(run_exit(exit), run_enter(&id, enter)).await;
                entered.and(exited)
            }
        };

        match result {
            Ok(()) => {
                tracing::debug!("transition complete");
                Ok(EnterOutcome::Entered)
            }
            Err(err) => {
                tracing::warn!(error = %err, "transition hook failed");
                Err(err)
            }
        }
    }

    /// Start a transition on the Tokio runtime without awaiting it.
    ///
    /// Errors are logged rather than returned. Must be called from within a
    /// Tokio runtime.
    pub fn enter_detached(self: &Arc<Self>, id: I, options: TransitionOptions) -> JoinHandle<()> {
        let machine = Arc::clone(self);
        tokio::spawn(async move {
            let name = id.name().to_string();
            if let Err(err) = machine.enter_state_with(id, options).await {
                tracing::error!(
                    machine = %machine.config.name,
                    state = %name,
                    error = %err,
                    "detached transition failed"
                );
            }
        })
    }

    /// True while at least one transition is in flight.
    pub fn is_transitioning(&self) -> bool {
        *self.in_flight.borrow() > 0
    }

    /// Identity most recently committed as current.
    pub fn current_identity(&self) -> Option<I> {
        self.lock_slot().current.as_ref().map(|c| c.id.clone())
    }

    /// Snapshot of committed transitions, oldest first.
    pub fn history(&self) -> TransitionHistory<I> {
        self.lock_slot().history.clone()
    }

    /// Wait until no transition is in flight. Returns immediately when the
    /// machine is already idle.
    pub async fn wait_until_idle(&self) {
        let mut idle = self.in_flight.subscribe();
        // The sender lives as long as `self`, so the channel cannot close here.
        let _ = idle.wait_for(|count| *count == 0).await;
    }

    fn lock_slot(&self) -> MutexGuard<'_, Slot<I>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn already_initialized(&self) -> MachineError {
        MachineError::AlreadyInitialized {
            machine: self.config.name.clone(),
        }
    }
}

impl<I: StateId> Default for AsyncStateMachine<I> {
    fn default() -> Self {
        Self::new()
    }
}

async fn run_exit<I: StateId>(exit: Option<(I, Arc<dyn Exitable>)>) -> Result<(), MachineError> {
    let Some((id, hook)) = exit else {
        return Ok(());
    };
    hook.on_exit()
        .await
        .map_err(|source| MachineError::HookFailed {
            id: id.name().to_string(),
            phase: HookPhase::Exit,
            source,
        })
}

async fn run_enter<I: StateId>(
    id: &I,
    enter: Option<Arc<dyn Enterable>>,
) -> Result<(), MachineError> {
    let Some(hook) = enter else {
        return Ok(());
    };
    hook.on_enter()
        .await
        .map_err(|source| MachineError::HookFailed {
            id: id.name().to_string(),
            phase: HookPhase::Enter,
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{HookError, TypeKey};
    use crate::registry::StateFactory;
    use crate::state_ids;
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::time::{sleep, timeout, Instant};

    state_ids! {
        enum Screen {
            Boot,
            Menu,
            Gameplay,
            Settings,
            Broken,
        }
    }

    type Journal = Arc<Mutex<Vec<String>>>;

    /// State that records every hook call into a shared journal.
    struct Recorder {
        name: &'static str,
        journal: Journal,
        enter_delay: Duration,
        exit_delay: Duration,
        fail_enter: bool,
        fail_exit: bool,
    }

    impl Recorder {
        fn new(name: &'static str, journal: &Journal) -> Self {
            Self {
                name,
                journal: journal.clone(),
                enter_delay: Duration::ZERO,
                exit_delay: Duration::ZERO,
                fail_enter: false,
                fail_exit: false,
            }
        }

        fn enter_delay(mut self, millis: u64) -> Self {
            self.enter_delay = Duration::from_millis(millis);
            self
        }

        fn exit_delay(mut self, millis: u64) -> Self {
            self.exit_delay = Duration::from_millis(millis);
            self
        }

        fn failing_enter(mut self) -> Self {
            self.fail_enter = true;
            self
        }

        fn failing_exit(mut self) -> Self {
            self.fail_exit = true;
            self
        }

        fn log(&self, event: &str) {
            self.journal
                .lock()
                .unwrap()
                .push(format!("{event} {}", self.name));
        }

        fn handle(self) -> StateHandle {
            StateHandle::full(Arc::new(self))
        }
    }

    #[async_trait]
    impl Enterable for Recorder {
        async fn on_enter(&self) -> Result<(), HookError> {
            self.log("enter:start");
            sleep(self.enter_delay).await;
            if self.fail_enter {
                return Err(HookError::new(format!("{} refused to enter", self.name)));
            }
            self.log("enter:end");
            Ok(())
        }
    }

    #[async_trait]
    impl Exitable for Recorder {
        async fn on_exit(&self) -> Result<(), HookError> {
            self.log("exit:start");
            sleep(self.exit_delay).await;
            if self.fail_exit {
                return Err(HookError::new(format!("{} refused to exit", self.name)));
            }
            self.log("exit:end");
            Ok(())
        }
    }

    fn entries(journal: &Journal) -> Vec<String> {
        journal.lock().unwrap().clone()
    }

    fn machine_with(states: Vec<(Screen, StateHandle)>) -> AsyncStateMachine<Screen> {
        let machine = AsyncStateMachine::with_config(MachineConfig::named("test"));
        machine
            .initialize_with(|registry| {
                for (id, handle) in states {
                    registry.register(id, handle)?;
                }
                Ok(())
            })
            .unwrap();
        machine
    }

    fn standard_machine(journal: &Journal) -> AsyncStateMachine<Screen> {
        machine_with(vec![
            (Screen::Boot, Recorder::new("Boot", journal).handle()),
            (Screen::Menu, Recorder::new("Menu", journal).handle()),
            (Screen::Gameplay, Recorder::new("Gameplay", journal).handle()),
        ])
    }

    #[tokio::test]
    async fn first_transition_only_enters() {
        let journal = Journal::default();
        let machine = standard_machine(&journal);

        assert_eq!(machine.current_identity(), None);
        let outcome = machine.enter_state(Screen::Boot).await.unwrap();

        assert_eq!(outcome, EnterOutcome::Entered);
        assert_eq!(machine.current_identity(), Some(Screen::Boot));
        assert_eq!(entries(&journal), vec!["enter:start Boot", "enter:end Boot"]);
    }

    #[tokio::test]
    async fn entering_current_state_is_a_no_op() {
        let journal = Journal::default();
        let machine = standard_machine(&journal);
        machine.enter_state(Screen::Menu).await.unwrap();
        journal.lock().unwrap().clear();

        let outcome = machine.enter_state(Screen::Menu).await.unwrap();

        assert_eq!(outcome, EnterOutcome::AlreadyCurrent);
        assert!(entries(&journal).is_empty());
        assert!(!machine.is_transitioning());
        assert_eq!(machine.history().len(), 1);
    }

    #[tokio::test]
    async fn forced_reentry_runs_exit_then_enter() {
        let journal = Journal::default();
        let machine = standard_machine(&journal);
        machine.enter_state(Screen::Menu).await.unwrap();
        journal.lock().unwrap().clear();

        let outcome = machine
            .enter_state_with(Screen::Menu, TransitionOptions::new().force())
            .await
            .unwrap();

        assert_eq!(outcome, EnterOutcome::Entered);
        assert_eq!(
            entries(&journal),
            vec!["exit:start Menu", "exit:end Menu", "enter:start Menu", "enter:end Menu"]
        );
        assert!(machine.history().last().unwrap().forced);
    }

    #[tokio::test(start_paused = true)]
    async fn exit_first_waits_for_exit_before_entering() {
        let journal = Journal::default();
        let machine = machine_with(vec![
            (Screen::Menu, Recorder::new("Menu", &journal).exit_delay(200).handle()),
            (
                Screen::Gameplay,
                Recorder::new("Gameplay", &journal).enter_delay(50).handle(),
            ),
        ]);
        machine.enter_state(Screen::Menu).await.unwrap();
        journal.lock().unwrap().clear();

        let started = Instant::now();
        machine.enter_state(Screen::Gameplay).await.unwrap();

        assert_eq!(
            entries(&journal),
            vec![
                "exit:start Menu",
                "exit:end Menu",
                "enter:start Gameplay",
                "enter:end Gameplay"
            ]
        );
        assert!(started.elapsed() >= Duration::from_millis(250));
    }

    #[tokio::test(start_paused = true)]
    async fn overlapped_enters_while_exit_is_running() {
        let journal = Journal::default();
        let machine = machine_with(vec![
            (Screen::Menu, Recorder::new("Menu", &journal).exit_delay(200).handle()),
            (
                Screen::Gameplay,
                Recorder::new("Gameplay", &journal).enter_delay(50).handle(),
            ),
        ]);
        machine.enter_state(Screen::Menu).await.unwrap();
        journal.lock().unwrap().clear();

        let started = Instant::now();
        machine
            .enter_state_with(Screen::Gameplay, TransitionOptions::new().overlapped())
            .await
            .unwrap();
        let elapsed = started.elapsed();

        assert_eq!(
            entries(&journal),
            vec![
                "exit:start Menu",
                "enter:start Gameplay",
                "enter:end Gameplay",
                "exit:end Menu"
            ]
        );
        assert!(elapsed >= Duration::from_millis(200));
        assert!(elapsed < Duration::from_millis(250));
        assert!(!machine.is_transitioning());
    }

    #[tokio::test]
    async fn unknown_state_leaves_machine_untouched() {
        let journal = Journal::default();
        let machine = standard_machine(&journal);
        machine.enter_state(Screen::Menu).await.unwrap();

        let err = machine.enter_state(Screen::Settings).await.unwrap_err();

        assert!(matches!(err, MachineError::UnknownState { id } if id == "Settings"));
        assert_eq!(machine.current_identity(), Some(Screen::Menu));
        assert!(!machine.is_transitioning());
        assert_eq!(machine.history().len(), 1);
    }

    #[tokio::test]
    async fn enter_before_initialize_fails() {
        let machine: AsyncStateMachine<Screen> = AsyncStateMachine::new();

        let err = machine.enter_state(Screen::Boot).await.unwrap_err();

        assert!(matches!(err, MachineError::NotInitialized { .. }));
        assert!(!machine.is_initialized());
    }

    #[test]
    fn initialize_runs_only_once() {
        let journal = Journal::default();
        let machine = standard_machine(&journal);

        let err = machine
            .initialize_with(|registry| {
                registry.register(Screen::Settings, Recorder::new("Settings", &journal).handle())
            })
            .unwrap_err();

        assert!(matches!(err, MachineError::AlreadyInitialized { .. }));
        assert!(!machine.registry().unwrap().contains(&Screen::Settings));
    }

    #[test]
    fn capability_less_state_aborts_initialization() {
        let machine: AsyncStateMachine<Screen> = AsyncStateMachine::new();

        let err = machine
            .initialize_with(|registry| registry.register(Screen::Broken, StateHandle::new()))
            .unwrap_err();

        assert!(matches!(err, MachineError::Configuration { ref errors, .. } if errors.len() == 1));
        assert!(!machine.is_initialized());
    }

    #[test]
    fn initialize_from_reports_every_bad_state() {
        let journal = Journal::default();
        let boot = Recorder::new("Boot", &journal).handle();
        let mut factory = StateFactory::new()
            .bind_instance(Screen::Boot, boot)
            .bind(Screen::Broken, StateHandle::new);
        let machine: AsyncStateMachine<Screen> = AsyncStateMachine::new();

        let err = machine
            .initialize_from(&mut factory, [Screen::Boot, Screen::Broken, Screen::Settings])
            .unwrap_err();

        match err {
            MachineError::Configuration { errors, .. } => assert_eq!(errors.len(), 2),
            other => panic!("Expected configuration error, got {other:?}"),
        }
        assert!(!machine.is_initialized());
    }

    #[tokio::test]
    async fn failing_enter_clears_flag_but_keeps_target_current() {
        let journal = Journal::default();
        let machine = machine_with(vec![
            (Screen::Menu, Recorder::new("Menu", &journal).handle()),
            (
                Screen::Gameplay,
                Recorder::new("Gameplay", &journal).failing_enter().handle(),
            ),
        ]);
        machine.enter_state(Screen::Menu).await.unwrap();

        let err = machine.enter_state(Screen::Gameplay).await.unwrap_err();

        assert!(matches!(
            err,
            MachineError::HookFailed { phase: HookPhase::Enter, .. }
        ));
        assert!(!machine.is_transitioning());
        // No rollback: the failed target stays committed.
        assert_eq!(machine.current_identity(), Some(Screen::Gameplay));
    }

    #[tokio::test]
    async fn failing_exit_skips_enter_under_exit_first() {
        let journal = Journal::default();
        let machine = machine_with(vec![
            (Screen::Menu, Recorder::new("Menu", &journal).failing_exit().handle()),
            (Screen::Gameplay, Recorder::new("Gameplay", &journal).handle()),
        ]);
        machine.enter_state(Screen::Menu).await.unwrap();
        journal.lock().unwrap().clear();

        let err = machine.enter_state(Screen::Gameplay).await.unwrap_err();

        assert!(matches!(
            err,
            MachineError::HookFailed { phase: HookPhase::Exit, .. }
        ));
        assert_eq!(entries(&journal), vec!["exit:start Menu"]);
        assert_eq!(machine.current_identity(), Some(Screen::Gameplay));
        assert!(!machine.is_transitioning());
    }

    #[tokio::test]
    async fn overlapped_reports_enter_failure_first() {
        let journal = Journal::default();
        let machine = machine_with(vec![
            (Screen::Menu, Recorder::new("Menu", &journal).failing_exit().handle()),
            (
                Screen::Gameplay,
                Recorder::new("Gameplay", &journal).failing_enter().handle(),
            ),
        ]);
        machine.enter_state(Screen::Menu).await.unwrap();

        let err = machine
            .enter_state_with(Screen::Gameplay, TransitionOptions::new().overlapped())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            MachineError::HookFailed { phase: HookPhase::Enter, .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn overlapped_exit_failure_is_reported_after_enter_completes() {
        let journal = Journal::default();
        let machine = machine_with(vec![
            (
                Screen::Menu,
                Recorder::new("Menu", &journal).exit_delay(10).failing_exit().handle(),
            ),
            (
                Screen::Gameplay,
                Recorder::new("Gameplay", &journal).enter_delay(50).handle(),
            ),
        ]);
        machine.enter_state(Screen::Menu).await.unwrap();
        journal.lock().unwrap().clear();

        let err = machine
            .enter_state_with(Screen::Gameplay, TransitionOptions::new().overlapped())
            .await
            .unwrap_err();

        match err {
            MachineError::HookFailed { id, phase, .. } => {
                assert_eq!(id, "Menu");
                assert_eq!(phase, HookPhase::Exit);
            }
            other => panic!("Expected exit hook failure, got {other:?}"),
        }
        assert_eq!(
            entries(&journal),
            vec!["exit:start Menu", "enter:start Gameplay", "enter:end Gameplay"]
        );
        assert_eq!(machine.current_identity(), Some(Screen::Gameplay));
        assert!(!machine.is_transitioning());
    }

    #[tokio::test]
    async fn exit_only_target_runs_only_previous_exit() {
        let journal = Journal::default();
        let machine = machine_with(vec![
            (
                Screen::Boot,
                StateHandle::exitable(Arc::new(Recorder::new("Boot", &journal))),
            ),
            (
                Screen::Settings,
                StateHandle::exitable(Arc::new(Recorder::new("Settings", &journal))),
            ),
        ]);

        assert_eq!(
            machine.enter_state(Screen::Boot).await.unwrap(),
            EnterOutcome::Entered
        );
        assert!(entries(&journal).is_empty());

        let outcome = machine.enter_state(Screen::Settings).await.unwrap();

        assert_eq!(outcome, EnterOutcome::Entered);
        assert_eq!(entries(&journal), vec!["exit:start Boot", "exit:end Boot"]);
        assert_eq!(machine.current_identity(), Some(Screen::Settings));
        assert!(!machine.is_transitioning());
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_call_for_same_target_short_circuits() {
        let journal = Journal::default();
        let machine = machine_with(vec![(
            Screen::Menu,
            Recorder::new("Menu", &journal).enter_delay(100).handle(),
        )]);

        let (first, second) = futures::join!(
            machine.enter_state(Screen::Menu),
            machine.enter_state(Screen::Menu)
        );

        assert_eq!(first.unwrap(), EnterOutcome::Entered);
        assert_eq!(second.unwrap(), EnterOutcome::AlreadyCurrent);
        assert_eq!(entries(&journal), vec!["enter:start Menu", "enter:end Menu"]);
    }

    #[tokio::test(start_paused = true)]
    async fn flag_is_raised_while_hooks_run() {
        let journal = Journal::default();
        let machine = machine_with(vec![(
            Screen::Boot,
            Recorder::new("Boot", &journal).enter_delay(100).handle(),
        )]);

        let (result, observed) = futures::join!(machine.enter_state(Screen::Boot), async {
            sleep(Duration::from_millis(10)).await;
            machine.is_transitioning()
        });

        result.unwrap();
        assert!(observed);
        assert!(!machine.is_transitioning());
    }

    #[tokio::test(start_paused = true)]
    async fn wait_until_idle_resolves_after_transition() {
        let journal = Journal::default();
        let machine = machine_with(vec![(
            Screen::Boot,
            Recorder::new("Boot", &journal).enter_delay(100).handle(),
        )]);

        let started = Instant::now();
        let (_, idle_at) = futures::join!(machine.enter_state(Screen::Boot), async {
            machine.wait_until_idle().await;
            started.elapsed()
        });

        assert!(idle_at >= Duration::from_millis(100));
        assert!(entries(&journal).contains(&"enter:end Boot".to_string()));
    }

    #[tokio::test]
    async fn wait_until_idle_returns_immediately_when_idle() {
        let machine: AsyncStateMachine<Screen> = AsyncStateMachine::new();
        let waited = timeout(Duration::from_millis(50), machine.wait_until_idle()).await;
        assert!(waited.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_transition_clears_flag() {
        let journal = Journal::default();
        let machine = machine_with(vec![(
            Screen::Boot,
            Recorder::new("Boot", &journal).enter_delay(500).handle(),
        )]);

        let cancelled = timeout(Duration::from_millis(10), machine.enter_state(Screen::Boot)).await;

        assert!(cancelled.is_err());
        assert!(!machine.is_transitioning());
        assert_eq!(machine.current_identity(), Some(Screen::Boot));
    }

    #[tokio::test]
    async fn typed_overload_uses_type_identity() {
        struct BootState;
        struct MenuState;

        let journal = Journal::default();
        let machine: AsyncStateMachine<TypeKey> = AsyncStateMachine::new();
        machine
            .initialize_with(|registry| {
                registry.register(
                    TypeKey::of::<BootState>(),
                    Recorder::new("Boot", &journal).handle(),
                )?;
                registry.register(
                    TypeKey::of::<MenuState>(),
                    Recorder::new("Menu", &journal).handle(),
                )
            })
            .unwrap();

        machine.enter::<BootState>().await.unwrap();
        machine
            .enter_with::<MenuState>(TransitionOptions::new().overlapped())
            .await
            .unwrap();

        assert_eq!(machine.current_identity(), Some(TypeKey::of::<MenuState>()));
        assert_eq!(
            machine.enter::<MenuState>().await.unwrap(),
            EnterOutcome::AlreadyCurrent
        );
    }

    #[tokio::test]
    async fn history_tracks_committed_transitions() {
        let journal = Journal::default();
        let machine = standard_machine(&journal);

        machine.enter_state(Screen::Boot).await.unwrap();
        machine.enter_state(Screen::Menu).await.unwrap();
        machine
            .enter_state_with(Screen::Gameplay, TransitionOptions::new().overlapped())
            .await
            .unwrap();

        let history = machine.history();
        assert_eq!(
            history.get_path(),
            vec![&Screen::Boot, &Screen::Menu, &Screen::Gameplay]
        );
        assert_eq!(history.last().unwrap().ordering, ExitOrdering::Overlapped);
        assert_eq!(history.last().unwrap().from, Some(Screen::Menu));
    }

    #[tokio::test]
    async fn configured_default_ordering_applies() {
        let journal = Journal::default();
        let machine = AsyncStateMachine::with_config(
            MachineConfig::named("ui").default_ordering(ExitOrdering::Overlapped),
        );
        machine
            .initialize_with(|registry| {
                registry.register(Screen::Boot, Recorder::new("Boot", &journal).handle())
            })
            .unwrap();

        machine.enter_state(Screen::Boot).await.unwrap();

        assert_eq!(machine.name(), "ui");
        assert_eq!(
            machine.history().last().unwrap().ordering,
            ExitOrdering::Overlapped
        );
    }

    #[tokio::test]
    async fn detached_transition_runs_to_completion() {
        let journal = Journal::default();
        let machine = Arc::new(standard_machine(&journal));

        machine
            .enter_detached(Screen::Boot, TransitionOptions::new())
            .await
            .unwrap();

        assert_eq!(machine.current_identity(), Some(Screen::Boot));
    }

    /// Collects formatted log output in memory.
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn detached_failure_is_logged_not_raised() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let journal = Journal::default();
        let machine = Arc::new(standard_machine(&journal));

        let joined = machine
            .enter_detached(Screen::Settings, TransitionOptions::new())
            .await;

        assert!(joined.is_ok());
        assert_eq!(machine.current_identity(), None);
        let output = logs.contents();
        assert!(output.contains("ERROR"));
        assert!(output.contains("detached transition failed"));
        assert!(output.contains("state=Settings"));
    }

    #[test]
    fn independent_machines_do_not_share_state() {
        let journal = Journal::default();
        let game = standard_machine(&journal);
        let ui = standard_machine(&journal);

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        runtime.block_on(async {
            game.enter_state(Screen::Gameplay).await.unwrap();
            ui.enter_state(Screen::Menu).await.unwrap();
        });

        assert_eq!(game.current_identity(), Some(Screen::Gameplay));
        assert_eq!(ui.current_identity(), Some(Screen::Menu));
    }
}
