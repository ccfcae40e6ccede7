//! The kiosk state machine.
//!
//! `Kiosk` owns all mutable state: the registry, the mode coordinator and the
//! one active session. It is a pure step function. Events go in, actions come
//! out, and the caller (the station driver) executes them.
//!
//! # Architecture
//!
//! ```text
//! card / console / aux / button / tick
//!                 │
//!                 ▼
//!          Kiosk::handle(event)
//!                 │
//!   ┌─────────────┼──────────────┐
//!   ▼             ▼              ▼
//! Enroll    Registration    Verification      (exactly one active)
//!                 │
//!                 ▼
//!   Vec<KioskAction>  + Persist/Wipe when the registry revision moved
//! ```
//!
//! # Persistence
//!
//! After every event the registry revision is compared to the last revision
//! handed to storage. If it moved, the full image is encoded and emitted as a
//! `Persist` action (or `Wipe` after `limpar`). The driver reports back with
//! `StorageWritten` or `StorageFailed`; a failure puts the kiosk in degraded
//! mode until a later write succeeds.
//!
//! A medium that could not be loaded at boot is never overwritten on the
//! kiosk's own initiative: the kiosk sits in `Recovery` until the operator
//! types `limpar`, and only then starts over with master enrollment.

use gabarito_proto::{Command, Identifier, encode};

use crate::{
    config::{KioskConfig, ReaderId},
    coordinator::{Mode, ModeCoordinator},
    env::Instant,
    error::KioskError,
    event::{Indicator, KioskAction, KioskEvent},
    registration::RegistrationSession,
    registry::Registry,
    verification::VerificationSession,
};

/// The session currently driving the kiosk.
#[derive(Debug, Clone)]
pub enum Session<I> {
    /// Stored registry unreadable; waiting for the operator to discard it.
    Recovery,
    /// No master stored; the next primary card becomes the master.
    EnrollMaster,
    /// Registration mode.
    Registration(RegistrationSession),
    /// Operation mode.
    Verification(VerificationSession<I>),
}

/// Kiosk state machine.
#[derive(Debug, Clone)]
pub struct Kiosk<I> {
    config: KioskConfig,
    registry: Registry,
    coordinator: ModeCoordinator<I>,
    session: Session<I>,
    /// Revision last handed to storage.
    emitted_revision: u64,
    /// Next emitted image must scrub the medium first.
    scrub: bool,
    degraded: bool,
}

impl<I: Instant> Kiosk<I> {
    /// Boot a kiosk around a loaded registry.
    ///
    /// Without a stored master the kiosk enrolls one before anything else;
    /// otherwise it starts in operation mode.
    pub fn new(config: KioskConfig, registry: Registry) -> (Self, Vec<KioskAction>) {
        let enrolled = registry.has_master();
        let mut kiosk = Self {
            coordinator: ModeCoordinator::new(config.debounce),
            emitted_revision: registry.revision(),
            config,
            registry,
            session: Session::EnrollMaster,
            scrub: false,
            degraded: false,
        };

        tracing::info!(templates = kiosk.registry.len(), enrolled, "kiosk booted");

        let mut actions = vec![
            KioskAction::console(format!(
                "Gabarito pronto: {} gabaritos cadastrados",
                kiosk.registry.len()
            )),
            KioskAction::Indicator { indicator: Indicator::Success, on: false },
            KioskAction::Indicator { indicator: Indicator::Fault, on: false },
        ];

        if enrolled {
            actions.extend(kiosk.enter_mode(Mode::Operation));
        } else {
            actions.extend([
                KioskAction::display("Sem master", "Aprox. cartao"),
                KioskAction::console("Nenhum master cadastrado. Aproxime o cartao master."),
            ]);
        }
        (kiosk, actions)
    }

    /// Boot a kiosk whose stored registry could not be loaded.
    ///
    /// The kiosk starts degraded with an empty registry and refuses cards,
    /// the button and mode changes until `limpar` confirms that the stored
    /// contents may be discarded. Nothing is written before that.
    pub fn unreadable(config: KioskConfig, reason: String) -> (Self, Vec<KioskAction>) {
        let registry = Registry::new(config.registry_limits());
        let kiosk = Self {
            coordinator: ModeCoordinator::new(config.debounce),
            emitted_revision: registry.revision(),
            config,
            registry,
            session: Session::Recovery,
            scrub: false,
            degraded: true,
        };

        let err = KioskError::StorageFailure { reason };
        tracing::error!(error = %err, "kiosk booted without its registry");

        let mut actions = vec![
            KioskAction::Indicator { indicator: Indicator::Success, on: false },
            KioskAction::Indicator { indicator: Indicator::Fault, on: true },
        ];
        actions.extend(err.report());
        actions.push(Self::recovery_prompt());
        (kiosk, actions)
    }

    /// Process one event.
    pub fn handle(&mut self, event: KioskEvent<I>) -> Vec<KioskAction> {
        let mut actions = match event {
            KioskEvent::CardPresented { reader, identifier, now } => {
                self.on_card(reader, identifier, now)
            },
            KioskEvent::ConsoleLine { line, .. } => self.on_console(&line),
            KioskEvent::AuxLine { line, .. } => self.on_aux_line(&line),
            KioskEvent::ButtonPressed { now } => self.on_button_pressed(now),
            KioskEvent::ButtonReleased { .. } => self.on_button_released(),
            KioskEvent::Tick { now } => match &mut self.session {
                Session::Verification(session) => session.tick(now),
                _ => Vec::new(),
            },
            KioskEvent::StorageFailed { reason } => self.on_storage_failed(reason),
            KioskEvent::StorageWritten { revision } => self.on_storage_written(revision),
        };

        actions.extend(self.persist_if_changed());
        actions
    }

    /// Configuration the kiosk runs with.
    pub fn config(&self) -> &KioskConfig {
        &self.config
    }

    /// The association registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Active session.
    pub fn session(&self) -> &Session<I> {
        &self.session
    }

    /// Current mode, or `None` while enrolling the master.
    pub fn mode(&self) -> Option<Mode> {
        match self.session {
            Session::Recovery | Session::EnrollMaster => None,
            _ => Some(self.coordinator.mode()),
        }
    }

    /// True while a registration session has accepted the master card.
    pub fn is_authenticated(&self) -> bool {
        matches!(&self.session, Session::Registration(session) if session.is_authenticated())
    }

    /// True while the durable store is known to be out of date.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// True while the kiosk waits for the operator to discard an unreadable
    /// medium.
    pub fn is_recovering(&self) -> bool {
        matches!(self.session, Session::Recovery)
    }

    fn on_card(&mut self, reader: ReaderId, identifier: Identifier, now: I) -> Vec<KioskAction> {
        if matches!(self.session, Session::Recovery) {
            tracing::warn!(?reader, %identifier, "card refused, registry unreadable");
            return vec![Self::recovery_prompt()];
        }
        if matches!(self.session, Session::EnrollMaster) && reader == ReaderId::Primary {
            return self.enroll_master(identifier);
        }

        match &mut self.session {
            Session::Registration(session) if reader == ReaderId::Primary => {
                session.handle_card(&mut self.registry, identifier)
            },
            Session::Verification(session) => {
                session.handle_card(&self.registry, reader, identifier, now)
            },
            _ => {
                tracing::debug!(?reader, %identifier, "card ignored");
                Vec::new()
            },
        }
    }

    fn on_console(&mut self, line: &str) -> Vec<KioskAction> {
        let parsed = Command::parse(line);
        let mode_switch = parsed.as_ref().is_ok_and(Command::is_mode_switch);

        if matches!(self.session, Session::Recovery) {
            return match parsed {
                Ok(Command::Wipe) => self.discard_unreadable(),
                _ => vec![Self::recovery_prompt()],
            };
        }

        if let Session::Registration(session) = &mut self.session
            && session.awaiting_name()
            && !mode_switch
        {
            return session.handle_name(&mut self.registry, line);
        }

        let command = match parsed {
            Ok(command) => command,
            Err(err) => return KioskError::from(err).report(),
        };

        if let Session::Registration(session) = &mut self.session
            && let Some(actions) = session.handle_command(&mut self.registry, &command)
        {
            return actions;
        }

        self.dispatch(command)
    }

    fn dispatch(&mut self, command: Command) -> Vec<KioskAction> {
        match command {
            Command::EnterRegistration => self.switch_mode(Mode::Registration),
            Command::EnterOperation => self.switch_mode(Mode::Operation),
            Command::Delete { index } => self.delete(index),
            Command::Wipe => self.wipe(),
            Command::Finish => vec![KioskAction::console("Nenhum cadastro em andamento.")],
            Command::Text(text) => {
                vec![KioskAction::console(format!("Comando nao reconhecido: {text}"))]
            },
        }
    }

    fn on_aux_line(&mut self, line: &str) -> Vec<KioskAction> {
        match &mut self.session {
            Session::Registration(session) => session.handle_aux_line(&mut self.registry, line),
            _ => {
                tracing::debug!(line, "auxiliary line outside registration");
                Vec::new()
            },
        }
    }

    fn on_button_pressed(&mut self, now: I) -> Vec<KioskAction> {
        let acknowledging = match &self.session {
            Session::Recovery | Session::EnrollMaster => {
                tracing::debug!("button ignored before master enrollment");
                return Vec::new();
            },
            Session::Verification(session) => session.is_complete(),
            Session::Registration(_) => false,
        };

        // The press/release pair acknowledges a completed kit.
        if acknowledging {
            return Vec::new();
        }

        match self.coordinator.request_toggle(now) {
            Some(mode) => self.enter_mode(mode),
            None => Vec::new(),
        }
    }

    fn on_button_released(&mut self) -> Vec<KioskAction> {
        match &mut self.session {
            Session::Verification(session) => session.release(&self.registry).unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    fn on_storage_failed(&mut self, reason: String) -> Vec<KioskAction> {
        let err = KioskError::StorageFailure { reason };
        if self.degraded {
            tracing::warn!(error = %err, "storage still failing");
            return vec![KioskAction::console(format!("Falha de memoria: {err}"))];
        }

        self.degraded = true;
        err.report()
    }

    fn on_storage_written(&mut self, revision: u64) -> Vec<KioskAction> {
        tracing::debug!(revision, "registry durable");
        if !self.degraded || revision != self.emitted_revision {
            return Vec::new();
        }

        self.degraded = false;
        tracing::info!("storage recovered");
        vec![KioskAction::console("Memoria restaurada")]
    }

    fn enroll_master(&mut self, identifier: Identifier) -> Vec<KioskAction> {
        // Blank identifiers are stored as "no master"
        if identifier.is_blank() {
            let err = KioskError::MalformedIdentifier {
                reason: format!("{identifier} cannot be stored as the master"),
            };
            let mut actions = err.report();
            actions.push(KioskAction::console("Use outro cartao como master."));
            return actions;
        }

        tracing::info!(%identifier, "master enrolled");
        self.registry.set_master(identifier);

        let mut actions = vec![
            KioskAction::display("Master gravado", &identifier.to_hex()),
            KioskAction::console(format!("Cartao master {identifier} cadastrado")),
        ];
        actions.extend(self.enter_mode(Mode::Operation));
        actions
    }

    /// Operator confirmed: scrub the medium and start over with enrollment.
    fn discard_unreadable(&mut self) -> Vec<KioskAction> {
        tracing::warn!("unreadable registry discarded by operator");
        self.registry.wipe_all();
        self.scrub = true;
        self.session = Session::EnrollMaster;

        vec![
            KioskAction::Indicator { indicator: Indicator::Fault, on: false },
            KioskAction::console("Memoria limpa. Todos os gabaritos apagados."),
            KioskAction::display("Sem master", "Aprox. cartao"),
            KioskAction::console("Nenhum master cadastrado. Aproxime o cartao master."),
        ]
    }

    fn recovery_prompt() -> KioskAction {
        KioskAction::console(
            "Memoria ilegivel. Dados preservados. Digite 'limpar' para apagar e recomecar.",
        )
    }

    fn switch_mode(&mut self, mode: Mode) -> Vec<KioskAction> {
        if matches!(self.session, Session::EnrollMaster) {
            return vec![
                KioskAction::display("Sem master", "Aprox. cartao"),
                KioskAction::console("Cadastre o cartao master antes de trocar de modo."),
            ];
        }

        self.coordinator.switch_to(mode);
        self.enter_mode(mode)
    }

    /// Tear down the active session and start `mode`'s.
    fn enter_mode(&mut self, mode: Mode) -> Vec<KioskAction> {
        if let Some(identifier) = self.registry.discard_pending() {
            tracing::info!(%identifier, "uncommitted template discarded");
        }
        tracing::info!(?mode, "mode entered");

        let mut actions = vec![
            KioskAction::Indicator { indicator: Indicator::Success, on: false },
            KioskAction::Indicator { indicator: Indicator::Fault, on: false },
        ];

        match mode {
            Mode::Registration => {
                let (session, start) = RegistrationSession::start();
                self.session = Session::Registration(session);
                actions.extend(start);
            },
            Mode::Operation => {
                let (session, start) = VerificationSession::start(&self.registry, &self.config);
                self.session = Session::Verification(session);
                actions.extend(start);
            },
        }
        actions
    }

    fn delete(&mut self, index: usize) -> Vec<KioskAction> {
        if self.registry.has_pending() {
            return Self::refuse_while_pending();
        }

        let position = index.saturating_sub(1);
        let mut actions = match self.registry.remove_template(position) {
            Ok(template) => {
                tracing::info!(index, identifier = %template.identifier, "template removed");
                vec![
                    KioskAction::display("Exclusao", "Gabarito apagado"),
                    KioskAction::console(format!(
                        "Gabarito {index} ({}) apagado com sucesso!",
                        template.identifier
                    )),
                ]
            },
            Err(err) => return KioskError::from(err).report(),
        };

        actions.extend(self.reset_verification());
        actions
    }

    fn wipe(&mut self) -> Vec<KioskAction> {
        if self.registry.has_pending() {
            return Self::refuse_while_pending();
        }

        tracing::info!(templates = self.registry.len(), "registry wiped");
        self.registry.wipe_all();
        self.scrub = true;

        let mut actions = vec![
            KioskAction::display("Memoria limpa", "Dados apagados"),
            KioskAction::console("Memoria limpa. Todos os gabaritos apagados."),
        ];
        actions.extend(self.reset_verification());
        actions
    }

    fn reset_verification(&mut self) -> Vec<KioskAction> {
        match &mut self.session {
            Session::Verification(session) => session.reset(&self.registry),
            _ => Vec::new(),
        }
    }

    fn refuse_while_pending() -> Vec<KioskAction> {
        vec![
            KioskAction::display("Cadastro ativo", "Digite fim"),
            KioskAction::console("Cadastro em andamento. Digite 'fim' antes de apagar."),
        ]
    }

    fn persist_if_changed(&mut self) -> Option<KioskAction> {
        let revision = self.registry.revision();
        if revision == self.emitted_revision {
            return None;
        }
        self.emitted_revision = revision;

        let image = match encode(&self.registry.image(), self.registry.limits().into()) {
            Ok(image) => image,
            Err(err) => {
                tracing::error!(error = %err, "registry image does not encode");
                self.degraded = true;
                return None;
            },
        };

        if std::mem::take(&mut self.scrub) {
            Some(KioskAction::Wipe { revision, image })
        } else {
            Some(KioskAction::Persist { revision, image })
        }
    }
}
