//! Registration session.
//!
//! Drives the operator through master authentication, the template card, and
//! the piece loop. The session is a resumable state machine: each handler
//! consumes one input, mutates the registry through its explicit methods,
//! and returns what to show. It never waits.
//!
//! ```text
//! Unauthenticated ──master──▶ AwaitingTemplateCard ──card──▶ AwaitingPieceInput
//!                                   ▲                         │   ▲
//!                                   │ commit / discard        │   │ name
//!                                   └──── fim / 10 pieces ◀───┘   │
//!                                                      AwaitingPieceName
//! ```

use gabarito_proto::{Command, Identifier, PieceName};

use crate::{error::KioskError, event::KioskAction, registry::Registry};

/// Where a piece identifier came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PieceSource {
    /// Presented on the primary card reader.
    Reader,
    /// Sent as hex on the auxiliary channel.
    AuxChannel,
}

/// Registration session states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationState {
    /// Waiting for the master card.
    Unauthenticated,
    /// Authenticated, waiting for a template card.
    AwaitingTemplateCard,
    /// Template read, waiting for a piece identifier or `fim`.
    AwaitingPieceInput {
        /// Position of the template in progress.
        position: usize,
    },
    /// Piece identifier accepted, waiting for its name on the console.
    AwaitingPieceName {
        /// Position of the template in progress.
        position: usize,
        /// Identifier waiting for a name.
        identifier: Identifier,
        /// Where the identifier came from.
        source: PieceSource,
    },
}

const PIECE_PROMPT: &str = "Aproxime outra peca, envie UID via Serial2 ou digite 'fim' para terminar.";

/// Registration-mode session.
#[derive(Debug, Clone)]
pub struct RegistrationSession {
    state: RegistrationState,
}

impl RegistrationSession {
    /// Start a session, gated on the master card.
    pub fn start() -> (Self, Vec<KioskAction>) {
        let actions = vec![
            KioskAction::display("Modo Cadastro", "Aprox. o master"),
            KioskAction::console("Modo Cadastro"),
            KioskAction::console("Aguardando autenticacao"),
        ];
        (Self { state: RegistrationState::Unauthenticated }, actions)
    }

    /// Current state.
    pub fn state(&self) -> RegistrationState {
        self.state
    }

    /// True once the master card has been presented.
    pub fn is_authenticated(&self) -> bool {
        self.state != RegistrationState::Unauthenticated
    }

    /// True while waiting for a piece name; every console line except a mode
    /// switch is taken as the name.
    pub fn awaiting_name(&self) -> bool {
        matches!(self.state, RegistrationState::AwaitingPieceName { .. })
    }

    /// Handle a card on the primary reader.
    pub fn handle_card(&mut self, registry: &mut Registry, identifier: Identifier) -> Vec<KioskAction> {
        match self.state {
            RegistrationState::Unauthenticated => self.authenticate(registry, identifier),
            RegistrationState::AwaitingTemplateCard => self.begin_template(registry, identifier),
            RegistrationState::AwaitingPieceInput { position } => {
                self.accept_piece_identifier(registry, position, identifier, PieceSource::Reader)
            },
            RegistrationState::AwaitingPieceName { .. } => {
                tracing::debug!(%identifier, "card ignored while waiting for a piece name");
                Vec::new()
            },
        }
    }

    /// Handle a line from the auxiliary identifier channel.
    pub fn handle_aux_line(&mut self, registry: &mut Registry, line: &str) -> Vec<KioskAction> {
        let RegistrationState::AwaitingPieceInput { position } = self.state else {
            tracing::debug!(line, "auxiliary line ignored outside piece input");
            return Vec::new();
        };

        match Identifier::from_hex(line) {
            Ok(identifier) => {
                self.accept_piece_identifier(registry, position, identifier, PieceSource::AuxChannel)
            },
            Err(err) => {
                let mut actions = KioskError::from(err).report();
                actions.push(KioskAction::console("Formato UID invalido recebido via Serial2."));
                actions
            },
        }
    }

    /// Take a console line as the name of the piece just read.
    pub fn handle_name(&mut self, registry: &mut Registry, line: &str) -> Vec<KioskAction> {
        let RegistrationState::AwaitingPieceName { position, identifier, .. } = self.state else {
            tracing::debug!(line, "name line outside the naming prompt");
            return Vec::new();
        };
        self.accept_name(registry, position, identifier, line)
    }

    /// Offer a parsed console command to the session.
    ///
    /// Returns `None` if the session does not consume the command, in which
    /// case the kiosk dispatches it.
    pub fn handle_command(
        &mut self,
        registry: &mut Registry,
        command: &Command,
    ) -> Option<Vec<KioskAction>> {
        let RegistrationState::AwaitingPieceInput { position } = self.state else {
            return None;
        };

        match command {
            Command::Finish => Some(self.finalize(registry, position)),
            Command::Text(_) => Some(vec![KioskAction::console(PIECE_PROMPT)]),
            _ => None,
        }
    }

    fn authenticate(&mut self, registry: &Registry, identifier: Identifier) -> Vec<KioskAction> {
        if !registry.is_master(&identifier) {
            return KioskError::AuthenticationFailed { presented: identifier }.report();
        }

        tracing::info!("registration authenticated");
        self.state = RegistrationState::AwaitingTemplateCard;
        vec![
            KioskAction::display("Autenticado", "Leia o gabarito"),
            KioskAction::console("Cartao master autenticado"),
            KioskAction::console("Aproxime o cartao gabarito"),
        ]
    }

    fn begin_template(&mut self, registry: &mut Registry, identifier: Identifier) -> Vec<KioskAction> {
        match registry.append_template(identifier) {
            Ok(position) => {
                tracing::info!(position, %identifier, "template registration started");
                self.state = RegistrationState::AwaitingPieceInput { position };
                vec![
                    KioskAction::display("Gabarito lido", "Cadastre pecas"),
                    KioskAction::console(format!("Gabarito {identifier} lido. Cadastre as pecas associadas.")),
                    KioskAction::console(PIECE_PROMPT),
                ]
            },
            Err(err) => KioskError::from(err).report(),
        }
    }

    fn accept_piece_identifier(
        &mut self,
        registry: &Registry,
        position: usize,
        identifier: Identifier,
        source: PieceSource,
    ) -> Vec<KioskAction> {
        if registry.pending_contains(position, &identifier) {
            return KioskError::DuplicateIdentifier { identifier }.report();
        }

        self.state = RegistrationState::AwaitingPieceName { position, identifier, source };
        let line1 = match source {
            PieceSource::Reader => "Peca lida (NFC)",
            PieceSource::AuxChannel => "Peca lida (Ser)",
        };
        vec![
            KioskAction::display(line1, "Digite o nome"),
            KioskAction::console(format!("Peca {identifier} lida. Digite o nome da peca:")),
        ]
    }

    fn accept_name(
        &mut self,
        registry: &mut Registry,
        position: usize,
        identifier: Identifier,
        line: &str,
    ) -> Vec<KioskAction> {
        let name = line.trim();
        if name.is_empty() {
            return vec![KioskAction::console("Nome vazio. Digite o nome da peca:")];
        }

        let name = PieceName::new(name);
        let mut actions = match registry.add_piece(position, identifier, name.clone()) {
            Ok(_) => vec![
                KioskAction::display("Peca cadastrada", name.as_str()),
                KioskAction::console(format!("Peca cadastrada: {name}")),
            ],
            Err(err) => KioskError::from(err).report(),
        };

        let pieces = registry.pending().map_or(0, |(_, count)| count);
        if pieces >= registry.limits().max_pieces {
            actions.extend(self.finalize(registry, position));
        } else {
            self.state = RegistrationState::AwaitingPieceInput { position };
            actions.push(KioskAction::console(PIECE_PROMPT));
        }
        actions
    }

    fn finalize(&mut self, registry: &mut Registry, position: usize) -> Vec<KioskAction> {
        self.state = RegistrationState::AwaitingTemplateCard;

        match registry.commit_template(position) {
            Ok(pieces) => {
                tracing::info!(position, pieces, "template committed");
                vec![
                    KioskAction::display("Cadastro ok", &format!("Gabarito {}", position + 1)),
                    KioskAction::console(format!(
                        "Gabarito {} cadastrado com sucesso! ({pieces} pecas)",
                        position + 1
                    )),
                    KioskAction::console("Aproxime o cartao gabarito"),
                ]
            },
            Err(err) => {
                let mut actions = KioskError::from(err).report();
                actions.push(KioskAction::console(
                    "Voce deve cadastrar no minimo 1 peca para cada gabarito!",
                ));
                actions
            },
        }
    }
}
