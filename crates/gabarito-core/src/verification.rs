//! Verification session.
//!
//! Resolves a template card, then tracks which of its pieces are still
//! missing until every piece has been presented or the deadline passes.
//!
//! # Invariants
//!
//! - `remaining` only ever shrinks; a piece presented twice is reported and
//!   not counted again.
//! - The deadline is checked on every tick and before any piece read, so a
//!   read that arrives late never completes a kit.
//! - The success indicator is asserted only in `Complete` and released on the
//!   button release that ends the session.

use std::{collections::BTreeSet, time::Duration};

use gabarito_proto::Identifier;

use crate::{
    config::{KioskConfig, ReaderId},
    env::Instant,
    error::KioskError,
    event::{Indicator, KioskAction},
    registry::Registry,
};

/// Verification session states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationState<I> {
    /// Waiting for a template card.
    AwaitingTemplateCard,
    /// Template resolved, waiting for the pieces still in `remaining`.
    AwaitingPieces {
        /// Position of the active template.
        template: usize,
        /// Piece positions not yet presented.
        remaining: BTreeSet<usize>,
        /// When the template was resolved.
        started_at: I,
    },
    /// Every piece presented; waiting for the button release.
    Complete {
        /// Position of the completed template.
        template: usize,
    },
}

/// Result of the last input the session processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// Template card resolved.
    TemplateRecognized,
    /// Template card not in the registry.
    TemplateUnknown,
    /// Piece not part of the active template.
    Incorrect,
    /// Piece already presented in this session.
    AlreadyRead,
    /// Piece accepted, others still missing.
    Accepted,
    /// Last missing piece accepted.
    Completed,
    /// Deadline passed with pieces missing.
    TimedOut,
    /// Button released after completion.
    Released,
}

/// Operation-mode session.
#[derive(Debug, Clone)]
pub struct VerificationSession<I> {
    state: VerificationState<I>,
    timeout: Duration,
    piece_reader: ReaderId,
    last_outcome: Option<VerificationOutcome>,
}

impl<I: Instant> VerificationSession<I> {
    /// Start a session waiting for a template card.
    pub fn start(registry: &Registry, config: &KioskConfig) -> (Self, Vec<KioskAction>) {
        let session = Self {
            state: VerificationState::AwaitingTemplateCard,
            timeout: config.verification_timeout,
            piece_reader: config.piece_reader,
            last_outcome: None,
        };

        let mut actions = vec![KioskAction::console("Modo Operacao")];
        actions.extend(Self::idle_prompt(registry));
        (session, actions)
    }

    /// Current state.
    pub fn state(&self) -> &VerificationState<I> {
        &self.state
    }

    /// Outcome of the most recent input, if any.
    pub fn last_outcome(&self) -> Option<VerificationOutcome> {
        self.last_outcome
    }

    /// Pieces still missing, while pieces are being collected.
    pub fn remaining(&self) -> Option<&BTreeSet<usize>> {
        match &self.state {
            VerificationState::AwaitingPieces { remaining, .. } => Some(remaining),
            _ => None,
        }
    }

    /// True while the success indicator is held.
    pub fn is_complete(&self) -> bool {
        matches!(self.state, VerificationState::Complete { .. })
    }

    /// Handle a card read.
    ///
    /// With a dedicated piece reader, templates are read on the primary
    /// reader and pieces on the piece reader. With a single reader the state
    /// decides how the card is interpreted.
    pub fn handle_card(
        &mut self,
        registry: &Registry,
        reader: ReaderId,
        identifier: Identifier,
        now: I,
    ) -> Vec<KioskAction> {
        let dual = self.piece_reader != ReaderId::Primary;
        let awaiting_template = self.state == VerificationState::AwaitingTemplateCard;
        let awaiting_pieces = self.remaining().is_some();

        if awaiting_template && (!dual || reader == ReaderId::Primary) {
            self.resolve_template(registry, identifier, now)
        } else if awaiting_pieces && (!dual || reader == self.piece_reader) {
            self.check_piece(registry, identifier, now)
        } else {
            tracing::debug!(?reader, %identifier, state = ?self.state, "card ignored");
            Vec::new()
        }
    }

    /// Advance time; times the session out once the deadline has passed.
    pub fn tick(&mut self, now: I) -> Vec<KioskAction> {
        self.check_deadline(now).unwrap_or_default()
    }

    /// Button released. Ends a completed session and returns `None` in any
    /// other state.
    pub fn release(&mut self, registry: &Registry) -> Option<Vec<KioskAction>> {
        let VerificationState::Complete { template } = self.state else {
            return None;
        };

        tracing::info!(template, "kit released");
        self.state = VerificationState::AwaitingTemplateCard;
        self.last_outcome = Some(VerificationOutcome::Released);

        let mut actions = vec![KioskAction::Indicator { indicator: Indicator::Success, on: false }];
        actions.extend(Self::idle_prompt(registry));
        Some(actions)
    }

    /// Abandon whatever is in progress, for example after the registry
    /// changed underneath the session.
    pub fn reset(&mut self, registry: &Registry) -> Vec<KioskAction> {
        if self.state == VerificationState::AwaitingTemplateCard {
            return Vec::new();
        }

        tracing::info!("verification session reset");
        self.state = VerificationState::AwaitingTemplateCard;
        self.last_outcome = None;

        let mut actions = Self::indicators_off();
        actions.extend(Self::idle_prompt(registry));
        actions
    }

    fn resolve_template(
        &mut self,
        registry: &Registry,
        identifier: Identifier,
        now: I,
    ) -> Vec<KioskAction> {
        if registry.is_empty() {
            return Self::idle_prompt(registry);
        }

        let Some(template) = registry.find_template_by_identifier(&identifier) else {
            tracing::info!(%identifier, "unknown template card");
            self.last_outcome = Some(VerificationOutcome::TemplateUnknown);
            return vec![
                KioskAction::display("Erro", "Nao reconhecido"),
                KioskAction::console("Gabarito nao reconhecido!"),
            ];
        };

        let pieces = registry.template(template).map_or(0, |t| t.pieces.len());
        tracing::info!(template, pieces, "template recognized");
        self.state = VerificationState::AwaitingPieces {
            template,
            remaining: (0..pieces).collect(),
            started_at: now,
        };
        self.last_outcome = Some(VerificationOutcome::TemplateRecognized);

        vec![
            KioskAction::display("Gabarito ok", "Aproxime a peca"),
            KioskAction::console(format!(
                "Gabarito {} reconhecido. Aproxime as {pieces} pecas.",
                template + 1
            )),
        ]
    }

    fn check_piece(&mut self, registry: &Registry, identifier: Identifier, now: I) -> Vec<KioskAction> {
        if let Some(actions) = self.check_deadline(now) {
            return actions;
        }

        let VerificationState::AwaitingPieces { template, remaining, .. } = &mut self.state else {
            return Vec::new();
        };
        let template = *template;

        let Some(piece) = registry.find_piece_by_identifier(template, &identifier) else {
            tracing::info!(%identifier, "incorrect piece");
            self.last_outcome = Some(VerificationOutcome::Incorrect);
            return vec![
                KioskAction::display("Peca incorreta", "Tente novamente"),
                KioskAction::console("Peca incorreta. Aproxime novamente o cartao da peca."),
                KioskAction::Indicator { indicator: Indicator::Fault, on: true },
            ];
        };

        let name = registry
            .template(template)
            .and_then(|t| t.pieces.get(piece))
            .map(|p| p.name.as_str().to_owned())
            .unwrap_or_default();

        if !remaining.remove(&piece) {
            self.last_outcome = Some(VerificationOutcome::AlreadyRead);
            return vec![
                KioskAction::display("Peca ja lida", &name),
                KioskAction::console(format!("Peca ja lida: {name}")),
            ];
        }

        let missing = remaining.len();
        let mut actions = vec![
            KioskAction::Indicator { indicator: Indicator::Fault, on: false },
            KioskAction::display("Peca correta", &name),
            KioskAction::console(format!("Peca correta: {name} (faltam {missing})")),
        ];

        if missing == 0 {
            tracing::info!(template, "kit complete");
            self.state = VerificationState::Complete { template };
            self.last_outcome = Some(VerificationOutcome::Completed);
            actions.extend([
                KioskAction::Indicator { indicator: Indicator::Success, on: true },
                KioskAction::display("Kit completo", "Solte o botao"),
                KioskAction::console("Kit completo! Pressione e solte o botao para liberar."),
            ]);
        } else {
            self.last_outcome = Some(VerificationOutcome::Accepted);
        }
        actions
    }

    fn check_deadline(&mut self, now: I) -> Option<Vec<KioskAction>> {
        let VerificationState::AwaitingPieces { remaining, started_at, .. } = &self.state else {
            return None;
        };
        if now <= *started_at || now - *started_at < self.timeout {
            return None;
        }

        let missing = remaining.len();
        self.state = VerificationState::AwaitingTemplateCard;
        self.last_outcome = Some(VerificationOutcome::TimedOut);

        let mut actions = KioskError::VerificationTimeout { missing }.report();
        actions.push(KioskAction::console("Tempo esgotado. Por favor, leia o gabarito novamente."));
        actions.extend(Self::indicators_off());
        Some(actions)
    }

    fn idle_prompt(registry: &Registry) -> Vec<KioskAction> {
        if registry.is_empty() {
            vec![
                KioskAction::display("Lista vazia", "Cadastre antes"),
                KioskAction::console("Nenhum gabarito cadastrado. Cadastre um antes."),
            ]
        } else {
            vec![KioskAction::display("Modo Operacao", "Leia o gabarito")]
        }
    }

    fn indicators_off() -> Vec<KioskAction> {
        vec![
            KioskAction::Indicator { indicator: Indicator::Success, on: false },
            KioskAction::Indicator { indicator: Indicator::Fault, on: false },
        ]
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use gabarito_proto::PieceName;

    use super::*;

    const TEMPLATE: Identifier = Identifier::new([0x10, 0, 0, 0]);
    const X: Identifier = Identifier::new([0xA1, 0, 0, 0]);
    const Y: Identifier = Identifier::new([0xA2, 0, 0, 0]);
    const STRANGER: Identifier = Identifier::new([0xEE, 0, 0, 0]);

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    fn registry() -> Registry {
        let mut registry = Registry::default();
        let position = registry.append_template(TEMPLATE).unwrap();
        registry.add_piece(position, X, PieceName::new("alpha")).unwrap();
        registry.add_piece(position, Y, PieceName::new("beta")).unwrap();
        registry.commit_template(position).unwrap();
        registry
    }

    fn session(registry: &Registry) -> VerificationSession<Duration> {
        VerificationSession::start(registry, &KioskConfig::default()).0
    }

    fn piece(session: &mut VerificationSession<Duration>, registry: &Registry, id: Identifier, at: u64) {
        session.handle_card(registry, ReaderId::Secondary, id, secs(at));
    }

    #[test]
    fn presenting_every_piece_completes() {
        let registry = registry();
        let mut session = session(&registry);

        session.handle_card(&registry, ReaderId::Primary, TEMPLATE, secs(0));
        piece(&mut session, &registry, X, 1);
        assert_eq!(session.last_outcome(), Some(VerificationOutcome::Accepted));

        piece(&mut session, &registry, Y, 2);
        assert_eq!(session.last_outcome(), Some(VerificationOutcome::Completed));
        assert_eq!(session.state(), &VerificationState::Complete { template: 0 });
    }

    #[test]
    fn repeated_piece_is_not_counted_twice() {
        let registry = registry();
        let mut session = session(&registry);
        session.handle_card(&registry, ReaderId::Primary, TEMPLATE, secs(0));

        piece(&mut session, &registry, X, 1);
        let actions = session.handle_card(&registry, ReaderId::Secondary, X, secs(2));

        assert_eq!(session.last_outcome(), Some(VerificationOutcome::AlreadyRead));
        assert!(actions.contains(&KioskAction::display("Peca ja lida", "alpha")));
        assert_eq!(session.remaining(), Some(&BTreeSet::from([1])));
    }

    #[test]
    fn unrelated_piece_is_incorrect() {
        let registry = registry();
        let mut session = session(&registry);
        session.handle_card(&registry, ReaderId::Primary, TEMPLATE, secs(0));

        let actions = session.handle_card(&registry, ReaderId::Secondary, STRANGER, secs(1));

        assert_eq!(session.last_outcome(), Some(VerificationOutcome::Incorrect));
        assert!(actions.contains(&KioskAction::Indicator { indicator: Indicator::Fault, on: true }));
        assert_eq!(session.remaining(), Some(&BTreeSet::from([0, 1])));
    }

    #[test]
    fn deadline_times_out_on_tick() {
        let registry = registry();
        let mut session = session(&registry);
        session.handle_card(&registry, ReaderId::Primary, TEMPLATE, secs(0));
        piece(&mut session, &registry, X, 5);

        assert!(session.tick(secs(19)).is_empty());
        let actions = session.tick(secs(20));

        assert_eq!(session.last_outcome(), Some(VerificationOutcome::TimedOut));
        assert_eq!(session.state(), &VerificationState::AwaitingTemplateCard);
        assert!(actions.contains(&KioskAction::display("Tempo esgotado", "Leia o gabarito")));
    }

    #[test]
    fn late_piece_does_not_complete() {
        let registry = registry();
        let mut session = session(&registry);
        session.handle_card(&registry, ReaderId::Primary, TEMPLATE, secs(0));
        piece(&mut session, &registry, X, 1);

        piece(&mut session, &registry, Y, 21);

        assert_eq!(session.last_outcome(), Some(VerificationOutcome::TimedOut));
        assert!(!session.is_complete());
    }

    #[test]
    fn release_ends_completed_session() {
        let registry = registry();
        let mut session = session(&registry);
        session.handle_card(&registry, ReaderId::Primary, TEMPLATE, secs(0));
        piece(&mut session, &registry, X, 1);
        piece(&mut session, &registry, Y, 2);

        let actions = session.release(&registry).unwrap();

        assert!(actions.contains(&KioskAction::Indicator { indicator: Indicator::Success, on: false }));
        assert_eq!(session.state(), &VerificationState::AwaitingTemplateCard);
        assert!(session.release(&registry).is_none());
    }

    #[test]
    fn unknown_template_stays_waiting() {
        let registry = registry();
        let mut session = session(&registry);

        session.handle_card(&registry, ReaderId::Primary, STRANGER, secs(0));

        assert_eq!(session.last_outcome(), Some(VerificationOutcome::TemplateUnknown));
        assert_eq!(session.state(), &VerificationState::AwaitingTemplateCard);
    }

    #[test]
    fn dual_reader_ignores_pieces_on_primary() {
        let registry = registry();
        let mut session = session(&registry);
        session.handle_card(&registry, ReaderId::Primary, TEMPLATE, secs(0));

        assert!(session.handle_card(&registry, ReaderId::Primary, X, secs(1)).is_empty());
        assert_eq!(session.remaining(), Some(&BTreeSet::from([0, 1])));
    }

    #[test]
    fn single_reader_reads_pieces_on_primary() {
        let registry = registry();
        let config = KioskConfig { piece_reader: ReaderId::Primary, ..Default::default() };
        let (mut session, _) = VerificationSession::start(&registry, &config);

        session.handle_card(&registry, ReaderId::Primary, TEMPLATE, secs(0));
        session.handle_card(&registry, ReaderId::Primary, X, secs(1));

        assert_eq!(session.remaining(), Some(&BTreeSet::from([1])));
    }

    #[test]
    fn empty_registry_shows_empty_list() {
        let registry = Registry::default();
        let (mut session, actions) =
            VerificationSession::<Duration>::start(&registry, &KioskConfig::default());

        assert!(actions.contains(&KioskAction::display("Lista vazia", "Cadastre antes")));

        session.handle_card(&registry, ReaderId::Primary, TEMPLATE, secs(0));
        assert_eq!(session.state(), &VerificationState::AwaitingTemplateCard);
    }
}
