//! Model world: applies operations to the reference registry.

use gabarito_proto::{Identifier, RegistryImage};

use super::{
    operation::{
        MASTER, Operation, OperationError, OperationResult, piece_card, piece_name,
        planned_pieces, template_card,
    },
    registry::ModelRegistry,
};

/// Observable state for oracle comparison.
///
/// What an operator could learn from a station: the enrolled master and
/// every kit with its named pieces, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservableState {
    /// Enrolled master.
    pub master: Option<Identifier>,
    /// Kits in registration order.
    pub templates: Vec<(Identifier, Vec<(Identifier, String)>)>,
}

impl ObservableState {
    /// State held by a registry image, as decoded from a medium or taken
    /// from a live registry.
    pub fn from_image(image: &RegistryImage) -> Self {
        let templates = image
            .templates
            .iter()
            .map(|template| {
                let pieces = template
                    .pieces
                    .iter()
                    .map(|piece| (piece.identifier, piece.name.as_str().to_owned()))
                    .collect();
                (template.identifier, pieces)
            })
            .collect();
        Self { master: image.master, templates }
    }
}

/// Reference implementation of a station.
#[derive(Debug, Clone)]
pub struct ModelWorld {
    registry: ModelRegistry,
    max_pieces: usize,
}

impl ModelWorld {
    /// A world whose master is already enrolled.
    pub fn new(max_templates: usize, max_pieces: usize) -> Self {
        Self { registry: ModelRegistry::new(MASTER, max_templates, max_pieces), max_pieces }
    }

    /// The reference registry.
    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Apply an operation and return the result.
    pub fn apply(&mut self, op: &Operation) -> OperationResult {
        let result = match op {
            Operation::RegisterKit { template, pieces } => {
                let pieces = planned_pieces(pieces, self.max_pieces)
                    .iter()
                    .map(|&seed| (piece_card(seed), piece_name(seed)));
                self.registry.register(template_card(*template), pieces)
            },
            Operation::Delete { index } => self.registry.delete(usize::from(*index)),
            Operation::Wipe => {
                self.registry.wipe();
                Ok(())
            },
            Operation::VerifyKit { template } => self
                .registry
                .find(&template_card(*template))
                .map(|_| ())
                .ok_or(OperationError::UnknownTemplate),
            Operation::Restart | Operation::AdvanceTime { .. } => Ok(()),
        };

        match result {
            Ok(()) => OperationResult::Ok,
            Err(err) => OperationResult::Rejected(err),
        }
    }

    /// Extract observable state for comparison.
    pub fn observable_state(&self) -> ObservableState {
        let templates = self
            .registry
            .templates()
            .iter()
            .map(|template| (template.identifier, template.pieces.clone()))
            .collect();
        ObservableState { master: Some(self.registry.master()), templates }
    }
}
