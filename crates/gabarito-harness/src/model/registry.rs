//! Model registry: an ordered list of kits.

use gabarito_proto::Identifier;

use super::operation::OperationError;

/// A committed kit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelTemplate {
    /// Template card.
    pub identifier: Identifier,
    /// Pieces in registration order, with their names.
    pub pieces: Vec<(Identifier, String)>,
}

/// Reference registry.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    master: Identifier,
    templates: Vec<ModelTemplate>,
    max_templates: usize,
    max_pieces: usize,
}

impl ModelRegistry {
    /// An enrolled, empty registry.
    pub fn new(master: Identifier, max_templates: usize, max_pieces: usize) -> Self {
        Self { master, templates: Vec::new(), max_templates, max_pieces }
    }

    /// Enrolled master.
    pub fn master(&self) -> Identifier {
        self.master
    }

    /// Committed kits in order.
    pub fn templates(&self) -> &[ModelTemplate] {
        &self.templates
    }

    /// Kit with the given template card.
    pub fn find(&self, identifier: &Identifier) -> Option<&ModelTemplate> {
        self.templates.iter().find(|t| t.identifier == *identifier)
    }

    /// Register a kit in one go.
    ///
    /// Capacity is checked before duplicates. Repeated pieces are skipped,
    /// and pieces past the template capacity are never read.
    pub fn register(
        &mut self,
        identifier: Identifier,
        pieces: impl IntoIterator<Item = (Identifier, String)>,
    ) -> Result<(), OperationError> {
        if self.templates.len() >= self.max_templates {
            return Err(OperationError::CapacityExceeded);
        }
        if self.find(&identifier).is_some() {
            return Err(OperationError::DuplicateTemplate);
        }

        let mut kept: Vec<(Identifier, String)> = Vec::new();
        for (piece, name) in pieces {
            if kept.len() >= self.max_pieces {
                break;
            }
            if kept.iter().any(|(id, _)| *id == piece) {
                continue;
            }
            kept.push((piece, name));
        }

        if kept.is_empty() {
            return Err(OperationError::NoPieces);
        }
        self.templates.push(ModelTemplate { identifier, pieces: kept });
        Ok(())
    }

    /// Remove the kit at a 1-based index.
    pub fn delete(&mut self, index: usize) -> Result<(), OperationError> {
        if index == 0 || index > self.templates.len() {
            return Err(OperationError::InvalidIndex);
        }
        self.templates.remove(index - 1);
        Ok(())
    }

    /// Remove every kit. The master stays.
    pub fn wipe(&mut self) {
        self.templates.clear();
    }
}
