// ============================================================================
// Routine Marker
// ============================================================================
//
// Flags a routine descriptor as autonomous while its body is being compiled.
// The descriptor moves through two phases:
//
//   Defining ──finish_definition()──> Defined
//
// The autonomous flag may only be set during `Defining`, and only once.
// Whether the remote link is installed is NOT checked here; a missing
// extension only surfaces when the routine is called.
//
// ============================================================================

use crate::core::{DispatchError, Result, RoutineId, SourceLocation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefinitionPhase {
    Defining,
    Defined,
}

/// Compiled routine as seen by the dispatch layer
#[derive(Debug, Clone)]
pub struct RoutineDescriptor {
    id: RoutineId,
    is_autonomous: bool,
    phase: DefinitionPhase,
}

impl RoutineDescriptor {
    /// Starts a descriptor for a routine whose body is being compiled
    pub fn new(id: RoutineId) -> Self {
        Self {
            id,
            is_autonomous: false,
            phase: DefinitionPhase::Defining,
        }
    }

    pub fn id(&self) -> RoutineId {
        self.id
    }

    pub fn is_autonomous(&self) -> bool {
        self.is_autonomous
    }

    pub fn phase(&self) -> DefinitionPhase {
        self.phase
    }

    /// Closes the definition; later directives are rejected
    pub fn finish_definition(&mut self) {
        self.phase = DefinitionPhase::Defined;
    }
}

/// Applies `PRAGMA AUTONOMOUS_TRANSACTION` to the routine being defined.
///
/// `descriptor` is `None` when the directive appears outside any routine body.
pub fn mark_autonomous(
    descriptor: Option<&mut RoutineDescriptor>,
    location: SourceLocation,
) -> Result<()> {
    let descriptor = descriptor.ok_or_else(|| DispatchError::Scope {
        message: "PRAGMA AUTONOMOUS_TRANSACTION must be inside a function or procedure".into(),
        location,
    })?;

    if descriptor.phase != DefinitionPhase::Defining {
        return Err(DispatchError::Scope {
            message: format!(
                "PRAGMA AUTONOMOUS_TRANSACTION cannot be applied to routine {} after its definition",
                descriptor.id
            ),
            location,
        });
    }

    if descriptor.is_autonomous {
        return Err(DispatchError::DuplicateDirective(location));
    }

    descriptor.is_autonomous = true;
    log::debug!("routine {} marked autonomous at {}", descriptor.id, location);
    Ok(())
}
