use thiserror::Error;

/// Errors raised while building the entity/parameter/variable data model.
///
/// Device behaviours and drivers in the other workspace crates wrap this
/// error (via `#[from]`) rather than duplicating these variants.
#[derive(Error, Debug)]
pub enum Error {
    /// A scalar parameter fell outside its valid domain (e.g. `R <= 0`).
    #[error("bad parameter on '{entity}': {reason}")]
    BadParameter { entity: String, reason: String },

    /// A named entity reference (e.g. a controlling source) could not be resolved.
    #[error("unknown entity: {0}")]
    UnknownEntity(String),

    /// A named variable reference could not be resolved in the variable set.
    #[error("unknown variable: {0}")]
    UnknownVariable(String),

    /// Two entities were added to a `Circuit` under the same name.
    #[error("duplicate entity: {0}")]
    DuplicateEntity(String),

    /// `VariableSet::create` was called twice for the same name with different kinds.
    #[error("duplicate variable '{0}': requested kind does not match the existing one")]
    DuplicateVariable(String),

    /// A parameter was read with the wrong type (e.g. `get_real` on a string parameter).
    #[error("parameter '{name}' has the wrong type: {reason}")]
    InvalidParameterType { name: String, reason: String },

    /// A required parameter was never set and has no default.
    #[error("missing parameter: {0}")]
    MissingParameter(String),

    /// The caller's cancellation token fired.
    #[error("simulation cancelled")]
    Cancelled,
}
