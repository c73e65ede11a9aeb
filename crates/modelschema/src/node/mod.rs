//! Registration-time description of model types.
//!
//! Model authors describe each type's accessor shape here instead of the
//! registry reflecting over it. A node is plain data until it is registered;
//! registration validates it and moves any implementations into the
//! registry's generation arena.

mod method;
mod model_type;

pub use method::*;
pub use model_type::*;

use modelschema_error::ErrorTree;

///
/// ValidateNode
/// Local structural checks run before a node is accepted by the registry.
///

pub trait ValidateNode {
    fn validate(&self) -> Result<(), ErrorTree> {
        Ok(())
    }
}
