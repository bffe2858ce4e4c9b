pub mod descriptor;
pub mod entity;
pub mod identity;
pub mod properties;
pub mod state;

pub use descriptor::{EntityType, ModelRegistry, NavigationDescriptor, NavigationKind, NavigationRole};
pub use entity::{Entity, NavigationValue};
pub use identity::{EntityIdentity, EntityKey, EntityRef};
pub use properties::Properties;
pub use state::{TrackingState, TransitionCause};
