//! Host object protocol.
//!
//! An embedding application exposes its own objects to script by
//! implementing [`HostObject`]. The engine only asks the host about names it
//! has not materialized yet; an answer is cached in the object's property
//! table as an `External` slot carrying the host's property id, and later
//! reads and writes go straight to `get_property`/`set_property` by id.

use crate::error::HostError;
use crate::object::{CaseMode, PropFlags};
use crate::value::JsValue;

/// Host description of one property
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostPropDesc {
    /// Host-chosen id, stable for the lifetime of the object
    pub id: u32,
    pub flags: PropFlags,
}

impl HostPropDesc {
    pub fn new(id: u32, flags: PropFlags) -> Self {
        Self { id, flags }
    }
}

/// Result of a host property store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
    Accepted,
    /// The host declined; the engine keeps the value as a plain own property
    Rejected,
}

/// Capabilities an object provided by the embedding host must support.
///
/// Host objects manage their own lifetime, so the collector never treats
/// them as garbage. Methods take `&self`; implementations keep their state
/// behind interior mutability.
pub trait HostObject {
    /// Resolve a name the engine has not cached yet
    fn lookup_property(&self, name: &str, case: CaseMode) -> Result<Option<HostPropDesc>, HostError>;

    fn get_property(&self, id: u32) -> Result<JsValue, HostError>;

    fn set_property(&self, id: u32, value: &JsValue) -> Result<SetOutcome, HostError>;

    /// Returns whether the property is gone
    fn delete_property(&self, _id: u32) -> Result<bool, HostError> {
        Ok(false)
    }

    fn configure_property(&self, _id: u32, _flags: PropFlags) -> Result<SetOutcome, HostError> {
        Ok(SetOutcome::Rejected)
    }

    /// Every property the host knows about, used before enumeration
    fn fill_all_properties(&self) -> Result<Vec<(String, HostPropDesc)>, HostError> {
        Ok(Vec::new())
    }

    /// Text used when script converts the object to a string
    fn to_display_string(&self) -> Option<String> {
        None
    }
}
