//! Output back ends. Three-address re-serialisation is the `Display`
//! implementation on the CFG types; the C translation and the control-flow
//! summary live here.

pub mod c;
pub mod cfg_dump;
