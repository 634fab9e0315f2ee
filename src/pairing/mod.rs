//! Pairing command construction and periodic broadcast

mod broadcaster;
mod hash;

pub use broadcaster::PairingBroadcaster;
pub use hash::fnv1a_64;
