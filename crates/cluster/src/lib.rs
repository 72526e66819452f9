//! Best-effort gossip overlay: membership, a pluggable flood transport,
//! and the nflog/silence merge glue that keeps peers eventually
//! consistent. Implements [`relaymux_pipeline::ClusterView`] so the
//! notification pipeline can stagger sends and skip a redundant one
//! once a peer has already notified.

pub mod error;
pub mod frame;
pub mod keyring;
pub mod lock;
pub mod membership;
pub mod node;
pub mod transport;

pub use error::ClusterError;
pub use frame::GossipFrame;
pub use keyring::KeyRing;
pub use lock::AntiEntropyLock;
pub use membership::{Membership, Peer, PeerId};
pub use node::ClusterNode;
pub use transport::{ChannelTransport, GossipTransport};
