//! Core of the shadow duel encounter: combat rules, the boss director and the
//! session synchronizer. No engine types cross this boundary; the client feeds
//! a [`sim::Simulation`] once per frame and renders what it reports.

pub mod archetype;
pub mod arena;
pub mod combat;
pub mod combatant;
pub mod director;
pub mod input;
pub mod protocol;
pub mod replication;
pub mod resolver;
pub mod rng;
pub mod session;
pub mod sim;
pub mod store;

pub use archetype::{AiWeights, Archetype, SpecialMove};
pub use combat::AttackKind;
pub use combatant::{Combatant, PeerId};
pub use director::{AiState, BossDirector};
pub use session::{SessionConfig, SessionError, SessionSync};
pub use sim::{Authority, LocalInput, SimEvent, Simulation};
pub use store::{MemoryStore, SessionStore, StoreError};
