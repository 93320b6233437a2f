//! Family tree engine.
//!
//! This crate provides:
//! - A member store whose spouse, parent and child links stay consistent
//!   under add, update and delete
//! - Tree materialization: the flat member graph as a rooted forest, with
//!   each couple shown once and their children grouped under them
//! - Persistence that tolerates older save layouts
//!
//! # Quick Start
//!
//! ```ignore
//! use family_core::{Attachment, FamilySession, Gender, NewMember, SessionConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut session = FamilySession::open(SessionConfig::from_env()).await;
//!
//!     let alice = session
//!         .add_member(NewMember::new("Alice", Gender::Female), Attachment::Root)
//!         .await
//!         .unwrap();
//!     session
//!         .add_member(NewMember::new("Bob", Gender::Male), Attachment::Spouse(alice))
//!         .await
//!         .unwrap();
//!
//!     for root in session.forest() {
//!         println!("{} ({} people)", root.member.name, root.size());
//!     }
//! }
//! ```

pub mod member;
pub mod persist;
pub mod sample;
pub mod session;
pub mod store;
pub mod testing;
pub mod tree;

// Primary public API
pub use member::{Attachment, Gender, Member, MemberId, MemberPatch, NewMember};
pub use persist::{FileStorage, MemoryStorage, PersistError, TreeStorage};
pub use session::{FamilySession, SessionConfig};
pub use store::{FamilyStore, MemberError};
pub use tree::{materialize, FamilyNode};
