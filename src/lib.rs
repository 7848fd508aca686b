//! # patternkit
//!
//! In-memory toolkit for constructing and composing object graphs.
//!
//! ## Patterns Covered
//!
//! 1. **Abstract Factory** ([`family`])
//!    - Roles implemented by interchangeable products
//!    - Registry of named families, built all-or-nothing
//!
//! 2. **Builder** ([`assembler`])
//!    - One operation per step behind a `StepBuilder` trait
//!    - A director (`Assembler`) holding a fixed step order
//!
//! 3. **Prototype** ([`prototype`])
//!    - Explicit deep duplication, independent of `Clone`
//!    - Registry of named templates
//!
//! 4. **Composite** ([`composite`])
//!    - Leaf and container nodes in an index arena
//!    - Cycle-checked insertion, pre-order describe, count and folds
//!
//! Families and step orders can also be loaded from TOML ([`config`]);
//! [`catalog`] holds ready-made scenarios (furniture, meals, documents,
//! org charts).
//!
//! ## Threading
//!
//! Registries are populated once and can then be shared read-only. A
//! [`Tree`] has a single writer; callers needing more must lock around it.
//!
//! ## Key Dependencies
//!
//! - `thiserror` - error enum and cause chaining
//! - `tracing` - debug/trace events; the crate never installs a subscriber
//! - `serde`, `toml`, `serde_json` - catalog configuration and tree snapshots

pub mod assembler;
pub mod catalog;
pub mod composite;
pub mod config;
pub mod error;
pub mod family;
pub mod prototype;

pub use assembler::{run_steps, Assembler, StepBuilder};
pub use composite::{Describe, NodeId, NodeKind, Snapshot, Tree};
pub use config::{CatalogConfig, CatalogItem};
pub use error::{BoxError, Error, Result};
pub use family::{Family, FamilyFactory, FamilyRegistry, Product, Role, RoleTable};
pub use prototype::{Prototype, PrototypeRegistry};
