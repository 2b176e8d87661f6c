//! In-crate phylogenetics primitives: neighbor-joining, guided neighbor-joining, join
//! costs, reconciliation, and the likelihood scores the tree scorer selects among.
//!
//! spec.md lists these as external library collaborators (`stPhylogeny`,
//! `stPinchPhylogeny`); no public crate provides cactus's exact internals, so this
//! module provides documented, workable implementations of the same algorithms. See
//! `DESIGN.md`'s Open Question decisions for where a simplification was made.

pub mod bootstrap;
pub mod guided_nj;
pub mod join_cost;
pub mod likelihood;
pub mod neighbor_join;
pub mod recon_likelihood;
pub mod reconcile;

pub use join_cost::JoinCosts;
pub use reconcile::Reconciliation;
