// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(warnings)]                    // All warnings are treated as errors
#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # azad provision
//!
//! Declarative provisioning of Azure AD Domain Services, plus read-only
//! lookups of Azure AD service principals, applications and Azure Policy
//! definitions.
//!
//! ## Overview
//!
//! Managed domains take close to an hour to provision, so the core of the
//! crate is a long-running operation reconciler that turns "start an
//! operation, then poll it" into a single awaited call with a deadline and
//! cooperative cancellation. Around it sit:
//!
//! - Domain Services lifecycle handling (create, read, delete, import)
//! - A disambiguating lookup that resolves a directory entity by exactly one
//!   of several keys, scanning paginated listings lazily
//! - A YAML configuration, a local state file, and a plan/apply workflow
//!
//! ## Modules
//!
//! - [`lro`]: Long-running operation reconciler
//! - [`lookup`]: Disambiguating entity lookup
//! - [`azure`]: Resource Manager and Azure AD Graph clients
//! - [`resources`]: Domain Services handler and data sources
//! - [`config`]: Configuration parsing, validation and fingerprinting
//! - [`state`]: Local state storage with locking
//! - [`planner`]: Diff computation, planning and execution
//! - [`context`]: Credentials and the shared provider context
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! provider:
//!   subscription_id: 00000000-0000-0000-0000-000000000000
//!   tenant_id: 00000000-0000-0000-0000-000000000000
//!   client_id: 00000000-0000-0000-0000-000000000000
//!
//! domain_services:
//!   - name: corp
//!     resource_group_name: identity-rg
//!     domain_name: corp.example.com
//!     tenant_id: 00000000-0000-0000-0000-000000000000
//!     virtual_network_id: /subscriptions/.../virtualNetworks/core-vnet
//!     subnet_id: /subscriptions/.../virtualNetworks/core-vnet/subnets/aadds
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod azure;
pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod lookup;
pub mod lro;
pub mod planner;
pub mod resources;
pub mod state;

// ============================================================================
// Re-exports
// ============================================================================

pub use azure::{ArmClient, GraphClient, ResourceId};
pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{AzadConfig, ConfigHasher, ConfigParser, ConfigValidator};
pub use context::{Credentials, ProviderContext};
pub use error::{AzadError, Result};
pub use lookup::{EntitySource, LookupQuery};
pub use lro::{LroReconciler, OperationContext, OperationPoller, PollSettings};
pub use planner::{DiffEngine, PlanExecutor, ProvisionPlan};
pub use resources::{DomainServicesResource, DomainServicesState};
pub use state::{LocalStateStore, ProviderState, StateStore};
