//! Version management logic for rtenv.
//!
//! This crate is independent of the command line and of the concrete
//! builder:
//! - Resolving version specifiers against a definition catalog.
//! - The on-disk version store and version files.
//! - Selecting the active version and routing shimmed commands to it.
//! - Hook registration and execution.
//! - Installing, uninstalling and regenerating shims.

pub mod config;
pub mod dispatch;
pub mod hooks;
pub mod installer;
pub mod rehash;
pub mod resolver;
pub mod store;
pub mod uninstall;
pub mod version_file;

/// Explicit configuration assembled from the environment and settings file.
pub use config::{Config, HookPolicy, SelectionOrder, Settings, SettingsError};
/// Active-version selection and command routing.
pub use dispatch::{
    ActiveVersion, CommandTarget, DispatchError, Dispatcher, SYSTEM_VERSION, VersionOrigin,
};
/// Typed lifecycle callbacks and plugin hook scripts.
pub use hooks::{HookContext, HookError, HookPhase, HookRegistry, HookReport, ScriptHook};
/// Install orchestration around the external builder.
pub use installer::{
    DefinitionNotFound, InstallError, InstallOptions, InstallOutcome, InstallRequest, Installer,
    UpgradeGuidance,
};
/// Shim regeneration.
pub use rehash::{RehashError, RehashReport, rehash};
/// Specifier parsing and definition selection.
pub use resolver::{ResolveError, Resolver, Specifier, suggestions};
/// Installed versions on disk.
pub use store::{StoreError, VersionStore, validate_name};
/// Removal of installed versions.
pub use uninstall::{UninstallError, UninstallOutcome, uninstall};
/// Reading and writing version files.
pub use version_file::{LOCAL_VERSION_FILE, VersionFile, find_local_version_file};
