//! Cache-bust manifest: logical path -> fingerprinted path.
//!
//! The manifest is the only durable artifact the revision phase produces.
//! It lives at `<output>/<static_dir>/asset-manifest.json`, is fully
//! regenerated on every release build, and is read-only to every other
//! collaborator. Per-build lifecycle:
//!
//! ```text
//! EMPTY -> ACCUMULATING (record*) -> PERSISTED (persist) -> read-only (load/resolve)
//! ```
//!
//! A new build always starts from an empty manifest, so entries for
//! deleted assets cannot survive a rebuild.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use thiserror::Error;

use crate::log;

/// Manifest filename inside the static directory.
pub const MANIFEST_FILE: &str = "asset-manifest.json";

/// Revisioning errors surfaced to the build pipeline.
#[derive(Debug, Error)]
pub enum RevisionError {
    /// Same logical path recorded with two different fingerprinted paths
    /// within one build. A well-formed pipeline fingerprints each asset
    /// once; this is a build-configuration error, never silently resolved.
    #[error("conflicting manifest entries for '{logical}': '{existing}' vs '{incoming}'")]
    DuplicateEntry {
        logical: String,
        existing: String,
        incoming: String,
    },

    /// `record()` called after `persist()`. The manifest is sealed once
    /// written; a new build starts a fresh manifest.
    #[error("manifest already persisted; cannot record '{logical}'")]
    Sealed { logical: String },
}

/// Mapping of logical asset paths to fingerprinted output paths.
///
/// `record` is callable from parallel fingerprint workers; accumulation
/// order does not affect the persisted output (keys are sorted on write).
#[derive(Debug, Default)]
pub struct Manifest {
    entries: DashMap<String, String>,
    sealed: AtomicBool,
}

impl Manifest {
    /// Create an empty manifest (start of a build).
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one logical -> fingerprinted pair.
    ///
    /// Recording an identical pair twice is idempotent (re-running a phase
    /// is safe). Recording a *different* fingerprinted path for an already
    /// recorded logical path is a [`RevisionError::DuplicateEntry`].
    pub fn record(
        &self,
        logical: impl Into<String>,
        fingerprinted: impl Into<String>,
    ) -> Result<(), RevisionError> {
        let logical = logical.into();
        let fingerprinted = fingerprinted.into();

        if self.sealed.load(Ordering::Acquire) {
            return Err(RevisionError::Sealed { logical });
        }

        match self.entries.entry(logical) {
            Entry::Vacant(slot) => {
                slot.insert(fingerprinted);
                Ok(())
            }
            Entry::Occupied(existing) => {
                if *existing.get() == fingerprinted {
                    return Ok(());
                }
                Err(RevisionError::DuplicateEntry {
                    logical: existing.key().clone(),
                    existing: existing.get().clone(),
                    incoming: fingerprinted,
                })
            }
        }
    }

    /// Look up the fingerprinted path for a logical path.
    pub fn resolve(&self, logical: &str) -> Option<String> {
        self.entries.get(logical).map(|v| v.clone())
    }

    /// Number of recorded entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether any entries have been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize the complete mapping to `path`, replacing previous content.
    ///
    /// Writes a sibling temp file and renames it over the target, so a
    /// concurrent reader never observes a truncated or syntactically
    /// invalid manifest. Seals the manifest: later `record` calls error.
    pub fn persist(&self, path: &Path) -> Result<()> {
        self.sealed.store(true, Ordering::Release);

        // Sorted keys keep the artifact diffable and build-order independent
        let sorted: BTreeMap<String, String> = self
            .entries
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();

        let json = serde_json::to_vec_pretty(&sorted).context("failed to serialize manifest")?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, &json).with_context(|| format!("failed to write {}", tmp.display()))?;
        fs::rename(&tmp, path)
            .with_context(|| format!("failed to replace {}", path.display()))?;

        Ok(())
    }

    /// Read a previously persisted manifest.
    ///
    /// Returns `Ok(None)` when the file does not exist - callers fall back
    /// to unrewritten logical paths. A present-but-unreadable manifest is
    /// an error; development-mode callers degrade it to "absent" with a
    /// diagnostic.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        let content = match fs::read(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read {}", path.display()));
            }
        };

        let sorted: BTreeMap<String, String> = serde_json::from_slice(&content)
            .with_context(|| format!("malformed manifest at {}", path.display()))?;

        let manifest = Self {
            entries: sorted.into_iter().collect(),
            sealed: AtomicBool::new(true),
        };
        Ok(Some(manifest))
    }

    /// Well-known manifest location for an output tree.
    pub fn location(output: &Path, static_dir: &str) -> PathBuf {
        output.join(static_dir).join(MANIFEST_FILE)
    }
}

// =============================================================================
// Asset Resolver
// =============================================================================

/// URL resolution policy for template rendering.
///
/// Makes the "manifest present / absent" decision an explicit branch at
/// construction time instead of a file-existence check scattered across
/// rendering code.
#[derive(Debug)]
pub enum AssetResolver {
    /// Release rendering: manifest loaded, references rewritten to
    /// `/<static_dir>/<fingerprinted>`.
    Fingerprinted {
        manifest: Manifest,
        static_prefix: String,
    },
    /// Development rendering (or manifest absent): logical paths verbatim.
    Passthrough,
}

impl AssetResolver {
    /// Resolver over a freshly persisted manifest.
    pub fn fingerprinted(manifest: Manifest, static_dir: &str) -> Self {
        Self::Fingerprinted {
            manifest,
            static_prefix: format!("/{}", static_dir.trim_matches('/')),
        }
    }

    /// Resolver that leaves every reference untouched.
    pub fn passthrough() -> Self {
        Self::Passthrough
    }

    /// Load the resolver for an existing output tree.
    ///
    /// Absent manifest is not an error: rendering falls back to logical
    /// paths. An unreadable manifest is reported and likewise degraded.
    pub fn from_output(output: &Path, static_dir: &str) -> Self {
        let path = Manifest::location(output, static_dir);
        match Manifest::load(&path) {
            Ok(Some(manifest)) => Self::fingerprinted(manifest, static_dir),
            Ok(None) => Self::Passthrough,
            Err(e) => {
                log!("warning"; "ignoring unreadable manifest: {:#}", e);
                Self::Passthrough
            }
        }
    }

    /// Resolve a logical asset path to the URL to emit.
    ///
    /// Fingerprinted + hit: `/<static_dir>/<fingerprinted>`. Fingerprinted
    /// + miss (typo'd reference, asset outside the revisioned classes):
    /// warns and falls back to `/<logical>` - never fatal, one bad
    /// reference must not break a page render. Passthrough: `/<logical>`.
    pub fn resolve(&self, logical: &str) -> String {
        match self {
            Self::Fingerprinted {
                manifest,
                static_prefix,
            } => match manifest.resolve(logical) {
                Some(fingerprinted) => format!("{static_prefix}/{fingerprinted}"),
                None => {
                    log!("warning"; "no manifest entry for '{}', using logical path", logical);
                    format!("/{logical}")
                }
            },
            Self::Passthrough => format!("/{logical}"),
        }
    }

    /// Whether references are being rewritten through a manifest.
    pub fn is_fingerprinted(&self) -> bool {
        matches!(self, Self::Fingerprinted { .. })
    }

    /// The rooted static prefix (e.g. `/static`) when fingerprinting.
    ///
    /// References already under this prefix are final; rewriting must
    /// leave them untouched so the rewrite is idempotent.
    pub fn static_prefix(&self) -> Option<&str> {
        match self {
            Self::Fingerprinted { static_prefix, .. } => Some(static_prefix),
            Self::Passthrough => None,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
