//! Repo-local architectural lint for the console data layer.
//!
//! The `frontend` crate is split into three layers under `src/`:
//!
//! - `domain`: ports, controllers, sessions and request keys
//! - `screens`: per-screen row types and list descriptors
//! - `outbound`: the reqwest client, credential files and notifiers
//!
//! Screens and domain code talk to the outside world only through the port
//! traits, so neither may name `outbound` modules or transport crates.
//! Outbound adapters implement ports and must not reach into `screens`.
//!
//! Run it with `cargo run -p architecture-lint` from anywhere in the
//! workspace.

use std::collections::BTreeSet;
use std::fmt;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs::Dir;
use syn::visit::Visit;

/// Crate name under which integration code refers to the linted crate.
const CRATE_NAME: &str = "frontend";

/// Crates that only the outer edges of the console may use.
const TRANSPORT_CRATES: [&str; 7] = [
    "camino",
    "cap_std",
    "clap",
    "color_eyre",
    "ortho_config",
    "reqwest",
    "tracing_subscriber",
];

/// A single boundary violation discovered by the linter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// File path relative to `frontend/src`.
    pub file: Utf8PathBuf,
    /// Human-readable description of the violated rule.
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.file, self.message)
    }
}

/// Failure modes returned by the architecture lint.
#[derive(Debug)]
pub enum ArchitectureLintError {
    /// Filesystem traversal or reading failed.
    Io(io::Error),
    /// A directory entry under `src/` was not valid UTF-8.
    NonUtf8Name(String),
    /// Rust source parsing failed.
    Parse { file: Utf8PathBuf, message: String },
    /// One or more boundary violations were found.
    Violations(Vec<Violation>),
}

impl fmt::Display for ArchitectureLintError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "I/O error while linting architecture: {err}"),
            Self::NonUtf8Name(name) => write!(f, "source entry name is not UTF-8: {name}"),
            Self::Parse { file, message } => write!(
                f,
                "Failed to parse Rust source while linting architecture ({file}): {message}"
            ),
            Self::Violations(violations) => {
                writeln!(f, "Architecture boundary violations:")?;
                for violation in violations {
                    writeln!(f, "- {violation}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ArchitectureLintError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for ArchitectureLintError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

/// Lint the console crate sources on disk.
///
/// `frontend_dir` must be the `frontend/` directory at the repository root.
pub fn lint_frontend_sources(frontend_dir: &Utf8Path) -> Result<(), ArchitectureLintError> {
    let src = Dir::open_ambient_dir(frontend_dir.join("src"), ambient_authority())?;
    let sources = collect_lint_sources(&src)?;
    lint_sources(&sources)
}

/// Lint the provided Rust sources. Intended for unit and behaviour tests.
pub fn lint_sources(sources: &[LintSource]) -> Result<(), ArchitectureLintError> {
    let mut violations = Vec::new();

    for source in sources {
        let layer = Layer::infer_from_path(&source.file).ok_or_else(|| {
            ArchitectureLintError::Parse {
                file: source.file.clone(),
                message: "unable to infer layer from file path".to_owned(),
            }
        })?;
        let parsed =
            syn::parse_file(&source.contents).map_err(|err| ArchitectureLintError::Parse {
                file: source.file.clone(),
                message: err.to_string(),
            })?;
        violations.extend(lint_parsed_source(&source.file, layer, &parsed));
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ArchitectureLintError::Violations(violations))
    }
}

/// A Rust source file to be linted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintSource {
    /// Path relative to `frontend/src`.
    pub file: Utf8PathBuf,
    pub contents: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layer {
    Domain,
    Screens,
    Outbound,
}

impl Layer {
    const ALL: [Self; 3] = [Self::Domain, Self::Screens, Self::Outbound];

    fn infer_from_path(relative_path: &Utf8Path) -> Option<Self> {
        let first = relative_path.components().next()?.as_str();
        Self::ALL.into_iter().find(|layer| layer.dir() == first)
    }

    const fn dir(self) -> &'static str {
        match self {
            Self::Domain => "domain",
            Self::Screens => "screens",
            Self::Outbound => "outbound",
        }
    }

    fn forbidden_module_roots(self) -> BTreeSet<&'static str> {
        match self {
            Self::Domain => BTreeSet::from(["outbound", "screens"]),
            Self::Screens => BTreeSet::from(["outbound"]),
            Self::Outbound => BTreeSet::from(["screens"]),
        }
    }

    fn forbidden_crate_roots(self) -> BTreeSet<&'static str> {
        match self {
            Self::Domain | Self::Screens => BTreeSet::from(TRANSPORT_CRATES),
            Self::Outbound => BTreeSet::from(["clap", "color_eyre", "ortho_config"]),
        }
    }
}

fn lint_parsed_source(file: &Utf8Path, layer: Layer, parsed: &syn::File) -> Vec<Violation> {
    let forbidden_modules = layer.forbidden_module_roots();
    let forbidden_crates = layer.forbidden_crate_roots();
    let layer_name = layer.dir();

    let mut collector = PathCollector::default();
    collector.visit_file(parsed);

    let mut messages = BTreeSet::new();
    for segments in &collector.paths {
        if let Some(root) = internal_module_root(segments)
            .and_then(|root| forbidden_modules.get(root).copied())
        {
            messages.insert(format!(
                "{layer_name} module must not depend on crate::{root}"
            ));
        }

        if let Some(root) =
            external_crate_root(segments).and_then(|root| forbidden_crates.get(root).copied())
        {
            messages.insert(format!(
                "{layer_name} module must not depend on external crate `{root}`"
            ));
        }
    }

    messages
        .into_iter()
        .map(|message| Violation {
            file: file.to_path_buf(),
            message,
        })
        .collect()
}

fn is_relative_module_segment(segment: &str) -> bool {
    matches!(segment, "crate" | "self" | "super")
}

fn is_layer_root(segment: &str) -> bool {
    Layer::ALL.iter().any(|layer| layer.dir() == segment)
}

fn internal_module_root(segments: &[String]) -> Option<&str> {
    let first = segments.first()?.as_str();
    if is_layer_root(first) {
        return Some(first);
    }
    let start_index = if is_relative_module_segment(first) {
        segments
            .iter()
            .position(|segment| !is_relative_module_segment(segment))?
    } else if first == CRATE_NAME {
        1
    } else {
        return None;
    };
    segments.get(start_index).map(String::as_str)
}

fn external_crate_root(segments: &[String]) -> Option<&str> {
    let root = segments.first()?.as_str();
    if is_relative_module_segment(root) || root == CRATE_NAME {
        return None;
    }
    Some(root)
}

#[derive(Default)]
struct PathCollector {
    paths: BTreeSet<Vec<String>>,
}

impl PathCollector {
    fn record_path(&mut self, path: &syn::Path) {
        let segments = path
            .segments
            .iter()
            .map(|segment| segment.ident.to_string())
            .collect::<Vec<_>>();
        if !segments.is_empty() {
            self.paths.insert(segments);
        }
    }

    fn record_use_tree(&mut self, tree: &syn::UseTree, mut prefix: Vec<String>) {
        match tree {
            syn::UseTree::Path(path) => {
                prefix.push(path.ident.to_string());
                self.record_use_tree(&path.tree, prefix);
            }
            syn::UseTree::Name(name) => {
                prefix.push(name.ident.to_string());
                self.paths.insert(prefix);
            }
            syn::UseTree::Rename(rename) => {
                prefix.push(rename.ident.to_string());
                self.paths.insert(prefix);
            }
            syn::UseTree::Glob(_) => {
                prefix.push("*".to_owned());
                self.paths.insert(prefix);
            }
            syn::UseTree::Group(group) => {
                for item in &group.items {
                    self.record_use_tree(item, prefix.clone());
                }
            }
        }
    }
}

impl<'ast> Visit<'ast> for PathCollector {
    fn visit_path(&mut self, node: &'ast syn::Path) {
        self.record_path(node);
        syn::visit::visit_path(self, node);
    }

    fn visit_item_use(&mut self, node: &'ast syn::ItemUse) {
        self.record_use_tree(&node.tree, Vec::new());
    }
}

fn collect_lint_sources(src: &Dir) -> Result<Vec<LintSource>, ArchitectureLintError> {
    let mut sources = Vec::new();
    for layer in Layer::ALL {
        let Ok(dir) = src.open_dir(layer.dir()) else {
            continue;
        };
        collect_sources_under(&dir, Utf8Path::new(layer.dir()), &mut sources)?;
    }
    Ok(sources)
}

fn collect_sources_under(
    dir: &Dir,
    relative: &Utf8Path,
    sources: &mut Vec<LintSource>,
) -> Result<(), ArchitectureLintError> {
    for entry in dir.entries()? {
        let entry = entry?;
        let name = entry
            .file_name()
            .into_string()
            .map_err(|raw| ArchitectureLintError::NonUtf8Name(raw.to_string_lossy().into_owned()))?;
        let path = relative.join(&name);
        if entry.file_type()?.is_dir() {
            collect_sources_under(&entry.open_dir()?, &path, sources)?;
            continue;
        }
        if path.extension() != Some("rs") {
            continue;
        }
        let contents = dir.read_to_string(&name)?;
        sources.push(LintSource {
            file: path,
            contents,
        });
    }
    Ok(())
}
