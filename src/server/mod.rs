//! Editor protocol surface, independent of any transport.
//!
//! The [`Server`] owns the loader behind one request-level lock, so
//! requests are handled one at a time in arrival order. File lifecycle
//! notifications never fail: problems are logged and correctness feedback
//! arrives through the returned [`PublishDiagnostics`].

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use serde::Serialize;
use thiserror::Error;

use crate::base::Position;
use crate::config::Config;
use crate::hir::Diagnostic;
use crate::ide::{
    DefinitionError, FormatError, Location, TextEdit, format_document, goto_definition,
    lint_package,
};
use crate::loader::{Closed, LoadError, Loader};
use crate::project::{HostError, normalize};

/// Diagnostics replacing everything previously published for a file
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PublishDiagnostics {
    pub file: PathBuf,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("server is not initialized")]
    NotInitialized,

    #[error("could not load workspace: {0}")]
    Host(#[from] HostError),

    #[error("could not load workspace: {0}")]
    Load(#[from] LoadError),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Definition(#[from] DefinitionError),
}

#[derive(Debug)]
struct State {
    config: Config,
    loader: Option<Loader>,
}

#[derive(Debug)]
pub struct Server {
    state: Mutex<State>,
}

impl Server {
    pub fn new(config: Config) -> Self {
        Self {
            state: Mutex::new(State {
                config,
                loader: None,
            }),
        }
    }

    pub fn config(&self) -> Config {
        self.state.lock().config.clone()
    }

    /// Discover the module around `root` and track every package below it.
    /// Only the first call has any effect.
    pub fn initialize(&self, root: &Path) -> Result<(), ServerError> {
        let mut state = self.state.lock();
        if state.loader.is_some() {
            return Ok(());
        }
        let root = normalize(root);
        let mut loader = Loader::discover(&root)?;
        let packages = loader.track(&format!("{}/...", root.display()))?;
        tracing::info!(root = %root.display(), packages = packages.len(), "loaded workspace");
        state.loader = Some(loader);
        Ok(())
    }

    pub fn did_open(&self, path: &Path, text: String) -> Vec<PublishDiagnostics> {
        self.with_loader(|loader, config| {
            if let Err(e) = loader.add_file(&normalize(path), text) {
                tracing::warn!(file = %path.display(), error = %e, "could not add file");
            }
            publish(loader, config)
        })
    }

    pub fn did_change(&self, path: &Path, text: String) -> Vec<PublishDiagnostics> {
        self.with_loader(|loader, config| {
            if let Err(e) = loader.update_file(&normalize(path), text) {
                tracing::warn!(file = %path.display(), error = %e, "could not update file");
            }
            publish(loader, config)
        })
    }

    pub fn did_close(&self, path: &Path) -> Vec<PublishDiagnostics> {
        self.with_loader(|loader, config| {
            let path = normalize(path);
            let mut out = Vec::new();
            match loader.close_file(&path) {
                Ok(Closed::Evicted(_)) => out.push(PublishDiagnostics {
                    file: path,
                    diagnostics: Vec::new(),
                }),
                Ok(Closed::Dirty(_)) => {}
                Err(e) => tracing::warn!(file = %path.display(), error = %e, "could not close file"),
            }
            out.extend(publish(loader, config));
            out
        })
    }

    pub fn formatting(&self, path: &Path) -> Result<Vec<TextEdit>, ServerError> {
        let mut state = self.state.lock();
        let State { config, loader } = &mut *state;
        let loader = loader.as_mut().ok_or(ServerError::NotInitialized)?;
        Ok(format_document(loader, &normalize(path), &config.format)?)
    }

    pub fn definition(&self, path: &Path, position: Position) -> Result<Vec<Location>, ServerError> {
        let mut state = self.state.lock();
        let loader = state.loader.as_mut().ok_or(ServerError::NotInitialized)?;
        Ok(goto_definition(loader, &normalize(path), position)?)
    }

    fn with_loader(
        &self,
        f: impl FnOnce(&mut Loader, &Config) -> Vec<PublishDiagnostics>,
    ) -> Vec<PublishDiagnostics> {
        let mut state = self.state.lock();
        let State { config, loader } = &mut *state;
        match loader {
            Some(loader) => f(loader, config),
            None => {
                tracing::warn!("file notification before initialize");
                Vec::new()
            }
        }
    }
}

/// Recompute every dirty tracked package, each at most once. Packages
/// dirtied by a recomputation are picked up in the same pass.
fn publish(loader: &mut Loader, config: &Config) -> Vec<PublishDiagnostics> {
    let mut seen = FxHashSet::default();
    let mut out = Vec::new();
    loop {
        let dirty: Vec<_> = loader
            .dirty()
            .into_iter()
            .filter(|p| !seen.contains(p))
            .collect();
        if dirty.is_empty() {
            break;
        }
        for pkg in dirty {
            let mut diagnostics = loader.errors(&pkg);
            if config.lint {
                if let Some(node) = loader.package(&pkg) {
                    for (file, warnings) in lint_package(node) {
                        diagnostics.entry(file).or_default().extend(warnings);
                    }
                }
            }
            tracing::debug!(package = %pkg, files = diagnostics.len(), "publishing diagnostics");
            out.extend(
                diagnostics
                    .into_iter()
                    .map(|(file, diagnostics)| PublishDiagnostics { file, diagnostics }),
            );
            seen.insert(pkg);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn workspace(files: &[(&str, &str)]) -> TempDir {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("go.mod"), "module example.com/m\n").unwrap();
        for (rel, text) in files {
            let path = tmp.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, text).unwrap();
        }
        tmp
    }

    fn for_file<'a>(published: &'a [PublishDiagnostics], file: &Path) -> Vec<&'a Diagnostic> {
        published
            .iter()
            .filter(|p| p.file == file)
            .flat_map(|p| &p.diagnostics)
            .collect()
    }

    #[test]
    fn test_notifications_before_initialize_are_ignored() {
        let server = Server::new(Config::default());
        assert!(server.did_open(Path::new("/x/a.gunk"), "package a\n".to_string()).is_empty());
        assert!(matches!(
            server.formatting(Path::new("/x/a.gunk")),
            Err(ServerError::NotInitialized)
        ));
    }

    #[test]
    fn test_open_publishes_every_file() {
        let tmp = workspace(&[
            ("a/a.gunk", "package a\n\ntype T int\n"),
            ("a/b.gunk", "package a\n\ntype U Missing\n"),
        ]);
        let server = Server::new(Config::default());
        server.initialize(tmp.path()).unwrap();

        let a = normalize(&tmp.path().join("a/a.gunk"));
        let b = normalize(&tmp.path().join("a/b.gunk"));
        let published = server.did_open(&a, "package a\n\ntype T int\n".to_string());
        let files: Vec<_> = published.iter().map(|p| p.file.clone()).collect();
        assert_eq!(files, vec![a.clone(), b.clone()]);
        assert!(for_file(&published, &a).is_empty());
        assert_eq!(for_file(&published, &b)[0].message, "undefined: Missing");
    }

    #[test]
    fn test_change_republishes_importers() {
        let tmp = workspace(&[
            ("a/a.gunk", "package a\n\ntype T struct {\n\tName string `pb:\"1\"`\n}\n"),
            (
                "b/b.gunk",
                "package b\n\nimport \"example.com/m/a\"\n\n// +gunk a.T{Name: \"x\"}\ntype U int\n",
            ),
        ]);
        let server = Server::new(Config::default());
        server.initialize(tmp.path()).unwrap();
        let a = normalize(&tmp.path().join("a/a.gunk"));
        let b = normalize(&tmp.path().join("b/b.gunk"));
        server.did_open(&a, fs::read_to_string(&a).unwrap());
        server.did_open(&b, fs::read_to_string(&b).unwrap());

        let published = server.did_change(
            &a,
            "package a\n\ntype T struct {\n\tTitle string `pb:\"1\"`\n}\n".to_string(),
        );
        let in_b = for_file(&published, &b);
        assert_eq!(in_b.len(), 1);
        assert_eq!(in_b[0].message, "unknown field Name in struct literal of type a.T");
        assert_eq!(in_b[0].code, "type error");
    }

    #[test]
    fn test_lint_is_merged_when_enabled() {
        let tmp = workspace(&[("a/a.gunk", "package a\n\ntype T int\n")]);
        let server = Server::new(Config {
            lint: true,
            ..Config::default()
        });
        server.initialize(tmp.path()).unwrap();
        let a = normalize(&tmp.path().join("a/a.gunk"));
        let published = server.did_open(&a, "package a\n\ntype T int\n".to_string());
        let diagnostics = for_file(&published, &a);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, "commentstart");
    }

    #[test]
    fn test_close_in_memory_file_clears_it() {
        let tmp = workspace(&[]);
        fs::create_dir_all(tmp.path().join("fresh")).unwrap();
        let server = Server::new(Config::default());
        server.initialize(tmp.path()).unwrap();
        let file = normalize(&tmp.path().join("fresh/x.gunk"));
        server.did_open(&file, "package fresh\n\ntype T Missing\n".to_string());

        let published = server.did_close(&file);
        assert_eq!(
            published,
            vec![PublishDiagnostics {
                file,
                diagnostics: Vec::new(),
            }]
        );
    }
}
