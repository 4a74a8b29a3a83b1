//! Emission pipeline: run a target over a data model, merge the fragments
//! into per-file buffers, then post-process and persist them.
//!
//! ## Run protocol
//!
//! 1. Resolve the target; unknown names fail before anything is touched.
//! 2. Apply flag defaults and the target's context hook.
//! 3. Build the function environment (target set or baseline, plus script).
//! 4. Run the target's generation logic, collecting fragments.
//! 5. Sort fragments by `(template, type, name)`.
//! 6. Render package templates (non-append runs) and move their names to the
//!    front of the processing order.
//! 7. Merge fragments into file buffers in processing order, seeding each new
//!    buffer from disk (append), the header template, or nothing.
//!
//! [`Emission::write`] then post-processes and writes every buffer; failures
//! there are recorded per file.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use similar::TextDiff;

use stencil_core::{RunConfig, Template, TemplateSource};
use stencil_renderer::{build_funcs, FuncMap, Renderer};

use crate::error::{io_err, EngineError, FileError};
use crate::registry::Registry;
use crate::target::Target;

// ---------------------------------------------------------------------------
// Fragments and buffers
// ---------------------------------------------------------------------------

/// One rendered template paired with the descriptor that produced it.
#[derive(Debug, Clone)]
pub struct Fragment {
    pub template: Template,
    pub buf: Vec<u8>,
}

/// Merged content and collected errors for one output file.
#[derive(Debug)]
pub struct FileBuffer {
    name: String,
    buf: Vec<u8>,
    errors: Vec<FileError>,
}

impl FileBuffer {
    fn new(name: String, buf: Vec<u8>) -> Self {
        FileBuffer {
            name,
            buf,
            errors: Vec::new(),
        }
    }

    /// File name relative to the output directory.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content(&self) -> &[u8] {
        &self.buf
    }

    pub fn errors(&self) -> &[FileError] {
        &self.errors
    }
}

// ---------------------------------------------------------------------------
// Emitter
// ---------------------------------------------------------------------------

/// Run-scoped handle given to a target's generation logic.
pub struct Emitter<'a> {
    config: &'a RunConfig,
    renderer: &'a Renderer,
    fragments: Vec<Fragment>,
}

impl<'a> Emitter<'a> {
    fn new(config: &'a RunConfig, renderer: &'a Renderer) -> Self {
        Emitter {
            config,
            renderer,
            fragments: Vec::new(),
        }
    }

    pub fn config(&self) -> &RunConfig {
        self.config
    }

    /// Render `tpl` without recording it.
    pub fn exec(&self, tpl: &Template) -> Result<Vec<u8>, EngineError> {
        Ok(self.renderer.exec(tpl)?)
    }

    /// Render `tpl` and record the fragment for merging.
    pub fn emit(&mut self, tpl: Template) -> Result<(), EngineError> {
        let buf = self.exec(&tpl)?;
        tracing::debug!(template = %tpl, bytes = buf.len(), "emitted");
        self.fragments.push(Fragment { template: tpl, buf });
        Ok(())
    }

    /// Fragments emitted so far, in emission order.
    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }
}

// ---------------------------------------------------------------------------
// process
// ---------------------------------------------------------------------------

/// Run the target named by `config.template_type` over `model`.
///
/// Any error returned here is fatal and leaves the output directory
/// untouched.
pub fn process(
    registry: &Registry,
    mut config: RunConfig,
    model: &Value,
) -> Result<Emission, EngineError> {
    let name = config.template_type.clone();
    let target = Arc::clone(registry.get(&name).ok_or_else(|| {
        EngineError::UnknownTemplate { name: name.clone() }
    })?);
    tracing::info!(target_name = %name, append = config.append, "processing");

    config.apply_flag_defaults(&target.flag_sets(&name));
    if let Some(hook) = &target.build_context {
        hook(&mut config);
    }

    let source: Arc<dyn TemplateSource> = match &config.src {
        Some(src) => Arc::clone(src),
        None => Arc::clone(&target.files),
    };
    let base = match &target.funcs {
        Some(funcs) => funcs(&config),
        None => FuncMap::base(),
    };
    let funcs = build_funcs(base, source.as_ref(), &config).map_err(EngineError::Funcs)?;
    let renderer =
        Renderer::new(source, funcs, target.file_ext.clone()).with_cancel(config.cancel.clone());

    let mut emitter = Emitter::new(&config, &renderer);
    (target.generate)(&mut emitter, model)?;
    let mut fragments = emitter.fragments;
    fragments.sort_by(|a, b| a.template.sort_key().cmp(&b.template.sort_key()));

    let mut order = target.order.clone();
    if !config.append {
        if let Some(package_templates) = &target.package_templates {
            let mut package = Vec::new();
            for tpl in package_templates(&config) {
                let buf = renderer.exec(&tpl)?;
                tracing::debug!(template = %tpl, "rendered package template");
                if !package.contains(&tpl.template) {
                    package.push(tpl.template.clone());
                }
                fragments.push(Fragment { template: tpl, buf });
            }
            order.retain(|n| !package.contains(n));
            package.append(&mut order);
            order = package;
        }
    }
    dedup_in_place(&mut order);

    let files = merge(&target, &renderer, &config, &order, &fragments)?;
    Ok(Emission {
        target,
        config,
        files,
        post_processed: false,
    })
}

fn merge(
    target: &Target,
    renderer: &Renderer,
    config: &RunConfig,
    order: &[String],
    fragments: &[Fragment],
) -> Result<BTreeMap<String, FileBuffer>, EngineError> {
    let ext = if config.suffix.is_empty() {
        target.file_ext.as_str()
    } else {
        config.suffix.as_str()
    };
    let mut files = BTreeMap::new();
    for name in order {
        for frag in fragments.iter().filter(|f| &f.template.template == name) {
            let file = match config.single_file() {
                Some(single) => single.to_string(),
                None => format!("{}{}", (target.file_name)(config, &frag.template), ext),
            };
            let buffer = match files.entry(file) {
                Entry::Occupied(e) => e.into_mut(),
                Entry::Vacant(e) => {
                    let seed = load_file(target, renderer, config, e.key())?;
                    let name = e.key().clone();
                    e.insert(FileBuffer::new(name, seed))
                }
            };
            buffer.buf.extend_from_slice(&frag.buf);
        }
    }
    Ok(files)
}

/// Initial content for a newly seen output file.
fn load_file(
    target: &Target,
    renderer: &Renderer,
    config: &RunConfig,
    file: &str,
) -> Result<Vec<u8>, EngineError> {
    let path = config.out.join(file);
    let meta = match std::fs::metadata(&path) {
        Ok(meta) => Some(meta),
        Err(e) if e.kind() == ErrorKind::NotFound || !config.append => None,
        Err(e) => return Err(io_err(path, e)),
    };
    if meta.as_ref().is_some_and(|m| m.is_dir()) {
        return Err(EngineError::IsDirectory { path });
    }
    if meta.is_some() && config.append {
        tracing::debug!(file, "appending to existing file");
        return std::fs::read(&path).map_err(|e| io_err(path, e));
    }
    match &target.header {
        Some(header) => {
            tracing::debug!(file, "seeding with header");
            Ok(renderer.exec(&header(config))?)
        }
        None => Ok(Vec::new()),
    }
}

fn dedup_in_place(names: &mut Vec<String>) {
    let mut seen = Vec::with_capacity(names.len());
    names.retain(|n| {
        if seen.contains(n) {
            false
        } else {
            seen.push(n.clone());
            true
        }
    });
}

// ---------------------------------------------------------------------------
// Emission
// ---------------------------------------------------------------------------

/// A pending change to one output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    pub path: PathBuf,
    pub unified_diff: String,
}

/// The merged result of one run, ready to be written.
#[derive(Debug)]
pub struct Emission {
    target: Arc<Target>,
    config: RunConfig,
    files: BTreeMap<String, FileBuffer>,
    /// Set once the post hook has run over every buffer.
    post_processed: bool,
}

impl Emission {
    /// The run configuration after flag defaults and the context hook.
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// File buffers in file-name order.
    pub fn files(&self) -> impl Iterator<Item = &FileBuffer> {
        self.files.values()
    }

    pub fn file(&self, name: &str) -> Option<&FileBuffer> {
        self.files.get(name)
    }

    /// Post-process every buffer, then write them all.
    ///
    /// A failing post hook keeps the file's pre-hook content and records a
    /// [`FileError::PostFailed`]; other files are unaffected. The hook runs
    /// at most once per emission; later calls only write again.
    pub fn write(&mut self) -> Result<(), EngineError> {
        if self.post_processed {
            return self.write_files();
        }
        self.post_processed = true;
        if let Some(post) = &self.target.post {
            for (name, file) in self.files.iter_mut() {
                match post(&self.config, &file.buf) {
                    Ok(buf) => file.buf = buf,
                    Err(source) => {
                        tracing::warn!(file = %name, error = %source, "post-processing failed");
                        file.errors.push(FileError::PostFailed {
                            file: name.clone(),
                            source,
                        });
                    }
                }
            }
        }
        self.write_files()
    }

    /// Write every buffer into the output directory.
    ///
    /// Each file goes to `<file>.stencil.tmp` first and is renamed into
    /// place. Write failures are recorded on the file; only cancellation
    /// stops the loop.
    pub fn write_files(&mut self) -> Result<(), EngineError> {
        for (name, file) in self.files.iter_mut() {
            if self.config.cancel.is_cancelled() {
                return Err(EngineError::Cancelled);
            }
            let path = self.config.out.join(name);
            match atomic_write(&path, &file.buf) {
                Ok(()) => tracing::info!("wrote: {}", path.display()),
                Err(source) => {
                    tracing::warn!(file = %name, error = %source, "write failed");
                    file.errors.push(FileError::Write { path, source });
                }
            }
        }
        Ok(())
    }

    /// Every file's errors, in file-name order.
    pub fn errors(&self) -> Vec<&FileError> {
        self.files.values().flat_map(|f| f.errors.iter()).collect()
    }

    /// Unified diffs of pending buffers against what is on disk.
    ///
    /// Files whose content would not change are skipped. Nothing is written.
    pub fn diff(&self) -> Result<Vec<FileDiff>, EngineError> {
        let mut diffs = Vec::new();
        for (name, file) in &self.files {
            let path = self.config.out.join(name);
            let existing = read_existing_or_empty(&path)?;
            let pending = String::from_utf8_lossy(&file.buf);
            if existing == pending {
                continue;
            }
            let unified = TextDiff::from_lines(existing.as_str(), &*pending)
                .unified_diff()
                .header(&format!("a/{name}"), &format!("b/{name}"))
                .context_radius(3)
                .to_string();
            diffs.push(FileDiff {
                path,
                unified_diff: unified,
            });
        }
        Ok(diffs)
    }
}

fn atomic_write(path: &Path, content: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = PathBuf::from(format!("{}.stencil.tmp", path.display()));
    std::fs::write(&tmp, content)?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e);
    }
    Ok(())
}

fn read_existing_or_empty(path: &Path) -> Result<String, EngineError> {
    match std::fs::read(path) {
        Ok(buf) => Ok(String::from_utf8_lossy(&buf).into_owned()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(io_err(path, e)),
    }
}

// ---------------------------------------------------------------------------
// write_raw
// ---------------------------------------------------------------------------

/// Copy the target's built-in template tree verbatim into `config.out`.
///
/// Returns the written paths. Bypasses rendering entirely.
pub fn write_raw(registry: &Registry, config: &RunConfig) -> Result<Vec<PathBuf>, EngineError> {
    let name = &config.template_type;
    let target = registry
        .get(name)
        .ok_or_else(|| EngineError::UnknownTemplate { name: name.clone() })?;
    let files = target.files.files().map_err(|e| EngineError::Resource {
        path: String::from("."),
        source: e,
    })?;

    let mut written = Vec::with_capacity(files.len());
    for file in files {
        if config.cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        let buf = target.files.read(&file).map_err(|e| EngineError::Resource {
            path: file.clone(),
            source: e,
        })?;
        let path = config.out.join(&file);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }
        std::fs::write(&path, buf).map_err(|e| io_err(&path, e))?;
        tracing::info!("wrote raw: {}", path.display());
        written.push(path);
    }
    Ok(written)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
