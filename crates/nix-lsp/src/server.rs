//! The server runtime: message loop, worker pool, cancellation, document
//! lifecycle.
//!
//! One I/O thread reads framed messages. Notifications mutate the draft
//! store in arrival order and schedule analysis; requests run on a bounded
//! worker pool against the last completed translation unit. Writing shares
//! one mutex so workers can reply concurrently. A panic inside a handler is
//! caught at the pool boundary and turned into a request-level error.

use std::io::{BufRead, Write};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use lsp_types as lsp;
use nix_diagnostics::DiagnosticKind;
use parking_lot::{Mutex, RwLock};
use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::Value;
use tracing::{debug, error, info};

use crate::eval::PackageInfoProvider;
use crate::features;
use crate::protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, RequestId, error_codes};
use crate::publish::{DiagnosticPublisher, suppression_set};
use crate::state::{DocumentState, NixTU, ServerConfig};
use crate::transport;

/// Worker threads serving language requests.
const POOL_SIZE: usize = 4;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// A small fixed-size worker pool. Jobs queue up in a channel; dropping the
/// pool closes the channel and joins every worker.
struct WorkerPool {
    sender: Option<crossbeam_channel::Sender<Job>>,
    workers: Vec<std::thread::JoinHandle<()>>,
}

impl WorkerPool {
    fn new(size: usize) -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded::<Job>();
        let workers = (0..size)
            .map(|index| {
                let receiver = receiver.clone();
                std::thread::Builder::new()
                    .name(format!("nix-lsp-worker-{index}"))
                    .spawn(move || {
                        while let Ok(job) = receiver.recv() {
                            job();
                        }
                    })
                    .unwrap_or_else(|e| {
                        // Thread spawning only fails on resource exhaustion,
                        // at which point serving requests is hopeless anyway.
                        error!(error = %e, "failed to spawn worker thread");
                        std::process::abort()
                    })
            })
            .collect();
        WorkerPool { sender: Some(sender), workers }
    }

    fn execute(&self, job: Job) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(job);
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.sender.take();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

/// Shared server state. Handlers are stateless apart from this.
pub struct ServerState {
    drafts: Mutex<FxHashMap<String, DocumentState>>,
    tus: Mutex<FxHashMap<String, Arc<NixTU>>>,
    config: RwLock<Arc<ServerConfig>>,
    suppressed: RwLock<Arc<FxHashSet<DiagnosticKind>>>,
    out: Mutex<Box<dyn Write + Send>>,
    publisher: DiagnosticPublisher,
    cancelled: Mutex<FxHashSet<RequestId>>,
    provider: Option<Arc<dyn PackageInfoProvider>>,
    shutdown_requested: AtomicBool,
}

impl ServerState {
    /// Shared reference to the current TU; the store lock is released
    /// immediately.
    fn get_tu(&self, uri: &lsp::Uri) -> Result<Arc<NixTU>, JsonRpcError> {
        self.tus
            .lock()
            .get(uri.as_str())
            .cloned()
            .ok_or_else(|| JsonRpcError::invalid_params("no translation unit for this document"))
    }

    fn cancel(&self, id: RequestId) {
        self.cancelled.lock().insert(id);
    }

    fn take_cancelled(&self, id: &RequestId) -> bool {
        self.cancelled.lock().remove(id)
    }

    fn reply(&self, response: &JsonRpcResponse) {
        if let Err(e) = transport::write_message(&mut *self.out.lock(), response) {
            error!(error = %e, "failed to write response");
        }
    }
}

/// The language server. Owns the transport writer and the worker pool.
pub struct LspServer {
    state: Arc<ServerState>,
    pool: WorkerPool,
}

impl LspServer {
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        LspServer::with_provider(out, None)
    }

    /// Wire an external package-metadata provider (hover, inlay hints).
    pub fn with_provider(
        out: Box<dyn Write + Send>,
        provider: Option<Arc<dyn PackageInfoProvider>>,
    ) -> Self {
        LspServer {
            state: Arc::new(ServerState {
                drafts: Mutex::new(FxHashMap::default()),
                tus: Mutex::new(FxHashMap::default()),
                config: RwLock::new(Arc::new(ServerConfig::default())),
                suppressed: RwLock::new(Arc::new(FxHashSet::default())),
                out: Mutex::new(out),
                publisher: DiagnosticPublisher::new(),
                cancelled: Mutex::new(FxHashSet::default()),
                provider,
                shutdown_requested: AtomicBool::new(false),
            }),
            pool: WorkerPool::new(POOL_SIZE),
        }
    }

    /// Serve until `exit` or EOF. Returns the process exit code: 0 after a
    /// proper shutdown/exit sequence, nonzero otherwise; transport-level
    /// failures surface as errors.
    pub fn run<R: BufRead>(&mut self, reader: &mut R) -> anyhow::Result<i32> {
        loop {
            let Some(message) = transport::read_message(reader)? else {
                info!("client hung up without `exit`");
                return Ok(1);
            };
            if message.method == "exit" {
                let graceful = self.state.shutdown_requested.load(Ordering::SeqCst);
                return Ok(if graceful { 0 } else { 1 });
            }
            self.handle_message(message);
        }
    }

    /// Route one message. Notifications run on the I/O thread so document
    /// updates stay serialized per URI; requests go to the pool.
    pub fn handle_message(&mut self, message: JsonRpcRequest) {
        match message.id.clone() {
            None => self.handle_notification(&message.method, message.params.unwrap_or(Value::Null)),
            Some(id) => {
                let method = message.method;
                let params = message.params.unwrap_or(Value::Null);
                if method == "initialize" {
                    let response = JsonRpcResponse::success(id, initialize_result());
                    self.state.reply(&response);
                } else if method == "shutdown" {
                    self.state.shutdown_requested.store(true, Ordering::SeqCst);
                    self.state.reply(&JsonRpcResponse::success(id, Value::Null));
                } else {
                    let state = Arc::clone(&self.state);
                    self.pool.execute(Box::new(move || {
                        if state.take_cancelled(&id) {
                            state.reply(&JsonRpcResponse::failure(
                                id,
                                JsonRpcError::cancelled(),
                            ));
                            return;
                        }
                        let outcome = catch_unwind(AssertUnwindSafe(|| {
                            dispatch_request(&state, &method, params)
                        }));
                        let response = match outcome {
                            Ok(Ok(value)) => JsonRpcResponse::success(id, value),
                            Ok(Err(err)) => JsonRpcResponse::failure(id, err),
                            Err(_) => {
                                error!(method = %method, "handler panicked");
                                JsonRpcResponse::failure(
                                    id,
                                    JsonRpcError::internal("handler panicked"),
                                )
                            }
                        };
                        state.reply(&response);
                    }));
                }
            }
        }
    }

    fn handle_notification(&mut self, method: &str, params: Value) {
        match method {
            "initialized" => {}
            "textDocument/didOpen" => {
                let Ok(params) =
                    serde_json::from_value::<lsp::DidOpenTextDocumentParams>(params)
                else {
                    return;
                };
                let uri = params.text_document.uri;
                let version = Some(i64::from(params.text_document.version));
                self.state.drafts.lock().insert(
                    uri.as_str().to_string(),
                    DocumentState::new(&params.text_document.text, version),
                );
                self.schedule_analysis(uri);
            }
            "textDocument/didChange" => {
                let Ok(params) =
                    serde_json::from_value::<lsp::DidChangeTextDocumentParams>(params)
                else {
                    return;
                };
                let uri = params.text_document.uri;
                let version = Some(i64::from(params.text_document.version));
                let mut drafts = self.state.drafts.lock();
                if !drafts.contains_key(uri.as_str()) {
                    // A dropped draft recovers on a full-document change.
                    match params.content_changes.first() {
                        Some(change) if change.range.is_none() => {
                            drafts.insert(
                                uri.as_str().to_string(),
                                DocumentState::new("", version),
                            );
                        }
                        _ => {
                            debug!(uri = %uri.as_str(), "change for unopened document");
                            return;
                        }
                    }
                }
                let mut failed = false;
                match drafts.get_mut(uri.as_str()) {
                    None => return,
                    Some(draft) => {
                        for change in params.content_changes {
                            if let Err(e) =
                                draft.apply_change(change.range, &change.text, version)
                            {
                                // Out of sync with the client; drop the draft
                                // so further requests fail instead of lying.
                                error!(uri = %uri.as_str(), error = %e, "failed to apply change");
                                failed = true;
                                break;
                            }
                        }
                    }
                }
                if failed {
                    drafts.remove(uri.as_str());
                    return;
                }
                drop(drafts);
                self.schedule_analysis(uri);
            }
            "textDocument/didClose" => {
                let Ok(params) =
                    serde_json::from_value::<lsp::DidCloseTextDocumentParams>(params)
                else {
                    return;
                };
                let uri = params.text_document.uri;
                self.state.drafts.lock().remove(uri.as_str());
                self.state.tus.lock().remove(uri.as_str());
                self.state.publisher.forget(&uri);
            }
            "workspace/didChangeConfiguration" => {
                let settings = params.get("settings").cloned().unwrap_or(Value::Null);
                // Accept the section both at the top level and nested under
                // a "nix" key.
                let section = settings.get("nix").cloned().unwrap_or(settings);
                let config: ServerConfig =
                    serde_json::from_value(section).unwrap_or_default();
                let suppressed = suppression_set(&config.diagnostic.suppress);
                *self.state.suppressed.write() = Arc::new(suppressed);
                *self.state.config.write() = Arc::new(config);
            }
            "$/cancelRequest" => {
                if let Some(id) = params
                    .get("id")
                    .and_then(|v| serde_json::from_value::<RequestId>(v.clone()).ok())
                {
                    self.state.cancel(id);
                }
            }
            other => debug!(method = %other, "ignoring notification"),
        }
    }

    /// Parse and analyze the current draft on the pool, then atomically
    /// swap the TU and publish diagnostics. A newer version that finishes
    /// first wins; the stale result is discarded.
    fn schedule_analysis(&self, uri: lsp::Uri) {
        let Some((text, version)) = ({
            let drafts = self.state.drafts.lock();
            drafts.get(uri.as_str()).map(|d| (d.text.clone(), d.version))
        }) else {
            return;
        };
        let state = Arc::clone(&self.state);
        self.pool.execute(Box::new(move || {
            let tu = Arc::new(NixTU::analyze(text, version));
            {
                let mut tus = state.tus.lock();
                let stale = tus.get(uri.as_str()).is_some_and(|existing| {
                    existing.version().unwrap_or(i64::MIN) > tu.version().unwrap_or(i64::MIN)
                });
                if stale {
                    return;
                }
                tus.insert(uri.as_str().to_string(), Arc::clone(&tu));
            }
            let suppressed = Arc::clone(&state.suppressed.read());
            if let Err(e) = state.publisher.publish(&state.out, &uri, &tu, &suppressed) {
                error!(error = %e, "failed to publish diagnostics");
            }
        }));
    }
}

fn initialize_result() -> Value {
    let capabilities = lsp::ServerCapabilities {
        text_document_sync: Some(lsp::TextDocumentSyncCapability::Options(
            lsp::TextDocumentSyncOptions {
                open_close: Some(true),
                change: Some(lsp::TextDocumentSyncKind::INCREMENTAL),
                save: Some(lsp::TextDocumentSyncSaveOptions::Supported(true)),
                ..Default::default()
            },
        )),
        definition_provider: Some(lsp::OneOf::Left(true)),
        declaration_provider: Some(lsp::DeclarationCapability::Simple(true)),
        references_provider: Some(lsp::OneOf::Left(true)),
        document_highlight_provider: Some(lsp::OneOf::Left(true)),
        hover_provider: Some(lsp::HoverProviderCapability::Simple(true)),
        document_symbol_provider: Some(lsp::OneOf::Left(true)),
        document_link_provider: Some(lsp::DocumentLinkOptions {
            resolve_provider: Some(false),
            work_done_progress_options: Default::default(),
        }),
        folding_range_provider: Some(lsp::FoldingRangeProviderCapability::Simple(true)),
        inlay_hint_provider: Some(lsp::OneOf::Left(true)),
        completion_provider: Some(lsp::CompletionOptions {
            trigger_characters: Some(vec![".".to_string()]),
            ..Default::default()
        }),
        code_action_provider: Some(lsp::CodeActionProviderCapability::Options(
            lsp::CodeActionOptions {
                code_action_kinds: Some(vec![
                    lsp::CodeActionKind::QUICKFIX,
                    lsp::CodeActionKind::REFACTOR,
                    lsp::CodeActionKind::REFACTOR_REWRITE,
                ]),
                ..Default::default()
            },
        )),
        rename_provider: Some(lsp::OneOf::Right(lsp::RenameOptions {
            prepare_provider: Some(true),
            work_done_progress_options: Default::default(),
        })),
        ..Default::default()
    };
    serde_json::json!({
        "serverInfo": {
            "name": "nix-lsp",
            "version": env!("CARGO_PKG_VERSION"),
        },
        "capabilities": capabilities,
    })
}

fn parse_params<T: serde::de::DeserializeOwned>(params: Value) -> Result<T, JsonRpcError> {
    serde_json::from_value(params).map_err(|e| JsonRpcError::invalid_params(e.to_string()))
}

fn to_value<T: serde::Serialize>(value: T) -> Result<Value, JsonRpcError> {
    serde_json::to_value(value).map_err(|e| JsonRpcError::internal(e.to_string()))
}

fn feature_err(message: &'static str) -> JsonRpcError {
    JsonRpcError::new(error_codes::INVALID_REQUEST, message)
}

/// Request router. Every handler looks up the TU, then consults the
/// analyses; none of them touch mutable state.
fn dispatch_request(
    state: &ServerState,
    method: &str,
    params: Value,
) -> Result<Value, JsonRpcError> {
    match method {
        "textDocument/definition" | "textDocument/declaration" => {
            let params: lsp::GotoDefinitionParams = parse_params(params)?;
            let position = params.text_document_position_params;
            let uri = position.text_document.uri;
            let tu = state.get_tu(&uri)?;
            let location = features::definition::definition(&tu, &uri, position.position)
                .map_err(feature_err)?;
            to_value(location)
        }
        "textDocument/references" => {
            let params: lsp::ReferenceParams = parse_params(params)?;
            let position = params.text_document_position;
            let uri = position.text_document.uri;
            let tu = state.get_tu(&uri)?;
            let locations = features::references::references(&tu, &uri, position.position)
                .map_err(feature_err)?;
            to_value(locations)
        }
        "textDocument/documentHighlight" => {
            let params: lsp::DocumentHighlightParams = parse_params(params)?;
            let position = params.text_document_position_params;
            let tu = state.get_tu(&position.text_document.uri)?;
            to_value(features::document_highlight::document_highlight(
                &tu,
                position.position,
            ))
        }
        "textDocument/rename" => {
            let params: lsp::RenameParams = parse_params(params)?;
            let position = params.text_document_position;
            let uri = position.text_document.uri;
            let tu = state.get_tu(&uri)?;
            let edit =
                features::rename::rename(&tu, &uri, position.position, &params.new_name)
                    .map_err(feature_err)?;
            to_value(edit)
        }
        "textDocument/prepareRename" => {
            let params: lsp::TextDocumentPositionParams = parse_params(params)?;
            let tu = state.get_tu(&params.text_document.uri)?;
            let range = features::rename::prepare_rename(&tu, params.position)
                .map_err(feature_err)?;
            to_value(range)
        }
        "textDocument/hover" => {
            let params: lsp::HoverParams = parse_params(params)?;
            let position = params.text_document_position_params;
            let tu = state.get_tu(&position.text_document.uri)?;
            let provider = state.provider.as_deref();
            to_value(features::hover::hover(&tu, position.position, provider))
        }
        "textDocument/completion" => {
            let params: lsp::CompletionParams = parse_params(params)?;
            let position = params.text_document_position;
            let tu = state.get_tu(&position.text_document.uri)?;
            to_value(features::completion::completion(&tu, position.position))
        }
        "textDocument/documentSymbol" => {
            let params: lsp::DocumentSymbolParams = parse_params(params)?;
            let tu = state.get_tu(&params.text_document.uri)?;
            to_value(features::document_symbol::document_symbol(&tu))
        }
        "textDocument/documentLink" => {
            let params: lsp::DocumentLinkParams = parse_params(params)?;
            let uri = params.text_document.uri;
            let tu = state.get_tu(&uri)?;
            to_value(features::document_link::document_link(&tu, &uri))
        }
        "textDocument/foldingRange" => {
            let params: lsp::FoldingRangeParams = parse_params(params)?;
            let tu = state.get_tu(&params.text_document.uri)?;
            to_value(features::folding_range::folding_range(&tu))
        }
        "textDocument/inlayHint" => {
            let params: lsp::InlayHintParams = parse_params(params)?;
            let tu = state.get_tu(&params.text_document.uri)?;
            if !state.config.read().inlay_hints.enable {
                return to_value(Vec::<lsp::InlayHint>::new());
            }
            let provider = state.provider.as_deref();
            to_value(features::inlay_hints::inlay_hints(&tu, Some(params.range), provider))
        }
        "textDocument/codeAction" => {
            let params: lsp::CodeActionParams = parse_params(params)?;
            let uri = params.text_document.uri;
            let tu = state.get_tu(&uri)?;
            to_value(features::code_actions::code_actions(&tu, &uri, params.range))
        }
        other => Err(JsonRpcError::new(
            error_codes::METHOD_NOT_FOUND,
            format!("unknown method {other}"),
        )),
    }
}
