//! gunkls: the Gunk language server, speaking JSON-RPC over stdio.
//!
//! Logs go to stderr; set `GUNKLS_LOG` to adjust the filter.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use lsp_server::{Connection, ErrorCode, Message, Notification, Request, Response};
use lsp_types::notification::{Notification as _, PublishDiagnostics as PublishNotification};
use lsp_types::{
    DiagnosticSeverity, DidChangeTextDocumentParams, DidCloseTextDocumentParams,
    DidOpenTextDocumentParams, DocumentFormattingParams, GotoDefinitionParams,
    GotoDefinitionResponse, InitializeParams, InitializeResult, NumberOrString, OneOf,
    PublishDiagnosticsParams, ServerCapabilities, ServerInfo, TextDocumentSyncCapability,
    TextDocumentSyncKind, Url,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use gunkls::server::{PublishDiagnostics, Server};
use gunkls::{Config, Diagnostic, Location, Position, Severity, Span, TextEdit};

#[derive(Debug, Parser)]
#[command(name = "gunkls", version, about = "Language server for the Gunk IDL")]
struct Args {
    /// Publish lint warnings alongside diagnostics
    #[arg(long)]
    lint: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("GUNKLS_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let (connection, io_threads) = Connection::stdio();
    let (id, params) = connection.initialize_start()?;
    let params: InitializeParams =
        serde_json::from_value(params).context("invalid initialize params")?;

    let mut config = Config::from_options(params.initialization_options.clone());
    config.lint |= args.lint;
    let server = Server::new(config);
    connection.initialize_finish(id, serde_json::to_value(initialize_result())?)?;

    match workspace_root(&params) {
        Ok(root) => {
            if let Err(e) = server.initialize(&root) {
                tracing::error!(error = %e, "could not load workspace");
            }
        }
        Err(e) => tracing::error!(error = %e, "no workspace root"),
    }

    main_loop(&connection, &server)?;
    io_threads.join()?;
    tracing::info!("server stopped");
    Ok(())
}

fn initialize_result() -> InitializeResult {
    InitializeResult {
        capabilities: ServerCapabilities {
            text_document_sync: Some(TextDocumentSyncCapability::Kind(TextDocumentSyncKind::FULL)),
            document_formatting_provider: Some(OneOf::Left(true)),
            definition_provider: Some(OneOf::Left(true)),
            ..Default::default()
        },
        server_info: Some(ServerInfo {
            name: "gunkls".to_string(),
            version: Some(env!("CARGO_PKG_VERSION").to_string()),
        }),
    }
}

#[allow(deprecated)]
fn workspace_root(params: &InitializeParams) -> Result<PathBuf> {
    let uri = params
        .workspace_folders
        .as_ref()
        .and_then(|folders| folders.first())
        .map(|folder| &folder.uri)
        .or(params.root_uri.as_ref());
    match uri {
        Some(uri) => to_path(uri),
        None => std::env::current_dir().context("no workspace folder and no current directory"),
    }
}

fn main_loop(connection: &Connection, server: &Server) -> Result<()> {
    for msg in &connection.receiver {
        match msg {
            Message::Request(req) => {
                if connection.handle_shutdown(&req)? {
                    tracing::info!("shutdown requested");
                    break;
                }
                let response = handle_request(server, req);
                connection.sender.send(Message::Response(response))?;
            }
            Message::Notification(notification) => {
                for publish in handle_notification(server, notification) {
                    send_diagnostics(connection, publish)?;
                }
            }
            Message::Response(_) => {}
        }
    }
    Ok(())
}

// ============================================================================
// REQUESTS
// ============================================================================

fn handle_request(server: &Server, req: Request) -> Response {
    tracing::debug!(method = %req.method, "request");
    let id = req.id.clone();
    let result = match req.method.as_str() {
        "textDocument/formatting" => params::<DocumentFormattingParams>(req.params)
            .and_then(|p| formatting(server, &p)),
        "textDocument/definition" => params::<GotoDefinitionParams>(req.params)
            .and_then(|p| definition(server, &p)),
        method => {
            return Response::new_err(
                id,
                ErrorCode::MethodNotFound as i32,
                format!("method not supported: {method}"),
            );
        }
    };
    match result {
        Ok(value) => Response::new_ok(id, value),
        Err(e) => Response::new_err(id, ErrorCode::RequestFailed as i32, format!("{e:#}")),
    }
}

fn formatting(server: &Server, params: &DocumentFormattingParams) -> Result<Value> {
    let path = to_path(&params.text_document.uri)?;
    let edits: Vec<lsp_types::TextEdit> = server
        .formatting(&path)?
        .into_iter()
        .map(to_text_edit)
        .collect();
    Ok(serde_json::to_value(edits)?)
}

fn definition(server: &Server, params: &GotoDefinitionParams) -> Result<Value> {
    let at = &params.text_document_position_params;
    let path = to_path(&at.text_document.uri)?;
    let position = Position::new(at.position.line, at.position.character);
    let locations: Vec<lsp_types::Location> = server
        .definition(&path, position)?
        .into_iter()
        .filter_map(to_location)
        .collect();
    if locations.is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::to_value(GotoDefinitionResponse::Array(locations))?)
}

// ============================================================================
// NOTIFICATIONS
// ============================================================================

fn handle_notification(server: &Server, notification: Notification) -> Vec<PublishDiagnostics> {
    tracing::debug!(method = %notification.method, "notification");
    let result = match notification.method.as_str() {
        "textDocument/didOpen" => {
            params::<DidOpenTextDocumentParams>(notification.params).and_then(|p| {
                let path = to_path(&p.text_document.uri)?;
                Ok(server.did_open(&path, p.text_document.text))
            })
        }
        "textDocument/didChange" => {
            params::<DidChangeTextDocumentParams>(notification.params).and_then(|p| {
                let path = to_path(&p.text_document.uri)?;
                // full sync: the last change holds the whole document
                let text = p
                    .content_changes
                    .into_iter()
                    .last()
                    .map(|change| change.text)
                    .ok_or_else(|| anyhow!("change without content"))?;
                Ok(server.did_change(&path, text))
            })
        }
        "textDocument/didClose" => {
            params::<DidCloseTextDocumentParams>(notification.params).and_then(|p| {
                let path = to_path(&p.text_document.uri)?;
                Ok(server.did_close(&path))
            })
        }
        _ => Ok(Vec::new()),
    };
    result.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "could not handle notification");
        Vec::new()
    })
}

fn send_diagnostics(connection: &Connection, publish: PublishDiagnostics) -> Result<()> {
    let Some(uri) = to_uri(&publish.file) else {
        tracing::warn!(file = %publish.file.display(), "file has no URI");
        return Ok(());
    };
    let diagnostics = publish.diagnostics.into_iter().map(to_diagnostic).collect();
    let params = PublishDiagnosticsParams::new(uri, diagnostics, None);
    let notification = Notification::new(PublishNotification::METHOD.to_string(), params);
    connection.sender.send(Message::Notification(notification))?;
    Ok(())
}

// ============================================================================
// CONVERSIONS
// ============================================================================

fn params<T: DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value).context("invalid params")
}

fn to_path(uri: &Url) -> Result<PathBuf> {
    uri.to_file_path()
        .map_err(|()| anyhow!("not a file URI: {uri}"))
}

fn to_uri(path: &Path) -> Option<Url> {
    Url::from_file_path(path).ok()
}

fn to_range(span: Span) -> lsp_types::Range {
    lsp_types::Range::new(
        lsp_types::Position::new(span.start.line, span.start.character),
        lsp_types::Position::new(span.end.line, span.end.character),
    )
}

fn to_diagnostic(d: Diagnostic) -> lsp_types::Diagnostic {
    let severity = match d.severity {
        Severity::Error => DiagnosticSeverity::ERROR,
        Severity::Warning => DiagnosticSeverity::WARNING,
        Severity::Info => DiagnosticSeverity::INFORMATION,
        Severity::Hint => DiagnosticSeverity::HINT,
    };
    lsp_types::Diagnostic {
        range: to_range(d.range),
        severity: Some(severity),
        code: Some(NumberOrString::String(d.code)),
        source: Some(d.source),
        message: d.message,
        ..Default::default()
    }
}

fn to_location(location: Location) -> Option<lsp_types::Location> {
    Some(lsp_types::Location::new(
        to_uri(&location.file)?,
        to_range(location.range),
    ))
}

fn to_text_edit(edit: TextEdit) -> lsp_types::TextEdit {
    lsp_types::TextEdit::new(to_range(edit.range), edit.new_text)
}
