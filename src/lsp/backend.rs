//! LSP front-end over the Tapestry core.
//!
//! Template files are re-annotated on every open/change/save and their error
//! diagnostics published; highlight regions surface as semantic tokens.
//! Goto-definition in a template navigates to the backing class, and the
//! custom `tapestry/pairedFile` request serves class ⇄ template navigation
//! for editor keybindings.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use serde::Deserialize;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::{
    Diagnostic, DiagnosticSeverity, DidChangeTextDocumentParams,
    DidChangeWatchedFilesParams, DidCloseTextDocumentParams, DidOpenTextDocumentParams,
    DidSaveTextDocumentParams, GotoDefinitionParams, GotoDefinitionResponse,
    InitializeParams, InitializeResult, InitializedParams, Location, MessageType, OneOf,
    Position, Range, SemanticToken, SemanticTokenType, SemanticTokens, SemanticTokensFullOptions,
    SemanticTokensLegend, SemanticTokensOptions, SemanticTokensParams, SemanticTokensResult,
    SemanticTokensServerCapabilities, ServerCapabilities, TextDocumentIdentifier,
    TextDocumentSyncCapability, TextDocumentSyncKind, Url,
};
use tower_lsp::{Client, LanguageServer};
use tracing::{debug, info, warn};

use crate::core::annotator::{
    Annotation, CancelToken, HighlightKind, TemplateAnnotator,
};
use crate::core::artifact::Artifact;
use crate::core::navigation::{
    resolve_navigation_target, NavigationMode, CANT_NAVIGATE_MESSAGE, CANT_NAVIGATE_TITLE,
};
use crate::core::project::{ProjectModelCache, TapestryProjectModel};
use crate::document::Document;
use crate::tml::{parse_template, Span};

/// Token legend offered in the semantic-tokens capability; indices match
/// [`token_type_index`].
fn token_legend() -> SemanticTokensLegend {
    SemanticTokensLegend {
        token_types: vec![SemanticTokenType::TYPE, SemanticTokenType::PROPERTY],
        token_modifiers: vec![],
    }
}

fn token_type_index(kind: HighlightKind) -> u32 {
    match kind {
        HighlightKind::TagName => 0,
        HighlightKind::AttributeName => 1,
    }
}

/// Client-supplied options from `initializationOptions`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Settings {
    /// Publish annotation diagnostics for open templates.
    validate_templates: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            validate_templates: true,
        }
    }
}

pub struct TapestryBackend {
    client: Client,
    documents: DashMap<Url, Document>,
    models: ProjectModelCache,
    root: RwLock<Option<PathBuf>>,
    settings: RwLock<Settings>,
    /// Token of the in-flight annotation per document; a newer edit cancels
    /// the previous walk.
    annotation_tokens: DashMap<Url, CancelToken>,
}

impl TapestryBackend {
    pub fn new(client: Client) -> Self {
        TapestryBackend {
            client,
            documents: DashMap::new(),
            models: ProjectModelCache::new(),
            root: RwLock::new(None),
            settings: RwLock::new(Settings::default()),
            annotation_tokens: DashMap::new(),
        }
    }

    fn project_model(&self) -> Option<Arc<TapestryProjectModel>> {
        let root = self.root.read().clone()?;
        Some(self.models.get_or_build(&root))
    }

    fn invalidate_model(&self) {
        if let Some(root) = self.root.read().clone() {
            self.models.invalidate(&root);
        }
    }

    fn is_template_uri(uri: &Url) -> bool {
        uri.path().ends_with(".tml")
    }

    fn uri_to_path(uri: &Url) -> Option<PathBuf> {
        uri.to_file_path().ok()
    }

    /// Parses and annotates one open template, returning LSP diagnostics.
    fn diagnostics_for(&self, uri: &Url, document: &Document) -> Vec<Diagnostic> {
        if !self.settings.read().validate_templates {
            return Vec::new();
        }
        let text = document.content();
        let tree = match parse_template(&text) {
            Ok(tree) => tree,
            Err(parse_error) => {
                let offset = parse_error.offset();
                let position = document.offset_to_position(offset);
                return vec![Diagnostic {
                    range: Range {
                        start: position,
                        end: position,
                    },
                    severity: Some(DiagnosticSeverity::ERROR),
                    source: Some("tapestry".to_string()),
                    message: parse_error.to_string(),
                    ..Default::default()
                }];
            }
        };

        let Some(model) = self.project_model() else {
            return Vec::new();
        };
        let Some(path) = Self::uri_to_path(uri) else {
            return Vec::new();
        };

        let token = CancelToken::new();
        if let Some(previous) = self.annotation_tokens.insert(uri.clone(), token.clone()) {
            previous.cancel();
        }

        let mut annotations: Vec<Annotation> = Vec::new();
        let annotator = TemplateAnnotator::new(&model, &path).with_cancel_token(token);
        if annotator.annotate(&tree, &mut annotations).is_err() {
            debug!("annotation walk for {} cancelled", uri);
            return Vec::new();
        }

        annotations
            .into_iter()
            .filter_map(|annotation| match annotation {
                Annotation::Diagnostic { span, message } => Some(Diagnostic {
                    range: document.span_to_range(span),
                    severity: Some(DiagnosticSeverity::ERROR),
                    source: Some("tapestry".to_string()),
                    message,
                    ..Default::default()
                }),
                Annotation::Highlight { .. } => None,
            })
            .collect()
    }

    async fn publish(&self, uri: &Url) {
        let Some(document) = self.documents.get(uri) else {
            return;
        };
        let version = document.version;
        let diagnostics = self.diagnostics_for(uri, &document);
        drop(document);
        self.client
            .publish_diagnostics(uri.clone(), diagnostics, Some(version))
            .await;
    }

    async fn republish_open_templates(&self) {
        let uris: Vec<Url> = self
            .documents
            .iter()
            .map(|entry| entry.key().clone())
            .filter(Self::is_template_uri)
            .collect();
        for uri in uris {
            self.publish(&uri).await;
        }
    }

    /// Handler for the custom `tapestry/pairedFile` request: bidirectional
    /// class ⇄ template navigation. Returns the paired file's URI, or `None`
    /// after showing the fixed "couldn't navigate" notice.
    pub async fn paired_file(&self, params: TextDocumentIdentifier) -> Result<Option<Url>> {
        let target = Self::uri_to_path(&params.uri)
            .and_then(|path| Artifact::from_path(&path))
            .and_then(|artifact| {
                let model = self.project_model()?;
                resolve_navigation_target(&model, &artifact, NavigationMode::Bidirectional)
            })
            .and_then(|path| Url::from_file_path(path).ok());

        match target {
            Some(uri) => Ok(Some(uri)),
            None => {
                self.client
                    .show_message(
                        MessageType::INFO,
                        format!("{CANT_NAVIGATE_TITLE}: {CANT_NAVIGATE_MESSAGE}"),
                    )
                    .await;
                Ok(None)
            }
        }
    }

    fn semantic_tokens(&self, uri: &Url, document: &Document) -> Option<SemanticTokens> {
        let text = document.content();
        let tree = parse_template(&text).ok()?;
        let model = self.project_model()?;
        let path = Self::uri_to_path(uri)?;

        let mut annotations: Vec<Annotation> = Vec::new();
        TemplateAnnotator::new(&model, &path)
            .annotate(&tree, &mut annotations)
            .ok()?;

        let mut regions: Vec<(Span, u32)> = annotations
            .into_iter()
            .filter_map(|annotation| match annotation {
                Annotation::Highlight { span, kind } => Some((span, token_type_index(kind))),
                Annotation::Diagnostic { .. } => None,
            })
            .collect();
        regions.sort_by_key(|(span, _)| span.start);

        let mut data = Vec::with_capacity(regions.len());
        let mut previous = Position::new(0, 0);
        for (span, token_type) in regions {
            let start = document.offset_to_position(span.start);
            let delta_line = start.line - previous.line;
            let delta_start = if delta_line == 0 {
                start.character - previous.character
            } else {
                start.character
            };
            data.push(SemanticToken {
                delta_line,
                delta_start,
                length: span.len() as u32,
                token_type,
                token_modifiers_bitset: 0,
            });
            previous = start;
        }
        Some(SemanticTokens {
            result_id: None,
            data,
        })
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for TapestryBackend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        let root = params
            .workspace_folders
            .as_ref()
            .and_then(|folders| folders.first())
            .and_then(|folder| folder.uri.to_file_path().ok())
            .or_else(|| {
                #[allow(deprecated)]
                let root_uri = params.root_uri.clone();
                root_uri.and_then(|uri| uri.to_file_path().ok())
            });
        if let Some(root) = root {
            info!("workspace root: {}", root.display());
            *self.root.write() = Some(root);
        } else {
            warn!("no workspace root in initialize request; navigation disabled");
        }

        if let Some(options) = params.initialization_options {
            match serde_json::from_value::<Settings>(options) {
                Ok(settings) => *self.settings.write() = settings,
                Err(err) => warn!("ignoring malformed initialization options: {}", err),
            }
        }

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::INCREMENTAL,
                )),
                definition_provider: Some(OneOf::Left(true)),
                semantic_tokens_provider: Some(
                    SemanticTokensServerCapabilities::SemanticTokensOptions(
                        SemanticTokensOptions {
                            legend: token_legend(),
                            full: Some(SemanticTokensFullOptions::Bool(true)),
                            ..Default::default()
                        },
                    ),
                ),
                ..Default::default()
            },
            ..Default::default()
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        // Build the model up front so the first annotation pass is fast.
        if let Some(model) = self.project_model() {
            debug!("initial project model built for {}", model.root().display());
        }
        self.client
            .log_message(MessageType::INFO, "Tapestry language server initialized")
            .await;
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri;
        debug!("opened {}", uri);
        self.documents.insert(
            uri.clone(),
            Document::new(uri.clone(), &params.text_document.text, params.text_document.version),
        );
        if Self::is_template_uri(&uri) {
            self.publish(&uri).await;
        }
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        let version = params.text_document.version;
        if let Some(mut document) = self.documents.get_mut(&uri) {
            document.apply(params.content_changes, version);
        } else {
            warn!("change for unopened document {}", uri);
            return;
        }
        if Self::is_template_uri(&uri) {
            self.publish(&uri).await;
        }
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        let uri = params.text_document.uri;
        // A saved class may add or remove parameters and templates.
        if uri.path().ends_with(".java") {
            self.invalidate_model();
            self.republish_open_templates().await;
        } else if Self::is_template_uri(&uri) {
            self.invalidate_model();
            self.publish(&uri).await;
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        self.documents.remove(&uri);
        self.annotation_tokens.remove(&uri);
        self.client.publish_diagnostics(uri, vec![], None).await;
    }

    async fn did_change_watched_files(&self, params: DidChangeWatchedFilesParams) {
        let relevant = params.changes.iter().any(|change| {
            change.uri.path().ends_with(".java") || change.uri.path().ends_with(".tml")
        });
        if relevant {
            debug!("watched sources changed; rebuilding project model");
            self.invalidate_model();
            self.republish_open_templates().await;
        }
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> Result<Option<GotoDefinitionResponse>> {
        let uri = params.text_document_position_params.text_document.uri;
        if !Self::is_template_uri(&uri) {
            return Ok(None);
        }
        let target = Self::uri_to_path(&uri)
            .and_then(|path| Artifact::from_path(&path))
            .and_then(|artifact| {
                let model = self.project_model()?;
                resolve_navigation_target(&model, &artifact, NavigationMode::TemplateToClass)
            })
            .and_then(|path| Url::from_file_path(path).ok());

        Ok(target.map(|target_uri| {
            GotoDefinitionResponse::Scalar(Location {
                uri: target_uri,
                range: Range::default(),
            })
        }))
    }

    async fn semantic_tokens_full(
        &self,
        params: SemanticTokensParams,
    ) -> Result<Option<SemanticTokensResult>> {
        let uri = params.text_document.uri;
        if !Self::is_template_uri(&uri) {
            return Ok(None);
        }
        let Some(document) = self.documents.get(&uri) else {
            return Ok(None);
        };
        Ok(self
            .semantic_tokens(&uri, &document)
            .map(SemanticTokensResult::Tokens))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_default_and_partial_options() {
        assert!(Settings::default().validate_templates);

        let settings: Settings =
            serde_json::from_value(serde_json::json!({ "validateTemplates": false })).unwrap();
        assert!(!settings.validate_templates);

        let settings: Settings = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(settings.validate_templates);
    }
}
