use std::fmt;

use anyhow::Error;
use serde::Serialize;

pub const UNKNOWN_ID: &str = "ART_UNKNOWN_ID";
pub const MISSING_CATALOG_FILE: &str = "ART_MISSING_CATALOG_FILE";
pub const NO_EXISTING_ASSET: &str = "ART_NO_EXISTING_ASSET";
pub const NO_IMAGE_DATA: &str = "ART_NO_IMAGE_DATA";
pub const REQUEST_FAILED: &str = "ART_REQUEST_FAILED";
pub const RESIZE_FAILED: &str = "ART_RESIZE_FAILED";
pub const ENCODE_FAILED: &str = "ART_ENCODE_FAILED";
pub const MISSING_CREDENTIAL: &str = "ART_MISSING_CREDENTIAL";
pub const INVALID_CONFIG: &str = "ART_INVALID_CONFIG";
pub const USAGE: &str = "ART_USAGE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CodedErrorKind {
    UnknownId,
    MissingCatalogFile,
    NoExistingAsset,
    Generation,
    Resize,
    Encode,
    MissingCredential,
    Config,
    Usage,
}

/// A domain failure carried inside an `anyhow::Error` chain.
#[derive(Debug, Clone)]
pub struct CodedError {
    pub code: &'static str,
    pub message: String,
    pub hint: Option<String>,
    pub kind: CodedErrorKind,
}

impl CodedError {
    fn new(kind: CodedErrorKind, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            hint: None,
            kind,
        }
    }

    pub fn unknown_id(id: &str) -> Self {
        Self::new(
            CodedErrorKind::UnknownId,
            UNKNOWN_ID,
            format!("Unknown item ID '{id}'"),
        )
        .with_hint("Use --list to see available items")
    }

    pub fn missing_catalog_file(path: &std::path::Path) -> Self {
        Self::new(
            CodedErrorKind::MissingCatalogFile,
            MISSING_CATALOG_FILE,
            format!("Prompts file not found: {}", path.display()),
        )
    }

    pub fn no_existing_asset(path: &std::path::Path) -> Self {
        Self::new(
            CodedErrorKind::NoExistingAsset,
            NO_EXISTING_ASSET,
            format!("No existing image found at {}", path.display()),
        )
        .with_hint("Generate the item first with `artgen <item_id>`")
    }

    pub fn no_image_data() -> Self {
        Self::new(
            CodedErrorKind::Generation,
            NO_IMAGE_DATA,
            "No image data in response",
        )
    }

    pub fn request_failed(message: impl Into<String>) -> Self {
        Self::new(CodedErrorKind::Generation, REQUEST_FAILED, message)
    }

    pub fn resize_failed(message: impl Into<String>) -> Self {
        Self::new(CodedErrorKind::Resize, RESIZE_FAILED, message)
    }

    pub fn encode_failed(message: impl Into<String>) -> Self {
        Self::new(CodedErrorKind::Encode, ENCODE_FAILED, message)
    }

    pub fn missing_credential(variable: &str) -> Self {
        Self::new(
            CodedErrorKind::MissingCredential,
            MISSING_CREDENTIAL,
            format!("{variable} is required to call the image generation API"),
        )
        .with_hint(format!("export {variable}=<your key> and retry"))
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(CodedErrorKind::Config, INVALID_CONFIG, message)
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(CodedErrorKind::Usage, USAGE, message)
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope {
            ok: false,
            error: ErrorEnvelopeBody {
                code: self.code.to_owned(),
                kind: self.kind,
                message: self.message.clone(),
                hint: self.hint.clone(),
            },
        }
    }
}

impl fmt::Display for CodedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for CodedError {}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelope {
    pub ok: bool,
    pub error: ErrorEnvelopeBody,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelopeBody {
    pub code: String,
    pub kind: CodedErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

/// Finds a `CodedError` whether it is the root cause or attached as context.
pub fn find_coded_error(error: &Error) -> Option<&CodedError> {
    error.downcast_ref::<CodedError>().or_else(|| {
        error
            .chain()
            .find_map(|cause| cause.downcast_ref::<CodedError>())
    })
}
