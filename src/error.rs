use thiserror::Error;

/// The kind of an importer error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HalaImporterErrorKind {
  /// The whole open failed and no document is available.
  Open,
  /// A single entity query failed, the document stays open.
  Query,
  /// An external file can not be reached.
  ResourceUnavailable,
  /// A configuration value is invalid.
  Configuration,
  /// A query was issued without an opened document.
  NotOpened,
}

/// The error type of the hala-importer crate.
#[derive(Error, Debug)]
pub struct HalaImporterError {
  kind: HalaImporterErrorKind,
  msg: String,
  #[source]
  source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

/// The implementation of the error type of the hala-importer crate.
impl HalaImporterError {
  /// Create a new error.
  /// param kind: The kind of the error.
  /// param msg: The message of the error.
  /// param source: The source of the error.
  /// return: The error.
  pub fn new(kind: HalaImporterErrorKind, msg: &str, source: Option<Box<dyn std::error::Error + Send + Sync>>) -> Self {
    Self {
      kind,
      msg: msg.to_string(),
      source,
    }
  }

  /// Create a new open error.
  /// param msg: The message of the error.
  /// return: The error.
  pub fn open(msg: &str) -> Self {
    Self::new(HalaImporterErrorKind::Open, msg, None)
  }

  /// Create a new query error.
  /// param msg: The message of the error.
  /// return: The error.
  pub fn query(msg: &str) -> Self {
    Self::new(HalaImporterErrorKind::Query, msg, None)
  }

  pub fn not_opened() -> Self {
    Self::new(HalaImporterErrorKind::NotOpened, "No file opened.", None)
  }

  pub fn kind(&self) -> HalaImporterErrorKind {
    self.kind
  }

  pub fn message(&self) -> &str {
    &self.msg
  }
}

impl std::convert::From<std::io::Error> for HalaImporterError {
  fn from(err: std::io::Error) -> Self {
    Self {
      kind: HalaImporterErrorKind::Open,
      msg: err.to_string(),
      source: Some(Box::new(err)),
    }
  }
}

/// The implementation Display trait for the error type of the hala-importer crate.
impl std::fmt::Display for HalaImporterError {
  /// Format the error.
  /// param f: The formatter.
  /// return: The result.
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.msg)
  }
}
