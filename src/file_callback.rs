use std::path::Path;
use std::rc::Rc;

/// The lifetime hint passed to a file callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HalaInputFileCallbackPolicy {
  /// The data is only needed for the duration of the call.
  LoadTemporary,
  /// The data is kept for the whole lifetime of the opened document.
  LoadPermanent,
}

/// A user supplied file loader, called with the file path and the policy hint.
/// Returning None means the file could not be loaded.
pub type HalaFileCallback = Rc<dyn Fn(&str, HalaInputFileCallbackPolicy) -> Option<Vec<u8>>>;

/// Load an external file through the callback if present, otherwise from the filesystem.
/// param callback: The optional file callback.
/// param path: The file path.
/// param policy: The lifetime hint.
/// return: The file data, None if the file could not be read.
pub(crate) fn load_external(
  callback: Option<&HalaFileCallback>,
  path: &Path,
  policy: HalaInputFileCallbackPolicy,
) -> Option<Vec<u8>> {
  match callback {
    Some(callback) => callback(&path.to_string_lossy(), policy),
    None => match std::fs::read(path) {
      Ok(data) => Some(data),
      Err(err) => {
        log::debug!("Read file \"{}\" failed: {}", path.to_string_lossy(), err);
        None
      },
    },
  }
}
