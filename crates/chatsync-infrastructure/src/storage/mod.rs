//! Storage helpers shared by the file-backed stores.

mod atomic_toml;

pub use atomic_toml::AtomicTomlFile;

/// True when a storage error only says the document does not exist.
///
/// `AsyncDirStorage` reports missing files as plain I/O errors, so this goes by
/// the message.
pub(crate) fn is_not_found(error: &impl std::fmt::Display) -> bool {
    let message = error.to_string();
    message.contains("No such file or directory")
        || message.contains("not found")
        || message.contains("cannot find")
}
