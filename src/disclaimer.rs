//! The one persisted flag: whether the user dismissed the disclaimer for good.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Fixed storage key for the accepted flag
pub const DISCLAIMER_KEY: &str = "biblical-geography-disclaimer-accepted";

pub const DISCLAIMER_TEXT: &str = "Territory boundaries, routes and site locations on this map are \
approximate reconstructions drawn from scripture and secondary scholarship. Many are debated, \
and none should be read as surveyed borders. Use the references in each popup to check the \
sources for yourself.";

/// File-backed flag store; `None` directory means nothing is ever persisted
#[derive(Debug, Clone)]
pub struct DisclaimerStore {
    dir: Option<PathBuf>,
}

impl DisclaimerStore {
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self { dir }
    }

    /// Store that forgets everything at exit
    pub fn ephemeral() -> Self {
        Self { dir: None }
    }

    fn path(&self) -> Option<PathBuf> {
        self.dir.as_deref().map(|d| d.join(DISCLAIMER_KEY))
    }

    /// Missing file or read failure both count as not accepted
    pub fn is_accepted(&self) -> bool {
        let Some(path) = self.path() else {
            return false;
        };
        match fs::read_to_string(&path) {
            Ok(contents) => contents.trim() == "1",
            Err(err) => {
                debug!("disclaimer flag unreadable at {}: {err}", path.display());
                false
            }
        }
    }

    /// Persist acceptance; failures are logged and otherwise ignored
    pub fn accept(&self) {
        let Some(path) = self.path() else {
            return;
        };
        if let Err(err) = write_flag(&path) {
            warn!("could not persist disclaimer flag to {}: {err}", path.display());
        }
    }

    /// Forget a previous acceptance
    pub fn reset(&self) {
        if let Some(path) = self.path() {
            if let Err(err) = fs::remove_file(&path) {
                debug!("disclaimer flag not removed: {err}");
            }
        }
    }
}

fn write_flag(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, "1")
}

/// Modal state for one session
#[derive(Debug, Clone)]
pub struct Disclaimer {
    store: DisclaimerStore,
    visible: bool,
    dont_show_again: bool,
}

impl Disclaimer {
    /// Shown unless a previous session accepted it
    pub fn load(store: DisclaimerStore) -> Self {
        let visible = !store.is_accepted();
        Self {
            store,
            visible,
            dont_show_again: false,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Reopen on request, regardless of the stored flag
    pub fn show(&mut self) {
        self.visible = true;
    }

    pub fn dont_show_again(&self) -> bool {
        self.dont_show_again
    }

    pub fn toggle_dont_show_again(&mut self) {
        self.dont_show_again = !self.dont_show_again;
    }

    /// Close the modal, persisting only when "don't show again" is checked
    pub fn accept(&mut self) {
        self.visible = false;
        if self.dont_show_again {
            self.store.accept();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ephemeral_never_accepted() {
        let store = DisclaimerStore::ephemeral();
        store.accept();
        assert!(!store.is_accepted());
        assert!(Disclaimer::load(store).is_visible());
    }

    #[test]
    fn test_accept_without_checkbox_does_not_persist() {
        let dir = tempfile::tempdir().unwrap();
        let store = DisclaimerStore::new(Some(dir.path().to_path_buf()));
        let mut modal = Disclaimer::load(store.clone());
        assert!(modal.is_visible());
        modal.accept();
        assert!(!modal.is_visible());
        assert!(!store.is_accepted());
    }

    #[test]
    fn test_dont_show_again_persists() {
        let dir = tempfile::tempdir().unwrap();
        let store = DisclaimerStore::new(Some(dir.path().join("nested")));
        let mut modal = Disclaimer::load(store.clone());
        modal.toggle_dont_show_again();
        modal.accept();
        assert!(store.is_accepted());
        assert!(!Disclaimer::load(store.clone()).is_visible());
        store.reset();
        assert!(Disclaimer::load(store).is_visible());
    }

    #[test]
    fn test_garbage_flag_is_not_accepted() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(DISCLAIMER_KEY), "yes please").unwrap();
        let store = DisclaimerStore::new(Some(dir.path().to_path_buf()));
        assert!(!store.is_accepted());
    }
}
