use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use super::template::DocxTemplate;
use crate::config::Config;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    OfferLetter,
    HikeLetter,
    Payslip,
    RelievingLetter,
}

impl DocumentKind {
    /// Sub-directory of the media root.
    pub fn dir(self) -> &'static str {
        match self {
            DocumentKind::OfferLetter => "offer_letters",
            DocumentKind::HikeLetter => "hike_letters",
            DocumentKind::Payslip => "payslips",
            DocumentKind::RelievingLetter => "releaving_letters",
        }
    }

    pub fn template_file(self) -> &'static str {
        match self {
            DocumentKind::OfferLetter => "offer_template.docx",
            DocumentKind::HikeLetter => "hike_letter_template.docx",
            DocumentKind::Payslip => "payslip_template.docx",
            DocumentKind::RelievingLetter => "releaving_letter.docx",
        }
    }

    /// Shown when the previous copy of the document is open elsewhere.
    pub fn locked_message(self) -> &'static str {
        match self {
            DocumentKind::OfferLetter => "File is open. Close it and try again.",
            DocumentKind::HikeLetter => "Old hike letter is OPENED. Please close it and try again.",
            DocumentKind::Payslip => "Close the open file and try again.",
            DocumentKind::RelievingLetter => {
                "Close the previously opened letter in Word and try again."
            }
        }
    }
}

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w]").expect("valid regex"));

/// Replaces every non-word character with `_`.
pub fn safe_file_stem(text: &str) -> String {
    NON_WORD.replace_all(text.trim(), "_").into_owned()
}

/// Templates in, generated documents out.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    template_dir: PathBuf,
    media_root: PathBuf,
}

impl DocumentStore {
    pub fn new(template_dir: impl Into<PathBuf>, media_root: impl Into<PathBuf>) -> Self {
        Self {
            template_dir: template_dir.into(),
            media_root: media_root.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.template_dir.clone(), config.media_root.clone())
    }

    pub fn load_template(&self, kind: DocumentKind) -> AppResult<DocxTemplate> {
        let path = self.template_dir.join(kind.template_file());
        if !path.exists() {
            return Err(AppError::Template(format!(
                "template file missing: {}",
                path.display()
            )));
        }
        DocxTemplate::open(&path)
    }

    /// Absolute path of a stored document.
    pub fn path_of(&self, relative: &str) -> PathBuf {
        self.media_root.join(relative)
    }

    pub fn exists(&self, relative: &str) -> bool {
        self.path_of(relative).is_file()
    }

    /// Deletes a stored document. A missing file is not an error.
    pub fn remove(&self, kind: DocumentKind, relative: &str) -> AppResult<()> {
        remove_existing(kind, &self.path_of(relative))
    }

    /// Writes `bytes` as `file_name`, replacing any previous copy, and
    /// returns the path relative to the media root.
    pub fn save(&self, kind: DocumentKind, file_name: &str, bytes: &[u8]) -> AppResult<String> {
        let dir = self.media_root.join(kind.dir());
        fs::create_dir_all(&dir)?;

        let path = dir.join(file_name);
        remove_existing(kind, &path)?;
        fs::write(&path, bytes).map_err(|e| locked_or_io(kind, &path, e))?;

        tracing::info!(path = %path.display(), bytes = bytes.len(), "Document written");
        Ok(format!("{}/{}", kind.dir(), file_name))
    }

    pub fn read(&self, relative: &str) -> AppResult<Vec<u8>> {
        fs::read(self.path_of(relative)).map_err(|e| match e.kind() {
            ErrorKind::NotFound => AppError::not_found("File missing."),
            _ => AppError::Io(e),
        })
    }
}

fn remove_existing(kind: DocumentKind, path: &Path) -> AppResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(locked_or_io(kind, path, e)),
    }
}

fn locked_or_io(kind: DocumentKind, path: &Path, err: std::io::Error) -> AppError {
    if err.kind() == ErrorKind::PermissionDenied {
        AppError::FileLocked {
            path: path.to_path_buf(),
            message: kind.locked_message().to_string(),
        }
    } else {
        AppError::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::template::docx_with_body;

    #[test]
    fn safe_stems() {
        assert_eq!(safe_file_stem("Asha_Rao"), "Asha_Rao");
        assert_eq!(safe_file_stem("Asha Rao-Iyer"), "Asha_Rao_Iyer");
        assert_eq!(safe_file_stem(" O'Neil "), "O_Neil");
    }

    #[test]
    fn save_replaces_previous_copy() {
        let media = tempfile::tempdir().unwrap();
        let store = DocumentStore::new(media.path().join("templates"), media.path());

        let rel = store.save(DocumentKind::Payslip, "a.docx", b"first").unwrap();
        assert_eq!(rel, "payslips/a.docx");
        store.save(DocumentKind::Payslip, "a.docx", b"second").unwrap();

        assert_eq!(store.read(&rel).unwrap(), b"second");
        assert!(store.exists(&rel));
    }

    #[test]
    fn remove_ignores_missing_files() {
        let media = tempfile::tempdir().unwrap();
        let store = DocumentStore::new(media.path(), media.path());
        store
            .remove(DocumentKind::RelievingLetter, "releaving_letters/none.docx")
            .unwrap();
    }

    #[test]
    fn read_missing_is_not_found() {
        let media = tempfile::tempdir().unwrap();
        let store = DocumentStore::new(media.path(), media.path());
        let err = store.read("payslips/none.docx").unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn missing_template_is_a_template_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::new(dir.path(), dir.path());
        let err = store.load_template(DocumentKind::OfferLetter).unwrap_err();
        assert!(err.to_string().contains("offer_template.docx"));
    }

    #[test]
    fn loads_template_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("payslip_template.docx"),
            docx_with_body("{{ Net_Salary }}"),
        )
        .unwrap();
        let store = DocumentStore::new(dir.path(), dir.path());
        assert!(store.load_template(DocumentKind::Payslip).is_ok());
    }

    #[test]
    fn permission_denied_maps_to_locked() {
        let err = locked_or_io(
            DocumentKind::HikeLetter,
            Path::new("x.docx"),
            std::io::Error::new(ErrorKind::PermissionDenied, "in use"),
        );
        match err {
            AppError::FileLocked { message, .. } => {
                assert_eq!(message, "Old hike letter is OPENED. Please close it and try again.")
            }
            other => panic!("expected FileLocked, got {other:?}"),
        }
    }
}
