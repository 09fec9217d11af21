pub mod storage;
pub mod template;

pub use storage::{DocumentKind, DocumentStore, safe_file_stem};
pub use template::{Context, DocxTemplate, TemplateValue};

use actix_web::web;

use crate::error::{AppError, AppResult};

/// Renders `kind`'s template with `ctx` and stores it as `file_name`.
///
/// Runs on the blocking pool. Returns the path relative to the media root.
pub async fn generate(
    store: &DocumentStore,
    kind: DocumentKind,
    ctx: Context,
    file_name: String,
) -> AppResult<String> {
    generate_replacing(store, kind, ctx, file_name, None).await
}

/// Like [`generate`], but also deletes `previous` once the new document
/// has rendered. A failed render leaves `previous` in place.
pub async fn generate_replacing(
    store: &DocumentStore,
    kind: DocumentKind,
    ctx: Context,
    file_name: String,
    previous: Option<String>,
) -> AppResult<String> {
    let store = store.clone();
    web::block(move || {
        let template = store.load_template(kind)?;
        let bytes = template.render(&ctx)?;
        if let Some(old) = previous {
            store.remove(kind, &old)?;
        }
        store.save(kind, &file_name, &bytes)
    })
    .await
    .map_err(|e| AppError::internal(format!("document worker failed: {e}")))?
}

/// Reads a stored document on the blocking pool.
pub async fn read(store: &DocumentStore, relative: String) -> AppResult<Vec<u8>> {
    let store = store.clone();
    web::block(move || store.read(&relative))
        .await
        .map_err(|e| AppError::internal(format!("document worker failed: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::template::{docx_with_body, document_xml};

    #[actix_web::test]
    async fn generate_writes_rendered_document() {
        let dir = tempfile::tempdir().unwrap();
        let templates = dir.path().join("templates");
        std::fs::create_dir_all(&templates).unwrap();
        std::fs::write(
            templates.join("releaving_letter.docx"),
            docx_with_body("{{ employee_name }} left on {{ releaving_date }}"),
        )
        .unwrap();
        let store = DocumentStore::new(&templates, dir.path().join("media"));

        let ctx = Context::new()
            .text("employee_name", "Asha Rao")
            .text("releaving_date", "1st December 2025");
        let rel = generate(
            &store,
            DocumentKind::RelievingLetter,
            ctx,
            "Relieving_STPL1125001_Asha_Rao.docx".to_string(),
        )
        .await
        .unwrap();

        assert_eq!(rel, "releaving_letters/Relieving_STPL1125001_Asha_Rao.docx");
        let bytes = read(&store, rel.clone()).await.unwrap();
        assert!(document_xml(&bytes).contains("Asha Rao left on 1st December 2025"));

        store.remove(DocumentKind::RelievingLetter, &rel).unwrap();
        assert!(!store.exists(&rel));
    }

    #[actix_web::test]
    async fn previous_document_survives_a_failed_render() {
        let dir = tempfile::tempdir().unwrap();
        let templates = dir.path().join("templates");
        std::fs::create_dir_all(&templates).unwrap();
        let store = DocumentStore::new(&templates, dir.path().join("media"));
        let old = store
            .save(DocumentKind::RelievingLetter, "Relieving_old.docx", b"old")
            .unwrap();

        // no template on disk yet
        let err = generate_replacing(
            &store,
            DocumentKind::RelievingLetter,
            Context::new(),
            "Relieving_new.docx".to_string(),
            Some(old.clone()),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Template(_)));
        assert!(store.exists(&old));

        std::fs::write(
            templates.join("releaving_letter.docx"),
            docx_with_body("{{ employee_name }}"),
        )
        .unwrap();
        let new = generate_replacing(
            &store,
            DocumentKind::RelievingLetter,
            Context::new().text("employee_name", "Asha Rao"),
            "Relieving_new.docx".to_string(),
            Some(old.clone()),
        )
        .await
        .unwrap();
        assert!(!store.exists(&old));
        assert!(store.exists(&new));
    }
}
