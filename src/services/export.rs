use crate::core::state::GenerationResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Text,
    Markdown,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Text => "txt",
            ExportFormat::Markdown => "md",
        }
    }
}

const FALLBACK_NAME: &str = "dokumen";

/// The document title with characters that are unsafe in file names replaced by `_`.
pub fn export_file_name(title: &str, format: ExportFormat) -> String {
    let title = title.trim();
    let stem: String = if title.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        title
            .chars()
            .map(|c| match c {
                '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
                other => other,
            })
            .collect()
    };
    format!("{}.{}", stem, format.extension())
}

/// Writes the document text into `dir` and returns the written path.
#[cfg(not(target_arch = "wasm32"))]
pub async fn export_document(
    dir: impl AsRef<std::path::Path>,
    title: &str,
    format: ExportFormat,
    result: &GenerationResult,
) -> anyhow::Result<std::path::PathBuf> {
    use anyhow::Context;

    let dir = dir.as_ref();
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    let path = dir.join(export_file_name(title, format));
    tokio::fs::write(&path, &result.text)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    log::info!("Exported {}", path.display());
    Ok(path)
}
