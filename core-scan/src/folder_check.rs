//! FolderCheck stage

use bridge_traits::FileIndex;
use std::path::Path;
use tracing::debug;

use crate::actions::FileIssue;
use crate::error::Result;

/// Report a missing base folder. Later stages still run: every episode of a
/// missing folder is simply reported missing.
pub async fn check_folder(
    index: &dyn FileIndex,
    show_name: &str,
    folder: &Path,
) -> Result<Option<FileIssue>> {
    if folder.as_os_str().is_empty() {
        return Ok(Some(FileIssue::new(
            show_name,
            folder,
            "No base folder configured",
        )));
    }

    if index.folder_exists(folder).await? {
        return Ok(None);
    }

    debug!(show = show_name, "Base folder missing");
    Ok(Some(FileIssue::new(
        show_name,
        folder,
        "Base folder does not exist",
    )))
}
