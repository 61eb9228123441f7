//! File upload component with drag-and-drop and file picker.

use dioxus::html::{FileData, HasFileData};
use dioxus::prelude::*;
use graystep_pipeline::decode::check_media_type;

/// A file accepted by [`FileUpload`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Raw file contents.
    pub bytes: Vec<u8>,
    /// Declared media type, e.g. `image/png`.
    pub media_type: String,
    /// Filename as reported by the browser.
    pub name: String,
}

/// Media type implied by a filename's extension.
///
/// Used when the browser reports no type for the file.
fn media_type_for_name(name: &str) -> String {
    let ext = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png".to_owned(),
        "jpg" | "jpeg" => "image/jpeg".to_owned(),
        "tif" | "tiff" => "image/tiff".to_owned(),
        _ => String::new(),
    }
}

/// Props for the [`FileUpload`] component.
#[derive(Props, Clone, PartialEq)]
pub struct FileUploadProps {
    /// Called after a file with a supported media type has been read.
    on_upload: EventHandler<UploadedFile>,
    /// Rejects new files while a conversion is running.
    #[props(default)]
    disabled: bool,
}

/// A drag-and-drop zone with a file picker button.
///
/// Accepts TIFF, PNG and JPEG. Files of any other type are rejected
/// before their bytes are read.
#[component]
pub fn FileUpload(props: FileUploadProps) -> Element {
    let mut dragging = use_signal(|| false);
    let mut filename = use_signal(|| Option::<String>::None);
    let mut error = use_signal(|| Option::<String>::None);
    let disabled = props.disabled;

    let process_files = move |files: Vec<FileData>| async move {
        if disabled {
            return;
        }
        let Some(file) = files.first() else {
            return;
        };
        let name = file.name();
        let media_type = file
            .content_type()
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| media_type_for_name(&name));

        if check_media_type(&media_type).is_err() {
            let shown = if media_type.is_empty() {
                "unknown"
            } else {
                media_type.as_str()
            };
            error.set(Some(format!("Unsupported file type: {name} ({shown})")));
            return;
        }

        match file.read_bytes().await {
            Ok(bytes) => {
                filename.set(Some(name.clone()));
                error.set(None);
                props.on_upload.call(UploadedFile {
                    bytes: bytes.to_vec(),
                    media_type,
                    name,
                });
            }
            Err(e) => {
                error.set(Some(format!("Failed to read file: {e}")));
            }
        }
    };

    let handle_files = move |evt: FormEvent| async move {
        process_files(evt.files()).await;
    };

    let handle_drop = move |evt: DragEvent| async move {
        evt.prevent_default();
        dragging.set(false);
        process_files(evt.files()).await;
    };

    let zone_class = if dragging() {
        "upload-zone dragging"
    } else {
        "upload-zone"
    };

    rsx! {
        div {
            class: "{zone_class}",
            ondragover: move |evt| {
                evt.prevent_default();
                dragging.set(true);
            },
            ondragleave: move |_| {
                dragging.set(false);
            },
            ondrop: handle_drop,

            if let Some(ref name) = filename() {
                p { class: "text-success", "Loaded: {name}" }
            }

            if let Some(ref err) = error() {
                p { class: "text-error", "{err}" }
            }

            p { class: "text-secondary", "Drop an image here or " }

            label { class: "btn btn-primary",
                input {
                    r#type: "file",
                    accept: ".tif,.tiff,.png,.jpg,.jpeg,image/tiff,image/png,image/jpeg",
                    class: "hidden",
                    disabled: disabled,
                    onchange: handle_files,
                }
                "Choose File"
            }

            p { class: "text-muted small", "TIFF, PNG, JPEG" }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_fallback_covers_accepted_types() {
        for name in ["a.png", "b.JPG", "c.jpeg", "d.tif", "e.TIFF"] {
            assert!(check_media_type(&media_type_for_name(name)).is_ok(), "{name}");
        }
    }

    #[test]
    fn extension_fallback_rejects_others() {
        for name in ["a.gif", "b.bmp", "noext", "c.png.txt"] {
            assert!(check_media_type(&media_type_for_name(name)).is_err(), "{name}");
        }
    }
}
