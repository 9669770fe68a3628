// Cross-platform JSON open/save helpers. On wasm we create a hidden <input type=file> and read
// the text asynchronously, and saving is a Blob download; on native both go through rfd.
// Picked text, or the reason it could not be read, lands in a slot the app drains once per frame.

use once_cell::sync::Lazy;
use std::sync::Mutex;

use crate::error::Result;

static SELECTED_JSON: Lazy<Mutex<Option<Result<String>>>> = Lazy::new(|| Mutex::new(None));

fn store_selected(picked: Result<String>) {
    match SELECTED_JSON.lock() {
        Ok(mut slot) => *slot = Some(picked),
        Err(_) => log::error!("file_picker: selection slot poisoned"),
    }
}

/// The last picked file, if one arrived since the previous call.
pub fn take_selected_json() -> Option<Result<String>> {
    SELECTED_JSON.lock().ok().and_then(|mut slot| slot.take())
}

#[cfg(target_arch = "wasm32")]
mod web {
    use wasm_bindgen::closure::Closure;
    use wasm_bindgen::JsCast;
    use wasm_bindgen::JsValue;
    use web_sys::{FileReader, HtmlAnchorElement, HtmlInputElement};

    use crate::error::{EditorError, Result};

    fn js_error(what: &str, err: JsValue) -> EditorError {
        EditorError::Fetch {
            path: what.to_owned(),
            reason: format!("{err:?}"),
        }
    }

    pub fn open_json_picker() {
        log::debug!("file_picker: open_json_picker called");
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };

        let input = match document
            .create_element("input")
            .ok()
            .and_then(|el| el.dyn_into::<HtmlInputElement>().ok())
        {
            Some(i) => i,
            None => return,
        };

        input.set_type("file");
        input.set_accept("application/json,.json");
        // Off-screen instead of display:none, some browsers block clicks on hidden inputs
        let _ = input.set_attribute("style", "position: fixed; left: -9999px; width: 1px; height: 1px; opacity: 0;");

        if let Some(body) = document.body() {
            let _ = body.append_child(&input);
        }

        let onchange = Closure::wrap(Box::new(move |ev: web_sys::Event| {
            let Some(input) = ev.target().and_then(|t| t.dyn_into::<HtmlInputElement>().ok()) else {
                return;
            };
            let Some(file) = input.files().and_then(|files| files.get(0)) else {
                return;
            };
            let reader = match FileReader::new() {
                Ok(r) => r,
                Err(e) => {
                    log::error!("file_picker: no FileReader: {e:?}");
                    return;
                }
            };
            let reader2 = reader.clone();
            let onload = Closure::once(Box::new(move |_e: JsValue| {
                let picked = reader2
                    .result()
                    .ok()
                    .and_then(|r| r.as_string())
                    .ok_or_else(|| js_error("picked file", JsValue::from_str("not readable as text")));
                super::store_selected(picked);
            }) as Box<dyn FnOnce(_)>);
            reader.set_onload(Some(onload.as_ref().unchecked_ref()));
            onload.forget();
            let _ = reader.read_as_text(&file);
            input.remove();
        }) as Box<dyn FnMut(_)>);

        input.set_onchange(Some(onchange.as_ref().unchecked_ref()));
        onchange.forget(); // keep alive

        input.click();
    }

    /// Offer `contents` to the user as a download named `file_name`.
    pub fn save_json(file_name: &str, contents: &str) -> Result<()> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| js_error(file_name, JsValue::from_str("no document")))?;

        let parts = js_sys::Array::of1(&JsValue::from_str(contents));
        let options = web_sys::BlobPropertyBag::new();
        options.set_type("application/json");
        let blob = web_sys::Blob::new_with_str_sequence_and_options(&parts, &options)
            .map_err(|e| js_error(file_name, e))?;
        let url = web_sys::Url::create_object_url_with_blob(&blob).map_err(|e| js_error(file_name, e))?;

        let anchor = document
            .create_element("a")
            .map_err(|e| js_error(file_name, e))?
            .dyn_into::<HtmlAnchorElement>()
            .map_err(|e| js_error(file_name, e.into()))?;
        anchor.set_href(&url);
        anchor.set_download(file_name);
        anchor.click();

        let _ = web_sys::Url::revoke_object_url(&url);
        Ok(())
    }
}

#[cfg(target_arch = "wasm32")]
pub use web::{open_json_picker, save_json};

/// Ask for a JSON file; its text shows up in [`take_selected_json`].
#[cfg(not(target_arch = "wasm32"))]
pub fn open_json_picker() {
    let Some(path) = rfd::FileDialog::new().add_filter("JSON", &["json"]).pick_file() else {
        return;
    };
    let picked = std::fs::read_to_string(&path)
        .map_err(|e| crate::error::EditorError::io(path.display().to_string(), e));
    store_selected(picked);
}

/// Ask where to save and write `contents` there. Cancelling is not an error.
#[cfg(not(target_arch = "wasm32"))]
pub fn save_json(file_name: &str, contents: &str) -> Result<()> {
    let Some(path) = rfd::FileDialog::new()
        .add_filter("JSON", &["json"])
        .set_file_name(file_name)
        .save_file()
    else {
        return Ok(());
    };
    std::fs::write(&path, contents).map_err(|e| crate::error::EditorError::io(path.display().to_string(), e))?;
    log::info!("Saved {}", path.display());
    Ok(())
}
