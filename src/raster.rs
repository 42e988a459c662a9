//! Rasterization of SVG text into PNG bytes through a scriptable rendering
//! engine.
//!
//! The engine is reached through the narrow [`ScriptHost`] capability (load a
//! blank page, run a script with arguments, read the result), so the paint
//! algorithm here does not depend on which browser automation backend is in
//! use. Hosts are obtained per call from a [`HostFactory`] and dropped on every
//! exit path, which releases the underlying browser process.

use crate::data_url::{self, PNG_MEDIA_TYPE, SVG_MEDIA_TYPE};
use crate::{Error, Result};
use log::debug;
use serde::Deserialize;
use serde_json::Value;

/// Creates an `<img>` from `arguments[0]`, waits for it to decode and reports
/// its natural size. A decode rejection reports 0x0.
pub const LOAD_IMAGE_SCRIPT: &str = r#"
const image = document.createElement("img");
image.src = arguments[0];
document.body.appendChild(image);
try {
    await image.decode();
} catch (e) {
    return { width: 0, height: 0, error: String(e) };
}
window.__icongenImage = image;
return { width: image.naturalWidth, height: image.naturalHeight };
"#;

/// Paints the decoded image onto a canvas of its natural size and exports it.
pub const PAINT_SCRIPT: &str = r#"
const image = window.__icongenImage;
const canvas = document.createElement("canvas");
canvas.width = image.naturalWidth;
canvas.height = image.naturalHeight;
canvas.getContext("2d").drawImage(image, 0, 0, canvas.width, canvas.height);
return canvas.toDataURL("image/png");
"#;

/// Minimal control surface of a headless rendering engine
pub trait ScriptHost {
    /// Navigate to an empty document
    fn load_blank_page(&mut self) -> Result<()>;

    /// Run `body` as an async function body whose inputs are `arguments[i]`,
    /// returning its JSON-serializable result.
    fn run_script(&mut self, body: &str, args: &[Value]) -> Result<Value>;
}

/// Hands out a fresh, exclusively owned host for one rasterization.
pub trait HostFactory: Send + Sync {
    fn acquire(&self) -> Result<Box<dyn ScriptHost>>;
}

impl<F> HostFactory for F
where
    F: Fn() -> Result<Box<dyn ScriptHost>> + Send + Sync,
{
    fn acquire(&self) -> Result<Box<dyn ScriptHost>> {
        self()
    }
}

/// Wrap a script body so that it runs with `args` bound to `arguments` and
/// always settles to a JSON string envelope: `{"ok": value}` or
/// `{"error": message}`.
pub fn wrap_script(body: &str, args: &[Value]) -> String {
    let args_json = serde_json::to_string(args).unwrap_or_else(|_| "[]".to_string());
    format!(
        "(async function() {{\n{}\n}}).apply(null, {}).then(\
         function(r) {{ return JSON.stringify({{ ok: r === undefined ? null : r }}); }}, \
         function(e) {{ return JSON.stringify({{ error: String(e) }}); }})",
        body, args_json
    )
}

/// Unpack the envelope produced by a script built with [`wrap_script`].
pub fn unwrap_envelope(text: &str) -> Result<Value> {
    let mut envelope: Value = serde_json::from_str(text)
        .map_err(|e| Error::RasterizeError(format!("malformed script result: {}", e)))?;

    if let Some(err) = envelope.get("error") {
        let msg = err.as_str().map(str::to_string).unwrap_or_else(|| err.to_string());
        return Err(Error::RasterizeError(format!("script threw: {}", msg)));
    }

    envelope
        .get_mut("ok")
        .map(Value::take)
        .ok_or_else(|| Error::RasterizeError("script result has neither value nor error".into()))
}

/// Natural dimensions reported by the engine after decoding
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub error: Option<String>,
}

/// Backend-independent SVG to PNG rasterizer
pub struct Rasterizer<'a> {
    hosts: &'a dyn HostFactory,
}

impl<'a> Rasterizer<'a> {
    pub fn new(hosts: &'a dyn HostFactory) -> Self {
        Self { hosts }
    }

    /// Paint `svg` at its natural size and return the PNG bytes.
    pub fn rasterize(&self, svg: &str) -> Result<Vec<u8>> {
        let svg_url = data_url::encode_bytes(SVG_MEDIA_TYPE, svg.as_bytes())?;

        let mut host = self.hosts.acquire()?;
        host.load_blank_page()?;

        let reported = host.run_script(LOAD_IMAGE_SCRIPT, &[Value::String(svg_url)])?;
        let size: ImageSize = serde_json::from_value(reported)
            .map_err(|e| Error::RasterizeError(format!("unexpected image size result: {}", e)))?;
        if size.width == 0 || size.height == 0 {
            let detail = size.error.map(|e| format!(" ({})", e)).unwrap_or_default();
            return Err(Error::RasterizeError(format!(
                "degenerate image {}x{}{}",
                size.width, size.height, detail
            )));
        }
        debug!("decoded image {}x{}", size.width, size.height);

        let painted = host.run_script(PAINT_SCRIPT, &[])?;
        let png_url = painted
            .as_str()
            .ok_or_else(|| Error::EncodeError(format!("canvas export is not a string: {}", painted)))?;

        let png = data_url::decode(png_url, PNG_MEDIA_TYPE)?;
        if png.is_empty() {
            return Err(Error::RasterizeError("empty PNG output".into()));
        }
        Ok(png)
    }
}
