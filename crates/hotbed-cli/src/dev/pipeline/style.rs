use hotbed_core::TransformOutput;
use hotbed_core::url::style_id;

use super::CLIENT_PATH;

/// Wrap a stylesheet in a module. With `inject`, evaluating the module puts
/// the CSS into a `<style>` element keyed by the stylesheet's id, and the
/// module accepts its own updates.
pub(super) fn css_module(css: &str, url: &str, inject: bool) -> TransformOutput {
    let css_literal = js_string(css);
    if !inject {
        return TransformOutput::new(format!("export default {css_literal};\n"));
    }

    let id = js_string(&style_id(url));
    let client = js_string(CLIENT_PATH);
    let url_literal = js_string(url);
    let code = format!(
        "import {{ createHotContext, updateStyle, removeStyle }} from {client};\n\
         import.meta.hot = createHotContext({url_literal});\n\
         const id = {id};\n\
         const css = {css_literal};\n\
         updateStyle(id, css);\n\
         import.meta.hot.accept();\n\
         import.meta.hot.prune(() => removeStyle(id));\n\
         export default css;\n"
    );
    TransformOutput::new(code).self_accepting(true)
}

fn js_string(value: &str) -> String {
    // JSON strings are valid JS string literals.
    serde_json::Value::String(value.to_string()).to_string()
}
