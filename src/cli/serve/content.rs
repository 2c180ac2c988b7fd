//! Response body processing.

use crate::reload::RELOAD_JS_PATH;

/// Maybe inject the reload script if content is HTML and watch is enabled
pub fn maybe_inject_reload(body: Vec<u8>, content_type: &str, ws_port: Option<u16>) -> Vec<u8> {
    match (crate::utils::mime::is_html(content_type), ws_port) {
        (true, Some(_)) => inject_reload_script(&body),
        _ => body,
    }
}

/// Inject the reload script tag before `</body>` tag
fn inject_reload_script(content: &[u8]) -> Vec<u8> {
    let script = format!("<script src=\"{RELOAD_JS_PATH}\"></script>");
    let script_bytes = script.as_bytes();

    // Byte pattern for </body> - most generators use lowercase
    const PATTERN: &[u8] = b"</body>";

    // Reverse search for </body> using byte windows
    if let Some(pos) = content
        .windows(PATTERN.len())
        .rposition(|w| w.eq_ignore_ascii_case(PATTERN))
    {
        let mut result = Vec::with_capacity(content.len() + script_bytes.len());
        result.extend_from_slice(&content[..pos]);
        result.extend_from_slice(script_bytes);
        result.extend_from_slice(&content[pos..]);
        return result;
    }

    // No </body> found, append to end (browsers handle this gracefully)
    let mut result = Vec::with_capacity(content.len() + script_bytes.len());
    result.extend_from_slice(content);
    result.extend_from_slice(script_bytes);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::mime::types;

    #[test]
    fn test_inject_before_body_close() {
        let body = b"<html><body>hi</body></html>".to_vec();
        let out = maybe_inject_reload(body, types::HTML, Some(35729));
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains(&format!("<script src=\"{RELOAD_JS_PATH}\"></script></body>")));
    }

    #[test]
    fn test_inject_appends_without_body_tag() {
        let body = b"<p>fragment</p>".to_vec();
        let out = maybe_inject_reload(body, types::HTML, Some(35729));
        let text = String::from_utf8(out).unwrap();
        assert!(text.ends_with("</script>"));
    }

    #[test]
    fn test_no_injection_for_css_or_without_watch() {
        let body = b"body {}".to_vec();
        let out = maybe_inject_reload(body.clone(), types::CSS, Some(35729));
        assert_eq!(out, body);

        let html = b"<html><body></body></html>".to_vec();
        let out = maybe_inject_reload(html.clone(), types::HTML, None);
        assert_eq!(out, html);
    }
}
