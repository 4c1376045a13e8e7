//! Plain string template substitution with a "missing key -> `Unknown`"
//! adapter.
//!
//! Templates use `{name}`-style placeholders. This is a pre-pass
//! substitution, not a full templating engine — the rule templates are
//! simple enough that a single linear scan suffices, and it keeps the
//! rules module free of any templating-engine dependency (that engine is
//! reserved for the renderer, which has a richer contract).

use std::collections::HashMap;

/// Render `template`, replacing every `{key}` occurrence with the
/// matching value from `values`. Placeholders with no matching key are
/// replaced with the literal `Unknown` — never an error.
pub fn render(template: &str, values: &HashMap<&str, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let bytes = template.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'{' {
            if let Some(end) = template[i..].find('}') {
                let key = &template[i + 1..i + end];
                // Guard against braces that aren't placeholders (no spaces,
                // non-empty) — anything else is copied through literally.
                if !key.is_empty() && !key.contains(['{', ' ']) {
                    let value = values.get(key).cloned().unwrap_or_else(|| "Unknown".to_string());
                    out.push_str(&value);
                    i += end + 1;
                    continue;
                }
            }
        }
        out.push(bytes[i] as char);
        i += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_known_placeholder() {
        let mut values = HashMap::new();
        values.insert("device_name", "ap-lobby".to_string());
        assert_eq!(render("Device {device_name} is down", &values), "Device ap-lobby is down");
    }

    #[test]
    fn missing_placeholder_becomes_unknown() {
        let values = HashMap::new();
        assert_eq!(render("Device {device_name} is down", &values), "Device Unknown is down");
    }

    #[test]
    fn multiple_placeholders() {
        let mut values = HashMap::new();
        values.insert("src_ip", "10.0.0.5".to_string());
        values.insert("port", "443".to_string());
        assert_eq!(
            render("Blocked {src_ip}:{port}", &values),
            "Blocked 10.0.0.5:443"
        );
    }

    #[test]
    fn no_placeholders_passes_through() {
        let values = HashMap::new();
        assert_eq!(render("static text", &values), "static text");
    }
}
