use crate::error::ShimError;
use crate::types::ConfigItem;
use std::path::Path;

/// Parses the runtime-native config format: one `key = value` per line.
///
/// Blank lines and `#` comments carry no configuration and are skipped.
pub fn parse_config(path: &Path, contents: &str) -> Result<Vec<ConfigItem>, ShimError> {
    let mut items = Vec::new();

    for (index, line) in contents.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let (key, value) = trimmed
            .split_once('=')
            .ok_or_else(|| ShimError::MalformedConfig {
                path: path.to_path_buf(),
                line: index + 1,
                content: line.to_string(),
            })?;

        items.push(ConfigItem::new(key.trim(), value.trim()));
    }

    Ok(items)
}

/// Renders items back into the runtime-native format, preserving order.
pub fn render_config(items: &[ConfigItem]) -> String {
    let mut out = String::new();
    for item in items {
        out.push_str(&item.to_string());
        out.push('\n');
    }
    out
}
