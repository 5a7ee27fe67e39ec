/// Short label for a function: the last dot-segment of its qualified name.
/// Entry points named `*.main` get the directory holding their file appended,
/// since many binaries in one repository all share the name `main.main`.
pub fn display_name(name: &str, file_path: &str) -> String {
    let short = name.rsplit('.').next().unwrap_or(name);
    if !name.ends_with(".main") || file_path.is_empty() {
        return short.to_string();
    }

    let parts = file_path.split(['/', '\\']).collect::<Vec<_>>();
    let mut context = if parts.len() >= 2 {
        parts[parts.len() - 2]
    } else {
        ""
    };
    if context.is_empty() || context == "cmd" {
        context = parts
            .iter()
            .copied()
            .find(|part| !part.is_empty() && !part.ends_with(".go") && *part != "cmd")
            .unwrap_or("root");
    }

    format!("{short} ({context})")
}

pub fn call_badge(count: usize) -> String {
    if count == 1 {
        "1 call".to_string()
    } else {
        format!("{count} calls")
    }
}

/// Number of pages needed for `total` items, never less than one.
pub fn page_count(total: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 1;
    }
    total.div_ceil(page_size).max(1)
}
