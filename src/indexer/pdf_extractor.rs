use crate::error::IndexingError;

/// Extract the text layer of a PDF held in memory and give it light
/// markdown structure (headings, pipe tables)
pub fn extract_pdf_text(bytes: &[u8]) -> Result<String, IndexingError> {
    let text = pdf_extract::extract_text_from_mem(bytes).map_err(|e| {
        IndexingError::ExtractionFailed {
            source_type: "pdf".to_string(),
            reason: e.to_string(),
        }
    })?;

    Ok(format_as_markdown(&text))
}

/// Format extracted PDF text as Markdown
fn format_as_markdown(text: &str) -> String {
    let mut markdown = String::new();
    let mut in_table = false;

    for line in text.lines() {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            if in_table {
                markdown.push('\n');
                in_table = false;
            }
            markdown.push('\n');
            continue;
        }

        if is_likely_table_row(trimmed) {
            markdown.push_str(&format_table_row(trimmed));
            markdown.push('\n');
            in_table = true;
            continue;
        }

        if in_table {
            markdown.push('\n');
            in_table = false;
        }

        if is_likely_heading(trimmed) {
            markdown.push_str(&format!("# {}\n\n", trimmed.trim_end_matches(':')));
        } else {
            markdown.push_str(trimmed);
            markdown.push('\n');
        }
    }

    markdown
}

/// Lines with three or more columns separated by tabs or wide gaps
fn is_likely_table_row(line: &str) -> bool {
    let columns = split_columns(line);
    columns.len() >= 3 && (line.contains('\t') || line.contains("  "))
}

fn split_columns(line: &str) -> Vec<&str> {
    if line.contains('\t') {
        line.split('\t')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    } else {
        line.split("  ")
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }
}

fn format_table_row(line: &str) -> String {
    format!("| {} |", split_columns(line).join(" | "))
}

/// ALL CAPS lines and short lines ending with a colon
fn is_likely_heading(line: &str) -> bool {
    let uppercase_count = line.chars().filter(|c| c.is_uppercase()).count();
    let alpha_count = line.chars().filter(|c| c.is_alphabetic()).count();

    if alpha_count > 0 {
        let uppercase_ratio = uppercase_count as f64 / alpha_count as f64;
        if uppercase_ratio > 0.8 && line.chars().count() < 100 {
            return true;
        }
    }

    line.ends_with(':') && line.chars().count() < 80 && !line.contains("://")
}
