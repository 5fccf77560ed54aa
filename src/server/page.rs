//! Server-rendered upload page.

use crate::export::XLSX_CONTENT_TYPE;
use crate::pipeline::MergeReport;
use crate::pipeline::MergeResult;
use crate::pipeline::StatusLevel;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use quick_xml::escape::escape;
use std::fmt::Write;

const TITLE: &str = "Multiple Excel File Merger";

const STYLE: &str = "body{font-family:sans-serif;margin:0;display:flex;min-height:100vh}\
aside{width:18rem;padding:1.5rem;background:#f0f2f6}\
main{flex:1;padding:1.5rem 2rem;overflow-x:auto}\
.note{color:#d33}\
.message{padding:.75rem 1rem;margin:.5rem 0;border-radius:.4rem}\
.info{background:#e8f0fe}.warning{background:#fff6d5}.success{background:#e6f4ea}.error{background:#fde7e9}\
table{border-collapse:collapse;font-size:.9rem}\
th,td{border:1px solid #ddd;padding:.25rem .5rem;white-space:nowrap}\
th{background:#fafafa}\
.download{display:inline-block;margin-top:1rem;padding:.5rem 1rem;border:1px solid #999;border-radius:.4rem;text-decoration:none}";

/// Renders the whole page for a report: status messages, then preview and download on success.
pub(crate) fn render(report: &MergeReport) -> String {
    let mut html = String::with_capacity(4096);
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    let _ = writeln!(html, "<title>{TITLE}</title>\n<style>{STYLE}</style>\n</head>\n<body>");

    html.push_str("<aside>\n<h2>Upload files</h2>\n");
    html.push_str("<form method=\"post\" action=\"/merge\" enctype=\"multipart/form-data\">\n");
    html.push_str("<label for=\"files\">Choose Excel files</label><br>\n");
    html.push_str("<input id=\"files\" type=\"file\" name=\"files\" accept=\".xls,.xlsx\" multiple><br><br>\n");
    html.push_str("<button type=\"submit\">Merge</button>\n</form>\n</aside>\n");

    let _ = writeln!(html, "<main>\n<h1>{TITLE}</h1>");
    html.push_str("<h3>Merge several Excel files into a single table</h3>\n");
    html.push_str(
        "<p class=\"note\">Useful for combining files that share the same columns, \
         such as export declaration reports downloaded in several parts.</p>\n",
    );

    for message in report.messages() {
        let _ = writeln!(
            html,
            "<div class=\"message {}\">{}</div>",
            level_class(message.level),
            escape(message.text.as_str())
        );
    }
    if let Some(result) = report.merged() {
        render_result(&mut html, result);
    }

    html.push_str("</main>\n</body>\n</html>\n");
    html
}

fn level_class(level: StatusLevel) -> &'static str {
    match level {
        StatusLevel::Info => "info",
        StatusLevel::Warning => "warning",
        StatusLevel::Success => "success",
        StatusLevel::Error => "error",
    }
}

/// Preview table without an index column, then the download link.
fn render_result(html: &mut String, result: &MergeResult) {
    let preview = &result.preview;
    html.push_str("<h3>Merged data preview</h3>\n<table>\n<thead><tr>");
    for column in &preview.columns {
        let _ = write!(html, "<th>{}</th>", escape(column.as_str()));
    }
    html.push_str("</tr></thead>\n<tbody>\n");
    for row in &preview.rows {
        html.push_str("<tr>");
        for value in row {
            let _ = write!(html, "<td>{}</td>", escape(value.as_str()));
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</tbody>\n</table>\n");
    if preview.is_truncated() {
        let _ = writeln!(
            html,
            "<p>Showing the first {} of {} rows.</p>",
            preview.rows.len(),
            preview.total_rows
        );
    }

    let _ = writeln!(
        html,
        "<a class=\"download\" download=\"{}\" href=\"data:{};base64,{}\">Download merged Excel file</a>",
        escape(result.export.file_name.as_str()),
        XLSX_CONTENT_TYPE,
        STANDARD.encode(&result.export.bytes)
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Outcome;

    #[test]
    fn idle_page_has_prompt_and_no_preview() {
        let html = render(&MergeReport::no_files());
        assert!(html.contains("<div class=\"message info\">Upload one or more Excel files using the upload control.</div>"));
        assert!(html.contains("multiple"));
        assert!(!html.contains("<table>"));
        assert!(!html.contains("download="));
    }

    #[test]
    fn failures_are_escaped() {
        let report = MergeReport {
            failures: vec![crate::pipeline::FileFailure {
                file_name: "<bad>.xlsx".to_owned(),
                message: "broken".to_owned(),
            }],
            outcome: Outcome::NoValidData,
        };
        let html = render(&report);
        assert!(html.contains("<div class=\"message error\">Error reading file &lt;bad&gt;.xlsx: broken</div>"));
        assert!(html.contains("<div class=\"message warning\">No valid Excel files were found to merge.</div>"));
        assert!(!html.contains("<table>"));
    }
}
